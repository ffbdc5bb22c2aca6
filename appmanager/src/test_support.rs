//! Test-only helpers: scripted command runners and on-disk fixtures.

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{Context, Result};
use tempfile::TempDir;

use crate::core::argv::Tools;
use crate::io::process::{CommandOutcome, CommandRunner};

type Respond = Box<dyn Fn(&[String]) -> CommandOutcome + Send + Sync>;

/// Runner whose answers come from a closure. Records every argv.
pub struct ScriptedRunner {
    respond: Respond,
    calls: Mutex<Vec<Vec<String>>>,
}

impl ScriptedRunner {
    pub fn new(respond: impl Fn(&[String]) -> CommandOutcome + Send + Sync + 'static) -> Self {
        Self {
            respond: Box::new(respond),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Answer every command with the same outcome.
    pub fn always(outcome: CommandOutcome) -> Self {
        Self::new(move |_| outcome)
    }

    pub fn calls(&self) -> Vec<Vec<String>> {
        self.calls.lock().expect("calls lock").clone()
    }

    pub fn count(&self, pred: impl Fn(&[String]) -> bool) -> usize {
        self.calls().iter().filter(|argv| pred(argv)).count()
    }
}

impl CommandRunner for ScriptedRunner {
    fn run(&self, argv: &[String]) -> CommandOutcome {
        self.calls.lock().expect("calls lock").push(argv.to_vec());
        (self.respond)(argv)
    }
}

#[derive(Debug, Default)]
struct NetworkState {
    ports: HashSet<String>,
    connections: HashSet<(String, String)>,
    running: HashSet<String>,
    published: HashMap<String, Vec<String>>,
}

/// In-memory stand-in for the port broker and the remote launcher.
///
/// Understands the argv shapes built by `core::argv` with default [`Tools`]:
/// existence and pairwise queries, connect/disconnect, and launcher
/// `--isrunning`, `--cmd ... --as`, `--sigterm` and `--kill`. Starting a
/// tag makes the ports registered with [`FakeNetwork::publishes`] appear;
/// stopping it removes them.
#[derive(Debug, Default)]
pub struct FakeNetwork {
    tools: Tools,
    state: Mutex<NetworkState>,
    calls: Mutex<Vec<Vec<String>>>,
}

impl FakeNetwork {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_ports(self, ports: &[&str]) -> Self {
        {
            let mut state = self.state.lock().expect("state lock");
            state.ports.extend(ports.iter().map(|p| p.to_string()));
        }
        self
    }

    pub fn with_connection(self, output: &str, input: &str) -> Self {
        self.state
            .lock()
            .expect("state lock")
            .connections
            .insert((output.to_string(), input.to_string()));
        self
    }

    pub fn with_running(self, tags: &[&str]) -> Self {
        {
            let mut state = self.state.lock().expect("state lock");
            state.running.extend(tags.iter().map(|t| t.to_string()));
        }
        self
    }

    /// Ports that exist while `tag` is running.
    pub fn publishes(self, tag: &str, ports: &[&str]) -> Self {
        self.state
            .lock()
            .expect("state lock")
            .published
            .insert(tag.to_string(), ports.iter().map(|p| p.to_string()).collect());
        self
    }

    pub fn calls(&self) -> Vec<Vec<String>> {
        self.calls.lock().expect("calls lock").clone()
    }

    pub fn count(&self, pred: impl Fn(&[String]) -> bool) -> usize {
        self.calls().iter().filter(|argv| pred(argv)).count()
    }

    pub fn is_running(&self, tag: &str) -> bool {
        self.state.lock().expect("state lock").running.contains(tag)
    }

    pub fn is_connected(&self, output: &str, input: &str) -> bool {
        self.state
            .lock()
            .expect("state lock")
            .connections
            .contains(&(output.to_string(), input.to_string()))
    }

    fn broker(&self, state: &mut NetworkState, args: &[String]) -> bool {
        match args {
            [verb, port] if verb == "exists" => state.ports.contains(port),
            [verb, out, inp] if verb == "exists" => {
                state.connections.contains(&(out.clone(), inp.clone()))
            }
            [verb, out, inp, _protocol] if verb == "connect" => {
                if state.ports.contains(out) && state.ports.contains(inp) {
                    state.connections.insert((out.clone(), inp.clone()));
                    true
                } else {
                    false
                }
            }
            [verb, out, inp] if verb == "disconnect" => {
                state.connections.remove(&(out.clone(), inp.clone()))
            }
            _ => false,
        }
    }

    fn launcher(&self, state: &mut NetworkState, args: &[String]) -> bool {
        let value_of = |flag: &str| {
            args.iter()
                .position(|a| a == flag)
                .and_then(|i| args.get(i + 1))
                .cloned()
        };
        if let Some(tag) = value_of("--isrunning") {
            return state.running.contains(&tag);
        }
        if let Some(tag) = value_of("--as") {
            if let Some(ports) = state.published.get(&tag).cloned() {
                state.ports.extend(ports);
            }
            state.running.insert(tag);
            return true;
        }
        if let Some(tag) = value_of("--sigterm").or_else(|| value_of("--kill")) {
            if let Some(ports) = state.published.get(&tag).cloned() {
                for port in ports {
                    state.ports.remove(&port);
                    state
                        .connections
                        .retain(|(out, inp)| *out != port && *inp != port);
                }
            }
            return state.running.remove(&tag);
        }
        false
    }
}

impl CommandRunner for FakeNetwork {
    fn run(&self, argv: &[String]) -> CommandOutcome {
        self.calls.lock().expect("calls lock").push(argv.to_vec());
        let Some((program, args)) = argv.split_first() else {
            return CommandOutcome::SpawnFailed;
        };
        let mut state = self.state.lock().expect("state lock");
        let ok = if *program == self.tools.broker {
            self.broker(&mut state, args)
        } else if *program == self.tools.launcher {
            self.launcher(&mut state, args)
        } else {
            return CommandOutcome::SpawnFailed;
        };
        CommandOutcome::Exited(if ok { 0 } else { 1 })
    }
}

/// Launcher start command (`--cmd`).
pub fn is_launch(argv: &[String]) -> bool {
    argv.get(1).is_some_and(|a| a == "--cmd")
}

/// Broker pairwise connectivity query.
pub fn is_pair_query(argv: &[String]) -> bool {
    argv.len() == 4 && argv[1] == "exists"
}

/// Broker connect command.
pub fn is_connect(argv: &[String]) -> bool {
    argv.get(1).is_some_and(|a| a == "connect")
}

/// Temporary directory holding descriptor and config files.
pub struct TestWorkspace {
    dir: TempDir,
}

impl TestWorkspace {
    pub fn new() -> Result<Self> {
        Ok(Self {
            dir: tempfile::tempdir().context("create temp workspace")?,
        })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn logs_dir(&self) -> PathBuf {
        self.path().join("logs")
    }

    /// Write `contents` to `name` inside the workspace.
    pub fn write(&self, name: &str, contents: &str) -> Result<PathBuf> {
        let path = self.path().join(name);
        fs::write(&path, contents).with_context(|| format!("write {}", path.display()))?;
        Ok(path)
    }

    /// Config that logs into the workspace and uses the given tools.
    pub fn write_config(&self, broker: &str, launcher: &str, timeout_secs: u64) -> Result<PathBuf> {
        let contents = format!(
            "command_timeout_secs = {timeout_secs}\nlog_dir = {:?}\n\n[tools]\nbroker = {broker:?}\nlauncher = {launcher:?}\n",
            self.logs_dir().display().to_string()
        );
        self.write("config.toml", &contents)
    }
}
