//! Application manager command line.
//!
//! Loads an application descriptor, then checks dependencies, starts,
//! stops or kills its modules and connects or disconnects its ports through
//! the configured broker and launcher tools.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use appmanager::core::model::{Application, Module};
use appmanager::core::params::split_parameters;
use appmanager::core::status::StatusEvent;
use appmanager::exit_codes;
use appmanager::io::command_log::{CommandLog, FileLog, LogRecord};
use appmanager::io::config::{ManagerConfig, load_config, write_config};
use appmanager::io::descriptor::{load_descriptor, resolve_descriptor_path};
use appmanager::io::process::ProcessRunner;
use appmanager::io::summary;
use appmanager::logging;
use appmanager::orchestrator::Orchestrator;
use clap::{Args, Parser, Subcommand};
use tracing::{debug, info};

#[derive(Parser)]
#[command(
    name = "appmanager",
    version,
    about = "Deploy and supervise distributed application modules"
)]
struct Cli {
    /// Manager configuration (TOML). Defaults apply when the file is missing.
    #[arg(long, global = true, default_value = "appmanager.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args)]
struct AppArgs {
    /// Application descriptor (TOML).
    app: PathBuf,
    /// Print the application state as JSON instead of a summary.
    #[arg(long)]
    json: bool,
}

#[derive(Args)]
struct TargetArgs {
    #[command(flatten)]
    app: AppArgs,
    /// Only act on this module.
    #[arg(long)]
    module: Option<String>,
}

#[derive(Subcommand)]
enum Command {
    /// Write a default configuration file.
    InitConfig {
        /// Overwrite an existing file.
        #[arg(short, long)]
        force: bool,
    },
    /// Print the application summary without running any command.
    Show(AppArgs),
    /// Break a module's launch parameters into flags and values.
    Params {
        /// Application descriptor (TOML).
        app: PathBuf,
        /// Module name.
        module: String,
    },
    /// Check port and node dependencies.
    CheckDeps(AppArgs),
    /// Check dependencies, module status and connections.
    Status(AppArgs),
    /// Start modules that are not already running.
    Start(TargetArgs),
    /// Send SIGTERM to modules.
    Stop(TargetArgs),
    /// Kill modules (signal 9).
    Kill(TargetArgs),
    /// Connect every declared connection whose endpoints exist.
    Connect(AppArgs),
    /// Disconnect every declared connection whose endpoints exist.
    Disconnect(AppArgs),
}

#[derive(Clone, Copy)]
enum Action {
    Start,
    Stop,
    Kill,
}

fn main() {
    logging::init();
    match run() {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("{:#}", err);
            std::process::exit(exit_codes::INVALID);
        }
    }
}

fn run() -> Result<i32> {
    run_with(Cli::parse())
}

fn run_with(cli: Cli) -> Result<i32> {
    let config = || load_config(&cli.config);
    match &cli.command {
        Command::InitConfig { force } => cmd_init_config(&cli.config, *force),
        Command::Show(args) => cmd_show(&config()?, args),
        Command::Params { app, module } => cmd_params(&config()?, app, module),
        Command::CheckDeps(args) => cmd_check_deps(&config()?, args),
        Command::Status(args) => cmd_status(&config()?, args),
        Command::Start(args) => cmd_modules(&config()?, args, Action::Start),
        Command::Stop(args) => cmd_modules(&config()?, args, Action::Stop),
        Command::Kill(args) => cmd_modules(&config()?, args, Action::Kill),
        Command::Connect(args) => cmd_connections(&config()?, args, true),
        Command::Disconnect(args) => cmd_connections(&config()?, args, false),
    }
}

fn cmd_init_config(path: &Path, force: bool) -> Result<i32> {
    if path.exists() && !force {
        bail!("{} already exists (use --force to overwrite)", path.display());
    }
    write_config(path, &ManagerConfig::default())?;
    println!("wrote {}", path.display());
    Ok(exit_codes::OK)
}

fn cmd_show(config: &ManagerConfig, args: &AppArgs) -> Result<i32> {
    let app = load_application(config, &args.app)?;
    report(&app, args.json)?;
    Ok(exit_codes::OK)
}

fn cmd_params(config: &ManagerConfig, app: &Path, module: &str) -> Result<i32> {
    let app = load_application(config, app)?;
    let module = app
        .module(module)
        .with_context(|| format!("unknown module '{module}'"))?;
    for param in split_parameters(&module.parameters) {
        println!("{param}");
    }
    Ok(exit_codes::OK)
}

fn cmd_check_deps(config: &ManagerConfig, args: &AppArgs) -> Result<i32> {
    let mut app = load_application(config, &args.app)?;
    let orch = orchestrator(config, &app)?;
    let satisfied = orch.check_dependencies(&mut app);
    report(&app, args.json)?;
    Ok(if satisfied {
        exit_codes::OK
    } else {
        exit_codes::UNSATISFIED
    })
}

fn cmd_status(config: &ManagerConfig, args: &AppArgs) -> Result<i32> {
    let mut app = load_application(config, &args.app)?;
    let orch = orchestrator(config, &app)?;
    orch.check_dependencies(&mut app);
    orch.update(&mut app);
    report(&app, args.json)?;
    Ok(if app.all_running() && app.all_connected() {
        exit_codes::OK
    } else {
        exit_codes::DEGRADED
    })
}

fn cmd_modules(config: &ManagerConfig, args: &TargetArgs, action: Action) -> Result<i32> {
    let mut app = load_application(config, &args.app.app)?;
    let orch = orchestrator(config, &app)?;
    let modules = selected_modules(&mut app, args.module.as_deref())?;

    let reached = match action {
        Action::Start => {
            let outcomes = orch.start_all(modules);
            outcomes.iter().all(|outcome| outcome.running())
        }
        Action::Stop | Action::Kill => {
            if matches!(action, Action::Stop) {
                orch.stop_all(modules);
            } else {
                orch.kill_all(modules);
            }
            orch.check_all(modules);
            modules.iter().all(|m| !m.running)
        }
    };

    report(&app, args.app.json)?;
    Ok(if reached {
        exit_codes::OK
    } else {
        exit_codes::DEGRADED
    })
}

fn cmd_connections(config: &ManagerConfig, args: &AppArgs, connect: bool) -> Result<i32> {
    let mut app = load_application(config, &args.app)?;
    let orch = orchestrator(config, &app)?;
    let reached = if connect {
        orch.connect_all(&mut app.connections);
        app.all_connected()
    } else {
        orch.disconnect_all(&mut app.connections);
        app.connections.iter().all(|c| !c.connected)
    };
    report(&app, args.json)?;
    Ok(if reached {
        exit_codes::OK
    } else {
        exit_codes::DEGRADED
    })
}

fn load_application(config: &ManagerConfig, path: &Path) -> Result<Application> {
    let path = resolve_descriptor_path(path, &config.search_dirs)?;
    let loaded = load_descriptor(&path)?;
    debug!(
        path = %path.display(),
        diagnostics = loaded.diagnostics.len(),
        "loaded application descriptor"
    );
    Ok(loaded.application)
}

/// Open the command log and wire the process runner for `app`.
fn orchestrator(config: &ManagerConfig, app: &Application) -> Result<Orchestrator<ProcessRunner>> {
    let log_path = app
        .log_file
        .clone()
        .unwrap_or_else(|| config.log_path(&app.name));
    let log = Arc::new(FileLog::open(&log_path, &app.name)?);
    log.record(&LogRecord::Note(summary::render(app)?));
    let runner = ProcessRunner::new(config.command_timeout(), log.clone());
    info!(
        log = %log.path().display(),
        timeout_secs = runner.timeout().as_secs(),
        "logging commands"
    );
    Ok(Orchestrator::new(runner, config.tools.clone())
        .with_parallelism(config.parallelism)
        .with_observer(trace_status))
}

fn trace_status(event: &StatusEvent) {
    debug!(?event, "status update");
}

fn selected_modules<'a>(app: &'a mut Application, name: Option<&str>) -> Result<&'a mut [Module]> {
    match name {
        None => Ok(&mut app.modules[..]),
        Some(name) => {
            let index = app
                .modules
                .iter()
                .position(|m| m.name == name)
                .with_context(|| format!("unknown module '{name}'"))?;
            Ok(&mut app.modules[index..=index])
        }
    }
}

fn report(app: &Application, json: bool) -> Result<()> {
    if json {
        let payload = serde_json::to_string_pretty(app).context("serialize application")?;
        println!("{payload}");
    } else {
        println!("{}", summary::render(app)?);
    }
    Ok(())
}
