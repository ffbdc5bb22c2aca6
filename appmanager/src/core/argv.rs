//! Argument vectors for the port broker and the remote launcher.
//!
//! Every external interaction is an explicit argv; nothing here is ever
//! passed through a shell, so no quoting is applied.

use serde::{Deserialize, Serialize};

use super::model::Module;

/// Executables used for broker queries and remote process control.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Tools {
    /// Port broker (`exists`, `connect`, `disconnect`).
    pub broker: String,
    /// Remote process launcher (`--on`, `--cmd`, `--isrunning`, ...).
    pub launcher: String,
}

impl Default for Tools {
    fn default() -> Self {
        Self {
            broker: "yarp".to_string(),
            launcher: "yarprun".to_string(),
        }
    }
}

/// Address a node as `/<node>`, adding the separator exactly once.
pub fn node_address(node: &str) -> String {
    format!("/{}", node.trim_start_matches('/'))
}

pub fn port_exists(tools: &Tools, port: &str) -> Vec<String> {
    vec![tools.broker.clone(), "exists".to_string(), port.to_string()]
}

/// Pairwise connectivity query.
pub fn ports_connected(tools: &Tools, output: &str, input: &str) -> Vec<String> {
    vec![
        tools.broker.clone(),
        "exists".to_string(),
        output.to_string(),
        input.to_string(),
    ]
}

pub fn connect(tools: &Tools, output: &str, input: &str, protocol: &str) -> Vec<String> {
    vec![
        tools.broker.clone(),
        "connect".to_string(),
        output.to_string(),
        input.to_string(),
        protocol.to_string(),
    ]
}

pub fn disconnect(tools: &Tools, output: &str, input: &str) -> Vec<String> {
    vec![
        tools.broker.clone(),
        "disconnect".to_string(),
        output.to_string(),
        input.to_string(),
    ]
}

pub fn is_running(tools: &Tools, module: &Module) -> Vec<String> {
    vec![
        tools.launcher.clone(),
        "--on".to_string(),
        node_address(&module.node),
        "--isrunning".to_string(),
        module.tag.clone(),
    ]
}

/// Command line run on the remote node: executable name plus its arguments.
pub fn command_line(module: &Module) -> String {
    let parameters = module.parameters.trim();
    if parameters.is_empty() {
        module.name.clone()
    } else {
        format!("{} {}", module.name, parameters)
    }
}

/// Launch command: `--cmd`, `--on`, `--as`, then the optional
/// `--stdio [--hold]` and `--workdir` flags.
pub fn launch(tools: &Tools, module: &Module) -> Vec<String> {
    let mut argv = vec![
        tools.launcher.clone(),
        "--cmd".to_string(),
        command_line(module),
        "--on".to_string(),
        node_address(&module.node),
        "--as".to_string(),
        module.tag.clone(),
    ];
    if let Some(stdio) = module.effective_stdio_node() {
        argv.push("--stdio".to_string());
        argv.push(node_address(stdio));
        if module.hold {
            argv.push("--hold".to_string());
        }
    }
    if let Some(workdir) = module.effective_workdir() {
        argv.push("--workdir".to_string());
        argv.push(workdir.to_string());
    }
    argv
}

pub fn sigterm(tools: &Tools, module: &Module) -> Vec<String> {
    vec![
        tools.launcher.clone(),
        "--on".to_string(),
        node_address(&module.node),
        "--sigterm".to_string(),
        module.tag.clone(),
    ]
}

pub fn kill(tools: &Tools, module: &Module) -> Vec<String> {
    vec![
        tools.launcher.clone(),
        "--on".to_string(),
        node_address(&module.node),
        "--kill".to_string(),
        module.tag.clone(),
        "9".to_string(),
    ]
}
