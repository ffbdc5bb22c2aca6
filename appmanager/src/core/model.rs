//! In-memory application model.
//!
//! The model owns declarative configuration (modules, connections,
//! dependencies) plus the last observed status flags. It never talks to the
//! outside world: controllers read it, run commands, and write the observed
//! flags back.

use std::path::PathBuf;

use serde::Serialize;

/// Transport used when a connection does not name one.
pub const DEFAULT_PROTOCOL: &str = "tcp";

/// A deployable executable instance, controlled remotely through its tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Module {
    pub name: String,
    /// Opaque launch arguments, appended to the executable name.
    pub parameters: String,
    /// Execution node, stored without a leading separator.
    pub node: String,
    /// Unique instance identifier used for status/stop/kill.
    pub tag: String,
    pub workdir: Option<String>,
    /// Console node for stdio redirection, if any.
    pub stdio_node: Option<String>,
    /// Keep the console open after the module exits.
    pub hold: bool,
    /// Last observed status; refreshed only by an explicit status check.
    pub running: bool,
}

impl Module {
    pub fn new(
        name: impl Into<String>,
        parameters: impl Into<String>,
        node: impl Into<String>,
        tag: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            parameters: parameters.into(),
            node: node.into(),
            tag: tag.into(),
            workdir: None,
            stdio_node: None,
            hold: false,
            running: false,
        }
    }

    /// Set the working directory. Empty or blank values mean "none".
    pub fn with_workdir(mut self, workdir: impl Into<String>) -> Self {
        self.workdir = non_blank(workdir.into());
        self
    }

    /// Redirect stdio to a console on `node`. Empty values mean "none".
    pub fn with_stdio(mut self, node: impl Into<String>, hold: bool) -> Self {
        self.stdio_node = non_blank(node.into());
        self.hold = hold;
        self
    }

    /// Working directory, if one is set and non-blank.
    pub fn effective_workdir(&self) -> Option<&str> {
        self.workdir.as_deref().filter(|dir| !dir.trim().is_empty())
    }

    /// Console node, if one is set and non-blank.
    pub fn effective_stdio_node(&self) -> Option<&str> {
        self.stdio_node
            .as_deref()
            .filter(|node| !node.trim().is_empty())
    }
}

/// A declared directed link between two ports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Connection {
    pub output: String,
    pub input: String,
    pub protocol: String,
    pub output_exists: bool,
    pub input_exists: bool,
    /// Only meaningful when both endpoints exist.
    pub connected: bool,
}

impl Connection {
    /// Build a connection; a missing or blank protocol falls back to [`DEFAULT_PROTOCOL`].
    pub fn new(output: impl Into<String>, input: impl Into<String>, protocol: Option<&str>) -> Self {
        let protocol = protocol
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .unwrap_or(DEFAULT_PROTOCOL);
        Self {
            output: output.into(),
            input: input.into(),
            protocol: protocol.to_string(),
            output_exists: false,
            input_exists: false,
            connected: false,
        }
    }

    pub fn endpoints_exist(&self) -> bool {
        self.output_exists && self.input_exists
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DependencyKind {
    Port,
    Node,
}

/// A port or node that must be reachable before the application is deployable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Dependency {
    pub kind: DependencyKind,
    pub name: String,
    pub satisfied: bool,
}

impl Dependency {
    fn new(kind: DependencyKind, name: String) -> Self {
        Self {
            kind,
            name,
            satisfied: false,
        }
    }

    /// Name handed to the broker's existence query (nodes get a `/` prefix).
    pub fn query_name(&self) -> String {
        match self.kind {
            DependencyKind::Port => self.name.clone(),
            DependencyKind::Node => super::argv::node_address(&self.name),
        }
    }
}

/// One deployable application. Every instance owns its own records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Application {
    pub name: String,
    /// Explicit command log location; `None` uses the configured log dir.
    pub log_file: Option<PathBuf>,
    pub modules: Vec<Module>,
    pub connections: Vec<Connection>,
    pub port_dependencies: Vec<Dependency>,
    pub node_dependencies: Vec<Dependency>,
}

impl Application {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            log_file: None,
            modules: Vec::new(),
            connections: Vec::new(),
            port_dependencies: Vec::new(),
            node_dependencies: Vec::new(),
        }
    }

    /// Register a port dependency. Returns `false` if it was already declared.
    pub fn push_port_dependency(&mut self, port: impl Into<String>) -> bool {
        push_unique(
            &mut self.port_dependencies,
            DependencyKind::Port,
            port.into(),
        )
    }

    /// Register a node dependency. Returns `false` if it was already declared.
    pub fn push_node_dependency(&mut self, node: impl Into<String>) -> bool {
        push_unique(
            &mut self.node_dependencies,
            DependencyKind::Node,
            node.into(),
        )
    }

    /// Append a module; its execution and console nodes become node dependencies.
    pub fn push_module(&mut self, module: Module) {
        self.push_node_dependency(module.node.clone());
        if let Some(stdio) = module.effective_stdio_node() {
            self.push_node_dependency(stdio.to_string());
        }
        self.modules.push(module);
    }

    pub fn push_connection(&mut self, connection: Connection) {
        self.connections.push(connection);
    }

    /// Port dependencies first, then node dependencies, each in insertion order.
    pub fn dependencies(&self) -> impl Iterator<Item = &Dependency> {
        self.port_dependencies
            .iter()
            .chain(self.node_dependencies.iter())
    }

    pub fn dependencies_mut(&mut self) -> impl Iterator<Item = &mut Dependency> {
        self.port_dependencies
            .iter_mut()
            .chain(self.node_dependencies.iter_mut())
    }

    /// Logical AND of the last observed dependency flags.
    pub fn dependencies_satisfied(&self) -> bool {
        self.dependencies().all(|dep| dep.satisfied)
    }

    pub fn module(&self, name: &str) -> Option<&Module> {
        self.modules.iter().find(|m| m.name == name)
    }

    pub fn all_running(&self) -> bool {
        self.modules.iter().all(|m| m.running)
    }

    pub fn all_connected(&self) -> bool {
        self.connections.iter().all(|c| c.connected)
    }
}

fn push_unique(list: &mut Vec<Dependency>, kind: DependencyKind, name: String) -> bool {
    if list.iter().any(|dep| dep.name == name) {
        return false;
    }
    list.push(Dependency::new(kind, name));
    true
}

fn non_blank(value: String) -> Option<String> {
    if value.trim().is_empty() {
        None
    } else {
        Some(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_dependencies_collapse() {
        let mut app = Application::new("demo");
        assert!(app.push_port_dependency("/cam/left"));
        assert!(!app.push_port_dependency("/cam/left"));
        assert!(app.push_node_dependency("pc104"));
        assert!(!app.push_node_dependency("pc104"));

        assert_eq!(app.port_dependencies.len(), 1);
        assert_eq!(app.node_dependencies.len(), 1);
    }

    #[test]
    fn dependencies_keep_insertion_order() {
        let mut app = Application::new("demo");
        app.push_port_dependency("/b");
        app.push_port_dependency("/a");
        app.push_node_dependency("z");
        app.push_node_dependency("y");

        let names: Vec<&str> = app.dependencies().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["/b", "/a", "z", "y"]);
    }

    #[test]
    fn modules_register_their_nodes() {
        let mut app = Application::new("demo");
        app.push_module(Module::new("viewer", "", "pc1", "v1").with_stdio("console", true));
        app.push_module(Module::new("grabber", "", "pc1", "g1"));

        let nodes: Vec<&str> = app
            .node_dependencies
            .iter()
            .map(|d| d.name.as_str())
            .collect();
        assert_eq!(nodes, vec!["pc1", "console"]);
    }

    #[test]
    fn blank_workdir_and_stdio_normalize_to_none() {
        let module = Module::new("m", "", "n", "t")
            .with_workdir("   ")
            .with_stdio("", false);
        assert_eq!(module.workdir, None);
        assert_eq!(module.stdio_node, None);

        let mut raw = Module::new("m", "", "n", "t");
        raw.workdir = Some(String::new());
        assert_eq!(raw.effective_workdir(), None);
    }

    #[test]
    fn connection_protocol_defaults_to_tcp() {
        assert_eq!(Connection::new("/a", "/b", None).protocol, "tcp");
        assert_eq!(Connection::new("/a", "/b", Some(" ")).protocol, "tcp");
        assert_eq!(Connection::new("/a", "/b", Some("udp")).protocol, "udp");
    }

    #[test]
    fn node_dependency_queries_with_separator() {
        let mut app = Application::new("demo");
        app.push_node_dependency("pc104");
        app.push_port_dependency("/port");
        let queries: Vec<String> = app.dependencies().map(Dependency::query_name).collect();
        assert_eq!(queries, vec!["/port".to_string(), "/pc104".to_string()]);
    }

    #[test]
    fn applications_do_not_share_dependencies() {
        let mut first = Application::new("first");
        let second = Application::new("second");
        first.push_port_dependency("/only/first");

        assert_eq!(first.port_dependencies.len(), 1);
        assert!(second.port_dependencies.is_empty());
    }

    #[test]
    fn aggregate_flag_is_and_of_dependencies() {
        let mut app = Application::new("demo");
        assert!(app.dependencies_satisfied());
        app.push_port_dependency("/a");
        app.push_node_dependency("n");
        app.port_dependencies[0].satisfied = true;
        assert!(!app.dependencies_satisfied());
        app.node_dependencies[0].satisfied = true;
        assert!(app.dependencies_satisfied());
    }
}
