//! Application descriptor loader (TOML).
//!
//! Populates an [`Application`] once, before any orchestration call, and
//! normalizes the fields the controllers rely on: node names without a
//! leading separator, parameters without stray enclosing quotes, and no
//! blank working directories.

use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::core::model::{Application, Connection, Module};
use crate::core::params::{QuoteIssue, strip_enclosing_quotes};

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawDescriptor {
    name: String,
    #[serde(default)]
    log_file: Option<PathBuf>,
    #[serde(default)]
    dependencies: RawDependencies,
    #[serde(default, rename = "module")]
    modules: Vec<RawModule>,
    #[serde(default, rename = "connection")]
    connections: Vec<RawConnection>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawDependencies {
    #[serde(default)]
    ports: Vec<String>,
    #[serde(default)]
    nodes: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawModule {
    name: String,
    #[serde(default)]
    parameters: String,
    node: String,
    tag: String,
    #[serde(default)]
    workdir: Option<String>,
    #[serde(default)]
    stdio: Option<String>,
    #[serde(default)]
    hold: bool,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawConnection {
    from: String,
    to: String,
    #[serde(default)]
    protocol: Option<String>,
}

/// Something the loader corrected or could not correct.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Diagnostic {
    /// A leading `/` was removed from a node name.
    LeadingSeparator { field: &'static str, value: String },
    /// Quote handling on a module's parameter string.
    Quotes { module: String, issue: QuoteIssue },
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::LeadingSeparator { field, value } => {
                write!(f, "{field} '{value}' should not start with '/', removed it")
            }
            Diagnostic::Quotes { module, issue } => {
                write!(f, "parameters of module '{module}': {issue}")
            }
        }
    }
}

/// A populated application plus everything the loader had to say about it.
#[derive(Debug, Clone)]
pub struct LoadedDescriptor {
    pub application: Application,
    pub diagnostics: Vec<Diagnostic>,
}

/// Find a descriptor: `path` itself, else the first `search_dir/path` that exists.
pub fn resolve_descriptor_path(path: &Path, search_dirs: &[PathBuf]) -> Result<PathBuf> {
    if path.is_file() {
        return Ok(path.to_path_buf());
    }
    let mut tried = vec![path.display().to_string()];
    for dir in search_dirs {
        let candidate = dir.join(path);
        debug!(candidate = %candidate.display(), "trying descriptor search dir");
        if candidate.is_file() {
            return Ok(candidate);
        }
        tried.push(candidate.display().to_string());
    }
    bail!("application descriptor not found (tried {})", tried.join(", "))
}

/// Read and parse a descriptor file.
pub fn load_descriptor(path: &Path) -> Result<LoadedDescriptor> {
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    parse_descriptor(&contents).with_context(|| format!("parse {}", path.display()))
}

/// Parse descriptor text into a normalized application.
pub fn parse_descriptor(contents: &str) -> Result<LoadedDescriptor> {
    let raw: RawDescriptor = toml::from_str(contents).context("parse descriptor toml")?;
    if raw.name.trim().is_empty() {
        bail!("application name must not be empty");
    }

    let mut diagnostics = Vec::new();
    let mut app = Application::new(raw.name.trim());
    app.log_file = raw.log_file;

    for port in raw.dependencies.ports {
        app.push_port_dependency(port);
    }
    for node in raw.dependencies.nodes {
        let node = strip_separator("dependency node", &node, &mut diagnostics);
        app.push_node_dependency(node);
    }

    let mut placements: HashMap<(String, String), String> = HashMap::new();
    for raw_module in raw.modules {
        let module = build_module(raw_module, &mut diagnostics)?;
        if app.module(&module.name).is_some() {
            bail!("module '{}' is declared more than once", module.name);
        }
        let placement = (module.node.clone(), module.tag.clone());
        if let Some(first) = placements.get(&placement) {
            bail!(
                "modules '{}' and '{}' share tag '{}' on node '{}'",
                first,
                module.name,
                module.tag,
                module.node
            );
        }
        placements.insert(placement, module.name.clone());
        app.push_module(module);
    }

    for conn in raw.connections {
        app.push_connection(Connection::new(conn.from, conn.to, conn.protocol.as_deref()));
    }

    for diagnostic in &diagnostics {
        warn!(app = %app.name, "{diagnostic}");
    }
    Ok(LoadedDescriptor {
        application: app,
        diagnostics,
    })
}

fn build_module(raw: RawModule, diagnostics: &mut Vec<Diagnostic>) -> Result<Module> {
    if raw.name.trim().is_empty() {
        bail!("module name must not be empty");
    }
    if raw.tag.trim().is_empty() {
        bail!("module '{}' has an empty tag", raw.name);
    }
    let node = strip_separator("node", &raw.node, diagnostics);
    if node.is_empty() {
        bail!("module '{}' has an empty node", raw.name);
    }

    let unquoted = strip_enclosing_quotes(&raw.parameters);
    if let Some(issue) = unquoted.issue {
        diagnostics.push(Diagnostic::Quotes {
            module: raw.name.clone(),
            issue,
        });
    }
    let parameters = unquoted.value.to_string();

    let mut module = Module::new(raw.name, parameters, node, raw.tag.trim());
    if let Some(workdir) = raw.workdir {
        module = module.with_workdir(workdir);
    }
    if let Some(stdio) = raw.stdio.filter(|s| !s.trim().eq_ignore_ascii_case("none")) {
        let stdio = strip_separator("stdio node", &stdio, diagnostics);
        module = module.with_stdio(stdio, raw.hold);
    }
    Ok(module)
}

fn strip_separator(field: &'static str, value: &str, diagnostics: &mut Vec<Diagnostic>) -> String {
    let value = value.trim();
    match value.strip_prefix('/') {
        Some(stripped) => {
            diagnostics.push(Diagnostic::LeadingSeparator {
                field,
                value: value.to_string(),
            });
            stripped.to_string()
        }
        None => value.to_string(),
    }
}
