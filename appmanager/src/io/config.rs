//! Manager configuration (TOML).

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};

use crate::core::argv::Tools;
use crate::io::process::DEFAULT_TIMEOUT;

/// Manager configuration.
///
/// Intended to be edited by humans; missing fields take the defaults below.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ManagerConfig {
    /// Absolute deadline for each external command, in seconds.
    pub command_timeout_secs: u64,

    /// Worker threads used for module status and port checks.
    pub parallelism: usize,

    /// Directory for `<application>.log`. Defaults to the system temp dir.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_dir: Option<PathBuf>,

    /// Extra directories searched for application descriptors.
    pub search_dirs: Vec<PathBuf>,

    pub tools: Tools,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            command_timeout_secs: DEFAULT_TIMEOUT.as_secs(),
            parallelism: 1,
            log_dir: None,
            search_dirs: Vec::new(),
            tools: Tools::default(),
        }
    }
}

impl ManagerConfig {
    pub fn validate(&self) -> Result<()> {
        if self.command_timeout_secs == 0 {
            return Err(anyhow!("command_timeout_secs must be > 0"));
        }
        if self.parallelism == 0 {
            return Err(anyhow!("parallelism must be > 0"));
        }
        if self.tools.broker.trim().is_empty() {
            return Err(anyhow!("tools.broker must not be empty"));
        }
        if self.tools.launcher.trim().is_empty() {
            return Err(anyhow!("tools.launcher must not be empty"));
        }
        Ok(())
    }

    pub fn command_timeout(&self) -> Duration {
        Duration::from_secs(self.command_timeout_secs)
    }

    /// Command log location for an application without an explicit log file.
    pub fn log_path(&self, app_name: &str) -> PathBuf {
        let dir = self.log_dir.clone().unwrap_or_else(std::env::temp_dir);
        dir.join(format!("{app_name}.log"))
    }
}

/// Load config from a TOML file.
///
/// If the file is missing, returns `ManagerConfig::default()`.
pub fn load_config(path: &Path) -> Result<ManagerConfig> {
    if !path.exists() {
        let cfg = ManagerConfig::default();
        cfg.validate()?;
        return Ok(cfg);
    }
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let cfg: ManagerConfig =
        toml::from_str(&contents).with_context(|| format!("parse {}", path.display()))?;
    cfg.validate()
        .with_context(|| format!("invalid config {}", path.display()))?;
    Ok(cfg)
}

/// Atomically write config to disk (temp file + rename).
pub fn write_config(path: &Path, cfg: &ManagerConfig) -> Result<()> {
    cfg.validate()?;
    let mut buf = toml::to_string_pretty(cfg).context("serialize config toml")?;
    buf.push('\n');
    write_atomic(path, &buf)
}

fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    let parent = path
        .parent()
        .with_context(|| format!("config path missing parent {}", path.display()))?;
    if !parent.as_os_str().is_empty() {
        fs::create_dir_all(parent)
            .with_context(|| format!("create directory {}", parent.display()))?;
    }
    let tmp_path = path.with_extension("toml.tmp");
    fs::write(&tmp_path, contents)
        .with_context(|| format!("write temp config {}", tmp_path.display()))?;
    fs::rename(&tmp_path, path).with_context(|| format!("replace config {}", path.display()))?;
    Ok(())
}
