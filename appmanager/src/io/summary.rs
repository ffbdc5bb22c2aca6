//! Human-readable application summary, written into the command log.

use anyhow::{Context, Result};
use minijinja::{Environment, context};

use crate::core::model::Application;

const SUMMARY_TEMPLATE: &str = include_str!("templates/summary.txt");

/// Render dependencies, modules and connections with their last observed flags.
pub fn render(app: &Application) -> Result<String> {
    let env = Environment::new();
    let rendered = env
        .render_str(SUMMARY_TEMPLATE, context! { app => app })
        .context("render application summary")?;
    Ok(rendered.trim_end().to_string())
}
