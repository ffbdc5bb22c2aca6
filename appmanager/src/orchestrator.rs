//! Shared context for the dependency, lifecycle and connection controllers.
//!
//! The controllers themselves live in [`crate::deps`], [`crate::lifecycle`]
//! and [`crate::connections`] as `impl` blocks on [`Orchestrator`]. They hold
//! no state of their own: every observed flag is written back to the
//! [`Application`] and announced to the registered observers.

use std::sync::Arc;

use tracing::instrument;

use crate::core::argv::Tools;
use crate::core::model::Application;
use crate::core::status::{StatusEvent, StatusObserver};
use crate::io::process::{CommandOutcome, CommandRunner};

pub struct Orchestrator<R> {
    runner: R,
    tools: Tools,
    observers: Vec<Arc<dyn StatusObserver>>,
    parallelism: usize,
}

impl<R: CommandRunner> Orchestrator<R> {
    pub fn new(runner: R, tools: Tools) -> Self {
        Self {
            runner,
            tools,
            observers: Vec::new(),
            parallelism: 1,
        }
    }

    /// Allow up to `workers` concurrent status/port checks (minimum 1).
    pub fn with_parallelism(mut self, workers: usize) -> Self {
        self.parallelism = workers.max(1);
        self
    }

    pub fn with_observer(mut self, observer: impl StatusObserver + 'static) -> Self {
        self.observers.push(Arc::new(observer));
        self
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }

    pub fn tools(&self) -> &Tools {
        &self.tools
    }

    pub fn parallelism(&self) -> usize {
        self.parallelism
    }

    /// Refresh every module status, then every connection.
    #[instrument(skip_all, fields(app = %app.name))]
    pub fn update(&self, app: &mut Application) {
        self.check_all(&mut app.modules);
        self.check_all_ports(&mut app.connections);
    }

    pub(crate) fn run(&self, argv: &[String]) -> CommandOutcome {
        self.runner.run(argv)
    }

    pub(crate) fn notify(&self, event: StatusEvent) {
        for observer in &self.observers {
            observer.notify(&event);
        }
    }
}
