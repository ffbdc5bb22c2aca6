//! Status events published whenever an observed flag is written.
//!
//! Presentation layers subscribe through [`StatusObserver`] instead of
//! polling the model; the controllers stay unaware of how status is shown.

use std::sync::mpsc::Sender;

use serde::Serialize;

use super::model::{Connection, Dependency, DependencyKind, Module};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StatusEvent {
    Module {
        name: String,
        tag: String,
        running: bool,
    },
    Connection {
        output: String,
        input: String,
        output_exists: bool,
        input_exists: bool,
        connected: bool,
    },
    Dependency {
        dependency: DependencyKind,
        name: String,
        satisfied: bool,
    },
}

impl From<&Module> for StatusEvent {
    fn from(module: &Module) -> Self {
        StatusEvent::Module {
            name: module.name.clone(),
            tag: module.tag.clone(),
            running: module.running,
        }
    }
}

impl From<&Connection> for StatusEvent {
    fn from(conn: &Connection) -> Self {
        StatusEvent::Connection {
            output: conn.output.clone(),
            input: conn.input.clone(),
            output_exists: conn.output_exists,
            input_exists: conn.input_exists,
            connected: conn.connected,
        }
    }
}

impl From<&Dependency> for StatusEvent {
    fn from(dep: &Dependency) -> Self {
        StatusEvent::Dependency {
            dependency: dep.kind,
            name: dep.name.clone(),
            satisfied: dep.satisfied,
        }
    }
}

/// Receives every status update. Called from worker threads when fan-out is enabled.
pub trait StatusObserver: Send + Sync {
    fn notify(&self, event: &StatusEvent);
}

impl<F> StatusObserver for F
where
    F: Fn(&StatusEvent) + Send + Sync,
{
    fn notify(&self, event: &StatusEvent) {
        self(event);
    }
}

/// Forwards events into an mpsc channel.
#[derive(Debug, Clone)]
pub struct ChannelObserver {
    tx: Sender<StatusEvent>,
}

impl ChannelObserver {
    pub fn new(tx: Sender<StatusEvent>) -> Self {
        Self { tx }
    }
}

impl StatusObserver for ChannelObserver {
    fn notify(&self, event: &StatusEvent) {
        // A dropped receiver just means nobody is listening anymore.
        let _ = self.tx.send(event.clone());
    }
}
