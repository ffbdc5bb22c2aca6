//! Deployment and supervision of distributed application modules.
//!
//! An [`Application`](core::model::Application) declares modules (processes
//! placed on named nodes), port connections and the ports/nodes it depends
//! on. The [`Orchestrator`](orchestrator::Orchestrator) drives them through
//! two external tools, a port broker and a remote launcher, with every call
//! bounded by the [`CommandRunner`](io::process::CommandRunner) timeout.
//!
//! - **[`core`]**: pure model, argv builders and status events.
//! - **[`io`]**: processes, command log, configuration, descriptors.
//!
//! The controllers ([`deps`], [`lifecycle`], [`connections`]) are `impl`
//! blocks on the orchestrator and only talk to the outside world through
//! its runner.

pub mod connections;
pub mod core;
pub mod deps;
pub mod exit_codes;
mod fanout;
pub mod io;
pub mod lifecycle;
pub mod logging;
pub mod orchestrator;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
