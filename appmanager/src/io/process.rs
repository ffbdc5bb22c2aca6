//! Command runner: the single chokepoint for external commands.
//!
//! Every broker query and launcher call goes through a [`CommandRunner`].
//! The process implementation enforces an absolute deadline per command and
//! kills the child when it elapses, so no caller ever blocks longer than
//! the configured timeout.

use std::process::{Command, Stdio};
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, instrument, warn};
use wait_timeout::ChildExt;

use crate::io::command_log::{CommandLog, LogRecord};

/// Default absolute deadline for one external command.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(240);

/// Exit code reported for commands that timed out or never started.
pub const FAILURE_CODE: i32 = 1;

/// How an external command ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandOutcome {
    /// The process exited on its own. Signal deaths map to [`FAILURE_CODE`].
    Exited(i32),
    /// The deadline elapsed and the process was killed.
    TimedOut,
    /// The process could not be started or waited on.
    SpawnFailed,
}

impl CommandOutcome {
    /// Exit code view: the real code, or [`FAILURE_CODE`].
    pub fn code(self) -> i32 {
        match self {
            CommandOutcome::Exited(code) => code,
            CommandOutcome::TimedOut | CommandOutcome::SpawnFailed => FAILURE_CODE,
        }
    }

    pub fn success(self) -> bool {
        self.code() == 0
    }

    pub fn timed_out(self) -> bool {
        self == CommandOutcome::TimedOut
    }
}

/// Executes a fully formed argument vector and reports how it ended.
///
/// Implementations must never block longer than their configured timeout and
/// never panic; failures are reported through [`CommandOutcome`].
pub trait CommandRunner: Send + Sync {
    fn run(&self, argv: &[String]) -> CommandOutcome;
}

/// Runs commands as local child processes with a hard deadline.
pub struct ProcessRunner {
    timeout: Duration,
    log: Arc<dyn CommandLog>,
}

impl ProcessRunner {
    pub fn new(timeout: Duration, log: Arc<dyn CommandLog>) -> Self {
        Self { timeout, log }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

impl CommandRunner for ProcessRunner {
    #[instrument(skip_all, fields(program = argv.first().map(String::as_str), timeout_ms = self.timeout.as_millis() as u64))]
    fn run(&self, argv: &[String]) -> CommandOutcome {
        self.log.record(&LogRecord::Invoked {
            argv: argv.to_vec(),
        });

        let Some((program, args)) = argv.split_first() else {
            error!("refusing to run an empty command");
            self.log.record(&LogRecord::SpawnFailed {
                argv: Vec::new(),
                error: "empty command".to_string(),
            });
            return CommandOutcome::SpawnFailed;
        };

        // Output is discarded: launched helpers may leave daemons holding
        // inherited pipes open, which would outlive the deadline.
        let mut cmd = Command::new(program);
        cmd.args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null());

        debug!("spawning child process");
        let mut child = match cmd.spawn() {
            Ok(c) => c,
            Err(e) => {
                error!(err = %e, "failed to spawn command");
                self.log.record(&LogRecord::SpawnFailed {
                    argv: argv.to_vec(),
                    error: e.to_string(),
                });
                return CommandOutcome::SpawnFailed;
            }
        };

        match child.wait_timeout(self.timeout) {
            Ok(Some(status)) => {
                let code = status.code().unwrap_or(FAILURE_CODE);
                debug!(exit_code = code, "command finished");
                self.log.record(&LogRecord::Exited {
                    argv: argv.to_vec(),
                    code,
                });
                CommandOutcome::Exited(code)
            }
            Ok(None) => {
                warn!(timeout_secs = self.timeout.as_secs(), "command timed out, killing");
                if let Err(e) = child.kill() {
                    warn!(err = %e, "failed to kill timed out command");
                }
                if let Err(e) = child.wait() {
                    warn!(err = %e, "failed to reap killed command");
                }
                self.log.record(&LogRecord::TimedOut {
                    argv: argv.to_vec(),
                    timeout: self.timeout,
                });
                CommandOutcome::TimedOut
            }
            Err(e) => {
                error!(err = %e, "failed to wait for command");
                let _ = child.kill();
                let _ = child.wait();
                self.log.record(&LogRecord::SpawnFailed {
                    argv: argv.to_vec(),
                    error: e.to_string(),
                });
                CommandOutcome::SpawnFailed
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::command_log::{MemoryLog, NullLog};
    use std::time::Instant;

    fn argv(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn outcome_codes() {
        assert_eq!(CommandOutcome::Exited(0).code(), 0);
        assert_eq!(CommandOutcome::Exited(7).code(), 7);
        assert_eq!(CommandOutcome::TimedOut.code(), FAILURE_CODE);
        assert_eq!(CommandOutcome::SpawnFailed.code(), FAILURE_CODE);
        assert!(CommandOutcome::TimedOut.timed_out());
        assert!(!CommandOutcome::Exited(1).timed_out());
    }

    #[cfg(unix)]
    #[test]
    fn returns_real_exit_code() {
        let log = Arc::new(MemoryLog::default());
        let runner = ProcessRunner::new(Duration::from_secs(10), log.clone());

        assert_eq!(runner.run(&argv(&["true"])), CommandOutcome::Exited(0));
        assert_eq!(
            runner.run(&argv(&["sh", "-c", "exit 3"])),
            CommandOutcome::Exited(3)
        );

        let records = log.records();
        assert_eq!(
            records[0],
            LogRecord::Invoked {
                argv: argv(&["true"])
            }
        );
        assert!(records.iter().all(|r| !r.is_timeout()));
    }

    #[cfg(unix)]
    #[test]
    fn kills_command_past_deadline() {
        let log = Arc::new(MemoryLog::default());
        let timeout = Duration::from_millis(300);
        let runner = ProcessRunner::new(timeout, log.clone());

        let started = Instant::now();
        let outcome = runner.run(&argv(&["sleep", "30"]));
        let elapsed = started.elapsed();

        assert_eq!(outcome, CommandOutcome::TimedOut);
        assert_eq!(outcome.code(), FAILURE_CODE);
        assert!(elapsed >= timeout);
        assert!(
            elapsed < timeout + Duration::from_secs(2),
            "took {elapsed:?}"
        );
        let timeouts = log.records().iter().filter(|r| r.is_timeout()).count();
        assert_eq!(timeouts, 1);
    }

    #[test]
    fn missing_program_is_a_failure_not_a_panic() {
        let log = Arc::new(MemoryLog::default());
        let runner = ProcessRunner::new(Duration::from_secs(1), log.clone());

        let outcome = runner.run(&argv(&["appmanager-test-no-such-program"]));

        assert_eq!(outcome, CommandOutcome::SpawnFailed);
        assert!(
            log.records()
                .iter()
                .any(|r| matches!(r, LogRecord::SpawnFailed { .. }))
        );
    }

    #[test]
    fn empty_argv_is_rejected() {
        let runner = ProcessRunner::new(Duration::from_secs(1), Arc::new(NullLog));
        assert_eq!(runner.timeout(), Duration::from_secs(1));
        assert_eq!(runner.run(&[]), CommandOutcome::SpawnFailed);
    }
}
