//! Module lifecycle controller.
//!
//! Per module: `Unknown -> {Running, Stopped}`, where the observed state is
//! the module's `running` flag and only [`Orchestrator::check_status`]
//! writes it. Stop and kill only send the signal; callers re-check.

use tracing::{info, instrument, warn};

use crate::core::argv;
use crate::core::model::Module;
use crate::core::status::StatusEvent;
use crate::fanout;
use crate::io::process::{CommandOutcome, CommandRunner};
use crate::orchestrator::Orchestrator;

/// What [`Orchestrator::start`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOutcome {
    /// The tag was already running; nothing was launched.
    AlreadyRunning,
    /// A launch command was issued; `running` is the status re-checked afterwards.
    Launched {
        launch: CommandOutcome,
        running: bool,
    },
}

impl StartOutcome {
    pub fn running(self) -> bool {
        match self {
            StartOutcome::AlreadyRunning => true,
            StartOutcome::Launched { running, .. } => running,
        }
    }
}

impl<R: CommandRunner> Orchestrator<R> {
    /// Ask the launcher whether the module's tag runs on its node.
    #[instrument(skip_all, fields(module = %module.name, tag = %module.tag))]
    pub fn check_status(&self, module: &mut Module) -> bool {
        let outcome = self.run(&argv::is_running(self.tools(), module));
        module.running = outcome.success();
        self.notify(StatusEvent::from(&*module));
        module.running
    }

    /// Launch the module unless it is already running, then refresh its status.
    #[instrument(skip_all, fields(module = %module.name, tag = %module.tag))]
    pub fn start(&self, module: &mut Module) -> StartOutcome {
        if self.check_status(module) {
            info!("module already running, skipping");
            return StartOutcome::AlreadyRunning;
        }
        let launch = self.run(&argv::launch(self.tools(), module));
        if !launch.success() {
            warn!(code = launch.code(), timed_out = launch.timed_out(), "launch command failed");
        }
        let running = self.check_status(module);
        StartOutcome::Launched { launch, running }
    }

    /// Send SIGTERM to the module's tag. Does not touch `running`.
    #[instrument(skip_all, fields(module = %module.name, tag = %module.tag))]
    pub fn graceful_stop(&self, module: &Module) -> CommandOutcome {
        let outcome = self.run(&argv::sigterm(self.tools(), module));
        if !outcome.success() {
            warn!(code = outcome.code(), "stop command failed");
        }
        outcome
    }

    /// Send an unconditional kill (signal 9) to the module's tag.
    #[instrument(skip_all, fields(module = %module.name, tag = %module.tag))]
    pub fn force_kill(&self, module: &Module) -> CommandOutcome {
        let outcome = self.run(&argv::kill(self.tools(), module));
        if !outcome.success() {
            warn!(code = outcome.code(), "kill command failed");
        }
        outcome
    }

    /// Refresh every module's status, fanned out over the configured workers.
    pub fn check_all(&self, modules: &mut [Module]) {
        fanout::for_each_mut(modules, self.parallelism(), |module| {
            self.check_status(module);
        });
    }

    /// Start each module in declaration order; failures do not stop the rest.
    pub fn start_all(&self, modules: &mut [Module]) -> Vec<StartOutcome> {
        info!(count = modules.len(), "starting modules");
        modules.iter_mut().map(|m| self.start(m)).collect()
    }

    /// Gracefully stop each module in declaration order.
    pub fn stop_all(&self, modules: &[Module]) -> Vec<CommandOutcome> {
        info!(count = modules.len(), "stopping modules");
        modules.iter().map(|m| self.graceful_stop(m)).collect()
    }

    /// Kill each module in declaration order.
    pub fn kill_all(&self, modules: &[Module]) -> Vec<CommandOutcome> {
        info!(count = modules.len(), "killing modules");
        modules.iter().map(|m| self.force_kill(m)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::argv::Tools;
    use crate::test_support::{FakeNetwork, ScriptedRunner, is_launch};
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn check_status_follows_exit_code() {
        let orch = Orchestrator::new(FakeNetwork::new().with_running(&["t1"]), Tools::default());
        let mut up = Module::new("a", "", "n1", "t1");
        let mut down = Module::new("b", "", "n1", "t2");
        down.running = true;

        assert!(orch.check_status(&mut up));
        assert!(!orch.check_status(&mut down));
        assert!(up.running);
        assert!(!down.running);
    }

    #[test]
    fn start_on_running_module_launches_nothing() {
        let orch = Orchestrator::new(FakeNetwork::new().with_running(&["t1"]), Tools::default());
        let mut module = Module::new("M", "", "n1", "t1");

        assert_eq!(orch.start(&mut module), StartOutcome::AlreadyRunning);
        assert_eq!(orch.runner().count(is_launch), 0);
        assert!(module.running);
    }

    #[test]
    fn start_builds_launch_command_and_rechecks() {
        let launched = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&launched);
        let runner = ScriptedRunner::new(move |argv| {
            if is_launch(argv) {
                flag.store(true, Ordering::SeqCst);
                CommandOutcome::Exited(0)
            } else if flag.load(Ordering::SeqCst) {
                CommandOutcome::Exited(0)
            } else {
                CommandOutcome::Exited(1)
            }
        });
        let orch = Orchestrator::new(runner, Tools::default());
        let mut module = Module::new("M", "--period 10", "n1", "t1");

        let outcome = orch.start(&mut module);

        assert_eq!(
            outcome,
            StartOutcome::Launched {
                launch: CommandOutcome::Exited(0),
                running: true,
            }
        );
        assert!(module.running);
        let calls = orch.runner().calls();
        assert_eq!(calls.len(), 3);
        assert_eq!(
            calls[1],
            strings(&["yarprun", "--cmd", "M --period 10", "--on", "/n1", "--as", "t1"])
        );
    }

    #[test]
    fn failed_launch_leaves_module_stopped() {
        let orch = Orchestrator::new(
            ScriptedRunner::always(CommandOutcome::TimedOut),
            Tools::default(),
        );
        let mut module = Module::new("M", "", "n1", "t1");

        let outcome = orch.start(&mut module);

        assert!(!outcome.running());
        assert!(!module.running);
    }

    #[test]
    fn stop_and_kill_do_not_touch_running_flag() {
        let orch = Orchestrator::new(FakeNetwork::new().with_running(&["t1"]), Tools::default());
        let mut module = Module::new("M", "", "n1", "t1");
        module.running = true;

        assert!(orch.graceful_stop(&module).success());
        assert!(module.running);
        assert!(!orch.check_status(&mut module));

        let calls = orch.runner().calls();
        assert_eq!(
            calls[0],
            strings(&["yarprun", "--on", "/n1", "--sigterm", "t1"])
        );

        orch.force_kill(&module);
        assert_eq!(
            orch.runner().calls().last().cloned(),
            Some(strings(&["yarprun", "--on", "/n1", "--kill", "t1", "9"]))
        );
    }

    #[test]
    fn start_all_continues_after_a_failure() {
        let runner = ScriptedRunner::new(|argv| {
            let tag = argv.last().map(String::as_str);
            if is_launch(argv) && tag == Some("bad") {
                CommandOutcome::SpawnFailed
            } else if is_launch(argv) {
                CommandOutcome::Exited(0)
            } else {
                CommandOutcome::Exited(1)
            }
        });
        let orch = Orchestrator::new(runner, Tools::default());
        let mut modules = vec![
            Module::new("first", "", "n", "bad"),
            Module::new("second", "", "n", "good"),
        ];

        let outcomes = orch.start_all(&mut modules);

        assert_eq!(outcomes.len(), 2);
        let launches: Vec<Vec<String>> = orch
            .runner()
            .calls()
            .into_iter()
            .filter(|argv| is_launch(argv))
            .collect();
        assert_eq!(launches.len(), 2);
        assert_eq!(launches[0].last().map(String::as_str), Some("bad"));
        assert_eq!(launches[1].last().map(String::as_str), Some("good"));
    }

    #[test]
    fn bulk_stop_and_kill_cover_every_module_in_order() {
        let orch = Orchestrator::new(FakeNetwork::new(), Tools::default());
        let modules = vec![
            Module::new("a", "", "n1", "ta"),
            Module::new("b", "", "n2", "tb"),
        ];

        let stopped = orch.stop_all(&modules);
        let killed = orch.kill_all(&modules);

        assert_eq!(stopped.len(), 2);
        assert_eq!(killed.len(), 2);
        let tags: Vec<String> = orch
            .runner()
            .calls()
            .iter()
            .map(|argv| argv[4].clone())
            .collect();
        assert_eq!(tags, vec!["ta", "tb", "ta", "tb"]);
    }

    #[test]
    fn parallel_check_matches_sequential() {
        let running = ["t0", "t2", "t5"];
        let mut modules: Vec<Module> = (0..7)
            .map(|i| Module::new(format!("m{i}"), "", "n", format!("t{i}")))
            .collect();
        let orch = Orchestrator::new(FakeNetwork::new().with_running(&running), Tools::default())
            .with_parallelism(3);

        orch.check_all(&mut modules);

        for module in &modules {
            assert_eq!(module.running, running.contains(&module.tag.as_str()));
        }
        assert_eq!(orch.runner().calls().len(), modules.len());
    }
}
