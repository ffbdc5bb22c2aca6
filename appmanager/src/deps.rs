//! Dependency resolver.
//!
//! Readiness is informational only: nothing in the lifecycle controller
//! refuses to start or stop modules when a dependency is unreachable.

use tracing::{debug, info, instrument};

use crate::core::argv;
use crate::core::model::Application;
use crate::core::status::StatusEvent;
use crate::io::process::CommandRunner;
use crate::orchestrator::Orchestrator;

impl<R: CommandRunner> Orchestrator<R> {
    /// Query every port and node dependency and return the logical AND.
    ///
    /// Ports are checked before nodes, each in declaration order. A failed
    /// query never stops the scan; the aggregate is only returned once every
    /// dependency has been visited.
    #[instrument(skip_all, fields(app = %app.name))]
    pub fn check_dependencies(&self, app: &mut Application) -> bool {
        let mut satisfied = true;
        for dep in app.dependencies_mut() {
            let outcome = self.run(&argv::port_exists(self.tools(), &dep.query_name()));
            dep.satisfied = outcome.success();
            if !dep.satisfied {
                debug!(name = %dep.name, kind = ?dep.kind, code = outcome.code(), "dependency unreachable");
                satisfied = false;
            }
            self.notify(StatusEvent::from(&*dep));
        }
        info!(satisfied, "dependency check complete");
        satisfied
    }
}

#[cfg(test)]
mod tests {
    use crate::core::argv::Tools;
    use crate::core::model::Application;
    use crate::io::process::CommandOutcome;
    use crate::orchestrator::Orchestrator;
    use crate::test_support::{FakeNetwork, ScriptedRunner};

    /// Every pass/fail combination over four dependencies: each one is
    /// queried exactly once and the aggregate equals the AND of the flags.
    #[test]
    fn aggregate_is_and_over_all_combinations() {
        let names = ["/p0", "/p1", "n2", "n3"];
        for mask in 0u32..16 {
            let reachable: Vec<String> = names
                .iter()
                .enumerate()
                .filter(|(i, _)| mask & (1 << i) != 0)
                .map(|(_, name)| {
                    if name.starts_with('/') {
                        name.to_string()
                    } else {
                        format!("/{name}")
                    }
                })
                .collect();
            let runner = ScriptedRunner::new(move |argv| {
                if reachable.contains(&argv[2]) {
                    CommandOutcome::Exited(0)
                } else {
                    CommandOutcome::Exited(1)
                }
            });
            let orch = Orchestrator::new(runner, Tools::default());
            let mut app = Application::new("demo");
            app.push_port_dependency("/p0");
            app.push_port_dependency("/p1");
            app.push_node_dependency("n2");
            app.push_node_dependency("n3");

            let all = orch.check_dependencies(&mut app);

            let flags: Vec<bool> = app.dependencies().map(|d| d.satisfied).collect();
            assert_eq!(all, flags.iter().all(|f| *f), "mask={mask}");
            assert_eq!(all, mask == 15, "mask={mask}");
            for (i, flag) in flags.iter().enumerate() {
                assert_eq!(*flag, mask & (1 << i) != 0, "mask={mask} dep={i}");
            }
            assert_eq!(orch.runner().calls().len(), names.len(), "mask={mask}");
        }
    }

    #[test]
    fn queries_in_declaration_order_with_node_separator() {
        let orch = Orchestrator::new(FakeNetwork::new(), Tools::default());
        let mut app = Application::new("demo");
        app.push_port_dependency("/b");
        app.push_port_dependency("/a");
        app.push_node_dependency("pc104");

        assert!(!orch.check_dependencies(&mut app));

        let targets: Vec<String> = orch
            .runner()
            .calls()
            .iter()
            .map(|argv| argv[2].clone())
            .collect();
        assert_eq!(targets, vec!["/b", "/a", "/pc104"]);
    }

    #[test]
    fn timed_out_query_counts_as_unsatisfied_and_scan_continues() {
        let runner = ScriptedRunner::new(|argv| {
            if argv[2] == "/slow" {
                CommandOutcome::TimedOut
            } else {
                CommandOutcome::Exited(0)
            }
        });
        let orch = Orchestrator::new(runner, Tools::default());
        let mut app = Application::new("demo");
        app.push_port_dependency("/slow");
        app.push_port_dependency("/fast");

        assert!(!orch.check_dependencies(&mut app));
        assert!(!app.port_dependencies[0].satisfied);
        assert!(app.port_dependencies[1].satisfied);
    }

    #[test]
    fn no_dependencies_is_satisfied() {
        let orch = Orchestrator::new(FakeNetwork::new(), Tools::default());
        let mut app = Application::new("demo");
        assert!(orch.check_dependencies(&mut app));
        assert!(orch.runner().calls().is_empty());
    }
}
