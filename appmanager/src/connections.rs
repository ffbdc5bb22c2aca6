//! Connection manager.
//!
//! A missing endpoint is an expected condition while modules are still
//! starting, so connect/disconnect skip such connections silently.

use tracing::{debug, info, instrument, warn};

use crate::core::argv;
use crate::core::model::Connection;
use crate::core::status::StatusEvent;
use crate::fanout;
use crate::io::process::CommandRunner;
use crate::orchestrator::Orchestrator;

impl<R: CommandRunner> Orchestrator<R> {
    /// Refresh both endpoint flags, then connectivity.
    ///
    /// The pairwise query only runs when both endpoints exist; otherwise
    /// `connected` is set to false without asking.
    #[instrument(skip_all, fields(output = %conn.output, input = %conn.input))]
    pub fn check_ports(&self, conn: &mut Connection) {
        conn.output_exists = self
            .run(&argv::port_exists(self.tools(), &conn.output))
            .success();
        conn.input_exists = self
            .run(&argv::port_exists(self.tools(), &conn.input))
            .success();
        conn.connected = conn.endpoints_exist()
            && self
                .run(&argv::ports_connected(self.tools(), &conn.output, &conn.input))
                .success();
        self.notify(StatusEvent::from(&*conn));
    }

    /// Connect over the declared protocol if both endpoints exist.
    ///
    /// Returns whether a connect command was issued.
    #[instrument(skip_all, fields(output = %conn.output, input = %conn.input, protocol = %conn.protocol))]
    pub fn connect(&self, conn: &mut Connection) -> bool {
        self.check_ports(conn);
        if !conn.endpoints_exist() {
            debug!("endpoint missing, skipping connect");
            return false;
        }
        let outcome = self.run(&argv::connect(
            self.tools(),
            &conn.output,
            &conn.input,
            &conn.protocol,
        ));
        if !outcome.success() {
            warn!(code = outcome.code(), "connect command failed");
        }
        self.check_ports(conn);
        true
    }

    /// Disconnect if both endpoints exist. Returns whether a command was issued.
    #[instrument(skip_all, fields(output = %conn.output, input = %conn.input))]
    pub fn disconnect(&self, conn: &mut Connection) -> bool {
        self.check_ports(conn);
        if !conn.endpoints_exist() {
            debug!("endpoint missing, skipping disconnect");
            return false;
        }
        let outcome = self.run(&argv::disconnect(self.tools(), &conn.output, &conn.input));
        if !outcome.success() {
            warn!(code = outcome.code(), "disconnect command failed");
        }
        self.check_ports(conn);
        true
    }

    /// Refresh every connection, fanned out over the configured workers.
    pub fn check_all_ports(&self, connections: &mut [Connection]) {
        fanout::for_each_mut(connections, self.parallelism(), |conn| self.check_ports(conn));
    }

    /// Connect each declared connection in order.
    pub fn connect_all(&self, connections: &mut [Connection]) -> Vec<bool> {
        info!(count = connections.len(), "connecting ports");
        connections.iter_mut().map(|c| self.connect(c)).collect()
    }

    /// Disconnect each declared connection in order.
    pub fn disconnect_all(&self, connections: &mut [Connection]) -> Vec<bool> {
        info!(count = connections.len(), "disconnecting ports");
        connections.iter_mut().map(|c| self.disconnect(c)).collect()
    }
}
