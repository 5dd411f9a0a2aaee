//! Status probes against the VPN tool.
//!
//! Each probe is one named operation plus a parser from [`crate::parse`].
//! A probe whose command cannot run sees empty output, which every parser
//! maps to the conservative answer.
//!
//! # Priority
//!
//! [`compute_state`] asks the probes in a fixed order and stops at the first
//! decisive answer:
//!
//! ```text
//! tool present?        no  → ToolNotFound
//! connected?           yes → Connected      (before daemon/login: a live
//! daemon unreachable?  yes → DaemonDown      tunnel may report daemon hiccups)
//! logged in?           no  → LoggedOut      (before transition: logged-out
//! transitioning?       yes → Transitioning   never reads as transitioning)
//!                          → Disconnected
//! ```

use std::sync::Arc;

use tracing::trace;

use super::types::ConnectionState;
use crate::executor::{ops, CommandExecutor, Params};
use crate::parse;

/// The boolean probes [`compute_state`] needs.
pub trait StatusProbes {
    fn tool_present(&self) -> bool;
    fn is_connected(&self) -> bool;
    fn is_daemon_unreachable(&self) -> bool;
    fn is_logged_in(&self) -> bool;
    fn is_transitioning(&self) -> bool;
}

/// Derives the connection state from probes, short-circuiting in priority order.
pub fn compute_state<P: StatusProbes + ?Sized>(probes: &P) -> ConnectionState {
    if !probes.tool_present() {
        return ConnectionState::ToolNotFound;
    }
    if probes.is_connected() {
        return ConnectionState::Connected;
    }
    if probes.is_daemon_unreachable() {
        return ConnectionState::DaemonDown;
    }
    if !probes.is_logged_in() {
        return ConnectionState::LoggedOut;
    }
    if probes.is_transitioning() {
        return ConnectionState::Transitioning;
    }
    ConnectionState::Disconnected
}

/// Probes backed by a [`CommandExecutor`].
#[derive(Clone)]
pub struct StatusProbeSet {
    executor: Arc<dyn CommandExecutor>,
}

impl StatusProbeSet {
    pub fn new(executor: Arc<dyn CommandExecutor>) -> Self {
        Self { executor }
    }

    fn output(&self, operation: &str) -> String {
        let output = self.executor.run_sync(operation, &Params::new());
        trace!(operation, bytes = output.len(), "Probe output");
        output
    }

    /// Raw status text describing the current server.
    pub fn current_server_text(&self) -> String {
        self.output(ops::CURRENT_SERVER_GET)
    }

    pub fn compute_state(&self) -> ConnectionState {
        compute_state(self)
    }
}

impl StatusProbes for StatusProbeSet {
    fn tool_present(&self) -> bool {
        parse::tool_present(&self.output(ops::TOOL_AVAILABLE))
    }

    fn is_connected(&self) -> bool {
        parse::connected(&self.output(ops::CONNECTED_CHECK))
    }

    fn is_daemon_unreachable(&self) -> bool {
        parse::daemon_unreachable(&self.output(ops::DAEMON_UNREACHABLE_CHECK))
    }

    fn is_logged_in(&self) -> bool {
        parse::logged_in(&self.output(ops::LOGGED_CHECK))
    }

    fn is_transitioning(&self) -> bool {
        parse::transitioning(&self.output(ops::TRANSITION_CHECK))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedExecutor;
    use std::cell::RefCell;

    /// Fixed probe answers that record which probes were asked.
    struct FixedProbes {
        present: bool,
        connected: bool,
        daemon_down: bool,
        logged_in: bool,
        transitioning: bool,
        asked: RefCell<Vec<&'static str>>,
    }

    impl FixedProbes {
        fn new() -> Self {
            Self {
                present: true,
                connected: false,
                daemon_down: false,
                logged_in: true,
                transitioning: false,
                asked: RefCell::new(Vec::new()),
            }
        }

        fn ask(&self, name: &'static str, answer: bool) -> bool {
            self.asked.borrow_mut().push(name);
            answer
        }
    }

    impl StatusProbes for FixedProbes {
        fn tool_present(&self) -> bool {
            self.ask("present", self.present)
        }
        fn is_connected(&self) -> bool {
            self.ask("connected", self.connected)
        }
        fn is_daemon_unreachable(&self) -> bool {
            self.ask("daemon", self.daemon_down)
        }
        fn is_logged_in(&self) -> bool {
            self.ask("login", self.logged_in)
        }
        fn is_transitioning(&self) -> bool {
            self.ask("transitioning", self.transitioning)
        }
    }

    #[test]
    fn test_missing_tool_wins_over_everything() {
        let probes = FixedProbes {
            present: false,
            connected: true,
            daemon_down: true,
            logged_in: false,
            transitioning: true,
            ..FixedProbes::new()
        };
        assert_eq!(compute_state(&probes), ConnectionState::ToolNotFound);
        assert_eq!(*probes.asked.borrow(), vec!["present"]);
    }

    #[test]
    fn test_connected_checked_before_daemon_and_login() {
        let probes = FixedProbes {
            connected: true,
            daemon_down: true,
            logged_in: false,
            ..FixedProbes::new()
        };
        assert_eq!(compute_state(&probes), ConnectionState::Connected);
        assert_eq!(*probes.asked.borrow(), vec!["present", "connected"]);
    }

    #[test]
    fn test_logged_out_never_reads_as_transitioning() {
        let probes = FixedProbes {
            logged_in: false,
            transitioning: true,
            ..FixedProbes::new()
        };
        assert_eq!(compute_state(&probes), ConnectionState::LoggedOut);
        assert!(!probes.asked.borrow().contains(&"transitioning"));
    }

    #[test]
    fn test_full_priority_ladder() {
        let daemon = FixedProbes {
            daemon_down: true,
            ..FixedProbes::new()
        };
        assert_eq!(compute_state(&daemon), ConnectionState::DaemonDown);

        let transitioning = FixedProbes {
            transitioning: true,
            ..FixedProbes::new()
        };
        assert_eq!(compute_state(&transitioning), ConnectionState::Transitioning);

        assert_eq!(
            compute_state(&FixedProbes::new()),
            ConnectionState::Disconnected
        );
    }

    #[test]
    fn test_probe_set_without_templates_reports_tool_not_found() {
        let executor = Arc::new(ScriptedExecutor::new());
        let probes = StatusProbeSet::new(executor);
        assert_eq!(probes.compute_state(), ConnectionState::ToolNotFound);
        assert_eq!(probes.current_server_text(), "");
    }

    #[test]
    fn test_probe_set_reads_scripted_outputs() {
        let executor = Arc::new(ScriptedExecutor::new());
        executor.script_state(ConnectionState::Connected);
        let probes = StatusProbeSet::new(executor.clone());
        assert_eq!(probes.compute_state(), ConnectionState::Connected);

        executor.script_state(ConnectionState::LoggedOut);
        assert_eq!(probes.compute_state(), ConnectionState::LoggedOut);
    }
}
