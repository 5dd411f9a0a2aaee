//! Connection state types shared by the probes, the machine, and listeners.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::server_info::ServerInfo;

/// Logical state of the VPN tool, ordered by capability.
///
/// Everything below [`ConnectionState::Transitioning`] is unusable: no
/// connect or disconnect request is issued from those states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    #[default]
    ToolNotFound,
    DaemonDown,
    LoggedOut,
    Transitioning,
    Disconnected,
    Connected,
}

impl ConnectionState {
    pub fn is_usable(self) -> bool {
        self >= ConnectionState::Transitioning
    }

    pub fn label(self) -> &'static str {
        match self {
            ConnectionState::ToolNotFound => "tool not found",
            ConnectionState::DaemonDown => "daemon unreachable",
            ConnectionState::LoggedOut => "logged out",
            ConnectionState::Transitioning => "transitioning",
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Connected => "connected",
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Receives state changes from the machine.
///
/// Called with the machine's internal lock released, so implementations may
/// query the machine again.
pub trait StatusListener: Send + Sync {
    fn state_changed(&self, state: ConnectionState, server: &ServerInfo);
}

/// Result of one [`reconcile`](super::ConnectionStateMachine::reconcile) call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// Another reconcile or user request held the guard.
    Skipped,
    Unchanged(ConnectionState),
    Changed {
        from: ConnectionState,
        to: ConnectionState,
    },
    /// A deferred reconnect saw `Disconnected` and dispatched its connect;
    /// the machine is `Transitioning` again.
    FollowedUp {
        from: ConnectionState,
        target: String,
    },
}

/// Result of a user-initiated connect/disconnect/reconnect request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestOutcome {
    /// The command was dispatched; the machine is now `Transitioning`.
    Dispatched,
    /// A disconnect was dispatched; the connect follows once it completes.
    Deferred { target: String },
    /// The current state does not allow this request.
    NotPermitted(ConnectionState),
    /// A fresh probe found the tool unusable; that state was applied instead.
    Aborted(ConnectionState),
}

/// Point-in-time view of the machine, for display and `--json` output.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusSnapshot {
    pub state: ConnectionState,
    pub usable: bool,
    pub server: ServerInfo,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pending_reconnect: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_target: Option<String>,
    pub taken_at: DateTime<Utc>,
}

/// Contextual action for the single indicator button.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ButtonAction {
    OpenHelp,
    Nothing,
    Connect(String),
    Reconnect(String),
    Disconnect,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_states_are_ordered_by_capability() {
        assert!(ConnectionState::ToolNotFound < ConnectionState::DaemonDown);
        assert!(ConnectionState::DaemonDown < ConnectionState::LoggedOut);
        assert!(ConnectionState::LoggedOut < ConnectionState::Transitioning);
        assert!(ConnectionState::Transitioning < ConnectionState::Disconnected);
        assert!(ConnectionState::Disconnected < ConnectionState::Connected);
    }

    #[test]
    fn test_usable_threshold_is_transitioning() {
        assert!(!ConnectionState::LoggedOut.is_usable());
        assert!(ConnectionState::Transitioning.is_usable());
        assert!(ConnectionState::Connected.is_usable());
    }

    #[test]
    fn test_default_state_is_tool_not_found() {
        assert_eq!(ConnectionState::default(), ConnectionState::ToolNotFound);
    }

    #[test]
    fn test_serializes_snake_case() {
        let json = serde_json::to_string(&ConnectionState::DaemonDown).unwrap();
        assert_eq!(json, "\"daemon_down\"");
    }
}
