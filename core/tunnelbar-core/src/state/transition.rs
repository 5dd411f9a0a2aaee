//! Pure decision rules for the connection state machine.
//! Conservative rules: an unusable tool never gets a command.

use super::types::{ButtonAction, ConnectionState};

/// What reconcile does with a pending reconnect intent once a state is applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FollowUp {
    /// Keep waiting (or there is no intent).
    None,
    /// The disconnect completed; connect to the target now.
    Connect(String),
    /// The tool became unusable; drop the intent.
    Abandon(String),
}

pub fn follow_up(state: ConnectionState, pending: Option<&str>) -> FollowUp {
    match pending {
        None => FollowUp::None,
        Some(target) if state == ConnectionState::Disconnected => {
            FollowUp::Connect(target.to_string())
        }
        Some(target) if !state.is_usable() => FollowUp::Abandon(target.to_string()),
        Some(_) => FollowUp::None,
    }
}

pub fn permits_connect(state: ConnectionState) -> bool {
    matches!(
        state,
        ConnectionState::Disconnected | ConnectionState::Transitioning
    )
}

pub fn permits_disconnect(state: ConnectionState) -> bool {
    matches!(
        state,
        ConnectionState::Connected | ConnectionState::Transitioning
    )
}

/// Picks the single contextual action for the indicator button.
///
/// `current` is the target the machine is connected to, if known.
pub fn button_action(
    state: ConnectionState,
    selected: Option<&str>,
    current: Option<&str>,
) -> ButtonAction {
    let selected = selected.filter(|s| !s.is_empty());
    match state {
        s if !s.is_usable() => ButtonAction::OpenHelp,
        ConnectionState::Transitioning => ButtonAction::Nothing,
        ConnectionState::Disconnected => {
            ButtonAction::Connect(selected.unwrap_or_default().to_string())
        }
        _ => match selected {
            Some(target) if current != Some(target) => ButtonAction::Reconnect(target.to_string()),
            _ => ButtonAction::Disconnect,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_intent_no_follow_up() {
        assert_eq!(follow_up(ConnectionState::Disconnected, None), FollowUp::None);
    }

    #[test]
    fn test_disconnected_fires_pending_connect() {
        assert_eq!(
            follow_up(ConnectionState::Disconnected, Some("de")),
            FollowUp::Connect("de".to_string())
        );
    }

    #[test]
    fn test_still_connected_keeps_waiting() {
        assert_eq!(follow_up(ConnectionState::Connected, Some("de")), FollowUp::None);
        assert_eq!(
            follow_up(ConnectionState::Transitioning, Some("de")),
            FollowUp::None
        );
    }

    #[test]
    fn test_unusable_abandons_intent() {
        for state in [
            ConnectionState::ToolNotFound,
            ConnectionState::DaemonDown,
            ConnectionState::LoggedOut,
        ] {
            assert_eq!(
                follow_up(state, Some("de")),
                FollowUp::Abandon("de".to_string())
            );
        }
    }

    #[test]
    fn test_connect_permissions() {
        assert!(permits_connect(ConnectionState::Disconnected));
        assert!(permits_connect(ConnectionState::Transitioning));
        assert!(!permits_connect(ConnectionState::Connected));
        assert!(!permits_connect(ConnectionState::LoggedOut));
    }

    #[test]
    fn test_disconnect_permissions() {
        assert!(permits_disconnect(ConnectionState::Connected));
        assert!(permits_disconnect(ConnectionState::Transitioning));
        assert!(!permits_disconnect(ConnectionState::Disconnected));
        assert!(!permits_disconnect(ConnectionState::DaemonDown));
    }

    #[test]
    fn test_button_opens_help_when_unusable() {
        assert_eq!(
            button_action(ConnectionState::DaemonDown, Some("fr"), None),
            ButtonAction::OpenHelp
        );
    }

    #[test]
    fn test_button_does_nothing_while_transitioning() {
        assert_eq!(
            button_action(ConnectionState::Transitioning, Some("fr"), None),
            ButtonAction::Nothing
        );
    }

    #[test]
    fn test_button_connects_when_disconnected() {
        assert_eq!(
            button_action(ConnectionState::Disconnected, Some("fr"), None),
            ButtonAction::Connect("fr".to_string())
        );
        assert_eq!(
            button_action(ConnectionState::Disconnected, None, None),
            ButtonAction::Connect(String::new())
        );
    }

    #[test]
    fn test_button_reconnects_to_different_target() {
        assert_eq!(
            button_action(ConnectionState::Connected, Some("de"), Some("fr")),
            ButtonAction::Reconnect("de".to_string())
        );
    }

    #[test]
    fn test_button_disconnects_from_same_or_no_target() {
        assert_eq!(
            button_action(ConnectionState::Connected, Some("fr"), Some("fr")),
            ButtonAction::Disconnect
        );
        assert_eq!(
            button_action(ConnectionState::Connected, None, Some("fr")),
            ButtonAction::Disconnect
        );
        assert_eq!(
            button_action(ConnectionState::Connected, Some(""), Some("fr")),
            ButtonAction::Disconnect
        );
    }
}
