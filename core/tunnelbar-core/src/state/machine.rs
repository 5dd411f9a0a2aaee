//! The connection state machine.
//!
//! # Locking
//!
//! Two locks with distinct jobs:
//!
//! - the busy guard serializes *work* (probing, dispatching). Reconcile
//!   only tries it and skips when busy; user requests wait for it.
//! - `inner` protects the fields. It is held only for short updates, never
//!   across an executor call or a listener callback.
//!
//! Every mutation of `inner.state` happens while a [`BusyToken`] is held, so
//! a state read under the token stays valid until the token is dropped.
//! Functions that must only run under the guard take `&BusyToken` as proof.
//!
//! # Reconnect
//!
//! ```text
//! request_reconnect("de")   Connected ──disconnect──► Transitioning   (intent = "de")
//! reconcile                 Transitioning ──probe──► Disconnected
//!                           follow-up: connect "de"  ──► Transitioning (intent cleared)
//! reconcile                 Transitioning ──probe──► Connected        (recent += "de")
//! ```

use std::sync::{Arc, Mutex, MutexGuard};

use chrono::Utc;

use tracing::{debug, info, warn};

use super::guard::{BusyGuard, BusyToken};
use super::probes::StatusProbeSet;
use super::transition::{button_action, follow_up, permits_connect, permits_disconnect, FollowUp};
use super::types::{
    ButtonAction, ConnectionState, ReconcileOutcome, RequestOutcome, StatusListener, StatusSnapshot,
};
use crate::config::{Settings, SettingsChange, SettingsObserver, DEFAULT_HELP_URL};
use crate::executor::{ops, params, CommandExecutor, Params};
use crate::parse;
use crate::recent::RecentLocationStore;
use crate::server_info::ServerInfo;

#[derive(Debug, Default)]
struct MachineState {
    state: ConnectionState,
    pending_reconnect: Option<String>,
    server_info: ServerInfo,
    /// Target of the last connect, waiting for a reconcile to confirm it.
    connecting_target: Option<String>,
    /// Target of the confirmed connection, if it was started here.
    current_target: Option<String>,
}

#[derive(Debug, Clone)]
struct MachineOptions {
    help_url: String,
    settings_change_reconnect: bool,
}

/// Result of applying one probed state.
struct Applied {
    from: ConnectionState,
    to: ConnectionState,
    server_info: ServerInfo,
    confirmed: Option<String>,
    follow_up: Option<String>,
}

/// Result of [`ConnectionStateMachine::set_option`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptionChange {
    /// What the tool printed.
    pub output: String,
    /// Set when the change triggered a reconnect.
    pub reconnect: Option<RequestOutcome>,
}

pub struct ConnectionStateMachine {
    executor: Arc<dyn CommandExecutor>,
    probes: StatusProbeSet,
    inner: Mutex<MachineState>,
    busy: BusyGuard,
    options: Mutex<MachineOptions>,
    listener: Option<Arc<dyn StatusListener>>,
    recent: Option<Arc<Mutex<RecentLocationStore>>>,
}

impl ConnectionStateMachine {
    pub fn new(executor: Arc<dyn CommandExecutor>) -> Self {
        ConnectionStateMachine {
            probes: StatusProbeSet::new(executor.clone()),
            executor,
            inner: Mutex::new(MachineState::default()),
            busy: BusyGuard::new(),
            options: Mutex::new(MachineOptions {
                help_url: DEFAULT_HELP_URL.to_string(),
                settings_change_reconnect: true,
            }),
            listener: None,
            recent: None,
        }
    }

    pub fn with_settings(self, settings: &Settings) -> Self {
        *self.lock_options() = MachineOptions {
            help_url: settings.help_url.clone(),
            settings_change_reconnect: settings.settings_change_reconnect,
        };
        self
    }

    pub fn with_listener(mut self, listener: Arc<dyn StatusListener>) -> Self {
        self.listener = Some(listener);
        self
    }

    /// Confirmed connects are recorded in `recent`.
    pub fn with_recent(mut self, recent: Arc<Mutex<RecentLocationStore>>) -> Self {
        self.recent = Some(recent);
        self
    }

    fn lock_inner(&self) -> MutexGuard<'_, MachineState> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn lock_options(&self) -> MutexGuard<'_, MachineOptions> {
        self.options
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    // ─────────────────────────────────────────────────────────────────────
    // Queries
    // ─────────────────────────────────────────────────────────────────────

    pub fn state(&self) -> ConnectionState {
        self.lock_inner().state
    }

    pub fn pending_reconnect(&self) -> Option<String> {
        self.lock_inner().pending_reconnect.clone()
    }

    pub fn server_info(&self) -> ServerInfo {
        self.lock_inner().server_info.clone()
    }

    /// The target the current connection was made to: the requested
    /// target when known, otherwise the connected server's short id.
    pub fn current_target(&self) -> Option<String> {
        let inner = self.lock_inner();
        if inner.state != ConnectionState::Connected {
            return None;
        }
        inner.current_target.clone().or_else(|| {
            let id = inner.server_info.server_id();
            (!id.is_empty()).then(|| id.to_string())
        })
    }

    pub fn is_busy(&self) -> bool {
        self.busy.is_busy()
    }

    pub fn snapshot(&self) -> StatusSnapshot {
        let current_target = self.current_target();
        let inner = self.lock_inner();
        StatusSnapshot {
            state: inner.state,
            usable: inner.state.is_usable(),
            server: inner.server_info.clone(),
            pending_reconnect: inner.pending_reconnect.clone(),
            current_target,
            taken_at: Utc::now(),
        }
    }

    // ─────────────────────────────────────────────────────────────────────
    // Reconciliation
    // ─────────────────────────────────────────────────────────────────────

    /// Probes the tool and applies the result.
    ///
    /// Skips without waiting when another reconcile or request is running.
    pub fn reconcile(&self) -> ReconcileOutcome {
        let Some(token) = self.busy.try_acquire() else {
            debug!("Reconcile already in progress, skipping");
            return ReconcileOutcome::Skipped;
        };

        let probed = self.probes.compute_state();
        let applied = self.apply(&token, probed);
        let from = applied.from;
        let follow = applied.follow_up.clone();
        self.publish(applied);

        if let Some(target) = follow {
            info!(location = %target, "Disconnect confirmed, connecting to pending target");
            self.dispatch_connect(&token, &target);
            return ReconcileOutcome::FollowedUp { from, target };
        }

        let to = self.lock_inner().state;
        if from == to {
            ReconcileOutcome::Unchanged(to)
        } else {
            ReconcileOutcome::Changed { from, to }
        }
    }

    fn apply(&self, _token: &BusyToken<'_>, probed: ConnectionState) -> Applied {
        let entering_connected =
            probed == ConnectionState::Connected && self.state() != ConnectionState::Connected;
        let server_text = entering_connected.then(|| self.probes.current_server_text());

        let mut inner = self.lock_inner();
        let from = inner.state;
        let mut confirmed = None;

        if from != probed {
            info!(from = %from, to = %probed, "Connection state changed");
            inner.state = probed;
            inner.server_info = server_text
                .map(|text| ServerInfo::from_status(&text))
                .unwrap_or_default();
            match probed {
                ConnectionState::Connected => {
                    inner.current_target = inner.connecting_target.take();
                    confirmed = inner.current_target.clone();
                }
                ConnectionState::Transitioning => {}
                _ => inner.current_target = None,
            }
        }
        // A connect target survives only while the connect may still land.
        if !matches!(
            probed,
            ConnectionState::Transitioning | ConnectionState::Connected
        ) {
            inner.connecting_target = None;
        }

        let follow = match follow_up(probed, inner.pending_reconnect.as_deref()) {
            FollowUp::Connect(target) => {
                inner.pending_reconnect = None;
                Some(target)
            }
            FollowUp::Abandon(target) => {
                info!(location = %target, state = %probed, "Tool unusable, dropping pending reconnect");
                inner.pending_reconnect = None;
                None
            }
            FollowUp::None => None,
        };

        Applied {
            from,
            to: probed,
            server_info: inner.server_info.clone(),
            confirmed,
            follow_up: follow,
        }
    }

    /// Notifies the listener and records confirmed connects. No locks held.
    fn publish(&self, applied: Applied) {
        if applied.from != applied.to {
            self.notify(applied.to, &applied.server_info);
        }
        if let Some(location) = applied.confirmed {
            self.record_recent(&location);
        }
    }

    fn notify(&self, state: ConnectionState, server_info: &ServerInfo) {
        if let Some(listener) = &self.listener {
            listener.state_changed(state, server_info);
        }
    }

    fn record_recent(&self, location: &str) {
        if location.is_empty() {
            return;
        }
        if let Some(recent) = &self.recent {
            let outcome = recent
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner())
                .add(location);
            debug!(location, ?outcome, "Recorded recent location");
        }
    }

    /// Moves to `Transitioning` optimistically and notifies if that changed.
    fn begin_transition(&self, _token: &BusyToken<'_>, edit: impl FnOnce(&mut MachineState)) {
        let (changed, info) = {
            let mut inner = self.lock_inner();
            let from = inner.state;
            edit(&mut *inner);
            inner.state = ConnectionState::Transitioning;
            if from == ConnectionState::Connected {
                inner.server_info = ServerInfo::default();
            }
            (from != ConnectionState::Transitioning, inner.server_info.clone())
        };
        if changed {
            info!("Connection state changed to transitioning");
            self.notify(ConnectionState::Transitioning, &info);
        }
    }

    fn dispatch_connect(&self, token: &BusyToken<'_>, target: &str) {
        self.begin_transition(token, |inner| {
            inner.connecting_target = (!target.is_empty()).then(|| target.to_string());
        });
        self.executor.run_async(ops::CONNECT, &params([("target", target)]));
    }

    fn dispatch_disconnect(&self, token: &BusyToken<'_>, pending: Option<String>) {
        self.begin_transition(token, |inner| {
            inner.pending_reconnect = pending;
            inner.connecting_target = None;
        });
        self.executor.run_async(ops::DISCONNECT, &Params::new());
    }

    // ─────────────────────────────────────────────────────────────────────
    // User requests
    // ─────────────────────────────────────────────────────────────────────

    /// Connects to `target` (empty for the tool's quick connect).
    pub fn request_connect(&self, target: &str) -> RequestOutcome {
        let token = self.busy.acquire();
        let state = self.state();
        if state == ConnectionState::Connected {
            return RequestOutcome::NotPermitted(state);
        }
        self.connect_checked(&token, target)
    }

    /// Re-probes, then connects unless the tool turned out unusable or
    /// already connected.
    fn connect_checked(&self, token: &BusyToken<'_>, target: &str) -> RequestOutcome {
        let probed = self.probes.compute_state();
        if !permits_connect(probed) {
            let applied = self.apply(token, probed);
            self.publish(applied);
            return if probed.is_usable() {
                RequestOutcome::NotPermitted(probed)
            } else {
                warn!(state = %probed, "Connect aborted, tool unusable");
                RequestOutcome::Aborted(probed)
            };
        }
        info!(location = target, "Connecting");
        self.dispatch_connect(token, target);
        RequestOutcome::Dispatched
    }

    pub fn request_disconnect(&self) -> RequestOutcome {
        let token = self.busy.acquire();
        let state = self.state();
        if !permits_disconnect(state) {
            return RequestOutcome::NotPermitted(state);
        }
        info!("Disconnecting");
        self.dispatch_disconnect(&token, None);
        RequestOutcome::Dispatched
    }

    /// Switches to `target`: disconnects now, connects on the next reconcile
    /// that sees the tool disconnected.
    pub fn request_reconnect(&self, target: &str) -> RequestOutcome {
        let token = self.busy.acquire();
        match self.state() {
            ConnectionState::Connected => {
                info!(location = target, "Reconnecting");
                self.dispatch_disconnect(&token, Some(target.to_string()));
                RequestOutcome::Deferred {
                    target: target.to_string(),
                }
            }
            ConnectionState::Disconnected => self.connect_checked(&token, target),
            state => RequestOutcome::NotPermitted(state),
        }
    }

    /// Performs the indicator button's action for the current state.
    pub fn button_activate(&self, selected: Option<&str>) -> ButtonAction {
        let action = button_action(self.state(), selected, self.current_target().as_deref());
        debug!(?action, "Button activated");
        match &action {
            ButtonAction::OpenHelp => {
                let url = self.lock_options().help_url.clone();
                self.executor.run_async(ops::OPEN_HELP, &params([("url", url)]));
            }
            ButtonAction::Nothing => {}
            ButtonAction::Connect(target) => {
                self.request_connect(target);
            }
            ButtonAction::Reconnect(target) => {
                self.request_reconnect(target);
            }
            ButtonAction::Disconnect => {
                self.request_disconnect();
            }
        }
        action
    }

    /// Re-reads the status text while connected. Fields missing from the
    /// text keep their previous values.
    pub fn refresh_server_info(&self) -> Option<ServerInfo> {
        let _token = self.busy.acquire();
        if self.state() != ConnectionState::Connected {
            return None;
        }
        let text = self.probes.current_server_text();
        let mut inner = self.lock_inner();
        inner.server_info.update_from_status(&text);
        Some(inner.server_info.clone())
    }

    // ─────────────────────────────────────────────────────────────────────
    // Tool metadata and options
    // ─────────────────────────────────────────────────────────────────────

    pub fn tool_version(&self) -> Option<String> {
        parse::version(&self.executor.run_sync(ops::GET_VERSION, &Params::new()))
    }

    pub fn countries(&self) -> Vec<String> {
        parse::places(&self.executor.run_sync(ops::GET_COUNTRIES, &Params::new()))
    }

    pub fn groups(&self) -> Vec<String> {
        parse::places(&self.executor.run_sync(ops::GET_GROUPS, &Params::new()))
    }

    pub fn cities(&self, country: &str) -> Vec<String> {
        parse::places(
            &self
                .executor
                .run_sync(ops::GET_CITIES, &params([("country", country)])),
        )
    }

    pub fn options(&self) -> Vec<(String, String)> {
        parse::options(&self.executor.run_sync(ops::GET_OPTIONS, &Params::new()))
    }

    /// Sets a tool option, then reconnects to the current target when
    /// configured to and connected.
    ///
    /// `option` may be the displayed name from [`options`](Self::options)
    /// (`Kill Switch`); it is normalized to the tool's key.
    pub fn set_option(&self, option: &str, value: &str) -> OptionChange {
        let key = parse::option_key(option);
        let output = self.executor.run_sync(
            ops::OPTION_SET,
            &params([("option", key.as_str()), ("value", value)]),
        );
        info!(option = %key, value, "Tool option set");

        let reconnect_enabled = self.lock_options().settings_change_reconnect;
        let reconnect = if reconnect_enabled && self.state() == ConnectionState::Connected {
            let target = self.current_target().unwrap_or_default();
            Some(self.request_reconnect(&target))
        } else {
            None
        };
        OptionChange { output, reconnect }
    }
}

impl SettingsObserver for ConnectionStateMachine {
    fn settings_changed(&self, change: &SettingsChange) {
        match change {
            SettingsChange::HelpUrl(url) => self.lock_options().help_url = url.clone(),
            SettingsChange::SettingsChangeReconnect(enabled) => {
                self.lock_options().settings_change_reconnect = *enabled
            }
            _ => {}
        }
    }
}
