//! Test doubles for code that drives the VPN tool.
//!
//! Compiled for this crate's tests and, behind the `test-helpers` feature,
//! for downstream integration tests.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::executor::{ops, CommandExecutor, Params};
use crate::state::ConnectionState;

/// Status text for a connected tool.
pub const CONNECTED_STATUS: &str = "Status: Connected
Hostname: fr812.nordvpn.com
Current server: fr812.nordvpn.com
Country: France
City: Paris
Server IP: 185.93.2.10
Current technology: NORDLYNX
Current protocol: UDP
Transfer: 1.42 MiB received, 311.05 KiB sent
Uptime: 3 minutes 12 seconds
";

/// One `run_async` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dispatch {
    pub operation: String,
    pub params: Params,
}

impl Dispatch {
    pub fn param(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }
}

type SyncHook = Arc<dyn Fn(&str) + Send + Sync>;

#[derive(Default)]
struct Script {
    outputs: HashMap<String, String>,
    sync_calls: HashMap<String, usize>,
    sync_params: HashMap<String, Params>,
    dispatched: Vec<Dispatch>,
    hook: Option<SyncHook>,
}

/// A [`CommandExecutor`] that answers from canned outputs.
///
/// Unscripted operations return empty output, like a missing template.
#[derive(Default)]
pub struct ScriptedExecutor {
    script: Mutex<Script>,
}

impl ScriptedExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    fn script(&self) -> MutexGuard<'_, Script> {
        self.script.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn set_output(&self, operation: &str, output: &str) {
        self.script()
            .outputs
            .insert(operation.to_string(), output.to_string());
    }

    /// Scripts the probe operations so the probes report `state`.
    pub fn script_state(&self, state: ConnectionState) {
        let mut script = self.script();
        let outputs = &mut script.outputs;
        for op in [
            ops::TOOL_AVAILABLE,
            ops::CONNECTED_CHECK,
            ops::TRANSITION_CHECK,
            ops::DAEMON_UNREACHABLE_CHECK,
            ops::LOGGED_CHECK,
            ops::CURRENT_SERVER_GET,
        ] {
            outputs.remove(op);
        }
        if state == ConnectionState::ToolNotFound {
            return;
        }

        let mut set = |op: &str, text: &str| {
            outputs.insert(op.to_string(), text.to_string());
        };
        set(ops::TOOL_AVAILABLE, "/usr/bin/nordvpn\n");

        let status = match state {
            ConnectionState::Connected => CONNECTED_STATUS,
            ConnectionState::Transitioning => "Status: Connecting\n",
            ConnectionState::DaemonDown => "Cannot reach System Daemon.\n",
            _ => "Status: Disconnected\n",
        };
        set(ops::CONNECTED_CHECK, status);
        set(ops::TRANSITION_CHECK, status);
        set(ops::DAEMON_UNREACHABLE_CHECK, status);
        set(ops::CURRENT_SERVER_GET, status);

        let account = if state == ConnectionState::LoggedOut {
            "You are not logged in.\n"
        } else {
            "Account Information:\nEmail Address: user@example.com\n"
        };
        set(ops::LOGGED_CHECK, account);
    }

    /// Runs `hook` on every `run_sync`, before answering.
    pub fn set_sync_hook(&self, hook: impl Fn(&str) + Send + Sync + 'static) {
        self.script().hook = Some(Arc::new(hook));
    }

    pub fn clear_sync_hook(&self) {
        self.script().hook = None;
    }

    pub fn dispatched(&self) -> Vec<Dispatch> {
        self.script().dispatched.clone()
    }

    pub fn dispatched_operations(&self) -> Vec<String> {
        self.script()
            .dispatched
            .iter()
            .map(|d| d.operation.clone())
            .collect()
    }

    /// Params of the most recent `run_sync` of `operation`.
    pub fn last_sync_params(&self, operation: &str) -> Option<Params> {
        self.script().sync_params.get(operation).cloned()
    }

    pub fn sync_calls(&self, operation: &str) -> usize {
        self.script()
            .sync_calls
            .get(operation)
            .copied()
            .unwrap_or(0)
    }
}

impl CommandExecutor for ScriptedExecutor {
    fn run_sync(&self, operation: &str, params: &Params) -> String {
        let hook = {
            let mut script = self.script();
            *script.sync_calls.entry(operation.to_string()).or_default() += 1;
            script
                .sync_params
                .insert(operation.to_string(), params.clone());
            script.hook.clone()
        };
        if let Some(hook) = hook {
            hook(operation);
        }
        self.script()
            .outputs
            .get(operation)
            .cloned()
            .unwrap_or_default()
    }

    fn run_async(&self, operation: &str, params: &Params) {
        self.script().dispatched.push(Dispatch {
            operation: operation.to_string(),
            params: params.clone(),
        });
    }
}
