//! Command execution boundary.
//!
//! The core never builds shell strings itself. It asks a [`CommandExecutor`]
//! to run a *named* operation; the executor looks the name up in a
//! [`CommandTable`] of user-overridable templates and substitutes `%key%`
//! placeholders from the supplied [`Params`].
//!
//! ```text
//! probe / machine ──► run_sync("connected-check", {}) ──► "Status: Connected\n..."
//!                 ──► run_async("connect", {target: "fr"})
//! ```
//!
//! Failures never cross this boundary as errors. A missing template, a
//! missing binary, or a non-zero exit all read as empty output, which the
//! probes interpret as the conservative "unusable" answer.

mod shell;
mod template;

use std::collections::BTreeMap;

pub use shell::ShellExecutor;
pub use template::{shell_quote, unescape, CommandTable, DEFAULT_SHELL};

/// Named placeholder values substituted into a command template.
pub type Params = BTreeMap<String, String>;

/// Builds a [`Params`] map from `(key, value)` pairs.
pub fn params<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Params
where
    K: Into<String>,
    V: Into<String>,
{
    pairs
        .into_iter()
        .map(|(k, v)| (k.into(), v.into()))
        .collect()
}

/// Runs logical operations against the external VPN tool.
pub trait CommandExecutor: Send + Sync {
    /// Runs `operation` to completion and returns its standard output.
    /// Returns an empty string when the operation cannot run.
    fn run_sync(&self, operation: &str, params: &Params) -> String;

    /// Starts `operation` without waiting for it to finish.
    fn run_async(&self, operation: &str, params: &Params);
}

/// Logical operation names understood by the default [`CommandTable`].
pub mod ops {
    pub const TOOL_AVAILABLE: &str = "tool-available";
    pub const CONNECTED_CHECK: &str = "connected-check";
    pub const TRANSITION_CHECK: &str = "transition-check";
    pub const DAEMON_UNREACHABLE_CHECK: &str = "daemon-unreachable-check";
    pub const LOGGED_CHECK: &str = "logged-check";
    pub const CURRENT_SERVER_GET: &str = "current-server-get";
    pub const CONNECT: &str = "connect";
    pub const DISCONNECT: &str = "disconnect";
    pub const GET_VERSION: &str = "get-version";
    pub const GET_COUNTRIES: &str = "get-countries";
    pub const GET_GROUPS: &str = "get-groups";
    pub const GET_CITIES: &str = "get-cities";
    pub const GET_OPTIONS: &str = "get-options";
    pub const OPTION_SET: &str = "option-set";
    pub const OPEN_HELP: &str = "open-help";
}
