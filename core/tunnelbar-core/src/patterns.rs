//! Compiled regex patterns for reading the VPN tool's text output.
//!
//! These are compiled once on first use. Update them when the tool's status
//! or listing formats change; the command templates themselves live in the
//! configurable operation table, not here.

use once_cell::sync::Lazy;
use regex::Regex;

// ═══════════════════════════════════════════════════════════════════════════════
// Status Probe Regexes
// ═══════════════════════════════════════════════════════════════════════════════

pub static RE_STATUS_CONNECTED: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?im)^\W*status:\s*connected\b").unwrap());
pub static RE_STATUS_TRANSITIONING: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?im)^\W*status:\s*(connecting|disconnecting|reconnecting)\b").unwrap()
});
pub static RE_DAEMON_UNREACHABLE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(cannot reach (the )?system daemon|daemon is not running|connection to the daemon)")
        .unwrap()
});
pub static RE_LOGGED_OUT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)(not logged in|you are not logged|please log in)").unwrap());

// ═══════════════════════════════════════════════════════════════════════════════
// Server Info Regexes
// ═══════════════════════════════════════════════════════════════════════════════

pub static RE_CURRENT_SERVER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?im)^\W*current server:[ \t]*(\S.*?)[ \t\r]*$").unwrap());
pub static RE_COUNTRY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?im)^\W*country:[ \t]*(\S.*?)[ \t\r]*$").unwrap());
pub static RE_CITY: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?im)^\W*city:[ \t]*(\S.*?)[ \t\r]*$").unwrap());
pub static RE_SERVER_IP: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?im)^\W*(?:server ip|your new ip):[ \t]*(\S+)").unwrap());
pub static RE_TECHNOLOGY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?im)^\W*current technology:[ \t]*(\S.*?)[ \t\r]*$").unwrap());
pub static RE_PROTOCOL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?im)^\W*current protocol:[ \t]*(\S.*?)[ \t\r]*$").unwrap());
pub static RE_TRANSFER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?im)^\W*transfer:[ \t]*(\S.*?)[ \t]+received,[ \t]*(\S.*?)[ \t]+sent[ \t\r]*$").unwrap()
});
pub static RE_UPTIME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?im)^\W*uptime:[ \t]*(\S.*?)[ \t\r]*$").unwrap());

// ═══════════════════════════════════════════════════════════════════════════════
// Tool Metadata Regexes
// ═══════════════════════════════════════════════════════════════════════════════

pub static RE_VERSION: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\d+\.\d+(?:\.\d+)?)").unwrap());
pub static RE_PLACE_TOKEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z][A-Za-z_]*[A-Za-z]$").unwrap());
pub static RE_PLACE_SEPARATOR: Lazy<Regex> = Lazy::new(|| Regex::new(r"[,\s]+").unwrap());
pub static RE_OPTION_LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\W*([A-Za-z][A-Za-z0-9 /\-]*?):\s*(.*?)\s*$").unwrap());

// ═══════════════════════════════════════════════════════════════════════════════
// Template Regexes
// ═══════════════════════════════════════════════════════════════════════════════

pub static RE_PLACEHOLDER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"%([A-Za-z][A-Za-z0-9_-]*)%").unwrap());
pub static RE_ESCAPE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"\\(?:u\{([0-9A-Fa-f]+)\}|u([0-9A-Fa-f]{4})|x([0-9A-Fa-f]{2})|([1-7][0-7]{0,2}|[0-7]{2,3})|(['"tbrnfv0\\]))|\\U([0-9A-Fa-f]{8})"#,
    )
    .unwrap()
});
