//! Parsers over the VPN tool's text output.
//!
//! Everything here is a pure function of the output string. Empty output
//! (the executor's answer for "could not run") always parses to the
//! conservative result.

use crate::patterns::{
    RE_DAEMON_UNREACHABLE, RE_LOGGED_OUT, RE_OPTION_LINE, RE_PLACE_SEPARATOR, RE_PLACE_TOKEN,
    RE_STATUS_CONNECTED, RE_STATUS_TRANSITIONING, RE_VERSION,
};

// ═══════════════════════════════════════════════════════════════════════════════
// Probe parsers
// ═══════════════════════════════════════════════════════════════════════════════

pub fn tool_present(output: &str) -> bool {
    !output.trim().is_empty()
}

pub fn connected(output: &str) -> bool {
    RE_STATUS_CONNECTED.is_match(output)
}

pub fn transitioning(output: &str) -> bool {
    RE_STATUS_TRANSITIONING.is_match(output)
}

pub fn daemon_unreachable(output: &str) -> bool {
    RE_DAEMON_UNREACHABLE.is_match(output)
}

/// Logged in only when the account query answered and did not complain.
pub fn logged_in(output: &str) -> bool {
    !output.trim().is_empty() && !RE_LOGGED_OUT.is_match(output)
}

// ═══════════════════════════════════════════════════════════════════════════════
// Metadata parsers
// ═══════════════════════════════════════════════════════════════════════════════

/// First `x.y` or `x.y.z` in the version banner.
pub fn version(output: &str) -> Option<String> {
    RE_VERSION
        .captures(output)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

/// Splits a country/group/city listing into names.
///
/// The tool prints names separated by commas, tabs, or newlines, sometimes
/// preceded by spinner characters (`-`, `\`, `|`, `/`). Tokens that are not
/// plain `Word_Word` names are dropped; duplicates keep their first position.
pub fn places(output: &str) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for token in RE_PLACE_SEPARATOR.split(output) {
        if !RE_PLACE_TOKEN.is_match(token) {
            continue;
        }
        if !names.iter().any(|n| n == token) {
            names.push(token.to_string());
        }
    }
    names
}

/// Parses `Key: value` lines from the tool's settings listing.
///
/// Lines without a colon, or with an empty value, are skipped.
pub fn options(output: &str) -> Vec<(String, String)> {
    output
        .lines()
        .filter_map(|line| {
            let caps = RE_OPTION_LINE.captures(line)?;
            let key = caps.get(1)?.as_str().trim();
            let value = caps.get(2)?.as_str().trim();
            if key.is_empty() || value.is_empty() {
                return None;
            }
            Some((key.to_string(), value.to_string()))
        })
        .collect()
}

/// Turns a displayed option name into the token the tool's `set` expects
/// (`Kill Switch` → `killswitch`).
pub fn option_key(display_name: &str) -> String {
    display_name
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_probe_parsers_on_tool_output() {
        assert!(tool_present("/usr/bin/nordvpn\n"));
        assert!(!tool_present("  \n"));

        assert!(connected("Status: Connected\nCountry: France\n"));
        assert!(!connected("Status: Disconnected\n"));

        assert!(transitioning("\r-\r  \rStatus: Connecting\n"));
        assert!(!transitioning("Status: Connected\n"));

        assert!(daemon_unreachable("Cannot reach System Daemon.\n"));
        assert!(!daemon_unreachable("Status: Disconnected\n"));

        assert!(logged_in("Account Information:\nEmail Address: a@b.c\n"));
        assert!(!logged_in("You are not logged in.\n"));
        assert!(!logged_in(""));
    }

    #[test]
    fn test_version_from_banner() {
        assert_eq!(
            version("NordVPN Version 3.17.2\n"),
            Some("3.17.2".to_string())
        );
        assert_eq!(version("tool 4.1"), Some("4.1".to_string()));
        assert_eq!(version(""), None);
    }

    #[test]
    fn test_places_strip_spinner_and_dedup() {
        let output = "\r-\r  \rAlbania, Argentina\tUnited_Kingdom\n\
                      Argentina\n/\nCosta_Rica,";
        assert_eq!(
            places(output),
            vec!["Albania", "Argentina", "United_Kingdom", "Costa_Rica"]
        );
        assert!(places("").is_empty());
    }

    #[test]
    fn test_options_keep_key_value_lines() {
        let output = "\r-\r  \rTechnology: NORDLYNX\n\
                      Firewall: enabled\n\
                      Kill Switch: disabled\n\
                      DNS: \n\
                      garbage line\n";
        assert_eq!(
            options(output),
            vec![
                ("Technology".to_string(), "NORDLYNX".to_string()),
                ("Firewall".to_string(), "enabled".to_string()),
                ("Kill Switch".to_string(), "disabled".to_string()),
            ]
        );
    }

    #[test]
    fn test_option_key_normalizes_display_name() {
        assert_eq!(option_key("Kill Switch"), "killswitch");
        assert_eq!(option_key("Auto-connect"), "autoconnect");
    }
}
