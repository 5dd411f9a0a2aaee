//! Operation name → command template table.

use std::collections::BTreeMap;

use regex::Captures;

use super::{ops, Params};
use crate::patterns::{RE_ESCAPE, RE_PLACEHOLDER};

/// Shell used to interpret rendered templates.
pub const DEFAULT_SHELL: &str = "sh -c";

const DEFAULT_TEMPLATES: &[(&str, &str)] = &[
    (ops::TOOL_AVAILABLE, "command -v nordvpn"),
    (ops::CONNECTED_CHECK, "nordvpn status"),
    (ops::TRANSITION_CHECK, "nordvpn status"),
    (ops::DAEMON_UNREACHABLE_CHECK, "nordvpn status 2>&1"),
    (ops::LOGGED_CHECK, "nordvpn account 2>&1"),
    (ops::CURRENT_SERVER_GET, "nordvpn status"),
    (ops::CONNECT, "nordvpn connect %target%"),
    (ops::DISCONNECT, "nordvpn disconnect"),
    (ops::GET_VERSION, "nordvpn --version"),
    (ops::GET_COUNTRIES, "nordvpn countries"),
    (ops::GET_GROUPS, "nordvpn groups"),
    (ops::GET_CITIES, "nordvpn cities %country%"),
    (ops::GET_OPTIONS, "nordvpn settings"),
    (ops::OPTION_SET, "nordvpn set %option% %value%"),
    (ops::OPEN_HELP, "xdg-open %url%"),
];

/// The set of command templates the executor may run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandTable {
    shell: Vec<String>,
    templates: BTreeMap<String, String>,
}

impl Default for CommandTable {
    fn default() -> Self {
        Self {
            shell: split_shell(DEFAULT_SHELL),
            templates: DEFAULT_TEMPLATES
                .iter()
                .map(|(op, template)| (op.to_string(), template.to_string()))
                .collect(),
        }
    }
}

impl CommandTable {
    /// An empty table; every operation is unknown.
    pub fn empty() -> Self {
        Self {
            shell: split_shell(DEFAULT_SHELL),
            templates: BTreeMap::new(),
        }
    }

    /// Default templates with user overrides applied.
    ///
    /// Overrides are unescaped, so a config value of `"a\\nb"` yields a real
    /// newline. An override set to the empty string removes the operation.
    pub fn with_overrides(shell: &str, overrides: &BTreeMap<String, String>) -> Self {
        let mut table = Self::default();
        if !shell.trim().is_empty() {
            table.shell = split_shell(shell);
        }
        for (op, template) in overrides {
            let template = unescape(template);
            if template.trim().is_empty() {
                table.templates.remove(op);
            } else {
                table.templates.insert(op.clone(), template);
            }
        }
        table
    }

    pub fn set(&mut self, operation: &str, template: &str) {
        self.templates
            .insert(operation.to_string(), template.to_string());
    }

    pub fn shell(&self) -> &[String] {
        &self.shell
    }

    pub fn template(&self, operation: &str) -> Option<&str> {
        self.templates.get(operation).map(String::as_str)
    }

    /// Renders `operation` with `params` substituted.
    ///
    /// Non-empty values are shell-quoted; empty or missing values vanish so
    /// `nordvpn connect %target%` degrades to a quick connect.
    pub fn render(&self, operation: &str, params: &Params) -> Option<String> {
        let template = self.template(operation)?;
        let rendered = RE_PLACEHOLDER.replace_all(template, |caps: &Captures| {
            match params.get(&caps[1]) {
                Some(value) if !value.is_empty() => shell_quote(value),
                _ => String::new(),
            }
        });
        Some(rendered.trim().to_string())
    }
}

fn split_shell(shell: &str) -> Vec<String> {
    shell.split_whitespace().map(str::to_string).collect()
}

/// Quotes `value` for safe inclusion in a POSIX shell command line.
pub fn shell_quote(value: &str) -> String {
    let plain = value
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.' | '/' | ':' | '@' | '+'));
    if plain && !value.is_empty() {
        value.to_string()
    } else {
        format!("'{}'", value.replace('\'', r"'\''"))
    }
}

/// Interprets backslash escapes that arrive as two literal characters.
///
/// Supports `\n`-style specials, `\xHH`, `\uHHHH`, `\u{H..}`, `\UHHHHHHHH`,
/// and octal `\NNN`. Sequences that do not name a valid char stay as-is.
pub fn unescape(input: &str) -> String {
    RE_ESCAPE
        .replace_all(input, |caps: &Captures| {
            let hex = caps
                .get(1)
                .or_else(|| caps.get(2))
                .or_else(|| caps.get(3))
                .or_else(|| caps.get(6));
            let decoded = if let Some(hex) = hex {
                u32::from_str_radix(hex.as_str(), 16)
                    .ok()
                    .and_then(char::from_u32)
            } else if let Some(octal) = caps.get(4) {
                u32::from_str_radix(octal.as_str(), 8)
                    .ok()
                    .and_then(char::from_u32)
            } else {
                caps.get(5).and_then(|special| match special.as_str() {
                    "0" => Some('\0'),
                    "b" => Some('\u{8}'),
                    "f" => Some('\u{c}'),
                    "n" => Some('\n'),
                    "r" => Some('\r'),
                    "t" => Some('\t'),
                    "v" => Some('\u{b}'),
                    "'" => Some('\''),
                    "\"" => Some('"'),
                    "\\" => Some('\\'),
                    _ => None,
                })
            };
            decoded
                .map(String::from)
                .unwrap_or_else(|| caps[0].to_string())
        })
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::params;

    #[test]
    fn test_default_table_knows_core_operations() {
        let table = CommandTable::default();
        for op in [
            ops::TOOL_AVAILABLE,
            ops::CONNECTED_CHECK,
            ops::TRANSITION_CHECK,
            ops::DAEMON_UNREACHABLE_CHECK,
            ops::LOGGED_CHECK,
            ops::CURRENT_SERVER_GET,
            ops::CONNECT,
            ops::DISCONNECT,
        ] {
            assert!(table.template(op).is_some(), "missing {op}");
        }
        assert_eq!(table.shell(), &["sh".to_string(), "-c".to_string()]);
    }

    #[test]
    fn test_render_substitutes_and_quotes() {
        let table = CommandTable::default();
        let rendered = table
            .render(ops::CONNECT, &params([("target", "United_States")]))
            .unwrap();
        assert_eq!(rendered, "nordvpn connect United_States");

        let rendered = table
            .render(ops::CONNECT, &params([("target", "fr; rm -rf ~")]))
            .unwrap();
        assert_eq!(rendered, "nordvpn connect 'fr; rm -rf ~'");
    }

    #[test]
    fn test_render_drops_empty_placeholder() {
        let table = CommandTable::default();
        let rendered = table.render(ops::CONNECT, &Params::new()).unwrap();
        assert_eq!(rendered, "nordvpn connect");
    }

    #[test]
    fn test_render_unknown_operation_is_none() {
        let table = CommandTable::empty();
        assert!(table.render(ops::CONNECT, &Params::new()).is_none());
    }

    #[test]
    fn test_overrides_replace_and_remove() {
        let mut overrides = BTreeMap::new();
        overrides.insert(ops::CONNECT.to_string(), "vpn up %target%".to_string());
        overrides.insert(ops::GET_GROUPS.to_string(), String::new());
        let table = CommandTable::with_overrides("bash -lc", &overrides);

        assert_eq!(table.template(ops::CONNECT), Some("vpn up %target%"));
        assert!(table.template(ops::GET_GROUPS).is_none());
        assert_eq!(table.shell(), &["bash".to_string(), "-lc".to_string()]);
    }

    #[test]
    fn test_shell_quote_escapes_single_quotes() {
        assert_eq!(shell_quote("it's"), r"'it'\''s'");
        assert_eq!(shell_quote("de"), "de");
        assert_eq!(shell_quote(""), "''");
    }

    #[test]
    fn test_unescape_specials_and_codepoints() {
        assert_eq!(unescape(r"a\nb\tc"), "a\nb\tc");
        assert_eq!(unescape(r"\x41B\u{43}"), "ABC");
        assert_eq!(unescape(r"\101"), "A");
        assert_eq!(unescape(r"\\"), "\\");
        assert_eq!(unescape("plain"), "plain");
    }
}
