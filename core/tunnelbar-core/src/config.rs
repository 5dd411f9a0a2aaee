//! User settings: loading, saving, and change notification.
//!
//! Settings live in `~/.tunnelbar/config.toml`. A missing file means
//! defaults. Components never read a global; they receive a [`Settings`]
//! value at construction and subscribe to a [`SettingsHub`] for changes.
//!
//! ```toml
//! poll_interval_secs = 2
//! monitoring = true
//! recent_capacity = 4
//! settings_change_reconnect = true
//!
//! [commands]
//! connect = "nordvpn connect %target%"
//! ```

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{Result, TunnelbarError};
use crate::executor::{CommandTable, DEFAULT_SHELL};

pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 2;
pub const DEFAULT_RECENT_CAPACITY: usize = 4;
pub const DEFAULT_HELP_URL: &str = "https://support.nordvpn.com/hc/en-us/articles/20196094470929";

fn default_poll_interval_secs() -> u64 {
    DEFAULT_POLL_INTERVAL_SECS
}

fn default_recent_capacity() -> usize {
    DEFAULT_RECENT_CAPACITY
}

fn default_true() -> bool {
    true
}

fn default_shell() -> String {
    DEFAULT_SHELL.to_string()
}

fn default_help_url() -> String {
    DEFAULT_HELP_URL.to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
    #[serde(default = "default_true")]
    pub monitoring: bool,
    #[serde(default = "default_recent_capacity")]
    pub recent_capacity: usize,
    /// Reconnect after changing a tool option so it takes effect.
    #[serde(default = "default_true")]
    pub settings_change_reconnect: bool,
    #[serde(default = "default_help_url")]
    pub help_url: String,
    #[serde(default = "default_shell")]
    pub shell: String,
    /// Operation name → command template overrides.
    #[serde(default)]
    pub commands: BTreeMap<String, String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            poll_interval_secs: DEFAULT_POLL_INTERVAL_SECS,
            monitoring: true,
            recent_capacity: DEFAULT_RECENT_CAPACITY,
            settings_change_reconnect: true,
            help_url: default_help_url(),
            shell: default_shell(),
            commands: BTreeMap::new(),
        }
    }
}

impl Settings {
    /// Loads settings from `path`, returning defaults if it doesn't exist.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!(path = %path.display(), "No settings file, using defaults");
            return Ok(Self::default());
        }

        let content = fs_err::read_to_string(path)
            .map_err(|e| TunnelbarError::io("Failed to read settings", e))?;
        let settings: Settings =
            toml::from_str(&content).map_err(|e| TunnelbarError::ConfigMalformed {
                path: path.to_path_buf(),
                details: e.to_string(),
            })?;
        Ok(settings.normalized())
    }

    /// Writes settings to `path`, creating the parent directory if needed.
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self).map_err(|e| TunnelbarError::ConfigMalformed {
            path: path.to_path_buf(),
            details: e.to_string(),
        })?;
        if let Some(parent) = path.parent() {
            fs_err::create_dir_all(parent).map_err(|source| TunnelbarError::ConfigWriteFailed {
                path: path.to_path_buf(),
                source,
            })?;
        }
        fs_err::write(path, content).map_err(|source| TunnelbarError::ConfigWriteFailed {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Clamps zero interval/capacity to 1.
    pub fn normalized(mut self) -> Self {
        if self.poll_interval_secs == 0 {
            warn!("poll_interval_secs = 0 is not allowed, using 1");
            self.poll_interval_secs = 1;
        }
        if self.recent_capacity == 0 {
            warn!("recent_capacity = 0 is not allowed, using 1");
            self.recent_capacity = 1;
        }
        self
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs.max(1))
    }

    pub fn command_table(&self) -> CommandTable {
        CommandTable::with_overrides(&self.shell, &self.commands)
    }
}

/// One observable difference between two [`Settings`] values.
#[derive(Debug, Clone, PartialEq)]
pub enum SettingsChange {
    PollInterval(Duration),
    Monitoring(bool),
    RecentCapacity(usize),
    Commands(CommandTable),
    HelpUrl(String),
    SettingsChangeReconnect(bool),
}

/// Lists the changes that turn `old` into `new`.
pub fn diff_settings(old: &Settings, new: &Settings) -> Vec<SettingsChange> {
    let mut changes = Vec::new();
    if old.poll_interval_secs != new.poll_interval_secs {
        changes.push(SettingsChange::PollInterval(new.poll_interval()));
    }
    if old.monitoring != new.monitoring {
        changes.push(SettingsChange::Monitoring(new.monitoring));
    }
    if old.recent_capacity != new.recent_capacity {
        changes.push(SettingsChange::RecentCapacity(new.recent_capacity));
    }
    if old.shell != new.shell || old.commands != new.commands {
        changes.push(SettingsChange::Commands(new.command_table()));
    }
    if old.help_url != new.help_url {
        changes.push(SettingsChange::HelpUrl(new.help_url.clone()));
    }
    if old.settings_change_reconnect != new.settings_change_reconnect {
        changes.push(SettingsChange::SettingsChangeReconnect(
            new.settings_change_reconnect,
        ));
    }
    changes
}

/// Receives settings changes.
pub trait SettingsObserver: Send + Sync {
    fn settings_changed(&self, change: &SettingsChange);
}

/// Holds the current settings and fans out changes to observers.
pub struct SettingsHub {
    current: Mutex<Settings>,
    observers: Mutex<Vec<Arc<dyn SettingsObserver>>>,
}

impl SettingsHub {
    pub fn new(settings: Settings) -> Self {
        Self {
            current: Mutex::new(settings.normalized()),
            observers: Mutex::new(Vec::new()),
        }
    }

    pub fn subscribe(&self, observer: Arc<dyn SettingsObserver>) {
        self.observers
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(observer);
    }

    pub fn current(&self) -> Settings {
        self.current
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Applies `edit`, then notifies observers of each resulting change.
    /// Returns the changes that were delivered.
    pub fn update(&self, edit: impl FnOnce(&mut Settings)) -> Vec<SettingsChange> {
        let changes = {
            let mut current = self
                .current
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            let mut next = current.clone();
            edit(&mut next);
            let next = next.normalized();
            let changes = diff_settings(&current, &next);
            *current = next;
            changes
        };

        let observers = self
            .observers
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone();
        for change in &changes {
            debug!(?change, "Settings changed");
            for observer in &observers {
                observer.settings_changed(change);
            }
        }
        changes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    struct Recorder(Mutex<Vec<SettingsChange>>);

    impl SettingsObserver for Recorder {
        fn settings_changed(&self, change: &SettingsChange) {
            self.0.lock().unwrap().push(change.clone());
        }
    }

    #[test]
    fn test_load_missing_file_returns_defaults() {
        let temp = tempdir().unwrap();
        let settings = Settings::load(&temp.path().join("missing.toml")).unwrap();
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.poll_interval(), Duration::from_secs(2));
        assert_eq!(settings.recent_capacity, 4);
    }

    #[test]
    fn test_load_parses_partial_file_and_overrides() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("config.toml");
        fs_err::write(
            &path,
            r#"
poll_interval_secs = 5
recent_capacity = 0

[commands]
connect = "vpn up %target%"
"#,
        )
        .unwrap();

        let settings = Settings::load(&path).unwrap();
        assert_eq!(settings.poll_interval_secs, 5);
        assert_eq!(settings.recent_capacity, 1);
        assert!(settings.monitoring);
        assert_eq!(
            settings.command_table().template("connect"),
            Some("vpn up %target%")
        );
    }

    #[test]
    fn test_load_malformed_file_is_error() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("config.toml");
        fs_err::write(&path, "poll_interval_secs = \"soon\"").unwrap();
        assert!(matches!(
            Settings::load(&path),
            Err(TunnelbarError::ConfigMalformed { .. })
        ));
    }

    #[test]
    fn test_save_then_load_round_trip() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("nested").join("config.toml");
        let mut settings = Settings::default();
        settings.monitoring = false;
        settings
            .commands
            .insert("disconnect".to_string(), "vpn down".to_string());

        settings.save(&path).unwrap();
        assert_eq!(Settings::load(&path).unwrap(), settings);
    }

    #[test]
    fn test_hub_notifies_only_changed_fields() {
        let hub = SettingsHub::new(Settings::default());
        let recorder = Arc::new(Recorder(Mutex::new(Vec::new())));
        hub.subscribe(recorder.clone());

        let changes = hub.update(|s| {
            s.poll_interval_secs = 10;
            s.monitoring = true;
        });

        assert_eq!(
            changes,
            vec![SettingsChange::PollInterval(Duration::from_secs(10))]
        );
        assert_eq!(recorder.0.lock().unwrap().len(), 1);
        assert_eq!(hub.current().poll_interval_secs, 10);
    }

    #[test]
    fn test_hub_reports_command_table_changes() {
        let hub = SettingsHub::new(Settings::default());
        let changes = hub.update(|s| {
            s.commands
                .insert("connect".to_string(), "other %target%".to_string());
        });
        match changes.as_slice() {
            [SettingsChange::Commands(table)] => {
                assert_eq!(table.template("connect"), Some("other %target%"))
            }
            other => panic!("unexpected changes: {other:?}"),
        }
    }
}
