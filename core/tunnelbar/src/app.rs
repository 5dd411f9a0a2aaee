//! Wires the core components together for one CLI invocation.

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use tunnelbar_core::{
    CommandExecutor, ConnectionStateMachine, DataFile, FavoritesStore, RecentLocationStore,
    Settings, SettingsHub, SharedDataFile, ShellExecutor, StatusListener, StorageConfig,
};

use crate::error::CliResult;

pub struct App {
    pub storage: StorageConfig,
    pub hub: SettingsHub,
    pub executor: Arc<dyn CommandExecutor>,
    pub data: SharedDataFile,
    pub recent: Arc<Mutex<RecentLocationStore>>,
}

impl App {
    /// Resolves paths (`root` overrides `~/.tunnelbar`) and loads settings
    /// and the data file.
    pub fn open(root: Option<PathBuf>) -> CliResult<Self> {
        let storage = match root {
            Some(root) => StorageConfig::with_root(root),
            None => StorageConfig::from_home()?,
        };
        storage.ensure_dirs()?;
        let settings = Settings::load(&storage.config_file())?;
        let shell = Arc::new(ShellExecutor::new(settings.command_table()));

        let app = Self::assemble(storage, settings, shell.clone())?;
        app.hub.subscribe(shell);
        Ok(app)
    }

    /// Builds the app around `executor` with already-loaded settings.
    pub(crate) fn assemble(
        storage: StorageConfig,
        settings: Settings,
        executor: Arc<dyn CommandExecutor>,
    ) -> CliResult<Self> {
        let data = DataFile::load(&storage.data_file())?.into_shared();
        let recent = Arc::new(Mutex::new(RecentLocationStore::open(
            data.clone(),
            settings.recent_capacity,
        )));

        let hub = SettingsHub::new(settings);
        hub.subscribe(recent.clone());

        Ok(App {
            storage,
            hub,
            executor,
            data,
            recent,
        })
    }

    pub fn settings(&self) -> Settings {
        self.hub.current()
    }

    /// Builds a machine over this app's executor and recent store.
    pub fn machine(&self, listener: Option<Arc<dyn StatusListener>>) -> Arc<ConnectionStateMachine> {
        let mut machine = ConnectionStateMachine::new(self.executor.clone())
            .with_settings(&self.settings())
            .with_recent(self.recent.clone());
        if let Some(listener) = listener {
            machine = machine.with_listener(listener);
        }
        let machine = Arc::new(machine);
        self.hub.subscribe(machine.clone());
        machine
    }

    pub fn favorites(&self) -> FavoritesStore {
        FavoritesStore::open(self.data.clone())
    }

    /// Applies `edit` to the settings, notifies subscribers, and writes
    /// `config.toml`.
    pub fn update_settings(&self, edit: impl FnOnce(&mut Settings)) -> CliResult {
        self.hub.update(edit);
        self.hub.current().save(&self.storage.config_file())?;
        Ok(())
    }

    pub fn lock_recent(&self) -> std::sync::MutexGuard<'_, RecentLocationStore> {
        self.recent
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
