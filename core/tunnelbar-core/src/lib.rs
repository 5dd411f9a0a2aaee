//! # tunnelbar-core
//!
//! Core library for tunnelbar: tracks and drives a VPN client tool from a
//! status indicator, and remembers recently used and favorite locations.
//!
//! ## Design Principles
//!
//! - **Synchronous**: No async runtime. Polling runs on one plain thread.
//! - **Tool as a black box**: Every interaction is a named operation run by a
//!   [`CommandExecutor`]; the tool's CLI syntax lives in configuration.
//! - **Graceful degradation**: A missing tool reads as a connection state and a
//!   broken data file reads as an empty one. Errors are for setup and misuse.
//! - **Explicit settings**: Components take a [`Settings`] value and subscribe
//!   to a [`SettingsHub`]; there is no global.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::{Arc, Mutex};
//! use tunnelbar_core::*;
//!
//! let storage = StorageConfig::from_home()?;
//! let settings = Settings::load(&storage.config_file())?;
//! let executor = Arc::new(ShellExecutor::new(settings.command_table()));
//! let data = DataFile::load(&storage.data_file())?.into_shared();
//! let recent = Arc::new(Mutex::new(RecentLocationStore::open(data, settings.recent_capacity)));
//!
//! let machine = Arc::new(
//!     ConnectionStateMachine::new(executor)
//!         .with_settings(&settings)
//!         .with_recent(recent),
//! );
//! let scheduler = PollingScheduler::start(machine.clone(), settings.poll_interval(), true)?;
//! machine.request_connect("Germany");
//! ```

pub mod config;
pub mod error;
pub mod executor;
pub mod favorites;
pub mod parse;
pub mod patterns;
pub mod persistence;
pub mod recent;
pub mod scheduler;
pub mod server_info;
pub mod state;
pub mod storage;

#[cfg(any(test, feature = "test-helpers"))]
pub mod testing;

// Re-export commonly used items at crate root
pub use config::{Settings, SettingsChange, SettingsHub, SettingsObserver};
pub use error::{Result, TunnelbarError};
pub use executor::{ops, params, CommandExecutor, CommandTable, Params, ShellExecutor};
pub use favorites::{FavoriteEvent, FavoritesStore};
pub use persistence::{DataFile, Document, SharedDataFile};
pub use recent::{AddOutcome, RecentEvent, RecentLocationStore, RecentLocations, UniqueResult};
pub use scheduler::{PollingScheduler, Reconcile};
pub use server_info::ServerInfo;
pub use state::{
    ButtonAction, ConnectionState, ConnectionStateMachine, OptionChange, ReconcileOutcome,
    RequestOutcome, StatusListener, StatusSnapshot,
};
pub use storage::StorageConfig;
