//! Public-API coverage: machine, stores, and the shared data file together.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tempfile::tempdir;
use tunnelbar_core::{
    ops, CommandExecutor, ConnectionState, ConnectionStateMachine, DataFile, FavoritesStore,
    Params, RecentLocationStore, RequestOutcome, Settings, SettingsChange, SettingsHub,
    StorageConfig,
};

/// Minimal stand-in for the VPN tool: a status line and a dispatch log.
#[derive(Default)]
struct FakeTool {
    status: Mutex<String>,
    dispatched: Mutex<Vec<(String, Params)>>,
}

impl FakeTool {
    fn set_status(&self, status: &str) {
        *self.status.lock().unwrap() = status.to_string();
    }
}

impl CommandExecutor for FakeTool {
    fn run_sync(&self, operation: &str, _params: &Params) -> String {
        let status = self.status.lock().unwrap().clone();
        let outputs: HashMap<&str, String> = HashMap::from([
            (ops::TOOL_AVAILABLE, "/usr/bin/nordvpn".to_string()),
            (ops::CONNECTED_CHECK, status.clone()),
            (ops::TRANSITION_CHECK, status.clone()),
            (ops::DAEMON_UNREACHABLE_CHECK, status.clone()),
            (ops::CURRENT_SERVER_GET, status),
            (ops::LOGGED_CHECK, "Account Information:".to_string()),
        ]);
        outputs.get(operation).cloned().unwrap_or_default()
    }

    fn run_async(&self, operation: &str, params: &Params) {
        self.dispatched
            .lock()
            .unwrap()
            .push((operation.to_string(), params.clone()));
    }
}

#[test]
fn test_confirmed_connects_survive_restart() {
    let temp = tempdir().unwrap();
    let storage = StorageConfig::with_root(temp.path().join(".tunnelbar"));

    {
        let data = DataFile::load(&storage.data_file()).unwrap().into_shared();
        let recent = Arc::new(Mutex::new(RecentLocationStore::open(data, 2)));
        let tool = Arc::new(FakeTool::default());
        let machine = ConnectionStateMachine::new(tool.clone()).with_recent(recent.clone());

        for location in ["France", "Spain", "Italy"] {
            tool.set_status("Status: Disconnected");
            machine.reconcile();
            assert_eq!(machine.request_connect(location), RequestOutcome::Dispatched);
            tool.set_status("Status: Connected\nCountry: Somewhere\n");
            machine.reconcile();
            assert_eq!(machine.state(), ConnectionState::Connected);
        }
        assert_eq!(tool.dispatched.lock().unwrap().len(), 3);
    }

    let data = DataFile::load(&storage.data_file()).unwrap();
    assert_eq!(data.document().recent.regular, vec!["Italy", "Spain"]);
}

#[test]
fn test_stores_share_one_document() {
    let temp = tempdir().unwrap();
    let path = temp.path().join("data.json");
    let data = DataFile::load(&path).unwrap().into_shared();

    let mut favorites = FavoritesStore::open(data.clone());
    let mut recent = RecentLocationStore::open(data, 3);

    favorites.add_server("fr812", "France", "Paris");
    recent.add("Germany");
    recent.pin("Japan");

    let content = fs_err::read_to_string(&path).unwrap();
    let json: serde_json::Value = serde_json::from_str(&content).unwrap();
    assert_eq!(json["fav"]["fr812"], "France, Paris");
    assert_eq!(json["recent"]["pin"][0], "Japan");
    assert_eq!(json["recent"]["regular"][0], "Germany");
}

#[test]
fn test_capacity_setting_reaches_store() {
    let temp = tempdir().unwrap();
    let data = DataFile::load(&temp.path().join("data.json"))
        .unwrap()
        .into_shared();
    let recent = Arc::new(Mutex::new(RecentLocationStore::open(data, 4)));
    {
        let mut store = recent.lock().unwrap();
        for location in ["a", "b", "c", "d"] {
            store.add(location);
        }
    }

    let hub = SettingsHub::new(Settings::default());
    hub.subscribe(recent.clone());
    let changes = hub.update(|s| s.recent_capacity = 2);

    assert_eq!(changes, vec![SettingsChange::RecentCapacity(2)]);
    let store = recent.lock().unwrap();
    assert_eq!(
        store.entries().map(|(l, _)| l).collect::<Vec<_>>(),
        vec!["d", "c"]
    );
}
