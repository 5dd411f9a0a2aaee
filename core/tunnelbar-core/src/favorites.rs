//! Favorite servers: a persisted map from server id to a display label.
//!
//! Unlike the recent list this has no capacity. Entries iterate in id
//! order.

use std::collections::BTreeMap;

use tracing::warn;

use crate::persistence::{self, SharedDataFile};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FavoriteEvent {
    Added { id: String, label: String },
    Removed(String),
}

type FavoriteCallback = Box<dyn Fn(&FavoriteEvent) + Send>;

pub struct FavoritesStore {
    entries: BTreeMap<String, String>,
    file: SharedDataFile,
    listener: Option<FavoriteCallback>,
    cursor: usize,
}

impl FavoritesStore {
    pub fn open(file: SharedDataFile) -> Self {
        let entries = persistence::lock(&file).document().fav.clone();
        FavoritesStore {
            entries,
            file,
            listener: None,
            cursor: 0,
        }
    }

    pub fn set_listener(&mut self, listener: impl Fn(&FavoriteEvent) + Send + 'static) {
        self.listener = Some(Box::new(listener));
    }

    /// Adds or relabels `id`.
    pub fn add(&mut self, id: &str, label: &str) {
        if id.is_empty() {
            return;
        }
        self.entries.insert(id.to_string(), label.to_string());
        self.emit(FavoriteEvent::Added {
            id: id.to_string(),
            label: label.to_string(),
        });
        self.persist();
    }

    /// Adds a server labelled `"Country, City"`.
    pub fn add_server(&mut self, server: &str, country: &str, city: &str) {
        self.add(server, &format!("{country}, {city}"));
    }

    /// Returns whether `id` was a favorite.
    pub fn remove(&mut self, id: &str) -> bool {
        if self.entries.remove(id).is_none() {
            return false;
        }
        self.emit(FavoriteEvent::Removed(id.to_string()));
        self.persist();
        true
    }

    pub fn is_favorite(&self, id: &str) -> bool {
        self.entries.contains_key(id)
    }

    pub fn label(&self, id: &str) -> Option<&str> {
        self.entries.get(id).map(String::as_str)
    }

    pub fn count(&self) -> usize {
        self.entries.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> + '_ {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Resets the cursor and returns the first `(id, label)`.
    pub fn first(&mut self) -> Option<(String, String)> {
        self.cursor = 0;
        self.entry_at(0)
    }

    pub fn next_entry(&mut self) -> Option<(String, String)> {
        if self.cursor >= self.entries.len() {
            return None;
        }
        self.cursor += 1;
        self.entry_at(self.cursor)
    }

    fn entry_at(&self, index: usize) -> Option<(String, String)> {
        self.entries
            .iter()
            .nth(index)
            .map(|(k, v)| (k.clone(), v.clone()))
    }

    fn emit(&self, event: FavoriteEvent) {
        if let Some(listener) = &self.listener {
            listener(&event);
        }
    }

    fn persist(&self) {
        let mut data = persistence::lock(&self.file);
        data.document_mut().fav = self.entries.clone();
        if let Err(e) = data.save() {
            warn!(error = %e, "Failed to save favorites");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::DataFile;
    use std::sync::{Arc, Mutex};

    #[test]
    fn test_add_server_formats_label() {
        let mut store = FavoritesStore::open(DataFile::new_in_memory().into_shared());
        store.add_server("fr812", "France", "Paris");
        assert_eq!(store.label("fr812"), Some("France, Paris"));
        assert!(store.is_favorite("fr812"));
        assert_eq!(store.count(), 1);
    }

    #[test]
    fn test_remove_reports_presence() {
        let mut store = FavoritesStore::open(DataFile::new_in_memory().into_shared());
        store.add("de507", "Germany, Berlin");
        assert!(store.remove("de507"));
        assert!(!store.remove("de507"));
        assert_eq!(store.count(), 0);
    }

    #[test]
    fn test_cursor_iteration() {
        let mut store = FavoritesStore::open(DataFile::new_in_memory().into_shared());
        store.add("b", "B");
        store.add("a", "A");
        assert_eq!(store.first(), Some(("a".to_string(), "A".to_string())));
        assert_eq!(store.next_entry(), Some(("b".to_string(), "B".to_string())));
        assert_eq!(store.next_entry(), None);
    }

    #[test]
    fn test_events_and_persistence() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("data.json");
        let file = DataFile::load(&path).unwrap().into_shared();

        let mut store = FavoritesStore::open(file);
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = events.clone();
        store.set_listener(move |event| sink.lock().unwrap().push(event.clone()));

        store.add("us42", "United States, Miami");
        store.remove("missing");

        assert_eq!(events.lock().unwrap().len(), 1);
        let reloaded = DataFile::load(&path).unwrap();
        assert_eq!(
            reloaded.document().fav.get("us42").map(String::as_str),
            Some("United States, Miami")
        );
    }
}
