//! Bounded most-recently-used list of connection targets.
//!
//! Two lists share one capacity:
//!
//! ```text
//!  pinned:  [ most recently pinned, ..., oldest pin ]
//!  regular: [ most recently used,   ..., next to evict ]
//!           len(pinned) + len(regular) <= capacity
//! ```
//!
//! A location is in at most one list. Eviction takes the tail of `regular`
//! first; pinned entries are only evicted by an explicit pin or by shrinking
//! the capacity.
//!
//! [`RecentLocations`] is the in-memory logic. [`RecentLocationStore`] wraps
//! it with persistence through the shared [`DataFile`](crate::persistence::DataFile)
//! and an optional event callback.

use std::sync::Mutex;

use regex::Regex;
use tracing::{debug, warn};

use crate::config::{SettingsChange, SettingsObserver};
use crate::error::{Result, TunnelbarError};
use crate::persistence::{self, RecentSection, SharedDataFile};

/// What [`RecentLocations::add`] did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AddOutcome {
    /// Inserted at the front; there was spare room.
    Added,
    /// Already present; moved to the front.
    Promoted,
    /// Inserted at the front after evicting the returned location.
    Evicted(String),
    /// Pinned locations are left where they are.
    AlreadyPinned,
    /// Every slot is pinned (or the location is empty); nothing changed.
    Rejected,
}

impl AddOutcome {
    pub fn evicted(&self) -> Option<&str> {
        match self {
            AddOutcome::Evicted(location) => Some(location),
            _ => None,
        }
    }

    pub fn changed(&self) -> bool {
        matches!(
            self,
            AddOutcome::Added | AddOutcome::Promoted | AddOutcome::Evicted(_)
        )
    }
}

/// Result of [`RecentLocations::unique`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UniqueResult {
    /// The first match, which is kept.
    pub remaining: Option<String>,
    /// Later matches that were removed, in scan order.
    pub deleted: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecentLocations {
    pinned: Vec<String>,
    regular: Vec<String>,
    capacity: usize,
    cursor: usize,
}

impl RecentLocations {
    /// Creates an empty list. A zero capacity is raised to 1.
    pub fn new(capacity: usize) -> Self {
        RecentLocations {
            pinned: Vec::new(),
            regular: Vec::new(),
            capacity: capacity.max(1),
            cursor: 0,
        }
    }

    /// Builds from a persisted section, trimming to `capacity`.
    /// Returns the list and whatever had to be evicted.
    pub fn from_section(section: &RecentSection, capacity: usize) -> (Self, Vec<String>) {
        let mut locations = Self::new(capacity);
        for location in &section.pin {
            if !location.is_empty() && !locations.contains(location) {
                locations.pinned.push(location.clone());
            }
        }
        for location in &section.regular {
            if !location.is_empty() && !locations.contains(location) {
                locations.regular.push(location.clone());
            }
        }
        let evicted = locations.trim_to_capacity();
        (locations, evicted)
    }

    pub fn to_section(&self) -> RecentSection {
        RecentSection {
            pin: self.pinned.clone(),
            regular: self.regular.clone(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn count(&self) -> usize {
        self.pinned.len() + self.regular.len()
    }

    pub fn is_empty(&self) -> bool {
        self.count() == 0
    }

    pub fn is_pinned(&self, location: &str) -> bool {
        self.pinned.iter().any(|l| l == location)
    }

    pub fn contains(&self, location: &str) -> bool {
        self.is_pinned(location) || self.regular.iter().any(|l| l == location)
    }

    pub fn pinned(&self) -> &[String] {
        &self.pinned
    }

    pub fn regular(&self) -> &[String] {
        &self.regular
    }

    /// Display order: pinned, then regular. Yields `(location, is_pinned)`.
    pub fn entries(&self) -> impl Iterator<Item = (&str, bool)> + '_ {
        self.pinned
            .iter()
            .map(|l| (l.as_str(), true))
            .chain(self.regular.iter().map(|l| (l.as_str(), false)))
    }

    /// Resets the cursor and returns the first entry.
    pub fn first(&mut self) -> Option<(String, bool)> {
        self.cursor = 0;
        self.entry_at(0)
    }

    /// Advances the cursor. `None` once the list is exhausted.
    pub fn next_entry(&mut self) -> Option<(String, bool)> {
        if self.cursor >= self.count() {
            return None;
        }
        self.cursor += 1;
        self.entry_at(self.cursor)
    }

    fn entry_at(&self, index: usize) -> Option<(String, bool)> {
        self.entries()
            .nth(index)
            .map(|(location, pinned)| (location.to_string(), pinned))
    }

    pub fn add(&mut self, location: &str) -> AddOutcome {
        if location.is_empty() {
            return AddOutcome::Rejected;
        }
        if self.is_pinned(location) {
            return AddOutcome::AlreadyPinned;
        }
        if let Some(index) = self.regular.iter().position(|l| l == location) {
            let existing = self.regular.remove(index);
            self.regular.insert(0, existing);
            return AddOutcome::Promoted;
        }

        let outcome = if self.count() >= self.capacity {
            match self.regular.pop() {
                Some(evicted) => AddOutcome::Evicted(evicted),
                None => return AddOutcome::Rejected,
            }
        } else {
            AddOutcome::Added
        };
        self.regular.insert(0, location.to_string());
        outcome
    }

    /// Pins `location`, returning a location evicted to make room.
    pub fn pin(&mut self, location: &str) -> Option<String> {
        if location.is_empty() || self.is_pinned(location) {
            return None;
        }
        if let Some(index) = self.regular.iter().position(|l| l == location) {
            let existing = self.regular.remove(index);
            self.pinned.insert(0, existing);
            return None;
        }

        let evicted = if self.count() >= self.capacity {
            self.regular.pop().or_else(|| self.pinned.pop())
        } else {
            None
        };
        self.pinned.insert(0, location.to_string());
        evicted
    }

    /// Unpins `location` and re-adds it as the most recent regular entry.
    /// Returns whether it was re-inserted.
    pub fn unpin(&mut self, location: &str) -> bool {
        let Some(index) = self.pinned.iter().position(|l| l == location) else {
            return false;
        };
        self.pinned.remove(index);
        if self.count() < self.capacity {
            self.add(location).changed()
        } else {
            false
        }
    }

    /// Changes the capacity, returning entries evicted by a shrink.
    pub fn set_capacity(&mut self, capacity: usize) -> Result<Vec<String>> {
        if capacity == 0 {
            return Err(TunnelbarError::InvalidCapacity(capacity));
        }
        self.capacity = capacity;
        Ok(self.trim_to_capacity())
    }

    fn trim_to_capacity(&mut self) -> Vec<String> {
        let mut evicted = Vec::new();
        while self.count() > self.capacity {
            match self.regular.pop().or_else(|| self.pinned.pop()) {
                Some(location) => evicted.push(location),
                None => break,
            }
        }
        evicted
    }

    /// Keeps the first location matching `pattern` (pinned scanned first)
    /// and removes later matches; with `first_only`, removes at most one.
    pub fn unique(&mut self, pattern: &Regex, first_only: bool) -> UniqueResult {
        let mut result = UniqueResult::default();

        for list in [&mut self.pinned, &mut self.regular] {
            let mut index = 0;
            while index < list.len() {
                if first_only && !result.deleted.is_empty() {
                    return result;
                }
                if !pattern.is_match(&list[index]) {
                    index += 1;
                } else if result.remaining.is_none() {
                    result.remaining = Some(list[index].clone());
                    index += 1;
                } else {
                    result.deleted.push(list.remove(index));
                }
            }
        }
        result
    }

    /// Renames `old` to `new` in place. Returns how many entries changed.
    ///
    /// If `new` already existed, the later duplicate is dropped.
    pub fn modify_name(&mut self, old: &str, new: &str, first_only: bool) -> usize {
        if new.is_empty() || old == new {
            return 0;
        }
        let mut renamed = 0;
        for location in self.pinned.iter_mut().chain(self.regular.iter_mut()) {
            if location == old {
                *location = new.to_string();
                renamed += 1;
                if first_only {
                    break;
                }
            }
        }
        if renamed > 0 {
            self.dedup();
        }
        renamed
    }

    /// Renames the entry at `index` in display order.
    pub fn modify_at(&mut self, index: usize, new: &str) -> bool {
        if new.is_empty() || index >= self.count() {
            return false;
        }
        let pinned_len = self.pinned.len();
        let slot = if index < pinned_len {
            &mut self.pinned[index]
        } else {
            &mut self.regular[index - pinned_len]
        };
        if slot == new {
            return false;
        }
        *slot = new.to_string();
        self.dedup();
        true
    }

    fn dedup(&mut self) {
        let mut seen: Vec<String> = Vec::with_capacity(self.count());
        for list in [&mut self.pinned, &mut self.regular] {
            list.retain(|location| {
                if seen.contains(location) {
                    false
                } else {
                    seen.push(location.clone());
                    true
                }
            });
        }
    }
}

/// Change notifications from a [`RecentLocationStore`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecentEvent {
    Added(String),
    Evicted(String),
    Pinned(String),
    Unpinned(String),
    Removed(String),
    Renamed { from: String, to: String },
}

type RecentCallback = Box<dyn Fn(&RecentEvent) + Send>;

/// [`RecentLocations`] persisted through the shared data file.
///
/// Every mutation ends with a save of the whole document.
pub struct RecentLocationStore {
    locations: RecentLocations,
    file: SharedDataFile,
    listener: Option<RecentCallback>,
}

impl RecentLocationStore {
    /// Reads the recent section from `file`, enforcing `capacity`.
    pub fn open(file: SharedDataFile, capacity: usize) -> Self {
        let (locations, evicted) = {
            let data = persistence::lock(&file);
            RecentLocations::from_section(&data.document().recent, capacity)
        };
        let store = RecentLocationStore {
            locations,
            file,
            listener: None,
        };
        if !evicted.is_empty() {
            debug!(count = evicted.len(), "Trimmed recent locations to capacity");
            store.persist();
        }
        store
    }

    pub fn set_listener(&mut self, listener: impl Fn(&RecentEvent) + Send + 'static) {
        self.listener = Some(Box::new(listener));
    }

    pub fn locations(&self) -> &RecentLocations {
        &self.locations
    }

    pub fn capacity(&self) -> usize {
        self.locations.capacity()
    }

    pub fn count(&self) -> usize {
        self.locations.count()
    }

    pub fn is_pinned(&self, location: &str) -> bool {
        self.locations.is_pinned(location)
    }

    pub fn entries(&self) -> impl Iterator<Item = (&str, bool)> + '_ {
        self.locations.entries()
    }

    pub fn first(&mut self) -> Option<(String, bool)> {
        self.locations.first()
    }

    pub fn next_entry(&mut self) -> Option<(String, bool)> {
        self.locations.next_entry()
    }

    pub fn add(&mut self, location: &str) -> AddOutcome {
        let outcome = self.locations.add(location);
        if outcome.changed() {
            if let Some(evicted) = outcome.evicted() {
                self.emit(RecentEvent::Evicted(evicted.to_string()));
            }
            if outcome != AddOutcome::Promoted {
                self.emit(RecentEvent::Added(location.to_string()));
            }
            self.persist();
        } else if outcome == AddOutcome::Rejected {
            debug!(location, "Recent location rejected, all slots pinned");
        }
        outcome
    }

    pub fn pin(&mut self, location: &str) -> Option<String> {
        if location.is_empty() || self.locations.is_pinned(location) {
            return None;
        }
        let evicted = self.locations.pin(location);
        if let Some(evicted) = &evicted {
            self.emit(RecentEvent::Evicted(evicted.clone()));
        }
        self.emit(RecentEvent::Pinned(location.to_string()));
        self.persist();
        evicted
    }

    pub fn unpin(&mut self, location: &str) -> bool {
        if !self.locations.is_pinned(location) {
            return false;
        }
        let reinserted = self.locations.unpin(location);
        self.emit(RecentEvent::Unpinned(location.to_string()));
        self.persist();
        reinserted
    }

    pub fn set_capacity(&mut self, capacity: usize) -> Result<Vec<String>> {
        let evicted = self.locations.set_capacity(capacity)?;
        for location in &evicted {
            self.emit(RecentEvent::Evicted(location.clone()));
        }
        self.persist();
        Ok(evicted)
    }

    pub fn unique(&mut self, pattern: &Regex, first_only: bool) -> UniqueResult {
        let result = self.locations.unique(pattern, first_only);
        for location in &result.deleted {
            self.emit(RecentEvent::Removed(location.clone()));
        }
        self.persist();
        result
    }

    /// [`unique`](Self::unique) with a pattern compiled from `pattern`.
    pub fn unique_matching(&mut self, pattern: &str, first_only: bool) -> Result<UniqueResult> {
        let pattern = Regex::new(pattern)?;
        Ok(self.unique(&pattern, first_only))
    }

    pub fn modify_name(&mut self, old: &str, new: &str, first_only: bool) -> usize {
        let renamed = self.locations.modify_name(old, new, first_only);
        if renamed > 0 {
            self.emit(RecentEvent::Renamed {
                from: old.to_string(),
                to: new.to_string(),
            });
        }
        self.persist();
        renamed
    }

    pub fn modify_at(&mut self, index: usize, new: &str) -> bool {
        let old = self.locations.entries().nth(index).map(|(l, _)| l.to_string());
        let modified = self.locations.modify_at(index, new);
        if let (true, Some(old)) = (modified, old) {
            self.emit(RecentEvent::Renamed {
                from: old,
                to: new.to_string(),
            });
        }
        self.persist();
        modified
    }

    fn emit(&self, event: RecentEvent) {
        if let Some(listener) = &self.listener {
            listener(&event);
        }
    }

    fn persist(&self) {
        let mut data = persistence::lock(&self.file);
        data.document_mut().recent = self.locations.to_section();
        if let Err(e) = data.save() {
            warn!(error = %e, "Failed to save recent locations");
        }
    }
}

impl SettingsObserver for Mutex<RecentLocationStore> {
    fn settings_changed(&self, change: &SettingsChange) {
        if let SettingsChange::RecentCapacity(capacity) = change {
            let mut store = self.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            if let Err(e) = store.set_capacity(*capacity) {
                warn!(error = %e, "Ignoring recent capacity change");
            }
        }
    }
}
