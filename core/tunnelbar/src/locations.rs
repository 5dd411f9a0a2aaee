//! Recent-location and favorite commands.

use tunnelbar_core::{AddOutcome, ConnectionState};

use crate::app::App;
use crate::error::{CliError, CliResult};

pub fn recent_list(app: &App, json: bool) -> CliResult {
    let store = app.lock_recent();
    if json {
        let section = store.locations().to_section();
        println!("{}", serde_json::to_string_pretty(&section)?);
        return Ok(());
    }
    if store.count() == 0 {
        println!("No recent locations");
        return Ok(());
    }
    for (index, (location, pinned)) in store.entries().enumerate() {
        let marker = if pinned { "*" } else { " " };
        println!("{index:>3} {marker} {location}");
    }
    Ok(())
}

pub fn recent_add(app: &App, location: &str) -> CliResult {
    let outcome = app.lock_recent().add(location);
    match outcome {
        AddOutcome::Added | AddOutcome::Promoted => println!("{location}"),
        AddOutcome::Evicted(old) => println!("{location} (evicted {old})"),
        AddOutcome::AlreadyPinned => println!("{location} is pinned"),
        AddOutcome::Rejected => {
            return Err(CliError::Rejected(format!(
                "Cannot add {location:?}: every slot is pinned"
            )))
        }
    }
    Ok(())
}

pub fn recent_pin(app: &App, location: &str) -> CliResult {
    match app.lock_recent().pin(location) {
        Some(evicted) => println!("Pinned {location} (evicted {evicted})"),
        None => println!("Pinned {location}"),
    }
    Ok(())
}

pub fn recent_unpin(app: &App, location: &str) -> CliResult {
    if !app.lock_recent().unpin(location) {
        return Err(CliError::Rejected(format!("{location} is not pinned")));
    }
    println!("Unpinned {location}");
    Ok(())
}

/// Shows the capacity, or changes it through the settings so the new value
/// is saved to `config.toml` and applied to the store.
pub fn recent_capacity(app: &App, capacity: Option<usize>) -> CliResult {
    let Some(capacity) = capacity else {
        println!("{}", app.lock_recent().capacity());
        return Ok(());
    };
    if capacity == 0 {
        return Err(tunnelbar_core::TunnelbarError::InvalidCapacity(capacity).into());
    }
    app.update_settings(|settings| settings.recent_capacity = capacity)?;
    println!("{}", app.lock_recent().capacity());
    Ok(())
}

pub fn recent_dedup(app: &App, pattern: &str, first_only: bool) -> CliResult {
    let result = app.lock_recent().unique_matching(pattern, first_only)?;
    for location in &result.deleted {
        println!("Removed {location}");
    }
    match result.remaining {
        Some(kept) => println!("Kept {kept}"),
        None => println!("No match"),
    }
    Ok(())
}

pub fn recent_rename(app: &App, old: &str, new: &str, first_only: bool) -> CliResult {
    let renamed = app.lock_recent().modify_name(old, new, first_only);
    println!("Renamed {renamed} entr{}", if renamed == 1 { "y" } else { "ies" });
    Ok(())
}

pub fn recent_rename_at(app: &App, index: usize, new: &str) -> CliResult {
    if !app.lock_recent().modify_at(index, new) {
        return Err(CliError::Rejected(format!("No entry at index {index}")));
    }
    println!("{index}: {new}");
    Ok(())
}

pub fn fav_list(app: &App) -> CliResult {
    let favorites = app.favorites();
    if favorites.count() == 0 {
        println!("No favorites");
    }
    for (id, label) in favorites.iter() {
        println!("{id:<10} {label}");
    }
    Ok(())
}

/// Adds `id` with `label`, or the currently connected server when no id is
/// given.
pub fn fav_add(app: &App, id: Option<&str>, label: Option<&str>) -> CliResult {
    let mut favorites = app.favorites();
    if let Some(id) = id {
        favorites.add(id, label.unwrap_or(id));
        println!("Added {id}");
        return Ok(());
    }

    let machine = app.machine(None);
    machine.reconcile();
    let server = machine.server_info();
    if machine.state() != ConnectionState::Connected || server.server_id().is_empty() {
        return Err(CliError::Rejected(
            "Not connected; pass a server id".to_string(),
        ));
    }
    favorites.add_server(server.server_id(), &server.country, &server.city);
    println!("Added {}", server.server_id());
    Ok(())
}

pub fn fav_remove(app: &App, id: &str) -> CliResult {
    if !app.favorites().remove(id) {
        return Err(CliError::Rejected(format!("{id} is not a favorite")));
    }
    println!("Removed {id}");
    Ok(())
}
