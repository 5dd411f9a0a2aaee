//! Queries against the VPN tool itself: places, options, version.

use tunnelbar_core::{ConnectionState, RequestOutcome};

use crate::app::App;
use crate::connection::{self, WaitOptions};
use crate::error::{CliError, CliResult};

pub enum PlaceKind {
    Countries,
    Groups,
    Cities(String),
}

pub fn places(app: &App, kind: PlaceKind) -> CliResult {
    let machine = app.machine(None);
    let places = match &kind {
        PlaceKind::Countries => machine.countries(),
        PlaceKind::Groups => machine.groups(),
        PlaceKind::Cities(country) => machine.cities(country),
    };
    for place in places {
        println!("{place}");
    }
    Ok(())
}

pub fn options_list(app: &App) -> CliResult {
    let options = app.machine(None).options();
    if options.is_empty() {
        println!("No options reported");
    }
    for (key, value) in options {
        println!("{key:<20} {value}");
    }
    Ok(())
}

/// Sets an option. A reconnect triggered by the change is waited for like
/// `tunnelbar reconnect`, since its connect only fires from a later reconcile.
pub fn options_set(app: &App, option: &str, value: &str, options: &WaitOptions) -> CliResult {
    let machine = app.machine(None);
    machine.reconcile();
    let change = machine.set_option(option, value);

    let output = change.output.trim();
    if !output.is_empty() {
        println!("{output}");
    }
    match &change.reconnect {
        Some(outcome @ RequestOutcome::Deferred { target }) => {
            match target.as_str() {
                "" => println!("Reconnecting"),
                target => println!("Reconnecting to {target}"),
            }
            connection::warn_if_stranded(outcome, options);
            connection::finish(app, &machine, options, ConnectionState::Connected)
        }
        Some(other) => {
            tracing::debug!(?other, "Reconnect after option change not issued");
            Ok(())
        }
        None => Ok(()),
    }
}

pub fn version(app: &App) -> CliResult {
    let machine = app.machine(None);
    let tool = machine
        .tool_version()
        .ok_or_else(|| CliError::Rejected("VPN tool did not report a version".to_string()))?;
    println!("tunnelbar {}", env!("CARGO_PKG_VERSION"));
    println!("tool      {tool}");
    Ok(())
}
