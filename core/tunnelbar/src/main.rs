//! tunnelbar: status indicator and control surface for a VPN client tool.
//!
//! Every subcommand drives the VPN tool through the command table in
//! `~/.tunnelbar/config.toml`; recent locations and favorites persist in
//! `~/.tunnelbar/data.json`.
//!
//! ## Subcommands
//!
//! - `status`, `watch`: report the connection state
//! - `connect`, `disconnect`, `reconnect`, `activate`: change it
//! - `recent`, `fav`: manage the location lists
//! - `places`, `options`, `version`: query the tool

mod app;
mod connection;
mod error;
mod locations;
mod logging;
mod tool;

use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tunnelbar_core::StorageConfig;

use crate::app::App;
use crate::connection::WaitOptions;
use crate::error::CliResult;
use crate::tool::PlaceKind;

#[derive(Parser)]
#[command(name = "tunnelbar")]
#[command(about = "VPN connection status indicator")]
#[command(version)]
struct Cli {
    /// Data directory (defaults to ~/.tunnelbar)
    #[arg(long, global = true, value_name = "DIR")]
    root: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Args)]
struct WaitArgs {
    /// Return as soon as the command is dispatched. The location is then
    /// not added to the recent list, and a reconnect stops after its
    /// disconnect
    #[arg(long)]
    no_wait: bool,

    /// Seconds to wait for the tool to confirm
    #[arg(long, default_value_t = 30)]
    timeout: u64,
}

impl WaitArgs {
    fn options(&self) -> WaitOptions {
        WaitOptions {
            wait: !self.no_wait,
            timeout: Duration::from_secs(self.timeout),
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Print the current connection state
    Status {
        #[arg(long)]
        json: bool,
    },

    /// Poll the tool and print each state change
    Watch {
        /// Exit after this many changes
        #[arg(long, value_name = "N")]
        changes: Option<usize>,
    },

    /// Connect to a location (country, city, group, or server)
    Connect {
        #[arg(value_name = "TARGET", default_value = "")]
        target: String,
        #[command(flatten)]
        wait: WaitArgs,
    },

    /// Disconnect
    Disconnect {
        #[command(flatten)]
        wait: WaitArgs,
    },

    /// Disconnect, then connect to a new location
    Reconnect {
        #[arg(value_name = "TARGET", default_value = "")]
        target: String,
        #[command(flatten)]
        wait: WaitArgs,
    },

    /// Press the indicator button
    Activate {
        /// Location currently selected in the menu
        #[arg(long)]
        selected: Option<String>,
        #[command(flatten)]
        wait: WaitArgs,
    },

    /// Recently used locations
    Recent {
        #[command(subcommand)]
        command: RecentCommands,
    },

    /// Favorite servers
    Fav {
        #[command(subcommand)]
        command: FavCommands,
    },

    /// Locations the tool offers
    Places {
        #[command(subcommand)]
        command: PlaceCommands,
    },

    /// Tool settings
    Options {
        #[command(subcommand)]
        command: OptionCommands,
    },

    /// Print tunnelbar and VPN tool versions
    Version,
}

#[derive(Subcommand)]
enum RecentCommands {
    /// List pinned then regular entries
    List {
        #[arg(long)]
        json: bool,
    },
    /// Record a location as most recently used
    Add { location: String },
    Pin { location: String },
    Unpin { location: String },
    /// Show or change how many entries are kept
    Capacity { value: Option<usize> },
    /// Keep one entry matching a regex, delete the rest
    Dedup {
        pattern: String,
        #[arg(long)]
        first_only: bool,
    },
    /// Rename entries equal to OLD
    Rename {
        old: String,
        new: String,
        #[arg(long)]
        first_only: bool,
    },
    /// Rename the entry at a list index
    RenameAt { index: usize, new: String },
}

#[derive(Subcommand)]
enum FavCommands {
    List,
    /// Add a server; without an id, adds the connected server
    Add {
        id: Option<String>,
        label: Option<String>,
    },
    Remove { id: String },
}

#[derive(Subcommand)]
enum PlaceCommands {
    Countries,
    Groups,
    Cities { country: String },
}

#[derive(Subcommand)]
enum OptionCommands {
    List,
    /// Set an option; reconnects when connected and
    /// `settings_change_reconnect` is on
    Set {
        option: String,
        value: String,
        #[command(flatten)]
        wait: WaitArgs,
    },
}

fn run(cli: Cli) -> CliResult {
    let app = App::open(cli.root)?;

    match cli.command {
        Commands::Status { json } => connection::status(&app, json),
        Commands::Watch { changes } => connection::watch(&app, changes),
        Commands::Connect { target, wait } => {
            connection::connect(&app, &target, &wait.options())
        }
        Commands::Disconnect { wait } => connection::disconnect(&app, &wait.options()),
        Commands::Reconnect { target, wait } => {
            connection::reconnect(&app, &target, &wait.options())
        }
        Commands::Activate { selected, wait } => {
            connection::activate(&app, selected.as_deref(), &wait.options())
        }
        Commands::Recent { command } => match command {
            RecentCommands::List { json } => locations::recent_list(&app, json),
            RecentCommands::Add { location } => locations::recent_add(&app, &location),
            RecentCommands::Pin { location } => locations::recent_pin(&app, &location),
            RecentCommands::Unpin { location } => locations::recent_unpin(&app, &location),
            RecentCommands::Capacity { value } => locations::recent_capacity(&app, value),
            RecentCommands::Dedup {
                pattern,
                first_only,
            } => locations::recent_dedup(&app, &pattern, first_only),
            RecentCommands::Rename {
                old,
                new,
                first_only,
            } => locations::recent_rename(&app, &old, &new, first_only),
            RecentCommands::RenameAt { index, new } => {
                locations::recent_rename_at(&app, index, &new)
            }
        },
        Commands::Fav { command } => match command {
            FavCommands::List => locations::fav_list(&app),
            FavCommands::Add { id, label } => {
                locations::fav_add(&app, id.as_deref(), label.as_deref())
            }
            FavCommands::Remove { id } => locations::fav_remove(&app, &id),
        },
        Commands::Places { command } => {
            let kind = match command {
                PlaceCommands::Countries => PlaceKind::Countries,
                PlaceCommands::Groups => PlaceKind::Groups,
                PlaceCommands::Cities { country } => PlaceKind::Cities(country),
            };
            tool::places(&app, kind)
        }
        Commands::Options { command } => match command {
            OptionCommands::List => tool::options_list(&app),
            OptionCommands::Set {
                option,
                value,
                wait,
            } => tool::options_set(&app, &option, &value, &wait.options()),
        },
        Commands::Version => tool::version(&app),
    }
}

fn main() {
    let cli = Cli::parse();

    let logs_dir = match &cli.root {
        Some(root) => Some(StorageConfig::with_root(root.clone()).logs_dir()),
        None => StorageConfig::from_home().ok().map(|s| s.logs_dir()),
    };
    let _logging_guard = logging::init(logs_dir.as_deref());

    if let Err(e) = run(cli) {
        tracing::error!(error = %e, "tunnelbar failed");
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_no_wait_help_warns_about_recent_list() {
        let mut cli = Cli::command();
        let connect = cli.find_subcommand_mut("connect").unwrap();
        let no_wait = connect
            .get_arguments()
            .find(|arg| arg.get_id() == "no_wait")
            .unwrap();
        let help = no_wait.get_help().unwrap().to_string();
        assert!(help.contains("not added to the recent list"));
    }

    #[test]
    fn test_options_set_accepts_wait_flags() {
        let cli =
            Cli::try_parse_from(["tunnelbar", "options", "set", "killswitch", "on", "--no-wait"])
                .unwrap();
        match cli.command {
            Commands::Options {
                command: OptionCommands::Set { option, wait, .. },
            } => {
                assert_eq!(option, "killswitch");
                assert!(wait.no_wait);
            }
            _ => panic!("expected options set"),
        }
    }
}
