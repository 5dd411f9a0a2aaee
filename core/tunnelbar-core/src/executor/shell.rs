//! [`CommandExecutor`] backed by `std::process::Command`.

use std::process::{Command, Stdio};
use std::sync::RwLock;
use std::thread;

use tracing::{debug, warn};

use super::{CommandExecutor, CommandTable, Params};
use crate::config::{SettingsChange, SettingsObserver};
use crate::error::{Result, TunnelbarError};

/// Runs rendered templates through the configured shell (`sh -c` by default).
#[derive(Debug)]
pub struct ShellExecutor {
    table: RwLock<CommandTable>,
}

impl ShellExecutor {
    pub fn new(table: CommandTable) -> Self {
        Self {
            table: RwLock::new(table),
        }
    }

    /// Swaps the command table; in-flight commands keep their old template.
    pub fn set_table(&self, table: CommandTable) {
        match self.table.write() {
            Ok(mut guard) => *guard = table,
            Err(poisoned) => *poisoned.into_inner() = table,
        }
    }

    fn build_command(&self, operation: &str, params: &Params) -> Result<Command> {
        let table = self
            .table
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let line = table
            .render(operation, params)
            .ok_or_else(|| TunnelbarError::UnknownOperation(operation.to_string()))?;
        let (program, args) =
            table
                .shell()
                .split_first()
                .ok_or_else(|| TunnelbarError::CommandFailed {
                    operation: operation.to_string(),
                    details: "empty shell configuration".to_string(),
                })?;

        debug!(operation, command = %line, "Rendering command");
        let mut command = Command::new(program);
        command.args(args).arg(line).stdin(Stdio::null());
        Ok(command)
    }

    /// Runs `operation` and returns stdout, surfacing failures as errors.
    pub fn try_run_sync(&self, operation: &str, params: &Params) -> Result<String> {
        let output = self
            .build_command(operation, params)?
            .stderr(Stdio::null())
            .output()
            .map_err(|e| TunnelbarError::CommandFailed {
                operation: operation.to_string(),
                details: e.to_string(),
            })?;

        if !output.status.success() {
            debug!(operation, status = %output.status, "Command exited unsuccessfully");
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    /// Spawns `operation` and reaps it on a detached thread.
    pub fn try_run_async(&self, operation: &str, params: &Params) -> Result<()> {
        let mut child = self
            .build_command(operation, params)?
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| TunnelbarError::CommandFailed {
                operation: operation.to_string(),
                details: e.to_string(),
            })?;

        let operation = operation.to_string();
        thread::spawn(move || match child.wait() {
            Ok(status) if status.success() => debug!(%operation, "Async command finished"),
            Ok(status) => warn!(%operation, %status, "Async command failed"),
            Err(err) => warn!(%operation, error = %err, "Failed to wait for async command"),
        });
        Ok(())
    }
}

impl CommandExecutor for ShellExecutor {
    fn run_sync(&self, operation: &str, params: &Params) -> String {
        match self.try_run_sync(operation, params) {
            Ok(output) => output,
            Err(TunnelbarError::UnknownOperation(op)) => {
                debug!(operation = %op, "No template configured, treating output as empty");
                String::new()
            }
            Err(err) => {
                warn!(error = %err, "Command failed, treating output as empty");
                String::new()
            }
        }
    }

    fn run_async(&self, operation: &str, params: &Params) {
        if let Err(err) = self.try_run_async(operation, params) {
            warn!(error = %err, "Failed to dispatch async command");
        }
    }
}

impl SettingsObserver for ShellExecutor {
    fn settings_changed(&self, change: &SettingsChange) {
        if let SettingsChange::Commands(table) = change {
            self.set_table(table.clone());
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::executor::{ops, params};

    fn executor_with(op: &str, template: &str) -> ShellExecutor {
        let mut table = CommandTable::empty();
        table.set(op, template);
        ShellExecutor::new(table)
    }

    #[test]
    fn test_run_sync_returns_stdout() {
        let executor = executor_with("echo", "echo %word%");
        let output = executor.run_sync("echo", &params([("word", "hello")]));
        assert_eq!(output.trim(), "hello");
    }

    #[test]
    fn test_unknown_operation_yields_empty_output() {
        let executor = ShellExecutor::new(CommandTable::empty());
        assert_eq!(executor.run_sync(ops::CONNECTED_CHECK, &Params::new()), "");
        assert!(matches!(
            executor.try_run_sync(ops::CONNECTED_CHECK, &Params::new()),
            Err(TunnelbarError::UnknownOperation(_))
        ));
    }

    #[test]
    fn test_missing_binary_yields_empty_output() {
        let executor = executor_with("missing", "definitely-not-a-real-binary-xyz");
        assert_eq!(executor.run_sync("missing", &Params::new()), "");
    }

    #[test]
    fn test_settings_change_swaps_table() {
        let executor = executor_with("echo", "echo one");
        let mut table = CommandTable::empty();
        table.set("echo", "echo two");
        executor.settings_changed(&SettingsChange::Commands(table));
        assert_eq!(executor.run_sync("echo", &Params::new()).trim(), "two");
    }
}
