//! Connection commands: status, watch, connect, disconnect, reconnect,
//! activate.
//!
//! Each invocation is a fresh process, so the machine starts by reconciling
//! once. Requests then poll until the tool confirms the outcome; that
//! confirming reconcile is also what records a connect in the recent list.

use std::sync::mpsc::{self, Sender};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use chrono::Local;
use tunnelbar_core::{
    ButtonAction, ConnectionState, ConnectionStateMachine, PollingScheduler, RequestOutcome,
    ServerInfo, StatusListener,
};

use crate::app::App;
use crate::error::{CliError, CliResult};

pub fn status(app: &App, json: bool) -> CliResult {
    let machine = app.machine(None);
    machine.reconcile();
    let snapshot = machine.snapshot();

    if json {
        println!("{}", serde_json::to_string_pretty(&snapshot)?);
        return Ok(());
    }

    println!("State:   {}", snapshot.state);
    if snapshot.state == ConnectionState::Connected {
        print_server(&snapshot.server);
    }
    Ok(())
}

fn print_server(server: &ServerInfo) {
    let rows = [
        ("Server", &server.server),
        ("Country", &server.country),
        ("City", &server.city),
        ("IP", &server.ip),
        ("Tech", &server.technology),
        ("Proto", &server.protocol),
        ("Uptime", &server.uptime),
    ];
    for (label, value) in rows {
        if !value.is_empty() {
            println!("{:<8} {}", format!("{label}:"), value);
        }
    }
    if !server.transfer_received.is_empty() {
        println!(
            "Traffic: {} received, {} sent",
            server.transfer_received, server.transfer_sent
        );
    }
}

/// Forwards state changes to the printing loop.
struct ChannelListener {
    tx: Mutex<Sender<(ConnectionState, ServerInfo)>>,
}

impl StatusListener for ChannelListener {
    fn state_changed(&self, state: ConnectionState, server: &ServerInfo) {
        let tx = self.tx.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        let _ = tx.send((state, server.clone()));
    }
}

/// Polls in the background and prints every state change.
pub fn watch(app: &App, changes: Option<usize>) -> CliResult {
    let (tx, rx) = mpsc::channel();
    let listener = Arc::new(ChannelListener { tx: Mutex::new(tx) });
    let machine = app.machine(Some(listener));
    let settings = app.settings();

    let scheduler = Arc::new(PollingScheduler::start(
        machine,
        settings.poll_interval(),
        true,
    )?);
    app.hub.subscribe(scheduler.clone());
    tracing::info!(interval = ?settings.poll_interval(), "Watching connection state");

    let mut seen = 0;
    for (state, server) in rx {
        let stamp = Local::now().format("%H:%M:%S");
        match server.summary() {
            summary if summary.is_empty() => println!("{stamp}  {state}"),
            summary => println!("{stamp}  {state}  {summary}"),
        }
        seen += 1;
        if changes.is_some_and(|limit| seen >= limit) {
            break;
        }
    }
    scheduler.shutdown();
    Ok(())
}

pub struct WaitOptions {
    pub wait: bool,
    pub timeout: Duration,
}

/// Reconciles at the poll interval until `done` holds or `timeout` passes.
fn wait_until(
    machine: &ConnectionStateMachine,
    interval: Duration,
    timeout: Duration,
    what: &str,
    done: impl Fn(&ConnectionStateMachine) -> bool,
) -> CliResult {
    let deadline = Instant::now() + timeout;
    loop {
        machine.reconcile();
        if done(machine) {
            return Ok(());
        }
        if Instant::now() >= deadline {
            return Err(CliError::Timeout {
                what: what.to_string(),
                seconds: timeout.as_secs(),
            });
        }
        thread::sleep(interval);
    }
}

fn settled(machine: &ConnectionStateMachine, target: ConnectionState) -> bool {
    machine.pending_reconnect().is_none() && machine.state() == target
}

fn report(outcome: &RequestOutcome) -> CliResult {
    match outcome {
        RequestOutcome::Dispatched | RequestOutcome::Deferred { .. } => Ok(()),
        RequestOutcome::NotPermitted(state) => Err(CliError::Rejected(format!(
            "Not possible while {state}"
        ))),
        RequestOutcome::Aborted(state) => Err(CliError::Rejected(format!(
            "VPN tool unusable: {state}"
        ))),
    }
}

/// Warns when the process would exit holding a reconnect that only a later
/// reconcile in this process can complete.
pub(crate) fn warn_if_stranded(outcome: &RequestOutcome, options: &WaitOptions) {
    if let RequestOutcome::Deferred { target } = outcome {
        if !options.wait {
            tracing::warn!(
                location = %target,
                "Only the disconnect was sent; without waiting, the connect will not follow"
            );
        }
    }
}

pub(crate) fn finish(
    app: &App,
    machine: &ConnectionStateMachine,
    options: &WaitOptions,
    target: ConnectionState,
) -> CliResult {
    if options.wait {
        let interval = app.settings().poll_interval();
        wait_until(machine, interval, options.timeout, target.label(), |m| {
            settled(m, target)
        })?;
    }
    println!("{}", machine.state());
    Ok(())
}

pub fn connect(app: &App, target: &str, options: &WaitOptions) -> CliResult {
    let machine = app.machine(None);
    machine.reconcile();
    report(&machine.request_connect(target))?;
    finish(app, &machine, options, ConnectionState::Connected)
}

pub fn disconnect(app: &App, options: &WaitOptions) -> CliResult {
    let machine = app.machine(None);
    machine.reconcile();
    report(&machine.request_disconnect())?;
    finish(app, &machine, options, ConnectionState::Disconnected)
}

pub fn reconnect(app: &App, target: &str, options: &WaitOptions) -> CliResult {
    let machine = app.machine(None);
    machine.reconcile();
    let outcome = machine.request_reconnect(target);
    report(&outcome)?;
    warn_if_stranded(&outcome, options);
    finish(app, &machine, options, ConnectionState::Connected)
}

/// The indicator button: does whatever fits the current state.
pub fn activate(app: &App, selected: Option<&str>, options: &WaitOptions) -> CliResult {
    let machine = app.machine(None);
    machine.reconcile();
    let action = machine.button_activate(selected);
    let target = match &action {
        ButtonAction::OpenHelp | ButtonAction::Nothing => {
            println!("{}", machine.state());
            return Ok(());
        }
        ButtonAction::Connect(_) | ButtonAction::Reconnect(_) => ConnectionState::Connected,
        ButtonAction::Disconnect => ConnectionState::Disconnected,
    };
    finish(app, &machine, options, target)
}
