//! Background polling that keeps the connection state fresh.
//!
//! One thread sleeps until the next deadline or a control message, whichever
//! comes first:
//!
//! ```text
//!          ┌──────── recv_timeout(deadline - now) ◄────────┐
//!          │                                               │
//!   timeout ──► reconcile() ──► deadline = now + interval ─┘
//!   SetMonitoring(false) ──► no deadline (block on recv)
//!   SetMonitoring(true)  ──► deadline = now (tick immediately)
//!   SetInterval(d)       ──► used from the next wait
//! ```
//!
//! Overlap with user actions is handled by the machine's busy guard, not here.

use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use tracing::{debug, trace, warn};

use crate::config::{SettingsChange, SettingsObserver};
use crate::error::{Result, TunnelbarError};
use crate::state::ConnectionStateMachine;

/// Something the scheduler can poll.
pub trait Reconcile: Send + Sync {
    fn reconcile_tick(&self);
}

impl Reconcile for ConnectionStateMachine {
    fn reconcile_tick(&self) {
        let outcome = self.reconcile();
        trace!(?outcome, "Poll tick");
    }
}

#[derive(Debug)]
enum Control {
    SetInterval(Duration),
    SetMonitoring(bool),
    TickNow,
    Shutdown,
}

pub struct PollingScheduler {
    control: Sender<Control>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl PollingScheduler {
    /// Spawns the polling thread. With `monitoring` on, the first tick is
    /// immediate.
    pub fn start(target: Arc<dyn Reconcile>, interval: Duration, monitoring: bool) -> Result<Self> {
        check_interval(interval)?;
        let (control, rx) = mpsc::channel();
        let handle = std::thread::Builder::new()
            .name("tunnelbar-poll".to_string())
            .spawn(move || run(target, rx, interval, monitoring))
            .map_err(|e| TunnelbarError::io("Failed to spawn polling thread", e))?;
        debug!(?interval, monitoring, "Polling scheduler started");
        Ok(PollingScheduler {
            control,
            handle: Mutex::new(Some(handle)),
        })
    }

    pub fn set_interval(&self, interval: Duration) -> Result<()> {
        check_interval(interval)?;
        self.send(Control::SetInterval(interval));
        Ok(())
    }

    pub fn set_monitoring(&self, enabled: bool) {
        self.send(Control::SetMonitoring(enabled));
    }

    /// Runs one reconcile as soon as possible, independent of monitoring.
    pub fn tick_now(&self) {
        self.send(Control::TickNow);
    }

    /// Stops the thread and waits for it. Idempotent.
    pub fn shutdown(&self) {
        let handle = self
            .handle
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take();
        if let Some(handle) = handle {
            let _ = self.control.send(Control::Shutdown);
            if handle.join().is_err() {
                warn!("Polling thread panicked");
            }
        }
    }

    fn send(&self, message: Control) {
        if self.control.send(message).is_err() {
            warn!("Polling thread is gone, control message dropped");
        }
    }
}

impl Drop for PollingScheduler {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl SettingsObserver for PollingScheduler {
    fn settings_changed(&self, change: &SettingsChange) {
        match change {
            SettingsChange::PollInterval(interval) => {
                if let Err(e) = self.set_interval(*interval) {
                    warn!(error = %e, "Ignoring poll interval change");
                }
            }
            SettingsChange::Monitoring(enabled) => self.set_monitoring(*enabled),
            _ => {}
        }
    }
}

fn check_interval(interval: Duration) -> Result<()> {
    if interval.is_zero() {
        return Err(TunnelbarError::InvalidInterval(0));
    }
    Ok(())
}

fn run(
    target: Arc<dyn Reconcile>,
    rx: mpsc::Receiver<Control>,
    mut interval: Duration,
    monitoring: bool,
) {
    let mut next_tick = monitoring.then(Instant::now);

    loop {
        let message = match next_tick {
            Some(deadline) => {
                let now = Instant::now();
                if now >= deadline {
                    target.reconcile_tick();
                    next_tick = Some(Instant::now() + interval);
                    continue;
                }
                rx.recv_timeout(deadline - now)
            }
            None => rx.recv().map_err(|_| RecvTimeoutError::Disconnected),
        };

        match message {
            Ok(Control::SetInterval(new_interval)) => interval = new_interval,
            Ok(Control::SetMonitoring(true)) => {
                if next_tick.is_none() {
                    next_tick = Some(Instant::now());
                }
            }
            Ok(Control::SetMonitoring(false)) => next_tick = None,
            Ok(Control::TickNow) => {
                target.reconcile_tick();
                if next_tick.is_some() {
                    next_tick = Some(Instant::now() + interval);
                }
            }
            Ok(Control::Shutdown) | Err(RecvTimeoutError::Disconnected) => break,
            Err(RecvTimeoutError::Timeout) => {}
        }
    }
    debug!("Polling scheduler stopped");
}
