//! Connection State Tracking
//!
//! Infers what the VPN tool is doing by probing it, and drives it through
//! connect/disconnect/reconnect.
//!
//! # Architecture: Poll and Reconcile
//!
//! The tool gives no completion signal for connect or disconnect. The machine
//! therefore fires commands asynchronously, moves to `Transitioning`
//! optimistically, and learns the outcome from the next poll:
//!
//! ```text
//! PollingScheduler ──tick──► reconcile() ──► StatusProbeSet ──► CommandExecutor
//!                                │
//!  user ──request_*()──► ConnectionStateMachine ──► StatusListener
//!                                │
//!                                └── confirmed connect ──► RecentLocationStore
//! ```
//!
//! # Module Structure
//!
//! - [`probes`]: one probe per question, and the priority ladder in [`compute_state`]
//! - [`transition`]: pure rules (follow-ups, permissions, button action)
//! - [`guard`]: the busy guard serializing reconcile against user requests
//! - [`machine`]: [`ConnectionStateMachine`], tying the above together
//! - [`types`]: states, outcomes, and the listener trait

pub(crate) mod guard;
mod machine;
mod probes;
mod transition;
pub(crate) mod types;

pub use guard::{BusyGuard, BusyToken};
pub use machine::{ConnectionStateMachine, OptionChange};
pub use probes::{compute_state, StatusProbeSet, StatusProbes};
pub use transition::{button_action, follow_up, FollowUp};
pub use types::{
    ButtonAction, ConnectionState, ReconcileOutcome, RequestOutcome, StatusListener, StatusSnapshot,
};
