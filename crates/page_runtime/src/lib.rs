//! Rendering-thread runtime.
//!
//! The script thread hands Change Actions over through an [`ActionSender`];
//! the [`RenderThread`] owns every [`vdom::Document`] and applies the actions
//! in arrival order through an [`ActionPump`], one bounded slice at a time.
//! Hook events travel back over a [`HookChannel`], and an [`ElementIndex`]
//! keeps a read-only copy of each tree for other threads.

pub mod channel;
pub use channel::{ActionSender, HookChannel, HostTask, Inbound};

pub mod config;
pub use config::RuntimeConfig;

pub mod index;
pub use index::{ElementIndex, ElementIndexState, IndexedElement};

pub mod pump;
pub use pump::{ActionPump, SliceOutcome};

pub mod render_thread;
pub use render_thread::{RenderThread, RunSummary};

pub mod replay;

pub mod scheduler;
pub use scheduler::SliceScheduler;

pub mod telemetry;
pub use telemetry::{PumpCounters, pump_counters_json};
