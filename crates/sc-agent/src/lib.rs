//! sc-agent: Collector sidecar agent
//!
//! The agent runs on every host that ships logs. Three periodic loops keep
//! the locally supervised collectors in sync with the coordination server:
//! a status reporter that also receives assignments, a catalog refresher,
//! and a reconciler that starts and stops collector processes.

pub mod api;
pub mod daemon;
pub mod logging;
pub mod render;
pub mod services;
pub mod state;
pub mod store;

#[cfg(test)]
pub(crate) mod testing;

pub use state::AgentState;
