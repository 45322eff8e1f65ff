//! Coordination server API
//!
//! The HTTP [`Transport`](sc_core::traits::Transport) implementation and the
//! pieces of the status payload gathered from the host.

mod client;
mod logfiles;
mod metrics;
mod payload;

pub use client::HttpTransport;
pub use logfiles::{list_log_files, MAX_LOG_FILES};
pub use metrics::HostMetrics;
pub use payload::{aggregate_status, StatusComposer};
