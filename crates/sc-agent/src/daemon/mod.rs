//! Local process supervision
//!
//! [`Daemon`] is the [`Supervisor`](sc_core::traits::Supervisor) used in
//! production: one [`ExecRunner`] per backend, each respawning its collector
//! with exponential backoff when it crashes.

mod backoff;
mod runner;
mod supervisor;
mod whitelist;

pub use backoff::ExponentialBackoff;
pub use runner::ExecRunner;
pub use supervisor::Daemon;
pub use whitelist::ExecutableWhitelist;
