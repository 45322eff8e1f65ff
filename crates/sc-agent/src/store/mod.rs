//! Shared stores read and written by the periodic loops
//!
//! Each store has exactly one producing loop but may be read from any of
//! them concurrently. Readers always see a whole point-in-time value.

mod assignments;
mod catalog;
mod registry;

pub use assignments::{AssignmentSet, AssignmentStore};
pub use catalog::{BackendCatalog, CatalogSnapshot};
pub use registry::{RunnerHandle, RunnerRegistry, RunnerState};
