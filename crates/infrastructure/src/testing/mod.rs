//! Test contexts.
//!
//! Implementations of the `TestContext` contract that the runner reports to.

mod context;

pub use context::{ContextEntry, RecordingContext};
