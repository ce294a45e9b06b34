//! Upload session aggregate - domain model and state transitions.
//!
//! This module contains the client-side upload/run gating logic:
//! - Session types and states (typestate pattern)
//! - State transition methods
//! - Value objects (UploadSelection)

pub mod state;
pub mod transitions;

// Re-export commonly used types
pub use state::*;
pub use transitions::{RunAttempt, UploadAttempt};
