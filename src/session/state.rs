//! Core types for the upload session.
//!
//! This module defines the type-safe session lifecycle using the typestate
//! pattern. A session progresses through distinct states, enforced at compile
//! time: files are selected, then uploaded, then the analysis run is
//! triggered. Triggering a run on a session whose upload has not succeeded is
//! unrepresentable.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};

use crate::protocol::UploadReceipt;

/// The user's local file choices for one analysis attempt.
///
/// Both files must be set before an upload may be issued; the selection is
/// held only in memory for the duration of the session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UploadSelection {
    /// The expression matrix file, if chosen.
    pub expression_matrix: Option<PathBuf>,
    /// The covariate table file, if chosen.
    pub covariate_table: Option<PathBuf>,
}

impl UploadSelection {
    /// True when both files have been chosen.
    pub fn is_complete(&self) -> bool {
        self.expression_matrix.is_some() && self.covariate_table.is_some()
    }
}

/// Marker trait for valid session states.
pub trait SessionState: Send + Sync {}

/// A client-side session tracking one analysis attempt.
///
/// Uses the typestate pattern to ensure type-safe state transitions. The
/// generic parameter `T` represents the current state of the session.
#[derive(Debug, Clone)]
pub struct Session<T: SessionState> {
    /// The current state of the session.
    pub state: T,
    /// The user's file selection.
    pub selection: UploadSelection,
}

// ============================================================================
// Session States
// ============================================================================

/// Files are being chosen; nothing has been sent to the service yet.
///
/// This is the initial state. It covers both "no files" and "files selected":
/// the distinction is carried by [`UploadSelection::is_complete`], and the
/// upload transition enforces it.
#[derive(Debug, Clone, Default)]
pub struct Selecting {}

impl SessionState for Selecting {}

/// Both files were accepted by the service; the run may be triggered.
#[derive(Debug, Clone)]
pub struct Uploaded {
    /// Filenames echoed by the service.
    pub receipt: UploadReceipt,
    pub uploaded_at: DateTime<Utc>,
}

impl SessionState for Uploaded {}

/// The service accepted the run; job status is now the poller's concern.
#[derive(Debug, Clone)]
pub struct Running {
    pub uploaded_at: DateTime<Utc>,
    pub started_at: DateTime<Utc>,
}

impl SessionState for Running {}

impl Session<Selecting> {
    /// Start a fresh session with nothing selected.
    pub fn new() -> Self {
        Session {
            state: Selecting {},
            selection: UploadSelection::default(),
        }
    }

    /// Choose the expression matrix file. Replaces any earlier choice.
    pub fn select_expression_matrix(&mut self, path: impl AsRef<Path>) {
        self.selection.expression_matrix = Some(path.as_ref().to_path_buf());
    }

    /// Choose the covariate table file. Replaces any earlier choice.
    pub fn select_covariate_table(&mut self, path: impl AsRef<Path>) {
        self.selection.covariate_table = Some(path.as_ref().to_path_buf());
    }
}

impl Default for Session<Selecting> {
    fn default() -> Self {
        Self::new()
    }
}
