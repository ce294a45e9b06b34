//! Client for a remote expression-matrix analysis service.
//!
//! This crate owns the client side of one analysis job's lifecycle: a
//! typestate session gates the two-file upload and the run trigger, and a
//! cancellable poll session checks job status over time, navigating to the
//! results view exactly once on completion. All computation lives behind the
//! service's HTTP endpoints; the service itself is the only source of truth.

pub mod app;
pub mod config;
pub mod error;
pub mod http;
pub mod poller;
pub mod protocol;
pub mod router;
pub mod session;

// Re-export commonly used types
pub use app::AnalysisApp;
pub use config::ClientConfig;
pub use error::{PipetteError, Result};
pub use http::{
    HttpResponse, MockServiceClient, ReqwestServiceClient, ServiceClient, ServiceRequest,
};
pub use poller::{PollHandle, PollView, start_polling};
pub use protocol::{JobStatus, RunOutcome, UploadReceipt};
pub use router::{MemoryRouter, Navigator, Page};
pub use session::{RunAttempt, Running, Selecting, Session, UploadAttempt, UploadSelection, Uploaded};
