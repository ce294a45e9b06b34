//! State transitions for upload sessions using the typestate pattern.
//!
//! ```text
//! Session<Selecting> ──upload()──> Session<Uploaded> ──run()──> Session<Running>
//!        │                               │                            │
//!        └─(rejected: session returned   └─(rejected: session         └──(poller takes over)
//!           unchanged, error surfaced)      returned unchanged,
//!                                           error surfaced)
//! ```
//!
//! Failed attempts hand the pre-attempt session back to the caller together
//! with the error, so the user can fix the problem and retry without losing
//! their selection or upload.

use chrono::Utc;

use crate::error::PipetteError;
use crate::http::{ServiceClient, ServiceRequest};
use crate::protocol::{self, RunOutcome};

use super::state::{Running, Selecting, Session, Uploaded};

/// Result of an upload attempt.
#[derive(Debug)]
pub enum UploadAttempt {
    /// The service accepted both files.
    Uploaded(Session<Uploaded>),
    /// The attempt was rejected; the session is unchanged and may retry.
    Rejected {
        session: Session<Selecting>,
        error: PipetteError,
    },
}

/// Result of a run attempt.
#[derive(Debug)]
pub enum RunAttempt {
    /// The service accepted the run.
    Started(Session<Running>),
    /// The attempt was rejected; the session stays uploaded and may retry.
    Rejected {
        session: Session<Uploaded>,
        error: PipetteError,
    },
}

impl Session<Selecting> {
    /// Upload the selected files to the service.
    ///
    /// Rejected locally, with no request issued, unless both files are
    /// selected. On any failure the `Selecting` session is returned so the
    /// selection survives for a retry.
    pub async fn upload<C: ServiceClient>(self, client: &C) -> UploadAttempt {
        let (expression_matrix, covariate_table) = match (
            self.selection.expression_matrix.clone(),
            self.selection.covariate_table.clone(),
        ) {
            (Some(expr), Some(cov)) => (expr, cov),
            _ => {
                tracing::debug!("Upload attempted without both files selected");
                return UploadAttempt::Rejected {
                    session: self,
                    error: PipetteError::Validation(
                        "select both an expression matrix and a covariate table before uploading"
                            .to_string(),
                    ),
                };
            }
        };

        let request = ServiceRequest::Upload {
            expression_matrix,
            covariate_table,
        };

        let result = client
            .execute(&request)
            .await
            .and_then(|response| protocol::parse_upload_response(&response));

        match result {
            Ok(receipt) => {
                tracing::info!(
                    expression_matrix = %receipt.expression_matrix,
                    covariate_table = %receipt.covariate_table,
                    "Upload accepted"
                );
                UploadAttempt::Uploaded(Session {
                    selection: self.selection,
                    state: Uploaded {
                        receipt,
                        uploaded_at: Utc::now(),
                    },
                })
            }
            Err(error) => {
                tracing::warn!(error = %error, "Upload failed");
                UploadAttempt::Rejected {
                    session: self,
                    error,
                }
            }
        }
    }
}

impl Session<Uploaded> {
    /// Trigger the analysis run.
    ///
    /// Only reachable once an upload has succeeded; that gate is the type
    /// itself. On rejection (transport error, non-2xx, or a 2xx body with
    /// `success: false`) the `Uploaded` session is returned, permitting retry.
    pub async fn run<C: ServiceClient>(self, client: &C) -> RunAttempt {
        let response = match client.execute(&ServiceRequest::Run).await {
            Ok(response) => response,
            Err(error) => {
                tracing::warn!(error = %error, "Run request failed");
                return RunAttempt::Rejected {
                    session: self,
                    error,
                };
            }
        };

        match protocol::parse_run_response(&response) {
            RunOutcome::Accepted => {
                tracing::info!("Run accepted, job status is now polled");
                RunAttempt::Started(Session {
                    state: Running {
                        uploaded_at: self.state.uploaded_at,
                        started_at: Utc::now(),
                    },
                    selection: self.selection,
                })
            }
            RunOutcome::Failed { reason } => {
                tracing::warn!(reason = %reason, "Service rejected the run");
                RunAttempt::Rejected {
                    session: self,
                    error: PipetteError::Service(reason),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::{HttpResponse, MockServiceClient};

    fn uploaded_session() -> Session<Uploaded> {
        Session {
            state: Uploaded {
                receipt: crate::protocol::UploadReceipt {
                    expression_matrix: "expr.csv".to_string(),
                    covariate_table: "cov.csv".to_string(),
                },
                uploaded_at: Utc::now(),
            },
            selection: UploadSelectionFixture::both(),
        }
    }

    struct UploadSelectionFixture;

    impl UploadSelectionFixture {
        fn both() -> crate::session::UploadSelection {
            crate::session::UploadSelection {
                expression_matrix: Some("expr.csv".into()),
                covariate_table: Some("cov.csv".into()),
            }
        }
    }

    #[tokio::test]
    async fn test_upload_rejected_locally_without_both_files() {
        let client = MockServiceClient::new();

        let mut session = Session::new();
        session.select_expression_matrix("expr.csv");

        match session.upload(&client).await {
            UploadAttempt::Rejected { session, error } => {
                assert!(error.is_validation());
                // Selection survives for a retry.
                assert!(session.selection.expression_matrix.is_some());
            }
            UploadAttempt::Uploaded(_) => panic!("upload must be rejected with one file"),
        }

        // No request was issued.
        assert_eq!(client.call_count(), 0);
    }

    #[tokio::test]
    async fn test_upload_accepted_with_both_files() {
        let client = MockServiceClient::new();
        client.add_response(
            "POST /upload",
            Ok(HttpResponse {
                status: 200,
                body: r#"{"expression_matrix":"expr.csv","covariate_table":"cov.csv"}"#
                    .to_string(),
            }),
        );

        let mut session = Session::new();
        session.select_expression_matrix("expr.csv");
        session.select_covariate_table("cov.csv");
        assert!(session.selection.is_complete());

        match session.upload(&client).await {
            UploadAttempt::Uploaded(session) => {
                assert_eq!(session.state.receipt.expression_matrix, "expr.csv");
            }
            UploadAttempt::Rejected { error, .. } => panic!("upload failed: {}", error),
        }
        assert_eq!(client.call_count(), 1);
    }

    #[tokio::test]
    async fn test_upload_transport_failure_returns_session() {
        let client = MockServiceClient::new();
        client.add_response(
            "POST /upload",
            Ok(HttpResponse {
                status: 500,
                body: "disk full".to_string(),
            }),
        );

        let mut session = Session::new();
        session.select_expression_matrix("expr.csv");
        session.select_covariate_table("cov.csv");

        match session.upload(&client).await {
            UploadAttempt::Rejected { session, error } => {
                assert!(matches!(error, PipetteError::Service(_)));
                assert!(session.selection.is_complete());
            }
            UploadAttempt::Uploaded(_) => panic!("upload must fail on 500"),
        }
    }

    #[tokio::test]
    async fn test_run_success_false_rejects_and_keeps_session() {
        let client = MockServiceClient::new();
        client.add_response(
            "POST /run",
            Ok(HttpResponse {
                status: 200,
                body: r#"{"success":false,"error":"no input files"}"#.to_string(),
            }),
        );

        match uploaded_session().run(&client).await {
            RunAttempt::Rejected { session, error } => {
                assert!(matches!(error, PipetteError::Service(ref msg) if msg == "no input files"));
                // Session stays Uploaded: a retry is one more run() away.
                assert_eq!(session.state.receipt.covariate_table, "cov.csv");
            }
            RunAttempt::Started(_) => panic!("run must be rejected on success:false"),
        }
    }

    #[tokio::test]
    async fn test_run_accepted_starts_session() {
        let client = MockServiceClient::new();
        client.add_response(
            "POST /run",
            Ok(HttpResponse {
                status: 200,
                body: r#"{"success":true}"#.to_string(),
            }),
        );

        match uploaded_session().run(&client).await {
            RunAttempt::Started(session) => {
                assert!(session.state.started_at >= session.state.uploaded_at);
            }
            RunAttempt::Rejected { error, .. } => panic!("run failed: {}", error),
        }
    }
}
