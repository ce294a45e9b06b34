//! Wire-shape normalization for the analysis service.
//!
//! The service's response shapes are inconsistent (`/run` signals failure
//! through an HTTP status, a `success` flag, or one of two error-message
//! field names). Everything the rest of the crate consumes is normalized
//! here into tagged results, isolating the session and poller logic from
//! the external contract.

use serde::{Deserialize, Serialize};

use crate::error::{PipetteError, Result};
use crate::http::HttpResponse;

/// Last known state of the analysis job, as reported by `/analysis`.
///
/// The contract defines no explicit failed status; a job that fails
/// server-side surfaces either as a `status: "error"` body (older service
/// builds) or not at all. Both are mapped to errors by
/// [`parse_status_response`], never to a `JobStatus` variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Processing,
    Done,
}

/// Body of a `/analysis` response.
#[derive(Deserialize)]
struct StatusBody {
    status: String,
    #[serde(default)]
    error: Option<String>,
}

/// Interpret a `/analysis` response.
///
/// - `done` completes the poll session.
/// - `processing` keeps polling; so does `idle`, which the service reports
///   until its background task picks the run up (the first poll can win that
///   race).
/// - `error` carries the pipeline's failure detail and ends the session.
/// - Anything else (non-2xx, unparseable body, unknown status string) is a
///   malformed response.
pub fn parse_status_response(response: &HttpResponse) -> Result<JobStatus> {
    if !response.is_success() {
        return Err(PipetteError::MalformedResponse(format!(
            "status endpoint answered {}: {}",
            response.status, response.body
        )));
    }

    let body: StatusBody = serde_json::from_str(&response.body).map_err(|e| {
        PipetteError::MalformedResponse(format!("unparseable status body: {}", e))
    })?;

    match body.status.as_str() {
        "done" => Ok(JobStatus::Done),
        "processing" | "idle" => Ok(JobStatus::Processing),
        "error" => Err(PipetteError::Service(
            body.error.unwrap_or_else(|| "analysis failed".to_string()),
        )),
        other => Err(PipetteError::MalformedResponse(format!(
            "unknown job status: {}",
            other
        ))),
    }
}

/// Normalized outcome of a `/run` request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// The service accepted the run; the job is now the poller's concern.
    Accepted,
    /// The service rejected the run, by HTTP status or by body flag.
    Failed { reason: String },
}

/// Body of a `/run` response. The service has answered with `error` or
/// `detail` as the message field depending on which layer rejected the run,
/// so both are recognized.
#[derive(Deserialize, Default)]
struct RunBody {
    #[serde(default)]
    success: Option<bool>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    detail: Option<String>,
}

impl RunBody {
    fn reason(self) -> String {
        self.error
            .or(self.detail)
            .unwrap_or_else(|| "unknown error".to_string())
    }
}

/// Interpret a `/run` response.
///
/// A 2xx status with `success: false` is treated identically to an HTTP
/// failure: the run did not start.
pub fn parse_run_response(response: &HttpResponse) -> RunOutcome {
    let body: RunBody = serde_json::from_str(&response.body).unwrap_or_default();

    if !response.is_success() {
        let mut reason = body.reason();
        if reason == "unknown error" {
            reason = format!("run rejected with status {}", response.status);
        }
        return RunOutcome::Failed { reason };
    }

    if body.success == Some(false) {
        return RunOutcome::Failed {
            reason: body.reason(),
        };
    }

    RunOutcome::Accepted
}

/// Filenames echoed by the service on a successful upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadReceipt {
    pub expression_matrix: String,
    pub covariate_table: String,
}

/// Interpret a `/upload` response.
pub fn parse_upload_response(response: &HttpResponse) -> Result<UploadReceipt> {
    if !response.is_success() {
        return Err(PipetteError::Service(format!(
            "upload failed with status {}: {}",
            response.status, response.body
        )));
    }
    Ok(serde_json::from_str(&response.body)?)
}

/// Interpret a `/result-files` response (a JSON array of filenames).
pub fn parse_result_files(response: &HttpResponse) -> Result<Vec<String>> {
    if !response.is_success() {
        return Err(PipetteError::Service(format!(
            "result listing failed with status {}: {}",
            response.status, response.body
        )));
    }
    Ok(serde_json::from_str(&response.body)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ok(body: &str) -> HttpResponse {
        HttpResponse {
            status: 200,
            body: body.to_string(),
        }
    }

    #[test]
    fn test_status_done() {
        let status = parse_status_response(&ok(r#"{"status":"done"}"#)).unwrap();
        assert_eq!(status, JobStatus::Done);
    }

    #[test]
    fn test_status_processing_and_idle_keep_polling() {
        for body in [r#"{"status":"processing"}"#, r#"{"status":"idle"}"#] {
            let status = parse_status_response(&ok(body)).unwrap();
            assert_eq!(status, JobStatus::Processing);
        }
    }

    #[test]
    fn test_status_error_carries_detail() {
        let err =
            parse_status_response(&ok(r#"{"status":"error","error":"runner exited 1"}"#))
                .unwrap_err();
        assert!(matches!(err, PipetteError::Service(ref msg) if msg == "runner exited 1"));
    }

    #[test]
    fn test_status_unknown_string_is_malformed() {
        let err = parse_status_response(&ok(r#"{"status":"paused"}"#)).unwrap_err();
        assert!(matches!(err, PipetteError::MalformedResponse(_)));
    }

    #[test]
    fn test_status_non_success_is_malformed() {
        let response = HttpResponse {
            status: 502,
            body: "bad gateway".to_string(),
        };
        assert!(parse_status_response(&response).is_err());
    }

    #[test]
    fn test_status_unparseable_body_is_malformed() {
        let err = parse_status_response(&ok("<html>oops</html>")).unwrap_err();
        assert!(matches!(err, PipetteError::MalformedResponse(_)));
    }

    #[test]
    fn test_run_accepted() {
        assert_eq!(parse_run_response(&ok(r#"{"success":true}"#)), RunOutcome::Accepted);
        // Absent flag counts as accepted, matching the service's happy path.
        assert_eq!(parse_run_response(&ok("{}")), RunOutcome::Accepted);
    }

    #[test]
    fn test_run_success_false_is_failure_even_on_200() {
        let outcome = parse_run_response(&ok(r#"{"success":false,"error":"no input files"}"#));
        assert_eq!(
            outcome,
            RunOutcome::Failed {
                reason: "no input files".to_string()
            }
        );
    }

    #[test]
    fn test_run_recognizes_detail_field() {
        let outcome = parse_run_response(&ok(r#"{"success":false,"detail":"pipeline busy"}"#));
        assert_eq!(
            outcome,
            RunOutcome::Failed {
                reason: "pipeline busy".to_string()
            }
        );
    }

    #[test]
    fn test_run_non_success_status_is_failure() {
        let response = HttpResponse {
            status: 500,
            body: r#"{"detail":"runner crashed"}"#.to_string(),
        };
        assert_eq!(
            parse_run_response(&response),
            RunOutcome::Failed {
                reason: "runner crashed".to_string()
            }
        );

        let bare = HttpResponse {
            status: 503,
            body: String::new(),
        };
        assert_eq!(
            parse_run_response(&bare),
            RunOutcome::Failed {
                reason: "run rejected with status 503".to_string()
            }
        );
    }

    #[test]
    fn test_upload_receipt_round_trips_filenames() {
        let receipt = parse_upload_response(&ok(
            r#"{"expression_matrix":"expr.csv","covariate_table":"cov.csv"}"#,
        ))
        .unwrap();
        assert_eq!(receipt.expression_matrix, "expr.csv");
        assert_eq!(receipt.covariate_table, "cov.csv");
    }

    #[test]
    fn test_upload_failure_status_is_error() {
        let response = HttpResponse {
            status: 413,
            body: "payload too large".to_string(),
        };
        assert!(parse_upload_response(&response).is_err());
    }

    #[test]
    fn test_result_files_listing() {
        let files = parse_result_files(&ok(r#"["mean_expression.png","pca.png"]"#)).unwrap();
        assert_eq!(files, vec!["mean_expression.png", "pca.png"]);
    }
}
