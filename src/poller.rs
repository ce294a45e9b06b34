//! Job status poller / navigator.
//!
//! After a run has been accepted, a poll session repeatedly queries the
//! service for completion and transitions navigation to the results page
//! exactly once. The session is an explicit cancellable task: the handle
//! returned by [`start_polling`] owns a cancellation token that is checked
//! before every state mutation, so a response resolving after the view has
//! been torn down can never mutate state or navigate.
//!
//! Polls are strictly sequential - the next poll is scheduled only after the
//! previous outcome (errors included) has been processed, so overlapping
//! in-flight status requests for the job never occur.

use std::sync::Arc;
use std::time::Duration;

use metrics::counter;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::http::{ServiceClient, ServiceRequest};
use crate::protocol::{self, JobStatus};
use crate::router::{Navigator, Page};

/// What the analysis view should render for the current poll session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollView {
    /// The job is still running; the next poll is scheduled.
    Processing,
    /// The job finished; navigation to the results page has happened.
    Done,
    /// A poll failed; polling has stopped and no navigation occurred.
    /// Carries a human-readable description of the failure.
    Failed(String),
}

/// Handle to a single poll session.
///
/// Dropping the handle does not stop the session; call [`PollHandle::stop`]
/// when the consuming view is torn down.
pub struct PollHandle {
    token: CancellationToken,
    view: watch::Receiver<PollView>,
    task: JoinHandle<()>,
}

impl PollHandle {
    /// Cancel any scheduled or in-flight poll.
    ///
    /// Idempotent: stopping an already-stopped session is a no-op. An
    /// in-flight response resolving after this call is ignored.
    pub fn stop(&self) {
        self.token.cancel();
    }

    /// The last observed view state.
    pub fn view(&self) -> PollView {
        self.view.borrow().clone()
    }

    /// Subscribe to view-state changes.
    pub fn subscribe(&self) -> watch::Receiver<PollView> {
        self.view.clone()
    }

    /// True while the session's task is still running.
    pub fn is_active(&self) -> bool {
        !self.task.is_finished()
    }

    /// Wait for the session's task to finish (after a terminal outcome or a
    /// call to [`PollHandle::stop`]).
    pub async fn join(self) {
        let _ = self.task.await;
    }
}

/// Begin polling job status, issuing a request immediately and then every
/// `interval` until a terminal outcome or [`PollHandle::stop`].
///
/// Exactly one of three outcomes ends each poll:
/// - done: stop polling and navigate to [`Page::Result`] exactly once;
/// - still processing: leave the next scheduled poll intact;
/// - transport/service failure: stop polling immediately and record the
///   failure on the view channel, leaving navigation where it is.
pub fn start_polling<C>(
    client: C,
    navigator: Arc<dyn Navigator>,
    interval: Duration,
) -> PollHandle
where
    C: ServiceClient + 'static,
{
    let token = CancellationToken::new();
    let (view_tx, view_rx) = watch::channel(PollView::Processing);

    let task_token = token.clone();
    let task = tokio::spawn(async move {
        tracing::debug!(interval_ms = interval.as_millis() as u64, "Poll session started");

        loop {
            // The in-flight request is raced against cancellation; a request
            // abandoned here is dropped without its result being observed.
            let response = tokio::select! {
                response = client.execute(&ServiceRequest::Status) => response,
                _ = task_token.cancelled() => {
                    tracing::debug!("Poll session cancelled while request in flight");
                    break;
                }
            };

            // Re-check before mutating anything: stop() may have raced the
            // response's arrival.
            if task_token.is_cancelled() {
                tracing::debug!("Poll response ignored, session already stopped");
                break;
            }

            counter!("pipette_polls_total").increment(1);

            match response.and_then(|r| protocol::parse_status_response(&r)) {
                Ok(JobStatus::Done) => {
                    tracing::info!("Job done, navigating to results");
                    let _ = view_tx.send(PollView::Done);
                    navigator.navigate(Page::Result);
                    break;
                }
                Ok(JobStatus::Processing) => {
                    tracing::debug!("Job still processing");
                }
                Err(e) => {
                    // A broken channel is not retried; the failure is
                    // surfaced and the session ends.
                    counter!("pipette_poll_failures_total").increment(1);
                    tracing::warn!(error = %e, "Status poll failed, stopping session");
                    let _ = view_tx.send(PollView::Failed(e.to_string()));
                    break;
                }
            }

            tokio::select! {
                _ = tokio::time::sleep(interval) => {}
                _ = task_token.cancelled() => {
                    tracing::debug!("Poll session cancelled");
                    break;
                }
            }
        }
    });

    PollHandle {
        token,
        view: view_rx,
        task,
    }
}
