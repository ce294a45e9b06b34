//! Page-flow surface tying config, service client, and navigation together.
//!
//! The view layer calls `enter_*` as pages mount and `leave_analysis` as the
//! analysis view unmounts; everything else (upload gating, run dispatch) goes
//! through the typestate `Session` directly.

use std::sync::Arc;
use std::time::Duration;

use crate::config::ClientConfig;
use crate::error::Result;
use crate::http::{ServiceClient, ServiceRequest};
use crate::poller::{PollHandle, start_polling};
use crate::protocol;
use crate::router::{Navigator, Page};
use crate::session::{Running, Selecting, Session};

/// Client application flow over a remote analysis service.
pub struct AnalysisApp<C: ServiceClient + 'static> {
    client: C,
    navigator: Arc<dyn Navigator>,
    config: ClientConfig,
}

impl<C: ServiceClient + 'static> AnalysisApp<C> {
    pub fn new(config: ClientConfig, client: C, navigator: Arc<dyn Navigator>) -> Self {
        Self {
            client,
            navigator,
            config,
        }
    }

    /// Enter the home page.
    ///
    /// Fires a best-effort server reset in the background: a failure is
    /// logged, never surfaced, and never blocks navigation.
    pub fn enter_home(&self) {
        self.navigator.navigate(Page::Home);

        let client = self.client.clone();
        tokio::spawn(async move {
            match client.execute(&ServiceRequest::Reset).await {
                Ok(response) if response.is_success() => {
                    tracing::debug!("Server reset on home entry");
                }
                Ok(response) => {
                    tracing::warn!(status = response.status, "Reset on home entry rejected");
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Reset on home entry failed");
                }
            }
        });
    }

    /// Enter the upload page, handing out a fresh selection session.
    pub fn enter_upload(&self) -> Session<Selecting> {
        self.navigator.navigate(Page::Upload);
        Session::new()
    }

    /// Enter the analysis page and start polling the running job.
    ///
    /// At most one poll session should exist per page visit; the caller owns
    /// the handle and must pass it to [`AnalysisApp::leave_analysis`] on
    /// teardown.
    pub fn enter_analysis(&self, _session: &Session<Running>) -> PollHandle {
        self.navigator.navigate(Page::Analysis);
        start_polling(
            self.client.clone(),
            self.navigator.clone(),
            Duration::from_millis(self.config.poll_interval_ms),
        )
    }

    /// Tear down the analysis page, cancelling its poll session.
    pub fn leave_analysis(&self, handle: &PollHandle) {
        handle.stop();
    }

    /// List result artifacts with the given extension, for the result view.
    pub async fn result_files(&self, extension: &str) -> Result<Vec<String>> {
        let response = self
            .client
            .execute(&ServiceRequest::ResultFiles {
                extension: extension.to_string(),
            })
            .await?;
        protocol::parse_result_files(&response)
    }

    /// The navigation seam, for callers that need the current page.
    pub fn navigator(&self) -> &Arc<dyn Navigator> {
        &self.navigator
    }
}
