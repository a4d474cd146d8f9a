//! The review submission pipeline.
//!
//! Drives one request through its full lifecycle: register a correlation id,
//! send the framed request over the shared gateway link, suspend until the
//! verdicts arrive or the deadline passes, aggregate, and clean up. A
//! request always reaches exactly one terminal state — completed, timed out,
//! or failed — within the configured deadline plus scheduling slack.

use std::sync::Arc;
use std::time::Duration;

use uuid::Uuid;

use conclave_core::{AgentVerdict, ConclaveError, ReviewConfig, ReviewVerdict};
use conclave_gateway::{GatewayLink, ReviewRequestFrame};

use crate::aggregate::aggregate;
use crate::prompt;

/// Review orchestrator bound to one gateway link.
///
/// Cheap to share; any number of tasks may call [`submit`](Self::submit)
/// concurrently, each owning exactly one pending request.
pub struct ReviewPipeline {
    link: Arc<GatewayLink>,
    config: ReviewConfig,
}

impl ReviewPipeline {
    /// Create a pipeline from a connected link and review settings.
    pub fn new(link: Arc<GatewayLink>, config: ReviewConfig) -> Self {
        Self { link, config }
    }

    /// The link this pipeline submits through.
    pub fn link(&self) -> &GatewayLink {
        &self.link
    }

    /// Submit code for review and wait for the aggregated outcome.
    ///
    /// Returns a full-consensus verdict when all agents answer in time. If
    /// the deadline passes with at least one completed verdict, the partial
    /// set is aggregated and the result is flagged `partial`; with none, a
    /// [`ConclaveError::Timeout`] is returned instead. The pending slot is
    /// removed on every exit path, including cancellation of the returned
    /// future, so a late frame for this request is dropped as unknown.
    ///
    /// # Errors
    ///
    /// [`ConclaveError::Send`] if the frame could not be transmitted,
    /// [`ConclaveError::Timeout`] as above, [`ConclaveError::ConnectionLost`]
    /// if the link went down mid-flight, and [`ConclaveError::Gateway`] if
    /// the gateway rejected the request.
    pub async fn submit(&self, code: &str, context: &str) -> Result<ReviewVerdict, ConclaveError> {
        if self.config.debug {
            let preview: String = code.chars().take(500).collect();
            tracing::debug!(code = %preview, "submitting code for review");
        }

        let request_id = Uuid::new_v4().to_string();
        let mut waiter = self.link.register(&request_id)?;
        let guard = SlotGuard::new(Arc::clone(&self.link), request_id.clone());

        let frame = ReviewRequestFrame::new(&request_id, prompt::review_envelope(context, code));
        self.link.send_request(&frame).await?;
        tracing::info!(request_id = %request_id, "review request sent");

        let deadline = Duration::from_secs(self.config.timeout_secs);
        // Bind the race first so the waiter borrow ends before the deadline
        // path polls it again.
        let outcome = tokio::time::timeout(deadline, waiter.recv()).await;
        match outcome {
            Ok(outcome) => {
                guard.defuse();
                let verdicts = outcome?;
                tracing::info!(
                    request_id = %request_id,
                    verdicts = verdicts.len(),
                    "review completed"
                );
                Ok(aggregate(&request_id, verdicts, self.link.expected_verdicts()))
            }
            Err(_elapsed) => {
                // Completion may have raced the deadline onto the channel.
                if let Some(outcome) = waiter.try_recv() {
                    guard.defuse();
                    let verdicts = outcome?;
                    return Ok(aggregate(&request_id, verdicts, self.link.expected_verdicts()));
                }
                self.resolve_deadline(guard, &request_id)
            }
        }
    }

    fn resolve_deadline(
        &self,
        guard: SlotGuard,
        request_id: &str,
    ) -> Result<ReviewVerdict, ConclaveError> {
        let expected = self.link.expected_verdicts();
        let partial = guard.discard_now().unwrap_or_default();
        if partial.is_empty() {
            tracing::warn!(request_id = %request_id, "review deadline passed with no verdicts");
            return Err(ConclaveError::Timeout {
                seconds: self.config.timeout_secs,
                received: 0,
                expected,
            });
        }
        tracing::warn!(
            request_id = %request_id,
            received = partial.len(),
            expected,
            "review deadline passed, aggregating partial verdicts"
        );
        Ok(aggregate(request_id, partial, expected))
    }
}

/// Removes the pending slot unless the request reached a terminal state
/// through the normal paths. Covers caller cancellation and early error
/// returns, keeping late frames for this id unroutable.
struct SlotGuard {
    link: Arc<GatewayLink>,
    request_id: String,
    armed: bool,
}

impl SlotGuard {
    fn new(link: Arc<GatewayLink>, request_id: String) -> Self {
        Self {
            link,
            request_id,
            armed: true,
        }
    }

    /// The slot was resolved elsewhere; nothing to clean up.
    fn defuse(mut self) {
        self.armed = false;
    }

    /// Detach the slot now, returning whatever it collected.
    fn discard_now(mut self) -> Option<Vec<AgentVerdict>> {
        self.armed = false;
        self.link.discard(&self.request_id)
    }
}

impl Drop for SlotGuard {
    fn drop(&mut self) {
        if self.armed && self.link.discard(&self.request_id).is_some() {
            tracing::debug!(request_id = %self.request_id, "pending review discarded");
        }
    }
}
