//! TranscriptionBridge - subscriber state plus request execution.
//!
//! Every failure on the request path ends here as a [`RequestOutcome`]; none
//! escapes to the receive loop or back to the host.

use std::sync::Arc;

use crate::bridge::protocol::{ResultMessage, SubscriberId};
use crate::gateway::GatewaySender;
use crate::subscriber::SubscriberSlot;
use crate::transcriber::{Transcriber, TranscriptionError};

/// What happened to one transcription request.
#[derive(Debug)]
pub enum RequestOutcome {
    /// Result queued for the subscriber registered at completion time.
    Delivered { to: SubscriberId },
    /// Transcription succeeded but nobody was registered.
    Discarded,
    /// Path decoding or transcription failed; nothing was sent.
    Failed(TranscriptionError),
}

impl RequestOutcome {
    pub fn is_delivered(&self) -> bool {
        matches!(self, Self::Delivered { .. })
    }
}

pub struct TranscriptionBridge<T> {
    transcriber: Arc<T>,
    subscriber: Arc<SubscriberSlot>,
    outbox: GatewaySender,
}

impl<T> Clone for TranscriptionBridge<T> {
    fn clone(&self) -> Self {
        Self {
            transcriber: Arc::clone(&self.transcriber),
            subscriber: Arc::clone(&self.subscriber),
            outbox: self.outbox.clone(),
        }
    }
}

impl<T: Transcriber> TranscriptionBridge<T> {
    pub fn new(transcriber: Arc<T>, subscriber: Arc<SubscriberSlot>, outbox: GatewaySender) -> Self {
        Self {
            transcriber,
            subscriber,
            outbox,
        }
    }

    pub fn subscriber(&self) -> &SubscriberSlot {
        &self.subscriber
    }

    pub fn register_subscriber(&self, id: SubscriberId) {
        match self.subscriber.register(id.clone()) {
            Some(previous) if previous == id => {
                tracing::debug!(subscriber = %id, "Subscriber re-registered");
            }
            Some(previous) => {
                tracing::info!(subscriber = %id, %previous, "Subscriber replaced");
            }
            None => tracing::info!(subscriber = %id, "Subscriber registered"),
        }
    }

    /// Transcribe `path` and push the result to the current subscriber, if any.
    ///
    /// The subscriber is read once, after transcription finishes.
    pub async fn handle_transcription_request(&self, path: Vec<u8>) -> RequestOutcome {
        let path = match String::from_utf8(path) {
            Ok(path) => path,
            Err(e) => {
                let err = TranscriptionError::from(e);
                tracing::warn!(error = %err, "Dropping transcription request");
                return RequestOutcome::Failed(err);
            }
        };

        let result = match self.run_transcriber(&path).await {
            Ok(result) => result,
            Err(e) => {
                tracing::error!(%path, error = %e, "Transcription failed");
                return RequestOutcome::Failed(e);
            }
        };

        match self.subscriber.current() {
            Some(to) => {
                tracing::debug!(%path, subscriber = %to, "Delivering transcription result");
                self.outbox.send(to.clone(), ResultMessage::new(path, result));
                RequestOutcome::Delivered { to }
            }
            None => {
                tracing::debug!(%path, "No subscriber registered, discarding result");
                RequestOutcome::Discarded
            }
        }
    }

    /// Transcribe without notifying anyone; the result and any error are dropped.
    ///
    /// Not reachable from the wire protocol. Embedding hosts call it directly.
    pub async fn direct_transcribe(&self, path: &str) {
        if let Err(e) = self.run_transcriber(path).await {
            tracing::debug!(%path, error = %e, "Direct transcription failed");
        }
    }

    /// Runs the capability on its own task so a panic inside it becomes an error.
    async fn run_transcriber(&self, path: &str) -> Result<serde_json::Value, TranscriptionError> {
        let transcriber = Arc::clone(&self.transcriber);
        let path = path.to_string();
        tokio::spawn(async move { transcriber.transcribe(&path).await })
            .await
            .map_err(|e| TranscriptionError::Panicked(e.to_string()))?
    }
}
