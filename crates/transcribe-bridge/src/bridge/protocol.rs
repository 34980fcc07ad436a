//! Wire protocol types for host-worker communication.
//!
//! One bidirectional channel:
//! - **Inbound** (host → worker): RegisterSubscriber, TranscriptionRequest
//! - **Outbound** (worker → host): TranscriptionResult, addressed to a subscriber

use serde::{Deserialize, Serialize};

/// Opaque identity of a remote recipient for transcription results.
///
/// The worker never interprets it; the host decides what it means (a process
/// id, a mailbox name, ...) and routes outbound frames by it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubscriberId(String);

impl SubscriberId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SubscriberId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Messages from host to worker.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum HostMessage {
    /// Replace the current subscriber.
    RegisterSubscriber { subscriber: SubscriberId },

    /// Transcribe the file at `path`.
    ///
    /// Raw bytes on purpose: a path that is not UTF-8 must reach the worker
    /// and be rejected there, not fail the whole frame.
    TranscriptionRequest {
        #[serde(with = "path_bytes")]
        path: Vec<u8>,
    },
}

/// Messages from worker to host.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WorkerMessage {
    TranscriptionResult {
        to: SubscriberId,
        path: String,
        result: serde_json::Value,
    },
}

/// A finished transcription, before it is addressed to anyone.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultMessage {
    pub path: String,
    pub result: serde_json::Value,
}

impl ResultMessage {
    pub fn new(path: impl Into<String>, result: serde_json::Value) -> Self {
        Self {
            path: path.into(),
            result,
        }
    }

    pub fn addressed_to(self, to: SubscriberId) -> WorkerMessage {
        WorkerMessage::TranscriptionResult {
            to,
            path: self.path,
            result: self.result,
        }
    }
}

/// Path bytes travel as standard base64 inside the JSON frame.
mod path_bytes {
    use base64::Engine;
    use base64::engine::general_purpose::STANDARD;
    use serde::{Deserialize, Deserializer, Serializer, de::Error};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        STANDARD.decode(encoded.as_bytes()).map_err(D::Error::custom)
    }
}
