//! Worker event loop.
//!
//! Reads host messages one at a time, in arrival order, and routes them to the
//! [`TranscriptionBridge`]. Registration is applied inline. Requests are either
//! awaited before the next read (serial) or spawned on their own task
//! (concurrent).
//!
//! Only the two wire messages are routed here. [`TranscriptionBridge::direct_transcribe`]
//! has no wire form: it is library API for a host that links this crate and
//! holds a `TranscriptionBridge` in-process.

use std::fmt;
use std::str::FromStr;

use tokio::io::AsyncRead;
use tokio::task::JoinSet;
use tracing::Instrument;

use crate::bridge::protocol::HostMessage;
use crate::bridge::transport::TransportInfo;
use crate::gateway::{Gateway, GatewayError};
use crate::service::{RequestOutcome, TranscriptionBridge};
use crate::transcriber::Transcriber;

/// How transcription requests share the receive loop.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DispatchMode {
    /// One request at a time; a slow transcription holds up every later message.
    #[default]
    Serial,
    /// Each request on its own task; completion order is unspecified.
    Concurrent,
}

impl DispatchMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Serial => "serial",
            Self::Concurrent => "concurrent",
        }
    }
}

impl fmt::Display for DispatchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DispatchMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "serial" => Ok(Self::Serial),
            "concurrent" => Ok(Self::Concurrent),
            other => Err(format!(
                "unknown dispatch mode '{other}' (expected serial or concurrent)"
            )),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkerConfig {
    pub dispatch: DispatchMode,
    pub transport: TransportInfo,
    /// Program and leading arguments for the command transcriber.
    pub command: Vec<String>,
}

impl WorkerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_dispatch(mut self, dispatch: DispatchMode) -> Self {
        self.dispatch = dispatch;
        self
    }

    pub fn with_transport(mut self, transport: TransportInfo) -> Self {
        self.transport = transport;
        self
    }

    pub fn with_command(mut self, command: Vec<String>) -> Self {
        self.command = command;
        self
    }
}

/// Run the worker event loop until the host closes the channel.
///
/// Returns an error only for faults the gateway detects before routing
/// (undecodable frame, transport failure). In concurrent mode, requests still
/// in flight are awaited before returning so their results get queued.
pub async fn run_worker<R, T>(
    mut gateway: Gateway<R>,
    bridge: TranscriptionBridge<T>,
    dispatch: DispatchMode,
) -> Result<(), GatewayError>
where
    R: AsyncRead + Unpin,
    T: Transcriber,
{
    tracing::info!(%dispatch, "Worker ready for messages");
    let mut in_flight = JoinSet::new();

    let result = loop {
        let msg = match gateway.receive().await {
            Ok(msg) => msg,
            Err(GatewayError::Closed) => {
                tracing::info!("Inbound channel closed (host exited?), stopping");
                break Ok(());
            }
            Err(e) => {
                tracing::error!(error = %e, "Fatal gateway error");
                break Err(e);
            }
        };

        match msg {
            HostMessage::RegisterSubscriber { subscriber } => {
                bridge.register_subscriber(subscriber);
            }
            HostMessage::TranscriptionRequest { path } => {
                let request_id = uuid::Uuid::new_v4();
                let span = tracing::info_span!("transcription_request", %request_id);
                match dispatch {
                    DispatchMode::Serial => {
                        let outcome = bridge
                            .handle_transcription_request(path)
                            .instrument(span.clone())
                            .await;
                        span.in_scope(|| log_outcome(&outcome));
                    }
                    DispatchMode::Concurrent => {
                        let bridge = bridge.clone();
                        in_flight.spawn(
                            async move {
                                let outcome = bridge.handle_transcription_request(path).await;
                                log_outcome(&outcome);
                            }
                            .instrument(span),
                        );
                    }
                }
            }
        }

        while in_flight.try_join_next().is_some() {}
    };

    if !in_flight.is_empty() {
        tracing::info!(pending = in_flight.len(), "Waiting for in-flight requests");
        while in_flight.join_next().await.is_some() {}
    }

    result
}

fn log_outcome(outcome: &RequestOutcome) {
    match outcome {
        RequestOutcome::Delivered { to } => tracing::info!(subscriber = %to, "Request delivered"),
        RequestOutcome::Discarded => tracing::info!("Request completed with no subscriber"),
        RequestOutcome::Failed(e) => tracing::debug!(error = %e, "Request dropped"),
    }
}
