//! transcribe-bridge: worker side of a host/worker transcription bridge.
//!
//! The host sends `RegisterSubscriber` and `TranscriptionRequest` frames; the
//! worker runs each request through a [`Transcriber`] and pushes results to
//! whoever is registered when the transcription finishes.

mod version;

pub mod bridge;
pub mod config;
pub mod gateway;
pub mod service;
pub mod subscriber;
pub mod transcriber;
pub mod worker;

pub use bridge::protocol::{HostMessage, ResultMessage, SubscriberId, WorkerMessage};
pub use bridge::transport::TransportInfo;
pub use config::ConfigError;
pub use gateway::{Gateway, GatewayError, GatewaySender, spawn_writer};
pub use service::{RequestOutcome, TranscriptionBridge};
pub use subscriber::SubscriberSlot;
pub use transcriber::{BlockingTranscriber, CommandTranscriber, Transcriber, TranscriptionError};
pub use version::{VERSION, version_line};
pub use worker::{DispatchMode, WorkerConfig, run_worker};
