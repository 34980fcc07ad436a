//! IPC layer between the host process and the transcription worker.
//!
//! # Architecture
//!
//! - **protocol**: Message types (HostMessage inbound, WorkerMessage outbound)
//! - **codec**: Length-prefixed JSON framing for AsyncRead/AsyncWrite
//! - **transport**: How the worker reaches its host (stdio or a Unix socket)

pub mod codec;
pub mod protocol;
pub mod transport;
