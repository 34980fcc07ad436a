//! Message gateway: the only component that touches the wire format.
//!
//! Inbound frames are read by [`Gateway::receive`]. Outbound frames go through
//! a [`GatewaySender`], which queues onto an unbounded channel drained by a
//! writer task, so a send never waits on the host.

use std::io;

use futures::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::codec::{FramedRead, FramedWrite};

use crate::bridge::codec::{EncodeError, JsonCodec};
use crate::bridge::protocol::{HostMessage, ResultMessage, SubscriberId, WorkerMessage};

#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// Inbound frame could not be decoded into a known message.
    #[error("protocol error: {0}")]
    Protocol(#[source] io::Error),

    /// Transport failed underneath the framing.
    #[error("transport error: {0}")]
    Io(#[source] io::Error),

    /// Host closed its end; no more messages will arrive.
    #[error("inbound channel closed")]
    Closed,
}

impl From<io::Error> for GatewayError {
    fn from(e: io::Error) -> Self {
        if e.kind() == io::ErrorKind::InvalidData {
            Self::Protocol(e)
        } else {
            Self::Io(e)
        }
    }
}

/// Inbound half of the gateway.
pub struct Gateway<R> {
    reader: FramedRead<R, JsonCodec<HostMessage>>,
}

impl<R: AsyncRead + Unpin> Gateway<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader: FramedRead::new(reader, JsonCodec::new()),
        }
    }

    /// Wait for the next message from the host.
    ///
    /// Errors are terminal: after a protocol error the stream position is
    /// unknown, so callers stop reading.
    pub async fn receive(&mut self) -> Result<HostMessage, GatewayError> {
        match self.reader.next().await {
            Some(Ok(msg)) => Ok(msg),
            Some(Err(e)) => Err(e.into()),
            None => Err(GatewayError::Closed),
        }
    }
}

/// Handle for sending results back to the host.
///
/// Cheap to clone. Delivery is best-effort: if the writer task has stopped the
/// message is dropped with a debug log and nothing is reported to the caller.
#[derive(Clone)]
pub struct GatewaySender {
    tx: mpsc::UnboundedSender<WorkerMessage>,
}

impl GatewaySender {
    pub fn new(tx: mpsc::UnboundedSender<WorkerMessage>) -> Self {
        Self { tx }
    }

    pub fn send(&self, destination: SubscriberId, payload: ResultMessage) {
        let msg = payload.addressed_to(destination);
        if let Err(e) = self.tx.send(msg) {
            tracing::debug!(dropped = ?e.0, "Outbound channel closed, dropping message");
        }
    }
}

/// Spawn the writer task that drains queued messages onto `writer`.
///
/// The task ends once every [`GatewaySender`] clone is dropped and the queue
/// is empty, or at the first I/O error. A message that cannot be framed is
/// logged and dropped; later messages still go out.
pub fn spawn_writer<W>(writer: W) -> (GatewaySender, JoinHandle<()>)
where
    W: AsyncWrite + Unpin + Send + 'static,
{
    let (tx, mut rx) = mpsc::unbounded_channel::<WorkerMessage>();
    let task = tokio::spawn(async move {
        let mut framed = FramedWrite::new(writer, JsonCodec::<WorkerMessage>::new());
        while let Some(msg) = rx.recv().await {
            let WorkerMessage::TranscriptionResult { to, path, .. } = &msg;
            let (to, path) = (to.clone(), path.clone());
            match framed.send(msg).await {
                Ok(()) => {}
                Err(EncodeError::Frame(e)) => {
                    tracing::error!(subscriber = %to, %path, error = %e, "Dropping outbound message");
                }
                Err(EncodeError::Io(e)) => {
                    tracing::warn!(error = %e, "Failed to write outbound frame");
                    break;
                }
            }
        }
        tracing::trace!("Outbound writer exiting");
    });
    (GatewaySender::new(tx), task)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tokio::io::AsyncWriteExt;
    use tokio_util::bytes::BytesMut;
    use tokio_util::codec::Encoder;

    fn frame(msg: HostMessage) -> BytesMut {
        let mut buf = BytesMut::new();
        JsonCodec::<HostMessage>::new().encode(msg, &mut buf).unwrap();
        buf
    }

    #[tokio::test]
    async fn receive_yields_messages_in_order() {
        let (mut host, worker) = tokio::io::duplex(1024);
        let mut gateway = Gateway::new(worker);

        host.write_all(&frame(HostMessage::RegisterSubscriber {
            subscriber: SubscriberId::new("s1"),
        }))
        .await
        .unwrap();
        host.write_all(&frame(HostMessage::TranscriptionRequest {
            path: b"a.wav".to_vec(),
        }))
        .await
        .unwrap();

        assert!(matches!(
            gateway.receive().await.unwrap(),
            HostMessage::RegisterSubscriber { .. }
        ));
        match gateway.receive().await.unwrap() {
            HostMessage::TranscriptionRequest { path } => assert_eq!(path, b"a.wav"),
            other => panic!("wrong variant: {other:?}"),
        }
    }

    #[tokio::test]
    async fn receive_reports_closed_on_eof() {
        let (host, worker) = tokio::io::duplex(64);
        let mut gateway = Gateway::new(worker);
        drop(host);

        assert!(matches!(gateway.receive().await, Err(GatewayError::Closed)));
    }

    #[tokio::test]
    async fn malformed_frame_is_protocol_error() {
        let (mut host, worker) = tokio::io::duplex(64);
        let mut gateway = Gateway::new(worker);

        let body = br#"{"type":"nope"}"#;
        host.write_all(&(body.len() as u32).to_be_bytes())
            .await
            .unwrap();
        host.write_all(body).await.unwrap();

        assert!(matches!(
            gateway.receive().await,
            Err(GatewayError::Protocol(_))
        ));
    }

    #[tokio::test]
    async fn writer_frames_sent_messages() {
        let (worker, host) = tokio::io::duplex(1024);
        let (sender, task) = spawn_writer(worker);

        sender.send(
            SubscriberId::new("s1"),
            ResultMessage::new("a.wav", json!("hello")),
        );
        drop(sender);
        task.await.unwrap();

        let mut reader = FramedRead::new(host, JsonCodec::<WorkerMessage>::new());
        let WorkerMessage::TranscriptionResult { to, path, result } =
            reader.next().await.unwrap().unwrap();
        assert_eq!(to, SubscriberId::new("s1"));
        assert_eq!(path, "a.wav");
        assert_eq!(result, json!("hello"));
        assert!(reader.next().await.is_none());
    }

    #[tokio::test]
    async fn oversized_result_does_not_stop_later_sends() {
        let (worker, host) = tokio::io::duplex(1024);
        let (sender, task) = spawn_writer(worker);

        sender.send(
            SubscriberId::new("s1"),
            ResultMessage::new("long.wav", json!("x".repeat(8 * 1024 * 1024 + 10))),
        );
        sender.send(SubscriberId::new("s1"), ResultMessage::new("short.wav", json!("ok")));
        drop(sender);
        task.await.unwrap();

        let paths: Vec<String> = FramedRead::new(host, JsonCodec::<WorkerMessage>::new())
            .map(|frame| {
                let WorkerMessage::TranscriptionResult { path, .. } = frame.unwrap();
                path
            })
            .collect()
            .await;
        assert_eq!(paths, vec!["short.wav"]);
    }

    #[tokio::test]
    async fn send_after_writer_stopped_does_not_fail() {
        let (tx, rx) = mpsc::unbounded_channel();
        drop(rx);
        let sender = GatewaySender::new(tx);

        sender.send(SubscriberId::new("gone"), ResultMessage::new("a.wav", json!(null)));
    }

    #[test]
    fn io_errors_classify() {
        let protocol: GatewayError = io::Error::new(io::ErrorKind::InvalidData, "bad").into();
        assert!(matches!(protocol, GatewayError::Protocol(_)));

        let broken: GatewayError = io::Error::new(io::ErrorKind::BrokenPipe, "gone").into();
        assert!(matches!(broken, GatewayError::Io(_)));
    }
}
