//! Framed codec for host communication.
//!
//! Uses LengthDelimitedCodec for framing + serde_json for serialization.
//! Works over any AsyncRead/AsyncWrite (pipes, sockets, in-memory duplex).

use std::io;
use std::marker::PhantomData;

use serde::{Serialize, de::DeserializeOwned};
use tokio_util::bytes::{Bytes, BytesMut};
use tokio_util::codec::{Decoder, Encoder, LengthDelimitedCodec};

/// Outbound encode failure.
///
/// `Frame` rejects one message (not serializable, or longer than the codec's
/// frame limit) and leaves the stream usable. `Io` comes from the underlying
/// writer and means the stream is gone.
#[derive(Debug, thiserror::Error)]
pub enum EncodeError {
    #[error("failed to encode frame: {0}")]
    Frame(#[source] io::Error),

    #[error(transparent)]
    Io(#[from] io::Error),
}

/// Codec that frames messages with a 4-byte length prefix and serializes with JSON.
///
/// A frame whose body is not valid JSON for `T` decodes to an
/// [`io::ErrorKind::InvalidData`] error.
pub struct JsonCodec<T> {
    inner: LengthDelimitedCodec,
    _phantom: PhantomData<T>,
}

impl<T> Default for JsonCodec<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> JsonCodec<T> {
    pub fn new() -> Self {
        Self {
            inner: LengthDelimitedCodec::builder()
                .length_field_length(4)
                .new_codec(),
            _phantom: PhantomData,
        }
    }
}

impl<T: DeserializeOwned> Decoder for JsonCodec<T> {
    type Item = T;
    type Error = io::Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        match self.inner.decode(src)? {
            Some(bytes) => {
                tracing::trace!(json_size_bytes = bytes.len(), "Decoding frame");
                let item = serde_json::from_slice(&bytes)
                    .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
                Ok(Some(item))
            }
            None => Ok(None),
        }
    }
}

impl<T: Serialize> Encoder<T> for JsonCodec<T> {
    type Error = EncodeError;

    fn encode(&mut self, item: T, dst: &mut BytesMut) -> Result<(), Self::Error> {
        let json = serde_json::to_vec(&item)
            .map_err(|e| EncodeError::Frame(io::Error::new(io::ErrorKind::InvalidData, e)))?;
        let json_len = json.len();
        tracing::trace!(json_size_bytes = json_len, "Encoding frame");
        if json_len > 100_000 {
            tracing::info!(
                json_size_bytes = json_len,
                json_size_kb = json_len / 1024,
                "Large frame being encoded"
            );
        }
        self.inner
            .encode(Bytes::from(json), dst)
            .map_err(EncodeError::Frame)
    }
}
