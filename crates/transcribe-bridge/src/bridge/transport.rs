//! Transport between the worker and its host.
//!
//! - **Stdio**: frames on stdin/stdout (the host spawned us with pipes)
//! - **Socket**: a Unix domain socket the host is already listening on

use std::fmt;
use std::io;
use std::path::PathBuf;
use std::pin::Pin;

use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::UnixStream;

pub type BoxedReader = Pin<Box<dyn AsyncRead + Send>>;
pub type BoxedWriter = Pin<Box<dyn AsyncWrite + Send>>;

/// Where the worker finds its host.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TransportInfo {
    #[default]
    Stdio,
    Socket {
        path: PathBuf,
    },
}

impl fmt::Display for TransportInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Stdio => f.write_str("stdio"),
            Self::Socket { path } => write!(f, "socket:{}", path.display()),
        }
    }
}

/// Open the transport, returning independent read and write halves.
pub async fn connect_transport(info: &TransportInfo) -> io::Result<(BoxedReader, BoxedWriter)> {
    match info {
        TransportInfo::Stdio => {
            tracing::debug!(transport_type = "stdio", "Using stdio transport");
            Ok((Box::pin(tokio::io::stdin()), Box::pin(tokio::io::stdout())))
        }
        TransportInfo::Socket { path } => {
            tracing::debug!(transport_type = "socket", path = %path.display(), "Connecting to host socket");
            let stream = UnixStream::connect(path).await?;
            let (read_half, write_half) = stream.into_split();
            tracing::trace!(path = %path.display(), "Connected");
            Ok((Box::pin(read_half), Box::pin(write_half)))
        }
    }
}
