//! Transcription capability and its failure type.
//!
//! The worker treats transcription as a black box: a path goes in, an opaque
//! JSON value or a [`TranscriptionError`] comes out.

use std::io;
use std::process::Stdio;
use std::sync::Arc;

use tokio::process::Command;

#[derive(Debug, thiserror::Error)]
pub enum TranscriptionError {
    #[error("path is not valid UTF-8: {0}")]
    InvalidPath(#[from] std::string::FromUtf8Error),

    #[error("failed to start transcriber: {0}")]
    Spawn(#[source] io::Error),

    #[error("transcriber exited with {status}: {stderr}")]
    Exited { status: String, stderr: String },

    #[error("transcription failed: {0}")]
    Failed(String),

    #[error("transcriber panicked: {0}")]
    Panicked(String),
}

impl TranscriptionError {
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed(message.into())
    }
}

/// The transcription capability.
#[async_trait::async_trait]
pub trait Transcriber: Send + Sync + 'static {
    /// Transcribe the file at `path`. May take arbitrarily long.
    async fn transcribe(&self, path: &str) -> Result<serde_json::Value, TranscriptionError>;
}

/// Runs an external program with the path appended as its last argument.
///
/// Exit 0: stdout parsed as JSON when it is JSON, else the trimmed text as a
/// JSON string. Any other exit is a failure carrying stderr.
#[derive(Debug, Clone)]
pub struct CommandTranscriber {
    program: String,
    args: Vec<String>,
}

impl CommandTranscriber {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }
}

#[async_trait::async_trait]
impl Transcriber for CommandTranscriber {
    async fn transcribe(&self, path: &str) -> Result<serde_json::Value, TranscriptionError> {
        tracing::debug!(program = %self.program, %path, "Running transcription command");
        let output = Command::new(&self.program)
            .args(&self.args)
            .arg(path)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(TranscriptionError::Spawn)?;

        if !output.status.success() {
            return Err(TranscriptionError::Exited {
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let text = stdout.trim();
        Ok(serde_json::from_str(text)
            .unwrap_or_else(|_| serde_json::Value::String(text.to_string())))
    }
}

/// Sync transcribe function - takes a path, returns a result or error.
pub type TranscribeFn =
    dyn Fn(&str) -> Result<serde_json::Value, TranscriptionError> + Send + Sync;

/// Adapts a synchronous, CPU-bound engine by running it on the blocking pool.
#[derive(Clone)]
pub struct BlockingTranscriber {
    f: Arc<TranscribeFn>,
}

impl BlockingTranscriber {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&str) -> Result<serde_json::Value, TranscriptionError> + Send + Sync + 'static,
    {
        Self { f: Arc::new(f) }
    }
}

#[async_trait::async_trait]
impl Transcriber for BlockingTranscriber {
    async fn transcribe(&self, path: &str) -> Result<serde_json::Value, TranscriptionError> {
        let f = Arc::clone(&self.f);
        let path = path.to_string();
        tokio::task::spawn_blocking(move || f(&path))
            .await
            .map_err(|e| TranscriptionError::Panicked(e.to_string()))?
    }
}
