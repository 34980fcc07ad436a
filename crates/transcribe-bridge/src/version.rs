//! Version information for the worker.

/// Crate version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Version line logged at startup and printed by `--help`.
pub fn version_line() -> String {
    format!("transcribe-worker {VERSION}")
}
