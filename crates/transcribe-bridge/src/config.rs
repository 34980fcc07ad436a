//! Worker configuration from environment variables and command-line flags.
//!
//! Environment is read first; flags override it.
//!
//! | Env var              | Flag                        | Default  |
//! |----------------------|-----------------------------|----------|
//! | `TRANSCRIBE_DISPATCH`| `--dispatch <mode>`         | `serial` |
//! | `TRANSCRIBE_SOCKET`  | `--socket <path>`           | stdio    |
//! | `TRANSCRIBE_COMMAND` | `-- <program> [args...]`    | required |
//!
//! `TRANSCRIBE_COMMAND` is split on whitespace unless it starts with `[`, in
//! which case it is read as a JSON array of strings. Use the array form when
//! the program path or an argument contains a space.

use std::path::PathBuf;

use crate::bridge::transport::TransportInfo;
use crate::worker::{DispatchMode, WorkerConfig};

pub const ENV_DISPATCH: &str = "TRANSCRIBE_DISPATCH";
pub const ENV_SOCKET: &str = "TRANSCRIBE_SOCKET";
pub const ENV_COMMAND: &str = "TRANSCRIBE_COMMAND";

pub const USAGE: &str = "\
Usage: transcribe-worker [--dispatch serial|concurrent] [--socket <path>] [-- <program> [args...]]

Options:
  --dispatch <mode>  Run requests one at a time (serial) or on their own tasks (concurrent) [env: TRANSCRIBE_DISPATCH] [default: serial]
  --socket <path>    Connect to the host over a Unix socket instead of stdio [env: TRANSCRIBE_SOCKET]
  -- <program> ...   Transcription command; the file path is appended as the last argument [env: TRANSCRIBE_COMMAND, whitespace-separated or a JSON array of strings]";

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("help requested")]
    HelpRequested,

    #[error("{flag} requires a value")]
    MissingValue { flag: &'static str },

    #[error("unknown flag: {0}")]
    UnknownFlag(String),

    #[error("unexpected argument: {0}")]
    UnexpectedArgument(String),

    #[error("{0}")]
    InvalidDispatch(String),

    #[error("TRANSCRIBE_COMMAND is not a JSON array of strings: {0}")]
    InvalidCommand(String),

    #[error("no transcription command given (set TRANSCRIBE_COMMAND or pass it after --)")]
    MissingCommand,
}

/// Build the worker config from the process environment and `args` (argv, including argv[0]).
pub fn load(args: &[String]) -> Result<WorkerConfig, ConfigError> {
    load_from(args, |key| std::env::var(key).ok())
}

/// Same as [`load`] with an injectable environment lookup.
pub fn load_from<F>(args: &[String], env: F) -> Result<WorkerConfig, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let mut config = WorkerConfig::new();

    if let Some(mode) = env(ENV_DISPATCH).filter(|v| !v.trim().is_empty()) {
        config.dispatch = mode
            .parse::<DispatchMode>()
            .map_err(ConfigError::InvalidDispatch)?;
    }
    if let Some(path) = env(ENV_SOCKET).filter(|v| !v.trim().is_empty()) {
        config.transport = TransportInfo::Socket {
            path: PathBuf::from(path),
        };
    }
    if let Some(command) = env(ENV_COMMAND) {
        config.command = parse_command(&command)?;
    }

    let mut i = 1; // skip argv[0]
    while i < args.len() {
        match args[i].as_str() {
            "--dispatch" => {
                i += 1;
                let mode = args.get(i).ok_or(ConfigError::MissingValue {
                    flag: "--dispatch",
                })?;
                config.dispatch = mode.parse().map_err(ConfigError::InvalidDispatch)?;
            }
            "--socket" => {
                i += 1;
                let path = args
                    .get(i)
                    .ok_or(ConfigError::MissingValue { flag: "--socket" })?;
                config.transport = TransportInfo::Socket {
                    path: PathBuf::from(path),
                };
            }
            "--" => {
                config.command = args[i + 1..].to_vec();
                break;
            }
            "--help" | "-h" => return Err(ConfigError::HelpRequested),
            arg if arg.starts_with('-') => return Err(ConfigError::UnknownFlag(arg.to_string())),
            arg => return Err(ConfigError::UnexpectedArgument(arg.to_string())),
        }
        i += 1;
    }

    if config.command.is_empty() {
        return Err(ConfigError::MissingCommand);
    }

    Ok(config)
}

fn parse_command(value: &str) -> Result<Vec<String>, ConfigError> {
    let value = value.trim();
    if value.starts_with('[') {
        serde_json::from_str(value).map_err(|e| ConfigError::InvalidCommand(e.to_string()))
    } else {
        Ok(value.split_whitespace().map(str::to_string).collect())
    }
}
