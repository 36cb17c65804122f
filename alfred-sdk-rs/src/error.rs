//! Error types for the chat bridge.
//!
//! Each stage of the pipeline owns one enum. The dispatcher decides which of
//! them end a turn and which are only logged.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Failures of the log tail. All of them are fatal for the producer.
#[derive(Debug, Error)]
pub enum TailError {
    #[error("failed to open log {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to read log {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Failures of a single round trip with the remote model.
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// Non-2xx answer. `status` carries the full status line, e.g. `429 Too Many Requests`.
    #[error("api error: {status} - {body}")]
    Status { status: String, body: String },

    #[error("malformed response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("no choices returned")]
    NoChoices,
}

/// Failures of a tool call. These never abort a turn; they are fed back to the model.
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("invalid arguments: {0}")]
    InvalidArguments(#[from] serde_json::Error),

    #[error("missing {0}")]
    Missing(&'static str),

    #[error("invalid player name: {0:?}")]
    InvalidPlayer(String),

    #[error("unsupported time value: {0}")]
    UnsupportedTime(String),

    #[error("time ticks must be between 0 and 24000")]
    TimeOutOfRange,

    #[error("unsupported weather value: {0}")]
    UnsupportedWeather(String),

    #[error(transparent)]
    Console(#[from] ConsoleError),
}

/// Failures writing into the game console.
#[derive(Debug, Error)]
pub enum ConsoleError {
    #[error("failed to launch console transport: {0}")]
    Spawn(#[from] io::Error),

    #[error("console session {session} rejected command ({status})")]
    Rejected { session: String, status: String },

    #[error("empty response")]
    EmptyReply,
}

/// Reasons a reply turn produced no answer.
#[derive(Debug, Error)]
pub enum TurnError {
    #[error(transparent)]
    Model(#[from] LlmError),

    #[error("no executor available for requested tool(s): {}", .0.join(", "))]
    Unroutable(Vec<String>),

    #[error("tool routing exceeded {0} attempts")]
    HopLimit(usize),

    #[error("turn cancelled")]
    Cancelled,
}

#[derive(Debug, Error)]
pub enum AuditError {
    #[error("failed to encode audit record: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("failed to append to {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} is required")]
    Missing(&'static str),
}
