use std::time::Duration;

use thiserror::Error;

use crate::models::{LivyVersion, SessionKind};

pub type Result<T> = std::result::Result<T, LivyError>;

/// Possible errors encountered by the Livy client.
#[derive(Error, Debug)]
pub enum LivyError {
    /// An operation that needs a session identity was called before `start()`.
    #[error("session not yet started")]
    SessionNotStarted,

    /// The server no longer knows the session id; it may have been shut down
    /// out-of-band.
    #[error("session {id} not found - it may have been shut down")]
    SessionGone { id: i64 },

    #[error("{operation} is not supported for sessions of kind {kind}")]
    UnsupportedKind {
        operation: &'static str,
        kind: SessionKind,
    },

    #[error("session kind {kind} is not valid for Livy server version {version}")]
    InvalidSessionKind {
        kind: SessionKind,
        version: LivyVersion,
    },

    #[error("per-statement kinds require Livy 0.5.0 or later (server is {version})")]
    StatementKindUnsupported { version: LivyVersion },

    /// The statement reached a terminal state but the server never attached
    /// an output. Protocol violation, not retried.
    #[error("statement reached a terminal state with no output attached")]
    MissingOutput,

    #[error("statement output had no text payload")]
    MissingTextOutput,

    #[error("statement output had no JSON payload")]
    MissingJsonOutput,

    #[error("JSON output does not match the expected schema/data structure")]
    InvalidSqlOutput,

    #[error("output line is not a JSON object: {line}")]
    MalformedRecord { line: String },

    #[error("could not parse Livy server version {0:?}")]
    InvalidVersion(String),

    /// The remote code raised. Data by default; escalated by the session's
    /// check policy.
    #[error(
        "remote code failed: {}{}",
        .ename.as_deref().unwrap_or("error"),
        .evalue.as_ref().map(|v| format!(": {v}")).unwrap_or_default()
    )]
    SparkRuntime {
        ename: Option<String>,
        evalue: Option<String>,
        traceback: Vec<String>,
    },

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (HTTP {status}): {message}")]
    Api { status: u16, message: String },

    #[error("not found (404)")]
    NotFound,

    /// The polling schedule's ceiling was exhausted before a terminal state
    /// was observed. Only possible with an explicit ceiling configured.
    #[error("polling schedule exhausted after {waited:?}")]
    PollTimeout { waited: Duration },

    #[error("invalid client configuration: {0}")]
    Configuration(String),
}
