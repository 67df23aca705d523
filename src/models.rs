//! Protocol entities exchanged with the Livy server: session and statement
//! kinds, their state enumerations, and the request/response bodies.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{LivyError, Result};

/// The execution-engine dialect a session runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionKind {
    Spark,
    PySpark,
    PySpark3,
    SparkR,
    Sql,
}

impl fmt::Display for SessionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionKind::Spark => "spark",
            SessionKind::PySpark => "pyspark",
            SessionKind::PySpark3 => "pyspark3",
            SessionKind::SparkR => "sparkr",
            SessionKind::Sql => "sql",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    NotStarted,
    Starting,
    Idle,
    Busy,
    ShuttingDown,
    Error,
    Dead,
    Killed,
}

impl SessionState {
    /// The session is not yet usable; keep polling.
    pub fn is_not_ready(self) -> bool {
        matches!(self, SessionState::NotStarted | SessionState::Starting)
    }

    /// The session cannot be resumed; a new one must be created instead.
    pub fn is_defunct(self) -> bool {
        matches!(
            self,
            SessionState::Dead | SessionState::Killed | SessionState::Error
        )
    }
}

/// Per-statement code kind accepted by Livy 0.5.0 and later.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatementKind {
    Spark,
    PySpark,
    SparkR,
    Sql,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatementState {
    Waiting,
    Running,
    Available,
    Error,
    Cancelled,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: i64,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(rename = "appId", default)]
    pub app_id: Option<String>,
    #[serde(default)]
    pub owner: Option<String>,
    #[serde(rename = "proxyUser", default)]
    pub proxy_user: Option<String>,
    pub kind: SessionKind,
    pub state: SessionState,
    #[serde(default)]
    pub log: Vec<String>,
}

/// One submitted unit of code and its eventual result.
///
/// A statement is done only when its state is terminal *and* `output` is
/// present. The server transitions state to `Available` before attaching the
/// output, so `Available` with `output == None` is still in flight.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Statement {
    /// Not part of the wire payload; injected by the transport from the
    /// request path.
    #[serde(skip)]
    pub session_id: i64,
    pub id: i64,
    #[serde(default)]
    pub code: Option<String>,
    pub state: StatementState,
    #[serde(default)]
    pub output: Option<Output>,
    #[serde(default)]
    pub progress: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputStatus {
    Ok,
    Error,
}

/// The result of an executed statement.
///
/// Exactly one of successful-with-payload or failed-with-error-detail holds;
/// `raise_for_status` answers "did this succeed" independent of which payload
/// field is populated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Output {
    pub status: OutputStatus,
    #[serde(default)]
    pub execution_count: Option<i64>,
    #[serde(default)]
    pub data: Option<HashMap<String, Value>>,
    #[serde(default)]
    pub ename: Option<String>,
    #[serde(default)]
    pub evalue: Option<String>,
    #[serde(default)]
    pub traceback: Option<Vec<String>>,
}

impl Output {
    /// The plain-text payload, if the server produced one.
    pub fn text(&self) -> Option<&str> {
        self.data.as_ref()?.get("text/plain")?.as_str()
    }

    /// The structured JSON payload; only populated for SQL statements.
    pub fn json(&self) -> Option<&Value> {
        self.data.as_ref()?.get("application/json")
    }

    pub fn raise_for_status(&self) -> Result<()> {
        match self.status {
            OutputStatus::Ok => Ok(()),
            OutputStatus::Error => Err(LivyError::SparkRuntime {
                ename: self.ename.clone(),
                evalue: self.evalue.clone(),
                traceback: self.traceback.clone().unwrap_or_default(),
            }),
        }
    }
}

/// Livy server version, parsed from strings like `"0.5.0-incubating"`.
///
/// Servers older than 0.5.0 are "legacy": they accept session kind
/// `pyspark3` but not `sql`, and reject a per-statement kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct LivyVersion {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
}

impl LivyVersion {
    pub fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }

    /// Parses a version string, ignoring any pre-release suffix.
    pub fn parse(version: &str) -> Result<Self> {
        let numeric = version.split('-').next().unwrap_or(version);
        let mut parts = numeric.split('.');
        let mut part = || -> Result<u32> {
            match parts.next() {
                None => Ok(0),
                Some(p) => p
                    .parse()
                    .map_err(|_| LivyError::InvalidVersion(version.to_string())),
            }
        };
        Ok(Self {
            major: part()?,
            minor: part()?,
            patch: part()?,
        })
    }

    pub fn is_legacy(self) -> bool {
        self < LivyVersion::new(0, 5, 0)
    }
}

impl fmt::Display for LivyVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

/// Body for `POST /sessions`, with Livy's camelCase wire keys. All fields
/// except `kind` are skipped when unset.
#[derive(Debug, Clone, Serialize)]
pub struct CreateSessionRequest {
    pub kind: SessionKind,
    #[serde(rename = "proxyUser", skip_serializing_if = "Option::is_none")]
    pub proxy_user: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub jars: Option<Vec<String>>,
    #[serde(rename = "pyFiles", skip_serializing_if = "Option::is_none")]
    pub py_files: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub files: Option<Vec<String>>,
    #[serde(rename = "driverMemory", skip_serializing_if = "Option::is_none")]
    pub driver_memory: Option<String>,
    #[serde(rename = "driverCores", skip_serializing_if = "Option::is_none")]
    pub driver_cores: Option<i32>,
    #[serde(rename = "executorMemory", skip_serializing_if = "Option::is_none")]
    pub executor_memory: Option<String>,
    #[serde(rename = "executorCores", skip_serializing_if = "Option::is_none")]
    pub executor_cores: Option<i32>,
    #[serde(rename = "numExecutors", skip_serializing_if = "Option::is_none")]
    pub num_executors: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub archives: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub queue: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conf: Option<HashMap<String, String>>,
}

impl CreateSessionRequest {
    pub fn new(kind: SessionKind) -> Self {
        Self {
            kind,
            proxy_user: None,
            jars: None,
            py_files: None,
            files: None,
            driver_memory: None,
            driver_cores: None,
            executor_memory: None,
            executor_cores: None,
            num_executors: None,
            archives: None,
            queue: None,
            name: None,
            conf: None,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CreateStatementRequest {
    pub code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<StatementKind>,
}
