//! The session orchestrator: starts or resumes a remote Spark session,
//! submits code, polls statements to completion, and decodes their results.

use std::collections::HashMap;
use std::time::Duration;

use futures::future::BoxFuture;
use log::{debug, warn};
use tokio::time::sleep;

use crate::api::LivyApi;
use crate::client::LivyClient;
use crate::dataframe::{capture_code, DataFrame};
use crate::error::{LivyError, Result};
use crate::models::{
    CreateSessionRequest, Output, Session, SessionKind, SessionState, Statement, StatementState,
};
use crate::polling::PollSchedule;

/// Manages a remote Livy session and high-level interactions with it.
///
/// The session is not started on construction; call [`start`](Self::start),
/// or use [`with`](Self::with) to bracket a body between `start()` and a
/// guaranteed `close()`. A `LivySession` owns one session identity and is not
/// meant for concurrent use; independent sessions need independent instances.
///
/// ```rust,no_run
/// use livy_client::{LivySession, SessionKind};
///
/// # async fn example() -> livy_client::Result<()> {
/// let mut session = LivySession::builder("http://livy:8998", SessionKind::PySpark).build();
/// session.start().await?;
/// session.run("df = spark.read.json('s3://bucket/data')").await?;
/// let frame = session.read("df").await?;
/// println!("{} rows", frame.len());
/// session.close().await;
/// # Ok(())
/// # }
/// ```
pub struct LivySession<C: LivyApi = LivyClient> {
    client: C,
    request: CreateSessionRequest,
    echo: bool,
    check: bool,
    resume_id: Option<i64>,
    schedule: PollSchedule,
    session_id: Option<i64>,
}

impl LivySession<LivyClient> {
    /// Builder backed by a default [`LivyClient`] for the given server URL.
    pub fn builder(url: &str, kind: SessionKind) -> LivySessionBuilder<LivyClient> {
        LivySessionBuilder::new(LivyClient::new(url), kind)
    }
}

impl<C: LivyApi> LivySession<C> {
    /// Builder over an explicit transport, e.g. a pre-configured
    /// [`LivyClient`] or a test double.
    pub fn with_client(client: C, kind: SessionKind) -> LivySessionBuilder<C> {
        LivySessionBuilder::new(client, kind)
    }

    /// A reference to the underlying transport, for direct calls.
    pub fn client(&self) -> &C {
        &self.client
    }

    /// The id of the managed session, once started.
    pub fn session_id(&self) -> Option<i64> {
        self.session_id
    }

    /// Creates the remote session (or resumes the configured one) and waits
    /// for it to leave the not-ready states.
    ///
    /// With the default schedule this can block indefinitely if the remote
    /// service wedges; configure a ceiling to surface
    /// [`LivyError::PollTimeout`] instead.
    pub async fn start(&mut self) -> Result<()> {
        let session = self.resume_or_create().await?;
        debug!("session {} adopted in state {:?}", session.id, session.state);
        self.session_id = Some(session.id);

        let mut intervals = self.schedule.intervals();
        let mut waited = Duration::ZERO;
        while self.state().await?.is_not_ready() {
            let Some(interval) = intervals.next() else {
                return Err(LivyError::PollTimeout { waited });
            };
            waited += interval;
            sleep(interval).await;
        }
        Ok(())
    }

    async fn resume_or_create(&self) -> Result<Session> {
        if let Some(id) = self.resume_id {
            match self.client.get_session(id).await? {
                None => {
                    warn!("resuming session {id} failed: session does not exist; creating a new session");
                }
                Some(session) if session.state.is_defunct() => {
                    warn!(
                        "resuming session {id} failed: state is {:?}; creating a new session",
                        session.state
                    );
                }
                Some(session) => return Ok(session),
            }
        }
        self.client.create_session(&self.request).await
    }

    /// The state of the managed session, re-fetched from the server.
    pub async fn state(&self) -> Result<SessionState> {
        let id = self.session_id.ok_or(LivyError::SessionNotStarted)?;
        let session = self
            .client
            .get_session(id)
            .await?
            .ok_or(LivyError::SessionGone { id })?;
        Ok(session.state)
    }

    /// Runs some code in the managed session and waits for its output.
    ///
    /// With the echo policy the text payload is printed to stdout; with the
    /// check policy a failed output escalates to [`LivyError::SparkRuntime`]
    /// after the echo. Without check, failed outputs are returned as data.
    pub async fn run(&self, code: &str) -> Result<Output> {
        let output = self.execute(code).await?;
        if self.echo {
            if let Some(text) = output.text() {
                println!("{text}");
            }
        }
        if self.check {
            output.raise_for_status()?;
        }
        Ok(output)
    }

    /// Evaluates and retrieves a Spark dataframe living in the session.
    ///
    /// Generates the dialect's serialization snippet, runs it, and decodes
    /// the printed JSON lines. Fails for SQL sessions before contacting the
    /// server; use [`read_sql`](Self::read_sql) there instead.
    pub async fn read(&self, dataframe_name: &str) -> Result<DataFrame> {
        let code = capture_code(dataframe_name, self.request.kind)?;
        let output = self.execute(&code).await?;
        output.raise_for_status()?;
        let text = output.text().ok_or(LivyError::MissingTextOutput)?;
        DataFrame::from_json_lines(text)
    }

    /// Evaluates a Spark SQL statement and retrieves the result. Only valid
    /// for SQL sessions.
    pub async fn read_sql(&self, query: &str) -> Result<DataFrame> {
        if self.request.kind != SessionKind::Sql {
            return Err(LivyError::UnsupportedKind {
                operation: "read_sql",
                kind: self.request.kind,
            });
        }
        let output = self.execute(query).await?;
        output.raise_for_status()?;
        let json = output.json().ok_or(LivyError::MissingJsonOutput)?;
        DataFrame::from_sql_output(json)
    }

    /// Tears down the remote session, if one was started.
    ///
    /// Teardown failures are logged and not escalated; the session identity
    /// is cleared either way. Idempotent.
    pub async fn close(&mut self) {
        if let Some(id) = self.session_id.take() {
            if let Err(err) = self.client.delete_session(id).await {
                warn!("failed to tear down session {id}: {err}");
            }
        }
    }

    /// Brackets `body` between `start()` and a guaranteed `close()`.
    ///
    /// `close()` runs whether the body succeeds or fails, so the remote
    /// session is torn down on every exit path. A failure inside `start()`
    /// itself propagates without teardown, since nothing was acquired.
    pub async fn with<T, F>(mut self, body: F) -> Result<T>
    where
        F: for<'a> FnOnce(&'a mut LivySession<C>) -> BoxFuture<'a, Result<T>>,
    {
        self.start().await?;
        let result = body(&mut self).await;
        self.close().await;
        result
    }

    /// Submits `code` and polls the statement until its state is terminal
    /// and an output is attached.
    ///
    /// `Available` with no output is still in flight (the server attaches
    /// the output after the state transition); a terminal state that never
    /// yields an output is a protocol violation, not retried.
    async fn execute(&self, code: &str) -> Result<Output> {
        let session_id = self.session_id.ok_or(LivyError::SessionNotStarted)?;
        let mut statement = self.client.create_statement(session_id, code, None).await?;
        debug!("statement {} submitted to session {session_id}", statement.id);

        let mut intervals = self.schedule.intervals();
        let mut waited = Duration::ZERO;
        while waiting_for_output(&statement) {
            let Some(interval) = intervals.next() else {
                return Err(LivyError::PollTimeout { waited });
            };
            waited += interval;
            sleep(interval).await;
            statement = self.client.get_statement(session_id, statement.id).await?;
        }

        statement.output.ok_or(LivyError::MissingOutput)
    }
}

fn waiting_for_output(statement: &Statement) -> bool {
    let not_finished = matches!(
        statement.state,
        StatementState::Waiting | StatementState::Running
    );
    let available = statement.state == StatementState::Available;
    not_finished || (available && statement.output.is_none())
}

impl<C: LivyApi> Drop for LivySession<C> {
    fn drop(&mut self) {
        if let Some(id) = self.session_id {
            warn!("session {id} dropped without close(); the remote session was not torn down");
        }
    }
}

/// Builder for [`LivySession`] instances. Echo and check both default to on,
/// matching `run`'s interactive use.
pub struct LivySessionBuilder<C: LivyApi> {
    client: C,
    request: CreateSessionRequest,
    echo: bool,
    check: bool,
    resume_id: Option<i64>,
    schedule: PollSchedule,
}

impl<C: LivyApi> LivySessionBuilder<C> {
    fn new(client: C, kind: SessionKind) -> Self {
        Self {
            client,
            request: CreateSessionRequest::new(kind),
            echo: true,
            check: true,
            resume_id: None,
            schedule: PollSchedule::default(),
        }
    }

    /// User to impersonate when starting the session.
    pub fn proxy_user(mut self, user: impl Into<String>) -> Self {
        self.request.proxy_user = Some(user.into());
        self
    }

    /// URLs of jars to be used in this session.
    pub fn jars(mut self, jars: Vec<String>) -> Self {
        self.request.jars = Some(jars);
        self
    }

    /// URLs of Python files to be used in this session.
    pub fn py_files(mut self, py_files: Vec<String>) -> Self {
        self.request.py_files = Some(py_files);
        self
    }

    /// URLs of files to be used in this session.
    pub fn files(mut self, files: Vec<String>) -> Self {
        self.request.files = Some(files);
        self
    }

    /// Amount of memory to use for the driver process (e.g. "512m").
    pub fn driver_memory(mut self, memory: impl Into<String>) -> Self {
        self.request.driver_memory = Some(memory.into());
        self
    }

    pub fn driver_cores(mut self, cores: i32) -> Self {
        self.request.driver_cores = Some(cores);
        self
    }

    /// Amount of memory to use per executor process (e.g. "512m").
    pub fn executor_memory(mut self, memory: impl Into<String>) -> Self {
        self.request.executor_memory = Some(memory.into());
        self
    }

    pub fn executor_cores(mut self, cores: i32) -> Self {
        self.request.executor_cores = Some(cores);
        self
    }

    pub fn num_executors(mut self, executors: i32) -> Self {
        self.request.num_executors = Some(executors);
        self
    }

    /// URLs of archives to be used in this session.
    pub fn archives(mut self, archives: Vec<String>) -> Self {
        self.request.archives = Some(archives);
        self
    }

    /// The name of the YARN queue to which submitted.
    pub fn queue(mut self, queue: impl Into<String>) -> Self {
        self.request.queue = Some(queue.into());
        self
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.request.name = Some(name.into());
        self
    }

    /// Spark configuration properties.
    pub fn spark_conf(mut self, conf: HashMap<String, String>) -> Self {
        self.request.conf = Some(conf);
        self
    }

    /// Whether to echo output printed in the remote session.
    pub fn echo(mut self, echo: bool) -> Self {
        self.echo = echo;
        self
    }

    /// Whether to raise when a statement in the remote session fails.
    pub fn check(mut self, check: bool) -> Self {
        self.check = check;
        self
    }

    /// A session id to resume instead of creating a new session. If it no
    /// longer exists, or is dead, killed, or errored, a new session is
    /// created instead.
    pub fn resume_session(mut self, session_id: i64) -> Self {
        self.resume_id = Some(session_id);
        self
    }

    /// Replaces the default poll schedule.
    pub fn poll_schedule(mut self, schedule: PollSchedule) -> Self {
        self.schedule = schedule;
        self
    }

    /// Caps how long any single poll loop may wait in total. Without this,
    /// polls block until the remote side reaches a terminal state.
    pub fn poll_timeout(mut self, ceiling: Duration) -> Self {
        self.schedule = self.schedule.with_ceiling(ceiling);
        self
    }

    pub fn build(self) -> LivySession<C> {
        LivySession {
            client: self.client,
            request: self.request,
            echo: self.echo,
            check: self.check,
            resume_id: self.resume_id,
            schedule: self.schedule,
            session_id: None,
        }
    }
}
