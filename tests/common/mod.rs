//! Scripted in-process transport for orchestrator tests.
//!
//! Each endpoint has a queue of canned responses; a call with an empty queue
//! panics, which doubles as an assertion that an operation never reached the
//! transport.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use serde_json::{json, Value};

use livy_client::{
    CreateSessionRequest, LivyApi, LivyVersion, Output, OutputStatus, Result, Session,
    SessionKind, SessionState, Statement, StatementKind, StatementState,
};

#[derive(Debug, Default, Clone, Copy)]
pub struct Calls {
    pub create_session: usize,
    pub get_session: usize,
    pub delete_session: usize,
    pub create_statement: usize,
    pub get_statement: usize,
}

#[derive(Default)]
struct Script {
    create_session: VecDeque<Result<Session>>,
    get_session: VecDeque<Result<Option<Session>>>,
    delete_session: VecDeque<Result<()>>,
    create_statement: VecDeque<Result<Statement>>,
    get_statement: VecDeque<Result<Statement>>,
    submitted_code: Vec<String>,
    calls: Calls,
}

/// Cloning shares the script, so a test can keep one handle for inspection
/// while the orchestrator owns another.
#[derive(Default, Clone)]
pub struct FakeClient {
    script: Arc<Mutex<Script>>,
}

impl FakeClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn expect_create_session(&self, result: Result<Session>) {
        self.script.lock().unwrap().create_session.push_back(result);
    }

    pub fn expect_get_session(&self, result: Result<Option<Session>>) {
        self.script.lock().unwrap().get_session.push_back(result);
    }

    pub fn expect_delete_session(&self, result: Result<()>) {
        self.script.lock().unwrap().delete_session.push_back(result);
    }

    pub fn expect_create_statement(&self, result: Result<Statement>) {
        self.script.lock().unwrap().create_statement.push_back(result);
    }

    pub fn expect_get_statement(&self, result: Result<Statement>) {
        self.script.lock().unwrap().get_statement.push_back(result);
    }

    pub fn calls(&self) -> Calls {
        self.script.lock().unwrap().calls
    }

    pub fn submitted_code(&self) -> Vec<String> {
        self.script.lock().unwrap().submitted_code.clone()
    }
}

impl LivyApi for FakeClient {
    async fn server_version(&self) -> Result<LivyVersion> {
        Ok(LivyVersion::new(0, 6, 0))
    }

    async fn list_sessions(&self) -> Result<Vec<Session>> {
        Ok(vec![])
    }

    async fn create_session(&self, _request: &CreateSessionRequest) -> Result<Session> {
        let mut script = self.script.lock().unwrap();
        script.calls.create_session += 1;
        script
            .create_session
            .pop_front()
            .expect("unexpected create_session call")
    }

    async fn get_session(&self, _session_id: i64) -> Result<Option<Session>> {
        let mut script = self.script.lock().unwrap();
        script.calls.get_session += 1;
        script
            .get_session
            .pop_front()
            .expect("unexpected get_session call")
    }

    async fn delete_session(&self, _session_id: i64) -> Result<()> {
        let mut script = self.script.lock().unwrap();
        script.calls.delete_session += 1;
        script
            .delete_session
            .pop_front()
            .expect("unexpected delete_session call")
    }

    async fn list_statements(&self, _session_id: i64) -> Result<Vec<Statement>> {
        Ok(vec![])
    }

    async fn create_statement(
        &self,
        _session_id: i64,
        code: &str,
        _kind: Option<StatementKind>,
    ) -> Result<Statement> {
        let mut script = self.script.lock().unwrap();
        script.calls.create_statement += 1;
        script.submitted_code.push(code.to_string());
        script
            .create_statement
            .pop_front()
            .expect("unexpected create_statement call")
    }

    async fn get_statement(&self, _session_id: i64, _statement_id: i64) -> Result<Statement> {
        let mut script = self.script.lock().unwrap();
        script.calls.get_statement += 1;
        script
            .get_statement
            .pop_front()
            .expect("unexpected get_statement call")
    }
}

pub fn session(id: i64, kind: SessionKind, state: SessionState) -> Session {
    Session {
        id,
        name: None,
        app_id: None,
        owner: None,
        proxy_user: None,
        kind,
        state,
        log: vec![],
    }
}

pub fn statement(id: i64, state: StatementState, output: Option<Output>) -> Statement {
    Statement {
        session_id: 0,
        id,
        code: None,
        state,
        output,
        progress: None,
    }
}

pub fn text_output(text: &str) -> Output {
    Output {
        status: OutputStatus::Ok,
        execution_count: Some(0),
        data: Some(HashMap::from([("text/plain".to_string(), json!(text))])),
        ename: None,
        evalue: None,
        traceback: None,
    }
}

pub fn json_output(value: Value) -> Output {
    Output {
        status: OutputStatus::Ok,
        execution_count: Some(0),
        data: Some(HashMap::from([("application/json".to_string(), value)])),
        ename: None,
        evalue: None,
        traceback: None,
    }
}

pub fn error_output(ename: &str, evalue: &str) -> Output {
    Output {
        status: OutputStatus::Error,
        execution_count: Some(0),
        data: None,
        ename: Some(ename.to_string()),
        evalue: Some(evalue.to_string()),
        traceback: Some(vec![format!("{ename}: {evalue}")]),
    }
}
