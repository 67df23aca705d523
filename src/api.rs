use crate::error::Result;
use crate::models::{CreateSessionRequest, LivyVersion, Session, Statement, StatementKind};

/// The Livy REST surface the session orchestrator drives.
///
/// [`LivyClient`](crate::client::LivyClient) is the reqwest-backed
/// implementation; tests substitute an in-process fake. Transport-level
/// failures propagate as fatal errors and are never retried here.
#[allow(async_fn_in_trait)]
pub trait LivyApi {
    /// GET /version
    async fn server_version(&self) -> Result<LivyVersion>;

    /// GET /sessions
    async fn list_sessions(&self) -> Result<Vec<Session>>;

    /// POST /sessions
    async fn create_session(&self, request: &CreateSessionRequest) -> Result<Session>;

    /// GET /sessions/{id}, with absence reported as `None`.
    async fn get_session(&self, session_id: i64) -> Result<Option<Session>>;

    /// DELETE /sessions/{id}
    async fn delete_session(&self, session_id: i64) -> Result<()>;

    /// GET /sessions/{id}/statements
    async fn list_statements(&self, session_id: i64) -> Result<Vec<Statement>>;

    /// POST /sessions/{id}/statements
    async fn create_statement(
        &self,
        session_id: i64,
        code: &str,
        kind: Option<StatementKind>,
    ) -> Result<Statement>;

    /// GET /sessions/{id}/statements/{statement_id}
    async fn get_statement(&self, session_id: i64, statement_id: i64) -> Result<Statement>;
}
