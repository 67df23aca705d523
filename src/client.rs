//! Low-level Livy REST client that directly calls the endpoints.

use std::sync::Arc;
use std::time::Duration;

use log::debug;
use reqwest::{RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::api::LivyApi;
use crate::error::{LivyError, Result};
use crate::models::{
    CreateSessionRequest, CreateStatementRequest, LivyVersion, Session, SessionKind, Statement,
    StatementKind,
};

/// Authentication applied to every request.
#[derive(Debug, Clone)]
pub enum Auth {
    None,
    Basic { username: String, password: String },
    Bearer(String),
}

impl Auth {
    fn apply(&self, request: RequestBuilder) -> RequestBuilder {
        match self {
            Auth::None => request,
            Auth::Basic { username, password } => request.basic_auth(username, Some(password)),
            Auth::Bearer(token) => request.bearer_auth(token),
        }
    }
}

#[derive(Debug, Deserialize)]
struct VersionResponse {
    version: String,
}

#[derive(Debug, Deserialize)]
struct SessionList {
    sessions: Vec<Session>,
}

#[derive(Debug, Deserialize)]
struct StatementList {
    statements: Vec<Statement>,
}

/// Reqwest-backed implementation of [`LivyApi`].
///
/// The server version is fetched once and cached; it gates which session and
/// statement kinds are accepted before anything is posted.
#[derive(Debug, Clone)]
pub struct LivyClient {
    base_url: String,
    http_client: reqwest::Client,
    auth: Auth,
    version_cache: Arc<Mutex<Option<LivyVersion>>>,
}

impl LivyClient {
    /// Creates a client with default settings and no authentication.
    ///
    /// Example `base_url`: `http://livy.example.com:8998`
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http_client: reqwest::Client::new(),
            auth: Auth::None,
            version_cache: Arc::new(Mutex::new(None)),
        }
    }

    pub fn builder() -> LivyClientBuilder {
        LivyClientBuilder::new()
    }

    async fn cached_version(&self) -> Result<LivyVersion> {
        let mut cache = self.version_cache.lock().await;
        if let Some(version) = *cache {
            return Ok(version);
        }
        let response: VersionResponse = self.get_json("/version").await?;
        let version = LivyVersion::parse(&response.version)?;
        debug!("livy server version {version}");
        *cache = Some(version);
        Ok(version)
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = format!("{}{}", self.base_url, path);
        debug!("GET {url}");
        let resp = self.auth.apply(self.http_client.get(&url)).send().await?;
        Self::handle_response(resp).await
    }

    async fn post_json<B: Serialize, T: DeserializeOwned>(&self, path: &str, body: &B) -> Result<T> {
        let url = format!("{}{}", self.base_url, path);
        debug!("POST {url}");
        let resp = self
            .auth
            .apply(self.http_client.post(&url))
            .json(body)
            .send()
            .await?;
        Self::handle_response(resp).await
    }

    async fn delete(&self, path: &str) -> Result<()> {
        let url = format!("{}{}", self.base_url, path);
        debug!("DELETE {url}");
        let resp = self.auth.apply(self.http_client.delete(&url)).send().await?;
        let status = resp.status();
        if status == StatusCode::NOT_FOUND {
            return Err(LivyError::NotFound);
        }
        if !status.is_success() {
            let message = resp.text().await?;
            return Err(LivyError::Api {
                status: status.as_u16(),
                message,
            });
        }
        Ok(())
    }

    async fn handle_response<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T> {
        let status = resp.status();
        if status == StatusCode::NOT_FOUND {
            return Err(LivyError::NotFound);
        }
        if !status.is_success() {
            let message = resp.text().await?;
            return Err(LivyError::Api {
                status: status.as_u16(),
                message,
            });
        }
        Ok(resp.json::<T>().await?)
    }
}

/// Whether the given session kind is accepted by a server of the given
/// version. Legacy servers predate the `sql` kind; modern servers dropped
/// `pyspark3` (plain `pyspark` selects the configured Python).
fn session_kind_valid(kind: SessionKind, version: LivyVersion) -> bool {
    if version.is_legacy() {
        !matches!(kind, SessionKind::Sql)
    } else {
        !matches!(kind, SessionKind::PySpark3)
    }
}

impl LivyApi for LivyClient {
    async fn server_version(&self) -> Result<LivyVersion> {
        self.cached_version().await
    }

    async fn list_sessions(&self) -> Result<Vec<Session>> {
        let list: SessionList = self.get_json("/sessions").await?;
        Ok(list.sessions)
    }

    async fn create_session(&self, request: &CreateSessionRequest) -> Result<Session> {
        let version = self.cached_version().await?;
        if !session_kind_valid(request.kind, version) {
            return Err(LivyError::InvalidSessionKind {
                kind: request.kind,
                version,
            });
        }
        self.post_json("/sessions", request).await
    }

    async fn get_session(&self, session_id: i64) -> Result<Option<Session>> {
        match self.get_json(&format!("/sessions/{session_id}")).await {
            Ok(session) => Ok(Some(session)),
            Err(LivyError::NotFound) => Ok(None),
            Err(err) => Err(err),
        }
    }

    async fn delete_session(&self, session_id: i64) -> Result<()> {
        self.delete(&format!("/sessions/{session_id}")).await
    }

    async fn list_statements(&self, session_id: i64) -> Result<Vec<Statement>> {
        let list: StatementList = self
            .get_json(&format!("/sessions/{session_id}/statements"))
            .await?;
        Ok(list
            .statements
            .into_iter()
            .map(|mut statement| {
                statement.session_id = session_id;
                statement
            })
            .collect())
    }

    async fn create_statement(
        &self,
        session_id: i64,
        code: &str,
        kind: Option<StatementKind>,
    ) -> Result<Statement> {
        if kind.is_some() {
            let version = self.cached_version().await?;
            if version.is_legacy() {
                return Err(LivyError::StatementKindUnsupported { version });
            }
        }
        let body = CreateStatementRequest {
            code: code.to_string(),
            kind,
        };
        let mut statement: Statement = self
            .post_json(&format!("/sessions/{session_id}/statements"), &body)
            .await?;
        statement.session_id = session_id;
        Ok(statement)
    }

    async fn get_statement(&self, session_id: i64, statement_id: i64) -> Result<Statement> {
        let mut statement: Statement = self
            .get_json(&format!("/sessions/{session_id}/statements/{statement_id}"))
            .await?;
        statement.session_id = session_id;
        Ok(statement)
    }
}

/// Builder for configuring [`LivyClient`] instances.
pub struct LivyClientBuilder {
    base_url: Option<String>,
    auth: Auth,
    timeout: Option<Duration>,
    accept_invalid_certs: bool,
}

impl LivyClientBuilder {
    fn new() -> Self {
        Self {
            base_url: None,
            auth: Auth::None,
            timeout: None,
            accept_invalid_certs: false,
        }
    }

    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    pub fn auth(mut self, auth: Auth) -> Self {
        self.auth = auth;
        self
    }

    pub fn basic_auth(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.auth = Auth::Basic {
            username: username.into(),
            password: password.into(),
        };
        self
    }

    pub fn bearer_token(mut self, token: impl Into<String>) -> Self {
        self.auth = Auth::Bearer(token.into());
        self
    }

    /// Request timeout for every HTTP call.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Disable TLS certificate verification.
    pub fn danger_accept_invalid_certs(mut self, accept: bool) -> Self {
        self.accept_invalid_certs = accept;
        self
    }

    pub fn build(self) -> Result<LivyClient> {
        let base_url = self
            .base_url
            .ok_or_else(|| LivyError::Configuration("base_url is required".into()))?;
        let mut builder =
            reqwest::Client::builder().danger_accept_invalid_certs(self.accept_invalid_certs);
        if let Some(timeout) = self.timeout {
            builder = builder.timeout(timeout);
        }
        let http_client = builder
            .build()
            .map_err(|e| LivyError::Configuration(e.to_string()))?;
        Ok(LivyClient {
            base_url: base_url.trim_end_matches('/').to_string(),
            http_client,
            auth: self.auth,
            version_cache: Arc::new(Mutex::new(None)),
        })
    }
}
