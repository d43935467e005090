use std::sync::Arc;

use reqwest::{header::CONTENT_TYPE, Client, Method, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;
use wheels_core::responses::ErrorBody;

use crate::error::ClientError;
use crate::session::{Session, SessionStore};

pub const DEFAULT_BASE_URL: &str = "http://localhost:3000";

/// Wheels API client
#[derive(Clone)]
pub struct ApiClient {
    http: Client,
    base_url: String,
    sessions: Arc<dyn SessionStore>,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>, sessions: Arc<dyn SessionStore>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            http: Client::new(),
            base_url,
            sessions,
        }
    }

    /// Uses `WHEELS_API_URL`, falling back to a local server.
    pub fn from_env(sessions: Arc<dyn SessionStore>) -> Self {
        let base_url = std::env::var("WHEELS_API_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
        Self::new(base_url, sessions)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn session(&self) -> Result<Option<Session>, ClientError> {
        Session::load(self.sessions.as_ref())
    }

    pub(crate) fn sessions(&self) -> &dyn SessionStore {
        self.sessions.as_ref()
    }

    /// Sends a JSON request to `path` and decodes the JSON answer.
    pub async fn send<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> Result<T, ClientError> {
        self.send_with_query(method, path, &[], body).await
    }

    pub async fn send_with_query<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, String)],
        body: Option<Value>,
    ) -> Result<T, ClientError> {
        let url = format!("{}{}", self.base_url, path);
        let mut request = self
            .http
            .request(method.clone(), &url)
            .header(CONTENT_TYPE, "application/json");
        if !query.is_empty() {
            request = request.query(query);
        }
        if let Some(session) = self.session()? {
            request = request.bearer_auth(session.token);
        }
        if let Some(body) = body {
            request = request.json(&body);
        }

        debug!("{} {}", method, url);
        let response = request
            .send()
            .await
            .map_err(|e| ClientError::Transport(e.to_string()))?;
        let status = response.status();
        let bytes = response
            .bytes()
            .await
            .map_err(|e| ClientError::Transport(e.to_string()))?;

        if status.is_success() {
            return serde_json::from_slice(&bytes)
                .map_err(|e| ClientError::Transport(format!("unexpected response body: {}", e)));
        }

        if status == StatusCode::UNAUTHORIZED {
            Session::clear(self.sessions())?;
        }
        let body = serde_json::from_slice::<ErrorBody>(&bytes).ok();
        Err(ClientError::from_response(status.as_u16(), body))
    }
}
