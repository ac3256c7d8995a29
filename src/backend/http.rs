//! HTTP client for the analytics backend
//!
//! JSON-over-HTTP rendering of the [`Backend`] contract. Every mutating
//! request is stamped with the caller's wall-clock time so the backend can
//! order records from clients with skewed clocks relative to their own
//! session only.

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use reqwest::StatusCode;
use serde_json::{Value, json};

use super::{Backend, SessionUpdate};
use crate::error::{Result, TraceError};
use crate::types::identifiers::{EventId, SessionId, StepId};
use crate::types::options::ObserverOptions;
use crate::types::records::{EventKind, SessionSnapshot, StepFields};

/// Default production endpoint
pub const DEFAULT_BASE_URL: &str = "https://analytics.spanfold.dev/api";

/// Environment variable consulted when options carry no API key
pub const API_KEY_ENV: &str = "SPANFOLD_API_KEY";

/// Environment variable consulted when options carry no base URL
pub const BASE_URL_ENV: &str = "SPANFOLD_BASE_URL";

/// Per-request timeout for backend calls (30s)
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Reqwest-based backend client
pub struct HttpBackend {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl HttpBackend {
    /// Create a backend client from options, falling back to the environment
    ///
    /// # Errors
    /// Returns `InvalidConfig` if no API key is available from either source,
    /// or if the HTTP client cannot be constructed.
    pub fn new(options: &ObserverOptions) -> Result<Self> {
        let api_key = options
            .api_key
            .clone()
            .or_else(|| std::env::var(API_KEY_ENV).ok())
            .ok_or_else(|| {
                TraceError::invalid_config(format!(
                    "API key not provided. Pass it in options or set {API_KEY_ENV}"
                ))
            })?;

        let base_url = options
            .base_url
            .clone()
            .or_else(|| std::env::var(BASE_URL_ENV).ok())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| TraceError::invalid_config(format!("HTTP client setup failed: {e}")))?;

        Ok(Self {
            http,
            base_url,
            api_key,
        })
    }

    /// Verify the configured API key against the backend
    ///
    /// # Errors
    /// Returns `Unauthorized` if the backend rejects the key.
    pub async fn verify_api_key(&self) -> Result<()> {
        self.get("verifyapikey", &[]).await.map(|_| ())
    }

    async fn post(&self, endpoint: &str, body: Value) -> Result<Value> {
        let request = self
            .http
            .post(format!("{}/{endpoint}", self.base_url))
            .json(&stamped(body));
        self.dispatch(endpoint, request).await
    }

    async fn put(&self, endpoint: &str, body: Value) -> Result<Value> {
        let request = self
            .http
            .put(format!("{}/{endpoint}", self.base_url))
            .json(&stamped(body));
        self.dispatch(endpoint, request).await
    }

    async fn get(&self, endpoint: &str, params: &[(&str, &str)]) -> Result<Value> {
        let request = self
            .http
            .get(format!("{}/{endpoint}", self.base_url))
            .query(params);
        self.dispatch(endpoint, request).await
    }

    async fn dispatch(&self, endpoint: &str, request: reqwest::RequestBuilder) -> Result<Value> {
        let response = request
            .header("Authorization", format!("Api-Key {}", self.api_key))
            .send()
            .await
            .map_err(|e| TraceError::backend(format!("Request to {endpoint} failed: {e}")))?;

        match response.status() {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                return Err(TraceError::unauthorized(format!(
                    "Backend rejected API key: {}",
                    response.status()
                )));
            }
            StatusCode::NOT_FOUND => {
                return Err(TraceError::session_not_found(format!(
                    "{endpoint}: 404 Not Found"
                )));
            }
            status if !status.is_success() => {
                let text = response.text().await.unwrap_or_default();
                return Err(TraceError::backend(format!(
                    "Request to {endpoint} failed with {status}: {text}"
                )));
            }
            _ => {}
        }

        response
            .json()
            .await
            .map_err(|e| TraceError::backend(format!("Invalid JSON from {endpoint}: {e}")))
    }
}

/// Stamp a request body with the current wall-clock time
fn stamped(mut body: Value) -> Value {
    if let Some(map) = body.as_object_mut() {
        map.insert("current_time".to_string(), json!(Utc::now().to_rfc3339()));
    }
    body
}

/// Extract a required string field from a backend response
fn required_str(response: &Value, field: &str) -> Result<String> {
    response
        .get(field)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| TraceError::backend(format!("Backend response missing '{field}'")))
}

/// Serialize step fields into the flat update body the backend expects
fn step_body(fields: &StepFields) -> Value {
    serde_json::to_value(fields).unwrap_or_else(|_| json!({}))
}

#[async_trait]
impl Backend for HttpBackend {
    async fn init_session(&self, name: &str, task: Option<&str>) -> Result<SessionId> {
        let response = self
            .post(
                "initsession",
                json!({ "session_name": name, "task": task }),
            )
            .await?;
        Ok(SessionId::from(required_str(&response, "session_id")?))
    }

    async fn continue_session(&self, session_id: &SessionId) -> Result<SessionSnapshot> {
        let response = self
            .get("continuesession", &[("session_id", session_id.as_str())])
            .await?;
        let closed = response
            .get("is_finished")
            .and_then(Value::as_bool)
            .unwrap_or(false);
        let next_ordinal = response
            .get("step_count")
            .and_then(Value::as_u64)
            .ok_or_else(|| TraceError::backend("Backend response missing 'step_count'"))?;
        Ok(SessionSnapshot {
            session_id: session_id.clone(),
            closed,
            next_ordinal,
        })
    }

    async fn update_session(&self, session_id: &SessionId, update: &SessionUpdate) -> Result<()> {
        self.put(
            "updatesession",
            json!({
                "session_id": session_id.as_str(),
                "task": update.task,
                "session_eval": update.eval_score,
                "session_eval_reason": update.eval_description,
                "is_successful": update.successful,
            }),
        )
        .await
        .map(|_| ())
    }

    async fn end_session(&self, session_id: &SessionId, update: &SessionUpdate) -> Result<()> {
        self.put(
            "updatesession",
            json!({
                "session_id": session_id.as_str(),
                "is_finished": true,
                "task": update.task,
                "session_eval": update.eval_score,
                "session_eval_reason": update.eval_description,
                "is_successful": update.successful,
            }),
        )
        .await
        .map(|_| ())
    }

    async fn create_step(&self, session_id: &SessionId, fields: &StepFields) -> Result<StepId> {
        let mut body = step_body(fields);
        if let Some(map) = body.as_object_mut() {
            map.insert("session_id".to_string(), json!(session_id.as_str()));
        }
        let response = self.post("initstep", body).await?;
        Ok(StepId::from(required_str(&response, "step_id")?))
    }

    async fn update_step(&self, step_id: &StepId, fields: &StepFields) -> Result<()> {
        let mut body = step_body(fields);
        if let Some(map) = body.as_object_mut() {
            map.insert("step_id".to_string(), json!(step_id.as_str()));
        }
        self.put("updatestep", body).await.map(|_| ())
    }

    async fn end_step(&self, step_id: &StepId, fields: &StepFields) -> Result<()> {
        let mut body = step_body(fields);
        if let Some(map) = body.as_object_mut() {
            map.insert("step_id".to_string(), json!(step_id.as_str()));
            map.insert("is_finished".to_string(), json!(true));
        }
        self.put("updatestep", body).await.map(|_| ())
    }

    async fn create_event(
        &self,
        step_id: &StepId,
        kind: EventKind,
        input: Option<&Value>,
        output: Option<&Value>,
        incomplete: bool,
    ) -> Result<EventId> {
        let response = self
            .post(
                "initevent",
                json!({
                    "step_id": step_id.as_str(),
                    "kind": kind,
                    "input": input,
                    "output": output,
                    "incomplete": incomplete,
                }),
            )
            .await?;
        Ok(EventId::from(required_str(&response, "event_id")?))
    }
}
