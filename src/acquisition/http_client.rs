//! HTTP sensor backend client
//!
//! Talks to the backend REST API:
//! - `GET  /sensors/current?mode={mode}`
//! - `GET  /sensors/history/{mode}`
//! - `POST /sensors/add`
//! - `POST /upload` (multipart, field `file`)
//!
//! 401/403 map to [`ApiError::Unauthenticated`]; other error bodies are
//! expected in the `{"detail": "..."}` shape.

use async_trait::async_trait;
use reqwest::{RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

use super::{ApiError, NewReading, SensorApi, UploadReceipt};
use crate::config::BackendConfig;
use crate::types::{OperatingMode, SensorReading};

/// Error body returned by the backend.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    detail: serde_json::Value,
}

/// reqwest-backed [`SensorApi`].
#[derive(Clone)]
pub struct HttpSensorApi {
    http: reqwest::Client,
    base_url: String,
    api_token: Option<String>,
}

impl HttpSensorApi {
    /// Build a client from the `[backend]` config section.
    pub fn new(config: &BackendConfig) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ApiError::Transport(e.to_string()))?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_token: config.api_token.clone(),
        })
    }

    /// Get base URL for logging
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn authorize(&self, req: RequestBuilder) -> RequestBuilder {
        match &self.api_token {
            Some(token) => req.bearer_auth(token),
            None => req,
        }
    }

    async fn send(&self, req: RequestBuilder) -> Result<Response, ApiError> {
        let resp = self
            .authorize(req)
            .send()
            .await
            .map_err(|e| ApiError::Transport(e.to_string()))?;

        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(ApiError::Unauthenticated);
        }
        Err(error_from_response(resp).await)
    }

    async fn json<T: DeserializeOwned>(resp: Response) -> Result<T, ApiError> {
        let body = resp
            .bytes()
            .await
            .map_err(|e| ApiError::Transport(e.to_string()))?;
        serde_json::from_slice(&body).map_err(|e| ApiError::Decode(e.to_string()))
    }
}

/// Turn a non-success response into an [`ApiError`], keeping the backend's
/// `detail` message when there is one.
async fn error_from_response(resp: Response) -> ApiError {
    let status = resp.status();
    let body = resp.bytes().await.unwrap_or_default();
    let detail = serde_json::from_slice::<ErrorBody>(&body)
        .map(|b| match b.detail {
            serde_json::Value::String(s) => s,
            other => other.to_string(),
        })
        .unwrap_or_else(|_| {
            status
                .canonical_reason()
                .unwrap_or("unexpected status")
                .to_string()
        });

    if status.is_client_error() {
        ApiError::Rejected {
            status: status.as_u16(),
            detail,
        }
    } else {
        ApiError::Server {
            status: status.as_u16(),
            detail,
        }
    }
}

#[async_trait]
impl SensorApi for HttpSensorApi {
    async fn fetch_current(&self, mode: OperatingMode) -> Result<Option<SensorReading>, ApiError> {
        let req = self
            .http
            .get(self.url("/sensors/current"))
            .query(&[("mode", mode.as_str())]);

        match self.send(req).await {
            Ok(resp) => Self::json(resp).await.map(Some),
            // The backend answers 404 until the first reading for a mode exists.
            Err(ApiError::Rejected { status: 404, detail }) => {
                debug!(mode = %mode, %detail, "[HttpSensorApi] No current reading yet");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    async fn fetch_history(&self, mode: OperatingMode) -> Result<Vec<SensorReading>, ApiError> {
        let req = self.http.get(self.url(&format!("/sensors/history/{mode}")));
        let resp = self.send(req).await?;
        Self::json(resp).await
    }

    async fn add_reading(&self, reading: &NewReading) -> Result<SensorReading, ApiError> {
        let req = self.http.post(self.url("/sensors/add")).json(reading);
        let resp = self.send(req).await?;
        Self::json(resp).await
    }

    async fn upload(&self, file_name: &str, contents: Vec<u8>) -> Result<UploadReceipt, ApiError> {
        let part = reqwest::multipart::Part::bytes(contents).file_name(file_name.to_string());
        let form = reqwest::multipart::Form::new().part("file", part);
        let req = self.http.post(self.url("/upload")).multipart(form);
        let resp = self.send(req).await?;
        Self::json(resp).await
    }

    fn source_name(&self) -> &str {
        "HTTP"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_trailing_slash_is_trimmed() {
        let config = BackendConfig {
            base_url: "http://backend:8000/api/v1/".to_string(),
            ..BackendConfig::default()
        };
        let api = HttpSensorApi::new(&config).unwrap();
        assert_eq!(api.base_url(), "http://backend:8000/api/v1");
        assert_eq!(api.url("/sensors/history/offshore"), "http://backend:8000/api/v1/sensors/history/offshore");
    }

    #[test]
    fn unauthenticated_is_distinguishable() {
        assert!(ApiError::Unauthenticated.is_unauthenticated());
        let other = ApiError::Server {
            status: 500,
            detail: "boom".to_string(),
        };
        assert!(!other.is_unauthenticated());
        assert_eq!(other.detail(), "boom");
    }
}
