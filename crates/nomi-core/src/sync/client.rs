//! Typed client for the remote endpoint.

use std::future::Future;
use std::time::Duration;

use reqwest::header::{ACCEPT, CONTENT_TYPE};
use serde_json::{Map, Value};

use super::error::{SyncError, SyncResult};
use super::protocol::{version_supported, ResponseData, SyncRequest, SyncResponse};
use crate::config::{normalize_endpoint, SyncConfig};
use crate::models::DrinkingRecord;
use crate::util::compact_text;

/// Moves one request body to the remote and returns the raw response body.
///
/// Implementations report non-2xx statuses and network failures as
/// transport errors; they never interpret the body.
pub trait SyncTransport: Send + Sync {
    fn send(&self, body: String) -> impl Future<Output = SyncResult<String>> + Send;
}

/// HTTP transport to a single endpoint URL.
#[derive(Clone)]
pub struct HttpTransport {
    endpoint: String,
    client: reqwest::Client,
}

impl std::fmt::Debug for HttpTransport {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("HttpTransport")
            .field("endpoint", &"[REDACTED]")
            .finish_non_exhaustive()
    }
}

impl HttpTransport {
    pub fn new(endpoint: &str, timeout: Duration) -> SyncResult<Self> {
        let endpoint = normalize_endpoint(endpoint)?;
        Ok(Self {
            endpoint,
            client: reqwest::Client::builder().timeout(timeout).build()?,
        })
    }

    /// Transport for the endpoint in `config`.
    pub fn from_config(config: &SyncConfig) -> SyncResult<Self> {
        let endpoint = config
            .endpoint_url
            .as_deref()
            .ok_or(SyncError::NotConfigured)?;
        Self::new(endpoint, config.request_timeout)
    }
}

impl SyncTransport for HttpTransport {
    fn send(&self, body: String) -> impl Future<Output = SyncResult<String>> + Send {
        async move {
            // Apps Script rejects CORS preflights, so the body goes out as
            // plain text even though it is JSON.
            let response = self
                .client
                .post(&self.endpoint)
                .header(CONTENT_TYPE, "text/plain;charset=utf-8")
                .header(ACCEPT, "application/json")
                .body(body)
                .send()
                .await?;

            let status = response.status();
            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                return Err(SyncError::Status {
                    status: status.as_u16(),
                    body: compact_text(&body),
                });
            }

            Ok(response.text().await?)
        }
    }
}

/// Result of a call that passed or failed the version gate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteOutcome<T> {
    Applied(T),
    /// The remote script predates the required version; nothing was applied.
    UpdateRequired(VersionMismatch),
}

impl<T> RemoteOutcome<T> {
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> RemoteOutcome<U> {
        match self {
            Self::Applied(value) => RemoteOutcome::Applied(f(value)),
            Self::UpdateRequired(mismatch) => RemoteOutcome::UpdateRequired(mismatch),
        }
    }

    pub fn applied(self) -> Option<T> {
        match self {
            Self::Applied(value) => Some(value),
            Self::UpdateRequired(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionMismatch {
    pub remote: String,
    pub required: String,
}

impl std::fmt::Display for VersionMismatch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let remote = if self.remote.is_empty() {
            "unknown"
        } else {
            &self.remote
        };
        write!(
            f,
            "remote script version {remote} is older than required {}",
            self.required
        )
    }
}

/// Acknowledgement of a record save.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SaveAck {
    /// Count the remote reports as written.
    pub updated: Option<u64>,
    /// Ids the remote reports as written, if it reports them.
    pub saved_ids: Option<Vec<String>>,
}

/// Typed request/response contract over a [`SyncTransport`].
pub struct RemoteClient<T> {
    transport: T,
    required_version: String,
}

impl<T: SyncTransport> RemoteClient<T> {
    pub fn new(transport: T, required_version: impl Into<String>) -> Self {
        Self {
            transport,
            required_version: required_version.into(),
        }
    }

    pub const fn transport(&self) -> &T {
        &self.transport
    }

    pub async fn save_records(
        &self,
        records: &[DrinkingRecord],
    ) -> SyncResult<RemoteOutcome<SaveAck>> {
        let outcome = self.call(&SyncRequest::save_records(records)).await?;
        Ok(outcome.map(|data| SaveAck {
            updated: data.updated,
            saved_ids: data.saved_ids,
        }))
    }

    /// Fetch raw record rows, only those touched at or after `since` when
    /// given.
    pub async fn get_records(&self, since: Option<&str>) -> SyncResult<RemoteOutcome<Vec<Value>>> {
        let outcome = self.call(&SyncRequest::get_records(since)).await?;
        Ok(outcome.map(|data| data.records.unwrap_or_default()))
    }

    pub async fn save_settings(
        &self,
        settings: &Map<String, Value>,
    ) -> SyncResult<RemoteOutcome<u64>> {
        let outcome = self.call(&SyncRequest::save_settings(settings)).await?;
        Ok(outcome.map(|data| data.updated.unwrap_or(0)))
    }

    pub async fn get_settings(&self) -> SyncResult<RemoteOutcome<Map<String, Value>>> {
        let outcome = self.call(&SyncRequest::get_settings()).await?;
        Ok(outcome.map(|data| data.settings.unwrap_or_default()))
    }

    async fn call(&self, request: &SyncRequest<'_>) -> SyncResult<RemoteOutcome<ResponseData>> {
        let body = serde_json::to_string(request).map_err(crate::Error::from)?;
        tracing::debug!(
            kind = ?request.kind,
            action = ?request.action,
            "Sending sync request"
        );

        let raw = self.transport.send(body).await?;
        let response: SyncResponse = serde_json::from_str(&raw).map_err(|error| {
            SyncError::InvalidResponse(format!("{error}: {}", compact_text(&raw)))
        })?;

        // The gate runs before `ok` and `data` are looked at.
        if !version_supported(&response.version, &self.required_version) {
            let mismatch = VersionMismatch {
                remote: response.version,
                required: self.required_version.clone(),
            };
            tracing::warn!("Refusing sync response: {mismatch}");
            return Ok(RemoteOutcome::UpdateRequired(mismatch));
        }

        if !response.ok {
            let message = response
                .error
                .filter(|message| !message.trim().is_empty())
                .unwrap_or_else(|| "unknown error".to_string());
            return Err(SyncError::Remote(message));
        }

        Ok(RemoteOutcome::Applied(response.data.unwrap_or_default()))
    }
}
