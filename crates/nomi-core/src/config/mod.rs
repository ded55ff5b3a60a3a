//! Sync configuration.
//!
//! `SyncConfig` is an explicit value handed to the sync engine. It is loaded
//! from and saved to the local store at the process boundary, so the engine
//! itself never reads persisted settings behind the caller's back.

use std::time::Duration;

use chrono::{FixedOffset, Local, Offset};

use crate::models::{KEY_ENDPOINT_URL, KEY_LAST_SYNC};
use crate::services::DatabaseService;
use crate::sync::REQUIRED_REMOTE_VERSION;
use crate::util::{is_http_url, normalize_text_option};
use crate::{Error, Result};

const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 20;

/// Endpoint and bookkeeping the sync engine runs against.
#[derive(Clone, PartialEq, Eq)]
pub struct SyncConfig {
    /// Remote endpoint; `None` disables every sync operation.
    pub endpoint_url: Option<String>,
    /// Time of the last successful record push or pull.
    pub last_sync_at: Option<String>,
    /// Oldest remote protocol version this client talks to.
    pub required_version: String,
    /// Upper bound for one remote round-trip.
    pub request_timeout: Duration,
    /// Offset used to turn remote timestamps into calendar dates.
    pub date_offset: FixedOffset,
}

impl std::fmt::Debug for SyncConfig {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Deployment URLs double as the only credential for the remote.
        formatter
            .debug_struct("SyncConfig")
            .field(
                "endpoint_url",
                &self.endpoint_url.as_ref().map(|_| "[REDACTED]"),
            )
            .field("last_sync_at", &self.last_sync_at)
            .field("required_version", &self.required_version)
            .field("request_timeout", &self.request_timeout)
            .field("date_offset", &self.date_offset)
            .finish()
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            endpoint_url: None,
            last_sync_at: None,
            required_version: REQUIRED_REMOTE_VERSION.to_string(),
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            date_offset: Local::now().offset().fix(),
        }
    }
}

impl SyncConfig {
    /// Config pointed at `endpoint`, everything else defaulted.
    pub fn for_endpoint(endpoint: &str) -> Result<Self> {
        Ok(Self {
            endpoint_url: Some(normalize_endpoint(endpoint)?),
            ..Self::default()
        })
    }

    /// True iff an endpoint URL has been set.
    pub const fn is_configured(&self) -> bool {
        self.endpoint_url.is_some()
    }

    /// Replace the endpoint for this process only (e.g. from the environment).
    pub fn with_endpoint(mut self, endpoint: Option<&str>) -> Result<Self> {
        if let Some(endpoint) = endpoint.and_then(|raw| normalize_text_option(Some(raw.to_string())))
        {
            self.endpoint_url = Some(normalize_endpoint(&endpoint)?);
        }
        Ok(self)
    }

    /// Read the persisted endpoint and last-sync keys.
    ///
    /// A stored endpoint that no longer normalizes is treated as unset.
    pub async fn load(db: &DatabaseService) -> Result<Self> {
        let stored_endpoint: Option<String> = db.get_setting(KEY_ENDPOINT_URL).await?;
        let endpoint_url = stored_endpoint.and_then(|raw| match normalize_endpoint(&raw) {
            Ok(endpoint) => Some(endpoint),
            Err(error) => {
                tracing::warn!("Ignoring stored endpoint: {error}");
                None
            }
        });

        let last_sync_at: Option<String> = db.get_setting(KEY_LAST_SYNC).await?;

        Ok(Self {
            endpoint_url,
            last_sync_at: normalize_text_option(last_sync_at),
            ..Self::default()
        })
    }

    /// Persist the endpoint and last-sync keys.
    pub async fn save(&self, db: &DatabaseService) -> Result<()> {
        match &self.endpoint_url {
            Some(endpoint) => db.set_setting(KEY_ENDPOINT_URL, endpoint.as_str()).await?,
            None => db.remove_setting(KEY_ENDPOINT_URL).await?,
        }
        match &self.last_sync_at {
            Some(last_sync_at) => db.set_setting(KEY_LAST_SYNC, last_sync_at.as_str()).await?,
            None => db.remove_setting(KEY_LAST_SYNC).await?,
        }
        Ok(())
    }
}

/// Trim an endpoint URL, require an http(s) scheme, and drop trailing slashes.
pub fn normalize_endpoint(raw: &str) -> Result<String> {
    let endpoint = normalize_text_option(Some(raw.to_string()))
        .ok_or_else(|| Error::InvalidInput("endpoint must not be empty".to_string()))?;
    if is_http_url(&endpoint) {
        Ok(endpoint.trim_end_matches('/').to_string())
    } else {
        Err(Error::InvalidInput(
            "endpoint must include http:// or https://".to_string(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn normalize_endpoint_rejects_invalid_values() {
        assert!(normalize_endpoint("").is_err());
        assert!(normalize_endpoint("   ").is_err());
        assert!(normalize_endpoint("script.google.com/exec").is_err());
    }

    #[test]
    fn normalize_endpoint_trims_and_strips_trailing_slash() {
        assert_eq!(
            normalize_endpoint("  https://script.google.com/macros/s/abc/exec/ ").unwrap(),
            "https://script.google.com/macros/s/abc/exec"
        );
    }

    #[test]
    fn debug_redacts_endpoint() {
        let config = SyncConfig::for_endpoint("https://script.google.com/macros/s/secret/exec")
            .unwrap();
        let debug = format!("{config:?}");
        assert!(!debug.contains("secret"));
        assert!(debug.contains("[REDACTED]"));
    }

    #[test]
    fn with_endpoint_ignores_blank_override() {
        let config = SyncConfig::for_endpoint("https://a.example/exec").unwrap();
        let config = config.with_endpoint(Some("  ")).unwrap();
        assert_eq!(config.endpoint_url.as_deref(), Some("https://a.example/exec"));

        let config = config.with_endpoint(Some("https://b.example/exec")).unwrap();
        assert_eq!(config.endpoint_url.as_deref(), Some("https://b.example/exec"));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn load_defaults_to_unconfigured() {
        let db = DatabaseService::open_in_memory().await.unwrap();
        let config = SyncConfig::load(&db).await.unwrap();

        assert!(!config.is_configured());
        assert_eq!(config.last_sync_at, None);
        assert_eq!(config.required_version, REQUIRED_REMOTE_VERSION);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn save_and_load_roundtrip() {
        let db = DatabaseService::open_in_memory().await.unwrap();
        let config = SyncConfig {
            last_sync_at: Some("2026-02-18T00:00:00.000Z".to_string()),
            ..SyncConfig::for_endpoint("https://script.google.com/macros/s/abc/exec").unwrap()
        };

        config.save(&db).await.unwrap();
        let loaded = SyncConfig::load(&db).await.unwrap();
        assert_eq!(loaded.endpoint_url, config.endpoint_url);
        assert_eq!(loaded.last_sync_at, config.last_sync_at);

        SyncConfig::default().save(&db).await.unwrap();
        assert!(!SyncConfig::load(&db).await.unwrap().is_configured());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn load_ignores_malformed_stored_endpoint() {
        let db = DatabaseService::open_in_memory().await.unwrap();
        db.set_setting(KEY_ENDPOINT_URL, "not a url").await.unwrap();

        let config = SyncConfig::load(&db).await.unwrap();
        assert!(!config.is_configured());
    }
}
