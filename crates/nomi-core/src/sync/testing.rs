//! In-memory stand-in for the remote script.

use std::collections::BTreeMap;
use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde_json::{json, Map, Value};

use super::client::SyncTransport;
use super::error::{SyncError, SyncResult};
use super::protocol::REQUIRED_REMOTE_VERSION;

/// Failure injected into the next request.
#[derive(Debug, Clone)]
pub enum Failure {
    Status(u16),
    Remote(String),
}

#[derive(Debug)]
struct RemoteState {
    version: String,
    records: BTreeMap<String, Value>,
    settings: Map<String, Value>,
    requests: Vec<Value>,
    failures: Vec<Failure>,
    report_saved_ids: Option<Vec<String>>,
    latency: Duration,
}

/// A shared fake remote. Clones talk to the same sheet, so two engines built
/// on clones behave like two devices.
#[derive(Debug, Clone)]
pub struct MemoryRemote {
    state: Arc<Mutex<RemoteState>>,
}

impl Default for MemoryRemote {
    fn default() -> Self {
        Self {
            state: Arc::new(Mutex::new(RemoteState {
                version: format!("{REQUIRED_REMOTE_VERSION}-final"),
                records: BTreeMap::new(),
                settings: Map::new(),
                requests: Vec::new(),
                failures: Vec::new(),
                report_saved_ids: None,
                latency: Duration::ZERO,
            })),
        }
    }
}

impl MemoryRemote {
    pub fn set_version(&self, version: &str) {
        self.state.lock().unwrap().version = version.to_string();
    }

    pub fn fail_next(&self, failure: Failure) {
        self.state.lock().unwrap().failures.push(failure);
    }

    pub fn set_latency(&self, latency: Duration) {
        self.state.lock().unwrap().latency = latency;
    }

    /// Make the next saves report only these ids as written.
    pub fn report_saved_ids(&self, ids: &[&str]) {
        self.state.lock().unwrap().report_saved_ids =
            Some(ids.iter().map(ToString::to_string).collect());
    }

    pub fn insert_record(&self, record: Value) {
        let id = record["id"].as_str().unwrap().to_string();
        self.state.lock().unwrap().records.insert(id, record);
    }

    pub fn record(&self, id: &str) -> Option<Value> {
        self.state.lock().unwrap().records.get(id).cloned()
    }

    pub fn insert_setting(&self, key: &str, value: Value) {
        self.state
            .lock()
            .unwrap()
            .settings
            .insert(key.to_string(), value);
    }

    pub fn settings(&self) -> Map<String, Value> {
        self.state.lock().unwrap().settings.clone()
    }

    /// Every request body received so far, decoded.
    pub fn requests(&self) -> Vec<Value> {
        self.state.lock().unwrap().requests.clone()
    }

    fn handle(&self, body: &str) -> SyncResult<String> {
        let request: Value = serde_json::from_str(body).unwrap();
        let mut state = self.state.lock().unwrap();
        state.requests.push(request.clone());

        if !state.failures.is_empty() {
            return match state.failures.remove(0) {
                Failure::Status(status) => Err(SyncError::Status {
                    status,
                    body: "injected".to_string(),
                }),
                Failure::Remote(message) => Ok(json!({
                    "ok": false,
                    "version": state.version,
                    "error": message
                })
                .to_string()),
            };
        }

        let data = match (request["type"].as_str(), request["action"].as_str()) {
            (Some("records"), Some("save")) => {
                let mut updated = 0;
                for record in request["records"].as_array().unwrap() {
                    let id = record["id"].as_str().unwrap().to_string();
                    let newer = state.records.get(&id).is_none_or(|stored| {
                        record["updatedAt"].as_str() > stored["updatedAt"].as_str()
                    });
                    if newer {
                        state.records.insert(id, record.clone());
                        updated += 1;
                    }
                }
                match state.report_saved_ids.clone() {
                    Some(ids) => json!({"updated": ids.len(), "savedIds": ids}),
                    None => json!({"updated": updated}),
                }
            }
            (Some("records"), Some("get")) => {
                let since = request["since"].as_str();
                let records = state
                    .records
                    .values()
                    .filter(|record| {
                        since.is_none_or(|since| record["updatedAt"].as_str() >= Some(since))
                    })
                    .cloned()
                    .collect::<Vec<_>>();
                json!({"records": records})
            }
            (Some("settings"), Some("save")) => {
                let incoming = request["settings"].as_object().cloned().unwrap_or_default();
                let updated = incoming.len();
                state.settings.extend(incoming);
                json!({"updated": updated})
            }
            (Some("settings"), Some("get")) => json!({"settings": state.settings}),
            _ => {
                return Ok(json!({
                    "ok": false,
                    "version": state.version,
                    "error": "unknown request"
                })
                .to_string())
            }
        };

        Ok(json!({"ok": true, "version": state.version, "data": data}).to_string())
    }
}

impl SyncTransport for MemoryRemote {
    fn send(&self, body: String) -> impl Future<Output = SyncResult<String>> + Send {
        async move {
            let latency = self.state.lock().unwrap().latency;
            if !latency.is_zero() {
                tokio::time::sleep(latency).await;
            }
            self.handle(&body)
        }
    }
}
