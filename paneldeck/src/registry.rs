//! Registry client: fetch and cache panel manifests, probe app health, and
//! run the thin HTTP calls panels make against their app.
//!
//! Every public operation degrades instead of failing: a bad fetch returns
//! the best list available (live, then cached), and probes fold transport
//! errors into a health status.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures::future::join_all;
use reqwest::{header, Method, StatusCode};
use serde_json::Value;
use thiserror::Error;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use url::Url;

use crate::store::{CacheSnapshot, Store};
use crate::types::{ActionSpec, AppEntry, AppHealth, HealthStatus, Manifest, Panel};

pub const DEFAULT_REGISTRY: &str = "http://localhost:3210";

/// Per-attempt bound on health probes.
const PROBE_TIMEOUT: Duration = Duration::from_secs(3);

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("endpoint returned {0}")]
    Status(StatusCode),
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
}

pub struct Registry {
    base_url: String,
    http: reqwest::Client,
    store: Store,
    // Holds the current app list; subscribers watch it for change
    // notification and drop the receiver to unsubscribe.
    apps: watch::Sender<Vec<AppEntry>>,
    poll_task: Mutex<Option<JoinHandle<()>>>,
}

impl Registry {
    pub fn new(base_url: impl Into<String>, store: Store) -> Self {
        let base_url = base_url.into();
        let base_url = base_url.trim_end_matches('/').to_string();
        let (apps, _) = watch::channel(Vec::new());
        Self {
            base_url,
            http: reqwest::Client::new(),
            store,
            apps,
            poll_task: Mutex::new(None),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Current app list (last successful fetch, or cache fallback).
    pub fn apps(&self) -> Vec<AppEntry> {
        self.apps.borrow().clone()
    }

    /// Watch the app list; the value changes on every successful fetch.
    pub fn subscribe(&self) -> watch::Receiver<Vec<AppEntry>> {
        self.apps.subscribe()
    }

    /// Fetch the manifest. On success the in-memory list is replaced
    /// atomically, the cache snapshot is overwritten, and watchers are
    /// notified. On failure the existing list stands, falling back to the
    /// cached snapshot only when the list is empty. Never errors to the
    /// caller: always returns the best available list.
    pub async fn fetch(&self) -> Vec<AppEntry> {
        match self.try_fetch().await {
            Ok(apps) => {
                let snapshot = CacheSnapshot {
                    apps: apps.clone(),
                    fetched_at: chrono::Utc::now(),
                };
                if let Err(err) = self.store.save_cache(&snapshot) {
                    tracing::warn!(%err, "failed to persist manifest cache");
                }
                self.apps.send_replace(apps.clone());
                apps
            }
            Err(err) => {
                tracing::warn!(%err, registry = %self.base_url, "manifest fetch failed");
                if self.apps.borrow().is_empty() {
                    if let Some(cached) = self.store.load_cache() {
                        tracing::info!(
                            fetched_at = %cached.fetched_at,
                            "using cached manifest snapshot"
                        );
                        self.apps.send_replace(cached.apps);
                    }
                }
                self.apps()
            }
        }
    }

    async fn try_fetch(&self) -> Result<Vec<AppEntry>, RegistryError> {
        let resp = self
            .http
            .get(format!("{}/api/panels", self.base_url))
            .header(header::ACCEPT, "application/json")
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(RegistryError::Status(resp.status()));
        }
        let manifest: Manifest = resp.json().await?;
        Ok(rewrite_local_hosts(manifest.apps, &self.base_url))
    }

    /// Drive repeated `fetch` on a fixed interval. A no-op when already
    /// polling.
    pub fn start_polling(self: &Arc<Self>, interval: Duration) {
        let mut guard = self.poll_task.lock().unwrap();
        if guard.is_some() {
            return;
        }
        let registry = Arc::clone(self);
        *guard = Some(tokio::spawn(async move {
            loop {
                registry.fetch().await;
                tokio::time::sleep(interval).await;
            }
        }));
    }

    /// Idempotent; an already-scheduled poll never reschedules itself.
    pub fn stop_polling(&self) {
        if let Some(task) = self.poll_task.lock().unwrap().take() {
            task.abort();
        }
    }

    pub fn is_polling(&self) -> bool {
        self.poll_task.lock().unwrap().is_some()
    }

    async fn probe(&self, url: &str) -> Option<StatusCode> {
        self.http
            .get(url)
            .timeout(PROBE_TIMEOUT)
            .send()
            .await
            .ok()
            .map(|r| r.status())
    }

    /// Probe `{base}/_panel`, then the base URL if that did not succeed.
    /// Any response below 500 counts as online — reachability, not health;
    /// callers rely on that reading.
    pub async fn check_health(&self, app: &AppEntry) -> HealthStatus {
        let mut last = self.probe(&format!("{}/_panel", app.base_url)).await;
        if !matches!(last, Some(s) if s.is_success()) {
            if let Some(status) = self.probe(&app.base_url).await {
                last = Some(status);
            }
        }
        match last {
            Some(status) if status.as_u16() < 500 => HealthStatus::Online,
            Some(_) => HealthStatus::Error,
            None => HealthStatus::Offline,
        }
    }

    /// Probe every app concurrently; individual failures never fail the
    /// batch.
    pub async fn check_all_health(&self) -> Vec<AppHealth> {
        let apps = self.apps();
        let statuses = join_all(apps.iter().map(|app| self.check_health(app))).await;
        apps.into_iter()
            .zip(statuses)
            .map(|(app, status)| AppHealth {
                app_id: app.id,
                status,
            })
            .collect()
    }

    /// Execute a declared action against an app.
    pub async fn execute_action(
        &self,
        app: &AppEntry,
        action: &ActionSpec,
    ) -> Result<Value, RegistryError> {
        let url = format!("{}{}", app.base_url, action.endpoint);
        let method = match action.method.as_deref() {
            Some(m) => Method::from_bytes(m.to_ascii_uppercase().as_bytes())
                .unwrap_or(Method::POST),
            None => Method::POST,
        };
        let mut req = self
            .http
            .request(method.clone(), &url)
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(body) = &action.body {
            if method == Method::POST || method == Method::PUT {
                req = req.json(body);
            }
        }
        let resp = req.send().await?;
        if !resp.status().is_success() {
            return Err(RegistryError::Status(resp.status()));
        }
        Ok(resp.json().await?)
    }

    /// Fetch a status/stats endpoint, projecting through the panel's dotted
    /// data path when one is declared.
    pub async fn fetch_panel_data(
        &self,
        app: &AppEntry,
        panel: &Panel,
    ) -> Result<Value, RegistryError> {
        let endpoint = panel.endpoint.as_deref().unwrap_or_default();
        let resp = self
            .http
            .get(format!("{}{}", app.base_url, endpoint))
            .header(header::ACCEPT, "application/json")
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(RegistryError::Status(resp.status()));
        }
        let data: Value = resp.json().await?;
        match &panel.data_path {
            Some(path) => Ok(extract_path(&data, path).cloned().unwrap_or(Value::Null)),
            None => Ok(data),
        }
    }
}

/// Walk a dotted path into a JSON value; any missing segment yields `None`.
pub fn extract_path<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.').try_fold(value, |acc, key| acc.get(key))
}

/// When the registry is reached through a non-localhost host, substitute
/// that host into every localhost app base URL and panel stream URL.
/// Idempotent: a rewritten URL has no `localhost` left to replace.
pub fn rewrite_local_hosts(mut apps: Vec<AppEntry>, registry_base: &str) -> Vec<AppEntry> {
    if registry_base.contains("localhost") {
        return apps;
    }
    let Some(host) = Url::parse(registry_base)
        .ok()
        .and_then(|u| u.host_str().map(str::to_owned))
    else {
        return apps;
    };
    for app in &mut apps {
        if !app.base_url.contains("localhost") {
            continue;
        }
        app.base_url = app.base_url.replace("localhost", &host);
        for panel in &mut app.panels {
            if let Some(ws) = &panel.ws_url {
                if ws.contains("localhost") {
                    panel.ws_url = Some(ws.replace("localhost", &host));
                }
            }
        }
    }
    apps
}
