//! Alert/escalation processing: classify inbound events from the alert
//! channel, keep a bounded recent buffer plus an unseen counter, and emit
//! notifications for the UI surface to present.
//!
//! The channel itself is a [`StreamClient`] over a fixed candidate address
//! list; a periodic connection check backs up the client's own reconnect
//! path in case a close was never observed.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde_json::Value;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::store::{AlertSnapshot, Store};
use crate::stream::{ConnState, StreamClient, StreamConfig, StreamEvent};
use crate::types::Alert;

/// Candidate alert feed addresses, tried round-robin on reconnect.
pub const DEFAULT_ALERT_URLS: &[&str] = &["ws://localhost:3890/ws"];

/// Event categories that notify regardless of severity.
pub const IMPORTANT_TYPES: &[&str] = &["person", "audio_loud", "audio_spike", "loiter"];

/// The recent buffer keeps this many alerts, newest first.
pub const RECENT_CAP: usize = 50;

const KEEPALIVE: Duration = Duration::from_secs(60);

/// A user-facing notification request; the UI surface decides presentation.
#[derive(Debug, Clone)]
pub struct Notification {
    pub title: String,
    pub body: String,
    pub priority: u8,
    /// Blocking: requires an explicit dismiss.
    pub require_interaction: bool,
}

#[derive(Debug, Clone, Default)]
pub struct AlertState {
    pub recent: VecDeque<Alert>,
    pub unseen: u32,
}

/// Badge label for the unseen counter; `None` when there is nothing unseen.
pub fn badge_text(unseen: u32) -> Option<String> {
    match unseen {
        0 => None,
        n if n > 99 => Some("99+".into()),
        n => Some(n.to_string()),
    }
}

/// Whether the badge should render in its escalated style.
pub fn badge_hot(unseen: u32) -> bool {
    unseen > 5
}

fn str_field(value: &Value, keys: &[&str]) -> Option<String> {
    keys.iter()
        .find_map(|k| value.get(*k).and_then(Value::as_str))
        .map(str::to_owned)
}

/// Fold one inbound message into the state. Returns the notifications it
/// produced, or `None` when the message kind is not an alert at all (no
/// state change, nothing to persist).
pub fn apply_event(
    state: &mut AlertState,
    msg: &Value,
    now: DateTime<Utc>,
) -> Option<Vec<Notification>> {
    match msg.get("type").and_then(Value::as_str) {
        Some("event") | Some("rule_triggered") => {
            Some(record_alert(state, msg, now).into_iter().collect())
        }
        Some("escalation") => {
            let mut out = Vec::new();
            let level = msg
                .get("level")
                .and_then(Value::as_u64)
                .or_else(|| msg.get("escalationLevel").and_then(Value::as_u64))
                .unwrap_or(0) as u32;
            if level >= 2 {
                let rule = str_field(msg, &["ruleName", "rule"])
                    .unwrap_or_else(|| "Unknown Rule".into());
                out.push(Notification {
                    title: format!("ESCALATION Level {level}"),
                    body: format!("{rule} — activity is escalating"),
                    priority: 2,
                    require_interaction: true,
                });
            }
            out.extend(record_alert(state, msg, now));
            Some(out)
        }
        _ => None,
    }
}

/// Unconditionally record the alert and bump the badge; maybe notify.
fn record_alert(state: &mut AlertState, msg: &Value, now: DateTime<Utc>) -> Option<Notification> {
    let event = msg.get("event").or_else(|| msg.get("data")).unwrap_or(msg);
    let rule = str_field(msg, &["ruleName", "rule"]).unwrap_or_default();
    let camera = str_field(event, &["cameraName", "camera"]).unwrap_or_else(|| "Unknown".into());
    let kind = event
        .get("type")
        .and_then(Value::as_str)
        .unwrap_or("alert")
        .to_string();
    let level = msg
        .get("escalationLevel")
        .and_then(Value::as_u64)
        .unwrap_or(0) as u32;
    let id = match event.get("id") {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        _ => now.timestamp_millis().to_string(),
    };
    let message = msg
        .get("message")
        .and_then(Value::as_str)
        .map(str::to_owned)
        .unwrap_or_else(|| format!("{kind} at {camera}"));

    state.recent.push_front(Alert {
        id,
        timestamp: now,
        camera: camera.clone(),
        kind: kind.clone(),
        rule: rule.clone(),
        level,
        message,
    });
    state.recent.truncate(RECENT_CAP);
    state.unseen = state.unseen.saturating_add(1);

    if level >= 1 || IMPORTANT_TYPES.contains(&kind.as_str()) {
        Some(Notification {
            title: if rule.is_empty() { "Alert".into() } else { rule },
            body: format!("{} detected at {camera}", kind.to_uppercase()),
            priority: if level >= 2 { 2 } else { 1 },
            require_interaction: level >= 2,
        })
    } else {
        None
    }
}

/// Owns the alert channel, the recent buffer, and the unseen badge.
pub struct AlertProcessor {
    state: Arc<Mutex<AlertState>>,
    client: StreamClient,
    store: Store,
    notifications: mpsc::UnboundedSender<Notification>,
    tasks: Vec<JoinHandle<()>>,
}

impl AlertProcessor {
    pub fn new(
        urls: Vec<String>,
        store: Store,
        notifications: mpsc::UnboundedSender<Notification>,
    ) -> Self {
        let snapshot = store.load_alerts();
        let state = AlertState {
            recent: snapshot.recent_alerts.into(),
            unseen: snapshot.alert_count,
        };
        Self {
            state: Arc::new(Mutex::new(state)),
            client: StreamClient::new(StreamConfig::new(urls)),
            store,
            notifications,
            tasks: Vec::new(),
        }
    }

    /// Connect the channel and start the consumer + keepalive tasks.
    pub fn run(&mut self) {
        let mut events = self.client.subscribe();
        self.client.connect();
        let state = Arc::clone(&self.state);
        let store = self.store.clone();
        let notifications = self.notifications.clone();
        self.tasks.push(tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(StreamEvent::Message(msg)) => {
                        let produced = {
                            let mut st = state.lock().unwrap();
                            apply_event(&mut st, &msg, Utc::now())
                        };
                        if let Some(produced) = produced {
                            persist(&store, &state);
                            for n in produced {
                                let _ = notifications.send(n);
                            }
                        }
                    }
                    Ok(StreamEvent::Connection(_)) => {}
                    Err(tokio::sync::broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "alert feed lagged, events dropped");
                    }
                    Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
                }
            }
        }));

        // Redundant recovery path: the socket's own close handler drives
        // reconnects, this timer catches the case where it never fired.
        let client = self.client.clone();
        self.tasks.push(tokio::spawn(async move {
            let mut tick = tokio::time::interval(KEEPALIVE);
            tick.tick().await;
            loop {
                tick.tick().await;
                if !client.is_connected() {
                    client.connect();
                }
            }
        }));
    }

    pub fn snapshot(&self) -> AlertState {
        self.state.lock().unwrap().clone()
    }

    pub fn unseen(&self) -> u32 {
        self.state.lock().unwrap().unseen
    }

    /// Explicit acknowledgment: the only path that clears the badge.
    pub fn acknowledge(&self) {
        self.state.lock().unwrap().unseen = 0;
        persist(&self.store, &self.state);
    }

    pub fn connection(&self) -> ConnState {
        self.client.state()
    }

    pub fn shutdown(&mut self) {
        self.client.disconnect();
        for task in self.tasks.drain(..) {
            task.abort();
        }
    }
}

fn persist(store: &Store, state: &Arc<Mutex<AlertState>>) {
    let snapshot = {
        let st = state.lock().unwrap();
        AlertSnapshot {
            recent_alerts: st.recent.iter().cloned().collect(),
            alert_count: st.unseen,
        }
    };
    if let Err(err) = store.save_alerts(&snapshot) {
        tracing::warn!(%err, "failed to persist alert state");
    }
}
