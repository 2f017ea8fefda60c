//! Per-panel runtime lifecycles: polling loops, stream feeds, and action
//! queues, keyed by `(app id, panel id)`.
//!
//! The manager is the only owner of panel timers and sockets. Starting a key
//! that already exists tears the previous lifecycle down first, and
//! `destroy` releases everything unconditionally. Each lifecycle writes a
//! render-ready [`PanelView`] into shared state for the UI to draw.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, Local, TimeZone, Utc};
use serde_json::Value;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;

use crate::registry::{extract_path, Registry};
use crate::stream::{ConnState, StreamClient, StreamConfig, StreamEvent};
use crate::types::{AppEntry, ColorSpec, FieldSpec, Panel, PanelKind};

pub type PanelKey = (String, String);

const DEFAULT_MAX_ITEMS: usize = 20;
const DONE_REVERT: Duration = Duration::from_millis(1500);
const FAIL_REVERT: Duration = Duration::from_millis(2000);

/// Transient status line for the UI surface (action results and the like).
#[derive(Debug, Clone)]
pub struct Toast {
    pub text: String,
    pub error: bool,
}

#[derive(Debug, Clone)]
pub struct StatusCell {
    pub text: String,
    pub color: Option<String>,
}

#[derive(Debug, Clone)]
pub struct StatCard {
    pub label: String,
    pub value: String,
    pub color: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ButtonState {
    Idle,
    /// Armed by the first press of a confirm-gated action.
    Confirming,
    Sending,
    Done,
    Failed,
}

#[derive(Debug, Clone)]
pub struct ButtonView {
    pub label: String,
    pub color: Option<String>,
    pub state: ButtonState,
}

#[derive(Debug, Clone)]
pub struct StreamSpan {
    pub text: String,
    pub color: Option<String>,
    pub is_time: bool,
}

#[derive(Debug, Clone)]
pub struct StreamItem {
    pub spans: Vec<StreamSpan>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Video,
    Still,
}

/// Render-ready state for one panel, written by its lifecycle task.
#[derive(Debug, Clone)]
pub enum PanelView {
    Status {
        fields: Vec<FieldSpec>,
        rows: Vec<Vec<StatusCell>>,
        loaded: bool,
    },
    Stats {
        cards: Vec<StatCard>,
    },
    Controls {
        buttons: Vec<ButtonView>,
    },
    Iframe {
        url: String,
        size: String,
    },
    Stream {
        items: VecDeque<StreamItem>,
        connected: bool,
    },
    Camera {
        url: String,
        media: MediaKind,
        size: String,
    },
    Unknown {
        kind: String,
    },
    Empty {
        message: String,
    },
}

struct Lifecycle {
    task: Option<JoinHandle<()>>,
    stream: Option<StreamClient>,
    actions: Option<mpsc::UnboundedSender<usize>>,
}

impl Lifecycle {
    fn empty() -> Self {
        Self {
            task: None,
            stream: None,
            actions: None,
        }
    }

    fn shutdown(self) {
        if let Some(task) = &self.task {
            task.abort();
        }
        if let Some(stream) = &self.stream {
            stream.disconnect();
        }
    }
}

#[derive(Clone)]
struct ViewSlot {
    key: PanelKey,
    views: Arc<Mutex<HashMap<PanelKey, PanelView>>>,
}

impl ViewSlot {
    fn put(&self, view: PanelView) {
        self.views.lock().unwrap().insert(self.key.clone(), view);
    }

    fn update(&self, f: impl FnOnce(&mut PanelView)) {
        if let Some(view) = self.views.lock().unwrap().get_mut(&self.key) {
            f(view);
        }
    }
}

/// Owns every panel lifecycle. Exactly one lifecycle per key at any time.
pub struct PanelManager {
    registry: Arc<Registry>,
    toasts: mpsc::UnboundedSender<Toast>,
    lifecycles: HashMap<PanelKey, Lifecycle>,
    views: Arc<Mutex<HashMap<PanelKey, PanelView>>>,
}

impl PanelManager {
    pub fn new(registry: Arc<Registry>, toasts: mpsc::UnboundedSender<Toast>) -> Self {
        Self {
            registry,
            toasts,
            lifecycles: HashMap::new(),
            views: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn view(&self, key: &PanelKey) -> Option<PanelView> {
        self.views.lock().unwrap().get(key).cloned()
    }

    /// Live lifecycles (timers and/or sockets still owned).
    pub fn active_count(&self) -> usize {
        self.lifecycles.len()
    }

    /// Lifecycles currently holding a socket.
    pub fn active_streams(&self) -> usize {
        self.lifecycles
            .values()
            .filter(|lc| lc.stream.is_some())
            .count()
    }

    /// Start (or restart) the lifecycle for one panel. A previous holder of
    /// the same key is torn down before anything new is created.
    pub fn start(&mut self, app: &AppEntry, panel: &Panel) {
        let key: PanelKey = (app.id.clone(), panel.id.clone());
        self.stop(&key);
        let slot = ViewSlot {
            key: key.clone(),
            views: Arc::clone(&self.views),
        };
        let lifecycle = match panel.kind {
            PanelKind::Status | PanelKind::Stats => self.start_poller(app, panel, slot),
            PanelKind::Controls => self.start_controls(app, panel, slot),
            PanelKind::Stream => start_stream(panel, slot),
            PanelKind::Iframe => {
                slot.put(iframe_view(app, panel));
                Lifecycle::empty()
            }
            PanelKind::Camera => {
                slot.put(camera_view(panel));
                Lifecycle::empty()
            }
            PanelKind::Unknown => {
                slot.put(PanelView::Unknown {
                    kind: "unknown".into(),
                });
                Lifecycle::empty()
            }
        };
        self.lifecycles.insert(key, lifecycle);
    }

    /// Cancel one lifecycle: abort its task, close its socket, drop its view.
    pub fn stop(&mut self, key: &PanelKey) {
        if let Some(lifecycle) = self.lifecycles.remove(key) {
            lifecycle.shutdown();
        }
        self.views.lock().unwrap().remove(key);
    }

    /// Release every timer and socket. Safe to call repeatedly.
    pub fn destroy(&mut self) {
        for (_, lifecycle) in self.lifecycles.drain() {
            lifecycle.shutdown();
        }
        self.views.lock().unwrap().clear();
    }

    /// Queue the panel's nth action. Confirm-gated actions arm on the first
    /// trigger and fire on the second.
    pub fn trigger_action(&self, key: &PanelKey, index: usize) {
        if let Some(tx) = self.lifecycles.get(key).and_then(|lc| lc.actions.as_ref()) {
            let _ = tx.send(index);
        }
    }

    fn start_poller(&self, app: &AppEntry, panel: &Panel, slot: ViewSlot) -> Lifecycle {
        slot.put(match panel.kind {
            PanelKind::Stats => build_stats_view(panel, &Value::Null),
            _ => PanelView::Status {
                fields: panel.fields.clone(),
                rows: Vec::new(),
                loaded: false,
            },
        });
        let registry = Arc::clone(&self.registry);
        let app = app.clone();
        let panel = panel.clone();
        let task = tokio::spawn(async move {
            loop {
                match registry.fetch_panel_data(&app, &panel).await {
                    Ok(data) => {
                        let view = match panel.kind {
                            PanelKind::Stats => build_stats_view(&panel, &data),
                            _ => build_status_view(&panel, &data),
                        };
                        slot.put(view);
                    }
                    // Keep the last rendered rows on a failed refresh.
                    Err(err) => tracing::warn!(
                        app = %app.id,
                        panel = %panel.id,
                        %err,
                        "panel data fetch failed"
                    ),
                }
                match panel.refresh_ms {
                    Some(ms) if ms > 0 => tokio::time::sleep(Duration::from_millis(ms)).await,
                    // No refresh interval declared: fetch exactly once.
                    _ => break,
                }
            }
        });
        Lifecycle {
            task: Some(task),
            stream: None,
            actions: None,
        }
    }

    fn start_controls(&self, app: &AppEntry, panel: &Panel, slot: ViewSlot) -> Lifecycle {
        let buttons = panel
            .actions
            .iter()
            .map(|a| ButtonView {
                label: a.label.clone(),
                color: a.color.clone(),
                state: ButtonState::Idle,
            })
            .collect();
        slot.put(PanelView::Controls { buttons });

        let (tx, mut rx) = mpsc::unbounded_channel::<usize>();
        let registry = Arc::clone(&self.registry);
        let toasts = self.toasts.clone();
        let app = app.clone();
        let panel = panel.clone();
        let task = tokio::spawn(async move {
            let mut pending_confirm: Option<usize> = None;
            while let Some(ix) = rx.recv().await {
                let Some(action) = panel.actions.get(ix).cloned() else {
                    continue;
                };
                if action.confirm && pending_confirm != Some(ix) {
                    if let Some(prev) = pending_confirm.take() {
                        set_button(&slot, prev, ButtonState::Idle);
                    }
                    pending_confirm = Some(ix);
                    set_button(&slot, ix, ButtonState::Confirming);
                    continue;
                }
                pending_confirm = None;
                set_button(&slot, ix, ButtonState::Sending);
                match registry.execute_action(&app, &action).await {
                    Ok(_) => {
                        set_button(&slot, ix, ButtonState::Done);
                        let _ = toasts.send(Toast {
                            text: format!("{} — EXECUTED", action.label),
                            error: false,
                        });
                        tokio::time::sleep(DONE_REVERT).await;
                    }
                    Err(err) => {
                        set_button(&slot, ix, ButtonState::Failed);
                        let _ = toasts.send(Toast {
                            text: format!("{} FAILED: {err}", action.label),
                            error: true,
                        });
                        tokio::time::sleep(FAIL_REVERT).await;
                    }
                }
                set_button(&slot, ix, ButtonState::Idle);
            }
        });
        Lifecycle {
            task: Some(task),
            stream: None,
            actions: Some(tx),
        }
    }
}

fn set_button(slot: &ViewSlot, index: usize, state: ButtonState) {
    slot.update(|view| {
        if let PanelView::Controls { buttons } = view {
            if let Some(b) = buttons.get_mut(index) {
                b.state = state;
            }
        }
    });
}

fn start_stream(panel: &Panel, slot: ViewSlot) -> Lifecycle {
    let Some(ws_url) = panel.ws_url.clone() else {
        slot.put(PanelView::Empty {
            message: "NO WEBSOCKET URL".into(),
        });
        return Lifecycle::empty();
    };
    slot.put(PanelView::Stream {
        items: VecDeque::new(),
        connected: false,
    });

    let client = StreamClient::new(StreamConfig::single(ws_url));
    let mut events = client.subscribe();
    client.connect();
    let fields = panel.fields.clone();
    let max_items = panel.max_items.unwrap_or(DEFAULT_MAX_ITEMS);
    let task = tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(StreamEvent::Message(value)) => {
                    let item = format_stream_item(&fields, &value);
                    slot.update(|view| {
                        if let PanelView::Stream { items, .. } = view {
                            items.push_front(item);
                            items.truncate(max_items);
                        }
                    });
                }
                Ok(StreamEvent::Connection(state)) => {
                    let up = state == ConnState::Connected;
                    slot.update(|view| {
                        if let PanelView::Stream { connected, .. } = view {
                            *connected = up;
                        }
                    });
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::debug!(skipped, "stream feed lagged");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    });
    Lifecycle {
        task: Some(task),
        stream: Some(client),
        actions: None,
    }
}

fn iframe_view(app: &AppEntry, panel: &Panel) -> PanelView {
    let raw = panel.url.clone().unwrap_or_default();
    let url = if raw.starts_with("http") {
        raw
    } else {
        format!("{}{}", app.base_url, raw)
    };
    PanelView::Iframe {
        url,
        size: panel.size.clone().unwrap_or_else(|| "medium".into()),
    }
}

fn camera_view(panel: &Panel) -> PanelView {
    let url = panel.stream_url.clone().unwrap_or_default();
    PanelView::Camera {
        media: media_kind(&url),
        url,
        size: panel.size.clone().unwrap_or_else(|| "medium".into()),
    }
}

fn media_kind(url: &str) -> MediaKind {
    if url.contains(".mp4") || url.contains("stream") {
        MediaKind::Video
    } else {
        MediaKind::Still
    }
}

/// Normalize a panel-data response into a row list: a raw array, an array
/// under `data`/`items`/`results`, a wrapped single value, or the object
/// itself as one row.
pub fn normalize_rows(data: &Value) -> Vec<Value> {
    if let Some(arr) = data.as_array() {
        return arr.clone();
    }
    for key in ["data", "items", "results"] {
        match data.get(key) {
            Some(Value::Array(arr)) => return arr.clone(),
            Some(Value::Null) | None => {}
            Some(other) => return vec![other.clone()],
        }
    }
    if data.is_null() {
        return Vec::new();
    }
    vec![data.clone()]
}

fn display_value(v: Option<&Value>) -> String {
    match v {
        None | Some(Value::Null) => "—".into(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

fn build_status_view(panel: &Panel, data: &Value) -> PanelView {
    let rows = normalize_rows(data)
        .iter()
        .map(|row| {
            panel
                .fields
                .iter()
                .map(|f| {
                    let val = extract_path(row, &f.key);
                    StatusCell {
                        text: display_value(val),
                        color: status_color(f, val),
                    }
                })
                .collect()
        })
        .collect();
    PanelView::Status {
        fields: panel.fields.clone(),
        rows,
        loaded: true,
    }
}

fn status_color(field: &FieldSpec, val: Option<&Value>) -> Option<String> {
    match &field.color {
        Some(ColorSpec::Map(map)) => {
            let key = display_value(val).to_lowercase();
            map.get(&key).cloned()
        }
        Some(ColorSpec::Name(name)) => Some(name.clone()),
        None => None,
    }
}

fn build_stats_view(panel: &Panel, data: &Value) -> PanelView {
    let cards = panel
        .metrics
        .iter()
        .map(|m| {
            let text = display_value(extract_path(data, &m.key));
            StatCard {
                label: m.label.clone(),
                value: format!(
                    "{}{}{}",
                    m.prefix.as_deref().unwrap_or_default(),
                    text,
                    m.suffix.as_deref().unwrap_or_default()
                ),
                color: m.color.clone(),
            }
        })
        .collect();
    PanelView::Stats { cards }
}

fn format_stream_item(fields: &[FieldSpec], data: &Value) -> StreamItem {
    let spans = fields
        .iter()
        .map(|f| {
            let val = extract_path(data, &f.key);
            if f.format.as_deref() == Some("time") {
                if let Some(clock) = val.and_then(format_clock) {
                    return StreamSpan {
                        text: clock,
                        color: None,
                        is_time: true,
                    };
                }
            }
            let text = match val {
                None | Some(Value::Null) => String::new(),
                Some(Value::String(s)) => s.clone(),
                Some(other) => other.to_string(),
            };
            let color = match &f.color {
                Some(ColorSpec::Name(name)) => Some(name.clone()),
                _ => None,
            };
            StreamSpan {
                text,
                color,
                is_time: false,
            }
        })
        .collect();
    StreamItem { spans }
}

fn format_clock(v: &Value) -> Option<String> {
    let utc: DateTime<Utc> = match v {
        Value::String(s) => DateTime::parse_from_rfc3339(s).ok()?.with_timezone(&Utc),
        Value::Number(n) => Utc.timestamp_millis_opt(n.as_i64()?).single()?,
        _ => return None,
    };
    Some(utc.with_timezone(&Local).format("%H:%M:%S").to_string())
}
