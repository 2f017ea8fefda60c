//! Demo panel registry: serves a sample manifest, panel data endpoints, and
//! the two live channels (`/ws/panels` pushes, `/ws/alerts` synthetic
//! events). Used by `paneldeck --demo` and for hand testing.

mod demo;

use std::{
    net::SocketAddr,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
    time::{Duration, Instant},
};

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde_json::json;

#[derive(Clone)]
struct AppState {
    port: u16,
    started: Instant,
    pings: Arc<AtomicU64>,
    resets: Arc<AtomicU64>,
    events: Arc<AtomicU64>,
}

fn parse_port<I: IntoIterator<Item = String>>(args: I, default_port: u16) -> u16 {
    let mut it = args.into_iter();
    let _ = it.next(); // program name
    let mut long: Option<String> = None;
    let mut short: Option<String> = None;
    while let Some(a) = it.next() {
        match a.as_str() {
            "--port" => long = it.next(),
            "-p" => short = it.next(),
            _ if a.starts_with("--port=") => {
                if let Some((_, v)) = a.split_once('=') {
                    long = Some(v.to_string());
                }
            }
            _ => {}
        }
    }
    long.or(short)
        .and_then(|s| s.parse::<u16>().ok())
        .unwrap_or(default_port)
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let port = parse_port(std::env::args(), 3210);
    let state = AppState {
        port,
        started: Instant::now(),
        pings: Arc::new(AtomicU64::new(0)),
        resets: Arc::new(AtomicU64::new(0)),
        events: Arc::new(AtomicU64::new(0)),
    };

    let app = Router::new()
        .route("/api/panels", get(manifest))
        .route("/_panel", get(|| async { "ok" }))
        .route("/demo/status", get(demo_status))
        .route("/demo/stats", get(demo_stats))
        .route("/demo/ping", post(demo_ping))
        .route("/demo/reset", post(demo_reset))
        .route("/ws/panels", get(panels_ws))
        .route("/ws/events", get(events_ws))
        .route("/ws/alerts", get(alerts_ws))
        .with_state(state);

    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    println!("Demo panel registry running at http://{}", addr);
    tracing::info!(%addr, "demo registry listening");

    let listener = tokio::net::TcpListener::bind(addr).await.unwrap();
    axum::serve(listener, app).await.unwrap();
}

async fn manifest(State(state): State<AppState>) -> impl IntoResponse {
    Json(demo::manifest(state.port))
}

async fn demo_status(State(state): State<AppState>) -> impl IntoResponse {
    Json(demo::status_rows(state.started.elapsed().as_secs()))
}

async fn demo_stats(State(state): State<AppState>) -> impl IntoResponse {
    Json(json!({
        "uptime_s": state.started.elapsed().as_secs(),
        "pings": state.pings.load(Ordering::Relaxed),
        "events": state.events.load(Ordering::Relaxed),
    }))
}

async fn demo_ping(State(state): State<AppState>) -> impl IntoResponse {
    let n = state.pings.fetch_add(1, Ordering::Relaxed) + 1;
    Json(json!({"ok": true, "pings": n}))
}

async fn demo_reset(State(state): State<AppState>) -> impl IntoResponse {
    state.pings.store(0, Ordering::Relaxed);
    state.events.store(0, Ordering::Relaxed);
    let n = state.resets.fetch_add(1, Ordering::Relaxed) + 1;
    Json(json!({"ok": true, "resets": n}))
}

async fn panels_ws(ws: WebSocketUpgrade) -> impl IntoResponse {
    ws.on_upgrade(handle_panels_socket)
}

// Periodic manifest pushes; the client re-fetches on each one.
async fn handle_panels_socket(mut socket: WebSocket) {
    let mut tick = tokio::time::interval(Duration::from_secs(10));
    tick.tick().await;
    loop {
        tokio::select! {
            _ = tick.tick() => {
                let msg = json!({"type": "panel.update"}).to_string();
                if socket.send(Message::Text(msg)).await.is_err() {
                    break;
                }
            }
            frame = socket.recv() => match frame {
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                _ => {}
            }
        }
    }
}

async fn events_ws(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_events_socket(socket, state))
}

async fn handle_events_socket(mut socket: WebSocket, state: AppState) {
    let mut tick = tokio::time::interval(Duration::from_secs(4));
    loop {
        tokio::select! {
            _ = tick.tick() => {
                let n = state.events.fetch_add(1, Ordering::Relaxed);
                let msg = demo::feed_event(n).to_string();
                if socket.send(Message::Text(msg)).await.is_err() {
                    break;
                }
            }
            frame = socket.recv() => match frame {
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                _ => {}
            }
        }
    }
}

async fn alerts_ws(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_alerts_socket(socket, state))
}

async fn handle_alerts_socket(mut socket: WebSocket, state: AppState) {
    let mut tick = tokio::time::interval(Duration::from_secs(7));
    tick.tick().await;
    loop {
        tokio::select! {
            _ = tick.tick() => {
                let n = state.events.fetch_add(1, Ordering::Relaxed);
                let msg = demo::alert_event(n).to_string();
                if socket.send(Message::Text(msg)).await.is_err() {
                    break;
                }
            }
            frame = socket.recv() => match frame {
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                _ => {}
            }
        }
    }
}
