//! Panel lifecycle invariants: one lifecycle per key, full teardown on
//! destroy, and the bounded newest-first stream feed.

use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use paneldeck::panels::{PanelManager, PanelView};
use paneldeck::registry::Registry;
use paneldeck::store::Store;
use paneldeck::types::{AppEntry, FieldSpec, Panel, PanelKind};
use serde_json::json;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio::time::{sleep, timeout, Instant};
use tokio_tungstenite::tungstenite::Message;

fn manager() -> PanelManager {
    let td = tempfile::tempdir().unwrap();
    let registry = Arc::new(Registry::new("http://127.0.0.1:1", Store::with_dir(td.path())));
    let (toasts, _rx) = mpsc::unbounded_channel();
    PanelManager::new(registry, toasts)
}

fn app() -> AppEntry {
    AppEntry {
        id: "a1".into(),
        base_url: "http://127.0.0.1:1".into(),
        ..Default::default()
    }
}

#[tokio::test]
async fn restart_same_key_keeps_single_lifecycle() {
    let mut mgr = manager();
    let app = app();
    let poller = Panel {
        id: "p1".into(),
        kind: PanelKind::Status,
        endpoint: Some("/rows".into()),
        refresh_ms: Some(50),
        ..Default::default()
    };

    mgr.start(&app, &poller);
    mgr.start(&app, &poller);
    assert_eq!(mgr.active_count(), 1);

    let stream = Panel {
        id: "s1".into(),
        kind: PanelKind::Stream,
        ws_url: Some("ws://127.0.0.1:1/ws".into()),
        ..Default::default()
    };
    mgr.start(&app, &stream);
    mgr.start(&app, &stream);
    assert_eq!(mgr.active_count(), 2);
    assert_eq!(mgr.active_streams(), 1);
}

#[tokio::test]
async fn destroy_releases_every_timer_and_socket() {
    let mut mgr = manager();
    let app = app();
    for i in 0..3 {
        mgr.start(
            &app,
            &Panel {
                id: format!("p{i}"),
                kind: PanelKind::Status,
                endpoint: Some("/rows".into()),
                refresh_ms: Some(50),
                ..Default::default()
            },
        );
    }
    mgr.start(
        &app,
        &Panel {
            id: "s1".into(),
            kind: PanelKind::Stream,
            ws_url: Some("ws://127.0.0.1:1/ws".into()),
            ..Default::default()
        },
    );
    assert_eq!(mgr.active_count(), 4);
    assert_eq!(mgr.active_streams(), 1);

    mgr.destroy();
    assert_eq!(mgr.active_count(), 0);
    assert_eq!(mgr.active_streams(), 0);

    // Decommissioning twice is fine.
    mgr.destroy();
    assert_eq!(mgr.active_count(), 0);
}

#[tokio::test]
async fn stream_panel_feed_is_bounded_newest_first() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server = tokio::spawn(async move {
        loop {
            let Ok((sock, _)) = listener.accept().await else {
                break;
            };
            tokio::spawn(async move {
                let Ok(mut ws) = tokio_tungstenite::accept_async(sock).await else {
                    return;
                };
                for n in 0..8 {
                    let payload = json!({"n": n}).to_string();
                    if ws.send(Message::Text(payload)).await.is_err() {
                        return;
                    }
                }
                while let Some(Ok(_)) = ws.next().await {}
            });
        }
    });

    let mut mgr = manager();
    let app = app();
    let panel = Panel {
        id: "feed".into(),
        kind: PanelKind::Stream,
        ws_url: Some(format!("ws://{addr}/ws")),
        max_items: Some(5),
        fields: vec![FieldSpec {
            key: "n".into(),
            label: "N".into(),
            color: None,
            format: None,
        }],
        ..Default::default()
    };
    mgr.start(&app, &panel);
    let key = ("a1".to_string(), "feed".to_string());

    // Wait until the capped feed settles with the newest item first.
    let deadline = Instant::now() + Duration::from_secs(5);
    loop {
        if let Some(PanelView::Stream { items, connected }) = mgr.view(&key) {
            if connected && items.len() == 5 && items[0].spans[0].text == "7" {
                assert_eq!(items[4].spans[0].text, "3");
                break;
            }
        }
        assert!(Instant::now() < deadline, "feed never settled");
        sleep(Duration::from_millis(50)).await;
    }

    mgr.destroy();
    assert_eq!(mgr.active_streams(), 0);
    server.abort();
}

#[tokio::test]
async fn stream_panel_without_url_renders_placeholder() {
    let mut mgr = manager();
    let app = app();
    let panel = Panel {
        id: "s".into(),
        kind: PanelKind::Stream,
        ..Default::default()
    };
    mgr.start(&app, &panel);
    let key = ("a1".to_string(), "s".to_string());
    match mgr.view(&key) {
        Some(PanelView::Empty { message }) => assert_eq!(message, "NO WEBSOCKET URL"),
        other => panic!("expected placeholder, got {other:?}"),
    }
}

#[tokio::test]
async fn status_panel_renders_rows_once_fetched() {
    // Minimal HTTP endpoint for one fetch-once status panel.
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server = tokio::spawn(async move {
        loop {
            let Ok((mut sock, _)) = listener.accept().await else {
                break;
            };
            tokio::spawn(async move {
                let mut buf = [0u8; 2048];
                let _ = sock.read(&mut buf).await;
                let body = json!({"items": [{"name": "ingest", "status": "ok"}]}).to_string();
                let resp = format!(
                    "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    body.len(),
                    body
                );
                let _ = sock.write_all(resp.as_bytes()).await;
                let _ = sock.shutdown().await;
            });
        }
    });

    let td = tempfile::tempdir().unwrap();
    let registry = Arc::new(Registry::new("http://localhost:3210", Store::with_dir(td.path())));
    let (toasts, _rx) = mpsc::unbounded_channel();
    let mut mgr = PanelManager::new(registry, toasts);
    let app = AppEntry {
        id: "a1".into(),
        base_url: format!("http://{addr}"),
        ..Default::default()
    };
    let panel = Panel {
        id: "rows".into(),
        kind: PanelKind::Status,
        endpoint: Some("/anything".into()),
        fields: vec![
            FieldSpec {
                key: "name".into(),
                label: "NAME".into(),
                color: None,
                format: None,
            },
            FieldSpec {
                key: "status".into(),
                label: "STATE".into(),
                color: None,
                format: None,
            },
        ],
        ..Default::default()
    };
    mgr.start(&app, &panel);
    let key = ("a1".to_string(), "rows".to_string());

    let view = timeout(Duration::from_secs(5), async {
        loop {
            if let Some(PanelView::Status { rows, loaded, .. }) = mgr.view(&key) {
                if loaded {
                    return rows;
                }
            }
            sleep(Duration::from_millis(25)).await;
        }
    })
    .await
    .expect("status panel never loaded");
    assert_eq!(view.len(), 1);
    assert_eq!(view[0][0].text, "ingest");
    assert_eq!(view[0][1].text, "ok");

    server.abort();
}
