//! Stream client tests against in-process WebSocket listeners.

use std::net::SocketAddr;
use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use paneldeck::stream::{ConnState, StreamClient, StreamConfig, StreamEvent};
use serde_json::json;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message;

fn fast_config(addr: SocketAddr) -> StreamConfig {
    let mut cfg = StreamConfig::single(format!("ws://{addr}/ws"));
    cfg.initial_delay = Duration::from_millis(100);
    cfg.max_delay = Duration::from_millis(400);
    cfg
}

async fn wait_for(rx: &mut broadcast::Receiver<StreamEvent>, want: ConnState) {
    loop {
        match timeout(Duration::from_secs(5), rx.recv())
            .await
            .expect("timed out waiting for connection event")
            .expect("event channel closed")
        {
            StreamEvent::Connection(s) if s == want => return,
            _ => {}
        }
    }
}

async fn next_message(rx: &mut broadcast::Receiver<StreamEvent>) -> serde_json::Value {
    loop {
        match timeout(Duration::from_secs(5), rx.recv())
            .await
            .expect("timed out waiting for message")
            .expect("event channel closed")
        {
            StreamEvent::Message(v) => return v,
            _ => {}
        }
    }
}

#[tokio::test]
async fn reconnects_after_server_drop() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server = tokio::spawn(async move {
        let mut n = 0u32;
        loop {
            let Ok((sock, _)) = listener.accept().await else {
                break;
            };
            n += 1;
            let drop_now = n == 1;
            tokio::spawn(async move {
                let Ok(mut ws) = tokio_tungstenite::accept_async(sock).await else {
                    return;
                };
                let _ = ws.send(Message::Text(json!({"n": 1}).to_string())).await;
                if drop_now {
                    let _ = ws.close(None).await;
                    return;
                }
                while let Some(Ok(_)) = ws.next().await {}
            });
        }
    });

    let client = StreamClient::new(fast_config(addr));
    let mut rx = client.subscribe();
    client.connect();

    wait_for(&mut rx, ConnState::Connected).await;
    assert_eq!(next_message(&mut rx).await, json!({"n": 1}));

    // Server hangs up: disconnected, then recovered without intervention.
    wait_for(&mut rx, ConnState::Disconnected).await;
    wait_for(&mut rx, ConnState::Connected).await;
    assert!(client.is_connected());

    // Explicit disconnect is terminal.
    client.disconnect();
    wait_for(&mut rx, ConnState::Disconnected).await;
    server.abort();
}

#[tokio::test]
async fn malformed_payload_is_dropped_not_fatal() {
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
                let _ = ws.send(Message::Text("this is not json".into())).await;
                let _ = ws.send(Message::Text(json!({"ok": true}).to_string())).await;
                while let Some(Ok(_)) = ws.next().await {}
            });
        }
    });

    let client = StreamClient::new(fast_config(addr));
    let mut rx = client.subscribe();
    client.connect();

    wait_for(&mut rx, ConnState::Connected).await;
    // Only the parseable payload comes through, and the socket survives.
    assert_eq!(next_message(&mut rx).await, json!({"ok": true}));
    assert!(client.is_connected());

    client.disconnect();
    server.abort();
}

#[tokio::test]
async fn send_round_trips_when_connected() {
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
                while let Some(Ok(Message::Text(t))) = ws.next().await {
                    if ws.send(Message::Text(t)).await.is_err() {
                        break;
                    }
                }
            });
        }
    });

    let client = StreamClient::new(fast_config(addr));
    // Best-effort: sending before connect is silently dropped.
    client.send(json!({"early": true}));

    let mut rx = client.subscribe();
    client.connect();
    wait_for(&mut rx, ConnState::Connected).await;

    client.send(json!({"hello": "there"}));
    assert_eq!(next_message(&mut rx).await, json!({"hello": "there"}));

    client.disconnect();
    server.abort();
}

#[tokio::test]
async fn connect_twice_keeps_one_live_socket() {
    let live = Arc::new(AtomicUsize::new(0));
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let counter = Arc::clone(&live);
    let server = tokio::spawn(async move {
        loop {
            let Ok((sock, _)) = listener.accept().await else {
                break;
            };
            let counter = Arc::clone(&counter);
            tokio::spawn(async move {
                let Ok(mut ws) = tokio_tungstenite::accept_async(sock).await else {
                    return;
                };
                counter.fetch_add(1, Ordering::SeqCst);
                while let Some(Ok(_)) = ws.next().await {}
                counter.fetch_sub(1, Ordering::SeqCst);
            });
        }
    });

    let client = StreamClient::new(fast_config(addr));
    let mut rx = client.subscribe();
    client.connect();
    wait_for(&mut rx, ConnState::Connected).await;

    // A second connect closes the old socket before dialing again.
    client.connect();
    wait_for(&mut rx, ConnState::Connected).await;
    tokio::time::sleep(Duration::from_millis(300)).await;
    assert_eq!(live.load(Ordering::SeqCst), 1);

    client.disconnect();
    server.abort();
}
