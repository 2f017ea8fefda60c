//! Reconnecting WebSocket client shared by the manifest update channel, the
//! alert channel, and stream panels.
//!
//! One task owns the socket. Callers talk to it through a command channel and
//! listen on a broadcast channel, so a slow or dropped subscriber never
//! disturbs the connection or the other subscribers. Reconnects are driven by
//! an exponential backoff that resets on every successful open; candidate
//! addresses are tried round-robin.

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::sync::{broadcast, mpsc, watch};
use tokio::time::{sleep_until, Instant};
use tokio_tungstenite::{connect_async, tungstenite::Message};

/// Connection lifecycle, observable through [`StreamClient::state_watch`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnState {
    #[default]
    Idle,
    Connecting,
    Connected,
    Disconnected,
}

impl std::fmt::Display for ConnState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ConnState::Idle => "idle",
            ConnState::Connecting => "connecting",
            ConnState::Connected => "connected",
            ConnState::Disconnected => "disconnected",
        };
        f.write_str(s)
    }
}

/// Everything subscribers see: inbound JSON payloads plus synthetic
/// connection transitions.
#[derive(Debug, Clone)]
pub enum StreamEvent {
    Connection(ConnState),
    Message(serde_json::Value),
}

#[derive(Debug, Clone)]
pub struct StreamConfig {
    /// Candidate addresses, tried round-robin across reconnect attempts.
    pub urls: Vec<String>,
    pub initial_delay: Duration,
    pub max_delay: Duration,
}

impl StreamConfig {
    pub fn new(urls: Vec<String>) -> Self {
        Self {
            urls,
            initial_delay: Duration::from_secs(2),
            max_delay: Duration::from_secs(30),
        }
    }

    pub fn single(url: impl Into<String>) -> Self {
        Self::new(vec![url.into()])
    }
}

/// Reconnect delay: grows by x1.5 per failed attempt, capped, reset to the
/// floor whenever a connection opens.
#[derive(Debug, Clone)]
pub struct Backoff {
    floor: Duration,
    ceiling: Duration,
    current: Duration,
}

impl Backoff {
    pub fn new(floor: Duration, ceiling: Duration) -> Self {
        Self {
            floor,
            ceiling,
            current: floor,
        }
    }

    pub fn reset(&mut self) {
        self.current = self.floor;
    }

    /// Grow the delay and return the wait before the next attempt.
    pub fn on_failure(&mut self) -> Duration {
        self.current = self.current.mul_f64(1.5).min(self.ceiling);
        self.current
    }
}

enum Cmd {
    Connect,
    Disconnect,
    Send(serde_json::Value),
}

enum CloseReason {
    Lost,
    Redial,
    Stop,
}

/// Handle to one persistent connection. Cloning the handle shares the
/// underlying socket; dropping every clone shuts the connection task down.
#[derive(Clone)]
pub struct StreamClient {
    cmd: mpsc::UnboundedSender<Cmd>,
    events: broadcast::Sender<StreamEvent>,
    state: watch::Receiver<ConnState>,
}

impl StreamClient {
    pub fn new(config: StreamConfig) -> Self {
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        let (event_tx, _) = broadcast::channel(256);
        let (state_tx, state_rx) = watch::channel(ConnState::Idle);
        tokio::spawn(run(config, cmd_rx, event_tx.clone(), state_tx));
        Self {
            cmd: cmd_tx,
            events: event_tx,
            state: state_rx,
        }
    }

    /// Open the connection, or force a redial if one is already open. There
    /// is never more than one live socket per client.
    pub fn connect(&self) {
        let _ = self.cmd.send(Cmd::Connect);
    }

    /// Permanently stop reconnecting and close any open socket.
    pub fn disconnect(&self) {
        let _ = self.cmd.send(Cmd::Disconnect);
    }

    /// Best-effort send: silently dropped unless the connection is open.
    pub fn send(&self, payload: serde_json::Value) {
        let _ = self.cmd.send(Cmd::Send(payload));
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StreamEvent> {
        self.events.subscribe()
    }

    pub fn state(&self) -> ConnState {
        *self.state.borrow()
    }

    pub fn state_watch(&self) -> watch::Receiver<ConnState> {
        self.state.clone()
    }

    pub fn is_connected(&self) -> bool {
        self.state() == ConnState::Connected
    }
}

async fn run(
    config: StreamConfig,
    mut cmd_rx: mpsc::UnboundedReceiver<Cmd>,
    events: broadcast::Sender<StreamEvent>,
    state: watch::Sender<ConnState>,
) {
    if config.urls.is_empty() {
        return;
    }
    let mut backoff = Backoff::new(config.initial_delay, config.max_delay);
    let mut url_ix = 0usize;

    // Idle until the first connect request.
    loop {
        match cmd_rx.recv().await {
            Some(Cmd::Connect) => break,
            Some(Cmd::Disconnect) | None => return,
            Some(Cmd::Send(_)) => {}
        }
    }

    loop {
        let url = config.urls[url_ix % config.urls.len()].clone();
        state.send_replace(ConnState::Connecting);

        match connect_async(url.as_str()).await {
            Ok((ws, _)) => {
                tracing::debug!(%url, "stream connected");
                backoff.reset();
                url_ix = 0;
                state.send_replace(ConnState::Connected);
                let _ = events.send(StreamEvent::Connection(ConnState::Connected));

                let (mut sink, mut source) = ws.split();
                let reason = loop {
                    tokio::select! {
                        frame = source.next() => match frame {
                            Some(Ok(Message::Text(text))) => match serde_json::from_str(&text) {
                                Ok(value) => {
                                    let _ = events.send(StreamEvent::Message(value));
                                }
                                // One bad payload never tears the socket down.
                                Err(err) => tracing::warn!(%url, %err, "dropping malformed stream payload"),
                            },
                            Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break CloseReason::Lost,
                            Some(Ok(_)) => {}
                        },
                        cmd = cmd_rx.recv() => match cmd {
                            Some(Cmd::Send(value)) => {
                                if sink.send(Message::Text(value.to_string())).await.is_err() {
                                    break CloseReason::Lost;
                                }
                            }
                            Some(Cmd::Connect) => {
                                let _ = sink.close().await;
                                break CloseReason::Redial;
                            }
                            Some(Cmd::Disconnect) | None => {
                                let _ = sink.close().await;
                                break CloseReason::Stop;
                            }
                        },
                    }
                };

                state.send_replace(ConnState::Disconnected);
                let _ = events.send(StreamEvent::Connection(ConnState::Disconnected));
                match reason {
                    CloseReason::Stop => return,
                    CloseReason::Redial => continue,
                    CloseReason::Lost => {}
                }
            }
            // A constructor failure counts the same as an unexpected close.
            Err(err) => {
                tracing::debug!(%url, %err, "stream connect failed");
                state.send_replace(ConnState::Disconnected);
                let _ = events.send(StreamEvent::Connection(ConnState::Disconnected));
            }
        }

        url_ix = (url_ix + 1) % config.urls.len();
        let deadline = Instant::now() + backoff.on_failure();
        loop {
            tokio::select! {
                _ = sleep_until(deadline) => break,
                cmd = cmd_rx.recv() => match cmd {
                    Some(Cmd::Connect) => break, // retry immediately
                    Some(Cmd::Disconnect) | None => return,
                    Some(Cmd::Send(_)) => {}     // dropped while disconnected
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_grows_by_half_until_capped() {
        let mut b = Backoff::new(Duration::from_secs(2), Duration::from_secs(30));
        assert_eq!(b.on_failure(), Duration::from_millis(3000));
        assert_eq!(b.on_failure(), Duration::from_millis(4500));
        assert_eq!(b.on_failure(), Duration::from_millis(6750));
        for _ in 0..20 {
            b.on_failure();
        }
        assert_eq!(b.on_failure(), Duration::from_secs(30));
    }

    #[test]
    fn backoff_matches_closed_form() {
        let floor = Duration::from_secs(2);
        let ceiling = Duration::from_secs(30);
        let mut b = Backoff::new(floor, ceiling);
        for n in 1..=12u32 {
            let scheduled = b.on_failure();
            let expected = floor.mul_f64(1.5f64.powi(n as i32)).min(ceiling);
            assert_eq!(scheduled, expected, "attempt {n}");
        }
    }

    #[test]
    fn backoff_resets_to_floor() {
        let mut b = Backoff::new(Duration::from_secs(2), Duration::from_secs(30));
        b.on_failure();
        b.on_failure();
        b.reset();
        assert_eq!(b.on_failure(), Duration::from_millis(3000));
    }

    #[test]
    fn single_config_has_default_window() {
        let c = StreamConfig::single("ws://localhost:1/ws");
        assert_eq!(c.urls.len(), 1);
        assert_eq!(c.initial_delay, Duration::from_secs(2));
        assert_eq!(c.max_delay, Duration::from_secs(30));
    }
}
