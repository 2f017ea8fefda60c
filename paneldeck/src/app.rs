//! App state and main loop: input handling, manifest/health intake, panel
//! lifecycle orchestration, and drawing.

use std::{
    collections::HashMap,
    io,
    sync::Arc,
    time::{Duration, Instant},
};

use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    text::Span,
    widgets::Paragraph,
    Terminal,
};
use tokio::sync::{broadcast, mpsc, watch};
use tokio::time::sleep;

use crate::alerts::{AlertProcessor, Notification};
use crate::panels::{PanelManager, Toast};
use crate::registry::Registry;
use crate::store::Store;
use crate::stream::{StreamClient, StreamConfig, StreamEvent};
use crate::types::{AppEntry, HealthStatus, PanelKind};
use crate::ui;

const HEALTH_INTERVAL: Duration = Duration::from_secs(30);
const TOAST_VISIBLE: Duration = Duration::from_secs(3);

/// The manifest live-update channel hangs off the registry base URL.
pub fn live_channel_url(registry_base: &str) -> String {
    let ws_base = if let Some(rest) = registry_base.strip_prefix("https://") {
        format!("wss://{rest}")
    } else if let Some(rest) = registry_base.strip_prefix("http://") {
        format!("ws://{rest}")
    } else {
        registry_base.to_string()
    };
    format!("{}/ws/panels", ws_base.trim_end_matches('/'))
}

pub struct App {
    registry: Arc<Registry>,
    panels: PanelManager,
    alerts: AlertProcessor,
    updates: StreamClient,

    apps_rx: watch::Receiver<Vec<AppEntry>>,
    update_events: broadcast::Receiver<StreamEvent>,
    toasts_rx: mpsc::UnboundedReceiver<Toast>,
    notif_rx: mpsc::UnboundedReceiver<Notification>,
    health_tx: mpsc::UnboundedSender<HashMap<String, HealthStatus>>,
    health_rx: mpsc::UnboundedReceiver<HashMap<String, HealthStatus>>,

    apps: Vec<AppEntry>,
    health: HashMap<String, HealthStatus>,
    selected: usize,
    show_alerts: bool,
    should_quit: bool,

    toast: Option<(Toast, Instant)>,
    blocking_notice: Option<Notification>,

    refresh: Duration,
    probe_inflight: bool,
    last_probe: Instant,
}

impl App {
    pub fn new(
        registry_url: &str,
        alert_urls: Vec<String>,
        refresh: Duration,
        store: Store,
    ) -> Self {
        let registry = Arc::new(Registry::new(registry_url, store.clone()));
        let (toasts_tx, toasts_rx) = mpsc::unbounded_channel();
        let (notif_tx, notif_rx) = mpsc::unbounded_channel();
        let (health_tx, health_rx) = mpsc::unbounded_channel();
        let panels = PanelManager::new(Arc::clone(&registry), toasts_tx);
        let alerts = AlertProcessor::new(alert_urls, store, notif_tx);
        let updates = StreamClient::new(StreamConfig::single(live_channel_url(registry_url)));
        let apps_rx = registry.subscribe();
        let update_events = updates.subscribe();
        Self {
            registry,
            panels,
            alerts,
            updates,
            apps_rx,
            update_events,
            toasts_rx,
            notif_rx,
            health_tx,
            health_rx,
            apps: Vec::new(),
            health: HashMap::new(),
            selected: 0,
            show_alerts: false,
            should_quit: false,
            toast: None,
            blocking_notice: None,
            refresh,
            probe_inflight: false,
            last_probe: Instant::now()
                .checked_sub(HEALTH_INTERVAL)
                .unwrap_or_else(Instant::now), // probe immediately on first loop
        }
    }

    pub async fn run(&mut self) -> anyhow::Result<()> {
        // Bring the engine up before touching the terminal.
        let initial = self.registry.fetch().await;
        let _ = self.apps_rx.borrow_and_update(); // the initial fetch is applied by hand
        self.apply_apps(initial);
        self.registry.start_polling(self.refresh);
        self.updates.connect();
        self.alerts.run();

        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend)?;
        terminal.clear()?;

        let res = self.event_loop(&mut terminal).await;

        // Teardown: every timer and socket this app owns.
        self.panels.destroy();
        self.registry.stop_polling();
        self.updates.disconnect();
        self.alerts.shutdown();

        disable_raw_mode()?;
        let backend = terminal.backend_mut();
        execute!(backend, DisableMouseCapture, LeaveAlternateScreen)?;
        terminal.show_cursor()?;

        res
    }

    async fn event_loop<B: ratatui::backend::Backend>(
        &mut self,
        terminal: &mut Terminal<B>,
    ) -> anyhow::Result<()> {
        loop {
            // Input (non-blocking)
            while event::poll(Duration::from_millis(10))? {
                if let Event::Key(k) = event::read()? {
                    self.handle_key(k.code);
                }
            }
            if self.should_quit {
                break;
            }

            self.pump();
            terminal.draw(|f| self.draw(f))?;
            sleep(Duration::from_millis(150)).await;
        }
        Ok(())
    }

    fn handle_key(&mut self, code: KeyCode) {
        // A blocking notice swallows the first key press to dismiss.
        if self.blocking_notice.is_some() {
            self.blocking_notice = None;
            return;
        }
        match code {
            KeyCode::Char('q') | KeyCode::Char('Q') => self.should_quit = true,
            KeyCode::Esc => {
                if self.show_alerts {
                    self.show_alerts = false;
                } else {
                    self.should_quit = true;
                }
            }
            KeyCode::Up | KeyCode::Char('k') => self.select_delta(-1),
            KeyCode::Down | KeyCode::Char('j') => self.select_delta(1),
            KeyCode::Char('a') => self.show_alerts = !self.show_alerts,
            KeyCode::Char('x') => self.alerts.acknowledge(),
            KeyCode::Char('r') => {
                let registry = Arc::clone(&self.registry);
                tokio::spawn(async move {
                    registry.fetch().await;
                });
                self.last_probe = Instant::now()
                    .checked_sub(HEALTH_INTERVAL)
                    .unwrap_or_else(Instant::now);
            }
            KeyCode::Char(c @ '1'..='9') => {
                let index = c as usize - '1' as usize;
                self.trigger_action(index);
            }
            _ => {}
        }
    }

    fn trigger_action(&mut self, index: usize) {
        let Some(app) = self.apps.get(self.selected) else {
            return;
        };
        if let Some(panel) = app.panels.iter().find(|p| p.kind == PanelKind::Controls) {
            let key = (app.id.clone(), panel.id.clone());
            self.panels.trigger_action(&key, index);
        }
    }

    /// Non-blocking intake of everything the background tasks produced.
    fn pump(&mut self) {
        if self.apps_rx.has_changed().unwrap_or(false) {
            let apps = self.apps_rx.borrow_and_update().clone();
            self.apply_apps(apps);
        }

        while let Ok(ev) = self.update_events.try_recv() {
            if let StreamEvent::Message(msg) = ev {
                // Registry pushes on the live channel trigger a re-fetch.
                if matches!(
                    msg.get("type").and_then(serde_json::Value::as_str),
                    Some("panel.update") | Some("panel.register")
                ) {
                    let registry = Arc::clone(&self.registry);
                    tokio::spawn(async move {
                        registry.fetch().await;
                    });
                }
            }
        }

        while let Ok(toast) = self.toasts_rx.try_recv() {
            self.toast = Some((toast, Instant::now()));
        }
        while let Ok(n) = self.notif_rx.try_recv() {
            if n.require_interaction {
                self.blocking_notice = Some(n);
            } else {
                self.toast = Some((
                    Toast {
                        text: format!("🔔 {} — {}", n.title, n.body),
                        error: n.priority >= 2,
                    },
                    Instant::now(),
                ));
            }
        }
        if let Some((_, since)) = &self.toast {
            if since.elapsed() >= TOAST_VISIBLE {
                self.toast = None;
            }
        }

        // Health: probe the whole set concurrently off-loop, swap the map
        // only when a full result set arrives.
        while let Ok(map) = self.health_rx.try_recv() {
            self.health = map;
            self.probe_inflight = false;
            self.last_probe = Instant::now();
        }
        if !self.probe_inflight && self.last_probe.elapsed() >= HEALTH_INTERVAL {
            self.probe_inflight = true;
            let registry = Arc::clone(&self.registry);
            let tx = self.health_tx.clone();
            tokio::spawn(async move {
                let results = registry.check_all_health().await;
                let map = results
                    .into_iter()
                    .map(|r| (r.app_id, r.status))
                    .collect::<HashMap<_, _>>();
                let _ = tx.send(map);
            });
        }
    }

    fn apply_apps(&mut self, apps: Vec<AppEntry>) {
        let selected_id = self.apps.get(self.selected).map(|a| a.id.clone());
        self.apps = apps;
        self.selected = selected_id
            .and_then(|id| self.apps.iter().position(|a| a.id == id))
            .unwrap_or(0);
        self.start_selected_panels();
    }

    fn select_delta(&mut self, delta: isize) {
        if self.apps.is_empty() {
            return;
        }
        let last = self.apps.len() - 1;
        let next = self.selected.saturating_add_signed(delta).min(last);
        if next != self.selected {
            self.selected = next;
            self.start_selected_panels();
        }
    }

    /// Replace every panel lifecycle with the selected app's set.
    fn start_selected_panels(&mut self) {
        self.panels.destroy();
        if let Some(app) = self.apps.get(self.selected).cloned() {
            for panel in &app.panels {
                self.panels.start(&app, panel);
            }
        }
    }

    fn draw(&mut self, f: &mut ratatui::Frame<'_>) {
        let area = f.area();
        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(1), // header
                Constraint::Min(8),    // body
                Constraint::Length(1), // toast / notice line
            ])
            .split(area);

        let clock = chrono::Local::now().format("%H:%M:%S").to_string();
        ui::header::draw_header(
            f,
            rows[0],
            self.registry.base_url(),
            self.updates.state(),
            self.alerts.unseen(),
            &clock,
        );

        if self.show_alerts {
            let snapshot = self.alerts.snapshot();
            ui::alerts_feed::draw_alerts(f, rows[1], &snapshot.recent, snapshot.unseen);
        } else {
            let body = Layout::default()
                .direction(Direction::Horizontal)
                .constraints([Constraint::Length(28), Constraint::Min(30)])
                .split(rows[1]);
            ui::nav::draw_nav(f, body[0], &self.apps, &self.health, self.selected);
            self.draw_panels(f, body[1]);
        }

        self.draw_notice_line(f, rows[2]);
    }

    fn draw_panels(&mut self, f: &mut ratatui::Frame<'_>, area: Rect) {
        let Some(app) = self.apps.get(self.selected) else {
            ui::util::centered_placeholder(f, area, "Panels", "NO APPS FOUND");
            return;
        };
        if app.panels.is_empty() {
            ui::util::centered_placeholder(f, area, &app.name, "NO PANELS CONFIGURED");
            return;
        }

        let constraints: Vec<Constraint> = app
            .panels
            .iter()
            .map(|p| match p.kind {
                PanelKind::Status | PanelKind::Stream => Constraint::Min(6),
                PanelKind::Stats => Constraint::Length(5),
                PanelKind::Controls => Constraint::Length(3),
                PanelKind::Iframe | PanelKind::Camera => Constraint::Length(4),
                PanelKind::Unknown => Constraint::Length(3),
            })
            .collect();
        let slots = Layout::default()
            .direction(Direction::Vertical)
            .constraints(constraints)
            .split(area);

        for (panel, slot) in app.panels.iter().zip(slots.iter()) {
            let key = (app.id.clone(), panel.id.clone());
            let title = if panel.title.is_empty() {
                panel.id.clone()
            } else {
                panel.title.clone()
            };
            match self.panels.view(&key) {
                Some(view) => ui::draw_panel(f, *slot, &title, &view),
                None => ui::util::centered_placeholder(f, *slot, &title, "LOADING..."),
            }
        }
    }

    fn draw_notice_line(&self, f: &mut ratatui::Frame<'_>, area: Rect) {
        if let Some(n) = &self.blocking_notice {
            let p = Paragraph::new(Span::styled(
                format!("🚨 {} — {} (press any key)", n.title, n.body),
                Style::default()
                    .fg(ratatui::style::Color::Red)
                    .add_modifier(Modifier::BOLD),
            ));
            f.render_widget(p, area);
            return;
        }
        if let Some((toast, _)) = &self.toast {
            let color = if toast.error {
                ratatui::style::Color::Red
            } else {
                ratatui::style::Color::Green
            };
            let p = Paragraph::new(Span::styled(
                toast.text.clone(),
                Style::default().fg(color),
            ));
            f.render_widget(p, area);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn live_channel_url_swaps_scheme() {
        assert_eq!(
            live_channel_url("http://10.0.0.5:3210"),
            "ws://10.0.0.5:3210/ws/panels"
        );
        assert_eq!(
            live_channel_url("https://panels.example"),
            "wss://panels.example/ws/panels"
        );
    }
}
