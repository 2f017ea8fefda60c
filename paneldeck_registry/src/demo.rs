//! Sample manifest and payload generators for the demo registry.

use chrono::Utc;
use serde_json::{json, Value};

/// One demo app exercising every panel type, pointed back at this server.
pub fn manifest(port: u16) -> Value {
    json!({
        "apps": [
            {
                "id": "demo",
                "name": "Demo Service",
                "icon": "server",
                "version": "0.1.0",
                "baseUrl": format!("http://localhost:{port}"),
                "panels": [
                    {
                        "id": "workers",
                        "title": "Workers",
                        "type": "status",
                        "endpoint": "/demo/status",
                        "dataPath": "items",
                        "refreshMs": 5000,
                        "fields": [
                            {"key": "name", "label": "NAME"},
                            {"key": "status", "label": "STATE", "color": {"ok": "green", "down": "red"}},
                            {"key": "latency", "label": "LATENCY"}
                        ]
                    },
                    {
                        "id": "totals",
                        "title": "Totals",
                        "type": "stats",
                        "endpoint": "/demo/stats",
                        "refreshMs": 3000,
                        "metrics": [
                            {"key": "uptime_s", "label": "Uptime", "suffix": "s"},
                            {"key": "pings", "label": "Pings", "color": "green"},
                            {"key": "events", "label": "Events", "color": "amber"}
                        ]
                    },
                    {
                        "id": "ops",
                        "title": "Operations",
                        "type": "controls",
                        "actions": [
                            {"label": "PING", "endpoint": "/demo/ping", "color": "green"},
                            {"label": "RESET", "endpoint": "/demo/reset", "method": "POST",
                             "confirm": true, "confirmText": "Reset all counters?", "color": "red"}
                        ]
                    },
                    {
                        "id": "feed",
                        "title": "Event Feed",
                        "type": "stream",
                        "wsUrl": format!("ws://localhost:{port}/ws/events"),
                        "maxItems": 15,
                        "fields": [
                            {"key": "ts", "format": "time"},
                            {"key": "label", "color": "amber"},
                            {"key": "detail"}
                        ]
                    },
                    {
                        "id": "cam",
                        "title": "Lobby Camera",
                        "type": "camera",
                        "streamUrl": format!("http://localhost:{port}/demo/lobby.jpg"),
                        "size": "small"
                    }
                ]
            }
        ]
    })
}

/// Status rows that flap over time so the color map is visible.
pub fn status_rows(uptime_s: u64) -> Value {
    let flap = |offset: u64| {
        if (uptime_s / 20 + offset) % 3 == 0 {
            "down"
        } else {
            "ok"
        }
    };
    json!({
        "items": [
            {"name": "ingest", "status": flap(0), "latency": format!("{}ms", 10 + uptime_s % 7)},
            {"name": "transcode", "status": flap(1), "latency": format!("{}ms", 25 + uptime_s % 13)},
            {"name": "archive", "status": flap(2), "latency": format!("{}ms", 40 + uptime_s % 5)}
        ]
    })
}

const FEED_LABELS: &[&str] = &["motion", "doorbell", "zone-entry", "zone-exit"];

pub fn feed_event(n: u64) -> Value {
    let label = FEED_LABELS[(n as usize) % FEED_LABELS.len()];
    json!({
        "ts": Utc::now().to_rfc3339(),
        "label": label,
        "detail": format!("event #{n}")
    })
}

/// Alternating alert traffic: ordinary events with an occasional escalation.
pub fn alert_event(n: u64) -> Value {
    if n % 5 == 4 {
        json!({"type": "escalation", "level": 2, "ruleName": "demo perimeter"})
    } else {
        json!({
            "type": "event",
            "ruleName": "demo watch",
            "escalationLevel": n % 2,
            "event": {
                "id": n,
                "type": if n % 2 == 0 { "person" } else { "motion" },
                "cameraName": "Demo Cam"
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manifest_targets_requested_port() {
        let m = manifest(4321);
        let app = &m["apps"][0];
        assert_eq!(app["baseUrl"], "http://localhost:4321");
        assert!(app["panels"]
            .as_array()
            .unwrap()
            .iter()
            .any(|p| p["wsUrl"].as_str().is_some_and(|u| u.contains(":4321/ws/events"))));
    }

    #[test]
    fn alert_traffic_mixes_escalations() {
        assert_eq!(alert_event(4)["type"], "escalation");
        let ev = alert_event(0);
        assert_eq!(ev["type"], "event");
        assert_eq!(ev["event"]["type"], "person");
    }

    #[test]
    fn status_rows_expose_items_list() {
        let rows = status_rows(0);
        assert_eq!(rows["items"].as_array().unwrap().len(), 3);
    }
}
