//! Types that mirror the registry's JSON schema, plus alert and health models.
//!
//! The manifest decodes permissively: absent fields default, unknown panel
//! types land on [`PanelKind::Unknown`] instead of failing the whole fetch.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Manifest {
    #[serde(default)]
    pub apps: Vec<AppEntry>,
}

/// One registered remote service and its panels.
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct AppEntry {
    // Older registries publish the id under "app".
    #[serde(alias = "app")]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub icon: String,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub base_url: String,
    #[serde(default)]
    pub panels: Vec<Panel>,
}

/// One renderable widget belonging to an app.
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct Panel {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(rename = "type", default)]
    pub kind: PanelKind,
    #[serde(default)]
    pub fields: Vec<FieldSpec>,
    #[serde(default)]
    pub metrics: Vec<MetricSpec>,
    #[serde(default)]
    pub actions: Vec<ActionSpec>,
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default)]
    pub data_path: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub ws_url: Option<String>,
    #[serde(default)]
    pub stream_url: Option<String>,
    #[serde(default)]
    pub refresh_ms: Option<u64>,
    #[serde(default)]
    pub max_items: Option<usize>,
    #[serde(default)]
    pub size: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum PanelKind {
    Status,
    Controls,
    Stats,
    Iframe,
    Stream,
    Camera,
    #[default]
    #[serde(other)]
    Unknown,
}

/// Column/field descriptor for status tables and stream feeds.
///
/// `color` is either a plain color name (stream feeds) or a value -> color
/// map (status cells), so it decodes as an untagged union.
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct FieldSpec {
    pub key: String,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub color: Option<ColorSpec>,
    #[serde(default)]
    pub format: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(untagged)]
pub enum ColorSpec {
    Name(String),
    Map(BTreeMap<String, String>),
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct MetricSpec {
    pub key: String,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub prefix: Option<String>,
    #[serde(default)]
    pub suffix: Option<String>,
    #[serde(default)]
    pub color: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct ActionSpec {
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub endpoint: String,
    #[serde(default)]
    pub method: Option<String>,
    #[serde(default)]
    pub body: Option<serde_json::Value>,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub confirm: bool,
    #[serde(default)]
    pub confirm_text: Option<String>,
}

/// Reachability of one app, recomputed every probe cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HealthStatus {
    Online,
    Offline,
    Error,
    #[default]
    Unknown,
}

impl std::fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            HealthStatus::Online => "online",
            HealthStatus::Offline => "offline",
            HealthStatus::Error => "error",
            HealthStatus::Unknown => "unknown",
        };
        f.write_str(s)
    }
}

/// Health probe result for one app, keyed by app id.
#[derive(Debug, Clone)]
pub struct AppHealth {
    pub app_id: String,
    pub status: HealthStatus,
}

/// One processed alert record, newest kept first in the recent buffer.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Alert {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub camera: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub rule: String,
    #[serde(default)]
    pub level: u32,
    #[serde(default)]
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manifest_decodes_with_missing_fields() {
        let m: Manifest =
            serde_json::from_str(r#"{"apps":[{"id":"cam1","baseUrl":"http://localhost:9000"}]}"#)
                .unwrap();
        assert_eq!(m.apps.len(), 1);
        assert_eq!(m.apps[0].id, "cam1");
        assert!(m.apps[0].panels.is_empty());
        assert!(m.apps[0].name.is_empty());
    }

    #[test]
    fn app_id_accepts_legacy_field_name() {
        let m: Manifest =
            serde_json::from_str(r#"{"apps":[{"app":"legacy","baseUrl":"http://x"}]}"#).unwrap();
        assert_eq!(m.apps[0].id, "legacy");
    }

    #[test]
    fn unknown_panel_type_decodes_as_unknown() {
        let p: Panel =
            serde_json::from_str(r#"{"id":"p1","type":"holo-deck","title":"X"}"#).unwrap();
        assert_eq!(p.kind, PanelKind::Unknown);
    }

    #[test]
    fn panel_type_names_round_trip() {
        for (name, kind) in [
            ("status", PanelKind::Status),
            ("controls", PanelKind::Controls),
            ("stats", PanelKind::Stats),
            ("iframe", PanelKind::Iframe),
            ("stream", PanelKind::Stream),
            ("camera", PanelKind::Camera),
        ] {
            let p: Panel =
                serde_json::from_str(&format!(r#"{{"id":"p","type":"{name}"}}"#)).unwrap();
            assert_eq!(p.kind, kind);
        }
    }

    #[test]
    fn field_color_decodes_name_or_map() {
        let f: FieldSpec = serde_json::from_str(r#"{"key":"k","color":"green"}"#).unwrap();
        assert!(matches!(f.color, Some(ColorSpec::Name(ref n)) if n == "green"));

        let f: FieldSpec =
            serde_json::from_str(r#"{"key":"k","color":{"ok":"green","down":"red"}}"#).unwrap();
        match f.color {
            Some(ColorSpec::Map(m)) => assert_eq!(m.get("ok").map(String::as_str), Some("green")),
            other => panic!("expected map, got {other:?}"),
        }
    }
}
