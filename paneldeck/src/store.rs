//! Config-dir persistence: connection profiles, the last-good manifest
//! snapshot, and alert state.
//! Stored under XDG config dir: $XDG_CONFIG_HOME/paneldeck/*.json
//! (fallback ~/.config/paneldeck/*.json). Every record is overwritten
//! wholesale; corrupt or missing files fall back to defaults.

use std::{collections::BTreeMap, fs, path::PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{Alert, AppEntry};

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ProfileEntry {
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_ms: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ProfilesFile {
    #[serde(default)]
    pub profiles: BTreeMap<String, ProfileEntry>,
    #[serde(default)]
    pub version: u32,
}

/// Last successful manifest fetch, read back only when the live list is empty.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheSnapshot {
    pub apps: Vec<AppEntry>,
    pub fetched_at: DateTime<Utc>,
}

/// Alert buffer + unseen counter as the UI surfaces read them.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct AlertSnapshot {
    #[serde(default)]
    pub recent_alerts: Vec<Alert>,
    #[serde(default)]
    pub alert_count: u32,
}

pub fn config_dir() -> PathBuf {
    if let Some(xdg) = std::env::var_os("XDG_CONFIG_HOME") {
        PathBuf::from(xdg).join("paneldeck")
    } else {
        dirs_next::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("paneldeck")
    }
}

/// File-backed store rooted at one directory; cheap to clone into tasks.
#[derive(Debug, Clone)]
pub struct Store {
    dir: PathBuf,
}

impl Store {
    pub fn new() -> Self {
        Self { dir: config_dir() }
    }

    pub fn with_dir(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path(&self, name: &str) -> PathBuf {
        self.dir.join(name)
    }

    fn read<T: for<'de> Deserialize<'de>>(&self, name: &str) -> Option<T> {
        let s = fs::read_to_string(self.path(name)).ok()?;
        serde_json::from_str(&s).ok()
    }

    fn write<T: Serialize>(&self, name: &str, value: &T) -> std::io::Result<()> {
        fs::create_dir_all(&self.dir)?;
        let data = serde_json::to_vec_pretty(value)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        fs::write(self.path(name), data)
    }

    pub fn load_profiles(&self) -> ProfilesFile {
        self.read("profiles.json").unwrap_or_default()
    }

    pub fn save_profiles(&self, p: &ProfilesFile) -> std::io::Result<()> {
        self.write("profiles.json", p)
    }

    pub fn load_cache(&self) -> Option<CacheSnapshot> {
        self.read("panels_cache.json")
    }

    pub fn save_cache(&self, c: &CacheSnapshot) -> std::io::Result<()> {
        self.write("panels_cache.json", c)
    }

    pub fn load_alerts(&self) -> AlertSnapshot {
        self.read("alerts.json").unwrap_or_default()
    }

    pub fn save_alerts(&self, a: &AlertSnapshot) -> std::io::Result<()> {
        self.write("alerts.json", a)
    }
}

impl Default for Store {
    fn default() -> Self {
        Self::new()
    }
}

/// How CLI inputs resolve against saved profiles.
pub enum ResolveProfile {
    /// Use the provided runtime inputs (maybe persisted by the caller). (url, refresh_ms)
    Direct(String, Option<u64>),
    /// Loaded from an existing profile entry. (url, refresh_ms)
    Loaded(String, Option<u64>),
    /// Should prompt the user to select among profile names.
    PromptSelect(Vec<String>),
    /// Should prompt the user to create a new profile (name).
    PromptCreate(String),
    /// Nothing to resolve (no arguments, no profiles).
    None,
}

pub struct ProfileRequest {
    pub profile_name: Option<String>,
    pub url: Option<String>,
    pub refresh_ms: Option<u64>,
}

impl ProfileRequest {
    pub fn resolve(self, pf: &ProfilesFile) -> ResolveProfile {
        // Only a profile name given -> try load.
        if self.url.is_none() && self.profile_name.is_some() {
            let name = self.profile_name.unwrap();
            return match pf.profiles.get(&name) {
                Some(entry) => ResolveProfile::Loaded(entry.url.clone(), entry.refresh_ms),
                None => ResolveProfile::PromptCreate(name),
            };
        }
        if let Some(u) = self.url {
            return ResolveProfile::Direct(u, self.refresh_ms);
        }
        if pf.profiles.is_empty() {
            ResolveProfile::None
        } else {
            ResolveProfile::PromptSelect(pf.profiles.keys().cloned().collect())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Alert;

    #[test]
    fn profiles_round_trip() {
        let td = tempfile::tempdir().unwrap();
        let store = Store::with_dir(td.path());
        let mut pf = ProfilesFile::default();
        pf.profiles.insert(
            "lab".into(),
            ProfileEntry {
                url: "http://10.0.0.5:3210".into(),
                refresh_ms: Some(5000),
            },
        );
        store.save_profiles(&pf).unwrap();
        let loaded = store.load_profiles();
        assert_eq!(loaded.profiles["lab"].url, "http://10.0.0.5:3210");
        assert_eq!(loaded.profiles["lab"].refresh_ms, Some(5000));
    }

    #[test]
    fn missing_files_default() {
        let td = tempfile::tempdir().unwrap();
        let store = Store::with_dir(td.path());
        assert!(store.load_profiles().profiles.is_empty());
        assert!(store.load_cache().is_none());
        assert_eq!(store.load_alerts().alert_count, 0);
    }

    #[test]
    fn alert_snapshot_round_trip() {
        let td = tempfile::tempdir().unwrap();
        let store = Store::with_dir(td.path());
        let snap = AlertSnapshot {
            recent_alerts: vec![Alert {
                id: "1".into(),
                timestamp: Utc::now(),
                camera: "Front".into(),
                kind: "person".into(),
                rule: "perimeter".into(),
                level: 1,
                message: "person at Front".into(),
            }],
            alert_count: 3,
        };
        store.save_alerts(&snap).unwrap();
        let loaded = store.load_alerts();
        assert_eq!(loaded.alert_count, 3);
        assert_eq!(loaded.recent_alerts[0].camera, "Front");
        assert_eq!(loaded.recent_alerts[0].kind, "person");
    }

    #[test]
    fn resolve_prefers_direct_url() {
        let pf = ProfilesFile::default();
        let req = ProfileRequest {
            profile_name: Some("lab".into()),
            url: Some("http://host:3210".into()),
            refresh_ms: None,
        };
        assert!(matches!(req.resolve(&pf), ResolveProfile::Direct(u, _) if u == "http://host:3210"));
    }

    #[test]
    fn resolve_unknown_profile_prompts_create() {
        let pf = ProfilesFile::default();
        let req = ProfileRequest {
            profile_name: Some("nope".into()),
            url: None,
            refresh_ms: None,
        };
        assert!(matches!(req.resolve(&pf), ResolveProfile::PromptCreate(n) if n == "nope"));
    }
}
