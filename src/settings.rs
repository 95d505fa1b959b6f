use anyhow::{Context, Result};
use log::warn;
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf, sync::RwLock};

use crate::collage::CollageConfig;
use crate::store::StoreMode;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ComposerSettings {
    pub api_key: String,
    pub model: String,
    pub endpoint: String,
}

impl Default for ComposerSettings {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            model: "gemini-2.5-flash".into(),
            endpoint: "https://generativelanguage.googleapis.com".into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RelaySettings {
    pub base_url: String,
    pub poll_interval_secs: u64,
}

impl Default for RelaySettings {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:3001".into(),
            poll_interval_secs: 3,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AppSettings {
    pub store: StoreMode,
    pub staff_name: String,
    pub composer: ComposerSettings,
    pub relay: RelaySettings,
    pub collage: CollageConfig,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            store: StoreMode::Local,
            staff_name: "Jane Doe".into(),
            composer: ComposerSettings::default(),
            relay: RelaySettings::default(),
            collage: CollageConfig::default(),
        }
    }
}

impl AppSettings {
    /// Layer environment variables over the file values.
    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(key) = lookup("API_KEY").filter(|v| !v.trim().is_empty()) {
            self.composer.api_key = key;
        }
        if let Some(url) = lookup("BOT_SERVER_URL").filter(|v| !v.trim().is_empty()) {
            self.relay.base_url = url;
        }
        if let Some(raw) = lookup("CAREWATCH_STORE") {
            match StoreMode::from_env_value(&raw) {
                Some(mode) => self.store = mode,
                None => warn!("Ignoring unknown CAREWATCH_STORE value '{raw}'"),
            }
        }
        self
    }
}

pub struct SettingsStore {
    path: PathBuf,
    data: RwLock<AppSettings>,
}

impl SettingsStore {
    pub fn new(path: PathBuf) -> Result<Self> {
        let data = if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read settings from {}", path.display()))?;
            serde_json::from_str(&contents).unwrap_or_else(|err| {
                warn!("Settings at {} are invalid ({err}); using defaults", path.display());
                AppSettings::default()
            })
        } else {
            AppSettings::default()
        };

        Ok(Self {
            path,
            data: RwLock::new(data),
        })
    }

    /// Stored settings, without environment overrides.
    pub fn stored(&self) -> AppSettings {
        match self.data.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn effective(&self) -> AppSettings {
        self.stored().with_overrides(|name| std::env::var(name).ok())
    }

    pub fn update(&self, change: impl FnOnce(&mut AppSettings)) -> Result<AppSettings> {
        let mut guard = match self.data.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        change(&mut *guard);
        self.persist(&guard)?;
        Ok(guard.clone())
    }

    fn persist(&self, data: &AppSettings) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let serialized = serde_json::to_string_pretty(data)?;
        fs::write(&self.path, serialized)
            .with_context(|| format!("Failed to write settings to {}", self.path.display()))
    }
}
