use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf, sync::RwLock, time::Duration};

/// Tunables for the scan pipeline. Defaults match the production backend
/// and the cadence the capture screen runs at; tests shrink the timing
/// fields to milliseconds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineSettings {
    /// Base URL of the recognition/enrichment backend.
    pub backend_base_url: String,

    /// Recognition calls run server-side AI and can legitimately take a
    /// while; the bound keeps them from hanging forever.
    pub recognition_timeout_secs: u64,
    pub enrichment_timeout_secs: u64,
    pub health_timeout_secs: u64,

    /// Minimum interval between periodic captures.
    pub capture_interval_ms: u64,
    /// Pause after a recognition outcome before scanning resumes.
    pub recognition_cooldown_ms: u64,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            backend_base_url: "http://127.0.0.1:8000".to_string(),
            recognition_timeout_secs: 120,
            enrichment_timeout_secs: 15,
            health_timeout_secs: 10,
            capture_interval_ms: 3_000,
            recognition_cooldown_ms: 2_000,
        }
    }
}

impl EngineSettings {
    pub fn recognition_timeout(&self) -> Duration {
        Duration::from_secs(self.recognition_timeout_secs)
    }

    pub fn enrichment_timeout(&self) -> Duration {
        Duration::from_secs(self.enrichment_timeout_secs)
    }

    pub fn health_timeout(&self) -> Duration {
        Duration::from_secs(self.health_timeout_secs)
    }

    pub fn capture_interval(&self) -> Duration {
        Duration::from_millis(self.capture_interval_ms)
    }

    pub fn recognition_cooldown(&self) -> Duration {
        Duration::from_millis(self.recognition_cooldown_ms)
    }
}

/// File-backed settings store shared with the embedding app.
pub struct SettingsStore {
    path: PathBuf,
    data: RwLock<EngineSettings>,
}

impl SettingsStore {
    pub fn new(path: PathBuf) -> Result<Self> {
        let data = if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read settings from {}", path.display()))?;
            serde_json::from_str(&contents).unwrap_or_default()
        } else {
            EngineSettings::default()
        };

        Ok(Self {
            path,
            data: RwLock::new(data),
        })
    }

    pub fn engine(&self) -> EngineSettings {
        self.data.read().unwrap().clone()
    }

    pub fn update(&self, settings: EngineSettings) -> Result<()> {
        {
            let mut guard = self.data.write().unwrap();
            *guard = settings;
            self.persist(&guard)?;
        }
        Ok(())
    }

    fn persist(&self, data: &EngineSettings) -> Result<()> {
        let serialized = serde_json::to_string_pretty(data)?;
        fs::write(&self.path, serialized)
            .with_context(|| format!("Failed to write settings to {}", self.path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_path() -> PathBuf {
        std::env::temp_dir().join(format!("vinoscan-settings-{}.json", uuid::Uuid::new_v4()))
    }

    #[test]
    fn store_round_trips_updates() {
        let path = scratch_path();
        let store = SettingsStore::new(path.clone()).unwrap();
        assert_eq!(store.engine().capture_interval_ms, 3_000);

        let mut settings = store.engine();
        settings.capture_interval_ms = 1_000;
        settings.backend_base_url = "http://10.0.0.5:8000".to_string();
        store.update(settings).unwrap();

        let reloaded = SettingsStore::new(path.clone()).unwrap();
        assert_eq!(reloaded.engine().capture_interval_ms, 1_000);
        assert_eq!(reloaded.engine().backend_base_url, "http://10.0.0.5:8000");
        let _ = fs::remove_file(path);
    }

    #[test]
    fn malformed_settings_fall_back_to_defaults() {
        let path = scratch_path();
        fs::write(&path, "not json").unwrap();

        let store = SettingsStore::new(path.clone()).unwrap();
        assert_eq!(store.engine().recognition_timeout_secs, 120);
        assert_eq!(store.engine().recognition_cooldown_ms, 2_000);
        let _ = fs::remove_file(path);
    }
}
