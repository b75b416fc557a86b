//! Demo settings with persistence
//!
//! Settings are saved to `~/.config/skillcast/settings.toml`

use std::fs;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use skillcast_skill::OwnerConfig;
use tracing::{info, warn};

/// All demo settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DemoSettings {
    #[serde(default)]
    pub simulation: SimulationSettings,
    #[serde(default)]
    pub owner: OwnerConfig,
    #[serde(default)]
    pub remote: RemoteSettings,
    /// Skill catalog to load instead of the built-in one
    #[serde(default)]
    pub catalog_path: Option<PathBuf>,
}

impl DemoSettings {
    /// Get the config directory path
    fn config_dir() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("skillcast"))
    }

    /// Get the settings file path
    fn settings_path() -> Option<PathBuf> {
        Self::config_dir().map(|p| p.join("settings.toml"))
    }

    /// Load settings from disk, or return defaults if not found
    pub fn load() -> Self {
        let Some(path) = Self::settings_path() else {
            warn!("Could not determine config directory");
            return Self::default();
        };

        if !path.exists() {
            info!("No settings file found, using defaults");
            return Self::default();
        }

        match fs::read_to_string(&path) {
            Ok(content) => Self::parse(&content).unwrap_or_else(|e| {
                warn!("Failed to parse settings: {}, using defaults", e);
                Self::default()
            }),
            Err(e) => {
                warn!("Failed to read settings file: {}, using defaults", e);
                Self::default()
            }
        }
    }

    pub fn parse(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Save settings to disk
    pub fn save(&self) -> anyhow::Result<()> {
        let Some(dir) = Self::config_dir() else {
            anyhow::bail!("Could not determine config directory");
        };

        if !dir.exists() {
            fs::create_dir_all(&dir)?;
        }

        let content = toml::to_string_pretty(self)?;
        fs::write(dir.join("settings.toml"), content)?;
        info!("Saved settings");
        Ok(())
    }
}

/// Frame loop parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationSettings {
    /// Seconds per simulated frame
    pub frame_delta: f32,
    /// Seconds to simulate
    pub duration: f32,
    /// In-game seconds per real second
    pub time_scale: f32,
    /// Write a status snapshot when the run ends
    pub export_snapshot: bool,
}

impl Default for SimulationSettings {
    fn default() -> Self {
        Self {
            frame_delta: 1.0 / 60.0,
            duration: 8.0,
            time_scale: 1.0,
            export_snapshot: true,
        }
    }
}

/// The simulated authority behind remote skill calls
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteSettings {
    pub enabled: bool,
    /// Lower bound of the simulated round trip in milliseconds
    pub min_latency_ms: u64,
    /// Upper bound of the simulated round trip in milliseconds
    pub max_latency_ms: u64,
    pub timeout_ms: u64,
}

impl Default for RemoteSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            min_latency_ms: 40,
            max_latency_ms: 120,
            timeout_ms: 2000,
        }
    }
}
