//! Status snapshot export
//!
//! Writes the charges and remaining cooldowns of every owner to timestamped
//! JSON files, and reads them back for restoring.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use skillcast_core::OwnerId;
use skillcast_skill::SkillStatusMap;

/// Current snapshot format version
pub const SNAPSHOT_VERSION: u32 = 1;

/// Top-level snapshot file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotData {
    /// Format version (for future migration)
    pub version: u32,
    /// Wall-clock time of the export
    pub timestamp: chrono::DateTime<chrono::Utc>,
    /// Simulation time of the export in seconds
    pub clock: f64,
    pub owners: Vec<OwnerSnapshot>,
}

/// Status of one owner's skills
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OwnerSnapshot {
    pub owner: OwnerId,
    pub skills: SkillStatusMap,
}

impl SnapshotData {
    pub fn new(clock: f64, owners: Vec<OwnerSnapshot>) -> Self {
        Self {
            version: SNAPSHOT_VERSION,
            timestamp: chrono::Utc::now(),
            clock,
            owners,
        }
    }

    pub fn owner(&self, id: OwnerId) -> Option<&SkillStatusMap> {
        self.owners.iter().find(|o| o.owner == id).map(|o| &o.skills)
    }

    /// File name derived from the export time
    pub fn file_name(&self) -> String {
        format!("snapshot-{}.json", self.timestamp.format("%Y%m%d-%H%M%S"))
    }
}

/// Get the snapshot directory path, creating it if it doesn't exist
pub fn snapshot_dir() -> Result<PathBuf> {
    let dir = dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("skillcast")
        .join("snapshots");
    fs::create_dir_all(&dir).context("Failed to create snapshot directory")?;
    Ok(dir)
}

/// Write a snapshot into `dir`. Returns the written path.
pub fn export_snapshot(dir: &Path, data: &SnapshotData) -> Result<PathBuf> {
    let path = dir.join(data.file_name());
    let json = serde_json::to_string_pretty(data).context("Failed to serialize snapshot")?;
    fs::write(&path, json).context("Failed to write snapshot file")?;
    Ok(path)
}

pub fn load_snapshot(path: &Path) -> Result<SnapshotData> {
    let json = fs::read_to_string(path).context("Failed to read snapshot file")?;
    let data: SnapshotData = serde_json::from_str(&json).context("Failed to deserialize snapshot")?;
    if data.version > SNAPSHOT_VERSION {
        anyhow::bail!("Unsupported snapshot version {}", data.version);
    }
    Ok(data)
}
