//! Skill catalog and per-owner configuration, loaded from TOML

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};
use skillcast_events::EventNameConfig;
use tracing::info;

use crate::definition::SkillDefinition;
use crate::error::SkillError;
use crate::regen::ChargeRegenLoop;

fn default_cd_detection_interval() -> f32 {
    ChargeRegenLoop::DEFAULT_INTERVAL
}

fn default_local() -> bool {
    true
}

/// Settings of one skill owner
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OwnerConfig {
    /// Minimum seconds between two charge regeneration checks
    #[serde(default = "default_cd_detection_interval")]
    pub cd_detection_interval: f32,
    /// Skill ids registered when the owner spawns
    #[serde(default)]
    pub preload: Vec<String>,
    /// Drive the charge economy locally. A non-local owner forwards events
    /// to its hook and receives state through `set_status`.
    #[serde(default = "default_local")]
    pub local: bool,
    /// Accepted event names. Empty accepts any name.
    #[serde(default)]
    pub event_names: Vec<String>,
}

impl OwnerConfig {
    pub fn event_catalog(&self) -> EventNameConfig {
        EventNameConfig::new(self.event_names.iter().cloned())
    }
}

impl Default for OwnerConfig {
    fn default() -> Self {
        Self {
            cd_detection_interval: default_cd_detection_interval(),
            preload: Vec::new(),
            local: true,
            event_names: Vec::new(),
        }
    }
}

/// Every authored skill definition, immutable for the session
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SkillCatalog {
    #[serde(default)]
    skills: Vec<SkillDefinition>,
}

impl SkillCatalog {
    /// Build a catalog, validating every definition and refusing duplicate ids.
    pub fn new(skills: Vec<SkillDefinition>) -> Result<Self, SkillError> {
        let mut seen = HashSet::new();
        for skill in &skills {
            skill.validate()?;
            if !seen.insert(skill.id.as_str()) {
                return Err(SkillError::DuplicateSkill(skill.id.clone()));
            }
        }
        Ok(Self { skills })
    }

    pub fn from_toml_str(source: &str) -> Result<Self, SkillError> {
        let raw: SkillCatalog = toml::from_str(source)?;
        Self::new(raw.skills)
    }

    pub fn load(path: &Path) -> Result<Self, SkillError> {
        let contents = std::fs::read_to_string(path)?;
        let catalog = Self::from_toml_str(&contents)?;
        info!("Loaded {} skills from {}", catalog.len(), path.display());
        Ok(catalog)
    }

    pub fn get(&self, id: &str) -> Option<&SkillDefinition> {
        self.skills.iter().find(|s| s.id == id)
    }

    /// Add a definition after validating it.
    pub fn insert(&mut self, skill: SkillDefinition) -> Result<(), SkillError> {
        skill.validate()?;
        if self.get(&skill.id).is_some() {
            return Err(SkillError::DuplicateSkill(skill.id));
        }
        self.skills.push(skill);
        Ok(())
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.skills.iter().map(|s| s.id.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = &SkillDefinition> {
        self.skills.iter()
    }

    pub fn len(&self) -> usize {
        self.skills.len()
    }

    pub fn is_empty(&self) -> bool {
        self.skills.is_empty()
    }
}
