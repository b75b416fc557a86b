//! Authored skill configuration
//!
//! A [`SkillDefinition`] is loaded once and never mutated during a session.
//! Everything that changes at runtime lives in [`crate::SkillRuntimeState`].

use serde::{Deserialize, Serialize};

use crate::error::SkillError;

/// Which lifecycle callbacks an active effect receives
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EffectType {
    /// Effective when added and removed. Executes `on_add` and `on_remove`.
    #[default]
    OnBoundary,
    /// Effective continuously. Executes `on_continue` every tick interval.
    OnTick,
    /// Executes `on_add`, `on_continue` and `on_remove`.
    Both,
}

impl EffectType {
    /// Whether effects of this type receive periodic `on_continue` calls
    pub fn ticks(self) -> bool {
        matches!(self, Self::OnTick | Self::Both)
    }
}

/// How re-activating a running effect changes its expiry
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DurationPolicy {
    /// Replace the remaining time: expiry becomes `now + duration`
    #[default]
    Overlay,
    /// Extend the remaining time: expiry grows by `duration`
    Accumulate,
}

/// How events drive the skill
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerMode {
    /// The trigger event releases the skill immediately
    #[default]
    Instance,
    /// The prepare event arms the skill; the trigger event then releases it
    /// and any cancel event disarms it
    Prepared,
}

fn default_max_charges() -> u32 {
    1
}

/// Immutable template for one skill
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkillDefinition {
    /// Unique ID of the skill
    pub id: String,
    /// Display name (for UI usage)
    #[serde(default)]
    pub name: String,
    /// Detailed description (for UI usage)
    #[serde(default)]
    pub description: String,
    /// Seconds for one charge to replenish
    #[serde(default)]
    pub cooldown: f64,
    /// Maximum number of stored charges
    #[serde(default = "default_max_charges")]
    pub max_charges: u32,
    /// Seconds the effect lasts once activated
    #[serde(default)]
    pub duration: f64,
    /// Seconds between `on_continue` calls
    #[serde(default)]
    pub tick_interval: f64,
    #[serde(default)]
    pub effect_type: EffectType,
    #[serde(default)]
    pub duration_policy: DurationPolicy,
    #[serde(default)]
    pub trigger_mode: TriggerMode,
    /// Event that releases the skill
    #[serde(default)]
    pub trigger_event: String,
    /// Event that arms a prepared skill
    #[serde(default)]
    pub prepare_event: Option<String>,
    /// Events that disarm a prepared skill
    #[serde(default)]
    pub cancel_events: Vec<String>,
    /// Skills that must be registered on the same owner before this one unlocks
    #[serde(default)]
    pub prerequisites: Vec<String>,
}

impl SkillDefinition {
    /// An instantly triggered skill with one charge and no cooldown
    pub fn instant(id: impl Into<String>, trigger_event: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: String::new(),
            description: String::new(),
            cooldown: 0.0,
            max_charges: 1,
            duration: 0.0,
            tick_interval: 0.0,
            effect_type: EffectType::OnBoundary,
            duration_policy: DurationPolicy::Overlay,
            trigger_mode: TriggerMode::Instance,
            trigger_event: trigger_event.into(),
            prepare_event: None,
            cancel_events: Vec::new(),
            prerequisites: Vec::new(),
        }
    }

    /// A two-phase skill: prepare, then trigger or cancel
    pub fn prepared<I, S>(
        id: impl Into<String>,
        prepare_event: impl Into<String>,
        trigger_event: impl Into<String>,
        cancel_events: I,
    ) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            trigger_mode: TriggerMode::Prepared,
            prepare_event: Some(prepare_event.into()),
            cancel_events: cancel_events.into_iter().map(Into::into).collect(),
            ..Self::instant(id, trigger_event)
        }
    }

    pub fn with_cooldown(mut self, cooldown: f64) -> Self {
        self.cooldown = cooldown;
        self
    }

    pub fn with_charges(mut self, max_charges: u32) -> Self {
        self.max_charges = max_charges;
        self
    }

    pub fn with_duration(mut self, duration: f64, policy: DurationPolicy) -> Self {
        self.duration = duration;
        self.duration_policy = policy;
        self
    }

    pub fn with_ticks(mut self, effect_type: EffectType, tick_interval: f64) -> Self {
        self.effect_type = effect_type;
        self.tick_interval = tick_interval;
        self
    }

    pub fn with_prerequisites<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.prerequisites = ids.into_iter().map(Into::into).collect();
        self
    }

    /// Every event name this skill may bind, with the prepare and cancel
    /// events included only in prepared mode.
    pub fn event_names(&self) -> Vec<&str> {
        let mut names = vec![self.trigger_event.as_str()];
        if self.trigger_mode == TriggerMode::Prepared {
            names.extend(self.prepare_event.as_deref());
            names.extend(self.cancel_events.iter().map(String::as_str));
        }
        names
    }

    /// The timing parameters the scheduler needs for one activation
    pub fn effect_spec(&self) -> EffectSpec {
        EffectSpec {
            skill_id: self.id.clone(),
            effect_type: self.effect_type,
            duration_policy: self.duration_policy,
            duration: self.duration,
            tick_interval: self.tick_interval,
        }
    }

    /// Check the definition for configuration errors.
    pub fn validate(&self) -> Result<(), SkillError> {
        if self.id.trim().is_empty() {
            return Err(SkillError::InvalidDefinition {
                id: self.id.clone(),
                reason: "id must not be empty".into(),
            });
        }
        if self.trigger_event.is_empty() {
            return Err(SkillError::MissingTriggerEvent(self.id.clone()));
        }
        if self.max_charges == 0 {
            return Err(self.invalid("max_charges must be at least 1"));
        }
        for (field, value) in [
            ("cooldown", self.cooldown),
            ("duration", self.duration),
            ("tick_interval", self.tick_interval),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(self.invalid(&format!("{field} must be a finite, non-negative number")));
            }
        }
        if self.prerequisites.iter().any(|p| p == &self.id) {
            return Err(self.invalid("a skill cannot be its own prerequisite"));
        }

        if self.trigger_mode == TriggerMode::Prepared {
            match self.prepare_event.as_deref() {
                Some(name) if !name.is_empty() => {}
                _ => return Err(SkillError::MissingPrepareEvent(self.id.clone())),
            }
            if self.cancel_events.is_empty() || self.cancel_events.iter().any(String::is_empty) {
                return Err(SkillError::MissingCancelEvents(self.id.clone()));
            }
        }
        Ok(())
    }

    fn invalid(&self, reason: &str) -> SkillError {
        SkillError::InvalidDefinition {
            id: self.id.clone(),
            reason: reason.to_string(),
        }
    }
}

/// Timing parameters copied out of a definition for one scheduler call
#[derive(Debug, Clone, PartialEq)]
pub struct EffectSpec {
    pub skill_id: String,
    pub effect_type: EffectType,
    pub duration_policy: DurationPolicy,
    pub duration: f64,
    pub tick_interval: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_instant_defaults_are_valid() {
        let def = SkillDefinition::instant("fireball", "skill_1");
        assert!(def.validate().is_ok());
        assert_eq!(def.event_names(), vec!["skill_1"]);
    }

    #[test]
    fn test_prepared_event_names() {
        let def = SkillDefinition::prepared("snipe", "aim", "fire", ["move", "hurt"]);
        assert!(def.validate().is_ok());
        assert_eq!(def.event_names(), vec!["fire", "aim", "move", "hurt"]);
    }

    #[test]
    fn test_prepared_without_prepare_event() {
        let mut def = SkillDefinition::prepared("snipe", "aim", "fire", ["move"]);
        def.prepare_event = None;
        assert!(matches!(def.validate(), Err(SkillError::MissingPrepareEvent(id)) if id == "snipe"));
    }

    #[test]
    fn test_prepared_without_cancel_events() {
        let def = SkillDefinition::prepared("snipe", "aim", "fire", Vec::<String>::new());
        assert!(matches!(def.validate(), Err(SkillError::MissingCancelEvents(_))));
    }

    #[test]
    fn test_instance_mode_ignores_prepare_fields() {
        let mut def = SkillDefinition::instant("dash", "skill_2");
        def.prepare_event = Some("unused".into());
        assert!(def.validate().is_ok());
        assert_eq!(def.event_names(), vec!["skill_2"]);
    }

    #[test]
    fn test_invalid_numbers() {
        let def = SkillDefinition::instant("dash", "skill_2").with_charges(0);
        assert!(matches!(def.validate(), Err(SkillError::InvalidDefinition { .. })));

        let def = SkillDefinition::instant("dash", "skill_2").with_cooldown(-1.0);
        assert!(matches!(def.validate(), Err(SkillError::InvalidDefinition { .. })));

        let def = SkillDefinition::instant("dash", "skill_2").with_duration(f64::NAN, DurationPolicy::Overlay);
        assert!(matches!(def.validate(), Err(SkillError::InvalidDefinition { .. })));
    }

    #[test]
    fn test_missing_trigger_event() {
        let def = SkillDefinition::instant("dash", "");
        assert!(matches!(def.validate(), Err(SkillError::MissingTriggerEvent(_))));
    }

    #[test]
    fn test_self_prerequisite() {
        let def = SkillDefinition::instant("dash", "skill_2").with_prerequisites(["dash"]);
        assert!(def.validate().is_err());
    }

    #[test]
    fn test_effect_type_ticks() {
        assert!(!EffectType::OnBoundary.ticks());
        assert!(EffectType::OnTick.ticks());
        assert!(EffectType::Both.ticks());
    }
}
