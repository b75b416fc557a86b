//! Per-owner runtime state and the status snapshot
//!
//! Charges and cooldowns are instantiated fresh from the definition whenever
//! a skill is registered on an owner; no two owners share a state value.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::definition::SkillDefinition;

/// Mutable bookkeeping of one skill on one owner
#[derive(Debug, Clone, PartialEq)]
pub struct SkillRuntimeState {
    /// Charges left, always within `[0, max_charges]`
    pub charges: u32,
    /// Absolute time at which the next depleted charge replenishes
    pub cooldown_end: f64,
    /// Armed between a successful prepare and a consume or cancel
    pub prepared: bool,
    /// Identifies the current preparation cycle. Advanced whenever a cycle ends.
    pub prepare_cycle: u64,
    /// Whether every prerequisite is registered on the same owner
    pub unlocked: bool,
}

impl SkillRuntimeState {
    pub fn new(definition: &SkillDefinition, now: f64) -> Self {
        Self {
            charges: definition.max_charges,
            cooldown_end: now,
            prepared: false,
            prepare_cycle: 0,
            unlocked: definition.prerequisites.is_empty(),
        }
    }

    pub fn has_charge(&self) -> bool {
        self.charges > 0
    }

    /// Spend one charge. The cooldown timer only restarts when it is not
    /// already running, so queued charges replenish one after another.
    pub fn consume_charge(&mut self, cooldown: f64, now: f64) -> bool {
        if self.charges == 0 {
            return false;
        }
        self.charges -= 1;
        if self.cooldown_end <= now {
            self.cooldown_end = now + cooldown;
        }
        true
    }

    /// Seconds until the running cooldown ends. Negative once it has elapsed.
    pub fn remaining_cooldown(&self, now: f64) -> f64 {
        self.cooldown_end - now
    }

    /// End the current preparation cycle.
    pub fn end_cycle(&mut self) {
        self.prepared = false;
        self.prepare_cycle += 1;
    }

    pub fn status(&self, now: f64) -> SkillStatus {
        SkillStatus {
            charges: self.charges,
            remaining_cooldown: self.remaining_cooldown(now),
        }
    }

    /// Apply an authoritative status. Charges are clamped to `max_charges`.
    pub fn restore(&mut self, status: &SkillStatus, max_charges: u32, now: f64) {
        self.charges = status.charges.min(max_charges);
        self.cooldown_end = now + status.remaining_cooldown;
    }
}

/// Externally visible state of one skill
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SkillStatus {
    pub charges: u32,
    pub remaining_cooldown: f64,
}

/// Status of every skill on an owner, keyed by skill id
pub type SkillStatusMap = BTreeMap<String, SkillStatus>;
