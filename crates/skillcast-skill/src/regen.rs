use tracing::debug;

use crate::definition::SkillDefinition;
use crate::state::SkillRuntimeState;

/// Throttled charge replenishment.
///
/// Frame deltas accumulate until `interval` has passed; only then is every
/// skill checked against its cooldown.
#[derive(Debug, Clone, PartialEq)]
pub struct ChargeRegenLoop {
    interval: f32,
    elapsed: f32,
}

impl ChargeRegenLoop {
    pub const DEFAULT_INTERVAL: f32 = 0.1;

    pub fn new(interval: f32) -> Self {
        Self {
            interval: interval.max(0.0),
            elapsed: 0.0,
        }
    }

    pub fn interval(&self) -> f32 {
        self.interval
    }

    /// Accumulate a frame delta. Returns true when a check is due.
    pub fn due(&mut self, delta: f32) -> bool {
        self.elapsed += delta.max(0.0);
        if self.elapsed >= self.interval {
            self.elapsed = 0.0;
            true
        } else {
            false
        }
    }

    /// Regenerate every skill whose cooldown has elapsed. Returns the number
    /// of charges granted.
    pub fn run<'a, I>(&self, skills: I, now: f64) -> usize
    where
        I: IntoIterator<Item = (&'a SkillDefinition, &'a mut SkillRuntimeState)>,
    {
        let mut granted = 0;
        for (definition, state) in skills {
            if regenerate_charge(definition, state, now) {
                granted += 1;
            }
        }
        granted
    }
}

impl Default for ChargeRegenLoop {
    fn default() -> Self {
        Self::new(Self::DEFAULT_INTERVAL)
    }
}

/// Grant one charge once the cooldown has passed and the skill is not full.
/// A cooldown ending exactly at `now` has not passed yet. A skill still below
/// its cap starts the next cooldown.
pub fn regenerate_charge(definition: &SkillDefinition, state: &mut SkillRuntimeState, now: f64) -> bool {
    if state.cooldown_end >= now || state.charges >= definition.max_charges {
        return false;
    }

    state.charges += 1;
    if state.charges < definition.max_charges {
        state.cooldown_end = now + definition.cooldown;
    }
    debug!(
        "Skill '{}' regenerated a charge ({}/{})",
        definition.id, state.charges, definition.max_charges
    );
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    fn def() -> SkillDefinition {
        SkillDefinition::instant("dash", "skill_1")
            .with_charges(3)
            .with_cooldown(2.0)
    }

    #[test]
    fn test_due_is_throttled() {
        let mut regen = ChargeRegenLoop::new(0.1);
        assert!(!regen.due(0.04));
        assert!(!regen.due(0.04));
        assert!(regen.due(0.04));
        assert!(!regen.due(0.04));
    }

    #[test]
    fn test_zero_interval_runs_every_frame() {
        let mut regen = ChargeRegenLoop::new(0.0);
        assert!(regen.due(0.0));
        assert!(regen.due(0.016));
    }

    #[test]
    fn test_waits_for_cooldown() {
        let def = def();
        let mut state = SkillRuntimeState::new(&def, 0.0);
        state.consume_charge(def.cooldown, 0.0);

        assert!(!regenerate_charge(&def, &mut state, 1.0));
        assert!(!regenerate_charge(&def, &mut state, 2.0));
        assert_eq!(state.charges, 2);

        assert!(regenerate_charge(&def, &mut state, 2.1));
        assert_eq!(state.charges, 3);
    }

    #[test]
    fn test_chains_cooldowns_below_cap() {
        let def = def();
        let mut state = SkillRuntimeState::new(&def, 0.0);
        state.charges = 0;
        state.cooldown_end = 1.0;

        assert!(regenerate_charge(&def, &mut state, 1.5));
        assert_eq!(state.charges, 1);
        assert_eq!(state.cooldown_end, 3.5);

        assert!(!regenerate_charge(&def, &mut state, 3.5));
        assert!(regenerate_charge(&def, &mut state, 4.0));
        assert_eq!(state.charges, 2);
        assert_eq!(state.cooldown_end, 6.0);
    }

    #[test]
    fn test_zero_cooldown_waits_for_the_next_check() {
        let def = SkillDefinition::instant("tap", "skill_1");
        let mut state = SkillRuntimeState::new(&def, 0.0);
        state.consume_charge(def.cooldown, 0.1);
        assert_eq!(state.cooldown_end, 0.1);

        assert!(!regenerate_charge(&def, &mut state, 0.1));
        assert_eq!(state.charges, 0);
        assert!(regenerate_charge(&def, &mut state, 0.2));
        assert_eq!(state.charges, 1);
    }

    #[test]
    fn test_full_skill_is_untouched() {
        let def = def();
        let mut state = SkillRuntimeState::new(&def, 0.0);
        assert!(!regenerate_charge(&def, &mut state, 100.0));
        assert_eq!(state.charges, 3);
        assert_eq!(state.cooldown_end, 0.0);
    }

    #[test]
    fn test_run_counts_grants() {
        let a = def();
        let b = SkillDefinition::instant("blink", "skill_2").with_cooldown(1.0);
        let mut state_a = SkillRuntimeState::new(&a, 0.0);
        let mut state_b = SkillRuntimeState::new(&b, 0.0);
        state_a.consume_charge(a.cooldown, 0.0);
        state_b.consume_charge(b.cooldown, 0.0);

        let regen = ChargeRegenLoop::default();
        let granted = regen.run([(&a, &mut state_a), (&b, &mut state_b)], 1.5);
        assert_eq!(granted, 1);
        assert_eq!(state_a.charges, 2);
        assert_eq!(state_b.charges, 1);
    }
}
