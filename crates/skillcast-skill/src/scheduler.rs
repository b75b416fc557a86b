//! Active effect scheduler
//!
//! Owns the running effect instances of one owner and advances them once per
//! frame. Re-activating a running skill merges into its instance instead of
//! creating a second one.

use tracing::debug;

use crate::definition::{DurationPolicy, EffectSpec, EffectType};
use crate::logic::Activation;

/// A running effect of one skill
#[derive(Debug, Clone, PartialEq)]
pub struct ActiveEffect {
    pub skill_id: String,
    pub effect_type: EffectType,
    pub tick_interval: f64,
    /// The effect ends on the first tick after this time
    pub expires_at: f64,
    /// Time of the next `on_continue`
    pub next_tick: f64,
    /// Number of activations merged into this instance
    pub stacks: u32,
    /// False while the activation that created it awaits a remote result
    pub settled: bool,
}

impl ActiveEffect {
    /// Seconds left before expiry, never negative
    pub fn remaining(&self, now: f64) -> f64 {
        (self.expires_at - now).max(0.0)
    }

    fn window(&self) -> EffectWindow {
        EffectWindow {
            expires_at: self.expires_at,
            next_tick: self.next_tick,
            stacks: self.stacks,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct EffectWindow {
    expires_at: f64,
    next_tick: f64,
    stacks: u32,
}

/// Receipt of one `add`, used to undo it if the activation fails
#[derive(Debug, Clone, PartialEq)]
pub struct AddTicket {
    pub skill_id: String,
    created: bool,
    previous: Option<EffectWindow>,
    /// `next_tick` as set by a merge
    merged_tick: f64,
}

impl AddTicket {
    /// Whether the activation created the instance rather than merging
    pub fn created(&self) -> bool {
        self.created
    }
}

/// Callback sink of the scheduler. The scheduler never owns skill logic.
pub trait EffectHost {
    fn on_add(&mut self, skill_id: &str, now: f64, existing: Option<&ActiveEffect>) -> Activation;
    fn on_continue(&mut self, skill_id: &str, now: f64);
    fn on_remove(&mut self, skill_id: &str, now: f64);
}

#[derive(Debug, Default)]
pub struct ActiveEffectScheduler {
    effects: Vec<ActiveEffect>,
}

impl ActiveEffectScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start or re-activate the effect described by `spec`.
    ///
    /// The window is applied right away. The caller commits on
    /// `Settled(true)`, calls [`Self::revert`] on `Settled(false)` and parks
    /// a `Pending` activation until it resolves.
    pub fn add(&mut self, spec: &EffectSpec, now: f64, host: &mut dyn EffectHost) -> (Activation, AddTicket) {
        let index = self.effects.iter().position(|e| e.skill_id == spec.skill_id);
        let activation = host.on_add(&spec.skill_id, now, index.map(|i| &self.effects[i]));
        let settled = !matches!(activation, Activation::Pending(_));

        let ticket = match index {
            Some(i) => {
                let effect = &mut self.effects[i];
                let previous = effect.window();
                effect.expires_at = match spec.duration_policy {
                    DurationPolicy::Overlay => now + spec.duration,
                    DurationPolicy::Accumulate => effect.expires_at + spec.duration,
                };
                effect.next_tick = now + spec.tick_interval;
                effect.stacks += 1;
                debug!(
                    "Merged '{}' into running effect, expires at {:.3}",
                    spec.skill_id, effect.expires_at
                );
                AddTicket {
                    skill_id: spec.skill_id.clone(),
                    created: false,
                    previous: Some(previous),
                    merged_tick: effect.next_tick,
                }
            }
            None => {
                self.effects.push(ActiveEffect {
                    skill_id: spec.skill_id.clone(),
                    effect_type: spec.effect_type,
                    tick_interval: spec.tick_interval,
                    expires_at: now + spec.duration,
                    next_tick: now + spec.tick_interval,
                    stacks: 1,
                    settled,
                });
                debug!("Started effect '{}', expires at {:.3}", spec.skill_id, now + spec.duration);
                AddTicket {
                    skill_id: spec.skill_id.clone(),
                    created: true,
                    previous: None,
                    merged_tick: now + spec.tick_interval,
                }
            }
        };

        (activation, ticket)
    }

    /// Undo a failed activation without callbacks.
    pub fn revert(&mut self, ticket: &AddTicket) {
        let Some(index) = self.position(&ticket.skill_id) else {
            return;
        };
        match ticket.previous {
            Some(window) => {
                let effect = &mut self.effects[index];
                effect.expires_at = window.expires_at;
                effect.stacks = window.stacks;
                // Ticks already run on the merged schedule are kept
                if effect.next_tick == ticket.merged_tick {
                    effect.next_tick = window.next_tick;
                }
            }
            None => {
                self.effects.remove(index);
            }
        }
        debug!("Reverted activation of '{}'", ticket.skill_id);
    }

    /// Mark a pending-created instance as running.
    pub fn settle(&mut self, skill_id: &str) {
        if let Some(effect) = self.effects.iter_mut().find(|e| e.skill_id == skill_id) {
            effect.settled = true;
        }
    }

    /// Advance every settled instance to `now`. Returns the ids of the
    /// effects that expired.
    ///
    /// At most one `on_continue` fires per instance per call; a coarse frame
    /// does not catch up on missed ticks.
    pub fn tick(&mut self, now: f64, host: &mut dyn EffectHost) -> Vec<String> {
        let mut expired = Vec::new();
        let mut i = 0;
        while i < self.effects.len() {
            let effect = &mut self.effects[i];
            if !effect.settled {
                i += 1;
                continue;
            }

            if effect.expires_at < now {
                let effect = self.effects.remove(i);
                debug!("Effect '{}' expired", effect.skill_id);
                host.on_remove(&effect.skill_id, now);
                expired.push(effect.skill_id);
                continue;
            }

            if effect.effect_type.ticks() && effect.next_tick <= now {
                effect.next_tick += effect.tick_interval;
                host.on_continue(&effect.skill_id, now);
            }
            i += 1;
        }
        expired
    }

    /// End an effect early. `on_remove` only runs for a settled instance.
    pub fn remove(&mut self, skill_id: &str, now: f64, host: &mut dyn EffectHost) -> bool {
        let Some(index) = self.position(skill_id) else {
            return false;
        };
        let effect = self.effects.remove(index);
        if effect.settled {
            host.on_remove(skill_id, now);
        }
        debug!("Removed effect '{}'", skill_id);
        true
    }

    /// Drop every instance without callbacks.
    pub fn clear(&mut self) {
        self.effects.clear();
    }

    pub fn get(&self, skill_id: &str) -> Option<&ActiveEffect> {
        self.effects.iter().find(|e| e.skill_id == skill_id)
    }

    pub fn len(&self) -> usize {
        self.effects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.effects.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ActiveEffect> {
        self.effects.iter()
    }

    fn position(&self, skill_id: &str) -> Option<usize> {
        self.effects.iter().position(|e| e.skill_id == skill_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::definition::SkillDefinition;
    use serde_json::Value;
    use skillcast_remote::{PendingRequest, Responder};

    #[derive(Default)]
    struct Recorder {
        adds: Vec<(String, bool)>,
        continues: usize,
        removes: Vec<String>,
        accept: bool,
        pending: bool,
        responders: Vec<Responder<Value>>,
    }

    impl Recorder {
        fn accepting() -> Self {
            Self {
                accept: true,
                ..Default::default()
            }
        }
    }

    impl EffectHost for Recorder {
        fn on_add(&mut self, skill_id: &str, _now: f64, existing: Option<&ActiveEffect>) -> Activation {
            self.adds.push((skill_id.to_string(), existing.is_some()));
            if self.pending {
                let (responder, pending) = PendingRequest::channel();
                self.responders.push(responder);
                return Activation::Pending(pending);
            }
            Activation::Settled(self.accept)
        }

        fn on_continue(&mut self, _skill_id: &str, _now: f64) {
            self.continues += 1;
        }

        fn on_remove(&mut self, skill_id: &str, _now: f64) {
            self.removes.push(skill_id.to_string());
        }
    }

    fn spec(policy: DurationPolicy, effect_type: EffectType) -> EffectSpec {
        SkillDefinition::instant("aura", "skill_1")
            .with_duration(2.0, policy)
            .with_ticks(effect_type, 0.5)
            .effect_spec()
    }

    #[test]
    fn test_add_creates_instance() {
        let mut scheduler = ActiveEffectScheduler::new();
        let mut host = Recorder::accepting();

        let (activation, ticket) = scheduler.add(&spec(DurationPolicy::Overlay, EffectType::Both), 1.0, &mut host);
        assert!(matches!(activation, Activation::Settled(true)));
        assert!(ticket.created());

        let effect = scheduler.get("aura").unwrap();
        assert_eq!(effect.expires_at, 3.0);
        assert_eq!(effect.next_tick, 1.5);
        assert!(effect.settled);
        assert_eq!(host.adds, vec![("aura".to_string(), false)]);
    }

    #[test]
    fn test_overlay_replaces_window() {
        let mut scheduler = ActiveEffectScheduler::new();
        let mut host = Recorder::accepting();
        let spec = spec(DurationPolicy::Overlay, EffectType::OnBoundary);

        scheduler.add(&spec, 0.0, &mut host);
        let (_, ticket) = scheduler.add(&spec, 1.0, &mut host);

        assert!(!ticket.created());
        assert_eq!(scheduler.len(), 1);
        assert_eq!(scheduler.get("aura").unwrap().expires_at, 3.0);
        assert_eq!(scheduler.get("aura").unwrap().stacks, 2);
        assert_eq!(host.adds[1], ("aura".to_string(), true));
    }

    #[test]
    fn test_accumulate_extends_window() {
        let mut scheduler = ActiveEffectScheduler::new();
        let mut host = Recorder::accepting();
        let spec = spec(DurationPolicy::Accumulate, EffectType::OnBoundary);

        // A fresh instance starts counting from now
        scheduler.add(&spec, 10.0, &mut host);
        assert_eq!(scheduler.get("aura").unwrap().expires_at, 12.0);

        scheduler.add(&spec, 11.0, &mut host);
        assert_eq!(scheduler.len(), 1);
        assert_eq!(scheduler.get("aura").unwrap().expires_at, 14.0);
    }

    #[test]
    fn test_revert_restores_previous_window() {
        let mut scheduler = ActiveEffectScheduler::new();
        let mut host = Recorder::accepting();
        let spec = spec(DurationPolicy::Accumulate, EffectType::OnBoundary);

        scheduler.add(&spec, 0.0, &mut host);
        host.accept = false;
        let (activation, ticket) = scheduler.add(&spec, 1.0, &mut host);
        assert!(matches!(activation, Activation::Settled(false)));
        scheduler.revert(&ticket);

        let effect = scheduler.get("aura").unwrap();
        assert_eq!(effect.expires_at, 2.0);
        assert_eq!(effect.stacks, 1);
    }

    #[test]
    fn test_late_revert_keeps_tick_schedule() {
        let mut scheduler = ActiveEffectScheduler::new();
        let mut host = Recorder::accepting();
        let spec = spec(DurationPolicy::Accumulate, EffectType::Both);

        scheduler.add(&spec, 0.0, &mut host);
        host.pending = true;
        let (_, ticket) = scheduler.add(&spec, 1.0, &mut host);
        assert_eq!(scheduler.get("aura").unwrap().next_tick, 1.5);

        scheduler.tick(1.5, &mut host);
        assert_eq!(host.continues, 1);

        scheduler.revert(&ticket);
        let effect = scheduler.get("aura").unwrap();
        assert_eq!(effect.expires_at, 2.0);
        assert_eq!(effect.stacks, 1);
        assert_eq!(effect.next_tick, 2.0);

        scheduler.tick(1.6, &mut host);
        assert_eq!(host.continues, 1);
    }

    #[test]
    fn test_revert_drops_created_instance() {
        let mut scheduler = ActiveEffectScheduler::new();
        let mut host = Recorder::default();

        let (_, ticket) = scheduler.add(&spec(DurationPolicy::Overlay, EffectType::Both), 0.0, &mut host);
        scheduler.revert(&ticket);

        assert!(scheduler.is_empty());
        assert!(host.removes.is_empty());
    }

    #[test]
    fn test_tick_continues_then_expires() {
        let mut scheduler = ActiveEffectScheduler::new();
        let mut host = Recorder::accepting();
        scheduler.add(&spec(DurationPolicy::Overlay, EffectType::Both), 0.0, &mut host);

        assert!(scheduler.tick(0.25, &mut host).is_empty());
        assert_eq!(host.continues, 0);

        scheduler.tick(0.5, &mut host);
        assert_eq!(host.continues, 1);

        // A long frame fires a single continue
        scheduler.tick(1.9, &mut host);
        assert_eq!(host.continues, 2);

        // Expiry is strict: still running exactly at expires_at
        scheduler.tick(2.0, &mut host);
        assert_eq!(scheduler.len(), 1);

        let expired = scheduler.tick(2.1, &mut host);
        assert_eq!(expired, vec!["aura".to_string()]);
        assert_eq!(host.removes.len(), 1);
        let continues = host.continues;

        scheduler.tick(2.5, &mut host);
        assert_eq!(host.continues, continues);
        assert_eq!(host.removes.len(), 1);
    }

    #[test]
    fn test_boundary_effect_never_continues() {
        let mut scheduler = ActiveEffectScheduler::new();
        let mut host = Recorder::accepting();
        scheduler.add(&spec(DurationPolicy::Overlay, EffectType::OnBoundary), 0.0, &mut host);

        for step in 1..=25 {
            scheduler.tick(step as f64 * 0.1, &mut host);
        }
        assert_eq!(host.continues, 0);
        assert_eq!(host.removes.len(), 1);
    }

    #[test]
    fn test_unsettled_instances_are_skipped() {
        let mut scheduler = ActiveEffectScheduler::new();
        let mut host = Recorder {
            pending: true,
            ..Default::default()
        };

        let (activation, _) = scheduler.add(&spec(DurationPolicy::Overlay, EffectType::Both), 0.0, &mut host);
        assert!(matches!(activation, Activation::Pending(_)));
        assert!(!scheduler.get("aura").unwrap().settled);

        scheduler.tick(5.0, &mut host);
        assert_eq!(scheduler.len(), 1);
        assert_eq!(host.continues, 0);

        scheduler.settle("aura");
        scheduler.tick(5.0, &mut host);
        assert!(scheduler.is_empty());
        assert_eq!(host.removes.len(), 1);
    }

    #[test]
    fn test_remove_is_immediate() {
        let mut scheduler = ActiveEffectScheduler::new();
        let mut host = Recorder::accepting();
        scheduler.add(&spec(DurationPolicy::Overlay, EffectType::Both), 0.0, &mut host);

        assert!(scheduler.remove("aura", 0.1, &mut host));
        assert!(!scheduler.remove("aura", 0.1, &mut host));
        assert_eq!(host.removes, vec!["aura".to_string()]);
        assert!(scheduler.get("aura").is_none());
    }

    #[test]
    fn test_clear_skips_callbacks() {
        let mut scheduler = ActiveEffectScheduler::new();
        let mut host = Recorder::accepting();
        scheduler.add(&spec(DurationPolicy::Overlay, EffectType::Both), 0.0, &mut host);

        scheduler.clear();
        assert!(scheduler.is_empty());
        assert!(host.removes.is_empty());
    }
}
