//! Demo skills, the scripted input timeline and the simulated authority

use std::collections::VecDeque;
use std::time::Duration;

use rand::Rng;
use serde_json::json;
use skillcast_remote::{RemoteCall, Transport, TransportFuture};
use skillcast_skill::{
    ActiveEffect, Activation, LogicLibrary, NoopLogic, SkillContext, SkillLogic,
};
use tracing::{debug, info, warn};

use crate::settings::RemoteSettings;

/// Skills used when no catalog file is configured
pub const DEFAULT_CATALOG: &str = r#"
[[skills]]
id = "fireball"
name = "Fireball"
description = "Hurls a ball of fire. Two charges."
cooldown = 3.0
max_charges = 2
duration = 0.5
trigger_event = "skill_1"

[[skills]]
id = "channel"
name = "Channel"
description = "Pulses healing while it lasts. Re-casting extends it."
cooldown = 1.0
max_charges = 2
duration = 2.0
tick_interval = 0.25
effect_type = "both"
duration_policy = "accumulate"
trigger_event = "skill_2"

[[skills]]
id = "snipe"
name = "Snipe"
description = "Aim, then fire. Moving or taking damage breaks the aim."
cooldown = 4.0
duration = 0.2
trigger_mode = "prepared"
prepare_event = "aim"
trigger_event = "fire"
cancel_events = ["move", "hurt"]

[[skills]]
id = "strike"
name = "Orbital Strike"
description = "Confirmed by the server. Requires Fireball."
cooldown = 2.0
duration = 1.0
trigger_event = "skill_3"
prerequisites = ["fireball"]
"#;

/// Logic constructors for the built-in catalog
pub fn logic_library() -> LogicLibrary {
    LogicLibrary::new()
        .with("fireball", || Blast)
        .with("channel", Channel::default)
        .with("snipe", || Snipe)
        .with("strike", || RemoteStrike)
        .with_fallback(|| NoopLogic)
}

/// A one-shot effect
struct Blast;

impl SkillLogic for Blast {
    fn on_add(&mut self, ctx: &SkillContext<'_>, existing: Option<&ActiveEffect>) -> Activation {
        match existing {
            Some(effect) => info!("{} blast refreshed ({} stacked)", ctx.skill_id, effect.stacks + 1),
            None => info!("{} blast at {:.2}s", ctx.skill_id, ctx.now),
        }
        Activation::success()
    }

    fn on_remove(&mut self, ctx: &SkillContext<'_>) {
        debug!("{} blast faded", ctx.skill_id);
    }
}

/// A ticking effect that counts its pulses
#[derive(Default)]
struct Channel {
    pulses: u32,
}

impl SkillLogic for Channel {
    fn on_add(&mut self, ctx: &SkillContext<'_>, existing: Option<&ActiveEffect>) -> Activation {
        if existing.is_none() {
            self.pulses = 0;
        }
        info!("{} channelling", ctx.skill_id);
        Activation::success()
    }

    fn on_continue(&mut self, ctx: &SkillContext<'_>) {
        self.pulses += 1;
        debug!("{} pulse {}", ctx.skill_id, self.pulses);
    }

    fn on_remove(&mut self, ctx: &SkillContext<'_>) {
        info!("{} ended after {} pulses", ctx.skill_id, self.pulses);
    }
}

struct Snipe;

impl SkillLogic for Snipe {
    fn prepare_action(&mut self, ctx: &SkillContext<'_>) {
        info!("{} aiming", ctx.skill_id);
    }

    fn on_add(&mut self, ctx: &SkillContext<'_>, _existing: Option<&ActiveEffect>) -> Activation {
        info!("{} fired", ctx.skill_id);
        Activation::success()
    }
}

/// Waits for the authority to confirm the strike
struct RemoteStrike;

impl SkillLogic for RemoteStrike {
    fn on_add(&mut self, ctx: &SkillContext<'_>, _existing: Option<&ActiveEffect>) -> Activation {
        match ctx.rpc_call("Strike", vec![json!(ctx.now)]) {
            Ok(request) => {
                info!("{} requested from the authority", ctx.skill_id);
                Activation::Pending(request)
            }
            Err(e) => {
                warn!("{}", e);
                Activation::failure()
            }
        }
    }

    fn on_remove(&mut self, ctx: &SkillContext<'_>) {
        info!("{} landed", ctx.skill_id);
    }
}

/// A transport that answers every call after a random delay
pub fn simulated_authority(settings: &RemoteSettings) -> impl Transport {
    let min = settings.min_latency_ms;
    let max = settings.max_latency_ms.max(min);
    move |call: RemoteCall| -> TransportFuture {
        let latency = rand::thread_rng().gen_range(min..=max);
        Box::pin(async move {
            tokio::time::sleep(Duration::from_millis(latency)).await;
            debug!("Authority confirmed {}::{} after {}ms", call.skill_id, call.method, latency);
            Ok(json!(true))
        })
    }
}

/// Timed input events
pub struct Script {
    steps: VecDeque<(f64, String)>,
}

impl Script {
    pub fn new<I, S>(steps: I) -> Self
    where
        I: IntoIterator<Item = (f64, S)>,
        S: Into<String>,
    {
        let mut steps: Vec<(f64, String)> = steps.into_iter().map(|(t, e)| (t, e.into())).collect();
        steps.sort_by(|a, b| a.0.total_cmp(&b.0));
        Self {
            steps: steps.into(),
        }
    }

    /// The input timeline the demo plays
    pub fn demo() -> Self {
        Self::new([
            (0.2, "skill_3"),
            (0.5, "skill_1"),
            (0.7, "skill_1"),
            (0.9, "skill_1"),
            (1.2, "skill_2"),
            (1.8, "skill_2"),
            (2.5, "aim"),
            (2.8, "move"),
            (3.2, "aim"),
            (3.3, "aim"),
            (3.8, "fire"),
            (4.0, "fire"),
            (4.5, "skill_3"),
            (4.6, "skill_3"),
            (6.0, "skill_1"),
            (7.0, "skill_3"),
        ])
    }

    /// Pop every event scheduled at or before `now`.
    pub fn due(&mut self, now: f64) -> Vec<String> {
        let mut events = Vec::new();
        while self.steps.front().is_some_and(|(t, _)| *t <= now) {
            if let Some((_, event)) = self.steps.pop_front() {
                events.push(event);
            }
        }
        events
    }

    pub fn is_finished(&self) -> bool {
        self.steps.is_empty()
    }
}
