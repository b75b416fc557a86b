//! Trigger router
//!
//! Binds named events to the skills of one owner and owns their charge and
//! cooldown economy. Incoming events are resolved to handler handles, checked
//! against the guards, and forwarded to the [`ActiveEffectScheduler`].
//!
//! Activations that wait on a remote result are parked and committed in
//! [`TriggerRouter::update`], where the guards are checked again.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use serde_json::Value;
use skillcast_core::FrameClock;
use skillcast_events::{EventError, EventRegistry};
use skillcast_remote::{PendingRequest, RemoteError, RemoteSkillAgent};
use tracing::{debug, info, warn};

use crate::config::OwnerConfig;
use crate::definition::{SkillDefinition, TriggerMode};
use crate::error::{Rejection, SkillError};
use crate::logic::{Activation, SkillContext, SkillLogic};
use crate::regen::ChargeRegenLoop;
use crate::scheduler::{ActiveEffect, ActiveEffectScheduler, AddTicket, EffectHost};
use crate::state::{SkillRuntimeState, SkillStatusMap};

/// What a handler does when its event fires
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HandlerRole {
    /// Instance trigger: activate right away
    Activate,
    /// Arm a prepared skill
    Prepare,
    /// Release an armed skill
    PreparedActivate,
    /// Disarm an armed skill
    Cancel,
}

/// Handle bound to an event name. Equality identifies the binding, so a
/// skill can unbind exactly what it bound.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SkillHandler {
    pub skill_id: String,
    pub role: HandlerRole,
}

impl SkillHandler {
    pub fn new(skill_id: impl Into<String>, role: HandlerRole) -> Self {
        Self {
            skill_id: skill_id.into(),
            role,
        }
    }
}

/// Result of one handler run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The activation succeeded and was charged
    Activated,
    /// The activation awaits a remote result
    Pending,
    /// The skill logic refused the activation. Nothing was charged.
    Failed,
    Prepared,
    Cancelled,
    Rejected(Rejection),
}

/// One handler invocation caused by [`TriggerRouter::invoke`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dispatch {
    pub skill_id: String,
    pub role: HandlerRole,
    pub outcome: Outcome,
}

/// What happened during one [`TriggerRouter::update`]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrameReport {
    /// Pending activations that succeeded and were charged
    pub committed: Vec<String>,
    /// Pending activations that failed or errored
    pub failed: Vec<String>,
    /// Late successes withdrawn because the guards no longer held
    pub withdrawn: Vec<String>,
    /// Effects that ran out this frame
    pub expired: Vec<String>,
    /// Charges granted by regeneration
    pub regenerated: usize,
}

/// Callback receiving forwarded event names in non-local mode
pub type EventHook = Box<dyn FnMut(&str) + Send>;

struct SkillEntry {
    definition: SkillDefinition,
    state: SkillRuntimeState,
    logic: Box<dyn SkillLogic>,
}

struct InFlight {
    skill_id: String,
    request: PendingRequest<Value>,
    ticket: AddTicket,
    /// Preparation cycle the activation belongs to
    cycle: Option<u64>,
}

/// Routes scheduler callbacks to the skill logic
struct LogicHost<'a> {
    skills: &'a mut HashMap<String, SkillEntry>,
    remote: Option<&'a dyn RemoteSkillAgent>,
}

impl EffectHost for LogicHost<'_> {
    fn on_add(&mut self, skill_id: &str, now: f64, existing: Option<&ActiveEffect>) -> Activation {
        match self.skills.get_mut(skill_id) {
            Some(entry) => entry
                .logic
                .on_add(&SkillContext::new(skill_id, now, self.remote), existing),
            None => Activation::failure(),
        }
    }

    fn on_continue(&mut self, skill_id: &str, now: f64) {
        if let Some(entry) = self.skills.get_mut(skill_id) {
            entry.logic.on_continue(&SkillContext::new(skill_id, now, self.remote));
        }
    }

    fn on_remove(&mut self, skill_id: &str, now: f64) {
        if let Some(entry) = self.skills.get_mut(skill_id) {
            entry.logic.on_remove(&SkillContext::new(skill_id, now, self.remote));
        }
    }
}

/// The skills of one owner and everything that drives them
pub struct TriggerRouter {
    skills: HashMap<String, SkillEntry>,
    /// Registration order
    order: Vec<String>,
    events: EventRegistry<SkillHandler>,
    scheduler: ActiveEffectScheduler,
    regen: ChargeRegenLoop,
    in_flight: Vec<InFlight>,
    remote: Option<Arc<dyn RemoteSkillAgent>>,
    event_hook: Option<EventHook>,
    local: bool,
    now: f64,
}

impl TriggerRouter {
    pub fn new(config: &OwnerConfig) -> Self {
        Self::starting_at(config, 0.0)
    }

    /// Create a router whose clock starts at `now`.
    pub fn starting_at(config: &OwnerConfig, now: f64) -> Self {
        Self {
            skills: HashMap::new(),
            order: Vec::new(),
            events: EventRegistry::with_catalog(config.event_catalog()),
            scheduler: ActiveEffectScheduler::new(),
            regen: ChargeRegenLoop::new(config.cd_detection_interval),
            in_flight: Vec::new(),
            remote: None,
            event_hook: None,
            local: config.local,
            now,
        }
    }

    pub fn with_remote_agent(mut self, agent: Arc<dyn RemoteSkillAgent>) -> Self {
        self.remote = Some(agent);
        self
    }

    pub fn set_remote_agent(&mut self, agent: Option<Arc<dyn RemoteSkillAgent>>) {
        self.remote = agent;
    }

    pub fn remote_agent(&self) -> Option<&Arc<dyn RemoteSkillAgent>> {
        self.remote.as_ref()
    }

    /// Switch between local execution and forwarding to the event hook.
    ///
    /// Leaving local mode drops every pending activation uncharged; from then
    /// on charges and cooldowns only change through [`Self::set_status`].
    pub fn set_local(&mut self, local: bool) {
        if self.local != local {
            info!("Skill router switched to {} mode", if local { "local" } else { "remote" });
        }
        self.local = local;
        if !local {
            let pending: Vec<String> = self.in_flight.iter().map(|f| f.skill_id.clone()).collect();
            for skill_id in pending {
                self.abandon_in_flight(&skill_id);
            }
        }
    }

    pub fn is_local(&self) -> bool {
        self.local
    }

    /// Receive event names while the router is not local.
    pub fn set_event_hook(&mut self, hook: impl FnMut(&str) + Send + 'static) {
        self.event_hook = Some(Box::new(hook));
    }

    // Registration

    /// Register a skill with its logic and bind its entry event.
    pub fn register(&mut self, definition: SkillDefinition, logic: Box<dyn SkillLogic>) -> Result<(), SkillError> {
        definition.validate()?;
        if self.skills.contains_key(&definition.id) {
            return Err(SkillError::DuplicateSkill(definition.id));
        }
        if let Some(name) = definition.event_names().into_iter().find(|n| !self.events.is_known(n)) {
            return Err(EventError::UnknownEvent(name.to_string()).into());
        }

        let id = definition.id.clone();
        match definition.trigger_mode {
            TriggerMode::Instance => {
                self.events
                    .register(&definition.trigger_event, SkillHandler::new(&id, HandlerRole::Activate))?;
            }
            TriggerMode::Prepared => {
                let prepare = definition
                    .prepare_event
                    .as_deref()
                    .ok_or_else(|| SkillError::MissingPrepareEvent(id.clone()))?;
                self.events
                    .register(prepare, SkillHandler::new(&id, HandlerRole::Prepare))?;
            }
        }

        let state = SkillRuntimeState::new(&definition, self.now);
        self.skills.insert(
            id.clone(),
            SkillEntry {
                definition,
                state,
                logic,
            },
        );
        self.order.push(id.clone());
        self.refresh_locks();

        if let Some(entry) = self.skills.get_mut(&id) {
            entry
                .logic
                .on_init(&SkillContext::new(&id, self.now, self.remote.as_deref()));
        }
        info!("Registered skill '{}'", id);
        Ok(())
    }

    /// Remove a skill. A running effect ends through `on_remove`, pending
    /// activations are dropped uncharged.
    pub fn unregister(&mut self, skill_id: &str) -> bool {
        if !self.skills.contains_key(skill_id) {
            return false;
        }

        self.abandon_in_flight(skill_id);
        let mut host = LogicHost {
            skills: &mut self.skills,
            remote: self.remote.as_deref(),
        };
        self.scheduler.remove(skill_id, self.now, &mut host);
        self.events.unregister_where(|h| h.skill_id == skill_id);

        self.skills.remove(skill_id);
        self.order.retain(|id| id != skill_id);
        self.refresh_locks();
        info!("Unregistered skill '{}'", skill_id);
        true
    }

    /// Drop every skill, binding and pending activation. Running effects are
    /// discarded without callbacks.
    pub fn clear(&mut self) {
        self.events.clear();
        self.in_flight.clear();
        self.scheduler.clear();
        self.skills.clear();
        self.order.clear();
        debug!("Cleared skill router");
    }

    // Events

    /// Fire a named event.
    ///
    /// Handlers run in registration order over a snapshot of the bindings. A
    /// handler unbound by an earlier one in the same dispatch is skipped.
    pub fn invoke(&mut self, event: &str) -> Vec<Dispatch> {
        if !self.local {
            match self.event_hook.as_mut() {
                Some(hook) => hook(event),
                None => warn!("Event '{}' dropped: remote mode without an event hook", event),
            }
            return Vec::new();
        }

        let mut dispatches = Vec::new();
        for handler in self.events.handlers(event) {
            if !self.events.contains(event, &handler) {
                continue;
            }
            let outcome = match handler.role {
                HandlerRole::Activate => self.activate(&handler.skill_id, None),
                HandlerRole::Prepare => self.prepare(&handler.skill_id),
                HandlerRole::PreparedActivate => self.prepared_activate(&handler.skill_id),
                HandlerRole::Cancel => self.cancel(&handler.skill_id),
            };
            if let Outcome::Rejected(reason) = outcome {
                warn!("Skill '{}' ignored '{}': {}", handler.skill_id, event, reason);
            }
            dispatches.push(Dispatch {
                skill_id: handler.skill_id,
                role: handler.role,
                outcome,
            });
        }
        dispatches
    }

    fn activate(&mut self, skill_id: &str, cycle: Option<u64>) -> Outcome {
        let Some(entry) = self.skills.get(skill_id) else {
            return Outcome::Failed;
        };
        if !entry.state.unlocked {
            return Outcome::Rejected(Rejection::PrerequisitesUnmet);
        }
        if self.in_flight.iter().any(|f| f.skill_id == skill_id) {
            return Outcome::Rejected(Rejection::ActivationInFlight);
        }
        if !entry.state.has_charge() {
            return Outcome::Rejected(Rejection::ResourceUnavailable);
        }

        let spec = entry.definition.effect_spec();
        let mut host = LogicHost {
            skills: &mut self.skills,
            remote: self.remote.as_deref(),
        };
        let (activation, ticket) = self.scheduler.add(&spec, self.now, &mut host);

        match activation {
            Activation::Settled(true) => {
                self.commit(skill_id);
                Outcome::Activated
            }
            Activation::Settled(false) => {
                self.scheduler.revert(&ticket);
                debug!("Skill '{}' refused activation", skill_id);
                Outcome::Failed
            }
            Activation::Pending(request) => {
                debug!("Skill '{}' activation pending", skill_id);
                self.in_flight.push(InFlight {
                    skill_id: skill_id.to_string(),
                    request,
                    ticket,
                    cycle,
                });
                Outcome::Pending
            }
        }
    }

    fn prepare(&mut self, skill_id: &str) -> Outcome {
        let Some(entry) = self.skills.get_mut(skill_id) else {
            return Outcome::Failed;
        };
        if !entry.state.unlocked {
            return Outcome::Rejected(Rejection::PrerequisitesUnmet);
        }
        if entry.state.prepared {
            return Outcome::Rejected(Rejection::DuplicatePrepare);
        }
        if !entry.state.has_charge() {
            return Outcome::Rejected(Rejection::ResourceUnavailable);
        }

        entry.state.prepared = true;
        let bindings = std::iter::once((entry.definition.trigger_event.as_str(), HandlerRole::PreparedActivate))
            .chain(
                entry
                    .definition
                    .cancel_events
                    .iter()
                    .map(|name| (name.as_str(), HandlerRole::Cancel)),
            );
        for (name, role) in bindings {
            if let Err(e) = self.events.register(name, SkillHandler::new(skill_id, role)) {
                warn!("Skill '{}' could not bind '{}': {}", skill_id, name, e);
            }
        }

        entry
            .logic
            .prepare_action(&SkillContext::new(skill_id, self.now, self.remote.as_deref()));
        debug!("Skill '{}' prepared (cycle {})", skill_id, entry.state.prepare_cycle);
        Outcome::Prepared
    }

    fn prepared_activate(&mut self, skill_id: &str) -> Outcome {
        let cycle = self.skills.get(skill_id).map(|e| e.state.prepare_cycle);
        let outcome = self.activate(skill_id, cycle);
        match outcome {
            // The running activation ends the cycle when it settles
            Outcome::Pending | Outcome::Rejected(Rejection::ActivationInFlight) => {}
            _ => self.end_preparation(skill_id),
        }
        outcome
    }

    fn cancel(&mut self, skill_id: &str) -> Outcome {
        self.end_preparation(skill_id);
        debug!("Skill '{}' preparation cancelled", skill_id);
        Outcome::Cancelled
    }

    /// Unbind the trigger and cancel handlers of the current preparation
    /// cycle and start a new one.
    fn end_preparation(&mut self, skill_id: &str) {
        let Some(entry) = self.skills.get_mut(skill_id) else {
            return;
        };
        if !entry.state.prepared {
            return;
        }
        self.events.unregister(
            &entry.definition.trigger_event,
            &SkillHandler::new(skill_id, HandlerRole::PreparedActivate),
        );
        let cancel = SkillHandler::new(skill_id, HandlerRole::Cancel);
        for name in &entry.definition.cancel_events {
            self.events.unregister(name, &cancel);
        }
        entry.state.end_cycle();
    }

    fn commit(&mut self, skill_id: &str) {
        let Some(entry) = self.skills.get_mut(skill_id) else {
            return;
        };
        entry.state.consume_charge(entry.definition.cooldown, self.now);
        info!(
            "Skill '{}' activated ({}/{} charges left)",
            skill_id, entry.state.charges, entry.definition.max_charges
        );
    }

    // Frame update

    /// Advance the router to the clock's current frame.
    pub fn update(&mut self, clock: &FrameClock) -> FrameReport {
        self.update_at(clock.now(), clock.delta_time)
    }

    /// Advance the router to `now`; `delta` feeds the regeneration throttle.
    pub fn update_at(&mut self, now: f64, delta: f32) -> FrameReport {
        self.now = now;
        let mut report = FrameReport::default();

        self.poll_in_flight(&mut report);

        let mut host = LogicHost {
            skills: &mut self.skills,
            remote: self.remote.as_deref(),
        };
        report.expired = self.scheduler.tick(now, &mut host);

        if self.local && self.regen.due(delta) {
            report.regenerated = self
                .regen
                .run(self.skills.values_mut().map(|e| (&e.definition, &mut e.state)), now);
        }
        report
    }

    fn poll_in_flight(&mut self, report: &mut FrameReport) {
        let mut i = 0;
        while i < self.in_flight.len() {
            match self.in_flight[i].request.try_recv() {
                None => i += 1,
                Some(result) => {
                    let flight = self.in_flight.remove(i);
                    self.settle(flight, result, report);
                }
            }
        }
    }

    /// Commit point of an asynchronous activation.
    fn settle(&mut self, flight: InFlight, result: Result<Value, RemoteError>, report: &mut FrameReport) {
        let succeeded = match &result {
            Ok(Value::Bool(false)) => false,
            Ok(_) => true,
            Err(e) => {
                warn!("Skill '{}' remote activation failed: {}", flight.skill_id, e);
                false
            }
        };

        if !succeeded {
            self.scheduler.revert(&flight.ticket);
            self.finish_cycle(&flight);
            report.failed.push(flight.skill_id);
            return;
        }

        let stale = match self.skills.get(&flight.skill_id) {
            None => Some("skill is gone"),
            Some(entry) if !entry.state.unlocked => Some("prerequisites lost"),
            Some(entry) if !entry.state.has_charge() => Some("no charge left"),
            Some(entry) if flight.cycle.is_some_and(|c| c != entry.state.prepare_cycle) => {
                Some("preparation ended")
            }
            Some(_) => None,
        };
        if let Some(reason) = stale {
            warn!("Withdrawing late activation of '{}': {}", flight.skill_id, reason);
            self.withdraw(&flight.ticket);
            report.withdrawn.push(flight.skill_id);
            return;
        }

        self.scheduler.settle(&flight.skill_id);
        self.commit(&flight.skill_id);
        self.finish_cycle(&flight);
        report.committed.push(flight.skill_id);
    }

    /// End the preparation cycle an activation belongs to, if still current.
    fn finish_cycle(&mut self, flight: &InFlight) {
        let Some(cycle) = flight.cycle else {
            return;
        };
        let current = self
            .skills
            .get(&flight.skill_id)
            .is_some_and(|e| e.state.prepare_cycle == cycle);
        if current {
            self.end_preparation(&flight.skill_id);
        }
    }

    /// Take back an effect whose `on_add` succeeded but must not be charged.
    fn withdraw(&mut self, ticket: &AddTicket) {
        if !ticket.created() {
            self.scheduler.revert(ticket);
            return;
        }
        self.scheduler.settle(&ticket.skill_id);
        let mut host = LogicHost {
            skills: &mut self.skills,
            remote: self.remote.as_deref(),
        };
        self.scheduler.remove(&ticket.skill_id, self.now, &mut host);
    }

    /// Drop the pending activations of a skill without charging.
    fn abandon_in_flight(&mut self, skill_id: &str) {
        let (abandoned, kept): (Vec<_>, Vec<_>) = std::mem::take(&mut self.in_flight)
            .into_iter()
            .partition(|f| f.skill_id == skill_id);
        self.in_flight = kept;
        for flight in abandoned {
            self.scheduler.revert(&flight.ticket);
            self.finish_cycle(&flight);
        }
    }

    /// End a running effect early through `on_remove`.
    pub fn end_effect(&mut self, skill_id: &str) -> bool {
        self.abandon_in_flight(skill_id);
        let mut host = LogicHost {
            skills: &mut self.skills,
            remote: self.remote.as_deref(),
        };
        self.scheduler.remove(skill_id, self.now, &mut host)
    }

    /// Recompute prerequisite locks. A skill that loses a prerequisite while
    /// armed is disarmed.
    fn refresh_locks(&mut self) {
        let registered: HashSet<&str> = self.order.iter().map(String::as_str).collect();
        let mut disarm = Vec::new();
        for (id, entry) in self.skills.iter_mut() {
            let unlocked = entry
                .definition
                .prerequisites
                .iter()
                .all(|p| registered.contains(p.as_str()));
            if unlocked != entry.state.unlocked {
                debug!("Skill '{}' {}", id, if unlocked { "unlocked" } else { "locked" });
            }
            entry.state.unlocked = unlocked;
            if !unlocked && entry.state.prepared {
                disarm.push(id.clone());
            }
        }
        for id in disarm {
            self.end_preparation(&id);
        }
    }

    // Snapshot

    /// Charges and remaining cooldown of every skill.
    pub fn status(&self) -> SkillStatusMap {
        self.order
            .iter()
            .filter_map(|id| self.skills.get(id))
            .map(|e| (e.definition.id.clone(), e.state.status(self.now)))
            .collect()
    }

    /// Apply an authoritative status. Unknown skill ids are skipped.
    pub fn set_status(&mut self, status: &SkillStatusMap) {
        for (id, skill_status) in status {
            match self.skills.get_mut(id) {
                Some(entry) => {
                    entry
                        .state
                        .restore(skill_status, entry.definition.max_charges, self.now)
                }
                None => warn!("Ignoring status of unknown skill '{}'", id),
            }
        }
    }

    // Queries

    pub fn contains(&self, skill_id: &str) -> bool {
        self.skills.contains_key(skill_id)
    }

    pub fn definition(&self, skill_id: &str) -> Option<&SkillDefinition> {
        self.skills.get(skill_id).map(|e| &e.definition)
    }

    pub fn state(&self, skill_id: &str) -> Option<&SkillRuntimeState> {
        self.skills.get(skill_id).map(|e| &e.state)
    }

    pub fn active_effect(&self, skill_id: &str) -> Option<&ActiveEffect> {
        self.scheduler.get(skill_id)
    }

    pub fn active_effects(&self) -> impl Iterator<Item = &ActiveEffect> {
        self.scheduler.iter()
    }

    /// Skill ids in registration order.
    pub fn skill_ids(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }

    pub fn binding_count(&self) -> usize {
        self.events.binding_count()
    }

    pub fn bindings_for(&self, event: &str) -> usize {
        self.events.bindings_for(event)
    }

    pub fn is_bound(&self, event: &str, handler: &SkillHandler) -> bool {
        self.events.contains(event, handler)
    }

    pub fn in_flight_count(&self) -> usize {
        self.in_flight.len()
    }

    pub fn len(&self) -> usize {
        self.skills.len()
    }

    pub fn is_empty(&self) -> bool {
        self.skills.is_empty()
    }

    pub fn now(&self) -> f64 {
        self.now
    }
}
