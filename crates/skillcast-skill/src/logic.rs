//! The behaviour side of a skill
//!
//! A [`SkillLogic`] receives lifecycle callbacks from the router and the
//! scheduler. It never touches charges or cooldowns; those belong to the
//! router.

use serde_json::Value;
use skillcast_remote::{PendingRequest, RemoteSkillAgent};

use crate::error::SkillError;
use crate::scheduler::ActiveEffect;

/// Result of an `on_add` callback
pub enum Activation {
    /// The activation finished synchronously
    Settled(bool),
    /// The activation awaits a remote result. It succeeds unless the
    /// request fails or resolves to JSON `false`.
    Pending(PendingRequest<Value>),
}

impl Activation {
    pub fn success() -> Self {
        Self::Settled(true)
    }

    pub fn failure() -> Self {
        Self::Settled(false)
    }
}

impl From<bool> for Activation {
    fn from(success: bool) -> Self {
        Self::Settled(success)
    }
}

impl std::fmt::Debug for Activation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Settled(success) => f.debug_tuple("Settled").field(success).finish(),
            Self::Pending(_) => f.write_str("Pending"),
        }
    }
}

/// What a callback may see of its surroundings
pub struct SkillContext<'a> {
    pub skill_id: &'a str,
    pub now: f64,
    remote: Option<&'a dyn RemoteSkillAgent>,
}

impl<'a> SkillContext<'a> {
    pub fn new(skill_id: &'a str, now: f64, remote: Option<&'a dyn RemoteSkillAgent>) -> Self {
        Self {
            skill_id,
            now,
            remote,
        }
    }

    pub fn has_remote(&self) -> bool {
        self.remote.is_some()
    }

    /// Call a remote RPC on behalf of this skill.
    pub fn rpc_call(&self, method: &str, params: Vec<Value>) -> Result<PendingRequest<Value>, SkillError> {
        Ok(self.agent()?.rpc_call(self.skill_id, method, params))
    }

    /// Call a server command on behalf of this skill.
    pub fn command_call(&self, method: &str, params: Vec<Value>) -> Result<PendingRequest<Value>, SkillError> {
        Ok(self.agent()?.command_call(self.skill_id, method, params))
    }

    fn agent(&self) -> Result<&'a dyn RemoteSkillAgent, SkillError> {
        self.remote
            .ok_or_else(|| SkillError::MissingRemoteAgent(self.skill_id.to_string()))
    }
}

/// Lifecycle callbacks of one skill on one owner.
///
/// Every successful `on_add` is matched by exactly one `on_remove`, and
/// `on_continue` only runs between the two.
pub trait SkillLogic: Send {
    /// Called once when the skill is registered on an owner.
    fn on_init(&mut self, _ctx: &SkillContext<'_>) {}

    /// Called when a prepared skill is armed.
    fn prepare_action(&mut self, _ctx: &SkillContext<'_>) {}

    /// Called when the effect starts or is re-activated. `existing` is the
    /// running instance a re-activation merges into.
    fn on_add(&mut self, ctx: &SkillContext<'_>, existing: Option<&ActiveEffect>) -> Activation;

    /// Called every tick interval while the effect runs.
    fn on_continue(&mut self, _ctx: &SkillContext<'_>) {}

    /// Called when the effect ends.
    fn on_remove(&mut self, _ctx: &SkillContext<'_>) {}
}

/// Logic that accepts every activation and does nothing else
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopLogic;

impl SkillLogic for NoopLogic {
    fn on_add(&mut self, _ctx: &SkillContext<'_>, _existing: Option<&ActiveEffect>) -> Activation {
        Activation::success()
    }
}
