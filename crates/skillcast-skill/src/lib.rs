//! Skillcast Skill - Skill lifecycle and trigger routing
//!
//! Provides skill definitions, per-owner runtime state, the active effect
//! scheduler, event-driven trigger routing, charge regeneration and the
//! owner arena that ties them together.

pub mod config;
pub mod definition;
pub mod error;
pub mod logic;
pub mod regen;
pub mod router;
pub mod scheduler;
pub mod state;
pub mod world;

pub use config::{OwnerConfig, SkillCatalog};
pub use definition::{DurationPolicy, EffectSpec, EffectType, SkillDefinition, TriggerMode};
pub use error::{Rejection, SkillError};
pub use logic::{Activation, NoopLogic, SkillContext, SkillLogic};
pub use regen::ChargeRegenLoop;
pub use router::{Dispatch, FrameReport, HandlerRole, Outcome, SkillHandler, TriggerRouter};
pub use scheduler::{ActiveEffect, ActiveEffectScheduler, AddTicket, EffectHost};
pub use state::{SkillRuntimeState, SkillStatus, SkillStatusMap};
pub use world::{LogicLibrary, SkillWorld};
