use skillcast_core::OwnerId;
use skillcast_events::EventError;
use thiserror::Error;

/// Configuration errors. These are fatal at setup: the offending skill or
/// owner is refused and nothing is registered.
#[derive(Debug, Error)]
pub enum SkillError {
    #[error("skill '{0}' is already registered")]
    DuplicateSkill(String),

    #[error("skill '{0}' has no trigger event")]
    MissingTriggerEvent(String),

    #[error("prepared skill '{0}' has no prepare event")]
    MissingPrepareEvent(String),

    #[error("prepared skill '{0}' has no cancel events")]
    MissingCancelEvents(String),

    #[error("invalid definition for skill '{id}': {reason}")]
    InvalidDefinition { id: String, reason: String },

    #[error("unknown skill '{0}'")]
    UnknownSkill(String),

    #[error("no logic registered for skill '{0}'")]
    MissingLogic(String),

    #[error("skill '{0}' made a remote call but no remote agent is bound")]
    MissingRemoteAgent(String),

    #[error("unknown owner {0}")]
    UnknownOwner(OwnerId),

    #[error("owner {0} already exists")]
    DuplicateOwner(OwnerId),

    #[error(transparent)]
    Event(#[from] EventError),

    #[error("failed to parse skill configuration: {0}")]
    Parse(String),

    #[error("failed to read skill configuration: {0}")]
    Io(#[from] std::io::Error),
}

impl From<toml::de::Error> for SkillError {
    fn from(err: toml::de::Error) -> Self {
        SkillError::Parse(err.to_string())
    }
}

/// Recoverable reasons an event handler did nothing. Reported through the
/// returned dispatch and the log, never as an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Rejection {
    #[error("the skill has no charge left")]
    ResourceUnavailable,

    #[error("the skill is already prepared")]
    DuplicatePrepare,

    #[error("the skill's prerequisites are not met")]
    PrerequisitesUnmet,

    #[error("an activation of the skill is still in flight")]
    ActivationInFlight,
}
