/// Errors raised while binding handlers to events.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EventError {
    #[error("event '{0}' is not declared in the event name catalog")]
    UnknownEvent(String),

    #[error("event name must not be empty")]
    EmptyName,
}
