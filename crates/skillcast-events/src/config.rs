use serde::{Deserialize, Serialize};

/// The catalog of every event name skills are allowed to bind to.
///
/// An empty catalog accepts any name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EventNameConfig {
    #[serde(default)]
    pub event_names: Vec<String>,
}

impl EventNameConfig {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            event_names: names.into_iter().map(Into::into).collect(),
        }
    }

    /// Whether the catalog restricts names at all.
    pub fn is_open(&self) -> bool {
        self.event_names.is_empty()
    }

    /// Whether `name` may be bound under this catalog.
    pub fn allows(&self, name: &str) -> bool {
        self.is_open() || self.event_names.iter().any(|n| n == name)
    }
}
