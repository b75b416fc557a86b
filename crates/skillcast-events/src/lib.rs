//! Skillcast Events - Named event registry
//!
//! Maps abstract event names ("skill_1_pressed", "jump", ...) to ordered lists
//! of handler handles. Each owner carries its own registry, so there is no
//! process-wide state.

mod config;
mod error;
mod registry;

pub use config::EventNameConfig;
pub use error::EventError;
pub use registry::EventRegistry;
