//! Skillcast Core - Core types shared by the skillcast crates
//!
//! This crate provides the foundational pieces used throughout the workspace:
//! - Frame clock that drives every per-frame update
//! - Owner identifiers for entities that carry skills

pub mod time;
pub mod types;

pub use time::{FrameClock, TimeConfig};
pub use types::OwnerId;
