//! Skillcast Remote - Remote skill agent
//!
//! Skills that run under an external authority (a game server, a host peer)
//! reach it through [`RemoteSkillAgent`]. Calls never block the frame loop:
//! they hand back a [`PendingRequest`] that is polled once per frame.

pub mod agent;
pub mod client;
pub mod error;
pub mod types;

pub use agent::{RemoteSkillAgent, Transport, TransportFuture};
pub use client::{PendingRequest, Responder, RuntimeAgent};
pub use error::RemoteError;
pub use types::{CallKind, RemoteCall};
