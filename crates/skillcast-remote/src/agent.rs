use std::future::Future;
use std::pin::Pin;

use serde_json::Value;

use crate::client::PendingRequest;
use crate::error::RemoteError;
use crate::types::RemoteCall;

/// The remote-call collaborator of a skill owner.
///
/// Only the entity with authority should issue calls; implementations report
/// [`RemoteError::NoAuthority`] otherwise.
pub trait RemoteSkillAgent: Send + Sync {
    /// Call a remote RPC of a skill.
    fn rpc_call(&self, skill_id: &str, method: &str, params: Vec<Value>) -> PendingRequest<Value>;

    /// Call a server command of a skill.
    fn command_call(&self, skill_id: &str, method: &str, params: Vec<Value>) -> PendingRequest<Value>;

    /// Whether this agent may issue calls for its owner.
    fn has_authority(&self) -> bool {
        true
    }
}

pub type TransportFuture = Pin<Box<dyn Future<Output = Result<Value, RemoteError>> + Send + 'static>>;

/// The wire behind a [`crate::RuntimeAgent`]: delivers one call and resolves
/// with the remote return value.
pub trait Transport: Send + Sync + 'static {
    fn send(&self, call: RemoteCall) -> TransportFuture;
}

/// Closures can be used as transports.
impl<F> Transport for F
where
    F: Fn(RemoteCall) -> TransportFuture + Send + Sync + 'static,
{
    fn send(&self, call: RemoteCall) -> TransportFuture {
        (self)(call)
    }
}
