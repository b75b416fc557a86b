use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tracing::{debug, warn};

use crate::agent::{RemoteSkillAgent, Transport};
use crate::error::RemoteError;
use crate::types::RemoteCall;

/// A non-blocking handle to an in-flight async request.
/// Call `try_recv()` each frame to check for results without blocking the game loop.
pub struct PendingRequest<T> {
    receiver: mpsc::Receiver<Result<T, RemoteError>>,
}

impl<T> PendingRequest<T> {
    /// Create a linked responder/request pair.
    pub fn channel() -> (Responder<T>, Self) {
        let (tx, rx) = mpsc::channel();
        (Responder { sender: tx }, Self { receiver: rx })
    }

    /// A request that is already resolved.
    pub fn ready(result: Result<T, RemoteError>) -> Self {
        let (responder, pending) = Self::channel();
        responder.respond(result);
        pending
    }

    /// Non-blocking check for the result. Returns `None` if still pending.
    /// A responder dropped without answering resolves as [`RemoteError::Disconnected`].
    pub fn try_recv(&self) -> Option<Result<T, RemoteError>> {
        match self.receiver.try_recv() {
            Ok(result) => Some(result),
            Err(mpsc::TryRecvError::Empty) => None,
            Err(mpsc::TryRecvError::Disconnected) => Some(Err(RemoteError::Disconnected)),
        }
    }

    /// Blocking wait for the result. Only use outside the frame loop.
    pub fn wait(self) -> Result<T, RemoteError> {
        self.receiver.recv().map_err(|_| RemoteError::Disconnected)?
    }
}

/// The sending half of a [`PendingRequest`].
pub struct Responder<T> {
    sender: mpsc::Sender<Result<T, RemoteError>>,
}

impl<T> Responder<T> {
    /// Deliver the result. A request that was already dropped is ignored.
    pub fn respond(self, result: Result<T, RemoteError>) {
        let _ = self.sender.send(result);
    }
}

/// Remote agent backed by a background tokio runtime.
/// Every call is spawned onto the runtime and delivered through a `PendingRequest`.
pub struct RuntimeAgent {
    runtime: tokio::runtime::Runtime,
    transport: Arc<dyn Transport>,
    authority: Arc<AtomicBool>,
    timeout: Duration,
}

impl RuntimeAgent {
    /// Create an agent with a background tokio runtime.
    pub fn new(transport: impl Transport) -> Result<Self, RemoteError> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .enable_all()
            .build()
            .map_err(|e| RemoteError::Runtime(format!("Failed to create runtime: {}", e)))?;

        Ok(Self {
            runtime,
            transport: Arc::new(transport),
            authority: Arc::new(AtomicBool::new(true)),
            timeout: Duration::from_secs(30),
        })
    }

    /// Override the per-call timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Grant or revoke authority over the owner.
    pub fn set_authority(&self, authority: bool) {
        self.authority.store(authority, Ordering::Relaxed);
    }

    fn dispatch(&self, call: RemoteCall) -> PendingRequest<Value> {
        if !self.has_authority() {
            warn!(
                "Refusing {:?} '{}' of skill '{}': no authority",
                call.kind, call.method, call.skill_id
            );
            return PendingRequest::ready(Err(RemoteError::NoAuthority));
        }

        let (responder, pending) = PendingRequest::channel();
        let transport = Arc::clone(&self.transport);
        let timeout = self.timeout;

        self.runtime.spawn(async move {
            debug!("Remote {:?} {}::{}", call.kind, call.skill_id, call.method);
            let result = match tokio::time::timeout(timeout, transport.send(call)).await {
                Ok(result) => result,
                Err(_) => Err(RemoteError::Timeout),
            };
            responder.respond(result);
        });

        pending
    }
}

impl RemoteSkillAgent for RuntimeAgent {
    fn rpc_call(&self, skill_id: &str, method: &str, params: Vec<Value>) -> PendingRequest<Value> {
        self.dispatch(RemoteCall::rpc(skill_id, method, params))
    }

    fn command_call(&self, skill_id: &str, method: &str, params: Vec<Value>) -> PendingRequest<Value> {
        self.dispatch(RemoteCall::command(skill_id, method, params))
    }

    fn has_authority(&self) -> bool {
        self.authority.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::TransportFuture;
    use crate::types::CallKind;
    use serde_json::json;

    fn echo_transport(call: RemoteCall) -> TransportFuture {
        Box::pin(async move {
            Ok(json!({
                "kind": call.kind,
                "method": call.method,
                "params": call.params,
            }))
        })
    }

    #[test]
    fn test_pending_request_try_recv_none_then_result() {
        let (responder, pending) = PendingRequest::<String>::channel();

        // Before sending, should return None
        assert!(pending.try_recv().is_none());

        responder.respond(Ok("hello".to_string()));

        let result = pending.try_recv();
        assert!(result.is_some());
        assert_eq!(result.unwrap().unwrap(), "hello");
    }

    #[test]
    fn test_pending_request_wait() {
        let pending = PendingRequest::ready(Ok(42u32));
        assert_eq!(pending.wait().unwrap(), 42);
    }

    #[test]
    fn test_pending_request_error() {
        let pending: PendingRequest<String> = PendingRequest::ready(Err(RemoteError::Timeout));

        let result = pending.try_recv();
        assert!(result.is_some());
        assert_eq!(result.unwrap(), Err(RemoteError::Timeout));
    }

    #[test]
    fn test_dropped_responder_disconnects() {
        let (responder, pending) = PendingRequest::<u32>::channel();
        drop(responder);
        assert_eq!(pending.try_recv(), Some(Err(RemoteError::Disconnected)));
    }

    #[test]
    fn test_runtime_agent_round_trip() {
        let agent = RuntimeAgent::new(echo_transport).unwrap();

        let value = agent.rpc_call("dash", "Launch", vec![json!(3)]).wait().unwrap();
        assert_eq!(value["kind"], "rpc");
        assert_eq!(value["method"], "Launch");
        assert_eq!(value["params"][0], 3);

        let value = agent.command_call("dash", "Land", vec![]).wait().unwrap();
        assert_eq!(value["kind"], serde_json::to_value(CallKind::Command).unwrap());
    }

    #[test]
    fn test_runtime_agent_without_authority() {
        let agent = RuntimeAgent::new(echo_transport).unwrap();
        agent.set_authority(false);
        assert!(!agent.has_authority());

        let result = agent.rpc_call("dash", "Launch", vec![]).try_recv();
        assert_eq!(result, Some(Err(RemoteError::NoAuthority)));
    }

    #[test]
    fn test_runtime_agent_timeout() {
        let slow = |_call: RemoteCall| -> TransportFuture {
            Box::pin(async move {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Ok(Value::Null)
            })
        };
        let agent = RuntimeAgent::new(slow)
            .unwrap()
            .with_timeout(Duration::from_millis(20));

        let result = agent.command_call("dash", "Launch", vec![]).wait();
        assert_eq!(result, Err(RemoteError::Timeout));
    }

    #[test]
    fn test_error_messages() {
        assert!(RemoteError::Timeout.to_string().contains("timed out"));
        assert!(RemoteError::NoAuthority.to_string().contains("authority"));
        let rejected = RemoteError::Rejected("cooldown".into());
        assert!(rejected.to_string().contains("cooldown"));
    }
}
