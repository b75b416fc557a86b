use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Which side of the authority boundary a call targets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CallKind {
    /// Executed on the clients by the authority (server → clients)
    Rpc,
    /// Executed on the server by the owning client (client → server)
    Command,
}

/// A single remote invocation of a skill method
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteCall {
    pub kind: CallKind,
    pub skill_id: String,
    pub method: String,
    #[serde(default)]
    pub params: Vec<Value>,
}

impl RemoteCall {
    pub fn rpc(skill_id: &str, method: &str, params: Vec<Value>) -> Self {
        Self {
            kind: CallKind::Rpc,
            skill_id: skill_id.to_string(),
            method: method.to_string(),
            params,
        }
    }

    pub fn command(skill_id: &str, method: &str, params: Vec<Value>) -> Self {
        Self {
            kind: CallKind::Command,
            skill_id: skill_id.to_string(),
            method: method.to_string(),
            params,
        }
    }
}
