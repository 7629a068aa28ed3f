//! Request and outcome model for dispatched actions.

use serde_json::{Map, Value};
use uuid::Uuid;

use crate::error::AppError;

/// One tool invocation, after the protocol layer has unwrapped the
/// JSON-RPC envelope. Parameters keep the wire format's dynamic shape.
#[derive(Debug, Clone)]
pub struct ActionRequest {
    pub id: Uuid,
    pub action: String,
    pub parameters: Map<String, Value>,
}

impl ActionRequest {
    pub fn new(action: impl Into<String>, parameters: Map<String, Value>) -> Self {
        Self {
            id: Uuid::new_v4(),
            action: action.into(),
            parameters,
        }
    }

    /// String parameter, if present and non-blank.
    pub fn str_param(&self, key: &str) -> Option<&str> {
        self.parameters
            .get(key)
            .and_then(Value::as_str)
            .filter(|s| !s.trim().is_empty())
    }

    /// Boolean parameter; anything but an explicit `true` is false.
    pub fn bool_param(&self, key: &str) -> bool {
        self.parameters.get(key).and_then(Value::as_bool) == Some(true)
    }
}

/// Result of executing an action: either a success payload or a typed
/// failure. Handler failures never escape as errors to the transport.
#[derive(Debug, Clone)]
pub enum Outcome {
    Success { id: Uuid, result: Value },
    Failure { id: Uuid, error: AppError },
}

impl Outcome {
    pub fn success(id: Uuid, result: Value) -> Self {
        Outcome::Success { id, result }
    }

    pub fn failure(id: Uuid, error: AppError) -> Self {
        Outcome::Failure { id, error }
    }
}
