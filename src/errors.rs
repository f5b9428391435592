use serde::{Deserialize, Serialize};

use crate::state::StateError;

#[derive(Debug)]
pub enum RpcErr {
    MethodNotFound(String),
    BadParams(String),
    NotFound(String),
    InvalidTracer,
    Internal(String),
    BatchTimeout(u64),
}

#[derive(Serialize, Deserialize, Debug)]
pub struct RpcErrorMetadata {
    pub code: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,
    pub message: String,
}

impl From<RpcErr> for RpcErrorMetadata {
    fn from(value: RpcErr) -> Self {
        match value {
            RpcErr::MethodNotFound(bad_method) => RpcErrorMetadata {
                code: -32601,
                data: None,
                message: format!("Method not found: {bad_method}"),
            },
            RpcErr::BadParams(context) => RpcErrorMetadata {
                code: -32000,
                data: None,
                message: format!("Invalid params: {context}"),
            },
            RpcErr::NotFound(what) => RpcErrorMetadata {
                code: -32000,
                data: None,
                message: format!("{what} not found"),
            },
            RpcErr::InvalidTracer => RpcErrorMetadata {
                code: -32000,
                data: None,
                message: "invalid tracer".to_string(),
            },
            RpcErr::Internal(context) => RpcErrorMetadata {
                code: -32603,
                data: None,
                message: format!("Internal Error: {context}"),
            },
            RpcErr::BatchTimeout(batch_number) => RpcErrorMetadata {
                code: -32000,
                data: None,
                message: format!("failed to get traces for batch {batch_number}: timeout reached"),
            },
        }
    }
}

impl From<serde_json::Error> for RpcErr {
    fn from(error: serde_json::Error) -> Self {
        Self::BadParams(error.to_string())
    }
}

/// Non-specific collaborator failures always surface as internal errors;
/// `StateError::NotFound` is mapped in-place by the handlers that know
/// what was being looked up.
impl From<StateError> for RpcErr {
    fn from(value: StateError) -> Self {
        RpcErr::Internal(value.to_string())
    }
}
