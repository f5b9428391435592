#[derive(Debug, thiserror::Error)]
pub enum RpcClientError {
    #[error("reqwest error: {0}")]
    ReqwestError(#[from] reqwest::Error),
    #[error("Failed to serialize request body: {0}")]
    FailedToSerializeRequestBody(String),
    #[error("RPC error response: {code} {message}")]
    RpcError { code: i32, message: String },
    #[error("Parse Url Error: {0}")]
    ParseUrlError(String),
}
