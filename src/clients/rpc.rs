use std::sync::atomic::{AtomicU64, Ordering};

use ethereum_types::H256;
use reqwest::{Client, Url};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::trace;

use crate::{
    clients::errors::RpcClientError,
    rpc_types::{RpcErrorResponse, RpcRequest, RpcRequestId, RpcSuccessResponse},
    types::trace::TraceConfig,
};

static REQUEST_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

#[derive(Deserialize, Debug)]
#[serde(untagged)]
pub enum RpcResponse {
    Success(RpcSuccessResponse),
    Error(RpcErrorResponse),
}

/// Plain JSON-RPC client for calling peer instances of this service.
#[derive(Debug, Clone)]
pub struct RpcClient {
    client: Client,
    pub url: Url,
}

impl RpcClient {
    pub fn new(url: &str) -> Result<RpcClient, RpcClientError> {
        let url = Url::parse(url)
            .map_err(|error| RpcClientError::ParseUrlError(error.to_string()))?;
        Ok(Self::from_url(url))
    }

    pub fn from_url(url: Url) -> RpcClient {
        RpcClient {
            client: Client::new(),
            url,
        }
    }

    pub async fn send_request(&self, request: RpcRequest) -> Result<RpcResponse, RpcClientError> {
        trace!(endpoint = %self.url, ?request, "Sending RPC request");

        self.client
            .post(self.url.as_str())
            .header("content-type", "application/json")
            .body(serde_json::ser::to_string(&request).map_err(|error| {
                RpcClientError::FailedToSerializeRequestBody(format!("{error}: {request:?}"))
            })?)
            .send()
            .await?
            .json::<RpcResponse>()
            .await
            .inspect(|body| trace!(endpoint = %self.url, ?body, "Response deserialized"))
            .map_err(RpcClientError::from)
    }

    /// Remote `debug_traceTransaction`. RPC-level error responses surface as
    /// `RpcClientError::RpcError`.
    pub async fn debug_trace_transaction(
        &self,
        tx_hash: H256,
        config: &TraceConfig,
    ) -> Result<Value, RpcClientError> {
        let params = Some(vec![
            json!(format!("{tx_hash:#x}")),
            serde_json::to_value(config).map_err(|error| {
                RpcClientError::FailedToSerializeRequestBody(error.to_string())
            })?,
        ]);
        let request = RpcRequest::new(
            RpcRequestId::Number(REQUEST_ID_COUNTER.fetch_add(1, Ordering::Relaxed)),
            "debug_traceTransaction",
            params,
        );

        match self.send_request(request).await? {
            RpcResponse::Success(response) => Ok(response.result),
            RpcResponse::Error(error_response) => Err(RpcClientError::RpcError {
                code: error_response.error.code,
                message: error_response.error.message,
            }),
        }
    }
}
