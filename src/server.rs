use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::{OriginalUri, State};
use axum::{Json, Router};
use axum_extra::extract::Host;
use serde::Deserialize;
use serde_json::Value;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tracing::info;
use url::Url;

use crate::context::RpcApiContext;
use crate::debug::batch::fanout_url;
use crate::errors::{RpcErr, RpcErrorMetadata};
use crate::router::map_http_requests;
use crate::rpc_types::{RpcErrorResponse, RpcRequest, RpcRequestId, RpcSuccessResponse};
use crate::state::ChainState;

#[derive(Deserialize)]
#[serde(untagged)]
pub enum RpcRequestWrapper {
    Single(RpcRequest),
    Multiple(Vec<RpcRequest>),
}

/// Serve the debug JSON-RPC API until ctrl-c.
///
/// `trace_fanout_url` pins the batch trace fan-out endpoint; when `None` it
/// is reconstructed per request from the inbound host and path.
pub async fn start_api(
    http_addr: SocketAddr,
    state: Arc<dyn ChainState>,
    trace_fanout_url: Option<Url>,
) {
    let service_context = RpcApiContext {
        state,
        trace_fanout_url,
    };

    // All request headers, methods and origins allowed.
    let cors = CorsLayer::permissive();

    let http_router = Router::new()
        .route("/", axum::routing::post(handle_http_request))
        .layer(cors)
        .with_state(service_context);
    let http_listener = TcpListener::bind(http_addr).await.unwrap();

    info!("Starting HTTP server at {http_addr}");

    let _ = axum::serve(http_listener, http_router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .inspect_err(|e| info!("Error shutting down server: {:?}", e));
}

async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("failed to install Ctrl+C handler");
}

async fn handle_http_request(
    State(mut service_context): State<RpcApiContext>,
    Host(host): Host,
    OriginalUri(uri): OriginalUri,
    body: String,
) -> Json<Value> {
    if service_context.trace_fanout_url.is_none() {
        service_context.trace_fanout_url = fanout_url(uri.scheme_str(), &host, uri.path()).ok();
    }

    let res = match serde_json::from_str::<RpcRequestWrapper>(&body) {
        Ok(RpcRequestWrapper::Single(request)) => {
            let res = map_http_requests(&request, service_context).await;
            rpc_response(request.id, res)
        }
        Ok(RpcRequestWrapper::Multiple(requests)) => {
            let mut responses = Vec::new();
            for req in requests {
                let res = map_http_requests(&req, service_context.clone()).await;
                responses.push(rpc_response(req.id, res));
            }
            serde_json::to_value(responses).unwrap()
        }
        Err(_) => rpc_response(
            RpcRequestId::String("".to_string()),
            Err(RpcErr::BadParams("Invalid request body".to_string())),
        ),
    };
    Json(res)
}

pub fn rpc_response<E>(id: RpcRequestId, res: Result<Value, E>) -> Value
where
    E: Into<RpcErrorMetadata>,
{
    match res {
        Ok(result) => serde_json::to_value(RpcSuccessResponse {
            id,
            jsonrpc: "2.0".to_string(),
            result,
        }),
        Err(error) => serde_json::to_value(RpcErrorResponse {
            id,
            jsonrpc: "2.0".to_string(),
            error: error.into(),
        }),
    }
    .unwrap()
}
