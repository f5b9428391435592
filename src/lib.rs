mod clients;
mod context;
mod debug;
mod errors;
mod router;
mod rpc_types;
mod server;

pub mod state;
pub mod types;

pub use clients::{RpcClient, RpcClientError, RpcResponse};
pub use context::RpcApiContext;
pub use errors::{RpcErr, RpcErrorMetadata};
pub use router::{RpcHandler, map_http_requests};
pub use rpc_types::{RpcErrorResponse, RpcRequest, RpcRequestId, RpcSuccessResponse};
pub use server::{rpc_response, start_api};
