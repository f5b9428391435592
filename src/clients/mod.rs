mod errors;
mod rpc;

pub use errors::RpcClientError;
pub use rpc::{RpcClient, RpcResponse};
