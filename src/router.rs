use serde_json::Value;

use crate::context::RpcApiContext;
use crate::errors::RpcErr;
use crate::rpc_types::{RpcNamespace, RpcRequest};

#[allow(async_fn_in_trait)]
pub trait RpcHandler: Sized {
    fn parse(params: &Option<Vec<Value>>) -> Result<Self, RpcErr>;

    async fn call(req: &RpcRequest, context: RpcApiContext) -> Result<Value, RpcErr> {
        let request = Self::parse(&req.params)?;
        request.handle(context).await
    }

    async fn handle(&self, context: RpcApiContext) -> Result<Value, RpcErr>;
}

pub async fn map_http_requests(req: &RpcRequest, context: RpcApiContext) -> Result<Value, RpcErr> {
    match req.namespace() {
        Ok(RpcNamespace::Debug) => crate::debug::map_debug_requests(req, context).await,
        Err(error) => Err(error),
    }
}
