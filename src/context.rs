use std::sync::Arc;

use url::Url;

use crate::state::ChainState;

#[derive(Clone)]
pub struct RpcApiContext {
    pub state: Arc<dyn ChainState>,
    /// Endpoint the batch trace fan-out calls go to. Configured explicitly,
    /// or filled in per request by the server from the inbound host and path
    /// so the calls come back through the same load balancer.
    pub trace_fanout_url: Option<Url>,
}
