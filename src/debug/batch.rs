use std::{sync::Arc, time::Duration};

use ethereum_types::H256;
use tokio::{sync::Semaphore, task::JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::error;
use url::Url;

use crate::{
    clients::RpcClient,
    errors::RpcErr,
    types::trace::{BatchTraceEntry, TraceConfig},
};

/// Maximum time to wait for all remote traces of one batch.
pub const BATCH_TRACE_TIMEOUT: Duration = Duration::from_secs(10 * 60);

/// Maximum number of remote trace calls in flight at once.
pub const BATCH_TRACE_CONCURRENCY: usize = 10;

/// Rebuild the URL the inbound request was addressed to, so that the fan-out
/// calls go back through the same load balancer. Requests rarely carry an
/// explicit scheme, in which case https is assumed.
pub fn fanout_url(scheme: Option<&str>, host: &str, path: &str) -> Result<Url, RpcErr> {
    let scheme = match scheme {
        Some(scheme) if !scheme.is_empty() => scheme,
        _ => "https",
    };
    Url::parse(&format!("{scheme}://{host}{path}"))
        .map_err(|error| RpcErr::Internal(format!("could not build fan-out url: {error}")))
}

/// Scatter-gather of one batch's transaction traces.
///
/// Each transaction becomes an independent outbound `debug_traceTransaction`
/// call against the fan-out URL; the load balancer behind that URL spreads
/// the calls over the fleet. Failed calls are logged and dropped from the
/// result set, they never fail the batch. One global deadline covers the
/// whole gather; when it fires the cancellation token stops in-flight calls
/// and the batch fails as a whole.
pub struct BatchTraceAggregator {
    client: RpcClient,
    config: TraceConfig,
    batch_number: u64,
    concurrency: usize,
    deadline: Duration,
}

impl BatchTraceAggregator {
    pub fn new(client: RpcClient, config: TraceConfig, batch_number: u64) -> Self {
        Self::new_with_limits(
            client,
            config,
            batch_number,
            BATCH_TRACE_CONCURRENCY,
            BATCH_TRACE_TIMEOUT,
        )
    }

    pub fn new_with_limits(
        client: RpcClient,
        config: TraceConfig,
        batch_number: u64,
        concurrency: usize,
        deadline: Duration,
    ) -> Self {
        BatchTraceAggregator {
            client,
            config,
            batch_number,
            concurrency,
            deadline,
        }
    }

    /// Run the fan-out. The returned entries are in completion order, not
    /// batch order, and transactions whose remote call failed are absent.
    pub async fn trace_all(&self, tx_hashes: Vec<H256>) -> Result<Vec<BatchTraceEntry>, RpcErr> {
        let token = CancellationToken::new();
        let semaphore = Arc::new(Semaphore::new(self.concurrency));
        let mut tasks: JoinSet<Option<BatchTraceEntry>> = JoinSet::new();

        for tx_hash in tx_hashes {
            let client = self.client.clone();
            let config = self.config.clone();
            let token = token.clone();
            let semaphore = semaphore.clone();
            tasks.spawn(async move {
                let _permit = tokio::select! {
                    _ = token.cancelled() => return None,
                    permit = semaphore.acquire_owned() => permit.ok()?,
                };
                tokio::select! {
                    _ = token.cancelled() => None,
                    result = client.debug_trace_transaction(tx_hash, &config) => match result {
                        Ok(result) => Some(BatchTraceEntry { tx_hash, result }),
                        Err(error) => {
                            error!(
                                endpoint = %client.url,
                                tx_hash = %format!("{tx_hash:#x}"),
                                %error,
                                "failed to get tx trace from remote rpc server"
                            );
                            None
                        }
                    },
                }
            });
        }

        let gather = async {
            let mut entries = Vec::new();
            while let Some(joined) = tasks.join_next().await {
                if let Ok(Some(entry)) = joined {
                    entries.push(entry);
                }
            }
            entries
        };

        match tokio::time::timeout(self.deadline, gather).await {
            Ok(entries) => Ok(entries),
            Err(_) => {
                token.cancel();
                Err(RpcErr::BatchTimeout(self.batch_number))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{collections::HashSet, net::SocketAddr};

    use axum::{Json, Router, extract::State};
    use serde_json::{Value, json};

    use crate::{
        rpc_types::RpcRequest,
        server::rpc_response,
    };

    #[derive(Clone)]
    struct PeerBehavior {
        failing: HashSet<H256>,
        delay: Duration,
    }

    async fn handle_peer_request(
        State(behavior): State<PeerBehavior>,
        body: String,
    ) -> Json<Value> {
        let request: RpcRequest = serde_json::from_str(&body).unwrap();
        assert_eq!(request.method, "debug_traceTransaction");
        let params = request.params.as_ref().unwrap();
        let tx_hash: H256 = serde_json::from_value(params[0].clone()).unwrap();

        tokio::time::sleep(behavior.delay).await;

        let result = if behavior.failing.contains(&tx_hash) {
            Err(RpcErr::Internal("failed to get trace".to_string()))
        } else {
            Ok(json!({ "gas": 21000, "failed": false }))
        };
        Json(rpc_response(request.id, result))
    }

    async fn spawn_peer(behavior: PeerBehavior) -> SocketAddr {
        let router = Router::new()
            .route("/", axum::routing::post(handle_peer_request))
            .with_state(behavior);
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        addr
    }

    fn tx_hashes(count: u64) -> Vec<H256> {
        (1..=count).map(H256::from_low_u64_be).collect()
    }

    #[tokio::test]
    async fn failed_remote_calls_are_dropped_without_failing_the_batch() {
        let hashes = tx_hashes(5);
        let failing: HashSet<H256> = hashes[..2].iter().copied().collect();
        let addr = spawn_peer(PeerBehavior {
            failing: failing.clone(),
            delay: Duration::ZERO,
        })
        .await;

        let client = RpcClient::new(&format!("http://{addr}/")).unwrap();
        let aggregator = BatchTraceAggregator::new(client, TraceConfig::default(), 1);
        let entries = aggregator.trace_all(hashes.clone()).await.unwrap();

        assert_eq!(entries.len(), 3);
        let returned: HashSet<H256> = entries.iter().map(|entry| entry.tx_hash).collect();
        let expected: HashSet<H256> = hashes[2..].iter().copied().collect();
        assert_eq!(returned, expected);
    }

    #[tokio::test]
    async fn deadline_expiry_discards_partial_results() {
        let addr = spawn_peer(PeerBehavior {
            failing: HashSet::new(),
            delay: Duration::from_secs(5),
        })
        .await;

        let client = RpcClient::new(&format!("http://{addr}/")).unwrap();
        let aggregator = BatchTraceAggregator::new_with_limits(
            client,
            TraceConfig::default(),
            7,
            BATCH_TRACE_CONCURRENCY,
            Duration::from_millis(100),
        );
        let result = aggregator.trace_all(tx_hashes(3)).await;

        assert!(matches!(result, Err(RpcErr::BatchTimeout(7))));
    }

    #[tokio::test]
    async fn empty_batch_resolves_immediately() {
        let client = RpcClient::new("http://127.0.0.1:1/").unwrap();
        let aggregator = BatchTraceAggregator::new(client, TraceConfig::default(), 1);
        let entries = aggregator.trace_all(Vec::new()).await.unwrap();
        assert!(entries.is_empty());
    }

    #[test]
    fn fanout_url_defaults_to_https_and_echoes_host_and_path() {
        let url = fanout_url(None, "rpc.example.com", "/").unwrap();
        assert_eq!(url.as_str(), "https://rpc.example.com/");

        let url = fanout_url(Some("http"), "10.0.0.1:8545", "/v1/rpc").unwrap();
        assert_eq!(url.as_str(), "http://10.0.0.1:8545/v1/rpc");

        let url = fanout_url(Some(""), "rpc.example.com", "/").unwrap();
        assert_eq!(url.scheme(), "https");
    }
}
