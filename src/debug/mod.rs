pub(crate) mod batch;
mod format;
mod memory;
mod tracer;

use ethereum_types::H256;
use serde_json::Value;
use tracing::{error, info};

use crate::{
    clients::RpcClient,
    context::RpcApiContext,
    debug::{batch::BatchTraceAggregator, format::TraceFormatter},
    errors::RpcErr,
    router::RpcHandler,
    rpc_types::RpcRequest,
    state::StateError,
    types::{
        block_identifier::{BatchIdentifier, BlockIdentifier, parse_block_hash},
        trace::{BlockTraceEntry, TraceConfig, TraceResult},
    },
};

pub async fn map_debug_requests(req: &RpcRequest, context: RpcApiContext) -> Result<Value, RpcErr> {
    match req.method.as_str() {
        "debug_traceTransaction" => TraceTransactionRequest::call(req, context).await,
        "debug_traceBlockByNumber" => TraceBlockByNumberRequest::call(req, context).await,
        "debug_traceBlockByHash" => TraceBlockByHashRequest::call(req, context).await,
        "debug_traceBatchByNumber" => TraceBatchByNumberRequest::call(req, context).await,
        unknown_debug_method => Err(RpcErr::MethodNotFound(unknown_debug_method.to_owned())),
    }
}

fn parse_trace_params(params: &Option<Vec<Value>>) -> Result<(Value, TraceConfig), RpcErr> {
    let params = params
        .as_ref()
        .ok_or(RpcErr::BadParams("No params provided".to_owned()))?;
    if params.len() != 1 && params.len() != 2 {
        return Err(RpcErr::BadParams("Expected 1 or 2 params".to_owned()));
    }
    // Clients routinely send an explicit null config; treat it as absent.
    let config = match params.get(1) {
        Some(Value::Null) | None => TraceConfig::default(),
        Some(config) => serde_json::from_value(config.clone())?,
    };
    Ok((params[0].clone(), config))
}

pub struct TraceTransactionRequest {
    tx_hash: H256,
    config: TraceConfig,
}

impl RpcHandler for TraceTransactionRequest {
    fn parse(params: &Option<Vec<Value>>) -> Result<Self, RpcErr> {
        let (target, config) = parse_trace_params(params)?;
        Ok(TraceTransactionRequest {
            tx_hash: serde_json::from_value(target)?,
            config,
        })
    }

    async fn handle(&self, context: RpcApiContext) -> Result<Value, RpcErr> {
        build_trace_transaction(&context, self.tx_hash, &self.config).await
    }
}

pub struct TraceBlockByNumberRequest {
    block: BlockIdentifier,
    config: TraceConfig,
}

impl RpcHandler for TraceBlockByNumberRequest {
    fn parse(params: &Option<Vec<Value>>) -> Result<Self, RpcErr> {
        let (target, config) = parse_trace_params(params)?;
        Ok(TraceBlockByNumberRequest {
            block: BlockIdentifier::parse(target, 0)?,
            config,
        })
    }

    async fn handle(&self, context: RpcApiContext) -> Result<Value, RpcErr> {
        info!("Requested trace for block: {}", self.block);
        let block_number = self.block.resolve_block_number(context.state.as_ref()).await?;
        let tx_hashes = context
            .state
            .block_transactions_by_number(block_number)
            .await?
            .ok_or(RpcErr::NotFound(format!("block #{block_number}")))?;
        build_trace_block(&context, &tx_hashes, &self.config).await
    }
}

pub struct TraceBlockByHashRequest {
    block_hash: H256,
    config: TraceConfig,
}

impl RpcHandler for TraceBlockByHashRequest {
    fn parse(params: &Option<Vec<Value>>) -> Result<Self, RpcErr> {
        let (target, config) = parse_trace_params(params)?;
        Ok(TraceBlockByHashRequest {
            block_hash: parse_block_hash(target, 0)?,
            config,
        })
    }

    async fn handle(&self, context: RpcApiContext) -> Result<Value, RpcErr> {
        let tx_hashes = context
            .state
            .block_transactions_by_hash(self.block_hash)
            .await?
            .ok_or(RpcErr::NotFound(format!("block {:#x}", self.block_hash)))?;
        build_trace_block(&context, &tx_hashes, &self.config).await
    }
}

pub struct TraceBatchByNumberRequest {
    batch: BatchIdentifier,
    config: TraceConfig,
}

impl RpcHandler for TraceBatchByNumberRequest {
    fn parse(params: &Option<Vec<Value>>) -> Result<Self, RpcErr> {
        let (target, config) = parse_trace_params(params)?;
        Ok(TraceBatchByNumberRequest {
            batch: BatchIdentifier::parse(target, 0)?,
            config,
        })
    }

    /// Batch tracing does not run the traces locally: one remote
    /// `debug_traceTransaction` per transaction is sent to the fan-out URL so
    /// the load balancer spreads the work over the fleet of peer instances.
    /// Receipts are still resolved locally, and any receipt failure aborts
    /// the whole request.
    async fn handle(&self, context: RpcApiContext) -> Result<Value, RpcErr> {
        let fanout = context
            .trace_fanout_url
            .clone()
            .ok_or(RpcErr::Internal("trace fan-out url not available".to_string()))?;

        let batch_number = self.batch.resolve_batch_number(context.state.as_ref()).await?;
        if !context.state.get_batch_by_number(batch_number).await? {
            return Err(RpcErr::NotFound(format!("batch #{batch_number}")));
        }

        let tx_hashes = context
            .state
            .get_batch_transactions(batch_number)
            .await
            .map_err(|error| {
                error!(batch_number, %error, "couldn't load batch txs to create the traces");
                RpcErr::Internal(format!(
                    "couldn't load batch txs from state by number {batch_number} to create the traces"
                ))
            })?
            .unwrap_or_default();

        let mut receipts = Vec::with_capacity(tx_hashes.len());
        for tx_hash in &tx_hashes {
            let receipt = context
                .state
                .get_transaction_receipt(*tx_hash)
                .await
                .map_err(|error| {
                    error!(tx_hash = %format!("{tx_hash:#x}"), %error, "couldn't load receipt to get trace");
                    RpcErr::Internal(format!(
                        "couldn't load receipt for tx {tx_hash:#x} to get trace"
                    ))
                })?;
            receipts.push(receipt);
        }

        info!(
            batch_number,
            transactions = receipts.len(),
            endpoint = %fanout,
            "Tracing batch through remote fan-out"
        );
        let aggregator =
            BatchTraceAggregator::new(RpcClient::from_url(fanout), self.config.clone(), batch_number);
        let entries = aggregator
            .trace_all(receipts.iter().map(|receipt| receipt.tx_hash).collect())
            .await?;

        serde_json::to_value(entries).map_err(|error| RpcErr::Internal(error.to_string()))
    }
}

/// Trace a single transaction locally: validate the tracer, pull the raw
/// trace from the execution engine and shape it for the client.
async fn build_trace_transaction(
    context: &RpcApiContext,
    tx_hash: H256,
    config: &TraceConfig,
) -> Result<Value, RpcErr> {
    tracer::validate_tracer(config)?;

    let trace = match context.state.trace_transaction(tx_hash, config).await {
        Ok(trace) => trace,
        Err(StateError::NotFound) => return Err(RpcErr::NotFound("transaction".to_string())),
        Err(error) => {
            error!(tx_hash = %format!("{tx_hash:#x}"), %error, "failed to get trace");
            return Err(RpcErr::Internal("failed to get trace".to_string()));
        }
    };

    // A named tracer renders its own result and bypasses struct-log
    // formatting entirely.
    if config.tracer.as_deref().is_some_and(|tracer| !tracer.is_empty()) {
        if let Some(result) = trace.tracer_result {
            if !result.is_null() {
                return Ok(result);
            }
        }
    }

    let receipt = match context.state.get_transaction_receipt(tx_hash).await {
        Ok(receipt) => receipt,
        Err(error) => {
            error!(tx_hash = %format!("{tx_hash:#x}"), %error, "failed to get tx receipt");
            return Err(RpcErr::Internal("failed to get tx receipt".to_string()));
        }
    };

    let return_value = config
        .enable_return_data
        .then(|| hex::encode(&trace.return_value));
    let struct_logs = TraceFormatter::new(config).format(&trace.steps);

    let response = TraceResult {
        gas: trace.gas_used,
        failed: !receipt.succeeded,
        return_value,
        struct_logs,
    };
    serde_json::to_value(response).map_err(|error| RpcErr::Internal(error.to_string()))
}

/// Trace every transaction of a block in order. The first failure aborts the
/// whole block trace; there are no partial block results.
async fn build_trace_block(
    context: &RpcApiContext,
    tx_hashes: &[H256],
    config: &TraceConfig,
) -> Result<Value, RpcErr> {
    let mut traces = Vec::with_capacity(tx_hashes.len());
    for tx_hash in tx_hashes {
        let result = build_trace_transaction(context, *tx_hash, config)
            .await
            .map_err(|error| {
                error!(tx_hash = %format!("{tx_hash:#x}"), ?error, "failed to get trace for block transaction");
                RpcErr::Internal(format!("failed to get trace for transaction {tx_hash:#x}"))
            })?;
        traces.push(BlockTraceEntry { result });
    }
    serde_json::to_value(traces).map_err(|error| RpcErr::Internal(error.to_string()))
}
