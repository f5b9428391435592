use std::collections::BTreeMap;

use async_trait::async_trait;
use bytes::Bytes;
use ethereum_types::{H256, U256};
use serde_json::Value;

use crate::types::trace::TraceConfig;

#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("not found")]
    NotFound,
    #[error("database error: {0}")]
    Database(String),
    #[error("execution error: {0}")]
    Execution(String),
}

/// Result of a transaction
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransactionReceipt {
    pub tx_hash: H256,
    pub succeeded: bool,
    pub cumulative_gas_used: u64,
}

/// One opcode execution event as reported by the execution engine.
///
/// `memory` carries only the bytes written by this step, at `memory_offset`;
/// `memory_size` is the full memory length after the step ran.
#[derive(Clone, Debug, Default)]
pub struct VmStep {
    pub pc: u64,
    pub op: String,
    pub gas: u64,
    pub gas_cost: u64,
    pub depth: u64,
    pub error: Option<String>,
    pub stack: Vec<Option<U256>>,
    pub memory: Bytes,
    pub memory_offset: u64,
    pub memory_size: u64,
    pub storage: BTreeMap<H256, H256>,
    pub refund: u64,
}

/// Raw trace for one transaction as produced by the execution engine.
///
/// `tracer_result` is the opaque pre-rendered output of a named tracer, when
/// one was requested; it bypasses struct-log formatting entirely.
#[derive(Clone, Debug, Default)]
pub struct ExecutionTrace {
    pub gas_used: u64,
    pub return_value: Bytes,
    pub steps: Vec<VmStep>,
    pub tracer_result: Option<Value>,
}

/// Boundary to the node's state and execution layers. Everything behind this
/// trait is an external collaborator: storage lookups and the VM engine that
/// produces raw execution steps.
#[async_trait]
pub trait ChainState: Send + Sync {
    async fn latest_block_number(&self) -> Result<u64, StateError>;

    /// Transaction hashes of a block, in block order.
    async fn block_transactions_by_number(
        &self,
        block_number: u64,
    ) -> Result<Option<Vec<H256>>, StateError>;

    async fn block_transactions_by_hash(
        &self,
        block_hash: H256,
    ) -> Result<Option<Vec<H256>>, StateError>;

    async fn latest_batch_number(&self) -> Result<u64, StateError>;

    /// Whether the batch exists at all; its payload is of no interest here.
    async fn get_batch_by_number(&self, batch_number: u64) -> Result<bool, StateError>;

    /// Transaction hashes grouped into a batch. `None` means the batch has no
    /// transactions recorded, which callers treat as an empty batch.
    async fn get_batch_transactions(
        &self,
        batch_number: u64,
    ) -> Result<Option<Vec<H256>>, StateError>;

    async fn get_transaction_receipt(
        &self,
        tx_hash: H256,
    ) -> Result<TransactionReceipt, StateError>;

    /// Re-execute the transaction under the given options and return its raw
    /// trace. `StateError::NotFound` means the transaction is unknown.
    async fn trace_transaction(
        &self,
        tx_hash: H256,
        options: &TraceConfig,
    ) -> Result<ExecutionTrace, StateError>;
}
