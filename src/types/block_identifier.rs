use std::fmt;

use ethereum_types::H256;
use serde_json::Value;

use crate::{
    errors::RpcErr,
    state::{ChainState, StateError},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockTag {
    Earliest,
    Latest,
    Pending,
}

/// A block argument as clients send it: a hex quantity or a tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockIdentifier {
    Number(u64),
    Tag(BlockTag),
}

impl BlockIdentifier {
    pub fn parse(value: Value, arg_index: u64) -> Result<Self, RpcErr> {
        match value {
            Value::String(s) => match s.as_str() {
                "earliest" => Ok(BlockIdentifier::Tag(BlockTag::Earliest)),
                "latest" => Ok(BlockIdentifier::Tag(BlockTag::Latest)),
                "pending" => Ok(BlockIdentifier::Tag(BlockTag::Pending)),
                other => parse_hex_quantity(other, arg_index).map(BlockIdentifier::Number),
            },
            Value::Number(n) => n
                .as_u64()
                .map(BlockIdentifier::Number)
                .ok_or(RpcErr::BadParams(format!(
                    "invalid block number at argument {arg_index}"
                ))),
            _ => Err(RpcErr::BadParams(format!(
                "expected block number or tag at argument {arg_index}"
            ))),
        }
    }

    pub async fn resolve_block_number(
        &self,
        state: &dyn ChainState,
    ) -> Result<u64, StateError> {
        match self {
            BlockIdentifier::Number(n) => Ok(*n),
            BlockIdentifier::Tag(BlockTag::Earliest) => Ok(0),
            // Pending blocks are not distinguished from the head here.
            BlockIdentifier::Tag(BlockTag::Latest) | BlockIdentifier::Tag(BlockTag::Pending) => {
                state.latest_block_number().await
            }
        }
    }
}

impl fmt::Display for BlockIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BlockIdentifier::Number(n) => write!(f, "{n:#x}"),
            BlockIdentifier::Tag(BlockTag::Earliest) => write!(f, "earliest"),
            BlockIdentifier::Tag(BlockTag::Latest) => write!(f, "latest"),
            BlockIdentifier::Tag(BlockTag::Pending) => write!(f, "pending"),
        }
    }
}

/// A batch argument: a hex quantity or `latest`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchIdentifier {
    Number(u64),
    Latest,
}

impl BatchIdentifier {
    pub fn parse(value: Value, arg_index: u64) -> Result<Self, RpcErr> {
        match value {
            Value::String(s) => match s.as_str() {
                "latest" => Ok(BatchIdentifier::Latest),
                other => parse_hex_quantity(other, arg_index).map(BatchIdentifier::Number),
            },
            Value::Number(n) => n
                .as_u64()
                .map(BatchIdentifier::Number)
                .ok_or(RpcErr::BadParams(format!(
                    "invalid batch number at argument {arg_index}"
                ))),
            _ => Err(RpcErr::BadParams(format!(
                "expected batch number or tag at argument {arg_index}"
            ))),
        }
    }

    pub async fn resolve_batch_number(
        &self,
        state: &dyn ChainState,
    ) -> Result<u64, StateError> {
        match self {
            BatchIdentifier::Number(n) => Ok(*n),
            BatchIdentifier::Latest => state.latest_batch_number().await,
        }
    }
}

pub fn parse_block_hash(value: Value, arg_index: u64) -> Result<H256, RpcErr> {
    serde_json::from_value::<H256>(value)
        .map_err(|_| RpcErr::BadParams(format!("invalid block hash at argument {arg_index}")))
}

fn parse_hex_quantity(s: &str, arg_index: u64) -> Result<u64, RpcErr> {
    let hex = s.strip_prefix("0x").ok_or(RpcErr::BadParams(format!(
        "invalid argument {arg_index}: hex string without 0x prefix"
    )))?;
    u64::from_str_radix(hex, 16)
        .map_err(|_| RpcErr::BadParams(format!("could not parse quantity at argument {arg_index}")))
}
