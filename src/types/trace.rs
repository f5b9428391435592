use std::collections::BTreeMap;

use ethereum_types::{H256, U256};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Client-supplied trace options, geth's `debug` namespace shape. All filter
/// flags default to off; `tracer_config` is forwarded opaquely to whichever
/// tracer was named.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TraceConfig {
    pub disable_storage: bool,
    pub disable_stack: bool,
    pub enable_memory: bool,
    pub enable_return_data: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tracer: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tracer_config: Option<Value>,
}

/// One client-visible trace line for a single executed opcode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StructLog {
    pub pc: u64,
    pub op: String,
    pub gas: u64,
    pub gas_cost: u64,
    pub depth: u64,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stack: Option<Vec<U256>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memory: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage: Option<BTreeMap<String, String>>,
    #[serde(rename = "refund", default, skip_serializing_if = "is_zero")]
    pub refund: u64,
}

fn is_zero(value: &u64) -> bool {
    *value == 0
}

/// Full structured trace of one transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TraceResult {
    pub gas: u64,
    pub failed: bool,
    /// Hex return data, or JSON null when return data capture is off.
    pub return_value: Option<String>,
    pub struct_logs: Vec<StructLog>,
}

/// Per-transaction wrapper inside a block trace response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlockTraceEntry {
    pub result: Value,
}

/// Per-transaction entry of a batch trace response.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchTraceEntry {
    pub tx_hash: H256,
    pub result: Value,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn trace_config_defaults_when_fields_absent() {
        let config: TraceConfig = serde_json::from_value(json!({})).unwrap();
        assert!(!config.disable_storage);
        assert!(!config.disable_stack);
        assert!(!config.enable_memory);
        assert!(!config.enable_return_data);
        assert!(config.tracer.is_none());
        assert!(config.tracer_config.is_none());
    }

    #[test]
    fn trace_config_round_trips_camel_case() {
        let config: TraceConfig = serde_json::from_value(json!({
            "disableStack": true,
            "enableMemory": true,
            "tracer": "callTracer",
            "tracerConfig": { "onlyTopCall": true },
        }))
        .unwrap();
        assert!(config.disable_stack);
        assert!(config.enable_memory);
        assert_eq!(config.tracer.as_deref(), Some("callTracer"));

        let encoded = serde_json::to_value(&config).unwrap();
        assert_eq!(encoded["tracer"], json!("callTracer"));
        assert_eq!(encoded["disableStorage"], json!(false));
    }

    #[test]
    fn struct_log_omits_empty_optional_fields() {
        let log = StructLog {
            pc: 0,
            op: "PUSH1".to_string(),
            gas: 100,
            gas_cost: 3,
            depth: 1,
            error: String::new(),
            stack: None,
            memory: None,
            storage: None,
            refund: 0,
        };
        let encoded = serde_json::to_value(&log).unwrap();
        let object = encoded.as_object().unwrap();
        assert!(!object.contains_key("error"));
        assert!(!object.contains_key("stack"));
        assert!(!object.contains_key("memory"));
        assert!(!object.contains_key("storage"));
        assert!(!object.contains_key("refund"));
        assert_eq!(encoded["gasCost"], json!(3));
    }

    #[test]
    fn trace_result_serializes_null_return_value() {
        let result = TraceResult {
            gas: 21000,
            failed: false,
            return_value: None,
            struct_logs: vec![],
        };
        let encoded = serde_json::to_value(&result).unwrap();
        assert_eq!(encoded["returnValue"], Value::Null);
        assert_eq!(encoded["structLogs"], json!([]));
    }
}
