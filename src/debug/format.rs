use std::collections::BTreeMap;

use crate::{
    debug::memory::MemoryImage,
    state::VmStep,
    types::trace::{StructLog, TraceConfig},
};

const MEMORY_CHUNK_SIZE: usize = 32;

/// Folds the raw step sequence of one transaction into client-visible struct
/// logs. Owns the memory image being rebuilt along the way, so an instance
/// formats exactly one transaction; `format` consumes it.
pub struct TraceFormatter<'a> {
    config: &'a TraceConfig,
    memory: MemoryImage,
}

impl<'a> TraceFormatter<'a> {
    pub fn new(config: &'a TraceConfig) -> TraceFormatter<'a> {
        TraceFormatter {
            config,
            memory: MemoryImage::new(),
        }
    }

    pub fn format(mut self, steps: &[VmStep]) -> Vec<StructLog> {
        let mut struct_logs = Vec::with_capacity(steps.len());
        for step in steps {
            let mut op = step.op.as_str();
            if op == "SHA3" {
                op = "KECCAK256";
            } else if op == "STOP" && step.pc == 0 {
                // Artifact of single-step calls with no depth increase,
                // never shown to clients.
                continue;
            }

            let mut entry = StructLog {
                pc: step.pc,
                op: op.to_string(),
                gas: step.gas,
                gas_cost: step.gas_cost,
                depth: step.depth,
                error: step.error.clone().unwrap_or_default(),
                stack: None,
                memory: None,
                storage: None,
                refund: step.refund,
            };

            if !self.config.disable_stack {
                // Absent slots are skipped, not rendered as placeholders.
                entry.stack = Some(step.stack.iter().flatten().copied().collect());
            }

            if self.config.enable_memory {
                entry.memory = Some(self.render_memory(step));
            }

            if !self.config.disable_storage && !step.storage.is_empty() {
                let storage: BTreeMap<String, String> = step
                    .storage
                    .iter()
                    .map(|(key, value)| (hex::encode(key), hex::encode(value)))
                    .collect();
                entry.storage = Some(storage);
            }

            struct_logs.push(entry);
        }
        struct_logs
    }

    fn render_memory(&mut self, step: &VmStep) -> Vec<String> {
        self.memory.resize(step.memory_size);
        if !step.memory.is_empty() {
            self.memory
                .write(step.memory_offset, step.memory.len() as u64, &step.memory);
        }

        if step.memory_size == 0 {
            // The VM dropped its memory; start over for the following steps.
            self.memory = MemoryImage::new();
            return Vec::new();
        }

        let snapshot = self.memory.snapshot();
        let mut chunks = Vec::with_capacity(snapshot.len().div_ceil(MEMORY_CHUNK_SIZE));
        for chunk in snapshot.chunks(MEMORY_CHUNK_SIZE) {
            let mut word = [0u8; MEMORY_CHUNK_SIZE];
            word[..chunk.len()].copy_from_slice(chunk);
            chunks.push(hex::encode(word));
        }
        chunks
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use ethereum_types::{H256, U256};

    fn step(op: &str, pc: u64) -> VmStep {
        VmStep {
            pc,
            op: op.to_string(),
            gas: 1000,
            gas_cost: 3,
            depth: 1,
            ..Default::default()
        }
    }

    #[test]
    fn sha3_is_rendered_as_keccak256() {
        let config = TraceConfig::default();
        let logs = TraceFormatter::new(&config).format(&[step("SHA3", 7), step("ADD", 8)]);
        assert_eq!(logs[0].op, "KECCAK256");
        assert_eq!(logs[1].op, "ADD");
    }

    #[test]
    fn stop_at_pc_zero_is_dropped() {
        let config = TraceConfig::default();
        let logs =
            TraceFormatter::new(&config).format(&[step("STOP", 0), step("PUSH1", 0), step("STOP", 5)]);
        let ops: Vec<&str> = logs.iter().map(|log| log.op.as_str()).collect();
        assert_eq!(ops, vec!["PUSH1", "STOP"]);
    }

    #[test]
    fn stack_skips_absent_slots() {
        let config = TraceConfig::default();
        let mut raw = step("DUP1", 3);
        raw.stack = vec![Some(U256::from(1)), None, Some(U256::from(2))];
        let logs = TraceFormatter::new(&config).format(&[raw]);
        assert_eq!(
            logs[0].stack,
            Some(vec![U256::from(1), U256::from(2)])
        );
    }

    #[test]
    fn stack_is_absent_when_disabled() {
        let config = TraceConfig {
            disable_stack: true,
            ..Default::default()
        };
        let mut raw = step("DUP1", 3);
        raw.stack = vec![Some(U256::from(1))];
        let logs = TraceFormatter::new(&config).format(&[raw]);
        assert!(logs[0].stack.is_none());
    }

    #[test]
    fn memory_is_chunked_into_padded_32_byte_words() {
        let config = TraceConfig {
            enable_memory: true,
            ..Default::default()
        };
        let mut raw = step("MSTORE", 4);
        raw.memory_size = 70;
        raw.memory_offset = 0;
        raw.memory = Bytes::from(vec![0xabu8; 70]);
        let logs = TraceFormatter::new(&config).format(&[raw]);

        let memory = logs[0].memory.as_ref().unwrap();
        assert_eq!(memory.len(), 3);
        for chunk in memory {
            assert_eq!(chunk.len(), 64);
        }
        assert_eq!(memory[0], "ab".repeat(32));
        // 70 = 2 * 32 + 6, last chunk is right-padded with zeros
        assert_eq!(memory[2], format!("{}{}", "ab".repeat(6), "00".repeat(26)));
    }

    #[test]
    fn zero_memory_size_resets_the_image() {
        let config = TraceConfig {
            enable_memory: true,
            ..Default::default()
        };
        let mut first = step("MSTORE", 2);
        first.memory_size = 32;
        first.memory_offset = 0;
        first.memory = Bytes::from(vec![0xffu8; 32]);
        let mut second = step("CALL", 3);
        second.memory_size = 0;
        let mut third = step("MSIZE", 4);
        third.memory_size = 32;

        let logs = TraceFormatter::new(&config).format(&[first, second, third]);
        assert_eq!(logs[1].memory, Some(vec![]));
        // Content accumulated before the reset must be gone.
        assert_eq!(logs[2].memory, Some(vec!["00".repeat(32)]));
    }

    #[test]
    fn memory_accumulates_across_steps() {
        let config = TraceConfig {
            enable_memory: true,
            ..Default::default()
        };
        let mut first = step("MSTORE8", 2);
        first.memory_size = 32;
        first.memory_offset = 0;
        first.memory = Bytes::from(vec![0x11u8]);
        let mut second = step("MSTORE8", 3);
        second.memory_size = 32;
        second.memory_offset = 1;
        second.memory = Bytes::from(vec![0x22u8]);

        let logs = TraceFormatter::new(&config).format(&[first, second]);
        let rendered = &logs[1].memory.as_ref().unwrap()[0];
        assert!(rendered.starts_with("1122"));
    }

    #[test]
    fn storage_present_only_when_step_has_writes() {
        let config = TraceConfig::default();
        let mut with_write = step("SSTORE", 9);
        with_write.storage.insert(
            H256::from_low_u64_be(1),
            H256::from_low_u64_be(0xbeef),
        );
        let without_write = step("ADD", 10);

        let logs = TraceFormatter::new(&config).format(&[with_write, without_write]);
        let storage = logs[0].storage.as_ref().unwrap();
        assert_eq!(storage.len(), 1);
        let key = format!("{}{}", "00".repeat(31), "01");
        assert_eq!(storage[&key], format!("{}{}", "00".repeat(30), "beef"));
        assert!(logs[1].storage.is_none());
    }

    #[test]
    fn storage_absent_when_disabled() {
        let config = TraceConfig {
            disable_storage: true,
            ..Default::default()
        };
        let mut raw = step("SSTORE", 9);
        raw.storage
            .insert(H256::from_low_u64_be(1), H256::from_low_u64_be(2));
        let logs = TraceFormatter::new(&config).format(&[raw]);
        assert!(logs[0].storage.is_none());
    }

    #[test]
    fn error_and_refund_are_always_carried() {
        let config = TraceConfig::default();
        let mut raw = step("REVERT", 12);
        raw.error = Some("execution reverted".to_string());
        raw.refund = 4800;
        let logs = TraceFormatter::new(&config).format(&[raw, step("ADD", 13)]);
        assert_eq!(logs[0].error, "execution reverted");
        assert_eq!(logs[0].refund, 4800);
        assert_eq!(logs[1].error, "");
    }
}
