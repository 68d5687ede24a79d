// dryrun/core/execution/src/config.rs

use serde::{Deserialize, Serialize};

/// One GAS in its smallest unit
pub const GAS_FACTOR: i64 = 100_000_000;

/// Limits applied to every session execution
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutionConfig {
    /// Gas ceiling of a single invocation
    pub max_gas_invoke: i64,
    /// Items drained from an iterator on the result stack
    pub max_iterator_result_items: usize,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            max_gas_invoke: 20 * GAS_FACTOR,
            max_iterator_result_items: 100,
        }
    }
}
