//! Method-specific parameter construction.
//!
//! A strategy turns the transfer amount into the JSON parameters a method
//! expects. The node encodes that JSON into the method's native form.

use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::blockchain::types::{MethodNum, TokenAmount};

/// Builds JSON parameters for one method.
pub trait ParamStrategy: Send + Sync {
    fn build(&self, amount: TokenAmount) -> Result<Value, serde_json::Error>;
}

/// Miner `WithdrawBalance` (method 16).
#[derive(Debug, Clone, Copy, Default)]
pub struct WithdrawBalance;

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct WithdrawBalanceParams {
    amount_requested: TokenAmount,
}

impl ParamStrategy for WithdrawBalance {
    fn build(&self, amount: TokenAmount) -> Result<Value, serde_json::Error> {
        serde_json::to_value(WithdrawBalanceParams {
            amount_requested: amount,
        })
    }
}

/// Method id → parameter strategy.
#[derive(Clone)]
pub struct ParamRegistry {
    strategies: HashMap<MethodNum, Arc<dyn ParamStrategy>>,
}

impl ParamRegistry {
    /// Registry with no strategies; every method is sent without params.
    pub fn empty() -> Self {
        Self {
            strategies: HashMap::new(),
        }
    }

    /// Replaces any strategy already registered for `method`.
    pub fn register(&mut self, method: MethodNum, strategy: Arc<dyn ParamStrategy>) -> &mut Self {
        self.strategies.insert(method, strategy);
        self
    }

    pub fn get(&self, method: MethodNum) -> Option<&Arc<dyn ParamStrategy>> {
        self.strategies.get(&method)
    }
}

impl Default for ParamRegistry {
    fn default() -> Self {
        let mut registry = Self::empty();
        registry.register(MethodNum::WITHDRAW_BALANCE, Arc::new(WithdrawBalance));
        registry
    }
}

impl fmt::Debug for ParamRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut methods: Vec<_> = self.strategies.keys().map(|m| m.0).collect();
        methods.sort_unstable();
        f.debug_struct("ParamRegistry").field("methods", &methods).finish()
    }
}
