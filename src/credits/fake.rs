use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::credits::error::CreditError;
use crate::credits::ledger::CreditLedger;

/// A fake in-memory implementation of the CreditLedger trait for testing.
#[derive(Clone, Default)]
pub struct FakeCreditLedger {
    balances: Arc<RwLock<HashMap<String, u32>>>,
}

#[allow(dead_code)]
impl FakeCreditLedger {
    /// Create a new empty FakeCreditLedger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a user's balance.
    pub fn fake_set_credits(&self, user_id: &str, credits: u32) {
        self.balances
            .write()
            .unwrap()
            .insert(user_id.to_string(), credits);
    }
}

#[async_trait]
impl CreditLedger for FakeCreditLedger {
    async fn remaining(&self, user_id: &str) -> Result<u32, CreditError> {
        self.balances
            .read()
            .unwrap()
            .get(user_id)
            .copied()
            .ok_or_else(|| CreditError::UserNotFound(user_id.to_string()))
    }
}
