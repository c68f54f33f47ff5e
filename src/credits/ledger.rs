use async_trait::async_trait;
use std::sync::Arc;

use crate::credits::error::CreditError;

/// CreditLedger trait defining the read side of the per-user credit counter.
///
/// Job submission only checks the balance; spending is reconciled by the
/// billing system and is out of scope here.
#[async_trait]
pub trait CreditLedger: Send + Sync + 'static {
    /// Remaining credits for a user.
    async fn remaining(&self, user_id: &str) -> Result<u32, CreditError>;
}

/// Implementation of CreditLedger for Arc<T> where T implements
/// CreditLedger.
#[async_trait]
impl<T: CreditLedger + ?Sized> CreditLedger for Arc<T> {
    async fn remaining(&self, user_id: &str) -> Result<u32, CreditError> {
        (**self).remaining(user_id).await
    }
}
