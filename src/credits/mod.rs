pub mod dynamo;
pub mod error;
pub mod fake;
pub mod ledger;

pub use dynamo::DynamoCreditLedger;
pub use error::CreditError;
pub use fake::FakeCreditLedger;
pub use ledger::CreditLedger;
