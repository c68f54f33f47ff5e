pub mod error;
pub mod fake;
pub mod message;
#[allow(clippy::module_inception)]
pub mod queue;
pub mod sqs;
#[cfg(test)]
mod tests;

pub use error::QueueError;
pub use fake::FakeJobQueue;
pub use message::{dedup_key, Environment, JobMessage, WireTrackHint, JOB_TYPE_CROP};
pub use queue::{JobQueue, QueueReceipt};
pub use sqs::SqsJobQueue;
