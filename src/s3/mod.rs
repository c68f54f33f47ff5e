pub mod error;
pub mod fake;
pub mod real_s3;
pub mod storage;
#[cfg(test)]
mod tests;

pub use error::StorageError;
pub use fake::FakeObjectStorage;
pub use real_s3::S3ObjectStorage;
pub use storage::ObjectStorage;
