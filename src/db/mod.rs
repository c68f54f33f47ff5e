pub mod backend;
pub mod dynamo;
pub mod error;
pub mod fake;
pub mod models;
pub mod sqlite;
pub mod state;
pub mod store;
#[cfg(test)]
mod tests;

pub use backend::ProjectBackend;
pub use error::StoreError;
pub use fake::FakeProjectBackend;
pub use models::{
    derive_output_key, Project, S3Location, Size, TrackHint, TrackerOptions, TrackerOptionsPatch,
};
pub use state::ProjectState;
pub use store::ProjectStore;
