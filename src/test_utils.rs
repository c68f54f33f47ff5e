use std::sync::Arc;

use crate::config::SubmitConfig;
use crate::credits::FakeCreditLedger;
use crate::db::{FakeProjectBackend, ProjectStore, Size, TrackHint};
use crate::pipeline::ProjectService;
use crate::queue::{Environment, FakeJobQueue};
use crate::s3::FakeObjectStorage;

pub const TEST_MAX_TRACK_HINTS: usize = 100;

/// The portrait output size used throughout the tests.
pub fn test_size() -> Size {
    Size {
        width: 720,
        height: 1280,
    }
}

pub fn test_submit_config() -> SubmitConfig {
    SubmitConfig {
        env: Environment::Testing,
        output_key_prefix: "tmp".to_string(),
        exclude_limbs: true,
        padding_ratio: 1.2,
        smoothing_window_secs: 2.0,
    }
}

/// A valid track hint at the given timestamp.
pub fn test_hint(time_secs: f64) -> TrackHint {
    TrackHint {
        time_secs,
        normalized_box: [0.25, 0.1, 0.5, 0.8],
    }
}

/// A full service wired to fakes, plus handles to each fake for assertions
/// and failure injection.
pub struct TestHarness {
    pub service: ProjectService<FakeJobQueue, FakeObjectStorage, FakeCreditLedger>,
    pub backend: FakeProjectBackend,
    pub queue: FakeJobQueue,
    pub storage: FakeObjectStorage,
    pub credits: FakeCreditLedger,
}

pub fn test_harness() -> TestHarness {
    let backend = FakeProjectBackend::new();
    let queue = FakeJobQueue::new();
    let storage = FakeObjectStorage::new();
    let credits = FakeCreditLedger::new();

    let store = ProjectStore::new(Arc::new(backend.clone()), TEST_MAX_TRACK_HINTS);
    let service = ProjectService::new(
        store,
        queue.clone(),
        storage.clone(),
        credits.clone(),
        test_submit_config(),
    );

    TestHarness {
        service,
        backend,
        queue,
        storage,
        credits,
    }
}
