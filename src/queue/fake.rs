use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

use crate::queue::error::QueueError;
use crate::queue::message::JobMessage;
use crate::queue::queue::{JobQueue, QueueReceipt};

/// `FakeJobQueue` is an in-memory implementation of the `JobQueue` trait for
/// testing. It mimics a FIFO queue's deduplication: a resend with a dedup
/// key it has already seen returns the original receipt without delivering a
/// second message.
#[derive(Clone, Default)]
pub struct FakeJobQueue {
    delivered: Arc<Mutex<Vec<JobMessage>>>,
    seen_keys: Arc<Mutex<HashMap<String, String>>>,
    failures_remaining: Arc<Mutex<u32>>,
}

#[allow(dead_code)]
impl FakeJobQueue {
    /// Create a new empty FakeJobQueue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulate a transient outage: the next `count` sends fail with
    /// `Unavailable` before the queue recovers.
    pub fn fake_fail_sends(&self, count: u32) {
        *self.failures_remaining.lock().unwrap() = count;
    }

    /// Messages accepted as new, in delivery order.
    pub fn fake_delivered(&self) -> Vec<JobMessage> {
        self.delivered.lock().unwrap().clone()
    }

    /// Number of messages accepted as new.
    pub fn fake_delivered_count(&self) -> usize {
        self.delivered.lock().unwrap().len()
    }
}

#[async_trait]
impl JobQueue for FakeJobQueue {
    async fn send_job(&self, message: &JobMessage) -> Result<QueueReceipt, QueueError> {
        {
            let mut failures = self.failures_remaining.lock().unwrap();
            if *failures > 0 {
                *failures -= 1;
                return Err(QueueError::Unavailable("fake queue is down".into()));
            }
        }

        let mut seen_keys = self.seen_keys.lock().unwrap();
        let dedup_key = message.dedup_key();
        if let Some(existing_id) = seen_keys.get(&dedup_key) {
            // Duplicate of an accepted message: same receipt, no redelivery.
            return Ok(QueueReceipt {
                message_id: existing_id.clone(),
            });
        }

        let message_id = Uuid::new_v4().to_string();
        seen_keys.insert(dedup_key, message_id.clone());
        self.delivered.lock().unwrap().push(message.clone());
        Ok(QueueReceipt { message_id })
    }
}
