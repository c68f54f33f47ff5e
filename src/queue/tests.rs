use crate::queue::error::QueueError;
use crate::queue::message::{dedup_key, Environment, JobMessage, WireTrackHint, JOB_TYPE_CROP};
use crate::queue::{FakeJobQueue, JobQueue};
use crate::test_utils::test_hint;

fn test_message(project_id: &str) -> JobMessage {
    JobMessage {
        job_type: JOB_TYPE_CROP.to_string(),
        env: Environment::Testing,
        user_id: "u1".to_string(),
        project_id: project_id.to_string(),
        bucket: "b".to_string(),
        input_key: "tmp/u1/p1/in.mp4".to_string(),
        output_key: "tmp/u1/p1/out/in.mp4".to_string(),
        output_width: 720,
        output_height: 1280,
        exclude_limbs: true,
        padding_ratio: 1.2,
        smoothing_window_secs: 2.0,
        track_hints: Some(vec![WireTrackHint::from(&test_hint(3.5))]),
    }
}

#[test]
fn job_message_wire_format_is_fixed() {
    // The worker is a separate system; these field names are a contract.
    let json = serde_json::to_value(test_message("p1")).unwrap();

    assert_eq!(json["type"], "crop");
    assert_eq!(json["env"], "testing");
    assert_eq!(json["user_id"], "u1");
    assert_eq!(json["project_id"], "p1");
    assert_eq!(json["bucket"], "b");
    assert_eq!(json["input_key"], "tmp/u1/p1/in.mp4");
    assert_eq!(json["output_key"], "tmp/u1/p1/out/in.mp4");
    assert_eq!(json["output_width"], 720);
    assert_eq!(json["output_height"], 1280);
    assert_eq!(json["exclude_limbs"], true);
    assert_eq!(json["padding_ratio"], 1.2);
    assert_eq!(json["smoothing_window_secs"], 2.0);
    assert_eq!(json["track_hints"][0]["timeSecs"], 3.5);
    assert_eq!(json["track_hints"][0]["normLtwh"][2], 0.5);
}

#[test]
fn absent_track_hints_are_omitted() {
    let mut message = test_message("p1");
    message.track_hints = None;

    let json = serde_json::to_value(message).unwrap();
    assert!(json.get("track_hints").is_none());
}

#[test]
fn dedup_key_is_deterministic_per_project() {
    assert_eq!(dedup_key("p1"), "crop:p1");
    assert_eq!(test_message("p1").dedup_key(), test_message("p1").dedup_key());
    assert_ne!(test_message("p1").dedup_key(), test_message("p2").dedup_key());
}

#[tokio::test]
async fn fake_queue_deduplicates_resends() {
    let queue = FakeJobQueue::new();

    let first = queue.send_job(&test_message("p1")).await.unwrap();
    let second = queue.send_job(&test_message("p1")).await.unwrap();

    // Same dedup key: same receipt, one delivery.
    assert_eq!(first.message_id, second.message_id);
    assert_eq!(queue.fake_delivered_count(), 1);

    queue.send_job(&test_message("p2")).await.unwrap();
    assert_eq!(queue.fake_delivered_count(), 2);
}

#[tokio::test]
async fn fake_queue_recovers_after_transient_failures() {
    let queue = FakeJobQueue::new();
    queue.fake_fail_sends(1);

    let result = queue.send_job(&test_message("p1")).await;
    assert!(matches!(result, Err(QueueError::Unavailable(_))));
    assert!(result.unwrap_err().is_transient());

    queue.send_job(&test_message("p1")).await.unwrap();
    assert_eq!(queue.fake_delivered_count(), 1);
}
