/*!
 * Truncation Tests
 * Captured data is kept up to the size limit and replaced above it
 */

use async_trait::async_trait;
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use std::sync::Arc;
use telltale::extract::{guard_size, DataCapture};
use telltale::watchers::{Job, JobProcessor};
use telltale::{CursorRequest, EntryType, Facility, Recorder, RecorderConfig};

/// JSON string whose serialized form is exactly `n` bytes
fn serialized_len(n: usize) -> Value {
    Value::String("x".repeat(n - 2))
}

struct Noop;

#[async_trait]
impl JobProcessor for Noop {
    async fn process(&self, _: &Job) -> anyhow::Result<()> {
        Ok(())
    }
}

#[test]
fn test_boundary_is_inclusive() {
    let exact = serialized_len(4096);
    assert_eq!(guard_size(&exact, 4096), exact);
    assert_eq!(
        guard_size(&serialized_len(4097), 4096),
        json!({ "_truncated": true, "_size": 4097 })
    );
}

#[test]
fn test_capture_disabled_by_default() {
    let capture = DataCapture::from_config(&RecorderConfig::default());
    assert_eq!(capture.capture(&json!({ "secret": "token" })), None);
}

#[tokio::test]
async fn test_job_data_guarded_end_to_end() {
    let config = RecorderConfig::default().with_capture_data(true);
    let recorder = Recorder::builder(config).build().await.unwrap();
    let processor: Facility<dyn JobProcessor> = Facility::new(Arc::new(Noop));
    recorder.watchers().job.install(Some(&processor));

    let job = processor.get().unwrap();
    job.process(&Job::new("small", "default", serialized_len(4096)))
        .await
        .unwrap();
    job.process(&Job::new("large", "default", serialized_len(4097)))
        .await
        .unwrap();
    recorder.flush().await.unwrap();

    let page = recorder
        .paginator()
        .page(&CursorRequest::new().of_type(EntryType::Job))
        .await
        .unwrap();
    let (large, small) = (&page.data[0], &page.data[1]);
    assert_eq!(small.payload["data"], serialized_len(4096));
    assert_eq!(large.payload["data"], json!({ "_truncated": true, "_size": 4097 }));
    assert_eq!(large.payload["status"], json!("completed"));
}
