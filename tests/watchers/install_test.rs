/*!
 * Install Tests
 * Repeated installation decorates each operation once
 */

use async_trait::async_trait;
use pretty_assertions::assert_eq;
use serde_json::json;
use std::sync::Arc;
use telltale::watchers::{Job, JobProcessor, Schedulable};
use telltale::{
    CursorRequest, EntryType, Facility, FacilityMap, Recorder, RecorderConfig,
};

struct Nightly;

#[async_trait]
impl Schedulable for Nightly {
    fn expression(&self) -> Option<String> {
        Some("0 3 * * *".into())
    }

    async fn run(&self) -> anyhow::Result<()> {
        Ok(())
    }
}

struct Mailer;

#[async_trait]
impl JobProcessor for Mailer {
    async fn process(&self, _: &Job) -> anyhow::Result<()> {
        Ok(())
    }
}

async fn statuses(recorder: &Recorder, entry_type: EntryType) -> Vec<String> {
    recorder.flush().await.unwrap();
    let page = recorder
        .paginator()
        .page(&CursorRequest::new().of_type(entry_type))
        .await
        .unwrap();
    page.data.iter().rev().filter_map(|e| e.status()).collect()
}

#[tokio::test]
async fn test_schedule_installed_twice_emits_once() {
    let recorder = Recorder::builder(RecorderConfig::default()).build().await.unwrap();
    let registry: FacilityMap<dyn Schedulable> = FacilityMap::new();
    registry.register("nightly", Arc::new(Nightly));

    assert_eq!(recorder.watchers().schedule.install(Some(&registry)), 1);
    assert_eq!(recorder.watchers().schedule.install(Some(&registry)), 0);

    registry.get("nightly").unwrap().run().await.unwrap();
    assert_eq!(statuses(&recorder, EntryType::Schedule).await, vec!["started", "completed"]);
}

#[tokio::test]
async fn test_new_task_picked_up_on_reinstall() {
    let recorder = Recorder::builder(RecorderConfig::default()).build().await.unwrap();
    let registry: FacilityMap<dyn Schedulable> = FacilityMap::new();
    registry.register("nightly", Arc::new(Nightly));
    recorder.watchers().schedule.install(Some(&registry));

    registry.register("hourly", Arc::new(Nightly));
    assert_eq!(recorder.watchers().schedule.install(Some(&registry)), 1);

    registry.get("nightly").unwrap().run().await.unwrap();
    registry.get("hourly").unwrap().run().await.unwrap();
    assert_eq!(statuses(&recorder, EntryType::Schedule).await.len(), 4);
}

#[tokio::test]
async fn test_job_processor_installed_twice_records_once() {
    let recorder = Recorder::builder(RecorderConfig::default()).build().await.unwrap();
    let processor: Facility<dyn JobProcessor> = Facility::new(Arc::new(Mailer));

    assert!(recorder.watchers().job.install(Some(&processor)));
    assert!(!recorder.watchers().job.install(Some(&processor)));

    processor
        .get()
        .unwrap()
        .process(&Job::new("welcome-email", "mail", json!({ "user": 7 })))
        .await
        .unwrap();
    assert_eq!(statuses(&recorder, EntryType::Job).await, vec!["completed"]);
}

#[tokio::test]
async fn test_disabled_recorder_installs_nothing() {
    let mut config = RecorderConfig::default();
    config.enabled = false;
    let recorder = Recorder::builder(config).build().await.unwrap();

    let registry: FacilityMap<dyn Schedulable> = FacilityMap::new();
    registry.register("nightly", Arc::new(Nightly));
    assert_eq!(recorder.watchers().schedule.install(Some(&registry)), 0);

    registry.get("nightly").unwrap().run().await.unwrap();
    assert!(statuses(&recorder, EntryType::Schedule).await.is_empty());
}
