//! Unit tests for the job queue: admission, execution and cancellation

#[path = "../common/mod.rs"]
mod common;

use common::*;
use gen_studio::assets::ReferenceSet;
use gen_studio::error::AppError;
use gen_studio::provider::ProviderError;
use gen_studio::queue::{JobStatus, SubmitRequest, CANCELLED_MESSAGE, NO_IMAGES_MESSAGE};
use serde_json::{json, Map, Value};
use std::sync::atomic::Ordering;
use std::time::Duration;

fn request(prompt: &str, models: &[&str]) -> SubmitRequest {
    SubmitRequest {
        prompt: prompt.to_string(),
        model_ids: models.iter().map(|m| m.to_string()).collect(),
        inputs: Map::new(),
        references: ReferenceSet::new(),
    }
}

fn inputs(value: Value) -> Map<String, Value> {
    value.as_object().cloned().unwrap_or_default()
}

#[tokio::test]
async fn test_single_generation_scenario() {
    let harness = Harness::new(100);
    harness
        .provider
        .script(NANO_BANANA, Script::images(&["https://cdn.test/fox.png"]));

    let submission = harness
        .queue()
        .submit(request("a red fox", &[NANO_BANANA]))
        .await
        .unwrap();

    assert_eq!(submission.total_cost, 1);
    assert_eq!(submission.jobs.len(), 1);
    assert_eq!(submission.jobs[0].status, JobStatus::Pending);

    let job = wait_for_job(harness.queue(), &submission.jobs[0].id, |j| j.status == JobStatus::Done).await;
    assert_eq!(job.images, vec!["https://cdn.test/fox.png".to_string()]);
    assert!(job.started_at.is_some());
    assert!(job.error.is_none());

    wait_for_history(harness.history(), 1).await;
    let history = harness.history().list(None).await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].prompt, "a red fox");
    assert_eq!(history[0].invocation_id, NANO_BANANA);

    assert_eq!(harness.balance().await, 99);
}

#[tokio::test]
async fn test_compare_mode_partial_failure() {
    let harness = Harness::new(100);
    harness
        .provider
        .script(NANO_BANANA, Script::images(&["https://cdn.test/a.png"]));
    harness
        .provider
        .script(NANO_BANANA_PRO, Script::fail(ProviderError::new("Model overloaded")));

    let submission = harness
        .queue()
        .submit(request("a red fox", &[NANO_BANANA, NANO_BANANA_PRO]))
        .await
        .unwrap();
    assert_eq!(submission.jobs.len(), 2);

    let done = wait_for_job(harness.queue(), &submission.jobs[0].id, |j| j.status.is_terminal()).await;
    let failed = wait_for_job(harness.queue(), &submission.jobs[1].id, |j| j.status.is_terminal()).await;

    assert_eq!(done.status, JobStatus::Done);
    assert_eq!(failed.status, JobStatus::Error);
    assert_eq!(failed.error.as_deref(), Some("Model overloaded"));

    wait_for_history(harness.history(), 1).await;
    assert_eq!(harness.history().list(None).await.unwrap().len(), 1);

    // Only A's debit remains
    assert_eq!(harness.balance().await, 99);
}

#[tokio::test]
async fn test_admission_ceiling_rejects_whole_submission() {
    let harness = Harness::new(100);
    let (script, gate) = Script::images(&["https://cdn.test/x.png"]).held();
    harness.provider.script(NANO_BANANA, script);

    harness
        .queue()
        .submit(request("one", &[NANO_BANANA, NANO_BANANA, NANO_BANANA]))
        .await
        .unwrap();
    assert_eq!(harness.queue().active_count(), 3);

    let err = harness
        .queue()
        .submit(request("two", &[NANO_BANANA, NANO_BANANA, NANO_BANANA]))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::ParallelLimit { max: 5, available: 2 }));
    assert_eq!(harness.queue().jobs().len(), 3);

    harness
        .queue()
        .submit(request("three", &[NANO_BANANA, NANO_BANANA]))
        .await
        .unwrap();
    assert_eq!(harness.queue().active_count(), 5);

    gate.notify_waiters();
}

#[tokio::test]
async fn test_known_short_balance_rejects_before_any_job() {
    let harness = Harness::new(1);
    harness.session.ledger.refresh().await.unwrap();

    let err = harness
        .queue()
        .submit(request("fox", &[NANO_BANANA, NANO_BANANA_PRO]))
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::InsufficientTokens { required: 2, available: 1 }));
    assert!(harness.queue().jobs().is_empty());
    assert_eq!(harness.provider.call_count(), 0);
    assert_eq!(harness.balance().await, 1);
}

#[tokio::test]
async fn test_boundary_rejects_when_cache_is_unknown() {
    let harness = Harness::new(0);
    harness
        .provider
        .script(NANO_BANANA, Script::images(&["https://cdn.test/x.png"]));

    let submission = harness
        .queue()
        .submit(request("fox", &[NANO_BANANA]))
        .await
        .unwrap();

    let job = wait_for_job(harness.queue(), &submission.jobs[0].id, |j| j.status.is_terminal()).await;
    assert_eq!(job.status, JobStatus::Error);
    assert_eq!(job.error.as_deref(), Some("Insufficient tokens"));
    assert_eq!(harness.provider.call_count(), 0);
    assert_eq!(harness.balance().await, 0);
}

#[tokio::test]
async fn test_logs_are_appended_in_order_without_dedup() {
    let harness = Harness::new(100);
    harness.provider.script(
        NANO_BANANA,
        Script::images(&["https://cdn.test/x.png"]).with_logs(&[&["a", "b"], &["c"], &["c"]]),
    );

    let submission = harness
        .queue()
        .submit(request("fox", &[NANO_BANANA]))
        .await
        .unwrap();

    let job = wait_for_job(harness.queue(), &submission.jobs[0].id, |j| j.status == JobStatus::Done).await;
    assert_eq!(job.logs, vec!["a", "b", "c", "c"]);
}

#[tokio::test]
async fn test_cancellation_is_final() {
    let harness = Harness::new(100);
    let (script, gate) = Script::images(&["https://cdn.test/late.png"]).held();
    harness.provider.script(NANO_BANANA, script);

    let submission = harness
        .queue()
        .submit(request("fox", &[NANO_BANANA]))
        .await
        .unwrap();
    let id = submission.jobs[0].id.clone();
    wait_for_job(harness.queue(), &id, |j| j.status == JobStatus::Running).await;

    let cancelled = harness.queue().cancel(&id).unwrap();
    assert_eq!(cancelled.status, JobStatus::Error);
    assert_eq!(cancelled.error.as_deref(), Some(CANCELLED_MESSAGE));
    assert!(cancelled.cancel_token.is_none());

    gate.notify_one();
    tokio::time::sleep(Duration::from_millis(100)).await;

    let job = harness.queue().job(&id).unwrap();
    assert_eq!(job.status, JobStatus::Error);
    assert!(job.images.is_empty());
    assert!(harness.history().list(None).await.unwrap().is_empty());
    assert_eq!(harness.queue().active_count(), 0);
}

#[tokio::test]
async fn test_late_failure_after_cancel_is_discarded() {
    let harness = Harness::new(100);
    let (script, gate) = Script::fail(ProviderError::new("Model overloaded")).held();
    harness.provider.script(NANO_BANANA, script);

    let submission = harness
        .queue()
        .submit(request("fox", &[NANO_BANANA]))
        .await
        .unwrap();
    let id = submission.jobs[0].id.clone();
    wait_for_job(harness.queue(), &id, |j| j.status == JobStatus::Running).await;
    while harness.provider.call_count() < 1 {
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    tokio::time::sleep(Duration::from_millis(20)).await;

    harness.queue().cancel(&id).unwrap();
    gate.notify_one();

    let mut balance = harness.balance().await;
    for _ in 0..50 {
        if balance == 100 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
        balance = harness.balance().await;
    }
    assert_eq!(balance, 100);

    let job = harness.queue().job(&id).unwrap();
    assert_eq!(job.status, JobStatus::Error);
    assert_eq!(job.error.as_deref(), Some(CANCELLED_MESSAGE));
    assert!(harness.history().list(None).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_cancel_terminal_and_unknown_jobs() {
    let harness = Harness::new(100);
    harness
        .provider
        .script(NANO_BANANA, Script::images(&["https://cdn.test/x.png"]));

    let submission = harness
        .queue()
        .submit(request("fox", &[NANO_BANANA]))
        .await
        .unwrap();
    let id = submission.jobs[0].id.clone();
    wait_for_job(harness.queue(), &id, |j| j.status == JobStatus::Done).await;

    let unchanged = harness.queue().cancel(&id).unwrap();
    assert_eq!(unchanged.status, JobStatus::Done);

    let err = harness.queue().cancel("missing").unwrap_err();
    assert!(matches!(err, AppError::JobNotFound(_)));
}

#[tokio::test]
async fn test_zero_images_is_an_error() {
    let harness = Harness::new(100);
    harness.provider.script(NANO_BANANA, Script::images(&[]));

    let submission = harness
        .queue()
        .submit(request("fox", &[NANO_BANANA]))
        .await
        .unwrap();

    let job = wait_for_job(harness.queue(), &submission.jobs[0].id, |j| j.status.is_terminal()).await;
    assert_eq!(job.status, JobStatus::Error);
    assert_eq!(job.error.as_deref(), Some(NO_IMAGES_MESSAGE));
    assert!(harness.history().list(None).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_failure_message_prefers_detail_and_is_refunded() {
    let harness = Harness::new(100);
    harness.provider.script(
        NANO_BANANA_PRO,
        Script::fail(
            ProviderError::new("Request failed")
                .with_status(422)
                .with_detail("Prompt was flagged"),
        ),
    );

    let submission = harness
        .queue()
        .submit(request("fox", &[NANO_BANANA_PRO]))
        .await
        .unwrap();

    let job = wait_for_job(harness.queue(), &submission.jobs[0].id, |j| j.status.is_terminal()).await;
    assert_eq!(job.error.as_deref(), Some("Prompt was flagged"));
    assert_eq!(harness.balance().await, 100);
}

#[tokio::test]
async fn test_references_upload_once_and_use_edit_variants() {
    let harness = Harness::new(100);
    harness
        .provider
        .script("fal-ai/nano-banana/edit", Script::images(&["https://cdn.test/a.png"]));
    harness
        .provider
        .script("fal-ai/nano-banana-pro/edit", Script::images(&["https://cdn.test/b.png"]));

    let mut references = ReferenceSet::new();
    assert!(references.add_files(vec![png("ref.png")], true, 1024).is_empty());

    let submission = harness
        .queue()
        .submit(SubmitRequest {
            prompt: "fox".to_string(),
            model_ids: vec![NANO_BANANA.to_string(), NANO_BANANA_PRO.to_string()],
            inputs: inputs(json!({"num_images": 2, "aspect_ratio": "16:9"})),
            references,
        })
        .await
        .unwrap();

    assert_eq!(harness.uploader.calls.load(Ordering::SeqCst), 1);
    // Edit variants do not take num_images, so each costs a single output
    assert_eq!(submission.total_cost, 2);

    for job in &submission.jobs {
        assert!(job.invocation_id.ends_with("/edit"));
        assert_eq!(job.resolved_inputs["image_urls"], json!(["https://storage.test/ref.png"]));
        assert!(job.resolved_inputs.get("num_images").is_none());
        assert_eq!(job.resolved_inputs["prompt"], "fox");
    }
}

#[tokio::test]
async fn test_upload_failure_creates_no_jobs() {
    let harness = Harness::with_uploader(
        100,
        RecordingUploader {
            fail: true,
            ..Default::default()
        },
    );

    let mut references = ReferenceSet::new();
    references.add_files(vec![png("ref.png")], true, 1024);

    let err = harness
        .queue()
        .submit(SubmitRequest {
            prompt: "fox".to_string(),
            model_ids: vec![NANO_BANANA.to_string()],
            inputs: Map::new(),
            references,
        })
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::UploadFailed(_)));
    assert_eq!(harness.uploader.calls.load(Ordering::SeqCst), 3);
    assert!(harness.queue().jobs().is_empty());
}

#[tokio::test]
async fn test_compare_mode_dispatches_provider_native_aspect_ratio() {
    let harness = Harness::new(100);
    harness
        .provider
        .script(NANO_BANANA, Script::images(&["https://cdn.test/a.png"]));
    harness
        .provider
        .script(SEEDREAM, Script::images(&["https://cdn.test/b.png"]));

    let submission = harness
        .queue()
        .submit(SubmitRequest {
            prompt: "fox".to_string(),
            model_ids: vec![NANO_BANANA.to_string(), SEEDREAM.to_string()],
            inputs: inputs(json!({"aspect_ratio": "16:9"})),
            references: ReferenceSet::new(),
        })
        .await
        .unwrap();

    assert_eq!(submission.jobs[0].resolved_inputs["aspect_ratio"], "16:9");
    assert_eq!(submission.jobs[1].resolved_inputs["image_size"], "landscape_16_9");
    assert!(submission.jobs[1].resolved_inputs.get("aspect_ratio").is_none());
}

#[tokio::test]
async fn test_invalid_submissions() {
    let harness = Harness::new(100);

    let err = harness.queue().submit(request("   ", &[NANO_BANANA])).await.unwrap_err();
    assert!(matches!(err, AppError::InvalidRequest(_)));

    let err = harness.queue().submit(request("fox", &[])).await.unwrap_err();
    assert!(matches!(err, AppError::InvalidRequest(_)));

    let err = harness
        .queue()
        .submit(request("fox", &["acme/unknown"]))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::ModelNotFound(id) if id == "acme/unknown"));
    assert!(harness.queue().jobs().is_empty());
}

#[tokio::test]
async fn test_elapsed_time_advances_while_running() {
    let harness = Harness::new(100);
    let (script, gate) = Script::images(&["https://cdn.test/x.png"]).held();
    harness.provider.script(NANO_BANANA, script);

    let submission = harness
        .queue()
        .submit(request("fox", &[NANO_BANANA]))
        .await
        .unwrap();
    let id = submission.jobs[0].id.clone();

    let job = wait_for_job(harness.queue(), &id, |j| j.status == JobStatus::Running && j.elapsed_ms >= 30).await;
    assert!(job.elapsed_ms >= 30);

    gate.notify_one();
    wait_for_job(harness.queue(), &id, |j| j.status == JobStatus::Done).await;
}

#[tokio::test]
async fn test_dismiss_and_clear() {
    let harness = Harness::new(100);
    let (script, gate) = Script::images(&["https://cdn.test/x.png"]).held();
    harness.provider.script(NANO_BANANA, script);

    let submission = harness
        .queue()
        .submit(request("fox", &[NANO_BANANA, NANO_BANANA, NANO_BANANA]))
        .await
        .unwrap();
    for job in &submission.jobs {
        wait_for_job(harness.queue(), &job.id, |j| j.status == JobStatus::Running).await;
    }
    while harness.provider.call_count() < 3 {
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    tokio::time::sleep(Duration::from_millis(20)).await;

    let dismissed = harness.queue().dismiss(&submission.jobs[0].id).unwrap();
    assert_eq!(dismissed.status, JobStatus::Error);
    assert_eq!(harness.queue().jobs().len(), 2);

    assert_eq!(harness.queue().clear(), 2);
    assert!(harness.queue().jobs().is_empty());
    assert_eq!(harness.queue().active_count(), 0);

    assert!(matches!(
        harness.queue().dismiss(&submission.jobs[1].id),
        Err(AppError::JobNotFound(_))
    ));

    gate.notify_waiters();
    tokio::time::sleep(Duration::from_millis(100)).await;

    // Results of untracked jobs are dropped; the charges stand
    assert!(harness.queue().jobs().is_empty());
    assert!(harness.history().list(None).await.unwrap().is_empty());
    assert_eq!(harness.balance().await, 97);
}
