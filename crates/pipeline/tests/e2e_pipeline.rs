use std::io::Cursor;
use std::sync::Arc;

use bytes::Bytes;
use image::{DynamicImage, ImageFormat, Rgb, RgbImage, Rgba, RgbaImage};
use serde_json::{Value, json};

use watify_blob::{MemoryObjectStore, ObjectStore};
use watify_compositor::{Compositor, Overlay};
use watify_core::{SOURCE_URL_METADATA, WatStatus, filename_for_url};
use watify_pipeline::testing::StubFetcher;
use watify_pipeline::{FetchError, Fetcher, ItemOutcome, Pipeline, PipelineError};
use watify_state::RecordStore;
use watify_state_memory::MemoryRecordStore;

const CAT: &str = "http://x/img.jpg";
const DEAD: &str = "http://unreachable.invalid/a.jpg";

struct Harness {
    store: Arc<MemoryRecordStore>,
    objects: Arc<MemoryObjectStore>,
    fetcher: Arc<StubFetcher>,
    pipeline: Pipeline,
}

fn jpeg(width: u32, height: u32) -> Bytes {
    let img = RgbImage::from_fn(width, height, |x, y| {
        Rgb([(x * 7 % 256) as u8, (y * 3 % 256) as u8, 128])
    });
    let mut out = Vec::new();
    DynamicImage::ImageRgb8(img)
        .write_to(&mut Cursor::new(&mut out), ImageFormat::Jpeg)
        .unwrap();
    Bytes::from(out)
}

fn overlay() -> Overlay {
    Overlay::from_image(RgbaImage::from_pixel(20, 10, Rgba([255, 0, 0, 200]))).unwrap()
}

fn harness(fetcher: StubFetcher) -> Harness {
    let store = Arc::new(MemoryRecordStore::new());
    let objects = Arc::new(MemoryObjectStore::new());
    let fetcher = Arc::new(fetcher);
    let pipeline = Pipeline::builder()
        .store(Arc::clone(&store) as Arc<dyn RecordStore>)
        .objects(Arc::clone(&objects) as Arc<dyn ObjectStore>)
        .fetcher(Arc::clone(&fetcher) as Arc<dyn Fetcher>)
        .compositor(Compositor::new(overlay()))
        .build()
        .unwrap();
    Harness {
        store,
        objects,
        fetcher,
        pipeline,
    }
}

fn stream_event(event: &str, url: &str, status: &str) -> Value {
    json!({
        "eventID": format!("{event}-{url}"),
        "eventName": event,
        "dynamodb": {
            "Keys": { "url": { "S": url } },
            "NewImage": {
                "url": { "S": url },
                "status": { "S": status },
                "created_at_date": { "S": "2017-06-23" },
                "created_at_time": { "N": "1498212000" }
            }
        }
    })
}

fn object_event(key: &str) -> Value {
    json!({
        "eventName": "ObjectCreated:Put",
        "s3": {
            "bucket": { "name": "wats" },
            "object": { "key": key, "size": 1024 }
        }
    })
}

fn batch(records: Vec<Value>) -> Value {
    json!({ "Records": records })
}

fn original_key_for(url: &str) -> String {
    format!("original/{}", filename_for_url(url))
}

async fn status_of(store: &MemoryRecordStore, url: &str) -> WatStatus {
    store.get(url).await.unwrap().unwrap().status
}

#[tokio::test]
async fn submitted_url_is_downloaded_and_archived() {
    let h = harness(StubFetcher::new().with_response(CAT, jpeg(64, 48)));

    let record = h.pipeline.ingest().create(CAT).await.unwrap();
    assert_eq!(record.status, WatStatus::Queued);

    let report = h
        .pipeline
        .download()
        .handle_notification(&batch(vec![stream_event("INSERT", CAT, "queued")]))
        .await
        .unwrap();
    assert_eq!(report.completed(), 1);

    let key = original_key_for(CAT);
    let stored = h.objects.get(&key).await.unwrap();
    assert_eq!(
        stored.metadata.get(SOURCE_URL_METADATA).map(String::as_str),
        Some(CAT)
    );
    assert_eq!(stored.body, jpeg(64, 48));
    assert_eq!(h.objects.is_public(&key), Some(true));
    assert_eq!(status_of(&h.store, CAT).await, WatStatus::Downloaded);
    assert_eq!(h.fetcher.requests(), vec![CAT.to_owned()]);
}

#[tokio::test]
async fn archived_original_is_watified_and_completed() {
    let h = harness(StubFetcher::new().with_response(CAT, jpeg(64, 48)));
    h.pipeline.ingest().create(CAT).await.unwrap();
    h.pipeline
        .download()
        .handle_notification(&batch(vec![stream_event("INSERT", CAT, "queued")]))
        .await
        .unwrap();

    let key = original_key_for(CAT);
    let report = h
        .pipeline
        .watify()
        .handle_notification(&batch(vec![object_event(&key)]))
        .await
        .unwrap();
    assert_eq!(report.completed(), 1);

    let watified_key = format!("watified/{}", filename_for_url(CAT));
    let watified = h.objects.get(&watified_key).await.unwrap();
    assert_eq!(watified.content_type.as_deref(), Some("image/jpeg"));
    let decoded = image::load_from_memory(&watified.body).unwrap();
    assert_eq!((decoded.width(), decoded.height()), (64, 48));

    let record = h.store.get(CAT).await.unwrap().unwrap();
    assert_eq!(record.status, WatStatus::Completed);
    assert_eq!(
        record.watified_url.as_deref(),
        Some(h.objects.public_url(&watified_key).as_str())
    );

    let metrics = h.pipeline.metrics().snapshot();
    assert_eq!(metrics.records_created, 1);
    assert_eq!(metrics.downloads_completed, 1);
    assert_eq!(metrics.watify_completed, 1);
}

#[tokio::test]
async fn one_failed_download_does_not_abort_the_batch() {
    let good = "http://x/good.jpg";
    let h = harness(StubFetcher::new().with_response(good, jpeg(16, 16)));
    h.pipeline.ingest().create(DEAD).await.unwrap();
    h.pipeline.ingest().create(good).await.unwrap();

    let report = h
        .pipeline
        .download()
        .handle_notification(&batch(vec![
            stream_event("INSERT", DEAD, "queued"),
            stream_event("INSERT", good, "queued"),
        ]))
        .await
        .unwrap();

    assert_eq!(report.len(), 2);
    assert!(matches!(
        report.outcome_for(DEAD),
        Some(ItemOutcome::Failed {
            error_recorded: true,
            ..
        })
    ));
    assert_eq!(report.outcome_for(good), Some(&ItemOutcome::Completed));
    assert_eq!(status_of(&h.store, DEAD).await, WatStatus::Error);
    assert_eq!(status_of(&h.store, good).await, WatStatus::Downloaded);
    assert!(!h.objects.contains(&original_key_for(DEAD)));

    let metrics = h.pipeline.metrics().snapshot();
    assert_eq!(metrics.downloads_failed, 1);
    assert_eq!(metrics.downloads_completed, 1);
    assert_eq!(metrics.error_status_unrecorded, 0);
}

#[tokio::test]
async fn http_error_status_marks_record_as_error() {
    let h = harness(StubFetcher::new().with_failure(CAT, FetchError::Status(404)));
    h.pipeline.ingest().create(CAT).await.unwrap();

    let report = h
        .pipeline
        .download()
        .handle_notification(&batch(vec![stream_event("INSERT", CAT, "queued")]))
        .await
        .unwrap();

    assert_eq!(report.failed(), 1);
    assert_eq!(status_of(&h.store, CAT).await, WatStatus::Error);
    assert!(h.objects.is_empty());
}

#[tokio::test]
async fn download_ignores_non_queued_changes() {
    let h = harness(StubFetcher::new().with_response(CAT, jpeg(8, 8)));
    h.pipeline.ingest().create(CAT).await.unwrap();

    let report = h
        .pipeline
        .download()
        .handle_notification(&batch(vec![
            stream_event("MODIFY", CAT, "downloaded"),
            stream_event("MODIFY", CAT, "completed"),
            stream_event("MODIFY", CAT, "error"),
            json!({
                "eventName": "REMOVE",
                "dynamodb": { "Keys": { "url": { "S": CAT } } }
            }),
        ]))
        .await
        .unwrap();

    assert_eq!(report.ignored(), 4);
    assert!(h.fetcher.requests().is_empty());
    assert_eq!(status_of(&h.store, CAT).await, WatStatus::Queued);
    assert_eq!(
        report.items[0].outcome,
        ItemOutcome::Ignored {
            reason: "status is downloaded".to_owned()
        }
    );
    assert_eq!(
        report.items[3].outcome,
        ItemOutcome::Ignored {
            reason: "record removed".to_owned()
        }
    );
}

#[tokio::test]
async fn malformed_items_are_rejected_individually() {
    let h = harness(StubFetcher::new().with_response(CAT, jpeg(8, 8)));
    h.pipeline.ingest().create(CAT).await.unwrap();

    let report = h
        .pipeline
        .download()
        .handle_notification(&batch(vec![
            json!({ "eventName": "INSERT" }),
            stream_event("INSERT", CAT, "queued"),
        ]))
        .await
        .unwrap();

    assert_eq!(report.rejected(), 1);
    assert_eq!(report.items[0].subject, None);
    assert_eq!(report.outcome_for(CAT), Some(&ItemOutcome::Completed));
    assert_eq!(h.pipeline.metrics().snapshot().events_rejected, 1);
}

#[tokio::test]
async fn malformed_envelope_fails_the_call() {
    let h = harness(StubFetcher::new());
    let result = h
        .pipeline
        .download()
        .handle_notification(&json!({ "records": [] }))
        .await;
    assert!(matches!(result, Err(PipelineError::Parse(_))));

    let result = h
        .pipeline
        .watify()
        .handle_notification(&json!({ "Records": "nope" }))
        .await;
    assert!(matches!(result, Err(PipelineError::Parse(_))));
}

#[tokio::test]
async fn download_overtaken_by_watify_is_superseded() {
    let h = harness(StubFetcher::new().with_response(CAT, jpeg(8, 8)));
    h.pipeline.ingest().create(CAT).await.unwrap();
    h.store
        .complete(CAT, "memory://blobs/watified/x.jpg")
        .await
        .unwrap();

    let report = h
        .pipeline
        .download()
        .handle_notification(&batch(vec![stream_event("INSERT", CAT, "queued")]))
        .await
        .unwrap();

    assert_eq!(report.superseded(), 1);
    let record = h.store.get(CAT).await.unwrap().unwrap();
    assert_eq!(record.status, WatStatus::Completed);
    assert!(record.watified_url.is_some());
    assert_eq!(h.pipeline.metrics().snapshot().superseded, 1);
}

#[tokio::test]
async fn watify_ignores_its_own_output() {
    let h = harness(StubFetcher::new());
    let report = h
        .pipeline
        .watify()
        .handle_notification(&batch(vec![object_event("watified/abc.jpg")]))
        .await
        .unwrap();

    assert_eq!(report.ignored(), 1);
    assert!(h.objects.is_empty());
}

#[tokio::test]
async fn watify_of_missing_original_reports_failure_without_record() {
    let h = harness(StubFetcher::new());
    let report = h
        .pipeline
        .watify()
        .handle_notification(&batch(vec![object_event("original/missing.jpg")]))
        .await
        .unwrap();

    assert!(matches!(
        report.outcome_for("original/missing.jpg"),
        Some(ItemOutcome::Failed {
            error_recorded: false,
            ..
        })
    ));
    assert_eq!(report.failed(), 1);
    assert_eq!(h.pipeline.metrics().snapshot().error_status_unrecorded, 1);
}

#[tokio::test]
async fn undecodable_original_marks_record_as_error() {
    let h = harness(StubFetcher::new().with_response(CAT, Bytes::from_static(b"not an image")));
    h.pipeline.ingest().create(CAT).await.unwrap();
    h.pipeline
        .download()
        .handle_notification(&batch(vec![stream_event("INSERT", CAT, "queued")]))
        .await
        .unwrap();
    assert_eq!(status_of(&h.store, CAT).await, WatStatus::Downloaded);

    let key = original_key_for(CAT);
    let report = h
        .pipeline
        .watify()
        .handle_notification(&batch(vec![object_event(&key)]))
        .await
        .unwrap();

    assert!(matches!(
        report.outcome_for(&key),
        Some(ItemOutcome::Failed {
            error_recorded: true,
            ..
        })
    ));
    assert_eq!(status_of(&h.store, CAT).await, WatStatus::Error);
    assert!(!h.objects.contains(&format!("watified/{}", filename_for_url(CAT))));
}

#[tokio::test]
async fn blob_write_failure_marks_record_as_error() {
    let h = harness(StubFetcher::new().with_response(CAT, jpeg(8, 8)));
    h.pipeline.ingest().create(CAT).await.unwrap();
    h.objects.set_read_only(true);

    let report = h
        .pipeline
        .download()
        .handle_notification(&batch(vec![stream_event("INSERT", CAT, "queued")]))
        .await
        .unwrap();

    assert_eq!(report.failed(), 1);
    assert_eq!(status_of(&h.store, CAT).await, WatStatus::Error);
}

#[tokio::test]
async fn space_encoded_keys_are_decoded() {
    let h = harness(StubFetcher::new());
    let original = RgbImage::from_pixel(10, 10, Rgb([0, 0, 255]));
    let mut body = Vec::new();
    DynamicImage::ImageRgb8(original)
        .write_to(&mut Cursor::new(&mut body), ImageFormat::Jpeg)
        .unwrap();
    let url = "http://x/with space.jpg";
    h.pipeline.ingest().create(url).await.unwrap();
    h.objects
        .put(
            watify_blob::PutObject::new("original/my file.jpg", Bytes::from(body), "image/jpeg")
                .with_metadata(SOURCE_URL_METADATA, url),
        )
        .await
        .unwrap();

    let report = h
        .pipeline
        .watify()
        .handle_notification(&batch(vec![object_event("original/my+file.jpg")]))
        .await
        .unwrap();

    assert_eq!(report.completed(), 1);
    assert!(h.objects.contains("watified/my file.jpg"));
    assert_eq!(status_of(&h.store, url).await, WatStatus::Completed);
}

#[tokio::test]
async fn redelivered_notifications_are_harmless() {
    let h = harness(StubFetcher::new().with_response(CAT, jpeg(32, 32)));
    h.pipeline.ingest().create(CAT).await.unwrap();
    let queued = batch(vec![stream_event("INSERT", CAT, "queued")]);
    let key = original_key_for(CAT);
    let archived = batch(vec![object_event(&key)]);

    let first_download = h.pipeline.download().handle_notification(&queued).await.unwrap();
    let first_watify = h.pipeline.watify().handle_notification(&archived).await.unwrap();
    let watified_url = h.store.get(CAT).await.unwrap().unwrap().watified_url;

    let second_download = h.pipeline.download().handle_notification(&queued).await.unwrap();
    let second_watify = h.pipeline.watify().handle_notification(&archived).await.unwrap();

    assert_eq!(first_download.outcome_for(CAT), Some(&ItemOutcome::Completed));
    assert_eq!(first_watify.outcome_for(&key), Some(&ItemOutcome::Completed));
    assert_eq!(second_download.outcome_for(CAT), Some(&ItemOutcome::Superseded));
    assert_eq!(second_watify.outcome_for(&key), Some(&ItemOutcome::Completed));

    let record = h.store.get(CAT).await.unwrap().unwrap();
    assert_eq!(record.status, WatStatus::Completed);
    assert!(watified_url.is_some());
    assert_eq!(record.watified_url, watified_url);
    assert_eq!(h.objects.len(), 2);
}

#[tokio::test]
async fn watify_without_record_reports_unrecorded_failure() {
    let h = harness(StubFetcher::new());
    let key = original_key_for(CAT);
    h.objects
        .put(
            watify_blob::PutObject::new(key.clone(), jpeg(16, 16), "image/jpeg")
                .with_metadata(SOURCE_URL_METADATA, CAT),
        )
        .await
        .unwrap();

    let report = h
        .pipeline
        .watify()
        .handle_notification(&batch(vec![object_event(&key)]))
        .await
        .unwrap();

    assert!(matches!(
        report.outcome_for(&key),
        Some(ItemOutcome::Failed {
            error_recorded: false,
            ..
        })
    ));
    assert!(h.store.is_empty());
    assert_eq!(h.pipeline.metrics().snapshot().error_status_unrecorded, 1);
}

#[tokio::test]
async fn change_feeds_carry_a_submission_to_completion() {
    let h = harness(StubFetcher::new().with_response(CAT, jpeg(24, 24)));
    let tasks = h.pipeline.spawn_change_feeds();

    h.pipeline.ingest().create(CAT).await.unwrap();

    let mut status = WatStatus::Queued;
    for _ in 0..200 {
        status = status_of(&h.store, CAT).await;
        if status == WatStatus::Completed {
            break;
        }
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    }
    assert_eq!(status, WatStatus::Completed);
    assert!(h.objects.contains(&format!("watified/{}", filename_for_url(CAT))));

    for task in tasks {
        task.abort();
    }
}
