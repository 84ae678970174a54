use chrono::{NaiveDate, TimeZone, Utc};

use watify_core::{WatRecord, WatStatus};

use crate::error::StateError;
use crate::store::{DEFAULT_RECENT_LIMIT, RecordStore};

fn record_at(url: &str, date: (i32, u32, u32), secs: u32) -> WatRecord {
    let (y, m, d) = date;
    let now = Utc
        .with_ymd_and_hms(y, m, d, 0, 0, 0)
        .single()
        .expect("valid test date")
        + chrono::Duration::seconds(i64::from(secs));
    WatRecord::queued(url, now)
}

/// Run the full record store conformance test suite.
///
/// Call this from your backend's test module with a fresh store instance.
///
/// # Errors
///
/// Returns an error if any conformance test fails.
pub async fn run_store_conformance_tests(store: &dyn RecordStore) -> Result<(), StateError> {
    test_get_missing(store).await?;
    test_insert_then_query_recent(store).await?;
    test_insert_overwrites(store).await?;
    test_update_status_idempotent(store).await?;
    test_update_missing_is_not_found(store).await?;
    test_complete(store).await?;
    test_terminal_status_rejects_updates(store).await?;
    test_query_by_date_order_and_limit(store).await?;
    test_query_recent_cap(store).await?;
    Ok(())
}

async fn test_get_missing(store: &dyn RecordStore) -> Result<(), StateError> {
    let val = store.get("http://conformance/missing.jpg").await?;
    assert!(val.is_none(), "get on missing url should return None");
    Ok(())
}

async fn test_insert_then_query_recent(store: &dyn RecordStore) -> Result<(), StateError> {
    let url = "http://conformance/recent.jpg";
    let inserted = store.insert(url).await?;
    assert_eq!(inserted.status, WatStatus::Queued);

    let recent = store.query_recent(DEFAULT_RECENT_LIMIT).await?;
    let found = recent.iter().find(|r| r.url == url);
    assert!(found.is_some(), "freshly inserted url should be listed");
    assert_eq!(found.map(|r| r.status), Some(WatStatus::Queued));
    Ok(())
}

async fn test_insert_overwrites(store: &dyn RecordStore) -> Result<(), StateError> {
    let url = "http://conformance/requeue.jpg";
    store.insert(url).await?;
    store.update_status(url, WatStatus::Error).await?;
    store.insert(url).await?;

    let record = store.get(url).await?;
    assert_eq!(record.map(|r| r.status), Some(WatStatus::Queued));

    let today = store.query_recent(usize::MAX).await?;
    let copies = today.iter().filter(|r| r.url == url).count();
    assert_eq!(copies, 1, "re-queue must not duplicate the record");
    Ok(())
}

async fn test_update_status_idempotent(store: &dyn RecordStore) -> Result<(), StateError> {
    let url = "http://conformance/twice.jpg";
    store.insert(url).await?;
    store.update_status(url, WatStatus::Downloaded).await?;
    store.update_status(url, WatStatus::Downloaded).await?;

    let record = store.get(url).await?;
    assert_eq!(record.map(|r| r.status), Some(WatStatus::Downloaded));
    Ok(())
}

async fn test_update_missing_is_not_found(store: &dyn RecordStore) -> Result<(), StateError> {
    let url = "http://conformance/never-queued.jpg";
    let result = store.update_status(url, WatStatus::Downloaded).await;
    assert!(
        matches!(result, Err(StateError::NotFound(_))),
        "update on a missing record must fail with NotFound, got {result:?}"
    );
    let result = store.complete(url, "http://public/x.jpg").await;
    assert!(matches!(result, Err(StateError::NotFound(_))));
    assert!(store.get(url).await?.is_none(), "update must not create records");
    Ok(())
}

async fn test_complete(store: &dyn RecordStore) -> Result<(), StateError> {
    let url = "http://conformance/complete.jpg";
    store.insert(url).await?;
    store.update_status(url, WatStatus::Downloaded).await?;
    store.complete(url, "http://public/watified/c.jpg").await?;

    let record = store.get(url).await?.expect("record should exist");
    assert_eq!(record.status, WatStatus::Completed);
    assert_eq!(
        record.watified_url.as_deref(),
        Some("http://public/watified/c.jpg")
    );
    Ok(())
}

async fn test_terminal_status_rejects_updates(store: &dyn RecordStore) -> Result<(), StateError> {
    let url = "http://conformance/terminal.jpg";
    store.insert(url).await?;
    store.complete(url, "http://public/watified/t.jpg").await?;

    let result = store.update_status(url, WatStatus::Downloaded).await;
    assert!(
        matches!(
            result,
            Err(StateError::InvalidTransition {
                from: WatStatus::Completed,
                to: WatStatus::Downloaded
            })
        ),
        "completed records must not regress, got {result:?}"
    );
    let result = store.update_status(url, WatStatus::Error).await;
    assert!(matches!(result, Err(StateError::InvalidTransition { .. })));

    let record = store.get(url).await?.expect("record should exist");
    assert_eq!(record.status, WatStatus::Completed);
    Ok(())
}

async fn test_query_by_date_order_and_limit(store: &dyn RecordStore) -> Result<(), StateError> {
    let day = (2001, 2, 3);
    store.put(&record_at("http://conformance/d-1.jpg", day, 10)).await?;
    store.put(&record_at("http://conformance/d-3.jpg", day, 30)).await?;
    store.put(&record_at("http://conformance/d-2.jpg", day, 20)).await?;
    store
        .put(&record_at("http://conformance/other-day.jpg", (2001, 2, 4), 5))
        .await?;

    let date = NaiveDate::from_ymd_opt(2001, 2, 3).expect("valid date");
    let all = store.query_by_date(date, 10).await?;
    let urls: Vec<&str> = all.iter().map(|r| r.url.as_str()).collect();
    assert_eq!(
        urls,
        vec![
            "http://conformance/d-3.jpg",
            "http://conformance/d-2.jpg",
            "http://conformance/d-1.jpg"
        ],
        "records must come back newest first and only for the requested date"
    );

    let limited = store.query_by_date(date, 2).await?;
    assert_eq!(limited.len(), 2);
    assert_eq!(limited[0].url, "http://conformance/d-3.jpg");

    // Re-queuing moves a record to its new date partition.
    store
        .put(&record_at("http://conformance/d-1.jpg", (2001, 2, 4), 50))
        .await?;
    let moved = store.query_by_date(date, 10).await?;
    assert!(moved.iter().all(|r| r.url != "http://conformance/d-1.jpg"));
    Ok(())
}

async fn test_query_recent_cap(store: &dyn RecordStore) -> Result<(), StateError> {
    for i in 0..(DEFAULT_RECENT_LIMIT + 5) {
        store
            .insert(&format!("http://conformance/bulk-{i}.jpg"))
            .await?;
    }
    let recent = store.query_recent(DEFAULT_RECENT_LIMIT).await?;
    assert_eq!(recent.len(), DEFAULT_RECENT_LIMIT);

    let today = Utc::now().date_naive();
    assert!(recent.iter().all(|r| r.created_at_date == today));
    assert!(
        recent
            .windows(2)
            .all(|w| w[0].created_at_time >= w[1].created_at_time)
    );
    Ok(())
}
