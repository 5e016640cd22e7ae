//! Save data through the runtime into SQLite and back

mod common;

use common::{collect, runtime, GUEST, PLAYER};
use gdkbridge_core::application::Correlator;
use gdkbridge_core::domain::{FileError, Outcome, SENTINEL_ERROR};
use serde_json::json;

#[tokio::test]
async fn test_save_then_load_roundtrip() {
    let runtime = runtime().await;
    let source = runtime.call("buffer_create", json!({"size": 6}));
    runtime.call(
        "buffer_write",
        json!({"buffer": source.value, "bytes": [10, 20, 30, 40, 50, 60]}),
    );
    assert!(runtime
        .call("xboxone_set_savedata_user", json!({"user": PLAYER}))
        .is_ok());

    let save = runtime.call(
        "gdk_save_buffer",
        json!({"buffer": source.value, "filename": "profile/progress.sav", "size": 6}),
    );
    let save_id = save.request_id().unwrap();
    let envelopes = collect(&runtime, 1).await;
    assert_eq!(envelopes[0].request_id(), Some(save_id));
    assert_eq!(envelopes[0].get_i64("status"), Some(1));

    let target = runtime.call("buffer_create", json!({"size": 6}));
    let load = runtime.call(
        "gdk_load_buffer",
        json!({"buffer": target.value, "filename": "profile/progress.sav"}),
    );
    let envelopes = collect(&runtime, 1).await;
    assert_eq!(envelopes[0].request_id(), load.request_id());
    assert_eq!(envelopes[0].get_i64("load_size"), Some(6));

    let bytes = runtime.call("buffer_read", json!({"buffer": target.value}));
    assert_eq!(bytes.value, json!([10, 20, 30, 40, 50, 60]));
}

#[tokio::test]
async fn test_missing_file_fails_asynchronously() {
    let runtime = runtime().await;
    let buffer = runtime.call("buffer_create", json!({"size": 4}));
    runtime.call("xboxone_set_savedata_user", json!({"user": PLAYER}));

    let load = runtime.call(
        "gdk_load_buffer",
        json!({"buffer": buffer.value, "filename": "never/written.sav"}),
    );
    // Issued fine; the failure arrives with the envelope
    assert!(load.is_ok());

    let mut correlator = Correlator::default();
    let ticket = correlator
        .track("gdk_load_buffer", load.request_id().unwrap())
        .unwrap();
    let envelopes = collect(&runtime, 1).await;
    let resolution = correlator.offer(&envelopes[0]).unwrap();
    assert_eq!(resolution.ticket, ticket);
    assert_eq!(
        resolution.outcome,
        Outcome::Failed {
            code: FileError::BlobNotFound.code()
        }
    );
}

#[tokio::test]
async fn test_out_of_range_save_fails_synchronously() {
    let runtime = runtime().await;
    let buffer = runtime.call("buffer_create", json!({"size": 4}));
    runtime.call("xboxone_set_savedata_user", json!({"user": PLAYER}));

    let save = runtime.call(
        "gdk_save_buffer",
        json!({"buffer": buffer.value, "filename": "a.sav", "size": 8}),
    );
    assert_eq!(save.sentinel(), -1);
    assert!(save.error.is_some());

    // No id was spent on the failed call
    let next = runtime.call(
        "gdk_save_buffer",
        json!({"buffer": buffer.value, "filename": "a.sav", "size": 4}),
    );
    assert_eq!(next.request_id().map(|id| id.value()), Some(0));
    collect(&runtime, 1).await;
}

#[tokio::test]
async fn test_users_have_separate_saves() {
    let runtime = runtime().await;
    let buffer = runtime.call("buffer_create", json!({"size": 2}));
    runtime.call("buffer_write", json!({"buffer": buffer.value, "bytes": [1, 2]}));

    runtime.call("xboxone_set_savedata_user", json!({"user": PLAYER}));
    runtime.call(
        "gdk_save_buffer",
        json!({"buffer": buffer.value, "filename": "shared.sav", "size": 2}),
    );
    collect(&runtime, 1).await;

    runtime.call("xboxone_set_savedata_user", json!({"user": GUEST}));
    runtime.call(
        "gdk_load_buffer",
        json!({"buffer": buffer.value, "filename": "shared.sav"}),
    );
    let envelopes = collect(&runtime, 1).await;
    assert_eq!(envelopes[0].get_i64("status"), Some(0));
    assert_eq!(
        envelopes[0].get_i64("error"),
        Some(FileError::BlobNotFound.code())
    );
}

#[tokio::test]
async fn test_many_saves_resolve_exactly_once() {
    let runtime = runtime().await;
    let buffer = runtime.call("buffer_create", json!({"size": 1}));
    runtime.call("xboxone_set_savedata_user", json!({"user": PLAYER}));

    let mut correlator = Correlator::default();
    let mut tickets = Vec::new();
    for i in 0..20 {
        let save = runtime.call(
            "gdk_save_buffer",
            json!({"buffer": buffer.value, "filename": format!("slots/{}.sav", i), "size": 1}),
        );
        tickets.push(
            correlator
                .track("gdk_save_buffer", save.request_id().unwrap())
                .unwrap(),
        );
    }

    let envelopes = collect(&runtime, 20).await;
    assert_eq!(envelopes.len(), 20);
    let mut resolved: Vec<_> = envelopes
        .iter()
        .filter_map(|e| correlator.offer(e))
        .map(|r| r.ticket)
        .collect();
    resolved.sort();
    assert_eq!(resolved, tickets);
    assert_eq!(correlator.pending_len(), 0);

    // Replaying the same envelopes resolves nothing
    assert!(envelopes.iter().all(|e| correlator.offer(e).is_none()));
}

#[tokio::test]
async fn test_extreme_ranges_fail_with_sentinel() {
    let runtime = runtime().await;
    let buffer = runtime.call("buffer_create", json!({"size": 4}));
    runtime.call("xboxone_set_savedata_user", json!({"user": PLAYER}));

    let save = runtime.call(
        "gdk_save_buffer",
        json!({"buffer": buffer.value, "filename": "a.sav", "offset": 1, "size": i64::MAX}),
    );
    assert_eq!(save.sentinel(), SENTINEL_ERROR);

    let load = runtime.call(
        "gdk_load_buffer",
        json!({"buffer": buffer.value, "filename": "a.sav", "offset": i64::MIN}),
    );
    assert_eq!(load.sentinel(), SENTINEL_ERROR);

    let write = runtime.call(
        "buffer_write",
        json!({"buffer": buffer.value, "offset": u64::MAX, "bytes": [1]}),
    );
    assert_eq!(write.sentinel(), SENTINEL_ERROR);

    let huge = runtime.call("buffer_create", json!({"size": 1_u64 << 50}));
    assert_eq!(huge.sentinel(), SENTINEL_ERROR);

    assert_eq!(runtime.stats().unwrap().issued_requests, 0);
    let bytes = runtime.call("buffer_read", json!({"buffer": buffer.value}));
    assert_eq!(bytes.value, json!([0, 0, 0, 0]));
}
