//! Store and Xbox Live calls answered by the local platform

mod common;

use common::{collect, runtime, GUEST, PLAYER};
use gdkbridge_core::application::Correlator;
use gdkbridge_core::domain::{
    Outcome, Privilege, PrivilegeResult, ProductKind, SENTINEL_ERROR, SENTINEL_NO_CONTEXT,
};
use serde_json::json;
use std::time::Duration;

const GEM_PACK: &str = "9NBLGGH4R316";
const SEASON_PASS: &str = "9NBLGGH4R317";

#[tokio::test]
async fn test_consumable_fulfillment_replays_by_tracking_id() {
    let runtime = runtime().await;

    let balance = runtime.call(
        "ms_iap_QueryConsumableBalanceRemaining",
        json!({"user": PLAYER, "store_id": GEM_PACK}),
    );
    let envelopes = collect(&runtime, 1).await;
    assert_eq!(envelopes[0].request_id(), balance.request_id());
    assert_eq!(envelopes[0].get_bool("status"), Some(true));
    assert_eq!(envelopes[0].get_i64("quantity"), Some(25));

    let tracking_id = uuid::Uuid::new_v4().to_string();
    let args = json!({
        "user": PLAYER,
        "store_id": GEM_PACK,
        "quantity": 5,
        "tracking_id": tracking_id,
    });
    runtime.call("ms_iap_ReportConsumableFulfillment", args.clone());
    let first = collect(&runtime, 1).await;
    assert_eq!(first[0].get_i64("consumed_quantity"), Some(5));
    assert_eq!(first[0].get_i64("available_quantity"), Some(20));

    // Same tracking id reports the first fulfillment again
    runtime.call("ms_iap_ReportConsumableFulfillment", args);
    let replay = collect(&runtime, 1).await;
    assert_eq!(replay[0].get_i64("available_quantity"), Some(20));
}

#[tokio::test]
async fn test_purchase_shows_up_in_entitlements() {
    let runtime = runtime().await;
    let purchase = runtime.call(
        "ms_iap_ShowPurchaseUI",
        json!({"user": PLAYER, "store_id": SEASON_PASS}),
    );
    assert!(purchase.is_ok());
    // The overlay completes in the background without an envelope
    tokio::time::sleep(Duration::from_millis(50)).await;

    let query = runtime.call(
        "ms_iap_QueryEntitledProducts",
        json!({"user": PLAYER, "kinds": ProductKind::PASS.bits()}),
    );
    let mut correlator = Correlator::default();
    let ticket = correlator
        .track("ms_iap_QueryEntitledProducts", query.request_id().unwrap())
        .unwrap();

    let envelopes = collect(&runtime, 1).await;
    let resolution = correlator.offer(&envelopes[0]).unwrap();
    assert_eq!(resolution.ticket, ticket);
    assert!(resolution.outcome.is_success());

    let results = resolution.envelope.get("results").unwrap().as_array().unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0]["storeId"], SEASON_PASS);
}

#[tokio::test]
async fn test_privilege_result_matches_by_tag() {
    let runtime = runtime().await;
    let mut correlator = Correlator::default();

    let check = runtime.call(
        "xboxone_check_privilege",
        json!({
            "user": PLAYER,
            "privilege": Privilege::MultiplayerSessions.code(),
            "attempt_resolution": false,
        }),
    );
    assert!(check.is_ok());
    let ticket = correlator.track_tag("xboxone_check_privilege").unwrap();

    let envelopes = collect(&runtime, 1).await;
    let resolution = correlator.offer(&envelopes[0]).unwrap();
    assert_eq!(resolution.ticket, ticket);
    assert_eq!(resolution.request_id, None);
    assert_eq!(resolution.outcome, Outcome::Succeeded);

    runtime.call(
        "xboxone_check_privilege",
        json!({
            "user": PLAYER,
            "privilege": Privilege::InternetBrowsing.code(),
            "attempt_resolution": true,
        }),
    );
    correlator.track_tag("xboxone_check_privilege").unwrap();
    let envelopes = collect(&runtime, 1).await;
    assert_eq!(
        correlator.offer(&envelopes[0]).unwrap().outcome,
        Outcome::Failed {
            code: PrivilegeResult::PURCHASE_REQUIRED.bits() as i64
        }
    );
}

#[tokio::test]
async fn test_stats_flush_feeds_leaderboard() {
    let runtime = runtime().await;

    let add = runtime.call("xboxone_stats_add_user", json!({"user": PLAYER}));
    let envelopes = collect(&runtime, 1).await;
    assert_eq!(envelopes[0].request_id(), add.request_id());
    assert_eq!(envelopes[0].get_str("event"), Some("LocalUserAdded"));

    assert!(runtime
        .call(
            "xboxone_stats_set_stat_int",
            json!({"user": PLAYER, "name": "score", "value": 500}),
        )
        .is_ok());
    runtime.call("xboxone_stats_flush_user", json!({"user": PLAYER}));
    let envelopes = collect(&runtime, 1).await;
    assert_eq!(envelopes[0].get_str("event"), Some("StatisticUpdateComplete"));
    assert_eq!(envelopes[0].get_i64("error"), Some(0));

    let board = runtime.call(
        "xboxone_stats_get_leaderboard",
        json!({"user": PLAYER, "stat": "score", "num_entries": 10}),
    );
    let mut correlator = Correlator::default();
    correlator
        .track("xboxone_stats_get_leaderboard", board.request_id().unwrap())
        .unwrap();
    let envelopes = collect(&runtime, 1).await;
    let resolution = correlator.offer(&envelopes[0]).unwrap();
    assert!(resolution.outcome.is_success());

    let page = resolution.envelope;
    assert_eq!(page.get_i64("numentries"), Some(1));
    assert_eq!(page.get_str("Player0"), Some("Player One"));
    assert_eq!(page.get_i64("Rank0"), Some(1));
    assert_eq!(page.get_f64("Score0"), Some(500.0));
}

#[tokio::test]
async fn test_guest_without_live_context_gets_no_context_sentinel() {
    let runtime = runtime().await;

    let add = runtime.call("xboxone_stats_add_user", json!({"user": GUEST}));
    assert_eq!(add.sentinel(), SENTINEL_NO_CONTEXT);

    let progress = runtime.call(
        "xboxone_achievements_set_progress",
        json!({"user": GUEST, "achievement": "1", "progress": 10}),
    );
    assert_eq!(progress.sentinel(), SENTINEL_NO_CONTEXT);

    // Unknown users are a general failure
    let unknown = runtime.call("xboxone_stats_add_user", json!({"user": 404}));
    assert_eq!(unknown.sentinel(), SENTINEL_ERROR);

    assert_eq!(runtime.stats().unwrap().issued_requests, 0);
}

#[tokio::test]
async fn test_quit_then_init_restores_issuing() {
    let runtime = runtime().await;

    assert!(runtime.call("gdk_quit", json!({})).is_ok());
    let refused = runtime.call("ms_iap_QueryGameLicense", json!({"user": PLAYER}));
    assert_eq!(refused.sentinel(), SENTINEL_ERROR);

    assert!(runtime.call("gdk_init", json!({})).is_ok());
    let license = runtime.call("ms_iap_QueryGameLicense", json!({"user": PLAYER}));
    let id = license.request_id().unwrap();

    let envelopes = collect(&runtime, 1).await;
    assert_eq!(envelopes[0].request_id(), Some(id));
    assert_eq!(envelopes[0].get_bool("isActive"), Some(true));
}
