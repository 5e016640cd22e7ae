// Runtime - composition of the services around one event queue
//
// `call` is the dispatch-by-name entry used by the wire surface; `update`
// and `poll` drain the shared inbox in arrival order.

mod args;

use crate::application::base::UserService;
use crate::application::correlation::{event_queue, Inbox};
use crate::application::iap::IapService;
use crate::application::issuer::AsyncIssuer;
use crate::application::storage::{BufferPool, StorageService};
use crate::application::xbox_live::LiveService;
use crate::domain::{
    AchievementFilter, DomainError, Envelope, PackageKind, PackageScope, Privilege, RequestId,
    SENTINEL_ERROR,
};
use crate::error::{AppError, Result};
use crate::port::{IdProvider, LiveBackend, SaveStore, StoreBackend, StoreUi, UserDirectory};
use args::Args;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::runtime::Handle;
use tracing::{debug, info};

/// Adapters the runtime is assembled from
pub struct RuntimeDeps {
    pub directory: Arc<dyn UserDirectory>,
    pub store: Arc<dyn StoreBackend>,
    pub live: Arc<dyn LiveBackend>,
    pub saves: Arc<dyn SaveStore>,
    pub ids: Arc<dyn IdProvider>,
}

/// Result of a dispatched call. Synchronous failures carry the negative
/// sentinel in `value` and the reason in `error`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallOutcome {
    pub value: Value,
    pub error: Option<String>,
}

impl CallOutcome {
    pub fn ok(value: Value) -> Self {
        Self { value, error: None }
    }

    pub fn failed(error: &AppError) -> Self {
        Self {
            value: Value::from(error.sentinel()),
            error: Some(error.to_string()),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }

    /// The request id when the call issued one
    pub fn request_id(&self) -> Option<RequestId> {
        self.value.as_i64().and_then(RequestId::new)
    }

    /// `0` on success, otherwise the negative return code
    pub fn sentinel(&self) -> i64 {
        if self.is_ok() {
            0
        } else {
            self.value.as_i64().unwrap_or(SENTINEL_ERROR)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuntimeStats {
    pub issued_requests: u64,
    pub queued_envelopes: u64,
    pub delivered_envelopes: u64,
}

pub struct Runtime {
    users: UserService,
    storage: StorageService,
    iap: IapService,
    live: Arc<LiveService>,
    issuer: AsyncIssuer,
    inbox: Mutex<Inbox>,
}

fn id(result: Result<RequestId>) -> Result<Value> {
    result.map(|id| Value::from(id.value()))
}

fn done(result: Result<()>) -> Result<Value> {
    result.map(|()| Value::from(0))
}

impl Runtime {
    /// Wire every service to a fresh event queue completing on `handle`
    pub fn init(deps: RuntimeDeps, handle: Handle) -> Self {
        let (events, inbox) = event_queue();
        let issuer = AsyncIssuer::new(deps.ids, events, handle);

        let users = UserService::new(Arc::clone(&deps.directory), issuer.clone());
        let storage = StorageService::new(
            deps.saves,
            Arc::clone(&deps.directory),
            BufferPool::new(),
            issuer.clone(),
        );
        let iap = IapService::new(deps.store, Arc::clone(&deps.directory), issuer.clone());
        let live = Arc::new(LiveService::new(deps.live, deps.directory, issuer.clone()));

        info!(users = users.user_count(), "Runtime initialised");
        Self {
            users,
            storage,
            iap,
            live,
            issuer,
            inbox: Mutex::new(inbox),
        }
    }

    fn inbox(&self) -> Result<MutexGuard<'_, Inbox>> {
        self.inbox
            .lock()
            .map_err(|_| AppError::Internal("inbox lock poisoned".to_string()))
    }

    pub fn users(&self) -> &UserService {
        &self.users
    }

    pub fn storage(&self) -> &StorageService {
        &self.storage
    }

    pub fn iap(&self) -> &IapService {
        &self.iap
    }

    pub fn live(&self) -> Arc<LiveService> {
        Arc::clone(&self.live)
    }

    pub fn is_running(&self) -> bool {
        self.issuer.is_running()
    }

    /// One update step: everything that arrived since the previous step
    pub fn update(&self) -> Result<Vec<Envelope>> {
        Ok(self.inbox()?.drain())
    }

    pub fn poll(&self, max: usize) -> Result<Vec<Envelope>> {
        Ok(self.inbox()?.drain_up_to(max))
    }

    /// Stop accepting issuing calls; in-flight work still posts its envelope
    pub fn quit(&self) {
        self.issuer.stop();
        info!("Runtime stopped");
    }

    pub fn stats(&self) -> Result<RuntimeStats> {
        let inbox = self.inbox()?;
        Ok(RuntimeStats {
            issued_requests: self.issuer.issued(),
            queued_envelopes: inbox.pending_len(),
            delivered_envelopes: inbox.delivered(),
        })
    }

    pub fn call(&self, function: &str, args: Value) -> CallOutcome {
        match self.dispatch(function, args) {
            Ok(value) => {
                debug!(function = %function, result = %value, "Call dispatched");
                CallOutcome::ok(value)
            }
            Err(e) => {
                debug!(function = %function, error = %e, "Call failed");
                CallOutcome::failed(&e)
            }
        }
    }

    fn dispatch(&self, function: &str, args: Value) -> Result<Value> {
        let a = Args::new(function, args)?;
        match function {
            // Management
            "gdk_init" => {
                self.issuer.start();
                Ok(Value::from(0))
            }
            "gdk_update" => Ok(Value::from(self.inbox()?.pending_len())),
            "gdk_quit" => {
                self.quit();
                Ok(Value::from(0))
            }

            // Users
            "xboxone_get_activating_user" => Ok(Value::from(self.users.activating_user().value())),
            "xboxone_get_user_count" => Ok(Value::from(self.users.user_count() as u64)),
            "xboxone_get_user" => Ok(Value::from(self.users.user(a.value("index")?).value())),
            "xboxone_show_account_picker" => done(
                self.users
                    .show_account_picker(a.or("pad_id", 0)?, a.or("allow_guests", false)?),
            ),
            "xboxone_get_token_and_signature" => done(self.users.get_token_and_signature(
                a.user()?,
                &a.string("url")?,
                &a.string("method")?,
                &a.or("headers", String::new())?,
                a.or("body", String::new())?.into_bytes(),
                a.or("force_refresh", false)?,
            )),
            "xboxone_gamertag_for_user" => Ok(Value::from(self.users.gamertag_for_user(a.user()?))),
            "xboxone_unique_modern_gamertag_for_user" => Ok(Value::from(
                self.users.unique_modern_gamertag_for_user(a.user()?),
            )),
            "xboxone_modern_gamertag_suffix_for_user" => Ok(Value::from(
                self.users.modern_gamertag_suffix_for_user(a.user()?),
            )),
            "xboxone_modern_gamertag_for_user" => Ok(Value::from(
                self.users.modern_gamertag_for_user(a.user()?),
            )),

            // Buffers
            "buffer_create" => Ok(Value::from(
                self.storage.buffers().create(a.value::<usize>("size")?)?,
            )),
            "buffer_write" => done(self.storage.buffers().write(
                a.value("buffer")?,
                a.or("offset", 0_usize)?,
                &a.value::<Vec<u8>>("bytes")?,
            )),
            "buffer_read" => Ok(Value::from(self.storage.buffers().read(a.value("buffer")?)?)),
            "buffer_get_size" => Ok(Value::from(
                self.storage.buffers().len(a.value("buffer")?)? as u64,
            )),
            "buffer_delete" => done(self.storage.buffers().delete(a.value("buffer")?)),

            // Save data
            "xboxone_set_savedata_user" => done(self.storage.set_savedata_user(a.user()?)),
            "xboxone_get_savedata_user" => Ok(Value::from(self.storage.savedata_user()?.value())),
            "gdk_save_set_uwp_compatibility" | "xboxone_set_savedata_uwp_compatibility" => done(
                self.storage
                    .set_savedata_uwp_compatibility(a.value("enabled")?),
            ),
            "gdk_save_buffer" => id(self.storage.save_buffer(
                a.value("buffer")?,
                &a.string("filename")?,
                a.or("offset", 0)?,
                a.value("size")?,
            )),
            "gdk_load_buffer" => id(self.storage.load_buffer(
                a.value("buffer")?,
                &a.string("filename")?,
                a.or("offset", 0)?,
                a.or("size", -1)?,
            )),
            "gdk_save_group_begin" => done(
                self.storage
                    .save_group_begin(&a.or("name", String::new())?),
            ),
            "gdk_save_group_end" => id(self.storage.save_group_end()),

            // In-app purchases
            "ms_iap_AcquireLicenseForDurables" => id(self
                .iap
                .acquire_license_for_durables(a.user()?, &a.string("store_id")?)),
            "ms_iap_AcquireLicenseForPackage" => id(self
                .iap
                .acquire_license_for_package(a.user()?, &a.string("package_id")?)),
            "ms_iap_CanAcquireLicenseForPackage" => id(self
                .iap
                .can_acquire_license_for_package(a.user()?, &a.string("package_id")?)),
            "ms_iap_CanAcquireLicenseForStoreId" => id(self
                .iap
                .can_acquire_license_for_store_id(a.user()?, &a.string("store_id")?)),
            "ms_iap_DownloadAndInstallPackages" => id(self
                .iap
                .download_and_install_packages(a.user()?, a.value("package_ids")?)),
            "ms_iap_EnumeratePackages" => id(self.iap.enumerate_packages(
                a.or("kind", PackageKind::Content)?,
                a.or("scope", PackageScope::ThisAndRelated)?,
            )),
            "ms_iap_MountPackage" => id(self.iap.mount_package(&a.string("package_id")?)),
            "ms_iap_UnmountPackage" => id(self.iap.unmount_package(&a.string("package_id")?)),
            "ms_iap_QueryAddOnLicenses" => id(self.iap.query_addon_licenses(a.user()?)),
            "ms_iap_QueryAssociatedProducts" => id(self
                .iap
                .query_associated_products(a.user()?, a.kinds("kinds")?)),
            "ms_iap_QueryConsumableBalanceRemaining" => id(self
                .iap
                .query_consumable_balance_remaining(a.user()?, &a.string("store_id")?)),
            "ms_iap_QueryEntitledProducts" => id(self
                .iap
                .query_entitled_products(a.user()?, a.kinds("kinds")?)),
            "ms_iap_QueryGameLicense" => id(self.iap.query_game_license(a.user()?)),
            "ms_iap_QueryProductForCurrentGame" => {
                id(self.iap.query_product_for_current_game(a.user()?))
            }
            "ms_iap_QueryProductForPackage" => id(self.iap.query_product_for_package(
                a.user()?,
                &a.string("store_id")?,
                a.kinds("kinds")?,
            )),
            "ms_iap_QueryProducts" => id(self.iap.query_products(
                a.user()?,
                a.kinds("kinds")?,
                a.or("store_ids", Vec::new())?,
                a.or("action_filters", Vec::new())?,
            )),
            "ms_iap_ReportConsumableFulfillment" => id(self.iap.report_consumable_fulfillment(
                a.user()?,
                &a.string("store_id")?,
                a.value("quantity")?,
                &a.string("tracking_id")?,
            )),
            "ms_iap_ReleaseLicenseForDurables" => done(
                self.iap
                    .release_license_for_durables(&a.string("store_id")?),
            ),
            "ms_iap_ReleaseLicenseForPackage" => done(
                self.iap
                    .release_license_for_package(&a.string("package_id")?),
            ),
            "ms_iap_ShowAssociatedProductsUI" => done(self.iap.show_ui(StoreUi::AssociatedProducts {
                user: a.user()?,
                store_id: a.string("store_id")?,
                kinds: a.kinds("kinds")?,
            })),
            "ms_iap_ShowProductPageUI" => done(self.iap.show_ui(StoreUi::ProductPage {
                user: a.user()?,
                store_id: a.string("store_id")?,
            })),
            "ms_iap_ShowPurchaseUI" => done(self.iap.show_ui(StoreUi::Purchase {
                user: a.user()?,
                store_id: a.string("store_id")?,
                name: a.or("name", String::new())?,
                json: a.or("json", String::new())?,
            })),
            "ms_iap_ShowRateAndReviewUI" => {
                done(self.iap.show_ui(StoreUi::RateAndReview { user: a.user()? }))
            }
            "ms_iap_ShowRedeemTokenUI" => done(self.iap.show_ui(StoreUi::RedeemToken {
                user: a.user()?,
                token: a.string("token")?,
                allowed_store_ids: a.or("allowed_store_ids", Vec::new())?,
                disallow_csv_redemption: a.or("disallow_csv_redemption", false)?,
            })),

            // Achievements and privileges
            "xboxone_achievements_set_progress" => id(self.live.achievements_set_progress(
                a.user()?,
                &a.string("achievement")?,
                a.value("progress")?,
            )),
            "xboxone_get_achievement" => id(self
                .live
                .get_achievement(a.user()?, &a.string("achievement")?)),
            "xboxone_check_privilege" => {
                let code: u32 = a.value("privilege")?;
                let privilege = Privilege::from_code(code).ok_or_else(|| {
                    AppError::Validation(format!("unknown privilege {}", code))
                })?;
                done(self.live.check_privilege(
                    a.user()?,
                    privilege,
                    a.or("attempt_resolution", false)?,
                ))
            }

            // Events, leaderboards and presence
            "xboxone_stats_setup" => done(self.live.stats_setup(
                a.user()?,
                &a.string("scid")?,
                a.title_id("title_id")?,
            )),
            "xboxone_fire_event" => done(
                self.live
                    .fire_event(&a.string("name")?, a.or("params", Vec::new())?),
            ),
            "xboxone_read_player_leaderboard" => id(self.live.read_player_leaderboard(
                &a.string("ident")?,
                a.user()?,
                a.value("num_items")?,
                a.or("filter", AchievementFilter::AllPlayers)?,
            )),
            "xboxone_set_rich_presence" => done(self.live.set_rich_presence(
                a.user()?,
                a.or("is_active", true)?,
                &a.string("presence_id")?,
                a.optional::<String>("scid")?.as_deref(),
            )),

            // Stats manager
            "xboxone_stats_add_user" => id(self.live.stats_add_user(a.user()?)),
            "xboxone_stats_remove_user" => id(self.live.stats_remove_user(a.user()?)),
            "xboxone_stats_flush_user" => id(self
                .live
                .stats_flush_user(a.user()?, a.or("high_priority", false)?)),
            "xboxone_stats_get_stat" => Ok(self
                .live
                .stats_get_stat(a.user()?, &a.string("name")?)?
                .map(Value::from)
                .unwrap_or(Value::Null)),
            "xboxone_stats_get_stat_names" => {
                Ok(Value::from(self.live.stats_get_stat_names(a.user()?)?))
            }
            "xboxone_stats_set_stat_int" => done(self.live.stats_set_stat_int(
                a.user()?,
                &a.string("name")?,
                a.value("value")?,
            )),
            "xboxone_stats_set_stat_real" => done(self.live.stats_set_stat_real(
                a.user()?,
                &a.string("name")?,
                a.value("value")?,
            )),
            "xboxone_stats_set_stat_string" => done(self.live.stats_set_stat_string(
                a.user()?,
                &a.string("name")?,
                &a.string("value")?,
            )),
            "xboxone_stats_delete_stat" => done(
                self.live
                    .stats_delete_stat(a.user()?, &a.string("name")?),
            ),
            "xboxone_stats_get_leaderboard" => id(self.live.stats_get_leaderboard(
                a.user()?,
                &a.string("stat")?,
                a.value("num_entries")?,
                a.or("start_rank", 0)?,
                a.or("start_at_user", false)?,
                a.or("ascending", false)?,
            )),
            "xboxone_stats_get_social_leaderboard" => id(self.live.stats_get_social_leaderboard(
                a.user()?,
                &a.string("stat")?,
                a.value("num_entries")?,
                a.or("start_rank", 0)?,
                a.or("start_at_user", false)?,
                a.or("ascending", false)?,
                a.or("favourites_only", false)?,
            )),

            other => Err(DomainError::UnknownOperation(other.to_string()).into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{AsyncChannel, UserProfile};
    use crate::port::live_backend::mocks::RecordingLive;
    use crate::port::save_store::mocks::MemorySaveStore;
    use crate::port::store_backend::mocks::MockStore;
    use crate::port::user_directory::mocks::StaticUserDirectory;
    use crate::port::SequentialIdProvider;
    use serde_json::json;
    use std::time::Duration;

    fn runtime() -> Runtime {
        let directory = Arc::new(StaticUserDirectory::new(vec![
            UserProfile::new(crate::domain::UserId::new(11), "Alpha"),
            UserProfile::new(crate::domain::UserId::new(12), "Beta"),
        ]));
        Runtime::init(
            RuntimeDeps {
                directory,
                store: Arc::new(MockStore::new(vec![])),
                live: Arc::new(RecordingLive::new()),
                saves: Arc::new(MemorySaveStore::new()),
                ids: Arc::new(SequentialIdProvider::new()),
            },
            Handle::current(),
        )
    }

    async fn wait_for(runtime: &Runtime, count: usize) -> Vec<Envelope> {
        let mut seen = Vec::new();
        for _ in 0..100 {
            seen.extend(runtime.update().unwrap());
            if seen.len() >= count {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        seen
    }

    #[tokio::test]
    async fn test_save_and_load_through_calls() {
        let runtime = runtime();
        let buffer = runtime.call("buffer_create", json!({"size": 4}));
        assert_eq!(buffer.value, json!(0));
        runtime.call("buffer_write", json!({"buffer": 0, "bytes": [1, 2, 3, 4]}));
        runtime.call("xboxone_set_savedata_user", json!({"user": 11}));

        let save = runtime.call(
            "gdk_save_buffer",
            json!({"buffer": 0, "filename": "slot/one.sav", "size": 4}),
        );
        let save_id = save.request_id().unwrap();

        let envelopes = wait_for(&runtime, 1).await;
        assert_eq!(envelopes.len(), 1);
        assert_eq!(envelopes[0].channel, AsyncChannel::SaveLoad);
        assert_eq!(envelopes[0].request_id(), Some(save_id));
        assert_eq!(envelopes[0].get_i64("status"), Some(1));

        runtime.call("buffer_create", json!({"size": 4}));
        let load = runtime.call(
            "gdk_load_buffer",
            json!({"buffer": 1, "filename": "slot/one.sav"}),
        );
        assert!(load.is_ok());
        let envelopes = wait_for(&runtime, 1).await;
        assert_eq!(envelopes[0].get_i64("status"), Some(1));
        assert_eq!(
            runtime.call("buffer_read", json!({"buffer": 1})).value,
            json!([1, 2, 3, 4])
        );
    }

    #[tokio::test]
    async fn test_sync_failures_return_sentinels() {
        let runtime = runtime();
        let missing_buffer = runtime.call(
            "gdk_save_buffer",
            json!({"buffer": 9, "filename": "a", "size": 1}),
        );
        assert_eq!(missing_buffer.value, json!(-1));
        assert!(missing_buffer.error.is_some());

        let unknown = runtime.call("no_such_function", Value::Null);
        assert_eq!(unknown.sentinel(), -1);

        let bad_args = runtime.call("ms_iap_QueryGameLicense", json!({"user": "nope"}));
        assert_eq!(bad_args.sentinel(), -1);
        assert_eq!(runtime.stats().unwrap().issued_requests, 0);
    }

    #[tokio::test]
    async fn test_quit_then_init() {
        let runtime = runtime();
        runtime.call("gdk_quit", Value::Null);
        assert!(!runtime.is_running());
        let refused = runtime.call("ms_iap_QueryGameLicense", json!({"user": 11}));
        assert!(!refused.is_ok());
        assert_eq!(runtime.stats().unwrap().issued_requests, 0);

        runtime.call("gdk_init", Value::Null);
        let accepted = runtime.call("ms_iap_QueryGameLicense", json!({"user": 11}));
        assert_eq!(accepted.request_id().map(|id| id.value()), Some(0));
    }

    #[tokio::test]
    async fn test_stats_counters() {
        let runtime = runtime();
        runtime.call("ms_iap_QueryAddOnLicenses", json!({"user": 11}));
        runtime.call("ms_iap_QueryAddOnLicenses", json!({"user": 12}));
        let envelopes = wait_for(&runtime, 2).await;
        assert_eq!(envelopes.len(), 2);

        let stats = runtime.stats().unwrap();
        assert_eq!(stats.issued_requests, 2);
        assert_eq!(stats.delivered_envelopes, 2);
        assert_eq!(stats.queued_envelopes, 0);
    }

    #[tokio::test]
    async fn test_user_queries() {
        let runtime = runtime();
        assert_eq!(runtime.call("xboxone_get_user_count", Value::Null).value, json!(2));
        assert_eq!(
            runtime.call("xboxone_get_user", json!({"index": 1})).value,
            json!(12)
        );
        assert_eq!(
            runtime.call("xboxone_get_user", json!({"index": 5})).value,
            json!(0)
        );
        assert_eq!(
            runtime
                .call("xboxone_gamertag_for_user", json!({"user": 11}))
                .value,
            json!("Alpha")
        );
    }
}
