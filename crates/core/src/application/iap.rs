// In-App Purchase Service
//
// Issuing calls validate synchronously, allocate an id and complete on the
// store backend; results arrive as `iap` envelopes typed `<function>_result`.

use crate::application::issuer::AsyncIssuer;
use crate::domain::{AsyncChannel, Envelope, PackageKind, PackageScope, ProductKind, RequestId, UserId};
use crate::error::{AppError, Result};
use crate::port::{StoreBackend, StoreUi, UserDirectory};
use serde::Serialize;
use serde_json::{Map, Value};
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, warn};
use uuid::Uuid;

type Fields = Map<String, Value>;

/// Key names for the id and status fields of a result envelope
#[derive(Clone, Copy)]
struct ResultKeys {
    id: &'static str,
    status: &'static str,
}

const STANDARD: ResultKeys = ResultKeys {
    id: "id",
    status: "status",
};

const CAN_ACQUIRE: ResultKeys = ResultKeys {
    id: "async_id",
    status: "async_status",
};

fn fields<const N: usize>(pairs: [(&str, Value); N]) -> Fields {
    pairs
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect()
}

fn results<T: Serialize>(items: &[T]) -> Result<Fields> {
    Ok(fields([("results", serde_json::to_value(items)?)]))
}

pub struct IapService {
    store: Arc<dyn StoreBackend>,
    directory: Arc<dyn UserDirectory>,
    issuer: AsyncIssuer,
}

impl IapService {
    pub fn new(
        store: Arc<dyn StoreBackend>,
        directory: Arc<dyn UserDirectory>,
        issuer: AsyncIssuer,
    ) -> Self {
        Self {
            store,
            directory,
            issuer,
        }
    }

    fn require_user(&self, user: UserId) -> Result<()> {
        if user.is_null() || self.directory.profile(user).is_none() {
            return Err(AppError::InvalidUser(user.to_string()));
        }
        Ok(())
    }

    fn require_id(kind: &str, value: &str) -> Result<()> {
        if value.trim().is_empty() {
            return Err(AppError::Validation(format!("{} must not be empty", kind)));
        }
        Ok(())
    }

    /// Allocate an id and complete `work` in the background.
    /// `base` fields are present whether or not the call succeeds.
    fn request<Fut>(
        &self,
        function: &'static str,
        keys: ResultKeys,
        base: Fields,
        work: Fut,
    ) -> Result<RequestId>
    where
        Fut: Future<Output = Result<Fields>> + Send + 'static,
    {
        let id = self.issuer.issue()?;
        debug!(function, request_id = %id, "Store request issued");

        self.issuer.complete(async move {
            let mut envelope = Envelope::new(AsyncChannel::Iap)
                .with("type", format!("{}_result", function))
                .with(keys.id, id.value());
            envelope.fields.extend(base);
            match work.await {
                Ok(extra) => {
                    envelope.insert(keys.status, true);
                    envelope.fields.extend(extra);
                }
                Err(e) => {
                    warn!(function, request_id = %id, error = %e, "Store request failed");
                    envelope.insert(keys.status, false);
                }
            }
            envelope
        });
        Ok(id)
    }

    pub fn acquire_license_for_durables(&self, user: UserId, store_id: &str) -> Result<RequestId> {
        self.issuer.ensure_running()?;
        self.require_user(user)?;
        Self::require_id("store_id", store_id)?;

        let store = Arc::clone(&self.store);
        let sid = store_id.to_string();
        self.request(
            "ms_iap_AcquireLicenseForDurables",
            STANDARD,
            fields([("store_id", Value::from(store_id))]),
            async move {
                store.acquire_license_for_durables(user, &sid).await?;
                Ok::<_, AppError>(Fields::new())
            },
        )
    }

    pub fn acquire_license_for_package(&self, user: UserId, package_id: &str) -> Result<RequestId> {
        self.issuer.ensure_running()?;
        self.require_user(user)?;
        Self::require_id("package_id", package_id)?;

        let store = Arc::clone(&self.store);
        let pid = package_id.to_string();
        self.request(
            "ms_iap_AcquireLicenseForPackage",
            STANDARD,
            fields([("package_id", Value::from(package_id))]),
            async move {
                store.acquire_license_for_package(user, &pid).await?;
                Ok::<_, AppError>(Fields::new())
            },
        )
    }

    pub fn can_acquire_license_for_package(
        &self,
        user: UserId,
        package_id: &str,
    ) -> Result<RequestId> {
        self.issuer.ensure_running()?;
        self.require_user(user)?;
        Self::require_id("package_id", package_id)?;

        let store = Arc::clone(&self.store);
        let pid = package_id.to_string();
        self.request(
            "ms_iap_CanAcquireLicenseForPackage",
            CAN_ACQUIRE,
            fields([("package_id", Value::from(package_id))]),
            async move {
                let preview = store.can_acquire_license_for_package(user, &pid).await?;
                Ok::<_, AppError>(fields([
                    ("licensableSku", Value::from(preview.licensable_sku)),
                    ("licenseStatus", Value::from(preview.license_status as i64)),
                ]))
            },
        )
    }

    pub fn can_acquire_license_for_store_id(
        &self,
        user: UserId,
        store_id: &str,
    ) -> Result<RequestId> {
        self.issuer.ensure_running()?;
        self.require_user(user)?;
        Self::require_id("store_id", store_id)?;

        let store = Arc::clone(&self.store);
        let sid = store_id.to_string();
        self.request(
            "ms_iap_CanAcquireLicenseForStoreId",
            CAN_ACQUIRE,
            fields([("store_id", Value::from(store_id))]),
            async move {
                let preview = store.can_acquire_license_for_store_id(user, &sid).await?;
                Ok::<_, AppError>(fields([
                    ("licensableSku", Value::from(preview.licensable_sku)),
                    ("licenseStatus", Value::from(preview.license_status as i64)),
                ]))
            },
        )
    }

    pub fn download_and_install_packages(
        &self,
        user: UserId,
        package_ids: Vec<String>,
    ) -> Result<RequestId> {
        self.issuer.ensure_running()?;
        self.require_user(user)?;
        if package_ids.is_empty() {
            return Err(AppError::Validation("package_ids must not be empty".to_string()));
        }
        for package_id in &package_ids {
            Self::require_id("package_id", package_id)?;
        }

        let store = Arc::clone(&self.store);
        let base = fields([("package_ids", Value::from(package_ids.clone()))]);
        self.request(
            "ms_iap_DownloadAndInstallPackages",
            STANDARD,
            base,
            async move {
                store.download_and_install_packages(user, &package_ids).await?;
                Ok::<_, AppError>(Fields::new())
            },
        )
    }

    pub fn enumerate_packages(&self, kind: PackageKind, scope: PackageScope) -> Result<RequestId> {
        self.issuer.ensure_running()?;
        let store = Arc::clone(&self.store);
        self.request(
            "ms_iap_EnumeratePackages",
            STANDARD,
            Fields::new(),
            async move { results(&store.enumerate_packages(kind, scope).await?) },
        )
    }

    pub fn mount_package(&self, package_id: &str) -> Result<RequestId> {
        self.issuer.ensure_running()?;
        Self::require_id("package_id", package_id)?;

        let store = Arc::clone(&self.store);
        let pid = package_id.to_string();
        self.request(
            "ms_iap_MountPackage",
            STANDARD,
            fields([("package_id", Value::from(package_id))]),
            async move {
                let path = store.mount_package(&pid).await?;
                Ok::<_, AppError>(fields([("mount_path", Value::from(path))]))
            },
        )
    }

    pub fn unmount_package(&self, package_id: &str) -> Result<RequestId> {
        self.issuer.ensure_running()?;
        Self::require_id("package_id", package_id)?;

        let store = Arc::clone(&self.store);
        let pid = package_id.to_string();
        self.request(
            "ms_iap_UnmountPackage",
            STANDARD,
            fields([("package_id", Value::from(package_id))]),
            async move {
                let path = store.unmount_package(&pid).await?;
                Ok::<_, AppError>(fields([("mount_path", Value::from(path))]))
            },
        )
    }

    pub fn query_addon_licenses(&self, user: UserId) -> Result<RequestId> {
        self.issuer.ensure_running()?;
        self.require_user(user)?;
        let store = Arc::clone(&self.store);
        self.request(
            "ms_iap_QueryAddOnLicenses",
            STANDARD,
            Fields::new(),
            async move { results(&store.query_addon_licenses(user).await?) },
        )
    }

    pub fn query_associated_products(&self, user: UserId, kinds: ProductKind) -> Result<RequestId> {
        self.issuer.ensure_running()?;
        self.require_user(user)?;
        let store = Arc::clone(&self.store);
        self.request(
            "ms_iap_QueryAssociatedProducts",
            STANDARD,
            Fields::new(),
            async move { results(&store.query_associated_products(user, kinds).await?) },
        )
    }

    pub fn query_consumable_balance_remaining(
        &self,
        user: UserId,
        store_id: &str,
    ) -> Result<RequestId> {
        self.issuer.ensure_running()?;
        self.require_user(user)?;
        Self::require_id("store_id", store_id)?;

        let store = Arc::clone(&self.store);
        let sid = store_id.to_string();
        self.request(
            "ms_iap_QueryConsumableBalanceRemaining",
            STANDARD,
            fields([("store_id", Value::from(store_id))]),
            async move {
                let quantity = store.query_consumable_balance(user, &sid).await?;
                Ok::<_, AppError>(fields([("quantity", Value::from(quantity))]))
            },
        )
    }

    pub fn query_entitled_products(&self, user: UserId, kinds: ProductKind) -> Result<RequestId> {
        self.issuer.ensure_running()?;
        self.require_user(user)?;
        let store = Arc::clone(&self.store);
        self.request(
            "ms_iap_QueryEntitledProducts",
            STANDARD,
            Fields::new(),
            async move { results(&store.query_entitled_products(user, kinds).await?) },
        )
    }

    pub fn query_game_license(&self, user: UserId) -> Result<RequestId> {
        self.issuer.ensure_running()?;
        self.require_user(user)?;
        let store = Arc::clone(&self.store);
        self.request(
            "ms_iap_QueryGameLicense",
            STANDARD,
            Fields::new(),
            async move { Ok::<_, AppError>(store.query_game_license(user).await?.to_fields()) },
        )
    }

    pub fn query_product_for_current_game(&self, user: UserId) -> Result<RequestId> {
        self.issuer.ensure_running()?;
        self.require_user(user)?;
        let store = Arc::clone(&self.store);
        self.request(
            "ms_iap_QueryProductForCurrentGame",
            STANDARD,
            Fields::new(),
            async move { results(&store.query_product_for_current_game(user).await?) },
        )
    }

    pub fn query_product_for_package(
        &self,
        user: UserId,
        store_id: &str,
        kinds: ProductKind,
    ) -> Result<RequestId> {
        self.issuer.ensure_running()?;
        self.require_user(user)?;
        Self::require_id("store_id", store_id)?;

        let store = Arc::clone(&self.store);
        let sid = store_id.to_string();
        self.request(
            "ms_iap_QueryProductForPackage",
            STANDARD,
            Fields::new(),
            async move { results(&store.query_product_for_package(user, &sid, kinds).await?) },
        )
    }

    pub fn query_products(
        &self,
        user: UserId,
        kinds: ProductKind,
        store_ids: Vec<String>,
        action_filters: Vec<String>,
    ) -> Result<RequestId> {
        self.issuer.ensure_running()?;
        self.require_user(user)?;

        let store = Arc::clone(&self.store);
        self.request(
            "ms_iap_QueryProducts",
            STANDARD,
            Fields::new(),
            async move {
                results(
                    &store
                        .query_products(user, kinds, &store_ids, &action_filters)
                        .await?,
                )
            },
        )
    }

    pub fn report_consumable_fulfillment(
        &self,
        user: UserId,
        store_id: &str,
        quantity: i64,
        tracking_id: &str,
    ) -> Result<RequestId> {
        self.issuer.ensure_running()?;
        self.require_user(user)?;
        Self::require_id("store_id", store_id)?;
        let quantity = u32::try_from(quantity)
            .ok()
            .filter(|q| *q >= 1)
            .ok_or_else(|| AppError::Validation("quantity must be at least 1".to_string()))?;
        let tracking_id = Uuid::parse_str(tracking_id)
            .map_err(|e| AppError::Validation(format!("tracking_id must be a GUID: {}", e)))?;

        let store = Arc::clone(&self.store);
        let sid = store_id.to_string();
        self.request(
            "ms_iap_ReportConsumableFulfillment",
            STANDARD,
            fields([("store_id", Value::from(store_id))]),
            async move {
                let done = store
                    .report_consumable_fulfillment(user, &sid, quantity, tracking_id)
                    .await?;
                Ok::<_, AppError>(fields([
                    ("consumed_quantity", Value::from(done.consumed_quantity)),
                    ("available_quantity", Value::from(done.available_quantity)),
                ]))
            },
        )
    }

    pub fn release_license_for_durables(&self, store_id: &str) -> Result<()> {
        self.issuer.ensure_running()?;
        Self::require_id("store_id", store_id)?;
        self.store.release_license_for_durables(store_id)
    }

    pub fn release_license_for_package(&self, package_id: &str) -> Result<()> {
        self.issuer.ensure_running()?;
        Self::require_id("package_id", package_id)?;
        self.store.release_license_for_package(package_id)
    }

    /// Validate and forward a store overlay request; no envelope follows
    pub fn show_ui(&self, request: StoreUi) -> Result<()> {
        self.issuer.ensure_running()?;
        match &request {
            StoreUi::AssociatedProducts { user, store_id, .. }
            | StoreUi::ProductPage { user, store_id } => {
                self.require_user(*user)?;
                Self::require_id("store_id", store_id)?;
            }
            StoreUi::Purchase {
                user,
                store_id,
                json,
                ..
            } => {
                self.require_user(*user)?;
                Self::require_id("store_id", store_id)?;
                if !json.trim().is_empty() {
                    serde_json::from_str::<Value>(json).map_err(|e| {
                        AppError::Validation(format!("purchase json is invalid: {}", e))
                    })?;
                }
            }
            StoreUi::RateAndReview { user } => self.require_user(*user)?,
            StoreUi::RedeemToken { user, token, .. } => {
                self.require_user(*user)?;
                // a single space opens the UI without a pre-filled code
                if token.is_empty() {
                    return Err(AppError::Validation("token must not be empty".to_string()));
                }
            }
        }

        let store = Arc::clone(&self.store);
        self.issuer.handle().spawn(async move {
            if let Err(e) = store.show_ui(request).await {
                warn!(error = %e, "Store UI request failed");
            }
        });
        Ok(())
    }
}
