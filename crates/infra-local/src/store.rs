// Local StoreBackend - catalog, licenses, packages and consumables from the fixture

use crate::fixture::PlatformFixture;
use async_trait::async_trait;
use gdkbridge_core::domain::{
    AddonLicenseDetails, GameLicense, LicenseStatus, PackageDetails, PackageKind, PackageScope,
    ProductDetails, ProductKind, UserId,
};
use gdkbridge_core::error::{AppError, Result};
use gdkbridge_core::port::{Fulfillment, LicensePreview, StoreBackend, StoreUi};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, info};
use uuid::Uuid;

#[derive(Default)]
struct StoreState {
    /// Store ids in the user's collection
    owned: BTreeSet<String>,
    balances: BTreeMap<String, u32>,
    held_durables: BTreeSet<String>,
    held_packages: BTreeSet<String>,
    installed: BTreeSet<String>,
    mounted: BTreeMap<String, String>,
    /// Replayed fulfillments keyed by tracking id
    fulfillments: HashMap<Uuid, Fulfillment>,
}

pub struct LocalStore {
    fixture: Arc<PlatformFixture>,
    state: Mutex<StoreState>,
}

impl LocalStore {
    pub fn new(fixture: Arc<PlatformFixture>) -> Self {
        let state = StoreState {
            owned: fixture
                .products
                .iter()
                .filter(|p| p.is_in_user_collection)
                .map(|p| p.store_id.clone())
                .collect(),
            balances: fixture.consumable_balances.clone(),
            ..StoreState::default()
        };
        Self {
            fixture,
            state: Mutex::new(state),
        }
    }

    fn state(&self) -> Result<MutexGuard<'_, StoreState>> {
        self.state
            .lock()
            .map_err(|_| AppError::Internal("store state lock poisoned".to_string()))
    }

    fn require_user(&self, user: UserId) -> Result<()> {
        self.fixture
            .user(user)
            .map(|_| ())
            .ok_or_else(|| AppError::InvalidUser(user.to_string()))
    }

    fn product(&self, store_id: &str) -> Result<&ProductDetails> {
        self.fixture
            .product(store_id)
            .ok_or_else(|| AppError::NotFound(format!("product {}", store_id)))
    }

    fn package(&self, package_id: &str) -> Result<&PackageDetails> {
        self.fixture
            .package(package_id)
            .ok_or_else(|| AppError::NotFound(format!("package {}", package_id)))
    }

    /// Catalog view with the collection flag reflecting purchases so far
    fn catalog(&self, kinds: ProductKind, filter: impl Fn(&ProductDetails) -> bool) -> Result<Vec<ProductDetails>> {
        let state = self.state()?;
        Ok(self
            .fixture
            .products
            .iter()
            .filter(|p| kinds.intersects(p.product_kind) && filter(p))
            .map(|p| ProductDetails {
                is_in_user_collection: state.owned.contains(&p.store_id),
                ..p.clone()
            })
            .collect())
    }

    fn preview(&self, store_id: &str, known: bool) -> Result<LicensePreview> {
        let owned = self.state()?.owned.contains(store_id);
        let license_status = match (known, owned) {
            (false, _) => LicenseStatus::NotLicensable,
            (true, true) => LicenseStatus::Licensable,
            (true, false) => LicenseStatus::NotIndividuallyLicensable,
        };
        Ok(LicensePreview {
            licensable_sku: if owned {
                format!("{}/0010", store_id)
            } else {
                String::new()
            },
            license_status,
        })
    }
}

#[async_trait]
impl StoreBackend for LocalStore {
    async fn acquire_license_for_durables(&self, user: UserId, store_id: &str) -> Result<()> {
        self.require_user(user)?;
        let product = self.product(store_id)?;
        if !product.product_kind.intersects(ProductKind::DURABLE | ProductKind::GAME) {
            return Err(AppError::Validation(format!("{} is not a durable", store_id)));
        }
        let mut state = self.state()?;
        if !state.owned.contains(store_id) {
            return Err(AppError::NotFound(format!("{} is not owned", store_id)));
        }
        state.held_durables.insert(store_id.to_string());
        info!(store_id, "Durable license acquired");
        Ok(())
    }

    async fn acquire_license_for_package(&self, user: UserId, package_id: &str) -> Result<()> {
        self.require_user(user)?;
        let package = self.package(package_id)?;
        self.state()?
            .held_packages
            .insert(package.package_identifier.clone());
        Ok(())
    }

    async fn can_acquire_license_for_package(
        &self,
        user: UserId,
        package_id: &str,
    ) -> Result<LicensePreview> {
        self.require_user(user)?;
        match self.fixture.package(package_id) {
            Some(package) => self.preview(&package.store_id, true),
            None => self.preview(package_id, false),
        }
    }

    async fn can_acquire_license_for_store_id(
        &self,
        user: UserId,
        store_id: &str,
    ) -> Result<LicensePreview> {
        self.require_user(user)?;
        self.preview(store_id, self.fixture.product(store_id).is_some())
    }

    async fn download_and_install_packages(
        &self,
        user: UserId,
        package_ids: &[String],
    ) -> Result<()> {
        self.require_user(user)?;
        let identifiers = package_ids
            .iter()
            .map(|id| self.package(id).map(|p| p.package_identifier.clone()))
            .collect::<Result<Vec<_>>>()?;
        let mut state = self.state()?;
        for identifier in identifiers {
            debug!(package = %identifier, "Package installed");
            state.installed.insert(identifier);
        }
        Ok(())
    }

    async fn enumerate_packages(
        &self,
        kind: PackageKind,
        scope: PackageScope,
    ) -> Result<Vec<PackageDetails>> {
        let state = self.state()?;
        Ok(self
            .fixture
            .packages
            .iter()
            .filter(|p| p.kind == kind)
            .filter(|p| match scope {
                PackageScope::ThisOnly => state.installed.contains(&p.package_identifier),
                PackageScope::ThisAndRelated => true,
            })
            .cloned()
            .collect())
    }

    async fn mount_package(&self, package_id: &str) -> Result<String> {
        let identifier = self.package(package_id)?.package_identifier.clone();
        let mut state = self.state()?;
        let path = format!("{}/{}", self.fixture.mount_root.trim_end_matches('/'), identifier);
        state.mounted.insert(identifier, path.clone());
        Ok(path)
    }

    async fn unmount_package(&self, package_id: &str) -> Result<String> {
        let identifier = self.package(package_id)?.package_identifier.clone();
        self.state()?
            .mounted
            .remove(&identifier)
            .ok_or_else(|| AppError::InvalidState(format!("package {} is not mounted", identifier)))
    }

    async fn query_addon_licenses(&self, user: UserId) -> Result<Vec<AddonLicenseDetails>> {
        self.require_user(user)?;
        Ok(self.fixture.addon_licenses.clone())
    }

    async fn query_associated_products(
        &self,
        user: UserId,
        kinds: ProductKind,
    ) -> Result<Vec<ProductDetails>> {
        self.require_user(user)?;
        let title = &self.fixture.title_store_id;
        self.catalog(kinds, |p| &p.store_id != title)
    }

    async fn query_consumable_balance(&self, user: UserId, store_id: &str) -> Result<u32> {
        self.require_user(user)?;
        if !self.product(store_id)?.product_kind.is_consumable() {
            return Err(AppError::Validation(format!("{} is not a consumable", store_id)));
        }
        Ok(self.state()?.balances.get(store_id).copied().unwrap_or(0))
    }

    async fn query_entitled_products(
        &self,
        user: UserId,
        kinds: ProductKind,
    ) -> Result<Vec<ProductDetails>> {
        self.require_user(user)?;
        Ok(self
            .catalog(kinds, |_| true)?
            .into_iter()
            .filter(|p| p.is_in_user_collection)
            .collect())
    }

    async fn query_game_license(&self, user: UserId) -> Result<GameLicense> {
        self.require_user(user)?;
        Ok(self.fixture.game_license.clone())
    }

    async fn query_product_for_current_game(&self, user: UserId) -> Result<Vec<ProductDetails>> {
        self.require_user(user)?;
        let title = &self.fixture.title_store_id;
        self.catalog(ProductKind::GAME, |p| &p.store_id == title)
    }

    async fn query_product_for_package(
        &self,
        user: UserId,
        store_id: &str,
        kinds: ProductKind,
    ) -> Result<Vec<ProductDetails>> {
        self.require_user(user)?;
        self.catalog(kinds, |p| p.store_id == store_id)
    }

    async fn query_products(
        &self,
        user: UserId,
        kinds: ProductKind,
        store_ids: &[String],
        action_filters: &[String],
    ) -> Result<Vec<ProductDetails>> {
        self.require_user(user)?;
        if !action_filters.is_empty() {
            debug!(filters = ?action_filters, "Action filters are not applied locally");
        }
        self.catalog(kinds, |p| store_ids.is_empty() || store_ids.contains(&p.store_id))
    }

    async fn report_consumable_fulfillment(
        &self,
        user: UserId,
        store_id: &str,
        quantity: u32,
        tracking_id: Uuid,
    ) -> Result<Fulfillment> {
        self.require_user(user)?;
        if !self.product(store_id)?.product_kind.is_consumable() {
            return Err(AppError::Validation(format!("{} is not a consumable", store_id)));
        }
        let mut state = self.state()?;
        if let Some(previous) = state.fulfillments.get(&tracking_id) {
            debug!(%tracking_id, "Fulfillment replayed");
            return Ok(*previous);
        }

        let available = state.balances.get(store_id).copied().unwrap_or(0);
        if quantity > available {
            return Err(AppError::Conflict(format!(
                "cannot consume {} of {}, {} remaining",
                quantity, store_id, available
            )));
        }
        let remaining = available - quantity;
        state.balances.insert(store_id.to_string(), remaining);
        let fulfillment = Fulfillment {
            consumed_quantity: quantity,
            available_quantity: remaining,
        };
        state.fulfillments.insert(tracking_id, fulfillment);
        Ok(fulfillment)
    }

    fn release_license_for_durables(&self, store_id: &str) -> Result<()> {
        if self.state()?.held_durables.remove(store_id) {
            Ok(())
        } else {
            Err(AppError::NotFound(format!("no license held for {}", store_id)))
        }
    }

    fn release_license_for_package(&self, package_id: &str) -> Result<()> {
        let identifier = self.package(package_id)?.package_identifier.clone();
        if self.state()?.held_packages.remove(&identifier) {
            Ok(())
        } else {
            Err(AppError::NotFound(format!("no license held for {}", package_id)))
        }
    }

    async fn show_ui(&self, request: StoreUi) -> Result<()> {
        match request {
            StoreUi::Purchase { user, store_id, .. } => {
                let product = self.product(&store_id)?;
                let mut state = self.state()?;
                if product.product_kind.is_consumable() {
                    *state.balances.entry(store_id.clone()).or_insert(0) += 1;
                } else {
                    state.owned.insert(store_id.clone());
                }
                info!(user = %user, store_id = %store_id, "Purchase completed");
            }
            other => info!(request = ?other, "Store overlay shown"),
        }
        Ok(())
    }
}
