// Store Backend Port (in-app purchase services)

use crate::domain::{
    AddonLicenseDetails, GameLicense, LicenseStatus, PackageDetails, PackageKind, PackageScope,
    ProductDetails, ProductKind, UserId,
};
use crate::error::Result;
use async_trait::async_trait;
use uuid::Uuid;

/// Whether a license could be acquired without acquiring it
#[derive(Debug, Clone, PartialEq)]
pub struct LicensePreview {
    pub licensable_sku: String,
    pub license_status: LicenseStatus,
}

/// Outcome of reporting a consumable as fulfilled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fulfillment {
    pub consumed_quantity: u32,
    pub available_quantity: u32,
}

/// Store overlays that are shown without a completion envelope
#[derive(Debug, Clone, PartialEq)]
pub enum StoreUi {
    AssociatedProducts {
        user: UserId,
        store_id: String,
        kinds: ProductKind,
    },
    ProductPage {
        user: UserId,
        store_id: String,
    },
    Purchase {
        user: UserId,
        store_id: String,
        name: String,
        json: String,
    },
    RateAndReview {
        user: UserId,
    },
    RedeemToken {
        user: UserId,
        token: String,
        allowed_store_ids: Vec<String>,
        disallow_csv_redemption: bool,
    },
}

/// Store context operations. Errors surface as `status: false` in the
/// matching `iap` envelope.
#[async_trait]
pub trait StoreBackend: Send + Sync {
    async fn acquire_license_for_durables(&self, user: UserId, store_id: &str) -> Result<()>;

    async fn acquire_license_for_package(&self, user: UserId, package_id: &str) -> Result<()>;

    async fn can_acquire_license_for_package(
        &self,
        user: UserId,
        package_id: &str,
    ) -> Result<LicensePreview>;

    async fn can_acquire_license_for_store_id(
        &self,
        user: UserId,
        store_id: &str,
    ) -> Result<LicensePreview>;

    async fn download_and_install_packages(
        &self,
        user: UserId,
        package_ids: &[String],
    ) -> Result<()>;

    async fn enumerate_packages(
        &self,
        kind: PackageKind,
        scope: PackageScope,
    ) -> Result<Vec<PackageDetails>>;

    /// Returns the mount path
    async fn mount_package(&self, package_id: &str) -> Result<String>;

    /// Returns the path that was unmounted
    async fn unmount_package(&self, package_id: &str) -> Result<String>;

    async fn query_addon_licenses(&self, user: UserId) -> Result<Vec<AddonLicenseDetails>>;

    async fn query_associated_products(
        &self,
        user: UserId,
        kinds: ProductKind,
    ) -> Result<Vec<ProductDetails>>;

    async fn query_consumable_balance(&self, user: UserId, store_id: &str) -> Result<u32>;

    async fn query_entitled_products(
        &self,
        user: UserId,
        kinds: ProductKind,
    ) -> Result<Vec<ProductDetails>>;

    async fn query_game_license(&self, user: UserId) -> Result<GameLicense>;

    async fn query_product_for_current_game(&self, user: UserId) -> Result<Vec<ProductDetails>>;

    async fn query_product_for_package(
        &self,
        user: UserId,
        store_id: &str,
        kinds: ProductKind,
    ) -> Result<Vec<ProductDetails>>;

    async fn query_products(
        &self,
        user: UserId,
        kinds: ProductKind,
        store_ids: &[String],
        action_filters: &[String],
    ) -> Result<Vec<ProductDetails>>;

    async fn report_consumable_fulfillment(
        &self,
        user: UserId,
        store_id: &str,
        quantity: u32,
        tracking_id: Uuid,
    ) -> Result<Fulfillment>;

    fn release_license_for_durables(&self, store_id: &str) -> Result<()>;

    fn release_license_for_package(&self, package_id: &str) -> Result<()>;

    async fn show_ui(&self, request: StoreUi) -> Result<()>;
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use crate::error::AppError;
    use std::sync::Mutex;

    /// Store with a fixed catalog; records UI requests
    #[derive(Default)]
    pub struct MockStore {
        pub products: Vec<ProductDetails>,
        pub packages: Vec<PackageDetails>,
        pub balance: Mutex<u32>,
        pub shown: Mutex<Vec<StoreUi>>,
        pub fail: bool,
    }

    impl MockStore {
        pub fn new(products: Vec<ProductDetails>) -> Self {
            Self {
                products,
                balance: Mutex::new(10),
                ..Default::default()
            }
        }

        pub fn failing() -> Self {
            Self {
                fail: true,
                ..Default::default()
            }
        }

        fn check(&self) -> Result<()> {
            if self.fail {
                Err(AppError::Backend("store unavailable".to_string()))
            } else {
                Ok(())
            }
        }

        fn filtered(&self, kinds: ProductKind) -> Vec<ProductDetails> {
            self.products
                .iter()
                .filter(|p| kinds.intersects(p.product_kind))
                .cloned()
                .collect()
        }
    }

    #[async_trait]
    impl StoreBackend for MockStore {
        async fn acquire_license_for_durables(&self, _user: UserId, _store_id: &str) -> Result<()> {
            self.check()
        }

        async fn acquire_license_for_package(&self, _user: UserId, _package_id: &str) -> Result<()> {
            self.check()
        }

        async fn can_acquire_license_for_package(
            &self,
            _user: UserId,
            package_id: &str,
        ) -> Result<LicensePreview> {
            self.check()?;
            Ok(LicensePreview {
                licensable_sku: format!("{}-sku", package_id),
                license_status: LicenseStatus::Licensable,
            })
        }

        async fn can_acquire_license_for_store_id(
            &self,
            _user: UserId,
            store_id: &str,
        ) -> Result<LicensePreview> {
            self.check()?;
            Ok(LicensePreview {
                licensable_sku: format!("{}-sku", store_id),
                license_status: LicenseStatus::Licensable,
            })
        }

        async fn download_and_install_packages(
            &self,
            _user: UserId,
            _package_ids: &[String],
        ) -> Result<()> {
            self.check()
        }

        async fn enumerate_packages(
            &self,
            kind: PackageKind,
            _scope: PackageScope,
        ) -> Result<Vec<PackageDetails>> {
            self.check()?;
            Ok(self
                .packages
                .iter()
                .filter(|p| p.kind == kind)
                .cloned()
                .collect())
        }

        async fn mount_package(&self, package_id: &str) -> Result<String> {
            self.check()?;
            Ok(format!("/mnt/{}", package_id))
        }

        async fn unmount_package(&self, package_id: &str) -> Result<String> {
            self.check()?;
            Ok(format!("/mnt/{}", package_id))
        }

        async fn query_addon_licenses(&self, _user: UserId) -> Result<Vec<AddonLicenseDetails>> {
            self.check()?;
            Ok(Vec::new())
        }

        async fn query_associated_products(
            &self,
            _user: UserId,
            kinds: ProductKind,
        ) -> Result<Vec<ProductDetails>> {
            self.check()?;
            Ok(self.filtered(kinds))
        }

        async fn query_consumable_balance(&self, _user: UserId, _store_id: &str) -> Result<u32> {
            self.check()?;
            Ok(*self.balance.lock().unwrap())
        }

        async fn query_entitled_products(
            &self,
            _user: UserId,
            kinds: ProductKind,
        ) -> Result<Vec<ProductDetails>> {
            self.check()?;
            Ok(self
                .filtered(kinds)
                .into_iter()
                .filter(|p| p.is_in_user_collection)
                .collect())
        }

        async fn query_game_license(&self, _user: UserId) -> Result<GameLicense> {
            self.check()?;
            Ok(GameLicense {
                is_active: true,
                ..Default::default()
            })
        }

        async fn query_product_for_current_game(&self, _user: UserId) -> Result<Vec<ProductDetails>> {
            self.check()?;
            Ok(self.filtered(ProductKind::GAME))
        }

        async fn query_product_for_package(
            &self,
            _user: UserId,
            store_id: &str,
            kinds: ProductKind,
        ) -> Result<Vec<ProductDetails>> {
            self.check()?;
            Ok(self
                .filtered(kinds)
                .into_iter()
                .filter(|p| p.store_id == store_id)
                .collect())
        }

        async fn query_products(
            &self,
            _user: UserId,
            kinds: ProductKind,
            store_ids: &[String],
            _action_filters: &[String],
        ) -> Result<Vec<ProductDetails>> {
            self.check()?;
            Ok(self
                .filtered(kinds)
                .into_iter()
                .filter(|p| store_ids.is_empty() || store_ids.contains(&p.store_id))
                .collect())
        }

        async fn report_consumable_fulfillment(
            &self,
            _user: UserId,
            _store_id: &str,
            quantity: u32,
            _tracking_id: Uuid,
        ) -> Result<Fulfillment> {
            self.check()?;
            let mut balance = self.balance.lock().unwrap();
            if quantity > *balance {
                return Err(AppError::Backend("insufficient balance".to_string()));
            }
            *balance -= quantity;
            Ok(Fulfillment {
                consumed_quantity: quantity,
                available_quantity: *balance,
            })
        }

        fn release_license_for_durables(&self, _store_id: &str) -> Result<()> {
            self.check()
        }

        fn release_license_for_package(&self, _package_id: &str) -> Result<()> {
            self.check()
        }

        async fn show_ui(&self, request: StoreUi) -> Result<()> {
            self.check()?;
            self.shown.lock().unwrap().push(request);
            Ok(())
        }
    }
}
