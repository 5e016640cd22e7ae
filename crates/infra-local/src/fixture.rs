// Platform Fixture - users, catalog and Xbox Live data served by the local adapters

use gdkbridge_core::domain::{
    AddonLicenseDetails, GameLicense, Image, LeaderboardEntry, PackageDetails, PackageKind,
    Price, Privilege, ProductDetails, ProductKind, UserId, UserProfile,
};
use gdkbridge_core::error::{AppError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::info;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PlatformFixture {
    /// Signed-in users, in sign-in order
    pub users: Vec<UserProfile>,
    /// Defaults to the first user
    pub activating_user: Option<UserId>,
    /// Account picker answer; `None` picks the first user allowed
    pub picker_choice: Option<UserId>,
    /// Store id of the running title
    pub title_store_id: String,
    pub products: Vec<ProductDetails>,
    pub packages: Vec<PackageDetails>,
    pub addon_licenses: Vec<AddonLicenseDetails>,
    /// Remaining quantity per consumable store id
    pub consumable_balances: BTreeMap<String, u32>,
    pub game_license: GameLicense,
    /// Achievement id to display name
    pub achievements: BTreeMap<String, String>,
    /// Title-managed leaderboards by id
    pub leaderboards: BTreeMap<String, Vec<LeaderboardEntry>>,
    /// Directory package mounts are reported under
    pub mount_root: String,
}

impl PlatformFixture {
    /// Read a fixture from a JSON file; absent fields are empty
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let fixture: Self = serde_json::from_str(&text).map_err(|e| {
            AppError::Config(format!("invalid platform fixture {}: {}", path.display(), e))
        })?;
        info!(
            path = %path.display(),
            users = fixture.users.len(),
            products = fixture.products.len(),
            "Platform fixture loaded"
        );
        Ok(fixture)
    }

    /// Demo platform used when no fixture file is configured
    pub fn builtin() -> Self {
        let player = UserProfile {
            modern_gamertag: Some("PlayerOne".to_string()),
            modern_gamertag_suffix: Some("#1234".to_string()),
            privileges: vec![
                Privilege::MultiplayerSessions.code(),
                Privilege::Communications.code(),
                Privilege::UserCreatedContent.code(),
                Privilege::Sessions.code(),
            ],
            ..UserProfile::new(UserId::new(0x0009_0000_0000_0001), "Player One")
        };
        let guest = UserProfile {
            is_guest: true,
            live_context: false,
            ..UserProfile::new(UserId::new(0x0009_0000_0000_0002), "Player One (1)")
        };

        let title_store_id = "9NBLGGH4R300".to_string();
        let products = vec![
            product(&title_store_id, "Demo Game", ProductKind::GAME, 19.99, true),
            product("9NBLGGH4R315", "Golden Sword", ProductKind::DURABLE, 4.99, true),
            product("9NBLGGH4R316", "Gem Pack", ProductKind::CONSUMABLE, 0.99, true),
            product("9NBLGGH4R317", "Season Pass", ProductKind::PASS, 14.99, false),
        ];
        let packages = vec![PackageDetails {
            package_identifier: "DemoGame.Expansion1".to_string(),
            version: "1.0.0.0".to_string(),
            kind: PackageKind::Content,
            display_name: "Expansion One".to_string(),
            description: "First expansion".to_string(),
            publisher: "Demo Studio".to_string(),
            store_id: "9NBLGGH4R318".to_string(),
            installing: false,
        }];

        Self {
            activating_user: Some(player.id),
            picker_choice: None,
            users: vec![player, guest],
            addon_licenses: vec![AddonLicenseDetails {
                sku_store_id: "9NBLGGH4R315/0010".to_string(),
                is_active: true,
                expiration_date: -1,
                in_app_offer_token: "golden_sword".to_string(),
            }],
            consumable_balances: BTreeMap::from([("9NBLGGH4R316".to_string(), 25)]),
            game_license: GameLicense {
                expiration_date: -1,
                is_active: true,
                sku_store_id: format!("{}/0010", title_store_id),
                ..GameLicense::default()
            },
            achievements: BTreeMap::from([
                ("1".to_string(), "First Steps".to_string()),
                ("2".to_string(), "Collector".to_string()),
                ("3".to_string(), "Completionist".to_string()),
            ]),
            leaderboards: BTreeMap::from([(
                "HighScore".to_string(),
                vec![
                    entry("Player One", 0x0009_0000_0000_0001, 1, 1200.0),
                    entry("Rival", 0x0009_0000_0000_0042, 2, 950.0),
                ],
            )]),
            mount_root: "/mnt/packages".to_string(),
            title_store_id,
            products,
            packages,
        }
    }

    pub fn user(&self, id: UserId) -> Option<&UserProfile> {
        self.users.iter().find(|u| u.id == id)
    }

    pub fn product(&self, store_id: &str) -> Option<&ProductDetails> {
        self.products.iter().find(|p| p.store_id == store_id)
    }

    /// Packages are addressed by identifier or by store id
    pub fn package(&self, package_id: &str) -> Option<&PackageDetails> {
        self.packages
            .iter()
            .find(|p| p.package_identifier == package_id || p.store_id == package_id)
    }
}

fn product(store_id: &str, title: &str, kind: ProductKind, price: f64, owned: bool) -> ProductDetails {
    ProductDetails {
        store_id: store_id.to_string(),
        title: title.to_string(),
        description: format!("{} for the demo title", title),
        language: "en-US".to_string(),
        in_app_offer_token: title.to_lowercase().replace(' ', "_"),
        link_uri: format!("https://www.microsoft.com/store/productId/{}", store_id),
        product_kind: kind,
        price: Price {
            base_price: price,
            price,
            currency_code: "USD".to_string(),
            formatted_base_price: format!("${:.2}", price),
            formatted_price: format!("${:.2}", price),
            ..Price::default()
        },
        has_digital_download: kind == ProductKind::GAME,
        is_in_user_collection: owned,
        keywords: Vec::new(),
        images: vec![Image {
            uri: format!("https://store-images.example/{}.png", store_id),
            height: 300,
            width: 300,
            caption: title.to_string(),
            image_purpose_tag: "Logo".to_string(),
        }],
    }
}

fn entry(player: &str, id: u64, rank: u32, score: f64) -> LeaderboardEntry {
    LeaderboardEntry {
        player: player.to_string(),
        player_id: UserId::new(id),
        rank,
        score,
    }
}
