// Descriptor Structs carried inside envelopes

use crate::domain::constants::{PackageKind, ProductKind, ProgressState};
use crate::domain::user::UserId;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Price {
    pub base_price: f64,
    pub price: f64,
    /// Wire name keeps the platform's historical spelling
    #[serde(rename = "recurrecePrice")]
    pub recurrence_price: f64,
    pub currency_code: String,
    pub formatted_base_price: String,
    pub formatted_price: String,
    pub formatted_recurrent_price: String,
    pub is_on_sale: bool,
    #[serde(rename = "saleEndData")]
    pub sale_end_date: i64,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Image {
    pub uri: String,
    pub height: u32,
    pub width: u32,
    pub caption: String,
    pub image_purpose_tag: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductDetails {
    pub store_id: String,
    pub title: String,
    pub description: String,
    pub language: String,
    pub in_app_offer_token: String,
    pub link_uri: String,
    pub product_kind: ProductKind,
    pub price: Price,
    pub has_digital_download: bool,
    pub is_in_user_collection: bool,
    pub keywords: Vec<String>,
    pub images: Vec<Image>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageDetails {
    pub package_identifier: String,
    pub version: String,
    pub kind: PackageKind,
    pub display_name: String,
    pub description: String,
    pub publisher: String,
    pub store_id: String,
    pub installing: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddonLicenseDetails {
    pub sku_store_id: String,
    pub is_active: bool,
    /// `-1` when the license does not expire
    pub expiration_date: i64,
    pub in_app_offer_token: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameLicense {
    pub expiration_date: i64,
    pub is_active: bool,
    pub is_trial: bool,
    pub is_trial_owned_by_the_user: bool,
    pub is_disc_license: bool,
    pub sku_store_id: String,
    pub trial_unique_id: String,
    pub trial_time_remaining_in_seconds: i64,
}

impl GameLicense {
    /// Flatten into envelope fields
    pub fn to_fields(&self) -> Map<String, Value> {
        match serde_json::to_value(self) {
            Ok(Value::Object(map)) => map,
            _ => Map::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AchievementInfo {
    pub achievement: String,
    pub progress: u32,
    pub name: String,
    pub progress_state: ProgressState,
    #[serde(rename = "userID")]
    pub user_id: UserId,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    pub player: String,
    pub player_id: UserId,
    pub rank: u32,
    pub score: f64,
}

impl LeaderboardEntry {
    /// Write `PlayerN`, `PlayeridN`, `RankN` and `ScoreN` for position `n`
    pub fn write_indexed(&self, n: usize, fields: &mut Map<String, Value>) {
        fields.insert(format!("Player{}", n), Value::from(self.player.clone()));
        fields.insert(format!("Playerid{}", n), Value::from(self.player_id.value()));
        fields.insert(format!("Rank{}", n), Value::from(self.rank));
        fields.insert(format!("Score{}", n), Value::from(self.score));
    }
}

/// Value held by a stats manager statistic
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StatValue {
    Int(i64),
    Real(f64),
    Text(String),
}

impl StatValue {
    /// Sort key used when ranking leaderboards; text values rank as zero
    pub fn as_score(&self) -> f64 {
        match self {
            StatValue::Int(v) => *v as f64,
            StatValue::Real(v) => *v,
            StatValue::Text(_) => 0.0,
        }
    }
}

impl From<StatValue> for Value {
    fn from(value: StatValue) -> Self {
        match value {
            StatValue::Int(v) => Value::from(v),
            StatValue::Real(v) => Value::from(v),
            StatValue::Text(v) => Value::from(v),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_product_details_wire_names() {
        let product = ProductDetails {
            store_id: "9NBLGGH4R315".to_string(),
            title: "Gold Pack".to_string(),
            description: String::new(),
            language: "en-US".to_string(),
            in_app_offer_token: "com.example.gold".to_string(),
            link_uri: String::new(),
            product_kind: ProductKind::CONSUMABLE,
            price: Price::default(),
            has_digital_download: false,
            is_in_user_collection: true,
            keywords: vec![],
            images: vec![],
        };
        let value = serde_json::to_value(&product).unwrap();
        assert_eq!(value["storeId"], "9NBLGGH4R315");
        assert_eq!(value["inAppOfferToken"], "com.example.gold");
        assert_eq!(value["productKind"], 1);
        assert!(value["price"].get("recurrecePrice").is_some());
    }

    #[test]
    fn test_leaderboard_entry_indexed_fields() {
        let entry = LeaderboardEntry {
            player: "Alice".to_string(),
            player_id: UserId::new(11),
            rank: 1,
            score: 950.0,
        };
        let mut fields = Map::new();
        entry.write_indexed(0, &mut fields);
        assert_eq!(fields["Player0"], "Alice");
        assert_eq!(fields["Playerid0"], 11);
        assert_eq!(fields["Rank0"], 1);
        assert_eq!(fields["Score0"], 950.0);
    }

    #[test]
    fn test_game_license_flattens() {
        let license = GameLicense {
            is_active: true,
            sku_store_id: "0010".to_string(),
            ..Default::default()
        };
        let fields = license.to_fields();
        assert_eq!(fields["isActive"], true);
        assert_eq!(fields["skuStoreId"], "0010");
    }
}
