// Platform Constants (store, package, achievement and privilege enumerations)

use serde::{Deserialize, Serialize};
use std::ops::BitOr;

/// Flagged product kind; combine with `|` to filter several kinds at once
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProductKind(u32);

impl ProductKind {
    pub const NONE: ProductKind = ProductKind(0);
    pub const CONSUMABLE: ProductKind = ProductKind(1);
    pub const DURABLE: ProductKind = ProductKind(2);
    pub const GAME: ProductKind = ProductKind(4);
    pub const PASS: ProductKind = ProductKind(8);
    pub const UNMANAGED_CONSUMABLE: ProductKind = ProductKind(16);

    const ALL_BITS: u32 = 1 | 2 | 4 | 8 | 16;

    /// Build from raw bits; unknown bits are rejected
    pub fn from_bits(bits: u32) -> Option<Self> {
        (bits & !Self::ALL_BITS == 0).then_some(Self(bits))
    }

    pub fn bits(&self) -> u32 {
        self.0
    }

    pub fn contains(&self, other: ProductKind) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn intersects(&self, other: ProductKind) -> bool {
        self.0 & other.0 != 0
    }

    pub fn is_consumable(&self) -> bool {
        self.intersects(ProductKind::CONSUMABLE | ProductKind::UNMANAGED_CONSUMABLE)
    }
}

impl BitOr for ProductKind {
    type Output = ProductKind;

    fn bitor(self, rhs: Self) -> Self::Output {
        ProductKind(self.0 | rhs.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PackageKind {
    Game = 0,
    Content = 1,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PackageScope {
    ThisOnly = 0,
    ThisAndRelated = 1,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AchievementFilter {
    AllPlayers = 0,
    FriendsOnly = 1,
    FavoritesOnly = 2,
    FriendsAlt = 3,
    FavoritesAlt = 4,
}

impl AchievementFilter {
    pub fn favourites_only(&self) -> bool {
        matches!(
            self,
            AchievementFilter::FavoritesOnly | AchievementFilter::FavoritesAlt
        )
    }
}

/// Social event message ids (the `id` field on the social channel)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AchievementMessageType {
    OurInfo = 0,
    FriendsInfo = 1,
    LeaderboardInfo = 2,
    AchievementInfo = 3,
    PicLoaded = 4,
    ChallengeCompleted = 5,
    ChallengeCompletedByRemote = 6,
    ChallengeReceived = 7,
    ChallengeListReceived = 8,
    ChallengeLaunched = 9,
    PlayerInfo = 10,
    PurchaseInfo = 11,
    MsgResult = 12,
    StatEvent = 13,
}

impl AchievementMessageType {
    pub fn code(&self) -> i64 {
        *self as i64
    }
}

/// Achievement `error` value when the achievement was unlocked earlier
pub const ACHIEVEMENT_ALREADY_UNLOCKED: i64 = 1;

/// Xbox user privileges (platform privilege ids)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Privilege {
    InternetBrowsing = 217,
    SocialNetworkSharing = 220,
    ShareKinectContent = 211,
    VideoCommunications = 235,
    Communications = 252,
    UserCreatedContent = 247,
    MultiplayerSessions = 254,
    Sessions = 189,
    FitnessUpload = 103,
}

impl Privilege {
    pub fn code(&self) -> u32 {
        *self as u32
    }

    pub fn from_code(code: u32) -> Option<Self> {
        const ALL: [Privilege; 9] = [
            Privilege::InternetBrowsing,
            Privilege::SocialNetworkSharing,
            Privilege::ShareKinectContent,
            Privilege::VideoCommunications,
            Privilege::Communications,
            Privilege::UserCreatedContent,
            Privilege::MultiplayerSessions,
            Privilege::Sessions,
            Privilege::FitnessUpload,
        ];
        ALL.into_iter().find(|p| p.code() == code)
    }
}

/// Privilege check result; bit-wise combination of the flags below
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PrivilegeResult(u32);

impl PrivilegeResult {
    pub const NO_ISSUE: PrivilegeResult = PrivilegeResult(0);
    pub const PURCHASE_REQUIRED: PrivilegeResult = PrivilegeResult(1);
    pub const RESTRICTED: PrivilegeResult = PrivilegeResult(2);
    pub const BANNED: PrivilegeResult = PrivilegeResult(4);
    pub const UNKNOWN: PrivilegeResult = PrivilegeResult(8);
    pub const ABORTED: PrivilegeResult = PrivilegeResult(16);

    pub fn bits(&self) -> u32 {
        self.0
    }

    pub fn is_granted(&self) -> bool {
        self.0 == 0
    }

    pub fn contains(&self, other: PrivilegeResult) -> bool {
        self.0 & other.0 == other.0
    }
}

impl BitOr for PrivilegeResult {
    type Output = PrivilegeResult;

    fn bitor(self, rhs: Self) -> Self::Output {
        PrivilegeResult(self.0 | rhs.0)
    }
}

/// User progress towards an achievement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProgressState {
    Unknown = 0,
    Achieved = 1,
    NotStarted = 2,
    InProgress = 3,
}

impl ProgressState {
    pub fn from_progress(progress: u32) -> Self {
        match progress {
            0 => ProgressState::NotStarted,
            p if p >= 100 => ProgressState::Achieved,
            _ => ProgressState::InProgress,
        }
    }
}

/// Whether a user would be able to license a package or product
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LicenseStatus {
    NotLicensable = 0,
    Licensable = 1,
    NotIndividuallyLicensable = 2,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_product_kind_flags() {
        let filter = ProductKind::CONSUMABLE | ProductKind::DURABLE;
        assert_eq!(filter.bits(), 3);
        assert!(filter.contains(ProductKind::DURABLE));
        assert!(!filter.contains(ProductKind::GAME));
        assert!(filter.intersects(ProductKind::CONSUMABLE | ProductKind::PASS));
        assert!(ProductKind::from_bits(32).is_none());
        assert!(ProductKind::UNMANAGED_CONSUMABLE.is_consumable());
    }

    #[test]
    fn test_privilege_codes() {
        assert_eq!(Privilege::MultiplayerSessions.code(), 254);
        assert_eq!(Privilege::from_code(189), Some(Privilege::Sessions));
        assert_eq!(Privilege::from_code(1), None);
    }

    #[test]
    fn test_privilege_result_flags() {
        let result = PrivilegeResult::PURCHASE_REQUIRED | PrivilegeResult::RESTRICTED;
        assert!(!result.is_granted());
        assert!(result.contains(PrivilegeResult::RESTRICTED));
        assert!(PrivilegeResult::NO_ISSUE.is_granted());
    }

    #[test]
    fn test_progress_state() {
        assert_eq!(ProgressState::from_progress(0), ProgressState::NotStarted);
        assert_eq!(ProgressState::from_progress(42), ProgressState::InProgress);
        assert_eq!(ProgressState::from_progress(100), ProgressState::Achieved);
    }
}
