// Operation Catalog
//
// Every asynchronous function, the channel its envelope arrives on, the
// discriminant it carries and how its status field reads.

use crate::domain::constants::AchievementMessageType;
use crate::domain::envelope::{AsyncChannel, Discriminant, Envelope};
use crate::domain::RequestId;
use serde::{Deserialize, Serialize};

/// Discriminant an operation's envelope carries
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Tag {
    Type(&'static str),
    EventType(&'static str),
    /// Social message; `event: None` accepts any `event` value
    Message {
        kind: AchievementMessageType,
        event: Option<&'static str>,
    },
    None,
}

impl Tag {
    pub fn matches(&self, discriminant: &Discriminant) -> bool {
        match (self, discriminant) {
            (Tag::Type(expected), Discriminant::Type(actual)) => expected == actual,
            (Tag::EventType(expected), Discriminant::EventType(actual)) => expected == actual,
            (
                Tag::Message { kind, event },
                Discriminant::Message {
                    kind: actual_kind,
                    event: actual_event,
                },
            ) => {
                kind.code() == *actual_kind
                    && match event {
                        Some(expected) => actual_event.as_deref() == Some(*expected),
                        None => true,
                    }
            }
            (Tag::None, _) => true,
            _ => false,
        }
    }
}

/// How the status of an envelope is read
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StatusConvention {
    /// true / non-zero means success; failure code comes from `error`
    BoolStatus(&'static str),
    ZeroIsSuccess(&'static str),
    NonNegativeIsSuccess(&'static str),
    Always,
}

/// Result read from a matched envelope
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Outcome {
    Succeeded,
    Failed { code: i64 },
}

impl Outcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Succeeded)
    }
}

const ERROR_KEY: &str = "error";
const UNKNOWN_FAILURE: i64 = -1;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OperationSpec {
    pub function: &'static str,
    pub channel: AsyncChannel,
    pub tag: Tag,
    /// Field carrying the request id; `None` for discriminant-only operations
    pub id_key: Option<&'static str>,
    pub status: StatusConvention,
}

impl OperationSpec {
    /// Whether `envelope` answers this operation (and `id`, when given)
    pub fn matches(&self, envelope: &Envelope, id: Option<RequestId>) -> bool {
        if envelope.channel != self.channel || !self.tag.matches(&envelope.discriminant()) {
            return false;
        }
        match (self.id_key, id) {
            (Some(key), Some(id)) => envelope.get_i64(key) == Some(id.value()),
            _ => true,
        }
    }

    pub fn outcome(&self, envelope: &Envelope) -> Outcome {
        match self.status {
            StatusConvention::BoolStatus(key) => {
                if envelope.get_bool(key) == Some(true) {
                    Outcome::Succeeded
                } else {
                    Outcome::Failed {
                        code: envelope
                            .get_i64(ERROR_KEY)
                            .filter(|code| *code != 0)
                            .unwrap_or(UNKNOWN_FAILURE),
                    }
                }
            }
            StatusConvention::ZeroIsSuccess(key) => match envelope.get_i64(key) {
                Some(0) => Outcome::Succeeded,
                Some(code) => Outcome::Failed { code },
                None => Outcome::Failed {
                    code: UNKNOWN_FAILURE,
                },
            },
            StatusConvention::NonNegativeIsSuccess(key) => match envelope.get_i64(key) {
                Some(code) if code >= 0 => Outcome::Succeeded,
                Some(code) => Outcome::Failed { code },
                None => Outcome::Failed {
                    code: UNKNOWN_FAILURE,
                },
            },
            StatusConvention::Always => Outcome::Succeeded,
        }
    }
}

const fn iap(function: &'static str, result_type: &'static str) -> OperationSpec {
    OperationSpec {
        function,
        channel: AsyncChannel::Iap,
        tag: Tag::Type(result_type),
        id_key: Some("id"),
        status: StatusConvention::BoolStatus("status"),
    }
}

const fn iap_can_acquire(function: &'static str, result_type: &'static str) -> OperationSpec {
    OperationSpec {
        function,
        channel: AsyncChannel::Iap,
        tag: Tag::Type(result_type),
        id_key: Some("async_id"),
        status: StatusConvention::BoolStatus("async_status"),
    }
}

const fn save_load(function: &'static str) -> OperationSpec {
    OperationSpec {
        function,
        channel: AsyncChannel::SaveLoad,
        tag: Tag::None,
        id_key: Some("id"),
        status: StatusConvention::BoolStatus("status"),
    }
}

const fn stat_event(function: &'static str, event: &'static str) -> OperationSpec {
    OperationSpec {
        function,
        channel: AsyncChannel::Social,
        tag: Tag::Message {
            kind: AchievementMessageType::StatEvent,
            event: Some(event),
        },
        id_key: Some("requestID"),
        status: StatusConvention::ZeroIsSuccess("error"),
    }
}

const fn leaderboard_complete(function: &'static str) -> OperationSpec {
    OperationSpec {
        function,
        channel: AsyncChannel::Social,
        tag: Tag::Message {
            kind: AchievementMessageType::LeaderboardInfo,
            event: Some("GetLeaderboardComplete"),
        },
        id_key: Some("requestID"),
        status: StatusConvention::ZeroIsSuccess("error"),
    }
}

pub static OPERATIONS: &[OperationSpec] = &[
    // base
    OperationSpec {
        function: "xboxone_show_account_picker",
        channel: AsyncChannel::Dialog,
        tag: Tag::Type("xboxone_accountpicker"),
        id_key: None,
        status: StatusConvention::BoolStatus("succeeded"),
    },
    OperationSpec {
        function: "xboxone_get_token_and_signature",
        channel: AsyncChannel::System,
        tag: Tag::EventType("tokenandsignature_result"),
        id_key: None,
        status: StatusConvention::ZeroIsSuccess("status"),
    },
    // storage
    save_load("gdk_save_buffer"),
    save_load("gdk_load_buffer"),
    save_load("gdk_save_group_end"),
    // iap
    iap(
        "ms_iap_AcquireLicenseForDurables",
        "ms_iap_AcquireLicenseForDurables_result",
    ),
    iap(
        "ms_iap_AcquireLicenseForPackage",
        "ms_iap_AcquireLicenseForPackage_result",
    ),
    iap_can_acquire(
        "ms_iap_CanAcquireLicenseForPackage",
        "ms_iap_CanAcquireLicenseForPackage_result",
    ),
    iap_can_acquire(
        "ms_iap_CanAcquireLicenseForStoreId",
        "ms_iap_CanAcquireLicenseForStoreId_result",
    ),
    iap(
        "ms_iap_DownloadAndInstallPackages",
        "ms_iap_DownloadAndInstallPackages_result",
    ),
    iap("ms_iap_EnumeratePackages", "ms_iap_EnumeratePackages_result"),
    iap("ms_iap_MountPackage", "ms_iap_MountPackage_result"),
    iap("ms_iap_UnmountPackage", "ms_iap_UnmountPackage_result"),
    iap("ms_iap_QueryAddOnLicenses", "ms_iap_QueryAddOnLicenses_result"),
    iap(
        "ms_iap_QueryAssociatedProducts",
        "ms_iap_QueryAssociatedProducts_result",
    ),
    iap(
        "ms_iap_QueryConsumableBalanceRemaining",
        "ms_iap_QueryConsumableBalanceRemaining_result",
    ),
    iap(
        "ms_iap_QueryEntitledProducts",
        "ms_iap_QueryEntitledProducts_result",
    ),
    iap("ms_iap_QueryGameLicense", "ms_iap_QueryGameLicense_result"),
    iap(
        "ms_iap_QueryProductForCurrentGame",
        "ms_iap_QueryProductForCurrentGame_result",
    ),
    iap(
        "ms_iap_QueryProductForPackage",
        "ms_iap_QueryProductForPackage_result",
    ),
    iap("ms_iap_QueryProducts", "ms_iap_QueryProducts_result"),
    iap(
        "ms_iap_ReportConsumableFulfillment",
        "ms_iap_ReportConsumableFulfillment_result",
    ),
    // xbox live
    OperationSpec {
        function: "xboxone_achievements_set_progress",
        channel: AsyncChannel::System,
        tag: Tag::EventType("achievement_result"),
        id_key: Some("requestID"),
        status: StatusConvention::NonNegativeIsSuccess("error"),
    },
    OperationSpec {
        function: "xboxone_get_achievement",
        channel: AsyncChannel::System,
        tag: Tag::EventType("achievement info"),
        id_key: Some("requestID"),
        status: StatusConvention::NonNegativeIsSuccess("error"),
    },
    OperationSpec {
        function: "xboxone_check_privilege",
        channel: AsyncChannel::System,
        tag: Tag::EventType("check_privilege_result"),
        id_key: None,
        status: StatusConvention::ZeroIsSuccess("result"),
    },
    OperationSpec {
        function: "xboxone_read_player_leaderboard",
        channel: AsyncChannel::Social,
        tag: Tag::Message {
            kind: AchievementMessageType::LeaderboardInfo,
            event: None,
        },
        id_key: Some("requestID"),
        status: StatusConvention::Always,
    },
    stat_event("xboxone_stats_add_user", "LocalUserAdded"),
    stat_event("xboxone_stats_remove_user", "LocalUserRemoved"),
    stat_event("xboxone_stats_flush_user", "StatisticUpdateComplete"),
    leaderboard_complete("xboxone_stats_get_leaderboard"),
    leaderboard_complete("xboxone_stats_get_social_leaderboard"),
];

/// Find the catalog entry for an asynchronous function
pub fn lookup(function: &str) -> Option<&'static OperationSpec> {
    OPERATIONS.iter().find(|op| op.function == function)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_catalog_functions_are_unique() {
        let names: HashSet<_> = OPERATIONS.iter().map(|op| op.function).collect();
        assert_eq!(names.len(), OPERATIONS.len());
    }

    #[test]
    fn test_lookup() {
        assert!(lookup("ms_iap_QueryProducts").is_some());
        assert!(lookup("ms_iap_ReleaseLicenseForDurables").is_none());
        assert!(lookup("no_such_function").is_none());
    }

    #[test]
    fn test_iap_matching_requires_type_and_id() {
        let op = lookup("ms_iap_QueryProducts").unwrap();
        let id = RequestId::new(4);
        let envelope = Envelope::new(AsyncChannel::Iap)
            .with("type", "ms_iap_QueryProducts_result")
            .with("id", 4)
            .with("status", true);

        assert!(op.matches(&envelope, id));
        assert!(!op.matches(&envelope, RequestId::new(5)));

        let wrong_type = envelope.clone().with("type", "ms_iap_QueryGameLicense_result");
        assert!(!op.matches(&wrong_type, id));

        let wrong_channel = Envelope {
            channel: AsyncChannel::SaveLoad,
            fields: envelope.fields.clone(),
        };
        assert!(!op.matches(&wrong_channel, id));
        assert_eq!(op.outcome(&envelope), Outcome::Succeeded);
    }

    #[test]
    fn test_can_acquire_uses_async_keys() {
        let op = lookup("ms_iap_CanAcquireLicenseForStoreId").unwrap();
        let envelope = Envelope::new(AsyncChannel::Iap)
            .with("type", "ms_iap_CanAcquireLicenseForStoreId_result")
            .with("async_id", 2)
            .with("async_status", false);
        assert!(op.matches(&envelope, RequestId::new(2)));
        assert_eq!(op.outcome(&envelope), Outcome::Failed { code: -1 });
    }

    #[test]
    fn test_save_load_outcome_reads_error_code() {
        let op = lookup("gdk_load_buffer").unwrap();
        let envelope = Envelope::new(AsyncChannel::SaveLoad)
            .with("id", 0)
            .with("status", 0)
            .with("error", 1);
        assert_eq!(op.outcome(&envelope), Outcome::Failed { code: 1 });
    }

    #[test]
    fn test_stat_event_matches_event_name() {
        let op = lookup("xboxone_stats_add_user").unwrap();
        let added = Envelope::new(AsyncChannel::Social)
            .with("id", AchievementMessageType::StatEvent.code())
            .with("event", "LocalUserAdded")
            .with("requestID", 8)
            .with("error", 0);
        let removed = added.clone().with("event", "LocalUserRemoved");

        assert!(op.matches(&added, RequestId::new(8)));
        assert!(!op.matches(&removed, RequestId::new(8)));
        assert!(op.outcome(&added).is_success());
    }

    #[test]
    fn test_achievement_already_unlocked_is_success() {
        let op = lookup("xboxone_achievements_set_progress").unwrap();
        let envelope = Envelope::new(AsyncChannel::System)
            .with("event_type", "achievement_result")
            .with("requestID", 1)
            .with("error", 1);
        assert!(op.outcome(&envelope).is_success());
        let failed = envelope.with("error", -5);
        assert_eq!(op.outcome(&failed), Outcome::Failed { code: -5 });
    }

    #[test]
    fn test_tag_only_operations_ignore_ids() {
        let op = lookup("xboxone_show_account_picker").unwrap();
        let envelope = Envelope::new(AsyncChannel::Dialog)
            .with("type", "xboxone_accountpicker")
            .with("succeeded", false)
            .with("user", 0);
        assert!(op.matches(&envelope, None));
        assert_eq!(op.outcome(&envelope), Outcome::Failed { code: -1 });
    }
}
