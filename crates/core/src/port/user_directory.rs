// User Directory Port (signed-in users, account picker, tokens, privileges)

use crate::domain::{Privilege, PrivilegeResult, UserId, UserProfile};
use crate::error::Result;
use async_trait::async_trait;
use serde_json::{Map, Value};

/// Web request to sign with the user's Xbox Live token
#[derive(Debug, Clone)]
pub struct TokenRequest {
    pub user: UserId,
    pub url: String,
    pub method: String,
    pub headers: Map<String, Value>,
    pub body: Vec<u8>,
    pub force_refresh: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenAndSignature {
    pub token: String,
    pub signature: String,
}

#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// User that launched the title, `UserId::NULL` when unknown
    fn activating_user(&self) -> UserId;

    /// Signed-in users in sign-in order
    fn users(&self) -> Vec<UserId>;

    fn profile(&self, user: UserId) -> Option<UserProfile>;

    /// Show the account picker; `None` when the user cancelled
    async fn pick_account(&self, allow_guests: bool) -> Option<UserId>;

    async fn token_and_signature(&self, request: &TokenRequest) -> Result<TokenAndSignature>;

    /// May wait on user interaction when `attempt_resolution` is set
    async fn check_privilege(
        &self,
        user: UserId,
        privilege: Privilege,
        attempt_resolution: bool,
    ) -> PrivilegeResult;
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use crate::error::AppError;
    use std::sync::Mutex;

    /// Fixed set of users; picker returns a preset answer
    pub struct StaticUserDirectory {
        profiles: Vec<UserProfile>,
        picked: Mutex<Option<UserId>>,
        token_failure: Mutex<Option<String>>,
    }

    impl StaticUserDirectory {
        pub fn new(profiles: Vec<UserProfile>) -> Self {
            let picked = profiles.first().map(|p| p.id);
            Self {
                profiles,
                picked: Mutex::new(picked),
                token_failure: Mutex::new(None),
            }
        }

        /// Preset the account picker answer (`None` = cancelled)
        pub fn set_picked(&self, user: Option<UserId>) {
            *self.picked.lock().unwrap() = user;
        }

        pub fn fail_tokens(&self, reason: Option<&str>) {
            *self.token_failure.lock().unwrap() = reason.map(str::to_string);
        }
    }

    #[async_trait]
    impl UserDirectory for StaticUserDirectory {
        fn activating_user(&self) -> UserId {
            self.profiles.first().map(|p| p.id).unwrap_or(UserId::NULL)
        }

        fn users(&self) -> Vec<UserId> {
            self.profiles.iter().map(|p| p.id).collect()
        }

        fn profile(&self, user: UserId) -> Option<UserProfile> {
            self.profiles.iter().find(|p| p.id == user).cloned()
        }

        async fn pick_account(&self, allow_guests: bool) -> Option<UserId> {
            let picked = (*self.picked.lock().unwrap())?;
            match self.profile(picked) {
                Some(profile) if profile.is_guest && !allow_guests => None,
                Some(_) => Some(picked),
                None => None,
            }
        }

        async fn token_and_signature(&self, request: &TokenRequest) -> Result<TokenAndSignature> {
            if let Some(reason) = self.token_failure.lock().unwrap().clone() {
                return Err(AppError::Backend(reason));
            }
            Ok(TokenAndSignature {
                token: format!("XBL3.0 x={};token", request.user),
                signature: format!("sig:{}:{}", request.method, request.url),
            })
        }

        async fn check_privilege(
            &self,
            user: UserId,
            privilege: Privilege,
            _attempt_resolution: bool,
        ) -> PrivilegeResult {
            match self.profile(user) {
                Some(profile) if profile.banned_privileges.contains(&privilege.code()) => {
                    PrivilegeResult::BANNED
                }
                Some(profile) if profile.privileges.contains(&privilege.code()) => {
                    PrivilegeResult::NO_ISSUE
                }
                Some(_) => PrivilegeResult::RESTRICTED,
                None => PrivilegeResult::UNKNOWN,
            }
        }
    }
}
