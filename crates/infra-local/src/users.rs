// Local UserDirectory - users, account picker, tokens and privileges from the fixture

use crate::fixture::PlatformFixture;
use async_trait::async_trait;
use gdkbridge_core::domain::{Privilege, PrivilegeResult, UserId, UserProfile};
use gdkbridge_core::error::{AppError, Result};
use gdkbridge_core::port::{TokenAndSignature, TokenRequest, UserDirectory};
use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, Mutex};
use tracing::debug;
use uuid::Uuid;

pub struct LocalUsers {
    fixture: Arc<PlatformFixture>,
    /// Cached token per user, replaced on `force_refresh`
    tokens: Mutex<HashMap<UserId, String>>,
}

impl LocalUsers {
    pub fn new(fixture: Arc<PlatformFixture>) -> Self {
        Self {
            fixture,
            tokens: Mutex::new(HashMap::new()),
        }
    }

    fn token_for(&self, user: UserId, force_refresh: bool) -> Result<String> {
        let mut tokens = self
            .tokens
            .lock()
            .map_err(|_| AppError::Internal("token cache lock poisoned".to_string()))?;
        if force_refresh {
            tokens.remove(&user);
        }
        Ok(tokens
            .entry(user)
            .or_insert_with(|| Uuid::new_v4().simple().to_string())
            .clone())
    }
}

#[async_trait]
impl UserDirectory for LocalUsers {
    fn activating_user(&self) -> UserId {
        self.fixture
            .activating_user
            .or_else(|| self.fixture.users.first().map(|u| u.id))
            .unwrap_or(UserId::NULL)
    }

    fn users(&self) -> Vec<UserId> {
        self.fixture.users.iter().map(|u| u.id).collect()
    }

    fn profile(&self, user: UserId) -> Option<UserProfile> {
        self.fixture.user(user).cloned()
    }

    async fn pick_account(&self, allow_guests: bool) -> Option<UserId> {
        let allowed = |profile: &&UserProfile| allow_guests || !profile.is_guest;
        let picked = match self.fixture.picker_choice {
            Some(choice) => self.fixture.user(choice).filter(allowed),
            None => self.fixture.users.iter().find(allowed),
        };
        debug!(allow_guests, picked = ?picked.map(|p| p.id), "Account picker answered");
        picked.map(|p| p.id)
    }

    async fn token_and_signature(&self, request: &TokenRequest) -> Result<TokenAndSignature> {
        let profile = self
            .fixture
            .user(request.user)
            .ok_or_else(|| AppError::InvalidUser(request.user.to_string()))?;
        if !profile.live_context {
            return Err(AppError::LiveContextUnavailable(request.user.to_string()));
        }

        let token = self.token_for(request.user, request.force_refresh)?;
        let mut hasher = DefaultHasher::new();
        request.method.to_ascii_uppercase().hash(&mut hasher);
        request.url.hash(&mut hasher);
        request.body.hash(&mut hasher);
        token.hash(&mut hasher);

        Ok(TokenAndSignature {
            token: format!("XBL3.0 x={};{}", request.user, token),
            signature: format!("AAAAAQ{:016x}", hasher.finish()),
        })
    }

    async fn check_privilege(
        &self,
        user: UserId,
        privilege: Privilege,
        attempt_resolution: bool,
    ) -> PrivilegeResult {
        let Some(profile) = self.fixture.user(user) else {
            return PrivilegeResult::UNKNOWN;
        };
        if profile.banned_privileges.contains(&privilege.code()) {
            PrivilegeResult::BANNED
        } else if profile.privileges.contains(&privilege.code()) {
            PrivilegeResult::NO_ISSUE
        } else if attempt_resolution && profile.is_guest {
            // Guests cannot resolve through an upsell
            PrivilegeResult::RESTRICTED
        } else if attempt_resolution {
            PrivilegeResult::PURCHASE_REQUIRED
        } else {
            PrivilegeResult::RESTRICTED
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Map;

    fn users() -> LocalUsers {
        LocalUsers::new(Arc::new(PlatformFixture::builtin()))
    }

    fn request(user: UserId, force_refresh: bool) -> TokenRequest {
        TokenRequest {
            user,
            url: "https://example.xboxlive.com/profile".to_string(),
            method: "GET".to_string(),
            headers: Map::new(),
            body: Vec::new(),
            force_refresh,
        }
    }

    #[tokio::test]
    async fn test_picker_skips_guests_unless_allowed() {
        let users = users();
        let first = users.users()[0];
        assert_eq!(users.pick_account(false).await, Some(first));

        let mut fixture = PlatformFixture::builtin();
        let guest = fixture.users[1].id;
        fixture.picker_choice = Some(guest);
        let users = LocalUsers::new(Arc::new(fixture));
        assert_eq!(users.pick_account(false).await, None);
        assert_eq!(users.pick_account(true).await, Some(guest));
    }

    #[tokio::test]
    async fn test_tokens_are_cached_until_refresh() {
        let users = users();
        let user = users.activating_user();
        let a = users.token_and_signature(&request(user, false)).await.unwrap();
        let b = users.token_and_signature(&request(user, false)).await.unwrap();
        let c = users.token_and_signature(&request(user, true)).await.unwrap();
        assert_eq!(a, b);
        assert_ne!(a.token, c.token);
        assert!(a.token.starts_with("XBL3.0 x="));
    }

    #[tokio::test]
    async fn test_token_requires_live_context() {
        let users = users();
        let guest = users.users()[1];
        assert!(matches!(
            users.token_and_signature(&request(guest, false)).await,
            Err(AppError::LiveContextUnavailable(_))
        ));
    }

    #[tokio::test]
    async fn test_privileges() {
        let users = users();
        let player = users.activating_user();
        assert!(users
            .check_privilege(player, Privilege::MultiplayerSessions, false)
            .await
            .is_granted());
        assert_eq!(
            users
                .check_privilege(player, Privilege::InternetBrowsing, true)
                .await,
            PrivilegeResult::PURCHASE_REQUIRED
        );
        assert_eq!(
            users
                .check_privilege(UserId::new(404), Privilege::Sessions, false)
                .await,
            PrivilegeResult::UNKNOWN
        );
    }
}
