// User Service - signed-in users, account picker, tokens and gamertags

use crate::application::issuer::AsyncIssuer;
use crate::domain::{AsyncChannel, Envelope, UserId, UserProfile};
use crate::error::{AppError, Result};
use crate::port::{TokenRequest, UserDirectory};
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::{debug, warn};

const ALLOWED_METHODS: [&str; 6] = ["GET", "POST", "PUT", "DELETE", "PATCH", "HEAD"];

pub const ACCOUNT_PICKER_TYPE: &str = "xboxone_accountpicker";
pub const TOKEN_RESULT_EVENT: &str = "tokenandsignature_result";

pub struct UserService {
    directory: Arc<dyn UserDirectory>,
    issuer: AsyncIssuer,
}

impl UserService {
    pub fn new(directory: Arc<dyn UserDirectory>, issuer: AsyncIssuer) -> Self {
        Self { directory, issuer }
    }

    pub fn activating_user(&self) -> UserId {
        self.directory.activating_user()
    }

    pub fn user_count(&self) -> usize {
        self.directory.users().len()
    }

    /// User at `index`, or the null user when out of range
    pub fn user(&self, index: i64) -> UserId {
        usize::try_from(index)
            .ok()
            .and_then(|i| self.directory.users().get(i).copied())
            .unwrap_or(UserId::NULL)
    }

    /// Profile of a signed-in user; unknown and null users are rejected
    pub fn require_user(&self, user: UserId) -> Result<UserProfile> {
        if user.is_null() {
            return Err(AppError::InvalidUser(user.to_string()));
        }
        self.directory
            .profile(user)
            .ok_or_else(|| AppError::InvalidUser(user.to_string()))
    }

    /// Launch the account picker. `pad_id` is accepted for signature
    /// compatibility and otherwise unused.
    pub fn show_account_picker(&self, pad_id: i64, allow_guests: bool) -> Result<()> {
        self.issuer.ensure_running()?;
        debug!(pad_id, allow_guests, "Showing account picker");

        let directory = Arc::clone(&self.directory);
        self.issuer.complete(async move {
            let picked = directory.pick_account(allow_guests).await;
            Envelope::new(AsyncChannel::Dialog)
                .with("type", ACCOUNT_PICKER_TYPE)
                .with("succeeded", picked.is_some())
                .with("user", picked.unwrap_or(UserId::NULL).value())
        });
        Ok(())
    }

    pub fn get_token_and_signature(
        &self,
        user: UserId,
        url: &str,
        method: &str,
        headers_json: &str,
        body: Vec<u8>,
        force_refresh: bool,
    ) -> Result<()> {
        self.issuer.ensure_running()?;
        self.require_user(user)?;
        if url.trim().is_empty() {
            return Err(AppError::Validation("url must not be empty".to_string()));
        }
        let method = method.to_ascii_uppercase();
        if !ALLOWED_METHODS.contains(&method.as_str()) {
            return Err(AppError::Validation(format!(
                "unsupported HTTP method: {}",
                method
            )));
        }
        let headers = parse_headers(headers_json)?;

        let request = TokenRequest {
            user,
            url: url.to_string(),
            method,
            headers,
            body,
            force_refresh,
        };
        let directory = Arc::clone(&self.directory);
        self.issuer.complete(async move {
            let envelope =
                Envelope::new(AsyncChannel::System).with("event_type", TOKEN_RESULT_EVENT);
            match directory.token_and_signature(&request).await {
                Ok(result) => envelope
                    .with("status", 0)
                    .with("token", result.token)
                    .with("signature", result.signature),
                Err(e) => {
                    warn!(user = %request.user, error = %e, "Token request failed");
                    envelope.with("status", -1)
                }
            }
        });
        Ok(())
    }

    pub fn gamertag_for_user(&self, user: UserId) -> String {
        self.directory
            .profile(user)
            .map(|p| p.gamertag)
            .unwrap_or_default()
    }

    pub fn unique_modern_gamertag_for_user(&self, user: UserId) -> String {
        self.directory
            .profile(user)
            .map(|p| p.unique_modern_gamertag())
            .unwrap_or_default()
    }

    pub fn modern_gamertag_suffix_for_user(&self, user: UserId) -> String {
        self.directory
            .profile(user)
            .map(|p| p.modern_gamertag_suffix().to_string())
            .unwrap_or_default()
    }

    pub fn modern_gamertag_for_user(&self, user: UserId) -> String {
        self.directory
            .profile(user)
            .map(|p| p.modern_gamertag().to_string())
            .unwrap_or_default()
    }
}

/// Headers arrive as a JSON object string; empty means no headers
fn parse_headers(headers_json: &str) -> Result<Map<String, Value>> {
    if headers_json.trim().is_empty() {
        return Ok(Map::new());
    }
    match serde_json::from_str::<Value>(headers_json) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(AppError::Validation(
            "headers must be a JSON object".to_string(),
        )),
        Err(e) => Err(AppError::Validation(format!("invalid headers JSON: {}", e))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::correlation::{event_queue, Inbox};
    use crate::port::user_directory::mocks::StaticUserDirectory;
    use crate::port::SequentialIdProvider;
    use tokio::runtime::Handle;

    fn service() -> (UserService, Arc<StaticUserDirectory>, Inbox) {
        let mut guest = UserProfile::new(UserId::new(2), "Guest");
        guest.is_guest = true;
        let mut modern = UserProfile::new(UserId::new(1), "Classic");
        modern.modern_gamertag = Some("Modern".to_string());
        modern.modern_gamertag_suffix = Some("#77".to_string());

        let directory = Arc::new(StaticUserDirectory::new(vec![modern, guest]));
        let (events, inbox) = event_queue();
        let issuer = AsyncIssuer::new(
            Arc::new(SequentialIdProvider::new()),
            events,
            Handle::current(),
        );
        (
            UserService::new(directory.clone(), issuer),
            directory,
            inbox,
        )
    }

    #[tokio::test]
    async fn test_user_indexing() {
        let (users, _, _inbox) = service();
        assert_eq!(users.user_count(), 2);
        assert_eq!(users.user(0), UserId::new(1));
        assert_eq!(users.user(1), UserId::new(2));
        assert!(users.user(2).is_null());
        assert!(users.user(-1).is_null());
        assert_eq!(users.activating_user(), UserId::new(1));
    }

    #[tokio::test]
    async fn test_account_picker_envelope() {
        let (users, directory, mut inbox) = service();
        users.show_account_picker(0, false).unwrap();
        let picked = inbox.recv().await.unwrap();
        assert_eq!(picked.get_str("type"), Some(ACCOUNT_PICKER_TYPE));
        assert_eq!(picked.get_bool("succeeded"), Some(true));
        assert_eq!(picked.get_i64("user"), Some(1));

        directory.set_picked(Some(UserId::new(2)));
        users.show_account_picker(0, false).unwrap();
        let refused = inbox.recv().await.unwrap();
        assert_eq!(refused.get_bool("succeeded"), Some(false));
        assert_eq!(refused.get_i64("user"), Some(0));
    }

    #[tokio::test]
    async fn test_token_validation_is_synchronous() {
        let (users, _, inbox) = service();
        let user = UserId::new(1);
        assert!(users
            .get_token_and_signature(UserId::new(99), "https://x", "GET", "{}", vec![], false)
            .is_err());
        assert!(users
            .get_token_and_signature(user, "", "GET", "{}", vec![], false)
            .is_err());
        assert!(users
            .get_token_and_signature(user, "https://x", "FETCH", "{}", vec![], false)
            .is_err());
        assert!(users
            .get_token_and_signature(user, "https://x", "GET", "[1]", vec![], false)
            .is_err());
        assert_eq!(inbox.pending_len(), 0);
    }

    #[tokio::test]
    async fn test_token_envelope() {
        let (users, directory, mut inbox) = service();
        let user = UserId::new(1);
        users
            .get_token_and_signature(user, "https://x", "post", r#"{"a":"b"}"#, b"hi".to_vec(), true)
            .unwrap();
        let ok = inbox.recv().await.unwrap();
        assert_eq!(ok.get_str("event_type"), Some(TOKEN_RESULT_EVENT));
        assert_eq!(ok.get_i64("status"), Some(0));
        assert!(ok.get_str("token").is_some());

        directory.fail_tokens(Some("offline"));
        users
            .get_token_and_signature(user, "https://x", "GET", "", vec![], false)
            .unwrap();
        let failed = inbox.recv().await.unwrap();
        assert_eq!(failed.get_i64("status"), Some(-1));
    }

    #[tokio::test]
    async fn test_gamertags() {
        let (users, _, _inbox) = service();
        let modern = UserId::new(1);
        assert_eq!(users.gamertag_for_user(modern), "Classic");
        assert_eq!(users.modern_gamertag_for_user(modern), "Modern");
        assert_eq!(users.modern_gamertag_suffix_for_user(modern), "#77");
        assert_eq!(users.unique_modern_gamertag_for_user(modern), "Modern#77");
        assert_eq!(users.unique_modern_gamertag_for_user(UserId::new(2)), "Guest");
        assert_eq!(users.gamertag_for_user(UserId::new(42)), "");
    }
}
