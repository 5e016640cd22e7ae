// User Domain Model

use serde::{Deserialize, Serialize};

/// Platform user handle; `0` is the null user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(u64);

impl UserId {
    pub const NULL: UserId = UserId(0);

    pub fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub fn value(&self) -> u64 {
        self.0
    }

    pub fn is_null(&self) -> bool {
        self.0 == 0
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Signed-in user as seen by the platform
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: UserId,
    pub gamertag: String,
    #[serde(default)]
    pub modern_gamertag: Option<String>,
    #[serde(default)]
    pub modern_gamertag_suffix: Option<String>,
    #[serde(default)]
    pub is_guest: bool,
    /// Whether an Xbox Live context can be obtained for this user
    #[serde(default = "default_true")]
    pub live_context: bool,
    /// Granted privilege codes
    #[serde(default)]
    pub privileges: Vec<u32>,
    /// Privilege codes the user is banned from
    #[serde(default)]
    pub banned_privileges: Vec<u32>,
}

fn default_true() -> bool {
    true
}

impl UserProfile {
    pub fn new(id: UserId, gamertag: impl Into<String>) -> Self {
        Self {
            id,
            gamertag: gamertag.into(),
            modern_gamertag: None,
            modern_gamertag_suffix: None,
            is_guest: false,
            live_context: true,
            privileges: Vec::new(),
            banned_privileges: Vec::new(),
        }
    }

    /// Modern gamertag without suffix, falling back to the classic tag
    pub fn modern_gamertag(&self) -> &str {
        self.modern_gamertag.as_deref().unwrap_or(&self.gamertag)
    }

    /// Modern gamertag suffix (e.g. `#1234`), empty when there is none
    pub fn modern_gamertag_suffix(&self) -> &str {
        match &self.modern_gamertag {
            Some(_) => self.modern_gamertag_suffix.as_deref().unwrap_or(""),
            None => "",
        }
    }

    /// Modern gamertag including suffix, or the classic tag
    pub fn unique_modern_gamertag(&self) -> String {
        match &self.modern_gamertag {
            Some(tag) => format!("{}{}", tag, self.modern_gamertag_suffix()),
            None => self.gamertag.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_null_user() {
        assert!(UserId::NULL.is_null());
        assert!(UserId::default().is_null());
        assert!(!UserId::new(42).is_null());
    }

    #[test]
    fn test_gamertag_fallbacks() {
        let mut profile = UserProfile::new(UserId::new(1), "ClassicTag");
        assert_eq!(profile.modern_gamertag(), "ClassicTag");
        assert_eq!(profile.modern_gamertag_suffix(), "");
        assert_eq!(profile.unique_modern_gamertag(), "ClassicTag");

        profile.modern_gamertag = Some("Modern".to_string());
        profile.modern_gamertag_suffix = Some("#1234".to_string());
        assert_eq!(profile.modern_gamertag(), "Modern");
        assert_eq!(profile.modern_gamertag_suffix(), "#1234");
        assert_eq!(profile.unique_modern_gamertag(), "Modern#1234");
    }
}
