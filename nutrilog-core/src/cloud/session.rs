use std::fmt;

/// Identity reported by the sign-in provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserProfile {
    pub uid: String,
    pub display_name: Option<String>,
    pub photo_url: Option<String>,
    pub email: Option<String>,
}

impl UserProfile {
    pub fn new(uid: impl Into<String>) -> Self {
        Self {
            uid: uid.into(),
            display_name: None,
            photo_url: None,
            email: None,
        }
    }

    /// Best human-readable label: display name, then email, then uid.
    pub fn label(&self) -> &str {
        self.display_name
            .as_deref()
            .or(self.email.as_deref())
            .unwrap_or(&self.uid)
    }
}

/// A signed-in user together with the bearer credential the document store
/// needs. Never persisted by this crate.
#[derive(Clone, PartialEq, Eq)]
pub struct AuthSession {
    pub user: UserProfile,
    pub credential: String,
}

impl AuthSession {
    pub fn new(user: UserProfile, credential: impl Into<String>) -> Self {
        Self {
            user,
            credential: credential.into(),
        }
    }

    pub fn uid(&self) -> &str {
        &self.user.uid
    }
}

impl fmt::Debug for AuthSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthSession")
            .field("user", &self.user)
            .field("credential", &"<redacted>")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_prefers_display_name() {
        let mut user = UserProfile::new("u1");
        assert_eq!(user.label(), "u1");

        user.email = Some("a@example.com".into());
        assert_eq!(user.label(), "a@example.com");

        user.display_name = Some("Ada".into());
        assert_eq!(user.label(), "Ada");
    }

    #[test]
    fn test_debug_redacts_credential() {
        let session = AuthSession::new(UserProfile::new("u1"), "secret-token");
        let output = format!("{:?}", session);
        assert!(output.contains("u1"));
        assert!(!output.contains("secret-token"));
    }
}
