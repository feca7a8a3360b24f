use serde::{Deserialize, Serialize};

/// Authenticated user record issued by the auth provider
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Identity {
    /// Stable provider-issued id; names the user's document collections
    pub uid: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
}

impl Identity {
    pub fn new(uid: impl Into<String>) -> Self {
        Self {
            uid: uid.into(),
            email: None,
            display_name: None,
        }
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }

    /// Name shown in the header: display name, else the email's local part, else the uid
    pub fn display_label(&self) -> String {
        if let Some(name) = self.display_name.as_deref().filter(|n| !n.trim().is_empty()) {
            return name.to_string();
        }

        self.email
            .as_deref()
            .and_then(|email| email.split('@').next())
            .filter(|local| !local.is_empty())
            .unwrap_or(&self.uid)
            .to_string()
    }

    /// Upper-cased first character of the display label
    pub fn avatar_initial(&self) -> Option<char> {
        self.display_label()
            .chars()
            .next()
            .and_then(|c| c.to_uppercase().next())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_label_prefers_display_name() {
        let identity = Identity::new("u1")
            .with_email("jane@example.com")
            .with_display_name("Jane");
        assert_eq!(identity.display_label(), "Jane");
        assert_eq!(identity.avatar_initial(), Some('J'));
    }

    #[test]
    fn test_display_label_uses_email_local_part() {
        let identity = Identity::new("u1").with_email("movie.fan@example.com");
        assert_eq!(identity.display_label(), "movie.fan");
        assert_eq!(identity.avatar_initial(), Some('M'));
    }

    #[test]
    fn test_display_label_falls_back_to_uid() {
        let identity = Identity::new("u1");
        assert_eq!(identity.display_label(), "u1");
    }
}
