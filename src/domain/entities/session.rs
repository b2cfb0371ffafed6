use regex::Regex;
use std::fmt;
use std::sync::LazyLock;

use crate::domain::DomainError;

static SPREADSHEET_ID: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"/spreadsheets/d/([a-zA-Z0-9_-]+)").expect("spreadsheet id pattern is valid")
});

/// Credentials for the spreadsheet API, passed explicitly to every call.
#[derive(Clone)]
pub struct SessionContext {
    access_token: String,
    user: Option<String>,
}

impl SessionContext {
    pub fn new(access_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            user: None,
        }
    }

    pub fn with_user(mut self, user: impl Into<String>) -> Self {
        self.user = Some(user.into());
        self
    }

    pub fn access_token(&self) -> &str {
        &self.access_token
    }

    pub fn user(&self) -> Option<&str> {
        self.user.as_deref()
    }
}

impl fmt::Debug for SessionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionContext")
            .field("access_token", &"<redacted>")
            .field("user", &self.user)
            .finish()
    }
}

/// A spreadsheet identified by the id segment of its share URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpreadsheetRef {
    id: String,
}

impl SpreadsheetRef {
    pub fn parse(url: &str) -> Result<Self, DomainError> {
        if url.trim().is_empty() {
            return Err(DomainError::validation("URL is required"));
        }
        SPREADSHEET_ID
            .captures(url)
            .and_then(|c| c.get(1))
            .map(|m| Self {
                id: m.as_str().to_string(),
            })
            .ok_or_else(|| DomainError::validation("Invalid Spreadsheet URL"))
    }

    pub fn id(&self) -> &str {
        &self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_share_url() {
        let sheet = SpreadsheetRef::parse(
            "https://docs.google.com/spreadsheets/d/1AbC-d_9XyZ/edit#gid=0",
        )
        .unwrap();
        assert_eq!(sheet.id(), "1AbC-d_9XyZ");
    }

    #[test]
    fn test_parse_rejects_other_urls() {
        assert!(SpreadsheetRef::parse("https://example.com/doc/123").is_err());
        assert!(SpreadsheetRef::parse("").is_err());
    }

    #[test]
    fn test_session_debug_hides_token() {
        let session = SessionContext::new("ya29.secret").with_user("guest@local");
        let debug = format!("{session:?}");
        assert!(!debug.contains("ya29"));
        assert_eq!(session.user(), Some("guest@local"));
    }
}
