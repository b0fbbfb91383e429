//! Session-related types.
//!
//! Types stored in the session for authentication state, the anonymous cart
//! and one-shot flash messages.

use serde::{Deserialize, Serialize};

use techshop_core::{UserId, Username};

/// Session-stored user identity.
///
/// Minimal data stored in the session to identify the logged-in user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentUser {
    /// User's database ID.
    pub id: UserId,
    /// Login name, shown in the header.
    pub username: Username,
}

/// Severity of a flash message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlashLevel {
    Info,
    Success,
    Error,
}

impl FlashLevel {
    /// CSS modifier for the alert box.
    #[must_use]
    pub const fn css_class(&self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Success => "success",
            Self::Error => "error",
        }
    }
}

/// A message shown once on the next rendered page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flash {
    pub level: FlashLevel,
    pub message: String,
}

impl Flash {
    #[must_use]
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            level: FlashLevel::Success,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            level: FlashLevel::Info,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: FlashLevel::Error,
            message: message.into(),
        }
    }
}

/// Session keys.
pub mod keys {
    /// Key for storing the current logged-in user.
    pub const CURRENT_USER: &str = "current_user";

    /// Key for the anonymous visitor's cart ID.
    pub const CART_ID: &str = "cart_id";

    /// Key for pending flash messages.
    pub const FLASH: &str = "flash";

    /// Key for checkout form values kept across a failed submission.
    pub const CHECKOUT_FORM: &str = "checkout_form";
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_current_user_roundtrip() {
        let user = CurrentUser {
            id: UserId::new(3),
            username: Username::parse("ann").unwrap(),
        };
        let json = serde_json::to_string(&user).unwrap();
        assert_eq!(serde_json::from_str::<CurrentUser>(&json).unwrap(), user);
    }

    #[test]
    fn test_flash_levels() {
        assert_eq!(Flash::error("x").level.css_class(), "error");
        let json = serde_json::to_string(&Flash::success("Added")).unwrap();
        assert_eq!(json, r#"{"level":"success","message":"Added"}"#);
    }
}
