//! Actor identity handed to the core by the request-dispatch layer.
//!
//! Credentials are verified elsewhere. The core only receives an already-resolved
//! [`Actor`] and evaluates explicit predicates on it: staff-only operations call
//! [`Actor::require_staff`], data-level ownership checks call [`Actor::can_access`].

use crate::errors::{Error, Result};
use serde::{Deserialize, Serialize};

/// A resolved, authenticated user acting on the system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    /// Database id of the acting user
    pub user_id: i64,
    /// Whether the user is a staff member
    pub is_staff: bool,
}

impl Actor {
    /// An ordinary client.
    #[must_use]
    pub const fn client(user_id: i64) -> Self {
        Self {
            user_id,
            is_staff: false,
        }
    }

    /// A staff member.
    #[must_use]
    pub const fn staff(user_id: i64) -> Self {
        Self {
            user_id,
            is_staff: true,
        }
    }

    /// Fails with [`Error::Forbidden`] unless the actor is staff.
    pub fn require_staff(&self) -> Result<()> {
        if self.is_staff {
            Ok(())
        } else {
            Err(Error::Forbidden)
        }
    }

    /// Staff can access everything, clients only what they own.
    #[must_use]
    pub const fn can_access(&self, owner_id: i64) -> bool {
        self.is_staff || self.user_id == owner_id
    }
}

/// Why the auth collaborator could not resolve an actor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthFailure {
    /// No credentials were presented
    Unauthenticated,
    /// Credentials were presented but are invalid or expired
    TokenInvalid,
}

impl From<AuthFailure> for Error {
    fn from(_: AuthFailure) -> Self {
        Self::Unauthorized
    }
}

/// Close code sent to a live subscriber that is turned away.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseCode {
    /// The token is invalid or expired (4001)
    TokenInvalid,
    /// The user is known but not allowed to watch the feed (4003)
    Unauthorized,
}

impl CloseCode {
    /// Numeric code on the wire.
    #[must_use]
    pub const fn code(self) -> u16 {
        match self {
            Self::TokenInvalid => 4001,
            Self::Unauthorized => 4003,
        }
    }

    /// Human-readable reason sent with the code.
    #[must_use]
    pub const fn reason(self) -> &'static str {
        match self {
            Self::TokenInvalid => "The token is invalid or has expired.",
            Self::Unauthorized => "User is not authorized.",
        }
    }
}

impl From<AuthFailure> for CloseCode {
    fn from(failure: AuthFailure) -> Self {
        match failure {
            AuthFailure::TokenInvalid => Self::TokenInvalid,
            AuthFailure::Unauthenticated => Self::Unauthorized,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_require_staff() {
        assert!(Actor::staff(1).require_staff().is_ok());
        assert!(matches!(
            Actor::client(1).require_staff(),
            Err(Error::Forbidden)
        ));
    }

    #[test]
    fn test_can_access() {
        assert!(Actor::client(7).can_access(7));
        assert!(!Actor::client(7).can_access(8));
        assert!(Actor::staff(1).can_access(8));
    }

    #[test]
    fn test_close_codes() {
        assert_eq!(CloseCode::from(AuthFailure::TokenInvalid).code(), 4001);
        assert_eq!(CloseCode::from(AuthFailure::Unauthenticated).code(), 4003);
        assert_eq!(CloseCode::Unauthorized.code(), 4003);
    }
}
