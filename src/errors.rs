//! Unified error type for the cafeteria core.
//!
//! Every mutating or reading operation returns [`Result`]. User-facing failures carry a
//! stable machine-readable code (see [`Error::code`]) so the transport layer can map them
//! without string matching; storage and programmer errors are kept apart via
//! [`Error::is_user_facing`].

use thiserror::Error;

/// All errors surfaced by the cafeteria core.
#[derive(Debug, Error)]
pub enum Error {
    /// A catalog, user, or order entity does not exist (or is soft-deleted).
    #[error("{entity} not found: {key}")]
    NotFound {
        /// Kind of entity that was looked up (e.g. `"snack"`)
        entity: &'static str,
        /// The key used for the lookup
        key: String,
    },

    /// Malformed or out-of-range input.
    #[error("Validation error: {message}")]
    Validation {
        /// Human-readable explanation
        message: String,
    },

    /// A cart asked for more units than are in stock.
    #[error("Insufficient stock for '{snack}': requested {requested}, available {available}")]
    InsufficientStock {
        /// Snack name
        snack: String,
        /// Quantity in the cart
        requested: i32,
        /// Quantity in stock at the time of the request
        available: i32,
    },

    /// Two ingredients of the same single-choice group were requested.
    #[error("Only one ingredient of choice group {group} may be selected ('{ingredient}' conflicts)")]
    ChoiceConflict {
        /// The contested choice-group number
        group: i32,
        /// The second ingredient that collided
        ingredient: String,
    },

    /// The order has a final payment and can no longer change.
    #[error("Order has already been paid")]
    AlreadyPaid,

    /// No resolved actor was supplied.
    #[error("Authentication required")]
    Unauthorized,

    /// The actor lacks staff rights or ownership.
    #[error("You do not have permission to perform this action")]
    Forbidden,

    /// No dish is configured for the requested weekday.
    #[error("No dish is configured for day {day}")]
    CatalogNotFound {
        /// Weekday number, Monday = 1
        day: i32,
    },

    /// The cart has neither snacks nor lunch ingredients.
    #[error("An order needs at least one snack or lunch ingredient")]
    EmptyCart,

    /// Configuration could not be loaded or parsed.
    #[error("Configuration error: {message}")]
    Config {
        /// Human-readable explanation
        message: String,
    },

    /// A broken invariant; never caused by user input.
    #[error("Internal error: {message}")]
    Internal {
        /// Human-readable explanation
        message: String,
    },

    /// Underlying store failure.
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    /// I/O failure (config files).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization failure while rendering a view.
    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Stable machine-readable code for this error kind.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "not_found",
            Self::Validation { .. } => "validation_error",
            Self::InsufficientStock { .. } => "insufficient_stock",
            Self::ChoiceConflict { .. } => "choice_conflict",
            Self::AlreadyPaid => "already_paid",
            Self::Unauthorized => "unauthorized",
            Self::Forbidden => "forbidden",
            Self::CatalogNotFound { .. } => "catalog_not_found",
            Self::EmptyCart => "empty_cart",
            Self::Config { .. } => "config_error",
            Self::Internal { .. } | Self::Database(_) | Self::Io(_) | Self::Json(_) => {
                "internal_error"
            }
        }
    }

    /// Whether the error was caused by the request rather than by the system.
    #[must_use]
    pub const fn is_user_facing(&self) -> bool {
        !matches!(
            self,
            Self::Config { .. }
                | Self::Internal { .. }
                | Self::Database(_)
                | Self::Io(_)
                | Self::Json(_)
        )
    }

    pub(crate) fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    pub(crate) fn not_found(entity: &'static str, key: impl ToString) -> Self {
        Self::NotFound {
            entity,
            key: key.to_string(),
        }
    }
}

/// Convenience `Result` type
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_are_stable() {
        assert_eq!(Error::AlreadyPaid.code(), "already_paid");
        assert_eq!(Error::EmptyCart.code(), "empty_cart");
        assert_eq!(Error::not_found("snack", "Cola").code(), "not_found");
        assert_eq!(
            Error::ChoiceConflict {
                group: 1,
                ingredient: "Rice".to_string()
            }
            .code(),
            "choice_conflict"
        );
    }

    #[test]
    fn test_internal_errors_are_not_user_facing() {
        assert!(Error::validation("bad").is_user_facing());
        assert!(Error::CatalogNotFound { day: 6 }.is_user_facing());
        assert!(
            !Error::Internal {
                message: "negative stock".to_string()
            }
            .is_user_facing()
        );
        assert_eq!(
            Error::Internal {
                message: String::new()
            }
            .code(),
            "internal_error"
        );
    }
}
