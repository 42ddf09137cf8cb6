//! Purchase status shared by carts and their items.

use serde::{Deserialize, Serialize};

/// Lifecycle state of a cart or cart item.
///
/// State transitions:
/// ```text
/// Created ──┬──► Cancelled
///           └──► Deleted
/// ```
/// Nothing ever moves back to `Created`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum PurchaseStatus {
    /// Live purchase; counts toward the cart total.
    #[default]
    Created,

    /// Purchase was cancelled (terminal state).
    Cancelled,

    /// Purchase was soft-deleted (terminal state).
    Deleted,
}

impl PurchaseStatus {
    /// Returns true if this status contributes to the cart total.
    pub fn is_active(&self) -> bool {
        matches!(self, PurchaseStatus::Created)
    }

    /// Returns true if no further transitions are possible.
    pub fn is_terminal(&self) -> bool {
        !self.is_active()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PurchaseStatus::Created => "Created",
            PurchaseStatus::Cancelled => "Cancelled",
            PurchaseStatus::Deleted => "Deleted",
        }
    }
}

impl std::fmt::Display for PurchaseStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Error returned when parsing an unknown status name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown purchase status: {0}")]
pub struct UnknownPurchaseStatus(pub String);

impl std::str::FromStr for PurchaseStatus {
    type Err = UnknownPurchaseStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Created" => Ok(PurchaseStatus::Created),
            "Cancelled" => Ok(PurchaseStatus::Cancelled),
            "Deleted" => Ok(PurchaseStatus::Deleted),
            other => Err(UnknownPurchaseStatus(other.to_string())),
        }
    }
}
