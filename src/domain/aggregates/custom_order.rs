//! Custom-Order Aggregate
//!
//! Made-to-order couture pieces. The deposit is recorded at creation and
//! every status change is a pure field update: no inventory exists for
//! made-to-order items and the ledger is fed at creation time, not at a
//! transition.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::CommerceError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CustomOrderStatus {
    Pending,
    InProgress,
    Completed,
    Delivered,
    Cancelled,
}

impl CustomOrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
            Self::Delivered => "delivered",
            Self::Cancelled => "cancelled",
        }
    }

    /// pending → in_progress → completed → delivered, with cancellation
    /// possible until work is completed.
    pub fn can_transition_to(&self, target: CustomOrderStatus) -> bool {
        matches!(
            (self, target),
            (Self::Pending, Self::InProgress)
                | (Self::Pending, Self::Cancelled)
                | (Self::InProgress, Self::Completed)
                | (Self::InProgress, Self::Cancelled)
                | (Self::Completed, Self::Delivered)
        )
    }

    pub fn allowed_predecessors(target: CustomOrderStatus) -> &'static [CustomOrderStatus] {
        match target {
            Self::InProgress => &[Self::Pending],
            Self::Completed => &[Self::InProgress],
            Self::Delivered => &[Self::Completed],
            Self::Cancelled => &[Self::Pending, Self::InProgress],
            Self::Pending => &[],
        }
    }
}

impl fmt::Display for CustomOrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for CustomOrderStatus {
    type Err = CommerceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "in_progress" => Ok(Self::InProgress),
            "completed" => Ok(Self::Completed),
            "delivered" => Ok(Self::Delivered),
            "cancelled" => Ok(Self::Cancelled),
            other => Err(CommerceError::Validation(format!(
                "unknown custom order status '{other}'"
            ))),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CustomOrder {
    pub id: Uuid,
    pub customer_id: Uuid,
    pub customer_name: String,
    pub customer_phone: String,
    pub model_id: Uuid,
    pub model_name: String,
    pub model_image: Option<String>,
    pub fabric_details: Option<String>,
    pub deadline: NaiveDate,
    pub price: i64,
    pub deposit: i64,
    pub notes: Option<String>,
    pub status: CustomOrderStatus,
    pub created_at: DateTime<Utc>,
}

/// Pricing rules checked before a custom order is persisted. The deposit
/// may never exceed the agreed price.
pub fn validate_pricing(price: i64, deposit: i64) -> crate::Result<()> {
    if price <= 0 {
        return Err(CommerceError::Validation(
            "price must be a positive amount".into(),
        ));
    }
    if deposit < 0 {
        return Err(CommerceError::Validation(
            "deposit cannot be negative".into(),
        ));
    }
    if deposit > price {
        return Err(CommerceError::Validation(format!(
            "deposit ({deposit}) exceeds price ({price})"
        )));
    }
    Ok(())
}
