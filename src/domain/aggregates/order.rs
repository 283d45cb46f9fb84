//! Order Aggregate
//!
//! A web order is frozen at checkout: line items, subtotal, shipping and
//! total never change afterwards. Only the status moves, through a fixed
//! lifecycle, and only by admin action. The fulfillment transition
//! (processing → completed) carries side effects and is committed
//! atomically by the store layer.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::aggregates::cart::CartLine;
use crate::CommerceError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Pending,
    Processing,
    Completed,
    Cancelled,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        }
    }

    /// Transition table. Cancellation is allowed from both pending and
    /// processing; completed and cancelled are terminal.
    pub fn can_transition_to(&self, target: OrderStatus) -> bool {
        matches!(
            (self, target),
            (Self::Pending, Self::Processing)
                | (Self::Pending, Self::Cancelled)
                | (Self::Processing, Self::Completed)
                | (Self::Processing, Self::Cancelled)
        )
    }

    /// The statuses an order must currently hold for a transition to
    /// `target` to be legal. Drives the conditional `WHERE status = ...`
    /// clause of the server-side commit.
    pub fn allowed_predecessors(target: OrderStatus) -> &'static [OrderStatus] {
        match target {
            Self::Processing => &[Self::Pending],
            Self::Completed => &[Self::Processing],
            Self::Cancelled => &[Self::Pending, Self::Processing],
            Self::Pending => &[],
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = CommerceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "processing" => Ok(Self::Processing),
            "completed" => Ok(Self::Completed),
            "cancelled" => Ok(Self::Cancelled),
            other => Err(CommerceError::Validation(format!(
                "unknown order status '{other}'"
            ))),
        }
    }
}

/// Contact details captured at checkout. All three fields are required.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CustomerContact {
    pub name: String,
    pub phone: String,
    pub address: String,
}

impl CustomerContact {
    pub fn validate(&self) -> crate::Result<()> {
        for (field, value) in [
            ("name", &self.name),
            ("phone", &self.phone),
            ("address", &self.address),
        ] {
            if value.trim().is_empty() {
                return Err(CommerceError::Validation(format!(
                    "customer {field} is required"
                )));
            }
        }
        Ok(())
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Order {
    pub id: Uuid,
    pub user_id: Uuid,
    pub customer: CustomerContact,
    pub items: Vec<CartLine>,
    pub subtotal: i64,
    pub shipping: i64,
    pub total: i64,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lifecycle_transitions() {
        use OrderStatus::*;
        assert!(Pending.can_transition_to(Processing));
        assert!(Pending.can_transition_to(Cancelled));
        assert!(Processing.can_transition_to(Completed));
        assert!(Processing.can_transition_to(Cancelled));

        assert!(!Pending.can_transition_to(Completed));
        assert!(!Completed.can_transition_to(Cancelled));
        assert!(!Completed.can_transition_to(Processing));
        assert!(!Cancelled.can_transition_to(Pending));
        assert!(!Processing.can_transition_to(Pending));
    }

    #[test]
    fn test_fulfillment_requires_processing() {
        assert_eq!(
            OrderStatus::allowed_predecessors(OrderStatus::Completed),
            &[OrderStatus::Processing]
        );
    }

    #[test]
    fn test_status_round_trip() {
        for s in ["pending", "processing", "completed", "cancelled"] {
            assert_eq!(s.parse::<OrderStatus>().unwrap().as_str(), s);
        }
        assert!("shipped".parse::<OrderStatus>().is_err());
    }

    #[test]
    fn test_contact_validation() {
        let contact = CustomerContact {
            name: "Aïcha Diallo".into(),
            phone: "+227 90 00 00 00".into(),
            address: "Plateau, Niamey".into(),
        };
        assert!(contact.validate().is_ok());

        let missing = CustomerContact {
            address: "  ".into(),
            ..contact
        };
        assert!(missing.validate().is_err());
    }
}
