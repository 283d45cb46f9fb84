//! Domain events
//!
//! Published to NATS after a successful write so that connected clients can
//! re-query the affected collection. Delivery is best-effort.

use serde::Serialize;
use uuid::Uuid;

#[derive(Clone, Debug, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum DomainEvent {
    OrderPlaced {
        order_id: Uuid,
        total: i64,
    },
    OrderStatusChanged {
        order_id: Uuid,
        status: String,
    },
    /// The atomic commit succeeded: stock was decremented and the sale is
    /// in the ledger.
    OrderFulfilled {
        order_id: Uuid,
        total: i64,
    },
    CustomOrderCreated {
        custom_order_id: Uuid,
        deposit: i64,
    },
    CustomOrderStatusChanged {
        custom_order_id: Uuid,
        status: String,
    },
    LedgerEntryRecorded {
        entry_id: Uuid,
        kind: String,
        amount: i64,
    },
    CatalogChanged,
}

impl DomainEvent {
    /// NATS subject the event is published on.
    pub fn subject(&self) -> &'static str {
        match self {
            Self::OrderPlaced { .. }
            | Self::OrderStatusChanged { .. }
            | Self::OrderFulfilled { .. } => "commerce.orders",
            Self::CustomOrderCreated { .. } | Self::CustomOrderStatusChanged { .. } => {
                "commerce.custom_orders"
            }
            Self::LedgerEntryRecorded { .. } => "commerce.transactions",
            Self::CatalogChanged => "commerce.catalog",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subjects() {
        let event = DomainEvent::OrderFulfilled {
            order_id: Uuid::now_v7(),
            total: 39000,
        };
        assert_eq!(event.subject(), "commerce.orders");
        assert_eq!(DomainEvent::CatalogChanged.subject(), "commerce.catalog");
    }
}
