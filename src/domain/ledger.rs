//! Cash ledger
//!
//! Append-only log of signed register movements. Sales (`vente`) are
//! system-generated by order fulfillment; inflows (`entree`) and outflows
//! (`sortie`) are entered by hand at the register. Nothing ever updates or
//! deletes an entry, so the log doubles as the audit trail.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::CommerceError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    Entree,
    Sortie,
    Vente,
}

impl EntryKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Entree => "entree",
            Self::Sortie => "sortie",
            Self::Vente => "vente",
        }
    }
}

impl fmt::Display for EntryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for EntryKind {
    type Err = CommerceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "entree" => Ok(Self::Entree),
            "sortie" => Ok(Self::Sortie),
            "vente" => Ok(Self::Vente),
            other => Err(CommerceError::Validation(format!(
                "unknown transaction type '{other}'"
            ))),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    Especes,
    Mobile,
    Carte,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Especes => "especes",
            Self::Mobile => "mobile",
            Self::Carte => "carte",
        }
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for PaymentMethod {
    type Err = CommerceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "especes" => Ok(Self::Especes),
            "mobile" => Ok(Self::Mobile),
            "carte" => Ok(Self::Carte),
            other => Err(CommerceError::Validation(format!(
                "unknown payment method '{other}'"
            ))),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub id: Uuid,
    pub kind: EntryKind,
    pub amount: i64,
    pub description: String,
    pub payment_method: PaymentMethod,
    pub timestamp: DateTime<Utc>,
    pub user_id: Uuid,
    /// Provenance tag; fulfillment writes "ecommerce", manual entries none.
    pub source: Option<String>,
}

/// A manual register movement, validated before any write is attempted.
/// Sales cannot be entered by hand.
#[derive(Clone, Debug)]
pub struct ManualEntry {
    pub kind: EntryKind,
    pub amount: i64,
    pub description: String,
    pub payment_method: PaymentMethod,
}

impl ManualEntry {
    pub fn new(
        kind: EntryKind,
        amount: i64,
        description: String,
        payment_method: PaymentMethod,
    ) -> crate::Result<Self> {
        if kind == EntryKind::Vente {
            return Err(CommerceError::Validation(
                "sales are recorded by order fulfillment, not by hand".into(),
            ));
        }
        if amount <= 0 {
            return Err(CommerceError::Validation(
                "amount must be a positive number".into(),
            ));
        }
        if description.trim().is_empty() {
            return Err(CommerceError::Validation("description is required".into()));
        }
        Ok(Self {
            kind,
            amount,
            description,
            payment_method,
        })
    }
}

/// Inclusive date window; either bound may be open.
#[derive(Clone, Copy, Debug, Default)]
pub struct DateRange {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

impl DateRange {
    pub fn single_day(day: NaiveDate) -> Self {
        Self {
            from: Some(day),
            to: Some(day),
        }
    }

    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        let day = at.date_naive();
        self.from.map_or(true, |d0| day >= d0) && self.to.map_or(true, |d1| day <= d1)
    }
}

/// Register totals for a period.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct CashSummary {
    pub ventes: i64,
    pub entrees: i64,
    pub sorties: i64,
    /// ventes + entrees − sorties
    pub balance: i64,
    pub especes: i64,
    pub mobile: i64,
    pub carte: i64,
    pub entry_count: usize,
}

/// Aggregates the ledger over a date window. The per-payment-method
/// breakdown covers money coming in (ventes + entrees); outflows are not
/// attributed to a method.
pub fn summarize(entries: &[LedgerEntry], range: DateRange) -> CashSummary {
    let mut summary = CashSummary::default();
    for entry in entries.iter().filter(|e| range.contains(e.timestamp)) {
        summary.entry_count += 1;
        match entry.kind {
            EntryKind::Vente => summary.ventes += entry.amount,
            EntryKind::Entree => summary.entrees += entry.amount,
            EntryKind::Sortie => summary.sorties += entry.amount,
        }
        if entry.kind != EntryKind::Sortie {
            match entry.payment_method {
                PaymentMethod::Especes => summary.especes += entry.amount,
                PaymentMethod::Mobile => summary.mobile += entry.amount,
                PaymentMethod::Carte => summary.carte += entry.amount,
            }
        }
    }
    summary.balance = summary.ventes + summary.entrees - summary.sorties;
    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn entry(kind: EntryKind, amount: i64, method: PaymentMethod, day: u32) -> LedgerEntry {
        LedgerEntry {
            id: Uuid::now_v7(),
            kind,
            amount,
            description: "test".into(),
            payment_method: method,
            timestamp: Utc.with_ymd_and_hms(2025, 3, day, 12, 0, 0).unwrap(),
            user_id: Uuid::now_v7(),
            source: None,
        }
    }

    #[test]
    fn test_balance_is_sales_plus_inflow_minus_outflow() {
        let entries = vec![
            entry(EntryKind::Vente, 39000, PaymentMethod::Especes, 10),
            entry(EntryKind::Entree, 10000, PaymentMethod::Mobile, 10),
            entry(EntryKind::Sortie, 4000, PaymentMethod::Especes, 10),
        ];
        let summary = summarize(&entries, DateRange::default());
        assert_eq!(summary.ventes, 39000);
        assert_eq!(summary.entrees, 10000);
        assert_eq!(summary.sorties, 4000);
        assert_eq!(summary.balance, 45000);
        assert_eq!(summary.entry_count, 3);
    }

    #[test]
    fn test_breakdown_excludes_outflows() {
        let entries = vec![
            entry(EntryKind::Vente, 20000, PaymentMethod::Especes, 10),
            entry(EntryKind::Entree, 5000, PaymentMethod::Carte, 10),
            entry(EntryKind::Sortie, 3000, PaymentMethod::Especes, 10),
        ];
        let summary = summarize(&entries, DateRange::default());
        assert_eq!(summary.especes, 20000);
        assert_eq!(summary.carte, 5000);
        assert_eq!(summary.mobile, 0);
    }

    #[test]
    fn test_date_window_bounds_are_inclusive() {
        let entries = vec![
            entry(EntryKind::Vente, 100, PaymentMethod::Especes, 9),
            entry(EntryKind::Vente, 200, PaymentMethod::Especes, 10),
            entry(EntryKind::Vente, 400, PaymentMethod::Especes, 11),
            entry(EntryKind::Vente, 800, PaymentMethod::Especes, 12),
        ];
        let range = DateRange {
            from: Some(NaiveDate::from_ymd_opt(2025, 3, 10).unwrap()),
            to: Some(NaiveDate::from_ymd_opt(2025, 3, 11).unwrap()),
        };
        let summary = summarize(&entries, range);
        assert_eq!(summary.ventes, 600);
        assert_eq!(summary.entry_count, 2);

        let single = summarize(
            &entries,
            DateRange::single_day(NaiveDate::from_ymd_opt(2025, 3, 12).unwrap()),
        );
        assert_eq!(single.ventes, 800);
    }

    #[test]
    fn test_manual_entry_validation() {
        assert!(ManualEntry::new(
            EntryKind::Entree,
            15000,
            "Approvisionnement".into(),
            PaymentMethod::Especes,
        )
        .is_ok());

        // zero amount, empty description, hand-entered sale: all rejected
        assert!(
            ManualEntry::new(EntryKind::Entree, 0, "x".into(), PaymentMethod::Especes).is_err()
        );
        assert!(ManualEntry::new(
            EntryKind::Sortie,
            5000,
            "   ".into(),
            PaymentMethod::Especes
        )
        .is_err());
        assert!(
            ManualEntry::new(EntryKind::Vente, 5000, "x".into(), PaymentMethod::Especes).is_err()
        );
    }
}
