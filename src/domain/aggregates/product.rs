//! Product catalog types.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::CommerceError;

/// Boutique product categories. Stored as their French display strings,
/// which the storefront filters on verbatim.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Category {
    #[serde(rename = "Vêtements")]
    Vetements,
    #[serde(rename = "Chaussures")]
    Chaussures,
    #[serde(rename = "Accessoires")]
    Accessoires,
    #[serde(rename = "Couture")]
    Couture,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Vetements => "Vêtements",
            Self::Chaussures => "Chaussures",
            Self::Accessoires => "Accessoires",
            Self::Couture => "Couture",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Category {
    type Err = CommerceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Vêtements" => Ok(Self::Vetements),
            "Chaussures" => Ok(Self::Chaussures),
            "Accessoires" => Ok(Self::Accessoires),
            "Couture" => Ok(Self::Couture),
            other => Err(CommerceError::Validation(format!(
                "unknown category '{other}'"
            ))),
        }
    }
}

/// Stock policy for fulfillment: an order line may never take a product
/// below zero. Returns the remaining stock on success.
pub fn checked_decrement(
    name: &str,
    available: i32,
    requested: i32,
) -> crate::Result<i32> {
    if requested > available {
        return Err(CommerceError::InsufficientStock {
            name: name.to_string(),
            available,
            requested,
        });
    }
    Ok(available - requested)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_round_trip() {
        for cat in [
            Category::Vetements,
            Category::Chaussures,
            Category::Accessoires,
            Category::Couture,
        ] {
            assert_eq!(cat.as_str().parse::<Category>().unwrap(), cat);
        }
        assert!("Parfums".parse::<Category>().is_err());
    }

    #[test]
    fn test_checked_decrement_rejects_overdraw() {
        assert_eq!(checked_decrement("Veste", 3, 2).unwrap(), 1);
        // stock 3, ordered 5: rejected instead of going to -2
        assert!(matches!(
            checked_decrement("Veste", 3, 5),
            Err(CommerceError::InsufficientStock {
                available: 3,
                requested: 5,
                ..
            })
        ));
    }
}
