//! Catalog projection
//!
//! The storefront shows one list built from two collections: stocked
//! products and made-to-order couture models. Models are tagged and forced
//! into the "Couture" category regardless of anything stored on them.
//! Filtering and sorting happen on the projected list, never against the
//! store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::aggregates::product::Category;

#[derive(Clone, Debug, Serialize)]
pub struct CatalogItem {
    pub id: Uuid,
    pub name: String,
    pub price: i64,
    pub image: String,
    pub category: String,
    pub description: Option<String>,
    /// Stocked products carry a count; models are made to order.
    pub stock: Option<i32>,
    pub is_model: bool,
    pub created_at: DateTime<Utc>,
}

/// Source record for a stocked product.
#[derive(Clone, Debug)]
pub struct ProductRecord {
    pub id: Uuid,
    pub name: String,
    pub price: i64,
    pub image: String,
    pub category: String,
    pub description: Option<String>,
    pub stock: i32,
    pub created_at: DateTime<Utc>,
}

/// Source record for a couture model.
#[derive(Clone, Debug)]
pub struct ModelRecord {
    pub id: Uuid,
    pub name: String,
    pub price: i64,
    pub image: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Merges both collections, preserving the order of each source list.
/// The projection always has length |products| + |models|.
pub fn project(products: &[ProductRecord], models: &[ModelRecord]) -> Vec<CatalogItem> {
    let mut items = Vec::with_capacity(products.len() + models.len());
    items.extend(products.iter().map(|p| CatalogItem {
        id: p.id,
        name: p.name.clone(),
        price: p.price,
        image: p.image.clone(),
        category: p.category.clone(),
        description: p.description.clone(),
        stock: Some(p.stock),
        is_model: false,
        created_at: p.created_at,
    }));
    items.extend(models.iter().map(|m| CatalogItem {
        id: m.id,
        name: m.name.clone(),
        price: m.price,
        image: m.image.clone(),
        category: Category::Couture.as_str().to_string(),
        description: m.description.clone(),
        stock: None,
        is_model: true,
        created_at: m.created_at,
    }));
    items
}

/// Storefront price buckets, bounds inclusive.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PriceRange {
    #[serde(rename = "0-20000")]
    UpTo20k,
    #[serde(rename = "20000-50000")]
    From20kTo50k,
    #[serde(rename = "50000-100000")]
    From50kTo100k,
    #[serde(rename = "100000+")]
    Above100k,
}

impl PriceRange {
    pub fn contains(&self, price: i64) -> bool {
        match self {
            Self::UpTo20k => price <= 20000,
            Self::From20kTo50k => (20000..=50000).contains(&price),
            Self::From50kTo100k => (50000..=100000).contains(&price),
            Self::Above100k => price >= 100000,
        }
    }
}

impl std::str::FromStr for PriceRange {
    type Err = crate::CommerceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "0-20000" => Ok(Self::UpTo20k),
            "20000-50000" => Ok(Self::From20kTo50k),
            "50000-100000" => Ok(Self::From50kTo100k),
            "100000+" => Ok(Self::Above100k),
            other => Err(crate::CommerceError::Validation(format!(
                "unknown price range '{other}'"
            ))),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SortKey {
    PriceAsc,
    PriceDesc,
    /// Creation time, most recent first.
    Newest,
}

impl std::str::FromStr for SortKey {
    type Err = crate::CommerceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "price-asc" => Ok(Self::PriceAsc),
            "price-desc" => Ok(Self::PriceDesc),
            "newest" => Ok(Self::Newest),
            other => Err(crate::CommerceError::Validation(format!(
                "unknown sort key '{other}'"
            ))),
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct CatalogFilter {
    pub category: Option<Category>,
    pub price: Option<PriceRange>,
    pub sort: Option<SortKey>,
}

/// Applies filters then the requested sort. Unfiltered, unsorted calls
/// return the projection order unchanged.
pub fn apply(items: Vec<CatalogItem>, filter: &CatalogFilter) -> Vec<CatalogItem> {
    let mut items: Vec<CatalogItem> = items
        .into_iter()
        .filter(|item| {
            filter
                .category
                .map_or(true, |c| item.category == c.as_str())
                && filter.price.map_or(true, |r| r.contains(item.price))
        })
        .collect();
    match filter.sort {
        Some(SortKey::PriceAsc) => items.sort_by_key(|i| i.price),
        Some(SortKey::PriceDesc) => items.sort_by_key(|i| std::cmp::Reverse(i.price)),
        Some(SortKey::Newest) => items.sort_by_key(|i| std::cmp::Reverse(i.created_at)),
        None => {}
    }
    items
}

#[cfg(test)]
mod tests {
    use super::*;

    fn product(name: &str, price: i64, category: &str) -> ProductRecord {
        ProductRecord {
            id: Uuid::now_v7(),
            name: name.into(),
            price,
            image: String::new(),
            category: category.into(),
            description: None,
            stock: 5,
            created_at: Utc::now(),
        }
    }

    fn model(name: &str, price: i64) -> ModelRecord {
        ModelRecord {
            id: Uuid::now_v7(),
            name: name.into(),
            price,
            image: String::new(),
            description: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_projection_merges_both_collections() {
        let products = vec![
            product("Chemise", 5000, "Vêtements"),
            product("Montre", 4000, "Accessoires"),
        ];
        let models = vec![model("Boubou brodé", 45000)];
        let items = project(&products, &models);
        assert_eq!(items.len(), products.len() + models.len());
        assert!(items.iter().filter(|i| i.is_model).all(|i| {
            i.category == "Couture" && i.stock.is_none()
        }));
    }

    #[test]
    fn test_category_filter() {
        let items = project(
            &[
                product("Chemise", 5000, "Vêtements"),
                product("Sneakers", 10000, "Chaussures"),
            ],
            &[model("Tailleur", 60000)],
        );
        let filter = CatalogFilter {
            category: Some(Category::Couture),
            ..Default::default()
        };
        let filtered = apply(items, &filter);
        assert_eq!(filtered.len(), 1);
        assert!(filtered[0].is_model);
    }

    #[test]
    fn test_price_buckets_are_inclusive() {
        assert!(PriceRange::UpTo20k.contains(20000));
        assert!(PriceRange::From20kTo50k.contains(20000));
        assert!(PriceRange::From20kTo50k.contains(50000));
        assert!(!PriceRange::From20kTo50k.contains(50001));
        assert!(PriceRange::Above100k.contains(100000));
        assert!(!PriceRange::Above100k.contains(99999));
    }

    #[test]
    fn test_price_sort() {
        let items = project(
            &[
                product("A", 35000, "Vêtements"),
                product("B", 15000, "Vêtements"),
                product("C", 7000, "Vêtements"),
            ],
            &[],
        );
        let asc = apply(
            items.clone(),
            &CatalogFilter {
                sort: Some(SortKey::PriceAsc),
                ..Default::default()
            },
        );
        let prices: Vec<i64> = asc.iter().map(|i| i.price).collect();
        assert_eq!(prices, vec![7000, 15000, 35000]);

        let desc = apply(
            items,
            &CatalogFilter {
                sort: Some(SortKey::PriceDesc),
                ..Default::default()
            },
        );
        let prices: Vec<i64> = desc.iter().map(|i| i.price).collect();
        assert_eq!(prices, vec![35000, 15000, 7000]);
    }

    #[test]
    fn test_unfiltered_preserves_source_order() {
        let products = vec![
            product("Z", 1000, "Vêtements"),
            product("A", 2000, "Vêtements"),
        ];
        let items = apply(project(&products, &[]), &CatalogFilter::default());
        assert_eq!(items[0].name, "Z");
        assert_eq!(items[1].name, "A");
    }
}
