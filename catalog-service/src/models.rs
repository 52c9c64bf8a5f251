//! Catalog entities as the storage layer hands them out

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Product grouping with a unique code
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "database", derive(sqlx::FromRow))]
pub struct Category {
    /// Generated identity
    pub id: i64,
    /// Unique code, e.g. `CLOTHING`
    pub code: String,
    /// Display name, e.g. `Clothing`
    pub name: String,
}

/// Purchasable variant of a product
///
/// A zero `price` means the variant has no price of its own and inherits the
/// product's price at read time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "database", derive(sqlx::FromRow))]
pub struct Variant {
    /// Generated identity
    pub id: i64,
    /// Owning product
    pub product_id: i64,
    /// Stock keeping unit
    pub sku: String,
    /// Display name
    pub name: String,
    /// Own price, zero when unset
    pub price: Decimal,
}

/// Product with its category and variants attached
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    /// Generated identity
    pub id: i64,
    /// Unique code, e.g. `PROD001`
    pub code: String,
    /// Base price
    pub price: Decimal,
    /// Category the product belongs to
    pub category: Category,
    /// Variants ordered by identity
    pub variants: Vec<Variant>,
}

/// Input for creating a category
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewCategory {
    /// Unique code
    pub code: String,
    /// Display name
    pub name: String,
}
