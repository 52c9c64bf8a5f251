//! Read-side views handed to the transport layer
//!
//! Variant prices in these views are effective prices, already resolved
//! against the product's base price.

use rust_decimal::Decimal;
use serde::Serialize;

use crate::models::{Category, Product, Variant};
use crate::pricing::effective_price;

/// Category as exposed to callers
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryView {
    /// Unique code, e.g. `CLOTHING`
    pub code: String,
    /// Display name
    pub name: String,
}

impl From<&Category> for CategoryView {
    fn from(category: &Category) -> Self {
        Self {
            code: category.code.clone(),
            name: category.name.clone(),
        }
    }
}

/// Variant with its effective price
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VariantView {
    /// Variant identity
    pub id: i64,
    /// Stock keeping unit
    pub sku: String,
    /// Display name
    pub name: String,
    /// Effective price: the variant's own price, or the product's when unset
    pub price: Decimal,
}

impl VariantView {
    /// Resolve a variant against its product's base price
    pub fn resolve(variant: &Variant, base_price: Decimal) -> Self {
        Self {
            id: variant.id,
            sku: variant.sku.clone(),
            name: variant.name.clone(),
            price: effective_price(variant, base_price),
        }
    }
}

/// Product with category and resolved variants
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProductView {
    /// Product identity
    pub id: i64,
    /// Unique code, e.g. `PROD001`
    pub code: String,
    /// Base price
    pub price: Decimal,
    /// Owning category
    pub category: CategoryView,
    /// Variants in identity order
    pub variants: Vec<VariantView>,
}

impl From<Product> for ProductView {
    fn from(product: Product) -> Self {
        let variants = product
            .variants
            .iter()
            .map(|variant| VariantView::resolve(variant, product.price))
            .collect();

        Self {
            id: product.id,
            category: CategoryView::from(&product.category),
            code: product.code,
            price: product.price,
            variants,
        }
    }
}

/// A page of products plus the unfiltered catalog size
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProductListing {
    /// Total catalog size, not the number of filter matches
    pub total: i64,
    /// The requested page
    pub products: Vec<ProductView>,
}

/// A page of categories plus the total number of categories
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryListing {
    /// Total number of categories
    pub total: i64,
    /// The requested page
    pub categories: Vec<CategoryView>,
}

/// Response shape for a newly created category
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CreatedCategory {
    /// Generated identity
    pub id: i64,
    /// Stored (trimmed) code
    pub code: String,
    /// Stored (trimmed) name
    pub name: String,
}

impl From<Category> for CreatedCategory {
    fn from(category: Category) -> Self {
        Self {
            id: category.id,
            code: category.code,
            name: category.name,
        }
    }
}
