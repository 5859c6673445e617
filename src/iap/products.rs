//! Credit product catalog.

use serde::Serialize;

/// A purchasable credit pack.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductInfo {
    /// Store product identifier.
    pub product_id: &'static str,
    /// Credits granted per unit purchased.
    pub credits: u64,
    /// Display price.
    pub price: &'static str,
    /// Display title.
    pub title: &'static str,
    /// Display description.
    pub description: &'static str,
}

const DESCRIPTION: &str = "Compute credits for expanding memo capacity";

/// All credit packs, ordered by size.
pub static PRODUCT_CATALOG: [ProductInfo; 6] = [
    ProductInfo {
        product_id: "mjapp.currency.1",
        credits: 1,
        price: "¥1.00",
        title: "1 credit",
        description: DESCRIPTION,
    },
    ProductInfo {
        product_id: "mjapp.currency.6",
        credits: 6,
        price: "¥6.00",
        title: "6 credits",
        description: DESCRIPTION,
    },
    ProductInfo {
        product_id: "mjapp.currency.18",
        credits: 18,
        price: "¥18.00",
        title: "18 credits",
        description: DESCRIPTION,
    },
    ProductInfo {
        product_id: "mjapp.currency.30",
        credits: 30,
        price: "¥30.00",
        title: "30 credits",
        description: DESCRIPTION,
    },
    ProductInfo {
        product_id: "mjapp.currency.68",
        credits: 68,
        price: "¥68.00",
        title: "68 credits",
        description: DESCRIPTION,
    },
    ProductInfo {
        product_id: "mjapp.currency.128",
        credits: 128,
        price: "¥128.00",
        title: "128 credits",
        description: DESCRIPTION,
    },
];

const RECOMMENDED: [&str; 3] = ["mjapp.currency.6", "mjapp.currency.18", "mjapp.currency.30"];

/// Catalog entry for `product_id`.
#[must_use]
pub fn find_product(product_id: &str) -> Option<&'static ProductInfo> {
    PRODUCT_CATALOG.iter().find(|p| p.product_id == product_id)
}

/// Identifiers of every catalog product.
#[must_use]
pub fn catalog_ids() -> Vec<&'static str> {
    PRODUCT_CATALOG.iter().map(|p| p.product_id).collect()
}

/// Packs highlighted in the store UI.
#[must_use]
pub fn recommended_products() -> Vec<&'static ProductInfo> {
    RECOMMENDED.iter().filter_map(|id| find_product(id)).collect()
}

/// Smallest pack covering `needed` credits, or the largest pack.
#[must_use]
pub fn recommend_for_currency(needed: u64) -> &'static ProductInfo {
    PRODUCT_CATALOG
        .iter()
        .find(|p| p.credits >= needed)
        .unwrap_or(&PRODUCT_CATALOG[PRODUCT_CATALOG.len() - 1])
}

/// Display price, falling back to `¥<credits>.00`.
#[must_use]
pub fn format_price(product: &ProductInfo) -> String {
    if product.price.is_empty() {
        format!("¥{}.00", product.credits)
    } else {
        product.price.to_string()
    }
}
