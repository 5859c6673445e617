//! In-app purchase of compute credits.
//!
//! [`IapManager`] runs a purchase end to end: platform sheet via a
//! [`PurchaseBridge`], receipt check via the [`TransactionMatcher`], credit
//! top-up via the [`CurrencyManager`], then finishing the transaction.
//!
//! [`TransactionMatcher`]: crate::receipt::TransactionMatcher
//! [`CurrencyManager`]: crate::currency::CurrencyManager

mod bridge;
mod manager;
mod products;

pub use bridge::{
    PaymentChannel, Platform, PurchaseBridge, PurchaseReceipt, RestoredTransaction, StoreProduct,
    APPLE_IAP_CHANNEL,
};
pub use manager::{generate_transaction_id, AvailableProduct, IapManager, PurchaseOutcome};
pub use products::{
    catalog_ids, find_product, format_price, recommend_for_currency, recommended_products,
    ProductInfo, PRODUCT_CATALOG,
};
