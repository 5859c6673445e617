//! Client event system.
//!
//! Replaces direct UI calls (toasts, navigation) with events the host
//! application can subscribe to.

use tokio::sync::broadcast;

/// Events emitted by the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientEvent {
    /// A user-facing message should be shown.
    Notice {
        /// Message text.
        message: String,
    },

    /// The session token was rejected and has been cleared.
    SessionExpired,

    /// A purchase was verified and credited.
    PurchaseCompleted {
        /// Purchased product.
        product_id: String,
        /// Credits added to the balance.
        credits: u64,
        /// Platform transaction identifier.
        transaction_id: String,
    },

    /// A purchase failed.
    PurchaseFailed {
        /// Product the purchase was for.
        product_id: String,
        /// Failure description.
        message: String,
    },

    /// Memo capacity was expanded by spending credits.
    CapacityExpanded {
        /// Number of slots added.
        amount: u64,
    },
}

/// Channel for receiving client events.
pub type ClientEventsChannel = broadcast::Receiver<ClientEvent>;

/// Sender for client events.
pub type ClientEventsSender = broadcast::Sender<ClientEvent>;

/// Create a new event channel pair.
#[must_use]
pub fn create_event_channel() -> (ClientEventsSender, ClientEventsChannel) {
    broadcast::channel(256)
}
