//! Application State

use std::sync::Arc;

use express_checkout::{ExpressCheckoutClient, MemoryRecordStore, Transport};

/// Shared application state
pub struct AppState<T> {
    /// PayPal NVP client
    pub client: Arc<ExpressCheckoutClient<T>>,

    /// Checkouts, details and payments saved by the handlers
    pub store: Arc<MemoryRecordStore>,
}

impl<T: Transport> AppState<T> {
    pub fn new(client: ExpressCheckoutClient<T>) -> Self {
        Self {
            client: Arc::new(client),
            store: Arc::new(MemoryRecordStore::new()),
        }
    }
}

// Deriving would require `T: Clone`
impl<T> Clone for AppState<T> {
    fn clone(&self) -> Self {
        Self {
            client: Arc::clone(&self.client),
            store: Arc::clone(&self.store),
        }
    }
}
