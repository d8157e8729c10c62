//! Shared application state for all routes.

use crate::store::BookingStore;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn BookingStore>,
}

impl AppState {
    pub fn new<S: BookingStore + 'static>(store: S) -> Self {
        AppState {
            store: Arc::new(store),
        }
    }
}
