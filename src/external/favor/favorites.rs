use std::sync::RwLock;

use crate::external::favor::types::Merchant;

/// A user's favorite merchants, identified by merchant id.
///
/// The API client never touches this; it is the seam a front end persists
/// through.
pub trait FavoritesStore: Send + Sync {
    /// Returns false when the merchant was already a favorite.
    fn add(&self, merchant: Merchant) -> bool;
    /// Returns false when the merchant was not a favorite.
    fn remove(&self, merchant_id: u64) -> bool;
    fn contains(&self, merchant_id: u64) -> bool;
    fn list(&self) -> Vec<Merchant>;
}

/// In-memory store kept sorted by merchant name.
#[derive(Debug, Default)]
pub struct MemoryFavorites {
    merchants: RwLock<Vec<Merchant>>,
}

impl MemoryFavorites {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_merchants(merchants: impl IntoIterator<Item = Merchant>) -> Self {
        let store = Self::new();
        for merchant in merchants {
            store.add(merchant);
        }
        store
    }
}

impl FavoritesStore for MemoryFavorites {
    fn add(&self, merchant: Merchant) -> bool {
        let mut merchants = self.merchants.write().unwrap_or_else(|e| e.into_inner());
        if merchants.iter().any(|m| m.id == merchant.id) {
            return false;
        }
        tracing::debug!(merchant_id = merchant.id, name = %merchant.name, "favorite added");
        let at = merchants.partition_point(|m| m.name <= merchant.name);
        merchants.insert(at, merchant);
        true
    }

    fn remove(&self, merchant_id: u64) -> bool {
        let mut merchants = self.merchants.write().unwrap_or_else(|e| e.into_inner());
        let before = merchants.len();
        merchants.retain(|m| m.id != merchant_id);
        let removed = merchants.len() != before;
        if removed {
            tracing::debug!(merchant_id, "favorite removed");
        }
        removed
    }

    fn contains(&self, merchant_id: u64) -> bool {
        self.merchants
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .any(|m| m.id == merchant_id)
    }

    fn list(&self) -> Vec<Merchant> {
        self.merchants
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}
