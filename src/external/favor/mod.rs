//! Favor food-delivery API: guest-token bootstrap, catalog payloads and the
//! caching client on top of them.

mod client;
mod favorites;
mod jwt;
mod token;
mod types;

pub use client::{BrowseKey, FavorClient};
pub use favorites::{FavoritesStore, MemoryFavorites};
pub use jwt::{Token, decode_expiry};
pub use token::{TokenManager, extract_token, fetch_guest_token};
pub use types::*;
