//! In-process resource cache with single-flight fetching.
//!
//! Each resource key owns a [`FetchState`]:
//!
//! - `Empty` / `Failed` entries fetch on the next request,
//! - `Loading` entries are joined rather than fetched again,
//! - `Succeeded` entries are served until they are older than the TTL.
//!
//! # Usage
//!
//! ```ignore
//! let cache: ResourceCache<String, Category> =
//!     ResourceCache::new("category", SignedDuration::from_secs(300), Arc::new(SystemClock));
//!
//! let category = cache
//!     .fetch_if_needed("pizza".to_string(), move || load_category(id))
//!     .await?;
//! ```

mod clock;
mod resource;
mod state;

pub use clock::{Clock, ManualClock, SystemClock};
pub use resource::{Fetched, ResourceCache};
pub use state::{FetchResult, FetchState};
