//! Per-entry fetch state machine.

use std::sync::Arc;

use jiff::{SignedDuration, Timestamp};

use crate::error::AppError;

/// Outcome handed to every caller of a fetch, shared between joiners.
pub type FetchResult<T> = Result<Arc<T>, Arc<AppError>>;

/// Lifecycle of one cached resource.
///
/// ```text
/// Empty ──► Loading ──► Succeeded ──(age > ttl)──► Loading
///              │
///              └──────► Failed ──(next fetch)────► Loading
/// ```
#[derive(Debug)]
pub enum FetchState<T> {
    /// Never fetched
    Empty,
    /// A fetch is in flight
    Loading,
    /// Last fetch decoded successfully at `fetched_at`
    Succeeded {
        content: Arc<T>,
        fetched_at: Timestamp,
    },
    /// Last fetch failed; the next request retries immediately
    Failed(Arc<AppError>),
}

impl<T> FetchState<T> {
    pub fn is_loading(&self) -> bool {
        matches!(self, FetchState::Loading)
    }

    pub fn content(&self) -> Option<&Arc<T>> {
        match self {
            FetchState::Succeeded { content, .. } => Some(content),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&Arc<AppError>> {
        match self {
            FetchState::Failed(error) => Some(error),
            _ => None,
        }
    }

    pub fn fetched_at(&self) -> Option<Timestamp> {
        match self {
            FetchState::Succeeded { fetched_at, .. } => Some(*fetched_at),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            FetchState::Empty => "empty",
            FetchState::Loading => "loading",
            FetchState::Succeeded { .. } => "succeeded",
            FetchState::Failed(_) => "failed",
        }
    }

    /// Whether a request arriving at `now` must move this entry into `Loading`.
    ///
    /// A `Succeeded` entry is only stale once its age strictly exceeds `ttl`.
    pub fn needs_fetch(&self, now: Timestamp, ttl: SignedDuration) -> bool {
        match self {
            FetchState::Empty | FetchState::Failed(_) => true,
            FetchState::Loading => false,
            FetchState::Succeeded { fetched_at, .. } => now.duration_since(*fetched_at) > ttl,
        }
    }

    /// Terminal outcome of this state, `None` while empty or loading.
    pub fn outcome(&self) -> Option<FetchResult<T>> {
        match self {
            FetchState::Succeeded { content, .. } => Some(Ok(Arc::clone(content))),
            FetchState::Failed(error) => Some(Err(Arc::clone(error))),
            FetchState::Empty | FetchState::Loading => None,
        }
    }
}

impl<T> Clone for FetchState<T> {
    fn clone(&self) -> Self {
        match self {
            FetchState::Empty => FetchState::Empty,
            FetchState::Loading => FetchState::Loading,
            FetchState::Succeeded {
                content,
                fetched_at,
            } => FetchState::Succeeded {
                content: Arc::clone(content),
                fetched_at: *fetched_at,
            },
            FetchState::Failed(error) => FetchState::Failed(Arc::clone(error)),
        }
    }
}

impl<T> Default for FetchState<T> {
    fn default() -> Self {
        FetchState::Empty
    }
}

/// Two failures compare equal whatever their cause.
impl<T: PartialEq> PartialEq for FetchState<T> {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (FetchState::Empty, FetchState::Empty) => true,
            (FetchState::Loading, FetchState::Loading) => true,
            (
                FetchState::Succeeded {
                    content: a,
                    fetched_at: at,
                },
                FetchState::Succeeded {
                    content: b,
                    fetched_at: bt,
                },
            ) => a == b && at == bt,
            (FetchState::Failed(_), FetchState::Failed(_)) => true,
            _ => false,
        }
    }
}
