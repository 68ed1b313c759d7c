//! Keyed, TTL-bounded, single-flight resource cache.

use std::fmt::Debug;
use std::future::Future;
use std::hash::Hash;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use dashmap::DashMap;
use futures::FutureExt;
use jiff::SignedDuration;
use tokio::sync::watch;

use crate::cache::clock::Clock;
use crate::cache::state::{FetchResult, FetchState};
use crate::error::AppError;
use crate::external::http::ResponseMeta;

/// A decoded payload together with the response it came from.
#[derive(Debug, Clone)]
pub struct Fetched<T> {
    pub content: T,
    pub response: ResponseMeta,
}

/// One key's state. Every transition goes through the watch sender, whose
/// internal lock makes check-and-transition atomic and notifies observers.
#[derive(Debug)]
struct CacheEntry<T> {
    state: watch::Sender<FetchState<T>>,
}

impl<T> CacheEntry<T> {
    fn new() -> Self {
        let (state, _) = watch::channel(FetchState::Empty);
        Self { state }
    }
}

/// Maps a resource key to its [`FetchState`] and decides, per request,
/// whether to serve the cached value, join an in-flight fetch, or start one.
///
/// Entries are created lazily and live as long as the cache.
pub struct ResourceCache<K, T> {
    name: &'static str,
    ttl: SignedDuration,
    clock: Arc<dyn Clock>,
    entries: DashMap<K, Arc<CacheEntry<T>>>,
}

impl<K, T> ResourceCache<K, T>
where
    K: Eq + Hash + Clone + Debug + Send + Sync + 'static,
    T: Send + Sync + 'static,
{
    pub fn new(name: &'static str, ttl: SignedDuration, clock: Arc<dyn Clock>) -> Self {
        Self {
            name,
            ttl,
            clock,
            entries: DashMap::new(),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn ttl(&self) -> SignedDuration {
        self.ttl
    }

    /// Number of keys touched so far.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Snapshot of the current state; untouched keys read as `Empty`.
    pub fn state(&self, key: &K) -> FetchState<T> {
        self.entries
            .get(key)
            .map(|entry| entry.state.borrow().clone())
            .unwrap_or_default()
    }

    /// Receiver that observes every transition of `key`'s entry.
    pub fn subscribe(&self, key: K) -> watch::Receiver<FetchState<T>> {
        self.entry(key).state.subscribe()
    }

    fn entry(&self, key: K) -> Arc<CacheEntry<T>> {
        Arc::clone(
            self.entries
                .entry(key)
                .or_insert_with(|| Arc::new(CacheEntry::new()))
                .value(),
        )
    }

    /// Returns the cached content for `key`, fetching it with `loader` only
    /// when the entry is empty, failed, or older than the TTL.
    ///
    /// Concurrent callers for the same key collapse into one `loader` call.
    /// The load runs on its own task, so a caller that stops awaiting does
    /// not cancel it for everyone else.
    pub async fn fetch_if_needed<F, Fut, E>(&self, key: K, loader: F) -> FetchResult<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Fetched<T>, E>> + Send + 'static,
        E: Into<Arc<AppError>> + Send + 'static,
    {
        let entry = self.entry(key.clone());
        let now = self.clock.now();
        let ttl = self.ttl;

        let mut previous = "";
        let mut current: Option<FetchState<T>> = None;
        let claimed = entry.state.send_if_modified(|state| {
            if state.needs_fetch(now, ttl) {
                previous = state.label();
                *state = FetchState::Loading;
                true
            } else {
                current = Some(state.clone());
                false
            }
        });

        if !claimed {
            return match current.and_then(|state| state.outcome()) {
                Some(outcome) => {
                    tracing::debug!(cache = self.name, key = ?key, "serving cached content");
                    outcome
                }
                None => {
                    tracing::debug!(cache = self.name, key = ?key, "joining in-flight fetch");
                    self.join(&entry).await
                }
            };
        }

        tracing::debug!(cache = self.name, key = ?key, from = previous, "-> loading");
        self.launch(key, entry, loader()).await
    }

    async fn join(&self, entry: &CacheEntry<T>) -> FetchResult<T> {
        let mut rx = entry.state.subscribe();
        let settled = rx
            .wait_for(|state| !state.is_loading())
            .await
            .map_err(|e| Arc::new(AppError::from(anyhow::Error::new(e))))?;
        settled.outcome().unwrap_or_else(|| {
            Err(Arc::new(AppError::from(anyhow::anyhow!(
                "cache entry settled without an outcome"
            ))))
        })
    }

    async fn launch<Fut, E>(&self, key: K, entry: Arc<CacheEntry<T>>, load: Fut) -> FetchResult<T>
    where
        Fut: Future<Output = Result<Fetched<T>, E>> + Send + 'static,
        E: Into<Arc<AppError>> + Send + 'static,
    {
        let name = self.name;
        let clock = Arc::clone(&self.clock);
        let task_entry = Arc::clone(&entry);
        let task_key = key.clone();

        let handle = tokio::spawn(async move {
            let outcome: Result<Fetched<T>, Arc<AppError>> =
                match AssertUnwindSafe(load).catch_unwind().await {
                    Ok(result) => result.map_err(Into::into),
                    Err(_) => Err(Arc::new(AppError::from(anyhow::anyhow!(
                        "fetch task panicked"
                    )))),
                };

            let result: FetchResult<T> = match outcome {
                Ok(fetched) => {
                    tracing::debug!(
                        cache = name,
                        key = ?task_key,
                        status = fetched.response.status,
                        elapsed_ms = fetched.response.elapsed.as_millis() as u64,
                        "-> succeeded"
                    );
                    Ok(Arc::new(fetched.content))
                }
                Err(error) => {
                    tracing::warn!(cache = name, key = ?task_key, error = %error, "-> failed");
                    Err(error)
                }
            };

            let fetched_at = clock.now();
            task_entry.state.send_modify(|state| {
                *state = match &result {
                    Ok(content) => FetchState::Succeeded {
                        content: Arc::clone(content),
                        fetched_at,
                    },
                    Err(error) => FetchState::Failed(Arc::clone(error)),
                };
            });
            result
        });

        match handle.await {
            Ok(result) => result,
            Err(join_error) => {
                let error = Arc::new(AppError::from(anyhow::Error::new(join_error)));
                tracing::error!(cache = name, key = ?key, error = %error, "fetch task aborted");
                entry.state.send_if_modified(|state| {
                    if state.is_loading() {
                        *state = FetchState::Failed(Arc::clone(&error));
                        true
                    } else {
                        false
                    }
                });
                Err(error)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::clock::ManualClock;
    use crate::error::AppResult;
    use jiff::Timestamp;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn meta() -> ResponseMeta {
        ResponseMeta {
            status: 200,
            elapsed: Duration::from_millis(5),
        }
    }

    fn setup() -> (ResourceCache<String, String>, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(
            Timestamp::from_second(1_700_000_000).unwrap(),
        ));
        let cache = ResourceCache::new("test", SignedDuration::from_secs(300), clock.clone());
        (cache, clock)
    }

    fn counting_loader(
        calls: &Arc<AtomicUsize>,
        value: &str,
        delay: Duration,
    ) -> impl FnOnce() -> futures::future::BoxFuture<'static, AppResult<Fetched<String>>> + use<> {
        let calls = Arc::clone(calls);
        let value = value.to_string();
        move || {
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                tokio::time::sleep(delay).await;
                Ok(Fetched {
                    content: value,
                    response: meta(),
                })
            }
            .boxed()
        }
    }

    fn failing_loader(
        calls: &Arc<AtomicUsize>,
    ) -> impl FnOnce() -> futures::future::BoxFuture<'static, AppResult<Fetched<String>>> + use<> {
        let calls = Arc::clone(calls);
        move || {
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(AppError::HttpStatus {
                    status: 502,
                    body: b"bad gateway".to_vec(),
                })
            }
            .boxed()
        }
    }

    #[tokio::test]
    async fn test_second_call_within_ttl_is_served_from_cache() {
        let (cache, clock) = setup();
        let calls = Arc::new(AtomicUsize::new(0));

        let first = cache
            .fetch_if_needed("pizza".into(), counting_loader(&calls, "v1", Duration::ZERO))
            .await
            .unwrap();
        clock.advance(SignedDuration::from_secs(299));
        let second = cache
            .fetch_if_needed("pizza".into(), counting_loader(&calls, "v2", Duration::ZERO))
            .await
            .unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(first.as_str(), "v1");
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[tokio::test]
    async fn test_stale_entry_refetches_once() {
        let (cache, clock) = setup();
        let calls = Arc::new(AtomicUsize::new(0));

        cache
            .fetch_if_needed("pizza".into(), counting_loader(&calls, "v1", Duration::ZERO))
            .await
            .unwrap();
        clock.advance(SignedDuration::from_secs(301));
        let refreshed = cache
            .fetch_if_needed("pizza".into(), counting_loader(&calls, "v2", Duration::ZERO))
            .await
            .unwrap();
        let again = cache
            .fetch_if_needed("pizza".into(), counting_loader(&calls, "v3", Duration::ZERO))
            .await
            .unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(refreshed.as_str(), "v2");
        assert_eq!(again.as_str(), "v2");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_callers_share_one_fetch() {
        let (cache, _clock) = setup();
        let cache = Arc::new(cache);
        let calls = Arc::new(AtomicUsize::new(0));

        let mut tasks = Vec::new();
        for _ in 0..16 {
            let cache = Arc::clone(&cache);
            let loader = counting_loader(&calls, "shared", Duration::from_millis(50));
            tasks.push(tokio::spawn(async move {
                cache.fetch_if_needed("burgers".into(), loader).await
            }));
        }

        let results = futures::future::join_all(tasks).await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        for result in results {
            assert_eq!(result.unwrap().unwrap().as_str(), "shared");
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_callers_observe_the_same_failure() {
        let (cache, _clock) = setup();
        let cache = Arc::new(cache);
        let calls = Arc::new(AtomicUsize::new(0));

        let slow_failure = {
            let calls = Arc::clone(&calls);
            move || {
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(50)).await;
                    Err::<Fetched<String>, _>(AppError::transport("connection reset", None))
                }
                .boxed()
            }
        };

        let leader = {
            let cache = Arc::clone(&cache);
            tokio::spawn(async move { cache.fetch_if_needed("tacos".into(), slow_failure).await })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;
        let follower = cache
            .fetch_if_needed("tacos".into(), failing_loader(&calls))
            .await;

        let leader = leader.await.unwrap().unwrap_err();
        let follower = follower.unwrap_err();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(matches!(*leader, AppError::Transport { .. }));
        assert!(Arc::ptr_eq(&leader, &follower));
    }

    #[tokio::test]
    async fn test_failure_is_recorded_and_next_call_retries() {
        let (cache, _clock) = setup();
        let calls = Arc::new(AtomicUsize::new(0));

        let err = cache
            .fetch_if_needed("sushi".into(), failing_loader(&calls))
            .await
            .unwrap_err();
        assert_eq!(err.status(), Some(502));
        assert!(cache.state(&"sushi".to_string()).error().is_some());

        let ok = cache
            .fetch_if_needed("sushi".into(), counting_loader(&calls, "fresh", Duration::ZERO))
            .await
            .unwrap();
        assert_eq!(ok.as_str(), "fresh");
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_subscriber_sees_each_transition() {
        let (cache, clock) = setup();
        let calls = Arc::new(AtomicUsize::new(0));
        let mut rx = cache.subscribe("thai".into());
        assert_eq!(*rx.borrow_and_update(), FetchState::Empty);

        let fetch = cache.fetch_if_needed(
            "thai".into(),
            counting_loader(&calls, "curry", Duration::from_millis(20)),
        );
        let observe = async {
            rx.changed().await.unwrap();
            let loading = rx.borrow_and_update().clone();
            rx.changed().await.unwrap();
            let settled = rx.borrow_and_update().clone();
            (loading, settled)
        };
        let (result, (loading, settled)) = tokio::join!(fetch, observe);

        assert_eq!(result.unwrap().as_str(), "curry");
        assert!(loading.is_loading());
        assert_eq!(settled.fetched_at(), Some(clock.now()));
        assert_eq!(settled.content().unwrap().as_str(), "curry");
    }

    #[tokio::test]
    async fn test_abandoned_caller_does_not_cancel_fetch() {
        let (cache, _clock) = setup();
        let calls = Arc::new(AtomicUsize::new(0));

        let abandoned = tokio::time::timeout(
            Duration::from_millis(5),
            cache.fetch_if_needed(
                "pho".into(),
                counting_loader(&calls, "noodles", Duration::from_millis(40)),
            ),
        )
        .await;
        assert!(abandoned.is_err());
        assert!(cache.state(&"pho".to_string()).is_loading());

        let joined = cache
            .fetch_if_needed("pho".into(), counting_loader(&calls, "other", Duration::ZERO))
            .await
            .unwrap();
        assert_eq!(joined.as_str(), "noodles");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_panicking_loader_fails_the_entry() {
        let (cache, _clock) = setup();
        let result = cache
            .fetch_if_needed("bad".into(), || {
                async move {
                    if true {
                        panic!("decoder exploded");
                    }
                    Ok::<_, AppError>(Fetched {
                        content: String::new(),
                        response: meta(),
                    })
                }
                .boxed()
            })
            .await;

        assert!(matches!(*result.unwrap_err(), AppError::Internal { .. }));
        assert!(cache.state(&"bad".to_string()).error().is_some());
    }

    #[tokio::test]
    async fn test_keys_are_independent() {
        let (cache, _clock) = setup();
        let calls = Arc::new(AtomicUsize::new(0));

        cache
            .fetch_if_needed("a".into(), counting_loader(&calls, "A", Duration::ZERO))
            .await
            .unwrap();
        cache
            .fetch_if_needed("b".into(), counting_loader(&calls, "B", Duration::ZERO))
            .await
            .unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.state(&"c".to_string()), FetchState::Empty);
        assert_eq!(cache.len(), 2);
    }
}
