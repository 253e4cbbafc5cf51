// Loader plumbing shared by both cache variants.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use futures::future::BoxFuture;
use tokio_util::sync::CancellationToken;

/// Result of one loader invocation: the value and an optional TTL for
/// the inserted entry.
pub type LoaderResult<V> = anyhow::Result<(V, Option<Duration>)>;

/// Fallible asynchronous value producer invoked on cache misses.
/// The token carries the caller's cancellation; coalesced waiters share
/// whatever the in-flight invocation returns.
pub type Loader<K, V> =
    Arc<dyn Fn(CancellationToken, K) -> BoxFuture<'static, LoaderResult<V>> + Send + Sync>;

/// Wraps an async closure into a [`Loader`].
pub fn loader_fn<K, V, F, Fut>(f: F) -> Loader<K, V>
where
    F: Fn(CancellationToken, K) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = LoaderResult<V>> + Send + 'static,
{
    Arc::new(move |ctx, key| Box::pin(f(ctx, key)))
}

/// Errors surfaced by `get_or_load`.
#[derive(Debug, Clone, thiserror::Error)]
pub enum LoadError {
    /// `get_or_load` ran into a miss with no loader configured or passed.
    #[error("cache loader is not configured")]
    LoaderIsNil,
    /// The loader failed; the original error is preserved behind the Arc
    /// so every coalesced waiter can observe it.
    #[error("{0}")]
    Loader(Arc<anyhow::Error>),
}
