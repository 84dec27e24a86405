use crate::core::errors::FetchError;
use crate::core::key::QueueKey;
use async_trait::async_trait;
use std::future::Future;
use std::marker::PhantomData;
use std::sync::Arc;

/// Per-key asynchronous fetch supplied by the caller.
///
/// Typically wraps one REST call. Errors are absorbed by the coordinator and
/// never retried.
#[async_trait]
pub trait Fetcher<K: QueueKey, V>: Send + Sync + 'static {
    async fn fetch(&self, key: &K) -> Result<V, FetchError>;

    /// Value stored for `key` when its fetch fails, e.g. an empty list
    fn fallback(&self, _key: &K, _error: &FetchError) -> Option<V> {
        None
    }
}

#[async_trait]
impl<K, V, T> Fetcher<K, V> for Arc<T>
where
    K: QueueKey,
    V: Send + 'static,
    T: Fetcher<K, V> + ?Sized,
{
    async fn fetch(&self, key: &K) -> Result<V, FetchError> {
        (**self).fetch(key).await
    }

    fn fallback(&self, key: &K, error: &FetchError) -> Option<V> {
        (**self).fallback(key, error)
    }
}

type FallbackFn<K, V> = Box<dyn Fn(&K, &FetchError) -> Option<V> + Send + Sync>;

/// Adapts an async closure into a [`Fetcher`]
pub struct FnFetcher<K, V, F> {
    f: F,
    fallback: Option<FallbackFn<K, V>>,
    _marker: PhantomData<fn(K) -> V>,
}

/// Build a fetcher from `|key| async move { ... }`
pub fn fetch_fn<K, V, F, Fut>(f: F) -> FnFetcher<K, V, F>
where
    F: Fn(K) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<V, FetchError>> + Send + 'static,
{
    FnFetcher {
        f,
        fallback: None,
        _marker: PhantomData,
    }
}

impl<K, V, F> FnFetcher<K, V, F> {
    pub fn with_fallback(
        mut self,
        fallback: impl Fn(&K, &FetchError) -> Option<V> + Send + Sync + 'static,
    ) -> Self {
        self.fallback = Some(Box::new(fallback));
        self
    }
}

#[async_trait]
impl<K, V, F, Fut> Fetcher<K, V> for FnFetcher<K, V, F>
where
    K: QueueKey,
    V: Send + 'static,
    F: Fn(K) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<V, FetchError>> + Send + 'static,
{
    async fn fetch(&self, key: &K) -> Result<V, FetchError> {
        (self.f)(key.clone()).await
    }

    fn fallback(&self, key: &K, error: &FetchError) -> Option<V> {
        self.fallback.as_ref().and_then(|f| f(key, error))
    }
}
