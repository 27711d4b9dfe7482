//! Single-flight rotating credentials cache.
//!
//! The hot path, reading a still-fresh credential, is lock-free via
//! `arc_swap`; refreshing is serialized behind an async mutex so concurrent
//! callers that all observe a stale cache converge on one provider call
//! instead of stampeding it.

use std::sync::Arc;
use std::time::{Duration, SystemTime};

use arc_swap::ArcSwapOption;
use tokio::sync::Mutex as AsyncMutex;

use super::{CredentialsError, CredentialsProvider, ExpiringCredential, DEFAULT_ROTATION_LEAD_TIME};

pub struct RotatingCredentialsCache {
    provider: Arc<dyn CredentialsProvider>,
    lead_time: Duration,
    cached: ArcSwapOption<ExpiringCredential>,
    refresh_gate: AsyncMutex<()>,
}

impl RotatingCredentialsCache {
    pub fn new(provider: Arc<dyn CredentialsProvider>) -> Self {
        Self::with_lead_time(provider, DEFAULT_ROTATION_LEAD_TIME)
    }

    pub fn with_lead_time(provider: Arc<dyn CredentialsProvider>, lead_time: Duration) -> Self {
        Self {
            provider,
            lead_time,
            cached: ArcSwapOption::empty(),
            refresh_gate: AsyncMutex::new(()),
        }
    }

    /// A fresh credential, refreshing through the wrapped provider if the
    /// cached one is missing or within `lead_time` of expiring.
    pub async fn fetch(&self) -> Result<Arc<ExpiringCredential>, CredentialsError> {
        if let Some(cached) = self.fresh_cached() {
            return Ok(cached);
        }

        let _guard = self.refresh_gate.lock().await;

        // Another caller may have refreshed while we waited for the gate.
        if let Some(cached) = self.fresh_cached() {
            return Ok(cached);
        }

        tracing::debug!("credential cache miss or near expiry, refreshing");
        let fresh = Arc::new(self.provider.fetch().await?);
        self.cached.store(Some(fresh.clone()));
        Ok(fresh)
    }

    fn fresh_cached(&self) -> Option<Arc<ExpiringCredential>> {
        let cached = self.cached.load_full()?;
        if cached.expires_within(SystemTime::now(), self.lead_time) {
            None
        } else {
            Some(cached)
        }
    }

    pub fn invalidate(&self) {
        self.cached.store(None);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credentials::Credential;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingProvider {
        calls: AtomicUsize,
        ttl: Duration,
    }

    #[async_trait]
    impl CredentialsProvider for CountingProvider {
        async fn fetch(&self) -> Result<ExpiringCredential, CredentialsError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(ExpiringCredential::new(
                Credential::new(format!("AKID{n}"), "secret", None),
                SystemTime::now() + self.ttl,
            ))
        }
    }

    #[tokio::test]
    async fn reuses_cache_until_lead_time() {
        let provider = Arc::new(CountingProvider {
            calls: AtomicUsize::new(0),
            ttl: Duration::from_secs(3600),
        });
        let cache = RotatingCredentialsCache::new(provider.clone());

        let first = cache.fetch().await.unwrap();
        let second = cache.fetch().await.unwrap();
        assert_eq!(first.credential.access_key_id, second.credential.access_key_id);
        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn refreshes_once_past_lead_time() {
        let provider = Arc::new(CountingProvider {
            calls: AtomicUsize::new(0),
            ttl: Duration::from_secs(0),
        });
        let cache = RotatingCredentialsCache::with_lead_time(provider.clone(), Duration::from_secs(60));

        let first = cache.fetch().await.unwrap();
        let second = cache.fetch().await.unwrap();
        assert_ne!(first.credential.access_key_id, second.credential.access_key_id);
        assert_eq!(provider.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn invalidate_forces_a_refresh() {
        let provider = Arc::new(CountingProvider {
            calls: AtomicUsize::new(0),
            ttl: Duration::from_secs(3600),
        });
        let cache = RotatingCredentialsCache::new(provider.clone());
        cache.fetch().await.unwrap();
        cache.invalidate();
        cache.fetch().await.unwrap();
        assert_eq!(provider.calls.load(Ordering::SeqCst), 2);
    }
}
