//! Session preview cache with request de-duplication
//!
//! Every file name maps to at most one record. The first requester of a name
//! inserts a pending record and runs the resolver; anyone asking while it runs
//! subscribes to the same result instead of resolving again. Resolved previews
//! stay until the cache is dropped, cleared, or the name is invalidated.

use crate::resolver::{Preview, ResolvePreview};
use app_fs::FileHandle;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use futures::stream::{self, StreamExt};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast;

/// Resolutions a prefetch runs at once unless configured otherwise
pub const DEFAULT_PREFETCH_LIMIT: usize = 8;

/// Result of a preview request
#[derive(Debug, Clone)]
pub enum PreviewOutcome {
    Ready(Arc<Preview>),
    Unavailable,
}

impl PreviewOutcome {
    pub fn preview(&self) -> Option<&Arc<Preview>> {
        match self {
            PreviewOutcome::Ready(p) => Some(p),
            PreviewOutcome::Unavailable => None,
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, PreviewOutcome::Ready(_))
    }
}

enum PreviewRecord {
    Pending {
        id: u64,
        tx: broadcast::Sender<PreviewOutcome>,
    },
    Resolved(Arc<Preview>),
    Unavailable,
}

enum Role<'a> {
    Lead(PendingGuard<'a>),
    Wait(broadcast::Receiver<PreviewOutcome>),
}

/// Preview cache for one session
pub struct PreviewCache {
    records: DashMap<String, PreviewRecord>,
    resolver: Arc<dyn ResolvePreview>,
    cache_unavailable: bool,
    prefetch_limit: usize,
    next_id: AtomicU64,
    resolutions: AtomicUsize,
}

impl PreviewCache {
    /// `cache_unavailable` keeps failed lookups until invalidated; otherwise
    /// every later request runs the resolver again
    pub fn new(resolver: Arc<dyn ResolvePreview>, cache_unavailable: bool) -> Self {
        Self {
            records: DashMap::new(),
            resolver,
            cache_unavailable,
            prefetch_limit: DEFAULT_PREFETCH_LIMIT,
            next_id: AtomicU64::new(1),
            resolutions: AtomicUsize::new(0),
        }
    }

    /// Cap the number of resolutions a prefetch keeps running at once
    pub fn with_prefetch_limit(mut self, limit: usize) -> Self {
        self.prefetch_limit = limit.max(1);
        self
    }

    /// Get the preview for `file`, resolving it at most once per name
    pub async fn request(&self, file: &dyn FileHandle) -> PreviewOutcome {
        let key = file.name();

        loop {
            let role = match self.records.entry(key.to_string()) {
                Entry::Occupied(occupied) => match occupied.get() {
                    PreviewRecord::Resolved(preview) => return PreviewOutcome::Ready(preview.clone()),
                    PreviewRecord::Unavailable => return PreviewOutcome::Unavailable,
                    PreviewRecord::Pending { tx, .. } => Role::Wait(tx.subscribe()),
                },
                Entry::Vacant(vacant) => {
                    let id = self.next_id.fetch_add(1, Ordering::Relaxed);
                    let (tx, _) = broadcast::channel(1);
                    vacant.insert(PreviewRecord::Pending { id, tx: tx.clone() });
                    Role::Lead(PendingGuard {
                        cache: self,
                        key: key.to_string(),
                        id,
                        tx: Some(tx),
                    })
                }
            };

            match role {
                Role::Wait(mut rx) => match rx.recv().await {
                    Ok(outcome) => return outcome,
                    Err(_) => {
                        // The resolving request was dropped before it finished
                        tracing::debug!("Pending preview for {} abandoned, retrying", key);
                        continue;
                    }
                },
                Role::Lead(guard) => {
                    self.resolutions.fetch_add(1, Ordering::Relaxed);
                    let outcome = match self.resolver.resolve(file).await {
                        Some(preview) => PreviewOutcome::Ready(Arc::new(preview)),
                        None => PreviewOutcome::Unavailable,
                    };
                    guard.complete(outcome.clone());
                    return outcome;
                }
            }
        }
    }

    /// Request previews for many files, at most `prefetch_limit` at a time.
    /// Outcomes come back in the order of `files`.
    pub async fn prefetch(&self, files: &[Arc<dyn FileHandle>]) -> Vec<PreviewOutcome> {
        stream::iter(files)
            .map(|f| self.request(f.as_ref()))
            .buffered(self.prefetch_limit)
            .collect()
            .await
    }

    /// Finished outcome for `name`, without waiting or resolving
    pub fn peek(&self, name: &str) -> Option<PreviewOutcome> {
        match self.records.get(name)?.value() {
            PreviewRecord::Resolved(preview) => Some(PreviewOutcome::Ready(preview.clone())),
            PreviewRecord::Unavailable => Some(PreviewOutcome::Unavailable),
            PreviewRecord::Pending { .. } => None,
        }
    }

    /// Forget whatever is known about `name`. A resolution already running
    /// still answers its waiters but is not stored.
    pub fn invalidate(&self, name: &str) {
        self.records.remove(name);
    }

    /// Forget everything
    pub fn clear(&self) {
        self.records.clear();
    }

    /// Get cache statistics
    pub fn stats(&self) -> CacheStats {
        let mut stats = CacheStats {
            resolutions: self.resolutions.load(Ordering::Relaxed),
            ..Default::default()
        };

        for record in self.records.iter() {
            match record.value() {
                PreviewRecord::Pending { .. } => stats.pending += 1,
                PreviewRecord::Resolved(preview) => {
                    stats.resolved += 1;
                    stats.bytes += preview.len();
                }
                PreviewRecord::Unavailable => stats.unavailable += 1,
            }
        }

        stats
    }
}

/// Owns a pending record until it is completed. Dropping it unfinished removes
/// the record and closes the channel, so waiters retry instead of hanging.
struct PendingGuard<'a> {
    cache: &'a PreviewCache,
    key: String,
    id: u64,
    tx: Option<broadcast::Sender<PreviewOutcome>>,
}

impl PendingGuard<'_> {
    fn is_ours(&self, record: &PreviewRecord) -> bool {
        matches!(record, PreviewRecord::Pending { id, .. } if *id == self.id)
    }

    fn complete(mut self, outcome: PreviewOutcome) {
        let replacement = match &outcome {
            PreviewOutcome::Ready(preview) => Some(PreviewRecord::Resolved(preview.clone())),
            PreviewOutcome::Unavailable if self.cache.cache_unavailable => Some(PreviewRecord::Unavailable),
            PreviewOutcome::Unavailable => None,
        };

        match replacement {
            Some(record) => {
                if let Some(mut current) = self.cache.records.get_mut(&self.key) {
                    if self.is_ours(&current) {
                        *current = record;
                    }
                }
            }
            None => {
                self.cache.records.remove_if(&self.key, |_, r| self.is_ours(r));
            }
        }

        if let Some(tx) = self.tx.take() {
            // No receivers is fine
            let _ = tx.send(outcome);
        }
    }
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        if self.tx.is_some() {
            self.cache.records.remove_if(&self.key, |_, r| self.is_ours(r));
        }
    }
}

/// Cache statistics
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub resolved: usize,
    pub unavailable: usize,
    pub pending: usize,
    pub bytes: usize,
    /// Resolver runs started since the cache was created
    pub resolutions: usize,
}

/// Liveness flag held by a consumer that is waiting for a preview.
///
/// The cache never cancels work; a consumer that stops caring cancels its
/// interest and drops results that arrive afterwards.
#[derive(Debug, Clone)]
pub struct Interest(Arc<AtomicBool>);

impl Interest {
    pub fn new() -> Self {
        Self(Arc::new(AtomicBool::new(true)))
    }

    pub fn is_alive(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    pub fn cancel(&self) {
        self.0.store(false, Ordering::Release);
    }

    /// Pass `value` through only while still interested
    pub fn deliver<T>(&self, value: T) -> Option<T> {
        self.is_alive().then_some(value)
    }
}

impl Default for Interest {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::PreviewSource;
    use app_fs::MemoryFolder;
    use async_trait::async_trait;

    /// Resolver that yields a few times before answering and counts its runs
    struct SlowResolver {
        calls: AtomicUsize,
        succeed: bool,
    }

    impl SlowResolver {
        fn new(succeed: bool) -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                succeed,
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ResolvePreview for SlowResolver {
        async fn resolve(&self, file: &dyn FileHandle) -> Option<Preview> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            for _ in 0..5 {
                tokio::task::yield_now().await;
            }
            self.succeed
                .then(|| Preview::new(file.name(), "image/jpeg", PreviewSource::EmbeddedJpeg, vec![0xFF, 0xD8]))
        }
    }

    #[tokio::test]
    async fn test_concurrent_requests_share_one_resolution() {
        let folder = MemoryFolder::new("/photos");
        let file = folder.add_file("a.nef", vec![0u8; 10]);
        let resolver = SlowResolver::new(true);
        let cache = PreviewCache::new(resolver.clone(), true);

        let outcomes = futures::future::join_all((0..100).map(|_| cache.request(file.as_ref()))).await;

        assert_eq!(resolver.calls(), 1);
        let first = outcomes[0].preview().unwrap().clone();
        assert!(outcomes.iter().all(|o| Arc::ptr_eq(o.preview().unwrap(), &first)));

        // Later requests hit the stored record
        let again = cache.request(file.as_ref()).await;
        assert!(Arc::ptr_eq(again.preview().unwrap(), &first));
        assert_eq!(resolver.calls(), 1);
    }

    #[tokio::test]
    async fn test_distinct_keys_resolve_independently() {
        let folder = MemoryFolder::new("/photos");
        let files: Vec<Arc<dyn FileHandle>> = (0..10)
            .map(|i| folder.add_file(&format!("IMG_{i}.cr2"), vec![0u8; 4]) as Arc<dyn FileHandle>)
            .collect();
        let resolver = SlowResolver::new(true);
        let cache = PreviewCache::new(resolver.clone(), true);

        let mut doubled = files.clone();
        doubled.extend(files.iter().cloned());
        let outcomes = cache.prefetch(&doubled).await;

        assert_eq!(outcomes.len(), 20);
        assert!(outcomes.iter().all(PreviewOutcome::is_ready));
        assert_eq!(resolver.calls(), 10);
        assert_eq!(cache.stats().resolved, 10);
        assert_eq!(cache.stats().resolutions, 10);
    }

    /// Resolver that tracks how many of its runs overlap
    #[derive(Default)]
    struct GaugeResolver {
        running: AtomicUsize,
        peak: AtomicUsize,
    }

    #[async_trait]
    impl ResolvePreview for GaugeResolver {
        async fn resolve(&self, file: &dyn FileHandle) -> Option<Preview> {
            let now = self.running.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            for _ in 0..3 {
                tokio::task::yield_now().await;
            }
            self.running.fetch_sub(1, Ordering::SeqCst);
            Some(Preview::new(file.name(), "image/jpeg", PreviewSource::EmbeddedJpeg, vec![0xFF, 0xD8]))
        }
    }

    #[tokio::test]
    async fn test_prefetch_bounds_concurrent_resolutions() {
        let folder = MemoryFolder::new("/photos");
        let files: Vec<Arc<dyn FileHandle>> = (0..500)
            .map(|i| folder.add_file(&format!("DSC_{i:04}.ARW"), vec![0u8; 4]) as Arc<dyn FileHandle>)
            .collect();
        let resolver = Arc::new(GaugeResolver::default());
        let cache = PreviewCache::new(resolver.clone(), true).with_prefetch_limit(4);

        let outcomes = cache.prefetch(&files).await;

        assert_eq!(outcomes.len(), 500);
        assert_eq!(outcomes[123].preview().unwrap().name(), "DSC_0123.ARW");
        assert!(outcomes.iter().all(PreviewOutcome::is_ready));
        assert_eq!(resolver.peak.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn test_unavailable_is_shared_and_cached() {
        let folder = MemoryFolder::new("/photos");
        let file = folder.add_file("broken.arw", vec![0u8; 10]);
        let resolver = SlowResolver::new(false);
        let cache = PreviewCache::new(resolver.clone(), true);

        let outcomes = futures::future::join_all((0..5).map(|_| cache.request(file.as_ref()))).await;
        assert!(outcomes.iter().all(|o| !o.is_ready()));
        assert_eq!(resolver.calls(), 1);

        assert!(matches!(cache.peek("broken.arw"), Some(PreviewOutcome::Unavailable)));
        cache.request(file.as_ref()).await;
        assert_eq!(resolver.calls(), 1);

        cache.invalidate("broken.arw");
        cache.request(file.as_ref()).await;
        assert_eq!(resolver.calls(), 2);
    }

    #[tokio::test]
    async fn test_unavailable_retried_when_not_cached() {
        let folder = MemoryFolder::new("/photos");
        let file = folder.add_file("broken.arw", vec![0u8; 10]);
        let resolver = SlowResolver::new(false);
        let cache = PreviewCache::new(resolver.clone(), false);

        let outcomes = futures::future::join_all((0..5).map(|_| cache.request(file.as_ref()))).await;
        assert!(outcomes.iter().all(|o| !o.is_ready()));
        assert_eq!(resolver.calls(), 1);
        assert!(cache.peek("broken.arw").is_none());

        cache.request(file.as_ref()).await;
        assert_eq!(resolver.calls(), 2);
    }

    #[tokio::test]
    async fn test_dropped_request_does_not_leave_pending_record() {
        let folder = MemoryFolder::new("/photos");
        let file = folder.add_file("a.dng", vec![0u8; 10]);
        let resolver = SlowResolver::new(true);
        let cache = PreviewCache::new(resolver.clone(), true);

        let mut leader = Box::pin(cache.request(file.as_ref()));
        assert!(futures::poll!(&mut leader).is_pending());
        assert_eq!(cache.stats().pending, 1);

        let mut waiter = Box::pin(cache.request(file.as_ref()));
        assert!(futures::poll!(&mut waiter).is_pending());

        drop(leader);
        assert_eq!(cache.stats().pending, 0);

        // The waiter takes over the resolution
        assert!(waiter.await.is_ready());
        assert_eq!(resolver.calls(), 2);
        assert_eq!(cache.stats().resolved, 1);
    }

    #[tokio::test]
    async fn test_invalidate_while_pending_is_not_resurrected() {
        let folder = MemoryFolder::new("/photos");
        let file = folder.add_file("a.dng", vec![0u8; 10]);
        let resolver = SlowResolver::new(true);
        let cache = PreviewCache::new(resolver.clone(), true);

        let mut leader = Box::pin(cache.request(file.as_ref()));
        assert!(futures::poll!(&mut leader).is_pending());
        cache.invalidate("a.dng");

        assert!(leader.await.is_ready());
        assert!(cache.peek("a.dng").is_none());
    }

    #[tokio::test]
    async fn test_clear_releases_previews() {
        let folder = MemoryFolder::new("/photos");
        let file = folder.add_file("a.jpg", vec![1, 2, 3]);
        let cache = PreviewCache::new(SlowResolver::new(true), true);

        cache.request(file.as_ref()).await;
        assert_eq!(cache.stats().bytes, 2);

        cache.clear();
        assert_eq!(cache.stats(), CacheStats { resolutions: 1, ..Default::default() });
    }

    #[test]
    fn test_interest() {
        let interest = Interest::new();
        let held_by_task = interest.clone();
        assert_eq!(held_by_task.deliver(7), Some(7));

        interest.cancel();
        assert!(!held_by_task.is_alive());
        assert_eq!(held_by_task.deliver(7), None);
    }
}
