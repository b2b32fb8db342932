//! Response cache - memoized analysis results
//!
//! Keyed by normalized input text, the user-preference fingerprint, and
//! the calendar day (so date-relative phrasing like "tomorrow" never
//! crosses days). Bounded LRU; at most one computation is in flight per
//! key - concurrent callers with the same key await the same cell.
//! Failed computations are not cached.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::OnceCell;
use tracing::debug;

use crate::analyzer::PlanContext;
use crate::draft::StructuredPlanDraft;
use crate::error::EngineError;

type Cell = Arc<OnceCell<StructuredPlanDraft>>;

#[derive(Default)]
struct Inner {
    entries: HashMap<String, Cell>,
    /// LRU order, front = least recently used
    order: VecDeque<String>,
}

/// Bounded LRU cache over analysis results
pub struct ResponseCache {
    capacity: usize,
    inner: Mutex<Inner>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl ResponseCache {
    /// Create a cache holding at most `capacity` entries
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            inner: Mutex::new(Inner::default()),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Build the cache key for an analysis request
    ///
    /// Lowercased, whitespace-collapsed text + preference fingerprint +
    /// calendar day.
    pub fn key(text: &str, context: &PlanContext) -> String {
        let normalized = text.to_lowercase().split_whitespace().collect::<Vec<_>>().join(" ");
        format!(
            "{}|{}|{}",
            normalized,
            context.preference_fingerprint(),
            context.now.date()
        )
    }

    /// Return the cached draft for `key`, or run `compute` to fill it
    ///
    /// Concurrent callers with the same key share one in-flight
    /// computation. A failed computation leaves nothing cached.
    pub async fn get_or_compute<F, Fut>(&self, key: &str, compute: F) -> Result<StructuredPlanDraft, EngineError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<StructuredPlanDraft, EngineError>>,
    {
        let cell = self.cell_for(key);

        if let Some(draft) = cell.get() {
            debug!(%key, "get_or_compute: hit");
            self.hits.fetch_add(1, Ordering::Relaxed);
            return Ok(draft.clone());
        }

        let result = cell.get_or_try_init(compute).await;
        match result {
            Ok(draft) => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                Ok(draft.clone())
            }
            Err(e) => {
                // Drop the failed cell so a later call can retry cleanly
                self.evict(key);
                Err(e)
            }
        }
    }

    /// (hits, misses) since construction
    pub fn stats(&self) -> (u64, u64) {
        (self.hits.load(Ordering::Relaxed), self.misses.load(Ordering::Relaxed))
    }

    /// Number of entries currently tracked (including in-flight)
    pub fn len(&self) -> usize {
        self.inner.lock().map(|inner| inner.entries.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop everything
    pub fn clear(&self) {
        if let Ok(mut inner) = self.inner.lock() {
            inner.entries.clear();
            inner.order.clear();
        }
    }

    /// Fetch or create the cell for a key, refreshing LRU order and
    /// evicting the coldest entry when over capacity
    fn cell_for(&self, key: &str) -> Cell {
        let mut inner = match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };

        if let Some(cell) = inner.entries.get(key) {
            let cell = cell.clone();
            inner.order.retain(|k| k != key);
            inner.order.push_back(key.to_string());
            return cell;
        }

        let cell: Cell = Arc::new(OnceCell::new());
        inner.entries.insert(key.to_string(), cell.clone());
        inner.order.push_back(key.to_string());

        while inner.entries.len() > self.capacity {
            if let Some(coldest) = inner.order.pop_front() {
                debug!(key = %coldest, "cell_for: evicting LRU entry");
                inner.entries.remove(&coldest);
            } else {
                break;
            }
        }

        cell
    }

    fn evict(&self, key: &str) {
        let mut inner = match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        inner.entries.remove(key);
        inner.order.retain(|k| k != key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Priority;
    use chrono::NaiveDate;
    use std::sync::atomic::AtomicUsize;

    fn draft(title: &str) -> StructuredPlanDraft {
        StructuredPlanDraft {
            title: title.to_string(),
            estimated_total_minutes: 60,
            optimal_time: None,
            priority: Priority::Medium,
            steps: vec![],
        }
    }

    fn context_on(day: u32) -> PlanContext {
        PlanContext::new(
            7,
            NaiveDate::from_ymd_opt(2025, 3, day)
                .unwrap()
                .and_hms_opt(10, 0, 0)
                .unwrap(),
        )
    }

    #[test]
    fn test_key_normalization() {
        let ctx = context_on(13);
        let a = ResponseCache::key("  Buy   GROCERIES tomorrow ", &ctx);
        let b = ResponseCache::key("buy groceries tomorrow", &ctx);
        assert_eq!(a, b);
    }

    #[test]
    fn test_key_includes_calendar_day() {
        let a = ResponseCache::key("buy groceries tomorrow", &context_on(13));
        let b = ResponseCache::key("buy groceries tomorrow", &context_on(14));
        assert_ne!(a, b);
    }

    #[test]
    fn test_key_includes_preferences() {
        use crate::domain::TimeBlock;

        let plain = context_on(13);
        let mut prefers_morning = context_on(13);
        prefers_morning.preferred_blocks = vec![TimeBlock::Morning];

        assert_ne!(
            ResponseCache::key("same text", &plain),
            ResponseCache::key("same text", &prefers_morning)
        );
    }

    #[tokio::test]
    async fn test_second_call_is_cached() {
        let cache = ResponseCache::new(10);
        let calls = AtomicUsize::new(0);

        for _ in 0..2 {
            let result = cache
                .get_or_compute("k", || async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(draft("once"))
                })
                .await
                .unwrap();
            assert_eq!(result.title, "once");
        }

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(cache.stats(), (1, 1));
    }

    #[tokio::test]
    async fn test_concurrent_callers_share_one_computation() {
        let cache = Arc::new(ResponseCache::new(10));
        let calls = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let cache = cache.clone();
            let calls = calls.clone();
            handles.push(tokio::spawn(async move {
                cache
                    .get_or_compute("shared", move || async move {
                        calls.fetch_add(1, Ordering::SeqCst);
                        // Hold the in-flight slot long enough for all tasks to pile up
                        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
                        Ok(draft("shared"))
                    })
                    .await
                    .unwrap()
            }));
        }

        for handle in handles {
            assert_eq!(handle.await.unwrap().title, "shared");
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failed_computation_not_cached() {
        let cache = ResponseCache::new(10);

        let result = cache
            .get_or_compute("k", || async { Err(EngineError::EmptyPlan) })
            .await;
        assert!(result.is_err());
        assert!(cache.is_empty());

        // A later call computes fresh
        let result = cache.get_or_compute("k", || async { Ok(draft("fresh")) }).await.unwrap();
        assert_eq!(result.title, "fresh");
    }

    #[tokio::test]
    async fn test_lru_eviction() {
        let cache = ResponseCache::new(2);

        cache.get_or_compute("a", || async { Ok(draft("a")) }).await.unwrap();
        cache.get_or_compute("b", || async { Ok(draft("b")) }).await.unwrap();

        // Touch "a" so "b" becomes coldest
        cache.get_or_compute("a", || async { Ok(draft("never")) }).await.unwrap();

        cache.get_or_compute("c", || async { Ok(draft("c")) }).await.unwrap();
        assert_eq!(cache.len(), 2);

        // "b" was evicted; recomputing it runs the closure again
        let recomputed = cache
            .get_or_compute("b", || async { Ok(draft("b2")) })
            .await
            .unwrap();
        assert_eq!(recomputed.title, "b2");

        // "a" survived eviction
        let kept = cache
            .get_or_compute("a", || async { Ok(draft("never2")) })
            .await
            .unwrap();
        assert_eq!(kept.title, "a");
    }

    #[tokio::test]
    async fn test_clear() {
        let cache = ResponseCache::new(10);
        cache.get_or_compute("a", || async { Ok(draft("a")) }).await.unwrap();
        cache.clear();
        assert!(cache.is_empty());
    }
}
