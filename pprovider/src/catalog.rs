//! Short-TTL cache for vendor model listings.
//!
//! Model sets rarely change within a process lifetime, so adapters serve a
//! cached list and refresh after the TTL lapses. The lock guards only the
//! slot; fetches happen outside it.

use std::sync::Mutex;
use std::time::{Duration, Instant};

pub const DEFAULT_MODEL_LIST_TTL: Duration = Duration::from_secs(300);

pub struct ModelListCache {
    ttl: Duration,
    slot: Mutex<Option<(Instant, Vec<String>)>>,
}

impl Default for ModelListCache {
    fn default() -> Self {
        Self::new(DEFAULT_MODEL_LIST_TTL)
    }
}

impl ModelListCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            slot: Mutex::new(None),
        }
    }

    /// Returns the cached listing while it is fresh. A poisoned lock reads
    /// as a miss; the caller refetches.
    pub fn cached(&self) -> Option<Vec<String>> {
        let slot = self.slot.lock().ok()?;
        match slot.as_ref() {
            Some((stored_at, models)) if stored_at.elapsed() < self.ttl => Some(models.clone()),
            _ => None,
        }
    }

    pub fn store(&self, models: Vec<String>) {
        if let Ok(mut slot) = self.slot.lock() {
            *slot = Some((Instant::now(), models));
        }
    }

    pub fn invalidate(&self) {
        if let Ok(mut slot) = self.slot.lock() {
            *slot = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_cache_misses() {
        let cache = ModelListCache::default();
        assert_eq!(cache.cached(), None);
    }

    #[test]
    fn stored_listing_is_served_until_invalidated() {
        let cache = ModelListCache::new(Duration::from_secs(60));
        cache.store(vec!["model-a".to_string()]);

        assert_eq!(cache.cached(), Some(vec!["model-a".to_string()]));

        cache.invalidate();
        assert_eq!(cache.cached(), None);
    }

    #[test]
    fn zero_ttl_expires_immediately() {
        let cache = ModelListCache::new(Duration::ZERO);
        cache.store(vec!["model-a".to_string()]);
        assert_eq!(cache.cached(), None);
    }
}
