//! Materialized feed cache
//!
//! Optional fan-out layer in front of the composer: the last composed feed of
//! each user is kept until a write that could change it invalidates it.
//!
//! - post by `a` invalidates every follower of `a` (including `a`)
//! - follow / unfollow by `u` invalidates `u`
//!
//! Every user carries a generation number that each invalidation bumps. A
//! feed is stored tagged with the generation read *before* it was composed
//! and is only served while that generation is still current, so a write
//! racing a composition can never leave a stale feed servable.

use crate::config::FeedCacheConfig;
use crate::domain::{PostId, UserId};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use tracing::{debug, warn};

/// Cached feed entry
#[derive(Debug, Clone)]
pub struct CachedFeed {
    /// Post IDs in feed order
    pub post_ids: Vec<PostId>,
    /// Timestamp when feed was generated
    pub generated_at: DateTime<Utc>,
    generation: u64,
}

pub struct FeedCache {
    entries: DashMap<UserId, CachedFeed>,
    generations: DashMap<UserId, u64>,
    config: FeedCacheConfig,
}

impl FeedCache {
    pub fn new(config: FeedCacheConfig) -> Self {
        Self {
            entries: DashMap::new(),
            generations: DashMap::new(),
            config,
        }
    }

    /// Current generation of `user_id`'s feed. Read this before composing.
    pub fn generation(&self, user_id: UserId) -> u64 {
        self.generations.get(&user_id).map(|g| *g).unwrap_or(0)
    }

    /// Cached feed for `user_id`, if one is stored for the current generation.
    pub fn get(&self, user_id: UserId) -> Option<CachedFeed> {
        let current = self.generation(user_id);
        match self.entries.get(&user_id) {
            Some(entry) if entry.generation == current => {
                debug!(user_id = %user_id, "Feed cache hit");
                Some(entry.clone())
            }
            _ => {
                debug!(user_id = %user_id, "Feed cache miss");
                None
            }
        }
    }

    /// Store a feed composed at `generation`; returns true if stored.
    pub fn store(&self, user_id: UserId, generation: u64, post_ids: Vec<PostId>) -> bool {
        if generation != self.generation(user_id) {
            debug!(user_id = %user_id, generation, "Skipping cache store for stale feed");
            return false;
        }
        if self.entries.len() >= self.config.max_entries && !self.entries.contains_key(&user_id)
        {
            warn!(
                user_id = %user_id,
                max_entries = self.config.max_entries,
                "Feed cache full, not storing"
            );
            return false;
        }

        self.entries.insert(
            user_id,
            CachedFeed {
                post_ids,
                generated_at: Utc::now(),
                generation,
            },
        );
        true
    }

    /// Invalidate feed cache for a user
    pub fn invalidate(&self, user_id: UserId) {
        *self.generations.entry(user_id).or_insert(0) += 1;
        self.entries.remove(&user_id);
    }

    /// Batch invalidate feeds for multiple users; returns how many were
    /// invalidated.
    pub fn invalidate_many<I>(&self, user_ids: I) -> usize
    where
        I: IntoIterator<Item = UserId>,
    {
        let mut count = 0;
        for user_id in user_ids {
            self.invalidate(user_id);
            count += 1;
        }
        if count > 0 {
            debug!(count, "Batch invalidated feeds");
        }
        count
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cache(max_entries: usize) -> FeedCache {
        FeedCache::new(FeedCacheConfig {
            enabled: true,
            max_entries,
        })
    }

    #[test]
    fn test_store_then_get() {
        let cache = cache(10);
        let user = UserId::new();
        let feed = vec![PostId::new(), PostId::new()];

        assert!(cache.get(user).is_none());
        let generation = cache.generation(user);
        assert!(cache.store(user, generation, feed.clone()));
        assert_eq!(cache.get(user).unwrap().post_ids, feed);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_invalidate_drops_entry() {
        let cache = cache(10);
        let user = UserId::new();
        cache.store(user, 0, vec![PostId::new()]);

        cache.invalidate(user);
        assert!(cache.get(user).is_none());
        assert!(cache.is_empty());
        assert_eq!(cache.generation(user), 1);
    }

    #[test]
    fn test_store_rejected_after_concurrent_invalidation() {
        let cache = cache(10);
        let user = UserId::new();

        let generation = cache.generation(user);
        // A write lands while the feed is being composed
        cache.invalidate(user);
        assert!(!cache.store(user, generation, vec![PostId::new()]));
        assert!(cache.get(user).is_none());
    }

    #[test]
    fn test_capacity_is_enforced() {
        let cache = cache(1);
        let first = UserId::new();
        let second = UserId::new();

        assert!(cache.store(first, 0, vec![]));
        assert!(!cache.store(second, 0, vec![]));
        // Replacing an existing entry is still allowed
        assert!(cache.store(first, 0, vec![PostId::new()]));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_invalidate_many_counts() {
        let cache = cache(10);
        let users: Vec<UserId> = (0..3).map(|_| UserId::new()).collect();
        for user in &users {
            cache.store(*user, 0, vec![]);
        }
        assert_eq!(cache.invalidate_many(users.iter().copied()), 3);
        assert!(cache.is_empty());
        assert_eq!(cache.invalidate_many(Vec::new()), 0);
    }
}
