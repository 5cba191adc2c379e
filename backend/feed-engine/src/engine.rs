use crate::cache::FeedCache;
use crate::composer::FeedComposer;
use crate::config::FeedEngineConfig;
use crate::domain::{Post, PostId, SequenceKey, UserId};
use crate::error::FeedResult;
use crate::graph::FollowGraph;
use crate::metrics::{FeedMetrics, FeedSource};
use crate::sequencer::Sequencer;
use crate::timeline::TimelineStore;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info};

/// Number of posts returned by [`FeedEngine::get_feed`].
pub const DEFAULT_FEED_LIMIT: usize = 10;

/// Post / follow / unfollow / feed over shared in-memory state.
///
/// Cloning is cheap and every clone sees the same users, posts and edges.
#[derive(Clone)]
pub struct FeedEngine {
    sequencer: Arc<Sequencer>,
    timelines: Arc<TimelineStore>,
    graph: Arc<FollowGraph>,
    composer: FeedComposer,
    cache: Option<Arc<FeedCache>>,
    metrics: FeedMetrics,
}

impl FeedEngine {
    pub fn new(config: &FeedEngineConfig) -> Self {
        Self::with_sequencer(config, Arc::new(Sequencer::new()))
    }

    /// Build an engine that draws keys from an existing sequencer.
    pub fn with_sequencer(config: &FeedEngineConfig, sequencer: Arc<Sequencer>) -> Self {
        let timelines = Arc::new(TimelineStore::new(Arc::clone(&sequencer)));
        let graph = Arc::new(FollowGraph::new());
        let composer = FeedComposer::new(Arc::clone(&graph), Arc::clone(&timelines));
        let cache = config
            .cache
            .enabled
            .then(|| Arc::new(FeedCache::new(config.cache.clone())));

        info!(
            cache_enabled = cache.is_some(),
            cache_max_entries = config.cache.max_entries,
            "Feed engine initialized"
        );

        Self {
            sequencer,
            timelines,
            graph,
            composer,
            cache,
            metrics: FeedMetrics::new(),
        }
    }

    /// Publish `content` as a new post by `user_id`.
    ///
    /// Content is opaque to the engine and is not retained; only the
    /// generated post id is tracked.
    pub fn post(&self, user_id: UserId, content: &str) -> FeedResult<PostId> {
        let post_id = PostId::new();
        self.publish(user_id, post_id)?;
        debug!(
            user_id = %user_id,
            post_id = %post_id,
            content_len = content.len(),
            "Posted"
        );
        Ok(post_id)
    }

    /// Record a post with a caller-chosen id.
    pub fn publish(&self, user_id: UserId, post_id: PostId) -> FeedResult<SequenceKey> {
        self.graph.ensure_self_follow(user_id);
        let sequence = self.timelines.append_post(user_id, post_id)?;
        self.metrics.record_post();

        if let Some(cache) = &self.cache {
            let invalidated = cache.invalidate_many(self.graph.followers_of(user_id));
            self.metrics.record_invalidations(invalidated);
        }
        Ok(sequence)
    }

    /// `follower_id` starts seeing `followee_id`'s posts. Idempotent.
    pub fn follow(&self, follower_id: UserId, followee_id: UserId) {
        if self.graph.follow(follower_id, followee_id) {
            self.metrics.record_follow();
            self.invalidate(follower_id);
        }
    }

    /// `follower_id` stops seeing `followee_id`'s posts. Unfollowing
    /// yourself is a no-op.
    pub fn unfollow(&self, follower_id: UserId, followee_id: UserId) {
        if self.graph.unfollow(follower_id, followee_id) {
            self.metrics.record_unfollow();
            self.invalidate(follower_id);
        }
    }

    fn invalidate(&self, user_id: UserId) {
        if let Some(cache) = &self.cache {
            cache.invalidate(user_id);
            self.metrics.record_invalidations(1);
        }
    }

    /// The ten most recent post ids from `user_id` and everyone they
    /// follow, newest first.
    pub fn get_feed(&self, user_id: UserId) -> Vec<PostId> {
        let Some(cache) = &self.cache else {
            return self.get_feed_with_limit(user_id, DEFAULT_FEED_LIMIT);
        };

        if let Some(hit) = cache.get(user_id) {
            self.metrics.record_feed(FeedSource::Cache, hit.post_ids.len());
            return hit.post_ids;
        }

        let generation = cache.generation(user_id);
        let feed = self.composer.compose(user_id, DEFAULT_FEED_LIMIT);
        cache.store(user_id, generation, feed.clone());
        self.metrics.record_feed(FeedSource::Composed, feed.len());
        feed
    }

    /// Like [`get_feed`](Self::get_feed) with an explicit window. Always
    /// composed fresh.
    pub fn get_feed_with_limit(&self, user_id: UserId, limit: usize) -> Vec<PostId> {
        let feed = self.composer.compose(user_id, limit);
        self.metrics.record_feed(FeedSource::Composed, feed.len());
        feed
    }

    /// Full post records of `user_id`'s feed, newest first.
    pub fn get_feed_posts(&self, user_id: UserId, limit: usize) -> Vec<Post> {
        self.composer.compose_posts(user_id, limit)
    }

    /// Up to `limit` of `user_id`'s own posts, newest first.
    pub fn timeline(&self, user_id: UserId, limit: usize) -> Vec<Post> {
        self.timelines.posts_of(user_id, limit)
    }

    pub fn followees_of(&self, follower_id: UserId) -> HashSet<UserId> {
        self.graph.followees_of(follower_id)
    }

    pub fn followers_of(&self, followee_id: UserId) -> HashSet<UserId> {
        self.graph.followers_of(followee_id)
    }

    pub fn is_following(&self, follower_id: UserId, followee_id: UserId) -> bool {
        self.graph.is_following(follower_id, followee_id)
    }

    /// Sequence key of the most recent post, 0 before any post.
    pub fn last_sequence(&self) -> SequenceKey {
        self.sequencer.current()
    }

    pub fn cache_enabled(&self) -> bool {
        self.cache.is_some()
    }
}

impl Default for FeedEngine {
    fn default() -> Self {
        Self::new(&FeedEngineConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FeedError;

    #[test]
    fn test_post_self_follows() {
        let engine = FeedEngine::default();
        let user = UserId::new();
        assert!(engine.followees_of(user).is_empty());

        let post_id = engine.post(user, "hello").unwrap();
        assert!(engine.is_following(user, user));
        assert_eq!(engine.get_feed(user), vec![post_id]);
    }

    #[test]
    fn test_publish_returns_increasing_keys() {
        let engine = FeedEngine::default();
        let a = UserId::new();
        let b = UserId::new();
        let k1 = engine.publish(a, PostId::new()).unwrap();
        let k2 = engine.publish(b, PostId::new()).unwrap();
        assert!(k2 > k1);
        assert_eq!(engine.last_sequence(), k2);
    }

    #[test]
    fn test_post_fails_once_sequence_exhausted() {
        let engine = FeedEngine::with_sequencer(
            &FeedEngineConfig::default(),
            Arc::new(Sequencer::starting_at(u64::MAX)),
        );
        let user = UserId::new();
        assert_eq!(engine.post(user, "late"), Err(FeedError::SequenceExhausted));
        assert!(engine.get_feed(user).is_empty());
    }

    #[test]
    fn test_cached_engine_invalidates_on_post() {
        let engine = FeedEngine::new(&FeedEngineConfig::with_cache(16));
        assert!(engine.cache_enabled());
        let reader = UserId::new();
        let author = UserId::new();
        engine.follow(reader, author);

        let first = engine.post(author, "one").unwrap();
        assert_eq!(engine.get_feed(reader), vec![first]);
        // Served from cache now; a new post must still show up
        assert_eq!(engine.get_feed(reader), vec![first]);

        let second = engine.post(author, "two").unwrap();
        assert_eq!(engine.get_feed(reader), vec![second, first]);

        engine.unfollow(reader, author);
        assert!(engine.get_feed(reader).is_empty());
    }

    #[test]
    fn test_feed_posts_carry_authors() {
        let engine = FeedEngine::default();
        let reader = UserId::new();
        let author = UserId::new();
        engine.follow(reader, author);
        engine.post(author, "a").unwrap();
        engine.post(reader, "b").unwrap();

        let posts = engine.get_feed_posts(reader, DEFAULT_FEED_LIMIT);
        assert_eq!(posts.len(), 2);
        assert_eq!(posts[0].author_id, reader);
        assert_eq!(posts[1].author_id, author);
        assert_eq!(engine.timeline(author, 10).len(), 1);
    }
}
