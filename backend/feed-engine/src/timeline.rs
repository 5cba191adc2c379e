//! Per-user timeline store
//!
//! Each author owns an append-only arena of posts, oldest at index 0. The
//! newest-first view reads the arena backwards, so "prepend" is a plain push
//! and merge cursors can walk a timeline by index without copying it.
//!
//! Locking is scoped per author: the map shard lock is held only long enough
//! to clone the author's `Arc<Timeline>`, writes then take that timeline's own
//! write lock. Different authors never contend on a timeline lock.

use crate::domain::{Cursor, Post, PostId, SequenceKey, UserId};
use crate::error::FeedResult;
use crate::sequencer::Sequencer;
use dashmap::DashMap;
use parking_lot::RwLock;
use std::sync::Arc;
use tracing::debug;

/// One author's posts in commit order.
#[derive(Debug, Default)]
struct Timeline {
    posts: RwLock<Vec<Post>>,
}

pub struct TimelineStore {
    sequencer: Arc<Sequencer>,
    timelines: DashMap<UserId, Arc<Timeline>>,
}

impl TimelineStore {
    pub fn new(sequencer: Arc<Sequencer>) -> Self {
        Self {
            sequencer,
            timelines: DashMap::new(),
        }
    }

    fn timeline(&self, user_id: UserId) -> Option<Arc<Timeline>> {
        self.timelines.get(&user_id).map(|t| Arc::clone(t.value()))
    }

    fn timeline_or_create(&self, user_id: UserId) -> Arc<Timeline> {
        if let Some(timeline) = self.timeline(user_id) {
            return timeline;
        }
        Arc::clone(self.timelines.entry(user_id).or_default().value())
    }

    /// Append a post to `user_id`'s timeline, creating it on first post.
    ///
    /// The sequence key is drawn while the author's write lock is held, so
    /// two concurrent posts by the same author always land in key order.
    /// Readers see either the whole post or nothing.
    pub fn append_post(&self, user_id: UserId, post_id: PostId) -> FeedResult<SequenceKey> {
        let timeline = self.timeline_or_create(user_id);
        let mut posts = timeline.posts.write();
        let sequence = self.sequencer.next_sequence()?;
        posts.push(Post::new(post_id, user_id, sequence));

        debug!(
            user_id = %user_id,
            post_id = %post_id,
            sequence = sequence.value(),
            timeline_len = posts.len(),
            "Appended post to timeline"
        );
        Ok(sequence)
    }

    /// Most recent post by `user_id`, or `None` if they never posted.
    pub fn head_of(&self, user_id: UserId) -> Option<Cursor> {
        let timeline = self.timeline(user_id)?;
        let posts = timeline.posts.read();
        let position = posts.len().checked_sub(1)?;
        Some(Cursor {
            post: posts[position],
            position,
        })
    }

    /// The next-older post by the same author as `cursor`.
    pub fn next_after(&self, cursor: &Cursor) -> Option<Cursor> {
        let position = cursor.position.checked_sub(1)?;
        let timeline = self.timeline(cursor.post.author_id)?;
        let posts = timeline.posts.read();
        posts.get(position).map(|post| Cursor {
            post: *post,
            position,
        })
    }

    /// Up to `limit` posts by `user_id`, newest first.
    pub fn posts_of(&self, user_id: UserId, limit: usize) -> Vec<Post> {
        match self.timeline(user_id) {
            Some(timeline) => timeline.posts.read().iter().rev().take(limit).copied().collect(),
            None => Vec::new(),
        }
    }

    /// Number of posts authored by `user_id`.
    pub fn len(&self, user_id: UserId) -> usize {
        self.timeline(user_id)
            .map(|timeline| timeline.posts.read().len())
            .unwrap_or(0)
    }

    /// Number of authors with a timeline.
    pub fn author_count(&self) -> usize {
        self.timelines.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> TimelineStore {
        TimelineStore::new(Arc::new(Sequencer::new()))
    }

    #[test]
    fn test_unknown_user_is_empty() {
        let store = store();
        let user = UserId::new();
        assert!(store.head_of(user).is_none());
        assert!(store.posts_of(user, 10).is_empty());
        assert_eq!(store.len(user), 0);
        assert_eq!(store.author_count(), 0);
    }

    #[test]
    fn test_head_is_most_recent() {
        let store = store();
        let user = UserId::new();
        let first = PostId::new();
        let second = PostId::new();

        let k1 = store.append_post(user, first).unwrap();
        let k2 = store.append_post(user, second).unwrap();
        assert!(k2 > k1);

        let head = store.head_of(user).unwrap();
        assert_eq!(head.post.id, second);
        assert_eq!(head.post.author_id, user);
        assert_eq!(head.post.sequence, k2);
        assert_eq!(head.position, 1);
    }

    #[test]
    fn test_next_after_walks_to_oldest() {
        let store = store();
        let user = UserId::new();
        let ids: Vec<PostId> = (0..3).map(|_| PostId::new()).collect();
        for id in &ids {
            store.append_post(user, *id).unwrap();
        }

        let mut walked = Vec::new();
        let mut cursor = store.head_of(user);
        while let Some(current) = cursor {
            walked.push(current.post.id);
            cursor = store.next_after(&current);
        }

        let expected: Vec<PostId> = ids.iter().rev().copied().collect();
        assert_eq!(walked, expected);
    }

    #[test]
    fn test_timeline_strictly_descending() {
        let store = store();
        let alice = UserId::new();
        let bob = UserId::new();
        for i in 0..20 {
            let author = if i % 3 == 0 { bob } else { alice };
            store.append_post(author, PostId::new()).unwrap();
        }

        for user in [alice, bob] {
            let posts = store.posts_of(user, usize::MAX);
            assert!(posts
                .windows(2)
                .all(|pair| pair[0].sequence > pair[1].sequence));
        }
        assert_eq!(store.len(alice) + store.len(bob), 20);
        assert_eq!(store.author_count(), 2);
    }

    #[test]
    fn test_posts_of_respects_limit() {
        let store = store();
        let user = UserId::new();
        for _ in 0..5 {
            store.append_post(user, PostId::new()).unwrap();
        }
        assert_eq!(store.posts_of(user, 2).len(), 2);
        assert!(store.posts_of(user, 0).is_empty());
    }

    #[test]
    fn test_append_fails_when_sequence_exhausted() {
        let store = TimelineStore::new(Arc::new(Sequencer::starting_at(u64::MAX)));
        let user = UserId::new();
        assert!(store.append_post(user, PostId::new()).is_err());
        assert!(store.head_of(user).is_none());
    }
}
