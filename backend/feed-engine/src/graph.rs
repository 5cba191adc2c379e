//! Directed follow graph
//!
//! Keeps a forward index (follower -> followees) consulted on every feed read,
//! and a reverse index (followee -> followers) used to fan out feed cache
//! invalidation. Each edge set sits behind its own lock. A follow or unfollow
//! holds the follower's forward lock across both index updates, so racing
//! mutations of one pair resolve last-write-wins with the indexes in step.
//!
//! Every user that posts or follows is given the self-edge `(u, u)`. It is
//! permanent: `unfollow(u, u)` is a no-op.

use crate::domain::UserId;
use dashmap::DashMap;
use parking_lot::RwLock;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::debug;

type EdgeSet = Arc<RwLock<HashSet<UserId>>>;

#[derive(Default)]
struct Adjacency {
    sets: DashMap<UserId, EdgeSet>,
}

impl Adjacency {
    fn get(&self, user_id: UserId) -> Option<EdgeSet> {
        self.sets.get(&user_id).map(|s| Arc::clone(s.value()))
    }

    fn get_or_create(&self, user_id: UserId) -> EdgeSet {
        if let Some(set) = self.get(user_id) {
            return set;
        }
        Arc::clone(self.sets.entry(user_id).or_default().value())
    }

    fn insert(&self, from: UserId, to: UserId) -> bool {
        self.get_or_create(from).write().insert(to)
    }

    fn remove(&self, from: UserId, to: UserId) -> bool {
        match self.get(from) {
            Some(set) => set.write().remove(&to),
            None => false,
        }
    }

    fn contains(&self, from: UserId, to: UserId) -> bool {
        self.get(from)
            .map(|set| set.read().contains(&to))
            .unwrap_or(false)
    }

    fn snapshot(&self, from: UserId) -> HashSet<UserId> {
        self.get(from)
            .map(|set| set.read().clone())
            .unwrap_or_default()
    }
}

#[derive(Default)]
pub struct FollowGraph {
    following: Adjacency,
    followers: Adjacency,
}

impl FollowGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Idempotent follow; returns true if the edge was newly added.
    ///
    /// Also establishes the follower's self-edge.
    pub fn follow(&self, follower_id: UserId, followee_id: UserId) -> bool {
        let self_added = self.ensure_self_follow(follower_id);
        let inserted = if follower_id == followee_id {
            self_added
        } else {
            self.link(follower_id, followee_id)
        };

        debug!(
            follower = %follower_id,
            followee = %followee_id,
            inserted,
            "Follow"
        );
        inserted
    }

    /// Idempotent unfollow; returns true if an edge was removed.
    ///
    /// Unfollowing yourself never removes the self-edge.
    pub fn unfollow(&self, follower_id: UserId, followee_id: UserId) -> bool {
        if follower_id == followee_id {
            debug!(user_id = %follower_id, "Ignoring self-unfollow");
            return false;
        }

        let Some(forward) = self.following.get(follower_id) else {
            return false;
        };
        // Lock order: follower's forward set, then followee's reverse set.
        let mut followees = forward.write();
        let removed = followees.remove(&followee_id);
        self.followers.remove(followee_id, follower_id);
        drop(followees);

        debug!(
            follower = %follower_id,
            followee = %followee_id,
            removed,
            "Unfollow"
        );
        removed
    }

    /// Establish `(user_id, user_id)` if missing; returns true if added.
    pub fn ensure_self_follow(&self, user_id: UserId) -> bool {
        self.link(user_id, user_id)
    }

    fn link(&self, follower_id: UserId, followee_id: UserId) -> bool {
        let forward = self.following.get_or_create(follower_id);
        let mut followees = forward.write();
        // The reverse edge lands before the forward edge becomes readable,
        // so the followee's posts already invalidate this follower's feed.
        self.followers.insert(followee_id, follower_id);
        followees.insert(followee_id)
    }

    /// Current followees of `follower_id`, including themself once they
    /// have posted or followed.
    pub fn followees_of(&self, follower_id: UserId) -> HashSet<UserId> {
        self.following.snapshot(follower_id)
    }

    /// Current followers of `followee_id`.
    pub fn followers_of(&self, followee_id: UserId) -> HashSet<UserId> {
        self.followers.snapshot(followee_id)
    }

    pub fn is_following(&self, follower_id: UserId, followee_id: UserId) -> bool {
        self.following.contains(follower_id, followee_id)
    }
}
