//! Pull-based news feed composition
//!
//! Merges the newest-first timelines of everyone a user follows with a
//! bounded k-way merge: one cursor per followee sits in a max-heap keyed by
//! sequence, and only the popped cursor's author is advanced. A feed of `limit`
//! posts over `F` followees costs O(F + limit * log F) time and O(F) space;
//! no timeline is ever materialized.

use crate::domain::{Post, PostId, UserId};
use crate::graph::FollowGraph;
use crate::timeline::TimelineStore;
use std::collections::BinaryHeap;
use std::sync::Arc;
use tracing::debug;

/// Cap on up-front feed allocation for very large limits
const PREALLOCATE_MAX: usize = 64;

#[derive(Clone)]
pub struct FeedComposer {
    graph: Arc<FollowGraph>,
    timelines: Arc<TimelineStore>,
}

impl FeedComposer {
    pub fn new(graph: Arc<FollowGraph>, timelines: Arc<TimelineStore>) -> Self {
        Self { graph, timelines }
    }

    /// The `limit` most recent post ids across `user_id`'s followees,
    /// newest first.
    pub fn compose(&self, user_id: UserId, limit: usize) -> Vec<PostId> {
        self.compose_posts(user_id, limit)
            .into_iter()
            .map(|post| post.id)
            .collect()
    }

    /// Same as [`compose`](Self::compose) but returns the full post records.
    pub fn compose_posts(&self, user_id: UserId, limit: usize) -> Vec<Post> {
        if limit == 0 {
            return Vec::new();
        }

        let followees = self.graph.followees_of(user_id);
        let mut heap: BinaryHeap<_> = followees
            .iter()
            .filter_map(|followee| self.timelines.head_of(*followee))
            .collect();
        let streams = heap.len();

        let mut feed = Vec::with_capacity(limit.min(PREALLOCATE_MAX));
        while feed.len() < limit {
            let Some(cursor) = heap.pop() else {
                break;
            };
            feed.push(cursor.post);
            if let Some(next) = self.timelines.next_after(&cursor) {
                heap.push(next);
            }
        }

        debug!(
            user_id = %user_id,
            followees = followees.len(),
            streams,
            returned = feed.len(),
            "Composed feed"
        );
        feed
    }
}
