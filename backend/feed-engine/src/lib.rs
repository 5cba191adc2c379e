//! Feed engine
//!
//! In-memory micro-blogging core: users post, follow and unfollow each other,
//! and read a news feed of the ten most recent posts from everyone they
//! follow (themselves included).
//!
//! # Architecture
//! ```text
//! post ──▶ Sequencer ──▶ TimelineStore ──┐
//!   │                                    │ head_of / next_after
//!   └──▶ FollowGraph (self-follow)       ▼
//! follow / unfollow ──▶ FollowGraph ──▶ FeedComposer (k-way merge) ──▶ get_feed
//!                                        ▲
//!                     FeedCache (optional, invalidated on writes)
//! ```
//!
//! # Guarantees
//! - Sequence keys are strictly increasing across all users
//! - Each timeline is strictly descending by sequence key
//! - A user always follows themself once they post or follow
//! - Feeds are strictly descending and contain only followees' posts
//! - No global lock: timelines and edge sets are locked per user

pub mod cache;
pub mod composer;
pub mod config;
pub mod domain;
pub mod engine;
pub mod error;
pub mod graph;
pub mod metrics;
pub mod sequencer;
pub mod telemetry;
pub mod timeline;

pub use cache::{CachedFeed, FeedCache};
pub use composer::FeedComposer;
pub use config::{AppConfig, FeedCacheConfig, FeedEngineConfig};
pub use domain::{Cursor, Post, PostId, SequenceKey, UserId};
pub use engine::{FeedEngine, DEFAULT_FEED_LIMIT};
pub use error::{FeedError, FeedResult};
pub use graph::FollowGraph;
pub use metrics::{FeedMetrics, FeedSource};
pub use sequencer::Sequencer;
pub use timeline::TimelineStore;
