pub mod post;

pub use post::{Cursor, Post, PostId, SequenceKey, UserId};
