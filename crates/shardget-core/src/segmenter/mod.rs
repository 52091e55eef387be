//! Shard planning: fixed-size, contiguous, inclusive byte ranges over
//! `[0, content_length)` and the HTTP Range math for each.

mod range;

pub use range::{plan_shards, Shard, DEFAULT_SHARD_SIZE};
