//! # Algorithms Module
//!
//! Shard routing.

pub mod routing;

pub use routing::{distribute, fnv1a_32, ShardIndex};
