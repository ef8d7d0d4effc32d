//! # Shard Routing Algorithm
//!
//! Deterministic user-to-shard assignment: `fnv1a_32(user_id) % shard_count`.
//!
//! Both inbound event types route through [`distribute`], so a user's status
//! changes and digest requests always reach the same shard worker.

use crate::domain::{ConfigError, UserId};

/// Index of a shard worker, in `0..shard_count`.
pub type ShardIndex = u32;

const FNV_OFFSET_BASIS: u32 = 0x811c_9dc5;
const FNV_PRIME: u32 = 0x0100_0193;

/// 32-bit FNV-1a hash.
#[must_use]
pub fn fnv1a_32(data: &[u8]) -> u32 {
    data.iter().fold(FNV_OFFSET_BASIS, |hash, byte| {
        (hash ^ u32::from(*byte)).wrapping_mul(FNV_PRIME)
    })
}

/// Map a user to its shard.
///
/// # Errors
///
/// `ConfigError::Zero` if `shard_count` is zero.
pub fn distribute(user_id: &UserId, shard_count: u32) -> Result<ShardIndex, ConfigError> {
    if shard_count == 0 {
        return Err(ConfigError::Zero("shard_count"));
    }
    Ok(fnv1a_32(user_id.as_str().as_bytes()) % shard_count)
}
