//! Cross-crate scenarios: broker → listeners → shards → publishers → broker.

pub mod e2e_digest;
