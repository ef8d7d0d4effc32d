//! # Domain Errors
//!
//! Error kinds of the digest service and their fatality.
//!
//! | Kind | Fatal | Meaning |
//! |------|-------|---------|
//! | `Config` | yes | Invalid deployment configuration |
//! | `Invariant` | yes | Routing table does not match the shard count |
//! | `Serialization` | yes | Outbound digest could not be encoded (bug) |
//! | `Decode` | yes | Malformed inbound payload under the fatal policy |
//! | `Broker` | no | Transport failure, logged and dropped |
//! | `QueueClosed` | no | Downstream queue closed during shutdown |

use shared_bus::BrokerError;
use thiserror::Error;

/// Errors raised by digest service tasks.
#[derive(Debug, Error)]
pub enum DigestError {
    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// An internal invariant was violated.
    #[error("Invariant violated: {0}")]
    Invariant(String),

    /// Encoding an outbound message failed.
    #[error("Serialization failed: {0}")]
    Serialization(#[source] serde_json::Error),

    /// Inbound payload could not be decoded.
    #[error("Malformed payload on topic {topic}: {source}")]
    Decode {
        /// Topic the payload arrived on.
        topic: String,
        /// Decoder error.
        #[source]
        source: serde_json::Error,
    },

    /// Broker transport failure.
    #[error("Broker error: {0}")]
    Broker(#[from] BrokerError),

    /// A downstream queue was closed.
    #[error("Queue closed: {0}")]
    QueueClosed(&'static str),
}

impl DigestError {
    /// Whether a supervisor must abort the process on this error.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::Config(_) | Self::Invariant(_) | Self::Serialization(_) | Self::Decode { .. }
        )
    }
}

/// Configuration validation errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A count or capacity that must be positive was zero.
    #[error("{0} must be greater than zero")]
    Zero(&'static str),

    /// The configuration sources could not be read or did not match the
    /// expected shape.
    #[error("Could not load configuration: {0}")]
    Load(String),
}
