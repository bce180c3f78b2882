//! Error types for the DDNS system
//!
//! This module defines all error types used throughout the crate.
//!
//! Collaborators (IP resolvers, DNS providers) raise the generic
//! [`Error::Provider`] / [`Error::NotFound`] variants. The reconciler wraps
//! them into the operation-specific variants below so every logged error
//! carries the zone it concerns.

use thiserror::Error;

/// Result type alias for DDNS operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for the DDNS system
#[derive(Error, Debug)]
pub enum Error {
    /// A hostname argument could not be mapped to a zone
    #[error("Invalid hostname {host:?}: {reason}")]
    InvalidHostname {
        /// The argument as supplied
        host: String,
        /// Why it was rejected
        reason: String,
    },

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// The public IP address could not be determined
    #[error("Failed to resolve public IP via {resolver}: {message}")]
    IpResolution {
        /// Resolver name
        resolver: String,
        /// Error message
        message: String,
    },

    /// Existing records for a zone could not be listed
    #[error("Failed to list records for zone {zone}: {message}")]
    ProviderList {
        /// Zone name
        zone: String,
        /// Error message
        message: String,
    },

    /// An upsert batch for a zone was rejected
    #[error("Failed to upsert records for zone {zone}: {message}")]
    ProviderWrite {
        /// Zone name
        zone: String,
        /// Error message
        message: String,
    },

    /// Consecutive write failures went past the configured limit
    #[error("{failures} consecutive write failures (limit {limit}), last for zone {zone}")]
    WriteFailuresExceeded {
        /// Zone whose write failed last
        zone: String,
        /// Current value of the failure counter
        failures: u32,
        /// Tolerated number of consecutive failures
        limit: u32,
        /// The write failure that crossed the limit
        #[source]
        source: Box<Error>,
    },

    /// Record or zone not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Provider-specific error
    #[error("Provider error ({provider}): {message}")]
    Provider {
        /// Provider name
        provider: String,
        /// Error message
        message: String,
    },
}

impl Error {
    /// Create an invalid hostname error
    pub fn invalid_hostname(host: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidHostname {
            host: host.into(),
            reason: reason.into(),
        }
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a "not found" error
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Create a provider-specific error
    pub fn provider(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Provider {
            provider: provider.into(),
            message: message.into(),
        }
    }

    /// Whether the process must stop on this error
    ///
    /// Only a single write failure is recoverable; it is retried on the next
    /// polling cycle.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Self::ProviderWrite { .. })
    }
}
