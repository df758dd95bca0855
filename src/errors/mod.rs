//! Error types and retry classification for the resolution engine.
//!
//! This module provides:
//! - [`ResolverError`]: The main error enum for all resolution operations
//! - [`RetryClass`]: Classification for determining retry behavior
//!
//! Nothing in this taxonomy is fatal to a caller: the aggregator degrades
//! every provider-side failure into "that provider contributed no
//! candidates" and keeps going.

mod retry;

pub use retry::RetryClass;

use thiserror::Error;

/// Errors that can occur while resolving a security name to a symbol.
///
/// Each variant is classified into a [`RetryClass`] via the
/// [`retry_class`](Self::retry_class) method, which determines how the
/// transport layer and the aggregator should handle the error.
#[derive(Error, Debug)]
pub enum ResolverError {
    /// The circuit breaker is open for this host.
    /// Skip the call until the cooldown elapses.
    #[error("Circuit open: {host}")]
    CircuitOpen {
        /// Host with an open circuit
        host: String,
    },

    /// The host rate limited the request (HTTP 429) and retries were
    /// exhausted without a successful response.
    #[error("Rate limited: {host}")]
    RateLimited {
        /// Host that rate limited the request
        host: String,
    },

    /// The request timed out at the HTTP client level.
    #[error("Timeout: {host}")]
    Timeout {
        /// Host that timed out
        host: String,
    },

    /// The provider rejected the query as unprocessable (HTTP 422).
    /// The request fingerprint is negatively cached; retrying won't help.
    #[error("Unprocessable query for {host}")]
    UnprocessableQuery {
        /// Host that rejected the query
        host: String,
    },

    /// The request fingerprint is in the negative cache from an earlier
    /// non-retryable failure. The call was skipped entirely.
    #[error("Negatively cached request for {host}")]
    NegativeCached {
        /// Host the skipped request was addressed to
        host: String,
    },

    /// The provider answered with an unexpected HTTP status.
    /// Treated as an empty result without retry.
    #[error("HTTP {status} from {host}")]
    Status {
        /// Host that answered
        host: String,
        /// The HTTP status code
        status: u16,
    },

    /// All retry attempts against a host were exhausted.
    #[error("Retries exhausted for {host}")]
    Exhausted {
        /// Host that kept failing
        host: String,
    },

    /// The provider returned a payload that could not be decoded.
    #[error("Parse error from {host}: {message}")]
    Parse {
        /// Host that returned the payload
        host: String,
        /// Description of the decode failure
        message: String,
    },

    /// A network error occurred while talking to a provider.
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
}

impl ResolverError {
    /// Returns the retry classification for this error.
    ///
    /// # Examples
    ///
    /// ```
    /// use tickerscout::errors::{ResolverError, RetryClass};
    ///
    /// let error = ResolverError::RateLimited { host: "finnhub.io".to_string() };
    /// assert_eq!(error.retry_class(), RetryClass::WithBackoff);
    ///
    /// let error = ResolverError::UnprocessableQuery { host: "finnhub.io".to_string() };
    /// assert_eq!(error.retry_class(), RetryClass::Never);
    /// ```
    pub fn retry_class(&self) -> RetryClass {
        match self {
            // Terminal - the query itself is bad or the answer is final
            Self::UnprocessableQuery { .. }
            | Self::NegativeCached { .. }
            | Self::Parse { .. }
            | Self::Exhausted { .. } => RetryClass::Never,

            // Transient - retry with backoff
            Self::RateLimited { .. } | Self::Timeout { .. } | Self::Network(_) => {
                RetryClass::WithBackoff
            }

            // Provider said "no" without saying "try again"
            Self::Status { .. } => RetryClass::EmptyResult,

            // Circuit breaker open
            Self::CircuitOpen { .. } => RetryClass::CircuitOpen,
        }
    }
}
