/// Classification for retry policy.
///
/// Used to determine how the transport layer and the aggregator should
/// respond to an error raised while querying a search provider.
///
/// # Behavior Summary
///
/// | Class | Retry this request? | Record circuit breaker failure? |
/// |-------|---------------------|--------------------------------|
/// | `Never` | No | No |
/// | `WithBackoff` | Yes, with backoff | Yes |
/// | `EmptyResult` | No | Yes (non-severe) |
/// | `CircuitOpen` | No (skip host) | No (already recorded) |
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum RetryClass {
    /// Never retry - the query is fundamentally invalid or the outcome is
    /// terminal. A 422 response lands here after being negatively cached.
    Never,

    /// Retry with exponential backoff and jitter.
    ///
    /// Used for transient errors: timeouts, HTTP 429 and 5xx responses.
    /// Each occurrence is recorded on the host's circuit breaker (severely
    /// for 429), so a host that keeps failing is eventually blocked for a
    /// cooldown period.
    WithBackoff,

    /// Treat the response as an empty result without retrying.
    ///
    /// Used for client errors other than 422/429: the query reached the
    /// provider but the provider has nothing useful to say about it.
    EmptyResult,

    /// The circuit breaker is open for this host.
    /// Skip the call until the cooldown elapses.
    CircuitOpen,
}
