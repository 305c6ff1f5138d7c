use thiserror::Error;

/// Errors raised while building or looking up rate limiters
///
/// Running out of permits is not an error: `acquire` and `wait_for_token`
/// report that as `false`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RateLimitError {
    #[error("Unknown rate limiter strategy: {0}")]
    UnknownStrategy(String),

    #[error("Invalid rate limiter configuration: {0}")]
    InvalidConfig(String),

    #[error("Rate limiter not found: {0}")]
    LimiterNotFound(String),
}

/// Result type for rate limiting operations
pub type Result<T> = std::result::Result<T, RateLimitError>;
