//! Pipeline configuration constants

use std::time::Duration;

/// Maximum attempts for a single outbound network call (initial call plus
/// retries). Five attempts with 1-60s jittered backoff rides out transient
/// rate-limit windows without stalling a batch for long on a dead endpoint.
pub const MAX_ATTEMPTS: u32 = 5;

/// Minimum backoff between retry attempts.
pub const MIN_BACKOFF: Duration = Duration::from_secs(1);

/// Maximum backoff between retry attempts.
pub const MAX_BACKOFF: Duration = Duration::from_secs(60);

/// HTTP connect timeout - time to establish the TCP connection.
pub const HTTP_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// HTTP request timeout - overall time for one request/response cycle.
pub const HTTP_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
