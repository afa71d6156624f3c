//! # plagscan resilience
//!
//! Bounded retry for outbound network calls. Both the embedding provider and
//! the vector index client route their transient-failure handling through
//! [`with_retry`] so attempt counting and backoff live in one place.
//!
//! Retries are driven by a [`RetryPolicy`] (how many attempts, how long to
//! wait between them) and a [`Sleeper`] (how to wait). Production code uses
//! [`TokioSleeper`]; tests inject [`RecordingSleeper`] and assert on the
//! recorded delays without ever touching the clock.
//!
//! ```
//! use resilience::{with_retry, RecordingSleeper, RetryPolicy, Transient};
//! use std::time::Duration;
//!
//! #[derive(Debug)]
//! struct Refused;
//!
//! impl std::fmt::Display for Refused {
//!     fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
//!         f.write_str("connection refused")
//!     }
//! }
//!
//! impl Transient for Refused {
//!     fn is_transient(&self) -> bool {
//!         true
//!     }
//! }
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let sleeper = RecordingSleeper::default();
//! let policy = RetryPolicy::linear(3, Duration::from_secs(1));
//! let result = with_retry(&policy, &sleeper, |attempt| async move {
//!     if attempt < 3 { Err(Refused) } else { Ok(attempt) }
//! })
//! .await;
//!
//! assert_eq!(result.unwrap(), 3);
//! assert_eq!(sleeper.delays(), vec![Duration::from_secs(1), Duration::from_secs(2)]);
//! # }
//! ```

mod retry;
pub mod serde_millis;
mod sleep;

pub use retry::{with_retry, Backoff, RetryError, RetryPolicy, Transient};
pub use sleep::{RecordingSleeper, Sleeper, TokioSleeper};
