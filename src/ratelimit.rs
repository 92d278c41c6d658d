//! Bandwidth shaping (component N): the `-rate` string parser and the
//! token-bucket limiters it configures.

use std::num::NonZeroU32;
use std::sync::Arc;

use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};

use crate::error::{DownloadError, Result};

/// Strict byte-size-per-second parse: `100kB` (decimal, ×1000), `10MiB`
/// (binary, ×1024), etc. (spec §6).
pub fn parse_rate(s: &str) -> Result<u64> {
  parse_size::parse_size(s).map_err(|e| DownloadError::Config(format!("invalid rate {s:?}: {e}")))
}

/// A shared or per-worker bandwidth cap. Capacity is one second's worth of
/// the configured rate; callers that need to move more than `capacity`
/// bytes in one acquisition split the request into capacity-sized pieces,
/// since a governor cell can never hold more than one replenishment burst.
pub struct TokenBucket {
  limiter: RateLimiter<NotKeyed, InMemoryState, DefaultClock>,
  capacity: u32,
}

impl TokenBucket {
  pub fn new(bytes_per_sec: u64) -> Self {
    let capacity = bytes_per_sec.clamp(1, u32::MAX as u64) as u32;
    let quota = Quota::per_second(NonZeroU32::new(capacity).expect("clamped to >= 1"));
    Self { limiter: RateLimiter::direct(quota), capacity }
  }

  pub fn shared(bytes_per_sec: u64) -> Arc<Self> {
    Arc::new(Self::new(bytes_per_sec))
  }

  /// Acquire `n` tokens, blocking until they are available.
  pub async fn acquire(&self, n: u64) {
    let mut remaining = n;
    while remaining > 0 {
      let take = remaining.min(self.capacity as u64) as u32;
      if let Some(nz) = NonZeroU32::new(take) {
        let _ = self.limiter.until_n_ready(nz).await;
      }
      remaining -= take as u64;
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::time::Instant;

  #[test]
  fn parses_decimal_kilobytes() {
    assert_eq!(parse_rate("100kB").unwrap(), 100_000);
  }

  #[test]
  fn parses_binary_mebibytes() {
    assert_eq!(parse_rate("10MiB").unwrap(), 10 * 1024 * 1024);
  }

  #[test]
  fn rejects_garbage() {
    assert!(parse_rate("not-a-rate").is_err());
  }

  #[tokio::test]
  async fn token_bucket_paces_throughput() {
    // 100 kB/s cap, move 200 kB: should take roughly 1s (scenario 5).
    let bucket = TokenBucket::new(100_000);
    let start = Instant::now();
    bucket.acquire(200_000).await;
    assert!(start.elapsed().as_millis() >= 900, "elapsed={:?}", start.elapsed());
  }

  #[tokio::test]
  async fn acquisitions_larger_than_capacity_do_not_panic() {
    let bucket = TokenBucket::new(10);
    bucket.acquire(35).await;
  }
}
