//! Engine configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Tunables for the review engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReviewConfig {
  /// Days between a review's start and due dates — the document-control
  /// policy for how long a distribution list has to respond.
  pub review_duration_days: i64,
  /// How long a cached per-document review aggregation stays valid.
  pub cache_ttl_ms: u64,
}

impl Default for ReviewConfig {
  fn default() -> Self {
    Self {
      review_duration_days: 15,
      cache_ttl_ms:         5_000,
    }
  }
}

impl ReviewConfig {
  pub fn cache_ttl(&self) -> Duration {
    Duration::from_millis(self.cache_ttl_ms)
  }
}
