//! Per-revision serialisation of workflow transitions.

use std::{collections::HashMap, sync::Arc};

use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

/// A map of async mutexes keyed by `(document, revision)`.
///
/// Transitions on the same revision are serialised; transitions on different
/// revisions proceed concurrently. Entries are created on first use and kept
/// for the engine's lifetime — the set of actively-reviewed revisions stays
/// small.
pub(crate) struct RevisionLocks {
  inner: Mutex<HashMap<(Uuid, u32), Arc<Mutex<()>>>>,
}

impl RevisionLocks {
  pub fn new() -> Self {
    Self {
      inner: Mutex::new(HashMap::new()),
    }
  }

  pub async fn acquire(
    &self,
    document_id: Uuid,
    revision: u32,
  ) -> OwnedMutexGuard<()> {
    let lock = {
      let mut map = self.inner.lock().await;
      map
        .entry((document_id, revision))
        .or_insert_with(|| Arc::new(Mutex::new(())))
        .clone()
    };
    lock.lock_owned().await
  }
}
