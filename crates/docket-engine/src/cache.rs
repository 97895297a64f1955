//! The review aggregation cache.
//!
//! A short-lived derived index mapping a document to its review records
//! grouped by revision, plus a second index of synthesised placeholder
//! records for revisions whose review never started. Both sides are rebuilt
//! lazily from the store and bounded by a TTL; invalidation is explicit and
//! synchronous.
//!
//! Nothing is ever written through the cache — every entry is
//! reconstructible from the store, and a failed rebuild leaves no entry
//! behind (the error propagates instead of being mistaken for "no reviews").

use std::{
  collections::HashMap,
  time::{Duration, Instant},
};

use docket_core::{
  review::{ReviewRecord, ReviewRole},
  revision::Revision,
  store::WorkflowStore,
};
use tokio::sync::Mutex;
use uuid::Uuid;

type Groups = HashMap<u32, Vec<ReviewRecord>>;

struct Entry {
  groups:       Groups,
  refreshed_at: Instant,
}

/// Two-level, TTL-bounded cache of per-document review aggregations.
pub struct ReviewCache {
  ttl:          Duration,
  primary:      Mutex<HashMap<Uuid, Entry>>,
  placeholders: Mutex<HashMap<Uuid, Entry>>,
}

impl ReviewCache {
  pub fn new(ttl: Duration) -> Self {
    Self {
      ttl,
      primary: Mutex::new(HashMap::new()),
      placeholders: Mutex::new(HashMap::new()),
    }
  }

  /// The ordered review records to display for `revision`.
  ///
  /// Persisted records win; for a review that never started, placeholder
  /// records are synthesised from the revision's role assignments; failing
  /// both, the list is empty.
  pub async fn reviews_for_revision<S: WorkflowStore>(
    &self,
    store: &S,
    revision: &Revision,
  ) -> Result<Vec<ReviewRecord>, S::Error> {
    let document_id = revision.document_id;

    // A fresh primary entry answers even when it lacks the revision — the
    // miss goes to the placeholder index, not back to the store.
    if let Some(groups) = self.fresh(&self.primary, document_id).await {
      if let Some(records) = groups.get(&revision.revision) {
        return Ok(records.clone());
      }
    } else {
      let groups = Self::build_primary(store, document_id).await?;
      let hit = groups.get(&revision.revision).cloned();
      self.insert(&self.primary, document_id, groups).await;
      if let Some(records) = hit {
        return Ok(records);
      }
    }

    if let Some(groups) = self.fresh(&self.placeholders, document_id).await {
      return Ok(groups.get(&revision.revision).cloned().unwrap_or_default());
    }
    let groups = Self::build_placeholders(store, document_id).await?;
    let hit = groups.get(&revision.revision).cloned();
    self.insert(&self.placeholders, document_id, groups).await;
    Ok(hit.unwrap_or_default())
  }

  /// Drop the primary entry for a document. Called after any review-record
  /// write.
  pub async fn invalidate(&self, document_id: Uuid) {
    self.primary.lock().await.remove(&document_id);
  }

  /// Drop both entries for a document. Called after document-level writes —
  /// new revisions, role changes, review start/cancel.
  pub async fn invalidate_document(&self, document_id: Uuid) {
    self.primary.lock().await.remove(&document_id);
    self.placeholders.lock().await.remove(&document_id);
  }

  // The inner lock is released before any store call; a concurrent rebuild
  // of the same document is wasted work, not a correctness problem.

  async fn fresh(
    &self,
    map: &Mutex<HashMap<Uuid, Entry>>,
    document_id: Uuid,
  ) -> Option<Groups> {
    let map = map.lock().await;
    let entry = map.get(&document_id)?;
    (entry.refreshed_at.elapsed() < self.ttl).then(|| entry.groups.clone())
  }

  async fn insert(
    &self,
    map: &Mutex<HashMap<Uuid, Entry>>,
    document_id: Uuid,
    groups: Groups,
  ) {
    map.lock().await.insert(
      document_id,
      Entry {
        groups,
        refreshed_at: Instant::now(),
      },
    );
  }

  /// One store query ordered by `(revision, review_id)`, stably grouped by
  /// revision number.
  async fn build_primary<S: WorkflowStore>(
    store: &S,
    document_id: Uuid,
  ) -> Result<Groups, S::Error> {
    let records = store.list_reviews(document_id).await?;
    let mut groups: Groups = HashMap::new();
    for record in records {
      groups.entry(record.revision).or_default().push(record);
    }
    tracing::debug!(%document_id, revisions = groups.len(), "rebuilt review cache entry");
    Ok(groups)
  }

  /// Placeholder records for every revision whose review never started:
  /// one void record per assigned reviewer, then the leader and the
  /// approver if set.
  async fn build_placeholders<S: WorkflowStore>(
    store: &S,
    document_id: Uuid,
  ) -> Result<Groups, S::Error> {
    let revisions = store.list_unstarted_revisions(document_id).await?;
    let mut groups: Groups = HashMap::new();
    for revision in revisions {
      let mut records = Vec::new();
      for &reviewer in &revision.reviewers {
        records.push(ReviewRecord::void(
          document_id,
          revision.revision,
          ReviewRole::Reviewer,
          reviewer,
        ));
      }
      if let Some(leader) = revision.leader {
        records.push(ReviewRecord::void(
          document_id,
          revision.revision,
          ReviewRole::Leader,
          leader,
        ));
      }
      if let Some(approver) = revision.approver {
        records.push(ReviewRecord::void(
          document_id,
          revision.revision,
          ReviewRole::Approver,
          approver,
        ));
      }
      groups.insert(revision.revision, records);
    }
    tracing::debug!(%document_id, revisions = groups.len(), "rebuilt placeholder cache entry");
    Ok(groups)
  }
}
