//! Integration tests for `SqliteStore` against an in-memory database.

use chrono::NaiveDate;
use docket_core::{
  document::NewDocument,
  review::ReviewRole,
  revision::NewRevision,
  store::WorkflowStore,
};
use uuid::Uuid;

use crate::SqliteStore;

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory()
    .await
    .expect("in-memory store")
}

fn new_document(key: &str) -> NewDocument {
  NewDocument {
    document_key: key.into(),
    title:        format!("Document {key}"),
  }
}

fn new_revision(document_id: Uuid, revision: u32) -> NewRevision {
  NewRevision {
    document_id,
    revision,
    reviewers: vec![Uuid::new_v4(), Uuid::new_v4()],
    leader: Some(Uuid::new_v4()),
    approver: Some(Uuid::new_v4()),
  }
}

fn day(d: u32) -> NaiveDate {
  NaiveDate::from_ymd_opt(2024, 6, d).unwrap()
}

// ─── Documents ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn add_and_get_document() {
  let s = store().await;

  let doc = s.add_document(new_document("HTR-000-LAY-0001")).await.unwrap();
  assert_eq!(doc.current_revision, 0);

  let fetched = s.get_document(doc.document_id).await.unwrap().unwrap();
  assert_eq!(fetched.document_key, "HTR-000-LAY-0001");

  let by_key = s
    .get_document_by_key("HTR-000-LAY-0001")
    .await
    .unwrap()
    .unwrap();
  assert_eq!(by_key.document_id, doc.document_id);
}

#[tokio::test]
async fn duplicate_document_key_errors() {
  let s = store().await;
  s.add_document(new_document("HTR-000-LAY-0001")).await.unwrap();

  let err = s
    .add_document(new_document("HTR-000-LAY-0001"))
    .await
    .unwrap_err();
  assert!(matches!(
    err,
    crate::Error::Core(docket_core::Error::DuplicateDocumentKey(_))
  ));
}

#[tokio::test]
async fn get_document_missing_returns_none() {
  let s = store().await;
  assert!(s.get_document(Uuid::new_v4()).await.unwrap().is_none());
}

// ─── Revisions ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn add_revision_bumps_current_revision() {
  let s = store().await;
  let doc = s.add_document(new_document("DOC-1")).await.unwrap();

  s.add_revision(new_revision(doc.document_id, 1)).await.unwrap();
  s.add_revision(new_revision(doc.document_id, 2)).await.unwrap();

  let doc = s.get_document(doc.document_id).await.unwrap().unwrap();
  assert_eq!(doc.current_revision, 2);
}

#[tokio::test]
async fn add_revision_to_missing_document_errors() {
  let s = store().await;
  let err = s
    .add_revision(new_revision(Uuid::new_v4(), 1))
    .await
    .unwrap_err();
  assert!(matches!(
    err,
    crate::Error::Core(docket_core::Error::DocumentNotFound(_))
  ));
}

#[tokio::test]
async fn revision_roundtrip_preserves_reviewer_order() {
  let s = store().await;
  let doc = s.add_document(new_document("DOC-1")).await.unwrap();

  let input = new_revision(doc.document_id, 1);
  let reviewers = input.reviewers.clone();
  s.add_revision(input).await.unwrap();

  let fetched = s.get_revision(doc.document_id, 1).await.unwrap().unwrap();
  assert_eq!(fetched.reviewers, reviewers);
  assert!(fetched.review_start_date.is_none());
  assert!(fetched.leader.is_some());
}

#[tokio::test]
async fn list_revisions_newest_first() {
  let s = store().await;
  let doc = s.add_document(new_document("DOC-1")).await.unwrap();

  for rev in 1..=3 {
    s.add_revision(new_revision(doc.document_id, rev)).await.unwrap();
  }

  let revisions = s.list_revisions(doc.document_id).await.unwrap();
  let numbers: Vec<u32> = revisions.iter().map(|r| r.revision).collect();
  assert_eq!(numbers, vec![3, 2, 1]);
}

#[tokio::test]
async fn update_revision_replaces_reviewers() {
  let s = store().await;
  let doc = s.add_document(new_document("DOC-1")).await.unwrap();
  s.add_revision(new_revision(doc.document_id, 1)).await.unwrap();

  let mut revision = s.get_revision(doc.document_id, 1).await.unwrap().unwrap();
  let replacement = vec![Uuid::new_v4()];
  revision.reviewers = replacement.clone();
  revision.leader_comments = Some("leader.pdf".into());
  s.update_revision(&revision).await.unwrap();

  let fetched = s.get_revision(doc.document_id, 1).await.unwrap().unwrap();
  assert_eq!(fetched.reviewers, replacement);
  assert_eq!(fetched.leader_comments.as_deref(), Some("leader.pdf"));
}

#[tokio::test]
async fn update_missing_revision_errors() {
  let s = store().await;
  let doc = s.add_document(new_document("DOC-1")).await.unwrap();
  s.add_revision(new_revision(doc.document_id, 1)).await.unwrap();

  let mut revision = s.get_revision(doc.document_id, 1).await.unwrap().unwrap();
  revision.revision = 9;
  let err = s.update_revision(&revision).await.unwrap_err();
  assert!(matches!(
    err,
    crate::Error::Core(docket_core::Error::RevisionNotFound { .. })
  ));
}

#[tokio::test]
async fn unstarted_revisions_excludes_started_ones() {
  let s = store().await;
  let doc = s.add_document(new_document("DOC-1")).await.unwrap();
  s.add_revision(new_revision(doc.document_id, 1)).await.unwrap();
  s.add_revision(new_revision(doc.document_id, 2)).await.unwrap();

  let mut first = s.get_revision(doc.document_id, 1).await.unwrap().unwrap();
  first.begin_review(day(1), 15);
  s.persist_review_start(&first).await.unwrap();

  let unstarted = s.list_unstarted_revisions(doc.document_id).await.unwrap();
  assert_eq!(unstarted.len(), 1);
  assert_eq!(unstarted[0].revision, 2);
}

// ─── Review start / cancel ───────────────────────────────────────────────────

#[tokio::test]
async fn persist_review_start_creates_one_record_per_reviewer() {
  let s = store().await;
  let doc = s.add_document(new_document("DOC-1")).await.unwrap();
  s.add_revision(new_revision(doc.document_id, 1)).await.unwrap();

  let mut revision = s.get_revision(doc.document_id, 1).await.unwrap().unwrap();
  revision.begin_review(day(1), 15);
  let records = s.persist_review_start(&revision).await.unwrap();

  assert_eq!(records.len(), 2);
  assert!(records.iter().all(|r| r.role == ReviewRole::Reviewer));
  assert!(records.iter().all(|r| !r.closed && r.reviewed_on.is_none()));

  let fetched = s.get_revision(doc.document_id, 1).await.unwrap().unwrap();
  assert_eq!(fetched.review_start_date, Some(day(1)));
  assert_eq!(fetched.review_due_date, Some(day(16)));

  let stored = s
    .list_reviews_for_revision(doc.document_id, 1)
    .await
    .unwrap();
  assert_eq!(stored.len(), 2);
}

#[tokio::test]
async fn double_review_start_violates_the_create_once_guard() {
  let s = store().await;
  let doc = s.add_document(new_document("DOC-1")).await.unwrap();
  s.add_revision(new_revision(doc.document_id, 1)).await.unwrap();

  let mut revision = s.get_revision(doc.document_id, 1).await.unwrap().unwrap();
  revision.begin_review(day(1), 15);
  s.persist_review_start(&revision).await.unwrap();

  // A second start for the same (document, revision, reviewer) set hits the
  // UNIQUE constraint and leaves the first record set untouched.
  let err = s.persist_review_start(&revision).await.unwrap_err();
  assert!(matches!(err, crate::Error::Database(_)));

  let stored = s
    .list_reviews_for_revision(doc.document_id, 1)
    .await
    .unwrap();
  assert_eq!(stored.len(), 2);
}

#[tokio::test]
async fn persist_review_cancel_deletes_records_and_resets_fields() {
  let s = store().await;
  let doc = s.add_document(new_document("DOC-1")).await.unwrap();
  s.add_revision(new_revision(doc.document_id, 1)).await.unwrap();

  let mut revision = s.get_revision(doc.document_id, 1).await.unwrap().unwrap();
  revision.begin_review(day(1), 15);
  s.persist_review_start(&revision).await.unwrap();

  revision.reset_review();
  s.persist_review_cancel(&revision).await.unwrap();

  let fetched = s.get_revision(doc.document_id, 1).await.unwrap().unwrap();
  assert!(fetched.review_start_date.is_none());
  assert!(fetched.review_due_date.is_none());

  let stored = s
    .list_reviews_for_revision(doc.document_id, 1)
    .await
    .unwrap();
  assert!(stored.is_empty());
}

// ─── Step close ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn persist_step_close_seals_review_records() {
  let s = store().await;
  let doc = s.add_document(new_document("DOC-1")).await.unwrap();
  s.add_revision(new_revision(doc.document_id, 1)).await.unwrap();

  let mut revision = s.get_revision(doc.document_id, 1).await.unwrap().unwrap();
  revision.begin_review(day(1), 15);
  s.persist_review_start(&revision).await.unwrap();

  revision.close_reviewers_step(day(3));
  s.persist_step_close(&revision, true).await.unwrap();

  let fetched = s.get_revision(doc.document_id, 1).await.unwrap().unwrap();
  assert_eq!(fetched.reviewers_step_closed, Some(day(3)));

  let stored = s
    .list_reviews_for_revision(doc.document_id, 1)
    .await
    .unwrap();
  assert!(stored.iter().all(|r| r.closed));
}

// ─── Review record updates ───────────────────────────────────────────────────

#[tokio::test]
async fn update_review_roundtrip() {
  let s = store().await;
  let doc = s.add_document(new_document("DOC-1")).await.unwrap();
  s.add_revision(new_revision(doc.document_id, 1)).await.unwrap();

  let mut revision = s.get_revision(doc.document_id, 1).await.unwrap().unwrap();
  revision.begin_review(day(1), 15);
  let records = s.persist_review_start(&revision).await.unwrap();

  let mut record = records[0].clone();
  record.reviewed_on = Some(day(4));
  record.comments = Some("notes.pdf".into());
  s.update_review(&record).await.unwrap();

  let fetched = s
    .get_review(doc.document_id, 1, record.reviewer)
    .await
    .unwrap()
    .unwrap();
  assert_eq!(fetched.reviewed_on, Some(day(4)));
  assert_eq!(fetched.comments.as_deref(), Some("notes.pdf"));
  assert!(!fetched.closed);
}

#[tokio::test]
async fn list_reviews_orders_by_revision_then_id() {
  let s = store().await;
  let doc = s.add_document(new_document("DOC-1")).await.unwrap();
  s.add_revision(new_revision(doc.document_id, 1)).await.unwrap();
  s.add_revision(new_revision(doc.document_id, 2)).await.unwrap();

  for rev in [2, 1] {
    let mut revision =
      s.get_revision(doc.document_id, rev).await.unwrap().unwrap();
    revision.begin_review(day(1), 15);
    s.persist_review_start(&revision).await.unwrap();
  }

  let all = s.list_reviews(doc.document_id).await.unwrap();
  assert_eq!(all.len(), 4);
  let revisions: Vec<u32> = all.iter().map(|r| r.revision).collect();
  assert_eq!(revisions, vec![1, 1, 2, 2]);

  // Within a revision, records come back in review_id order.
  let ids: Vec<_> = all[..2].iter().map(|r| r.review_id).collect();
  let mut sorted = ids.clone();
  sorted.sort();
  assert_eq!(ids, sorted);
}
