//! The `WorkflowStore` trait.
//!
//! The trait is implemented by storage backends (e.g.
//! `docket-store-sqlite`). The review engine and the API layer depend on
//! this abstraction, not on any concrete backend.

use std::future::Future;

use uuid::Uuid;

use crate::{
  document::{Document, NewDocument},
  review::ReviewRecord,
  revision::{NewRevision, Revision},
};

/// Abstraction over a Docket storage backend.
///
/// The three `persist_*` methods are composite operations: each applies all
/// of its writes in a single storage transaction, so a failure leaves the
/// revision and its review records in their pre-call state. The engine
/// mutates the domain value in memory first, then hands it here to commit.
///
/// All methods return `Send` futures so the trait can be used in
/// multi-threaded async runtimes (e.g. tokio with `axum`).
pub trait WorkflowStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Documents ─────────────────────────────────────────────────────────

  /// Create and persist a new document with no revisions yet.
  fn add_document(
    &self,
    input: NewDocument,
  ) -> impl Future<Output = Result<Document, Self::Error>> + Send + '_;

  /// Retrieve a document by UUID. Returns `None` if not found.
  fn get_document(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Document>, Self::Error>> + Send + '_;

  /// Retrieve a document by its unique human-facing key.
  fn get_document_by_key<'a>(
    &'a self,
    key: &'a str,
  ) -> impl Future<Output = Result<Option<Document>, Self::Error>> + Send + 'a;

  fn list_documents(
    &self,
  ) -> impl Future<Output = Result<Vec<Document>, Self::Error>> + Send + '_;

  // ── Revisions ─────────────────────────────────────────────────────────

  /// Persist a new revision and bump the document's `current_revision`
  /// if this one is newer.
  fn add_revision(
    &self,
    input: NewRevision,
  ) -> impl Future<Output = Result<Revision, Self::Error>> + Send + '_;

  fn get_revision(
    &self,
    document_id: Uuid,
    revision: u32,
  ) -> impl Future<Output = Result<Option<Revision>, Self::Error>> + Send + '_;

  /// All revisions of a document, newest first.
  fn list_revisions(
    &self,
    document_id: Uuid,
  ) -> impl Future<Output = Result<Vec<Revision>, Self::Error>> + Send + '_;

  /// Revisions of a document whose review has not started, newest first.
  /// Feeds the placeholder side of the aggregation cache.
  fn list_unstarted_revisions(
    &self,
    document_id: Uuid,
  ) -> impl Future<Output = Result<Vec<Revision>, Self::Error>> + Send + '_;

  /// Write back a revision's role assignments, workflow dates and comment
  /// attachments. The reviewer set is replaced wholesale.
  fn update_revision<'a>(
    &'a self,
    revision: &'a Revision,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;

  // ── Review records ────────────────────────────────────────────────────

  /// All review records of a document, ordered by `(revision, review_id)` —
  /// the order the aggregation cache's grouping pass relies on.
  fn list_reviews(
    &self,
    document_id: Uuid,
  ) -> impl Future<Output = Result<Vec<ReviewRecord>, Self::Error>> + Send + '_;

  fn list_reviews_for_revision(
    &self,
    document_id: Uuid,
    revision: u32,
  ) -> impl Future<Output = Result<Vec<ReviewRecord>, Self::Error>> + Send + '_;

  /// A specific reviewer's record for a revision.
  fn get_review(
    &self,
    document_id: Uuid,
    revision: u32,
    reviewer: Uuid,
  ) -> impl Future<Output = Result<Option<ReviewRecord>, Self::Error>> + Send + '_;

  /// Write back a record's `reviewed_on`, `closed` and `comments` fields.
  fn update_review<'a>(
    &'a self,
    record: &'a ReviewRecord,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;

  // ── Composite atomic operations ───────────────────────────────────────

  /// Commit a started review: write the revision's start/due dates and
  /// insert one fresh review record per assigned reviewer, in one
  /// transaction. Returns the created records.
  fn persist_review_start<'a>(
    &'a self,
    revision: &'a Revision,
  ) -> impl Future<Output = Result<Vec<ReviewRecord>, Self::Error>> + Send + 'a;

  /// Commit a cancelled review: delete every review record for the
  /// `(document, revision)` and write the revision's reset fields, in one
  /// transaction. Destructive — the review history is gone.
  fn persist_review_cancel<'a>(
    &'a self,
    revision: &'a Revision,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;

  /// Commit a step close: write the revision's workflow dates and, when
  /// `close_records` is set, mark every review record for the revision
  /// `closed`, in one transaction.
  fn persist_step_close<'a>(
    &'a self,
    revision: &'a Revision,
    close_records: bool,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;
}
