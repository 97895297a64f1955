//! [`SqliteStore`] — the SQLite implementation of [`WorkflowStore`].

use std::{collections::HashMap, path::Path};

use chrono::Utc;
use rusqlite::OptionalExtension as _;
use uuid::Uuid;

use docket_core::{
  document::{Document, NewDocument},
  review::ReviewRecord,
  revision::{NewRevision, Revision},
  store::WorkflowStore,
};

use crate::{
  Error, Result,
  encode::{
    RawDocument, RawRevision, RawReview, encode_date, encode_dt, encode_role,
    encode_uuid,
  },
  schema::SCHEMA,
};

const DOCUMENT_COLS: &str =
  "document_id, document_key, title, created_at, current_revision";

const REVISION_COLS: &str = "document_id, revision, created_at, \
   review_start_date, review_due_date, reviewers_step_closed, \
   leader_step_closed, review_end_date, leader, approver, \
   leader_comments, approver_comments";

const REVIEW_COLS: &str = "review_id, document_id, revision, reviewer, \
   role, reviewed_on, closed, comments";

// ─── Row mappers ─────────────────────────────────────────────────────────────

fn document_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawDocument> {
  Ok(RawDocument {
    document_id:      row.get(0)?,
    document_key:     row.get(1)?,
    title:            row.get(2)?,
    created_at:       row.get(3)?,
    current_revision: row.get(4)?,
  })
}

fn revision_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawRevision> {
  Ok(RawRevision {
    document_id:           row.get(0)?,
    revision:              row.get(1)?,
    created_at:            row.get(2)?,
    review_start_date:     row.get(3)?,
    review_due_date:       row.get(4)?,
    reviewers_step_closed: row.get(5)?,
    leader_step_closed:    row.get(6)?,
    review_end_date:       row.get(7)?,
    leader:                row.get(8)?,
    approver:              row.get(9)?,
    leader_comments:       row.get(10)?,
    approver_comments:     row.get(11)?,
  })
}

fn review_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawReview> {
  Ok(RawReview {
    review_id:   row.get(0)?,
    document_id: row.get(1)?,
    revision:    row.get(2)?,
    reviewer:    row.get(3)?,
    role:        row.get(4)?,
    reviewed_on: row.get(5)?,
    closed:      row.get(6)?,
    comments:    row.get(7)?,
  })
}

/// Fetch the ordered reviewer lists of a document's revisions, keyed by
/// revision number. Runs inside a `call` closure.
fn reviewer_lists(
  conn: &rusqlite::Connection,
  document_id: &str,
) -> rusqlite::Result<HashMap<i64, Vec<String>>> {
  let mut stmt = conn.prepare(
    "SELECT revision, reviewer FROM revision_reviewers
     WHERE document_id = ?1 ORDER BY revision, position",
  )?;
  let rows = stmt
    .query_map(rusqlite::params![document_id], |row| {
      Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?))
    })?
    .collect::<rusqlite::Result<Vec<_>>>()?;

  let mut lists: HashMap<i64, Vec<String>> = HashMap::new();
  for (revision, reviewer) in rows {
    lists.entry(revision).or_default().push(reviewer);
  }
  Ok(lists)
}

// ─── Store ───────────────────────────────────────────────────────────────────

/// A Docket workflow store backed by a single SQLite file.
///
/// Cloning is cheap — the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store — useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// The encoded column values shared by every revision UPDATE.
  fn revision_update_params(revision: &Revision) -> [Option<String>; 7] {
    [
      revision.review_start_date.map(encode_date),
      revision.review_due_date.map(encode_date),
      revision.reviewers_step_closed.map(encode_date),
      revision.leader_step_closed.map(encode_date),
      revision.review_end_date.map(encode_date),
      revision.leader_comments.clone(),
      revision.approver_comments.clone(),
    ]
  }

  /// Shared body of `list_revisions` / `list_unstarted_revisions`.
  async fn list_revisions_where(
    &self,
    document_id: Uuid,
    unstarted_only: bool,
  ) -> Result<Vec<Revision>> {
    let doc_str = encode_uuid(document_id);

    let raws: Vec<(RawRevision, Vec<String>)> = self
      .conn
      .call(move |conn| {
        let filter = if unstarted_only {
          "AND review_start_date IS NULL"
        } else {
          ""
        };
        let mut stmt = conn.prepare(&format!(
          "SELECT {REVISION_COLS} FROM revisions
           WHERE document_id = ?1 {filter} ORDER BY revision DESC"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![doc_str], revision_from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;

        let mut lists = reviewer_lists(conn, &doc_str)?;
        Ok(
          rows
            .into_iter()
            .map(|raw| {
              let reviewers = lists.remove(&raw.revision).unwrap_or_default();
              (raw, reviewers)
            })
            .collect::<Vec<_>>(),
        )
      })
      .await?;

    raws
      .into_iter()
      .map(|(raw, reviewers)| raw.into_revision(reviewers))
      .collect()
  }
}

// ─── WorkflowStore impl ──────────────────────────────────────────────────────

impl WorkflowStore for SqliteStore {
  type Error = Error;

  // ── Documents ─────────────────────────────────────────────────────────────

  async fn add_document(&self, input: NewDocument) -> Result<Document> {
    if self.get_document_by_key(&input.document_key).await?.is_some() {
      return Err(Error::Core(docket_core::Error::DuplicateDocumentKey(
        input.document_key,
      )));
    }

    let document = Document {
      document_id:      Uuid::new_v4(),
      document_key:     input.document_key,
      title:            input.title,
      created_at:       Utc::now(),
      current_revision: 0,
    };

    let id_str   = encode_uuid(document.document_id);
    let key      = document.document_key.clone();
    let title    = document.title.clone();
    let at_str   = encode_dt(document.created_at);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO documents
             (document_id, document_key, title, created_at, current_revision)
           VALUES (?1, ?2, ?3, ?4, 0)",
          rusqlite::params![id_str, key, title, at_str],
        )?;
        Ok(())
      })
      .await?;

    Ok(document)
  }

  async fn get_document(&self, id: Uuid) -> Result<Option<Document>> {
    let id_str = encode_uuid(id);

    let raw: Option<RawDocument> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!(
                "SELECT {DOCUMENT_COLS} FROM documents WHERE document_id = ?1"
              ),
              rusqlite::params![id_str],
              document_from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawDocument::into_document).transpose()
  }

  async fn get_document_by_key(&self, key: &str) -> Result<Option<Document>> {
    let key = key.to_owned();

    let raw: Option<RawDocument> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!(
                "SELECT {DOCUMENT_COLS} FROM documents WHERE document_key = ?1"
              ),
              rusqlite::params![key],
              document_from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawDocument::into_document).transpose()
  }

  async fn list_documents(&self) -> Result<Vec<Document>> {
    let raws: Vec<RawDocument> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {DOCUMENT_COLS} FROM documents ORDER BY document_key"
        ))?;
        let rows = stmt
          .query_map([], document_from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawDocument::into_document).collect()
  }

  // ── Revisions ─────────────────────────────────────────────────────────────

  async fn add_revision(&self, input: NewRevision) -> Result<Revision> {
    if self.get_document(input.document_id).await?.is_none() {
      return Err(Error::Core(docket_core::Error::DocumentNotFound(
        input.document_id,
      )));
    }

    let revision = Revision {
      document_id:           input.document_id,
      revision:              input.revision,
      created_at:            Utc::now(),
      review_start_date:     None,
      review_due_date:       None,
      reviewers_step_closed: None,
      leader_step_closed:    None,
      review_end_date:       None,
      reviewers:             input.reviewers,
      leader:                input.leader,
      approver:              input.approver,
      leader_comments:       None,
      approver_comments:     None,
    };

    let doc_str      = encode_uuid(revision.document_id);
    let rev          = revision.revision as i64;
    let at_str       = encode_dt(revision.created_at);
    let leader_str   = revision.leader.map(encode_uuid);
    let approver_str = revision.approver.map(encode_uuid);
    let reviewer_strs: Vec<String> =
      revision.reviewers.iter().copied().map(encode_uuid).collect();

    self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        tx.execute(
          "INSERT INTO revisions
             (document_id, revision, created_at, leader, approver)
           VALUES (?1, ?2, ?3, ?4, ?5)",
          rusqlite::params![doc_str, rev, at_str, leader_str, approver_str],
        )?;
        for (position, reviewer) in reviewer_strs.iter().enumerate() {
          tx.execute(
            "INSERT INTO revision_reviewers
               (document_id, revision, reviewer, position)
             VALUES (?1, ?2, ?3, ?4)",
            rusqlite::params![doc_str, rev, reviewer, position as i64],
          )?;
        }
        tx.execute(
          "UPDATE documents SET current_revision = ?2
           WHERE document_id = ?1 AND current_revision < ?2",
          rusqlite::params![doc_str, rev],
        )?;
        tx.commit()?;
        Ok(())
      })
      .await?;

    Ok(revision)
  }

  async fn get_revision(
    &self,
    document_id: Uuid,
    revision: u32,
  ) -> Result<Option<Revision>> {
    let doc_str = encode_uuid(document_id);
    let rev = revision as i64;

    let raw: Option<(RawRevision, Vec<String>)> = self
      .conn
      .call(move |conn| {
        let raw = conn
          .query_row(
            &format!(
              "SELECT {REVISION_COLS} FROM revisions
               WHERE document_id = ?1 AND revision = ?2"
            ),
            rusqlite::params![doc_str, rev],
            revision_from_row,
          )
          .optional()?;

        let Some(raw) = raw else { return Ok(None) };

        let mut stmt = conn.prepare(
          "SELECT reviewer FROM revision_reviewers
           WHERE document_id = ?1 AND revision = ?2 ORDER BY position",
        )?;
        let reviewers = stmt
          .query_map(rusqlite::params![doc_str, rev], |row| row.get(0))?
          .collect::<rusqlite::Result<Vec<String>>>()?;

        Ok(Some((raw, reviewers)))
      })
      .await?;

    raw
      .map(|(raw, reviewers)| raw.into_revision(reviewers))
      .transpose()
  }

  async fn list_revisions(&self, document_id: Uuid) -> Result<Vec<Revision>> {
    self.list_revisions_where(document_id, false).await
  }

  async fn list_unstarted_revisions(
    &self,
    document_id: Uuid,
  ) -> Result<Vec<Revision>> {
    self.list_revisions_where(document_id, true).await
  }

  async fn update_revision(&self, revision: &Revision) -> Result<()> {
    let doc_str      = encode_uuid(revision.document_id);
    let rev          = revision.revision as i64;
    let leader_str   = revision.leader.map(encode_uuid);
    let approver_str = revision.approver.map(encode_uuid);
    let dates        = Self::revision_update_params(revision);
    let reviewer_strs: Vec<String> =
      revision.reviewers.iter().copied().map(encode_uuid).collect();

    let updated: usize = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let n = tx.execute(
          "UPDATE revisions SET
             review_start_date = ?3, review_due_date = ?4,
             reviewers_step_closed = ?5, leader_step_closed = ?6,
             review_end_date = ?7, leader_comments = ?8,
             approver_comments = ?9, leader = ?10, approver = ?11
           WHERE document_id = ?1 AND revision = ?2",
          rusqlite::params![
            doc_str, rev, dates[0], dates[1], dates[2], dates[3], dates[4],
            dates[5], dates[6], leader_str, approver_str,
          ],
        )?;
        if n == 0 {
          // Dropping the transaction rolls it back.
          return Ok(0);
        }

        tx.execute(
          "DELETE FROM revision_reviewers
           WHERE document_id = ?1 AND revision = ?2",
          rusqlite::params![doc_str, rev],
        )?;
        for (position, reviewer) in reviewer_strs.iter().enumerate() {
          tx.execute(
            "INSERT INTO revision_reviewers
               (document_id, revision, reviewer, position)
             VALUES (?1, ?2, ?3, ?4)",
            rusqlite::params![doc_str, rev, reviewer, position as i64],
          )?;
        }
        tx.commit()?;
        Ok(n)
      })
      .await?;

    if updated == 0 {
      return Err(Error::Core(docket_core::Error::RevisionNotFound {
        document_id: revision.document_id,
        revision:    revision.revision,
      }));
    }
    Ok(())
  }

  // ── Review records ────────────────────────────────────────────────────────

  async fn list_reviews(&self, document_id: Uuid) -> Result<Vec<ReviewRecord>> {
    let doc_str = encode_uuid(document_id);

    let raws: Vec<RawReview> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {REVIEW_COLS} FROM reviews
           WHERE document_id = ?1 ORDER BY revision, review_id"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![doc_str], review_from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawReview::into_record).collect()
  }

  async fn list_reviews_for_revision(
    &self,
    document_id: Uuid,
    revision: u32,
  ) -> Result<Vec<ReviewRecord>> {
    let doc_str = encode_uuid(document_id);
    let rev = revision as i64;

    let raws: Vec<RawReview> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {REVIEW_COLS} FROM reviews
           WHERE document_id = ?1 AND revision = ?2 ORDER BY review_id"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![doc_str, rev], review_from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawReview::into_record).collect()
  }

  async fn get_review(
    &self,
    document_id: Uuid,
    revision: u32,
    reviewer: Uuid,
  ) -> Result<Option<ReviewRecord>> {
    let doc_str = encode_uuid(document_id);
    let rev = revision as i64;
    let reviewer_str = encode_uuid(reviewer);

    let raw: Option<RawReview> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!(
                "SELECT {REVIEW_COLS} FROM reviews
                 WHERE document_id = ?1 AND revision = ?2 AND reviewer = ?3"
              ),
              rusqlite::params![doc_str, rev, reviewer_str],
              review_from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawReview::into_record).transpose()
  }

  async fn update_review(&self, record: &ReviewRecord) -> Result<()> {
    let id_str       = encode_uuid(record.review_id);
    let reviewed_str = record.reviewed_on.map(encode_date);
    let closed       = record.closed;
    let comments     = record.comments.clone();

    let updated: usize = self
      .conn
      .call(move |conn| {
        let n = conn.execute(
          "UPDATE reviews SET reviewed_on = ?2, closed = ?3, comments = ?4
           WHERE review_id = ?1",
          rusqlite::params![id_str, reviewed_str, closed, comments],
        )?;
        Ok(n)
      })
      .await?;

    if updated == 0 {
      return Err(Error::Core(docket_core::Error::ReviewNotFound {
        document_id: record.document_id,
        revision:    record.revision,
        reviewer:    record.reviewer,
      }));
    }
    Ok(())
  }

  // ── Composite atomic operations ───────────────────────────────────────────

  async fn persist_review_start(
    &self,
    revision: &Revision,
  ) -> Result<Vec<ReviewRecord>> {
    let records: Vec<ReviewRecord> = revision
      .reviewers
      .iter()
      .map(|&reviewer| {
        ReviewRecord::new(revision.document_id, revision.revision, reviewer)
      })
      .collect();

    let doc_str   = encode_uuid(revision.document_id);
    let rev       = revision.revision as i64;
    let start_str = revision.review_start_date.map(encode_date);
    let due_str   = revision.review_due_date.map(encode_date);
    let rows: Vec<(String, String, &'static str)> = records
      .iter()
      .map(|r| (encode_uuid(r.review_id), encode_uuid(r.reviewer), encode_role(r.role)))
      .collect();

    let updated: usize = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let n = tx.execute(
          "UPDATE revisions SET review_start_date = ?3, review_due_date = ?4
           WHERE document_id = ?1 AND revision = ?2",
          rusqlite::params![doc_str, rev, start_str, due_str],
        )?;
        if n == 0 {
          return Ok(0);
        }
        for (review_id, reviewer, role) in &rows {
          tx.execute(
            "INSERT INTO reviews
               (review_id, document_id, revision, reviewer, role, closed)
             VALUES (?1, ?2, ?3, ?4, ?5, 0)",
            rusqlite::params![review_id, doc_str, rev, reviewer, role],
          )?;
        }
        tx.commit()?;
        Ok(n)
      })
      .await?;

    if updated == 0 {
      return Err(Error::Core(docket_core::Error::RevisionNotFound {
        document_id: revision.document_id,
        revision:    revision.revision,
      }));
    }
    Ok(records)
  }

  async fn persist_review_cancel(&self, revision: &Revision) -> Result<()> {
    let doc_str = encode_uuid(revision.document_id);
    let rev     = revision.revision as i64;
    let dates   = Self::revision_update_params(revision);

    let updated: usize = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        tx.execute(
          "DELETE FROM reviews WHERE document_id = ?1 AND revision = ?2",
          rusqlite::params![doc_str, rev],
        )?;
        let n = tx.execute(
          "UPDATE revisions SET
             review_start_date = ?3, review_due_date = ?4,
             reviewers_step_closed = ?5, leader_step_closed = ?6,
             review_end_date = ?7, leader_comments = ?8,
             approver_comments = ?9
           WHERE document_id = ?1 AND revision = ?2",
          rusqlite::params![
            doc_str, rev, dates[0], dates[1], dates[2], dates[3], dates[4],
            dates[5], dates[6],
          ],
        )?;
        if n == 0 {
          return Ok(0);
        }
        tx.commit()?;
        Ok(n)
      })
      .await?;

    if updated == 0 {
      return Err(Error::Core(docket_core::Error::RevisionNotFound {
        document_id: revision.document_id,
        revision:    revision.revision,
      }));
    }
    Ok(())
  }

  async fn persist_step_close(
    &self,
    revision: &Revision,
    close_records: bool,
  ) -> Result<()> {
    let doc_str     = encode_uuid(revision.document_id);
    let rev         = revision.revision as i64;
    let closed_strs = [
      revision.reviewers_step_closed.map(encode_date),
      revision.leader_step_closed.map(encode_date),
      revision.review_end_date.map(encode_date),
    ];

    let updated: usize = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let n = tx.execute(
          "UPDATE revisions SET
             reviewers_step_closed = ?3, leader_step_closed = ?4,
             review_end_date = ?5
           WHERE document_id = ?1 AND revision = ?2",
          rusqlite::params![
            doc_str, rev, closed_strs[0], closed_strs[1], closed_strs[2],
          ],
        )?;
        if n == 0 {
          return Ok(0);
        }
        if close_records {
          tx.execute(
            "UPDATE reviews SET closed = 1
             WHERE document_id = ?1 AND revision = ?2",
            rusqlite::params![doc_str, rev],
          )?;
        }
        tx.commit()?;
        Ok(n)
      })
      .await?;

    if updated == 0 {
      return Err(Error::Core(docket_core::Error::RevisionNotFound {
        document_id: revision.document_id,
        revision:    revision.revision,
      }));
    }
    Ok(())
  }
}
