//! SQL schema for the Docket SQLite store.
//!
//! Executed once at connection startup via `PRAGMA user_version`. Future
//! migrations will be gated on that version number.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS documents (
    document_id      TEXT PRIMARY KEY,
    document_key     TEXT NOT NULL UNIQUE,
    title            TEXT NOT NULL,
    created_at       TEXT NOT NULL,    -- ISO 8601 UTC; server-assigned
    current_revision INTEGER NOT NULL DEFAULT 0
);

-- Workflow dates are written only by the engine's composite operations.
CREATE TABLE IF NOT EXISTS revisions (
    document_id           TEXT NOT NULL REFERENCES documents(document_id),
    revision              INTEGER NOT NULL,
    created_at            TEXT NOT NULL,
    review_start_date     TEXT,        -- YYYY-MM-DD or NULL
    review_due_date       TEXT,
    reviewers_step_closed TEXT,
    leader_step_closed    TEXT,
    review_end_date       TEXT,
    leader                TEXT,
    approver              TEXT,
    leader_comments       TEXT,
    approver_comments     TEXT,
    PRIMARY KEY (document_id, revision)
);

-- A revision's reviewer distribution list; `position` preserves
-- assignment order.
CREATE TABLE IF NOT EXISTS revision_reviewers (
    document_id TEXT NOT NULL,
    revision    INTEGER NOT NULL,
    reviewer    TEXT NOT NULL,
    position    INTEGER NOT NULL,
    PRIMARY KEY (document_id, revision, reviewer),
    FOREIGN KEY (document_id, revision)
      REFERENCES revisions(document_id, revision)
);

-- One row per (document, revision, reviewer); created as a set when a
-- review starts, deleted as a set when it is cancelled. The UNIQUE key
-- doubles as the create-once guard against concurrent review starts.
CREATE TABLE IF NOT EXISTS reviews (
    review_id   TEXT PRIMARY KEY,
    document_id TEXT NOT NULL REFERENCES documents(document_id),
    revision    INTEGER NOT NULL,
    reviewer    TEXT NOT NULL,
    role        TEXT NOT NULL DEFAULT 'reviewer',
    reviewed_on TEXT,
    closed      INTEGER NOT NULL DEFAULT 0,
    comments    TEXT,
    UNIQUE (document_id, revision, reviewer)
);

CREATE INDEX IF NOT EXISTS reviews_reviewer_idx
  ON reviews(reviewer, document_id, revision);
CREATE INDEX IF NOT EXISTS reviews_document_idx
  ON reviews(document_id, revision);

PRAGMA user_version = 1;
";
