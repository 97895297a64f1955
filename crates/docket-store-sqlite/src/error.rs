//! Error type for `docket-store-sqlite`.
//!
//! Domain-level failures (missing documents or revisions, duplicate keys)
//! are [`docket_core::Error`] values carried through the `Core` variant;
//! the remaining variants are storage plumbing.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("core error: {0}")]
  Core(#[from] docket_core::Error),

  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("uuid parse error: {0}")]
  Uuid(#[from] uuid::Error),

  #[error("date/time parse error: {0}")]
  DateParse(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
