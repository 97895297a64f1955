//! Review lifecycle events.
//!
//! Emitted fire-and-forget after a transition commits. A notification
//! dispatcher subscribes by implementing [`EventSink`]; the engine never
//! waits on the sink or inspects its behaviour.

use chrono::NaiveDate;
use docket_core::revision::ReviewStep;
use serde::Serialize;
use uuid::Uuid;

/// Something that happened to a revision's review.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ReviewEvent {
  ReviewStarted {
    document_id: Uuid,
    revision:    u32,
    due:         NaiveDate,
  },
  ReviewCanceled {
    document_id: Uuid,
    revision:    u32,
  },
  StepClosed {
    document_id: Uuid,
    revision:    u32,
    step:        ReviewStep,
  },
  ReviewEnded {
    document_id: Uuid,
    revision:    u32,
  },
}

/// Observer for [`ReviewEvent`]s.
pub trait EventSink: Send + Sync {
  fn emit(&self, event: &ReviewEvent);
}
