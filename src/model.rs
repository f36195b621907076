//! Message domain model.

use chrono::{DateTime, Utc};

use crate::analysis::ToneAnalysis;

/// Processing status of a tracked email.
///
/// Transitions are monotonic: `Received → Processing → Processed → Replied`.
/// `Error` is a sink reachable from `Processing` or `Processed`; nothing
/// leaves it automatically. Enforced by [`EmailMessage::apply`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmailStatus {
    Received,
    Processing,
    Processed,
    Replied,
    Error,
}

impl EmailStatus {
    /// DB string form.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Received => "RECEIVED",
            Self::Processing => "PROCESSING",
            Self::Processed => "PROCESSED",
            Self::Replied => "REPLIED",
            Self::Error => "ERROR",
        }
    }
}

/// A single inbound email moving through the pipeline.
///
/// `id` is assigned by the store on first insert. `processed_at` and
/// `analysis` are both set or both unset.
#[derive(Debug, Clone)]
pub struct EmailMessage {
    pub id: Option<i64>,
    pub from_addr: String,
    pub to_addr: String,
    pub subject: Option<String>,
    pub body: Option<String>,
    pub received_at: DateTime<Utc>,
    pub processed_at: Option<DateTime<Utc>>,
    pub analysis: Option<ToneAnalysis>,
    pub status: EmailStatus,
}

impl EmailMessage {
    /// A freshly received, not-yet-persisted message.
    pub fn received(
        from_addr: impl Into<String>,
        to_addr: impl Into<String>,
        subject: Option<String>,
        body: Option<String>,
        received_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: None,
            from_addr: from_addr.into(),
            to_addr: to_addr.into(),
            subject,
            body,
            received_at,
            processed_at: None,
            analysis: None,
            status: EmailStatus::Received,
        }
    }
}

/// An attachment extracted from a multipart message. Inert data — no
/// content processing happens downstream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    pub file_name: String,
    pub content_type: String,
    pub data: Vec<u8>,
}
