//! Message lifecycle state machine.
//!
//! Transitions are monotonic: RECEIVED → PROCESSING → PROCESSED → REPLIED,
//! with ERROR as a sink reachable from any live state. The store only ever
//! persists statuses produced here.

use chrono::{DateTime, Utc};

use crate::analysis::ToneAnalysis;
use crate::model::{EmailMessage, EmailStatus};

/// Events that advance a message through the pipeline.
#[derive(Debug, Clone)]
pub enum PipelineEvent {
    StartProcessing,
    AnalysisComplete {
        analysis: ToneAnalysis,
        at: DateTime<Utc>,
    },
    ReplySent,
    Failed,
}

impl PipelineEvent {
    fn name(&self) -> &'static str {
        match self {
            Self::StartProcessing => "StartProcessing",
            Self::AnalysisComplete { .. } => "AnalysisComplete",
            Self::ReplySent => "ReplySent",
            Self::Failed => "Failed",
        }
    }
}

/// An event arrived in a state that does not accept it.
#[derive(Debug, thiserror::Error)]
#[error("event {event} not valid in status {from:?}")]
pub struct InvalidTransition {
    pub from: EmailStatus,
    pub event: &'static str,
}

impl EmailMessage {
    /// Apply a lifecycle event, returning the advanced message.
    pub fn apply(mut self, event: PipelineEvent) -> Result<EmailMessage, InvalidTransition> {
        match (self.status, &event) {
            (EmailStatus::Received, PipelineEvent::StartProcessing) => {
                self.status = EmailStatus::Processing;
            }
            (EmailStatus::Processing, PipelineEvent::AnalysisComplete { analysis, at }) => {
                self.analysis = Some(analysis.clone());
                self.processed_at = Some(*at);
                self.status = EmailStatus::Processed;
            }
            (EmailStatus::Processed, PipelineEvent::ReplySent) => {
                self.status = EmailStatus::Replied;
            }
            // Error is a sink, reachable only from the processing window.
            (EmailStatus::Processing | EmailStatus::Processed, PipelineEvent::Failed) => {
                self.status = EmailStatus::Error;
            }
            (from, event) => {
                return Err(InvalidTransition {
                    from,
                    event: event.name(),
                });
            }
        }
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn received() -> EmailMessage {
        EmailMessage::received("a@x.com", "b@x.com", None, Some("body".into()), Utc::now())
    }

    fn analysis_event() -> PipelineEvent {
        PipelineEvent::AnalysisComplete {
            analysis: ToneAnalysis::fallback(),
            at: Utc::now(),
        }
    }

    #[test]
    fn happy_path_advances_through_all_states() {
        let msg = received();
        assert_eq!(msg.status, EmailStatus::Received);

        let msg = msg.apply(PipelineEvent::StartProcessing).unwrap();
        assert_eq!(msg.status, EmailStatus::Processing);

        let msg = msg.apply(analysis_event()).unwrap();
        assert_eq!(msg.status, EmailStatus::Processed);
        assert!(msg.analysis.is_some());
        assert!(msg.processed_at.is_some());

        let msg = msg.apply(PipelineEvent::ReplySent).unwrap();
        assert_eq!(msg.status, EmailStatus::Replied);
    }

    #[test]
    fn cannot_skip_processing() {
        let err = received().apply(analysis_event()).unwrap_err();
        assert_eq!(err.from, EmailStatus::Received);
        assert_eq!(err.event, "AnalysisComplete");
    }

    #[test]
    fn cannot_reply_before_processed() {
        assert!(received().apply(PipelineEvent::ReplySent).is_err());
        let processing = received().apply(PipelineEvent::StartProcessing).unwrap();
        assert!(processing.apply(PipelineEvent::ReplySent).is_err());
    }

    #[test]
    fn failed_reaches_error_from_processing_and_processed() {
        let processing = received().apply(PipelineEvent::StartProcessing).unwrap();
        assert_eq!(
            processing.clone().apply(PipelineEvent::Failed).unwrap().status,
            EmailStatus::Error
        );

        let processed = processing.apply(analysis_event()).unwrap();
        assert_eq!(
            processed.apply(PipelineEvent::Failed).unwrap().status,
            EmailStatus::Error
        );
    }

    #[test]
    fn failed_is_rejected_outside_the_processing_window() {
        assert!(received().apply(PipelineEvent::Failed).is_err());

        let replied = received()
            .apply(PipelineEvent::StartProcessing)
            .unwrap()
            .apply(analysis_event())
            .unwrap()
            .apply(PipelineEvent::ReplySent)
            .unwrap();
        assert!(replied.apply(PipelineEvent::Failed).is_err());
    }

    #[test]
    fn error_is_a_sink() {
        let errored = received()
            .apply(PipelineEvent::StartProcessing)
            .unwrap()
            .apply(PipelineEvent::Failed)
            .unwrap();
        assert!(errored.clone().apply(PipelineEvent::StartProcessing).is_err());
        assert!(errored.apply(PipelineEvent::Failed).is_err());
    }

    #[test]
    fn replied_is_terminal() {
        let replied = received()
            .apply(PipelineEvent::StartProcessing)
            .unwrap()
            .apply(analysis_event())
            .unwrap()
            .apply(PipelineEvent::ReplySent)
            .unwrap();
        assert!(replied.clone().apply(PipelineEvent::StartProcessing).is_err());
        assert!(replied.apply(PipelineEvent::ReplySent).is_err());
    }
}
