//! Pipeline orchestration — drives one message from raw bytes to its final
//! persisted status.
//!
//! Stage failures that touch persistence mark the message ERROR and surface
//! the error; transport failures on the outbound leg are retried and, once
//! exhausted, dropped with the message left PROCESSED.

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, error, info, warn};

use crate::analyzer::ToneAnalyzer;
use crate::decision::should_auto_reply;
use crate::error::PipelineError;
use crate::mail::{MailSender, RawEmail};
use crate::model::{EmailMessage, EmailStatus};
use crate::parser::{extract_attachments, parse_email};
use crate::pipeline::state::PipelineEvent;
use crate::reply::ReplyEngine;
use crate::retry::{RetryPolicy, with_redelivery};
use crate::store::{DEFAULT_HISTORY_LIMIT, EmailStore};

/// What became of one processed message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyOutcome {
    /// Unparseable input, nothing persisted.
    Skipped,
    /// Processed and stored; tone did not warrant a reply.
    NotWarranted,
    /// Reply delivered.
    Sent,
    /// Redeliveries exhausted; reply dropped, message stays processed.
    Dropped,
}

/// The end-to-end message pipeline.
pub struct EmailPipeline {
    store: Arc<EmailStore>,
    analyzer: Arc<dyn ToneAnalyzer>,
    replies: Arc<ReplyEngine>,
    sender: Arc<dyn MailSender>,
    retry: RetryPolicy,
}

impl EmailPipeline {
    pub fn new(
        store: Arc<EmailStore>,
        analyzer: Arc<dyn ToneAnalyzer>,
        replies: Arc<ReplyEngine>,
        sender: Arc<dyn MailSender>,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            store,
            analyzer,
            replies,
            sender,
            retry,
        }
    }

    /// Process one raw mailbox message. Unparseable input is logged and
    /// skipped, never treated as a pipeline failure.
    pub async fn process_raw(&self, raw: &RawEmail) -> Result<ReplyOutcome, PipelineError> {
        let email = match parse_email(&raw.data) {
            Ok(email) => email,
            Err(e) => {
                warn!(uid = %raw.uid, error = %e, "Skipping unparseable message");
                return Ok(ReplyOutcome::Skipped);
            }
        };

        // Attachments are inert data; noted for the logs only.
        let attachments = extract_attachments(&raw.data);
        if !attachments.is_empty() {
            debug!(
                uid = %raw.uid,
                count = attachments.len(),
                names = ?attachments.iter().map(|a| a.file_name.as_str()).collect::<Vec<_>>(),
                "Message carries attachments"
            );
        }

        self.process(email).await
    }

    /// Process an already-parsed message: persist, analyze, decide, reply.
    pub async fn process(&self, email: EmailMessage) -> Result<ReplyOutcome, PipelineError> {
        // Insert failure leaves nothing to mark ERROR.
        let id = self.store.insert(&email).await?;

        match self.run_stages(id, email).await {
            Ok(outcome) => Ok(outcome),
            Err(e) => {
                error!(id, error = %e, "Pipeline stage failed, marking message ERROR");
                if let Err(mark) = self.store.update_status(id, EmailStatus::Error).await {
                    error!(id, error = %mark, "Failed to record ERROR status");
                }
                Err(e)
            }
        }
    }

    async fn run_stages(
        &self,
        id: i64,
        email: EmailMessage,
    ) -> Result<ReplyOutcome, PipelineError> {
        let email = email.apply(PipelineEvent::StartProcessing)?;
        self.store.update_status(id, email.status).await?;

        let analysis = self
            .analyzer
            .analyze_tone(email.body.as_deref().unwrap_or(""))
            .await;
        let at = Utc::now();
        let email = email.apply(PipelineEvent::AnalysisComplete {
            analysis: analysis.clone(),
            at,
        })?;
        self.store
            .update_analysis(id, &analysis, at, email.status)
            .await?;

        if !should_auto_reply(&email) {
            info!(id, from = %email.from_addr, "No auto-reply warranted");
            return Ok(ReplyOutcome::NotWarranted);
        }

        // Prior messages only; the current one is already persisted.
        let mut history = self
            .store
            .history(&email.from_addr, DEFAULT_HISTORY_LIMIT)
            .await?;
        history.retain(|entry| entry.id != id);

        let reply = self.replies.generate_reply(&email, &history);
        let subject = format!("Re: {}", email.subject.as_deref().unwrap_or(""));

        let sent = with_redelivery(&self.retry, "send_reply", || {
            self.sender.send(&email.from_addr, &subject, &reply)
        })
        .await;

        if let Err(e) = sent {
            error!(
                id,
                to = %email.from_addr,
                error = %e,
                reply = %reply,
                history_len = history.len(),
                "Reply dropped after exhausted redeliveries"
            );
            return Ok(ReplyOutcome::Dropped);
        }

        let email = email.apply(PipelineEvent::ReplySent)?;
        self.store.update_status(id, email.status).await?;
        info!(id, to = %email.from_addr, "Auto-reply sent");
        Ok(ReplyOutcome::Sent)
    }
}
