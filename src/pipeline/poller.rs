//! Mailbox poll loop.
//!
//! Fixed-interval polling for unseen messages; each batch is processed
//! sequentially to completion before the next tick. Poll failures are
//! retried per the redelivery policy and then logged; the loop never dies.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{error, info};

use crate::mail::Mailbox;
use crate::pipeline::EmailPipeline;
use crate::retry::{RetryPolicy, with_redelivery};

/// Spawn the poll loop. Returns the task handle and a shutdown flag; set the
/// flag and the loop exits at its next tick.
pub fn spawn_mail_poller(
    mailbox: Arc<dyn Mailbox>,
    pipeline: Arc<EmailPipeline>,
    poll_interval: Duration,
    retry: RetryPolicy,
) -> (JoinHandle<()>, Arc<AtomicBool>) {
    let shutdown = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&shutdown);

    let handle = tokio::spawn(async move {
        info!(interval_secs = poll_interval.as_secs(), "Mail poller started");
        let mut tick = tokio::time::interval(poll_interval);

        loop {
            tick.tick().await;

            if flag.load(Ordering::Relaxed) {
                info!("Mail poller shutting down");
                return;
            }

            poll_once(&*mailbox, &pipeline, &retry).await;
        }
    });

    (handle, shutdown)
}

/// One poll cycle: fetch with redelivery, then process the batch in order.
async fn poll_once(mailbox: &dyn Mailbox, pipeline: &EmailPipeline, retry: &RetryPolicy) {
    let batch = match with_redelivery(retry, "fetch_unseen", || mailbox.fetch_unseen()).await {
        Ok(batch) => batch,
        Err(e) => {
            error!(error = %e, "Mailbox poll failed, will retry next tick");
            return;
        }
    };

    if batch.is_empty() {
        return;
    }
    info!(count = batch.len(), "Fetched unseen messages");

    for raw in &batch {
        if let Err(e) = pipeline.process_raw(raw).await {
            error!(uid = %raw.uid, error = %e, "Message processing failed");
        }
    }
}
