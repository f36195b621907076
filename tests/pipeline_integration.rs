//! End-to-end pipeline tests with an in-memory store, a canned analyzer,
//! and a scriptable mail sender.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;

use tonereply::analysis::{Sentiment, ToneAnalysis, Urgency};
use tonereply::analyzer::ToneAnalyzer;
use tonereply::error::MailError;
use tonereply::mail::{MailSender, RawEmail};
use tonereply::model::EmailMessage;
use tonereply::pipeline::{EmailPipeline, ReplyOutcome};
use tonereply::reply::{ReplyEngine, TemplateStore};
use tonereply::retry::RetryPolicy;
use tonereply::store::EmailStore;

struct MockAnalyzer {
    analysis: ToneAnalysis,
}

#[async_trait]
impl ToneAnalyzer for MockAnalyzer {
    async fn analyze_tone(&self, _body: &str) -> ToneAnalysis {
        self.analysis.clone()
    }
}

/// Sender that fails its first `fail_first` calls, then records deliveries.
struct MockSender {
    fail_first: u32,
    calls: AtomicU32,
    sent: Mutex<Vec<(String, String, String)>>,
}

impl MockSender {
    fn new(fail_first: u32) -> Self {
        Self {
            fail_first,
            calls: AtomicU32::new(0),
            sent: Mutex::new(Vec::new()),
        }
    }

    fn deliveries(&self) -> Vec<(String, String, String)> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl MailSender for MockSender {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), MailError> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst);
        if n < self.fail_first {
            return Err(MailError::Send(format!("simulated failure #{n}")));
        }
        self.sent
            .lock()
            .unwrap()
            .push((to.to_string(), subject.to_string(), body.to_string()));
        Ok(())
    }
}

fn fast_retry() -> RetryPolicy {
    RetryPolicy {
        max_redeliveries: 3,
        initial_delay: Duration::from_millis(1),
        backoff_multiplier: 2.0,
    }
}

fn analysis(sentiment: Sentiment, urgency: Urgency) -> ToneAnalysis {
    ToneAnalysis {
        sentiment,
        urgency,
        ..ToneAnalysis::fallback()
    }
}

fn inbound(from: &str, subject: &str) -> EmailMessage {
    EmailMessage::received(
        from,
        "support@example.com",
        Some(subject.to_string()),
        Some("I have a problem with my order.".into()),
        Utc::now(),
    )
}

struct Harness {
    store: Arc<EmailStore>,
    sender: Arc<MockSender>,
    pipeline: EmailPipeline,
    _templates_dir: tempfile::TempDir,
}

async fn harness(tone: ToneAnalysis, fail_first: u32) -> Harness {
    let store = Arc::new(EmailStore::new_memory().await.unwrap());
    let templates_dir = tempfile::tempdir().unwrap();
    let replies = Arc::new(ReplyEngine::new(
        TemplateStore::open(templates_dir.path()).unwrap(),
    ));
    let sender = Arc::new(MockSender::new(fail_first));
    let pipeline = EmailPipeline::new(
        Arc::clone(&store),
        Arc::new(MockAnalyzer { analysis: tone }),
        replies,
        Arc::clone(&sender) as Arc<dyn MailSender>,
        fast_retry(),
    );
    Harness {
        store,
        sender,
        pipeline,
        _templates_dir: templates_dir,
    }
}

async fn stored_status(store: &EmailStore, sender_addr: &str) -> String {
    store.history(sender_addr, 10).await.unwrap()[0]
        .status
        .clone()
        .unwrap()
}

#[tokio::test]
async fn negative_message_gets_a_reply() {
    let h = harness(analysis(Sentiment::Negative, Urgency::Normal), 0).await;

    let outcome = h
        .pipeline
        .process(inbound("alice@example.com", "Broken item"))
        .await
        .unwrap();
    assert_eq!(outcome, ReplyOutcome::Sent);

    let deliveries = h.sender.deliveries();
    assert_eq!(deliveries.len(), 1);
    let (to, subject, body) = &deliveries[0];
    assert_eq!(to, "alice@example.com");
    assert_eq!(subject, "Re: Broken item");
    assert!(body.contains("Broken item"));
    assert!(!body.contains("{{SENDER_NAME}}"));

    assert_eq!(stored_status(&h.store, "alice@example.com").await, "REPLIED");
}

#[tokio::test]
async fn neutral_message_is_stored_without_reply() {
    let h = harness(analysis(Sentiment::Neutral, Urgency::Normal), 0).await;

    let outcome = h
        .pipeline
        .process(inbound("bob@example.com", "Just a note"))
        .await
        .unwrap();
    assert_eq!(outcome, ReplyOutcome::NotWarranted);
    assert!(h.sender.deliveries().is_empty());
    assert_eq!(stored_status(&h.store, "bob@example.com").await, "PROCESSED");
}

#[tokio::test]
async fn transient_send_failures_deliver_exactly_once() {
    let h = harness(analysis(Sentiment::VeryNegative, Urgency::High), 2).await;

    let outcome = h
        .pipeline
        .process(inbound("carol@example.com", "Urgent"))
        .await
        .unwrap();
    assert_eq!(outcome, ReplyOutcome::Sent);
    assert_eq!(h.sender.deliveries().len(), 1);
    assert_eq!(h.sender.calls.load(Ordering::SeqCst), 3);
    assert_eq!(stored_status(&h.store, "carol@example.com").await, "REPLIED");
}

#[tokio::test]
async fn exhausted_redeliveries_drop_the_reply() {
    let h = harness(analysis(Sentiment::Negative, Urgency::Critical), u32::MAX).await;

    let outcome = h
        .pipeline
        .process(inbound("dave@example.com", "Everything is down"))
        .await
        .unwrap();
    assert_eq!(outcome, ReplyOutcome::Dropped);
    assert!(h.sender.deliveries().is_empty());
    // 1 initial attempt + 3 redeliveries
    assert_eq!(h.sender.calls.load(Ordering::SeqCst), 4);
    // The message itself was fully processed; only the reply was lost.
    assert_eq!(stored_status(&h.store, "dave@example.com").await, "PROCESSED");
}

#[tokio::test]
async fn repeated_negative_sender_gets_escalation_template() {
    let h = harness(analysis(Sentiment::VeryNegative, Urgency::Normal), 0).await;

    h.pipeline
        .process(inbound("eve@example.com", "First complaint"))
        .await
        .unwrap();
    h.pipeline
        .process(inbound("eve@example.com", "Second complaint"))
        .await
        .unwrap();

    let deliveries = h.sender.deliveries();
    assert_eq!(deliveries.len(), 2);
    // First contact has no negative history; the second does.
    assert!(!deliveries[0].2.contains("escalated"));
    assert!(deliveries[1].2.contains("escalated"));
}

#[tokio::test]
async fn unparseable_raw_message_is_skipped() {
    let h = harness(analysis(Sentiment::Negative, Urgency::Normal), 0).await;

    let raw = RawEmail {
        uid: "1".into(),
        data: Vec::new(),
    };
    let outcome = h.pipeline.process_raw(&raw).await.unwrap();
    assert_eq!(outcome, ReplyOutcome::Skipped);
    assert!(h.sender.deliveries().is_empty());
    assert!(h.store.history("unknown", 10).await.unwrap().is_empty());
}

#[tokio::test]
async fn raw_message_flows_end_to_end() {
    let h = harness(analysis(Sentiment::Negative, Urgency::Normal), 0).await;

    let raw = RawEmail {
        uid: "2".into(),
        data: b"From: Frank <frank@example.com>\r\n\
            To: support@example.com\r\n\
            Subject: Damaged package\r\n\
            Content-Type: text/plain\r\n\
            \r\n\
            The box arrived crushed."
            .to_vec(),
    };
    let outcome = h.pipeline.process_raw(&raw).await.unwrap();
    assert_eq!(outcome, ReplyOutcome::Sent);

    let deliveries = h.sender.deliveries();
    assert_eq!(deliveries.len(), 1);
    assert_eq!(deliveries[0].0, "Frank <frank@example.com>");
    assert_eq!(deliveries[0].1, "Re: Damaged package");
    assert!(deliveries[0].2.contains("Frank"));
}
