//! Reply composition — template selection from tone and sender history,
//! followed by token substitution.

use chrono::{NaiveDate, Utc};
use tracing::debug;

use crate::analysis::{Sentiment, ToneAnalysis, Urgency};
use crate::model::EmailMessage;
use crate::reply::templates::TemplateStore;
use crate::store::HistoryEntry;

/// Display name used when no usable sender name can be derived.
const COURTESY_NAME: &str = "Valued Customer";

/// Reply generator over a template store.
pub struct ReplyEngine {
    templates: TemplateStore,
}

impl ReplyEngine {
    pub fn new(templates: TemplateStore) -> Self {
        Self { templates }
    }

    /// Compose the reply body for a message given its sender's history.
    pub fn generate_reply(&self, email: &EmailMessage, history: &[HistoryEntry]) -> String {
        let key = select_template_key(email.analysis.as_ref(), history);
        debug!(key, from = %email.from_addr, "Selected reply template");
        let template = self.templates.get(key);
        fill_template(&template, email, history, Utc::now().date_naive())
    }
}

/// Pick the template key. First match wins; a message with no analysis gets
/// the default.
pub fn select_template_key(
    analysis: Option<&ToneAnalysis>,
    history: &[HistoryEntry],
) -> &'static str {
    let Some(analysis) = analysis else {
        return "default";
    };

    match analysis.urgency {
        Urgency::Critical => return "urgent_critical",
        Urgency::High => return "urgent_high",
        _ => {}
    }

    match analysis.sentiment {
        Sentiment::VeryNegative if has_prior_negative(history) => return "negative_repeated",
        Sentiment::VeryNegative => return "negative_very",
        Sentiment::Negative => return "negative",
        Sentiment::VeryPositive => return "positive_very",
        Sentiment::Positive => return "positive",
        Sentiment::Neutral => {}
    }

    if history.is_empty() {
        "first_contact"
    } else if history.len() >= 3 {
        "frequent_sender"
    } else {
        "default"
    }
}

fn has_prior_negative(history: &[HistoryEntry]) -> bool {
    history.iter().any(|entry| {
        matches!(
            entry.sentiment(),
            Some(Sentiment::Negative | Sentiment::VeryNegative)
        )
    })
}

/// Substitute the known tokens. Unknown tokens are left in place; rendering
/// is deterministic given the same inputs and date.
pub fn fill_template(
    template: &str,
    email: &EmailMessage,
    history: &[HistoryEntry],
    today: NaiveDate,
) -> String {
    let (sentiment, urgency, summary) = match &email.analysis {
        Some(a) => (
            sentiment_label(a.sentiment),
            urgency_label(a.urgency),
            a.summary_text.as_str(),
        ),
        None => ("", "", ""),
    };

    let last_email_date = history
        .first()
        .and_then(|entry| entry.received_date.as_deref())
        .map(date_part)
        .unwrap_or_default();

    template
        .replace("{{SENDER_NAME}}", &sender_display_name(&email.from_addr))
        .replace("{{SUBJECT}}", email.subject.as_deref().unwrap_or(""))
        .replace("{{CURRENT_DATE}}", &today.format("%Y-%m-%d").to_string())
        .replace("{{SENTIMENT}}", sentiment)
        .replace("{{URGENCY}}", urgency)
        .replace("{{SUMMARY}}", summary)
        .replace("{{EMAIL_COUNT}}", &history.len().to_string())
        .replace("{{LAST_EMAIL_DATE}}", &last_email_date)
}

/// Derive a display name from a from-address. `Name <addr>` forms use the
/// name; bare addresses title-case the local part with dots as spaces.
pub fn sender_display_name(from_addr: &str) -> String {
    if let Some(pos) = from_addr.find('<') {
        let name = from_addr[..pos].trim();
        if !name.is_empty() {
            return name.to_string();
        }
    }

    let local = from_addr.split('@').next().unwrap_or("").trim_matches('<');
    let name = local
        .split('.')
        .filter(|word| !word.is_empty())
        .map(title_case)
        .collect::<Vec<_>>()
        .join(" ");

    if name.is_empty() {
        COURTESY_NAME.to_string()
    } else {
        name
    }
}

fn title_case(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn sentiment_label(sentiment: Sentiment) -> &'static str {
    match sentiment {
        Sentiment::VeryNegative => "very negative",
        Sentiment::Negative => "negative",
        Sentiment::Neutral => "neutral",
        Sentiment::Positive => "positive",
        Sentiment::VeryPositive => "very positive",
    }
}

fn urgency_label(urgency: Urgency) -> &'static str {
    match urgency {
        Urgency::Low => "low",
        Urgency::Normal => "normal",
        Urgency::High => "high",
        Urgency::Critical => "critical",
    }
}

/// RFC 3339 timestamps begin with the `yyyy-MM-dd` date.
fn date_part(timestamp: &str) -> String {
    timestamp.chars().take(10).collect()
}
