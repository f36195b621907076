//! Auto-reply decision rule.

use crate::analysis::{Sentiment, Urgency};
use crate::model::EmailMessage;

/// Decide whether a message warrants an automatic reply.
///
/// Pure function of the message's analysis; consults no history and no
/// external service. Absent analysis means no reply. Any match wins:
/// urgency HIGH/CRITICAL, or sentiment NEGATIVE/VERY_NEGATIVE.
pub fn should_auto_reply(email: &EmailMessage) -> bool {
    let Some(analysis) = &email.analysis else {
        return false;
    };

    matches!(analysis.urgency, Urgency::High | Urgency::Critical)
        || matches!(
            analysis.sentiment,
            Sentiment::Negative | Sentiment::VeryNegative
        )
}
