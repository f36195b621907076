//! Raw mail parsing — pure transformation from RFC 822 bytes to the
//! domain model. Persistence is the orchestrator's job, not the parser's.

use chrono::{DateTime, Utc};
use mail_parser::{Message, MessageParser, MimeHeaders, PartType};

use crate::error::ParseError;
use crate::model::{Attachment, EmailMessage};

/// Body text used when the top-level MIME type is not plain, HTML, or
/// multipart.
pub const UNSUPPORTED_FORMAT_PLACEHOLDER: &str = "(unsupported message format)";

/// Parse a raw mail object into a structured message record.
///
/// Body classification: plain text is taken verbatim; HTML is stripped of
/// tags (entities are not decoded); multipart bodies are walked depth-first
/// with every plain/HTML leaf concatenated in encounter order.
pub fn parse_email(raw: &[u8]) -> Result<EmailMessage, ParseError> {
    let parsed = MessageParser::default()
        .parse(raw)
        .ok_or(ParseError::Unparseable)?;

    let from_addr = parsed
        .from()
        .and_then(|addrs| addrs.first())
        .map(format_addr)
        .unwrap_or_else(|| "unknown".to_string());

    let to_addr = parsed
        .to()
        .map(|addrs| {
            addrs
                .iter()
                .map(format_addr)
                .collect::<Vec<_>>()
                .join(", ")
        })
        .unwrap_or_default();

    let subject = parsed.subject().map(str::to_string);
    let received_at = parsed
        .date()
        .and_then(|d| DateTime::from_timestamp(d.to_timestamp(), 0))
        .unwrap_or_else(Utc::now);

    Ok(EmailMessage::received(
        from_addr,
        to_addr,
        subject,
        Some(extract_body(&parsed)),
        received_at,
    ))
}

/// Extract attachments: parts whose disposition is "attachment" or that
/// carry a filename. Parts lacking both are not attachments.
pub fn extract_attachments(raw: &[u8]) -> Vec<Attachment> {
    let Some(parsed) = MessageParser::default().parse(raw) else {
        return Vec::new();
    };

    let mut attachments = Vec::new();
    for (i, part) in parsed.parts.iter().enumerate() {
        let is_attachment = part
            .content_disposition()
            .is_some_and(|cd| cd.ctype().eq_ignore_ascii_case("attachment"));
        let file_name = part.attachment_name();
        if !is_attachment && file_name.is_none() {
            continue;
        }

        let content_type = part
            .content_type()
            .map(|ct| match ct.subtype() {
                Some(sub) => format!("{}/{}", ct.ctype(), sub),
                None => ct.ctype().to_string(),
            })
            .unwrap_or_else(|| "application/octet-stream".to_string());

        attachments.push(Attachment {
            file_name: file_name
                .map(str::to_string)
                .unwrap_or_else(|| format!("attachment-{i}")),
            content_type,
            data: part.contents().to_vec(),
        });
    }
    attachments
}

/// Flatten the message body according to the top-level MIME type.
fn extract_body(parsed: &Message<'_>) -> String {
    match parsed.parts.first().map(|p| &p.body) {
        Some(PartType::Text(text)) => text.to_string(),
        Some(PartType::Html(html)) => strip_html(html),
        Some(PartType::Multipart(children)) => {
            let mut out = String::new();
            for &child in children {
                flatten_part(parsed, child as usize, &mut out);
            }
            out
        }
        _ => UNSUPPORTED_FORMAT_PLACEHOLDER.to_string(),
    }
}

/// Depth-first walk appending every plain/HTML leaf in encounter order.
fn flatten_part(parsed: &Message<'_>, idx: usize, out: &mut String) {
    let Some(part) = parsed.parts.get(idx) else {
        return;
    };
    match &part.body {
        PartType::Text(text) => out.push_str(text),
        PartType::Html(html) => out.push_str(&strip_html(html)),
        PartType::Multipart(children) => {
            for &child in children {
                flatten_part(parsed, child as usize, out);
            }
        }
        _ => {}
    }
}

/// Strip HTML tags via simple tag removal. Not a full HTML parser —
/// entities are left undecoded.
pub fn strip_html(html: &str) -> String {
    let mut out = String::with_capacity(html.len());
    let mut in_tag = false;
    for ch in html.chars() {
        match ch {
            '<' => in_tag = true,
            '>' => in_tag = false,
            _ if !in_tag => out.push(ch),
            _ => {}
        }
    }
    out
}

/// Render an address as `Name <addr>` when a display name is present.
fn format_addr(addr: &mail_parser::Addr<'_>) -> String {
    let address = addr.address.as_deref().unwrap_or("unknown");
    match addr.name.as_deref() {
        Some(name) if !name.is_empty() => format!("{name} <{address}>"),
        _ => address.to_string(),
    }
}
