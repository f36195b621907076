//! Mail transport seams: inbound mailbox polling and outbound delivery.
//!
//! The pipeline depends only on the [`Mailbox`] and [`MailSender`] traits so
//! tests can substitute in-memory fakes for the IMAP/SMTP implementations.

pub mod imap;
pub mod smtp;

use async_trait::async_trait;

use crate::error::MailError;

pub use imap::ImapMailbox;
pub use smtp::SmtpMailSender;

/// An unparsed message as fetched from the mailbox.
#[derive(Debug, Clone)]
pub struct RawEmail {
    /// Mailbox sequence identifier, carried for logging only.
    pub uid: String,
    pub data: Vec<u8>,
}

/// Inbound mailbox. One fetch returns every currently-unseen message and
/// marks it seen; messages are never deleted.
#[async_trait]
pub trait Mailbox: Send + Sync {
    async fn fetch_unseen(&self) -> Result<Vec<RawEmail>, MailError>;
}

/// Outbound mail delivery.
#[async_trait]
pub trait MailSender: Send + Sync {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), MailError>;
}
