//! Error types for tonereply.

use crate::pipeline::state::InvalidTransition;

/// Top-level error type.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    #[error("Mail error: {0}")]
    Mail(#[from] MailError),

    #[error("Template error: {0}")]
    Template(#[from] TemplateError),

    #[error("Pipeline error: {0}")]
    Pipeline(#[from] PipelineError),
}

/// Database-related errors.
#[derive(Debug, thiserror::Error)]
pub enum DatabaseError {
    #[error("Connection failed: {0}")]
    Connection(String),

    #[error("Query failed: {0}")]
    Query(String),

    #[error("Schema creation failed: {0}")]
    Schema(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Mail transport errors (IMAP fetch, SMTP send).
#[derive(Debug, thiserror::Error)]
pub enum MailError {
    #[error("Mailbox fetch failed: {0}")]
    Fetch(String),

    #[error("Mail send failed: {0}")]
    Send(String),
}

/// Tone-analysis backend errors.
///
/// Internal to the analyzer — every variant collapses to the fallback
/// analysis before leaving the module.
#[derive(Debug, thiserror::Error)]
pub enum AnalyzerError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Backend returned status {0}")]
    Status(u16),
}

/// Reply-template store errors.
#[derive(Debug, thiserror::Error)]
pub enum TemplateError {
    #[error("Template store unwritable: {0}")]
    Io(#[from] std::io::Error),
}

/// Message parsing errors.
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("Message could not be parsed")]
    Unparseable,
}

/// Pipeline-stage errors. Anything surfacing here moves the message to ERROR.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    #[error("Status transition error: {0}")]
    Transition(#[from] InvalidTransition),
}

/// Result type alias for the crate.
pub type Result<T> = std::result::Result<T, Error>;
