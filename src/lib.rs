//! tonereply — tone-aware email auto-reply pipeline.
//!
//! Polls a mailbox for unseen messages, runs each through an LLM tone
//! analysis, and — when the decision rule warrants it — sends a templated
//! reply informed by the sender's communication history.

pub mod analysis;
pub mod analyzer;
pub mod config;
pub mod decision;
pub mod error;
pub mod mail;
pub mod model;
pub mod parser;
pub mod pipeline;
pub mod reply;
pub mod retry;
pub mod store;
