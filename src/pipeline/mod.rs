//! Message pipeline: lifecycle state machine, orchestration, and the
//! mailbox poll loop.

pub mod orchestrator;
pub mod poller;
pub mod state;

pub use orchestrator::{EmailPipeline, ReplyOutcome};
pub use poller::spawn_mail_poller;
pub use state::{InvalidTransition, PipelineEvent};
