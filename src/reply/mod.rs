//! Reply generation: template storage and history-aware composition.

pub mod engine;
pub mod templates;

pub use engine::{ReplyEngine, fill_template, select_template_key, sender_display_name};
pub use templates::{FALLBACK_TEMPLATE, TemplateStore};
