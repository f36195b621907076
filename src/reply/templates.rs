//! Durable reply-template store with an in-process cache.
//!
//! Templates live one file per key (`{key}.template`) under a configurable
//! directory. An empty or missing directory is bootstrapped with the default
//! set at startup. The cache is populated eagerly at open and lazily on
//! miss, and never invalidated — editing a template file requires a restart.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use tracing::{info, warn};

use crate::error::TemplateError;

/// Last-resort reply body when neither the requested key nor `default` is
/// readable.
pub const FALLBACK_TEMPLATE: &str = "Dear {{SENDER_NAME}},\n\n\
Thank you for your message. We have received it and will respond as soon as possible.\n\n\
Best regards,\nCustomer Service";

const TEMPLATE_EXT: &str = "template";

/// Every template key, paired with its bootstrap body.
const DEFAULT_TEMPLATES: &[(&str, &str)] = &[
    (
        "urgent_critical",
        "Dear {{SENDER_NAME}},\n\n\
We have received your message regarding \"{{SUBJECT}}\" and recognize it as critically urgent.\n\
Our team has been alerted and is treating it with the highest priority. You will hear from us shortly.\n\n\
Summary of your message: {{SUMMARY}}\n\n\
Best regards,\nCustomer Service\n{{CURRENT_DATE}}",
    ),
    (
        "urgent_high",
        "Dear {{SENDER_NAME}},\n\n\
Thank you for your message regarding \"{{SUBJECT}}\". We understand it is urgent and have\n\
prioritized it accordingly. A member of our team will get back to you as quickly as possible.\n\n\
Best regards,\nCustomer Service\n{{CURRENT_DATE}}",
    ),
    (
        "negative_repeated",
        "Dear {{SENDER_NAME}},\n\n\
We are truly sorry that your recent experiences with us have not met your expectations.\n\
We take repeated concerns very seriously. Your message regarding \"{{SUBJECT}}\" has been\n\
escalated, and a senior member of our team will contact you personally.\n\n\
Best regards,\nCustomer Service\n{{CURRENT_DATE}}",
    ),
    (
        "negative_very",
        "Dear {{SENDER_NAME}},\n\n\
We sincerely apologize for the experience described in your message regarding \"{{SUBJECT}}\".\n\
This is not the standard we hold ourselves to. Your concern has been passed to our team\n\
for immediate attention.\n\n\
Summary of your message: {{SUMMARY}}\n\n\
Best regards,\nCustomer Service\n{{CURRENT_DATE}}",
    ),
    (
        "negative",
        "Dear {{SENDER_NAME}},\n\n\
We are sorry to hear about the issue raised in your message regarding \"{{SUBJECT}}\".\n\
Thank you for bringing it to our attention; we will look into it and respond soon.\n\n\
Best regards,\nCustomer Service\n{{CURRENT_DATE}}",
    ),
    (
        "positive_very",
        "Dear {{SENDER_NAME}},\n\n\
Thank you so much for your wonderful message regarding \"{{SUBJECT}}\"! Feedback like yours\n\
makes our day. We are delighted to hear from you.\n\n\
Best regards,\nCustomer Service\n{{CURRENT_DATE}}",
    ),
    (
        "positive",
        "Dear {{SENDER_NAME}},\n\n\
Thank you for your kind message regarding \"{{SUBJECT}}\". We appreciate you taking the time\n\
to write to us.\n\n\
Best regards,\nCustomer Service\n{{CURRENT_DATE}}",
    ),
    (
        "first_contact",
        "Dear {{SENDER_NAME}},\n\n\
Welcome, and thank you for contacting us for the first time! We have received your message\n\
regarding \"{{SUBJECT}}\" and will respond as soon as possible.\n\n\
Best regards,\nCustomer Service\n{{CURRENT_DATE}}",
    ),
    (
        "frequent_sender",
        "Dear {{SENDER_NAME}},\n\n\
Thank you for writing to us again — we value your continued engagement. This is message\n\
number {{EMAIL_COUNT}} from you; your last message reached us on {{LAST_EMAIL_DATE}}.\n\
We have received your message regarding \"{{SUBJECT}}\" and will respond shortly.\n\n\
Best regards,\nCustomer Service\n{{CURRENT_DATE}}",
    ),
    (
        "default",
        "Dear {{SENDER_NAME}},\n\n\
Thank you for your message regarding \"{{SUBJECT}}\". We have received it and will respond\n\
as soon as possible.\n\n\
Best regards,\nCustomer Service\n{{CURRENT_DATE}}",
    ),
];

/// File-backed template store.
pub struct TemplateStore {
    dir: PathBuf,
    cache: RwLock<HashMap<String, String>>,
}

impl TemplateStore {
    /// Open the template directory, bootstrapping the default set when it is
    /// missing or empty, and eagerly warm the cache. An unwritable directory
    /// is fatal.
    pub fn open(dir: &Path) -> Result<Self, TemplateError> {
        fs::create_dir_all(dir)?;

        let has_templates = fs::read_dir(dir)?.filter_map(|e| e.ok()).any(|e| {
            e.path()
                .extension()
                .is_some_and(|ext| ext == TEMPLATE_EXT)
        });
        if !has_templates {
            for (key, body) in DEFAULT_TEMPLATES {
                fs::write(template_path(dir, key), body)?;
            }
            info!(
                dir = %dir.display(),
                count = DEFAULT_TEMPLATES.len(),
                "Bootstrapped default reply templates"
            );
        }

        let store = Self {
            dir: dir.to_path_buf(),
            cache: RwLock::new(HashMap::new()),
        };
        store.warm_cache();
        Ok(store)
    }

    /// Fetch the body for `key`, falling back to `default`, then to
    /// [`FALLBACK_TEMPLATE`].
    pub fn get(&self, key: &str) -> String {
        if let Some(body) = self.lookup(key) {
            return body;
        }
        warn!(key, "Template missing, falling back to default");
        if let Some(body) = self.lookup("default") {
            return body;
        }
        warn!("Default template unreadable, using built-in fallback");
        FALLBACK_TEMPLATE.to_string()
    }

    /// Cache lookup with a lazy read-through on miss. Entries are inserted at
    /// most once and never replaced.
    fn lookup(&self, key: &str) -> Option<String> {
        if let Ok(cache) = self.cache.read() {
            if let Some(body) = cache.get(key) {
                return Some(body.clone());
            }
        }

        let body = fs::read_to_string(template_path(&self.dir, key)).ok()?;
        if let Ok(mut cache) = self.cache.write() {
            // Another task may have filled this key while we read the file.
            return Some(cache.entry(key.to_string()).or_insert(body).clone());
        }
        Some(body)
    }

    fn warm_cache(&self) {
        let Ok(entries) = fs::read_dir(&self.dir) else {
            return;
        };
        let Ok(mut cache) = self.cache.write() else {
            return;
        };
        for entry in entries.filter_map(|e| e.ok()) {
            let path = entry.path();
            if path.extension().is_none_or(|ext| ext != TEMPLATE_EXT) {
                continue;
            }
            let Some(key) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            if let Ok(body) = fs::read_to_string(&path) {
                cache.entry(key.to_string()).or_insert(body);
            }
        }
    }
}

fn template_path(dir: &Path, key: &str) -> PathBuf {
    dir.join(format!("{key}.{TEMPLATE_EXT}"))
}
