//! Configuration from environment variables. Every setting has a default
//! suitable for local development against a test mail server and a local
//! LLM backend.

use std::path::PathBuf;

use secrecy::SecretString;

/// Mail server settings, shared by the IMAP and SMTP sides.
#[derive(Debug, Clone)]
pub struct MailConfig {
    pub host: String,
    pub imap_port: u16,
    pub smtp_port: u16,
    pub user: String,
    pub password: SecretString,
    pub from_address: String,
    pub poll_interval_secs: u64,
}

/// Tone-analysis backend settings.
#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub api_url: String,
    pub model: String,
}

/// Full application configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub mail: MailConfig,
    pub llm: LlmConfig,
    pub database_path: PathBuf,
    pub templates_dir: PathBuf,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let user = env_or("EMAIL_USER", "test@example.com");
        let from_address = std::env::var("EMAIL_FROM_ADDRESS").unwrap_or_else(|_| user.clone());

        Self {
            mail: MailConfig {
                host: env_or("EMAIL_HOST", "localhost"),
                imap_port: env_parse_or("EMAIL_IMAP_PORT", 993),
                smtp_port: env_parse_or("EMAIL_SMTP_PORT", 1025),
                user,
                password: SecretString::from(env_or("EMAIL_PASSWORD", "password")),
                from_address,
                poll_interval_secs: env_parse_or("EMAIL_POLL_INTERVAL_SECS", 60),
            },
            llm: LlmConfig {
                api_url: env_or("LLM_API_URL", "http://localhost:11434"),
                model: env_or("LLM_MODEL", "llama2"),
            },
            database_path: PathBuf::from(env_or("DATABASE_PATH", "data/emails.db")),
            templates_dir: PathBuf::from(env_or("TEMPLATES_DIR", "data/templates")),
        }
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_parse_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}
