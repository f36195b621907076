use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Duration;

use tonereply::analyzer::LlmToneAnalyzer;
use tonereply::config::AppConfig;
use tonereply::mail::{ImapMailbox, SmtpMailSender};
use tonereply::pipeline::{EmailPipeline, spawn_mail_poller};
use tonereply::reply::{ReplyEngine, TemplateStore};
use tonereply::retry::RetryPolicy;
use tonereply::store::EmailStore;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Install rustls crypto provider before any TLS usage
    rustls::crypto::ring::default_provider()
        .install_default()
        .expect("Failed to install rustls crypto provider");

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let config = AppConfig::from_env();

    eprintln!("📬 tonereply v{}", env!("CARGO_PKG_VERSION"));
    eprintln!(
        "   Mail: {} (IMAP {}, SMTP {})",
        config.mail.host, config.mail.imap_port, config.mail.smtp_port
    );
    eprintln!("   LLM: {} ({})", config.llm.api_url, config.llm.model);
    eprintln!("   Database: {}", config.database_path.display());
    eprintln!("   Templates: {}", config.templates_dir.display());
    eprintln!("   Poll interval: {}s\n", config.mail.poll_interval_secs);

    let store = Arc::new(
        EmailStore::new_local(&config.database_path)
            .await
            .unwrap_or_else(|e| {
                eprintln!(
                    "Error: Failed to open database at {}: {}",
                    config.database_path.display(),
                    e
                );
                std::process::exit(1);
            }),
    );

    let templates = TemplateStore::open(&config.templates_dir).unwrap_or_else(|e| {
        eprintln!(
            "Error: Failed to open template directory {}: {}",
            config.templates_dir.display(),
            e
        );
        std::process::exit(1);
    });
    let replies = Arc::new(ReplyEngine::new(templates));

    let analyzer = Arc::new(LlmToneAnalyzer::new(
        config.llm.api_url.clone(),
        config.llm.model.clone(),
    ));
    let mailbox = Arc::new(ImapMailbox::new(config.mail.clone()));
    let sender = Arc::new(SmtpMailSender::new(config.mail.clone()));

    let pipeline = Arc::new(EmailPipeline::new(
        store,
        analyzer,
        replies,
        sender,
        RetryPolicy::default(),
    ));

    let (poller, shutdown) = spawn_mail_poller(
        mailbox,
        pipeline,
        Duration::from_secs(config.mail.poll_interval_secs),
        RetryPolicy::default(),
    );

    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutdown signal received");
    shutdown.store(true, Ordering::Relaxed);
    poller.abort();

    Ok(())
}
