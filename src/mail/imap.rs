//! Unseen-message fetch via raw IMAP over TLS.
//!
//! The protocol exchange is blocking socket I/O, so [`ImapMailbox`] runs it
//! under `spawn_blocking`. Fetched messages are flagged `\Seen` and never
//! deleted; redelivery after a crash between fetch and flag is acceptable.

use std::io::Write as IoWrite;
use std::net::TcpStream;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use secrecy::ExposeSecret;
use tracing::debug;

use crate::config::MailConfig;
use crate::error::MailError;
use crate::mail::{Mailbox, RawEmail};

const READ_TIMEOUT: Duration = Duration::from_secs(30);

/// IMAP-backed inbound mailbox.
pub struct ImapMailbox {
    config: MailConfig,
}

impl ImapMailbox {
    pub fn new(config: MailConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl Mailbox for ImapMailbox {
    async fn fetch_unseen(&self) -> Result<Vec<RawEmail>, MailError> {
        let config = self.config.clone();
        tokio::task::spawn_blocking(move || fetch_unseen_imap(&config))
            .await
            .map_err(|e| MailError::Fetch(format!("fetch task panicked: {e}")))?
    }
}

type ImapStream = rustls::StreamOwned<rustls::ClientConnection, TcpStream>;
type ImapError = Box<dyn std::error::Error + Send + Sync>;

/// Fetch unseen messages (blocking). LOGIN, SELECT INBOX, SEARCH UNSEEN,
/// FETCH RFC822 per id, STORE +FLAGS \Seen, LOGOUT.
fn fetch_unseen_imap(config: &MailConfig) -> Result<Vec<RawEmail>, MailError> {
    fetch_unseen_inner(config).map_err(|e| MailError::Fetch(e.to_string()))
}

fn fetch_unseen_inner(config: &MailConfig) -> Result<Vec<RawEmail>, ImapError> {
    let tcp = TcpStream::connect((&*config.host, config.imap_port))?;
    tcp.set_read_timeout(Some(READ_TIMEOUT))?;

    let mut root_store = rustls::RootCertStore::empty();
    root_store.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
    let tls_config = Arc::new(
        rustls::ClientConfig::builder()
            .with_root_certificates(root_store)
            .with_no_client_auth(),
    );
    let server_name: rustls::pki_types::ServerName<'_> =
        rustls::pki_types::ServerName::try_from(config.host.clone())?;
    let conn = rustls::ClientConnection::new(tls_config, server_name)?;
    let mut tls = rustls::StreamOwned::new(conn, tcp);

    let _greeting = read_line(&mut tls)?;

    let login_resp = send_cmd(
        &mut tls,
        "A1",
        &format!(
            "LOGIN \"{}\" \"{}\"",
            config.user,
            config.password.expose_secret()
        ),
    )?;
    if !login_resp.last().is_some_and(|l| l.contains("OK")) {
        return Err("IMAP login failed".into());
    }

    let _select = send_cmd(&mut tls, "A2", "SELECT \"INBOX\"")?;

    let search_resp = send_cmd(&mut tls, "A3", "SEARCH UNSEEN")?;
    let mut ids: Vec<String> = Vec::new();
    for line in &search_resp {
        if line.starts_with("* SEARCH") {
            ids.extend(line.split_whitespace().skip(2).map(str::to_string));
        }
    }
    debug!(unseen = ids.len(), "Mailbox searched");

    let mut results = Vec::new();
    let mut tag_counter = 4_u32;

    for id in &ids {
        let fetch_tag = format!("A{tag_counter}");
        tag_counter += 1;
        let fetch_resp = send_cmd(&mut tls, &fetch_tag, &format!("FETCH {id} RFC822"))?;

        // The literal sits between the untagged FETCH line and the closing
        // paren + tagged OK.
        let raw: String = fetch_resp
            .iter()
            .skip(1)
            .take(fetch_resp.len().saturating_sub(2))
            .cloned()
            .collect();

        results.push(RawEmail {
            uid: id.clone(),
            data: raw.into_bytes(),
        });

        let store_tag = format!("A{tag_counter}");
        tag_counter += 1;
        let _ = send_cmd(&mut tls, &store_tag, &format!("STORE {id} +FLAGS (\\Seen)"));
    }

    let logout_tag = format!("A{tag_counter}");
    let _ = send_cmd(&mut tls, &logout_tag, "LOGOUT");

    Ok(results)
}

fn read_line(tls: &mut ImapStream) -> Result<String, ImapError> {
    let mut buf = Vec::new();
    loop {
        let mut byte = [0u8; 1];
        match std::io::Read::read(tls, &mut byte) {
            Ok(0) => return Err("IMAP connection closed".into()),
            Ok(_) => {
                buf.push(byte[0]);
                if buf.ends_with(b"\r\n") {
                    return Ok(String::from_utf8_lossy(&buf).to_string());
                }
            }
            Err(e) => return Err(e.into()),
        }
    }
}

fn send_cmd(tls: &mut ImapStream, tag: &str, cmd: &str) -> Result<Vec<String>, ImapError> {
    let full = format!("{tag} {cmd}\r\n");
    IoWrite::write_all(tls, full.as_bytes())?;
    IoWrite::flush(tls)?;
    let mut lines = Vec::new();
    loop {
        let line = read_line(tls)?;
        let done = line.starts_with(tag);
        lines.push(line);
        if done {
            break;
        }
    }
    Ok(lines)
}
