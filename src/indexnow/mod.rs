//! Post-build IndexNow notification.
//!
//! Publishes the ownership key file into the build output and pings the IndexNow aggregator
//! with the modified pages plus a fixed set of canonical ones. Nothing in here may fail the
//! build: every problem is logged and turned into a `RunOutcome`.

mod client;
mod config;
mod error;
mod urls;

use std::path::{Path, PathBuf};

use tracing::{error, info, warn};

pub use client::{IndexNowClient, IndexNowPayload, PingReport};
pub use config::{IndexNowConfig, DEFAULT_BASE_URL, DEFAULT_ENDPOINT};
pub use error::{IndexNowError, IndexNowResult};
pub use urls::{build_url_list, parse_modified_urls, qualify, FALLBACK_PATHS};

/// Longest response body excerpt written to the logs.
const LOGGED_BODY_CHARS: usize = 200;

/// How a notifier run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// No key configured, nothing was written or sent.
    Skipped,
    /// The base url or the endpoint could not be parsed, nothing was written or sent.
    Misconfigured,
    KeyFileFailed,
    Pinged { status: u16 },
    Rejected { status: u16 },
    NetworkFailed,
}

pub fn key_file_name(key: &str) -> String {
    format!("indexnow-{key}.txt")
}

/// Public url of the key file, `base_url` must not end with a slash.
pub fn key_location(base_url: &str, key: &str) -> String {
    format!("{base_url}/{}", key_file_name(key))
}

/// Writes `<key>\n` to `<build_root>/indexnow-<key>.txt` and returns the written path.
pub async fn write_key_file(build_root: &Path, key: &str) -> IndexNowResult<PathBuf> {
    let path = build_root.join(key_file_name(key));

    tokio::fs::write(&path, format!("{key}\n"))
        .await
        .map_err(|source| IndexNowError::KeyFile {
            path: path.clone(),
            source,
        })?;

    Ok(path)
}

/// `host[:port]` of the base url, the port is only present when it is not the scheme default.
pub fn host_of(base_url: &str) -> IndexNowResult<String> {
    let url = reqwest::Url::parse(base_url).map_err(|e| IndexNowError::UrlParsing(e.to_string()))?;
    let host = url
        .host_str()
        .ok_or_else(|| IndexNowError::UrlParsing(format!("no host in '{base_url}'")))?;

    Ok(match url.port() {
        Some(port) => format!("{host}:{port}"),
        None => host.to_string(),
    })
}

pub fn truncate(body: &str, max_chars: usize) -> &str {
    match body.char_indices().nth(max_chars) {
        Some((idx, _)) => &body[..idx],
        None => body,
    }
}

/// Runs the whole notification once: key file first, then a single ping.
pub async fn run(config: &IndexNowConfig) -> RunOutcome {
    let key = match config.require_key() {
        Ok(key) => key,
        Err(er) => {
            warn!("[IndexNow] {er}, key file and ping skipped");
            return RunOutcome::Skipped;
        }
    };
    let base_url = config.base_url();

    let host = match host_of(base_url) {
        Ok(host) => host,
        Err(er) => {
            error!("[IndexNow] Invalid BASE_URL '{base_url}': {er}");
            return RunOutcome::Misconfigured;
        }
    };
    let client = match IndexNowClient::new(&config.endpoint) {
        Ok(client) => client,
        Err(er) => {
            error!("[IndexNow] Invalid endpoint '{}': {er}", config.endpoint);
            return RunOutcome::Misconfigured;
        }
    };

    match write_key_file(&config.build_root, key).await {
        Ok(path) => info!("[IndexNow] Key file written: {}", path.display()),
        Err(er) => {
            error!("[IndexNow] {er}");
            return RunOutcome::KeyFileFailed;
        }
    }

    let modified = parse_modified_urls(&config.modified_urls);
    let url_list = build_url_list(base_url, &modified);
    let key_location = key_location(base_url, key);
    let payload = IndexNowPayload {
        host: &host,
        key,
        key_location: &key_location,
        url_list: &url_list,
    };

    info!(
        "[IndexNow] Pinging {} with {} url(s)",
        client.endpoint,
        url_list.len()
    );

    match client.ping(&payload).await {
        Ok(report) => {
            info!(
                "[IndexNow] Ping OK: {} body: {}",
                report.status,
                truncate(&report.body, LOGGED_BODY_CHARS)
            );
            RunOutcome::Pinged {
                status: report.status,
            }
        }
        Err(IndexNowError::RemoteRejected { status, body }) => {
            warn!(
                "[IndexNow] Ping failed: {status} body: {}",
                truncate(&body, LOGGED_BODY_CHARS)
            );
            RunOutcome::Rejected { status }
        }
        Err(er) => {
            warn!("[IndexNow] Network error: {er}");
            RunOutcome::NetworkFailed
        }
    }
}
