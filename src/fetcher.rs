use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use thiserror::Error;
use tokio::sync::Semaphore;
use tracing::{info, warn};

use crate::settings::Settings;

/// Why a page could not be retrieved. Terminal for that record only.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FetchError {
    #[error("transport error: {0}")]
    Transport(String),
    #[error("HTTP {0}")]
    Status(u16),
}

#[derive(Debug, Clone)]
pub struct Page {
    pub body: String,
    pub content_type: Option<String>,
}

/// Fetch stats returned after completion.
pub struct FetchStats {
    pub total: usize,
    pub ok: usize,
    pub errors: usize,
}

pub fn client(settings: &Settings) -> Result<Client> {
    Client::builder()
        .user_agent(settings.user_agent.as_str())
        .timeout(settings.timeout())
        .build()
        .context("Failed to build HTTP client")
}

/// Fetch every `(index, url)` with at most `concurrency` requests in flight.
/// Slot `i` of the result holds the outcome for index `i`; indices not in
/// `targets` stay `None`.
pub async fn fetch_all(
    client: &Client,
    targets: Vec<(usize, String)>,
    slots: usize,
    concurrency: usize,
) -> Result<(Vec<Option<Result<Page, FetchError>>>, FetchStats)> {
    let concurrency = concurrency.max(1);
    let semaphore = Arc::new(Semaphore::new(concurrency));
    let total = targets.len();

    let pb = ProgressBar::new(total as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40} {pos}/{len} ({per_sec}, eta {eta})")?
            .progress_chars("=> "),
    );

    // Workers send (index, outcome); the receiver files each into its slot
    let (tx, mut rx) =
        tokio::sync::mpsc::channel::<(usize, Result<Page, FetchError>)>(concurrency * 2);

    for (index, url) in targets {
        let client = client.clone();
        let sem = Arc::clone(&semaphore);
        let tx = tx.clone();

        tokio::spawn(async move {
            let outcome = match sem.acquire_owned().await {
                Ok(_permit) => {
                    info!("[{}] Fetching {}", index, url);
                    fetch_one(&client, &url).await
                }
                Err(e) => Err(FetchError::Transport(e.to_string())),
            };
            if let Err(e) = &outcome {
                warn!("[{}] Failed to fetch {}: {}", index, url, e);
            }
            let _ = tx.send((index, outcome)).await;
        });
    }

    drop(tx);

    let mut results: Vec<Option<Result<Page, FetchError>>> = vec![None; slots];
    let mut ok = 0usize;
    let mut errors = 0usize;

    while let Some((index, outcome)) = rx.recv().await {
        if outcome.is_ok() {
            ok += 1;
        } else {
            errors += 1;
        }
        if let Some(slot) = results.get_mut(index) {
            *slot = Some(outcome);
        }
        pb.inc(1);
    }

    pb.finish_and_clear();
    info!("Fetched {} pages ({} ok, {} errors)", total, ok, errors);

    Ok((results, FetchStats { total, ok, errors }))
}

/// Single GET, no retry. Non-2xx is a `Status` error.
pub async fn fetch_one(client: &Client, url: &str) -> Result<Page, FetchError> {
    let start = Instant::now();
    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| FetchError::Transport(e.to_string()))?;

    let status = response.status();
    if !status.is_success() {
        return Err(FetchError::Status(status.as_u16()));
    }

    let content_type = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let body = response
        .text()
        .await
        .map_err(|e| FetchError::Transport(e.to_string()))?;

    tracing::debug!(
        url,
        bytes = body.len(),
        latency_ms = start.elapsed().as_millis() as u64,
        "page fetched"
    );

    Ok(Page { body, content_type })
}

impl FetchError {
    /// Value of the `fetch_status` output column.
    pub fn status_label(&self) -> String {
        match self {
            FetchError::Transport(_) => "fetch-failed".to_string(),
            FetchError::Status(code) => format!("http-{}", code),
        }
    }
}
