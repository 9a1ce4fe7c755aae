use futures_util::StreamExt;
use reqwest::StatusCode;
use std::path::Path;
use tokio::io::AsyncWriteExt;

use crate::backoff::sleep_backoff;
use crate::error::AudioError;

pub(super) async fn download_to_path(
    http: &reqwest::Client,
    out_path: &Path,
    url: &str,
    retries: u32,
    backoff_ms: u64,
    backoff_max_ms: u64,
) -> Result<(), AudioError> {
    let fail = |message: String| AudioError::Download {
        url: url.to_owned(),
        message,
    };

    let mut attempt = 0;
    loop {
        match download_once(http, out_path, url).await {
            Ok(()) => return Ok(()),
            Err((message, retryable)) if retryable && attempt < retries => {
                tracing::debug!(attempt, url, err = %message, "audio download failed, retrying");
                sleep_backoff(attempt, backoff_ms, backoff_max_ms).await;
                attempt += 1;
            }
            Err((message, _)) => return Err(fail(message)),
        }
    }
}

/// One attempt; the flag tells whether another attempt may help.
async fn download_once(
    http: &reqwest::Client,
    out_path: &Path,
    url: &str,
) -> Result<(), (String, bool)> {
    let resp = http
        .get(url)
        .send()
        .await
        .map_err(|e| (e.to_string(), true))?;

    let status = resp.status();
    if !status.is_success() {
        return Err((format!("HTTP {status}"), is_retryable_status(status)));
    }

    // Each attempt starts from an empty file.
    let mut file = tokio::fs::File::create(out_path)
        .await
        .map_err(|e| (format!("create file: {e}"), false))?;

    let mut stream = resp.bytes_stream();
    while let Some(chunk) = stream.next().await {
        let bytes = chunk.map_err(|e| (e.to_string(), true))?;
        file.write_all(&bytes)
            .await
            .map_err(|e| (format!("write file: {e}"), false))?;
    }
    file.flush()
        .await
        .map_err(|e| (format!("write file: {e}"), false))?;
    Ok(())
}

fn is_retryable_status(status: StatusCode) -> bool {
    status == StatusCode::REQUEST_TIMEOUT
        || status == StatusCode::TOO_MANY_REQUESTS
        || status.is_server_error()
}
