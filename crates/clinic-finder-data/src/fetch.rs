use futures::StreamExt;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{info, instrument};

use crate::Result;

/// Download the clinic CSV into memory, showing a progress bar on a terminal.
#[instrument(name = "Download clinic CSV", skip_all, level = "info")]
pub async fn download_csv(url: &str) -> Result<Vec<u8>> {
    info!(url, "Starting download");
    let client = reqwest::Client::new();
    let response = client.get(url).send().await?.error_for_status()?;

    let total_size = response.content_length().unwrap_or(0);

    let pb = ProgressBar::new(total_size);
    if let Ok(style) = ProgressStyle::default_bar().template(
        "{msg}\n{spinner:.green} [{elapsed_precise}] [{wide_bar:.cyan/blue}] {bytes}/{total_bytes} ({bytes_per_sec}, {eta})",
    ) {
        pb.set_style(style.progress_chars("█░"));
    }
    pb.set_message(format!(
        "Downloading {}",
        url.split('/').next_back().unwrap_or(url)
    ));

    let mut bytes = Vec::with_capacity(usize::try_from(total_size).unwrap_or_default());
    let mut stream = response.bytes_stream();
    while let Some(item) = stream.next().await {
        let chunk = item?;
        bytes.extend_from_slice(&chunk);
        pb.inc(chunk.len() as u64);
    }
    pb.finish_and_clear();

    info!(url, bytes = bytes.len(), "Download complete");
    Ok(bytes)
}
