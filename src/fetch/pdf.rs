use anyhow::{Context, Result};
use reqwest::blocking::Client;
use std::io::Write;
use tempfile::NamedTempFile;
use tracing::debug;
use url::Url;

/// Download `url` into a named temp file. The file is deleted when the
/// returned handle is dropped.
pub fn download_to_temp(client: &Client, url: &Url) -> Result<NamedTempFile> {
    let mut resp = client
        .get(url.as_str())
        .send()
        .with_context(|| format!("GET {}", url))?
        .error_for_status()?;

    let mut file = tempfile::Builder::new()
        .prefix("visa-report-")
        .suffix(".pdf")
        .tempfile()
        .context("creating temp file for download")?;
    let size = resp
        .copy_to(&mut file)
        .with_context(|| format!("writing body of {}", url))?;
    file.flush()?;

    debug!(url = %url, size, "downloaded document");
    Ok(file)
}
