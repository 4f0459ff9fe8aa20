use std::time::Duration;

use anyhow::{bail, Context, Error};
use log::debug;
use reqwest::StatusCode;
use url::Url;

/// Upper bound for a single download, so a stalled server cannot hang the run.
pub const GET_TIMEOUT_SECS: u64 = 60;

/// Performs a single blocking GET request and returns the body.
///
/// Anything other than `200 OK` is an error that carries the status code.
pub fn get_bytes(url: &str, timeout: Duration) -> Result<Vec<u8>, Error> {
    let url = Url::parse(url).with_context(|| format!("Invalid URL '{url}'"))?;
    let client = reqwest::blocking::ClientBuilder::new()
        .timeout(timeout)
        .build()
        .context("Failed to create HTTP client")?;

    debug!("Downloading '{url}'");
    let response = client
        .get(url.clone())
        .send()
        .with_context(|| format!("Failed to GET {url}"))?;

    if response.status() != StatusCode::OK {
        bail!("Failed to GET {url} with status {}", response.status());
    }

    let body = response
        .bytes()
        .with_context(|| format!("Failed to read response body from {url}"))?;
    debug!("Downloaded {} bytes from '{url}'", body.len());

    Ok(body.to_vec())
}
