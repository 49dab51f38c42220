//! HTTP access to the availability feed.

mod basic;

pub use basic::BasicClient;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Request, Response};
use tracing::debug;

/// Executes prepared requests. Lets tests and wrappers stand in for the
/// real network client.
#[async_trait]
pub trait HttpClient: Send + Sync {
    async fn execute(&self, req: Request) -> reqwest::Result<Response>;
}

/// GETs `url` and returns the body, failing on a non-success status.
pub async fn fetch_bytes<C: HttpClient + ?Sized>(client: &C, url: &str) -> Result<Vec<u8>> {
    let req = Request::new(
        reqwest::Method::GET,
        url.parse().with_context(|| format!("invalid feed URL {url}"))?,
    );

    let resp = client
        .execute(req)
        .await
        .with_context(|| format!("GET {url}"))?
        .error_for_status()?;

    let bytes = resp.bytes().await?;
    debug!(url, bytes = bytes.len(), "Feed body received");
    Ok(bytes.to_vec())
}
