//! HTTP endpoint query used by `aq watch`

use std::time::{Duration, Instant};

use async_trait::async_trait;
use eyre::{Context, Result, eyre};
use tracing::debug;

use crate::query::Query;

/// What one poll of an endpoint observed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpSnapshot {
    pub url: String,
    pub status: u16,
    pub bytes: usize,
    pub elapsed: Duration,
}

/// GETs a URL; the URL is the query parameter
pub struct HttpQuery {
    client: reqwest::Client,
}

impl HttpQuery {
    /// Create a query whose requests time out after `timeout`
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Query<String> for HttpQuery {
    type Output = HttpSnapshot;

    async fn run(&self, url: String) -> Result<HttpSnapshot> {
        debug!(%url, "HttpQuery::run: called");
        let started = Instant::now();

        let response = self.client.get(&url).send().await?;
        let status = response.status();
        let body = response.bytes().await?;

        if status.is_server_error() {
            return Err(eyre!("{} returned {}", url, status));
        }

        Ok(HttpSnapshot {
            url,
            status: status.as_u16(),
            bytes: body.len(),
            elapsed: started.elapsed(),
        })
    }
}

/// Connect failures and timeouts mean the endpoint is unreachable
pub fn is_connection_error(err: &eyre::Report) -> bool {
    err.chain().any(|cause| {
        cause
            .downcast_ref::<reqwest::Error>()
            .is_some_and(|e| e.is_connect() || e.is_timeout())
    })
}
