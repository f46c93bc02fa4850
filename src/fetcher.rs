//! Remote image fetcher with a bounded read size.

use std::time::Duration;

use async_trait::async_trait;
use http::Method;

use crate::error::EmojimiseError;
use crate::httpclient;

#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, EmojimiseError>;
}

/// GETs `url` and returns its body, rejecting responses larger than `max_bytes`.
pub struct HttpFetcher {
    timeout: Duration,
    max_bytes: u64,
}

impl HttpFetcher {
    pub fn new(timeout: Duration, max_bytes: u64) -> Self {
        Self { timeout, max_bytes }
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, EmojimiseError> {
        let resp = httpclient::send(url, Method::GET, "", Vec::new(), self.timeout)
            .await
            .map_err(|e| EmojimiseError::Unavailable(e.to_string()))?;

        if resp.status().as_u16() != 200 {
            return Err(EmojimiseError::Internal(format!(
                "fetch returned status {}",
                resp.status()
            )));
        }

        let body = resp.into_body();
        if body.len() as u64 > self.max_bytes {
            return Err(EmojimiseError::InvalidArgument(format!(
                "image exceeds max size of {} bytes",
                self.max_bytes
            )));
        }

        Ok(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FakeFetcher(Vec<u8>);

    #[async_trait]
    impl Fetcher for FakeFetcher {
        async fn fetch(&self, _url: &str) -> Result<Vec<u8>, EmojimiseError> {
            Ok(self.0.clone())
        }
    }

    #[tokio::test]
    async fn returns_configured_bytes() {
        let fetcher = FakeFetcher(vec![1, 2, 3]);
        let bytes = fetcher.fetch("http://x.test/a.jpg").await.unwrap();
        assert_eq!(bytes, vec![1, 2, 3]);
    }
}
