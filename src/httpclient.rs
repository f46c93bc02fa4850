//! Scheme-aware outbound HTTP helper built directly on [`crate::client`].
//!
//! The cache, face-detector and image-fetcher collaborators all need the same
//! shape of request: connect to a host (plain or TLS), send one request, read
//! the full response body, apply a deadline. This wraps the `TakoClient`/
//! `TakoTlsClient` one-shot connect-then-request primitives from `client.rs`
//! rather than pulling in a separate HTTP client crate.

use std::time::Duration;

use bytes::Bytes;
use http::{Request, Response, Uri};
use http_body_util::Full;

use crate::client::{TakoClient, TakoTlsClient};

#[derive(Debug, thiserror::Error)]
pub enum HttpClientError {
    #[error("invalid url: {0}")]
    InvalidUrl(String),
    #[error("connection error: {0}")]
    Connection(String),
    #[error("request timed out after {0:?}")]
    Timeout(Duration),
}

/// Parsed connection target: scheme, host, port and path+query.
struct Target {
    tls: bool,
    host: String,
    port: Option<u16>,
    path_and_query: String,
}

fn parse(url: &str) -> Result<Target, HttpClientError> {
    let uri: Uri = url
        .parse()
        .map_err(|_| HttpClientError::InvalidUrl(url.to_string()))?;
    let scheme = uri.scheme_str().unwrap_or("http");
    let tls = match scheme {
        "http" => false,
        "https" => true,
        other => return Err(HttpClientError::InvalidUrl(format!("unsupported scheme {other}"))),
    };
    let host = uri
        .host()
        .ok_or_else(|| HttpClientError::InvalidUrl(url.to_string()))?
        .to_string();
    let port = uri.port_u16();
    let path_and_query = uri
        .path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| "/".to_string());

    Ok(Target {
        tls,
        host,
        port,
        path_and_query,
    })
}

/// Sends a single request against `base_url` + `path`, with `body` as the
/// request payload, bounded by `timeout`.
pub async fn send(
    base_url: &str,
    method: http::Method,
    path: &str,
    body: Vec<u8>,
    timeout: Duration,
) -> Result<Response<Vec<u8>>, HttpClientError> {
    let joined = join(base_url, path);
    let target = parse(&joined)?;

    tokio::time::timeout(timeout, async move {
        let req = Request::builder()
            .method(method)
            .uri(target.path_and_query.clone())
            .header("host", target.host.clone())
            .body(Full::from(Bytes::from(body)))
            .map_err(|e| HttpClientError::Connection(e.to_string()))?;

        if target.tls {
            let mut client = TakoTlsClient::<Full<Bytes>>::new(&target.host, target.port)
                .await
                .map_err(|e| HttpClientError::Connection(e.to_string()))?;
            client
                .request(req)
                .await
                .map_err(|e| HttpClientError::Connection(e.to_string()))
        } else {
            let mut client = TakoClient::<Full<Bytes>>::new(&target.host, target.port)
                .await
                .map_err(|e| HttpClientError::Connection(e.to_string()))?;
            client
                .request(req)
                .await
                .map_err(|e| HttpClientError::Connection(e.to_string()))
        }
    })
    .await
    .map_err(|_| HttpClientError::Timeout(timeout))?
}

fn join(base: &str, path: &str) -> String {
    if path.is_empty() {
        return base.to_string();
    }
    let base = base.trim_end_matches('/');
    let path = path.trim_start_matches('/');
    format!("{base}/{path}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn joins_base_and_path_without_double_slash() {
        assert_eq!(join("http://cache:9000/", "/v1/get"), "http://cache:9000/v1/get");
        assert_eq!(join("http://cache:9000", "v1/get"), "http://cache:9000/v1/get");
    }

    #[test]
    fn empty_path_returns_base_unchanged() {
        assert_eq!(join("http://x.test/a.jpg", ""), "http://x.test/a.jpg");
    }

    #[test]
    fn parses_https_target() {
        let t = parse("https://cache.example.com:8443/v1/exists").unwrap();
        assert!(t.tls);
        assert_eq!(t.host, "cache.example.com");
        assert_eq!(t.port, Some(8443));
        assert_eq!(t.path_and_query, "/v1/exists");
    }

    #[test]
    fn rejects_unsupported_scheme() {
        assert!(parse("ftp://x/y").is_err());
    }
}
