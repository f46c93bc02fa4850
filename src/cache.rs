//! Client for the remote key/value result cache.
//!
//! The cache stores the final encoded image per job `id`. `Exists` drives the
//! admission layer's dedup decision; `Put` is the worker's final pipeline
//! stage.

use std::time::Duration;

use async_trait::async_trait;
use http::Method;
use serde::{Deserialize, Serialize};

use crate::error::EmojimiseError;
use crate::httpclient;

#[async_trait]
pub trait Cache: Send + Sync {
    async fn exists(&self, id: &str) -> Result<bool, EmojimiseError>;
    async fn get(&self, id: &str) -> Result<Vec<u8>, EmojimiseError>;
    async fn put(&self, id: &str, data: Vec<u8>) -> Result<(), EmojimiseError>;
}

#[derive(Serialize)]
struct StringValueReq<'a> {
    value: &'a str,
}

#[derive(Deserialize)]
struct BoolValueResp {
    value: bool,
}

#[derive(Serialize)]
struct CacheItemReq<'a> {
    id: &'a str,
    data: String,
}

#[derive(Deserialize)]
struct CacheItemResp {
    #[allow(dead_code)]
    id: String,
    data: String,
}

/// HTTP/JSON client against `CACHE_ADDRESS`, mirroring the Exists/Get/Put RPC
/// shape described for the cache service.
pub struct HttpCache {
    base_url: String,
    timeout: Duration,
}

impl HttpCache {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            base_url: base_url.into(),
            timeout,
        }
    }

    async fn post_json<Req: Serialize + Sync, Resp: for<'de> Deserialize<'de>>(
        &self,
        path: &str,
        req: &Req,
    ) -> Result<Resp, EmojimiseError> {
        let body = serde_json::to_vec(req).map_err(EmojimiseError::internal)?;
        let resp = httpclient::send(&self.base_url, Method::POST, path, body, self.timeout)
            .await
            .map_err(|e| EmojimiseError::Unavailable(e.to_string()))?;

        match resp.status().as_u16() {
            200 => serde_json::from_slice(resp.body()).map_err(EmojimiseError::internal),
            404 => Err(EmojimiseError::NotFound(format!("cache miss at {path}"))),
            status => Err(EmojimiseError::Internal(format!(
                "cache returned status {status}"
            ))),
        }
    }
}

#[async_trait]
impl Cache for HttpCache {
    async fn exists(&self, id: &str) -> Result<bool, EmojimiseError> {
        let resp: BoolValueResp = self
            .post_json("/v1/exists", &StringValueReq { value: id })
            .await?;
        Ok(resp.value)
    }

    async fn get(&self, id: &str) -> Result<Vec<u8>, EmojimiseError> {
        let resp: CacheItemResp = self
            .post_json("/v1/get", &StringValueReq { value: id })
            .await?;
        base64::Engine::decode(&base64::engine::general_purpose::STANDARD, resp.data)
            .map_err(EmojimiseError::internal)
    }

    async fn put(&self, id: &str, data: Vec<u8>) -> Result<(), EmojimiseError> {
        let encoded = base64::Engine::encode(&base64::engine::general_purpose::STANDARD, data);
        let _resp: StringValueResp = self
            .post_json(
                "/v1/put",
                &CacheItemReq {
                    id,
                    data: encoded,
                },
            )
            .await?;
        Ok(())
    }
}

#[derive(Deserialize)]
struct StringValueResp {
    #[allow(dead_code)]
    value: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FakeCache {
        has: std::sync::Mutex<std::collections::HashSet<String>>,
    }

    #[async_trait]
    impl Cache for FakeCache {
        async fn exists(&self, id: &str) -> Result<bool, EmojimiseError> {
            Ok(self.has.lock().unwrap().contains(id))
        }
        async fn get(&self, _id: &str) -> Result<Vec<u8>, EmojimiseError> {
            Ok(vec![])
        }
        async fn put(&self, id: &str, _data: Vec<u8>) -> Result<(), EmojimiseError> {
            self.has.lock().unwrap().insert(id.to_string());
            Ok(())
        }
    }

    #[tokio::test]
    async fn put_then_exists_is_true() {
        let cache = FakeCache {
            has: std::sync::Mutex::new(Default::default()),
        };
        assert!(!cache.exists("a").await.unwrap());
        cache.put("a", vec![1, 2, 3]).await.unwrap();
        assert!(cache.exists("a").await.unwrap());
    }
}
