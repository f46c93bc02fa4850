//! RPC surface: `Check`, `Create`, `Query`, and the plain health endpoint.
//!
//! Handlers are ordinary handlers registered on the router like any
//! other route; `Json<T>` and `State<T>` extractors are reused unmodified
//! from the framework.

use std::sync::Arc;

use crate::admission;
use crate::cache::Cache;
use crate::error::EmojimiseError;
use crate::extractors::json::Json;
use crate::extractors::state::State;
use crate::id;
use crate::model::{HealthCheckResponse, HealthStatus, QueryItem, StringValue};
use crate::observability::OpGuard;
use crate::queue::Queue;
use crate::responder::Responder;
use crate::types::Response;

/// Shared dependencies injected into every RPC handler via [`State`].
#[derive(Clone)]
pub struct AppState {
    pub cache: Arc<dyn Cache>,
    pub queue: Arc<dyn Queue>,
}

/// `POST /v1/check` -- liveness of the durable queue.
pub async fn check(State(state): State<AppState>) -> impl Responder {
    let guard = OpGuard::start("rpc_check", None);
    match state.queue.ping().await {
        Ok(()) => {
            guard.finish(200);
            JsonResponder(HealthCheckResponse {
                status: HealthStatus::Serving,
            })
        }
        Err(err) => {
            guard.finish(503);
            tracing::error!(%err, "check failed");
            JsonResponder(HealthCheckResponse {
                status: HealthStatus::NotServing,
            })
        }
    }
}

/// `POST /v1/create` -- body `{ "value": "<url>" }`.
pub async fn create(
    State(state): State<AppState>,
    Json(body): Json<StringValue>,
) -> Result<JsonResponder<QueryItem>, EmojimiseError> {
    let guard = OpGuard::start("rpc_create", None);
    let url = body.value.trim();
    if url.is_empty() {
        guard.finish(400);
        return Err(EmojimiseError::InvalidArgument(
            "url must not be empty".into(),
        ));
    }

    let job_id = id::derive(url);
    let result = admission::create(state.cache.clone(), state.queue.clone(), &job_id, url).await;
    match &result {
        Ok(_) => guard.finish(200),
        Err(_) => guard.finish(500),
    }
    result.map(JsonResponder)
}

/// `POST /v1/query` -- body `{ "value": "<id>" }`.
pub async fn query(
    State(state): State<AppState>,
    Json(body): Json<StringValue>,
) -> Result<JsonResponder<QueryItem>, EmojimiseError> {
    let guard = OpGuard::start("rpc_query", Some(body.value.clone()));
    let result = admission::query(state.cache.as_ref(), state.queue.as_ref(), &body.value).await;
    match &result {
        Ok(_) => guard.finish(200),
        Err(EmojimiseError::NotFound(_)) => guard.finish(404),
        Err(_) => guard.finish(500),
    }
    result.map(JsonResponder)
}

/// Plain-text liveness probe, independent of queue reachability.
pub async fn health() -> &'static str {
    "OK"
}

/// Thin `Responder` wrapper serializing any `Serialize` value as JSON.
pub struct JsonResponder<T>(pub T);

impl<T: serde::Serialize> Responder for JsonResponder<T> {
    fn into_response(self) -> Response {
        let body = serde_json::to_string(&self.0).unwrap_or_else(|_| "{}".to_string());
        let mut res = Response::new(crate::body::TakoBody::from(body));
        res.headers_mut().insert(
            http::header::CONTENT_TYPE,
            http::HeaderValue::from_static("application/json"),
        );
        res
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EmojimiseError;
    use crate::model::{QueueItem, Status};
    use async_trait::async_trait;
    use std::collections::HashSet;
    use std::sync::Mutex;

    struct FakeCache(Mutex<HashSet<String>>);

    #[async_trait]
    impl Cache for FakeCache {
        async fn exists(&self, id: &str) -> Result<bool, EmojimiseError> {
            Ok(self.0.lock().unwrap().contains(id))
        }
        async fn get(&self, _id: &str) -> Result<Vec<u8>, EmojimiseError> {
            Ok(vec![])
        }
        async fn put(&self, id: &str, _data: Vec<u8>) -> Result<(), EmojimiseError> {
            self.0.lock().unwrap().insert(id.to_string());
            Ok(())
        }
    }

    struct FakeQueue {
        position: Mutex<(i32, i32)>,
    }

    #[async_trait]
    impl Queue for FakeQueue {
        async fn push(&self, _item: QueueItem) -> Result<(i32, i32), EmojimiseError> {
            Ok(*self.position.lock().unwrap())
        }
        async fn position(&self, _id: &str) -> Result<(i32, i32), EmojimiseError> {
            Ok(*self.position.lock().unwrap())
        }
        async fn ping(&self) -> Result<(), EmojimiseError> {
            Ok(())
        }
    }

    fn state_with(position: (i32, i32)) -> AppState {
        AppState {
            cache: Arc::new(FakeCache(Mutex::new(HashSet::new()))),
            queue: Arc::new(FakeQueue {
                position: Mutex::new(position),
            }),
        }
    }

    #[tokio::test]
    async fn create_rejects_empty_url() {
        let state = state_with((1, 1));
        let err = create(
            State(Arc::new(state)),
            Json(StringValue {
                value: "   ".into(),
            }),
        )
        .await
        .unwrap_err();
        matches!(err, EmojimiseError::InvalidArgument(_));
    }

    #[tokio::test]
    async fn create_enqueues_fresh_url() {
        let state = state_with((1, 1));
        let result = create(
            State(Arc::new(state)),
            Json(StringValue {
                value: "http://x.test/a.jpg".into(),
            }),
        )
        .await
        .unwrap();
        assert_eq!(result.0.status, Status::Queued);
    }

    #[tokio::test]
    async fn query_unknown_id_reports_unknown() {
        let state = state_with((0, 0));
        let result = query(
            State(Arc::new(state)),
            Json(StringValue {
                value: "bm9wZQ==".into(),
            }),
        )
        .await
        .unwrap();
        assert_eq!(result.0.status, Status::Unknown);
    }
}
