//! Deduplicating admission layer shared by `Create` and `Query`.
//!
//! Consults the cache and the queue for an `id` and reports where the job
//! currently stands. `Create` treats an "absent everywhere" result as
//! permission to enqueue; `Query` treats the same result as `UNKNOWN`.

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::cache::Cache;
use crate::error::EmojimiseError;
use crate::model::{QueryItem, QueueItem};
use crate::observability;
use crate::queue::Queue;

/// `None` is the "absent in both cache and queue" sentinel distinguishing
/// `Create` (enqueue) from `Query` (report UNKNOWN).
pub async fn check(
    cache: &dyn Cache,
    queue: &dyn Queue,
    id: &str,
) -> Result<Option<QueryItem>, EmojimiseError> {
    match cache.exists(id).await {
        Ok(true) => {
            observability::count_event("cache_hit");
            return Ok(Some(QueryItem::finished(id)));
        }
        Ok(false) => {}
        Err(EmojimiseError::NotFound(_)) => {}
        Err(other) => return Err(other),
    }

    let (position, length) = queue.position(id).await?;
    if position == -1 {
        return Ok(Some(QueryItem::processing(id, length)));
    }
    if position > 0 {
        return Ok(Some(QueryItem::queued(id, position, length)));
    }

    Ok(None)
}

/// Runs the `Create` admission path: dedups against cache/queue, enqueuing a
/// fresh job only when the id is absent everywhere.
pub async fn create(
    cache: Arc<dyn Cache>,
    queue: Arc<dyn Queue>,
    id: &str,
    uri: &str,
) -> Result<QueryItem, EmojimiseError> {
    if let Some(existing) = check(cache.as_ref(), queue.as_ref(), id).await? {
        return Ok(existing);
    }

    let added_at = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos() as i64;
    let item = QueueItem::new(id, uri, added_at);
    let (position, length) = queue.push(item).await?;

    Ok(QueryItem::queued(id, position, length))
}

/// Runs the `Query` admission path: an absent id is reported as `UNKNOWN`.
pub async fn query(
    cache: &dyn Cache,
    queue: &dyn Queue,
    id: &str,
) -> Result<QueryItem, EmojimiseError> {
    Ok(check(cache, queue, id)
        .await?
        .unwrap_or_else(|| QueryItem::unknown(id)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Status;
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
        pushed: Mutex<Vec<QueueItem>>,
        position: Mutex<(i32, i32)>,
    }

    #[async_trait]
    impl Queue for FakeQueue {
        async fn push(&self, item: QueueItem) -> Result<(i32, i32), EmojimiseError> {
            self.pushed.lock().unwrap().push(item);
            Ok(*self.position.lock().unwrap())
        }
        async fn position(&self, _id: &str) -> Result<(i32, i32), EmojimiseError> {
            Ok(*self.position.lock().unwrap())
        }
        async fn ping(&self) -> Result<(), EmojimiseError> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn fresh_enqueue_when_absent_everywhere() {
        let cache: Arc<dyn Cache> = Arc::new(FakeCache(Mutex::new(HashSet::new())));
        let queue: Arc<dyn Queue> = Arc::new(FakeQueue {
            pushed: Mutex::new(vec![]),
            position: Mutex::new((1, 1)),
        });

        let result = create(cache, queue, "id1", "http://x.test/a.jpg")
            .await
            .unwrap();
        assert_eq!(result.status, Status::Queued);
        assert_eq!(result.queue_position, 1);
        assert_eq!(result.queue_length, 1);
    }

    #[tokio::test]
    async fn query_reports_finished_when_cached() {
        let mut set = HashSet::new();
        set.insert("id1".to_string());
        let cache: Arc<dyn Cache> = Arc::new(FakeCache(Mutex::new(set)));
        let queue: Arc<dyn Queue> = Arc::new(FakeQueue {
            pushed: Mutex::new(vec![]),
            position: Mutex::new((0, 0)),
        });

        let result = query(cache.as_ref(), queue.as_ref(), "id1").await.unwrap();
        assert_eq!(result.status, Status::Finished);
    }

    #[tokio::test]
    async fn query_reports_unknown_when_absent_everywhere() {
        let cache: Arc<dyn Cache> = Arc::new(FakeCache(Mutex::new(HashSet::new())));
        let queue: Arc<dyn Queue> = Arc::new(FakeQueue {
            pushed: Mutex::new(vec![]),
            position: Mutex::new((0, 0)),
        });

        let result = query(cache.as_ref(), queue.as_ref(), "missing")
            .await
            .unwrap();
        assert_eq!(result.status, Status::Unknown);
    }

    #[tokio::test]
    async fn query_reports_processing_when_in_flight() {
        let cache: Arc<dyn Cache> = Arc::new(FakeCache(Mutex::new(HashSet::new())));
        let queue: Arc<dyn Queue> = Arc::new(FakeQueue {
            pushed: Mutex::new(vec![]),
            position: Mutex::new((-1, 1)),
        });

        let result = query(cache.as_ref(), queue.as_ref(), "id1").await.unwrap();
        assert_eq!(result.status, Status::Processing);
        assert_eq!(result.queue_position, -1);
    }
}
