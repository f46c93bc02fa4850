//! Persistent FIFO job queue with a single in-flight slot.
//!
//! Durable state lives in Redis: an ordered set (`worker_queue`) scored by
//! nanosecond insertion time is the source of truth for position and length;
//! a per-`id` string key holds the serialized [`QueueItem`] with a TTL. The
//! in-flight slot is process-local, held only by the running worker.
//!
//! The consumer side is a depth-1 channel carrying `(QueueItem, DoneSignal)`
//! pairs rather than a callback -- the Pop loop blocks on the channel send,
//! so the store is never drained faster than the worker can keep up, and
//! `DoneSignal`'s `Drop` guarantees the loop unblocks even if the consumer
//! panics mid-stage.

use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use parking_lot::RwLock;
use redis::AsyncCommands;
use tokio::sync::{mpsc, oneshot};

use crate::error::EmojimiseError;
use crate::model::QueueItem;
use crate::observability;

const QUEUE_KEY: &str = "worker_queue";

fn item_key(id: &str) -> String {
    format!("emojimise:item:{id}")
}

/// Outcome the worker reports back through a [`DoneSignal`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobOutcome {
    Success,
    Failure,
}

/// RAII acknowledgement handle delivered alongside each popped [`QueueItem`].
///
/// The consumer MUST resolve this (via [`DoneSignal::resolve`]) once the job
/// finishes. If it is dropped without being resolved -- a stage panicked, a
/// `?` unwound past it -- the drop impl fires a `Failure` outcome so the Pop
/// loop is never left waiting forever.
pub struct DoneSignal {
    tx: Option<oneshot::Sender<JobOutcome>>,
}

impl DoneSignal {
    pub(crate) fn new(tx: oneshot::Sender<JobOutcome>) -> Self {
        Self { tx: Some(tx) }
    }

    pub fn resolve(mut self, outcome: JobOutcome) {
        if let Some(tx) = self.tx.take() {
            let _ = tx.send(outcome);
        }
    }
}

impl Drop for DoneSignal {
    fn drop(&mut self) {
        if let Some(tx) = self.tx.take() {
            let _ = tx.send(JobOutcome::Failure);
        }
    }
}

#[async_trait]
pub trait Queue: Send + Sync {
    async fn push(&self, item: QueueItem) -> Result<(i32, i32), EmojimiseError>;
    async fn position(&self, id: &str) -> Result<(i32, i32), EmojimiseError>;
    async fn ping(&self) -> Result<(), EmojimiseError>;
}

/// Process-local record of the item currently being worked on.
#[derive(Default)]
struct InFlight {
    id: RwLock<Option<String>>,
}

impl InFlight {
    fn set(&self, id: Option<String>) {
        *self.id.write() = id;
    }

    fn is(&self, id: &str) -> bool {
        self.id.read().as_deref() == Some(id)
    }
}

/// Redis-backed durable queue implementation.
pub struct RedisQueue {
    client: redis::Client,
    in_flight: Arc<InFlight>,
    item_ttl: Duration,
}

impl RedisQueue {
    pub fn new(addr: &str, password: &str, db: i64, item_ttl: Duration) -> anyhow::Result<Self> {
        let mut url = format!("redis://{addr}/{db}");
        if !password.is_empty() {
            url = format!("redis://:{password}@{addr}/{db}");
        }
        let client = redis::Client::open(url)?;
        Ok(Self {
            client,
            in_flight: Arc::new(InFlight::default()),
            item_ttl,
        })
    }

    async fn conn(&self) -> Result<redis::aio::MultiplexedConnection, EmojimiseError> {
        self.client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| EmojimiseError::Unavailable(e.to_string()))
    }

    fn now_nanos() -> f64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos() as f64
    }

    /// Spawns the background Pop loop, returning the receiving end of the
    /// depth-1 hand-off channel the worker consumes from.
    pub fn spawn_pop_loop(
        self: &Arc<Self>,
        error_delay: Duration,
    ) -> mpsc::Receiver<(QueueItem, DoneSignal)> {
        let (tx, rx) = mpsc::channel(1);
        let this = self.clone();

        tokio::spawn(async move {
            loop {
                match this.pop_once().await {
                    Ok(Some(item)) => {
                        this.in_flight.set(Some(item.id.clone()));
                        let (done_tx, done_rx) = oneshot::channel();
                        let signal = DoneSignal::new(done_tx);

                        if tx.send((item, signal)).await.is_err() {
                            this.in_flight.set(None);
                            break;
                        }

                        let outcome = done_rx.await.unwrap_or(JobOutcome::Failure);
                        if outcome == JobOutcome::Failure {
                            observability::count_event("worker_job_failed");
                        }
                        this.in_flight.set(None);
                    }
                    Ok(None) => {
                        tokio::time::sleep(error_delay).await;
                    }
                    Err(err) => {
                        tracing::error!(%err, "queue pop failed");
                        tokio::time::sleep(error_delay).await;
                    }
                }
            }
        });

        rx
    }

    async fn pop_once(&self) -> Result<Option<QueueItem>, EmojimiseError> {
        let mut conn = self.conn().await?;

        let popped: Vec<(String, f64)> = conn
            .zpopmin(QUEUE_KEY, 1)
            .await
            .map_err(|e| EmojimiseError::Unavailable(e.to_string()))?;

        let Some((id, _score)) = popped.into_iter().next() else {
            return Ok(None);
        };

        let key = item_key(&id);
        let raw: Option<String> = conn
            .get(&key)
            .await
            .map_err(|e| EmojimiseError::Unavailable(e.to_string()))?;
        let _: () = conn
            .del(&key)
            .await
            .map_err(|e| EmojimiseError::Unavailable(e.to_string()))?;

        let Some(raw) = raw else {
            tracing::error!(id = %id, "popped queue member with no matching kv entry");
            return Ok(None);
        };

        let item: QueueItem = serde_json::from_str(&raw).map_err(EmojimiseError::internal)?;
        Ok(Some(item))
    }
}

#[async_trait]
impl Queue for RedisQueue {
    async fn push(&self, item: QueueItem) -> Result<(i32, i32), EmojimiseError> {
        let mut conn = self.conn().await?;
        let payload = serde_json::to_string(&item).map_err(EmojimiseError::internal)?;
        let key = item_key(&item.id);

        let _: () = conn
            .set_ex(&key, payload, self.item_ttl.as_secs())
            .await
            .map_err(|e| EmojimiseError::Unavailable(e.to_string()))?;
        let _: () = conn
            .zadd(QUEUE_KEY, &item.id, Self::now_nanos())
            .await
            .map_err(|e| EmojimiseError::Unavailable(e.to_string()))?;

        self.position(&item.id).await
    }

    async fn position(&self, id: &str) -> Result<(i32, i32), EmojimiseError> {
        if self.in_flight.is(id) {
            let mut conn = self.conn().await?;
            let n: i64 = conn
                .zcard(QUEUE_KEY)
                .await
                .map_err(|e| EmojimiseError::Unavailable(e.to_string()))?;
            return Ok((-1, n as i32 + 1));
        }

        let mut conn = self.conn().await?;
        let n: i64 = conn
            .zcard(QUEUE_KEY)
            .await
            .map_err(|e| EmojimiseError::Unavailable(e.to_string()))?;
        if n == 0 {
            return Ok((0, 0));
        }

        let rank: Option<i64> = conn
            .zrank(QUEUE_KEY, id)
            .await
            .map_err(|e| EmojimiseError::Unavailable(e.to_string()))?;

        match rank {
            Some(rank) => Ok((rank as i32 + 1, n as i32)),
            None => Ok((0, n as i32)),
        }
    }

    async fn ping(&self) -> Result<(), EmojimiseError> {
        let mut conn = self.conn().await?;
        redis::cmd("PING")
            .query_async::<String>(&mut conn)
            .await
            .map_err(|e| EmojimiseError::Unavailable(e.to_string()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn done_signal_fires_failure_on_drop_without_resolve() {
        let (tx, rx) = oneshot::channel();
        {
            let _signal = DoneSignal::new(tx);
        }
        assert_eq!(rx.await.unwrap(), JobOutcome::Failure);
    }

    #[tokio::test]
    async fn done_signal_honors_explicit_resolve() {
        let (tx, rx) = oneshot::channel();
        let signal = DoneSignal::new(tx);
        signal.resolve(JobOutcome::Success);
        assert_eq!(rx.await.unwrap(), JobOutcome::Success);
    }

    #[test]
    fn in_flight_tracks_current_id_only() {
        let flight = InFlight::default();
        assert!(!flight.is("a"));
        flight.set(Some("a".into()));
        assert!(flight.is("a"));
        assert!(!flight.is("b"));
        flight.set(None);
        assert!(!flight.is("a"));
    }
}
