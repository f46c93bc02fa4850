//! Single-consumer worker pipeline: fetch, decode, detect, composite, encode,
//! cache.
//!
//! Consumes one [`QueueItem`] at a time from the queue's Pop channel. A
//! per-stage failure marks the job failed and the loop advances to the next
//! item; there is no retry or dead-letter handling.

use std::sync::Arc;

use tokio::sync::mpsc;

use crate::cache::Cache;
use crate::compositor::Compositor;
use crate::detector::FaceDetector;
use crate::fetcher::Fetcher;
use crate::model::QueueItem;
use crate::observability::{self, OpGuard};
use crate::queue::{DoneSignal, JobOutcome};

pub struct Worker {
    pub cache: Arc<dyn Cache>,
    pub fetcher: Arc<dyn Fetcher>,
    pub detector: Arc<dyn FaceDetector>,
    pub compositor: Arc<Compositor>,
}

impl Worker {
    /// Drains `rx` forever, running the pipeline for each popped item.
    pub async fn run(self: Arc<Self>, mut rx: mpsc::Receiver<(QueueItem, DoneSignal)>) {
        while let Some((item, done)) = rx.recv().await {
            let outcome = self.process(&item).await;
            done.resolve(outcome);
        }
    }

    async fn process(&self, item: &QueueItem) -> JobOutcome {
        let guard = OpGuard::start("worker_process", Some(item.id.clone()));

        match self.try_process(item).await {
            Ok(()) => {
                guard.finish(200);
                JobOutcome::Success
            }
            Err(err) => {
                tracing::error!(id = %item.id, %err, "job failed");
                observability::count_event("stage_failure");
                guard.finish(500);
                JobOutcome::Failure
            }
        }
    }

    async fn try_process(&self, item: &QueueItem) -> Result<(), crate::error::EmojimiseError> {
        // Re-check: the item may already have been completed by a prior
        // enqueue-then-dedup race.
        if self.cache.exists(&item.id).await? {
            return Ok(());
        }

        let bytes = self.fetcher.fetch(&item.uri).await?;
        let image = Compositor::decode(&bytes)?;
        let faces = self.detector.detect(&bytes).await?;
        let composed = self.compositor.composite(&image, &faces);
        let encoded = Compositor::encode_jpeg(&composed)?;
        self.cache.put(&item.id, encoded).await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EmojimiseError;
    use crate::model::{Point, Rectangle};
    use async_trait::async_trait;
    use std::sync::Mutex;
    use tokio::sync::oneshot;

    struct FakeCache {
        exists: Mutex<bool>,
        put_called: Mutex<bool>,
    }

    #[async_trait]
    impl Cache for FakeCache {
        async fn exists(&self, _id: &str) -> Result<bool, EmojimiseError> {
            Ok(*self.exists.lock().unwrap())
        }
        async fn get(&self, _id: &str) -> Result<Vec<u8>, EmojimiseError> {
            Ok(vec![])
        }
        async fn put(&self, _id: &str, _data: Vec<u8>) -> Result<(), EmojimiseError> {
            *self.put_called.lock().unwrap() = true;
            Ok(())
        }
    }

    struct FakeFetcher(Vec<u8>);

    #[async_trait]
    impl Fetcher for FakeFetcher {
        async fn fetch(&self, _url: &str) -> Result<Vec<u8>, EmojimiseError> {
            Ok(self.0.clone())
        }
    }

    struct FakeDetector;

    #[async_trait]
    impl FaceDetector for FakeDetector {
        async fn detect(&self, _bytes: &[u8]) -> Result<Vec<Rectangle>, EmojimiseError> {
            Ok(vec![Rectangle {
                min: Point { x: 0, y: 0 },
                max: Point { x: 4, y: 4 },
            }])
        }
    }

    fn sample_png() -> Vec<u8> {
        use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};
        let img = RgbaImage::from_pixel(16, 16, Rgba([10, 20, 30, 255]));
        let mut buf = Vec::new();
        DynamicImage::ImageRgba8(img)
            .write_to(&mut std::io::Cursor::new(&mut buf), ImageFormat::Png)
            .unwrap();
        buf
    }

    fn compositor_with_one_emoji() -> Compositor {
        let mut dir = std::env::temp_dir();
        dir.push(format!("emojimise-worker-test-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let mut path = dir.clone();
        path.push("e.png");
        std::fs::write(&path, sample_png()).unwrap();
        Compositor::load(&dir).unwrap()
    }

    #[tokio::test]
    async fn skips_pipeline_when_already_cached() {
        let worker = Worker {
            cache: Arc::new(FakeCache {
                exists: Mutex::new(true),
                put_called: Mutex::new(false),
            }),
            fetcher: Arc::new(FakeFetcher(vec![])),
            detector: Arc::new(FakeDetector),
            compositor: Arc::new(compositor_with_one_emoji()),
        };

        let item = QueueItem::new("id1", "http://x.test/a.jpg", 0);
        let outcome = worker.process(&item).await;
        assert_eq!(outcome, JobOutcome::Success);
    }

    #[tokio::test]
    async fn runs_full_pipeline_and_puts_result() {
        let cache = Arc::new(FakeCache {
            exists: Mutex::new(false),
            put_called: Mutex::new(false),
        });
        let worker = Worker {
            cache: cache.clone(),
            fetcher: Arc::new(FakeFetcher(sample_png())),
            detector: Arc::new(FakeDetector),
            compositor: Arc::new(compositor_with_one_emoji()),
        };

        let item = QueueItem::new("id1", "http://x.test/a.jpg", 0);
        let outcome = worker.process(&item).await;
        assert_eq!(outcome, JobOutcome::Success);
        assert!(*cache.put_called.lock().unwrap());
    }

    #[tokio::test]
    async fn fetch_failure_reports_failure_outcome() {
        struct FailingFetcher;
        #[async_trait]
        impl Fetcher for FailingFetcher {
            async fn fetch(&self, _url: &str) -> Result<Vec<u8>, EmojimiseError> {
                Err(EmojimiseError::Internal("boom".into()))
            }
        }

        let worker = Worker {
            cache: Arc::new(FakeCache {
                exists: Mutex::new(false),
                put_called: Mutex::new(false),
            }),
            fetcher: Arc::new(FailingFetcher),
            detector: Arc::new(FakeDetector),
            compositor: Arc::new(compositor_with_one_emoji()),
        };

        let item = QueueItem::new("id1", "http://x.test/a.jpg", 0);
        let outcome = worker.process(&item).await;
        assert_eq!(outcome, JobOutcome::Failure);
    }

    #[tokio::test]
    async fn run_resolves_done_signal_with_process_outcome() {
        let worker = Arc::new(Worker {
            cache: Arc::new(FakeCache {
                exists: Mutex::new(true),
                put_called: Mutex::new(false),
            }),
            fetcher: Arc::new(FakeFetcher(vec![])),
            detector: Arc::new(FakeDetector),
            compositor: Arc::new(compositor_with_one_emoji()),
        });

        let (tx, rx) = mpsc::channel(1);
        let run_handle = tokio::spawn(worker.run(rx));

        let item = QueueItem::new("id1", "http://x.test/a.jpg", 0);
        let (done_tx, done_rx) = oneshot::channel();
        tx.send((item, DoneSignal::new(done_tx))).await.unwrap();

        let outcome = done_rx.await.unwrap();
        assert_eq!(outcome, JobOutcome::Success);

        drop(tx);
        let _ = run_handle.await;
    }
}
