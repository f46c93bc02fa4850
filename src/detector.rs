//! Client for the remote face-detection service.

use std::time::Duration;

use async_trait::async_trait;
use http::Method;

use crate::error::EmojimiseError;
use crate::httpclient;
use crate::model::{DetectFacesResponse, Rectangle};

#[async_trait]
pub trait FaceDetector: Send + Sync {
    async fn detect(&self, image_bytes: &[u8]) -> Result<Vec<Rectangle>, EmojimiseError>;
}

/// Posts raw image bytes to `FACEBOX_ADDRESS` and parses the returned
/// bounding boxes.
pub struct HttpFaceDetector {
    base_url: String,
    timeout: Duration,
}

impl HttpFaceDetector {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            base_url: base_url.into(),
            timeout,
        }
    }
}

#[async_trait]
impl FaceDetector for HttpFaceDetector {
    async fn detect(&self, image_bytes: &[u8]) -> Result<Vec<Rectangle>, EmojimiseError> {
        let resp = httpclient::send(
            &self.base_url,
            Method::POST,
            "/v1/faces",
            image_bytes.to_vec(),
            self.timeout,
        )
        .await
        .map_err(|e| EmojimiseError::Unavailable(e.to_string()))?;

        if resp.status().as_u16() != 200 {
            return Err(EmojimiseError::Internal(format!(
                "detector returned status {}",
                resp.status()
            )));
        }

        let parsed: DetectFacesResponse =
            serde_json::from_slice(resp.body()).map_err(EmojimiseError::internal)?;
        Ok(parsed.faces)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Point;

    struct FakeDetector(Vec<Rectangle>);

    #[async_trait]
    impl FaceDetector for FakeDetector {
        async fn detect(&self, _image_bytes: &[u8]) -> Result<Vec<Rectangle>, EmojimiseError> {
            Ok(self.0.clone())
        }
    }

    #[tokio::test]
    async fn returns_configured_faces() {
        let rect = Rectangle {
            min: Point { x: 10, y: 10 },
            max: Point { x: 50, y: 60 },
        };
        let detector = FakeDetector(vec![rect]);
        let faces = detector.detect(&[0u8; 4]).await.unwrap();
        assert_eq!(faces.len(), 1);
        assert_eq!(faces[0].width(), 40);
        assert_eq!(faces[0].height(), 50);
    }
}
