//! Wire and persistence types shared across the queue, admission, worker and
//! RPC layers.

use serde::{Deserialize, Serialize};

/// Status of a job as reported to RPC callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Status {
    Unknown,
    Queued,
    Processing,
    Finished,
}

impl Default for Status {
    fn default() -> Self {
        Status::Unknown
    }
}

/// Health of the process as reported by `Check`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HealthStatus {
    Unknown,
    Serving,
    NotServing,
}

/// Item persisted in the durable queue.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueItem {
    pub id: String,
    pub uri: String,
    pub added_at: i64,
    pub completed_at: Option<i64>,
    #[serde(default)]
    pub retry_count: u32,
    pub last_error: Option<String>,
}

impl QueueItem {
    pub fn new(id: impl Into<String>, uri: impl Into<String>, added_at: i64) -> Self {
        Self {
            id: id.into(),
            uri: uri.into(),
            added_at,
            completed_at: None,
            retry_count: 0,
            last_error: None,
        }
    }
}

/// Response returned by `Create` and `Query`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryItem {
    pub id: String,
    pub status: Status,
    #[serde(default)]
    pub queue_position: i32,
    #[serde(default)]
    pub queue_length: i32,
}

impl QueryItem {
    pub fn unknown(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            status: Status::Unknown,
            queue_position: 0,
            queue_length: 0,
        }
    }

    pub fn finished(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            status: Status::Finished,
            queue_position: 0,
            queue_length: 0,
        }
    }

    pub fn queued(id: impl Into<String>, position: i32, length: i32) -> Self {
        Self {
            id: id.into(),
            status: Status::Queued,
            queue_position: position,
            queue_length: length,
        }
    }

    pub fn processing(id: impl Into<String>, length: i32) -> Self {
        Self {
            id: id.into(),
            status: Status::Processing,
            queue_position: -1,
            queue_length: length,
        }
    }
}

/// A single-field JSON request body, used by both `Create` (url) and `Query` (id).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StringValue {
    pub value: String,
}

/// Response body for `Check`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthCheckResponse {
    pub status: HealthStatus,
}

/// A detected face bounding box, in source image pixel coordinates.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Rectangle {
    pub min: Point,
    pub max: Point,
}

impl Rectangle {
    pub fn width(&self) -> u32 {
        self.max.x.saturating_sub(self.min.x)
    }

    pub fn height(&self) -> u32 {
        self.max.y.saturating_sub(self.min.y)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Point {
    pub x: u32,
    pub y: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectFacesResponse {
    pub faces: Vec<Rectangle>,
}
