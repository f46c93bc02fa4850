#![cfg_attr(docsrs, feature(doc_cfg))]

//! Emojimise: an async image-transformation job service.
//!
//! Accepts a remote image URL, detects faces via an external detector
//! service, overlays a random emoji on each detected face, and returns a
//! stable identifier for the result. Work is processed by a single-consumer
//! worker pipeline fed by a persistent FIFO queue with a deduplicating
//! admission layer; finished results live in an external cache service.
//!
//! The HTTP surface (router, extractors, handler dispatch, responder
//! conversion) is the small framework this service is built on top of.
//!
//! # Compatibility
//! - Runtime: `tokio`
//! - HTTP: `hyper` 1.x

/// HTTP request and response body handling utilities.
pub mod body;

/// HTTP client implementation for making outbound requests.
pub mod client;

/// Request data extraction utilities for parsing JSON bodies, path
/// parameters, and shared state.
pub mod extractors;

/// Request handler traits and implementations.
mod handler;

/// Middleware for processing requests and responses in a pipeline.
pub mod middleware;

/// Response generation utilities and traits.
pub mod responder;

/// Route definition and matching logic.
mod route;

/// Request routing and dispatch functionality.
pub mod router;

/// HTTP server implementation and configuration.
mod server;

/// Application state management and dependency injection.
pub mod state;

/// Core type definitions used throughout the framework.
pub mod types;

/// Structured tracing subscriber setup.
pub mod tracing;

pub use http::{Method, StatusCode, header};
pub use server::serve;

/// Base64 identifier derivation.
pub mod id;

/// Wire-level data types shared by the queue, cache, and RPC surface.
pub mod model;

/// Environment-driven configuration.
pub mod config;

/// Crate-wide error type and its `Responder` conversion.
pub mod error;

/// Outbound HTTP helper built on [`client`].
pub mod httpclient;

/// Result cache client (external KV/RPC cache service).
pub mod cache;

/// Face detector client (external HTTP detector service).
pub mod detector;

/// Source-image fetcher.
pub mod fetcher;

/// Emoji catalog loading and image compositing.
pub mod compositor;

/// Persistent FIFO job queue with a single in-flight slot.
pub mod queue;

/// Deduplicating admission layer shared by `Create` and `Query`.
pub mod admission;

/// Single-consumer worker pipeline.
pub mod worker;

/// Scoped operation timers and discrete event counters.
pub mod observability;

/// `Check`, `Create`, `Query` RPC handlers and the health endpoint.
pub mod rpc;
