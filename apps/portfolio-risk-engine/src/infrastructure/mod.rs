//! Infrastructure Layer - Adapters and external integrations.
//!
//! This layer contains the concrete implementations of the port interfaces
//! defined in the application layer.

/// Position source adapters (synthetic, in-memory, JSON file).
pub mod sources;

/// Broadcast channel adapter for snapshot distribution.
pub mod broadcast;

/// Snapshot subscribers for operators.
pub mod subscribers;

/// Order gateway adapters.
pub mod orders;

/// Configuration loaded from the environment.
pub mod config;

/// Prometheus metrics instrumentation.
pub mod metrics;

/// Tracing subscriber and OpenTelemetry integration.
pub mod telemetry;
