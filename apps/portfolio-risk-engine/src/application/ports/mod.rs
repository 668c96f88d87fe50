//! Application Ports (Driven Ports)
//!
//! Interfaces the application uses to reach the outside world:
//! - [`PositionSource`]: raw positions per exchange
//! - [`SnapshotSubscriber`]: receives every published snapshot
//! - [`OrderGateway`]: order placement collaborator
//! - [`Clock`]: wall-clock time
//! - [`EngineMetrics`]: operational counters and gauges

mod clock;
mod engine_metrics;
mod order_gateway;
mod position_source;
mod snapshot_subscriber;

pub use clock::{Clock, FixedClock, SystemClock};
pub use engine_metrics::{CountingMetrics, EngineMetrics, NoopMetrics};
pub use order_gateway::{OrderAck, OrderError, OrderGateway, OrderRequest, OrderType};
pub use position_source::{PositionSource, SourceUnavailable, UnavailableReason};
pub use snapshot_subscriber::{PublishError, SnapshotSubscriber};

#[cfg(test)]
pub use engine_metrics::MockEngineMetrics;
#[cfg(test)]
pub use order_gateway::MockOrderGateway;
#[cfg(test)]
pub use position_source::MockPositionSource;
