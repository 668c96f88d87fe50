//! Application Services
//!
//! - [`UpdateScheduler`]: periodic fetch, aggregate and publish cycle
//! - [`SnapshotPublisher`]: current-snapshot cell and subscriber fan-out
//! - [`OrderRefreshService`]: refresh after a successful order placement

mod order_refresh;
mod publisher;
mod scheduler;

pub use order_refresh::OrderRefreshService;
pub use publisher::{DEFAULT_DELIVERY_TIMEOUT, PublishReport, SnapshotPublisher, SnapshotReader};
pub use scheduler::{
    RefreshTrigger, SchedulerConfig, SchedulerHandle, SchedulerPhase, SourceRegistry, TickTrigger,
    UpdateScheduler, feed_mode,
};
