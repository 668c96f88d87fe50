//! Update Scheduler
//!
//! Drives the refresh cycle:
//!
//! ```text
//! Idle → Fetching → Aggregating → Published → Idle
//! ```
//!
//! Every tick queries all exchanges concurrently, each fetch bounded by a
//! timeout. An exchange whose live source fails is served by the synthetic
//! source for that tick only and marked degraded; retries happen on the next
//! tick. Ticks run every `live_interval` while all exchanges are live and
//! every `degraded_interval` otherwise. Out-of-cycle refreshes requested
//! through [`RefreshTrigger`] run as normal ticks.
//!
//! [`UpdateScheduler::run_tick`] executes one full cycle without timers.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};
use std::time::{Duration, Instant};

use futures::future::join_all;
use parking_lot::Mutex;
use tokio::sync::Notify;
use tokio::task::{JoinError, JoinHandle};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use super::publisher::{SnapshotPublisher, SnapshotReader};
use crate::application::ports::{
    Clock, EngineMetrics, NoopMetrics, PositionSource, SourceUnavailable, UnavailableReason,
};
use crate::domain::greeks::{GreeksEngine, ResolvedPosition};
use crate::domain::portfolio::{
    FeedMode, PortfolioAggregator, RiskSnapshot, SourceStatus, TickContext,
};
use crate::domain::position::{Exchange, PerExchange, Position};

// =============================================================================
// Configuration
// =============================================================================

/// Scheduler timing and mode settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulerConfig {
    /// Tick interval while every exchange is live.
    pub live_interval: Duration,
    /// Tick interval while any exchange is degraded or synthetic.
    pub degraded_interval: Duration,
    /// Bound on a single source fetch.
    pub fetch_timeout: Duration,
    /// Skip live sources entirely.
    pub force_synthetic: bool,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            live_interval: Duration::from_secs(10),
            degraded_interval: Duration::from_secs(5),
            fetch_timeout: Duration::from_secs(5),
            force_synthetic: false,
        }
    }
}

// =============================================================================
// Phase
// =============================================================================

/// Scheduler phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerPhase {
    /// Waiting for the next tick.
    Idle = 0,
    /// Querying position sources.
    Fetching = 1,
    /// Resolving Greeks and building the snapshot.
    Aggregating = 2,
    /// Snapshot published.
    Published = 3,
}

impl From<u8> for SchedulerPhase {
    fn from(value: u8) -> Self {
        match value {
            1 => Self::Fetching,
            2 => Self::Aggregating,
            3 => Self::Published,
            _ => Self::Idle,
        }
    }
}

// =============================================================================
// Sources
// =============================================================================

/// Live sources per exchange plus the synthetic fallback.
#[derive(Clone)]
pub struct SourceRegistry {
    live: HashMap<Exchange, Arc<dyn PositionSource>>,
    synthetic: Arc<dyn PositionSource>,
}

impl std::fmt::Debug for SourceRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut live: Vec<_> = self
            .live
            .iter()
            .map(|(exchange, source)| (*exchange, source.name()))
            .collect();
        live.sort();
        f.debug_struct("SourceRegistry")
            .field("live", &live)
            .field("synthetic", &self.synthetic.name())
            .finish()
    }
}

impl SourceRegistry {
    /// Registry with only the synthetic source.
    #[must_use]
    pub fn new(synthetic: Arc<dyn PositionSource>) -> Self {
        Self {
            live: HashMap::new(),
            synthetic,
        }
    }

    /// Register the live source for an exchange.
    #[must_use]
    pub fn with_live(mut self, exchange: Exchange, source: Arc<dyn PositionSource>) -> Self {
        self.live.insert(exchange, source);
        self
    }

    /// Live source for an exchange.
    #[must_use]
    pub fn live(&self, exchange: Exchange) -> Option<&Arc<dyn PositionSource>> {
        self.live.get(&exchange)
    }

    /// Whether any live source is registered.
    #[must_use]
    pub fn has_live(&self) -> bool {
        !self.live.is_empty()
    }
}

// =============================================================================
// Refresh Trigger
// =============================================================================

/// Requests out-of-cycle ticks.
#[derive(Debug, Default)]
pub struct RefreshTrigger {
    notify: Notify,
    reason: Mutex<Option<String>>,
}

impl RefreshTrigger {
    /// Request a refresh. Requests made before the scheduler wakes coalesce
    /// into one tick carrying the latest reason.
    pub fn request(&self, reason: impl Into<String>) {
        *self.reason.lock() = Some(reason.into());
        self.notify.notify_one();
    }

    /// Wait for the next request and return its reason.
    pub async fn requested(&self) -> String {
        self.notify.notified().await;
        self.reason
            .lock()
            .take()
            .unwrap_or_else(|| "refresh requested".to_string())
    }
}

/// What started a tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickTrigger {
    /// Regular interval.
    Scheduled,
    /// Out-of-cycle request.
    Manual(String),
}

// =============================================================================
// Scheduler
// =============================================================================

/// Periodic fetch, aggregate and publish cycle.
pub struct UpdateScheduler {
    config: SchedulerConfig,
    sources: SourceRegistry,
    engine: GreeksEngine,
    aggregator: PortfolioAggregator,
    publisher: Arc<SnapshotPublisher>,
    clock: Arc<dyn Clock>,
    metrics: Arc<dyn EngineMetrics>,
    refresh: Arc<RefreshTrigger>,
    phase: Arc<AtomicU8>,
    sequence: u64,
    last_mode: FeedMode,
}

impl std::fmt::Debug for UpdateScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UpdateScheduler")
            .field("config", &self.config)
            .field("sources", &self.sources)
            .field("sequence", &self.sequence)
            .field("last_mode", &self.last_mode)
            .field("phase", &self.phase())
            .finish_non_exhaustive()
    }
}

impl UpdateScheduler {
    /// Create a scheduler.
    #[must_use]
    pub fn new(
        config: SchedulerConfig,
        sources: SourceRegistry,
        engine: GreeksEngine,
        aggregator: PortfolioAggregator,
        publisher: Arc<SnapshotPublisher>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            config,
            sources,
            engine,
            aggregator,
            publisher,
            clock,
            metrics: Arc::new(NoopMetrics),
            refresh: Arc::new(RefreshTrigger::default()),
            phase: Arc::new(AtomicU8::new(SchedulerPhase::Idle as u8)),
            sequence: 0,
            last_mode: FeedMode::Synthetic,
        }
    }

    /// Report tick and source metrics to `metrics`.
    #[must_use]
    pub fn with_metrics(mut self, metrics: Arc<dyn EngineMetrics>) -> Self {
        self.metrics = metrics;
        self
    }

    /// Current phase.
    #[must_use]
    pub fn phase(&self) -> SchedulerPhase {
        SchedulerPhase::from(self.phase.load(Ordering::SeqCst))
    }

    /// Sequence of the last produced snapshot (0 before the first tick).
    #[must_use]
    pub const fn sequence(&self) -> u64 {
        self.sequence
    }

    /// Feed mode of the last tick.
    #[must_use]
    pub const fn last_mode(&self) -> FeedMode {
        self.last_mode
    }

    /// Refresh trigger shared with handles.
    #[must_use]
    pub fn refresh_trigger(&self) -> Arc<RefreshTrigger> {
        Arc::clone(&self.refresh)
    }

    /// Interval until the next scheduled tick, based on the last tick's mode.
    #[must_use]
    pub const fn current_interval(&self) -> Duration {
        match self.last_mode {
            FeedMode::Live => self.config.live_interval,
            FeedMode::Degraded | FeedMode::Synthetic => self.config.degraded_interval,
        }
    }

    fn set_phase(&self, phase: SchedulerPhase) {
        self.phase.store(phase as u8, Ordering::SeqCst);
    }

    /// Run one scheduled tick.
    pub async fn run_tick(&mut self) -> Arc<RiskSnapshot> {
        self.run_tick_with(TickTrigger::Scheduled).await
    }

    /// Run one tick.
    pub async fn run_tick_with(&mut self, trigger: TickTrigger) -> Arc<RiskSnapshot> {
        let started = Instant::now();
        let now = self.clock.now();

        self.set_phase(SchedulerPhase::Fetching);
        let (positions, sources) = self.fetch_all().await;

        self.set_phase(SchedulerPhase::Aggregating);
        let mode = feed_mode(&sources);
        let engine = self.engine;
        let resolved: PerExchange<Vec<ResolvedPosition>> = positions.map(|_, batch| {
            batch
                .into_iter()
                .map(|position| engine.resolve_position(position, now))
                .collect()
        });

        self.sequence += 1;
        let context = TickContext {
            sequence: self.sequence,
            now,
            mode,
            sources,
            refresh_reason: match trigger {
                TickTrigger::Scheduled => None,
                TickTrigger::Manual(reason) => Some(reason),
            },
        };
        let snapshot = Arc::new(self.aggregator.aggregate(resolved, context));
        self.last_mode = mode;

        let report = self.publisher.publish(Arc::clone(&snapshot)).await;
        self.set_phase(SchedulerPhase::Published);

        self.metrics.record_tick(mode, started.elapsed());
        self.metrics.record_position_warnings(&snapshot.warnings);
        self.metrics.set_risk_gauges(&snapshot.risk_metrics);

        tracing::info!(
            sequence = snapshot.sequence,
            mode = %mode,
            positions = snapshot.position_count(),
            warnings = snapshot.warnings.len(),
            delta_exposure = %snapshot.risk_metrics.delta_exposure,
            hedge_ratio = %snapshot.risk_metrics.hedge_ratio,
            delivered = report.delivered,
            failed = report.failed.len(),
            "Risk snapshot published"
        );

        self.set_phase(SchedulerPhase::Idle);
        snapshot
    }

    async fn fetch_all(&self) -> (PerExchange<Vec<Position>>, PerExchange<SourceStatus>) {
        let results = join_all(Exchange::ALL.map(|exchange| self.fetch_exchange(exchange))).await;

        let mut positions = PerExchange::<Vec<Position>>::default();
        let mut statuses = PerExchange::<SourceStatus>::default();
        for (exchange, (batch, status)) in Exchange::ALL.into_iter().zip(results) {
            *positions.get_mut(exchange) = batch;
            *statuses.get_mut(exchange) = status;
        }
        (positions, statuses)
    }

    async fn fetch_exchange(&self, exchange: Exchange) -> (Vec<Position>, SourceStatus) {
        let live = if self.config.force_synthetic {
            Err(UnavailableReason::ForcedSynthetic)
        } else {
            self.sources
                .live(exchange)
                .ok_or(UnavailableReason::NotConfigured)
        };

        let status = match live {
            Ok(source) => match self.fetch_bounded(source.as_ref(), exchange).await {
                Ok(positions) => {
                    tracing::debug!(
                        exchange = %exchange,
                        source = source.name(),
                        positions = positions.len(),
                        "Live positions fetched"
                    );
                    return (positions, SourceStatus::Live);
                }
                Err(error) => {
                    tracing::warn!(
                        exchange = %exchange,
                        source = source.name(),
                        error = %error,
                        "Live source unavailable, substituting synthetic positions"
                    );
                    self.metrics.record_source_failure(exchange, error.reason.label());
                    SourceStatus::Degraded {
                        reason: error.reason.to_string(),
                    }
                }
            },
            Err(reason) => {
                tracing::debug!(exchange = %exchange, reason = %reason, "Using synthetic positions");
                SourceStatus::Synthetic
            }
        };

        let synthetic = self.sources.synthetic.as_ref();
        match self.fetch_bounded(synthetic, exchange).await {
            Ok(positions) => (positions, status),
            Err(error) => {
                tracing::error!(
                    exchange = %exchange,
                    error = %error,
                    "Synthetic source failed, reporting no positions"
                );
                (Vec::new(), status)
            }
        }
    }

    async fn fetch_bounded(
        &self,
        source: &dyn PositionSource,
        exchange: Exchange,
    ) -> Result<Vec<Position>, SourceUnavailable> {
        tokio::time::timeout(self.config.fetch_timeout, source.fetch_positions(exchange))
            .await
            .unwrap_or_else(|_| Err(SourceUnavailable::new(exchange, UnavailableReason::Timeout)))
    }

    /// Run ticks until `shutdown` is cancelled.
    ///
    /// The first tick runs immediately. A tick in flight when shutdown is
    /// requested completes before the loop exits.
    pub async fn run(mut self, shutdown: CancellationToken) {
        let refresh = Arc::clone(&self.refresh);
        let mut period = self.current_interval();
        let mut interval = new_interval(tokio::time::Instant::now(), period);

        tracing::info!(
            live_interval_ms = self.config.live_interval.as_millis() as u64,
            degraded_interval_ms = self.config.degraded_interval.as_millis() as u64,
            force_synthetic = self.config.force_synthetic,
            "Update scheduler started"
        );

        loop {
            let trigger = tokio::select! {
                biased;
                () = shutdown.cancelled() => break,
                _ = interval.tick() => TickTrigger::Scheduled,
                reason = refresh.requested() => TickTrigger::Manual(reason),
            };

            self.run_tick_with(trigger).await;

            let next = self.current_interval();
            if next != period {
                tracing::info!(
                    mode = %self.last_mode,
                    interval_ms = next.as_millis() as u64,
                    "Tick interval changed"
                );
                period = next;
                interval = new_interval(tokio::time::Instant::now() + period, period);
            }
        }

        tracing::info!(sequence = self.sequence, "Update scheduler stopped");
    }

    /// Spawn the scheduler on the runtime.
    #[must_use]
    pub fn spawn(self, shutdown: CancellationToken) -> SchedulerHandle {
        let refresh = Arc::clone(&self.refresh);
        let phase = Arc::clone(&self.phase);
        let reader = self.publisher.reader();
        let task = tokio::spawn(self.run(shutdown.clone()));
        SchedulerHandle {
            shutdown,
            task,
            refresh,
            reader,
            phase,
        }
    }
}

fn new_interval(start: tokio::time::Instant, period: Duration) -> tokio::time::Interval {
    let mut interval = tokio::time::interval_at(start, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    interval
}

/// Overall mode from per-exchange feed states.
#[must_use]
pub fn feed_mode(sources: &PerExchange<SourceStatus>) -> FeedMode {
    let live = sources.iter().filter(|(_, status)| status.is_live()).count();
    if live == 0 {
        FeedMode::Synthetic
    } else if live == Exchange::ALL.len() {
        FeedMode::Live
    } else {
        FeedMode::Degraded
    }
}

// =============================================================================
// Handle
// =============================================================================

/// Handle on a running scheduler.
#[derive(Debug)]
pub struct SchedulerHandle {
    shutdown: CancellationToken,
    task: JoinHandle<()>,
    refresh: Arc<RefreshTrigger>,
    reader: SnapshotReader,
    phase: Arc<AtomicU8>,
}

impl SchedulerHandle {
    /// Request an out-of-cycle refresh.
    pub fn request_refresh(&self, reason: impl Into<String>) {
        self.refresh.request(reason);
    }

    /// Shared refresh trigger.
    #[must_use]
    pub fn refresh_trigger(&self) -> Arc<RefreshTrigger> {
        Arc::clone(&self.refresh)
    }

    /// Read handle on the current snapshot.
    #[must_use]
    pub fn reader(&self) -> SnapshotReader {
        self.reader.clone()
    }

    /// Current scheduler phase.
    #[must_use]
    pub fn phase(&self) -> SchedulerPhase {
        SchedulerPhase::from(self.phase.load(Ordering::SeqCst))
    }

    /// Whether the scheduler task has exited.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Stop scheduling and wait for the in-flight tick to finish.
    pub async fn shutdown(self) -> Result<(), JoinError> {
        self.shutdown.cancel();
        self.task.await
    }
}
