//! Portfolio Monitor
//!
//! Drives periodic refresh cycles for an address and publishes each result
//! into a versioned [`SnapshotSlot`].
//!
//! - The slot is replaced whole on every publish; readers never see a
//!   partially written view.
//! - At most one cycle per address runs at a time. A timer tick or manual
//!   refresh that finds the address busy is skipped, not queued. The eager
//!   first cycle of a watch waits for the busy cycle to finish instead.
//! - A failed cycle keeps the previous snapshot and records `last_error`.
//! - Dropping or cancelling a [`MonitorHandle`] aborts its timer task along
//!   with any enrichment calls still in flight.
//! - Re-watching an address takes over its slot, so the last good view
//!   survives the restart.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::{Notify, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use super::{BalanceAggregator, RecommendationEngine, RiskAnalyzer, validate_address};
use crate::config::AdvisorConfig;
use crate::error::Result;
use crate::model::{PortfolioSnapshot, Recommendation, RiskMetrics};
use crate::source::{
    CoinGeckoClient, LedgerClient, MockLedger, MockPriceService, PriceService, SolanaRpcClient,
};

/// Everything the presentation layer reads for one address
#[derive(Clone, Debug, Serialize)]
pub struct PortfolioView {
    /// Incremented on every publish
    pub version: u64,
    pub address: String,
    /// Latest good snapshot
    pub snapshot: Option<Arc<PortfolioSnapshot>>,
    pub risk_metrics: Option<RiskMetrics>,
    pub recommendations: Vec<Recommendation>,
    /// A cycle is in progress
    pub is_loading: bool,
    /// Set when the last cycle's mandatory fetch failed
    pub last_error: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl PortfolioView {
    fn empty(address: impl Into<String>) -> Self {
        Self {
            version: 0,
            address: address.into(),
            snapshot: None,
            risk_metrics: None,
            recommendations: Vec::new(),
            is_loading: false,
            last_error: None,
            updated_at: Utc::now(),
        }
    }
}

/// Latest-view slot for one address, backed by a watch channel
pub struct SnapshotSlot {
    address: String,
    tx: watch::Sender<Arc<PortfolioView>>,
}

impl SnapshotSlot {
    pub fn new(address: impl Into<String>) -> Self {
        let address = address.into();
        let (tx, _rx) = watch::channel(Arc::new(PortfolioView::empty(address.clone())));
        Self { address, tx }
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    /// Current view
    pub fn latest(&self) -> Arc<PortfolioView> {
        self.tx.borrow().clone()
    }

    /// Receiver notified on every publish
    pub fn subscribe(&self) -> watch::Receiver<Arc<PortfolioView>> {
        self.tx.subscribe()
    }

    /// Replace the view with one derived from the current one; returns the
    /// new version.
    fn publish(&self, next: impl FnOnce(&PortfolioView) -> PortfolioView) -> u64 {
        let mut version = 0;
        self.tx.send_modify(|current| {
            let mut view = next(current);
            view.version = current.version + 1;
            view.updated_at = Utc::now();
            version = view.version;
            *current = Arc::new(view);
        });
        version
    }
}

/// Result of a single refresh attempt
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RefreshOutcome {
    Updated { version: u64 },
    Failed { error: String },
    /// Another cycle for the same address was still running
    Skipped,
}

/// Addresses with a cycle in progress
#[derive(Debug, Default)]
struct InFlight {
    addresses: Mutex<HashSet<String>>,
    released: Notify,
}

impl InFlight {
    fn try_acquire(self: &Arc<Self>, address: &str) -> Option<InFlightGuard> {
        let mut addresses = self.addresses.lock().unwrap_or_else(PoisonError::into_inner);
        addresses.insert(address.to_string()).then(|| InFlightGuard {
            in_flight: Arc::clone(self),
            address: address.to_string(),
        })
    }

    /// Wait until no cycle for `address` is running, then claim it
    async fn acquire(self: &Arc<Self>, address: &str) -> InFlightGuard {
        loop {
            // Registered before the check so a release in between is not missed
            let released = self.released.notified();
            if let Some(guard) = self.try_acquire(address) {
                return guard;
            }
            released.await;
        }
    }
}

/// Releases the address when the cycle ends or is aborted
struct InFlightGuard {
    in_flight: Arc<InFlight>,
    address: String,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.in_flight
            .addresses
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.address);
        self.in_flight.released.notify_waiters();
    }
}

/// Runs aggregation → analysis → recommendation cycles
#[derive(Clone)]
pub struct PortfolioMonitor {
    aggregator: Arc<BalanceAggregator>,
    analyzer: Arc<RiskAnalyzer>,
    engine: Arc<RecommendationEngine>,
    in_flight: Arc<InFlight>,
    refresh_interval: Duration,
}

impl PortfolioMonitor {
    pub fn new(
        aggregator: BalanceAggregator,
        analyzer: RiskAnalyzer,
        engine: RecommendationEngine,
        refresh_interval: Duration,
    ) -> Self {
        Self {
            aggregator: Arc::new(aggregator),
            analyzer: Arc::new(analyzer),
            engine: Arc::new(engine),
            in_flight: Arc::default(),
            refresh_interval,
        }
    }

    /// Monitor wired to network or demo sources according to `config`,
    /// with default thresholds and rules
    pub fn from_config(config: &AdvisorConfig) -> Self {
        let (ledger, prices): (Arc<dyn LedgerClient>, Arc<dyn PriceService>) =
            if config.use_mock_sources {
                (Arc::new(MockLedger::demo()), Arc::new(MockPriceService::demo()))
            } else {
                (
                    Arc::new(SolanaRpcClient::from_config(config)),
                    Arc::new(CoinGeckoClient::from_config(config)),
                )
            };

        Self::new(
            BalanceAggregator::from_config(ledger, prices, config),
            RiskAnalyzer::default(),
            RecommendationEngine::default(),
            config.refresh_interval,
        )
    }

    pub const fn refresh_interval(&self) -> Duration {
        self.refresh_interval
    }

    /// Run one cycle for the slot's address, unless one is already running
    pub async fn refresh(&self, slot: &SnapshotSlot) -> RefreshOutcome {
        let Some(guard) = self.in_flight.try_acquire(slot.address()) else {
            tracing::debug!("Refresh for {} already in flight, skipping", slot.address());
            return RefreshOutcome::Skipped;
        };
        self.run_cycle(slot, guard).await
    }

    /// Aggregate, analyze and publish while holding the address's guard
    async fn run_cycle(&self, slot: &SnapshotSlot, _guard: InFlightGuard) -> RefreshOutcome {
        let address = slot.address();
        slot.publish(|prev| PortfolioView {
            is_loading: true,
            ..prev.clone()
        });

        match self.aggregator.aggregate(address).await {
            Ok(snapshot) => {
                let metrics = self.analyzer.analyze(&snapshot);
                let recommendations = self.engine.recommend(&snapshot);
                tracing::info!(
                    "Refreshed {}: ${:.2} across {} assets, overall risk {:.1}, {} recommendations",
                    address,
                    snapshot.total_value(),
                    snapshot.asset_count(),
                    metrics.overall_risk,
                    recommendations.len()
                );

                let snapshot = Arc::new(snapshot);
                let version = slot.publish(|prev| PortfolioView {
                    snapshot: Some(snapshot),
                    risk_metrics: Some(metrics),
                    recommendations,
                    is_loading: false,
                    last_error: None,
                    ..prev.clone()
                });
                RefreshOutcome::Updated { version }
            }
            Err(e) => {
                tracing::warn!("Refresh for {} failed: {}", address, e);
                let error = e.user_message();
                slot.publish(|prev| PortfolioView {
                    is_loading: false,
                    last_error: Some(error.clone()),
                    ..prev.clone()
                });
                RefreshOutcome::Failed { error }
            }
        }
    }

    /// Start refreshing `address` now and then on every interval tick
    pub fn watch(&self, address: &str) -> Result<MonitorHandle> {
        let address = validate_address(address)?;
        Ok(self.spawn(Arc::new(SnapshotSlot::new(address))))
    }

    /// Cancel `previous` and restart its timer on the same slot. The last
    /// published view stays readable until the new cycle replaces it.
    pub fn rewatch(&self, previous: MonitorHandle) -> MonitorHandle {
        let slot = Arc::clone(previous.slot());
        // Dropping cancels the old timer
        drop(previous);
        self.spawn(slot)
    }

    fn spawn(&self, slot: Arc<SnapshotSlot>) -> MonitorHandle {
        let monitor = self.clone();
        let task_slot = Arc::clone(&slot);
        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(monitor.refresh_interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            // First tick completes immediately; the eager cycle is never skipped
            ticker.tick().await;
            let guard = monitor.in_flight.acquire(task_slot.address()).await;
            monitor.run_cycle(&task_slot, guard).await;

            loop {
                ticker.tick().await;
                monitor.refresh(&task_slot).await;
            }
        });

        tracing::info!(
            "Watching {} every {}s",
            slot.address(),
            self.refresh_interval.as_secs()
        );
        MonitorHandle {
            slot,
            task,
            cancelled: AtomicBool::new(false),
        }
    }
}

/// Owns the timer task for one watched address
pub struct MonitorHandle {
    slot: Arc<SnapshotSlot>,
    task: JoinHandle<()>,
    cancelled: AtomicBool,
}

impl MonitorHandle {
    pub fn address(&self) -> &str {
        self.slot.address()
    }

    pub fn slot(&self) -> &Arc<SnapshotSlot> {
        &self.slot
    }

    pub fn latest(&self) -> Arc<PortfolioView> {
        self.slot.latest()
    }

    pub fn subscribe(&self) -> watch::Receiver<Arc<PortfolioView>> {
        self.slot.subscribe()
    }

    /// Stop the timer and abandon any in-flight cycle. Idempotent.
    ///
    /// A view left mid-cycle is republished with `is_loading` cleared.
    pub fn cancel(&self) {
        if !self.cancelled.swap(true, Ordering::SeqCst) {
            self.task.abort();
            if self.slot.latest().is_loading {
                self.slot.publish(|prev| PortfolioView {
                    is_loading: false,
                    ..prev.clone()
                });
            }
            tracing::info!("Stopped watching {}", self.slot.address());
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

impl Drop for MonitorHandle {
    fn drop(&mut self) {
        self.cancel();
    }
}
