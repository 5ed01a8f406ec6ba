//! Scheduler Engine
//!
//! A single background task that wakes every `tick_interval`, pulls a fresh
//! reminder snapshot, and delivers every reminder due at the current minute.
//!
//! Evaluations are serialized behind one async lock. The lock guards the
//! engine's wiring (source, sink, clock) and the firing ledger, so a periodic
//! tick, an `evaluate_now` call and `stop` can never interleave. A reminder
//! fires at most once per `(reminder, date, minute)` occurrence: the ledger
//! remembers what fired during the current minute and is reset when the
//! minute changes. Missed ticks are skipped, never replayed.

use parking_lot::Mutex as SyncMutex;
use serde::Serialize;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior, interval_at, timeout};
use tracing::{debug, info, warn};

use crate::config::SchedulerConfig;
use crate::error::{AppError, Result};
use crate::observability::SchedulerMetrics;
use crate::scheduler::clock::{Clock, ClockReading};
use crate::scheduler::delivery::{DeliverySink, Notification};
use crate::scheduler::source::SnapshotSource;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EngineState {
    Stopped,
    Running,
}

/// Outcome of one evaluation
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TickReport {
    /// Reminders in the snapshot
    pub evaluated: usize,
    /// Reminders matching the current minute and weekday
    pub due: usize,
    pub delivered: usize,
    /// Delivery errors and timeouts
    pub failed: usize,
    /// Due but already fired during this minute
    pub suppressed: usize,
    /// True when nothing was evaluated: the engine was stopped or the
    /// snapshot could not be read
    pub skipped: bool,
}

impl TickReport {
    fn skipped() -> Self {
        Self {
            skipped: true,
            ..Self::default()
        }
    }
}

/// Dedupe keys fired during one minute
#[derive(Debug, Default)]
struct FiringLedger {
    minute: String,
    fired: HashSet<String>,
}

impl FiringLedger {
    fn roll_to(&mut self, minute: String) {
        if self.minute != minute {
            self.fired.clear();
            self.minute = minute;
        }
    }

    /// Records the key, returning false when it was already present
    fn record(&mut self, key: String) -> bool {
        self.fired.insert(key)
    }

    fn clear(&mut self) {
        self.fired.clear();
        self.minute.clear();
    }
}

#[derive(Clone)]
struct Wiring {
    source: Arc<dyn SnapshotSource>,
    sink: Arc<dyn DeliverySink>,
    clock: Arc<dyn Clock>,
}

struct EvalState {
    /// `Some` while running
    wiring: Option<Wiring>,
    ledger: FiringLedger,
}

struct EngineCore {
    eval: Mutex<EvalState>,
    state: SyncMutex<EngineState>,
    delivery_timeout: Duration,
    metrics: SchedulerMetrics,
}

struct Ticker {
    handle: JoinHandle<()>,
    shutdown: watch::Sender<bool>,
}

pub struct SchedulerEngine {
    config: SchedulerConfig,
    core: Arc<EngineCore>,
    ticker: SyncMutex<Option<Ticker>>,
}

impl SchedulerEngine {
    pub fn new(config: SchedulerConfig) -> Self {
        Self::with_metrics(config, SchedulerMetrics::new())
    }

    /// Engine reporting into shared metrics
    pub fn with_metrics(config: SchedulerConfig, metrics: SchedulerMetrics) -> Self {
        let core = EngineCore {
            eval: Mutex::new(EvalState {
                wiring: None,
                ledger: FiringLedger::default(),
            }),
            state: SyncMutex::new(EngineState::Stopped),
            delivery_timeout: config.delivery_timeout(),
            metrics,
        };
        Self {
            config,
            core: Arc::new(core),
            ticker: SyncMutex::new(None),
        }
    }

    pub fn state(&self) -> EngineState {
        *self.core.state.lock()
    }

    pub fn is_running(&self) -> bool {
        self.state() == EngineState::Running
    }

    pub fn metrics(&self) -> &SchedulerMetrics {
        &self.core.metrics
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// Start ticking.
    ///
    /// Evaluates once immediately, then every `tick_interval`. Returns the
    /// report of the immediate evaluation.
    pub async fn start(
        &self,
        source: Arc<dyn SnapshotSource>,
        sink: Arc<dyn DeliverySink>,
        clock: Arc<dyn Clock>,
    ) -> Result<TickReport> {
        let period = self.config.tick_interval();
        if period.is_zero() {
            return Err(AppError::Scheduler("tick interval must be positive".into()));
        }

        let mut eval = self.core.eval.lock().await;
        if eval.wiring.is_some() {
            return Err(AppError::Scheduler("scheduler already running".into()));
        }

        eval.wiring = Some(Wiring {
            source,
            sink,
            clock,
        });
        eval.ledger.clear();
        *self.core.state.lock() = EngineState::Running;
        info!(
            "Scheduler started (tick every {:?}, delivery timeout {:?})",
            period, self.core.delivery_timeout
        );

        let report = self.core.evaluate(&mut eval).await;

        let (shutdown, shutdown_rx) = watch::channel(false);
        let handle = tokio::spawn(run_ticker(self.core.clone(), period, shutdown_rx));
        if let Some(stale) = self.ticker.lock().replace(Ticker { handle, shutdown }) {
            stale.handle.abort();
        }

        Ok(report)
    }

    /// Evaluate immediately, outside the periodic schedule.
    ///
    /// Waits for any in-flight evaluation. A no-op (skipped report) when the
    /// engine is stopped.
    pub async fn evaluate_now(&self) -> TickReport {
        let mut eval = self.core.eval.lock().await;
        self.core.evaluate(&mut eval).await
    }

    /// Stop ticking and wait for the background task to exit.
    ///
    /// Idempotent. Once this returns no further deliveries happen.
    pub async fn stop(&self) {
        {
            let mut eval = self.core.eval.lock().await;
            if eval.wiring.take().is_none() {
                debug!("Scheduler stop requested while already stopped");
            }
            *self.core.state.lock() = EngineState::Stopped;
        }

        let ticker = self.ticker.lock().take();
        if let Some(ticker) = ticker {
            let _ = ticker.shutdown.send(true);
            if let Err(e) = ticker.handle.await {
                if !e.is_cancelled() {
                    warn!("Scheduler ticker ended abnormally: {}", e);
                }
            }
            info!("Scheduler stopped");
        }
    }
}

impl Drop for SchedulerEngine {
    fn drop(&mut self) {
        if let Some(ticker) = self.ticker.get_mut().take() {
            ticker.handle.abort();
        }
    }
}

async fn run_ticker(core: Arc<EngineCore>, period: Duration, mut shutdown: watch::Receiver<bool>) {
    let mut ticks = interval_at(Instant::now() + period, period);
    ticks.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = ticks.tick() => {
                let mut eval = core.eval.lock().await;
                if eval.wiring.is_none() {
                    break;
                }
                core.evaluate(&mut eval).await;
            }
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
            }
        }
    }
    debug!("Scheduler ticker exited");
}

impl EngineCore {
    async fn evaluate(&self, eval: &mut EvalState) -> TickReport {
        let Some(wiring) = eval.wiring.clone() else {
            return TickReport::skipped();
        };

        let reminders = match wiring.source.snapshot().await {
            Ok(reminders) => reminders,
            Err(e) => {
                warn!("Skipping evaluation, reminder snapshot unavailable: {}", e);
                self.metrics.record_snapshot_error();
                return TickReport::skipped();
            }
        };

        let now = wiring.clock.now();
        eval.ledger.roll_to(now.minute_stamp());

        let mut report = TickReport {
            evaluated: reminders.len(),
            ..TickReport::default()
        };

        for reminder in reminders
            .iter()
            .filter(|r| r.is_due_at(now.time, now.weekday))
        {
            report.due += 1;

            let key = Notification::dedupe_key(reminder, &now);
            if !eval.ledger.record(key) {
                report.suppressed += 1;
                continue;
            }

            let notification = Notification::for_reminder(reminder, &now);
            if self.deliver(&wiring, &notification, &now).await {
                report.delivered += 1;
                if let Err(e) = wiring.source.mark_triggered(reminder, now.instant).await {
                    warn!("Failed to record trigger time for {}: {}", reminder.id, e);
                }
            } else {
                report.failed += 1;
            }
        }

        self.metrics
            .record_evaluation(report.delivered, report.failed, report.suppressed);
        debug!(
            "Evaluated {} reminders at {} (weekday {}): due={} delivered={} failed={} suppressed={}",
            report.evaluated,
            now.minute_stamp(),
            now.weekday,
            report.due,
            report.delivered,
            report.failed,
            report.suppressed
        );
        report
    }

    /// Delivers one notification, isolating its failure
    async fn deliver(&self, wiring: &Wiring, notification: &Notification, now: &ClockReading) -> bool {
        match self.deliver_within_timeout(wiring, notification).await {
            Ok(()) => true,
            Err(e) => {
                warn!(
                    "Delivery of {} at {} failed: {}",
                    notification.reminder_id, now.time, e
                );
                false
            }
        }
    }

    async fn deliver_within_timeout(&self, wiring: &Wiring, notification: &Notification) -> Result<()> {
        timeout(self.delivery_timeout, wiring.sink.deliver(notification))
            .await
            .map_err(|_| {
                AppError::Timeout(format!(
                    "delivery of {} exceeded {:?}",
                    notification.reminder_id, self.delivery_timeout
                ))
            })?
    }
}
