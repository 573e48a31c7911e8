//! Periodic fleet poll loop.
//!
//! Each cycle:
//!
//! 1. reload configuration (keeping the previous snapshot on failure),
//! 2. reclaim dead workers,
//! 3. fetch board items,
//! 4. dispatch every category in fixed order.
//!
//! A failure inside one category is logged and the next category still runs.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, info_span, warn, Instrument};

use crate::config::{ConfigLoader, FleetConfig};
use crate::models::work_item::{Category, UnitOfWork, WorkItem};
use crate::models::worker::WorkerSlot;
use crate::notify::{assignment_message, Notifier};
use crate::orchestrator::task::TaskRunner;
use crate::orchestrator::worker_pool::{CompletionContext, WorkerPool};
use crate::source::WorkSource;
use crate::Result;

/// One successful dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dispatch {
    /// What was launched.
    pub unit: UnitOfWork,
    /// Slot it occupies; `None` in unbounded mode.
    pub slot: Option<usize>,
    /// Reported agent pid.
    pub pid: Option<u32>,
}

/// Outcome of one poll cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleReport {
    /// Slots freed by dead-worker cleanup.
    pub reclaimed: Vec<usize>,
    /// Units launched this cycle.
    pub dispatched: Vec<Dispatch>,
    /// Units skipped because work already exists for them.
    pub skipped: Vec<UnitOfWork>,
    /// Units left for a later cycle because the pool was full.
    pub deferred: Vec<UnitOfWork>,
    /// Units whose launch failed.
    pub failed: Vec<UnitOfWork>,
    /// Categories aborted by an error.
    pub category_errors: Vec<Category>,
    /// Whether the board fetch failed.
    pub fetch_failed: bool,
}

/// Fleet poller.
pub struct Poller {
    loader: Arc<dyn ConfigLoader>,
    source: Arc<dyn WorkSource>,
    task: Arc<dyn TaskRunner>,
    notifier: Option<Arc<dyn Notifier>>,
    current: Arc<FleetConfig>,
    initialized_slots: usize,
}

impl Poller {
    /// Build a poller and load the initial configuration.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` when the first load fails.
    pub fn new(
        loader: Arc<dyn ConfigLoader>,
        source: Arc<dyn WorkSource>,
        task: Arc<dyn TaskRunner>,
        notifier: Option<Arc<dyn Notifier>>,
    ) -> Result<Self> {
        let current = loader.load()?;
        Ok(Self {
            loader,
            source,
            task,
            notifier,
            current,
            initialized_slots: 0,
        })
    }

    /// Active configuration snapshot.
    #[must_use]
    pub fn config(&self) -> &Arc<FleetConfig> {
        &self.current
    }

    fn pool(&self) -> WorkerPool {
        WorkerPool::new(&self.current, Arc::clone(&self.task))
    }

    /// Create missing worker status files for the configured pool size.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Io` if a status file cannot be written.
    pub fn startup(&mut self) -> Result<()> {
        let n = self.current.server.num_workers;
        self.pool().init(n)?;
        self.initialized_slots = n;
        info!(num_workers = n, "worker pool ready");
        Ok(())
    }

    fn reload(&mut self) {
        match self.loader.load() {
            Ok(config) => self.current = config,
            Err(err) => warn!(%err, "config reload failed, keeping previous snapshot"),
        }
        self.source.reconfigure(&self.current);
        self.task.reconfigure(&self.current);
        if let Some(notifier) = &self.notifier {
            notifier.reconfigure(&self.current);
        }
    }

    fn notifier(&self) -> Option<&dyn Notifier> {
        self.notifier
            .as_deref()
            .filter(|_| self.current.telegram.is_some())
    }

    /// Run one poll cycle.
    pub async fn run_cycle(&mut self) -> CycleReport {
        self.reload();
        let config = Arc::clone(&self.current);
        let n = config.server.num_workers;
        let pool = self.pool();
        let mut report = CycleReport::default();

        if n > self.initialized_slots {
            match pool.init(n) {
                Ok(()) => self.initialized_slots = n,
                Err(err) => warn!(%err, "failed to grow worker pool"),
            }
        }

        if n > 0 {
            let ctx = CompletionContext {
                config: &config,
                notifier: self.notifier(),
                source: Some(self.source.as_ref()),
            };
            report.reclaimed = pool.cleanup_dead(n, &ctx).await;
        }

        let items = match self.source.fetch_items().await {
            Ok(items) => items,
            Err(err) => {
                error!(%err, "failed to fetch work items");
                report.fetch_failed = true;
                return report;
            }
        };
        debug!(count = items.len(), "fetched work items");

        let bounded = (n > 0).then_some(&pool);
        for category in Category::ALL {
            let span = info_span!("dispatch", %category);
            if let Err(err) = self
                .dispatch_category(&config, bounded, category, &items, &mut report)
                .instrument(span)
                .await
            {
                error!(%category, %err, "category dispatch aborted");
                report.category_errors.push(category);
            }
        }
        report
    }

    async fn dispatch_category(
        &self,
        config: &FleetConfig,
        pool: Option<&WorkerPool>,
        category: Category,
        items: &[WorkItem],
        report: &mut CycleReport,
    ) -> Result<()> {
        let n = config.server.num_workers;
        for number in category.select(items) {
            let unit = UnitOfWork::new(category, number);

            if let Some(slot) = pool.and_then(|p| p.find_busy(n, number)) {
                debug!(%unit, slot, "already running in pool");
                report.skipped.push(unit);
                continue;
            }
            if self.task.exists(unit).await {
                debug!(%unit, "work already exists");
                report.skipped.push(unit);
                continue;
            }

            let slot = match pool {
                Some(pool) => {
                    let Some(slot) = pool.get_free(n) else {
                        info!(%unit, "no free worker, deferring category");
                        report.deferred.push(unit);
                        break;
                    };
                    pool.write(slot, &WorkerSlot::busy(number, None))?;
                    Some(slot)
                }
                None => None,
            };

            match self.task.spawn(unit).await {
                Ok(pid) => {
                    if let (Some(pool), Some(slot)) = (pool, slot) {
                        pool.write(slot, &WorkerSlot::busy(number, pid))?;
                    }
                    info!(%unit, ?slot, ?pid, "dispatched");
                    report.dispatched.push(Dispatch { unit, slot, pid });
                    self.announce(config, unit, slot).await;
                }
                Err(err) => {
                    error!(%unit, %err, "launch failed");
                    if let (Some(pool), Some(slot)) = (pool, slot) {
                        pool.release(slot)?;
                    }
                    report.failed.push(unit);
                }
            }
        }
        Ok(())
    }

    async fn announce(&self, config: &FleetConfig, unit: UnitOfWork, slot: Option<usize>) {
        let Some(notifier) = self.notifier() else {
            return;
        };
        if let Err(err) = notifier.send(&assignment_message(config, unit, slot)).await {
            warn!(%unit, %err, "assignment notice failed");
        }
    }

    /// Poll until `cancel` fires, sleeping the configured period between cycles.
    pub async fn run(mut self, cancel: CancellationToken) {
        info!("poller started");
        while !cancel.is_cancelled() {
            let report = self.run_cycle().await;
            info!(
                reclaimed = report.reclaimed.len(),
                dispatched = report.dispatched.len(),
                skipped = report.skipped.len(),
                deferred = report.deferred.len(),
                failed = report.failed.len(),
                "poll cycle complete"
            );

            if cancel.is_cancelled() {
                break;
            }
            let period = self.current.server.period;
            tokio::select! {
                () = cancel.cancelled() => break,
                () = tokio::time::sleep(period) => {}
            }
        }
        info!("poller shutting down");
    }
}
