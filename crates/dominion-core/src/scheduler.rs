//! Named periodic background jobs driving the simulation.
//!
//! The scheduler owns one tokio task per job. Jobs are independent: each
//! runs on its own interval, catches and logs its own errors, and simply
//! waits for its next interval after a failure — a broken market tick
//! never stalls the expiration sweep.
//!
//! Shutdown is cooperative via a watch channel: after [`Scheduler::shutdown`]
//! no new iteration starts, the in-flight iteration (if any) finishes,
//! and every job task is joined before the call returns.
//!
//! The standard job set covers market tick, world tick, expiration sweep,
//! research progress, and settlement, each on its own configured interval.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info};

use crate::engine::{EngineError, GameEngine};

/// A spawned job and its display name.
#[derive(Debug)]
struct NamedJob {
    /// Job name used in logs.
    name: String,
    /// The driving tokio task.
    handle: JoinHandle<()>,
}

/// The background-job scheduler.
#[derive(Debug)]
pub struct Scheduler {
    /// Stop signal shared by every job.
    stop_tx: watch::Sender<bool>,
    /// All spawned jobs.
    jobs: Vec<NamedJob>,
}

impl Scheduler {
    /// Create a scheduler with no jobs.
    pub fn new() -> Self {
        let (stop_tx, _) = watch::channel(false);
        Self {
            stop_tx,
            jobs: Vec::new(),
        }
    }

    /// Spawn the standard job set against an engine.
    pub fn start(engine: &Arc<GameEngine>) -> Self {
        let intervals = engine.config().jobs.clone();
        let mut scheduler = Self::new();

        let market = Arc::clone(engine);
        scheduler.spawn(
            "market-tick",
            Duration::from_secs(intervals.market_tick_secs),
            move || {
                let _ = market.market_tick(Utc::now());
                Ok(())
            },
        );

        let world = Arc::clone(engine);
        scheduler.spawn(
            "world-tick",
            Duration::from_secs(intervals.world_tick_secs),
            move || {
                let _ = world.world_tick(Utc::now());
                Ok(())
            },
        );

        let sweeper = Arc::clone(engine);
        scheduler.spawn(
            "expiration-sweep",
            Duration::from_secs(intervals.expiration_sweep_secs),
            move || {
                let _ = sweeper.sweep_expirations(Utc::now());
                Ok(())
            },
        );

        let research = Arc::clone(engine);
        scheduler.spawn(
            "research-progress",
            Duration::from_secs(intervals.research_progress_secs),
            move || {
                let _ = research.research_tick(Utc::now());
                Ok(())
            },
        );

        let settlement = Arc::clone(engine);
        scheduler.spawn(
            "settlement",
            Duration::from_secs(intervals.settlement_secs),
            move || {
                settlement.settle(Utc::now());
                Ok(())
            },
        );

        info!(jobs = scheduler.jobs.len(), "Scheduler started");
        scheduler
    }

    /// Spawn one named periodic job.
    ///
    /// The first run happens one full period after the spawn. An `Err`
    /// from the body is logged and the job continues on its next
    /// interval; it is never rescheduled early.
    pub fn spawn<F>(&mut self, name: &str, period: Duration, mut job: F)
    where
        F: FnMut() -> Result<(), EngineError> + Send + 'static,
    {
        let mut stop_rx = self.stop_tx.subscribe();
        let name = name.to_owned();
        let job_name = name.clone();

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first interval tick completes immediately; consume it
            // so the job waits a full period before its first run.
            ticker.tick().await;

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        if let Err(err) = job() {
                            error!(
                                job = %job_name,
                                %err,
                                "Job iteration failed; continuing on next interval"
                            );
                        }
                    }
                    changed = stop_rx.changed() => {
                        if changed.is_err() || *stop_rx.borrow() {
                            debug!(job = %job_name, "Job stopping");
                            break;
                        }
                    }
                }
            }
        });

        self.jobs.push(NamedJob { name, handle });
    }

    /// Names of every spawned job, in spawn order.
    pub fn job_names(&self) -> Vec<String> {
        self.jobs.iter().map(|job| job.name.clone()).collect()
    }

    /// Stop every job and wait for them to finish.
    ///
    /// No iteration starts after this is called; an iteration already
    /// running completes before its task is joined.
    pub async fn shutdown(self) {
        let _ = self.stop_tx.send(true);
        for job in self.jobs {
            if let Err(err) = job.handle.await {
                error!(job = %job.name, %err, "Job task did not shut down cleanly");
            }
        }
        info!("Scheduler stopped");
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use dominion_types::{PlayerId, ResourceKind};

    use crate::config::GameConfig;

    use super::*;

    fn counter_job(counter: &Arc<AtomicU32>) -> impl FnMut() -> Result<(), EngineError> + Send + use<> {
        let counter = Arc::clone(counter);
        move || {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    /// Let spawned job tasks initialize, then step paused time forward.
    async fn step(seconds: u64) {
        tokio::task::yield_now().await;
        tokio::time::advance(Duration::from_secs(seconds)).await;
        tokio::task::yield_now().await;
    }

    #[tokio::test(start_paused = true)]
    async fn jobs_run_on_their_interval() {
        let counter = Arc::new(AtomicU32::new(0));
        let mut scheduler = Scheduler::new();
        scheduler.spawn("counter", Duration::from_secs(10), counter_job(&counter));

        // Nothing runs before the first period elapses.
        step(9).await;
        assert_eq!(counter.load(Ordering::SeqCst), 0);

        step(1).await;
        assert_eq!(counter.load(Ordering::SeqCst), 1);

        step(10).await;
        step(10).await;
        assert_eq!(counter.load(Ordering::SeqCst), 3);

        scheduler.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn failing_job_does_not_stop_its_neighbor() {
        let counter = Arc::new(AtomicU32::new(0));
        let failures = Arc::new(AtomicU32::new(0));

        let mut scheduler = Scheduler::new();
        let failure_count = Arc::clone(&failures);
        scheduler.spawn("flaky", Duration::from_secs(10), move || {
            failure_count.fetch_add(1, Ordering::SeqCst);
            Err(EngineError::InvalidCount)
        });
        scheduler.spawn("steady", Duration::from_secs(10), counter_job(&counter));

        for _ in 0..3 {
            step(10).await;
        }

        // The flaky job kept erroring and the steady one kept counting.
        assert_eq!(failures.load(Ordering::SeqCst), 3);
        assert_eq!(counter.load(Ordering::SeqCst), 3);

        scheduler.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_prevents_further_iterations() {
        let counter = Arc::new(AtomicU32::new(0));
        let mut scheduler = Scheduler::new();
        scheduler.spawn("counter", Duration::from_secs(10), counter_job(&counter));

        step(10).await;
        assert_eq!(counter.load(Ordering::SeqCst), 1);

        scheduler.shutdown().await;

        step(100).await;
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn standard_set_wires_all_five_jobs() {
        let engine = Arc::new(GameEngine::new(GameConfig::default()));
        let scheduler = Scheduler::start(&engine);

        assert_eq!(
            scheduler.job_names(),
            vec![
                "market-tick",
                "world-tick",
                "expiration-sweep",
                "research-progress",
                "settlement",
            ]
        );

        scheduler.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn standard_jobs_advance_engine_state() {
        let mut config = GameConfig::default();
        config.jobs.settlement_secs = 10;
        config.jobs.market_tick_secs = 10;
        let engine = Arc::new(GameEngine::new(config));

        // Materialize one player so settlement has someone to pay.
        let player = PlayerId::new();
        let _ = engine.balance(player, ResourceKind::Gold);
        let iron_before = engine.quote(ResourceKind::Iron).unwrap();

        let scheduler = Scheduler::start(&engine);
        step(11).await;
        scheduler.shutdown().await;

        // One settlement: +90 income, -1 morale.
        assert!((engine.balance(player, ResourceKind::Gold) - 1_090.0).abs() < 1e-9);
        assert!((engine.morale(player) - 99.0).abs() < f64::EPSILON);

        // One market tick: the quote timestamp moved.
        let iron_after = engine.quote(ResourceKind::Iron).unwrap();
        assert!(iron_after.updated_at >= iron_before.updated_at);
    }
}
