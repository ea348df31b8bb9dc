//! Quest and research lifecycle tracking for the Dominion game engine.
//!
//! A task moves strictly forward: `Active` to exactly one of `Completed`,
//! `Failed`, or `Expired`, and terminal states are final. The tracker is
//! the sole mutator of task status.
//!
//! - **Accepting** validates the definition, the owner's concurrent-task
//!   cap, duplicate instances, research prerequisites, and unit
//!   requirements, then charges the acceptance cost through the ledger.
//!   Validation failures are reported before any mutation.
//! - **Advancing** clamps progress into `[0, 1]`; hitting `1.0` completes
//!   the task in the same call, paying rewards and recording completed
//!   research. `complete` on an already-terminal task is a no-op.
//! - **Sweeping** expires every active task that has outlived its
//!   definition's duration. The scheduler runs the sweep at least once per
//!   sweep interval, so no task stays active indefinitely.
//! - **Research** progresses automatically each research job run, scaled
//!   by the owner's accumulated research-speed effects; quests progress
//!   only through gameplay.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, info, warn};

use dominion_catalog::Catalog;
use dominion_ledger::{EntryDetails, LedgerError, LedgerStore};
use dominion_types::{
    PlayerId, ResourceKind, Reward, Task, TaskDefinition, TaskId, TaskKind, TaskStatus,
    TechEffect, TradeKind,
};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors produced by task operations.
#[derive(Debug, thiserror::Error)]
pub enum TaskError {
    /// The definition id does not exist in the catalog.
    #[error("unknown task definition: {0}")]
    UnknownDefinition(String),

    /// The task id does not exist.
    #[error("unknown task: {0}")]
    UnknownTask(TaskId),

    /// The operation requires an active task.
    #[error("task {task} is {status:?}, not active")]
    NotActive {
        /// The task that was addressed.
        task: TaskId,
        /// Its actual status.
        status: TaskStatus,
    },

    /// The owner already runs an active instance of this definition.
    #[error("an active instance of {0} already exists")]
    AlreadyActive(String),

    /// The owner is at the concurrent-task cap.
    #[error("too many active tasks (cap {cap})")]
    TooManyActive {
        /// The configured cap.
        cap: usize,
    },

    /// The research was already completed by this owner.
    #[error("research {0} is already completed")]
    AlreadyResearched(String),

    /// A research prerequisite has not been completed.
    #[error("prerequisite {missing} for {definition} not completed")]
    PrerequisiteMissing {
        /// The definition being accepted.
        definition: String,
        /// The missing prerequisite.
        missing: String,
    },

    /// The owner lacks units required by the definition.
    #[error("requires {required} {unit}, only {held} held")]
    MissingUnits {
        /// The required unit type.
        unit: String,
        /// How many the definition requires.
        required: u32,
        /// How many the owner holds.
        held: u32,
    },

    /// Charging the acceptance cost failed.
    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

// ---------------------------------------------------------------------------
// Configuration and outcomes
// ---------------------------------------------------------------------------

/// Tuning parameters for the tracker.
#[derive(Debug, Clone)]
pub struct TaskTuning {
    /// Maximum simultaneously active tasks per owner.
    pub max_active_per_owner: usize,
}

impl Default for TaskTuning {
    fn default() -> Self {
        Self {
            max_active_per_owner: 3,
        }
    }
}

/// Result of an `advance` call.
#[derive(Debug, Clone, PartialEq)]
pub enum AdvanceOutcome {
    /// Progress moved but the task is still active.
    Progressed(Task),
    /// The task crossed 1.0 and completed within this call.
    Completed {
        /// The task in its terminal state.
        task: Task,
        /// The rewards that were paid.
        rewards: Vec<Reward>,
    },
}

/// Internal mutable state, held under one lock.
#[derive(Debug, Default)]
struct TrackerState {
    /// Every task ever accepted, keyed by id.
    tasks: BTreeMap<TaskId, Task>,
    /// Completed research definition ids per owner.
    completed_research: BTreeMap<PlayerId, BTreeSet<String>>,
}

// ---------------------------------------------------------------------------
// Tracker
// ---------------------------------------------------------------------------

/// The quest/research tracker.
#[derive(Debug)]
pub struct TaskTracker {
    /// Shared immutable definitions.
    catalog: Arc<Catalog>,
    /// Tuning parameters.
    tuning: TaskTuning,
    /// Ledger used for acceptance costs and reward payout.
    ledger: Arc<LedgerStore>,
    /// All mutable tracker state.
    state: Mutex<TrackerState>,
}

/// Recover the guard from a poisoned lock; tracker state mutations are
/// validated before being written, so the inner value stays coherent.
fn relock<'a, T>(result: Result<MutexGuard<'a, T>, PoisonError<MutexGuard<'a, T>>>) -> MutexGuard<'a, T> {
    result.unwrap_or_else(PoisonError::into_inner)
}

impl TaskTracker {
    /// Create an empty tracker.
    pub fn new(catalog: Arc<Catalog>, ledger: Arc<LedgerStore>, tuning: TaskTuning) -> Self {
        Self {
            catalog,
            tuning,
            ledger,
            state: Mutex::new(TrackerState::default()),
        }
    }

    /// Accept a task definition for an owner.
    ///
    /// All validation happens before the acceptance cost is charged and
    /// before the instance is created, so a failed accept changes nothing.
    pub fn accept(
        &self,
        owner: PlayerId,
        definition_id: &str,
        now: DateTime<Utc>,
    ) -> Result<Task, TaskError> {
        let definition = self
            .catalog
            .task(definition_id)
            .ok_or_else(|| TaskError::UnknownDefinition(definition_id.to_owned()))?
            .clone();

        // One lock scope for the whole accept, so two concurrent accepts
        // cannot both pass the duplicate or cap checks.
        let mut state = relock(self.state.lock());

        let active: Vec<&Task> = state
            .tasks
            .values()
            .filter(|t| t.owner == owner && t.status == TaskStatus::Active)
            .collect();
        if active.iter().any(|t| t.definition_id == definition.id) {
            return Err(TaskError::AlreadyActive(definition.id));
        }
        if active.len() >= self.tuning.max_active_per_owner {
            return Err(TaskError::TooManyActive {
                cap: self.tuning.max_active_per_owner,
            });
        }

        if definition.kind == TaskKind::Research {
            let done = state.completed_research.get(&owner);
            if done.is_some_and(|d| d.contains(&definition.id)) {
                return Err(TaskError::AlreadyResearched(definition.id));
            }
            for prereq in &definition.prerequisites {
                if !done.is_some_and(|d| d.contains(prereq)) {
                    return Err(TaskError::PrerequisiteMissing {
                        definition: definition.id,
                        missing: prereq.clone(),
                    });
                }
            }
        }

        let held = self.ledger.unit_counts(owner);
        for (unit, &required) in &definition.required_units {
            let have = held.get(unit).copied().unwrap_or(0);
            if have < required {
                return Err(TaskError::MissingUnits {
                    unit: unit.clone(),
                    required,
                    held: have,
                });
            }
        }

        self.charge_acceptance(owner, &definition)?;

        let task = Task {
            id: TaskId::new(),
            owner,
            definition_id: definition.id.clone(),
            kind: definition.kind,
            status: TaskStatus::Active,
            progress: 0.0,
            started_at: now,
            // A duration too large for the calendar just never expires.
            expires_at: Duration::try_seconds(i64::try_from(definition.duration_secs).unwrap_or(i64::MAX))
                .and_then(|d| now.checked_add_signed(d))
                .unwrap_or(DateTime::<Utc>::MAX_UTC),
            finished_at: None,
        };

        state.tasks.insert(task.id, task.clone());
        info!(%owner, definition = definition.id, task = %task.id, "Task accepted");
        Ok(task)
    }

    /// Charge the acceptance cost, refunding anything already debited when
    /// a later debit fails, so a rejected accept never keeps partial
    /// payment.
    fn charge_acceptance(
        &self,
        owner: PlayerId,
        definition: &TaskDefinition,
    ) -> Result<(), TaskError> {
        let mut charged: Vec<(ResourceKind, f64)> = Vec::new();
        for (&kind, &amount) in &definition.acceptance_cost {
            let details = EntryDetails::new(
                0.0,
                TradeKind::Spend,
                format!("Started {}", definition.title),
            );
            if let Err(err) = self.ledger.debit(owner, kind, amount, &details) {
                for (kind, amount) in charged {
                    let refund = EntryDetails::new(
                        0.0,
                        TradeKind::Earn,
                        format!("Refund: {}", definition.title),
                    );
                    let _ = self.ledger.credit(owner, kind, amount, &refund);
                }
                return Err(err.into());
            }
            charged.push((kind, amount));
        }
        Ok(())
    }

    /// Increment a task's progress, completing it when it reaches 1.0.
    pub fn advance(
        &self,
        task_id: TaskId,
        delta: f64,
        now: DateTime<Utc>,
    ) -> Result<AdvanceOutcome, TaskError> {
        let completed = {
            let mut state = relock(self.state.lock());
            let task = state
                .tasks
                .get_mut(&task_id)
                .ok_or(TaskError::UnknownTask(task_id))?;
            if task.status != TaskStatus::Active {
                return Err(TaskError::NotActive {
                    task: task_id,
                    status: task.status,
                });
            }
            task.progress = (task.progress + delta).clamp(0.0, 1.0);
            task.progress >= 1.0
        };

        if completed {
            // Completion runs inside this same call, not as a separate
            // caller-initiated step.
            if let Some((task, rewards)) = self.complete(task_id, now)? {
                return Ok(AdvanceOutcome::Completed { task, rewards });
            }
        }

        let state = relock(self.state.lock());
        let task = state
            .tasks
            .get(&task_id)
            .ok_or(TaskError::UnknownTask(task_id))?;
        Ok(AdvanceOutcome::Progressed(task.clone()))
    }

    /// Complete a task, paying its rewards.
    ///
    /// Idempotent: completing an already-terminal task returns `None`
    /// and changes nothing.
    pub fn complete(
        &self,
        task_id: TaskId,
        now: DateTime<Utc>,
    ) -> Result<Option<(Task, Vec<Reward>)>, TaskError> {
        let (task, definition) = {
            let mut state = relock(self.state.lock());
            let task = state
                .tasks
                .get_mut(&task_id)
                .ok_or(TaskError::UnknownTask(task_id))?;
            if task.status.is_terminal() {
                return Ok(None);
            }

            task.status = TaskStatus::Completed;
            task.progress = 1.0;
            task.finished_at = Some(now);
            let task = task.clone();

            if task.kind == TaskKind::Research {
                state
                    .completed_research
                    .entry(task.owner)
                    .or_default()
                    .insert(task.definition_id.clone());
            }

            let definition = self.catalog.task(&task.definition_id).cloned();
            (task, definition)
        };

        let rewards = definition.map(|d| d.rewards).unwrap_or_default();
        self.pay_rewards(&task, &rewards);
        info!(task = %task.id, owner = %task.owner, "Task completed");
        Ok(Some((task, rewards)))
    }

    /// Explicitly fail a task.
    ///
    /// Like `complete`, a no-op on already-terminal tasks.
    pub fn fail(
        &self,
        task_id: TaskId,
        reason: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<Task>, TaskError> {
        let mut state = relock(self.state.lock());
        let task = state
            .tasks
            .get_mut(&task_id)
            .ok_or(TaskError::UnknownTask(task_id))?;
        if task.status.is_terminal() {
            return Ok(None);
        }
        task.status = TaskStatus::Failed;
        task.finished_at = Some(now);
        info!(task = %task_id, reason, "Task failed");
        Ok(Some(task.clone()))
    }

    /// Expire every active task that has outlived its duration.
    ///
    /// Returns the tasks that transitioned; already-terminal tasks are
    /// untouched.
    pub fn sweep_expirations(&self, now: DateTime<Utc>) -> Vec<Task> {
        let mut state = relock(self.state.lock());
        let mut expired = Vec::new();
        for task in state.tasks.values_mut() {
            if task.status == TaskStatus::Active && now > task.expires_at {
                task.status = TaskStatus::Expired;
                task.finished_at = Some(now);
                expired.push(task.clone());
            }
        }
        if !expired.is_empty() {
            info!(count = expired.len(), "Tasks expired by sweep");
        }
        expired
    }

    /// Advance every active research task by one job interval.
    ///
    /// Each task gains `interval_secs / duration_secs`, scaled by the
    /// owner's research-speed effects, so an unmodified project finishes
    /// in roughly its nominal duration. Returns completion outcomes.
    pub fn advance_research(
        &self,
        interval_secs: f64,
        now: DateTime<Utc>,
    ) -> Vec<(Task, Vec<Reward>)> {
        let candidates: Vec<(TaskId, f64)> = {
            let state = relock(self.state.lock());
            state
                .tasks
                .values()
                .filter(|t| t.status == TaskStatus::Active && t.kind == TaskKind::Research)
                .filter_map(|t| {
                    let def = self.catalog.task(&t.definition_id)?;
                    let duration = f64::from(u32::try_from(def.duration_secs).unwrap_or(u32::MAX));
                    if duration <= 0.0 {
                        return None;
                    }
                    let speed = Self::research_speed_locked(&state, self.catalog.as_ref(), t.owner);
                    Some((t.id, interval_secs / duration * speed))
                })
                .collect()
        };

        let mut completions = Vec::new();
        for (task_id, delta) in candidates {
            match self.advance(task_id, delta, now) {
                Ok(AdvanceOutcome::Completed { task, rewards }) => {
                    completions.push((task, rewards));
                }
                Ok(AdvanceOutcome::Progressed(_)) => {}
                Err(err) => warn!(task = %task_id, %err, "Research advance failed"),
            }
        }
        completions
    }

    /// Research-speed multiplier for an owner (1.0 plus bonuses).
    pub fn research_speed(&self, owner: PlayerId) -> f64 {
        let state = relock(self.state.lock());
        Self::research_speed_locked(&state, self.catalog.as_ref(), owner)
    }

    /// All technology effects the owner has unlocked.
    pub fn effects(&self, owner: PlayerId) -> Vec<TechEffect> {
        let state = relock(self.state.lock());
        Self::effects_locked(&state, self.catalog.as_ref(), owner)
    }

    /// Definition ids of the owner's completed research.
    pub fn completed_research(&self, owner: PlayerId) -> BTreeSet<String> {
        relock(self.state.lock())
            .completed_research
            .get(&owner)
            .cloned()
            .unwrap_or_default()
    }

    /// Look up a task by id.
    pub fn task(&self, task_id: TaskId) -> Option<Task> {
        relock(self.state.lock()).tasks.get(&task_id).cloned()
    }

    /// Every task belonging to an owner, in id (acceptance) order.
    pub fn tasks_for(&self, owner: PlayerId) -> Vec<Task> {
        relock(self.state.lock())
            .tasks
            .values()
            .filter(|t| t.owner == owner)
            .cloned()
            .collect()
    }

    /// Number of active tasks across all owners.
    pub fn active_count(&self) -> usize {
        relock(self.state.lock())
            .tasks
            .values()
            .filter(|t| t.status == TaskStatus::Active)
            .count()
    }

    /// Clone tracker state for persistence.
    pub fn export(&self) -> (Vec<Task>, BTreeMap<PlayerId, BTreeSet<String>>) {
        let state = relock(self.state.lock());
        (
            state.tasks.values().cloned().collect(),
            state.completed_research.clone(),
        )
    }

    /// Restore previously exported tracker state.
    pub fn import(&self, tasks: Vec<Task>, research: BTreeMap<PlayerId, BTreeSet<String>>) {
        let mut state = relock(self.state.lock());
        state.tasks = tasks.into_iter().map(|t| (t.id, t)).collect();
        state.completed_research = research;
    }

    /// Pay a completed task's rewards through the ledger.
    ///
    /// A reward that fails ledger validation is a data-integrity anomaly
    /// in the catalog; it degrades to a logged warning, never a crash.
    fn pay_rewards(&self, task: &Task, rewards: &[Reward]) {
        let description = format!("Reward: {}", task.definition_id);
        for reward in rewards {
            let result = match reward {
                Reward::Gold(amount) => self
                    .ledger
                    .credit(
                        task.owner,
                        ResourceKind::Gold,
                        *amount,
                        &EntryDetails::new(1.0, TradeKind::Earn, description.clone()),
                    )
                    .map(|_| ()),
                Reward::Resource { kind, amount } => self
                    .ledger
                    .credit(
                        task.owner,
                        *kind,
                        *amount,
                        &EntryDetails::new(0.0, TradeKind::Earn, description.clone()),
                    )
                    .map(|_| ()),
                Reward::Morale(delta) => {
                    let _ = self.ledger.adjust_morale(task.owner, *delta);
                    Ok(())
                }
            };
            if let Err(err) = result {
                warn!(task = %task.id, %err, "Reward payout skipped");
            }
        }
        debug!(task = %task.id, rewards = rewards.len(), "Rewards paid");
    }

    /// Research speed with the state lock already held.
    fn research_speed_locked(state: &TrackerState, catalog: &Catalog, owner: PlayerId) -> f64 {
        let bonus: f64 = Self::effects_locked(state, catalog, owner)
            .iter()
            .map(|effect| match effect {
                TechEffect::ResearchSpeed(speed) => *speed,
                _ => 0.0,
            })
            .sum();
        1.0 + bonus
    }

    /// Effects with the state lock already held.
    fn effects_locked(
        state: &TrackerState,
        catalog: &Catalog,
        owner: PlayerId,
    ) -> Vec<TechEffect> {
        state
            .completed_research
            .get(&owner)
            .map(|done| {
                done.iter()
                    .filter_map(|id| catalog.task(id))
                    .flat_map(|def: &TaskDefinition| def.effects.iter().cloned())
                    .collect()
            })
            .unwrap_or_default()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use dominion_ledger::LedgerConfig;

    use super::*;

    fn tracker() -> (TaskTracker, Arc<LedgerStore>) {
        let catalog = Arc::new(Catalog::standard());
        let ledger = Arc::new(LedgerStore::new(LedgerConfig::default()));
        (
            TaskTracker::new(catalog, Arc::clone(&ledger), TaskTuning::default()),
            ledger,
        )
    }

    fn fund_knowledge(ledger: &LedgerStore, owner: PlayerId, amount: f64) {
        let _ = ledger.credit(
            owner,
            ResourceKind::Knowledge,
            amount,
            &EntryDetails::new(0.0, TradeKind::Earn, "grant"),
        );
    }

    #[test]
    fn accept_creates_an_active_task() {
        let (tracker, _ledger) = tracker();
        let owner = PlayerId::new();
        let now = Utc::now();

        let task = tracker.accept(owner, "recon_patrol", now).unwrap();
        assert_eq!(task.status, TaskStatus::Active);
        assert!(task.progress.abs() < f64::EPSILON);
        assert_eq!(task.expires_at, now + Duration::seconds(3_600));
    }

    #[test]
    fn duplicate_definition_is_rejected() {
        let (tracker, _ledger) = tracker();
        let owner = PlayerId::new();
        let now = Utc::now();

        let _ = tracker.accept(owner, "recon_patrol", now).unwrap();
        let result = tracker.accept(owner, "recon_patrol", now);
        assert!(matches!(result, Err(TaskError::AlreadyActive(_))));
    }

    #[test]
    fn concurrent_cap_is_three() {
        let (tracker, _ledger) = tracker();
        let owner = PlayerId::new();
        let now = Utc::now();

        for id in ["recon_patrol", "deep_recon", "convoy_escort"] {
            assert!(tracker.accept(owner, id, now).is_ok());
        }
        let result = tracker.accept(owner, "comms_blackout", now);
        assert!(matches!(result, Err(TaskError::TooManyActive { cap: 3 })));
    }

    #[test]
    fn unit_requirements_are_checked() {
        let (tracker, ledger) = tracker();
        let owner = PlayerId::new();
        let now = Utc::now();

        let result = tracker.accept(owner, "supply_sabotage", now);
        assert!(matches!(result, Err(TaskError::MissingUnits { .. })));

        ledger.add_units(owner, "rifleman", 10);
        assert!(tracker.accept(owner, "supply_sabotage", now).is_ok());
    }

    #[test]
    fn research_charges_knowledge_and_checks_prerequisites() {
        let (tracker, ledger) = tracker();
        let owner = PlayerId::new();
        let now = Utc::now();

        // No knowledge yet: the debit fails and nothing is created.
        let result = tracker.accept(owner, "basic_training", now);
        assert!(matches!(result, Err(TaskError::Ledger(_))));
        assert_eq!(tracker.tasks_for(owner).len(), 0);

        fund_knowledge(&ledger, owner, 500.0);

        // Tier 2 without its tier-1 prerequisite is rejected.
        let result = tracker.accept(owner, "armored_warfare", now);
        assert!(matches!(result, Err(TaskError::PrerequisiteMissing { .. })));

        let task = tracker.accept(owner, "basic_training", now).unwrap();
        assert!((ledger.balance(owner, ResourceKind::Knowledge) - 400.0).abs() < f64::EPSILON);

        // Completing the research unlocks the tier-2 accept.
        let _ = tracker.complete(task.id, now).unwrap();
        fund_knowledge(&ledger, owner, 300.0);
        assert!(tracker.accept(owner, "armored_warfare", now).is_ok());
    }

    #[test]
    fn completed_research_cannot_be_repeated() {
        let (tracker, ledger) = tracker();
        let owner = PlayerId::new();
        let now = Utc::now();
        fund_knowledge(&ledger, owner, 1_000.0);

        let task = tracker.accept(owner, "basic_training", now).unwrap();
        let _ = tracker.complete(task.id, now).unwrap();

        let result = tracker.accept(owner, "basic_training", now);
        assert!(matches!(result, Err(TaskError::AlreadyResearched(_))));
    }

    #[test]
    fn advance_clamps_and_autocompletes() {
        let (tracker, ledger) = tracker();
        let owner = PlayerId::new();
        let now = Utc::now();
        let task = tracker.accept(owner, "recon_patrol", now).unwrap();

        let outcome = tracker.advance(task.id, 0.4, now).unwrap();
        assert!(matches!(outcome, AdvanceOutcome::Progressed(ref t) if (t.progress - 0.4).abs() < 1e-9));

        let gold_before = ledger.balance(owner, ResourceKind::Gold);
        let outcome = tracker.advance(task.id, 0.7, now).unwrap();
        match outcome {
            AdvanceOutcome::Completed { task, rewards } => {
                assert_eq!(task.status, TaskStatus::Completed);
                assert!((task.progress - 1.0).abs() < f64::EPSILON);
                assert!(!rewards.is_empty());
            }
            AdvanceOutcome::Progressed(_) => panic!("expected completion"),
        }
        // recon_patrol pays 200 gold.
        assert!(
            (ledger.balance(owner, ResourceKind::Gold) - gold_before - 200.0).abs()
                < f64::EPSILON
        );
    }

    #[test]
    fn complete_is_idempotent() {
        let (tracker, _ledger) = tracker();
        let owner = PlayerId::new();
        let now = Utc::now();
        let task = tracker.accept(owner, "recon_patrol", now).unwrap();

        assert!(tracker.complete(task.id, now).unwrap().is_some());
        assert!(tracker.complete(task.id, now).unwrap().is_none());
        assert!(tracker.fail(task.id, "late", now).unwrap().is_none());
        assert_eq!(tracker.task(task.id).unwrap().status, TaskStatus::Completed);
    }

    #[test]
    fn advance_on_terminal_task_is_rejected() {
        let (tracker, _ledger) = tracker();
        let owner = PlayerId::new();
        let now = Utc::now();
        let task = tracker.accept(owner, "recon_patrol", now).unwrap();
        let _ = tracker.fail(task.id, "aborted", now).unwrap();

        let result = tracker.advance(task.id, 0.5, now);
        assert!(matches!(result, Err(TaskError::NotActive { .. })));
    }

    #[test]
    fn sweep_expires_overdue_tasks() {
        let (tracker, _ledger) = tracker();
        let owner = PlayerId::new();
        let start = Utc::now();

        // recon_patrol runs 3600 seconds.
        let task = tracker.accept(owner, "recon_patrol", start).unwrap();

        // One second before the deadline: nothing happens.
        let expired = tracker.sweep_expirations(start + Duration::seconds(3_599));
        assert!(expired.is_empty());

        // One second past: expired, unconditionally.
        let expired = tracker.sweep_expirations(start + Duration::seconds(3_601));
        assert_eq!(expired.len(), 1);
        assert_eq!(expired.first().map(|t| t.id), Some(task.id));
        assert_eq!(tracker.task(task.id).unwrap().status, TaskStatus::Expired);

        // Terminal tasks never transition again.
        let expired = tracker.sweep_expirations(start + Duration::seconds(10_000));
        assert!(expired.is_empty());
    }

    #[test]
    fn research_advances_automatically_and_faster_with_speed_effects() {
        let (tracker, ledger) = tracker();
        let owner = PlayerId::new();
        let now = Utc::now();
        fund_knowledge(&ledger, owner, 2_000.0);

        // Complete scientific_method (+25% research speed) instantly.
        let sm = tracker.accept(owner, "scientific_method", now).unwrap();
        let _ = tracker.complete(sm.id, now).unwrap();
        assert!((tracker.research_speed(owner) - 1.25).abs() < 1e-9);

        // basic_training runs 3 hours; one 1-hour job at 1.25x speed
        // should land progress at ~0.4167.
        let bt = tracker.accept(owner, "basic_training", now).unwrap();
        let completions = tracker.advance_research(3_600.0, now);
        assert!(completions.is_empty());
        let progress = tracker.task(bt.id).unwrap().progress;
        assert!((progress - 3_600.0 / 10_800.0 * 1.25).abs() < 1e-9);

        // Two more hours finish it.
        let _ = tracker.advance_research(3_600.0, now);
        let completions = tracker.advance_research(3_600.0, now);
        assert_eq!(completions.len(), 1);
        assert!(tracker.completed_research(owner).contains("basic_training"));
    }

    #[test]
    fn export_import_roundtrip() {
        let (tracker, ledger) = tracker();
        let owner = PlayerId::new();
        let now = Utc::now();
        fund_knowledge(&ledger, owner, 500.0);
        let research = tracker.accept(owner, "basic_training", now).unwrap();
        let _ = tracker.complete(research.id, now).unwrap();
        let quest = tracker.accept(owner, "recon_patrol", now).unwrap();

        let (tasks, research_sets) = tracker.export();
        let (restored, _ledger2) = {
            let catalog = Arc::new(Catalog::standard());
            let ledger2 = Arc::new(LedgerStore::new(LedgerConfig::default()));
            (
                TaskTracker::new(catalog, Arc::clone(&ledger2), TaskTuning::default()),
                ledger2,
            )
        };
        restored.import(tasks, research_sets);

        assert_eq!(restored.task(quest.id).unwrap().status, TaskStatus::Active);
        assert!(restored.completed_research(owner).contains("basic_training"));
    }
}
