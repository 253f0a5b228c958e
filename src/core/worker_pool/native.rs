//! OS thread implementation of the blocking batch pool.
//!
//! - Workers block on a crossbeam channel; dropping the sender ends them.
//! - Every slot moves `Queued -> Running -> Done` under one mutex, and the
//!   condvar is signalled on each `Done`.
//! - Whoever moves a slot to `Done` records its metrics, so a task abandoned by
//!   the caller is never counted twice.
//! - When the caller abandons a stuck worker while tasks are still queued, it
//!   starts a replacement thread so the rest of the batch keeps its
//!   parallelism.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::{bounded, Receiver};
use parking_lot::{Condvar, Mutex, MutexGuard};
use tracing::{debug, error, warn};

use crate::core::outcome::{Outcome, TaskFailure};
use crate::core::runner::{TaskRecord, TaskRunner};
use crate::core::{ExecutorError, Task};

/// Slack granted to a worker's own timeout before the caller steps in.
const ABANDON_GRACE: Duration = Duration::from_millis(50);

enum SlotState<T> {
    Queued,
    Running {
        started: Instant,
        attempts: Arc<AtomicU32>,
    },
    Done(Outcome<T>),
}

struct SlotTable<T> {
    slots: Vec<SlotState<T>>,
    remaining: usize,
}

struct Slots<T> {
    table: Mutex<SlotTable<T>>,
    done: Condvar,
}

impl<T> Slots<T> {
    fn new(total: usize) -> Self {
        Self {
            table: Mutex::new(SlotTable {
                slots: std::iter::repeat_with(|| SlotState::Queued).take(total).collect(),
                remaining: total,
            }),
            done: Condvar::new(),
        }
    }

    /// Claim a queued slot. False if the caller already settled it.
    fn start(&self, index: usize, attempts: Arc<AtomicU32>) -> bool {
        let mut table = self.table.lock();
        match table.slots.get_mut(index) {
            Some(slot) if matches!(slot, SlotState::Queued) => {
                *slot = SlotState::Running {
                    started: Instant::now(),
                    attempts,
                };
                true
            }
            _ => false,
        }
    }

    /// Settle a slot unless it is already `Done`. `on_settle` runs under the
    /// lock so the caller never returns before the outcome is recorded.
    fn settle<F>(&self, index: usize, outcome: Outcome<T>, on_settle: F) -> bool
    where
        F: FnOnce(&Outcome<T>),
    {
        let mut table = self.table.lock();
        let SlotTable { slots, remaining } = &mut *table;
        match slots.get_mut(index) {
            Some(slot) if !matches!(slot, SlotState::Done(_)) => {
                on_settle(&outcome);
                *slot = SlotState::Done(outcome);
                *remaining -= 1;
                self.done.notify_all();
                true
            }
            _ => false,
        }
    }

    /// Block until every slot is settled, timing out stuck tasks on the way.
    ///
    /// `replace_worker` runs once per abandoned worker while queued tasks
    /// remain, with the lock released. Returns the outcomes and whether any
    /// task was abandoned.
    fn wait_all<F>(
        &self,
        runner: &TaskRunner,
        identities: &[TaskRecord],
        mut replace_worker: F,
    ) -> (Vec<Outcome<T>>, bool)
    where
        F: FnMut(),
    {
        let budget = runner.plan().task_timeout + ABANDON_GRACE;
        let mut abandoned = false;
        let mut table = self.table.lock();
        loop {
            let now = Instant::now();
            let mut next_deadline: Option<Instant> = None;
            let mut stuck = 0_usize;
            let SlotTable { slots, remaining } = &mut *table;
            for (index, slot) in slots.iter_mut().enumerate() {
                let SlotState::Running { started, attempts } = slot else {
                    continue;
                };
                let deadline = *started + budget;
                if now < deadline {
                    next_deadline = Some(next_deadline.map_or(deadline, |d| d.min(deadline)));
                    continue;
                }
                let record = TaskRecord {
                    attempts: attempts.load(Ordering::Acquire),
                    ..identities[index].clone()
                };
                let outcome = Outcome::Timeout(runner.timeout_for(
                    index,
                    &record.name,
                    &record.args,
                    record.attempts,
                ));
                warn!(index = index, function = %record.name, "task did not yield before its deadline, abandoning worker");
                runner.record(&outcome, &record, now.saturating_duration_since(*started));
                *slot = SlotState::Done(outcome);
                *remaining -= 1;
                stuck += 1;
            }
            abandoned |= stuck > 0;

            if table.remaining == 0 {
                break;
            }
            let queued = table
                .slots
                .iter()
                .any(|slot| matches!(slot, SlotState::Queued));
            if stuck > 0 && queued {
                MutexGuard::unlocked(&mut table, || (0..stuck).for_each(|_| replace_worker()));
                continue;
            }
            match next_deadline {
                Some(deadline) => {
                    let _ = self.done.wait_until(&mut table, deadline);
                }
                None => self.done.wait(&mut table),
            }
        }

        let outcomes = table
            .slots
            .drain(..)
            .filter_map(|slot| match slot {
                SlotState::Done(outcome) => Some(outcome),
                SlotState::Queued | SlotState::Running { .. } => None,
            })
            .collect();
        (outcomes, abandoned)
    }
}

/// Run `tasks` on `min(max_workers, tasks.len())` dedicated threads.
pub(crate) fn run_blocking<T: Send + 'static>(
    runner: TaskRunner,
    tasks: Vec<Task<T>>,
) -> Result<Vec<Outcome<T>>, ExecutorError> {
    let total = tasks.len();
    let worker_count = runner.plan().max_workers.min(total);
    let slots = Arc::new(Slots::new(total));
    let (task_tx, task_rx) = bounded::<(usize, Task<T>)>(total);

    // Start every worker before handing out work, so a spawn failure means
    // no operation was invoked.
    let mut workers = Vec::with_capacity(worker_count);
    for worker_id in 0..worker_count {
        match spawn_worker(worker_id, task_rx.clone(), Arc::clone(&slots), runner.clone()) {
            Ok(handle) => workers.push(handle),
            Err(err) => {
                drop(task_tx);
                error!(worker_id = worker_id, error = %err, "failed to spawn worker thread");
                return Err(ExecutorError::Internal(format!(
                    "failed to spawn worker thread {worker_id}: {err}"
                )));
            }
        }
    }
    debug!(workers = worker_count, tasks = total, "blocking pool started");

    let identities: Vec<TaskRecord> = tasks
        .iter()
        .map(|task| TaskRecord::for_task(task, 0))
        .collect();
    for (index, task) in tasks.into_iter().enumerate() {
        if let Err(err) = task_tx.send((index, task)) {
            let (_, task) = err.into_inner();
            let record = TaskRecord::for_task(&task, 0);
            let outcome = Outcome::Failure(TaskFailure {
                index,
                name: task.name().to_owned(),
                args: task.args().clone(),
                attempts: 0,
                message: "worker pool closed before the task was dispatched".into(),
            });
            slots.settle(index, outcome, |outcome| {
                runner.record(outcome, &record, Duration::ZERO);
            });
        }
    }
    drop(task_tx);

    let mut next_worker_id = worker_count;
    let (outcomes, abandoned) = slots.wait_all(&runner, &identities, || {
        match spawn_worker(next_worker_id, task_rx.clone(), Arc::clone(&slots), runner.clone()) {
            Ok(handle) => {
                debug!(worker_id = next_worker_id, "started replacement worker");
                workers.push(handle);
            }
            Err(err) => {
                warn!(worker_id = next_worker_id, error = %err, "failed to spawn replacement worker");
            }
        }
        next_worker_id += 1;
    });
    drop(task_rx);
    if abandoned {
        warn!(
            workers = workers.len(),
            "detaching worker threads still running abandoned tasks"
        );
    } else {
        for (worker_id, handle) in workers.into_iter().enumerate() {
            if handle.join().is_err() {
                warn!(worker_id = worker_id, "worker thread panicked");
            }
        }
    }
    Ok(outcomes)
}

fn spawn_worker<T: Send + 'static>(
    worker_id: usize,
    task_rx: Receiver<(usize, Task<T>)>,
    slots: Arc<Slots<T>>,
    runner: TaskRunner,
) -> std::io::Result<JoinHandle<()>> {
    thread::Builder::new()
        .name(format!("fanout-worker-{worker_id}"))
        .spawn(move || {
            let rt = match tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
            {
                Ok(rt) => Some(rt),
                Err(err) => {
                    error!(worker_id = worker_id, error = %err, "failed to create worker runtime");
                    None
                }
            };

            while let Ok((index, task)) = task_rx.recv() {
                let attempts = Arc::new(AtomicU32::new(0));
                if !slots.start(index, Arc::clone(&attempts)) {
                    continue;
                }
                let started = Instant::now();
                let (outcome, record) = match &rt {
                    Some(rt) => rt.block_on(runner.run(index, worker_id, task, attempts)),
                    None => (
                        Outcome::Failure(TaskFailure {
                            index,
                            name: task.name().to_owned(),
                            args: task.args().clone(),
                            attempts: 0,
                            message: "worker runtime unavailable".into(),
                        }),
                        TaskRecord::for_task(&task, 0),
                    ),
                };
                let elapsed = started.elapsed();
                if !slots.settle(index, outcome, |outcome| runner.record(outcome, &record, elapsed)) {
                    debug!(worker_id = worker_id, index = index, "discarding result of abandoned task");
                }
            }
            debug!(worker_id = worker_id, "worker channel closed, exiting");
        })
}
