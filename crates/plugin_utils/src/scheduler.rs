//! Tick-driven reference scheduler.
//!
//! [`TickScheduler`] implements the [`Scheduler`] contract for hosts that do
//! not bring their own: the main context is whoever calls [`TickScheduler::tick`]
//! (normally [`TickScheduler::run`] on a fixed interval), and the worker
//! context is the tokio runtime the scheduler was created on.

use crate::host::{AsyncTask, RepeatingTask, Scheduler, SyncTask};
use crate::types::TaskId;
use dashmap::DashMap;
use std::collections::VecDeque;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{debug, error};

struct RepeatingEntry {
    next_run: u64,
    period: u64,
    task: RepeatingTask,
}

/// Scheduler with a serialized tick loop and a tokio worker pool.
pub struct TickScheduler {
    current_tick: AtomicU64,
    next_task_id: AtomicU64,
    repeating: DashMap<TaskId, RepeatingEntry>,
    sync_queue: Mutex<VecDeque<SyncTask>>,
    runtime: Handle,
    workers: Mutex<Vec<JoinHandle<()>>>,
}

impl TickScheduler {
    /// Creates a scheduler whose worker context is `runtime`.
    pub fn new(runtime: Handle) -> Self {
        Self {
            current_tick: AtomicU64::new(0),
            next_task_id: AtomicU64::new(1),
            repeating: DashMap::new(),
            sync_queue: Mutex::new(VecDeque::new()),
            runtime,
            workers: Mutex::new(Vec::new()),
        }
    }

    /// Creates a scheduler on the runtime of the calling task.
    pub fn try_current() -> Result<Self, tokio::runtime::TryCurrentError> {
        Handle::try_current().map(Self::new)
    }

    /// Number of ticks processed so far.
    pub fn current_tick(&self) -> u64 {
        self.current_tick.load(Ordering::SeqCst)
    }

    /// Number of repeating tasks still registered.
    pub fn active_tasks(&self) -> usize {
        self.repeating.len()
    }

    /// Whether the repeating task is still registered.
    pub fn is_scheduled(&self, id: TaskId) -> bool {
        self.repeating.contains_key(&id)
    }

    /// Advances the clock by one tick on the calling (main) context.
    ///
    /// Queued sync continuations run first, then every repeating task that
    /// is due. Returns the new tick number.
    pub fn tick(&self) -> u64 {
        let tick = self.current_tick.fetch_add(1, Ordering::SeqCst) + 1;

        let pending: Vec<SyncTask> = {
            let mut queue = self.sync_queue.lock().unwrap_or_else(|e| e.into_inner());
            queue.drain(..).collect()
        };
        for task in pending {
            task();
        }

        // Collect first so tasks can cancel or schedule without holding a shard lock.
        let mut due = Vec::new();
        for mut entry in self.repeating.iter_mut() {
            if entry.next_run <= tick {
                entry.next_run = tick + entry.period;
                due.push((*entry.key(), entry.task.clone()));
            }
        }
        due.sort_by_key(|(id, _)| *id);

        for (id, task) in due {
            if self.repeating.contains_key(&id) {
                task();
            }
        }

        tick
    }

    /// Drives [`tick`](Self::tick) at `tick_interval` until `shutdown` resolves.
    pub async fn run<F>(&self, tick_interval: Duration, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        let mut ticker = tokio::time::interval(tick_interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    debug!("Tick loop stopping at tick {}", self.current_tick());
                    break;
                }
                _ = ticker.tick() => {
                    self.tick();
                }
            }
        }
    }

    /// Waits until every submitted worker task has finished, including
    /// workers submitted while waiting.
    pub async fn wait_for_workers(&self) {
        loop {
            let handles: Vec<JoinHandle<()>> = {
                let mut workers = self.workers.lock().unwrap_or_else(|e| e.into_inner());
                std::mem::take(&mut *workers)
            };
            if handles.is_empty() {
                return;
            }
            for handle in handles {
                if let Err(e) = handle.await {
                    error!("Worker task failed: {}", e);
                }
            }
        }
    }
}

impl Scheduler for TickScheduler {
    fn schedule_sync_repeating(&self, delay: u64, period: u64, task: RepeatingTask) -> TaskId {
        let id = TaskId(self.next_task_id.fetch_add(1, Ordering::SeqCst));
        let entry = RepeatingEntry {
            next_run: self.current_tick() + delay.max(1),
            period: period.max(1),
            task,
        };
        self.repeating.insert(id, entry);
        debug!("Scheduled {} (delay {}, period {})", id, delay, period);
        id
    }

    fn run_sync(&self, task: SyncTask) {
        self.sync_queue
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push_back(task);
    }

    fn run_async(&self, task: AsyncTask) {
        let handle = self.runtime.spawn(task);
        let mut workers = self.workers.lock().unwrap_or_else(|e| e.into_inner());
        workers.retain(|h| !h.is_finished());
        workers.push(handle);
    }

    fn cancel_task(&self, id: TaskId) {
        if self.repeating.remove(&id).is_some() {
            debug!("Cancelled {}", id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Arc;

    fn counter_task(counter: &Arc<AtomicUsize>) -> RepeatingTask {
        let counter = counter.clone();
        Arc::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        })
    }

    #[tokio::test]
    async fn test_sync_task_runs_on_next_tick() {
        let scheduler = TickScheduler::try_current().unwrap();
        let ran = Arc::new(AtomicUsize::new(0));
        let ran_clone = ran.clone();

        scheduler.run_sync(Box::new(move || {
            ran_clone.fetch_add(1, Ordering::SeqCst);
        }));
        assert_eq!(ran.load(Ordering::SeqCst), 0);

        scheduler.tick();
        assert_eq!(ran.load(Ordering::SeqCst), 1);

        scheduler.tick();
        assert_eq!(ran.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_repeating_task_honours_delay_and_period() {
        let scheduler = TickScheduler::try_current().unwrap();
        let counter = Arc::new(AtomicUsize::new(0));
        scheduler.schedule_sync_repeating(0, 3, counter_task(&counter));

        scheduler.tick(); // 1: first run
        assert_eq!(counter.load(Ordering::SeqCst), 1);
        scheduler.tick(); // 2
        scheduler.tick(); // 3
        assert_eq!(counter.load(Ordering::SeqCst), 1);
        scheduler.tick(); // 4: second run
        assert_eq!(counter.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_delayed_task_waits() {
        let scheduler = TickScheduler::try_current().unwrap();
        let counter = Arc::new(AtomicUsize::new(0));
        scheduler.schedule_sync_repeating(5, 100, counter_task(&counter));

        for _ in 0..4 {
            scheduler.tick();
        }
        assert_eq!(counter.load(Ordering::SeqCst), 0);
        scheduler.tick();
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_cancelled_task_stops_firing() {
        let scheduler = TickScheduler::try_current().unwrap();
        let counter = Arc::new(AtomicUsize::new(0));
        let id = scheduler.schedule_sync_repeating(0, 1, counter_task(&counter));

        scheduler.tick();
        scheduler.cancel_task(id);
        scheduler.tick();
        scheduler.tick();

        assert_eq!(counter.load(Ordering::SeqCst), 1);
        assert!(!scheduler.is_scheduled(id));
        assert_eq!(scheduler.active_tasks(), 0);
    }

    #[tokio::test]
    async fn test_task_can_cancel_itself() {
        let scheduler = Arc::new(TickScheduler::try_current().unwrap());
        let counter = Arc::new(AtomicUsize::new(0));
        let own_id = Arc::new(Mutex::new(None::<TaskId>));

        let task: RepeatingTask = {
            let scheduler = scheduler.clone();
            let counter = counter.clone();
            let own_id = own_id.clone();
            Arc::new(move || {
                counter.fetch_add(1, Ordering::SeqCst);
                if let Some(id) = *own_id.lock().unwrap() {
                    scheduler.cancel_task(id);
                }
            })
        };
        let id = scheduler.schedule_sync_repeating(0, 1, task);
        *own_id.lock().unwrap() = Some(id);

        for _ in 0..5 {
            scheduler.tick();
        }
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_async_continuation_marshals_back_to_tick() {
        let scheduler = Arc::new(TickScheduler::try_current().unwrap());
        let ran = Arc::new(AtomicUsize::new(0));

        let worker_scheduler = scheduler.clone();
        let ran_clone = ran.clone();
        scheduler.run_async(Box::pin(async move {
            worker_scheduler.run_sync(Box::new(move || {
                ran_clone.fetch_add(1, Ordering::SeqCst);
            }));
        }));

        scheduler.wait_for_workers().await;
        assert_eq!(ran.load(Ordering::SeqCst), 0);

        scheduler.tick();
        assert_eq!(ran.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_run_stops_on_shutdown() {
        let scheduler = TickScheduler::try_current().unwrap();
        let shutdown = tokio::time::sleep(Duration::from_millis(60));

        scheduler.run(Duration::from_millis(5), shutdown).await;

        assert!(scheduler.current_tick() >= 1);
    }
}
