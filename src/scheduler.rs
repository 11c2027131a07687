//! Time and thread placement.
//!
//! A [`Scheduler`] hands out [`Worker`]s; a worker is a sequential executor
//! with a clock. Tasks scheduled on one worker never run concurrently with
//! each other and run in submission order for equal deadlines, which is the
//! serialization guarantee the time-based operators build on. Disposing a
//! worker cancels everything it scheduled.
//!
//! The thread-backed schedulers all run on [`event_loop::EventLoop`]s, a
//! deadline heap drained by a dedicated thread; they differ only in how
//! loops are shared between workers (fresh per worker, fixed pool, elastic
//! cache, or a single process-wide loop). `immediate`/`trampoline` execute
//! on the calling thread, `from_spawn` bridges any `futures` executor, and
//! [`test_scheduler::TestScheduler`] runs on a virtual clock.

pub(crate) mod event_loop;
pub mod from_spawn;
pub mod local_scheduler;
pub mod pool_scheduler;
pub mod test_scheduler;
pub mod thread_scheduler;

use std::time::{Duration, Instant};

use lazy_static::lazy_static;

pub use event_loop::LoopWorker;
pub use from_spawn::SpawnScheduler;
pub use local_scheduler::{ImmediateScheduler, TrampolineScheduler};
pub use pool_scheduler::{IoScheduler, ThreadPoolScheduler};
pub use test_scheduler::TestScheduler;
pub use thread_scheduler::{NewThreadScheduler, SingleScheduler};

use crate::{
  rc::{CellArc, SharedCell},
  subscription::Subscription,
};

/// A one-shot unit of work: a plain function pointer plus the state it
/// consumes. Keeping the two apart lets operators build tasks without
/// allocating until the task crosses into a worker.
pub struct OnceTask<S> {
  task: fn(S),
  state: S,
}

impl<S> OnceTask<S> {
  pub fn new(task: fn(S), state: S) -> Self {
    OnceTask { task, state }
  }

  pub fn call(self) {
    (self.task)(self.state)
  }
}

/// A repeatable unit of work for periodic schedules.
pub struct RepeatTask<S> {
  task: fn(&mut S),
  state: S,
}

impl<S> RepeatTask<S> {
  pub fn new(task: fn(&mut S), state: S) -> Self {
    RepeatTask { task, state }
  }

  pub fn tick(&mut self) {
    (self.task)(&mut self.state)
  }
}

/// Cancellation token for one scheduled task. Closed once the task was
/// cancelled or has finished running (periodic tasks only close by
/// cancellation).
#[derive(Clone, Default)]
pub struct TaskHandle {
  done: CellArc<bool>,
}

impl TaskHandle {
  pub(crate) fn new() -> Self {
    TaskHandle { done: CellArc::own(false) }
  }

  pub(crate) fn cancelled() -> Self {
    TaskHandle { done: CellArc::own(true) }
  }

  pub(crate) fn finish(&self) {
    self.done.set(true)
  }
}

impl Subscription for TaskHandle {
  fn unsubscribe(self) {
    self.done.set(true)
  }

  fn is_closed(&self) -> bool {
    self.done.get()
  }
}

/// A factory of workers sharing one execution resource.
pub trait Scheduler: Clone + Send + Sync + 'static {
  type Worker: Worker;

  fn create_worker(&self) -> Self::Worker;

  /// Monotonic clock reading; virtual for the test scheduler.
  fn now(&self) -> Instant {
    Instant::now()
  }
}

/// A sequential executor with a clock. Also a [`Subscription`]: disposing
/// the worker cancels all of its outstanding tasks.
pub trait Worker: Subscription + Clone + Send + 'static {
  fn now(&self) -> Instant {
    Instant::now()
  }

  /// Run `task` once, after at least `delay` if one is given.
  fn schedule<S: Send + 'static>(&self, task: OnceTask<S>, delay: Option<Duration>) -> TaskHandle;

  /// Run `task` repeatedly, first after `initial`, then every `period`.
  fn schedule_periodic<S: Send + 'static>(
    &self,
    task: RepeatTask<S>,
    initial: Duration,
    period: Duration,
  ) -> TaskHandle;
}

fn pool_size() -> usize {
  std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1)
}

lazy_static! {
  static ref COMPUTATION: ThreadPoolScheduler = ThreadPoolScheduler::new(pool_size());
  static ref IO: IoScheduler = IoScheduler::new(Duration::from_secs(60));
}

/// Entry points to the built-in scheduler kinds.
pub struct Schedulers;

impl Schedulers {
  /// Fixed pool sized by available parallelism; workers are pinned to pool
  /// loops round-robin.
  pub fn computation() -> ThreadPoolScheduler {
    COMPUTATION.clone()
  }

  /// Elastic pool: loops are cached after worker disposal and reused, with
  /// a keep-alive eviction.
  pub fn io() -> IoScheduler {
    IO.clone()
  }

  /// One process-wide loop shared by every worker.
  pub fn single() -> SingleScheduler {
    SingleScheduler::new()
  }

  /// A fresh thread per worker, shut down when the worker is disposed.
  pub fn new_thread() -> NewThreadScheduler {
    NewThreadScheduler
  }

  /// Runs tasks on the calling thread, sleeping out delays, recursively.
  pub fn immediate() -> ImmediateScheduler {
    ImmediateScheduler
  }

  /// Runs tasks on the calling thread through a thread-local queue;
  /// re-entrant schedules are deferred to the outermost drain.
  pub fn trampoline() -> TrampolineScheduler {
    TrampolineScheduler
  }

  /// Bridge an arbitrary `futures` spawner.
  pub fn from_spawn<SP>(spawner: SP) -> SpawnScheduler<SP>
  where
    SP: futures::task::Spawn + Clone + Send + Sync + 'static,
  {
    SpawnScheduler::new(spawner)
  }
}
