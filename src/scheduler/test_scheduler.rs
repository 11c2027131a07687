//! Virtual-time scheduler for deterministic timing tests.
//!
//! Nothing runs until the test advances the clock; `advance_by` executes
//! every task whose deadline falls inside the window, in deadline order,
//! on the calling thread. Tasks scheduled while the clock advances (chained
//! timers, periodic reschedules) are picked up by the same advance when
//! they land inside the window.

use std::{
  cmp::Ordering,
  collections::BinaryHeap,
  sync::{Arc, Mutex},
  time::{Duration, Instant},
};

use crate::{
  rc::{CellArc, MutArc, RcDerefMut, SharedCell},
  scheduler::{OnceTask, RepeatTask, Scheduler, TaskHandle, Worker},
  subscription::Subscription,
};

enum VirtJob {
  Once(Box<dyn FnOnce() + Send>),
  Repeat { period: Duration, tick: Box<dyn FnMut() + Send> },
}

struct VirtEntry {
  due: Duration,
  seq: u64,
  job: VirtJob,
  handle: TaskHandle,
}

impl PartialEq for VirtEntry {
  fn eq(&self, other: &Self) -> bool {
    self.due == other.due && self.seq == other.seq
  }
}

impl Eq for VirtEntry {}

impl PartialOrd for VirtEntry {
  fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
    Some(self.cmp(other))
  }
}

impl Ord for VirtEntry {
  fn cmp(&self, other: &Self) -> Ordering {
    other.due.cmp(&self.due).then_with(|| other.seq.cmp(&self.seq))
  }
}

#[derive(Default)]
struct VirtState {
  now: Duration,
  seq: u64,
  queue: BinaryHeap<VirtEntry>,
}

struct TestCore {
  origin: Instant,
  state: Mutex<VirtState>,
}

#[derive(Clone)]
pub struct TestScheduler {
  core: Arc<TestCore>,
}

impl Default for TestScheduler {
  fn default() -> Self {
    Self::new()
  }
}

impl TestScheduler {
  pub fn new() -> Self {
    TestScheduler {
      core: Arc::new(TestCore { origin: Instant::now(), state: Mutex::new(VirtState::default()) }),
    }
  }

  /// Virtual time elapsed since the scheduler was created.
  pub fn elapsed(&self) -> Duration {
    self.core.state.lock().unwrap().now
  }

  /// Move the clock forward, running everything that falls due.
  pub fn advance_by(&self, d: Duration) {
    let target = self.core.state.lock().unwrap().now + d;
    self.advance_to_offset(target);
  }

  /// Run tasks already due at the current clock reading.
  pub fn run_pending(&self) {
    let target = self.core.state.lock().unwrap().now;
    self.advance_to_offset(target);
  }

  fn advance_to_offset(&self, target: Duration) {
    loop {
      let entry = {
        let mut state = self.core.state.lock().unwrap();
        match state.queue.peek() {
          Some(top) if top.due <= target => {
            let entry = state.queue.pop().unwrap();
            state.now = entry.due;
            entry
          }
          _ => {
            state.now = target;
            return;
          }
        }
      };
      // run with the lock released, the task may schedule more work
      if entry.handle.is_closed() {
        continue;
      }
      match entry.job {
        VirtJob::Once(f) => {
          f();
          entry.handle.finish();
        }
        VirtJob::Repeat { period, mut tick } => {
          tick();
          if !entry.handle.is_closed() {
            let mut state = self.core.state.lock().unwrap();
            state.seq += 1;
            let seq = state.seq;
            state.queue.push(VirtEntry {
              due: entry.due + period,
              seq,
              job: VirtJob::Repeat { period, tick },
              handle: entry.handle,
            });
          }
        }
      }
    }
  }

  fn submit(&self, job: VirtJob, delay: Option<Duration>) -> TaskHandle {
    let handle = TaskHandle::new();
    let mut state = self.core.state.lock().unwrap();
    state.seq += 1;
    let entry = VirtEntry {
      due: state.now + delay.unwrap_or_default(),
      seq: state.seq,
      job,
      handle: handle.clone(),
    };
    state.queue.push(entry);
    handle
  }
}

impl Scheduler for TestScheduler {
  type Worker = TestWorker;

  fn create_worker(&self) -> TestWorker {
    TestWorker {
      scheduler: self.clone(),
      alive: CellArc::own(true),
      tasks: MutArc::own(Vec::new()),
    }
  }

  fn now(&self) -> Instant {
    self.core.origin + self.elapsed()
  }
}

#[derive(Clone)]
pub struct TestWorker {
  scheduler: TestScheduler,
  alive: CellArc<bool>,
  tasks: MutArc<Vec<TaskHandle>>,
}

impl TestWorker {
  fn track(&self, handle: TaskHandle) -> TaskHandle {
    self.tasks.rc_deref_mut().push(handle.clone());
    handle
  }
}

impl Worker for TestWorker {
  fn now(&self) -> Instant {
    self.scheduler.now()
  }

  fn schedule<S: Send + 'static>(&self, task: OnceTask<S>, delay: Option<Duration>) -> TaskHandle {
    if !self.alive.get() {
      return TaskHandle::cancelled();
    }
    self.track(self.scheduler.submit(VirtJob::Once(Box::new(move || task.call())), delay))
  }

  fn schedule_periodic<S: Send + 'static>(
    &self,
    mut task: RepeatTask<S>,
    initial: Duration,
    period: Duration,
  ) -> TaskHandle {
    if !self.alive.get() {
      return TaskHandle::cancelled();
    }
    let job = VirtJob::Repeat { period, tick: Box::new(move || task.tick()) };
    self.track(self.scheduler.submit(job, Some(initial)))
  }
}

impl Subscription for TestWorker {
  fn unsubscribe(self) {
    if !self.alive.get() {
      return;
    }
    self.alive.set(false);
    let tasks = std::mem::take(&mut *self.tasks.rc_deref_mut());
    for handle in tasks {
      handle.unsubscribe();
    }
  }

  fn is_closed(&self) -> bool {
    !self.alive.get()
  }
}

#[cfg(test)]
mod test {
  use super::*;
  use crate::rc::RcDeref;

  #[test]
  fn advance_runs_in_deadline_order() {
    let sched = TestScheduler::new();
    let worker = sched.create_worker();
    let log = MutArc::own(Vec::new());
    fn push((log, v): (MutArc<Vec<u32>>, u32)) {
      log.rc_deref_mut().push(v);
    }
    worker.schedule(OnceTask::new(push, (log.clone(), 2)), Some(Duration::from_millis(20)));
    worker.schedule(OnceTask::new(push, (log.clone(), 1)), Some(Duration::from_millis(10)));
    worker.schedule(OnceTask::new(push, (log.clone(), 3)), Some(Duration::from_millis(30)));

    sched.advance_by(Duration::from_millis(25));
    assert_eq!(*log.rc_deref(), vec![1, 2]);
    sched.advance_by(Duration::from_millis(25));
    assert_eq!(*log.rc_deref(), vec![1, 2, 3]);
  }

  #[test]
  fn periodic_reschedules_within_one_advance() {
    let sched = TestScheduler::new();
    let worker = sched.create_worker();
    let count = MutArc::own(0u32);
    fn bump(count: &mut MutArc<u32>) {
      *count.rc_deref_mut() += 1;
    }
    worker.schedule_periodic(
      RepeatTask::new(bump, count.clone()),
      Duration::from_millis(10),
      Duration::from_millis(10),
    );
    sched.advance_by(Duration::from_millis(35));
    assert_eq!(*count.rc_deref(), 3);
    assert_eq!(sched.elapsed(), Duration::from_millis(35));
  }
}
