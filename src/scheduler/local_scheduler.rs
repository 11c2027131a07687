//! Caller-thread schedulers.
//!
//! `immediate` runs tasks inline, recursively, sleeping out delays.
//! `trampoline` also runs on the calling thread but owns a thread-local
//! queue: a task scheduled from inside a running task is deferred to the
//! outermost drain instead of recursing, so re-entrant operator chains
//! cannot overflow the stack.

use std::{
  cell::RefCell,
  cmp::Ordering,
  collections::BinaryHeap,
  thread,
  time::{Duration, Instant},
};

use crate::{
  rc::{MutArc, RcDerefMut},
  scheduler::{OnceTask, RepeatTask, Scheduler, TaskHandle, Worker},
  subscription::Subscription,
};

/// Runs every task on the calling thread, at schedule time.
///
/// Periodic work keeps the caller busy until the task's handle is
/// cancelled; use a thread-backed scheduler for open-ended timers.
#[derive(Clone, Copy, Default)]
pub struct ImmediateScheduler;

impl Scheduler for ImmediateScheduler {
  type Worker = ImmediateWorker;

  fn create_worker(&self) -> ImmediateWorker {
    ImmediateWorker
  }
}

#[derive(Clone, Copy)]
pub struct ImmediateWorker;

impl Worker for ImmediateWorker {
  fn schedule<S: Send + 'static>(&self, task: OnceTask<S>, delay: Option<Duration>) -> TaskHandle {
    if let Some(delay) = delay {
      if !delay.is_zero() {
        thread::sleep(delay);
      }
    }
    task.call();
    TaskHandle::cancelled()
  }

  fn schedule_periodic<S: Send + 'static>(
    &self,
    mut task: RepeatTask<S>,
    initial: Duration,
    period: Duration,
  ) -> TaskHandle {
    let handle = TaskHandle::new();
    thread::sleep(initial);
    while !handle.is_closed() {
      task.tick();
      if handle.is_closed() {
        break;
      }
      thread::sleep(period);
    }
    handle
  }
}

impl Subscription for ImmediateWorker {
  fn unsubscribe(self) {}

  fn is_closed(&self) -> bool {
    false
  }
}

enum LocalJob {
  Once(Box<dyn FnOnce()>),
  Repeat { period: Duration, tick: Box<dyn FnMut()> },
}

struct LocalEntry {
  at: Instant,
  seq: u64,
  job: LocalJob,
  handle: TaskHandle,
}

impl PartialEq for LocalEntry {
  fn eq(&self, other: &Self) -> bool {
    self.at == other.at && self.seq == other.seq
  }
}

impl Eq for LocalEntry {}

impl PartialOrd for LocalEntry {
  fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
    Some(self.cmp(other))
  }
}

impl Ord for LocalEntry {
  fn cmp(&self, other: &Self) -> Ordering {
    other.at.cmp(&self.at).then_with(|| other.seq.cmp(&self.seq))
  }
}

#[derive(Default)]
struct TrampolineState {
  queue: BinaryHeap<LocalEntry>,
  seq: u64,
  draining: bool,
}

thread_local! {
  static TRAMPOLINE: RefCell<TrampolineState> = RefCell::default();
}

/// Caller-thread scheduler with a per-thread drain queue.
#[derive(Clone, Copy, Default)]
pub struct TrampolineScheduler;

impl Scheduler for TrampolineScheduler {
  type Worker = TrampolineWorker;

  fn create_worker(&self) -> TrampolineWorker {
    TrampolineWorker { tasks: MutArc::own(Vec::new()) }
  }
}

#[derive(Clone)]
pub struct TrampolineWorker {
  tasks: MutArc<Vec<TaskHandle>>,
}

fn enqueue(job: LocalJob, delay: Option<Duration>) -> TaskHandle {
  let handle = TaskHandle::new();
  let entered = TRAMPOLINE.with(|state| {
    let mut state = state.borrow_mut();
    state.seq += 1;
    let entry = LocalEntry {
      at: Instant::now() + delay.unwrap_or_default(),
      seq: state.seq,
      job,
      handle: handle.clone(),
    };
    state.queue.push(entry);
    if state.draining {
      false
    } else {
      state.draining = true;
      true
    }
  });
  if entered {
    drain();
  }
  handle
}

fn drain() {
  loop {
    let entry = TRAMPOLINE.with(|state| {
      let mut state = state.borrow_mut();
      match state.queue.pop() {
        Some(entry) => Some(entry),
        None => {
          state.draining = false;
          None
        }
      }
    });
    let Some(entry) = entry else {
      return;
    };
    if entry.handle.is_closed() {
      continue;
    }
    let now = Instant::now();
    if entry.at > now {
      thread::sleep(entry.at - now);
    }
    // the job runs with the queue unlocked so it may re-enter `enqueue`
    match entry.job {
      LocalJob::Once(f) => {
        f();
        entry.handle.finish();
      }
      LocalJob::Repeat { period, mut tick } => {
        tick();
        if !entry.handle.is_closed() {
          TRAMPOLINE.with(|state| {
            let mut state = state.borrow_mut();
            state.seq += 1;
            let seq = state.seq;
            state.queue.push(LocalEntry {
              at: entry.at + period,
              seq,
              job: LocalJob::Repeat { period, tick },
              handle: entry.handle,
            });
          });
        }
      }
    }
  }
}

impl TrampolineWorker {
  fn track(&self, handle: TaskHandle) -> TaskHandle {
    self.tasks.rc_deref_mut().push(handle.clone());
    handle
  }
}

impl Worker for TrampolineWorker {
  fn schedule<S: Send + 'static>(&self, task: OnceTask<S>, delay: Option<Duration>) -> TaskHandle {
    self.track(enqueue(LocalJob::Once(Box::new(move || task.call())), delay))
  }

  fn schedule_periodic<S: Send + 'static>(
    &self,
    mut task: RepeatTask<S>,
    initial: Duration,
    period: Duration,
  ) -> TaskHandle {
    let job = LocalJob::Repeat { period, tick: Box::new(move || task.tick()) };
    self.track(enqueue(job, Some(initial)))
  }
}

impl Subscription for TrampolineWorker {
  fn unsubscribe(self) {
    let tasks = std::mem::take(&mut *self.tasks.rc_deref_mut());
    for handle in tasks {
      handle.unsubscribe();
    }
  }

  fn is_closed(&self) -> bool {
    false
  }
}

#[cfg(test)]
mod test {
  use super::*;
  use crate::rc::RcDeref;

  #[test]
  fn immediate_runs_inline() {
    let hit = MutArc::own(false);
    fn mark(hit: MutArc<bool>) {
      *hit.rc_deref_mut() = true;
    }
    ImmediateWorker.schedule(OnceTask::new(mark, hit.clone()), None);
    assert!(*hit.rc_deref());
  }

  #[test]
  fn trampoline_defers_reentrant_schedules() {
    let log = MutArc::own(Vec::new());
    let worker = TrampolineScheduler.create_worker();

    fn outer((log, worker): (MutArc<Vec<u32>>, TrampolineWorker)) {
      log.rc_deref_mut().push(1);
      fn inner(log: MutArc<Vec<u32>>) {
        log.rc_deref_mut().push(3);
      }
      worker.schedule(OnceTask::new(inner, log.clone()), None);
      // the inner task must wait for the outer drain
      log.rc_deref_mut().push(2);
    }
    worker.schedule(OnceTask::new(outer, (log.clone(), worker.clone())), None);
    assert_eq!(*log.rc_deref(), vec![1, 2, 3]);
  }
}
