//! The timed loop behind every thread-backed scheduler.
//!
//! One loop owns one thread and a deadline-ordered queue. Workers submit
//! entries; the thread pops whatever is due, runs it outside the lock, and
//! re-queues periodic entries at `deadline + period`. Several workers may
//! share one loop (pool schedulers), which only strengthens the per-worker
//! serialization guarantee.

use std::{
  cmp::Ordering,
  collections::BinaryHeap,
  sync::{Arc, Condvar, Mutex},
  thread,
  time::{Duration, Instant},
};

use crate::{
  rc::{CellArc, SharedCell},
  scheduler::{OnceTask, RepeatTask, TaskHandle, Worker},
  subscription::Subscription,
};

pub(crate) enum Job {
  Once(Box<dyn FnOnce() + Send>),
  Repeat { period: Duration, tick: Box<dyn FnMut() + Send> },
}

struct Entry {
  at: Instant,
  seq: u64,
  job: Job,
  handle: TaskHandle,
}

impl PartialEq for Entry {
  fn eq(&self, other: &Self) -> bool {
    self.at == other.at && self.seq == other.seq
  }
}

impl Eq for Entry {}

impl PartialOrd for Entry {
  fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
    Some(self.cmp(other))
  }
}

impl Ord for Entry {
  // inverted so the BinaryHeap pops the earliest deadline first; the
  // sequence number keeps equal-time entries in submission order
  fn cmp(&self, other: &Self) -> Ordering {
    other.at.cmp(&self.at).then_with(|| other.seq.cmp(&self.seq))
  }
}

struct LoopState {
  queue: BinaryHeap<Entry>,
  seq: u64,
  shutdown: bool,
}

struct LoopShared {
  state: Mutex<LoopState>,
  wakeup: Condvar,
}

/// Handle to one loop thread; cloning shares the loop.
#[derive(Clone)]
pub(crate) struct EventLoop {
  shared: Arc<LoopShared>,
}

impl EventLoop {
  pub(crate) fn spawn(name: &str) -> Self {
    let shared = Arc::new(LoopShared {
      state: Mutex::new(LoopState { queue: BinaryHeap::new(), seq: 0, shutdown: false }),
      wakeup: Condvar::new(),
    });
    let for_thread = shared.clone();
    thread::Builder::new()
      .name(name.to_owned())
      .spawn(move || run_loop(for_thread))
      .expect("failed to spawn scheduler thread");
    EventLoop { shared }
  }

  pub(crate) fn submit(&self, job: Job, delay: Option<Duration>) -> TaskHandle {
    let handle = TaskHandle::new();
    let at = Instant::now() + delay.unwrap_or_default();
    let mut state = self.shared.state.lock().unwrap();
    if state.shutdown {
      handle.finish();
      return handle;
    }
    state.seq += 1;
    let seq = state.seq;
    state.queue.push(Entry { at, seq, job, handle: handle.clone() });
    drop(state);
    self.shared.wakeup.notify_one();
    handle
  }

  pub(crate) fn shutdown(&self) {
    let drained = {
      let mut state = self.shared.state.lock().unwrap();
      state.shutdown = true;
      std::mem::take(&mut state.queue)
    };
    for entry in drained {
      entry.handle.finish();
    }
    self.shared.wakeup.notify_one();
  }
}

fn run_loop(shared: Arc<LoopShared>) {
  loop {
    let entry = {
      let mut state = shared.state.lock().unwrap();
      loop {
        if state.shutdown {
          return;
        }
        let wait = match state.queue.peek() {
          None => None,
          Some(top) => {
            let now = Instant::now();
            if top.at <= now {
              break state.queue.pop().unwrap();
            }
            Some(top.at - now)
          }
        };
        state = match wait {
          Some(d) => shared.wakeup.wait_timeout(state, d).unwrap().0,
          None => shared.wakeup.wait(state).unwrap(),
        };
      }
    };

    let Entry { at, seq: _, job, handle } = entry;
    if handle.is_closed() {
      continue;
    }
    match job {
      Job::Once(f) => {
        f();
        handle.finish();
      }
      Job::Repeat { period, mut tick } => {
        tick();
        if !handle.is_closed() {
          let mut state = shared.state.lock().unwrap();
          if !state.shutdown {
            state.seq += 1;
            let seq = state.seq;
            state.queue.push(Entry {
              at: at + period,
              seq,
              job: Job::Repeat { period, tick },
              handle,
            });
          } else {
            handle.finish();
          }
        }
      }
    }
  }
}

/// How a worker lets go of its loop on disposal.
pub(crate) enum Release {
  /// The worker owns the loop and shuts it down.
  Owned,
  /// The loop belongs to a fixed pool and outlives the worker.
  Pooled,
  /// The loop goes back to an elastic cache.
  Cached(Arc<dyn LoopHome + Send + Sync>),
}

pub(crate) trait LoopHome {
  fn give_back(&self, lp: EventLoop);
}

struct WorkerCore {
  lp: EventLoop,
  alive: CellArc<bool>,
  tasks: Mutex<Vec<TaskHandle>>,
  release: Mutex<Option<Release>>,
}

/// The worker used by every loop-backed scheduler.
#[derive(Clone)]
pub struct LoopWorker {
  core: Arc<WorkerCore>,
}

impl LoopWorker {
  pub(crate) fn new(lp: EventLoop, release: Release) -> Self {
    LoopWorker {
      core: Arc::new(WorkerCore {
        lp,
        alive: CellArc::own(true),
        tasks: Mutex::new(Vec::new()),
        release: Mutex::new(Some(release)),
      }),
    }
  }

  fn track(&self, handle: TaskHandle) -> TaskHandle {
    let mut tasks = self.core.tasks.lock().unwrap();
    if tasks.len() > 32 {
      tasks.retain(|h| !h.is_closed());
    }
    tasks.push(handle.clone());
    handle
  }
}

impl Worker for LoopWorker {
  fn schedule<S: Send + 'static>(&self, task: OnceTask<S>, delay: Option<Duration>) -> TaskHandle {
    if !self.core.alive.get() {
      return TaskHandle::cancelled();
    }
    self.track(self.core.lp.submit(Job::Once(Box::new(move || task.call())), delay))
  }

  fn schedule_periodic<S: Send + 'static>(
    &self,
    mut task: RepeatTask<S>,
    initial: Duration,
    period: Duration,
  ) -> TaskHandle {
    if !self.core.alive.get() {
      return TaskHandle::cancelled();
    }
    let job = Job::Repeat { period, tick: Box::new(move || task.tick()) };
    self.track(self.core.lp.submit(job, Some(initial)))
  }
}

impl Subscription for LoopWorker {
  fn unsubscribe(self) {
    if !self.core.alive.get() {
      return;
    }
    self.core.alive.set(false);
    let tasks = std::mem::take(&mut *self.core.tasks.lock().unwrap());
    for handle in tasks {
      handle.unsubscribe();
    }
    match self.core.release.lock().unwrap().take() {
      Some(Release::Owned) => self.core.lp.shutdown(),
      Some(Release::Cached(home)) => home.give_back(self.core.lp.clone()),
      Some(Release::Pooled) | None => {}
    }
  }

  fn is_closed(&self) -> bool {
    !self.core.alive.get()
  }
}

#[cfg(test)]
mod test {
  use super::*;
  use crate::rc::{MutArc, RcDeref, RcDerefMut};

  #[test]
  fn runs_in_deadline_order() {
    let lp = EventLoop::spawn("test-loop");
    let seen = MutArc::own(Vec::new());
    let (a, b) = (seen.clone(), seen.clone());
    lp.submit(
      Job::Once(Box::new(move || a.rc_deref_mut().push(2))),
      Some(Duration::from_millis(30)),
    );
    lp.submit(
      Job::Once(Box::new(move || b.rc_deref_mut().push(1))),
      Some(Duration::from_millis(5)),
    );
    thread::sleep(Duration::from_millis(80));
    assert_eq!(*seen.rc_deref(), vec![1, 2]);
    lp.shutdown();
  }

  #[test]
  fn worker_disposal_cancels_pending() {
    let worker = LoopWorker::new(EventLoop::spawn("test-loop"), Release::Owned);
    let hit = MutArc::own(false);
    let c = hit.clone();
    worker.schedule(
      OnceTask::new(|c: MutArc<bool>| *c.rc_deref_mut() = true, c),
      Some(Duration::from_millis(40)),
    );
    worker.clone().unsubscribe();
    thread::sleep(Duration::from_millis(80));
    assert!(!*hit.rc_deref());
  }
}
