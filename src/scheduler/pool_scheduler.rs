//! Pooled loop schedulers: a fixed round-robin pool for computation work
//! and an elastic cached pool for blocking io work.

use std::{
  sync::{
    atomic::{AtomicUsize, Ordering},
    Arc, Mutex,
  },
  time::{Duration, Instant},
};

use crate::scheduler::{
  event_loop::{EventLoop, LoopHome, LoopWorker, Release},
  Scheduler,
};

/// Fixed pool of loops; workers are pinned round-robin. Disposing a worker
/// cancels its tasks but the loops live for the process.
#[derive(Clone)]
pub struct ThreadPoolScheduler {
  loops: Arc<Vec<EventLoop>>,
  next: Arc<AtomicUsize>,
}

impl ThreadPoolScheduler {
  pub fn new(size: usize) -> Self {
    let size = size.max(1);
    let loops = (0..size).map(|i| EventLoop::spawn(&format!("fluxion-computation-{i}"))).collect();
    ThreadPoolScheduler { loops: Arc::new(loops), next: Arc::new(AtomicUsize::new(0)) }
  }
}

impl Scheduler for ThreadPoolScheduler {
  type Worker = LoopWorker;

  fn create_worker(&self) -> LoopWorker {
    let idx = self.next.fetch_add(1, Ordering::Relaxed) % self.loops.len();
    LoopWorker::new(self.loops[idx].clone(), Release::Pooled)
  }
}

struct IoCache {
  idle: Mutex<Vec<(EventLoop, Instant)>>,
  keep_alive: Duration,
}

impl IoCache {
  fn checkout(&self) -> EventLoop {
    let mut idle = self.idle.lock().unwrap();
    let now = Instant::now();
    // evict loops that sat idle past the keep-alive
    let mut kept = Vec::with_capacity(idle.len());
    for (lp, since) in idle.drain(..) {
      if now.duration_since(since) > self.keep_alive {
        lp.shutdown();
      } else {
        kept.push((lp, since));
      }
    }
    *idle = kept;
    match idle.pop() {
      Some((lp, _)) => lp,
      None => EventLoop::spawn("fluxion-io"),
    }
  }
}

impl LoopHome for IoCache {
  fn give_back(&self, lp: EventLoop) {
    self.idle.lock().unwrap().push((lp, Instant::now()));
  }
}

/// Elastic pool: each worker checks a loop out of the cache (or spawns one)
/// and returns it on disposal; idle loops expire after a keep-alive.
#[derive(Clone)]
pub struct IoScheduler {
  cache: Arc<IoCache>,
}

impl IoScheduler {
  pub fn new(keep_alive: Duration) -> Self {
    IoScheduler { cache: Arc::new(IoCache { idle: Mutex::new(Vec::new()), keep_alive }) }
  }
}

impl Scheduler for IoScheduler {
  type Worker = LoopWorker;

  fn create_worker(&self) -> LoopWorker {
    let lp = self.cache.checkout();
    LoopWorker::new(lp, Release::Cached(self.cache.clone()))
  }
}
