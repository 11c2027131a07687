//! Schedulers that give each worker a dedicated loop, or share one loop
//! process-wide.

use lazy_static::lazy_static;

use crate::scheduler::{
  event_loop::{EventLoop, LoopWorker, Release},
  Scheduler,
};

/// A fresh thread per worker. Disposing the worker shuts its thread down.
#[derive(Clone, Copy, Default)]
pub struct NewThreadScheduler;

impl Scheduler for NewThreadScheduler {
  type Worker = LoopWorker;

  fn create_worker(&self) -> LoopWorker {
    LoopWorker::new(EventLoop::spawn("fluxion-new-thread"), Release::Owned)
  }
}

lazy_static! {
  static ref SINGLE_LOOP: EventLoop = EventLoop::spawn("fluxion-single");
}

/// One background thread shared by every worker; disposing a worker only
/// cancels that worker's tasks.
#[derive(Clone, Copy, Default)]
pub struct SingleScheduler;

impl SingleScheduler {
  pub(crate) fn new() -> Self {
    SingleScheduler
  }
}

impl Scheduler for SingleScheduler {
  type Worker = LoopWorker;

  fn create_worker(&self) -> LoopWorker {
    LoopWorker::new(SINGLE_LOOP.clone(), Release::Pooled)
  }
}
