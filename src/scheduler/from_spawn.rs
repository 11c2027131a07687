//! Bridge from any `futures` spawner to the scheduler contract.
//!
//! The executor gives no ordering guarantee, so each worker serializes
//! through its own queue: tasks are enqueued and a single drain future
//! works the queue off. Delays ride on `futures-timer`.

use std::{collections::VecDeque, time::Duration};

use futures::task::{Spawn, SpawnExt};
use futures_timer::Delay;

use crate::{
  rc::{CellArc, MutArc, RcDerefMut, SharedCell},
  scheduler::{OnceTask, RepeatTask, Scheduler, TaskHandle, Worker},
  subscription::Subscription,
};

#[derive(Clone)]
pub struct SpawnScheduler<SP> {
  spawner: SP,
}

impl<SP> SpawnScheduler<SP> {
  pub fn new(spawner: SP) -> Self {
    SpawnScheduler { spawner }
  }
}

impl<SP> Scheduler for SpawnScheduler<SP>
where
  SP: Spawn + Clone + Send + Sync + 'static,
{
  type Worker = SpawnWorker<SP>;

  fn create_worker(&self) -> SpawnWorker<SP> {
    SpawnWorker {
      spawner: self.spawner.clone(),
      state: MutArc::own(DrainState::default()),
      alive: CellArc::own(true),
      tasks: MutArc::own(Vec::new()),
    }
  }
}

type QueuedJob = Box<dyn FnOnce() + Send>;

#[derive(Default)]
struct DrainState {
  queue: VecDeque<(QueuedJob, TaskHandle)>,
  draining: bool,
}

pub struct SpawnWorker<SP> {
  spawner: SP,
  state: MutArc<DrainState>,
  alive: CellArc<bool>,
  tasks: MutArc<Vec<TaskHandle>>,
}

impl<SP: Clone> Clone for SpawnWorker<SP> {
  fn clone(&self) -> Self {
    SpawnWorker {
      spawner: self.spawner.clone(),
      state: self.state.clone(),
      alive: self.alive.clone(),
      tasks: self.tasks.clone(),
    }
  }
}

impl<SP> SpawnWorker<SP>
where
  SP: Spawn + Clone + Send + Sync + 'static,
{
  fn track(&self, handle: TaskHandle) -> TaskHandle {
    self.tasks.rc_deref_mut().push(handle.clone());
    handle
  }

  fn push_and_drain(&self, job: QueuedJob, handle: TaskHandle) {
    let start = {
      let mut state = self.state.rc_deref_mut();
      state.queue.push_back((job, handle));
      if state.draining {
        false
      } else {
        state.draining = true;
        true
      }
    };
    if start {
      let state = self.state.clone();
      let spawned = self.spawner.spawn(async move {
        loop {
          let item = {
            let mut state = state.rc_deref_mut();
            match state.queue.pop_front() {
              Some(item) => Some(item),
              None => {
                state.draining = false;
                None
              }
            }
          };
          let Some((job, handle)) = item else { break };
          if !handle.is_closed() {
            job();
            handle.finish();
          }
        }
      });
      if spawned.is_err() {
        self.state.rc_deref_mut().draining = false;
      }
    }
  }
}

impl<SP> Worker for SpawnWorker<SP>
where
  SP: Spawn + Clone + Send + Sync + 'static,
{
  fn schedule<S: Send + 'static>(&self, task: OnceTask<S>, delay: Option<Duration>) -> TaskHandle {
    if !self.alive.get() {
      return TaskHandle::cancelled();
    }
    let handle = self.track(TaskHandle::new());
    let job: QueuedJob = Box::new(move || task.call());
    match delay {
      None => self.push_and_drain(job, handle.clone()),
      Some(delay) => {
        let worker = self.clone();
        let for_spawn = handle.clone();
        let _ = self.spawner.spawn(async move {
          Delay::new(delay).await;
          if !for_spawn.is_closed() {
            worker.push_and_drain(job, for_spawn);
          }
        });
      }
    }
    handle
  }

  fn schedule_periodic<S: Send + 'static>(
    &self,
    task: RepeatTask<S>,
    initial: Duration,
    period: Duration,
  ) -> TaskHandle {
    if !self.alive.get() {
      return TaskHandle::cancelled();
    }
    let handle = self.track(TaskHandle::new());
    let shared_task = MutArc::own(task);
    let worker = self.clone();
    let for_spawn = handle.clone();
    let _ = self.spawner.spawn(async move {
      Delay::new(initial).await;
      loop {
        if for_spawn.is_closed() {
          break;
        }
        let tick_task = shared_task.clone();
        let gate = for_spawn.clone();
        let tick: QueuedJob = Box::new(move || {
          if !gate.is_closed() {
            tick_task.rc_deref_mut().tick()
          }
        });
        // each tick gets its own throwaway handle so finishing a run does
        // not close the periodic schedule
        worker.push_and_drain(tick, TaskHandle::new());
        Delay::new(period).await;
      }
    });
    handle
  }
}

impl<SP: Clone> Subscription for SpawnWorker<SP> {
  fn unsubscribe(self) {
    if !self.alive.get() {
      return;
    }
    self.alive.set(false);
    self.state.rc_deref_mut().queue.clear();
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
  use std::{thread, time::Duration};

  use futures::executor::ThreadPool;

  use super::*;
  use crate::rc::RcDeref;

  #[test]
  fn spawn_worker_serializes() {
    let pool = ThreadPool::new().unwrap();
    let sched = SpawnScheduler::new(pool);
    let worker = sched.create_worker();
    let log = MutArc::own(Vec::new());
    fn push((log, i): (MutArc<Vec<usize>>, usize)) {
      log.rc_deref_mut().push(i);
    }
    for i in 0..16 {
      worker.schedule(OnceTask::new(push, (log.clone(), i)), None);
    }
    thread::sleep(Duration::from_millis(120));
    assert_eq!(*log.rc_deref(), (0..16).collect::<Vec<_>>());
  }
}
