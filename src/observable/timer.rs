//! One-shot delayed emission.

use std::time::{Duration, Instant};

use crate::{
  observable::{Observable, ObservableExt},
  observer::Observer,
  rc::MutArc,
  scheduler::{OnceTask, Scheduler, Worker},
  type_hint::TypeHint,
};

/// Emits `0` after `delay`, then completes.
pub fn timer<Err, SD>(delay: Duration, scheduler: SD) -> TimerObservable<Err, SD> {
  TimerObservable { delay, scheduler, _hint: TypeHint::new() }
}

/// Emits `0` once the scheduler clock reaches `at`, then completes.
pub fn timer_at<Err, SD: Scheduler>(at: Instant, scheduler: SD) -> TimerObservable<Err, SD> {
  let delay = at.saturating_duration_since(scheduler.now());
  TimerObservable { delay, scheduler, _hint: TypeHint::new() }
}

#[derive(Clone)]
pub struct TimerObservable<Err, SD> {
  delay: Duration,
  scheduler: SD,
  _hint: TypeHint<Err>,
}

fn fire<Err, O: Observer<usize, Err>>(mut slot: MutArc<Option<O>>) {
  slot.next(0);
  slot.complete();
}

impl<Err, O, SD> Observable<usize, Err, O> for TimerObservable<Err, SD>
where
  O: Observer<usize, Err> + Send + 'static,
  SD: Scheduler,
{
  type Unsub = SD::Worker;

  fn actual_subscribe(self, observer: O) -> Self::Unsub {
    let worker = self.scheduler.create_worker();
    let slot = MutArc::own(Some(observer));
    worker.schedule(OnceTask::new(fire::<Err, O>, slot), Some(self.delay));
    worker
  }
}

impl<Err, SD> ObservableExt<usize, Err> for TimerObservable<Err, SD> {}
