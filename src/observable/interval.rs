//! Periodic counter stream.

use std::time::Duration;

use crate::{
  observable::{Observable, ObservableExt},
  observer::Observer,
  rc::MutArc,
  scheduler::{RepeatTask, Scheduler, Worker},
  type_hint::TypeHint,
};

/// Emits `0, 1, 2, ...` every `period`, first after one `period`.
pub fn interval<Err, SD>(period: Duration, scheduler: SD) -> IntervalObservable<Err, SD> {
  interval_at(period, period, scheduler)
}

/// Like [`interval`], with a separate initial delay.
pub fn interval_at<Err, SD>(
  initial: Duration,
  period: Duration,
  scheduler: SD,
) -> IntervalObservable<Err, SD> {
  IntervalObservable { initial, period, scheduler, _hint: TypeHint::new() }
}

#[derive(Clone)]
pub struct IntervalObservable<Err, SD> {
  initial: Duration,
  period: Duration,
  scheduler: SD,
  _hint: TypeHint<Err>,
}

struct TickState<O> {
  observer: MutArc<Option<O>>,
  count: usize,
}

fn tick<Err, O: Observer<usize, Err>>(state: &mut TickState<O>) {
  let n = state.count;
  state.count += 1;
  state.observer.next(n);
}

impl<Err, O, SD> Observable<usize, Err, O> for IntervalObservable<Err, SD>
where
  O: Observer<usize, Err> + Send + 'static,
  SD: Scheduler,
{
  type Unsub = SD::Worker;

  fn actual_subscribe(self, observer: O) -> Self::Unsub {
    let worker = self.scheduler.create_worker();
    let state = TickState { observer: MutArc::own(Some(observer)), count: 0 };
    worker.schedule_periodic(RepeatTask::new(tick::<Err, O>, state), self.initial, self.period);
    worker
  }
}

impl<Err, SD> ObservableExt<usize, Err> for IntervalObservable<Err, SD> {}

#[cfg(test)]
mod test {
  use super::*;
  use crate::prelude::*;

  #[test]
  fn ticks_on_virtual_clock() {
    let sched = TestScheduler::new();
    let seen = MutArc::own(Vec::new());
    let c = seen.clone();
    interval::<(), _>(Duration::from_millis(10), sched.clone())
      .subscribe(move |v| c.rc_deref_mut().push(v));

    sched.advance_by(Duration::from_millis(35));
    assert_eq!(*seen.rc_deref(), vec![0, 1, 2]);
  }

  #[test]
  fn unsubscribe_stops_the_ticks() {
    let sched = TestScheduler::new();
    let seen = MutArc::own(Vec::new());
    let c = seen.clone();
    let sub = interval::<(), _>(Duration::from_millis(10), sched.clone())
      .subscribe(move |v| c.rc_deref_mut().push(v));

    sched.advance_by(Duration::from_millis(15));
    sub.unsubscribe();
    sched.advance_by(Duration::from_millis(50));
    assert_eq!(*seen.rc_deref(), vec![0]);
  }
}
