use std::time::Duration;

use crate::{
  observable::{Observable, ObservableExt},
  observer::Observer,
  rc::{MutArc, RcDeref, RcDerefMut},
  scheduler::{RepeatTask, Scheduler, Worker},
  subscription::ZipSubscription,
};

/// At every tick, emits the freshest item received since the previous
/// tick; a quiet period emits nothing.
#[derive(Clone)]
pub struct SampleOp<S, SD> {
  pub(crate) source: S,
  pub(crate) period: Duration,
  pub(crate) scheduler: SD,
}

struct SampleState<O, Item> {
  observer: Option<O>,
  latest: Option<Item>,
}

type Shared<O, Item> = MutArc<SampleState<O, Item>>;

fn sample_tick<Err, O, Item>(state: &mut Shared<O, Item>)
where
  O: Observer<Item, Err>,
{
  let mut guard = state.rc_deref_mut();
  if let Some(value) = guard.latest.take() {
    if let Some(observer) = guard.observer.as_mut() {
      observer.next(value);
    }
  }
}

impl<Item, Err, O, S, SD> Observable<Item, Err, O> for SampleOp<S, SD>
where
  O: Observer<Item, Err> + Send + 'static,
  Item: Send + 'static,
  Err: 'static,
  S: Observable<Item, Err, SampleObserver<O, Item>>,
  SD: Scheduler,
{
  type Unsub = ZipSubscription<S::Unsub, SD::Worker>;

  fn actual_subscribe(self, observer: O) -> Self::Unsub {
    let worker = self.scheduler.create_worker();
    let state = MutArc::own(SampleState { observer: Some(observer), latest: None });
    worker.schedule_periodic(
      RepeatTask::new(sample_tick::<Err, O, Item>, state.clone()),
      self.period,
      self.period,
    );
    let unsub = self.source.actual_subscribe(SampleObserver { state });
    ZipSubscription::new(unsub, worker)
  }
}

impl<Item, Err, S, SD> ObservableExt<Item, Err> for SampleOp<S, SD> where S: ObservableExt<Item, Err>
{}

pub struct SampleObserver<O, Item> {
  state: Shared<O, Item>,
}

impl<Item, Err, O> Observer<Item, Err> for SampleObserver<O, Item>
where
  O: Observer<Item, Err>,
{
  fn next(&mut self, value: Item) {
    self.state.rc_deref_mut().latest = Some(value);
  }

  fn error(self, err: Err) {
    let taken = self.state.rc_deref_mut().observer.take();
    if let Some(observer) = taken {
      observer.error(err)
    }
  }

  fn complete(self) {
    let taken = self.state.rc_deref_mut().observer.take();
    if let Some(observer) = taken {
      observer.complete()
    }
  }

  fn is_finished(&self) -> bool {
    self.state.rc_deref().observer.as_ref().map_or(true, |o| o.is_finished())
  }
}

#[cfg(test)]
mod test {
  use crate::prelude::*;

  #[test]
  fn emits_freshest_item_per_tick() {
    let sched = TestScheduler::new();
    let mut source = Subject::<i32, ()>::new();
    let seen = MutArc::own(Vec::new());
    let c = seen.clone();
    source
      .clone()
      .sample(Duration::from_millis(10), sched.clone())
      .subscribe(move |v| c.rc_deref_mut().push(v));

    source.next(1);
    source.next(2);
    sched.advance_by(Duration::from_millis(10));
    sched.advance_by(Duration::from_millis(10));
    source.next(3);
    sched.advance_by(Duration::from_millis(10));
    assert_eq!(*seen.rc_deref(), vec![2, 3]);
  }
}
