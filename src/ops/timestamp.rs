use std::time::Instant;

use crate::{
  observable::{Observable, ObservableExt},
  observer::Observer,
  scheduler::Scheduler,
};

/// Pairs every item with the scheduler clock at the moment it passed
/// through; virtual under the test scheduler.
#[derive(Clone)]
pub struct TimestampOp<S, SD> {
  pub(crate) source: S,
  pub(crate) scheduler: SD,
}

impl<Item, Err, O, S, SD> Observable<(Instant, Item), Err, O> for TimestampOp<S, SD>
where
  O: Observer<(Instant, Item), Err>,
  S: Observable<Item, Err, TimestampObserver<O, SD>>,
  SD: Scheduler,
{
  type Unsub = S::Unsub;

  fn actual_subscribe(self, observer: O) -> Self::Unsub {
    self.source.actual_subscribe(TimestampObserver { observer, scheduler: self.scheduler })
  }
}

impl<Item, Err, S, SD> ObservableExt<(Instant, Item), Err> for TimestampOp<S, SD> where
  S: ObservableExt<Item, Err>
{
}

pub struct TimestampObserver<O, SD> {
  observer: O,
  scheduler: SD,
}

impl<Item, Err, O, SD> Observer<Item, Err> for TimestampObserver<O, SD>
where
  O: Observer<(Instant, Item), Err>,
  SD: Scheduler,
{
  fn next(&mut self, value: Item) {
    self.observer.next((self.scheduler.now(), value))
  }

  fn error(self, err: Err) {
    self.observer.error(err)
  }

  fn complete(self) {
    self.observer.complete()
  }

  fn is_finished(&self) -> bool {
    self.observer.is_finished()
  }
}
