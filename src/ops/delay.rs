use std::time::Duration;

use crate::{
  observable::{Observable, ObservableExt},
  observer::Observer,
  rc::MutArc,
  scheduler::{OnceTask, Scheduler, Worker},
  subscription::ZipSubscription,
};

/// Shifts every item and the completion by `delay`; errors pass through
/// immediately.
#[derive(Clone)]
pub struct DelayOp<S, SD> {
  pub(crate) source: S,
  pub(crate) delay: Duration,
  pub(crate) scheduler: SD,
}

fn deliver_next<Err, O, Item>((mut slot, value): (MutArc<Option<O>>, Item))
where
  O: Observer<Item, Err>,
{
  slot.next(value);
}

fn deliver_complete<Err, Item, O>(slot: MutArc<Option<O>>)
where
  O: Observer<Item, Err>,
{
  slot.complete();
}

impl<Item, Err, O, S, SD> Observable<Item, Err, O> for DelayOp<S, SD>
where
  O: Observer<Item, Err> + Send + 'static,
  Item: Send + 'static,
  Err: 'static,
  S: Observable<Item, Err, DelayObserver<O, SD::Worker>>,
  SD: Scheduler,
{
  type Unsub = ZipSubscription<S::Unsub, SD::Worker>;

  fn actual_subscribe(self, observer: O) -> Self::Unsub {
    let worker = self.scheduler.create_worker();
    let unsub = self.source.actual_subscribe(DelayObserver {
      slot: MutArc::own(Some(observer)),
      worker: worker.clone(),
      delay: self.delay,
    });
    ZipSubscription::new(unsub, worker)
  }
}

impl<Item, Err, S, SD> ObservableExt<Item, Err> for DelayOp<S, SD> where S: ObservableExt<Item, Err>
{}

pub struct DelayObserver<O, W> {
  slot: MutArc<Option<O>>,
  worker: W,
  delay: Duration,
}

impl<Item, Err, O, W> Observer<Item, Err> for DelayObserver<O, W>
where
  O: Observer<Item, Err> + Send + 'static,
  Item: Send + 'static,
  Err: 'static,
  W: Worker,
{
  fn next(&mut self, value: Item) {
    self.worker.schedule(
      OnceTask::new(deliver_next::<Err, O, Item>, (self.slot.clone(), value)),
      Some(self.delay),
    );
  }

  fn error(self, err: Err) {
    self.slot.error(err);
  }

  fn complete(self) {
    self
      .worker
      .schedule(OnceTask::new(deliver_complete::<Err, Item, O>, self.slot), Some(self.delay));
  }

  fn is_finished(&self) -> bool {
    self.slot.is_finished()
  }
}

#[cfg(test)]
mod test {
  use crate::prelude::*;

  #[test]
  fn items_arrive_after_the_delay() {
    let sched = TestScheduler::new();
    let seen = MutArc::own(Vec::new());
    let done = MutArc::own(false);
    let (cs, cd) = (seen.clone(), done.clone());
    observable::from_iter::<_, ()>([1, 2])
      .delay(Duration::from_millis(30), sched.clone())
      .subscribe_complete(move |v| cs.rc_deref_mut().push(v), move || *cd.rc_deref_mut() = true);

    assert!(seen.rc_deref().is_empty());
    sched.advance_by(Duration::from_millis(30));
    assert_eq!(*seen.rc_deref(), vec![1, 2]);
    assert!(*done.rc_deref());
  }
}
