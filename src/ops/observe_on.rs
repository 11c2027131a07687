use std::collections::VecDeque;

use crate::{
  observable::{Observable, ObservableExt},
  observer::{Notification, Observer},
  rc::{MutArc, RcDeref, RcDerefMut},
  scheduler::{OnceTask, Scheduler, Worker},
  subscription::ZipSubscription,
};

/// Re-emits every notification from a worker of the given scheduler. An
/// unbounded hand-off queue sits between the two sides; a single drainer
/// at a time works it off in upstream order, terminal last.
#[derive(Clone)]
pub struct ObserveOnOp<S, SD> {
  pub(crate) source: S,
  pub(crate) scheduler: SD,
}

struct ObserveOnState<O, Item, Err> {
  observer: Option<O>,
  queue: VecDeque<Notification<Item, Err>>,
  draining: bool,
}

type Shared<O, Item, Err> = MutArc<ObserveOnState<O, Item, Err>>;

fn drain<O, Item, Err>(state: Shared<O, Item, Err>)
where
  O: Observer<Item, Err>,
{
  loop {
    let mut guard = state.rc_deref_mut();
    match guard.queue.pop_front() {
      None => {
        guard.draining = false;
        return;
      }
      Some(Notification::Next(value)) => {
        if let Some(observer) = guard.observer.as_mut() {
          observer.next(value);
        }
      }
      Some(Notification::Error(err)) => {
        if let Some(observer) = guard.observer.take() {
          drop(guard);
          observer.error(err);
          continue;
        }
      }
      Some(Notification::Complete) => {
        if let Some(observer) = guard.observer.take() {
          drop(guard);
          observer.complete();
          continue;
        }
      }
    }
  }
}

impl<Item, Err, O, S, SD> Observable<Item, Err, O> for ObserveOnOp<S, SD>
where
  O: Observer<Item, Err> + Send + 'static,
  Item: Send + 'static,
  Err: Send + 'static,
  S: Observable<Item, Err, ObserveOnObserver<O, Item, Err, SD::Worker>>,
  SD: Scheduler,
{
  type Unsub = ZipSubscription<S::Unsub, SD::Worker>;

  fn actual_subscribe(self, observer: O) -> Self::Unsub {
    let worker = self.scheduler.create_worker();
    let state = MutArc::own(ObserveOnState {
      observer: Some(observer),
      queue: VecDeque::new(),
      draining: false,
    });
    let unsub = self
      .source
      .actual_subscribe(ObserveOnObserver { state, worker: worker.clone() });
    ZipSubscription::new(unsub, worker)
  }
}

impl<Item, Err, S, SD> ObservableExt<Item, Err> for ObserveOnOp<S, SD> where
  S: ObservableExt<Item, Err>
{
}

pub struct ObserveOnObserver<O, Item, Err, W> {
  state: Shared<O, Item, Err>,
  worker: W,
}

impl<O, Item, Err, W> ObserveOnObserver<O, Item, Err, W>
where
  O: Observer<Item, Err> + Send + 'static,
  Item: Send + 'static,
  Err: Send + 'static,
  W: Worker,
{
  fn push(&self, notification: Notification<Item, Err>) {
    let start = {
      let mut guard = self.state.rc_deref_mut();
      if guard.observer.is_none() {
        return;
      }
      guard.queue.push_back(notification);
      if guard.draining {
        false
      } else {
        guard.draining = true;
        true
      }
    };
    if start {
      self.worker.schedule(OnceTask::new(drain::<O, Item, Err>, self.state.clone()), None);
    }
  }
}

impl<Item, Err, O, W> Observer<Item, Err> for ObserveOnObserver<O, Item, Err, W>
where
  O: Observer<Item, Err> + Send + 'static,
  Item: Send + 'static,
  Err: Send + 'static,
  W: Worker,
{
  fn next(&mut self, value: Item) {
    self.push(Notification::Next(value));
  }

  fn error(self, err: Err) {
    self.push(Notification::Error(err));
  }

  fn complete(self) {
    self.push(Notification::Complete);
  }

  fn is_finished(&self) -> bool {
    self.state.rc_deref().observer.as_ref().map_or(true, |o| o.is_finished())
  }
}

#[cfg(test)]
mod test {
  use std::{thread, time::Duration};

  use crate::prelude::*;

  #[test]
  fn emissions_hop_to_the_worker_in_order() {
    let seen = MutArc::own(Vec::new());
    let done = MutArc::own(false);
    let (cs, cd) = (seen.clone(), done.clone());
    let main = thread::current().id();
    let observed = MutArc::own(None);
    let co = observed.clone();
    observable::from_iter::<_, ()>(0..64)
      .observe_on(Schedulers::new_thread())
      .subscribe_complete(
        move |v| {
          *co.rc_deref_mut() = Some(thread::current().id());
          cs.rc_deref_mut().push(v);
        },
        move || *cd.rc_deref_mut() = true,
      );

    for _ in 0..50 {
      if *done.rc_deref() {
        break;
      }
      thread::sleep(Duration::from_millis(10));
    }
    assert_eq!(*seen.rc_deref(), (0..64).collect::<Vec<_>>());
    assert!(*done.rc_deref());
    assert_ne!(*observed.rc_deref(), Some(main));
  }

  #[test]
  fn virtual_clock_drain() {
    let sched = TestScheduler::new();
    let seen = MutArc::own(Vec::new());
    let c = seen.clone();
    observable::from_iter::<_, ()>([1, 2, 3])
      .observe_on(sched.clone())
      .subscribe(move |v| c.rc_deref_mut().push(v));

    assert!(seen.rc_deref().is_empty());
    sched.run_pending();
    assert_eq!(*seen.rc_deref(), vec![1, 2, 3]);
  }
}
