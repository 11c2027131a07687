use std::time::Duration;

use crate::{
  observable::{Observable, ObservableExt},
  observer::Observer,
  rc::{MutArc, RcDeref, RcDerefMut},
  scheduler::{OnceTask, Scheduler, TaskHandle, Worker},
  subscription::{Subscription, ZipSubscription},
};

/// Emits an item only after `window` of silence follows it; a successor
/// arriving earlier displaces it.
#[derive(Clone)]
pub struct DebounceOp<S, SD> {
  pub(crate) source: S,
  pub(crate) window: Duration,
  pub(crate) scheduler: SD,
}

struct DebounceState<O, Item> {
  observer: Option<O>,
  trailing: Option<Item>,
}

type Shared<O, Item> = MutArc<DebounceState<O, Item>>;

fn emit_trailing<Err, O, Item>(state: Shared<O, Item>)
where
  O: Observer<Item, Err>,
{
  let mut guard = state.rc_deref_mut();
  if let Some(value) = guard.trailing.take() {
    if let Some(observer) = guard.observer.as_mut() {
      observer.next(value);
    }
  }
}

impl<Item, Err, O, S, SD> Observable<Item, Err, O> for DebounceOp<S, SD>
where
  O: Observer<Item, Err> + Send + 'static,
  Item: Send + 'static,
  Err: 'static,
  S: Observable<Item, Err, DebounceObserver<O, Item, SD::Worker>>,
  SD: Scheduler,
{
  type Unsub = ZipSubscription<S::Unsub, SD::Worker>;

  fn actual_subscribe(self, observer: O) -> Self::Unsub {
    let worker = self.scheduler.create_worker();
    let state = MutArc::own(DebounceState { observer: Some(observer), trailing: None });
    let unsub = self.source.actual_subscribe(DebounceObserver {
      state,
      worker: worker.clone(),
      window: self.window,
      timer: MutArc::own(None),
    });
    ZipSubscription::new(unsub, worker)
  }
}

impl<Item, Err, S, SD> ObservableExt<Item, Err> for DebounceOp<S, SD> where
  S: ObservableExt<Item, Err>
{
}

pub struct DebounceObserver<O, Item, W> {
  state: Shared<O, Item>,
  worker: W,
  window: Duration,
  timer: MutArc<Option<TaskHandle>>,
}

impl<Item, Err, O, W> Observer<Item, Err> for DebounceObserver<O, Item, W>
where
  O: Observer<Item, Err> + Send + 'static,
  Item: Send + 'static,
  Err: 'static,
  W: Worker,
{
  fn next(&mut self, value: Item) {
    {
      let mut guard = self.state.rc_deref_mut();
      if guard.observer.is_none() {
        return;
      }
      guard.trailing = Some(value);
    }
    let displaced = self.timer.rc_deref_mut().take();
    if let Some(handle) = displaced {
      handle.unsubscribe();
    }
    let handle = self
      .worker
      .schedule(OnceTask::new(emit_trailing::<Err, O, Item>, self.state.clone()), Some(self.window));
    *self.timer.rc_deref_mut() = Some(handle);
  }

  fn error(self, err: Err) {
    let taken = self.state.rc_deref_mut().observer.take();
    if let Some(observer) = taken {
      observer.error(err)
    }
  }

  fn complete(self) {
    let taken = {
      let mut guard = self.state.rc_deref_mut();
      guard.observer.take().map(|observer| (observer, guard.trailing.take()))
    };
    if let Some((mut observer, trailing)) = taken {
      if let Some(value) = trailing {
        observer.next(value);
      }
      observer.complete();
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
  fn a_quick_successor_displaces_its_predecessor() {
    let sched = TestScheduler::new();
    let mut source = Subject::<i32, ()>::new();
    let seen = MutArc::own(Vec::new());
    let c = seen.clone();
    source
      .clone()
      .debounce(Duration::from_millis(20), sched.clone())
      .subscribe(move |v| c.rc_deref_mut().push(v));

    source.next(1);
    sched.advance_by(Duration::from_millis(10));
    source.next(2);
    sched.advance_by(Duration::from_millis(20));
    source.next(3);
    sched.advance_by(Duration::from_millis(20));
    assert_eq!(*seen.rc_deref(), vec![2, 3]);
  }

  #[test]
  fn completion_flushes_the_pending_item() {
    let sched = TestScheduler::new();
    let mut source = Subject::<i32, ()>::new();
    let seen = MutArc::own(Vec::new());
    let done = MutArc::own(false);
    let (cs, cd) = (seen.clone(), done.clone());
    source
      .clone()
      .debounce(Duration::from_millis(20), sched.clone())
      .subscribe_complete(move |v| cs.rc_deref_mut().push(v), move || *cd.rc_deref_mut() = true);

    source.next(9);
    source.clone().complete();
    assert_eq!(*seen.rc_deref(), vec![9]);
    assert!(*done.rc_deref());
  }
}
