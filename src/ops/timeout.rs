use std::time::Duration;

use crate::{
  error::TimeoutError,
  observable::{Observable, ObservableExt},
  observer::Observer,
  rc::{MutArc, RcDeref, RcDerefMut},
  scheduler::{OnceTask, Scheduler, TaskHandle, Worker},
  subscription::{SerialSubscription, Subscription, ZipSubscription},
};

/// Errors with [`TimeoutError`] when the gap before the first item, or
/// between consecutive items, exceeds `window`.
#[derive(Clone)]
pub struct TimeoutOp<S, SD> {
  pub(crate) source: S,
  pub(crate) window: Duration,
  pub(crate) scheduler: SD,
}

struct TimeoutState<O> {
  observer: Option<O>,
  seq: u64,
}

type Shared<O> = MutArc<TimeoutState<O>>;

fn expire<Err, Item, O>((state, seq, window): (Shared<O>, u64, Duration))
where
  O: Observer<Item, Err>,
  Err: From<TimeoutError>,
{
  let taken = {
    let mut guard = state.rc_deref_mut();
    if guard.seq == seq {
      guard.observer.take()
    } else {
      None
    }
  };
  if let Some(observer) = taken {
    observer.error(Err::from(TimeoutError { after: window }));
  }
}

impl<Item, Err, O, S, SD> Observable<Item, Err, O> for TimeoutOp<S, SD>
where
  O: Observer<Item, Err> + Send + 'static,
  Item: 'static,
  Err: From<TimeoutError> + 'static,
  S: Observable<Item, Err, TimeoutObserver<O, SD::Worker>>,
  SD: Scheduler,
{
  type Unsub = ZipSubscription<S::Unsub, SD::Worker>;

  fn actual_subscribe(self, observer: O) -> Self::Unsub {
    let worker = self.scheduler.create_worker();
    let state = MutArc::own(TimeoutState { observer: Some(observer), seq: 0 });
    let timer = worker.schedule(
      OnceTask::new(expire::<Err, Item, O>, (state.clone(), 0, self.window)),
      Some(self.window),
    );
    let unsub = self.source.actual_subscribe(TimeoutObserver {
      state,
      worker: worker.clone(),
      window: self.window,
      timer: MutArc::own(Some(timer)),
    });
    ZipSubscription::new(unsub, worker)
  }
}

impl<Item, Err, S, SD> ObservableExt<Item, Err> for TimeoutOp<S, SD> where S: ObservableExt<Item, Err>
{}

pub struct TimeoutObserver<O, W> {
  state: Shared<O>,
  worker: W,
  window: Duration,
  timer: MutArc<Option<TaskHandle>>,
}

impl<Item, Err, O, W> Observer<Item, Err> for TimeoutObserver<O, W>
where
  O: Observer<Item, Err> + Send + 'static,
  Item: 'static,
  Err: From<TimeoutError> + 'static,
  W: Worker,
{
  fn next(&mut self, value: Item) {
    let seq = {
      let mut guard = self.state.rc_deref_mut();
      if guard.observer.is_none() {
        return;
      }
      guard.seq += 1;
      if let Some(observer) = guard.observer.as_mut() {
        observer.next(value);
      }
      guard.seq
    };
    let stale = self.timer.rc_deref_mut().take();
    if let Some(handle) = stale {
      handle.unsubscribe();
    }
    let handle = self.worker.schedule(
      OnceTask::new(expire::<Err, Item, O>, (self.state.clone(), seq, self.window)),
      Some(self.window),
    );
    *self.timer.rc_deref_mut() = Some(handle);
  }

  fn error(self, err: Err) {
    let taken = {
      let mut guard = self.state.rc_deref_mut();
      guard.seq += 1;
      guard.observer.take()
    };
    if let Some(observer) = taken {
      observer.error(err)
    }
  }

  fn complete(self) {
    let taken = {
      let mut guard = self.state.rc_deref_mut();
      guard.seq += 1;
      guard.observer.take()
    };
    if let Some(observer) = taken {
      observer.complete()
    }
  }

  fn is_finished(&self) -> bool {
    self.state.rc_deref().observer.as_ref().map_or(true, |o| o.is_finished())
  }
}

/// Like [`TimeoutOp`], but an expiry hands the subscriber over to a
/// fallback source instead of erroring.
#[derive(Clone)]
pub struct TimeoutWithOp<S, F, SD> {
  pub(crate) source: S,
  pub(crate) window: Duration,
  pub(crate) fallback: F,
  pub(crate) scheduler: SD,
}

struct TimeoutWithState<O, F> {
  observer: Option<O>,
  fallback: Option<F>,
  seq: u64,
  handover: SerialSubscription,
}

type SharedWith<O, F> = MutArc<TimeoutWithState<O, F>>;

fn expire_with<Err, Item, O, F>((state, seq): (SharedWith<O, F>, u64))
where
  O: Observer<Item, Err>,
  F: Observable<Item, Err, O>,
  F::Unsub: Send + 'static,
{
  let taken = {
    let mut guard = state.rc_deref_mut();
    if guard.seq != seq {
      None
    } else {
      match (guard.observer.take(), guard.fallback.take()) {
        (Some(observer), Some(fallback)) => Some((observer, fallback, guard.handover.clone())),
        _ => None,
      }
    }
  };
  if let Some((observer, fallback, handover)) = taken {
    handover.swap(fallback.actual_subscribe(observer));
  }
}

impl<Item, Err, O, S, F, SD> Observable<Item, Err, O> for TimeoutWithOp<S, F, SD>
where
  O: Observer<Item, Err> + Send + 'static,
  Item: 'static,
  Err: 'static,
  S: Observable<Item, Err, TimeoutWithObserver<O, F, SD::Worker>>,
  F: Observable<Item, Err, O> + Send + 'static,
  F::Unsub: Send + 'static,
  SD: Scheduler,
{
  type Unsub = ZipSubscription<S::Unsub, ZipSubscription<SD::Worker, SerialSubscription>>;

  fn actual_subscribe(self, observer: O) -> Self::Unsub {
    let worker = self.scheduler.create_worker();
    let handover = SerialSubscription::default();
    let state = MutArc::own(TimeoutWithState {
      observer: Some(observer),
      fallback: Some(self.fallback),
      seq: 0,
      handover: handover.clone(),
    });
    let timer = worker.schedule(
      OnceTask::new(expire_with::<Err, Item, O, F>, (state.clone(), 0)),
      Some(self.window),
    );
    let unsub = self.source.actual_subscribe(TimeoutWithObserver {
      state,
      worker: worker.clone(),
      window: self.window,
      timer: MutArc::own(Some(timer)),
    });
    ZipSubscription::new(unsub, ZipSubscription::new(worker, handover))
  }
}

impl<Item, Err, S, F, SD> ObservableExt<Item, Err> for TimeoutWithOp<S, F, SD> where
  S: ObservableExt<Item, Err>
{
}

pub struct TimeoutWithObserver<O, F, W> {
  state: SharedWith<O, F>,
  worker: W,
  window: Duration,
  timer: MutArc<Option<TaskHandle>>,
}

impl<Item, Err, O, F, W> Observer<Item, Err> for TimeoutWithObserver<O, F, W>
where
  O: Observer<Item, Err> + Send + 'static,
  Item: 'static,
  Err: 'static,
  F: Observable<Item, Err, O> + Send + 'static,
  F::Unsub: Send + 'static,
  W: Worker,
{
  fn next(&mut self, value: Item) {
    let seq = {
      let mut guard = self.state.rc_deref_mut();
      if guard.observer.is_none() {
        return;
      }
      guard.seq += 1;
      if let Some(observer) = guard.observer.as_mut() {
        observer.next(value);
      }
      guard.seq
    };
    let stale = self.timer.rc_deref_mut().take();
    if let Some(handle) = stale {
      handle.unsubscribe();
    }
    let handle = self.worker.schedule(
      OnceTask::new(expire_with::<Err, Item, O, F>, (self.state.clone(), seq)),
      Some(self.window),
    );
    *self.timer.rc_deref_mut() = Some(handle);
  }

  fn error(self, err: Err) {
    let taken = {
      let mut guard = self.state.rc_deref_mut();
      guard.seq += 1;
      guard.observer.take()
    };
    if let Some(observer) = taken {
      observer.error(err)
    }
  }

  fn complete(self) {
    let taken = {
      let mut guard = self.state.rc_deref_mut();
      guard.seq += 1;
      guard.observer.take()
    };
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
  fn quiet_stream_times_out() {
    let sched = TestScheduler::new();
    let mut source = Subject::<i32, TimeoutError>::new();
    let seen = MutArc::own(Vec::new());
    let err = MutArc::own(None);
    let (cs, ce) = (seen.clone(), err.clone());
    source
      .clone()
      .timeout(Duration::from_millis(20), sched.clone())
      .subscribe_err(move |v| cs.rc_deref_mut().push(v), move |e| *ce.rc_deref_mut() = Some(e));

    source.next(1);
    sched.advance_by(Duration::from_millis(10));
    source.next(2);
    sched.advance_by(Duration::from_millis(25));
    assert_eq!(*seen.rc_deref(), vec![1, 2]);
    assert_eq!(*err.rc_deref(), Some(TimeoutError { after: Duration::from_millis(20) }));
  }

  #[test]
  fn expiry_switches_to_the_fallback() {
    let sched = TestScheduler::new();
    let seen = MutArc::own(Vec::new());
    let c = seen.clone();
    observable::never::<i32, ()>()
      .timeout_with(Duration::from_millis(15), observable::from_iter([7, 8]), sched.clone())
      .subscribe(move |v| c.rc_deref_mut().push(v));

    assert!(seen.rc_deref().is_empty());
    sched.advance_by(Duration::from_millis(15));
    assert_eq!(*seen.rc_deref(), vec![7, 8]);
  }
}
