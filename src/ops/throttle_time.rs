use std::time::Duration;

use crate::{
  observable::{Observable, ObservableExt},
  observer::Observer,
  rc::{MutArc, RcDeref, RcDerefMut},
  scheduler::{OnceTask, Scheduler, Worker},
  subscription::ZipSubscription,
};

/// Which side of a throttle window gets the item.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ThrottleEdge {
  /// The first item opens the window and is emitted; the rest of the
  /// window is suppressed.
  Leading,
  /// The window collects silently and its freshest item is emitted when
  /// it closes.
  Trailing,
}

/// Rate-limits the stream to one item per `window`.
#[derive(Clone)]
pub struct ThrottleTimeOp<S, SD> {
  pub(crate) source: S,
  pub(crate) window: Duration,
  pub(crate) edge: ThrottleEdge,
  pub(crate) scheduler: SD,
}

struct ThrottleState<O, Item> {
  observer: Option<O>,
  pending: Option<Item>,
  window_open: bool,
}

type Shared<O, Item> = MutArc<ThrottleState<O, Item>>;

// window closing: release a trailing item, reopen for the next one
fn close_window<Err, O, Item>(state: Shared<O, Item>)
where
  O: Observer<Item, Err>,
{
  let mut guard = state.rc_deref_mut();
  guard.window_open = false;
  if let Some(value) = guard.pending.take() {
    if let Some(observer) = guard.observer.as_mut() {
      observer.next(value);
    }
  }
}

impl<Item, Err, O, S, SD> Observable<Item, Err, O> for ThrottleTimeOp<S, SD>
where
  O: Observer<Item, Err> + Send + 'static,
  Item: Send + 'static,
  Err: 'static,
  S: Observable<Item, Err, ThrottleTimeObserver<O, Item, SD::Worker>>,
  SD: Scheduler,
{
  type Unsub = ZipSubscription<S::Unsub, SD::Worker>;

  fn actual_subscribe(self, observer: O) -> Self::Unsub {
    let worker = self.scheduler.create_worker();
    let state =
      MutArc::own(ThrottleState { observer: Some(observer), pending: None, window_open: false });
    let unsub = self.source.actual_subscribe(ThrottleTimeObserver {
      state,
      worker: worker.clone(),
      window: self.window,
      edge: self.edge,
    });
    ZipSubscription::new(unsub, worker)
  }
}

impl<Item, Err, S, SD> ObservableExt<Item, Err> for ThrottleTimeOp<S, SD> where
  S: ObservableExt<Item, Err>
{
}

pub struct ThrottleTimeObserver<O, Item, W> {
  state: Shared<O, Item>,
  worker: W,
  window: Duration,
  edge: ThrottleEdge,
}

impl<Item, Err, O, W> Observer<Item, Err> for ThrottleTimeObserver<O, Item, W>
where
  O: Observer<Item, Err> + Send + 'static,
  Item: Send + 'static,
  Err: 'static,
  W: Worker,
{
  fn next(&mut self, value: Item) {
    let open_window = {
      let mut guard = self.state.rc_deref_mut();
      if guard.observer.is_none() {
        return;
      }
      match self.edge {
        ThrottleEdge::Leading => {
          if guard.window_open {
            return;
          }
          guard.window_open = true;
          if let Some(observer) = guard.observer.as_mut() {
            observer.next(value);
          }
          true
        }
        ThrottleEdge::Trailing => {
          guard.pending = Some(value);
          if guard.window_open {
            false
          } else {
            guard.window_open = true;
            true
          }
        }
      }
    };
    if open_window {
      self
        .worker
        .schedule(OnceTask::new(close_window::<Err, O, Item>, self.state.clone()), Some(self.window));
    }
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
      guard.observer.take().map(|observer| (observer, guard.pending.take()))
    };
    if let Some((mut observer, pending)) = taken {
      if let Some(value) = pending {
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
  fn leading_edge_keeps_the_first_per_window() {
    let sched = TestScheduler::new();
    let mut source = Subject::<i32, ()>::new();
    let seen = MutArc::own(Vec::new());
    let c = seen.clone();
    source
      .clone()
      .throttle_first(Duration::from_millis(10), sched.clone())
      .subscribe(move |v| c.rc_deref_mut().push(v));

    source.next(1);
    source.next(2);
    sched.advance_by(Duration::from_millis(10));
    source.next(3);
    assert_eq!(*seen.rc_deref(), vec![1, 3]);
  }

  #[test]
  fn trailing_edge_keeps_the_last_per_window() {
    let sched = TestScheduler::new();
    let mut source = Subject::<i32, ()>::new();
    let seen = MutArc::own(Vec::new());
    let c = seen.clone();
    source
      .clone()
      .throttle_last(Duration::from_millis(10), sched.clone())
      .subscribe(move |v| c.rc_deref_mut().push(v));

    source.next(1);
    source.next(2);
    sched.advance_by(Duration::from_millis(10));
    source.next(3);
    sched.advance_by(Duration::from_millis(10));
    assert_eq!(*seen.rc_deref(), vec![2, 3]);
  }
}
