use std::time::Duration;

use crate::{
  observable::{Observable, ObservableExt},
  observer::Observer,
  rc::{MutArc, RcDeref, RcDerefMut},
  scheduler::{RepeatTask, Scheduler, Worker},
  subject::Subject,
  subscription::ZipSubscription,
};

/// Splits the stream into consecutive inner streams of `count` items each.
/// Windows are hot subjects: subscribe on receipt to see their items.
#[derive(Clone)]
pub struct WindowCountOp<S> {
  pub(crate) source: S,
  pub(crate) count: usize,
}

pub struct WindowCountObserver<O, Item, Err> {
  observer: O,
  count: usize,
  filled: usize,
  window: Subject<Item, Err>,
}

impl<Item, Err, O> Observer<Item, Err> for WindowCountObserver<O, Item, Err>
where
  O: Observer<Subject<Item, Err>, Err>,
  Item: Clone,
  Err: Clone,
{
  fn next(&mut self, value: Item) {
    self.window.next(value);
    self.filled += 1;
    if self.filled == self.count {
      self.filled = 0;
      let closing = std::mem::take(&mut self.window);
      closing.complete();
      self.observer.next(self.window.clone());
    }
  }

  fn error(self, err: Err) {
    self.window.error(err.clone());
    self.observer.error(err)
  }

  fn complete(self) {
    self.window.complete();
    self.observer.complete()
  }

  fn is_finished(&self) -> bool {
    self.observer.is_finished()
  }
}

impl<Item, Err, O, S> Observable<Subject<Item, Err>, Err, O> for WindowCountOp<S>
where
  O: Observer<Subject<Item, Err>, Err>,
  S: Observable<Item, Err, WindowCountObserver<O, Item, Err>>,
  Item: Clone,
  Err: Clone,
{
  type Unsub = S::Unsub;

  fn actual_subscribe(self, mut observer: O) -> Self::Unsub {
    let window = Subject::new();
    observer.next(window.clone());
    self.source.actual_subscribe(WindowCountObserver {
      observer,
      count: self.count.max(1),
      filled: 0,
      window,
    })
  }
}

impl<Item, Err, S> ObservableExt<Subject<Item, Err>, Err> for WindowCountOp<S> where
  S: ObservableExt<Item, Err>
{
}

/// Rotates to a fresh inner stream every `period` on a worker.
#[derive(Clone)]
pub struct WindowTimeOp<S, SD> {
  pub(crate) source: S,
  pub(crate) period: Duration,
  pub(crate) scheduler: SD,
}

struct WindowTimeState<O, Item, Err> {
  observer: Option<O>,
  window: Subject<Item, Err>,
}

type Shared<O, Item, Err> = MutArc<WindowTimeState<O, Item, Err>>;

fn rotate<O, Item, Err>(state: &mut Shared<O, Item, Err>)
where
  O: Observer<Subject<Item, Err>, Err>,
  Item: Clone,
  Err: Clone,
{
  let mut guard = state.rc_deref_mut();
  if guard.observer.is_none() {
    return;
  }
  let closing = std::mem::take(&mut guard.window);
  closing.complete();
  let fresh = guard.window.clone();
  if let Some(observer) = guard.observer.as_mut() {
    observer.next(fresh);
  }
}

impl<Item, Err, O, S, SD> Observable<Subject<Item, Err>, Err, O> for WindowTimeOp<S, SD>
where
  O: Observer<Subject<Item, Err>, Err> + Send + 'static,
  S: Observable<Item, Err, WindowTimeObserver<O, Item, Err>>,
  SD: Scheduler,
  Item: Clone + Send + 'static,
  Err: Clone + Send + 'static,
{
  type Unsub = ZipSubscription<S::Unsub, SD::Worker>;

  fn actual_subscribe(self, mut observer: O) -> Self::Unsub {
    let window = Subject::new();
    observer.next(window.clone());
    let worker = self.scheduler.create_worker();
    let state = MutArc::own(WindowTimeState { observer: Some(observer), window });
    worker.schedule_periodic(
      RepeatTask::new(rotate::<O, Item, Err>, state.clone()),
      self.period,
      self.period,
    );
    let unsub = self.source.actual_subscribe(WindowTimeObserver { state });
    ZipSubscription::new(unsub, worker)
  }
}

impl<Item, Err, S, SD> ObservableExt<Subject<Item, Err>, Err> for WindowTimeOp<S, SD> where
  S: ObservableExt<Item, Err>
{
}

pub struct WindowTimeObserver<O, Item, Err> {
  state: Shared<O, Item, Err>,
}

impl<Item, Err, O> Observer<Item, Err> for WindowTimeObserver<O, Item, Err>
where
  O: Observer<Subject<Item, Err>, Err>,
  Item: Clone,
  Err: Clone,
{
  fn next(&mut self, value: Item) {
    let mut window = {
      let guard = self.state.rc_deref();
      if guard.observer.is_none() {
        return;
      }
      guard.window.clone()
    };
    window.next(value);
  }

  fn error(self, err: Err) {
    let taken = {
      let mut guard = self.state.rc_deref_mut();
      guard.observer.take().map(|observer| (observer, guard.window.clone()))
    };
    if let Some((observer, window)) = taken {
      window.error(err.clone());
      observer.error(err);
    }
  }

  fn complete(self) {
    let taken = {
      let mut guard = self.state.rc_deref_mut();
      guard.observer.take().map(|observer| (observer, guard.window.clone()))
    };
    if let Some((observer, window)) = taken {
      window.complete();
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
  fn count_windows_partition_the_stream() {
    let seen = MutArc::own(Vec::new());
    let c = seen.clone();
    observable::from_iter::<_, ()>(1..=5)
      .window_count(2)
      .flat_map(|w| w.to_list())
      .subscribe(move |v| c.rc_deref_mut().push(v));
    assert_eq!(*seen.rc_deref(), vec![vec![1, 2], vec![3, 4], vec![5]]);
  }

  #[test]
  fn time_windows_rotate_on_the_clock() {
    let sched = TestScheduler::new();
    let seen = MutArc::own(Vec::new());
    let c = seen.clone();
    observable::interval::<(), _>(Duration::from_millis(10), sched.clone())
      .take(4)
      .window_time(Duration::from_millis(25), sched.clone())
      .flat_map(|w| w.to_list())
      .subscribe(move |v| c.rc_deref_mut().push(v));

    sched.advance_by(Duration::from_millis(60));
    assert_eq!(*seen.rc_deref(), vec![vec![0, 1], vec![2, 3]]);
  }
}
