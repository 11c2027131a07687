use std::collections::VecDeque;

use crate::{
  hook,
  observable::{Observable, ObservableExt},
  observer::Observer,
  ops::box_it::{BoxIt, BoxOp},
  rc::{MutArc, RcDeref, RcDerefMut},
  subscription::{SerialSubscription, Subscription, ZipSubscription},
  type_hint::TypeHint,
};

/// All of `a`, then all of `b`. `b` is not subscribed before `a`
/// completes, and never if `a` errors.
#[derive(Clone)]
pub struct ConcatOp<S1, S2> {
  pub(crate) a: S1,
  pub(crate) b: S2,
}

impl<Item, Err, O, S1, S2> Observable<Item, Err, O> for ConcatOp<S1, S2>
where
  O: Observer<Item, Err>,
  S1: Observable<Item, Err, ConcatObserver<O, S2>>,
  S2: Observable<Item, Err, O>,
  S2::Unsub: Send + 'static,
{
  type Unsub = ZipSubscription<S1::Unsub, SerialSubscription>;

  fn actual_subscribe(self, observer: O) -> Self::Unsub {
    let tail = SerialSubscription::default();
    let unsub = self.a.actual_subscribe(ConcatObserver {
      observer,
      second: self.b,
      tail: tail.clone(),
    });
    ZipSubscription::new(unsub, tail)
  }
}

impl<Item, Err, S1, S2> ObservableExt<Item, Err> for ConcatOp<S1, S2> where
  S1: ObservableExt<Item, Err>
{
}

pub struct ConcatObserver<O, S2> {
  observer: O,
  second: S2,
  tail: SerialSubscription,
}

impl<Item, Err, O, S2> Observer<Item, Err> for ConcatObserver<O, S2>
where
  O: Observer<Item, Err>,
  S2: Observable<Item, Err, O>,
  S2::Unsub: Send + 'static,
{
  fn next(&mut self, value: Item) {
    self.observer.next(value)
  }

  fn error(self, err: Err) {
    self.observer.error(err)
  }

  fn complete(self) {
    self.tail.swap(self.second.actual_subscribe(self.observer));
  }

  fn is_finished(&self) -> bool {
    self.observer.is_finished()
  }
}

/// Flattens a stream of streams one inner at a time, in outer-arrival
/// order. `prefetch` pre-sizes the wait queue.
#[derive(Clone)]
pub struct ConcatAllOp<S, Inner> {
  pub(crate) source: S,
  pub(crate) prefetch: usize,
  pub(crate) delay_errors: bool,
  pub(crate) _hint: TypeHint<Inner>,
}

struct ConcatAllState<O, Item, Err> {
  observer: Option<O>,
  current: SerialSubscription,
  pending: VecDeque<BoxOp<Item, Err>>,
  active: bool,
  outer_done: bool,
  deferred: Vec<Err>,
  delay_errors: bool,
}

type Shared<O, Item, Err> = MutArc<ConcatAllState<O, Item, Err>>;

impl<Item, Err, O, S, Inner> Observable<Item, Err, O> for ConcatAllOp<S, Inner>
where
  O: Observer<Item, Err> + Send + 'static,
  Item: Send + 'static,
  Err: Send + 'static,
  Inner: BoxIt<Item, Err>,
  S: Observable<Inner, Err, ConcatAllObserver<O, Item, Err>>,
{
  type Unsub = ZipSubscription<S::Unsub, SerialSubscription>;

  fn actual_subscribe(self, observer: O) -> Self::Unsub {
    let current = SerialSubscription::default();
    let state = MutArc::own(ConcatAllState {
      observer: Some(observer),
      current: current.clone(),
      pending: VecDeque::with_capacity(self.prefetch),
      active: false,
      outer_done: false,
      deferred: Vec::new(),
      delay_errors: self.delay_errors,
    });
    let unsub = self.source.actual_subscribe(ConcatAllObserver { state });
    ZipSubscription::new(unsub, current)
  }
}

impl<Item, Err, S, Inner> ObservableExt<Item, Err> for ConcatAllOp<S, Inner>
where
  S: ObservableExt<Inner, Err>,
  Inner: ObservableExt<Item, Err>,
{
}

fn subscribe_inner<O, Item, Err>(state: &Shared<O, Item, Err>, inner: BoxOp<Item, Err>)
where
  O: Observer<Item, Err> + Send + 'static,
  Item: Send + 'static,
  Err: Send + 'static,
{
  let current = state.rc_deref().current.clone();
  current.swap(inner.actual_subscribe(ConcatInnerObserver { state: state.clone() }));
}

fn finish_if_drained<O, Item, Err>(state: &Shared<O, Item, Err>)
where
  O: Observer<Item, Err>,
{
  let (observer, mut deferred) = {
    let mut guard = state.rc_deref_mut();
    if !(guard.outer_done && !guard.active && guard.pending.is_empty()) {
      return;
    }
    (guard.observer.take(), std::mem::take(&mut guard.deferred))
  };
  let Some(observer) = observer else { return };
  if deferred.is_empty() {
    observer.complete();
  } else {
    let surplus = deferred.len() - 1;
    observer.error(deferred.remove(0));
    if surplus > 0 {
      hook::dropped_signal("deferred concat errors beyond the first", None);
    }
  }
}

fn deliver_error<O, Item, Err>(state: &Shared<O, Item, Err>, err: Err)
where
  O: Observer<Item, Err>,
{
  let (observer, current) = {
    let mut guard = state.rc_deref_mut();
    guard.pending.clear();
    (guard.observer.take(), guard.current.clone())
  };
  match observer {
    Some(observer) => {
      observer.error(err);
      current.unsubscribe();
    }
    None => hook::dropped_signal("concat error after terminal", None),
  }
}

fn inner_retired<O, Item, Err>(state: &Shared<O, Item, Err>)
where
  O: Observer<Item, Err> + Send + 'static,
  Item: Send + 'static,
  Err: Send + 'static,
{
  let promoted = {
    let mut guard = state.rc_deref_mut();
    match guard.pending.pop_front() {
      Some(inner) => Some(inner),
      None => {
        guard.active = false;
        None
      }
    }
  };
  match promoted {
    Some(inner) => subscribe_inner(state, inner),
    None => finish_if_drained(state),
  }
}

pub struct ConcatAllObserver<O, Item, Err> {
  state: Shared<O, Item, Err>,
}

impl<Inner, Item, Err, O> Observer<Inner, Err> for ConcatAllObserver<O, Item, Err>
where
  O: Observer<Item, Err> + Send + 'static,
  Item: Send + 'static,
  Err: Send + 'static,
  Inner: BoxIt<Item, Err>,
{
  fn next(&mut self, inner: Inner) {
    let boxed = inner.box_it();
    let start_boxed = {
      let mut guard = self.state.rc_deref_mut();
      if guard.observer.is_none() {
        return;
      }
      if guard.active {
        guard.pending.push_back(boxed);
        None
      } else {
        guard.active = true;
        Some(boxed)
      }
    };
    if let Some(boxed) = start_boxed {
      subscribe_inner(&self.state, boxed);
    }
  }

  fn error(self, err: Err) {
    let parked = {
      let mut guard = self.state.rc_deref_mut();
      guard.outer_done = true;
      if guard.delay_errors {
        guard.deferred.push(err);
        None
      } else {
        Some(err)
      }
    };
    match parked {
      None => finish_if_drained(&self.state),
      Some(err) => deliver_error(&self.state, err),
    }
  }

  fn complete(self) {
    self.state.rc_deref_mut().outer_done = true;
    finish_if_drained(&self.state);
  }

  fn is_finished(&self) -> bool {
    self.state.rc_deref().observer.as_ref().map_or(true, |o| o.is_finished())
  }
}

pub struct ConcatInnerObserver<O, Item, Err> {
  state: Shared<O, Item, Err>,
}

impl<Item, Err, O> Observer<Item, Err> for ConcatInnerObserver<O, Item, Err>
where
  O: Observer<Item, Err> + Send + 'static,
  Item: Send + 'static,
  Err: Send + 'static,
{
  fn next(&mut self, value: Item) {
    if let Some(observer) = self.state.rc_deref_mut().observer.as_mut() {
      observer.next(value)
    }
  }

  fn error(self, err: Err) {
    let parked = {
      let mut guard = self.state.rc_deref_mut();
      if guard.delay_errors {
        guard.deferred.push(err);
        None
      } else {
        Some(err)
      }
    };
    match parked {
      None => inner_retired(&self.state),
      Some(err) => deliver_error(&self.state, err),
    }
  }

  fn complete(self) {
    inner_retired(&self.state);
  }

  fn is_finished(&self) -> bool {
    self.state.rc_deref().observer.as_ref().map_or(true, |o| o.is_finished())
  }
}

#[cfg(test)]
mod test {
  use crate::prelude::*;

  #[test]
  fn binary_concat_keeps_order() {
    let mut seen = Vec::new();
    let mut done = false;
    observable::from_iter::<_, ()>([1, 2])
      .concat(observable::from_iter([3, 4]))
      .subscribe_complete(|v| seen.push(v), || done = true);
    assert_eq!(seen, vec![1, 2, 3, 4]);
    assert!(done);
  }

  #[test]
  fn error_in_head_skips_the_tail() {
    let subscribed = MutArc::own(false);
    let c = subscribed.clone();
    let mut errs = 0;
    observable::throw::<i32, &str>("halt")
      .concat(observable::defer(move || {
        *c.rc_deref_mut() = true;
        observable::of(1)
      }))
      .subscribe_err(|_| {}, |_| errs += 1);
    assert_eq!(errs, 1);
    assert!(!*subscribed.rc_deref());
  }

  #[test]
  fn concat_map_serializes_inners() {
    let gate = Subject::<i32, ()>::new();
    let seen = MutArc::own(Vec::new());
    let c = seen.clone();
    let g = gate.clone();
    observable::from_iter::<_, ()>([0, 1])
      .concat_map(move |i| if i == 0 { g.clone().box_it() } else { observable::of(99).box_it() })
      .subscribe(move |v| c.rc_deref_mut().push(v));

    // the second inner (99) waits for the gate to complete
    let mut live = gate.clone();
    live.next(5);
    assert_eq!(*seen.rc_deref(), vec![5]);
    gate.clone().complete();
    assert_eq!(*seen.rc_deref(), vec![5, 99]);
  }
}
