use std::collections::VecDeque;

use crate::{
  hook,
  observable::{Observable, ObservableExt},
  observer::Observer,
  ops::box_it::{BoxIt, BoxOp},
  rc::{MutArc, RcDeref, RcDerefMut},
  subscription::{SharedSubscription, Subscription, ZipSubscription},
  type_hint::TypeHint,
};

/// Flattens a stream of streams, keeping at most `concurrent` inner
/// subscriptions live; inners beyond that wait in arrival order. With
/// `delay_errors`, failed branches are parked until every branch finished.
#[derive(Clone)]
pub struct MergeAllOp<S, Inner> {
  pub(crate) source: S,
  pub(crate) concurrent: usize,
  pub(crate) delay_errors: bool,
  pub(crate) _hint: TypeHint<Inner>,
}

struct MergeAllState<O, Item, Err> {
  observer: Option<O>,
  inners: SharedSubscription,
  pending: VecDeque<BoxOp<Item, Err>>,
  active: usize,
  concurrent: usize,
  outer_done: bool,
  deferred: Vec<Err>,
  delay_errors: bool,
}

type Shared<O, Item, Err> = MutArc<MergeAllState<O, Item, Err>>;

impl<Item, Err, O, S, Inner> Observable<Item, Err, O> for MergeAllOp<S, Inner>
where
  O: Observer<Item, Err> + Send + 'static,
  Item: Send + 'static,
  Err: Send + 'static,
  Inner: BoxIt<Item, Err>,
  S: Observable<Inner, Err, MergeAllOuterObserver<O, Item, Err>>,
{
  type Unsub = ZipSubscription<S::Unsub, SharedSubscription>;

  fn actual_subscribe(self, observer: O) -> Self::Unsub {
    let inners = SharedSubscription::default();
    let state = MutArc::own(MergeAllState {
      observer: Some(observer),
      inners: inners.clone(),
      pending: VecDeque::new(),
      active: 0,
      concurrent: self.concurrent.max(1),
      outer_done: false,
      deferred: Vec::new(),
      delay_errors: self.delay_errors,
    });
    let unsub = self.source.actual_subscribe(MergeAllOuterObserver { state });
    ZipSubscription::new(unsub, inners)
  }
}

impl<Item, Err, S, Inner> ObservableExt<Item, Err> for MergeAllOp<S, Inner>
where
  S: ObservableExt<Inner, Err>,
  Inner: ObservableExt<Item, Err>,
{
}

// must run without the state lock held: a synchronous inner emits before
// this returns
fn subscribe_inner<O, Item, Err>(state: &Shared<O, Item, Err>, inner: BoxOp<Item, Err>)
where
  O: Observer<Item, Err> + Send + 'static,
  Item: Send + 'static,
  Err: Send + 'static,
{
  let inners = state.rc_deref().inners.clone();
  let unsub = inner.actual_subscribe(MergeAllInnerObserver { state: state.clone() });
  inners.add(unsub);
}

// a branch retired: promote a queued inner or finish the operator
fn branch_retired<O, Item, Err>(state: &Shared<O, Item, Err>)
where
  O: Observer<Item, Err> + Send + 'static,
  Item: Send + 'static,
  Err: Send + 'static,
{
  let promoted = {
    let mut guard = state.rc_deref_mut();
    guard.active -= 1;
    let promoted = guard.pending.pop_front();
    if promoted.is_some() {
      guard.active += 1;
    }
    promoted
  };
  match promoted {
    Some(inner) => subscribe_inner(state, inner),
    None => finish_if_drained(state),
  }
}

fn finish_if_drained<O, Item, Err>(state: &Shared<O, Item, Err>)
where
  O: Observer<Item, Err>,
{
  let (observer, mut deferred) = {
    let mut guard = state.rc_deref_mut();
    if !(guard.outer_done && guard.active == 0 && guard.pending.is_empty()) {
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
      hook::dropped_signal("deferred merge errors beyond the first", None);
    }
  }
}

fn deliver_error<O, Item, Err>(state: &Shared<O, Item, Err>, err: Err)
where
  O: Observer<Item, Err>,
{
  let (observer, inners) = {
    let mut guard = state.rc_deref_mut();
    (guard.observer.take(), guard.inners.clone())
  };
  match observer {
    Some(observer) => {
      observer.error(err);
      // cut the remaining branches loose
      inners.unsubscribe();
    }
    None => hook::dropped_signal("merge error after terminal", None),
  }
}

pub struct MergeAllOuterObserver<O, Item, Err> {
  state: Shared<O, Item, Err>,
}

impl<Inner, Item, Err, O> Observer<Inner, Err> for MergeAllOuterObserver<O, Item, Err>
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
      if guard.active < guard.concurrent {
        guard.active += 1;
        Some(boxed)
      } else {
        guard.pending.push_back(boxed);
        None
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

pub struct MergeAllInnerObserver<O, Item, Err> {
  state: Shared<O, Item, Err>,
}

impl<Item, Err, O> Observer<Item, Err> for MergeAllInnerObserver<O, Item, Err>
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
      None => branch_retired(&self.state),
      Some(err) => deliver_error(&self.state, err),
    }
  }

  fn complete(self) {
    branch_retired(&self.state);
  }

  fn is_finished(&self) -> bool {
    self.state.rc_deref().observer.as_ref().map_or(true, |o| o.is_finished())
  }
}

#[cfg(test)]
mod test {
  use crate::prelude::*;

  #[test]
  fn flattens_in_arrival_order_for_sync_inners() {
    let seen = MutArc::own(Vec::new());
    let c = seen.clone();
    observable::from_iter::<_, ()>(0..3)
      .flat_map(|v| observable::from_iter([v * 10, v * 10 + 1]))
      .subscribe(move |v| c.rc_deref_mut().push(v));
    assert_eq!(*seen.rc_deref(), vec![0, 1, 10, 11, 20, 21]);
  }

  #[test]
  fn concurrency_cap_queues_inners() {
    let first = Subject::<i32, ()>::new();
    let second = Subject::<i32, ()>::new();
    let seen = MutArc::own(Vec::new());
    let c = seen.clone();
    let (f, s) = (first.clone(), second.clone());
    observable::from_iter::<_, ()>([0, 1])
      .flat_map_with(move |i| if i == 0 { f.clone() } else { s.clone() }, 1, false)
      .subscribe(move |v| c.rc_deref_mut().push(v));

    // the second subject is queued, so its emission goes nowhere yet
    let mut fst = first.clone();
    let mut snd = second.clone();
    fst.next(1);
    snd.next(100);
    first.clone().complete();
    snd.next(101);
    second.clone().complete();
    assert_eq!(*seen.rc_deref(), vec![1, 101]);
  }

  #[test]
  fn fail_fast_cancels_siblings() {
    let mut one = Subject::<i32, &str>::new();
    let two = Subject::<i32, &str>::new();
    let errs = MutArc::own(0);
    let c = errs.clone();
    let (o, t) = (one.clone(), two.clone());
    observable::from_iter::<_, &str>([0, 1])
      .flat_map(move |i| if i == 0 { o.clone() } else { t.clone() })
      .subscribe_err(|_| {}, move |_| *c.rc_deref_mut() += 1);

    two.clone().error("x");
    one.next(5);
    assert_eq!(*errs.rc_deref(), 1);
  }

  #[test]
  fn delayed_error_waits_for_all_branches() {
    let one = Subject::<i32, &str>::new();
    let two = Subject::<i32, &str>::new();
    let seen = MutArc::own(Vec::new());
    let errs = MutArc::own(Vec::new());
    let (cs, ce) = (seen.clone(), errs.clone());
    let (o, t) = (one.clone(), two.clone());
    observable::from_iter::<_, &str>([0, 1])
      .flat_map_with(move |i| if i == 0 { o.clone() } else { t.clone() }, usize::MAX, true)
      .subscribe_err(move |v| cs.rc_deref_mut().push(v), move |e| ce.rc_deref_mut().push(e));

    one.clone().error("late");
    let mut snd = two.clone();
    snd.next(9);
    two.clone().complete();
    assert_eq!(*seen.rc_deref(), vec![9]);
    assert_eq!(*errs.rc_deref(), vec!["late"]);
  }
}
