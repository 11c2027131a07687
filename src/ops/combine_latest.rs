use crate::{
  hook,
  observable::{Observable, ObservableExt},
  observer::Observer,
  rc::{MutArc, RcDeref, RcDerefMut},
  subscription::{SharedSubscription, ZipSubscription},
  type_hint::TypeHint,
};

/// On every emission from either side, combines the freshest value of both
/// sides, once both have produced one. One side completing is absorbed;
/// the result completes when both are done. An error cuts through at once
/// unless `delay_errors` parks it, in which case the failed side is
/// absorbed like a completion and the error surfaces once both sides are
/// done.
#[derive(Clone)]
pub struct CombineLatestOp<S1, S2, F, A, B> {
  pub(crate) a: S1,
  pub(crate) b: S2,
  pub(crate) combiner: F,
  pub(crate) delay_errors: bool,
  pub(crate) _hint: TypeHint<(A, B)>,
}

struct CombineState<O, A, B, F, Err> {
  observer: Option<O>,
  latest_left: Option<A>,
  latest_right: Option<B>,
  live: usize,
  combiner: F,
  deferred: Vec<Err>,
  delay_errors: bool,
}

type Shared<O, A, B, F, Err> = MutArc<CombineState<O, A, B, F, Err>>;

// a side finished (completed, or failed under delay_errors); the last one
// out delivers the terminal, deferred errors first
fn side_retired<O, A, B, F, Err, Out>(state: &Shared<O, A, B, F, Err>)
where
  O: Observer<Out, Err>,
{
  let finished = {
    let mut guard = state.rc_deref_mut();
    guard.live -= 1;
    if guard.live == 0 {
      guard.observer.take().map(|observer| (observer, std::mem::take(&mut guard.deferred)))
    } else {
      None
    }
  };
  if let Some((observer, mut deferred)) = finished {
    if deferred.is_empty() {
      observer.complete();
    } else {
      let surplus = deferred.len() - 1;
      observer.error(deferred.remove(0));
      if surplus > 0 {
        hook::dropped_signal("deferred combine errors beyond the first", None);
      }
    }
  }
}

impl<A, B, Out, Err, O, S1, S2, F> Observable<Out, Err, O> for CombineLatestOp<S1, S2, F, A, B>
where
  O: Observer<Out, Err>,
  S1: Observable<A, Err, CombineLeftObserver<O, A, B, F, Err>>,
  S2: Observable<B, Err, CombineRightObserver<O, A, B, F, Err>>,
  A: Clone,
  B: Clone,
  F: FnMut(A, B) -> Out,
{
  type Unsub = ZipSubscription<S1::Unsub, S2::Unsub>;

  fn actual_subscribe(self, observer: O) -> Self::Unsub {
    let state = MutArc::own(CombineState {
      observer: Some(observer),
      latest_left: None,
      latest_right: None,
      live: 2,
      combiner: self.combiner,
      deferred: Vec::new(),
      delay_errors: self.delay_errors,
    });
    let ua = self.a.actual_subscribe(CombineLeftObserver { state: state.clone() });
    let ub = self.b.actual_subscribe(CombineRightObserver { state });
    ZipSubscription::new(ua, ub)
  }
}

impl<A, B, Out, Err, S1, S2, F> ObservableExt<Out, Err> for CombineLatestOp<S1, S2, F, A, B>
where
  S1: ObservableExt<A, Err>,
  S2: ObservableExt<B, Err>,
  F: FnMut(A, B) -> Out,
{
}

macro_rules! combine_side_observer {
  ($name:ident, $item:ident, $slot:ident) => {
    pub struct $name<O, A, B, F, Err> {
      state: Shared<O, A, B, F, Err>,
    }

    impl<A, B, Out, Err, O, F> Observer<$item, Err> for $name<O, A, B, F, Err>
    where
      O: Observer<Out, Err>,
      A: Clone,
      B: Clone,
      F: FnMut(A, B) -> Out,
    {
      fn next(&mut self, value: $item) {
        let mut guard = self.state.rc_deref_mut();
        guard.$slot = Some(value);
        if let (Some(a), Some(b)) = (guard.latest_left.clone(), guard.latest_right.clone()) {
          let out = (guard.combiner)(a, b);
          if let Some(observer) = guard.observer.as_mut() {
            observer.next(out);
          }
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
          None => side_retired(&self.state),
          Some(err) => {
            let taken = self.state.rc_deref_mut().observer.take();
            if let Some(observer) = taken {
              observer.error(err)
            }
          }
        }
      }

      fn complete(self) {
        side_retired(&self.state);
      }

      fn is_finished(&self) -> bool {
        self.state.rc_deref().observer.as_ref().map_or(true, |o| o.is_finished())
      }
    }
  };
}

combine_side_observer!(CombineLeftObserver, A, latest_left);
combine_side_observer!(CombineRightObserver, B, latest_right);

/// Latest-value combination over a homogeneous set of sources, emitting a
/// `Vec` in source order whenever any source fires and all have a value.
pub struct CombineLatestAllOp<S> {
  pub(crate) sources: Vec<S>,
  pub(crate) delay_errors: bool,
}

struct CombineAllState<O, Item, Err> {
  observer: Option<O>,
  latest: Vec<Option<Item>>,
  live: usize,
  deferred: Vec<Err>,
  delay_errors: bool,
}

fn all_side_retired<O, Item, Err>(state: &MutArc<CombineAllState<O, Item, Err>>)
where
  O: Observer<Vec<Item>, Err>,
{
  let finished = {
    let mut guard = state.rc_deref_mut();
    guard.live -= 1;
    if guard.live == 0 {
      guard.observer.take().map(|observer| (observer, std::mem::take(&mut guard.deferred)))
    } else {
      None
    }
  };
  if let Some((observer, mut deferred)) = finished {
    if deferred.is_empty() {
      observer.complete();
    } else {
      let surplus = deferred.len() - 1;
      observer.error(deferred.remove(0));
      if surplus > 0 {
        hook::dropped_signal("deferred combine errors beyond the first", None);
      }
    }
  }
}

impl<Item, Err, O, S> Observable<Vec<Item>, Err, O> for CombineLatestAllOp<S>
where
  O: Observer<Vec<Item>, Err>,
  Item: Clone,
  S: Observable<Item, Err, CombineAllObserver<O, Item, Err>>,
  S::Unsub: Send + 'static,
{
  type Unsub = SharedSubscription;

  fn actual_subscribe(self, observer: O) -> Self::Unsub {
    let rank = self.sources.len();
    if rank == 0 {
      observer.complete();
      return SharedSubscription::default();
    }
    let state = MutArc::own(CombineAllState {
      observer: Some(observer),
      latest: vec![None; rank],
      live: rank,
      deferred: Vec::new(),
      delay_errors: self.delay_errors,
    });
    let subscription = SharedSubscription::default();
    for (index, source) in self.sources.into_iter().enumerate() {
      subscription
        .add(source.actual_subscribe(CombineAllObserver { state: state.clone(), index }));
    }
    subscription
  }
}

impl<Item, Err, S> ObservableExt<Vec<Item>, Err> for CombineLatestAllOp<S> where
  S: ObservableExt<Item, Err>
{
}

pub struct CombineAllObserver<O, Item, Err> {
  state: MutArc<CombineAllState<O, Item, Err>>,
  index: usize,
}

impl<Item, Err, O> Observer<Item, Err> for CombineAllObserver<O, Item, Err>
where
  O: Observer<Vec<Item>, Err>,
  Item: Clone,
{
  fn next(&mut self, value: Item) {
    let mut guard = self.state.rc_deref_mut();
    let index = self.index;
    guard.latest[index] = Some(value);
    if guard.latest.iter().all(|v| v.is_some()) {
      let snapshot: Vec<Item> = guard.latest.iter().filter_map(|v| v.clone()).collect();
      if let Some(observer) = guard.observer.as_mut() {
        observer.next(snapshot);
      }
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
      None => all_side_retired(&self.state),
      Some(err) => {
        let taken = self.state.rc_deref_mut().observer.take();
        if let Some(observer) = taken {
          observer.error(err)
        }
      }
    }
  }

  fn complete(self) {
    all_side_retired(&self.state);
  }

  fn is_finished(&self) -> bool {
    self.state.rc_deref().observer.as_ref().map_or(true, |o| o.is_finished())
  }
}

#[cfg(test)]
mod test {
  use crate::prelude::*;

  #[test]
  fn combines_once_both_sides_fired() {
    let mut left = Subject::<i32, ()>::new();
    let mut right = Subject::<i32, ()>::new();
    let seen = MutArc::own(Vec::new());
    let c = seen.clone();
    left
      .clone()
      .combine_latest(right.clone(), |a, b| (a, b))
      .subscribe(move |v| c.rc_deref_mut().push(v));

    left.next(1);
    assert!(seen.rc_deref().is_empty());
    right.next(10);
    left.next(2);
    assert_eq!(*seen.rc_deref(), vec![(1, 10), (2, 10)]);
  }

  #[test]
  fn one_side_completing_is_absorbed() {
    let mut left = Subject::<i32, ()>::new();
    let mut right = Subject::<i32, ()>::new();
    let seen = MutArc::own(Vec::new());
    let done = MutArc::own(false);
    let (cs, cd) = (seen.clone(), done.clone());
    left
      .clone()
      .combine_latest(right.clone(), |a, b| a + b)
      .subscribe_complete(move |v| cs.rc_deref_mut().push(v), move || *cd.rc_deref_mut() = true);

    left.next(1);
    left.clone().complete();
    right.next(10);
    right.next(20);
    assert_eq!(*seen.rc_deref(), vec![11, 21]);
    assert!(!*done.rc_deref());
    right.clone().complete();
    assert!(*done.rc_deref());
  }

  #[test]
  fn fail_fast_error_preempts() {
    let left = Subject::<i32, &str>::new();
    let mut right = Subject::<i32, &str>::new();
    let errs = MutArc::own(Vec::new());
    let ce = errs.clone();
    left
      .clone()
      .combine_latest(right.clone(), |a, b| a + b)
      .subscribe_err(|_| {}, move |e| ce.rc_deref_mut().push(e));

    left.clone().error("cut");
    right.next(1);
    assert_eq!(*errs.rc_deref(), vec!["cut"]);
  }

  #[test]
  fn delayed_error_lets_the_survivor_finish() {
    let mut left = Subject::<i32, &str>::new();
    let mut right = Subject::<i32, &str>::new();
    let seen = MutArc::own(Vec::new());
    let errs = MutArc::own(Vec::new());
    let (cs, ce) = (seen.clone(), errs.clone());
    left
      .clone()
      .combine_latest_delay_err(right.clone(), |a, b| a + b)
      .subscribe_err(move |v| cs.rc_deref_mut().push(v), move |e| ce.rc_deref_mut().push(e));

    left.next(1);
    right.next(10);
    left.clone().error("parked");
    // the failed side is absorbed like a completion; its latest still
    // combines with the survivor
    right.next(20);
    assert!(errs.rc_deref().is_empty());
    right.clone().complete();
    assert_eq!(*seen.rc_deref(), vec![11, 21]);
    assert_eq!(*errs.rc_deref(), vec!["parked"]);
  }

  #[test]
  fn combine_all_emits_snapshots() {
    let mut a = Subject::<i32, ()>::new();
    let mut b = Subject::<i32, ()>::new();
    let seen = MutArc::own(Vec::new());
    let c = seen.clone();
    a.clone().combine_latest_all([b.clone()]).subscribe(move |v| c.rc_deref_mut().push(v));

    a.next(1);
    b.next(2);
    a.next(3);
    assert_eq!(*seen.rc_deref(), vec![vec![1, 2], vec![3, 2]]);
  }

  #[test]
  fn combine_all_delayed_error_waits_for_the_rest() {
    let mut a = Subject::<i32, &str>::new();
    let mut b = Subject::<i32, &str>::new();
    let seen = MutArc::own(Vec::new());
    let errs = MutArc::own(Vec::new());
    let (cs, ce) = (seen.clone(), errs.clone());
    a.clone()
      .combine_latest_all_delay_err([b.clone()])
      .subscribe_err(move |v| cs.rc_deref_mut().push(v), move |e| ce.rc_deref_mut().push(e));

    a.next(1);
    a.clone().error("held");
    b.next(2);
    assert_eq!(*seen.rc_deref(), vec![vec![1, 2]]);
    assert!(errs.rc_deref().is_empty());
    b.clone().complete();
    assert_eq!(*errs.rc_deref(), vec!["held"]);
  }
}
