use std::collections::VecDeque;

use crate::{
  hook,
  observable::{Observable, ObservableExt},
  observer::Observer,
  rc::{MutArc, RcDeref, RcDerefMut},
  subscription::{SharedSubscription, ZipSubscription},
};

/// Pairs the n-th item of `a` with the n-th item of `b`. Completes as soon
/// as one side is exhausted: done (or failed, under `delay_errors`) with
/// nothing buffered. Errors cut through immediately unless `delay_errors`
/// parks them; a failed side's buffered items still pair before the
/// deferred error goes out.
#[derive(Clone)]
pub struct ZipOp<S1, S2> {
  pub(crate) a: S1,
  pub(crate) b: S2,
  pub(crate) buffer_size: usize,
  pub(crate) delay_errors: bool,
}

struct ZipState<O, A, B, Err> {
  observer: Option<O>,
  left: VecDeque<A>,
  right: VecDeque<B>,
  left_done: bool,
  right_done: bool,
  deferred: Vec<Err>,
  delay_errors: bool,
}

type Shared<O, A, B, Err> = MutArc<ZipState<O, A, B, Err>>;

impl<A, B, Err, O, S1, S2> Observable<(A, B), Err, O> for ZipOp<S1, S2>
where
  O: Observer<(A, B), Err>,
  S1: Observable<A, Err, ZipLeftObserver<O, A, B, Err>>,
  S2: Observable<B, Err, ZipRightObserver<O, A, B, Err>>,
{
  type Unsub = ZipSubscription<S1::Unsub, S2::Unsub>;

  fn actual_subscribe(self, observer: O) -> Self::Unsub {
    let state = MutArc::own(ZipState {
      observer: Some(observer),
      left: VecDeque::with_capacity(self.buffer_size.min(32)),
      right: VecDeque::with_capacity(self.buffer_size.min(32)),
      left_done: false,
      right_done: false,
      deferred: Vec::new(),
      delay_errors: self.delay_errors,
    });
    let ua = self.a.actual_subscribe(ZipLeftObserver { state: state.clone() });
    let ub = self.b.actual_subscribe(ZipRightObserver { state });
    ZipSubscription::new(ua, ub)
  }
}

impl<A, B, Err, S1, S2> ObservableExt<(A, B), Err> for ZipOp<S1, S2>
where
  S1: ObservableExt<A, Err>,
  S2: ObservableExt<B, Err>,
{
}

fn drain_pairs<O, A, B, Err>(state: &Shared<O, A, B, Err>)
where
  O: Observer<(A, B), Err>,
{
  let finished = {
    let mut guard = state.rc_deref_mut();
    while !guard.left.is_empty() && !guard.right.is_empty() {
      let pair = (guard.left.pop_front(), guard.right.pop_front());
      if let ((Some(a), Some(b)), Some(observer)) = (pair, guard.observer.as_mut()) {
        observer.next((a, b));
      }
    }
    let left_exhausted = guard.left_done && guard.left.is_empty();
    let right_exhausted = guard.right_done && guard.right.is_empty();
    if left_exhausted || right_exhausted {
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
        hook::dropped_signal("deferred zip errors beyond the first", None);
      }
    }
  }
}

macro_rules! zip_side_observer {
  ($name:ident, $item:ident, $queue:ident, $done:ident) => {
    pub struct $name<O, A, B, Err> {
      state: Shared<O, A, B, Err>,
    }

    impl<A, B, Err, O> Observer<$item, Err> for $name<O, A, B, Err>
    where
      O: Observer<(A, B), Err>,
    {
      fn next(&mut self, value: $item) {
        {
          let mut guard = self.state.rc_deref_mut();
          if guard.observer.is_none() {
            return;
          }
          guard.$queue.push_back(value);
        }
        drain_pairs(&self.state);
      }

      fn error(self, err: Err) {
        let parked = {
          let mut guard = self.state.rc_deref_mut();
          if guard.delay_errors {
            // the failed side is done, but its buffer still pairs
            guard.deferred.push(err);
            guard.$done = true;
            None
          } else {
            Some(err)
          }
        };
        match parked {
          None => drain_pairs(&self.state),
          Some(err) => {
            let taken = self.state.rc_deref_mut().observer.take();
            if let Some(observer) = taken {
              observer.error(err)
            }
          }
        }
      }

      fn complete(self) {
        self.state.rc_deref_mut().$done = true;
        drain_pairs(&self.state);
      }

      fn is_finished(&self) -> bool {
        self.state.rc_deref().observer.as_ref().map_or(true, |o| o.is_finished())
      }
    }
  };
}

zip_side_observer!(ZipLeftObserver, A, left, left_done);
zip_side_observer!(ZipRightObserver, B, right, right_done);

/// Rank-by-rank zip over a homogeneous set of sources, emitting the n-th
/// items together as a `Vec` in source order.
pub struct ZipAllOp<S> {
  pub(crate) sources: Vec<S>,
  pub(crate) delay_errors: bool,
}

struct ZipAllState<O, Item, Err> {
  observer: Option<O>,
  queues: Vec<VecDeque<Item>>,
  done: Vec<bool>,
  deferred: Vec<Err>,
  delay_errors: bool,
}

impl<Item, Err, O, S> Observable<Vec<Item>, Err, O> for ZipAllOp<S>
where
  O: Observer<Vec<Item>, Err>,
  S: Observable<Item, Err, ZipAllObserver<O, Item, Err>>,
  S::Unsub: Send + 'static,
{
  type Unsub = SharedSubscription;

  fn actual_subscribe(self, observer: O) -> Self::Unsub {
    let rank = self.sources.len();
    if rank == 0 {
      observer.complete();
      return SharedSubscription::default();
    }
    let state = MutArc::own(ZipAllState {
      observer: Some(observer),
      queues: (0..rank).map(|_| VecDeque::new()).collect(),
      done: vec![false; rank],
      deferred: Vec::new(),
      delay_errors: self.delay_errors,
    });
    let subscription = SharedSubscription::default();
    for (index, source) in self.sources.into_iter().enumerate() {
      subscription.add(source.actual_subscribe(ZipAllObserver { state: state.clone(), index }));
    }
    subscription
  }
}

impl<Item, Err, S> ObservableExt<Vec<Item>, Err> for ZipAllOp<S> where S: ObservableExt<Item, Err> {}

fn drain_ranks<O, Item, Err>(state: &MutArc<ZipAllState<O, Item, Err>>)
where
  O: Observer<Vec<Item>, Err>,
{
  let finished = {
    let mut guard = state.rc_deref_mut();
    while guard.queues.iter().all(|q| !q.is_empty()) {
      let rank: Vec<Item> = guard.queues.iter_mut().filter_map(|q| q.pop_front()).collect();
      if let Some(observer) = guard.observer.as_mut() {
        observer.next(rank);
      }
    }
    let exhausted =
      guard.done.iter().zip(guard.queues.iter()).any(|(done, q)| *done && q.is_empty());
    if exhausted {
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
        hook::dropped_signal("deferred zip errors beyond the first", None);
      }
    }
  }
}

pub struct ZipAllObserver<O, Item, Err> {
  state: MutArc<ZipAllState<O, Item, Err>>,
  index: usize,
}

impl<Item, Err, O> Observer<Item, Err> for ZipAllObserver<O, Item, Err>
where
  O: Observer<Vec<Item>, Err>,
{
  fn next(&mut self, value: Item) {
    {
      let mut guard = self.state.rc_deref_mut();
      if guard.observer.is_none() {
        return;
      }
      let index = self.index;
      guard.queues[index].push_back(value);
    }
    drain_ranks(&self.state);
  }

  fn error(self, err: Err) {
    let parked = {
      let mut guard = self.state.rc_deref_mut();
      if guard.delay_errors {
        guard.deferred.push(err);
        let index = self.index;
        guard.done[index] = true;
        None
      } else {
        Some(err)
      }
    };
    match parked {
      None => drain_ranks(&self.state),
      Some(err) => {
        let taken = self.state.rc_deref_mut().observer.take();
        if let Some(observer) = taken {
          observer.error(err)
        }
      }
    }
  }

  fn complete(self) {
    {
      let mut guard = self.state.rc_deref_mut();
      let index = self.index;
      guard.done[index] = true;
    }
    drain_ranks(&self.state);
  }

  fn is_finished(&self) -> bool {
    self.state.rc_deref().observer.as_ref().map_or(true, |o| o.is_finished())
  }
}

#[cfg(test)]
mod test {
  use crate::prelude::*;

  #[test]
  fn pairs_rank_by_rank() {
    let mut seen = Vec::new();
    let mut done = false;
    observable::from_iter::<_, ()>([1, 2, 3])
      .zip(observable::from_iter(["a", "b"]))
      .subscribe_complete(|v| seen.push(v), || done = true);
    assert_eq!(seen, vec![(1, "a"), (2, "b")]);
    assert!(done);
  }

  #[test]
  fn interleaved_subjects_zip_in_order() {
    let mut left = Subject::<i32, ()>::new();
    let mut right = Subject::<i32, ()>::new();
    let seen = MutArc::own(Vec::new());
    let c = seen.clone();
    left.clone().zip(right.clone()).subscribe(move |v| c.rc_deref_mut().push(v));

    left.next(1);
    left.next(2);
    right.next(10);
    right.next(20);
    assert_eq!(*seen.rc_deref(), vec![(1, 10), (2, 20)]);
  }

  #[test]
  fn fail_fast_error_drops_buffered_items() {
    let mut left = Subject::<i32, &str>::new();
    let right = Subject::<i32, &str>::new();
    let seen = MutArc::own(Vec::new());
    let errs = MutArc::own(Vec::new());
    let (cs, ce) = (seen.clone(), errs.clone());
    left
      .clone()
      .zip(right.clone())
      .subscribe_err(move |v| cs.rc_deref_mut().push(v), move |e| ce.rc_deref_mut().push(e));

    left.next(1);
    right.clone().error("snap");
    assert!(seen.rc_deref().is_empty());
    assert_eq!(*errs.rc_deref(), vec!["snap"]);
  }

  #[test]
  fn delayed_error_pairs_the_backlog_first() {
    let mut left = Subject::<i32, &str>::new();
    let mut right = Subject::<i32, &str>::new();
    let seen = MutArc::own(Vec::new());
    let errs = MutArc::own(Vec::new());
    let (cs, ce) = (seen.clone(), errs.clone());
    left
      .clone()
      .zip_delay_err(right.clone())
      .subscribe_err(move |v| cs.rc_deref_mut().push(v), move |e| ce.rc_deref_mut().push(e));

    left.next(1);
    left.next(2);
    left.clone().error("late");
    // the failed side's buffer keeps pairing with the survivor
    assert!(errs.rc_deref().is_empty());
    right.next(10);
    right.next(20);
    assert_eq!(*seen.rc_deref(), vec![(1, 10), (2, 20)]);
    assert_eq!(*errs.rc_deref(), vec!["late"]);
  }

  #[test]
  fn zip_all_emits_vectors() {
    let mut seen = Vec::new();
    observable::from_iter::<_, ()>([1, 2])
      .zip_all([observable::from_iter([10, 20]), observable::from_iter([100, 200])])
      .subscribe(|v| seen.push(v));
    assert_eq!(seen, vec![vec![1, 10, 100], vec![2, 20, 200]]);
  }

  #[test]
  fn zip_all_delayed_error_surfaces_at_the_end() {
    let mut a = Subject::<i32, &str>::new();
    let b = Subject::<i32, &str>::new();
    let seen = MutArc::own(Vec::new());
    let errs = MutArc::own(Vec::new());
    let (cs, ce) = (seen.clone(), errs.clone());
    a.clone()
      .zip_all_delay_err([b.clone()])
      .subscribe_err(move |v| cs.rc_deref_mut().push(v), move |e| ce.rc_deref_mut().push(e));

    a.next(1);
    b.clone().error("done for");
    // the failed source has nothing buffered, so the terminal is immediate
    assert!(seen.rc_deref().is_empty());
    assert_eq!(*errs.rc_deref(), vec!["done for"]);
  }
}
