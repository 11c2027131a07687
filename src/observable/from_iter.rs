//! Streams over anything iterable.

use crate::{
  observable::{Observable, ObservableExt},
  observer::Observer,
  subscription::SingleSubscription,
  type_hint::TypeHint,
};

/// Emits every element of `iter` in order, then completes. The consumer's
/// `is_finished` is consulted between elements, so cancelling or
/// terminating mid-iteration stops the loop.
pub fn from_iter<I, Err>(iter: I) -> FromIterObservable<I, Err>
where
  I: IntoIterator,
{
  FromIterObservable { iter, _hint: TypeHint::new() }
}

/// `count` integers starting at `start`.
pub fn range<Err>(start: i64, count: usize) -> FromIterObservable<std::ops::Range<i64>, Err> {
  from_iter(start..start + count as i64)
}

#[derive(Clone)]
pub struct FromIterObservable<I, Err> {
  iter: I,
  _hint: TypeHint<Err>,
}

impl<Item, Err, O, I> Observable<Item, Err, O> for FromIterObservable<I, Err>
where
  I: IntoIterator<Item = Item>,
  O: Observer<Item, Err>,
{
  type Unsub = SingleSubscription;

  fn actual_subscribe(self, mut observer: O) -> Self::Unsub {
    for value in self.iter {
      if observer.is_finished() {
        return SingleSubscription;
      }
      observer.next(value);
    }
    observer.complete();
    SingleSubscription
  }
}

impl<Item, Err, I> ObservableExt<Item, Err> for FromIterObservable<I, Err> where
  I: IntoIterator<Item = Item>
{
}

#[cfg(test)]
mod test {
  use crate::prelude::*;

  #[test]
  fn emits_all_then_completes() {
    let mut seen = Vec::new();
    let mut done = false;
    observable::from_iter::<_, ()>([1, 2, 3]).subscribe_complete(|v| seen.push(v), || done = true);
    assert_eq!(seen, vec![1, 2, 3]);
    assert!(done);
  }

  #[test]
  fn range_counts_from_start() {
    let mut seen = Vec::new();
    observable::range::<()>(5, 3).subscribe(|v| seen.push(v));
    assert_eq!(seen, vec![5, 6, 7]);
  }

  #[test]
  fn take_stops_the_iteration() {
    // an endless iterator only works if `take` severs the loop
    let mut seen = Vec::new();
    observable::from_iter::<_, ()>(0..).take(4).subscribe(|v| seen.push(v));
    assert_eq!(seen, vec![0, 1, 2, 3]);
  }
}
