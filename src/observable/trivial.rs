//! The degenerate sources: complete at once, never signal, fail at once.

use crate::{
  observable::{Observable, ObservableExt},
  observer::Observer,
  subscription::SingleSubscription,
  type_hint::TypeHint,
};

/// Completes immediately without emitting.
pub fn empty<Item, Err>() -> EmptyObservable<Item, Err> {
  EmptyObservable { _hint: TypeHint::new() }
}

#[derive(Clone)]
pub struct EmptyObservable<Item, Err> {
  _hint: TypeHint<(Item, Err)>,
}

impl<Item, Err, O> Observable<Item, Err, O> for EmptyObservable<Item, Err>
where
  O: Observer<Item, Err>,
{
  type Unsub = SingleSubscription;

  fn actual_subscribe(self, observer: O) -> Self::Unsub {
    observer.complete();
    SingleSubscription
  }
}

impl<Item, Err> ObservableExt<Item, Err> for EmptyObservable<Item, Err> {}

/// Emits nothing and never terminates.
pub fn never<Item, Err>() -> NeverObservable<Item, Err> {
  NeverObservable { _hint: TypeHint::new() }
}

#[derive(Clone)]
pub struct NeverObservable<Item, Err> {
  _hint: TypeHint<(Item, Err)>,
}

impl<Item, Err, O> Observable<Item, Err, O> for NeverObservable<Item, Err>
where
  O: Observer<Item, Err>,
{
  type Unsub = SingleSubscription;

  fn actual_subscribe(self, observer: O) -> Self::Unsub {
    drop(observer);
    SingleSubscription
  }
}

impl<Item, Err> ObservableExt<Item, Err> for NeverObservable<Item, Err> {}

/// Errors immediately with the given value.
pub fn throw<Item, Err>(err: Err) -> ThrowObservable<Item, Err> {
  ThrowObservable { err, _hint: TypeHint::new() }
}

#[derive(Clone)]
pub struct ThrowObservable<Item, Err> {
  err: Err,
  _hint: TypeHint<Item>,
}

impl<Item, Err, O> Observable<Item, Err, O> for ThrowObservable<Item, Err>
where
  O: Observer<Item, Err>,
{
  type Unsub = SingleSubscription;

  fn actual_subscribe(self, observer: O) -> Self::Unsub {
    observer.error(self.err);
    SingleSubscription
  }
}

impl<Item, Err> ObservableExt<Item, Err> for ThrowObservable<Item, Err> {}

#[cfg(test)]
mod test {
  use super::*;
  use crate::prelude::*;

  #[test]
  fn empty_only_completes() {
    let mut done = false;
    let mut count = 0;
    empty::<i32, ()>().subscribe_complete(|_| count += 1, || done = true);
    assert!(done);
    assert_eq!(count, 0);
  }

  #[test]
  fn throw_delivers_error() {
    let mut err = None;
    throw::<i32, _>("oops").subscribe_err(|_| {}, |e| err = Some(e));
    assert_eq!(err, Some("oops"));
  }
}
