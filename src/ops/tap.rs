use crate::{
  observable::{Observable, ObservableExt},
  observer::Observer,
};

/// Side effect on every item.
#[derive(Clone)]
pub struct TapOp<S, F> {
  pub(crate) source: S,
  pub(crate) func: F,
}

impl<Item, Err, O, S, F> Observable<Item, Err, O> for TapOp<S, F>
where
  O: Observer<Item, Err>,
  S: Observable<Item, Err, TapObserver<O, F>>,
  F: FnMut(&Item),
{
  type Unsub = S::Unsub;

  fn actual_subscribe(self, observer: O) -> Self::Unsub {
    self.source.actual_subscribe(TapObserver { observer, func: self.func })
  }
}

impl<Item, Err, S, F> ObservableExt<Item, Err> for TapOp<S, F> where S: ObservableExt<Item, Err> {}

pub struct TapObserver<O, F> {
  observer: O,
  func: F,
}

impl<Item, Err, O, F> Observer<Item, Err> for TapObserver<O, F>
where
  O: Observer<Item, Err>,
  F: FnMut(&Item),
{
  fn next(&mut self, value: Item) {
    (self.func)(&value);
    self.observer.next(value)
  }

  fn error(self, err: Err) {
    self.observer.error(err)
  }

  fn complete(self) {
    self.observer.complete()
  }

  fn is_finished(&self) -> bool {
    self.observer.is_finished()
  }
}

/// Side effect on the error terminal.
#[derive(Clone)]
pub struct TapErrOp<S, F> {
  pub(crate) source: S,
  pub(crate) func: F,
}

impl<Item, Err, O, S, F> Observable<Item, Err, O> for TapErrOp<S, F>
where
  O: Observer<Item, Err>,
  S: Observable<Item, Err, TapErrObserver<O, F>>,
  F: FnOnce(&Err),
{
  type Unsub = S::Unsub;

  fn actual_subscribe(self, observer: O) -> Self::Unsub {
    self.source.actual_subscribe(TapErrObserver { observer, func: self.func })
  }
}

impl<Item, Err, S, F> ObservableExt<Item, Err> for TapErrOp<S, F> where S: ObservableExt<Item, Err> {}

pub struct TapErrObserver<O, F> {
  observer: O,
  func: F,
}

impl<Item, Err, O, F> Observer<Item, Err> for TapErrObserver<O, F>
where
  O: Observer<Item, Err>,
  F: FnOnce(&Err),
{
  fn next(&mut self, value: Item) {
    self.observer.next(value)
  }

  fn error(self, err: Err) {
    (self.func)(&err);
    self.observer.error(err)
  }

  fn complete(self) {
    self.observer.complete()
  }

  fn is_finished(&self) -> bool {
    self.observer.is_finished()
  }
}

/// Side effect on the completion terminal.
#[derive(Clone)]
pub struct TapCompleteOp<S, F> {
  pub(crate) source: S,
  pub(crate) func: F,
}

impl<Item, Err, O, S, F> Observable<Item, Err, O> for TapCompleteOp<S, F>
where
  O: Observer<Item, Err>,
  S: Observable<Item, Err, TapCompleteObserver<O, F>>,
  F: FnOnce(),
{
  type Unsub = S::Unsub;

  fn actual_subscribe(self, observer: O) -> Self::Unsub {
    self.source.actual_subscribe(TapCompleteObserver { observer, func: self.func })
  }
}

impl<Item, Err, S, F> ObservableExt<Item, Err> for TapCompleteOp<S, F> where
  S: ObservableExt<Item, Err>
{
}

pub struct TapCompleteObserver<O, F> {
  observer: O,
  func: F,
}

impl<Item, Err, O, F> Observer<Item, Err> for TapCompleteObserver<O, F>
where
  O: Observer<Item, Err>,
  F: FnOnce(),
{
  fn next(&mut self, value: Item) {
    self.observer.next(value)
  }

  fn error(self, err: Err) {
    self.observer.error(err)
  }

  fn complete(self) {
    (self.func)();
    self.observer.complete()
  }

  fn is_finished(&self) -> bool {
    self.observer.is_finished()
  }
}

#[cfg(test)]
mod test {
  use crate::prelude::*;

  #[test]
  fn taps_see_items_before_downstream() {
    let mut log = Vec::new();
    let mut seen = Vec::new();
    observable::from_iter::<_, ()>(1..=2).tap(|v| log.push(*v)).subscribe(|v| seen.push(v));
    assert_eq!(log, seen);
  }

  #[test]
  fn error_tap_fires_once() {
    let mut tapped = None;
    observable::throw::<i32, &str>("err")
      .tap_error(|e| tapped = Some(*e))
      .subscribe_err(|_| {}, |_| {});
    assert_eq!(tapped, Some("err"));
  }
}
