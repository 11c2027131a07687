//! Single-shot sources built from plain values and callables.

use crate::{
  observable::{Observable, ObservableExt},
  observer::Observer,
  subscription::SingleSubscription,
  type_hint::TypeHint,
};

/// Emits one value, then completes.
pub fn of<Item, Err>(value: Item) -> OfObservable<Item, Err> {
  OfObservable { value, _hint: TypeHint::new() }
}

#[derive(Clone)]
pub struct OfObservable<Item, Err> {
  value: Item,
  _hint: TypeHint<Err>,
}

impl<Item, Err, O> Observable<Item, Err, O> for OfObservable<Item, Err>
where
  O: Observer<Item, Err>,
{
  type Unsub = SingleSubscription;

  fn actual_subscribe(self, mut observer: O) -> Self::Unsub {
    observer.next(self.value);
    observer.complete();
    SingleSubscription
  }
}

impl<Item, Err> ObservableExt<Item, Err> for OfObservable<Item, Err> {}

/// Emits the values given, then completes.
///
/// The error type stays free; pin it where the chain ends.
///
/// ```
/// use fluxion::{of_sequence, prelude::*};
///
/// let mut seen = Vec::new();
/// of_sequence!(1, 2, 3).subscribe_err(|v: i32| seen.push(v), |_: ()| {});
/// assert_eq!(seen, vec![1, 2, 3]);
/// ```
#[macro_export]
macro_rules! of_sequence {
  ($($item:expr),* $(,)?) => {
    $crate::observable::create(|mut emitter| {
      $($crate::observer::Observer::next(&mut emitter, $item);)*
      $crate::observer::Observer::complete(emitter);
    })
  };
}

/// Defers a computation to subscribe time; its `Result` decides between a
/// one-item stream and an error.
pub fn of_fn<F, Item, Err>(f: F) -> FnObservable<F>
where
  F: FnOnce() -> Result<Item, Err>,
{
  FnObservable { func: f }
}

#[derive(Clone)]
pub struct FnObservable<F> {
  func: F,
}

impl<Item, Err, O, F> Observable<Item, Err, O> for FnObservable<F>
where
  O: Observer<Item, Err>,
  F: FnOnce() -> Result<Item, Err>,
{
  type Unsub = SingleSubscription;

  fn actual_subscribe(self, mut observer: O) -> Self::Unsub {
    match (self.func)() {
      Ok(value) => {
        observer.next(value);
        observer.complete();
      }
      Err(err) => observer.error(err),
    }
    SingleSubscription
  }
}

impl<Item, Err, F> ObservableExt<Item, Err> for FnObservable<F> where F: FnOnce() -> Result<Item, Err>
{}

/// `Ok` emits then completes, `Err` errors.
pub fn of_result<Item, Err>(result: Result<Item, Err>) -> ResultObservable<Item, Err> {
  ResultObservable { result }
}

#[derive(Clone)]
pub struct ResultObservable<Item, Err> {
  result: Result<Item, Err>,
}

impl<Item, Err, O> Observable<Item, Err, O> for ResultObservable<Item, Err>
where
  O: Observer<Item, Err>,
{
  type Unsub = SingleSubscription;

  fn actual_subscribe(self, mut observer: O) -> Self::Unsub {
    match self.result {
      Ok(value) => {
        observer.next(value);
        observer.complete();
      }
      Err(err) => observer.error(err),
    }
    SingleSubscription
  }
}

impl<Item, Err> ObservableExt<Item, Err> for ResultObservable<Item, Err> {}

/// `Some` emits then completes, `None` completes empty.
pub fn of_option<Item, Err>(option: Option<Item>) -> OptionObservable<Item, Err> {
  OptionObservable { option, _hint: TypeHint::new() }
}

#[derive(Clone)]
pub struct OptionObservable<Item, Err> {
  option: Option<Item>,
  _hint: TypeHint<Err>,
}

impl<Item, Err, O> Observable<Item, Err, O> for OptionObservable<Item, Err>
where
  O: Observer<Item, Err>,
{
  type Unsub = SingleSubscription;

  fn actual_subscribe(self, mut observer: O) -> Self::Unsub {
    if let Some(value) = self.option {
      observer.next(value);
    }
    observer.complete();
    SingleSubscription
  }
}

impl<Item, Err> ObservableExt<Item, Err> for OptionObservable<Item, Err> {}

#[cfg(test)]
mod test {
  use crate::prelude::*;

  #[test]
  fn of_emits_once() {
    let mut seen = Vec::new();
    let mut done = false;
    observable::of::<_, ()>(42).subscribe_complete(|v| seen.push(v), || done = true);
    assert_eq!(seen, vec![42]);
    assert!(done);
  }

  #[test]
  fn of_fn_routes_failure_to_error() {
    let mut err = None;
    observable::of_fn(|| Err::<i32, _>("broken")).subscribe_err(|_| {}, |e| err = Some(e));
    assert_eq!(err, Some("broken"));
  }

  #[test]
  fn of_sequence_emits_in_order() {
    let mut seen = Vec::new();
    of_sequence!(1, 2, 3).subscribe_err(|v: i32| seen.push(v), |_: ()| {});
    assert_eq!(seen, vec![1, 2, 3]);
  }
}
