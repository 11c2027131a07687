use crate::{
  observable::{Observable, ObservableExt},
  observer::Observer,
};

/// Emits the given values before anything from the source.
#[derive(Clone)]
pub struct StartWithOp<S, Item> {
  pub(crate) source: S,
  pub(crate) values: Vec<Item>,
}

impl<Item, Err, O, S> Observable<Item, Err, O> for StartWithOp<S, Item>
where
  O: Observer<Item, Err>,
  S: Observable<Item, Err, O>,
{
  type Unsub = S::Unsub;

  fn actual_subscribe(self, mut observer: O) -> Self::Unsub {
    for value in self.values {
      observer.next(value);
    }
    self.source.actual_subscribe(observer)
  }
}

impl<Item, Err, S> ObservableExt<Item, Err> for StartWithOp<S, Item> where S: ObservableExt<Item, Err>
{}

/// Emits the given values after the source completes; an error skips them.
#[derive(Clone)]
pub struct EndWithOp<S, Item> {
  pub(crate) source: S,
  pub(crate) values: Vec<Item>,
}

impl<Item, Err, O, S> Observable<Item, Err, O> for EndWithOp<S, Item>
where
  O: Observer<Item, Err>,
  S: Observable<Item, Err, EndWithObserver<O, Item>>,
{
  type Unsub = S::Unsub;

  fn actual_subscribe(self, observer: O) -> Self::Unsub {
    self.source.actual_subscribe(EndWithObserver { observer, values: self.values })
  }
}

impl<Item, Err, S> ObservableExt<Item, Err> for EndWithOp<S, Item> where S: ObservableExt<Item, Err> {}

pub struct EndWithObserver<O, Item> {
  observer: O,
  values: Vec<Item>,
}

impl<Item, Err, O> Observer<Item, Err> for EndWithObserver<O, Item>
where
  O: Observer<Item, Err>,
{
  fn next(&mut self, value: Item) {
    self.observer.next(value)
  }

  fn error(self, err: Err) {
    self.observer.error(err)
  }

  fn complete(mut self) {
    for value in self.values.drain(..) {
      self.observer.next(value);
    }
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
  fn start_with_prepends() {
    let mut seen = Vec::new();
    observable::from_iter::<_, ()>([3, 4]).start_with(vec![1, 2]).subscribe(|v| seen.push(v));
    assert_eq!(seen, vec![1, 2, 3, 4]);
  }

  #[test]
  fn end_with_appends_on_complete() {
    let mut seen = Vec::new();
    observable::from_iter::<_, ()>([1]).end_with(vec![2, 3]).subscribe(|v| seen.push(v));
    assert_eq!(seen, vec![1, 2, 3]);
  }

  #[test]
  fn end_with_skipped_on_error() {
    let mut seen = Vec::new();
    observable::throw::<i32, &str>("x").end_with(vec![9]).subscribe_err(|v| seen.push(v), |_| {});
    assert!(seen.is_empty());
  }
}
