use std::collections::VecDeque;

use crate::{
  observable::{Observable, ObservableExt},
  observer::Observer,
};

/// Passes the first `count` items through, then completes and discards the
/// rest of the upstream.
#[derive(Clone)]
pub struct TakeOp<S> {
  pub(crate) source: S,
  pub(crate) count: usize,
}

impl<Item, Err, O, S> Observable<Item, Err, O> for TakeOp<S>
where
  O: Observer<Item, Err>,
  S: Observable<Item, Err, TakeObserver<O>>,
{
  type Unsub = S::Unsub;

  fn actual_subscribe(self, observer: O) -> Self::Unsub {
    let observer = if self.count == 0 {
      // complete right away; the upstream is subscribed already finished,
      // so its registration at the boundary tears it straight down
      observer.complete();
      TakeObserver { observer: None, remaining: 0 }
    } else {
      TakeObserver { observer: Some(observer), remaining: self.count }
    };
    self.source.actual_subscribe(observer)
  }
}

impl<Item, Err, S> ObservableExt<Item, Err> for TakeOp<S> where S: ObservableExt<Item, Err> {}

pub struct TakeObserver<O> {
  observer: Option<O>,
  remaining: usize,
}

impl<Item, Err, O> Observer<Item, Err> for TakeObserver<O>
where
  O: Observer<Item, Err>,
{
  fn next(&mut self, value: Item) {
    if self.remaining == 0 {
      return;
    }
    if let Some(observer) = self.observer.as_mut() {
      observer.next(value);
    }
    self.remaining -= 1;
    if self.remaining == 0 {
      if let Some(observer) = self.observer.take() {
        observer.complete();
      }
    }
  }

  fn error(mut self, err: Err) {
    if let Some(observer) = self.observer.take() {
      observer.error(err);
    }
  }

  fn complete(mut self) {
    if let Some(observer) = self.observer.take() {
      observer.complete();
    }
  }

  fn is_finished(&self) -> bool {
    self.observer.as_ref().map_or(true, |o| o.is_finished())
  }
}

/// Buffers the tail of the stream and emits the last `count` items at
/// completion.
#[derive(Clone)]
pub struct TakeLastOp<S> {
  pub(crate) source: S,
  pub(crate) count: usize,
}

impl<Item, Err, O, S> Observable<Item, Err, O> for TakeLastOp<S>
where
  O: Observer<Item, Err>,
  S: Observable<Item, Err, TakeLastObserver<O, Item>>,
{
  type Unsub = S::Unsub;

  fn actual_subscribe(self, observer: O) -> Self::Unsub {
    self.source.actual_subscribe(TakeLastObserver {
      observer,
      count: self.count,
      tail: VecDeque::new(),
    })
  }
}

impl<Item, Err, S> ObservableExt<Item, Err> for TakeLastOp<S> where S: ObservableExt<Item, Err> {}

pub struct TakeLastObserver<O, Item> {
  observer: O,
  count: usize,
  tail: VecDeque<Item>,
}

impl<Item, Err, O> Observer<Item, Err> for TakeLastObserver<O, Item>
where
  O: Observer<Item, Err>,
{
  fn next(&mut self, value: Item) {
    if self.count == 0 {
      return;
    }
    if self.tail.len() == self.count {
      self.tail.pop_front();
    }
    self.tail.push_back(value);
  }

  fn error(self, err: Err) {
    self.observer.error(err)
  }

  fn complete(mut self) {
    for value in self.tail.drain(..) {
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
  fn take_truncates_and_completes() {
    let mut seen = Vec::new();
    let mut done = false;
    observable::from_iter::<_, ()>(0..100)
      .take(3)
      .subscribe_complete(|v| seen.push(v), || done = true);
    assert_eq!(seen, vec![0, 1, 2]);
    assert!(done);
  }

  #[test]
  fn take_zero_completes_empty() {
    let mut seen = Vec::new();
    let mut done = false;
    observable::from_iter::<_, ()>(0..3)
      .take(0)
      .subscribe_complete(|v| seen.push(v), || done = true);
    assert!(seen.is_empty());
    assert!(done);
  }

  #[test]
  fn take_more_than_available() {
    let mut seen = Vec::new();
    observable::from_iter::<_, ()>(0..2).take(10).subscribe(|v| seen.push(v));
    assert_eq!(seen, vec![0, 1]);
  }

  #[test]
  fn take_last_keeps_the_tail() {
    let mut seen = Vec::new();
    observable::from_iter::<_, ()>(0..6).take_last(2).subscribe(|v| seen.push(v));
    assert_eq!(seen, vec![4, 5]);
  }
}
