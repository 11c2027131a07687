use crate::{
  error::MissingElementError,
  observable::{Observable, ObservableExt},
  observer::Observer,
};

/// First item then complete; an empty stream is an error.
#[derive(Clone)]
pub struct FirstOp<S> {
  pub(crate) source: S,
}

impl<Item, Err, O, S> Observable<Item, Err, O> for FirstOp<S>
where
  O: Observer<Item, Err>,
  S: Observable<Item, Err, FirstObserver<O>>,
  Err: From<MissingElementError>,
{
  type Unsub = S::Unsub;

  fn actual_subscribe(self, observer: O) -> Self::Unsub {
    self.source.actual_subscribe(FirstObserver { observer: Some(observer) })
  }
}

impl<Item, Err, S> ObservableExt<Item, Err> for FirstOp<S> where S: ObservableExt<Item, Err> {}

pub struct FirstObserver<O> {
  observer: Option<O>,
}

impl<Item, Err, O> Observer<Item, Err> for FirstObserver<O>
where
  O: Observer<Item, Err>,
  Err: From<MissingElementError>,
{
  fn next(&mut self, value: Item) {
    if let Some(mut observer) = self.observer.take() {
      observer.next(value);
      observer.complete();
    }
  }

  fn error(mut self, err: Err) {
    if let Some(observer) = self.observer.take() {
      observer.error(err);
    }
  }

  fn complete(mut self) {
    if let Some(observer) = self.observer.take() {
      observer.error(Err::from(MissingElementError));
    }
  }

  fn is_finished(&self) -> bool {
    self.observer.as_ref().map_or(true, |o| o.is_finished())
  }
}

/// First item then complete; an empty stream emits `default`.
#[derive(Clone)]
pub struct FirstOrOp<S, Item> {
  pub(crate) source: S,
  pub(crate) default: Item,
}

impl<Item, Err, O, S> Observable<Item, Err, O> for FirstOrOp<S, Item>
where
  O: Observer<Item, Err>,
  S: Observable<Item, Err, FirstOrObserver<O, Item>>,
{
  type Unsub = S::Unsub;

  fn actual_subscribe(self, observer: O) -> Self::Unsub {
    self
      .source
      .actual_subscribe(FirstOrObserver { observer: Some(observer), default: Some(self.default) })
  }
}

impl<Item, Err, S> ObservableExt<Item, Err> for FirstOrOp<S, Item> where S: ObservableExt<Item, Err>
{}

pub struct FirstOrObserver<O, Item> {
  observer: Option<O>,
  default: Option<Item>,
}

impl<Item, Err, O> Observer<Item, Err> for FirstOrObserver<O, Item>
where
  O: Observer<Item, Err>,
{
  fn next(&mut self, value: Item) {
    if let Some(mut observer) = self.observer.take() {
      observer.next(value);
      observer.complete();
    }
  }

  fn error(mut self, err: Err) {
    if let Some(observer) = self.observer.take() {
      observer.error(err);
    }
  }

  fn complete(mut self) {
    if let (Some(mut observer), Some(default)) = (self.observer.take(), self.default.take()) {
      observer.next(default);
      observer.complete();
    }
  }

  fn is_finished(&self) -> bool {
    self.observer.as_ref().map_or(true, |o| o.is_finished())
  }
}

/// Last item then complete; an empty stream is an error.
#[derive(Clone)]
pub struct LastOp<S> {
  pub(crate) source: S,
}

impl<Item, Err, O, S> Observable<Item, Err, O> for LastOp<S>
where
  O: Observer<Item, Err>,
  S: Observable<Item, Err, LastObserver<O, Item>>,
  Err: From<MissingElementError>,
{
  type Unsub = S::Unsub;

  fn actual_subscribe(self, observer: O) -> Self::Unsub {
    self.source.actual_subscribe(LastObserver { observer, latest: None })
  }
}

impl<Item, Err, S> ObservableExt<Item, Err> for LastOp<S> where S: ObservableExt<Item, Err> {}

pub struct LastObserver<O, Item> {
  observer: O,
  latest: Option<Item>,
}

impl<Item, Err, O> Observer<Item, Err> for LastObserver<O, Item>
where
  O: Observer<Item, Err>,
  Err: From<MissingElementError>,
{
  fn next(&mut self, value: Item) {
    self.latest = Some(value);
  }

  fn error(self, err: Err) {
    self.observer.error(err)
  }

  fn complete(mut self) {
    match self.latest.take() {
      Some(value) => {
        self.observer.next(value);
        self.observer.complete();
      }
      None => self.observer.error(Err::from(MissingElementError)),
    }
  }

  fn is_finished(&self) -> bool {
    self.observer.is_finished()
  }
}

/// Last item then complete; an empty stream emits `default`.
#[derive(Clone)]
pub struct LastOrOp<S, Item> {
  pub(crate) source: S,
  pub(crate) default: Item,
}

impl<Item, Err, O, S> Observable<Item, Err, O> for LastOrOp<S, Item>
where
  O: Observer<Item, Err>,
  S: Observable<Item, Err, LastOrObserver<O, Item>>,
{
  type Unsub = S::Unsub;

  fn actual_subscribe(self, observer: O) -> Self::Unsub {
    self.source.actual_subscribe(LastOrObserver { observer, latest: Some(self.default) })
  }
}

impl<Item, Err, S> ObservableExt<Item, Err> for LastOrOp<S, Item> where S: ObservableExt<Item, Err> {}

pub struct LastOrObserver<O, Item> {
  observer: O,
  latest: Option<Item>,
}

impl<Item, Err, O> Observer<Item, Err> for LastOrObserver<O, Item>
where
  O: Observer<Item, Err>,
{
  fn next(&mut self, value: Item) {
    self.latest = Some(value);
  }

  fn error(self, err: Err) {
    self.observer.error(err)
  }

  fn complete(mut self) {
    if let Some(value) = self.latest.take() {
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
  fn first_takes_one() {
    let mut seen = Vec::new();
    observable::from_iter::<_, MissingElementError>(5..10).first().subscribe(|v| seen.push(v));
    assert_eq!(seen, vec![5]);
  }

  #[test]
  fn first_on_empty_errors() {
    let mut err = None;
    observable::empty::<i32, MissingElementError>()
      .first()
      .subscribe_err(|_| {}, |e| err = Some(e));
    assert_eq!(err, Some(MissingElementError));
  }

  #[test]
  fn first_or_falls_back() {
    let mut seen = Vec::new();
    observable::empty::<i32, ()>().first_or(9).subscribe(|v| seen.push(v));
    assert_eq!(seen, vec![9]);
  }

  #[test]
  fn last_waits_for_completion() {
    let mut seen = Vec::new();
    observable::from_iter::<_, MissingElementError>(0..4).last().subscribe(|v| seen.push(v));
    assert_eq!(seen, vec![3]);
  }

  #[test]
  fn last_or_falls_back() {
    let mut seen = Vec::new();
    observable::empty::<i32, ()>().last_or(1).subscribe(|v| seen.push(v));
    assert_eq!(seen, vec![1]);
  }
}
