use crate::{
  observable::{Observable, ObservableExt},
  observer::{Notification, Observer},
  type_hint::TypeHint,
};

/// Reifies every signal into a [`Notification`] item; the result stream
/// never errors and completes right after a reified terminal.
#[derive(Clone)]
pub struct MaterializeOp<S> {
  pub(crate) source: S,
}

impl<Item, Err, O, S> Observable<Notification<Item, Err>, Err, O> for MaterializeOp<S>
where
  O: Observer<Notification<Item, Err>, Err>,
  S: Observable<Item, Err, MaterializeObserver<O>>,
{
  type Unsub = S::Unsub;

  fn actual_subscribe(self, observer: O) -> Self::Unsub {
    self.source.actual_subscribe(MaterializeObserver { observer })
  }
}

impl<Item, Err, S> ObservableExt<Notification<Item, Err>, Err> for MaterializeOp<S> where
  S: ObservableExt<Item, Err>
{
}

pub struct MaterializeObserver<O> {
  observer: O,
}

impl<Item, Err, O> Observer<Item, Err> for MaterializeObserver<O>
where
  O: Observer<Notification<Item, Err>, Err>,
{
  fn next(&mut self, value: Item) {
    self.observer.next(Notification::Next(value))
  }

  fn error(mut self, err: Err) {
    self.observer.next(Notification::Error(err));
    self.observer.complete()
  }

  fn complete(mut self) {
    self.observer.next(Notification::Complete);
    self.observer.complete()
  }

  fn is_finished(&self) -> bool {
    self.observer.is_finished()
  }
}

/// Inverse of [`MaterializeOp`]: replays reified notifications as real
/// signals.
#[derive(Clone)]
pub struct DematerializeOp<S, B> {
  pub(crate) source: S,
  pub(crate) _hint: TypeHint<B>,
}

impl<B, Err, O, S> Observable<B, Err, O> for DematerializeOp<S, B>
where
  O: Observer<B, Err>,
  S: Observable<Notification<B, Err>, Err, DematerializeObserver<O>>,
{
  type Unsub = S::Unsub;

  fn actual_subscribe(self, observer: O) -> Self::Unsub {
    self.source.actual_subscribe(DematerializeObserver { observer: Some(observer) })
  }
}

impl<B, Err, S> ObservableExt<B, Err> for DematerializeOp<S, B> where
  S: ObservableExt<Notification<B, Err>, Err>
{
}

pub struct DematerializeObserver<O> {
  observer: Option<O>,
}

impl<B, Err, O> Observer<Notification<B, Err>, Err> for DematerializeObserver<O>
where
  O: Observer<B, Err>,
{
  fn next(&mut self, value: Notification<B, Err>) {
    match value {
      Notification::Next(v) => {
        if let Some(observer) = self.observer.as_mut() {
          observer.next(v)
        }
      }
      Notification::Error(e) => {
        if let Some(observer) = self.observer.take() {
          observer.error(e)
        }
      }
      Notification::Complete => {
        if let Some(observer) = self.observer.take() {
          observer.complete()
        }
      }
    }
  }

  fn error(mut self, err: Err) {
    if let Some(observer) = self.observer.take() {
      observer.error(err)
    }
  }

  fn complete(mut self) {
    if let Some(observer) = self.observer.take() {
      observer.complete()
    }
  }

  fn is_finished(&self) -> bool {
    self.observer.as_ref().map_or(true, |o| o.is_finished())
  }
}

#[cfg(test)]
mod test {
  use crate::prelude::*;

  #[test]
  fn materialize_reifies_terminal() {
    let mut seen = Vec::new();
    observable::from_iter::<_, ()>([1]).materialize().subscribe(|n| seen.push(n));
    assert_eq!(seen, vec![Notification::Next(1), Notification::Complete]);
  }

  #[test]
  fn round_trip_restores_the_stream() {
    let mut seen = Vec::new();
    let mut done = false;
    observable::from_iter::<_, ()>(1..=3)
      .materialize()
      .dematerialize()
      .subscribe_complete(|v| seen.push(v), || done = true);
    assert_eq!(seen, vec![1, 2, 3]);
    assert!(done);
  }

  #[test]
  fn materialized_error_becomes_an_item() {
    let mut seen = Vec::new();
    observable::throw::<i32, &str>("bad").materialize().subscribe(|n| seen.push(n));
    assert_eq!(seen, vec![Notification::Error("bad"), Notification::Complete]);
  }
}
