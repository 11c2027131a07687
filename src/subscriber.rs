//! The boundary between a composed stream and user callbacks.
//!
//! Every public subscribe call wraps the outermost observer in a
//! [`Subscriber`], which ties deliveries to the subscription handle: a
//! closed handle gates everything off, a terminal closes the handle so the
//! upstream chain tears down, and signals that arrive with nobody left to
//! receive them are routed to the dropped-error hook.

use crate::{
  hook,
  observer::Observer,
  subscription::{SharedSubscription, Subscription},
};

pub struct Subscriber<O> {
  observer: Option<O>,
  handle: SharedSubscription,
}

impl<O> Subscriber<O> {
  pub fn new(observer: O, handle: SharedSubscription) -> Self {
    Subscriber { observer: Some(observer), handle }
  }
}

impl<Item, Err, O> Observer<Item, Err> for Subscriber<O>
where
  O: Observer<Item, Err>,
{
  fn next(&mut self, value: Item) {
    if self.handle.is_closed() {
      return;
    }
    if let Some(observer) = self.observer.as_mut() {
      if !observer.is_finished() {
        observer.next(value);
      }
    }
  }

  fn error(mut self, err: Err) {
    let cancelled = self.handle.is_closed();
    match self.observer.take() {
      Some(observer) if !cancelled && !observer.is_finished() => observer.error(err),
      _ => hook::dropped_signal("error after terminal or cancel", None),
    }
    self.handle.unsubscribe();
  }

  fn complete(mut self) {
    let cancelled = self.handle.is_closed();
    if let Some(observer) = self.observer.take() {
      if !cancelled && !observer.is_finished() {
        observer.complete();
      }
    }
    self.handle.unsubscribe();
  }

  fn is_finished(&self) -> bool {
    self.handle.is_closed() || self.observer.as_ref().map_or(true, |o| o.is_finished())
  }
}

/// Observer over a bare `next` closure. An error reaching it is a bug in
/// the caller's composition; it is reported to the hook rather than lost.
pub struct NextObserver<N>(pub(crate) N);

impl<Item, Err, N> Observer<Item, Err> for NextObserver<N>
where
  N: FnMut(Item),
{
  fn next(&mut self, value: Item) {
    (self.0)(value)
  }

  fn error(self, _err: Err) {
    hook::dropped_signal("unhandled stream error", None);
  }

  fn complete(self) {}

  fn is_finished(&self) -> bool {
    false
  }
}

/// Observer over `next` + `error` closures.
pub struct ErrObserver<N, E> {
  pub(crate) next: N,
  pub(crate) error: E,
}

impl<Item, Err, N, E> Observer<Item, Err> for ErrObserver<N, E>
where
  N: FnMut(Item),
  E: FnOnce(Err),
{
  fn next(&mut self, value: Item) {
    (self.next)(value)
  }

  fn error(self, err: Err) {
    (self.error)(err)
  }

  fn complete(self) {}

  fn is_finished(&self) -> bool {
    false
  }
}

/// Observer over `next` + `complete` closures.
pub struct CompleteObserver<N, C> {
  pub(crate) next: N,
  pub(crate) complete: C,
}

impl<Item, Err, N, C> Observer<Item, Err> for CompleteObserver<N, C>
where
  N: FnMut(Item),
  C: FnOnce(),
{
  fn next(&mut self, value: Item) {
    (self.next)(value)
  }

  fn error(self, _err: Err) {
    hook::dropped_signal("unhandled stream error", None);
  }

  fn complete(self) {
    (self.complete)()
  }

  fn is_finished(&self) -> bool {
    false
  }
}

/// Observer over the full callback triple.
pub struct AllObserver<N, E, C> {
  pub(crate) next: N,
  pub(crate) error: E,
  pub(crate) complete: C,
}

impl<Item, Err, N, E, C> Observer<Item, Err> for AllObserver<N, E, C>
where
  N: FnMut(Item),
  E: FnOnce(Err),
  C: FnOnce(),
{
  fn next(&mut self, value: Item) {
    (self.next)(value)
  }

  fn error(self, err: Err) {
    (self.error)(err)
  }

  fn complete(self) {
    (self.complete)()
  }

  fn is_finished(&self) -> bool {
    false
  }
}
