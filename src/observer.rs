//! The consumer half of the subscribe handshake.

use crate::{
  rc::{MutArc, RcDeref, RcDerefMut},
  subscription::SharedSubscription,
};

/// A consumer of stream notifications.
///
/// A producer calls `next` zero or more times and then at most one of
/// `error` / `complete`. The terminal callbacks take the observer by value:
/// once a terminal went out there is no observer left to misuse, which is
/// how the "nothing after terminal" rule is enforced at compile time.
///
/// `on_subscribe` hands the consumer the cancellation handle of its
/// subscription. The public subscribe entry points invoke it exactly once,
/// before the producer starts; observers that do not care inherit the
/// default and ignore it.
///
/// Producers emitting from a loop consult `is_finished` between items so a
/// cancelled or terminated consumer stops the iteration.
pub trait Observer<Item, Err> {
  fn on_subscribe(&mut self, handle: SharedSubscription) {
    let _ = handle;
  }

  fn next(&mut self, value: Item);

  fn error(self, err: Err);

  fn complete(self);

  fn is_finished(&self) -> bool;
}

/// A reified notification: the unit of `materialize` / `dematerialize` and
/// of the internal hand-off queues.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Notification<Item, Err> {
  Next(Item),
  Error(Err),
  Complete,
}

/// Shared observer slot.
///
/// Concurrent operators park the downstream observer in a
/// `MutArc<Option<_>>` so several producer-side halves can reach it; the
/// slot is an observer itself, and a terminal takes the inner observer out,
/// making every later delivery through any clone a no-op.
impl<Item, Err, O> Observer<Item, Err> for MutArc<Option<O>>
where
  O: Observer<Item, Err>,
{
  fn next(&mut self, value: Item) {
    if let Some(observer) = self.rc_deref_mut().as_mut() {
      observer.next(value)
    }
  }

  fn error(self, err: Err) {
    let taken = self.rc_deref_mut().take();
    if let Some(observer) = taken {
      observer.error(err)
    }
  }

  fn complete(self) {
    let taken = self.rc_deref_mut().take();
    if let Some(observer) = taken {
      observer.complete()
    }
  }

  fn is_finished(&self) -> bool {
    self.rc_deref().as_ref().map_or(true, |o| o.is_finished())
  }
}

trait ObserverObj<Item, Err>: Send {
  fn obj_on_subscribe(&mut self, handle: SharedSubscription);
  fn obj_next(&mut self, value: Item);
  fn obj_error(&mut self, err: Err);
  fn obj_complete(&mut self);
  fn obj_is_finished(&self) -> bool;
}

struct ObserverCell<O>(Option<O>);

impl<Item, Err, O> ObserverObj<Item, Err> for ObserverCell<O>
where
  O: Observer<Item, Err> + Send,
{
  fn obj_on_subscribe(&mut self, handle: SharedSubscription) {
    if let Some(observer) = self.0.as_mut() {
      observer.on_subscribe(handle)
    }
  }

  fn obj_next(&mut self, value: Item) {
    if let Some(observer) = self.0.as_mut() {
      observer.next(value)
    }
  }

  fn obj_error(&mut self, err: Err) {
    if let Some(observer) = self.0.take() {
      observer.error(err)
    }
  }

  fn obj_complete(&mut self) {
    if let Some(observer) = self.0.take() {
      observer.complete()
    }
  }

  fn obj_is_finished(&self) -> bool {
    self.0.as_ref().map_or(true, |o| o.is_finished())
  }
}

/// Type-erased observer, for operators that store observers of varying
/// concrete types (subjects, redo drivers, boxed sources).
pub struct BoxObserver<Item, Err>(Box<dyn ObserverObj<Item, Err>>);

impl<Item, Err> BoxObserver<Item, Err> {
  pub fn new<O>(observer: O) -> Self
  where
    O: Observer<Item, Err> + Send + 'static,
  {
    BoxObserver(Box::new(ObserverCell(Some(observer))))
  }
}

impl<Item, Err> Observer<Item, Err> for BoxObserver<Item, Err> {
  fn on_subscribe(&mut self, handle: SharedSubscription) {
    self.0.obj_on_subscribe(handle)
  }

  fn next(&mut self, value: Item) {
    self.0.obj_next(value)
  }

  fn error(mut self, err: Err) {
    self.0.obj_error(err)
  }

  fn complete(mut self) {
    self.0.obj_complete()
  }

  fn is_finished(&self) -> bool {
    self.0.obj_is_finished()
  }
}

#[cfg(test)]
mod test {
  use super::*;
  use crate::rc::MutArc;

  struct Collect {
    seen: Vec<i32>,
    done: bool,
  }

  impl Observer<i32, ()> for MutArc<Collect> {
    fn next(&mut self, value: i32) {
      self.rc_deref_mut().seen.push(value);
    }

    fn error(self, _: ()) {}

    fn complete(self) {
      self.rc_deref_mut().done = true;
    }

    fn is_finished(&self) -> bool {
      self.rc_deref().done
    }
  }

  #[test]
  fn shared_slot_drops_after_terminal() {
    let collect = MutArc::own(Collect { seen: vec![], done: false });
    let mut slot = MutArc::own(Some(collect.clone()));
    slot.next(1);
    slot.clone().complete();
    slot.next(2);
    assert_eq!(collect.rc_deref().seen, vec![1]);
    assert!(slot.is_finished());
  }
}
