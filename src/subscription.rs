//! Cancellation handles.
//!
//! Every subscribe call yields a [`Subscription`]: a token that stops the
//! emissions and releases whatever the producer holds (scheduled tasks,
//! inner subscriptions, resources). Operators compose the primitives in
//! this module to express their teardown story.

use smallvec::SmallVec;

use crate::rc::{CellArc, MutArc, RcDeref, RcDerefMut, SharedCell};

/// A handle that cancels the work backing one subscribe call.
///
/// `unsubscribe` consumes the handle; cloneable handles (those backed by a
/// shared cell) stay idempotent across clones.
pub trait Subscription {
  fn unsubscribe(self);
  fn is_closed(&self) -> bool;
}

/// The inert subscription of a source that finished while subscribing.
#[derive(Clone, Copy, Default)]
pub struct SingleSubscription;

impl Subscription for SingleSubscription {
  fn unsubscribe(self) {}

  fn is_closed(&self) -> bool {
    true
  }
}

/// Runs a teardown callback the first time it is unsubscribed.
pub struct TeardownSubscription<F>(Option<F>);

impl<F: FnOnce()> TeardownSubscription<F> {
  pub fn new(f: F) -> Self {
    TeardownSubscription(Some(f))
  }
}

impl<F: FnOnce()> Subscription for TeardownSubscription<F> {
  fn unsubscribe(self) {
    if let Some(f) = self.0 {
      f()
    }
  }

  fn is_closed(&self) -> bool {
    self.0.is_none()
  }
}

trait SubscriptionObj: Send {
  fn obj_unsubscribe(&mut self);
  fn obj_is_closed(&self) -> bool;
}

struct ObjCell<S>(Option<S>);

impl<S: Subscription + Send> SubscriptionObj for ObjCell<S> {
  fn obj_unsubscribe(&mut self) {
    if let Some(s) = self.0.take() {
      s.unsubscribe()
    }
  }

  fn obj_is_closed(&self) -> bool {
    self.0.as_ref().map_or(true, |s| s.is_closed())
  }
}

/// Type-erased subscription, for containers of heterogeneous teardowns.
pub struct BoxSubscription(Box<dyn SubscriptionObj>);

impl BoxSubscription {
  pub fn new<S: Subscription + Send + 'static>(s: S) -> Self {
    BoxSubscription(Box::new(ObjCell(Some(s))))
  }
}

impl Subscription for BoxSubscription {
  fn unsubscribe(mut self) {
    self.0.obj_unsubscribe()
  }

  fn is_closed(&self) -> bool {
    self.0.obj_is_closed()
  }
}

#[derive(Default)]
struct SharedTeardowns(SmallVec<[BoxSubscription; 2]>);

/// A cloneable container of child subscriptions.
///
/// Closing the container unsubscribes every child; an `add` that arrives
/// after the close unsubscribes the child on the spot. That late-add rule
/// is what resolves the synchronous-termination race: a source may finish
/// (and close the container) before its own unsubscriber gets registered.
#[derive(Clone, Default)]
pub struct SharedSubscription {
  closed: CellArc<bool>,
  teardowns: MutArc<SharedTeardowns>,
}

impl SharedSubscription {
  pub fn add<S: Subscription + Send + 'static>(&self, subscription: S) {
    let late = {
      let mut list = self.teardowns.rc_deref_mut();
      if self.closed.get() {
        true
      } else {
        list.0.push(BoxSubscription::new(subscription));
        return;
      }
    };
    if late {
      subscription.unsubscribe();
    }
  }
}

impl Subscription for SharedSubscription {
  fn unsubscribe(self) {
    let drained = {
      let mut list = self.teardowns.rc_deref_mut();
      if self.closed.get() {
        return;
      }
      self.closed.set(true);
      std::mem::take(&mut list.0)
    };
    // run teardowns outside the lock, they may re-enter
    for s in drained {
      s.unsubscribe();
    }
  }

  fn is_closed(&self) -> bool {
    self.closed.get()
  }
}

#[derive(Default)]
struct SerialInner {
  closed: bool,
  current: Option<BoxSubscription>,
}

/// A cloneable slot holding at most one child subscription.
///
/// Swapping in a replacement unsubscribes the previous child; a swap after
/// close unsubscribes the incoming one. Redo loops, `switch_map`, and the
/// connectable upstream all revolve around this slot.
#[derive(Clone, Default)]
pub struct SerialSubscription {
  inner: MutArc<SerialInner>,
}

impl SerialSubscription {
  pub fn swap<S: Subscription + Send + 'static>(&self, subscription: S) {
    let previous = {
      let mut inner = self.inner.rc_deref_mut();
      if inner.closed {
        drop(inner);
        subscription.unsubscribe();
        return;
      }
      inner.current.replace(BoxSubscription::new(subscription))
    };
    // unsubscribe the replaced child outside the lock, it may re-enter
    if let Some(previous) = previous {
      previous.unsubscribe();
    }
  }

  /// Empty the slot without unsubscribing the child (the child finished on
  /// its own).
  pub fn clear(&self) {
    self.inner.rc_deref_mut().current = None;
  }
}

impl Subscription for SerialSubscription {
  fn unsubscribe(self) {
    let held = {
      let mut inner = self.inner.rc_deref_mut();
      if inner.closed {
        return;
      }
      inner.closed = true;
      inner.current.take()
    };
    if let Some(held) = held {
      held.unsubscribe();
    }
  }

  fn is_closed(&self) -> bool {
    self.inner.rc_deref().closed
  }
}

/// Owns two subscriptions and closes them together.
pub struct ZipSubscription<A, B> {
  a: A,
  b: B,
}

impl<A, B> ZipSubscription<A, B> {
  pub fn new(a: A, b: B) -> Self {
    ZipSubscription { a, b }
  }
}

impl<A: Subscription, B: Subscription> Subscription for ZipSubscription<A, B> {
  fn unsubscribe(self) {
    self.a.unsubscribe();
    self.b.unsubscribe();
  }

  fn is_closed(&self) -> bool {
    self.a.is_closed() && self.b.is_closed()
  }
}

/// A late-bound subscription slot shared between an operator's halves.
impl<S: Subscription> Subscription for MutArc<Option<S>> {
  fn unsubscribe(self) {
    let held = self.rc_deref_mut().take();
    if let Some(held) = held {
      held.unsubscribe();
    }
  }

  fn is_closed(&self) -> bool {
    self.rc_deref().as_ref().map_or(true, |s| s.is_closed())
  }
}

/// RAII wrapper: unsubscribes when dropped.
pub struct SubscriptionGuard<S: Subscription>(Option<S>);

impl<S: Subscription> SubscriptionGuard<S> {
  pub fn new(subscription: S) -> Self {
    SubscriptionGuard(Some(subscription))
  }

  /// Release the subscription without unsubscribing it.
  pub fn forget(mut self) -> S {
    self.0.take().unwrap()
  }
}

impl<S: Subscription> Drop for SubscriptionGuard<S> {
  fn drop(&mut self) {
    if let Some(s) = self.0.take() {
      s.unsubscribe();
    }
  }
}

#[cfg(test)]
mod test {
  use super::*;
  use crate::rc::{CellArc, SharedCell};

  #[test]
  fn shared_runs_children_once() {
    let count = CellArc::own(0u32);
    let sub = SharedSubscription::default();
    let c = count.clone();
    sub.add(TeardownSubscription::new(move || c.set(c.get() + 1)));
    sub.clone().unsubscribe();
    sub.unsubscribe();
    assert_eq!(count.get(), 1);
  }

  #[test]
  fn shared_add_after_close_disposes_immediately() {
    let hit = CellArc::own(false);
    let sub = SharedSubscription::default();
    sub.clone().unsubscribe();
    let c = hit.clone();
    sub.add(TeardownSubscription::new(move || c.set(true)));
    assert!(hit.get());
  }

  #[test]
  fn serial_swap_disposes_previous() {
    let first = CellArc::own(false);
    let serial = SerialSubscription::default();
    let c = first.clone();
    serial.swap(TeardownSubscription::new(move || c.set(true)));
    serial.swap(SingleSubscription);
    assert!(first.get());

    serial.clone().unsubscribe();
    let second = CellArc::own(false);
    let c = second.clone();
    serial.swap(TeardownSubscription::new(move || c.set(true)));
    assert!(second.get());
  }

  #[test]
  fn guard_unsubscribes_on_drop() {
    let hit = CellArc::own(false);
    let c = hit.clone();
    {
      let _guard = SubscriptionGuard::new(TeardownSubscription::new(move || c.set(true)));
    }
    assert!(hit.get());
  }
}
