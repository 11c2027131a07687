//! A source that starts on `connect`, not on subscribe.

use crate::{
  observable::{Observable, ObservableExt},
  observer::Observer,
  rc::{CellArc, SharedCell},
  subscription::{SerialSubscription, SingleSubscription, Subscription},
};

/// Pairs a cold source with a subject. Subscribers attach to the subject;
/// `connect` subscribes the subject upstream, at most once at a time
/// (serial slot). The upstream terminal latches in the subject and reaches
/// late subscribers.
pub struct ConnectableObservable<S, Sub> {
  source: S,
  subject: Sub,
  connection: SerialSubscription,
  connected: CellArc<bool>,
}

impl<S, Sub> ConnectableObservable<S, Sub> {
  pub fn new(source: S, subject: Sub) -> Self {
    ConnectableObservable {
      source,
      subject,
      connection: SerialSubscription::default(),
      connected: CellArc::own(false),
    }
  }

  /// Subscribe the subject to the source. A second call while connected is
  /// a no-op returning a handle to the same connection.
  pub fn connect<Item, Err>(&self) -> Connection
  where
    S: Observable<Item, Err, Sub> + Clone,
    S::Unsub: Send + 'static,
    Sub: Observer<Item, Err> + Clone,
  {
    if self.connected.compare_set(false, true) {
      let unsub = self.source.clone().actual_subscribe(self.subject.clone());
      self.connection.swap(unsub);
    }
    Connection { connection: self.connection.clone(), connected: self.connected.clone() }
  }

  /// `connect` + refCount: see [`ObservableExt::share`].
  pub fn ref_count(self) -> crate::ops::ref_count::RefCountOp<S, Sub> {
    crate::ops::ref_count::RefCountOp::new(self)
  }
}

impl<S: Clone, Sub: Clone> Clone for ConnectableObservable<S, Sub> {
  fn clone(&self) -> Self {
    ConnectableObservable {
      source: self.source.clone(),
      subject: self.subject.clone(),
      connection: self.connection.clone(),
      connected: self.connected.clone(),
    }
  }
}

/// Handle to a live upstream connection; unsubscribing disconnects the
/// upstream without touching the downstream subscribers.
pub struct Connection {
  connection: SerialSubscription,
  connected: CellArc<bool>,
}

impl Subscription for Connection {
  fn unsubscribe(self) {
    if self.connected.compare_set(true, false) {
      // swap rather than close: the slot is reused if someone reconnects
      self.connection.swap(SingleSubscription);
    }
  }

  fn is_closed(&self) -> bool {
    !self.connected.get()
  }
}

impl<Item, Err, O, S, Sub> Observable<Item, Err, O> for ConnectableObservable<S, Sub>
where
  O: Observer<Item, Err>,
  Sub: Observable<Item, Err, O>,
{
  type Unsub = Sub::Unsub;

  fn actual_subscribe(self, observer: O) -> Self::Unsub {
    self.subject.actual_subscribe(observer)
  }
}

impl<Item, Err, S, Sub> ObservableExt<Item, Err> for ConnectableObservable<S, Sub> {}

#[cfg(test)]
mod test {
  use crate::{
    prelude::*,
    rc::{RcDeref, RcDerefMut},
  };

  #[test]
  fn nothing_flows_before_connect() {
    let connectable = observable::from_iter::<_, ()>([1, 2, 3]).publish();
    let seen = MutArc::own(Vec::new());
    let c = seen.clone();
    connectable.clone().subscribe(move |v| c.rc_deref_mut().push(v));
    assert!(seen.rc_deref().is_empty());

    connectable.connect();
    assert_eq!(*seen.rc_deref(), vec![1, 2, 3]);
  }

  #[test]
  fn fan_out_to_several_subscribers() {
    let mut subject = Subject::<i32, ()>::new();
    let connectable = subject.clone().publish();
    let (a, b) = (MutArc::own(Vec::new()), MutArc::own(Vec::new()));
    let (ca, cb) = (a.clone(), b.clone());
    connectable.clone().subscribe(move |v| ca.rc_deref_mut().push(v));
    connectable.clone().subscribe(move |v| cb.rc_deref_mut().push(v));
    let connection = connectable.connect();

    subject.next(5);
    assert_eq!(*a.rc_deref(), vec![5]);
    assert_eq!(*b.rc_deref(), vec![5]);

    connection.unsubscribe();
    subject.next(6);
    assert_eq!(*a.rc_deref(), vec![5]);
  }
}
