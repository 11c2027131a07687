use crate::{
  observable::{connectable::Connection, ConnectableObservable, Observable, ObservableExt},
  observer::Observer,
  rc::{MutArc, RcDerefMut},
  subscription::{BoxSubscription, Subscription, TeardownSubscription},
};

/// Automates a connectable: the upstream connects when the subscriber
/// count leaves zero and disconnects exactly once when it returns to
/// zero.
pub struct RefCountOp<S, Sub> {
  connectable: ConnectableObservable<S, Sub>,
  state: MutArc<RefCountState>,
}

#[derive(Default)]
struct RefCountState {
  count: usize,
  connection: Option<Connection>,
}

impl<S, Sub> RefCountOp<S, Sub> {
  pub(crate) fn new(connectable: ConnectableObservable<S, Sub>) -> Self {
    RefCountOp { connectable, state: MutArc::own(RefCountState::default()) }
  }
}

impl<S: Clone, Sub: Clone> Clone for RefCountOp<S, Sub> {
  fn clone(&self) -> Self {
    RefCountOp { connectable: self.connectable.clone(), state: self.state.clone() }
  }
}

impl<Item, Err, O, S, Sub> Observable<Item, Err, O> for RefCountOp<S, Sub>
where
  O: Observer<Item, Err>,
  Sub: Observable<Item, Err, O> + Observer<Item, Err> + Clone,
  <Sub as Observable<Item, Err, O>>::Unsub: Send + 'static,
  S: Observable<Item, Err, Sub> + Clone,
  S::Unsub: Send + 'static,
{
  type Unsub = BoxSubscription;

  fn actual_subscribe(self, observer: O) -> Self::Unsub {
    let inner = self.connectable.clone().actual_subscribe(observer);
    let joined = {
      let mut guard = self.state.rc_deref_mut();
      guard.count += 1;
      guard.count == 1
    };
    if joined {
      let connection = self.connectable.connect();
      self.state.rc_deref_mut().connection = Some(connection);
    }
    let state = self.state;
    BoxSubscription::new(TeardownSubscription::new(move || {
      inner.unsubscribe();
      let dropped = {
        let mut guard = state.rc_deref_mut();
        guard.count -= 1;
        if guard.count == 0 {
          guard.connection.take()
        } else {
          None
        }
      };
      if let Some(connection) = dropped {
        connection.unsubscribe();
      }
    }))
  }
}

impl<Item, Err, S, Sub> ObservableExt<Item, Err> for RefCountOp<S, Sub> where
  S: ObservableExt<Item, Err>
{
}

#[cfg(test)]
mod test {
  use crate::{
    prelude::*,
    rc::{CellArc, SharedCell},
  };

  #[test]
  fn connects_once_and_disconnects_at_zero() {
    let connects = CellArc::own(0u32);
    let c = connects.clone();
    let mut feeder = Subject::<i32, ()>::new();
    let f = feeder.clone();
    let shared = observable::defer(move || {
      c.set(c.get() + 1);
      f.clone()
    })
    .share();

    let (a, b) = (MutArc::own(Vec::new()), MutArc::own(Vec::new()));
    let (ca, cb) = (a.clone(), b.clone());
    let sub_a = shared.clone().subscribe(move |v| ca.rc_deref_mut().push(v));
    let sub_b = shared.clone().subscribe(move |v| cb.rc_deref_mut().push(v));
    assert_eq!(connects.get(), 1);

    feeder.next(1);
    assert_eq!(*a.rc_deref(), vec![1]);
    assert_eq!(*b.rc_deref(), vec![1]);

    sub_a.unsubscribe();
    feeder.next(2);
    assert_eq!(*a.rc_deref(), vec![1]);
    assert_eq!(*b.rc_deref(), vec![1, 2]);

    // last subscriber leaving tears the upstream down exactly once
    sub_b.unsubscribe();
    assert!(!feeder.has_observers());
  }
}
