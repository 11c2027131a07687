//! Hot multicast sources.
//!
//! A subject is both an observer and an observable: feed it notifications
//! and it fans them out to every current subscriber. The flavours differ
//! only in what they replay to a subscriber that arrives late.

use crate::{
  observable::{Observable, ObservableExt},
  observer::{BoxObserver, Observer},
  rc::{CellArc, SharedCell},
  subscription::Subscription,
};

pub(crate) mod subject_core;

use subject_core::{Multicast, ReplayPolicy};

/// Removes one subscriber from its subject when unsubscribed.
pub struct SubjectSubscription<Item, Err> {
  core: Multicast<Item, Err>,
  id: u64,
  closed: CellArc<bool>,
}

impl<Item: Clone, Err: Clone> Subscription for SubjectSubscription<Item, Err> {
  fn unsubscribe(self) {
    if !self.closed.get() {
      self.closed.set(true);
      self.core.remove_observer(self.id);
    }
  }

  fn is_closed(&self) -> bool {
    self.closed.get()
  }
}

macro_rules! impl_subject_traits {
  ($ty:ident) => {
    impl<Item, Err> Clone for $ty<Item, Err> {
      fn clone(&self) -> Self {
        $ty { core: self.core.clone() }
      }
    }

    impl<Item, Err> Observer<Item, Err> for $ty<Item, Err>
    where
      Item: Clone,
      Err: Clone,
    {
      fn next(&mut self, value: Item) {
        self.core.emit(value)
      }

      fn error(self, err: Err) {
        self.core.emit_error(err)
      }

      fn complete(self) {
        self.core.emit_complete()
      }

      fn is_finished(&self) -> bool {
        self.core.is_stopped()
      }
    }

    impl<Item, Err, O> Observable<Item, Err, O> for $ty<Item, Err>
    where
      Item: Clone + Send + 'static,
      Err: Clone + Send + 'static,
      O: Observer<Item, Err> + Send + 'static,
    {
      type Unsub = SubjectSubscription<Item, Err>;

      fn actual_subscribe(self, observer: O) -> Self::Unsub {
        let id = self.core.add_observer(BoxObserver::new(observer));
        SubjectSubscription { core: self.core, id, closed: CellArc::own(false) }
      }
    }

    impl<Item, Err> ObservableExt<Item, Err> for $ty<Item, Err> {}
  };
}

/// Plain publish subject: subscribers see what is emitted while they are
/// subscribed, plus a latched terminal if they arrive after one.
pub struct Subject<Item, Err> {
  pub(crate) core: Multicast<Item, Err>,
}

impl<Item, Err> Subject<Item, Err> {
  pub fn new() -> Self {
    Subject { core: Multicast::new(ReplayPolicy::None) }
  }

  /// Whether any subscriber is currently attached.
  pub fn has_observers(&self) -> bool {
    self.core.observer_count() > 0
  }
}

impl<Item, Err> Default for Subject<Item, Err> {
  fn default() -> Self {
    Self::new()
  }
}

impl_subject_traits!(Subject);

pub mod behavior_subject;
pub mod replay_subject;

pub use behavior_subject::BehaviorSubject;
pub use replay_subject::ReplaySubject;

#[cfg(test)]
mod test {
  use super::*;
  use crate::rc::{MutArc, RcDeref, RcDerefMut};

  #[test]
  fn fans_out_to_all_subscribers() {
    let mut subject = Subject::<i32, ()>::new();
    let (a, b) = (MutArc::own(Vec::new()), MutArc::own(Vec::new()));
    let (ca, cb) = (a.clone(), b.clone());
    subject.clone().subscribe(move |v| ca.rc_deref_mut().push(v));
    subject.clone().subscribe(move |v| cb.rc_deref_mut().push(v));

    subject.next(1);
    subject.next(2);
    assert_eq!(*a.rc_deref(), vec![1, 2]);
    assert_eq!(*b.rc_deref(), vec![1, 2]);
  }

  #[test]
  fn late_subscriber_sees_latched_terminal() {
    let subject = Subject::<i32, &str>::new();
    subject.clone().error("boom");

    let err = MutArc::own(None);
    let c = err.clone();
    subject.clone().subscribe_err(|_| {}, move |e| *c.rc_deref_mut() = Some(e));
    assert_eq!(*err.rc_deref(), Some("boom"));
  }

  #[test]
  fn unsubscribed_observer_stops_receiving() {
    let mut subject = Subject::<i32, ()>::new();
    let seen = MutArc::own(Vec::new());
    let c = seen.clone();
    let sub = subject.clone().subscribe(move |v| c.rc_deref_mut().push(v));
    subject.next(1);
    sub.unsubscribe();
    subject.next(2);
    assert_eq!(*seen.rc_deref(), vec![1]);
  }

  #[test]
  fn reentrant_emission_is_deferred_not_lost() {
    let mut subject = Subject::<i32, ()>::new();
    let seen = MutArc::own(Vec::new());
    let c = seen.clone();
    let reentrant = subject.clone();
    subject.clone().subscribe(move |v| {
      if v == 1 {
        // emitting from inside a delivery queues behind the live drain
        let mut re = reentrant.clone();
        re.next(10);
      }
      c.rc_deref_mut().push(v);
    });
    subject.next(1);
    subject.next(2);
    assert_eq!(*seen.rc_deref(), vec![1, 10, 2]);
  }

  #[test]
  fn no_emission_after_complete() {
    let mut subject = Subject::<i32, ()>::new();
    let seen = MutArc::own(Vec::new());
    let c = seen.clone();
    subject.clone().subscribe(move |v| c.rc_deref_mut().push(v));
    subject.next(1);
    subject.clone().complete();
    subject.next(2);
    assert_eq!(*seen.rc_deref(), vec![1]);
  }
}
