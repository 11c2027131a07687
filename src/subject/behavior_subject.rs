//! Subject that always hands a new subscriber the latest value.

use crate::{
  observable::{Observable, ObservableExt},
  observer::{BoxObserver, Observer},
  rc::{CellArc, SharedCell},
  subject::{
    subject_core::{Multicast, ReplayPolicy},
    SubjectSubscription,
  },
};

/// Seeded with an initial value; a subscriber immediately receives the most
/// recent emission (or the seed), then the live stream.
pub struct BehaviorSubject<Item, Err> {
  pub(crate) core: Multicast<Item, Err>,
}

impl<Item, Err> BehaviorSubject<Item, Err> {
  pub fn new(seed: Item) -> Self {
    let core = Multicast::new(ReplayPolicy::Size(1));
    core.seed(seed);
    BehaviorSubject { core }
  }
}

impl_subject_traits!(BehaviorSubject);

#[cfg(test)]
mod test {
  use super::*;
  use crate::rc::{MutArc, RcDeref, RcDerefMut};

  #[test]
  fn subscriber_gets_latest_then_live() {
    let mut subject = BehaviorSubject::<i32, ()>::new(0);
    let first = MutArc::own(Vec::new());
    let c = first.clone();
    subject.clone().subscribe(move |v| c.rc_deref_mut().push(v));
    assert_eq!(*first.rc_deref(), vec![0]);

    subject.next(7);
    let second = MutArc::own(Vec::new());
    let c = second.clone();
    subject.clone().subscribe(move |v| c.rc_deref_mut().push(v));
    assert_eq!(*second.rc_deref(), vec![7]);
    assert_eq!(*first.rc_deref(), vec![0, 7]);
  }
}
