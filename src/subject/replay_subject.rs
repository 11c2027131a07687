//! Subject with a bounded or unbounded history.

use std::{sync::Arc, time::Duration};

use crate::{
  observable::{Observable, ObservableExt},
  observer::{BoxObserver, Observer},
  rc::{CellArc, SharedCell},
  scheduler::Scheduler,
  subject::{
    subject_core::{Multicast, ReplayPolicy},
    SubjectSubscription,
  },
};

/// A subject that replays its retained window — values in upstream order,
/// no duplicates, no gaps — to every new subscriber, then feeds it live
/// emissions. Terminal signals replay after the window.
pub struct ReplaySubject<Item, Err> {
  pub(crate) core: Multicast<Item, Err>,
}

impl<Item, Err> ReplaySubject<Item, Err> {
  /// Retain the whole history.
  pub fn unbounded() -> Self {
    ReplaySubject { core: Multicast::new(ReplayPolicy::Unbounded) }
  }

  /// Retain the last `count` items, dropping the oldest beyond that.
  pub fn with_size(count: usize) -> Self {
    ReplaySubject { core: Multicast::new(ReplayPolicy::Size(count)) }
  }

  /// Retain items younger than `window` on the scheduler's clock.
  pub fn with_time<SD: Scheduler>(window: Duration, scheduler: SD) -> Self {
    ReplaySubject {
      core: Multicast::with_clock(ReplayPolicy::Time(window), Arc::new(move || scheduler.now())),
    }
  }

  /// Retain at most `count` items younger than `window`.
  pub fn with_size_and_time<SD: Scheduler>(count: usize, window: Duration, scheduler: SD) -> Self {
    ReplaySubject {
      core: Multicast::with_clock(
        ReplayPolicy::SizeAndTime(count, window),
        Arc::new(move || scheduler.now()),
      ),
    }
  }
}

impl_subject_traits!(ReplaySubject);

#[cfg(test)]
mod test {
  use super::*;
  use crate::{
    prelude::*,
    rc::{MutArc, RcDeref, RcDerefMut},
  };

  #[test]
  fn size_bound_drops_oldest() {
    let mut subject = ReplaySubject::<i32, ()>::with_size(2);
    subject.next(1);
    subject.next(2);
    subject.next(3);

    let seen = MutArc::own(Vec::new());
    let c = seen.clone();
    subject.clone().subscribe(move |v| c.rc_deref_mut().push(v));
    assert_eq!(*seen.rc_deref(), vec![2, 3]);

    subject.next(4);
    assert_eq!(*seen.rc_deref(), vec![2, 3, 4]);
  }

  #[test]
  fn replays_window_then_terminal() {
    let mut subject = ReplaySubject::<i32, ()>::with_size(2);
    subject.next(1);
    subject.next(2);
    subject.next(3);
    subject.clone().complete();

    let seen = MutArc::own(Vec::new());
    let done = MutArc::own(false);
    let (cs, cd) = (seen.clone(), done.clone());
    subject
      .clone()
      .subscribe_complete(move |v| cs.rc_deref_mut().push(v), move || *cd.rc_deref_mut() = true);
    assert_eq!(*seen.rc_deref(), vec![2, 3]);
    assert!(*done.rc_deref());
  }

  #[test]
  fn time_bound_evicts_on_virtual_clock() {
    let sched = TestScheduler::new();
    let mut subject = ReplaySubject::<i32, ()>::with_time(Duration::from_millis(50), sched.clone());
    subject.next(1);
    sched.advance_by(Duration::from_millis(100));
    subject.next(2);

    let seen = MutArc::own(Vec::new());
    let c = seen.clone();
    subject.clone().subscribe(move |v| c.rc_deref_mut().push(v));
    assert_eq!(*seen.rc_deref(), vec![2]);
  }
}
