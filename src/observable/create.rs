//! Source defined by a subscribe function.

use crate::{
  observable::{Observable, ObservableExt},
  observer::Observer,
  subscription::SingleSubscription,
};

/// Hands the downstream observer to `subscribe_fn`, which may emit
/// synchronously, stash it, or move it to another thread. Cancellation is
/// observed through the observer's `is_finished`.
pub fn create<F>(subscribe_fn: F) -> CreateObservable<F> {
  CreateObservable { subscribe_fn }
}

#[derive(Clone)]
pub struct CreateObservable<F> {
  subscribe_fn: F,
}

impl<Item, Err, O, F> Observable<Item, Err, O> for CreateObservable<F>
where
  O: Observer<Item, Err>,
  F: FnOnce(O),
{
  type Unsub = SingleSubscription;

  fn actual_subscribe(self, observer: O) -> Self::Unsub {
    (self.subscribe_fn)(observer);
    SingleSubscription
  }
}

impl<Item, Err, F> ObservableExt<Item, Err> for CreateObservable<F> {}

#[cfg(test)]
mod test {
  use crate::prelude::*;

  #[test]
  fn emits_whatever_the_function_sends() {
    let mut seen = Vec::new();
    let mut done = false;
    observable::create(|mut emitter| {
      emitter.next(1);
      emitter.next(2);
      emitter.complete();
    })
    .subscribe_all(|v: i32| seen.push(v), |_: ()| {}, || done = true);
    assert_eq!(seen, vec![1, 2]);
    assert!(done);
  }

  #[test]
  fn emission_from_another_thread() {
    let seen = MutArc::own(Vec::new());
    let c = seen.clone();
    observable::create(|mut emitter| {
      std::thread::spawn(move || {
        emitter.next(10);
        emitter.complete();
      })
      .join()
      .unwrap();
    })
    .subscribe_err(move |v: i32| c.rc_deref_mut().push(v), |_: ()| {});
    assert_eq!(*seen.rc_deref(), vec![10]);
  }
}
