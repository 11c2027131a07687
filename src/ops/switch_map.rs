use crate::{
  hook,
  observable::{Observable, ObservableExt},
  observer::Observer,
  ops::box_it::BoxIt,
  rc::{MutArc, RcDeref, RcDerefMut},
  subscription::{SerialSubscription, Subscription, ZipSubscription},
  type_hint::TypeHint,
};

/// Mirrors only the latest inner source. Every outer item displaces the
/// inner before it; a displaced inner's leftovers are discarded, guarded
/// by a monotonically increasing epoch.
#[derive(Clone)]
pub struct SwitchAllOp<S, Inner> {
  pub(crate) source: S,
  pub(crate) _hint: TypeHint<Inner>,
}

struct SwitchState<O> {
  observer: Option<O>,
  current: SerialSubscription,
  epoch: u64,
  inner_live: bool,
  outer_done: bool,
}

type Shared<O> = MutArc<SwitchState<O>>;

impl<Item, Err, O, S, Inner> Observable<Item, Err, O> for SwitchAllOp<S, Inner>
where
  O: Observer<Item, Err> + Send + 'static,
  Item: Send + 'static,
  Err: Send + 'static,
  Inner: BoxIt<Item, Err>,
  S: Observable<Inner, Err, SwitchOuterObserver<O, Item, Err>>,
{
  type Unsub = ZipSubscription<S::Unsub, SerialSubscription>;

  fn actual_subscribe(self, observer: O) -> Self::Unsub {
    let current = SerialSubscription::default();
    let state = MutArc::own(SwitchState {
      observer: Some(observer),
      current: current.clone(),
      epoch: 0,
      inner_live: false,
      outer_done: false,
    });
    let unsub = self
      .source
      .actual_subscribe(SwitchOuterObserver { state, _hint: TypeHint::new() });
    ZipSubscription::new(unsub, current)
  }
}

impl<Item, Err, S, Inner> ObservableExt<Item, Err> for SwitchAllOp<S, Inner>
where
  S: ObservableExt<Inner, Err>,
  Inner: ObservableExt<Item, Err>,
{
}

pub struct SwitchOuterObserver<O, Item, Err> {
  state: Shared<O>,
  _hint: TypeHint<(Item, Err)>,
}

impl<Inner, Item, Err, O> Observer<Inner, Err> for SwitchOuterObserver<O, Item, Err>
where
  O: Observer<Item, Err> + Send + 'static,
  Item: Send + 'static,
  Err: Send + 'static,
  Inner: BoxIt<Item, Err>,
{
  fn next(&mut self, inner: Inner) {
    let (epoch, current) = {
      let mut guard = self.state.rc_deref_mut();
      if guard.observer.is_none() {
        return;
      }
      guard.epoch += 1;
      guard.inner_live = true;
      (guard.epoch, guard.current.clone())
    };
    // the displaced inner keeps running until the swap below, but its
    // emissions already fail the epoch check
    let unsub = inner
      .box_it()
      .actual_subscribe(SwitchInnerObserver { state: self.state.clone(), epoch });
    current.swap(unsub);
  }

  fn error(self, err: Err) {
    let (observer, current) = {
      let mut guard = self.state.rc_deref_mut();
      (guard.observer.take(), guard.current.clone())
    };
    if let Some(observer) = observer {
      observer.error(err);
      current.unsubscribe();
    }
  }

  fn complete(self) {
    let observer = {
      let mut guard = self.state.rc_deref_mut();
      guard.outer_done = true;
      if guard.inner_live {
        None
      } else {
        guard.observer.take()
      }
    };
    if let Some(observer) = observer {
      observer.complete();
    }
  }

  fn is_finished(&self) -> bool {
    self.state.rc_deref().observer.as_ref().map_or(true, |o| o.is_finished())
  }
}

pub struct SwitchInnerObserver<O> {
  state: Shared<O>,
  epoch: u64,
}

impl<Item, Err, O> Observer<Item, Err> for SwitchInnerObserver<O>
where
  O: Observer<Item, Err>,
{
  fn next(&mut self, value: Item) {
    let mut guard = self.state.rc_deref_mut();
    if guard.epoch != self.epoch {
      return;
    }
    if let Some(observer) = guard.observer.as_mut() {
      observer.next(value)
    }
  }

  fn error(self, err: Err) {
    let observer = {
      let mut guard = self.state.rc_deref_mut();
      if guard.epoch != self.epoch {
        None
      } else {
        guard.observer.take()
      }
    };
    match observer {
      Some(observer) => observer.error(err),
      None => hook::dropped_signal("error from a displaced inner stream", None),
    }
  }

  fn complete(self) {
    let observer = {
      let mut guard = self.state.rc_deref_mut();
      if guard.epoch != self.epoch {
        None
      } else {
        guard.inner_live = false;
        if guard.outer_done {
          guard.observer.take()
        } else {
          None
        }
      }
    };
    if let Some(observer) = observer {
      observer.complete();
    }
  }

  fn is_finished(&self) -> bool {
    let guard = self.state.rc_deref();
    guard.epoch != self.epoch || guard.observer.as_ref().map_or(true, |o| o.is_finished())
  }
}

#[cfg(test)]
mod test {
  use crate::prelude::*;

  #[test]
  fn newer_inner_displaces_older() {
    let mut outer = Subject::<i32, ()>::new();
    let first = Subject::<i32, ()>::new();
    let second = Subject::<i32, ()>::new();
    let seen = MutArc::own(Vec::new());
    let c = seen.clone();
    let (f, s) = (first.clone(), second.clone());
    outer
      .clone()
      .switch_map(move |i| if i == 0 { f.clone() } else { s.clone() })
      .subscribe(move |v| c.rc_deref_mut().push(v));

    outer.next(0);
    let mut fst = first.clone();
    fst.next(10);
    outer.next(1);
    fst.next(11);
    let mut snd = second.clone();
    snd.next(20);
    assert_eq!(*seen.rc_deref(), vec![10, 20]);
  }

  #[test]
  fn outer_completion_defers_to_live_inner() {
    let mut outer = Subject::<i32, ()>::new();
    let inner = Subject::<i32, ()>::new();
    let done = MutArc::own(false);
    let c = done.clone();
    let i = inner.clone();
    outer
      .clone()
      .switch_map(move |_| i.clone())
      .subscribe_complete(|_: i32| {}, move || *c.rc_deref_mut() = true);

    outer.next(0);
    outer.clone().complete();
    assert!(!*done.rc_deref());
    inner.clone().complete();
    assert!(*done.rc_deref());
  }
}
