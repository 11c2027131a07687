//! Builds a fresh source per subscriber.

use crate::observable::{Observable, ObservableExt};
use crate::observer::Observer;

/// Calls `factory` at subscribe time and subscribes whatever it returns,
/// so every subscriber gets its own source.
pub fn defer<F, Src>(factory: F) -> DeferObservable<F>
where
  F: FnOnce() -> Src,
{
  DeferObservable { factory }
}

#[derive(Clone)]
pub struct DeferObservable<F> {
  factory: F,
}

impl<Item, Err, O, F, Src> Observable<Item, Err, O> for DeferObservable<F>
where
  O: Observer<Item, Err>,
  F: FnOnce() -> Src,
  Src: Observable<Item, Err, O>,
{
  type Unsub = Src::Unsub;

  fn actual_subscribe(self, observer: O) -> Self::Unsub {
    (self.factory)().actual_subscribe(observer)
  }
}

impl<Item, Err, F, Src> ObservableExt<Item, Err> for DeferObservable<F>
where
  F: FnOnce() -> Src,
  Src: ObservableExt<Item, Err>,
{
}

#[cfg(test)]
mod test {
  use crate::{
    prelude::*,
    rc::{CellArc, SharedCell},
  };

  #[test]
  fn factory_runs_per_subscribe() {
    let calls = CellArc::own(0u32);
    let c = calls.clone();
    let deferred = observable::defer(move || {
      c.set(c.get() + 1);
      observable::of::<_, ()>(c.get())
    });
    let mut first = 0;
    deferred.clone().subscribe(|v| first = v);
    let mut second = 0;
    deferred.subscribe(|v| second = v);
    assert_eq!((first, second), (1, 2));
    assert_eq!(calls.get(), 2);
  }
}
