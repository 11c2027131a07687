use crate::{
  observable::{Observable, ObservableExt},
  observer::Observer,
  rc::{MutArc, RcDerefMut},
  subscription::{BoxSubscription, TeardownSubscription, ZipSubscription},
};

/// Runs a callback exactly once when the stream ends, for any reason:
/// completion, error, or unsubscription.
#[derive(Clone)]
pub struct FinalizeOp<S, F> {
  pub(crate) source: S,
  pub(crate) func: F,
}

impl<Item, Err, O, S, F> Observable<Item, Err, O> for FinalizeOp<S, F>
where
  O: Observer<Item, Err>,
  S: Observable<Item, Err, FinalizeObserver<O, F>>,
  S::Unsub: Send + 'static,
  F: FnOnce() + Send + 'static,
{
  type Unsub = ZipSubscription<S::Unsub, BoxSubscription>;

  fn actual_subscribe(self, observer: O) -> Self::Unsub {
    let slot = MutArc::own(Some(self.func));
    let for_cancel = slot.clone();
    let unsub = self
      .source
      .actual_subscribe(FinalizeObserver { observer, slot });
    let on_cancel = TeardownSubscription::new(move || run_once(&for_cancel));
    ZipSubscription::new(unsub, BoxSubscription::new(on_cancel))
  }
}

impl<Item, Err, S, F> ObservableExt<Item, Err> for FinalizeOp<S, F> where S: ObservableExt<Item, Err>
{}

fn run_once<F: FnOnce()>(slot: &MutArc<Option<F>>) {
  let taken = slot.rc_deref_mut().take();
  if let Some(f) = taken {
    f()
  }
}

pub struct FinalizeObserver<O, F> {
  observer: O,
  slot: MutArc<Option<F>>,
}

impl<Item, Err, O, F> Observer<Item, Err> for FinalizeObserver<O, F>
where
  O: Observer<Item, Err>,
  F: FnOnce(),
{
  fn next(&mut self, value: Item) {
    self.observer.next(value)
  }

  fn error(self, err: Err) {
    self.observer.error(err);
    run_once(&self.slot);
  }

  fn complete(self) {
    self.observer.complete();
    run_once(&self.slot);
  }

  fn is_finished(&self) -> bool {
    self.observer.is_finished()
  }
}

#[cfg(test)]
mod test {
  use crate::{
    prelude::*,
    rc::{CellArc, SharedCell},
  };

  #[test]
  fn runs_after_completion() {
    let count = CellArc::own(0u32);
    let c = count.clone();
    observable::from_iter::<_, ()>(0..3).finalize(move || c.set(c.get() + 1)).subscribe(|_| {});
    assert_eq!(count.get(), 1);
  }

  #[test]
  fn runs_once_even_with_cancel_after_terminal() {
    let count = CellArc::own(0u32);
    let c = count.clone();
    let sub =
      observable::from_iter::<_, ()>(0..3).finalize(move || c.set(c.get() + 1)).subscribe(|_| {});
    sub.unsubscribe();
    assert_eq!(count.get(), 1);
  }

  #[test]
  fn runs_on_cancel() {
    let count = CellArc::own(0u32);
    let c = count.clone();
    let sub = observable::never::<i32, ()>().finalize(move || c.set(c.get() + 1)).subscribe(|_| {});
    assert_eq!(count.get(), 0);
    sub.unsubscribe();
    assert_eq!(count.get(), 1);
  }
}
