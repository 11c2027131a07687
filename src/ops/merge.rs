use crate::{
  observable::{Observable, ObservableExt},
  observer::Observer,
  rc::{MutArc, RcDeref, RcDerefMut},
  subscription::ZipSubscription,
};

/// Interleaves two sources: items surface in arrival order, each source's
/// own order preserved; completion waits for both, an error cuts through
/// at once.
#[derive(Clone)]
pub struct MergeOp<S1, S2> {
  pub(crate) a: S1,
  pub(crate) b: S2,
}

impl<Item, Err, O, S1, S2> Observable<Item, Err, O> for MergeOp<S1, S2>
where
  O: Observer<Item, Err>,
  S1: Observable<Item, Err, MergeObserver<O>>,
  S2: Observable<Item, Err, MergeObserver<O>>,
{
  type Unsub = ZipSubscription<S1::Unsub, S2::Unsub>;

  fn actual_subscribe(self, observer: O) -> Self::Unsub {
    let state = MutArc::own(MergeState { observer: Some(observer), live: 2 });
    let ua = self.a.actual_subscribe(MergeObserver { state: state.clone() });
    let ub = self.b.actual_subscribe(MergeObserver { state });
    ZipSubscription::new(ua, ub)
  }
}

impl<Item, Err, S1, S2> ObservableExt<Item, Err> for MergeOp<S1, S2> where
  S1: ObservableExt<Item, Err>
{
}

struct MergeState<O> {
  observer: Option<O>,
  live: usize,
}

pub struct MergeObserver<O> {
  state: MutArc<MergeState<O>>,
}

impl<Item, Err, O> Observer<Item, Err> for MergeObserver<O>
where
  O: Observer<Item, Err>,
{
  // the state lock is the serialization gate shared by both sources
  fn next(&mut self, value: Item) {
    if let Some(observer) = self.state.rc_deref_mut().observer.as_mut() {
      observer.next(value)
    }
  }

  fn error(self, err: Err) {
    let taken = self.state.rc_deref_mut().observer.take();
    if let Some(observer) = taken {
      observer.error(err)
    }
  }

  fn complete(self) {
    let taken = {
      let mut state = self.state.rc_deref_mut();
      state.live -= 1;
      if state.live == 0 {
        state.observer.take()
      } else {
        None
      }
    };
    if let Some(observer) = taken {
      observer.complete()
    }
  }

  fn is_finished(&self) -> bool {
    self.state.rc_deref().observer.as_ref().map_or(true, |o| o.is_finished())
  }
}
