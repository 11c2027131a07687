use crate::{
  observable::{Observable, ObservableExt},
  observer::Observer,
  rc::{CellArc, MutArc, RcDerefMut, SharedCell},
  subject::{ReplaySubject, SubjectSubscription},
  subscription::BoxSubscription,
};

/// Unbounded replay that subscribes its upstream on the first subscriber
/// and never lets go: every subscriber, however late, sees the full
/// history and then the live stream.
pub struct CacheOp<S, Item, Err> {
  source: MutArc<Option<S>>,
  subject: ReplaySubject<Item, Err>,
  connected: CellArc<bool>,
  upstream: MutArc<Option<BoxSubscription>>,
}

impl<S, Item, Err> CacheOp<S, Item, Err> {
  pub(crate) fn new(source: S) -> Self {
    CacheOp {
      source: MutArc::own(Some(source)),
      subject: ReplaySubject::unbounded(),
      connected: CellArc::own(false),
      upstream: MutArc::own(None),
    }
  }
}

impl<S, Item, Err> Clone for CacheOp<S, Item, Err> {
  fn clone(&self) -> Self {
    CacheOp {
      source: self.source.clone(),
      subject: self.subject.clone(),
      connected: self.connected.clone(),
      upstream: self.upstream.clone(),
    }
  }
}

impl<Item, Err, O, S> Observable<Item, Err, O> for CacheOp<S, Item, Err>
where
  O: Observer<Item, Err> + Send + 'static,
  Item: Clone + Send + 'static,
  Err: Clone + Send + 'static,
  S: Observable<Item, Err, ReplaySubject<Item, Err>>,
  S::Unsub: Send + 'static,
{
  type Unsub = SubjectSubscription<Item, Err>;

  fn actual_subscribe(self, observer: O) -> Self::Unsub {
    let unsub = self.subject.clone().actual_subscribe(observer);
    if self.connected.compare_set(false, true) {
      let taken = self.source.rc_deref_mut().take();
      if let Some(source) = taken {
        let upstream = source.actual_subscribe(self.subject.clone());
        *self.upstream.rc_deref_mut() = Some(BoxSubscription::new(upstream));
      }
    }
    unsub
  }
}

impl<Item, Err, S> ObservableExt<Item, Err> for CacheOp<S, Item, Err> where
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
  fn source_runs_once_and_history_replays() {
    let runs = CellArc::own(0u32);
    let c = runs.clone();
    let cached = observable::defer(move || {
      c.set(c.get() + 1);
      observable::from_iter::<_, ()>([1, 2, 3])
    })
    .cache();

    let (a, b) = (MutArc::own(Vec::new()), MutArc::own(Vec::new()));
    let (ca, cb) = (a.clone(), b.clone());
    cached.clone().subscribe(move |v| ca.rc_deref_mut().push(v));
    cached.clone().subscribe(move |v| cb.rc_deref_mut().push(v));

    assert_eq!(runs.get(), 1);
    assert_eq!(*a.rc_deref(), vec![1, 2, 3]);
    assert_eq!(*b.rc_deref(), vec![1, 2, 3]);
  }
}
