use crate::{
  observable::{Observable, ObservableExt},
  observer::Observer,
  ops::retry::RedoCore,
  rc::MutArc,
  subject::Subject,
  subscription::{SerialSubscription, SharedSubscription, Subscription},
  type_hint::TypeHint,
};

/// Replays a cloneable source `count` times in total (`None` = forever),
/// resubscribing on every completion.
#[derive(Clone)]
pub struct RepeatOp<S> {
  pub(crate) source: S,
  pub(crate) count: Option<usize>,
}

impl<Item, Err, O, S> Observable<Item, Err, O> for RepeatOp<S>
where
  O: Observer<Item, Err>,
  S: Observable<Item, Err, RepeatObserver<O, S>> + Clone,
  S::Unsub: Send + 'static,
{
  type Unsub = SerialSubscription;

  fn actual_subscribe(self, observer: O) -> Self::Unsub {
    let slot = SerialSubscription::default();
    if self.count == Some(0) {
      observer.complete();
      return slot;
    }
    let attempt = self.source.clone();
    let repeat = RepeatObserver {
      observer,
      source: self.source,
      remaining: self.count.map(|c| c - 1),
      slot: slot.clone(),
    };
    slot.swap(attempt.actual_subscribe(repeat));
    slot
  }
}

impl<Item, Err, S> ObservableExt<Item, Err> for RepeatOp<S> where S: ObservableExt<Item, Err> {}

pub struct RepeatObserver<O, S> {
  observer: O,
  source: S,
  remaining: Option<usize>,
  slot: SerialSubscription,
}

impl<Item, Err, O, S> Observer<Item, Err> for RepeatObserver<O, S>
where
  O: Observer<Item, Err>,
  S: Observable<Item, Err, RepeatObserver<O, S>> + Clone,
  S::Unsub: Send + 'static,
{
  fn next(&mut self, value: Item) {
    self.observer.next(value)
  }

  fn error(self, err: Err) {
    self.observer.error(err)
  }

  fn complete(self) {
    if self.slot.is_closed() {
      return;
    }
    match self.remaining {
      Some(0) => self.observer.complete(),
      remaining => {
        let attempt = self.source.clone();
        let repeat = RepeatObserver {
          observer: self.observer,
          source: self.source,
          remaining: remaining.map(|r| r - 1),
          slot: self.slot.clone(),
        };
        self.slot.swap(attempt.actual_subscribe(repeat));
      }
    }
  }

  fn is_finished(&self) -> bool {
    self.observer.is_finished()
  }
}

/// Resubscribes after every completion until the predicate says to stop.
#[derive(Clone)]
pub struct RepeatUntilOp<S, P> {
  pub(crate) source: S,
  pub(crate) predicate: P,
}

impl<Item, Err, O, S, P> Observable<Item, Err, O> for RepeatUntilOp<S, P>
where
  O: Observer<Item, Err>,
  S: Observable<Item, Err, RepeatUntilObserver<O, S, P>> + Clone,
  S::Unsub: Send + 'static,
  P: FnMut() -> bool,
{
  type Unsub = SerialSubscription;

  fn actual_subscribe(self, observer: O) -> Self::Unsub {
    let slot = SerialSubscription::default();
    let attempt = self.source.clone();
    let repeat = RepeatUntilObserver {
      observer,
      source: self.source,
      predicate: self.predicate,
      slot: slot.clone(),
    };
    slot.swap(attempt.actual_subscribe(repeat));
    slot
  }
}

impl<Item, Err, S, P> ObservableExt<Item, Err> for RepeatUntilOp<S, P> where
  S: ObservableExt<Item, Err>
{
}

pub struct RepeatUntilObserver<O, S, P> {
  observer: O,
  source: S,
  predicate: P,
  slot: SerialSubscription,
}

impl<Item, Err, O, S, P> Observer<Item, Err> for RepeatUntilObserver<O, S, P>
where
  O: Observer<Item, Err>,
  S: Observable<Item, Err, RepeatUntilObserver<O, S, P>> + Clone,
  S::Unsub: Send + 'static,
  P: FnMut() -> bool,
{
  fn next(&mut self, value: Item) {
    self.observer.next(value)
  }

  fn error(self, err: Err) {
    self.observer.error(err)
  }

  fn complete(mut self) {
    if self.slot.is_closed() {
      return;
    }
    if (self.predicate)() {
      self.observer.complete()
    } else {
      let attempt = self.source.clone();
      let repeat = RepeatUntilObserver {
        observer: self.observer,
        source: self.source,
        predicate: self.predicate,
        slot: self.slot.clone(),
      };
      self.slot.swap(attempt.actual_subscribe(repeat));
    }
  }

  fn is_finished(&self) -> bool {
    self.observer.is_finished()
  }
}

/// Routes completion terminals into a subject; the stream the handler
/// derives from it drives resubscription, exactly like `retry_when` for
/// errors.
#[derive(Clone)]
pub struct RepeatWhenOp<S, H> {
  pub(crate) source: S,
  pub(crate) handler: H,
}

pub struct RepeatSourceObserver<O, S, Err> {
  core: RedoCore<O, S, (), Err>,
}

impl<Item, Err, O, S> Observer<Item, Err> for RepeatSourceObserver<O, S, Err>
where
  O: Observer<Item, Err>,
  S: Clone,
  Err: Clone,
{
  fn next(&mut self, value: Item) {
    self.core.observer.next(value)
  }

  fn error(self, err: Err) {
    self.core.observer.error(err)
  }

  fn complete(self) {
    let mut signals = self.core.signals.clone();
    signals.next(());
  }

  fn is_finished(&self) -> bool {
    self.core.observer.is_finished()
  }
}

pub struct RepeatSignalObserver<O, S, Item, Err> {
  core: RedoCore<O, S, (), Err>,
  _hint: TypeHint<Item>,
}

impl<Sig, Item, Err, O, S> Observer<Sig, Err> for RepeatSignalObserver<O, S, Item, Err>
where
  O: Observer<Item, Err>,
  S: Observable<Item, Err, RepeatSourceObserver<O, S, Err>> + Clone,
  S::Unsub: Send + 'static,
  Err: Clone,
{
  fn next(&mut self, _signal: Sig) {
    let attempt = self.core.source.clone();
    let observer = RepeatSourceObserver { core: self.core.clone() };
    self.core.slot.swap(attempt.actual_subscribe(observer));
  }

  fn error(self, err: Err) {
    self.core.observer.error(err)
  }

  fn complete(self) {
    self.core.observer.complete()
  }

  fn is_finished(&self) -> bool {
    self.core.observer.is_finished()
  }
}

impl<Item, Err, O, S, H, Signal> Observable<Item, Err, O> for RepeatWhenOp<S, H>
where
  O: Observer<Item, Err>,
  S: Observable<Item, Err, RepeatSourceObserver<O, S, Err>> + Clone,
  S::Unsub: Send + 'static,
  H: FnOnce(Subject<(), Err>) -> Signal,
  Signal: Observable<(), Err, RepeatSignalObserver<O, S, Item, Err>>,
  Signal::Unsub: Send + 'static,
  Err: Clone + Send + 'static,
{
  type Unsub = SharedSubscription;

  fn actual_subscribe(self, observer: O) -> Self::Unsub {
    let signals = Subject::new();
    let core = RedoCore {
      observer: MutArc::own(Some(observer)),
      source: self.source,
      slot: SerialSubscription::default(),
      signals: signals.clone(),
    };
    let signal_stream = (self.handler)(signals);
    let subscription = SharedSubscription::default();
    subscription.add(
      signal_stream
        .actual_subscribe(RepeatSignalObserver { core: core.clone(), _hint: TypeHint::new() }),
    );
    let attempt = core.source.clone();
    subscription.add(core.slot.clone());
    core.slot.clone().swap(attempt.actual_subscribe(RepeatSourceObserver { core }));
    subscription
  }
}

impl<Item, Err, S, H> ObservableExt<Item, Err> for RepeatWhenOp<S, H> where
  S: ObservableExt<Item, Err>
{
}

#[cfg(test)]
mod test {
  use crate::prelude::*;

  #[test]
  fn plays_the_source_n_times() {
    let mut seen = Vec::new();
    let mut done = false;
    observable::from_iter::<_, ()>([1, 2])
      .repeat(3)
      .subscribe_complete(|v| seen.push(v), || done = true);
    assert_eq!(seen, vec![1, 2, 1, 2, 1, 2]);
    assert!(done);
  }

  #[test]
  fn repeat_zero_is_empty() {
    let mut seen = Vec::new();
    let mut done = false;
    observable::from_iter::<_, ()>([1])
      .repeat(0)
      .subscribe_complete(|v| seen.push(v), || done = true);
    assert!(seen.is_empty());
    assert!(done);
  }

  #[test]
  fn repeat_until_consults_the_predicate() {
    let mut rounds = 0;
    let mut seen = Vec::new();
    observable::from_iter::<_, ()>([1])
      .repeat_until(move || {
        rounds += 1;
        rounds == 3
      })
      .subscribe(|v| seen.push(v));
    assert_eq!(seen, vec![1, 1, 1]);
  }

  #[test]
  fn repeat_when_stops_with_the_signal() {
    let seen = MutArc::own(Vec::new());
    let c = seen.clone();
    observable::from_iter::<_, ()>([7])
      .repeat_when(|completions| completions.take(1))
      .subscribe(move |v| c.rc_deref_mut().push(v));
    assert_eq!(*seen.rc_deref(), vec![7, 7]);
  }
}
