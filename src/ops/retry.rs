use crate::{
  observable::{Observable, ObservableExt},
  observer::Observer,
  rc::MutArc,
  subject::Subject,
  subscription::{SerialSubscription, SharedSubscription, Subscription},
  type_hint::TypeHint,
};

/// Resubscribes a cloneable source after an error, up to `max_retries`
/// times (`None` retries forever). The serial slot means a downstream
/// cancel kills whichever attempt is live.
#[derive(Clone)]
pub struct RetryOp<S> {
  pub(crate) source: S,
  pub(crate) max_retries: Option<usize>,
}

impl<Item, Err, O, S> Observable<Item, Err, O> for RetryOp<S>
where
  O: Observer<Item, Err>,
  S: Observable<Item, Err, RetryObserver<O, S>> + Clone,
  S::Unsub: Send + 'static,
{
  type Unsub = SerialSubscription;

  fn actual_subscribe(self, observer: O) -> Self::Unsub {
    let slot = SerialSubscription::default();
    let attempt = self.source.clone();
    let retry = RetryObserver {
      observer,
      source: self.source,
      remaining: self.max_retries,
      slot: slot.clone(),
    };
    slot.swap(attempt.actual_subscribe(retry));
    slot
  }
}

impl<Item, Err, S> ObservableExt<Item, Err> for RetryOp<S> where S: ObservableExt<Item, Err> {}

pub struct RetryObserver<O, S> {
  observer: O,
  source: S,
  remaining: Option<usize>,
  slot: SerialSubscription,
}

impl<Item, Err, O, S> Observer<Item, Err> for RetryObserver<O, S>
where
  O: Observer<Item, Err>,
  S: Observable<Item, Err, RetryObserver<O, S>> + Clone,
  S::Unsub: Send + 'static,
{
  fn next(&mut self, value: Item) {
    self.observer.next(value)
  }

  fn error(self, err: Err) {
    if self.slot.is_closed() {
      return;
    }
    match self.remaining {
      Some(0) => self.observer.error(err),
      remaining => {
        let attempt = self.source.clone();
        let retry = RetryObserver {
          observer: self.observer,
          source: self.source,
          remaining: remaining.map(|r| r - 1),
          slot: self.slot.clone(),
        };
        self.slot.swap(attempt.actual_subscribe(retry));
      }
    }
  }

  fn complete(self) {
    self.observer.complete()
  }

  fn is_finished(&self) -> bool {
    self.observer.is_finished()
  }
}

/// Resubscribes after an error until the predicate says the error is
/// final.
#[derive(Clone)]
pub struct RetryUntilOp<S, P> {
  pub(crate) source: S,
  pub(crate) predicate: P,
}

impl<Item, Err, O, S, P> Observable<Item, Err, O> for RetryUntilOp<S, P>
where
  O: Observer<Item, Err>,
  S: Observable<Item, Err, RetryUntilObserver<O, S, P>> + Clone,
  S::Unsub: Send + 'static,
  P: FnMut(&Err) -> bool,
{
  type Unsub = SerialSubscription;

  fn actual_subscribe(self, observer: O) -> Self::Unsub {
    let slot = SerialSubscription::default();
    let attempt = self.source.clone();
    let retry = RetryUntilObserver {
      observer,
      source: self.source,
      predicate: self.predicate,
      slot: slot.clone(),
    };
    slot.swap(attempt.actual_subscribe(retry));
    slot
  }
}

impl<Item, Err, S, P> ObservableExt<Item, Err> for RetryUntilOp<S, P> where
  S: ObservableExt<Item, Err>
{
}

pub struct RetryUntilObserver<O, S, P> {
  observer: O,
  source: S,
  predicate: P,
  slot: SerialSubscription,
}

impl<Item, Err, O, S, P> Observer<Item, Err> for RetryUntilObserver<O, S, P>
where
  O: Observer<Item, Err>,
  S: Observable<Item, Err, RetryUntilObserver<O, S, P>> + Clone,
  S::Unsub: Send + 'static,
  P: FnMut(&Err) -> bool,
{
  fn next(&mut self, value: Item) {
    self.observer.next(value)
  }

  fn error(mut self, err: Err) {
    if self.slot.is_closed() {
      return;
    }
    if (self.predicate)(&err) {
      self.observer.error(err)
    } else {
      let attempt = self.source.clone();
      let retry = RetryUntilObserver {
        observer: self.observer,
        source: self.source,
        predicate: self.predicate,
        slot: self.slot.clone(),
      };
      self.slot.swap(attempt.actual_subscribe(retry));
    }
  }

  fn complete(self) {
    self.observer.complete()
  }

  fn is_finished(&self) -> bool {
    self.observer.is_finished()
  }
}

/// Routes error terminals into a subject; whatever stream the handler
/// derives from that subject drives the loop — a signal item means
/// "resubscribe", a signal terminal is forwarded downstream.
#[derive(Clone)]
pub struct RetryWhenOp<S, H> {
  pub(crate) source: S,
  pub(crate) handler: H,
}

pub(crate) struct RedoCore<O, S, Sig, Err> {
  pub(crate) observer: MutArc<Option<O>>,
  pub(crate) source: S,
  pub(crate) slot: SerialSubscription,
  pub(crate) signals: Subject<Sig, Err>,
}

impl<O, S: Clone, Sig, Err> Clone for RedoCore<O, S, Sig, Err> {
  fn clone(&self) -> Self {
    RedoCore {
      observer: self.observer.clone(),
      source: self.source.clone(),
      slot: self.slot.clone(),
      signals: self.signals.clone(),
    }
  }
}

impl<Item, Err, O, S, H, Signal> Observable<Item, Err, O> for RetryWhenOp<S, H>
where
  O: Observer<Item, Err>,
  S: Observable<Item, Err, RedoSourceObserver<O, S, Err>> + Clone,
  S::Unsub: Send + 'static,
  Err: Clone + Send + 'static,
  H: FnOnce(Subject<Err, Err>) -> Signal,
  Signal: Observable<Err, Err, RedoSignalObserver<O, S, Item, Err>>,
  Signal::Unsub: Send + 'static,
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
        .actual_subscribe(RedoSignalObserver { core: core.clone(), _hint: TypeHint::new() }),
    );
    let attempt = core.source.clone();
    core.slot.swap(attempt.actual_subscribe(RedoSourceObserver { core: core.clone() }));
    subscription.add(core.slot.clone());
    subscription
  }
}

impl<Item, Err, S, H> ObservableExt<Item, Err> for RetryWhenOp<S, H> where
  S: ObservableExt<Item, Err>
{
}

pub struct RedoSourceObserver<O, S, Err> {
  core: RedoCore<O, S, Err, Err>,
}

impl<Item, Err, O, S> Observer<Item, Err> for RedoSourceObserver<O, S, Err>
where
  O: Observer<Item, Err>,
  S: Clone,
  Err: Clone + Send + 'static,
{
  fn next(&mut self, value: Item) {
    self.core.observer.next(value)
  }

  fn error(self, err: Err) {
    // hand the terminal to the signal loop, which decides whether to redo
    let mut signals = self.core.signals.clone();
    signals.next(err);
  }

  fn complete(self) {
    self.core.observer.complete()
  }

  fn is_finished(&self) -> bool {
    self.core.observer.is_finished()
  }
}

pub struct RedoSignalObserver<O, S, Item, Err> {
  core: RedoCore<O, S, Err, Err>,
  _hint: TypeHint<Item>,
}

impl<Sig, Item, Err, O, S> Observer<Sig, Err> for RedoSignalObserver<O, S, Item, Err>
where
  O: Observer<Item, Err>,
  S: Observable<Item, Err, RedoSourceObserver<O, S, Err>> + Clone,
  S::Unsub: Send + 'static,
  Err: Clone + Send + 'static,
{
  fn next(&mut self, _signal: Sig) {
    let attempt = self.core.source.clone();
    let observer = RedoSourceObserver { core: self.core.clone() };
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

#[cfg(test)]
mod test {
  use crate::{
    prelude::*,
    rc::{CellArc, SharedCell},
  };

  #[test]
  fn retries_the_budgeted_number_of_times() {
    let attempts = CellArc::own(0u32);
    let c = attempts.clone();
    let errs = MutArc::own(0);
    let ce = errs.clone();
    observable::defer(move || {
      c.set(c.get() + 1);
      observable::throw::<i32, &str>("fail")
    })
    .retry(2)
    .subscribe_err(|_| {}, move |_| *ce.rc_deref_mut() += 1);

    assert_eq!(attempts.get(), 3);
    assert_eq!(*errs.rc_deref(), 1);
  }

  #[test]
  fn success_after_failures_completes() {
    let attempts = CellArc::own(0u32);
    let c = attempts.clone();
    let seen = MutArc::own(Vec::new());
    let cs = seen.clone();
    observable::defer(move || {
      c.set(c.get() + 1);
      let attempt = c.get();
      observable::of_fn(move || if attempt < 3 { Err("not yet") } else { Ok(42) })
    })
    .retry(5)
    .subscribe_err(move |v| cs.rc_deref_mut().push(v), |_: &str| {});

    assert_eq!(*seen.rc_deref(), vec![42]);
    assert_eq!(attempts.get(), 3);
  }

  #[test]
  fn retry_until_stops_on_a_final_error() {
    let attempts = CellArc::own(0u32);
    let c = attempts.clone();
    let err = MutArc::own(None);
    let ce = err.clone();
    observable::defer(move || {
      c.set(c.get() + 1);
      let n = c.get();
      observable::throw::<i32, u32>(n)
    })
    .retry_until(|e| *e >= 3)
    .subscribe_err(|_| {}, move |e| *ce.rc_deref_mut() = Some(e));

    assert_eq!(attempts.get(), 3);
    assert_eq!(*err.rc_deref(), Some(3));
  }

  #[test]
  fn retry_when_redoes_on_signal_and_stops_on_signal_complete() {
    let attempts = CellArc::own(0u32);
    let c = attempts.clone();
    let done = MutArc::own(false);
    let cd = done.clone();
    observable::defer(move || {
      c.set(c.get() + 1);
      observable::throw::<i32, &str>("fail")
    })
    .retry_when(|errors| errors.take(2))
    .subscribe_complete(|_| {}, move || *cd.rc_deref_mut() = true);

    // initial attempt + two signalled redos, then the signal stream ends
    assert_eq!(attempts.get(), 3);
    assert!(*done.rc_deref());
  }
}
