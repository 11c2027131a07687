//! Demand-signalling bridge.
//!
//! The core contract is push-only: a producer emits as fast as it likes.
//! This module bridges it to a publisher/subscriber shape where the
//! consumer authorizes emissions with `request(n)` and may `cancel()`.
//! Converting an unbounded stream applies one of four overflow policies;
//! converting back simply requests unbounded demand.

use std::{collections::VecDeque, sync::Arc};

use crate::{
  error::OverflowError,
  hook,
  observable::{Observable, ObservableExt},
  observer::Observer,
  rc::{MutArc, RcDeref, RcDerefMut},
  subscription::{BoxSubscription, SingleSubscription, Subscription, TeardownSubscription},
};

/// What to do with an item that arrives while the downstream has no
/// outstanding demand.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum BackpressureStrategy {
  /// Queue without bound until demand arrives.
  Buffer,
  /// Discard it.
  Drop,
  /// Keep only the most recent one.
  Latest,
  /// Terminate the stream with [`OverflowError`].
  Error,
}

/// The demand side of a flow subscription: `request(n)` authorizes up to
/// `n` more emissions, `cancel()` ends the subscription.
#[derive(Clone)]
pub struct Demand {
  add_request: Arc<dyn Fn(u64) + Send + Sync>,
  do_cancel: Arc<dyn Fn() + Send + Sync>,
}

impl Demand {
  pub fn request(&self, n: u64) {
    if n == 0 {
      hook::dropped_signal("non-positive demand request", None);
      return;
    }
    (self.add_request)(n)
  }

  pub fn cancel(&self) {
    (self.do_cancel)()
  }
}

/// The consumer half of the demand-signalling handshake.
pub trait FlowObserver<Item, Err> {
  fn on_subscribe(&mut self, demand: Demand);
  fn next(&mut self, value: Item);
  fn error(self, err: Err);
  fn complete(self);
}

/// Anything that can feed a [`FlowObserver`] under demand signalling.
pub trait FlowPublisher<Item, Err> {
  fn subscribe_flow<FO>(self, observer: FO)
  where
    FO: FlowObserver<Item, Err> + Send + 'static;
}

enum FlowTerminal<Err> {
  Complete,
  Error(Err),
}

struct FlowState<FO, Item, Err> {
  observer: Option<FO>,
  queue: VecDeque<Item>,
  latest: Option<Item>,
  terminal: Option<FlowTerminal<Err>>,
  requested: u64,
  emitting: bool,
  cancelled: bool,
  done: bool,
}

type Shared<FO, Item, Err> = MutArc<FlowState<FO, Item, Err>>;

enum Step<FO, Item, Err> {
  Deliver(FO, Item),
  Terminal(FO, FlowTerminal<Err>),
  Idle,
}

// single-drainer loop: whoever finds `emitting` clear works the queue off
// while demand lasts, terminal after the last deliverable item. The
// observer is taken out around each call so a consumer that re-requests
// from inside `next` does not re-enter the lock.
fn drain<FO, Item, Err>(state: &Shared<FO, Item, Err>, strategy: BackpressureStrategy)
where
  FO: FlowObserver<Item, Err>,
{
  {
    let mut guard = state.rc_deref_mut();
    if guard.emitting {
      return;
    }
    guard.emitting = true;
  }
  loop {
    let step = {
      let mut guard = state.rc_deref_mut();
      if guard.cancelled {
        guard.emitting = false;
        return;
      }
      let next_item = if guard.requested > 0 {
        match strategy {
          BackpressureStrategy::Latest => guard.latest.take(),
          _ => guard.queue.pop_front(),
        }
      } else {
        None
      };
      match next_item {
        Some(value) => match guard.observer.take() {
          Some(observer) => {
            guard.requested -= 1;
            Step::Deliver(observer, value)
          }
          None => Step::Idle,
        },
        None => {
          let drained = guard.queue.is_empty() && guard.latest.is_none();
          if drained && guard.terminal.is_some() {
            match (guard.observer.take(), guard.terminal.take()) {
              (Some(observer), Some(terminal)) => {
                guard.done = true;
                guard.emitting = false;
                Step::Terminal(observer, terminal)
              }
              _ => Step::Idle,
            }
          } else {
            Step::Idle
          }
        }
      }
    };
    match step {
      Step::Deliver(mut observer, value) => {
        observer.next(value);
        let mut guard = state.rc_deref_mut();
        if guard.cancelled || guard.done {
          guard.emitting = false;
          return;
        }
        guard.observer = Some(observer);
      }
      Step::Terminal(observer, terminal) => {
        match terminal {
          FlowTerminal::Complete => observer.complete(),
          FlowTerminal::Error(err) => observer.error(err),
        }
        return;
      }
      Step::Idle => {
        state.rc_deref_mut().emitting = false;
        return;
      }
    }
  }
}

/// An unbounded stream wearing the demand-signalling contract, per one of
/// the [`BackpressureStrategy`] policies.
#[derive(Clone)]
pub struct FlowBridge<S> {
  source: S,
  strategy: BackpressureStrategy,
}

impl<S> FlowBridge<S> {
  pub(crate) fn new(source: S, strategy: BackpressureStrategy) -> Self {
    FlowBridge { source, strategy }
  }
}

impl<Item, Err, S> FlowPublisher<Item, Err> for FlowBridge<S>
where
  Item: Send + 'static,
  Err: From<OverflowError> + Send + 'static,
  S: Observable<Item, Err, BridgeObserver<Item, Err>>,
  S::Unsub: Send + 'static,
{
  fn subscribe_flow<FO>(self, mut observer: FO)
  where
    FO: FlowObserver<Item, Err> + Send + 'static,
  {
    let state: Shared<FO, Item, Err> = MutArc::own(FlowState {
      observer: None,
      queue: VecDeque::new(),
      latest: None,
      terminal: None,
      requested: 0,
      emitting: false,
      cancelled: false,
      done: false,
    });
    let upstream: MutArc<Option<BoxSubscription>> = MutArc::own(None);
    let strategy = self.strategy;

    let request_state = state.clone();
    let cancel_state = state.clone();
    let cancel_upstream = upstream.clone();
    let demand = Demand {
      add_request: Arc::new(move |n| {
        {
          let mut guard = request_state.rc_deref_mut();
          guard.requested = guard.requested.saturating_add(n);
        }
        drain(&request_state, strategy);
      }),
      do_cancel: Arc::new(move || {
        {
          let mut guard = cancel_state.rc_deref_mut();
          guard.cancelled = true;
          guard.observer = None;
          guard.queue.clear();
          guard.latest = None;
        }
        let taken = cancel_upstream.rc_deref_mut().take();
        if let Some(unsub) = taken {
          unsub.unsubscribe();
        }
      }),
    };
    observer.on_subscribe(demand);
    state.rc_deref_mut().observer = Some(observer);

    // erase the observer type behind a plain observer the source knows
    let bridge = BridgeObserver { sink: FlowSink::new(state.clone(), strategy) };
    let unsub = self.source.actual_subscribe(bridge);
    *upstream.rc_deref_mut() = Some(BoxSubscription::new(unsub));
    if state.rc_deref().cancelled {
      let taken = upstream.rc_deref_mut().take();
      if let Some(unsub) = taken {
        unsub.unsubscribe();
      }
    }
  }
}

trait FlowSinkObj<Item, Err>: Send {
  fn sink_next(&mut self, value: Item);
  fn sink_terminal(&mut self, terminal: FlowTerminal<Err>);
  fn sink_finished(&self) -> bool;
}

struct TypedSink<FO, Item, Err> {
  state: Shared<FO, Item, Err>,
  strategy: BackpressureStrategy,
}

impl<FO, Item, Err> FlowSinkObj<Item, Err> for TypedSink<FO, Item, Err>
where
  FO: FlowObserver<Item, Err> + Send,
  Item: Send,
  Err: From<OverflowError> + Send,
{
  fn sink_next(&mut self, value: Item) {
    {
      let mut guard = self.state.rc_deref_mut();
      if guard.cancelled || guard.terminal.is_some() {
        return;
      }
      match self.strategy {
        BackpressureStrategy::Buffer => guard.queue.push_back(value),
        BackpressureStrategy::Latest => guard.latest = Some(value),
        BackpressureStrategy::Drop => {
          let deliverable = (guard.queue.len() as u64) < guard.requested;
          if deliverable {
            guard.queue.push_back(value);
          }
        }
        BackpressureStrategy::Error => {
          let deliverable = (guard.queue.len() as u64) < guard.requested;
          if deliverable {
            guard.queue.push_back(value);
          } else {
            guard.terminal = Some(FlowTerminal::Error(Err::from(OverflowError)));
            guard.queue.clear();
          }
        }
      }
    }
    drain(&self.state, self.strategy);
  }

  fn sink_terminal(&mut self, terminal: FlowTerminal<Err>) {
    {
      let mut guard = self.state.rc_deref_mut();
      if guard.cancelled || guard.terminal.is_some() {
        return;
      }
      guard.terminal = Some(terminal);
    }
    drain(&self.state, self.strategy);
  }

  fn sink_finished(&self) -> bool {
    let guard = self.state.rc_deref();
    guard.cancelled || guard.done || guard.terminal.is_some()
  }
}

struct FlowSink<Item, Err>(Box<dyn FlowSinkObj<Item, Err>>);

impl<Item, Err> FlowSink<Item, Err> {
  fn new<FO>(state: Shared<FO, Item, Err>, strategy: BackpressureStrategy) -> Self
  where
    FO: FlowObserver<Item, Err> + Send + 'static,
    Item: Send + 'static,
    Err: From<OverflowError> + Send + 'static,
  {
    FlowSink(Box::new(TypedSink { state, strategy }))
  }
}

/// The plain observer the upstream sees; it feeds the policy queue.
pub struct BridgeObserver<Item, Err> {
  sink: FlowSink<Item, Err>,
}

impl<Item, Err> Observer<Item, Err> for BridgeObserver<Item, Err> {
  fn next(&mut self, value: Item) {
    self.sink.0.sink_next(value);
  }

  fn error(mut self, err: Err) {
    self.sink.0.sink_terminal(FlowTerminal::Error(err));
  }

  fn complete(mut self) {
    self.sink.0.sink_terminal(FlowTerminal::Complete);
  }

  fn is_finished(&self) -> bool {
    self.sink.0.sink_finished()
  }
}

/// Adapts a demand-signalling publisher back to a plain stream by
/// requesting unbounded demand up front.
pub fn from_flow<P>(publisher: P) -> FromFlowObservable<P> {
  FromFlowObservable { publisher }
}

#[derive(Clone)]
pub struct FromFlowObservable<P> {
  publisher: P,
}

pub struct FlowForwardObserver<O> {
  observer: Option<O>,
  demand: MutArc<Option<Demand>>,
}

impl<Item, Err, O> FlowObserver<Item, Err> for FlowForwardObserver<O>
where
  O: Observer<Item, Err>,
{
  fn on_subscribe(&mut self, demand: Demand) {
    demand.request(u64::MAX);
    *self.demand.rc_deref_mut() = Some(demand);
  }

  fn next(&mut self, value: Item) {
    if let Some(observer) = self.observer.as_mut() {
      observer.next(value)
    }
  }

  fn error(mut self, err: Err) {
    if let Some(observer) = self.observer.take() {
      observer.error(err)
    }
  }

  fn complete(mut self) {
    if let Some(observer) = self.observer.take() {
      observer.complete()
    }
  }
}

impl<Item, Err, O, P> Observable<Item, Err, O> for FromFlowObservable<P>
where
  O: Observer<Item, Err> + Send + 'static,
  P: FlowPublisher<Item, Err>,
{
  type Unsub = BoxSubscription;

  fn actual_subscribe(self, observer: O) -> Self::Unsub {
    let demand = MutArc::own(None);
    let forward = FlowForwardObserver { observer: Some(observer), demand: demand.clone() };
    self.publisher.subscribe_flow(forward);
    if demand.rc_deref().is_none() {
      return BoxSubscription::new(SingleSubscription);
    }
    BoxSubscription::new(TeardownSubscription::new(move || {
      let taken = demand.rc_deref_mut().take();
      if let Some(demand) = taken {
        demand.cancel();
      }
    }))
  }
}

impl<Item, Err, P> ObservableExt<Item, Err> for FromFlowObservable<P> {}
