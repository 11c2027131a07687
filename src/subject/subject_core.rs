//! The multicast engine behind every subject flavour.
//!
//! All mutations funnel through a signal queue guarded by a drain flag:
//! whichever caller finds the flag clear becomes the drainer and works the
//! queue off; everyone else (including re-entrant calls made from inside a
//! delivery) just enqueues and returns. Deliveries therefore stay
//! serialized and loss-free without holding the state lock across user
//! code.

use std::{
  collections::VecDeque,
  sync::Arc,
  time::{Duration, Instant},
};

use crate::{
  observer::{BoxObserver, Observer},
  rc::{CellArc, MutArc, RcDerefMut, SharedCell},
};

/// What a subject retains for subscribers that arrive later.
#[derive(Clone)]
pub(crate) enum ReplayPolicy {
  /// Keep nothing (publish subject, windows).
  None,
  Unbounded,
  Size(usize),
  Time(Duration),
  SizeAndTime(usize, Duration),
}

type Clock = Arc<dyn Fn() -> Instant + Send + Sync>;

enum Signal<Item, Err> {
  Next(Item),
  Error(Err),
  Complete,
  Subscribe(u64, BoxObserver<Item, Err>),
  Unsubscribe(u64),
}

enum Terminal<Err> {
  Error(Err),
  Complete,
}

struct Slot<Item, Err> {
  id: u64,
  observer: BoxObserver<Item, Err>,
}

struct CoreState<Item, Err> {
  observers: Vec<Slot<Item, Err>>,
  buffer: VecDeque<(Instant, Item)>,
  terminal: Option<Terminal<Err>>,
  signals: VecDeque<Signal<Item, Err>>,
  draining: bool,
  next_id: u64,
}

impl<Item, Err> Default for CoreState<Item, Err> {
  fn default() -> Self {
    CoreState {
      observers: Vec::new(),
      buffer: VecDeque::new(),
      terminal: None,
      signals: VecDeque::new(),
      draining: false,
      next_id: 0,
    }
  }
}

pub(crate) struct Multicast<Item, Err> {
  state: MutArc<CoreState<Item, Err>>,
  stopped: CellArc<bool>,
  policy: ReplayPolicy,
  clock: Clock,
}

impl<Item, Err> Clone for Multicast<Item, Err> {
  fn clone(&self) -> Self {
    Multicast {
      state: self.state.clone(),
      stopped: self.stopped.clone(),
      policy: self.policy.clone(),
      clock: self.clock.clone(),
    }
  }
}

impl<Item, Err> Multicast<Item, Err> {
  pub(crate) fn new(policy: ReplayPolicy) -> Self {
    Self::with_clock(policy, Arc::new(Instant::now))
  }

  pub(crate) fn with_clock(policy: ReplayPolicy, clock: Clock) -> Self {
    Multicast {
      state: MutArc::own(CoreState::default()),
      stopped: CellArc::own(false),
      policy,
      clock,
    }
  }

  /// Seed the replay buffer before anything subscribes (behavior subject).
  pub(crate) fn seed(&self, value: Item) {
    self.state.rc_deref_mut().buffer.push_back(((self.clock)(), value));
  }

  pub(crate) fn is_stopped(&self) -> bool {
    self.stopped.get()
  }

  /// Number of live subscribers; used by tests and by group eviction.
  pub(crate) fn observer_count(&self) -> usize {
    self.state.rc_deref_mut().observers.len()
  }
}

impl<Item: Clone, Err: Clone> Multicast<Item, Err> {
  pub(crate) fn emit(&self, value: Item) {
    self.push(Signal::Next(value));
  }

  pub(crate) fn emit_error(&self, err: Err) {
    self.stopped.set(true);
    self.push(Signal::Error(err));
  }

  pub(crate) fn emit_complete(&self) {
    self.stopped.set(true);
    self.push(Signal::Complete);
  }

  pub(crate) fn add_observer(&self, observer: BoxObserver<Item, Err>) -> u64 {
    let id = {
      let mut state = self.state.rc_deref_mut();
      state.next_id += 1;
      state.next_id
    };
    self.push(Signal::Subscribe(id, observer));
    id
  }

  pub(crate) fn remove_observer(&self, id: u64) {
    self.push(Signal::Unsubscribe(id));
  }

  fn push(&self, signal: Signal<Item, Err>) {
    let drainer = {
      let mut state = self.state.rc_deref_mut();
      state.signals.push_back(signal);
      if state.draining {
        false
      } else {
        state.draining = true;
        true
      }
    };
    if drainer {
      self.drain();
    }
  }

  fn drain(&self) {
    loop {
      let signal = {
        let mut state = self.state.rc_deref_mut();
        match state.signals.pop_front() {
          Some(signal) => Some(signal),
          None => {
            state.draining = false;
            None
          }
        }
      };
      let Some(signal) = signal else { return };
      self.dispatch(signal);
    }
  }

  // runs only on the drainer, with the state lock taken briefly around
  // each structural step and released around every observer call
  fn dispatch(&self, signal: Signal<Item, Err>) {
    match signal {
      Signal::Next(value) => {
        {
          let mut state = self.state.rc_deref_mut();
          if state.terminal.is_some() {
            return;
          }
          self.record(&mut state, value.clone());
        }
        let mut taken = {
          let mut state = self.state.rc_deref_mut();
          std::mem::take(&mut state.observers)
        };
        for slot in taken.iter_mut() {
          slot.observer.next(value.clone());
        }
        taken.retain(|slot| !slot.observer.is_finished());
        let mut state = self.state.rc_deref_mut();
        // subscribers that arrived during dispatch sit in the signal queue,
        // not in this list, so the splice keeps every order intact
        taken.append(&mut state.observers);
        state.observers = taken;
      }
      Signal::Error(err) => {
        let taken = {
          let mut state = self.state.rc_deref_mut();
          if state.terminal.is_some() {
            return;
          }
          state.terminal = Some(Terminal::Error(err.clone()));
          std::mem::take(&mut state.observers)
        };
        for slot in taken {
          slot.observer.error(err.clone());
        }
      }
      Signal::Complete => {
        let taken = {
          let mut state = self.state.rc_deref_mut();
          if state.terminal.is_some() {
            return;
          }
          state.terminal = Some(Terminal::Complete);
          std::mem::take(&mut state.observers)
        };
        for slot in taken {
          slot.observer.complete();
        }
      }
      Signal::Subscribe(id, mut observer) => {
        let (replay, terminal) = {
          let mut state = self.state.rc_deref_mut();
          self.evict(&mut state);
          let replay: Vec<Item> = state.buffer.iter().map(|(_, v)| v.clone()).collect();
          let terminal = match &state.terminal {
            Some(Terminal::Error(e)) => Some(Terminal::Error(e.clone())),
            Some(Terminal::Complete) => Some(Terminal::Complete),
            None => None,
          };
          (replay, terminal)
        };
        for value in replay {
          if observer.is_finished() {
            return;
          }
          observer.next(value);
        }
        match terminal {
          Some(Terminal::Error(e)) => observer.error(e),
          Some(Terminal::Complete) => observer.complete(),
          None => {
            let mut state = self.state.rc_deref_mut();
            state.observers.push(Slot { id, observer });
          }
        }
      }
      Signal::Unsubscribe(id) => {
        let mut state = self.state.rc_deref_mut();
        state.observers.retain(|slot| slot.id != id);
      }
    }
  }

  fn record(&self, state: &mut CoreState<Item, Err>, value: Item) {
    if matches!(self.policy, ReplayPolicy::None) {
      return;
    }
    state.buffer.push_back(((self.clock)(), value));
    self.evict(state);
  }

  fn evict(&self, state: &mut CoreState<Item, Err>) {
    match self.policy {
      ReplayPolicy::None | ReplayPolicy::Unbounded => {}
      ReplayPolicy::Size(n) => {
        while state.buffer.len() > n {
          state.buffer.pop_front();
        }
      }
      ReplayPolicy::Time(window) => {
        let now = (self.clock)();
        while state.buffer.front().map_or(false, |(at, _)| *at + window < now) {
          state.buffer.pop_front();
        }
      }
      ReplayPolicy::SizeAndTime(n, window) => {
        while state.buffer.len() > n {
          state.buffer.pop_front();
        }
        let now = (self.clock)();
        while state.buffer.front().map_or(false, |(at, _)| *at + window < now) {
          state.buffer.pop_front();
        }
      }
    }
  }
}
