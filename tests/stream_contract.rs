//! Contract-level tests: the subscribe handshake, terminal discipline,
//! cancellation, operator laws, and the end-to-end scenarios.

use std::time::Duration;

use fluxion::{of_sequence, prelude::*};
use quickcheck_macros::quickcheck;

/// Records every callback in order and can cancel itself mid-stream
/// through the handle received in `on_subscribe`.
struct Probe {
  log: MutArc<Vec<String>>,
  handle: Option<SharedSubscription>,
  cancel_on: Option<i32>,
}

impl Probe {
  fn new(log: MutArc<Vec<String>>, cancel_on: Option<i32>) -> Self {
    Probe { log, handle: None, cancel_on }
  }
}

impl Observer<i32, &'static str> for Probe {
  fn on_subscribe(&mut self, handle: SharedSubscription) {
    self.log.rc_deref_mut().push("on_subscribe".into());
    self.handle = Some(handle);
  }

  fn next(&mut self, value: i32) {
    self.log.rc_deref_mut().push(format!("next {value}"));
    if self.cancel_on == Some(value) {
      if let Some(handle) = self.handle.take() {
        handle.unsubscribe();
      }
    }
  }

  fn error(self, err: &'static str) {
    self.log.rc_deref_mut().push(format!("error {err}"));
  }

  fn complete(self) {
    self.log.rc_deref_mut().push("complete".into());
  }

  fn is_finished(&self) -> bool {
    false
  }
}

#[test]
fn handshake_precedes_everything_and_ends_once() {
  let log = MutArc::own(Vec::new());
  observable::from_iter::<_, &'static str>([1, 2]).subscribe_with(Probe::new(log.clone(), None));
  assert_eq!(*log.rc_deref(), vec!["on_subscribe", "next 1", "next 2", "complete"]);
}

#[test]
fn no_callback_after_terminal() {
  let mut source = Subject::<i32, &'static str>::new();
  let log = MutArc::own(Vec::new());
  source.clone().subscribe_with(Probe::new(log.clone(), None));

  source.next(1);
  source.clone().error("boom");
  source.next(2);
  assert_eq!(*log.rc_deref(), vec!["on_subscribe", "next 1", "error boom"]);
}

#[test]
fn cancelling_during_emission_stops_later_deliveries() {
  let log = MutArc::own(Vec::new());
  observable::from_iter::<_, &'static str>(1..=100)
    .subscribe_with(Probe::new(log.clone(), Some(2)));
  assert_eq!(*log.rc_deref(), vec!["on_subscribe", "next 1", "next 2"]);
}

#[quickcheck]
fn map_composition_fuses(xs: Vec<i32>) -> bool {
  let mut chained = Vec::new();
  let mut fused = Vec::new();
  observable::from_iter::<_, ()>(xs.clone())
    .map(|v: i32| v.wrapping_add(1))
    .map(|v| v.wrapping_mul(3))
    .subscribe(|v| chained.push(v));
  observable::from_iter::<_, ()>(xs)
    .map(|v: i32| v.wrapping_add(1).wrapping_mul(3))
    .subscribe(|v| fused.push(v));
  chained == fused
}

#[quickcheck]
fn filter_keeps_the_matching_subsequence(xs: Vec<i32>) -> bool {
  let mut filtered = Vec::new();
  observable::from_iter::<_, ()>(xs.clone()).filter(|v| v % 2 == 0).subscribe(|v| filtered.push(v));
  let expected: Vec<i32> = xs.into_iter().filter(|v| v % 2 == 0).collect();
  filtered == expected
}

#[quickcheck]
fn take_emits_at_most_n_then_completes(xs: Vec<i32>, n: usize) -> bool {
  let n = n % 16;
  let mut seen = Vec::new();
  let mut done = false;
  observable::from_iter::<_, ()>(xs.clone())
    .take(n)
    .subscribe_complete(|v| seen.push(v), || done = true);
  done && seen.len() == n.min(xs.len()) && seen[..] == xs[..seen.len()]
}

#[test]
fn filtered_mapped_range_collects() {
  let mut lists = Vec::new();
  observable::range::<()>(1, 5)
    .filter(|v| v % 2 == 0)
    .map(|v| v * 10)
    .to_list()
    .subscribe(|l| lists.push(l));
  assert_eq!(lists, vec![vec![20, 40]]);
}

#[test]
fn error_recovery_appends_the_fallback_value() {
  let mut lists = Vec::new();
  let concatenated = ObservableExt::<i32, &str>::concat(of_sequence!(1, 2, 3), observable::throw("bang"));
  let recovered = ObservableExt::<i32, &str>::on_error_return(concatenated, |_| -1);
  let listed = ObservableExt::<i32, &str>::to_list(recovered);
  ObservableExt::<Vec<i32>, &str>::subscribe_err(listed, |l| lists.push(l), |_: &str| {});
  assert_eq!(lists, vec![vec![1, 2, 3, -1]]);
}

#[test]
fn interval_timestamps_follow_the_virtual_clock() {
  let sched = TestScheduler::new();
  let start = sched.now();
  let stamps = MutArc::own(Vec::new());
  let c = stamps.clone();
  observable::interval::<(), _>(Duration::from_millis(10), sched.clone())
    .take(3)
    .timestamp(sched.clone())
    .subscribe(move |(at, v)| c.rc_deref_mut().push((at - start, v)));

  sched.advance_by(Duration::from_millis(35));
  let millis = |ms| Duration::from_millis(ms);
  assert_eq!(*stamps.rc_deref(), vec![(millis(10), 0), (millis(20), 1), (millis(30), 2)]);
}

#[test]
fn merge_interleaving_preserves_each_sources_order() {
  let seen = MutArc::own(Vec::new());
  let c = seen.clone();
  let done = MutArc::own(false);
  let cd = done.clone();
  observable::from_iter::<_, ()>([1, 2, 3])
    .merge(observable::from_iter([4, 5, 6]))
    .subscribe_complete(move |v| c.rc_deref_mut().push(v), move || *cd.rc_deref_mut() = true);

  let seen = seen.rc_deref().clone();
  assert!(*done.rc_deref());
  let mut sorted = seen.clone();
  sorted.sort();
  assert_eq!(sorted, vec![1, 2, 3, 4, 5, 6]);
  let firsts: Vec<i32> = seen.iter().copied().filter(|v| *v <= 3).collect();
  let seconds: Vec<i32> = seen.iter().copied().filter(|v| *v > 3).collect();
  assert_eq!(firsts, vec![1, 2, 3]);
  assert_eq!(seconds, vec![4, 5, 6]);
}

#[test]
fn zip_truncates_to_the_shorter_source() {
  let mut pairs = Vec::new();
  let mut done = false;
  observable::from_iter::<_, ()>(0..10)
    .zip(observable::from_iter(["a", "b", "c"]))
    .subscribe_complete(|p| pairs.push(p), || done = true);
  assert_eq!(pairs, vec![(0, "a"), (1, "b"), (2, "c")]);
  assert!(done);
}

#[test]
fn superseded_inner_is_silenced() {
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
  fst.next(1);
  outer.next(1);
  fst.next(2);
  let mut snd = second.clone();
  snd.next(10);
  assert_eq!(*seen.rc_deref(), vec![1, 10]);
}

#[test]
fn replay_window_reaches_a_late_subscriber() {
  let replayed = of_sequence!(1, 2, 3).replay(2);
  replayed.connect::<i32, ()>();

  let seen = MutArc::own(Vec::new());
  let done = MutArc::own(false);
  let (cs, cd) = (seen.clone(), done.clone());
  replayed
    .clone()
    .subscribe_complete(move |v| cs.rc_deref_mut().push(v), move || *cd.rc_deref_mut() = true);
  assert_eq!(*seen.rc_deref(), vec![2, 3]);
  assert!(*done.rc_deref());
}

#[test]
fn group_by_flat_map_collects_per_key() {
  let seen = MutArc::own(Vec::new());
  let c = seen.clone();
  observable::from_iter::<_, ()>([1, 2, 3])
    .group_by(|v| v % 2)
    .flat_map(|g| g.to_list())
    .subscribe(move |l| c.rc_deref_mut().push(l));

  let mut lists = seen.rc_deref().clone();
  lists.sort();
  assert_eq!(lists, vec![vec![1, 3], vec![2]]);
}

#[test]
fn share_tears_down_upstream_exactly_once() {
  let feeder = Subject::<i32, ()>::new();
  let shared = feeder.clone().share();
  let a = shared.clone().subscribe(|_| {});
  let b = shared.clone().subscribe(|_| {});
  assert!(feeder.has_observers());

  a.unsubscribe();
  assert!(feeder.has_observers());
  b.unsubscribe();
  assert!(!feeder.has_observers());
}

#[test]
fn concat_runs_sources_back_to_back() {
  let mut seen = Vec::new();
  observable::from_iter::<_, ()>([1, 2])
    .concat(observable::from_iter([3]))
    .concat(observable::from_iter([4]))
    .subscribe(|v| seen.push(v));
  assert_eq!(seen, vec![1, 2, 3, 4]);
}
