//! The producer half of the subscribe handshake, and the operator surface.

pub mod connectable;
pub mod create;
pub mod defer;
pub mod from_future;
pub mod from_iter;
pub mod interval;
pub mod of;
pub mod timer;
pub mod trivial;
pub mod using;

pub use connectable::{ConnectableObservable, Connection};
pub use create::{create, CreateObservable};
pub use defer::{defer, DeferObservable};
pub use from_future::{from_future, from_future_result, FutureObservable, FutureResultObservable};
pub use from_iter::{from_iter, range, FromIterObservable};
pub use interval::{interval, interval_at, IntervalObservable};
pub use of::{
  of, of_fn, of_option, of_result, FnObservable, OfObservable, OptionObservable, ResultObservable,
};
pub use timer::{timer, timer_at, TimerObservable};
pub use trivial::{empty, never, throw, EmptyObservable, NeverObservable, ThrowObservable};

use std::time::Duration;

use crate::{
  flow::{BackpressureStrategy, FlowBridge},
  observer::Observer,
  ops::{
    box_it::{BoxIt, BoxOp},
    buffer::{BufferCountOp, BufferTimeOp},
    collect::{ToListOp, ToMapOp, ToMultimapOp, ToSortedListOp},
    combine_latest::{CombineLatestAllOp, CombineLatestOp},
    concat::{ConcatAllOp, ConcatOp},
    debounce::DebounceOp,
    delay::DelayOp,
    distinct::{DistinctOp, DistinctUntilChangedByOp, DistinctUntilChangedOp},
    filter::FilterOp,
    filter_map::FilterMapOp,
    finalize::FinalizeOp,
    first::{FirstOp, FirstOrOp, LastOp, LastOrOp},
    group_by::GroupByOp,
    ignore_elements::IgnoreElementsOp,
    map::MapOp,
    map_to::MapToOp,
    materialize::{DematerializeOp, MaterializeOp},
    merge::MergeOp,
    merge_all::MergeAllOp,
    observe_on::ObserveOnOp,
    on_error::{OnErrorResumeNextOp, OnErrorReturnOp},
    pairwise::PairwiseOp,
    publish::CacheOp,
    ref_count::RefCountOp,
    repeat::{RepeatOp, RepeatUntilOp, RepeatWhenOp},
    retry::{RetryOp, RetryUntilOp, RetryWhenOp},
    sample::SampleOp,
    scan::{ReduceOp, ScanOp},
    skip::{SkipLastOp, SkipOp},
    start_with::{EndWithOp, StartWithOp},
    subscribe_on::SubscribeOnOp,
    switch_map::SwitchAllOp,
    take::{TakeLastOp, TakeOp},
    tap::{TapCompleteOp, TapErrOp, TapOp},
    throttle_time::{ThrottleEdge, ThrottleTimeOp},
    timeout::{TimeoutOp, TimeoutWithOp},
    timestamp::TimestampOp,
    unsubscribe_on::UnsubscribeOnOp,
    window::{WindowCountOp, WindowTimeOp},
    zip::{ZipAllOp, ZipOp},
  },
  scheduler::Scheduler,
  subject::{ReplaySubject, Subject},
  subscriber::{AllObserver, CompleteObserver, ErrObserver, NextObserver, Subscriber},
  subscription::{SharedSubscription, Subscription},
  type_hint::TypeHint,
};

/// Queue capacity shared by the multi-source operators, and the pending
/// bound of a not-yet-consumed group.
pub const DEFAULT_BUFFER_SIZE: usize = 128;

/// Something that, handed an observer, starts delivering notifications to
/// it and returns the handle that stops the delivery.
///
/// The observer type is a trait parameter rather than an associated
/// projection so an operator can state exactly which wrapper it feeds
/// upstream: `S: Observable<Item, Err, MapObserver<O, F>>` reads as "S,
/// subscribed with my observer wrapped in `MapObserver`".
pub trait Observable<Item, Err, O: Observer<Item, Err>> {
  type Unsub: Subscription;

  fn actual_subscribe(self, observer: O) -> Self::Unsub;
}

/// The operator and subscribe surface, carried by every source and
/// operator. `Item`/`Err` are trait parameters so chained calls know the
/// element type without an intermediate subscribe.
pub trait ObservableExt<Item, Err>: Sized {
  // ---------------------------------------------------------------- mapping

  fn map<B, F>(self, f: F) -> MapOp<Self, F, Item>
  where
    F: FnMut(Item) -> B,
  {
    MapOp { source: self, func: f, _hint: TypeHint::new() }
  }

  /// Replace every item with a clone of `value`.
  fn map_to<B>(self, value: B) -> MapToOp<Self, B, Item>
  where
    B: Clone,
  {
    MapToOp { source: self, value, _hint: TypeHint::new() }
  }

  fn filter<F>(self, f: F) -> FilterOp<Self, F>
  where
    F: FnMut(&Item) -> bool,
  {
    FilterOp { source: self, predicate: f }
  }

  fn filter_map<B, F>(self, f: F) -> FilterMapOp<Self, F, Item>
  where
    F: FnMut(Item) -> Option<B>,
  {
    FilterMapOp { source: self, func: f, _hint: TypeHint::new() }
  }

  /// Emits `seed`, then every accumulation step.
  fn scan<B, F>(self, seed: B, acc: F) -> ScanOp<Self, F, B, Item>
  where
    B: Clone,
    F: FnMut(&B, Item) -> B,
  {
    ScanOp { source: self, seed, acc, _hint: TypeHint::new() }
  }

  /// Emits only the final accumulation, when the source completes.
  fn reduce<B, F>(self, seed: B, acc: F) -> ReduceOp<Self, F, B, Item>
  where
    F: FnMut(B, Item) -> B,
  {
    ReduceOp { source: self, seed, acc, _hint: TypeHint::new() }
  }

  fn materialize(self) -> MaterializeOp<Self> {
    MaterializeOp { source: self }
  }

  fn dematerialize<B>(self) -> DematerializeOp<Self, B> {
    DematerializeOp { source: self, _hint: TypeHint::new() }
  }

  /// Pairs every item with the scheduler's clock reading at emission.
  fn timestamp<SD>(self, scheduler: SD) -> TimestampOp<Self, SD> {
    TimestampOp { source: self, scheduler }
  }

  // ---------------------------------------------------------------- slicing

  fn take(self, count: usize) -> TakeOp<Self> {
    TakeOp { source: self, count }
  }

  fn take_last(self, count: usize) -> TakeLastOp<Self> {
    TakeLastOp { source: self, count }
  }

  fn skip(self, count: usize) -> SkipOp<Self> {
    SkipOp { source: self, count }
  }

  fn skip_last(self, count: usize) -> SkipLastOp<Self> {
    SkipLastOp { source: self, count }
  }

  fn first(self) -> FirstOp<Self> {
    FirstOp { source: self }
  }

  fn first_or(self, default: Item) -> FirstOrOp<Self, Item> {
    FirstOrOp { source: self, default }
  }

  fn last(self) -> LastOp<Self> {
    LastOp { source: self }
  }

  fn last_or(self, default: Item) -> LastOrOp<Self, Item> {
    LastOrOp { source: self, default }
  }

  fn ignore_elements(self) -> IgnoreElementsOp<Self> {
    IgnoreElementsOp { source: self }
  }

  /// Drop items whose key was seen before.
  fn distinct(self) -> DistinctOp<Self> {
    DistinctOp { source: self }
  }

  fn distinct_until_changed(self) -> DistinctUntilChangedOp<Self> {
    DistinctUntilChangedOp { source: self }
  }

  /// `same(prev, cur)` decides whether `cur` repeats `prev`.
  fn distinct_until_changed_by<F>(self, same: F) -> DistinctUntilChangedByOp<Self, F>
  where
    F: FnMut(&Item, &Item) -> bool,
  {
    DistinctUntilChangedByOp { source: self, same }
  }

  /// Emits `(previous, current)` from the second item on.
  fn pairwise(self) -> PairwiseOp<Self> {
    PairwiseOp { source: self }
  }

  fn start_with(self, values: Vec<Item>) -> StartWithOp<Self, Item> {
    StartWithOp { source: self, values }
  }

  fn end_with(self, values: Vec<Item>) -> EndWithOp<Self, Item> {
    EndWithOp { source: self, values }
  }

  // ---------------------------------------------------------------- effects

  fn tap<F>(self, f: F) -> TapOp<Self, F>
  where
    F: FnMut(&Item),
  {
    TapOp { source: self, func: f }
  }

  fn tap_error<F>(self, f: F) -> TapErrOp<Self, F>
  where
    F: FnOnce(&Err),
  {
    TapErrOp { source: self, func: f }
  }

  fn tap_complete<F>(self, f: F) -> TapCompleteOp<Self, F>
  where
    F: FnOnce(),
  {
    TapCompleteOp { source: self, func: f }
  }

  /// Runs once, on terminal or on unsubscribe, whichever happens first.
  fn finalize<F>(self, f: F) -> FinalizeOp<Self, F>
  where
    F: FnOnce() + Send + 'static,
  {
    FinalizeOp { source: self, func: f }
  }

  // ----------------------------------------------------------- error flow

  fn on_error_return<F>(self, f: F) -> OnErrorReturnOp<Self, F>
  where
    F: FnOnce(Err) -> Item,
  {
    OnErrorReturnOp { source: self, func: f }
  }

  fn on_error_resume_next<F, Fallback>(self, f: F) -> OnErrorResumeNextOp<Self, F>
  where
    F: FnOnce(Err) -> Fallback,
  {
    OnErrorResumeNextOp { source: self, func: f }
  }

  fn retry(self, max_retries: usize) -> RetryOp<Self>
  where
    Self: Clone,
  {
    RetryOp { source: self, max_retries: Some(max_retries) }
  }

  fn retry_forever(self) -> RetryOp<Self>
  where
    Self: Clone,
  {
    RetryOp { source: self, max_retries: None }
  }

  /// Resubscribe after each error until `is_final` approves one.
  fn retry_until<P>(self, is_final: P) -> RetryUntilOp<Self, P>
  where
    Self: Clone,
    P: FnMut(&Err) -> bool,
  {
    RetryUntilOp { source: self, predicate: is_final }
  }

  /// Feed terminal errors into a subject; the stream the handler derives
  /// from it drives resubscription (`next` = redo, terminal = forward).
  fn retry_when<H, Signal>(self, handler: H) -> RetryWhenOp<Self, H>
  where
    Self: Clone,
    H: FnOnce(Subject<Err, Err>) -> Signal,
  {
    RetryWhenOp { source: self, handler }
  }

  fn repeat(self, count: usize) -> RepeatOp<Self>
  where
    Self: Clone,
  {
    RepeatOp { source: self, count: Some(count) }
  }

  fn repeat_forever(self) -> RepeatOp<Self>
  where
    Self: Clone,
  {
    RepeatOp { source: self, count: None }
  }

  /// Resubscribe after each completion until `stop` says to end.
  fn repeat_until<P>(self, stop: P) -> RepeatUntilOp<Self, P>
  where
    Self: Clone,
    P: FnMut() -> bool,
  {
    RepeatUntilOp { source: self, predicate: stop }
  }

  fn repeat_when<H, Signal>(self, handler: H) -> RepeatWhenOp<Self, H>
  where
    Self: Clone,
    H: FnOnce(Subject<(), Err>) -> Signal,
  {
    RepeatWhenOp { source: self, handler }
  }

  // ---------------------------------------------------------- composition

  fn merge<S2>(self, other: S2) -> MergeOp<Self, S2> {
    MergeOp { a: self, b: other }
  }

  /// Flatten a stream of streams, at most `concurrent` live at once.
  fn merge_all(self, concurrent: usize) -> MergeAllOp<Self, Item> {
    MergeAllOp { source: self, concurrent, delay_errors: false, _hint: TypeHint::new() }
  }

  /// Like `merge_all` but running every branch to its end before erroring.
  fn merge_all_delay_err(self, concurrent: usize) -> MergeAllOp<Self, Item> {
    MergeAllOp { source: self, concurrent, delay_errors: true, _hint: TypeHint::new() }
  }

  fn flat_map<B, F>(self, f: F) -> MergeAllOp<MapOp<Self, F, Item>, B>
  where
    F: FnMut(Item) -> B,
  {
    self.map(f).merge_all(usize::MAX)
  }

  fn flat_map_with<B, F>(
    self,
    f: F,
    concurrent: usize,
    delay_errors: bool,
  ) -> MergeAllOp<MapOp<Self, F, Item>, B>
  where
    F: FnMut(Item) -> B,
  {
    let op = self.map(f).merge_all(concurrent);
    MergeAllOp { delay_errors, ..op }
  }

  fn concat<S2>(self, other: S2) -> ConcatOp<Self, S2> {
    ConcatOp { a: self, b: other }
  }

  /// One inner at a time, in outer-arrival order; `prefetch` pre-sizes the
  /// pending queue.
  fn concat_all(self, prefetch: usize) -> ConcatAllOp<Self, Item> {
    ConcatAllOp { source: self, prefetch, delay_errors: false, _hint: TypeHint::new() }
  }

  /// Like `concat_all` but deferring errors until everything finished.
  fn concat_all_delay_err(self, prefetch: usize) -> ConcatAllOp<Self, Item> {
    ConcatAllOp { source: self, prefetch, delay_errors: true, _hint: TypeHint::new() }
  }

  fn concat_map<B, F>(self, f: F) -> ConcatAllOp<MapOp<Self, F, Item>, B>
  where
    F: FnMut(Item) -> B,
  {
    self.map(f).concat_all(DEFAULT_BUFFER_SIZE)
  }

  /// Only the latest inner stays subscribed; a newcomer displaces it.
  fn switch_all(self) -> SwitchAllOp<Self, Item> {
    SwitchAllOp { source: self, _hint: TypeHint::new() }
  }

  fn switch_map<B, F>(self, f: F) -> SwitchAllOp<MapOp<Self, F, Item>, B>
  where
    F: FnMut(Item) -> B,
  {
    self.map(f).switch_all()
  }

  /// Pairs the n-th items of both sources.
  fn zip<S2>(self, other: S2) -> ZipOp<Self, S2> {
    ZipOp { a: self, b: other, buffer_size: DEFAULT_BUFFER_SIZE, delay_errors: false }
  }

  /// Like `zip`, but a side's error is parked until its buffered items
  /// have paired off.
  fn zip_delay_err<S2>(self, other: S2) -> ZipOp<Self, S2> {
    ZipOp { a: self, b: other, buffer_size: DEFAULT_BUFFER_SIZE, delay_errors: true }
  }

  /// Rank-by-rank zip over homogeneous sources, emitting `Vec<Item>`.
  fn zip_all<I>(self, others: I) -> ZipAllOp<Self>
  where
    I: IntoIterator<Item = Self>,
  {
    ZipAllOp { sources: std::iter::once(self).chain(others).collect(), delay_errors: false }
  }

  /// Like `zip_all` with errors deferred behind the buffered pairings.
  fn zip_all_delay_err<I>(self, others: I) -> ZipAllOp<Self>
  where
    I: IntoIterator<Item = Self>,
  {
    ZipAllOp { sources: std::iter::once(self).chain(others).collect(), delay_errors: true }
  }

  fn combine_latest<S2, B, Out, F>(self, other: S2, f: F) -> CombineLatestOp<Self, S2, F, Item, B>
  where
    F: FnMut(Item, B) -> Out,
  {
    CombineLatestOp { a: self, b: other, combiner: f, delay_errors: false, _hint: TypeHint::new() }
  }

  /// Like `combine_latest`, but an error is absorbed like a completion and
  /// surfaces only when every source is done.
  fn combine_latest_delay_err<S2, B, Out, F>(
    self,
    other: S2,
    f: F,
  ) -> CombineLatestOp<Self, S2, F, Item, B>
  where
    F: FnMut(Item, B) -> Out,
  {
    CombineLatestOp { a: self, b: other, combiner: f, delay_errors: true, _hint: TypeHint::new() }
  }

  /// Latest-tuple combination over homogeneous sources, emitting
  /// `Vec<Item>`.
  fn combine_latest_all<I>(self, others: I) -> CombineLatestAllOp<Self>
  where
    I: IntoIterator<Item = Self>,
  {
    CombineLatestAllOp {
      sources: std::iter::once(self).chain(others).collect(),
      delay_errors: false,
    }
  }

  /// Like `combine_latest_all` with errors deferred until all sources are
  /// done.
  fn combine_latest_all_delay_err<I>(self, others: I) -> CombineLatestAllOp<Self>
  where
    I: IntoIterator<Item = Self>,
  {
    CombineLatestAllOp {
      sources: std::iter::once(self).chain(others).collect(),
      delay_errors: true,
    }
  }

  /// Route items into per-key group streams; the group appears downstream
  /// the first time its key does.
  fn group_by<Key, F>(self, key_fn: F) -> GroupByOp<Self, F>
  where
    F: FnMut(&Item) -> Key,
  {
    GroupByOp { source: self, key_fn }
  }

  // -------------------------------------------------------------- batching

  fn buffer_count(self, count: usize) -> BufferCountOp<Self> {
    BufferCountOp { source: self, count, skip: count }
  }

  /// Overlapping or gapped count buffers: a new buffer starts every `skip`
  /// items.
  fn buffer_count_skip(self, count: usize, skip: usize) -> BufferCountOp<Self> {
    BufferCountOp { source: self, count, skip }
  }

  fn buffer_time<SD>(self, period: Duration, scheduler: SD) -> BufferTimeOp<Self, SD> {
    BufferTimeOp { source: self, period, max_count: None, restart_timer: false, scheduler }
  }

  /// Time buffers bounded by `count`; `restart_timer` restarts the window
  /// on a size-triggered flush.
  fn buffer_time_count<SD>(
    self,
    period: Duration,
    count: usize,
    restart_timer: bool,
    scheduler: SD,
  ) -> BufferTimeOp<Self, SD> {
    BufferTimeOp { source: self, period, max_count: Some(count), restart_timer, scheduler }
  }

  fn window_count(self, count: usize) -> WindowCountOp<Self> {
    WindowCountOp { source: self, count }
  }

  fn window_time<SD>(self, period: Duration, scheduler: SD) -> WindowTimeOp<Self, SD> {
    WindowTimeOp { source: self, period, scheduler }
  }

  // ---------------------------------------------------------------- timing

  fn delay<SD>(self, delay: Duration, scheduler: SD) -> DelayOp<Self, SD> {
    DelayOp { source: self, delay, scheduler }
  }

  /// Emit the freshest item at every tick; silent ticks emit nothing.
  fn sample<SD>(self, period: Duration, scheduler: SD) -> SampleOp<Self, SD> {
    SampleOp { source: self, period, scheduler }
  }

  fn throttle_time<SD>(
    self,
    window: Duration,
    edge: ThrottleEdge,
    scheduler: SD,
  ) -> ThrottleTimeOp<Self, SD> {
    ThrottleTimeOp { source: self, window, edge, scheduler }
  }

  /// First item of each window, the rest suppressed.
  fn throttle_first<SD>(self, window: Duration, scheduler: SD) -> ThrottleTimeOp<Self, SD> {
    self.throttle_time(window, ThrottleEdge::Leading, scheduler)
  }

  /// Last item of each window, emitted when the window closes.
  fn throttle_last<SD>(self, window: Duration, scheduler: SD) -> ThrottleTimeOp<Self, SD> {
    self.throttle_time(window, ThrottleEdge::Trailing, scheduler)
  }

  fn debounce<SD>(self, window: Duration, scheduler: SD) -> DebounceOp<Self, SD> {
    DebounceOp { source: self, window, scheduler }
  }

  fn timeout<SD>(self, window: Duration, scheduler: SD) -> TimeoutOp<Self, SD> {
    TimeoutOp { source: self, window, scheduler }
  }

  fn timeout_with<Fallback, SD>(
    self,
    window: Duration,
    fallback: Fallback,
    scheduler: SD,
  ) -> TimeoutWithOp<Self, Fallback, SD> {
    TimeoutWithOp { source: self, window, fallback, scheduler }
  }

  // ------------------------------------------------------------ scheduling

  /// Re-emit every notification from a worker of `scheduler`.
  fn observe_on<SD: Scheduler>(self, scheduler: SD) -> ObserveOnOp<Self, SD> {
    ObserveOnOp { source: self, scheduler }
  }

  /// Perform the act of subscribing on a worker of `scheduler`.
  fn subscribe_on<SD: Scheduler>(self, scheduler: SD) -> SubscribeOnOp<Self, SD> {
    SubscribeOnOp { source: self, scheduler }
  }

  /// Perform the act of unsubscribing on a worker of `scheduler`.
  fn unsubscribe_on<SD: Scheduler>(self, scheduler: SD) -> UnsubscribeOnOp<Self, SD> {
    UnsubscribeOnOp { source: self, scheduler }
  }

  // -------------------------------------------------------------- multicast

  fn publish(self) -> ConnectableObservable<Self, Subject<Item, Err>> {
    ConnectableObservable::new(self, Subject::default())
  }

  fn replay(self, count: usize) -> ConnectableObservable<Self, ReplaySubject<Item, Err>> {
    ConnectableObservable::new(self, ReplaySubject::with_size(count))
  }

  fn replay_unbounded(self) -> ConnectableObservable<Self, ReplaySubject<Item, Err>> {
    ConnectableObservable::new(self, ReplaySubject::unbounded())
  }

  fn replay_time<SD: Scheduler>(
    self,
    window: Duration,
    scheduler: SD,
  ) -> ConnectableObservable<Self, ReplaySubject<Item, Err>> {
    ConnectableObservable::new(self, ReplaySubject::with_time(window, scheduler))
  }

  fn replay_size_and_time<SD: Scheduler>(
    self,
    count: usize,
    window: Duration,
    scheduler: SD,
  ) -> ConnectableObservable<Self, ReplaySubject<Item, Err>> {
    ConnectableObservable::new(self, ReplaySubject::with_size_and_time(count, window, scheduler))
  }

  /// `publish().ref_count()`: connect on the first subscriber, tear the
  /// upstream down when the last one leaves.
  fn share(self) -> RefCountOp<Self, Subject<Item, Err>> {
    self.publish().ref_count()
  }

  /// Unbounded replay that connects on first subscribe and never
  /// disconnects.
  fn cache(self) -> CacheOp<Self, Item, Err> {
    CacheOp::new(self)
  }

  /// Put the stream behind demand signalling; see [`crate::flow`].
  fn to_flow(self, strategy: BackpressureStrategy) -> FlowBridge<Self> {
    FlowBridge::new(self, strategy)
  }

  // ------------------------------------------------------------ collecting

  fn to_list(self) -> ToListOp<Self> {
    ToListOp { source: self }
  }

  fn to_sorted_list(self) -> ToSortedListOp<Self> {
    ToSortedListOp { source: self }
  }

  /// Key every item; later items overwrite earlier ones per key.
  fn to_map<Key, F>(self, key_fn: F) -> ToMapOp<Self, F>
  where
    F: FnMut(&Item) -> Key,
  {
    ToMapOp { source: self, key_fn }
  }

  fn to_multimap<Key, F>(self, key_fn: F) -> ToMultimapOp<Self, F>
  where
    F: FnMut(&Item) -> Key,
  {
    ToMultimapOp { source: self, key_fn }
  }

  // --------------------------------------------------------------- erasure

  fn box_it(self) -> BoxOp<Item, Err>
  where
    Self: BoxIt<Item, Err>,
  {
    BoxIt::box_it(self)
  }

  // -------------------------------------------------------------- subscribe

  fn subscribe_with<O>(self, mut observer: O) -> SharedSubscription
  where
    O: Observer<Item, Err>,
    Self: Observable<Item, Err, Subscriber<O>>,
    <Self as Observable<Item, Err, Subscriber<O>>>::Unsub: Send + 'static,
  {
    let handle = SharedSubscription::default();
    observer.on_subscribe(handle.clone());
    let unsub = self.actual_subscribe(Subscriber::new(observer, handle.clone()));
    handle.add(unsub);
    handle
  }

  fn subscribe<N>(self, next: N) -> SharedSubscription
  where
    N: FnMut(Item),
    Self: Observable<Item, Err, Subscriber<NextObserver<N>>>,
    <Self as Observable<Item, Err, Subscriber<NextObserver<N>>>>::Unsub: Send + 'static,
  {
    self.subscribe_with(NextObserver(next))
  }

  fn subscribe_err<N, E>(self, next: N, error: E) -> SharedSubscription
  where
    N: FnMut(Item),
    E: FnOnce(Err),
    Self: Observable<Item, Err, Subscriber<ErrObserver<N, E>>>,
    <Self as Observable<Item, Err, Subscriber<ErrObserver<N, E>>>>::Unsub: Send + 'static,
  {
    self.subscribe_with(ErrObserver { next, error })
  }

  fn subscribe_complete<N, C>(self, next: N, complete: C) -> SharedSubscription
  where
    N: FnMut(Item),
    C: FnOnce(),
    Self: Observable<Item, Err, Subscriber<CompleteObserver<N, C>>>,
    <Self as Observable<Item, Err, Subscriber<CompleteObserver<N, C>>>>::Unsub: Send + 'static,
  {
    self.subscribe_with(CompleteObserver { next, complete })
  }

  fn subscribe_all<N, E, C>(self, next: N, error: E, complete: C) -> SharedSubscription
  where
    N: FnMut(Item),
    E: FnOnce(Err),
    C: FnOnce(),
    Self: Observable<Item, Err, Subscriber<AllObserver<N, E, C>>>,
    <Self as Observable<Item, Err, Subscriber<AllObserver<N, E, C>>>>::Unsub: Send + 'static,
  {
    self.subscribe_with(AllObserver { next, error, complete })
  }
}
