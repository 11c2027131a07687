use crate::{
  observable::{Observable, ObservableExt},
  observer::Observer,
  rc::{MutArc, RcDeref, RcDerefMut},
  scheduler::{RepeatTask, Scheduler, TaskHandle, Worker},
  subscription::{Subscription, ZipSubscription},
};
use std::time::Duration;

/// Collects items into `Vec`s of `count`; a new collection starts every
/// `skip` items, so `skip < count` overlaps and `skip > count` gaps.
#[derive(Clone)]
pub struct BufferCountOp<S> {
  pub(crate) source: S,
  pub(crate) count: usize,
  pub(crate) skip: usize,
}

impl<Item, Err, O, S> Observable<Vec<Item>, Err, O> for BufferCountOp<S>
where
  O: Observer<Vec<Item>, Err>,
  S: Observable<Item, Err, BufferCountObserver<O, Item>>,
  Item: Clone,
{
  type Unsub = S::Unsub;

  fn actual_subscribe(self, observer: O) -> Self::Unsub {
    self.source.actual_subscribe(BufferCountObserver {
      observer,
      count: self.count.max(1),
      skip: self.skip.max(1),
      index: 0,
      buffers: Vec::new(),
    })
  }
}

impl<Item, Err, S> ObservableExt<Vec<Item>, Err> for BufferCountOp<S> where
  S: ObservableExt<Item, Err>
{
}

pub struct BufferCountObserver<O, Item> {
  observer: O,
  count: usize,
  skip: usize,
  index: usize,
  buffers: Vec<Vec<Item>>,
}

impl<Item, Err, O> Observer<Item, Err> for BufferCountObserver<O, Item>
where
  O: Observer<Vec<Item>, Err>,
  Item: Clone,
{
  fn next(&mut self, value: Item) {
    if self.index % self.skip == 0 {
      self.buffers.push(Vec::with_capacity(self.count));
    }
    self.index += 1;
    for buffer in self.buffers.iter_mut() {
      buffer.push(value.clone());
    }
    if self.buffers.first().map_or(false, |b| b.len() == self.count) {
      let full = self.buffers.remove(0);
      self.observer.next(full);
    }
  }

  fn error(self, err: Err) {
    self.observer.error(err)
  }

  fn complete(mut self) {
    for buffer in self.buffers.drain(..) {
      if !buffer.is_empty() {
        self.observer.next(buffer);
      }
    }
    self.observer.complete()
  }

  fn is_finished(&self) -> bool {
    self.observer.is_finished()
  }
}

/// Flushes a collection every `period` on a worker; `max_count` bounds a
/// collection, and `restart_timer` restarts the period on a size-triggered
/// flush.
#[derive(Clone)]
pub struct BufferTimeOp<S, SD> {
  pub(crate) source: S,
  pub(crate) period: Duration,
  pub(crate) max_count: Option<usize>,
  pub(crate) restart_timer: bool,
  pub(crate) scheduler: SD,
}

struct BufferTimeState<O, Item> {
  observer: Option<O>,
  buffer: Vec<Item>,
}

type Shared<O, Item> = MutArc<BufferTimeState<O, Item>>;

fn flush_tick<Err, O, Item>(state: &mut Shared<O, Item>)
where
  O: Observer<Vec<Item>, Err>,
{
  let mut guard = state.rc_deref_mut();
  let batch = std::mem::take(&mut guard.buffer);
  if let Some(observer) = guard.observer.as_mut() {
    observer.next(batch);
  }
}

impl<Item, Err, O, S, SD> Observable<Vec<Item>, Err, O> for BufferTimeOp<S, SD>
where
  O: Observer<Vec<Item>, Err> + Send + 'static,
  Item: Send + 'static,
  S: Observable<Item, Err, BufferTimeObserver<O, Item, SD::Worker>>,
  SD: Scheduler,
  Err: 'static,
{
  type Unsub = ZipSubscription<S::Unsub, SD::Worker>;

  fn actual_subscribe(self, observer: O) -> Self::Unsub {
    let worker = self.scheduler.create_worker();
    let state = MutArc::own(BufferTimeState { observer: Some(observer), buffer: Vec::new() });
    let handle = worker.schedule_periodic(
      RepeatTask::new(flush_tick::<Err, O, Item>, state.clone()),
      self.period,
      self.period,
    );
    let unsub = self.source.actual_subscribe(BufferTimeObserver {
      state,
      worker: worker.clone(),
      period: self.period,
      max_count: self.max_count,
      restart_timer: self.restart_timer,
      tick: MutArc::own(Some(handle)),
    });
    ZipSubscription::new(unsub, worker)
  }
}

impl<Item, Err, S, SD> ObservableExt<Vec<Item>, Err> for BufferTimeOp<S, SD> where
  S: ObservableExt<Item, Err>
{
}

pub struct BufferTimeObserver<O, Item, W> {
  state: Shared<O, Item>,
  worker: W,
  period: Duration,
  max_count: Option<usize>,
  restart_timer: bool,
  tick: MutArc<Option<TaskHandle>>,
}

impl<Item, Err, O, W> Observer<Item, Err> for BufferTimeObserver<O, Item, W>
where
  O: Observer<Vec<Item>, Err> + Send + 'static,
  Item: Send + 'static,
  W: Worker,
  Err: 'static,
{
  fn next(&mut self, value: Item) {
    let flushed = {
      let mut guard = self.state.rc_deref_mut();
      if guard.observer.is_none() {
        return;
      }
      guard.buffer.push(value);
      match self.max_count {
        Some(max) if guard.buffer.len() >= max => {
          let batch = std::mem::take(&mut guard.buffer);
          if let Some(observer) = guard.observer.as_mut() {
            observer.next(batch);
          }
          true
        }
        _ => false,
      }
    };
    if flushed && self.restart_timer {
      let taken = self.tick.rc_deref_mut().take();
      if let Some(handle) = taken {
        handle.unsubscribe();
      }
      let handle = self.worker.schedule_periodic(
        RepeatTask::new(flush_tick::<Err, O, Item>, self.state.clone()),
        self.period,
        self.period,
      );
      *self.tick.rc_deref_mut() = Some(handle);
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
      let mut guard = self.state.rc_deref_mut();
      let tail = std::mem::take(&mut guard.buffer);
      guard.observer.take().map(|observer| (observer, tail))
    };
    if let Some((mut observer, tail)) = taken {
      if !tail.is_empty() {
        observer.next(tail);
      }
      observer.complete();
    }
  }

  fn is_finished(&self) -> bool {
    self.state.rc_deref().observer.as_ref().map_or(true, |o| o.is_finished())
  }
}

#[cfg(test)]
mod test {
  use crate::prelude::*;

  #[test]
  fn count_buffers_chunk_the_stream() {
    let mut seen = Vec::new();
    observable::from_iter::<_, ()>(1..=7).buffer_count(3).subscribe(|v| seen.push(v));
    assert_eq!(seen, vec![vec![1, 2, 3], vec![4, 5, 6], vec![7]]);
  }

  #[test]
  fn sliding_buffers_overlap() {
    let mut seen = Vec::new();
    observable::from_iter::<_, ()>(1..=4).buffer_count_skip(2, 1).subscribe(|v| seen.push(v));
    assert_eq!(seen, vec![vec![1, 2], vec![2, 3], vec![3, 4], vec![4]]);
  }

  #[test]
  fn time_buffers_flush_on_the_clock() {
    let sched = TestScheduler::new();
    let seen = MutArc::own(Vec::new());
    let c = seen.clone();
    observable::interval::<(), _>(Duration::from_millis(10), sched.clone())
      .buffer_time(Duration::from_millis(25), sched.clone())
      .subscribe(move |v| c.rc_deref_mut().push(v));

    // at t=50 the flush entry predates the tick entry, so item 4 opens the
    // next window
    sched.advance_by(Duration::from_millis(55));
    assert_eq!(*seen.rc_deref(), vec![vec![0, 1], vec![2, 3]]);
  }

  #[test]
  fn size_bound_flushes_early() {
    let sched = TestScheduler::new();
    let mut source = Subject::<i32, ()>::new();
    let seen = MutArc::own(Vec::new());
    let c = seen.clone();
    source
      .clone()
      .buffer_time_count(Duration::from_millis(50), 2, false, sched.clone())
      .subscribe(move |v| c.rc_deref_mut().push(v));

    source.next(1);
    source.next(2);
    source.next(3);
    assert_eq!(*seen.rc_deref(), vec![vec![1, 2]]);
    sched.advance_by(Duration::from_millis(50));
    assert_eq!(*seen.rc_deref(), vec![vec![1, 2], vec![3]]);
  }
}
