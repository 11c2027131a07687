//! Adapt `std`/`futures` futures into one-shot streams.

use futures::executor::block_on;

use crate::{
  observable::{Observable, ObservableExt},
  observer::Observer,
  rc::MutArc,
  scheduler::{OnceTask, Scheduler, Worker},
  type_hint::TypeHint,
};

/// Drives `future` to completion on a worker of `scheduler`, emits its
/// output, then completes. The worker thread parks on the future, so pick
/// an elastic scheduler for long waits.
pub fn from_future<F, Err, SD>(future: F, scheduler: SD) -> FutureObservable<F, Err, SD>
where
  F: std::future::Future,
{
  FutureObservable { future, scheduler, _hint: TypeHint::new() }
}

#[derive(Clone)]
pub struct FutureObservable<F, Err, SD> {
  future: F,
  scheduler: SD,
  _hint: TypeHint<Err>,
}

fn run<F, Err, O>((future, mut slot): (F, MutArc<Option<O>>))
where
  F: std::future::Future,
  O: Observer<F::Output, Err>,
{
  let value = block_on(future);
  slot.next(value);
  slot.complete();
}

impl<F, Err, O, SD> Observable<F::Output, Err, O> for FutureObservable<F, Err, SD>
where
  F: std::future::Future + Send + 'static,
  F::Output: Send + 'static,
  O: Observer<F::Output, Err> + Send + 'static,
  Err: 'static,
  SD: Scheduler,
{
  type Unsub = SD::Worker;

  fn actual_subscribe(self, observer: O) -> Self::Unsub {
    let worker = self.scheduler.create_worker();
    let slot = MutArc::own(Some(observer));
    worker.schedule(OnceTask::new(run::<F, Err, O>, (self.future, slot)), None);
    worker
  }
}

impl<F, Err, SD> ObservableExt<F::Output, Err> for FutureObservable<F, Err, SD> where
  F: std::future::Future
{
}

/// Like [`from_future`] for futures resolving to `Result`: `Ok` emits and
/// completes, `Err` goes out as the stream error.
pub fn from_future_result<F, Item, Err, SD>(
  future: F,
  scheduler: SD,
) -> FutureResultObservable<F, SD>
where
  F: std::future::Future<Output = Result<Item, Err>>,
{
  FutureResultObservable { future, scheduler }
}

#[derive(Clone)]
pub struct FutureResultObservable<F, SD> {
  future: F,
  scheduler: SD,
}

fn run_result<F, Item, Err, O>((future, mut slot): (F, MutArc<Option<O>>))
where
  F: std::future::Future<Output = Result<Item, Err>>,
  O: Observer<Item, Err>,
{
  match block_on(future) {
    Ok(value) => {
      slot.next(value);
      slot.complete();
    }
    Err(err) => slot.error(err),
  }
}

impl<F, Item, Err, O, SD> Observable<Item, Err, O> for FutureResultObservable<F, SD>
where
  F: std::future::Future<Output = Result<Item, Err>> + Send + 'static,
  Item: Send + 'static,
  Err: Send + 'static,
  O: Observer<Item, Err> + Send + 'static,
  SD: Scheduler,
{
  type Unsub = SD::Worker;

  fn actual_subscribe(self, observer: O) -> Self::Unsub {
    let worker = self.scheduler.create_worker();
    let slot = MutArc::own(Some(observer));
    worker.schedule(OnceTask::new(run_result::<F, Item, Err, O>, (self.future, slot)), None);
    worker
  }
}

impl<F, Item, Err, SD> ObservableExt<Item, Err> for FutureResultObservable<F, SD> where
  F: std::future::Future<Output = Result<Item, Err>>
{
}

#[cfg(test)]
mod test {
  use std::{thread, time::Duration};

  use crate::prelude::*;

  #[test]
  fn resolves_and_completes() {
    let seen = MutArc::own(Vec::new());
    let c = seen.clone();
    observable::from_future::<_, (), _>(async { 99 }, Schedulers::new_thread())
      .subscribe(move |v| c.rc_deref_mut().push(v));
    thread::sleep(Duration::from_millis(60));
    assert_eq!(*seen.rc_deref(), vec![99]);
  }

  #[test]
  fn failed_future_errors() {
    let err = MutArc::own(None);
    let c = err.clone();
    observable::from_future_result(async { Err::<i32, _>("bad") }, Schedulers::new_thread())
      .subscribe_err(|_| {}, move |e| *c.rc_deref_mut() = Some(e));
    thread::sleep(Duration::from_millis(60));
    assert_eq!(*err.rc_deref(), Some("bad"));
  }
}
