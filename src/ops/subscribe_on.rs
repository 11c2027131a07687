use crate::{
  observable::{Observable, ObservableExt},
  observer::Observer,
  scheduler::{OnceTask, Scheduler, Worker},
  subscription::{SerialSubscription, ZipSubscription},
};

/// Performs the act of subscribing on a worker of the given scheduler,
/// exactly once. Unsubscribing before the worker got to it cancels the
/// pending subscribe outright.
#[derive(Clone)]
pub struct SubscribeOnOp<S, SD> {
  pub(crate) source: S,
  pub(crate) scheduler: SD,
}

fn subscribe_task<Item, Err, O, S>((source, observer, slot): (S, O, SerialSubscription))
where
  O: Observer<Item, Err>,
  S: Observable<Item, Err, O>,
  S::Unsub: Send + 'static,
{
  slot.swap(source.actual_subscribe(observer));
}

impl<Item, Err, O, S, SD> Observable<Item, Err, O> for SubscribeOnOp<S, SD>
where
  O: Observer<Item, Err> + Send + 'static,
  S: Observable<Item, Err, O> + Send + 'static,
  S::Unsub: Send + 'static,
  SD: Scheduler,
{
  type Unsub = ZipSubscription<SerialSubscription, SD::Worker>;

  fn actual_subscribe(self, observer: O) -> Self::Unsub {
    let worker = self.scheduler.create_worker();
    let slot = SerialSubscription::default();
    worker.schedule(
      OnceTask::new(subscribe_task::<Item, Err, O, S>, (self.source, observer, slot.clone())),
      None,
    );
    ZipSubscription::new(slot, worker)
  }
}

impl<Item, Err, S, SD> ObservableExt<Item, Err> for SubscribeOnOp<S, SD> where
  S: ObservableExt<Item, Err>
{
}

#[cfg(test)]
mod test {
  use std::{thread, time::Duration};

  use crate::prelude::*;

  #[test]
  fn subscription_happens_on_the_worker() {
    let seen = MutArc::own(Vec::new());
    let c = seen.clone();
    let sub_thread = MutArc::own(None);
    let ct = sub_thread.clone();
    observable::defer(move || {
      *ct.rc_deref_mut() = Some(thread::current().id());
      observable::from_iter::<_, ()>([1, 2])
    })
    .subscribe_on(Schedulers::new_thread())
    .subscribe(move |v| c.rc_deref_mut().push(v));

    thread::sleep(Duration::from_millis(80));
    assert_eq!(*seen.rc_deref(), vec![1, 2]);
    assert_ne!(*sub_thread.rc_deref(), Some(thread::current().id()));
  }

  #[test]
  fn cancelling_before_the_task_runs_prevents_subscription() {
    let sched = TestScheduler::new();
    let touched = MutArc::own(false);
    let c = touched.clone();
    let sub = observable::defer(move || {
      *c.rc_deref_mut() = true;
      observable::of::<_, ()>(1)
    })
    .subscribe_on(sched.clone())
    .subscribe(|_| {});

    sub.unsubscribe();
    sched.run_pending();
    assert!(!*touched.rc_deref());
  }
}
