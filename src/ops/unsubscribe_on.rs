use crate::{
  observable::{Observable, ObservableExt},
  observer::Observer,
  scheduler::{OnceTask, Scheduler, Worker},
  subscription::{BoxSubscription, Subscription, TeardownSubscription},
};

/// Moves the teardown work of a subscription onto a worker of the given
/// scheduler.
#[derive(Clone)]
pub struct UnsubscribeOnOp<S, SD> {
  pub(crate) source: S,
  pub(crate) scheduler: SD,
}

// runs on the worker; disposing the worker from its own task lets the
// dedicated loop wind down after this job
fn teardown_task<U, W>((unsub, worker): (U, W))
where
  U: Subscription,
  W: Worker,
{
  unsub.unsubscribe();
  worker.unsubscribe();
}

impl<Item, Err, O, S, SD> Observable<Item, Err, O> for UnsubscribeOnOp<S, SD>
where
  O: Observer<Item, Err>,
  S: Observable<Item, Err, O>,
  S::Unsub: Send + 'static,
  SD: Scheduler,
{
  type Unsub = BoxSubscription;

  fn actual_subscribe(self, observer: O) -> Self::Unsub {
    let unsub = self.source.actual_subscribe(observer);
    let worker = self.scheduler.create_worker();
    BoxSubscription::new(TeardownSubscription::new(move || {
      worker.schedule(
        OnceTask::new(teardown_task::<S::Unsub, SD::Worker>, (unsub, worker.clone())),
        None,
      );
    }))
  }
}

impl<Item, Err, S, SD> ObservableExt<Item, Err> for UnsubscribeOnOp<S, SD> where
  S: ObservableExt<Item, Err>
{
}

#[cfg(test)]
mod test {
  use crate::prelude::*;

  #[test]
  fn teardown_runs_on_the_worker_clock() {
    let sched = TestScheduler::new();
    let mut source = Subject::<i32, ()>::new();
    let seen = MutArc::own(Vec::new());
    let c = seen.clone();
    let sub = source
      .clone()
      .unsubscribe_on(sched.clone())
      .subscribe(move |v| c.rc_deref_mut().push(v));

    source.next(1);
    sub.unsubscribe();
    // delivery is gated right away; the subject detach itself waits on the
    // worker queue
    source.next(2);
    sched.run_pending();
    source.next(3);
    assert_eq!(*seen.rc_deref(), vec![1]);
  }
}
