use crate::{
  observable::{Observable, ObservableExt},
  observer::Observer,
  subscription::{SerialSubscription, ZipSubscription},
};

/// Replaces an error terminal with one synthesized item and a completion.
#[derive(Clone)]
pub struct OnErrorReturnOp<S, F> {
  pub(crate) source: S,
  pub(crate) func: F,
}

impl<Item, Err, O, S, F> Observable<Item, Err, O> for OnErrorReturnOp<S, F>
where
  O: Observer<Item, Err>,
  S: Observable<Item, Err, OnErrorReturnObserver<O, F>>,
  F: FnOnce(Err) -> Item,
{
  type Unsub = S::Unsub;

  fn actual_subscribe(self, observer: O) -> Self::Unsub {
    self.source.actual_subscribe(OnErrorReturnObserver { observer, func: self.func })
  }
}

impl<Item, Err, S, F> ObservableExt<Item, Err> for OnErrorReturnOp<S, F> where
  S: ObservableExt<Item, Err>
{
}

pub struct OnErrorReturnObserver<O, F> {
  observer: O,
  func: F,
}

impl<Item, Err, O, F> Observer<Item, Err> for OnErrorReturnObserver<O, F>
where
  O: Observer<Item, Err>,
  F: FnOnce(Err) -> Item,
{
  fn next(&mut self, value: Item) {
    self.observer.next(value)
  }

  fn error(mut self, err: Err) {
    self.observer.next((self.func)(err));
    self.observer.complete()
  }

  fn complete(self) {
    self.observer.complete()
  }

  fn is_finished(&self) -> bool {
    self.observer.is_finished()
  }
}

/// Swaps to a fallback source derived from the error.
#[derive(Clone)]
pub struct OnErrorResumeNextOp<S, F> {
  pub(crate) source: S,
  pub(crate) func: F,
}

impl<Item, Err, O, S, F, Fallback> Observable<Item, Err, O> for OnErrorResumeNextOp<S, F>
where
  O: Observer<Item, Err>,
  S: Observable<Item, Err, OnErrorResumeNextObserver<O, F>>,
  F: FnOnce(Err) -> Fallback,
  Fallback: Observable<Item, Err, O>,
  Fallback::Unsub: Send + 'static,
{
  type Unsub = ZipSubscription<S::Unsub, SerialSubscription>;

  fn actual_subscribe(self, observer: O) -> Self::Unsub {
    let resumed = SerialSubscription::default();
    let unsub = self.source.actual_subscribe(OnErrorResumeNextObserver {
      observer,
      func: self.func,
      resumed: resumed.clone(),
    });
    ZipSubscription::new(unsub, resumed)
  }
}

impl<Item, Err, S, F> ObservableExt<Item, Err> for OnErrorResumeNextOp<S, F> where
  S: ObservableExt<Item, Err>
{
}

pub struct OnErrorResumeNextObserver<O, F> {
  observer: O,
  func: F,
  resumed: SerialSubscription,
}

impl<Item, Err, O, F, Fallback> Observer<Item, Err> for OnErrorResumeNextObserver<O, F>
where
  O: Observer<Item, Err>,
  F: FnOnce(Err) -> Fallback,
  Fallback: Observable<Item, Err, O>,
  Fallback::Unsub: Send + 'static,
{
  fn next(&mut self, value: Item) {
    self.observer.next(value)
  }

  fn error(self, err: Err) {
    let fallback = (self.func)(err);
    self.resumed.swap(fallback.actual_subscribe(self.observer));
  }

  fn complete(self) {
    self.observer.complete()
  }

  fn is_finished(&self) -> bool {
    self.observer.is_finished()
  }
}

#[cfg(test)]
mod test {
  use crate::prelude::*;

  #[test]
  fn return_value_caps_the_stream() {
    let mut seen = Vec::new();
    let mut done = false;
    observable::from_iter::<_, &str>([1, 2, 3])
      .concat(observable::throw("boom"))
      .on_error_return(|_| -1)
      .subscribe_complete(|v| seen.push(v), || done = true);
    assert_eq!(seen, vec![1, 2, 3, -1]);
    assert!(done);
  }

  #[test]
  fn resume_switches_to_fallback() {
    let mut seen = Vec::new();
    observable::throw::<i32, &str>("x")
      .on_error_resume_next(|_| observable::from_iter([7, 8]))
      .subscribe(|v| seen.push(v));
    assert_eq!(seen, vec![7, 8]);
  }

  #[test]
  fn untouched_when_no_error() {
    let mut seen = Vec::new();
    observable::from_iter::<_, &str>([1]).on_error_return(|_| 0).subscribe(|v| seen.push(v));
    assert_eq!(seen, vec![1]);
  }
}
