use crate::{
  observable::{Observable, ObservableExt},
  observer::Observer,
};

/// Swallows every item, forwarding only the terminal.
#[derive(Clone)]
pub struct IgnoreElementsOp<S> {
  pub(crate) source: S,
}

impl<Item, Err, O, S> Observable<Item, Err, O> for IgnoreElementsOp<S>
where
  O: Observer<Item, Err>,
  S: Observable<Item, Err, IgnoreElementsObserver<O>>,
{
  type Unsub = S::Unsub;

  fn actual_subscribe(self, observer: O) -> Self::Unsub {
    self.source.actual_subscribe(IgnoreElementsObserver { observer })
  }
}

impl<Item, Err, S> ObservableExt<Item, Err> for IgnoreElementsOp<S> where S: ObservableExt<Item, Err>
{}

pub struct IgnoreElementsObserver<O> {
  observer: O,
}

impl<Item, Err, O> Observer<Item, Err> for IgnoreElementsObserver<O>
where
  O: Observer<Item, Err>,
{
  fn next(&mut self, _value: Item) {}

  fn error(self, err: Err) {
    self.observer.error(err)
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
  fn only_the_terminal_comes_through() {
    let mut count = 0;
    let mut done = false;
    observable::from_iter::<_, ()>(0..10)
      .ignore_elements()
      .subscribe_complete(|_| count += 1, || done = true);
    assert_eq!(count, 0);
    assert!(done);
  }
}
