use crate::{
  observable::{Observable, ObservableExt},
  observer::Observer,
};

/// Emits `(previous, current)` from the second item on.
#[derive(Clone)]
pub struct PairwiseOp<S> {
  pub(crate) source: S,
}

impl<Item, Err, O, S> Observable<(Item, Item), Err, O> for PairwiseOp<S>
where
  O: Observer<(Item, Item), Err>,
  S: Observable<Item, Err, PairwiseObserver<O, Item>>,
  Item: Clone,
{
  type Unsub = S::Unsub;

  fn actual_subscribe(self, observer: O) -> Self::Unsub {
    self.source.actual_subscribe(PairwiseObserver { observer, prev: None })
  }
}

impl<Item, Err, S> ObservableExt<(Item, Item), Err> for PairwiseOp<S> where
  S: ObservableExt<Item, Err>
{
}

pub struct PairwiseObserver<O, Item> {
  observer: O,
  prev: Option<Item>,
}

impl<Item, Err, O> Observer<Item, Err> for PairwiseObserver<O, Item>
where
  O: Observer<(Item, Item), Err>,
  Item: Clone,
{
  fn next(&mut self, value: Item) {
    if let Some(prev) = self.prev.replace(value.clone()) {
      self.observer.next((prev, value));
    }
  }

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
