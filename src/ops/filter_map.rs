use crate::{
  observable::{Observable, ObservableExt},
  observer::Observer,
  type_hint::TypeHint,
};

/// Map and filter in one step: `None` drops the item.
#[derive(Clone)]
pub struct FilterMapOp<S, F, Item> {
  pub(crate) source: S,
  pub(crate) func: F,
  pub(crate) _hint: TypeHint<Item>,
}

impl<Item, Err, O, S, B, F> Observable<B, Err, O> for FilterMapOp<S, F, Item>
where
  O: Observer<B, Err>,
  S: Observable<Item, Err, FilterMapObserver<O, F>>,
  F: FnMut(Item) -> Option<B>,
{
  type Unsub = S::Unsub;

  fn actual_subscribe(self, observer: O) -> Self::Unsub {
    self.source.actual_subscribe(FilterMapObserver { observer, func: self.func })
  }
}

impl<Item, Err, B, S, F> ObservableExt<B, Err> for FilterMapOp<S, F, Item>
where
  S: ObservableExt<Item, Err>,
  F: FnMut(Item) -> Option<B>,
{
}

pub struct FilterMapObserver<O, F> {
  observer: O,
  func: F,
}

impl<Item, Err, O, B, F> Observer<Item, Err> for FilterMapObserver<O, F>
where
  O: Observer<B, Err>,
  F: FnMut(Item) -> Option<B>,
{
  fn next(&mut self, value: Item) {
    if let Some(mapped) = (self.func)(value) {
      self.observer.next(mapped)
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
