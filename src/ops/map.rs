use crate::{
  observable::{Observable, ObservableExt},
  observer::Observer,
  type_hint::TypeHint,
};

#[derive(Clone)]
pub struct MapOp<S, F, Item> {
  pub(crate) source: S,
  pub(crate) func: F,
  pub(crate) _hint: TypeHint<Item>,
}

impl<Item, Err, O, S, B, F> Observable<B, Err, O> for MapOp<S, F, Item>
where
  O: Observer<B, Err>,
  S: Observable<Item, Err, MapObserver<O, F>>,
  F: FnMut(Item) -> B,
{
  type Unsub = S::Unsub;

  fn actual_subscribe(self, observer: O) -> Self::Unsub {
    self.source.actual_subscribe(MapObserver { observer, func: self.func })
  }
}

impl<Item, Err, B, S, F> ObservableExt<B, Err> for MapOp<S, F, Item>
where
  S: ObservableExt<Item, Err>,
  F: FnMut(Item) -> B,
{
}

pub struct MapObserver<O, F> {
  observer: O,
  func: F,
}

impl<Item, Err, O, B, F> Observer<Item, Err> for MapObserver<O, F>
where
  O: Observer<B, Err>,
  F: FnMut(Item) -> B,
{
  fn next(&mut self, value: Item) {
    self.observer.next((self.func)(value))
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

#[cfg(test)]
mod test {
  use crate::prelude::*;

  #[test]
  fn maps_every_item() {
    let mut seen = Vec::new();
    observable::from_iter::<_, ()>(1..=3).map(|v| v * 10).subscribe(|v| seen.push(v));
    assert_eq!(seen, vec![10, 20, 30]);
  }

  #[test]
  fn changes_the_item_type() {
    let mut seen = Vec::new();
    observable::from_iter::<_, ()>([1, 22, 333])
      .map(|v: i32| v.to_string())
      .subscribe(|v| seen.push(v));
    assert_eq!(seen, vec!["1", "22", "333"]);
  }

  #[test]
  fn fused_maps_equal_one_map() {
    let mut fused = Vec::new();
    let mut chained = Vec::new();
    observable::from_iter::<_, ()>(0..5).map(|v| (v + 1) * 2).subscribe(|v| fused.push(v));
    observable::from_iter::<_, ()>(0..5).map(|v| v + 1).map(|v| v * 2).subscribe(|v| chained.push(v));
    assert_eq!(fused, chained);
  }
}
