use crate::{
  observable::{Observable, ObservableExt},
  observer::Observer,
  type_hint::TypeHint,
};

#[derive(Clone)]
pub struct MapToOp<S, B, Item> {
  pub(crate) source: S,
  pub(crate) value: B,
  pub(crate) _hint: TypeHint<Item>,
}

impl<Item, Err, O, S, B> Observable<B, Err, O> for MapToOp<S, B, Item>
where
  O: Observer<B, Err>,
  S: Observable<Item, Err, MapToObserver<O, B>>,
  B: Clone,
{
  type Unsub = S::Unsub;

  fn actual_subscribe(self, observer: O) -> Self::Unsub {
    self.source.actual_subscribe(MapToObserver { observer, value: self.value })
  }
}

impl<Item, Err, B, S> ObservableExt<B, Err> for MapToOp<S, B, Item> where S: ObservableExt<Item, Err>
{}

pub struct MapToObserver<O, B> {
  observer: O,
  value: B,
}

impl<Item, Err, O, B> Observer<Item, Err> for MapToObserver<O, B>
where
  O: Observer<B, Err>,
  B: Clone,
{
  fn next(&mut self, _value: Item) {
    self.observer.next(self.value.clone())
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
  fn replaces_every_item() {
    let mut seen = Vec::new();
    observable::from_iter::<_, ()>(["a", "b", "c"]).map_to(7).subscribe(|v| seen.push(v));
    assert_eq!(seen, vec![7, 7, 7]);
  }
}
