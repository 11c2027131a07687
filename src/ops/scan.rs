use crate::{
  observable::{Observable, ObservableExt},
  observer::Observer,
  type_hint::TypeHint,
};

/// Running fold: emits the seed, then every accumulation step.
#[derive(Clone)]
pub struct ScanOp<S, F, B, Item> {
  pub(crate) source: S,
  pub(crate) seed: B,
  pub(crate) acc: F,
  pub(crate) _hint: TypeHint<Item>,
}

impl<Item, Err, O, S, B, F> Observable<B, Err, O> for ScanOp<S, F, B, Item>
where
  O: Observer<B, Err>,
  S: Observable<Item, Err, ScanObserver<O, F, B>>,
  B: Clone,
  F: FnMut(&B, Item) -> B,
{
  type Unsub = S::Unsub;

  fn actual_subscribe(self, mut observer: O) -> Self::Unsub {
    observer.next(self.seed.clone());
    self
      .source
      .actual_subscribe(ScanObserver { observer, acc: self.acc, state: self.seed })
  }
}

impl<Item, Err, B, S, F> ObservableExt<B, Err> for ScanOp<S, F, B, Item>
where
  S: ObservableExt<Item, Err>,
  F: FnMut(&B, Item) -> B,
{
}

pub struct ScanObserver<O, F, B> {
  observer: O,
  acc: F,
  state: B,
}

impl<Item, Err, O, B, F> Observer<Item, Err> for ScanObserver<O, F, B>
where
  O: Observer<B, Err>,
  B: Clone,
  F: FnMut(&B, Item) -> B,
{
  fn next(&mut self, value: Item) {
    self.state = (self.acc)(&self.state, value);
    self.observer.next(self.state.clone())
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

/// Fold that emits only the final accumulation, at completion.
#[derive(Clone)]
pub struct ReduceOp<S, F, B, Item> {
  pub(crate) source: S,
  pub(crate) seed: B,
  pub(crate) acc: F,
  pub(crate) _hint: TypeHint<Item>,
}

impl<Item, Err, O, S, B, F> Observable<B, Err, O> for ReduceOp<S, F, B, Item>
where
  O: Observer<B, Err>,
  S: Observable<Item, Err, ReduceObserver<O, F, B>>,
  F: FnMut(B, Item) -> B,
{
  type Unsub = S::Unsub;

  fn actual_subscribe(self, observer: O) -> Self::Unsub {
    self
      .source
      .actual_subscribe(ReduceObserver { observer, acc: self.acc, state: Some(self.seed) })
  }
}

impl<Item, Err, B, S, F> ObservableExt<B, Err> for ReduceOp<S, F, B, Item>
where
  S: ObservableExt<Item, Err>,
  F: FnMut(B, Item) -> B,
{
}

pub struct ReduceObserver<O, F, B> {
  observer: O,
  acc: F,
  state: Option<B>,
}

impl<Item, Err, O, B, F> Observer<Item, Err> for ReduceObserver<O, F, B>
where
  O: Observer<B, Err>,
  F: FnMut(B, Item) -> B,
{
  fn next(&mut self, value: Item) {
    if let Some(state) = self.state.take() {
      self.state = Some((self.acc)(state, value));
    }
  }

  fn error(self, err: Err) {
    self.observer.error(err)
  }

  fn complete(mut self) {
    if let Some(state) = self.state.take() {
      self.observer.next(state);
    }
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
  fn scan_emits_seed_then_steps() {
    let mut seen = Vec::new();
    observable::from_iter::<_, ()>(1..=3).scan(0, |acc, v| acc + v).subscribe(|v| seen.push(v));
    assert_eq!(seen, vec![0, 1, 3, 6]);
  }

  #[test]
  fn reduce_emits_only_the_total() {
    let mut seen = Vec::new();
    observable::from_iter::<_, ()>(1..=4).reduce(0, |acc, v| acc + v).subscribe(|v| seen.push(v));
    assert_eq!(seen, vec![10]);
  }
}
