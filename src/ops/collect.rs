use std::{
  collections::HashMap,
  hash::Hash,
};

use crate::{
  observable::{Observable, ObservableExt},
  observer::Observer,
};

macro_rules! forward_terminal_state {
  () => {
    fn error(self, err: Err) {
      self.observer.error(err)
    }

    fn is_finished(&self) -> bool {
      self.observer.is_finished()
    }
  };
}

/// Gathers the whole stream into one `Vec` emitted at completion.
#[derive(Clone)]
pub struct ToListOp<S> {
  pub(crate) source: S,
}

impl<Item, Err, O, S> Observable<Vec<Item>, Err, O> for ToListOp<S>
where
  O: Observer<Vec<Item>, Err>,
  S: Observable<Item, Err, ToListObserver<O, Item>>,
{
  type Unsub = S::Unsub;

  fn actual_subscribe(self, observer: O) -> Self::Unsub {
    self.source.actual_subscribe(ToListObserver { observer, list: Vec::new() })
  }
}

impl<Item, Err, S> ObservableExt<Vec<Item>, Err> for ToListOp<S> where S: ObservableExt<Item, Err> {}

pub struct ToListObserver<O, Item> {
  observer: O,
  list: Vec<Item>,
}

impl<Item, Err, O> Observer<Item, Err> for ToListObserver<O, Item>
where
  O: Observer<Vec<Item>, Err>,
{
  fn next(&mut self, value: Item) {
    self.list.push(value);
  }

  fn complete(mut self) {
    self.observer.next(std::mem::take(&mut self.list));
    self.observer.complete()
  }

  forward_terminal_state!();
}

/// Like [`ToListOp`], sorted before emission.
#[derive(Clone)]
pub struct ToSortedListOp<S> {
  pub(crate) source: S,
}

impl<Item, Err, O, S> Observable<Vec<Item>, Err, O> for ToSortedListOp<S>
where
  O: Observer<Vec<Item>, Err>,
  S: Observable<Item, Err, ToSortedListObserver<O, Item>>,
  Item: Ord,
{
  type Unsub = S::Unsub;

  fn actual_subscribe(self, observer: O) -> Self::Unsub {
    self.source.actual_subscribe(ToSortedListObserver { observer, list: Vec::new() })
  }
}

impl<Item, Err, S> ObservableExt<Vec<Item>, Err> for ToSortedListOp<S> where
  S: ObservableExt<Item, Err>
{
}

pub struct ToSortedListObserver<O, Item> {
  observer: O,
  list: Vec<Item>,
}

impl<Item, Err, O> Observer<Item, Err> for ToSortedListObserver<O, Item>
where
  O: Observer<Vec<Item>, Err>,
  Item: Ord,
{
  fn next(&mut self, value: Item) {
    self.list.push(value);
  }

  fn complete(mut self) {
    let mut list = std::mem::take(&mut self.list);
    list.sort();
    self.observer.next(list);
    self.observer.complete()
  }

  forward_terminal_state!();
}

/// Keys every item; the last item per key wins.
#[derive(Clone)]
pub struct ToMapOp<S, KF> {
  pub(crate) source: S,
  pub(crate) key_fn: KF,
}

impl<Item, Err, O, S, KF, Key> Observable<HashMap<Key, Item>, Err, O> for ToMapOp<S, KF>
where
  O: Observer<HashMap<Key, Item>, Err>,
  S: Observable<Item, Err, ToMapObserver<O, KF, Key, Item>>,
  KF: FnMut(&Item) -> Key,
  Key: Hash + Eq,
{
  type Unsub = S::Unsub;

  fn actual_subscribe(self, observer: O) -> Self::Unsub {
    self
      .source
      .actual_subscribe(ToMapObserver { observer, key_fn: self.key_fn, map: HashMap::new() })
  }
}

impl<Item, Err, S, KF, Key> ObservableExt<HashMap<Key, Item>, Err> for ToMapOp<S, KF>
where
  S: ObservableExt<Item, Err>,
  KF: FnMut(&Item) -> Key,
{
}

pub struct ToMapObserver<O, KF, Key, Item> {
  observer: O,
  key_fn: KF,
  map: HashMap<Key, Item>,
}

impl<Item, Err, O, KF, Key> Observer<Item, Err> for ToMapObserver<O, KF, Key, Item>
where
  O: Observer<HashMap<Key, Item>, Err>,
  KF: FnMut(&Item) -> Key,
  Key: Hash + Eq,
{
  fn next(&mut self, value: Item) {
    let key = (self.key_fn)(&value);
    self.map.insert(key, value);
  }

  fn complete(mut self) {
    self.observer.next(std::mem::take(&mut self.map));
    self.observer.complete()
  }

  forward_terminal_state!();
}

/// Keys every item; all items per key are collected in arrival order.
#[derive(Clone)]
pub struct ToMultimapOp<S, KF> {
  pub(crate) source: S,
  pub(crate) key_fn: KF,
}

impl<Item, Err, O, S, KF, Key> Observable<HashMap<Key, Vec<Item>>, Err, O> for ToMultimapOp<S, KF>
where
  O: Observer<HashMap<Key, Vec<Item>>, Err>,
  S: Observable<Item, Err, ToMultimapObserver<O, KF, Key, Item>>,
  KF: FnMut(&Item) -> Key,
  Key: Hash + Eq,
{
  type Unsub = S::Unsub;

  fn actual_subscribe(self, observer: O) -> Self::Unsub {
    self
      .source
      .actual_subscribe(ToMultimapObserver { observer, key_fn: self.key_fn, map: HashMap::new() })
  }
}

impl<Item, Err, S, KF, Key> ObservableExt<HashMap<Key, Vec<Item>>, Err> for ToMultimapOp<S, KF>
where
  S: ObservableExt<Item, Err>,
  KF: FnMut(&Item) -> Key,
{
}

pub struct ToMultimapObserver<O, KF, Key, Item> {
  observer: O,
  key_fn: KF,
  map: HashMap<Key, Vec<Item>>,
}

impl<Item, Err, O, KF, Key> Observer<Item, Err> for ToMultimapObserver<O, KF, Key, Item>
where
  O: Observer<HashMap<Key, Vec<Item>>, Err>,
  KF: FnMut(&Item) -> Key,
  Key: Hash + Eq,
{
  fn next(&mut self, value: Item) {
    let key = (self.key_fn)(&value);
    self.map.entry(key).or_default().push(value);
  }

  fn complete(mut self) {
    self.observer.next(std::mem::take(&mut self.map));
    self.observer.complete()
  }

  forward_terminal_state!();
}

#[cfg(test)]
mod test {
  use crate::prelude::*;

  #[test]
  fn to_list_gathers_everything() {
    let mut seen = Vec::new();
    observable::from_iter::<_, ()>(1..=5)
      .filter(|v| v % 2 == 0)
      .map(|v| v * 10)
      .to_list()
      .subscribe(|v| seen.push(v));
    assert_eq!(seen, vec![vec![20, 40]]);
  }

  #[test]
  fn to_sorted_list_orders() {
    let mut seen = Vec::new();
    observable::from_iter::<_, ()>([3, 1, 2]).to_sorted_list().subscribe(|v| seen.push(v));
    assert_eq!(seen, vec![vec![1, 2, 3]]);
  }

  #[test]
  fn to_map_last_wins() {
    let mut seen = None;
    observable::from_iter::<_, ()>([1, 2, 3, 4]).to_map(|v| v % 2).subscribe(|m| seen = Some(m));
    let map = seen.unwrap();
    assert_eq!(map[&0], 4);
    assert_eq!(map[&1], 3);
  }

  #[test]
  fn to_multimap_groups() {
    let mut seen = None;
    observable::from_iter::<_, ()>(1..=4).to_multimap(|v| v % 2).subscribe(|m| seen = Some(m));
    let map = seen.unwrap();
    assert_eq!(map[&1], vec![1, 3]);
    assert_eq!(map[&0], vec![2, 4]);
  }
}
