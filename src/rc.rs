//! Reference-counted wrappers for the mutable state that operators share
//! between their observer halves.
//!
//! `MutRc`/`MutArc` guard arbitrary state, `CellRc`/`CellArc` hold `Copy`
//! flags and counters without a borrow guard. Operator code is written
//! against the `RcDeref`/`RcDerefMut`/`SharedCell` traits so the two
//! families stay interchangeable.

use std::{
  cell::{Cell, Ref, RefCell, RefMut},
  ops::{Deref, DerefMut},
  sync::{Mutex, MutexGuard},
};

use crossbeam_utils::atomic::AtomicCell;
use rclite::{Arc, Rc};

/// Read access through a cloneable shared pointer.
pub trait RcDeref: Clone {
  type Target;
  type Ref<'a>: Deref<Target = Self::Target>
  where
    Self: 'a;

  fn rc_deref(&self) -> Self::Ref<'_>;
}

/// Write access through a cloneable shared pointer.
pub trait RcDerefMut: RcDeref {
  type MutRef<'a>: DerefMut<Target = Self::Target>
  where
    Self: 'a;

  fn rc_deref_mut(&self) -> Self::MutRef<'_>;
}

/// Get/set access for `Copy` values without holding a guard across calls.
pub trait SharedCell<T: Copy>: Clone {
  fn own(value: T) -> Self;
  fn get(&self) -> T;
  fn set(&self, value: T);
}

/// `Rc<RefCell<T>>` state for single-threaded collectors (mostly tests).
pub struct MutRc<T>(Rc<RefCell<T>>);

impl<T> MutRc<T> {
  pub fn own(value: T) -> Self {
    MutRc(Rc::new(RefCell::new(value)))
  }
}

impl<T> Clone for MutRc<T> {
  fn clone(&self) -> Self {
    MutRc(self.0.clone())
  }
}

impl<T: Default> Default for MutRc<T> {
  fn default() -> Self {
    Self::own(T::default())
  }
}

impl<T> RcDeref for MutRc<T> {
  type Target = T;
  type Ref<'a>
    = Ref<'a, T>
  where
    Self: 'a;

  fn rc_deref(&self) -> Self::Ref<'_> {
    self.0.borrow()
  }
}

impl<T> RcDerefMut for MutRc<T> {
  type MutRef<'a>
    = RefMut<'a, T>
  where
    Self: 'a;

  fn rc_deref_mut(&self) -> Self::MutRef<'_> {
    self.0.borrow_mut()
  }
}

/// `Arc<Mutex<T>>` state shared between the halves of a concurrent
/// operator. The mutex also provides the per-consumer serialization the
/// subscribe contract demands: only one callback can traverse the state at
/// a time.
pub struct MutArc<T>(Arc<Mutex<T>>);

impl<T> MutArc<T> {
  pub fn own(value: T) -> Self {
    MutArc(Arc::new(Mutex::new(value)))
  }
}

impl<T> Clone for MutArc<T> {
  fn clone(&self) -> Self {
    MutArc(self.0.clone())
  }
}

impl<T: Default> Default for MutArc<T> {
  fn default() -> Self {
    Self::own(T::default())
  }
}

impl<T> RcDeref for MutArc<T> {
  type Target = T;
  type Ref<'a>
    = MutexGuard<'a, T>
  where
    Self: 'a;

  fn rc_deref(&self) -> Self::Ref<'_> {
    self.0.lock().unwrap()
  }
}

impl<T> RcDerefMut for MutArc<T> {
  type MutRef<'a>
    = MutexGuard<'a, T>
  where
    Self: 'a;

  fn rc_deref_mut(&self) -> Self::MutRef<'_> {
    self.0.lock().unwrap()
  }
}

/// `Rc<Cell<T>>` counter for single-threaded use.
pub struct CellRc<T>(Rc<Cell<T>>);

impl<T: Copy> Clone for CellRc<T> {
  fn clone(&self) -> Self {
    CellRc(self.0.clone())
  }
}

impl<T: Copy + Default> Default for CellRc<T> {
  fn default() -> Self {
    Self::own(T::default())
  }
}

impl<T: Copy> SharedCell<T> for CellRc<T> {
  fn own(value: T) -> Self {
    CellRc(Rc::new(Cell::new(value)))
  }

  fn get(&self) -> T {
    self.0.get()
  }

  fn set(&self, value: T) {
    self.0.set(value)
  }
}

/// Lock-free atomic cell for flags and sequence counters shared across
/// threads.
pub struct CellArc<T>(Arc<AtomicCell<T>>);

impl<T: Copy> Clone for CellArc<T> {
  fn clone(&self) -> Self {
    CellArc(self.0.clone())
  }
}

impl<T: Copy + Default> Default for CellArc<T> {
  fn default() -> Self {
    Self::own(T::default())
  }
}

impl<T: Copy> SharedCell<T> for CellArc<T> {
  fn own(value: T) -> Self {
    CellArc(Arc::new(AtomicCell::new(value)))
  }

  fn get(&self) -> T {
    self.0.load()
  }

  fn set(&self, value: T) {
    self.0.store(value)
  }
}

impl<T: Copy + Eq> CellArc<T> {
  /// Atomically replace `current` with `new`, returning whether the swap
  /// happened.
  pub fn compare_set(&self, current: T, new: T) -> bool {
    self.0.compare_exchange(current, new).is_ok()
  }
}

#[cfg(test)]
mod test {
  use super::*;

  #[test]
  fn mut_arc_shares_state() {
    let a = MutArc::own(vec![1]);
    let b = a.clone();
    b.rc_deref_mut().push(2);
    assert_eq!(*a.rc_deref(), vec![1, 2]);
  }

  #[test]
  fn cell_arc_compare_set() {
    let flag = CellArc::own(false);
    assert!(flag.compare_set(false, true));
    assert!(!flag.compare_set(false, true));
    assert!(flag.get());
  }
}
