use crate::{
  observable::{Observable, ObservableExt},
  observer::{BoxObserver, Observer},
  subscription::BoxSubscription,
};

trait ObservableObj<Item, Err>: Send {
  fn obj_subscribe(self: Box<Self>, observer: BoxObserver<Item, Err>) -> BoxSubscription;
}

struct ObjCell<S>(S);

impl<Item, Err, S> ObservableObj<Item, Err> for ObjCell<S>
where
  S: Observable<Item, Err, BoxObserver<Item, Err>> + Send,
  S::Unsub: Send + 'static,
{
  fn obj_subscribe(self: Box<Self>, observer: BoxObserver<Item, Err>) -> BoxSubscription {
    BoxSubscription::new(self.0.actual_subscribe(observer))
  }
}

/// A type-erased source. Operators that queue heterogeneous inner sources
/// (merge, concat) and drivers that resubscribe a stored source (redo
/// loops) work in terms of this form.
pub struct BoxOp<Item, Err>(Box<dyn ObservableObj<Item, Err>>);

/// Conversion into [`BoxOp`]; blanket-implemented for every source whose
/// subscription side is sendable.
pub trait BoxIt<Item, Err>: Sized {
  fn box_it(self) -> BoxOp<Item, Err>;
}

impl<Item, Err, S> BoxIt<Item, Err> for S
where
  S: Observable<Item, Err, BoxObserver<Item, Err>> + Send + 'static,
  S::Unsub: Send + 'static,
{
  fn box_it(self) -> BoxOp<Item, Err> {
    BoxOp(Box::new(ObjCell(self)))
  }
}

impl<Item, Err, O> Observable<Item, Err, O> for BoxOp<Item, Err>
where
  O: Observer<Item, Err> + Send + 'static,
{
  type Unsub = BoxSubscription;

  fn actual_subscribe(self, observer: O) -> Self::Unsub {
    self.0.obj_subscribe(BoxObserver::new(observer))
  }
}

impl<Item, Err> ObservableExt<Item, Err> for BoxOp<Item, Err> {}

#[cfg(test)]
mod test {
  use crate::prelude::*;

  #[test]
  fn erased_source_behaves_the_same() {
    let mut seen = Vec::new();
    let boxed = observable::from_iter::<_, ()>(0..3).map(|v| v + 1).box_it();
    boxed.subscribe(|v| seen.push(v));
    assert_eq!(seen, vec![1, 2, 3]);
  }
}
