//! Resource-bracketed stream.

use crate::{
  error::CleanupError,
  hook,
  observable::{Observable, ObservableExt},
  observer::Observer,
  rc::{MutArc, RcDerefMut},
  subscription::{BoxSubscription, SingleSubscription, TeardownSubscription, ZipSubscription},
};

/// Acquire a resource, derive a stream from it, and release the resource
/// when the stream ends or the subscriber leaves.
///
/// With `eager_release` the release runs before the terminal is forwarded
/// (a failing release then replaces a completion with its error); lazily
/// it runs after, and failures go to the dropped-error hook.
pub fn using<R, Err, A, SF, Src, RF>(
  acquire: A,
  source: SF,
  release: RF,
  eager_release: bool,
) -> UsingObservable<A, SF, RF>
where
  A: FnOnce() -> Result<R, Err>,
  SF: FnOnce(&R) -> Src,
  RF: FnOnce(R) -> Result<(), CleanupError>,
{
  UsingObservable { acquire, source, release, eager_release }
}

#[derive(Clone)]
pub struct UsingObservable<A, SF, RF> {
  acquire: A,
  source: SF,
  release: RF,
  eager_release: bool,
}

type ReleaseSlot<R, RF> = MutArc<Option<(R, RF)>>;

fn run_release<R, RF>(slot: &ReleaseSlot<R, RF>) -> Option<Result<(), CleanupError>>
where
  RF: FnOnce(R) -> Result<(), CleanupError>,
{
  let taken = slot.rc_deref_mut().take();
  taken.map(|(resource, release)| release(resource))
}

pub struct UsingObserver<O, R, RF> {
  observer: O,
  slot: ReleaseSlot<R, RF>,
  eager_release: bool,
}

impl<Item, Err, O, R, RF> Observer<Item, Err> for UsingObserver<O, R, RF>
where
  O: Observer<Item, Err>,
  Err: From<CleanupError>,
  RF: FnOnce(R) -> Result<(), CleanupError>,
{
  fn next(&mut self, value: Item) {
    self.observer.next(value)
  }

  fn error(self, err: Err) {
    if self.eager_release {
      if let Some(Err(cleanup)) = run_release(&self.slot) {
        hook::dropped_signal("resource release failed alongside an error", Some(cleanup.detail));
      }
      self.observer.error(err);
    } else {
      self.observer.error(err);
      if let Some(Err(cleanup)) = run_release(&self.slot) {
        hook::dropped_signal("resource release failed after terminal", Some(cleanup.detail));
      }
    }
  }

  fn complete(self) {
    if self.eager_release {
      match run_release(&self.slot) {
        Some(Err(cleanup)) => self.observer.error(Err::from(cleanup)),
        _ => self.observer.complete(),
      }
    } else {
      self.observer.complete();
      if let Some(Err(cleanup)) = run_release(&self.slot) {
        hook::dropped_signal("resource release failed after terminal", Some(cleanup.detail));
      }
    }
  }

  fn is_finished(&self) -> bool {
    self.observer.is_finished()
  }
}

impl<Item, Err, O, A, SF, Src, RF, R> Observable<Item, Err, O> for UsingObservable<A, SF, RF>
where
  O: Observer<Item, Err>,
  Err: From<CleanupError>,
  A: FnOnce() -> Result<R, Err>,
  SF: FnOnce(&R) -> Src,
  Src: Observable<Item, Err, UsingObserver<O, R, RF>>,
  Src::Unsub: Send + 'static,
  RF: FnOnce(R) -> Result<(), CleanupError> + Send + 'static,
  R: Send + 'static,
{
  type Unsub = BoxSubscription;

  fn actual_subscribe(self, observer: O) -> Self::Unsub {
    let resource = match (self.acquire)() {
      Ok(resource) => resource,
      Err(err) => {
        observer.error(err);
        return BoxSubscription::new(SingleSubscription);
      }
    };
    let src = (self.source)(&resource);
    let slot: ReleaseSlot<R, RF> = MutArc::own(Some((resource, self.release)));
    let wrapped =
      UsingObserver { observer, slot: slot.clone(), eager_release: self.eager_release };
    let unsub = src.actual_subscribe(wrapped);
    let on_cancel = TeardownSubscription::new(move || {
      if let Some(Err(cleanup)) = run_release(&slot) {
        hook::dropped_signal("resource release failed on cancel", Some(cleanup.detail));
      }
    });
    BoxSubscription::new(ZipSubscription::new(unsub, on_cancel))
  }
}

impl<Item, Err, A, SF, RF> ObservableExt<Item, Err> for UsingObservable<A, SF, RF> {}
