//! Convenience imports: `use fluxion::prelude::*;`

pub use crate::{
  error::{MissingElementError, OverflowError, TimeoutError},
  flow::{from_flow, BackpressureStrategy, Demand, FlowObserver, FlowPublisher},
  observable,
  observable::{ConnectableObservable, Observable, ObservableExt, DEFAULT_BUFFER_SIZE},
  observer::{Notification, Observer},
  ops::throttle_time::ThrottleEdge,
  rc::{MutArc, MutRc, RcDeref, RcDerefMut, SharedCell},
  scheduler::{OnceTask, RepeatTask, Scheduler, Schedulers, TaskHandle, TestScheduler, Worker},
  subject::{BehaviorSubject, ReplaySubject, Subject},
  subscriber::Subscriber,
  subscription::{
    SerialSubscription, SharedSubscription, SingleSubscription, Subscription, SubscriptionGuard,
    TeardownSubscription, ZipSubscription,
  },
};
