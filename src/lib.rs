//! Push-based reactive streams.
//!
//! A [`observable::Observable`] delivers zero or more items to an
//! [`observer::Observer`] followed by at most one terminal, under a
//! subscribe handshake whose cancellation side is carried by
//! [`subscription::Subscription`] handles. On top of that contract sit the
//! composition operators ([`observable::ObservableExt`]), worker-based
//! schedulers ([`scheduler::Schedulers`]), multicast subjects
//! ([`subject::Subject`]), and a demand-signalling bridge ([`flow`]).
//!
//! ```
//! use fluxion::prelude::*;
//!
//! let mut evens = Vec::new();
//! observable::from_iter::<_, ()>(1..=5)
//!   .filter(|v| v % 2 == 0)
//!   .map(|v| v * 10)
//!   .subscribe(|v| evens.push(v));
//! assert_eq!(evens, vec![20, 40]);
//! ```

pub mod error;
pub mod flow;
pub mod hook;
pub mod observable;
pub mod observer;
pub mod ops;
pub mod prelude;
pub mod rc;
pub mod scheduler;
pub mod subject;
pub mod subscriber;
pub mod subscription;
pub mod type_hint;
