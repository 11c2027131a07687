//! Operator implementations, one file per operator family.
//!
//! Every operator is a pair: an `XxxOp` struct holding the source plus its
//! parameters, and one or more `XxxObserver` wrappers translating the
//! downstream observer into the upstream one.

pub mod box_it;
pub mod buffer;
pub mod collect;
pub mod combine_latest;
pub mod concat;
pub mod debounce;
pub mod delay;
pub mod distinct;
pub mod filter;
pub mod filter_map;
pub mod finalize;
pub mod first;
pub mod group_by;
pub mod ignore_elements;
pub mod map;
pub mod map_to;
pub mod materialize;
pub mod merge;
pub mod merge_all;
pub mod observe_on;
pub mod on_error;
pub mod pairwise;
pub mod publish;
pub mod ref_count;
pub mod repeat;
pub mod retry;
pub mod sample;
pub mod scan;
pub mod skip;
pub mod start_with;
pub mod subscribe_on;
pub mod switch_map;
pub mod take;
pub mod tap;
pub mod throttle_time;
pub mod timeout;
pub mod timestamp;
pub mod unsubscribe_on;
pub mod window;
pub mod zip;
