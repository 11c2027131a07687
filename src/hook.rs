//! Process-wide sink for signals that no consumer can receive anymore.
//!
//! A stream may produce an error after its subscriber terminated or
//! cancelled, an operator may have to discard surplus deferred errors, and
//! a resource release may fail after the terminal already went out. Those
//! signals must not vanish: they are funnelled here. The default hook logs
//! them through `tracing`.

use std::sync::RwLock;

use lazy_static::lazy_static;

/// A signal that had no live consumer left to deliver to.
#[derive(Debug)]
pub struct DroppedError {
  /// Which rule produced the report, e.g. `"error after terminal"`.
  pub context: &'static str,
  /// Best-effort rendering of the dropped value, when the call site has one.
  pub detail: Option<String>,
}

type Hook = Box<dyn Fn(&DroppedError) + Send + Sync>;

lazy_static! {
  static ref DROPPED_ERROR_HOOK: RwLock<Option<Hook>> = RwLock::new(None);
}

/// Install a process-wide consumer for undeliverable signals.
pub fn set_dropped_error_hook<F>(hook: F)
where
  F: Fn(&DroppedError) + Send + Sync + 'static,
{
  *DROPPED_ERROR_HOOK.write().unwrap() = Some(Box::new(hook));
}

/// Restore the default logging hook.
pub fn reset_dropped_error_hook() {
  *DROPPED_ERROR_HOOK.write().unwrap() = None;
}

pub(crate) fn dropped_signal(context: &'static str, detail: Option<String>) {
  let report = DroppedError { context, detail };
  let hook = DROPPED_ERROR_HOOK.read().unwrap();
  match &*hook {
    Some(hook) => hook(&report),
    None => match &report.detail {
      Some(detail) => tracing::error!(context = report.context, %detail, "dropped stream signal"),
      None => tracing::error!(context = report.context, "dropped stream signal"),
    },
  }
}

#[cfg(test)]
mod test {
  use super::*;
  use crate::rc::{CellArc, SharedCell};

  #[test]
  fn custom_hook_receives_reports() {
    let seen = CellArc::own(0u32);
    let c = seen.clone();
    // other tests may report concurrently; count only this test's marker
    set_dropped_error_hook(move |report| {
      if report.context == "hook smoke report" {
        c.set(c.get() + 1)
      }
    });
    dropped_signal("hook smoke report", None);
    assert_eq!(seen.get(), 1);
    reset_dropped_error_hook();
  }
}
