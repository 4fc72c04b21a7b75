//! Observer registry.
//!
//! Observers are plain callbacks registered per shared type and invoked in
//! registration order. A failing observer (an `Err` return or, when
//! isolation is enabled, a panic) is logged and counted; delivery carries on
//! with the next observer.

use crate::event::TypeEvent;
use concord_types::SharedId;
use std::collections::HashMap;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use tracing::warn;

/// Callback invoked with each event for an observed shared type.
pub type ObserverFn = Box<dyn FnMut(&TypeEvent) -> anyhow::Result<()> + Send>;

/// Handle returned by `observe`, used to unregister the callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObserverId(u64);

impl fmt::Display for ObserverId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "observer#{}", self.0)
    }
}

/// Why an observer failed.
#[derive(Debug, thiserror::Error)]
pub enum ObserverError {
    #[error("observer returned an error: {0}")]
    Failed(#[source] anyhow::Error),

    #[error("observer panicked: {0}")]
    Panicked(String),
}

struct Entry {
    id: ObserverId,
    callback: ObserverFn,
}

/// Callbacks registered per shared type.
#[derive(Default)]
pub(crate) struct ObserverRegistry {
    by_target: HashMap<SharedId, Vec<Entry>>,
    next_id: u64,
    failures: u64,
}

impl ObserverRegistry {
    pub(crate) fn register(&mut self, target: SharedId, callback: ObserverFn) -> ObserverId {
        self.next_id += 1;
        let id = ObserverId(self.next_id);
        self.by_target
            .entry(target)
            .or_default()
            .push(Entry { id, callback });
        id
    }

    pub(crate) fn unregister(&mut self, target: &SharedId, id: ObserverId) -> bool {
        let Some(entries) = self.by_target.get_mut(target) else {
            return false;
        };
        let before = entries.len();
        entries.retain(|e| e.id != id);
        entries.len() != before
    }

    pub(crate) fn count(&self, target: &SharedId) -> usize {
        self.by_target.get(target).map_or(0, Vec::len)
    }

    pub(crate) fn failures(&self) -> u64 {
        self.failures
    }

    /// Delivers each event to the observers of its target.
    pub(crate) fn dispatch(&mut self, events: &[TypeEvent], isolate_panics: bool) {
        for event in events {
            let Some(entries) = self.by_target.get_mut(&event.target.id) else {
                continue;
            };
            for entry in entries.iter_mut() {
                if let Err(err) = call(&mut entry.callback, event, isolate_panics) {
                    self.failures += 1;
                    warn!(observer = %entry.id, target = %event.target, "{err}");
                }
            }
        }
    }
}

fn call(callback: &mut ObserverFn, event: &TypeEvent, isolate_panics: bool) -> Result<(), ObserverError> {
    if !isolate_panics {
        return callback(event).map_err(ObserverError::Failed);
    }
    match panic::catch_unwind(AssertUnwindSafe(|| callback(event))) {
        Ok(result) => result.map_err(ObserverError::Failed),
        Err(payload) => {
            let msg = payload
                .downcast_ref::<&str>()
                .map(|s| (*s).to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            Err(ObserverError::Panicked(msg))
        }
    }
}

impl fmt::Debug for ObserverRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObserverRegistry")
            .field("targets", &self.by_target.len())
            .field("failures", &self.failures)
            .finish()
    }
}
