use crate::lock::TransactionId;

use geostore_core::BoundingBox;
use std::sync::{Arc, RwLock};

/// Receives a [`FeatureEvent`] after every successful write.
pub trait FeatureListener: Send + Sync + 'static {
    fn changed(&self, event: &FeatureEvent);
}

impl<F> FeatureListener for F
where
    F: Fn(&FeatureEvent) + Send + Sync + 'static,
{
    fn changed(&self, event: &FeatureEvent) {
        self(event)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FeatureEvent {
    pub type_name: String,

    /// The transaction the write belongs to. `None` for auto-committed
    /// writes.
    pub transaction: Option<TransactionId>,

    pub kind: EventKind,

    /// Bounds of the affected geometries, before and after the write.
    /// `None` when unknown or when nothing spatial changed.
    pub bounds: Option<BoundingBox>,

    /// Number of affected features.
    pub count: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    Added,
    Changed,
    Removed,
}

#[derive(Default)]
pub(crate) struct Listeners {
    listeners: RwLock<Vec<Arc<dyn FeatureListener>>>,
}

impl Listeners {
    pub(crate) fn add(&self, listener: Arc<dyn FeatureListener>) {
        self.listeners
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(listener);
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.snapshot().is_empty()
    }

    pub(crate) fn fire(&self, event: FeatureEvent) {
        tracing::trace!(type_name = %event.type_name, kind = ?event.kind, "feature event");

        // Listeners may register other listeners
        for listener in self.snapshot() {
            listener.changed(&event);
        }
    }

    fn snapshot(&self) -> Vec<Arc<dyn FeatureListener>> {
        self.listeners
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

impl std::fmt::Debug for Listeners {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Listeners")
            .field("len", &self.snapshot().len())
            .finish()
    }
}

/// Merges two optional bounds.
pub(crate) fn union(a: Option<BoundingBox>, b: Option<BoundingBox>) -> Option<BoundingBox> {
    match (a, b) {
        (Some(mut a), Some(b)) => {
            a.expand_to_include(&b);
            Some(a)
        }
        (a, b) => a.or(b),
    }
}
