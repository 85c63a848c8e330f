//! Process-wide registry of layer caches.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, OnceLock};

use crate::cache::layer_cache::LayerCache;
use crate::model::layer::{Layer, LayerId};

type Slot = Arc<OnceLock<Arc<LayerCache>>>;

/// Maps layer ids to their shared [`LayerCache`].
///
/// Cache construction is expensive (it walks the matte and parent chains),
/// so it runs outside the registry lock; the per-layer `OnceLock` slot still
/// guarantees at most one cache is ever built per layer.
#[derive(Debug, Default)]
pub struct LayerCacheStore {
    slots: Mutex<HashMap<LayerId, Slot>>,
}

impl LayerCacheStore {
    /// An empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// The cache for `layer`, building it on first use.
    pub fn get_or_create(&self, layer: &Arc<Layer>) -> Arc<LayerCache> {
        let slot = self.lock().entry(layer.id).or_default().clone();
        slot.get_or_init(|| Arc::new(LayerCache::new(layer.clone())))
            .clone()
    }

    /// Drop the cache slot for `layer_id`. Existing handles stay valid; the
    /// next lookup builds a fresh cache.
    pub fn invalidate(&self, layer_id: LayerId) {
        if self.lock().remove(&layer_id).is_some() {
            tracing::debug!(layer = layer_id, "layer cache invalidated");
        }
    }

    /// Number of registered layers.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether no layer is registered.
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<LayerId, Slot>> {
        match self.slots.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

/// The process-wide store behind [`LayerCache::get`].
pub(crate) fn global() -> &'static LayerCacheStore {
    static STORE: OnceLock<LayerCacheStore> = OnceLock::new();
    STORE.get_or_init(LayerCacheStore::new)
}
