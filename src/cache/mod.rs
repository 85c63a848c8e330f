//! The per-layer memoization caches.
//!
//! `FrameCache` is the generic build-once table; `ContentCache`,
//! `TransformCache`, `MaskCache` and `FeatherMaskCache` specialize it per
//! artifact kind; `LayerCache` is the per-layer façade that merges every
//! contributor's static ranges into the authoritative set.

pub mod content_cache;
pub mod frame_cache;
pub mod layer_cache;
pub mod mask_cache;
pub mod store;
pub mod text_cache;
pub mod transform_cache;
