//! Mask outline resolution and caching.
//!
//! Two pipelines share one shape of cache: plain masks resolve to clip paths,
//! feathered or translucent masks additionally carry their feather radius and
//! opacity so the renderer can rasterize them as soft coverage.

use std::sync::Arc;

use kurbo::{BezPath, Point};

use crate::cache::frame_cache::FrameCache;
use crate::foundation::core::{Frame, TimeRange};
use crate::model::layer::{Layer, MaskMode};
use crate::timeline::ranges::offset_time_ranges;

/// One resolved clip mask.
#[derive(Clone, Debug)]
pub struct MaskEntry {
    /// Mask outline in layer space.
    pub path: BezPath,
    /// Combination mode.
    pub mode: MaskMode,
    /// Invert the coverage.
    pub inverted: bool,
}

/// All of a layer's masks resolved at one representative frame.
#[derive(Clone, Debug, Default)]
pub struct LayerMasks {
    /// Masks in application order.
    pub entries: Vec<MaskEntry>,
}

/// Memoizes resolved clip masks per representative frame.
#[derive(Debug)]
pub struct MaskCache {
    layer: Arc<Layer>,
    cache: FrameCache<LayerMasks>,
}

impl MaskCache {
    /// Build the mask cache for `layer`.
    pub fn new(layer: Arc<Layer>) -> Self {
        let cache = mask_frame_cache(&layer);
        Self { layer, cache }
    }

    /// Mask static ranges in local frames.
    pub fn static_time_ranges(&self) -> &[TimeRange] {
        self.cache.static_time_ranges()
    }

    /// Fetch the resolved masks for `content_frame` (local frames).
    pub fn get_masks(&self, content_frame: Frame) -> Arc<LayerMasks> {
        self.cache.get_or_create(content_frame, |layer_frame| {
            let entries = self
                .layer
                .masks
                .iter()
                .map(|mask| MaskEntry {
                    path: mask.path.value_at(layer_frame).0,
                    mode: mask.mode,
                    inverted: mask.inverted,
                })
                .collect();
            LayerMasks { entries }
        })
    }
}

/// One resolved soft mask.
#[derive(Clone, Debug)]
pub struct FeatherMaskEntry {
    /// Mask outline in layer space.
    pub path: BezPath,
    /// Combination mode.
    pub mode: MaskMode,
    /// Invert the coverage.
    pub inverted: bool,
    /// Feather radius per axis, in pixels.
    pub feather: Point,
    /// Mask opacity in `[0, 1]`.
    pub opacity: f64,
}

/// All of a layer's masks resolved for the feather-aware pipeline.
#[derive(Clone, Debug, Default)]
pub struct FeatherMask {
    /// Masks in application order.
    pub entries: Vec<FeatherMaskEntry>,
}

/// Memoizes resolved soft masks per representative frame.
#[derive(Debug)]
pub struct FeatherMaskCache {
    layer: Arc<Layer>,
    cache: FrameCache<FeatherMask>,
}

impl FeatherMaskCache {
    /// Build the feather-mask cache for `layer`.
    pub fn new(layer: Arc<Layer>) -> Self {
        let cache = mask_frame_cache(&layer);
        Self { layer, cache }
    }

    /// Mask static ranges in local frames.
    pub fn static_time_ranges(&self) -> &[TimeRange] {
        self.cache.static_time_ranges()
    }

    /// Fetch the resolved soft masks for `content_frame` (local frames).
    pub fn get_feather_mask(&self, content_frame: Frame) -> Arc<FeatherMask> {
        self.cache.get_or_create(content_frame, |layer_frame| {
            let entries = self
                .layer
                .masks
                .iter()
                .map(|mask| FeatherMaskEntry {
                    path: mask.path.value_at(layer_frame).0,
                    mode: mask.mode,
                    inverted: mask.inverted,
                    feather: mask.feather.value_at(layer_frame),
                    opacity: mask.opacity.value_at(layer_frame).clamp(0.0, 1.0),
                })
                .collect();
            FeatherMask { entries }
        })
    }
}

fn mask_frame_cache<T>(layer: &Layer) -> FrameCache<T> {
    let mut cache = FrameCache::new(layer.start_time, layer.duration_frames());
    let mut ranges = vec![layer.visible_range()];
    for mask in &layer.masks {
        mask.exclude_varying_ranges(&mut ranges);
    }
    offset_time_ranges(&mut ranges, -layer.start_time);
    cache.set_static_time_ranges(ranges);
    cache
}
