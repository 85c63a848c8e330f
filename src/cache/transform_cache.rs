//! Per-frame 2D transform resolution and caching.

use std::sync::Arc;

use kurbo::Affine;

use crate::cache::frame_cache::FrameCache;
use crate::foundation::core::{Frame, TimeRange};
use crate::model::layer::Layer;
use crate::timeline::ranges::offset_time_ranges;

/// A layer's resolved 2D transform at one representative frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Transform2D {
    /// Layer-to-parent matrix.
    pub matrix: Affine,
    /// Layer opacity in `[0, 1]`.
    pub alpha: f64,
    /// Whether the layer is visible at all (`alpha > 0`).
    pub visible: bool,
}

/// Memoizes the resolved transform per representative frame.
#[derive(Debug)]
pub struct TransformCache {
    layer: Arc<Layer>,
    cache: FrameCache<Transform2D>,
}

impl TransformCache {
    /// Build the transform cache for `layer`.
    pub fn new(layer: Arc<Layer>) -> Self {
        let mut cache = FrameCache::new(layer.start_time, layer.duration_frames());
        let mut ranges = vec![layer.visible_range()];
        layer.transform.exclude_varying_ranges(&mut ranges);
        offset_time_ranges(&mut ranges, -layer.start_time);
        cache.set_static_time_ranges(ranges);
        Self { layer, cache }
    }

    /// Transform static ranges in local frames.
    pub fn static_time_ranges(&self) -> &[TimeRange] {
        self.cache.static_time_ranges()
    }

    /// Fetch the resolved transform for `content_frame` (local frames).
    pub fn get_transform(&self, content_frame: Frame) -> Arc<Transform2D> {
        self.cache.get_or_create(content_frame, |layer_frame| {
            let t = &self.layer.transform;
            let anchor = t.anchor.value_at(layer_frame);
            let position = t.position_at(layer_frame);
            let scale = t.scale.value_at(layer_frame);
            let rotation = t.rotation.value_at(layer_frame);
            let alpha = t.opacity.value_at(layer_frame).clamp(0.0, 1.0);

            let matrix = Affine::translate(position.to_vec2())
                * Affine::rotate(rotation.to_radians())
                * Affine::scale_non_uniform(scale.x, scale.y)
                * Affine::translate(-anchor.to_vec2());
            Transform2D {
                matrix,
                alpha,
                visible: alpha > 0.0,
            }
        })
    }

    #[cfg(test)]
    pub(crate) fn entry_count(&self) -> usize {
        self.cache.entry_count()
    }
}
