//! The per-layer cache facade.
//!
//! `LayerCache` owns one of each artifact cache for a layer and computes the
//! authoritative static time ranges by intersecting every contributor:
//! content, transform, masks, the track matte (seen through its ancestors),
//! filters and finally the motion-blur boundary split. A malformed
//! contributor can only shrink the static set, which degrades into less
//! caching, never into stale artifacts.

use std::sync::Arc;

use kurbo::Point;

use crate::cache::content_cache::ContentCache;
use crate::cache::mask_cache::{FeatherMask, FeatherMaskCache, LayerMasks, MaskCache};
use crate::cache::store;
use crate::cache::transform_cache::{Transform2D, TransformCache};
use crate::foundation::core::{Frame, TimeRange};
use crate::graphics::content::Content;
use crate::model::layer::{Layer, LayerId};
use crate::timeline::ranges::{
    convert_frame_by_static_time_ranges, merge_time_ranges, offset_time_ranges,
    split_time_ranges_at,
};

/// All cached state for one layer.
///
/// Construction walks the whole document reachable from the layer (parent
/// chain, track matte) but never mutates it; the layer is treated as
/// read-only for the lifetime of the cache.
#[derive(Debug)]
pub struct LayerCache {
    layer: Arc<Layer>,
    content_cache: ContentCache,
    transform_cache: TransformCache,
    mask_cache: Option<MaskCache>,
    feather_mask_cache: Option<FeatherMaskCache>,
    static_time_ranges: Vec<TimeRange>,
    scale_factor: Point,
}

impl LayerCache {
    /// The shared cache for `layer`, created on first use.
    pub fn get(layer: &Arc<Layer>) -> Arc<LayerCache> {
        store::global().get_or_create(layer)
    }

    /// Drop the shared cache for `layer_id`, if any.
    pub fn invalidate(layer_id: LayerId) {
        store::global().invalidate(layer_id);
    }

    /// Build a standalone cache for `layer`.
    pub fn new(layer: Arc<Layer>) -> Self {
        let content_cache = ContentCache::new(layer.clone());
        let transform_cache = TransformCache::new(layer.clone());

        let feathered = layer.masks.iter().any(|m| m.needs_feather());
        let feather_mask_cache = if feathered {
            Some(FeatherMaskCache::new(layer.clone()))
        } else {
            None
        };
        let mask_cache = if !feathered && !layer.masks.is_empty() {
            Some(MaskCache::new(layer.clone()))
        } else {
            None
        };

        let scale_factor = max_scale_factor(&layer);
        let mut this = Self {
            layer,
            content_cache,
            transform_cache,
            mask_cache,
            feather_mask_cache,
            static_time_ranges: Vec::new(),
            scale_factor,
        };
        this.update_static_time_ranges();
        tracing::debug!(
            layer = this.layer.id,
            ranges = this.static_time_ranges.len(),
            content_static = this.content_cache.content_static(),
            "layer cache built"
        );
        this
    }

    fn update_static_time_ranges(&mut self) {
        // Content ranges already account for nested compositions: a
        // pre-compose carries its composition's ranges, which subsume every
        // layer inside it, so nothing nested is re-merged here.
        let mut ranges = self.content_cache.static_time_ranges().to_vec();
        merge_time_ranges(&mut ranges, self.transform_cache.static_time_ranges());
        if let Some(mask_cache) = &self.mask_cache {
            merge_time_ranges(&mut ranges, mask_cache.static_time_ranges());
        }
        if let Some(feather_mask_cache) = &self.feather_mask_cache {
            merge_time_ranges(&mut ranges, feather_mask_cache.static_time_ranges());
        }
        if let Some(matte) = &self.layer.track_matte {
            self.merge_track_matte_ranges(&mut ranges, matte);
        }
        if self.layer.has_filters() {
            self.merge_filter_ranges(&mut ranges);
        }
        if self.layer.motion_blur {
            // The first frame after a transform change still shows a blur
            // trail; force it out of the following static span.
            let starts: Vec<Frame> = self
                .transform_cache
                .static_time_ranges()
                .iter()
                .map(|r| r.start + 1)
                .collect();
            for start in starts {
                split_time_ranges_at(&mut ranges, start);
            }
        }
        self.static_time_ranges = ranges;
    }

    /// A matte frame is reused only where the matte layer itself is static
    /// and every ancestor transform above it is too; a moving parent
    /// invalidates the matte-relative ranges of everything below it.
    fn merge_track_matte_ranges(&self, ranges: &mut Vec<TimeRange>, matte: &Arc<Layer>) {
        let matte_cache = LayerCache::new(matte.clone());
        let mut matte_ranges = matte_cache.static_time_ranges.clone();
        offset_time_ranges(&mut matte_ranges, matte.start_time - self.layer.start_time);
        merge_time_ranges(ranges, &matte_ranges);

        let mut ancestor = matte.parent.clone();
        while let Some(parent) = ancestor {
            let mut parent_ranges = vec![parent.visible_range()];
            parent.transform.exclude_varying_ranges(&mut parent_ranges);
            offset_time_ranges(&mut parent_ranges, -self.layer.start_time);
            merge_time_ranges(ranges, &parent_ranges);
            ancestor = parent.parent.clone();
        }
    }

    fn merge_filter_ranges(&self, ranges: &mut Vec<TimeRange>) {
        let mut filter_ranges = vec![self.layer.visible_range()];
        for effect in &self.layer.effects {
            effect.exclude_varying_ranges(&mut filter_ranges);
        }
        for style in &self.layer.layer_styles {
            style.exclude_varying_ranges(&mut filter_ranges);
        }
        offset_time_ranges(&mut filter_ranges, -self.layer.start_time);
        merge_time_ranges(ranges, &filter_ranges);
    }

    /// The merged static time ranges in local frames.
    pub fn static_time_ranges(&self) -> &[TimeRange] {
        &self.static_time_ranges
    }

    /// Whether the layer's rendered output differs between two content
    /// frames. Frames outside the layer's span on the same side are
    /// indistinguishable (the layer renders nothing either way).
    pub fn check_frame_changed(&self, frame: Frame, last_frame: Frame) -> bool {
        if frame == last_frame {
            return false;
        }
        let duration = self.layer.duration_frames();
        let outside = |f: Frame| f < 0 || f >= duration;
        if outside(frame) && outside(last_frame) {
            // Changed only when one frame is before and the other after.
            return (frame < 0) != (last_frame < 0);
        }
        if outside(frame) != outside(last_frame) {
            return true;
        }
        convert_frame_by_static_time_ranges(&self.static_time_ranges, frame)
            != convert_frame_by_static_time_ranges(&self.static_time_ranges, last_frame)
    }

    /// Whether the layer draws anything at `content_frame`.
    pub fn content_visible(&self, content_frame: Frame) -> bool {
        if content_frame < 0 || content_frame >= self.layer.duration_frames() {
            return false;
        }
        if self.layer.transform_3d {
            // 3D transforms are not rendered; the layer contributes nothing.
            return false;
        }
        self.get_transform(content_frame).visible
    }

    /// The layer's content at `content_frame`.
    pub fn get_content(&self, content_frame: Frame) -> Arc<Content> {
        self.content_cache.get_content(content_frame)
    }

    /// The layer's resolved transform at `content_frame`.
    pub fn get_transform(&self, content_frame: Frame) -> Arc<Transform2D> {
        self.transform_cache.get_transform(content_frame)
    }

    /// The layer's clip masks at `content_frame`; `None` when the layer has
    /// no masks or they need the feather pipeline.
    pub fn get_masks(&self, content_frame: Frame) -> Option<Arc<LayerMasks>> {
        self.mask_cache.as_ref().map(|c| c.get_masks(content_frame))
    }

    /// The layer's soft masks at `content_frame`; `None` when no mask needs
    /// feathering.
    pub fn get_feather_mask(&self, content_frame: Frame) -> Option<Arc<FeatherMask>> {
        self.feather_mask_cache
            .as_ref()
            .map(|c| c.get_feather_mask(content_frame))
    }

    /// Upper bound of the accumulated scale this layer renders at, per axis.
    /// Used to size rasterization caches.
    pub fn scale_factor(&self) -> Point {
        self.scale_factor
    }

    /// Whether the content static ranges cover the whole visible span.
    pub fn content_static(&self) -> bool {
        self.content_cache.content_static()
    }

    /// Whether cached content is wrapped for GPU picture caching.
    pub fn cache_enabled(&self) -> bool {
        self.content_cache.cache_enabled()
    }

    /// Whether filters are baked into cached content.
    pub fn cache_filters(&self) -> bool {
        self.content_cache.cache_filters()
    }

    /// The cached layer.
    pub fn layer(&self) -> &Arc<Layer> {
        &self.layer
    }
}

/// Maximum absolute scale the layer can reach, accumulated through the
/// parent chain.
fn max_scale_factor(layer: &Layer) -> Point {
    let mut factor = layer
        .transform
        .scale
        .values()
        .iter()
        .fold(Point::ZERO, |acc, s| {
            Point::new(acc.x.max(s.x.abs()), acc.y.max(s.y.abs()))
        });
    if let Some(parent) = &layer.parent {
        let parent_factor = max_scale_factor(parent);
        factor.x *= parent_factor.x;
        factor.y *= parent_factor.y;
    }
    factor
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graphics::content::Graphic;
    use crate::model::layer::{Color, Effect, LayerKind, Mask, MaskMode, PathData, ShapeElement};
    use crate::model::property::{Interpolation, Keyframe, Property};

    fn animated_opacity(start: Frame, end: Frame) -> Property<f64> {
        Property::animated(vec![Keyframe::new(start, end, 0.0, 1.0, Interpolation::Linear)])
            .unwrap()
    }

    #[test]
    fn fully_static_layer_has_one_range() {
        let cache = LayerCache::new(Arc::new(Layer::empty(1, 0, 20)));
        assert_eq!(
            cache.static_time_ranges(),
            &[TimeRange { start: 0, end: 19 }]
        );
        assert!(!cache.check_frame_changed(0, 19));
    }

    #[test]
    fn transform_animation_narrows_layer_ranges() {
        let mut layer = Layer::empty(2, 0, 20);
        layer.transform.opacity = animated_opacity(5, 10);
        let cache = LayerCache::new(Arc::new(layer));
        assert_eq!(
            cache.static_time_ranges(),
            &[TimeRange { start: 0, end: 4 }, TimeRange { start: 10, end: 19 }]
        );
        assert!(cache.check_frame_changed(4, 5));
        assert!(!cache.check_frame_changed(10, 19));
    }

    #[test]
    fn motion_blur_splits_after_every_transform_range_start() {
        let mut layer = Layer::empty(3, 0, 20);
        layer.motion_blur = true;
        let cache = LayerCache::new(Arc::new(layer));
        // Frame 1 must be a boundary: no range spans both frame 0 and 1.
        assert_eq!(
            cache.static_time_ranges(),
            &[TimeRange { start: 0, end: 0 }, TimeRange { start: 1, end: 19 }]
        );
        assert!(cache.check_frame_changed(0, 1));
        assert!(!cache.check_frame_changed(1, 19));
    }

    #[test]
    fn hold_value_jump_survives_merging_static_contributors() {
        let red = Color {
            r: 255,
            g: 0,
            b: 0,
            a: 255,
        };
        let blue = Color {
            r: 0,
            g: 0,
            b: 255,
            a: 255,
        };
        let mut layer = Layer::empty(19, 0, 10);
        layer.kind = LayerKind::Shape {
            contents: vec![ShapeElement {
                path: Property::Static(PathData::default()),
                fill: Property::animated(vec![Keyframe::new(3, 7, red, blue, Interpolation::Hold)])
                    .unwrap(),
            }],
        };
        let cache = LayerCache::new(Arc::new(layer));
        // The fully static transform must not swallow the hold boundaries.
        assert_eq!(
            cache.static_time_ranges(),
            &[
                TimeRange { start: 0, end: 2 },
                TimeRange { start: 3, end: 6 },
                TimeRange { start: 7, end: 9 }
            ]
        );
        assert!(!cache.check_frame_changed(3, 6));
        assert!(cache.check_frame_changed(6, 7));

        let before = cache.get_content(6);
        let after = cache.get_content(7);
        assert!(!Arc::ptr_eq(&before, &after));
        let (Some(Graphic::Shape { fill: a, .. }), Some(Graphic::Shape { fill: b, .. })) =
            (before.graphic.as_deref(), after.graphic.as_deref())
        else {
            panic!("expected shape graphics");
        };
        assert_ne!(a, b);
    }

    #[test]
    fn same_side_out_of_range_frames_are_unchanged() {
        let cache = LayerCache::new(Arc::new(Layer::empty(4, 0, 10)));
        assert!(!cache.check_frame_changed(-5, -1));
        assert!(!cache.check_frame_changed(10, 25));
        assert!(cache.check_frame_changed(-1, 10));
        assert!(cache.check_frame_changed(-1, 0));
        assert!(cache.check_frame_changed(9, 10));
    }

    #[test]
    fn animated_filter_params_narrow_layer_ranges() {
        let mut layer = Layer::empty(5, 0, 20);
        layer.effects.push(Effect {
            name: "blur".to_owned(),
            process_visible_area_only: true,
            params: vec![
                Property::animated(vec![Keyframe::new(
                    0,
                    8,
                    0.0,
                    4.0,
                    Interpolation::Linear,
                )])
                .unwrap(),
            ],
        });
        let cache = LayerCache::new(Arc::new(layer));
        assert_eq!(
            cache.static_time_ranges(),
            &[TimeRange { start: 8, end: 19 }]
        );
    }

    #[test]
    fn track_matte_animation_invalidates_this_layer() {
        let mut matte = Layer::empty(6, 5, 20);
        matte.transform.opacity = animated_opacity(10, 15);
        let mut layer = Layer::empty(7, 5, 20);
        layer.track_matte = Some(Arc::new(matte));
        let cache = LayerCache::new(Arc::new(layer));
        // Matte local ranges [0,4],[10,19] align with this layer's.
        assert_eq!(
            cache.static_time_ranges(),
            &[TimeRange { start: 0, end: 4 }, TimeRange { start: 10, end: 19 }]
        );
    }

    #[test]
    fn matte_parent_transform_invalidates_too() {
        let mut grandparent = Layer::empty(8, 0, 20);
        grandparent.transform.opacity = animated_opacity(2, 4);
        let mut matte = Layer::empty(9, 0, 20);
        matte.parent = Some(Arc::new(grandparent));
        let mut layer = Layer::empty(10, 0, 20);
        layer.track_matte = Some(Arc::new(matte));
        let cache = LayerCache::new(Arc::new(layer));
        assert_eq!(
            cache.static_time_ranges(),
            &[TimeRange { start: 0, end: 1 }, TimeRange { start: 4, end: 19 }]
        );
    }

    #[test]
    fn feathered_mask_selects_the_feather_pipeline() {
        let mut layer = Layer::empty(11, 0, 10);
        layer.masks.push(Mask {
            id: 0,
            mode: MaskMode::Add,
            inverted: false,
            path: Property::Static(PathData::default()),
            opacity: Property::Static(0.5),
            feather: Property::Static(Point::ZERO),
        });
        let cache = LayerCache::new(Arc::new(layer));
        assert!(cache.get_masks(0).is_none());
        assert!(cache.get_feather_mask(0).is_some());
    }

    #[test]
    fn plain_mask_selects_the_clip_pipeline() {
        let mut layer = Layer::empty(12, 0, 10);
        layer.masks.push(Mask {
            id: 0,
            mode: MaskMode::Intersect,
            inverted: true,
            path: Property::Static(PathData::default()),
            opacity: Property::Static(1.0),
            feather: Property::Static(Point::ZERO),
        });
        let cache = LayerCache::new(Arc::new(layer));
        assert!(cache.get_masks(0).is_some());
        assert!(cache.get_feather_mask(0).is_none());
    }

    #[test]
    fn content_visible_honors_span_opacity_and_3d() {
        let mut layer = Layer::empty(13, 0, 10);
        layer.transform.opacity = Property::Static(0.0);
        let cache = LayerCache::new(Arc::new(layer));
        assert!(!cache.content_visible(0));

        let cache = LayerCache::new(Arc::new(Layer::empty(14, 0, 10)));
        assert!(cache.content_visible(0));
        assert!(!cache.content_visible(-1));
        assert!(!cache.content_visible(10));

        let mut layer = Layer::empty(15, 0, 10);
        layer.transform_3d = true;
        let cache = LayerCache::new(Arc::new(layer));
        assert!(!cache.content_visible(0));
    }

    #[test]
    fn scale_factor_accumulates_through_parents() {
        let mut parent = Layer::empty(16, 0, 10);
        parent.transform.scale = Property::Static(Point::new(2.0, 2.0));
        let mut layer = Layer::empty(17, 0, 10);
        layer.transform.scale = Property::animated(vec![Keyframe::new(
            0,
            5,
            Point::new(1.0, 1.0),
            Point::new(3.0, 0.5),
            Interpolation::Linear,
        )])
        .unwrap();
        layer.parent = Some(Arc::new(parent));
        let cache = LayerCache::new(Arc::new(layer));
        assert_eq!(cache.scale_factor(), Point::new(6.0, 2.0));
    }

    #[test]
    fn precompose_layer_adopts_composition_ranges_without_remerge() {
        let mut layer = Layer::empty(18, 0, 10);
        layer.kind = LayerKind::PreCompose {
            composition_id: 1,
            static_time_ranges: vec![TimeRange { start: 0, end: 6 }],
        };
        let cache = LayerCache::new(Arc::new(layer));
        assert_eq!(
            cache.static_time_ranges(),
            &[TimeRange { start: 0, end: 6 }]
        );
    }
}
