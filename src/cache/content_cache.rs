//! Per-layer content computation and caching.

use std::sync::Arc;

use crate::cache::frame_cache::FrameCache;
use crate::cache::text_cache::TextBuilder;
use crate::foundation::core::{Frame, TimeRange};
use crate::graphics::content::{Content, FilterModifier, Graphic, make_picture};
use crate::model::layer::{CachePolicy, Color, Layer, LayerKind, LayerType};
use crate::timeline::ranges::{
    has_varying_time_range, merge_time_ranges, offset_time_ranges,
};

/// Strategy producing a layer kind's renderable content.
///
/// One implementation per [`LayerKind`]; the cache drives it twice, once to
/// learn where the content is static and then per representative frame to
/// build the artifact.
pub trait ContentBuilder: Send + Sync {
    /// Remove from `ranges` every composition-frame span during which the
    /// produced content varies.
    fn exclude_varying_ranges(&self, ranges: &mut Vec<TimeRange>);

    /// Build the graphic for `layer_frame`. `None` means the layer renders
    /// nothing at that frame, which is a valid cached result.
    fn build_content(&self, layer_frame: Frame) -> Option<Arc<Graphic>>;
}

struct EmptyBuilder;

impl ContentBuilder for EmptyBuilder {
    fn exclude_varying_ranges(&self, _ranges: &mut Vec<TimeRange>) {}

    fn build_content(&self, _layer_frame: Frame) -> Option<Arc<Graphic>> {
        None
    }
}

struct SolidBuilder {
    width: f64,
    height: f64,
    color: Color,
}

impl ContentBuilder for SolidBuilder {
    fn exclude_varying_ranges(&self, _ranges: &mut Vec<TimeRange>) {}

    fn build_content(&self, _layer_frame: Frame) -> Option<Arc<Graphic>> {
        Some(Arc::new(Graphic::Solid {
            width: self.width,
            height: self.height,
            color: self.color,
        }))
    }
}

struct ShapeBuilder {
    layer: Arc<Layer>,
}

impl ShapeBuilder {
    fn contents(&self) -> &[crate::model::layer::ShapeElement] {
        match &self.layer.kind {
            LayerKind::Shape { contents } => contents,
            _ => &[],
        }
    }
}

impl ContentBuilder for ShapeBuilder {
    fn exclude_varying_ranges(&self, ranges: &mut Vec<TimeRange>) {
        for element in self.contents() {
            element.path.exclude_varying_ranges(ranges);
            element.fill.exclude_varying_ranges(ranges);
        }
    }

    fn build_content(&self, layer_frame: Frame) -> Option<Arc<Graphic>> {
        let shapes: Vec<Arc<Graphic>> = self
            .contents()
            .iter()
            .map(|element| {
                Arc::new(Graphic::Shape {
                    path: element.path.value_at(layer_frame).0,
                    fill: element.fill.value_at(layer_frame),
                })
            })
            .collect();
        Graphic::compose(shapes)
    }
}

struct ImageBuilder {
    image_id: u32,
    width: f64,
    height: f64,
}

impl ContentBuilder for ImageBuilder {
    fn exclude_varying_ranges(&self, _ranges: &mut Vec<TimeRange>) {}

    fn build_content(&self, _layer_frame: Frame) -> Option<Arc<Graphic>> {
        Some(Arc::new(Graphic::Image {
            image_id: self.image_id,
            width: self.width,
            height: self.height,
        }))
    }
}

struct PreComposeBuilder {
    composition_id: u32,
    start_time: Frame,
    // Composition static ranges lifted into composition-frame space.
    static_time_ranges: Vec<TimeRange>,
}

impl PreComposeBuilder {
    fn new(layer: &Layer) -> Self {
        let LayerKind::PreCompose {
            composition_id,
            static_time_ranges,
        } = &layer.kind
        else {
            unreachable!("PreComposeBuilder requires a pre-compose layer");
        };
        let mut ranges = static_time_ranges.clone();
        offset_time_ranges(&mut ranges, layer.start_time);
        Self {
            composition_id: *composition_id,
            start_time: layer.start_time,
            static_time_ranges: ranges,
        }
    }
}

impl ContentBuilder for PreComposeBuilder {
    fn exclude_varying_ranges(&self, ranges: &mut Vec<TimeRange>) {
        merge_time_ranges(ranges, &self.static_time_ranges);
    }

    fn build_content(&self, layer_frame: Frame) -> Option<Arc<Graphic>> {
        Some(Arc::new(Graphic::Composition {
            composition_id: self.composition_id,
            composition_frame: layer_frame - self.start_time,
        }))
    }
}

/// Computes, memoizes and classifies a layer's renderable content.
///
/// The cache owns the layer's content static ranges and the filter/picture
/// caching decisions derived from the document.
pub struct ContentCache {
    layer: Arc<Layer>,
    builder: Box<dyn ContentBuilder>,
    cache: FrameCache<Content>,
    cache_id: u64,
    content_static: bool,
    has_filters: bool,
    cache_filters: bool,
    cache_enabled: bool,
}

impl ContentCache {
    /// Build the content cache for `layer`, choosing the builder by kind.
    pub fn new(layer: Arc<Layer>) -> Self {
        let builder: Box<dyn ContentBuilder> = match &layer.kind {
            LayerKind::Empty => Box::new(EmptyBuilder),
            LayerKind::Solid {
                width,
                height,
                color,
            } => Box::new(SolidBuilder {
                width: *width,
                height: *height,
                color: *color,
            }),
            LayerKind::Text { .. } => Box::new(TextBuilder::new(layer.clone())),
            LayerKind::Shape { .. } => Box::new(ShapeBuilder {
                layer: layer.clone(),
            }),
            LayerKind::Image {
                image_id,
                width,
                height,
            } => Box::new(ImageBuilder {
                image_id: *image_id,
                width: *width,
                height: *height,
            }),
            LayerKind::PreCompose { .. } => Box::new(PreComposeBuilder::new(&layer)),
        };
        Self::with_builder(layer, builder, None)
    }

    /// Build the cache around an explicit builder. `cache_id` defaults to the
    /// layer id when not given.
    pub fn with_builder(
        layer: Arc<Layer>,
        builder: Box<dyn ContentBuilder>,
        cache_id: Option<u64>,
    ) -> Self {
        let cache = FrameCache::new(layer.start_time, layer.duration_frames());
        let cache_id = cache_id.unwrap_or_else(|| u64::from(layer.id));
        let mut this = Self {
            layer,
            builder,
            cache,
            cache_id,
            content_static: false,
            has_filters: false,
            cache_filters: false,
            cache_enabled: false,
        };
        this.update();
        this
    }

    fn update(&mut self) {
        let visible = self.layer.visible_range();
        let duration = self.layer.duration_frames();

        let mut ranges = vec![visible];
        self.builder.exclude_varying_ranges(&mut ranges);
        offset_time_ranges(&mut ranges, -self.layer.start_time);
        self.content_static = !has_varying_time_range(&ranges, 0, duration - 1);
        // Stitched coverage (hold splits) is static frame by frame but has
        // several representatives; one picture id cannot stand for them all.
        let single_span = self.content_static && ranges.len() == 1;
        self.cache.set_static_time_ranges(ranges);

        self.has_filters = self.layer.has_filters();
        self.cache_filters = self.compute_cache_filters(visible);
        self.cache_enabled = match self.layer.cache_policy {
            CachePolicy::Enable => true,
            CachePolicy::Disable => false,
            CachePolicy::Auto => self.cache_filters || self.auto_cache(duration, single_span),
        };
    }

    /// Whether the layer's filters may be baked into the cached artifact.
    ///
    /// Requires every filter to be frame-invariant over the visible span and
    /// confined to the visible area; masks, motion blur and 3D transforms all
    /// interact with filter output, so any of them disables baking.
    fn compute_cache_filters(&self, visible: TimeRange) -> bool {
        if !self.has_filters
            || !self.layer.masks.is_empty()
            || self.layer.motion_blur
            || self.layer.transform_3d
        {
            return false;
        }
        if self
            .layer
            .effects
            .iter()
            .any(|e| !e.process_visible_area_only)
        {
            return false;
        }
        let mut ranges = vec![visible];
        for effect in &self.layer.effects {
            effect.exclude_varying_ranges(&mut ranges);
        }
        for style in &self.layer.layer_styles {
            style.exclude_varying_ranges(&mut ranges);
        }
        !has_varying_time_range(&ranges, visible.start, visible.end)
    }

    fn auto_cache(&self, duration: Frame, single_span: bool) -> bool {
        let vector_content = matches!(
            self.layer.layer_type(),
            LayerType::Text | LayerType::Shape
        );
        vector_content && duration > 1 && single_span
    }

    /// Fetch the content for `content_frame` (local frames), building and
    /// memoizing it on first use.
    pub fn get_content(&self, content_frame: Frame) -> Arc<Content> {
        self.cache
            .get_or_create(content_frame, |layer_frame| self.create(layer_frame))
    }

    fn create(&self, layer_frame: Frame) -> Content {
        let mut graphic = self.builder.build_content(layer_frame);
        if self.cache_filters {
            graphic = graphic.map(|inner| match FilterModifier::make(&self.layer, layer_frame) {
                Some(modifier) => modifier.apply(inner),
                None => inner,
            });
        }
        if self.cache_enabled {
            graphic = graphic.map(|inner| make_picture(self.cache_id, inner));
        }
        Content::new(graphic)
    }

    /// Whether the static ranges fully cover the visible span. Hold-style
    /// value jumps keep coverage intact (the split boundaries still separate
    /// their representative frames), so this reports static for them too.
    pub fn content_static(&self) -> bool {
        self.content_static
    }

    /// Whether the layer carries any filter at all.
    pub fn has_filters(&self) -> bool {
        self.has_filters
    }

    /// Whether filters are baked into cached content.
    pub fn cache_filters(&self) -> bool {
        self.cache_filters
    }

    /// Whether cached content is wrapped for GPU picture caching.
    pub fn cache_enabled(&self) -> bool {
        self.cache_enabled
    }

    /// The GPU picture-cache key used when caching is enabled.
    pub fn cache_id(&self) -> u64 {
        self.cache_id
    }

    /// Content static ranges in local frames.
    pub fn static_time_ranges(&self) -> &[TimeRange] {
        self.cache.static_time_ranges()
    }

    #[cfg(test)]
    pub(crate) fn entry_count(&self) -> usize {
        self.cache.entry_count()
    }
}

impl std::fmt::Debug for ContentCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContentCache")
            .field("layer", &self.layer.id)
            .field("content_static", &self.content_static)
            .field("cache_filters", &self.cache_filters)
            .field("cache_enabled", &self.cache_enabled)
            .finish_non_exhaustive()
    }
}
