//! Layer data model: the read-only document structure the caches observe.

use std::sync::Arc;

use kurbo::{BezPath, Point};

use crate::foundation::core::{Frame, TimeRange};
use crate::model::property::{Lerp, Property};

/// Unique layer identifier within a document.
pub type LayerId = u32;

/// Discriminant for [`LayerKind`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum LayerType {
    /// No renderable content.
    Empty,
    /// Fixed-size solid color quad.
    Solid,
    /// Keyframed text document.
    Text,
    /// Vector shape contents.
    Shape,
    /// Still image reference.
    Image,
    /// Nested composition reference.
    PreCompose,
}

/// Per-layer override controlling GPU picture caching of computed content.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum CachePolicy {
    /// Let the engine decide (the default).
    #[default]
    Auto,
    /// Always rasterize and cache.
    Enable,
    /// Never rasterize.
    Disable,
}

/// Straight-alpha RGBA color.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Color {
    /// Red channel.
    pub r: u8,
    /// Green channel.
    pub g: u8,
    /// Blue channel.
    pub b: u8,
    /// Alpha channel.
    pub a: u8,
}

impl Lerp for Color {
    fn lerp(a: &Self, b: &Self, t: f64) -> Self {
        fn lerp_u8(a: u8, b: u8, t: f64) -> u8 {
            let a = f64::from(a);
            let b = f64::from(b);
            (a + (b - a) * t).round().clamp(0.0, 255.0) as u8
        }
        Self {
            r: lerp_u8(a.r, b.r, t),
            g: lerp_u8(a.g, b.g, t),
            b: lerp_u8(a.b, b.b, t),
            a: lerp_u8(a.a, b.a, t),
        }
    }
}

/// An animatable vector path. Interpolation is a step function: path morphing
/// is handled upstream, the caches only need value identity.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct PathData(pub BezPath);

impl Lerp for PathData {
    fn lerp(a: &Self, b: &Self, t: f64) -> Self {
        if t < 1.0 { a.clone() } else { b.clone() }
    }
}

/// How a mask combines with the masks before it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum MaskMode {
    /// Union with prior coverage.
    Add,
    /// Remove from prior coverage.
    Subtract,
    /// Intersect with prior coverage.
    Intersect,
}

/// One animatable mask on a layer.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct Mask {
    /// Mask identifier, unique within the layer.
    pub id: u32,
    /// Combination mode.
    pub mode: MaskMode,
    /// Invert the mask coverage.
    pub inverted: bool,
    /// The mask outline.
    pub path: Property<PathData>,
    /// Mask opacity in `[0, 1]`.
    pub opacity: Property<f64>,
    /// Feather radius per axis, in pixels.
    pub feather: Property<Point>,
}

impl Mask {
    /// Remove from `ranges` every span where any mask channel varies.
    pub fn exclude_varying_ranges(&self, ranges: &mut Vec<TimeRange>) {
        self.path.exclude_varying_ranges(ranges);
        self.opacity.exclude_varying_ranges(ranges);
        self.feather.exclude_varying_ranges(ranges);
    }

    /// Whether this mask needs the feather-aware pipeline.
    pub fn needs_feather(&self) -> bool {
        let feathered = self
            .feather
            .values()
            .iter()
            .any(|f| f.x != 0.0 || f.y != 0.0);
        let translucent = self.opacity.values().iter().any(|o| **o < 1.0);
        feathered || translucent || self.opacity.animatable()
    }
}

/// A filter effect applied to the layer.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct Effect {
    /// Effect name (diagnostic only).
    pub name: String,
    /// Whether the effect reads pixels outside the visible area. Effects that
    /// do cannot be pre-baked into cached content.
    pub process_visible_area_only: bool,
    /// Animatable effect parameters.
    pub params: Vec<Property<f64>>,
}

impl Effect {
    /// Remove from `ranges` every span where any parameter varies.
    pub fn exclude_varying_ranges(&self, ranges: &mut Vec<TimeRange>) {
        for p in &self.params {
            p.exclude_varying_ranges(ranges);
        }
    }
}

/// A layer style (drop shadow, stroke, ...) applied after effects.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct LayerStyle {
    /// Style name (diagnostic only).
    pub name: String,
    /// Animatable style parameters.
    pub params: Vec<Property<f64>>,
}

impl LayerStyle {
    /// Remove from `ranges` every span where any parameter varies.
    pub fn exclude_varying_ranges(&self, ranges: &mut Vec<TimeRange>) {
        for p in &self.params {
            p.exclude_varying_ranges(ranges);
        }
    }
}

/// The layer's animatable 2D transform group.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct TransformGroup {
    /// Anchor point in layer space.
    pub anchor: Property<Point>,
    /// Position in parent space.
    pub position: Property<Point>,
    /// Dimension-split x position; overrides `position.x` when present.
    pub position_x: Option<Property<f64>>,
    /// Dimension-split y position; overrides `position.y` when present.
    pub position_y: Option<Property<f64>>,
    /// Per-axis scale, `1.0` is identity.
    pub scale: Property<Point>,
    /// Rotation in degrees.
    pub rotation: Property<f64>,
    /// Opacity in `[0, 1]`.
    pub opacity: Property<f64>,
}

impl Default for TransformGroup {
    fn default() -> Self {
        Self {
            anchor: Property::Static(Point::ZERO),
            position: Property::Static(Point::ZERO),
            position_x: None,
            position_y: None,
            scale: Property::Static(Point::new(1.0, 1.0)),
            rotation: Property::Static(0.0),
            opacity: Property::Static(1.0),
        }
    }
}

impl TransformGroup {
    /// Remove from `ranges` every span where any channel varies.
    pub fn exclude_varying_ranges(&self, ranges: &mut Vec<TimeRange>) {
        self.anchor.exclude_varying_ranges(ranges);
        self.position.exclude_varying_ranges(ranges);
        if let Some(position_x) = &self.position_x {
            position_x.exclude_varying_ranges(ranges);
        }
        if let Some(position_y) = &self.position_y {
            position_y.exclude_varying_ranges(ranges);
        }
        self.scale.exclude_varying_ranges(ranges);
        self.rotation.exclude_varying_ranges(ranges);
        self.opacity.exclude_varying_ranges(ranges);
    }

    /// The resolved position at `frame`, honoring dimension-split channels.
    pub fn position_at(&self, frame: Frame) -> Point {
        let mut position = self.position.value_at(frame);
        if let Some(position_x) = &self.position_x {
            position.x = position_x.value_at(frame);
        }
        if let Some(position_y) = &self.position_y {
            position.y = position_y.value_at(frame);
        }
        position
    }
}

/// Source text and layout options of a text layer.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct TextDocument {
    /// The text content, possibly multi-line.
    pub text: String,
    /// Font family name.
    pub font_family: String,
    /// Font size in pixels.
    pub font_size: f64,
    /// Additional per-glyph tracking in pixels.
    pub tracking: f64,
    /// Fill color.
    pub fill_color: Color,
}

impl Lerp for TextDocument {
    fn lerp(a: &Self, b: &Self, t: f64) -> Self {
        if t < 1.0 { a.clone() } else { b.clone() }
    }
}

/// Per-range text animator (tracking, position, opacity offsets).
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct TextAnimator {
    /// Tracking offset in pixels.
    pub tracking: Property<f64>,
    /// Position offset in pixels.
    pub position: Property<Point>,
    /// Opacity multiplier in `[0, 1]`.
    pub opacity: Property<f64>,
}

impl TextAnimator {
    /// Remove from `ranges` every span where any animator channel varies.
    pub fn exclude_varying_ranges(&self, ranges: &mut Vec<TimeRange>) {
        self.tracking.exclude_varying_ranges(ranges);
        self.position.exclude_varying_ranges(ranges);
        self.opacity.exclude_varying_ranges(ranges);
    }
}

/// Text-on-path options.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct TextPathOptions {
    /// Margin before the first glyph along the path.
    pub first_margin: Property<f64>,
}

/// Advanced per-document text options.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct TextMoreOptions {
    /// Anchor point grouping alignment.
    pub grouping_alignment: Property<Point>,
}

/// Type-specific layer payload.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub enum LayerKind {
    /// No renderable content.
    Empty,
    /// Fixed-size solid.
    Solid {
        /// Solid width in pixels.
        width: f64,
        /// Solid height in pixels.
        height: f64,
        /// Solid color.
        color: Color,
    },
    /// Keyframed text.
    Text {
        /// The keyframed source text document.
        source_text: Property<TextDocument>,
        /// Optional text-on-path options.
        path_options: Option<TextPathOptions>,
        /// Optional advanced options.
        more_options: Option<TextMoreOptions>,
        /// Text animators, applied live per frame.
        animators: Vec<TextAnimator>,
    },
    /// Animated vector shapes.
    Shape {
        /// Shape outlines with their fills.
        contents: Vec<ShapeElement>,
    },
    /// Still image reference.
    Image {
        /// Opaque image asset identifier.
        image_id: u32,
        /// Image width in pixels.
        width: f64,
        /// Image height in pixels.
        height: f64,
    },
    /// Nested composition reference.
    PreCompose {
        /// Opaque composition identifier.
        composition_id: u32,
        /// The composition's own static-range tracking, which already covers
        /// everything inside it, expressed in this layer's local frame space.
        static_time_ranges: Vec<TimeRange>,
    },
}

/// One fill-and-path element of a shape layer.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct ShapeElement {
    /// Outline path.
    pub path: Property<PathData>,
    /// Fill color.
    pub fill: Property<Color>,
}

/// A single layer of the animated document.
///
/// Treated as read-only by the caching subsystem for the lifetime of its
/// `LayerCache`.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct Layer {
    /// Unique layer id.
    pub id: LayerId,
    /// Layer name (diagnostic only).
    pub name: String,
    /// First frame of the layer in its composition timeline.
    pub start_time: Frame,
    /// Number of frames the layer is visible (>= 1).
    pub duration: Frame,
    /// 2D transform group.
    pub transform: TransformGroup,
    /// Whether the layer carries a 3D transform (unsupported by rendering).
    pub transform_3d: bool,
    /// Whether motion blur is enabled for this layer.
    pub motion_blur: bool,
    /// Picture-cache override.
    pub cache_policy: CachePolicy,
    /// Masks, in application order.
    pub masks: Vec<Mask>,
    /// Effects, in application order.
    pub effects: Vec<Effect>,
    /// Layer styles, in application order.
    pub layer_styles: Vec<LayerStyle>,
    /// Track matte source layer, if any.
    #[serde(skip)]
    pub track_matte: Option<Arc<Layer>>,
    /// Parent layer (transform inheritance), if any.
    #[serde(skip)]
    pub parent: Option<Arc<Layer>>,
    /// Type-specific payload.
    pub kind: LayerKind,
}

impl Layer {
    /// A minimal empty layer, useful as a starting point.
    pub fn empty(id: LayerId, start_time: Frame, duration: Frame) -> Self {
        Self {
            id,
            name: String::new(),
            start_time,
            duration: duration.max(1),
            transform: TransformGroup::default(),
            transform_3d: false,
            motion_blur: false,
            cache_policy: CachePolicy::Auto,
            masks: Vec::new(),
            effects: Vec::new(),
            layer_styles: Vec::new(),
            track_matte: None,
            parent: None,
            kind: LayerKind::Empty,
        }
    }

    /// The layer type discriminant.
    pub fn layer_type(&self) -> LayerType {
        match &self.kind {
            LayerKind::Empty => LayerType::Empty,
            LayerKind::Solid { .. } => LayerType::Solid,
            LayerKind::Text { .. } => LayerType::Text,
            LayerKind::Shape { .. } => LayerType::Shape,
            LayerKind::Image { .. } => LayerType::Image,
            LayerKind::PreCompose { .. } => LayerType::PreCompose,
        }
    }

    /// Duration clamped to at least one frame.
    pub fn duration_frames(&self) -> Frame {
        self.duration.max(1)
    }

    /// The span of composition frames during which the layer is visible,
    /// inclusive on both ends.
    pub fn visible_range(&self) -> TimeRange {
        TimeRange {
            start: self.start_time,
            end: self.start_time + self.duration_frames() - 1,
        }
    }

    /// Whether the layer has any effect, style, motion blur or 3D transform.
    pub fn has_filters(&self) -> bool {
        !self.effects.is_empty()
            || !self.layer_styles.is_empty()
            || self.motion_blur
            || self.transform_3d
    }
}
