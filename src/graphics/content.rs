//! Graphic and content descriptors produced by the caches.

use std::sync::Arc;

use kurbo::BezPath;

use crate::foundation::core::Frame;
use crate::graphics::text::TextGlyphs;
use crate::model::layer::{Color, Layer, LayerId};

/// A renderable graphic tree node.
#[derive(Clone, Debug)]
pub enum Graphic {
    /// One filled vector outline. Shape layers with several elements compose
    /// their shapes via [`Graphic::compose`].
    Shape {
        /// Outline path.
        path: BezPath,
        /// Fill color.
        fill: Color,
    },
    /// A solid color quad.
    Solid {
        /// Width in pixels.
        width: f64,
        /// Height in pixels.
        height: f64,
        /// Fill color.
        color: Color,
    },
    /// Positioned glyphs sharing a pre-shaped glyph set.
    Glyphs {
        /// The shared shaped glyph set.
        glyphs: Arc<TextGlyphs>,
        /// Per-glyph position offset from animators, in pixels.
        offset: kurbo::Vec2,
        /// Extra tracking from animators, in pixels.
        tracking: f64,
        /// Opacity multiplier from animators, in `[0, 1]`.
        alpha: f64,
    },
    /// A still image reference.
    Image {
        /// Opaque image asset identifier.
        image_id: u32,
        /// Width in pixels.
        width: f64,
        /// Height in pixels.
        height: f64,
    },
    /// A nested composition reference, resolved by the renderer.
    Composition {
        /// Opaque composition identifier.
        composition_id: u32,
        /// The composition frame to render.
        composition_frame: Frame,
    },
    /// Several graphics drawn in order.
    Compose {
        /// Children in paint order.
        graphics: Vec<Arc<Graphic>>,
    },
    /// A graphic with a pre-baked filter chain for one exact frame.
    Filtered {
        /// The filter recipe.
        modifier: FilterModifier,
        /// The wrapped graphic.
        inner: Arc<Graphic>,
    },
    /// A graphic flagged for GPU picture caching under a stable id.
    Picture {
        /// Rasterization cache key.
        cache_id: u64,
        /// The wrapped graphic.
        inner: Arc<Graphic>,
    },
}

impl Graphic {
    /// Compose several graphics in paint order; a single child passes through
    /// unwrapped and an empty list yields `None`.
    pub fn compose(mut graphics: Vec<Arc<Graphic>>) -> Option<Arc<Graphic>> {
        match graphics.len() {
            0 => None,
            1 => graphics.pop(),
            _ => Some(Arc::new(Graphic::Compose { graphics })),
        }
    }
}

/// Recipe for applying a layer's effects and styles at one exact frame.
///
/// Opaque to the caches: they only decide when it is safe to bake it into the
/// cached artifact.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FilterModifier {
    /// The layer whose filters apply.
    pub layer_id: LayerId,
    /// The exact layer frame the filters were resolved at.
    pub layer_frame: Frame,
}

impl FilterModifier {
    /// Build the filter recipe for `layer` at `layer_frame`; `None` when the
    /// layer carries no filters at all.
    pub fn make(layer: &Layer, layer_frame: Frame) -> Option<Self> {
        if !layer.has_filters() {
            return None;
        }
        Some(Self {
            layer_id: layer.id,
            layer_frame,
        })
    }

    /// Wrap `graphic` with this filter recipe.
    pub fn apply(self, graphic: Arc<Graphic>) -> Arc<Graphic> {
        Arc::new(Graphic::Filtered {
            modifier: self,
            inner: graphic,
        })
    }
}

/// Wrap `graphic` for GPU picture caching under `cache_id`.
pub fn make_picture(cache_id: u64, graphic: Arc<Graphic>) -> Arc<Graphic> {
    Arc::new(Graphic::Picture {
        cache_id,
        inner: graphic,
    })
}

/// The per-frame artifact stored by a content cache.
///
/// Empty content (`graphic: None`) is a valid, cheap result, never an error.
#[derive(Clone, Debug, Default)]
pub struct Content {
    /// The renderable graphic, if the layer produces any.
    pub graphic: Option<Arc<Graphic>>,
}

impl Content {
    /// Content wrapping `graphic`.
    pub fn new(graphic: Option<Arc<Graphic>>) -> Self {
        Self { graphic }
    }

    /// Whether this content renders nothing.
    pub fn is_empty(&self) -> bool {
        self.graphic.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compose_unwraps_trivial_lists() {
        assert!(Graphic::compose(vec![]).is_none());

        let solid = Arc::new(Graphic::Solid {
            width: 1.0,
            height: 1.0,
            color: Color {
                r: 255,
                g: 0,
                b: 0,
                a: 255,
            },
        });
        let single = Graphic::compose(vec![solid.clone()]).unwrap();
        assert!(Arc::ptr_eq(&single, &solid));

        let pair = Graphic::compose(vec![solid.clone(), solid.clone()]).unwrap();
        assert!(matches!(&*pair, Graphic::Compose { graphics } if graphics.len() == 2));
    }

    #[test]
    fn filter_modifier_requires_filters() {
        let mut layer = Layer::empty(3, 0, 10);
        assert!(FilterModifier::make(&layer, 0).is_none());
        layer.motion_blur = true;
        let modifier = FilterModifier::make(&layer, 4).unwrap();
        assert_eq!(modifier.layer_id, 3);
        assert_eq!(modifier.layer_frame, 4);
    }
}
