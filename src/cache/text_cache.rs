//! Text layer content: pre-shaped glyph sets plus live animator overlays.
//!
//! Glyph layout is expensive and depends only on the document value, so every
//! distinct document a text property can produce is shaped once up front and
//! shared by digest. Animator channels are cheap and applied per frame on top
//! of the shared glyph set.

use std::collections::HashMap;
use std::sync::Arc;

use kurbo::Vec2;

use crate::cache::content_cache::{ContentBuilder, ContentCache};
use crate::foundation::core::{Frame, TimeRange};
use crate::graphics::content::{Content, Graphic};
use crate::graphics::text::{TextGlyphs, document_digest, shape_document};
use crate::model::layer::{Layer, LayerKind, TextAnimator};
use crate::model::property::Property;

pub(crate) struct TextBuilder {
    layer: Arc<Layer>,
    // Digest of every document value the property can produce.
    glyphs: HashMap<u64, Arc<TextGlyphs>>,
}

impl TextBuilder {
    pub(crate) fn new(layer: Arc<Layer>) -> Self {
        let mut glyphs = HashMap::new();
        if let LayerKind::Text { source_text, .. } = &layer.kind {
            for doc in source_text.values() {
                glyphs
                    .entry(document_digest(doc))
                    .or_insert_with(|| Arc::new(shape_document(doc)));
            }
        }
        tracing::debug!(
            layer = layer.id,
            documents = glyphs.len(),
            "pre-shaped text documents"
        );
        Self { layer, glyphs }
    }

    pub(crate) fn distinct_documents(&self) -> usize {
        self.glyphs.len()
    }

    fn text_kind(
        &self,
    ) -> (
        &Property<crate::model::layer::TextDocument>,
        &[TextAnimator],
    ) {
        let LayerKind::Text {
            source_text,
            animators,
            ..
        } = &self.layer.kind
        else {
            unreachable!("TextBuilder requires a text layer");
        };
        (source_text, animators)
    }
}

impl ContentBuilder for TextBuilder {
    fn exclude_varying_ranges(&self, ranges: &mut Vec<TimeRange>) {
        let LayerKind::Text {
            source_text,
            path_options,
            more_options,
            animators,
        } = &self.layer.kind
        else {
            return;
        };
        source_text.exclude_varying_ranges(ranges);
        if let Some(path_options) = path_options {
            path_options.first_margin.exclude_varying_ranges(ranges);
        }
        if let Some(more_options) = more_options {
            more_options
                .grouping_alignment
                .exclude_varying_ranges(ranges);
        }
        for animator in animators {
            animator.exclude_varying_ranges(ranges);
        }
    }

    fn build_content(&self, layer_frame: Frame) -> Option<Arc<Graphic>> {
        let (source_text, animators) = self.text_kind();
        let doc = source_text.value_at(layer_frame);
        let digest = document_digest(&doc);
        let glyphs = match self.glyphs.get(&digest) {
            Some(shared) => shared.clone(),
            // Interpolation is a step function, so every sampled document is a
            // keyframe value; this path only covers unexpected documents.
            None => Arc::new(shape_document(&doc)),
        };
        if glyphs.lines.iter().all(|line| line.glyphs.is_empty()) {
            return None;
        }

        let mut tracking = 0.0;
        let mut offset = Vec2::ZERO;
        let mut alpha = 1.0;
        for animator in animators {
            tracking += animator.tracking.value_at(layer_frame);
            offset += animator.position.value_at(layer_frame).to_vec2();
            alpha *= animator.opacity.value_at(layer_frame).clamp(0.0, 1.0);
        }

        Some(Arc::new(Graphic::Glyphs {
            glyphs,
            offset,
            tracking,
            alpha,
        }))
    }
}

/// Content cache for text layers, with glyph-set instrumentation.
#[derive(Debug)]
pub struct TextContentCache {
    inner: ContentCache,
    distinct_documents: usize,
}

impl TextContentCache {
    /// Build the text content cache for `layer`, pre-shaping every distinct
    /// document value.
    pub fn new(layer: Arc<Layer>) -> Self {
        Self::with_cache_id(layer, None)
    }

    /// Like [`TextContentCache::new`] with an explicit picture-cache key.
    pub fn with_cache_id(layer: Arc<Layer>, cache_id: Option<u64>) -> Self {
        let builder = TextBuilder::new(layer.clone());
        let distinct_documents = builder.distinct_documents();
        Self {
            inner: ContentCache::with_builder(layer, Box::new(builder), cache_id),
            distinct_documents,
        }
    }

    /// Number of distinct document values shaped up front.
    pub fn distinct_documents(&self) -> usize {
        self.distinct_documents
    }

    /// Fetch the content for `content_frame` (local frames).
    pub fn get_content(&self, content_frame: Frame) -> Arc<Content> {
        self.inner.get_content(content_frame)
    }

    /// Whether the text content is identical on every visible frame.
    pub fn content_static(&self) -> bool {
        self.inner.content_static()
    }

    /// Whether cached content is wrapped for GPU picture caching.
    pub fn cache_enabled(&self) -> bool {
        self.inner.cache_enabled()
    }

    /// The GPU picture-cache key used when caching is enabled.
    pub fn cache_id(&self) -> u64 {
        self.inner.cache_id()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::layer::{Color, TextDocument};
    use crate::model::property::{Interpolation, Keyframe};

    fn doc(text: &str) -> TextDocument {
        TextDocument {
            text: text.to_owned(),
            font_family: "Helvetica".to_owned(),
            font_size: 12.0,
            tracking: 0.0,
            fill_color: Color {
                r: 0,
                g: 0,
                b: 0,
                a: 255,
            },
        }
    }

    fn text_layer(id: u32, source_text: Property<TextDocument>) -> Arc<Layer> {
        let mut layer = Layer::empty(id, 0, 20);
        layer.kind = LayerKind::Text {
            source_text,
            path_options: None,
            more_options: None,
            animators: Vec::new(),
        };
        Arc::new(layer)
    }

    #[test]
    fn static_text_is_auto_cached() {
        let cache = TextContentCache::new(text_layer(1, Property::Static(doc("hello"))));
        assert!(cache.content_static());
        assert!(cache.cache_enabled());
        assert_eq!(cache.distinct_documents(), 1);

        let a = cache.get_content(0);
        let b = cache.get_content(19);
        assert!(Arc::ptr_eq(&a, &b));
        assert!(matches!(
            a.graphic.as_deref(),
            Some(Graphic::Picture { .. })
        ));
    }

    #[test]
    fn keyframed_documents_share_glyph_sets_by_digest() {
        // Three keyframe endpoints, two distinct documents.
        let source = Property::animated(vec![Keyframe::new(
            5,
            6,
            doc("one"),
            doc("two"),
            Interpolation::Hold,
        )])
        .unwrap();
        let cache = TextContentCache::new(text_layer(2, source));
        assert_eq!(cache.distinct_documents(), 2);
        // The document flip leaves several representatives, so the content is
        // served as bare glyphs, not a single picture.
        assert!(!cache.cache_enabled());

        // Hold interpolation: the document only flips at the keyframe end.
        let before = cache.get_content(0);
        let after = cache.get_content(10);
        let (Some(Graphic::Glyphs { glyphs: a, .. }), Some(Graphic::Glyphs { glyphs: b, .. })) =
            (before.graphic.as_deref(), after.graphic.as_deref())
        else {
            panic!("expected glyph graphics");
        };
        assert_ne!(a.doc_digest, b.doc_digest);
    }

    #[test]
    fn animators_keep_glyphs_shared_but_content_varying() {
        let mut layer = Layer::empty(3, 0, 10);
        layer.kind = LayerKind::Text {
            source_text: Property::Static(doc("hi")),
            path_options: None,
            more_options: None,
            animators: vec![TextAnimator {
                tracking: Property::animated(vec![Keyframe::new(
                    0,
                    10,
                    0.0,
                    5.0,
                    Interpolation::Linear,
                )])
                .unwrap(),
                position: Property::Static(kurbo::Point::ZERO),
                opacity: Property::Static(1.0),
            }],
        };
        let cache = TextContentCache::new(Arc::new(layer));
        assert!(!cache.content_static());

        let a = cache.get_content(2);
        let b = cache.get_content(4);
        assert!(!Arc::ptr_eq(&a, &b));
        let (Some(Graphic::Glyphs { glyphs: ga, tracking: ta, .. }),
            Some(Graphic::Glyphs { glyphs: gb, tracking: tb, .. })) =
            (a.graphic.as_deref(), b.graphic.as_deref())
        else {
            panic!("expected glyph graphics");
        };
        // The shaped glyph set is shared; only the overlay differs.
        assert!(Arc::ptr_eq(ga, gb));
        assert!(tb > ta);
    }

    #[test]
    fn cache_id_is_overridable_for_synthetic_layers() {
        let layer = text_layer(5, Property::Static(doc("shared")));
        let default_id = TextContentCache::new(layer.clone());
        assert_eq!(default_id.cache_id(), 5);
        let overridden = TextContentCache::with_cache_id(layer, Some(1234));
        assert_eq!(overridden.cache_id(), 1234);

        let content = overridden.get_content(0);
        let Some(Graphic::Picture { cache_id, .. }) = content.graphic.as_deref() else {
            panic!("expected picture-cached content");
        };
        assert_eq!(*cache_id, 1234);
    }

    #[test]
    fn empty_document_yields_empty_content() {
        let cache = TextContentCache::new(text_layer(4, Property::Static(doc(""))));
        assert!(cache.get_content(0).is_empty());
    }
}
