//! Deterministic glyph layout for text documents.
//!
//! Real shaping/atlas generation lives in the renderer; this module produces
//! the stable per-document glyph geometry the caches pre-build and share.
//! Documents are keyed by a stable content digest so equal documents share
//! one glyph set.

use xxhash_rust::xxh3::Xxh3;

use crate::model::layer::TextDocument;

const DIGEST_SEED: u64 = 0x51c9_07a6_3f21_8d44;

/// Width of one glyph advance relative to the font size.
const ADVANCE_FACTOR: f64 = 0.6;
/// Baseline-to-baseline distance relative to the font size.
const LEADING_FACTOR: f64 = 1.2;

/// One positioned glyph.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Glyph {
    /// The character this glyph renders.
    pub ch: char,
    /// Pen x position in pixels.
    pub x: f64,
    /// Baseline y position in pixels.
    pub y: f64,
    /// Horizontal advance in pixels.
    pub advance: f64,
}

/// One shaped line of glyphs.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct GlyphLine {
    /// Glyphs in visual order.
    pub glyphs: Vec<Glyph>,
    /// Total advance of the line in pixels.
    pub width: f64,
}

/// The pre-shaped glyph set for one distinct text document value.
#[derive(Clone, Debug, PartialEq)]
pub struct TextGlyphs {
    /// Content digest of the source document.
    pub doc_digest: u64,
    /// Shaped lines, top to bottom.
    pub lines: Vec<GlyphLine>,
    /// Font size the layout was shaped at.
    pub font_size: f64,
}

/// Stable content digest of a text document.
pub fn document_digest(doc: &TextDocument) -> u64 {
    let mut h = Xxh3::with_seed(DIGEST_SEED);
    h.update(doc.text.as_bytes());
    h.update(&[0]);
    h.update(doc.font_family.as_bytes());
    h.update(&[0]);
    h.update(&doc.font_size.to_bits().to_le_bytes());
    h.update(&doc.tracking.to_bits().to_le_bytes());
    h.update(&[doc.fill_color.r, doc.fill_color.g, doc.fill_color.b, doc.fill_color.a]);
    h.digest()
}

/// Lay out `doc` into positioned glyph lines.
///
/// Deterministic for identical documents; whitespace advances the pen without
/// emitting a glyph.
pub fn shape_document(doc: &TextDocument) -> TextGlyphs {
    let advance = doc.font_size * ADVANCE_FACTOR + doc.tracking;
    let leading = doc.font_size * LEADING_FACTOR;

    let mut lines = Vec::new();
    for (row, raw_line) in doc.text.split('\n').enumerate() {
        let mut line = GlyphLine::default();
        let mut pen_x = 0.0;
        let baseline = doc.font_size + row as f64 * leading;
        for ch in raw_line.chars() {
            if !ch.is_whitespace() {
                line.glyphs.push(Glyph {
                    ch,
                    x: pen_x,
                    y: baseline,
                    advance,
                });
            }
            pen_x += advance;
        }
        line.width = pen_x;
        lines.push(line);
    }

    TextGlyphs {
        doc_digest: document_digest(doc),
        lines,
        font_size: doc.font_size,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::layer::Color;

    fn doc(text: &str) -> TextDocument {
        TextDocument {
            text: text.to_owned(),
            font_family: "Helvetica".to_owned(),
            font_size: 10.0,
            tracking: 0.0,
            fill_color: Color {
                r: 0,
                g: 0,
                b: 0,
                a: 255,
            },
        }
    }

    #[test]
    fn digest_is_stable_and_content_sensitive() {
        let a = doc("hello");
        let b = doc("hello");
        let c = doc("hellp");
        assert_eq!(document_digest(&a), document_digest(&b));
        assert_ne!(document_digest(&a), document_digest(&c));

        let mut resized = doc("hello");
        resized.font_size = 12.0;
        assert_ne!(document_digest(&a), document_digest(&resized));
    }

    #[test]
    fn layout_splits_lines_and_skips_whitespace() {
        let glyphs = shape_document(&doc("ab c\nd"));
        assert_eq!(glyphs.lines.len(), 2);
        assert_eq!(glyphs.lines[0].glyphs.len(), 3);
        assert_eq!(glyphs.lines[1].glyphs.len(), 1);
        // The space advanced the pen.
        assert!(glyphs.lines[0].glyphs[2].x > glyphs.lines[0].glyphs[1].x + 6.0);
        // Second row sits one leading below the first.
        assert!(glyphs.lines[1].glyphs[0].y > glyphs.lines[0].glyphs[0].y);
    }

    #[test]
    fn identical_documents_shape_identically() {
        assert_eq!(shape_document(&doc("same")), shape_document(&doc("same")));
    }
}
