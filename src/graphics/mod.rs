//! Renderable content descriptors.
//!
//! The GPU resource layer is an external collaborator; these types are the
//! opaque artifacts the caches produce and hand to a renderer: composed
//! graphics, filter wrappers, picture-cache wrappers and shaped glyph sets.

pub mod content;
pub mod text;
