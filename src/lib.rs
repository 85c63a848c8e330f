//! Stillframe is the temporal memoization engine of a keyframe-animation
//! renderer.
//!
//! Animated documents are mostly still: between keyframes, a layer's content,
//! transform and masks hold constant values over long frame spans. Stillframe
//! computes those spans as *static time ranges*, collapses every frame of a
//! span onto one representative frame, and memoizes the per-frame artifacts
//! (content graphics, transforms, masks) under that representative. Cubic
//! bezier evaluations are deduplicated document-wide through a weak shared
//! cache keyed by quantized control points.
//!
//! The entry point is [`LayerCache`]:
//!
//! - [`LayerCache::get`] returns the process-wide shared cache for a layer
//! - [`LayerCache::static_time_ranges`] is the merged invariant-span list
//! - [`LayerCache::check_frame_changed`] answers "must this layer redraw?"
//! - `get_content` / `get_transform` / `get_masks` resolve memoized artifacts
//!
//! Nothing here fails at render time: malformed inputs degrade into less
//! caching (more frames treated as varying), never into stale artifacts.
#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod foundation;

pub mod bezier;
pub mod cache;
pub mod graphics;
pub mod model;
pub mod timeline;

pub use crate::foundation::core::{Affine, BezPath, Frame, Point, Point3D, TimeRange};
pub use crate::foundation::error::{StillframeError, StillframeResult};

pub use crate::bezier::path::BezierPath;
pub use crate::bezier::path3d::BezierPath3D;
pub use crate::bezier::shared_cache::SharedCache;
pub use crate::cache::content_cache::{ContentBuilder, ContentCache};
pub use crate::cache::frame_cache::FrameCache;
pub use crate::cache::layer_cache::LayerCache;
pub use crate::cache::store::LayerCacheStore;
pub use crate::cache::text_cache::TextContentCache;
pub use crate::graphics::content::{Content, FilterModifier, Graphic};
pub use crate::model::layer::{CachePolicy, Layer, LayerId, LayerKind, LayerType};
pub use crate::model::property::{Interpolation, Keyframe, Lerp, Property};
