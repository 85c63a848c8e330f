//! Shared cubic-bezier evaluators.
//!
//! Curves are approximated once as monotone polylines and deduplicated
//! document-wide through a weak-reference cache keyed by quantized control
//! points: every keyframe easing function and every 3D spatial motion path
//! that describes the same geometry at the same tolerance shares one instance.

pub(crate) mod curve;
pub mod key;
pub mod path;
pub mod path3d;
pub mod shared_cache;
