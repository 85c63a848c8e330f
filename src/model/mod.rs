//! Read-only animated document model consumed by the caches.
//!
//! This is deliberately a thin collaborator surface: just enough keyframed
//! property and layer structure to drive static-range exclusion, value
//! sampling and distinct-value enumeration.

pub mod layer;
pub mod property;
