//! Generic per-layer frame-to-artifact memo table.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::foundation::core::{Frame, TimeRange};
use crate::timeline::ranges::convert_frame_by_static_time_ranges;

/// Build-once memoization table from content frame to cached artifact.
///
/// Lookups are clamped into the layer's span and collapsed through the
/// owner's static time ranges onto a representative frame, so every frame of
/// a static span shares one entry.
/// Entries are never evicted; the cache owns its artifacts until dropped.
#[derive(Debug)]
pub struct FrameCache<T> {
    start_time: Frame,
    duration: Frame,
    static_time_ranges: Vec<TimeRange>,
    frames: Mutex<HashMap<Frame, Arc<T>>>,
}

impl<T> FrameCache<T> {
    /// Create a cache for a layer spanning `duration` frames starting at
    /// `start_time`; the static-range seed is the whole local span.
    pub fn new(start_time: Frame, duration: Frame) -> Self {
        let duration = duration.max(1);
        Self {
            start_time,
            duration,
            static_time_ranges: vec![TimeRange {
                start: 0,
                end: duration - 1,
            }],
            frames: Mutex::new(HashMap::new()),
        }
    }

    /// The cached layer's local duration in frames.
    pub fn duration(&self) -> Frame {
        self.duration
    }

    /// The static time ranges this cache collapses lookups through,
    /// expressed in local frames.
    pub fn static_time_ranges(&self) -> &[TimeRange] {
        &self.static_time_ranges
    }

    pub(crate) fn set_static_time_ranges(&mut self, ranges: Vec<TimeRange>) {
        self.static_time_ranges = ranges;
    }

    /// Number of distinct entries built so far (test instrumentation).
    pub fn entry_count(&self) -> usize {
        self.lock().len()
    }

    /// Fetch the artifact for `content_frame`, building it on first use.
    ///
    /// The frame is clamped into `[0, duration - 1]`, remapped to its
    /// representative frame, then looked up under the cache mutex. Clamping
    /// comes first so an out-of-range frame lands in the edge frame's static
    /// range and shares its entry. On a miss, `build` runs with the
    /// corresponding layer frame (`representative + start_time`) while the
    /// lock is held, which gives the at-most-one-build-per-key guarantee.
    pub fn get_or_create(&self, content_frame: Frame, build: impl FnOnce(Frame) -> T) -> Arc<T> {
        let clamped = content_frame.clamp(0, self.duration - 1);
        let remapped = convert_frame_by_static_time_ranges(&self.static_time_ranges, clamped);

        let mut frames = self.lock();
        frames
            .entry(remapped)
            .or_insert_with(|| {
                tracing::trace!(frame = remapped, "frame cache miss, building");
                Arc::new(build(remapped + self.start_time))
            })
            .clone()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<Frame, Arc<T>>> {
        match self.frames.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}
