//! The sorted presentation-time index produced by the [`FrameIndexer`](crate::FrameIndexer).

use crate::search;
use crate::time::MediaTime;

/// A frame located by a [`FrameIndex`] query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexedFrame {
    /// Position of the frame in presentation order.
    pub index: usize,
    /// The frame's presentation time.
    pub time: MediaTime,
}

/// The presentation times of every frame of a video track, in
/// non-decreasing order.
///
/// Duplicate times are legal (for example, repeated fields) and are kept.
///
/// # Example
///
/// ```
/// use framegrab::{FrameIndex, MediaTime};
///
/// let index = FrameIndex::from_unsorted(vec![
///     MediaTime::new(20, 1),
///     MediaTime::new(10, 1),
/// ]);
/// let nearest = index.nearest_time(MediaTime::new(15, 1)).unwrap();
/// assert_eq!(nearest.time, MediaTime::new(10, 1));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FrameIndex {
    times: Vec<MediaTime>,
}

impl FrameIndex {
    /// Build an index, sorting the times ascending. The sort is stable.
    pub fn from_unsorted(mut times: Vec<MediaTime>) -> Self {
        times.sort();
        Self { times }
    }

    /// All presentation times, ascending.
    pub fn times(&self) -> &[MediaTime] {
        &self.times
    }

    /// Number of indexed frames.
    pub fn len(&self) -> usize {
        self.times.len()
    }

    /// `true` if the index holds no frames.
    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    /// The time of frame `index`.
    pub fn get(&self, index: usize) -> Option<MediaTime> {
        self.times.get(index).copied()
    }

    /// Time of the first and last frame.
    pub fn span(&self) -> Option<(MediaTime, MediaTime)> {
        Some((*self.times.first()?, *self.times.last()?))
    }

    /// The first frame displayed exactly at `time`.
    pub fn first_index_of(&self, time: MediaTime) -> Option<usize> {
        search::first_index_equal_to(&self.times, &time)
    }

    /// The last frame whose presentation time is at or before `time`, i.e.
    /// the frame on screen at `time`.
    pub fn last_index_at_or_before(&self, time: MediaTime) -> Option<IndexedFrame> {
        let index = search::last_index_less_or_equal_to(&self.times, &time)?;
        Some(IndexedFrame {
            index,
            time: self.times[index],
        })
    }

    /// The frame whose time is closest to `target`.
    ///
    /// When the frames on either side of `target` are equally distant, the
    /// earlier one wins. Returns `None` only for an empty index.
    pub fn nearest_time(&self, target: MediaTime) -> Option<IndexedFrame> {
        let right = search::right_insertion_point(&self.times, &target);

        let index = match (right.checked_sub(1), self.times.get(right)) {
            (None, None) => return None,
            (None, Some(_)) => right,
            (Some(left), None) => left,
            (Some(left), Some(&after)) => {
                if later_is_closer(self.times[left], target, after) {
                    right
                } else {
                    left
                }
            }
        };

        Some(IndexedFrame {
            index,
            time: self.times[index],
        })
    }
}

/// `true` if `after - target < target - before`, given
/// `before <= target <= after`.
///
/// The distances are compared exactly by cross-multiplying in `i128`, so
/// timescales whose common multiple does not fit in `i32` still compare
/// correctly. Non-numeric operands never make the later frame closer.
fn later_is_closer(before: MediaTime, target: MediaTime, after: MediaTime) -> bool {
    if !before.is_numeric() || !target.is_numeric() || !after.is_numeric() {
        return false;
    }

    let (b, t, a) = (before, target, after);
    // to_before = (t.v * b.ts - b.v * t.ts) / (t.ts * b.ts)
    // to_after  = (a.v * t.ts - t.v * a.ts) / (a.ts * t.ts)
    let to_before = i128::from(t.value) * i128::from(b.timescale)
        - i128::from(b.value) * i128::from(t.timescale);
    let to_after = i128::from(a.value) * i128::from(t.timescale)
        - i128::from(t.value) * i128::from(a.timescale);

    // The shared `t.ts` factor cancels; what remains stays below 2^127.
    to_after * i128::from(b.timescale) < to_before * i128::from(a.timescale)
}

impl From<FrameIndex> for Vec<MediaTime> {
    fn from(index: FrameIndex) -> Self {
        index.times
    }
}
