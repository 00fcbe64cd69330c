//! Per-sample timing normalization.
//!
//! Some containers describe a run of samples that share one duration and
//! follow each other directly in presentation order with a single timing
//! entry. [`normalize_sample_timings`] expands such an entry into one entry
//! per sample so callers can always assume a 1:1 mapping.

use crate::time::{MediaTime, SampleTiming};

/// Expand a shared timing entry into `sample_count` per-sample entries.
///
/// When `timings` holds exactly one entry and `sample_count` is greater
/// than one, sample `i` is given a presentation time of
/// `reference.presentation_time + i * reference.duration`, the reference
/// duration, and no decode time (decode order cannot be recovered from a
/// shared entry). Any other input is returned unchanged.
///
/// An expansion step that overflows produces [`MediaTime::INVALID`], which
/// the indexer rejects.
///
/// # Example
///
/// ```
/// use framegrab::{MediaTime, SampleTiming, normalize_sample_timings};
///
/// let shared = SampleTiming::new(MediaTime::new(100, 600), MediaTime::new(20, 600));
/// let expanded = normalize_sample_timings(vec![shared], 3);
///
/// let times: Vec<i64> = expanded.iter().map(|t| t.presentation_time.value).collect();
/// assert_eq!(times, vec![100, 120, 140]);
/// ```
pub fn normalize_sample_timings(
    timings: Vec<SampleTiming>,
    sample_count: usize,
) -> Vec<SampleTiming> {
    let reference = match timings.as_slice() {
        [single] if sample_count > 1 => *single,
        _ => return timings,
    };

    (0..sample_count)
        .map(|i| {
            let presentation_time = i64::try_from(i)
                .ok()
                .and_then(|factor| reference.duration.checked_mul(factor))
                .and_then(|offset| reference.presentation_time.checked_add(offset))
                .unwrap_or(MediaTime::INVALID);

            SampleTiming {
                presentation_time,
                decode_time: None,
                duration: reference.duration,
            }
        })
        .collect()
}
