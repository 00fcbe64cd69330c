//! FrameIndex query tests.

mod common;

use common::t;
use framegrab::{FrameIndex, IndexedFrame, MediaTime};

fn index_of(values: &[i64]) -> FrameIndex {
    FrameIndex::from_unsorted(values.iter().map(|&value| t(value)).collect())
}

// ── Construction ──────────────────────────────────────────────────

#[test]
fn from_unsorted_sorts_ascending() {
    let index = index_of(&[40, 0, 20, 60, 20]);
    assert_eq!(index.times(), &[t(0), t(20), t(20), t(40), t(60)]);
    assert_eq!(index.len(), 5);
    assert_eq!(index.span(), Some((t(0), t(60))));
}

#[test]
fn mixed_timescales_sort_by_value() {
    let index = FrameIndex::from_unsorted(vec![
        MediaTime::new(1, 2),
        MediaTime::new(100, 600),
        MediaTime::new(1, 1),
    ]);
    assert_eq!(index.get(0), Some(MediaTime::new(100, 600)));
    assert_eq!(index.get(2), Some(MediaTime::new(1, 1)));
    assert_eq!(index.get(3), None);
}

#[test]
fn empty_index() {
    let index = FrameIndex::default();
    assert!(index.is_empty());
    assert_eq!(index.span(), None);
    assert_eq!(index.nearest_time(t(0)), None);
    assert_eq!(index.last_index_at_or_before(t(0)), None);
}

#[test]
fn converts_into_times() {
    let times: Vec<MediaTime> = index_of(&[20, 10]).into();
    assert_eq!(times, vec![t(10), t(20)]);
}

// ── Queries ───────────────────────────────────────────────────────

#[test]
fn first_index_of_returns_first_duplicate() {
    let index = index_of(&[0, 20, 20, 20, 40]);
    assert_eq!(index.first_index_of(t(20)), Some(1));
    assert_eq!(index.first_index_of(MediaTime::new(1, 30)), Some(1));
    assert_eq!(index.first_index_of(t(30)), None);
}

#[test]
fn last_index_at_or_before_is_frame_on_screen() {
    let index = index_of(&[0, 20, 40]);
    assert_eq!(
        index.last_index_at_or_before(t(39)),
        Some(IndexedFrame { index: 1, time: t(20) })
    );
    assert_eq!(
        index.last_index_at_or_before(t(40)),
        Some(IndexedFrame { index: 2, time: t(40) })
    );
    assert_eq!(index.last_index_at_or_before(t(-1)), None);
}

#[test]
fn nearest_time_picks_closest_frame() {
    let index = index_of(&[10, 20]);
    assert_eq!(index.nearest_time(t(14)).map(|frame| frame.time), Some(t(10)));
    assert_eq!(index.nearest_time(t(16)).map(|frame| frame.time), Some(t(20)));
}

#[test]
fn nearest_time_tie_prefers_earlier_frame() {
    let index = index_of(&[10, 20]);
    assert_eq!(
        index.nearest_time(t(15)),
        Some(IndexedFrame { index: 0, time: t(10) })
    );
}

#[test]
fn nearest_time_clamps_outside_range() {
    let index = index_of(&[10, 20, 30]);
    assert_eq!(index.nearest_time(t(-500)).map(|frame| frame.index), Some(0));
    assert_eq!(index.nearest_time(t(9_999)).map(|frame| frame.index), Some(2));
}

#[test]
fn nearest_time_exact_match_with_duplicates() {
    let index = index_of(&[0, 20, 20, 40]);
    let frame = index.nearest_time(t(20)).unwrap();
    assert_eq!(frame.time, t(20));
    assert!(frame.index == 1 || frame.index == 2);
}

#[test]
fn nearest_time_matches_linear_scan() {
    let values = [0, 7, 13, 13, 40, 41, 90];
    let index = index_of(&values);

    for target in -10..110 {
        let best = values
            .iter()
            .map(|&value| (value - target).abs())
            .min()
            .unwrap();
        let frame = index.nearest_time(t(target)).unwrap();
        assert_eq!((frame.time.value - target).abs(), best, "target {target}");
    }
}

// ── Mixed timescales ──────────────────────────────────────────────

/// `|x - target|` as an exact fraction `(numerator, denominator)`.
fn distance(x: MediaTime, target: MediaTime) -> (i128, i128) {
    let numerator = i128::from(x.value) * i128::from(target.timescale)
        - i128::from(target.value) * i128::from(x.timescale);
    (
        numerator.abs(),
        i128::from(x.timescale) * i128::from(target.timescale),
    )
}

fn closer(lhs: (i128, i128), rhs: (i128, i128)) -> std::cmp::Ordering {
    (lhs.0 * rhs.1).cmp(&(rhs.0 * lhs.1))
}

#[test]
fn nearest_time_with_coprime_timescales() {
    let index = FrameIndex::from_unsorted(vec![
        MediaTime::new(0, 65_537),
        MediaTime::new(65_537, 65_537),
    ]);

    // 0.9s in a third coprime timescale snaps forward to 1s.
    let frame = index.nearest_time(MediaTime::new(58_985, 65_539)).unwrap();
    assert_eq!(frame.index, 1);
    assert_eq!(frame.time, MediaTime::new(1, 1));

    // 0.1s snaps back to 0s.
    let frame = index.nearest_time(MediaTime::new(6_554, 65_539)).unwrap();
    assert_eq!(frame.index, 0);
}

#[test]
fn nearest_time_tie_across_timescales_prefers_earlier() {
    let index = FrameIndex::from_unsorted(vec![
        MediaTime::new(1, 3),
        MediaTime::new(2_000_000, 3_000_000),
    ]);
    let frame = index.nearest_time(MediaTime::new(1, 2)).unwrap();
    assert_eq!(frame.index, 0);
}

#[test]
fn nearest_time_matches_linear_scan_across_timescales() {
    let times = vec![
        MediaTime::new(0, 90_000),
        MediaTime::new(1_001, 30_000),
        MediaTime::new(3_003, 90_000),
        MediaTime::new(7, 65_537),
        MediaTime::new(21_846, 65_537),
        MediaTime::new(1, 2),
        MediaTime::new(1_000_003, 1_999_993),
        MediaTime::new(2_147_483_000, 2_147_483_647),
    ];
    let index = FrameIndex::from_unsorted(times.clone());
    let timescales = [600, 65_539, 1_000_000, 2_147_483_629];

    for &timescale in &timescales {
        for step in 0..=120_i64 {
            let target = MediaTime::new(step * i64::from(timescale) / 100, timescale);
            let best = times
                .iter()
                .map(|&time| distance(time, target))
                .min_by(|&lhs, &rhs| closer(lhs, rhs))
                .unwrap();

            let frame = index.nearest_time(target).unwrap();
            assert_eq!(
                closer(distance(frame.time, target), best),
                std::cmp::Ordering::Equal,
                "target {target}, picked {}",
                frame.time,
            );
        }
    }
}
