//! Sample timing normalization tests.

use framegrab::{MediaTime, SampleTiming, normalize_sample_timings};

fn timing(presentation: i64, duration: i64) -> SampleTiming {
    SampleTiming::new(MediaTime::new(presentation, 600), MediaTime::new(duration, 600))
}

#[test]
fn shared_entry_expands_to_one_per_sample() {
    let shared = SampleTiming {
        decode_time: Some(MediaTime::new(80, 600)),
        ..timing(100, 20)
    };

    let expanded = normalize_sample_timings(vec![shared], 4);

    assert_eq!(expanded.len(), 4);
    for (i, entry) in expanded.iter().enumerate() {
        assert_eq!(entry.presentation_time, MediaTime::new(100 + 20 * i as i64, 600));
        assert_eq!(entry.duration, MediaTime::new(20, 600));
        assert_eq!(entry.decode_time, None);
    }
}

#[test]
fn per_sample_entries_are_unchanged() {
    let timings = vec![timing(0, 20), timing(40, 20), timing(20, 20)];
    let normalized = normalize_sample_timings(timings.clone(), 3);
    assert_eq!(normalized, timings);
}

#[test]
fn single_sample_is_unchanged() {
    let shared = SampleTiming {
        decode_time: Some(MediaTime::new(7, 600)),
        ..timing(10, 20)
    };
    assert_eq!(normalize_sample_timings(vec![shared], 1), vec![shared]);
}

#[test]
fn empty_input_is_unchanged() {
    assert!(normalize_sample_timings(Vec::new(), 0).is_empty());
}

#[test]
fn overflowing_expansion_yields_invalid_time() {
    let shared = SampleTiming::new(MediaTime::new(i64::MAX - 1, 1), MediaTime::new(1, 1));
    let expanded = normalize_sample_timings(vec![shared], 3);

    assert!(expanded[0].presentation_time.is_numeric());
    assert!(expanded[1].presentation_time.is_numeric());
    assert!(!expanded[2].presentation_time.is_numeric());
}
