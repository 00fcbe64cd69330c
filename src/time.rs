//! Rational media timestamps and per-sample timing.
//!
//! Container formats describe time as an integer count of ticks in some
//! time base. [`MediaTime`] keeps that representation instead of converting
//! to floating point, so comparing and accumulating sample times never
//! drifts.
//!
//! # Example
//!
//! ```
//! use framegrab::MediaTime;
//!
//! let half = MediaTime::new(1, 2);
//! let also_half = MediaTime::new(500, 1000);
//! assert_eq!(half, also_half);
//! assert!(MediaTime::new(1, 3) < half);
//! ```

use std::cmp::Ordering;
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::time::Duration;

/// A point in time expressed as `value / timescale` seconds.
///
/// A time is *numeric* when its timescale is positive. Readers may hand
/// back non-numeric times for samples they could not time; those compare
/// below every numeric time and are rejected by indexing.
#[derive(Debug, Clone, Copy)]
pub struct MediaTime {
    /// Tick count.
    pub value: i64,
    /// Ticks per second.
    pub timescale: i32,
}

impl MediaTime {
    /// The zero time in a one-tick-per-second time base.
    pub const ZERO: MediaTime = MediaTime {
        value: 0,
        timescale: 1,
    };

    /// A time with no defined value.
    pub const INVALID: MediaTime = MediaTime {
        value: 0,
        timescale: 0,
    };

    /// Create a time of `value / timescale` seconds.
    pub const fn new(value: i64, timescale: i32) -> Self {
        Self { value, timescale }
    }

    /// Convert seconds to the nearest tick in `timescale`.
    ///
    /// Returns [`MediaTime::INVALID`] for non-finite input or a
    /// non-positive timescale.
    pub fn from_seconds(seconds: f64, timescale: i32) -> Self {
        if !seconds.is_finite() || timescale <= 0 {
            return Self::INVALID;
        }
        let ticks = (seconds * timescale as f64).round();
        if ticks < i64::MIN as f64 || ticks > i64::MAX as f64 {
            return Self::INVALID;
        }
        Self::new(ticks as i64, timescale)
    }

    /// Convert a [`Duration`] measured from zero.
    pub fn from_duration(duration: Duration, timescale: i32) -> Self {
        Self::from_seconds(duration.as_secs_f64(), timescale)
    }

    /// `true` if this time has a defined, finite value.
    pub fn is_numeric(&self) -> bool {
        self.timescale > 0
    }

    /// The time in seconds, or `None` if it is not numeric.
    pub fn as_seconds(&self) -> Option<f64> {
        self.is_numeric()
            .then(|| self.value as f64 / self.timescale as f64)
    }

    /// The time as a [`Duration`] from zero. Negative and non-numeric
    /// times yield `None`.
    pub fn to_duration(&self) -> Option<Duration> {
        self.as_seconds()
            .filter(|seconds| *seconds >= 0.0)
            .map(Duration::from_secs_f64)
    }

    /// Re-express this time in another timescale, rounding toward zero.
    pub fn rescale(&self, timescale: i32) -> Option<MediaTime> {
        if !self.is_numeric() || timescale <= 0 {
            return None;
        }
        if timescale == self.timescale {
            return Some(*self);
        }
        let value = i128::from(self.value) * i128::from(timescale) / i128::from(self.timescale);
        i64::try_from(value)
            .ok()
            .map(|value| MediaTime::new(value, timescale))
    }

    /// Sum of two numeric times, expressed in the finer of the two
    /// timescales when they differ. `None` on overflow or non-numeric input.
    pub fn checked_add(self, other: MediaTime) -> Option<MediaTime> {
        if !self.is_numeric() || !other.is_numeric() {
            return None;
        }
        if self.timescale == other.timescale {
            return self
                .value
                .checked_add(other.value)
                .map(|value| MediaTime::new(value, self.timescale));
        }
        let timescale = lcm(self.timescale, other.timescale)?;
        let lhs = self.rescale(timescale)?;
        let rhs = other.rescale(timescale)?;
        lhs.value
            .checked_add(rhs.value)
            .map(|value| MediaTime::new(value, timescale))
    }

    /// `self - other`, under the same rules as [`checked_add`](Self::checked_add).
    pub fn checked_sub(self, other: MediaTime) -> Option<MediaTime> {
        let negated = MediaTime::new(other.value.checked_neg()?, other.timescale);
        self.checked_add(negated)
    }

    /// Multiply by an integer factor. `None` on overflow or non-numeric input.
    pub fn checked_mul(self, factor: i64) -> Option<MediaTime> {
        if !self.is_numeric() {
            return None;
        }
        self.value
            .checked_mul(factor)
            .map(|value| MediaTime::new(value, self.timescale))
    }

    /// Absolute value.
    pub fn abs(self) -> MediaTime {
        MediaTime::new(self.value.saturating_abs(), self.timescale)
    }
}

fn lcm(a: i32, b: i32) -> Option<i32> {
    let (mut x, mut y) = (a as i64, b as i64);
    while y != 0 {
        (x, y) = (y, x % y);
    }
    i32::try_from(a as i64 / x * b as i64).ok()
}

impl Default for MediaTime {
    fn default() -> Self {
        Self::ZERO
    }
}

impl PartialEq for MediaTime {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for MediaTime {}

impl PartialOrd for MediaTime {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for MediaTime {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self.is_numeric(), other.is_numeric()) {
            (true, true) => {
                let lhs = i128::from(self.value) * i128::from(other.timescale);
                let rhs = i128::from(other.value) * i128::from(self.timescale);
                lhs.cmp(&rhs)
            }
            (false, false) => Ordering::Equal,
            (false, true) => Ordering::Less,
            (true, false) => Ordering::Greater,
        }
    }
}

impl Display for MediaTime {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self.as_seconds() {
            Some(seconds) => write!(f, "{seconds:.6}s ({}/{})", self.value, self.timescale),
            None => write!(f, "invalid"),
        }
    }
}

/// Timing of one sample (or, before normalization, a run of samples).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SampleTiming {
    /// When the sample is displayed.
    pub presentation_time: MediaTime,
    /// When the sample is decoded. `None` when not applicable.
    pub decode_time: Option<MediaTime>,
    /// How long the sample is displayed.
    pub duration: MediaTime,
}

impl SampleTiming {
    /// Timing with no decode time.
    pub fn new(presentation_time: MediaTime, duration: MediaTime) -> Self {
        Self {
            presentation_time,
            decode_time: None,
            duration,
        }
    }
}
