use std::cmp::Ordering;

use crate::foundation::error::{SemanticError, SemanticResult};

pub use kurbo::{Point, Rect, Size, Vec2};

/// Rational presentation timestamp: `value / timescale` seconds.
///
/// Equality is structural; use [`Timestamp::cmp_time`] to compare instants across timescales.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct Timestamp {
    /// Tick count.
    pub value: i64,
    /// Ticks per second, must be non-zero.
    pub timescale: u32,
}

impl Timestamp {
    /// Create a validated timestamp.
    pub fn new(value: i64, timescale: u32) -> SemanticResult<Self> {
        if timescale == 0 {
            return Err(SemanticError::validation("timestamp timescale must be > 0"));
        }
        Ok(Self { value, timescale })
    }

    /// Time zero in the given timescale.
    pub fn zero(timescale: u32) -> Self {
        Self {
            value: 0,
            timescale: timescale.max(1),
        }
    }

    /// Convert to seconds.
    pub fn as_secs_f64(self) -> f64 {
        self.value as f64 / f64::from(self.timescale.max(1))
    }

    /// Re-express in another timescale, rounding half away from zero.
    pub fn rescale(self, timescale: u32) -> Self {
        let timescale = timescale.max(1);
        if timescale == self.timescale {
            return self;
        }
        let num = i128::from(self.value) * i128::from(timescale);
        let den = i128::from(self.timescale.max(1));
        let half = den / 2;
        let scaled = if num >= 0 {
            (num + half) / den
        } else {
            (num - half) / den
        };
        Self {
            value: scaled.clamp(i128::from(i64::MIN), i128::from(i64::MAX)) as i64,
            timescale,
        }
    }

    /// Compare the instants two timestamps denote, independent of timescale.
    pub fn cmp_time(&self, other: &Self) -> Ordering {
        let lhs = i128::from(self.value) * i128::from(other.timescale.max(1));
        let rhs = i128::from(other.value) * i128::from(self.timescale.max(1));
        lhs.cmp(&rhs)
    }
}

/// Frame rate represented as a rational `num/den`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct FrameRate {
    /// Numerator (frames).
    pub num: u32,
    /// Denominator (seconds).
    pub den: u32,
}

impl FrameRate {
    /// Create a validated frame rate.
    pub fn new(num: u32, den: u32) -> SemanticResult<Self> {
        if den == 0 {
            return Err(SemanticError::validation("frame rate den must be > 0"));
        }
        if num == 0 {
            return Err(SemanticError::validation("frame rate num must be > 0"));
        }
        Ok(Self { num, den })
    }

    /// Convert to floating-point frames per second.
    pub fn as_f64(self) -> f64 {
        f64::from(self.num) / f64::from(self.den)
    }

    /// Timestamp of frame `index` expressed in `timescale`.
    pub fn frame_timestamp(self, index: u64, timescale: u32) -> Timestamp {
        let timescale = timescale.max(1);
        let ticks = i128::from(index) * i128::from(self.den) * i128::from(timescale)
            / i128::from(self.num.max(1));
        Timestamp {
            value: ticks.clamp(0, i128::from(i64::MAX)) as i64,
            timescale,
        }
    }
}

/// One of the two independent loops of a transcode job.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Lane {
    /// Decoded frames, transformed per frame.
    Video,
    /// Audio sample blocks, passed through.
    Audio,
}

impl std::fmt::Display for Lane {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Lane::Video => f.write_str("video"),
            Lane::Audio => f.write_str("audio"),
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/core.rs"]
mod tests;
