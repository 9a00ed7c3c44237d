//! # sonar-types
//!
//! Shared data structures for the four-receiver acoustic ranging array.
//!
//! These types are used by:
//! - `sonar-sim`: forward model, geometric solver and detection matcher
//! - report/CLI layers: rendering resolved positions and run statistics
//!
//! ## Coordinate Conventions
//!
//! - **Array frame**: right-hand Cartesian, metres, origin at the emitter
//! - **x**: lateral axis (receivers `LateralA` and `LateralB` sit on it)
//! - **y**: range axis, pointing away from the array toward the targets
//! - **z**: vertical axis (receiver `Vertical` sits on it)
//!
//! The emitter is co-located with receiver 0 (`Reference`), so the reference
//! channel always sees a pure round trip.

use serde::{Deserialize, Serialize};
use thiserror::Error;

// ── Constants ─────────────────────────────────────────────────────────────────

/// Speed of sound in water (m/s)
pub const SPEED_OF_SOUND_WATER: f64 = 1482.0;

/// The array always has exactly four receivers
pub const RECEIVER_COUNT: usize = 4;

/// Default agreement tolerance between solver stages (m)
pub const DEFAULT_DISTANCE_TOLERANCE_M: f64 = 3.0;

/// Default per-axis tolerance under which two solutions are the same object (m)
pub const DEFAULT_DEDUP_TOLERANCE_M: f64 = 0.25;

// ── Receiver roles ────────────────────────────────────────────────────────────

/// Axis a receiver can be offset along. Receivers never sit on the range
/// axis (y), so it has no variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Axis {
    X,
    Z,
}

/// Role of a receiver in the array. Replaces bare channel indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum ReceiverRole {
    /// Receiver 0, co-located with the emitter at the origin
    Reference = 0,
    /// Receiver 1, offset along x
    LateralA = 1,
    /// Receiver 2, offset along x
    LateralB = 2,
    /// Receiver 3, offset along z
    Vertical = 3,
}

impl ReceiverRole {
    pub const ALL: [ReceiverRole; RECEIVER_COUNT] = [
        ReceiverRole::Reference,
        ReceiverRole::LateralA,
        ReceiverRole::LateralB,
        ReceiverRole::Vertical,
    ];

    /// The three receivers whose offsets form a baseline against `Reference`
    pub const BASELINES: [ReceiverRole; 3] = [
        ReceiverRole::LateralA,
        ReceiverRole::LateralB,
        ReceiverRole::Vertical,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    /// Axis the receiver is offset along (`None` for the reference)
    pub fn axis(self) -> Option<Axis> {
        match self {
            Self::Reference => None,
            Self::LateralA | Self::LateralB => Some(Axis::X),
            Self::Vertical => Some(Axis::Z),
        }
    }
}

// ── 3D Vector ─────────────────────────────────────────────────────────────────

/// 3D vector in the array frame (metres)
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Vec3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vec3 {
    pub fn new(x: f64, y: f64, z: f64) -> Self { Self { x, y, z } }
    pub fn zero() -> Self { Self::default() }

    pub fn sub(&self, other: &Vec3) -> Vec3 {
        Vec3::new(self.x - other.x, self.y - other.y, self.z - other.z)
    }

    pub fn norm(&self) -> f64 {
        (self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }

    pub fn dist(&self, other: &Vec3) -> f64 {
        self.sub(other).norm()
    }

    /// True when every coordinate differs by at most `tol` (inclusive)
    pub fn within_box(&self, other: &Vec3, tol: f64) -> bool {
        (self.x - other.x).abs() <= tol
            && (self.y - other.y).abs() <= tol
            && (self.z - other.z).abs() <= tol
    }
}

impl From<[f64; 3]> for Vec3 {
    fn from(v: [f64; 3]) -> Self { Self::new(v[0], v[1], v[2]) }
}

impl From<Vec3> for [f64; 3] {
    fn from(v: Vec3) -> Self { [v.x, v.y, v.z] }
}

// ── Array geometry ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GeometryError {
    #[error("sample rate must be positive")]
    ZeroSampleRate,
}

/// Receiver layout plus sampling rate. Immutable once built.
///
/// Offsets are taken as given; only the sample rate is checked, since a zero
/// rate would make the quantization period infinite.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArrayGeometry {
    /// x offset of `LateralA` (m)
    lateral_a_m: f64,
    /// x offset of `LateralB` (m)
    lateral_b_m: f64,
    /// z offset of `Vertical` (m)
    vertical_m: f64,
    /// Receiver sample rate (ticks per second)
    sample_rate_hz: u32,
}

impl ArrayGeometry {
    pub fn new(
        lateral_a_m: f64,
        lateral_b_m: f64,
        vertical_m: f64,
        sample_rate_hz: u32,
    ) -> Result<Self, GeometryError> {
        if sample_rate_hz == 0 {
            return Err(GeometryError::ZeroSampleRate);
        }
        Ok(Self { lateral_a_m, lateral_b_m, vertical_m, sample_rate_hz })
    }

    pub fn sample_rate_hz(&self) -> u32 { self.sample_rate_hz }

    /// Length of one sample (s)
    pub fn sample_period(&self) -> f64 {
        1.0 / self.sample_rate_hz as f64
    }

    /// Signed offset of a receiver along its own axis (0 for the reference)
    pub fn offset(&self, role: ReceiverRole) -> f64 {
        match role {
            ReceiverRole::Reference => 0.0,
            ReceiverRole::LateralA => self.lateral_a_m,
            ReceiverRole::LateralB => self.lateral_b_m,
            ReceiverRole::Vertical => self.vertical_m,
        }
    }

    pub fn receiver(&self, role: ReceiverRole) -> Vec3 {
        let offset = self.offset(role);
        match role.axis() {
            None => Vec3::zero(),
            Some(Axis::X) => Vec3::new(offset, 0.0, 0.0),
            Some(Axis::Z) => Vec3::new(0.0, 0.0, offset),
        }
    }

    pub fn receivers(&self) -> [Vec3; RECEIVER_COUNT] {
        ReceiverRole::ALL.map(|r| self.receiver(r))
    }

    /// Largest arrival-time difference physically possible between the
    /// reference channel and `role`: |baseline| / c.
    pub fn time_window(&self, role: ReceiverRole) -> f64 {
        self.offset(role).abs() / SPEED_OF_SOUND_WATER
    }
}

// ── Arrival times ─────────────────────────────────────────────────────────────

/// Emitter → object → receiver travel times for one emission event (s)
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ArrivalTimes {
    pub reference: f64,
    pub lateral_a: f64,
    pub lateral_b: f64,
    pub vertical: f64,
}

impl ArrivalTimes {
    pub fn new(reference: f64, lateral_a: f64, lateral_b: f64, vertical: f64) -> Self {
        Self { reference, lateral_a, lateral_b, vertical }
    }

    pub fn get(&self, role: ReceiverRole) -> f64 {
        match role {
            ReceiverRole::Reference => self.reference,
            ReceiverRole::LateralA => self.lateral_a,
            ReceiverRole::LateralB => self.lateral_b,
            ReceiverRole::Vertical => self.vertical,
        }
    }

    pub fn set(&mut self, role: ReceiverRole, t: f64) {
        match role {
            ReceiverRole::Reference => self.reference = t,
            ReceiverRole::LateralA => self.lateral_a = t,
            ReceiverRole::LateralB => self.lateral_b = t,
            ReceiverRole::Vertical => self.vertical = t,
        }
    }
}

impl From<[f64; RECEIVER_COUNT]> for ArrivalTimes {
    fn from(t: [f64; RECEIVER_COUNT]) -> Self { Self::new(t[0], t[1], t[2], t[3]) }
}

impl From<ArrivalTimes> for [f64; RECEIVER_COUNT] {
    fn from(t: ArrivalTimes) -> Self { [t.reference, t.lateral_a, t.lateral_b, t.vertical] }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn reference_array() -> ArrayGeometry {
        ArrayGeometry::new(-0.15, 0.25, 0.2, 200_000).unwrap()
    }

    #[test]
    fn receivers_follow_role_axes() {
        let g = reference_array();
        assert_eq!(g.receiver(ReceiverRole::Reference), Vec3::zero());
        assert_eq!(g.receiver(ReceiverRole::LateralA), Vec3::new(-0.15, 0.0, 0.0));
        assert_eq!(g.receiver(ReceiverRole::LateralB), Vec3::new(0.25, 0.0, 0.0));
        assert_eq!(g.receiver(ReceiverRole::Vertical), Vec3::new(0.0, 0.0, 0.2));
    }

    #[test]
    fn zero_sample_rate_is_rejected() {
        assert_eq!(
            ArrayGeometry::new(-0.15, 0.25, 0.2, 0),
            Err(GeometryError::ZeroSampleRate)
        );
    }

    #[test]
    fn time_window_uses_absolute_baseline() {
        let g = reference_array();
        assert_abs_diff_eq!(g.time_window(ReceiverRole::LateralA), 0.15 / 1482.0, epsilon = 1e-15);
        assert_abs_diff_eq!(g.time_window(ReceiverRole::LateralB), 0.25 / 1482.0, epsilon = 1e-15);
        assert_eq!(g.time_window(ReceiverRole::Reference), 0.0);
        assert_abs_diff_eq!(g.sample_period(), 5e-6, epsilon = 1e-18);
    }

    #[test]
    fn role_index_follows_all_order() {
        for (i, role) in ReceiverRole::ALL.into_iter().enumerate() {
            assert_eq!(role.index(), i);
        }
    }

    #[test]
    fn receivers_sit_off_the_range_axis() {
        let g = reference_array();
        for p in g.receivers() {
            assert_eq!(p.y, 0.0);
        }
        assert_eq!(g.receiver(ReceiverRole::Vertical), Vec3::new(0.0, 0.0, 0.2));
        assert_eq!(g.receiver(ReceiverRole::LateralA), Vec3::new(-0.15, 0.0, 0.0));
    }

    #[test]
    fn arrival_times_serialize_by_role_name() {
        let t = ArrivalTimes::from([1.0, 2.0, 3.0, 4.0]);
        let json = serde_json::to_value(t).unwrap();
        assert_eq!(json["lateral_b"], 3.0);
        assert_eq!(t.get(ReceiverRole::Vertical), 4.0);
    }

    #[test]
    fn within_box_is_inclusive_per_axis() {
        let a = Vec3::new(1.0, 2.0, 3.0);
        assert!(a.within_box(&Vec3::new(1.25, 1.75, 3.0), 0.25));
        assert!(!a.within_box(&Vec3::new(1.0, 2.0, 3.3), 0.25));
    }
}
