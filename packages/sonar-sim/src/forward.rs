//! forward.rs — arrival times for a known object position
//!
//! The emitter sits at the origin with the reference receiver, so every path
//! is emitter → object → receiver:
//!   t_i = (‖P‖ + ‖P − R_i‖) / c
//!
//! Quantized mode models a receiver that only reports whole sample ticks.
//! The rounding rule is `t − (t mod T) + T`, which always adds one full
//! period, even for an exact multiple of T. Downstream tolerance windows are
//! sized against this rule.

use serde::{Deserialize, Serialize};
use tracing::trace;

use sonar_types::{ArrayGeometry, ArrivalTimes, ReceiverRole, Vec3, SPEED_OF_SOUND_WATER};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeMode {
    /// Raw real-valued travel time
    Exact,
    /// Travel time snapped up to the receiver sample clock
    Quantized,
}

/// Round a time up onto the sample clock.
pub fn quantize(time: f64, sample_period: f64) -> f64 {
    time - time % sample_period + sample_period
}

/// Emitter → object → receiver travel time (s)
pub fn travel_time(object: &Vec3, receiver: &Vec3) -> f64 {
    (object.norm() + object.dist(receiver)) / SPEED_OF_SOUND_WATER
}

/// Arrival time at a single receiver.
pub fn arrival_time(object: &Vec3, geometry: &ArrayGeometry, role: ReceiverRole, mode: TimeMode) -> f64 {
    let t = travel_time(object, &geometry.receiver(role));
    match mode {
        TimeMode::Exact => t,
        TimeMode::Quantized => quantize(t, geometry.sample_period()),
    }
}

/// Arrival times at all four receivers.
pub fn arrival_times(object: &Vec3, geometry: &ArrayGeometry, mode: TimeMode) -> ArrivalTimes {
    let mut times = ArrivalTimes::default();
    let dist_eo = object.norm();
    for role in ReceiverRole::ALL {
        let t = arrival_time(object, geometry, role, mode);
        trace!(
            ?role,
            dist_eo,
            dist_or = object.dist(&geometry.receiver(role)),
            t,
            "forward model"
        );
        times.set(role, t);
    }
    times
}
