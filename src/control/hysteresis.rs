//! Bang-bang decision predicates.
//!
//! ```text
//!            target - drift      target      target + drift
//!  ── HEAT ──────┤ ◀──────── SUSTAIN ────────▶ ├────── COOL ──
//! ```
//!
//! Selection of heat/cool uses strict comparisons while the chase exit
//! (`goal_met`) is inclusive. The asymmetry keeps a chase from ending one
//! step short and immediately re-engaging at the boundary.

use embassy_time::Duration;

use super::{Goal, Purpose};
use crate::config::secs_to_duration;

/// What the loop should do with the current reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Leave relays alone and re-evaluate later.
    Sustain,
    /// Engage the given relay until the goal is met.
    Chase(Purpose),
}

/// `|target - current| < drift`
pub fn within_tolerance(target_c: f32, current_c: f32, drift_c: f32) -> bool {
    (target_c - current_c).abs() < drift_c
}

pub fn should_heat(current_c: f32, target_c: f32) -> bool {
    current_c < target_c
}

pub fn should_cool(current_c: f32, target_c: f32) -> bool {
    current_c > target_c
}

/// Which relay to engage, or `None` when sitting exactly on target.
pub fn chase_direction(current_c: f32, target_c: f32) -> Option<Purpose> {
    if should_cool(current_c, target_c) {
        Some(Purpose::Cooling)
    } else if should_heat(current_c, target_c) {
        Some(Purpose::Heating)
    } else {
        None
    }
}

/// Chase exit condition for the relay currently engaged.
pub fn goal_met(purpose: Purpose, current_c: f32, target_c: f32) -> bool {
    match purpose {
        Purpose::Heating => current_c >= target_c,
        Purpose::Cooling => current_c <= target_c,
    }
}

/// Sustain throttle: how long the enclosure needs to drift out of the band.
pub fn sustain_duration(drift_c: f32, secs_to_drift_one_degree: f32) -> Duration {
    secs_to_duration(drift_c * secs_to_drift_one_degree)
}

/// Top-level decision for one cycle.
pub fn decide(current_c: f32, goal: &Goal) -> Decision {
    if within_tolerance(goal.target_c, current_c, goal.drift_c) {
        return Decision::Sustain;
    }
    match chase_direction(current_c, goal.target_c) {
        Some(purpose) => Decision::Chase(purpose),
        // Only reachable with a zero drift band, which Goal::validate rejects.
        None => Decision::Sustain,
    }
}
