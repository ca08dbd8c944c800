//! Pure decisions over [`OperatingState`]. Nothing here holds state; callers
//! pass the current value in and apply the result themselves.

use super::state::{OperatingState, PauseReason, TrackingSource};

/// Whether the engine may move from `from` to `to`.
///
/// Staying put is rejected, including `Paused(x) -> Paused(x)`. Changing the
/// pause reason while paused is allowed.
pub fn can_transition(from: OperatingState, to: OperatingState) -> bool {
    use OperatingState::*;

    match (from, to) {
        (Disabled, Monitoring | Calibrating | Paused(_)) => true,
        (Monitoring, Disabled | Calibrating | Paused(_)) => true,
        (Calibrating, Monitoring | Disabled | Paused(_)) => true,
        (Paused(current), Paused(next)) => current != next,
        (Paused(_), Disabled | Monitoring | Calibrating) => true,
        _ => false,
    }
}

/// Whether the posture detector should be running in `state`.
///
/// A removed motion accessory keeps the detector alive so reinsertion can be
/// noticed; every other pause stops it.
pub fn should_detector_run(state: OperatingState, tracking_source: TrackingSource) -> bool {
    match state {
        OperatingState::Monitoring | OperatingState::Calibrating => true,
        OperatingState::Paused(PauseReason::SecondaryDeviceRemoved) => {
            tracking_source == TrackingSource::MotionAccessory
        }
        OperatingState::Paused(_) | OperatingState::Disabled => false,
    }
}

/// Initial state when monitoring is switched on. A missing calibration
/// profile takes precedence over an unavailable detector.
pub fn state_when_enabling(is_calibrated: bool, detector_available: bool) -> OperatingState {
    if !is_calibrated {
        OperatingState::Paused(PauseReason::NoProfile)
    } else if !detector_available {
        OperatingState::Paused(PauseReason::DeviceDisconnected)
    } else {
        OperatingState::Monitoring
    }
}
