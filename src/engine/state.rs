use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub enum PauseReason {
    NoProfile,
    OnTheGo,
    DeviceDisconnected,
    ScreenLocked,
    SecondaryDeviceRemoved,
}

impl PauseReason {
    pub const ALL: [PauseReason; 5] = [
        PauseReason::NoProfile,
        PauseReason::OnTheGo,
        PauseReason::DeviceDisconnected,
        PauseReason::ScreenLocked,
        PauseReason::SecondaryDeviceRemoved,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PauseReason::NoProfile => "noProfile",
            PauseReason::OnTheGo => "onTheGo",
            PauseReason::DeviceDisconnected => "deviceDisconnected",
            PauseReason::ScreenLocked => "screenLocked",
            PauseReason::SecondaryDeviceRemoved => "secondaryDeviceRemoved",
        }
    }
}

/// The single operating mode of the posture engine. The pause reason lives
/// inside `Paused` so state and reason always change together.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase", tag = "kind", content = "reason")]
pub enum OperatingState {
    Disabled,
    Calibrating,
    Monitoring,
    Paused(PauseReason),
}

impl Default for OperatingState {
    fn default() -> Self {
        OperatingState::Disabled
    }
}

impl OperatingState {
    pub fn is_paused(&self) -> bool {
        matches!(self, OperatingState::Paused(_))
    }

    pub fn pause_reason(&self) -> Option<PauseReason> {
        match self {
            OperatingState::Paused(reason) => Some(*reason),
            _ => None,
        }
    }

    /// Every state the engine can be in: the three plain states plus one
    /// `Paused` per reason.
    pub fn all() -> Vec<OperatingState> {
        let mut states = vec![
            OperatingState::Disabled,
            OperatingState::Calibrating,
            OperatingState::Monitoring,
        ];
        states.extend(PauseReason::ALL.iter().copied().map(OperatingState::Paused));
        states
    }
}

impl fmt::Display for OperatingState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OperatingState::Disabled => f.write_str("disabled"),
            OperatingState::Calibrating => f.write_str("calibrating"),
            OperatingState::Monitoring => f.write_str("monitoring"),
            OperatingState::Paused(reason) => write!(f, "paused({})", reason.as_str()),
        }
    }
}

/// Which sensing modality currently supplies posture signals.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub enum TrackingSource {
    Camera,
    MotionAccessory,
}

impl Default for TrackingSource {
    fn default() -> Self {
        TrackingSource::Camera
    }
}

impl TrackingSource {
    pub const ALL: [TrackingSource; 2] = [TrackingSource::Camera, TrackingSource::MotionAccessory];

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "camera" => Some(TrackingSource::Camera),
            "motion" | "motionaccessory" | "accessory" => Some(TrackingSource::MotionAccessory),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_states_cover_every_pause_reason() {
        let states = OperatingState::all();
        assert_eq!(states.len(), 8);
        for reason in PauseReason::ALL {
            assert!(states.contains(&OperatingState::Paused(reason)));
        }
    }

    #[test]
    fn paused_state_serializes_with_reason() {
        let json = serde_json::to_value(OperatingState::Paused(PauseReason::ScreenLocked)).unwrap();
        assert_eq!(json["kind"], "paused");
        assert_eq!(json["reason"], "screenLocked");

        let json = serde_json::to_value(OperatingState::Monitoring).unwrap();
        assert_eq!(json["kind"], "monitoring");
    }

    #[test]
    fn tracking_source_parses_aliases() {
        assert_eq!(TrackingSource::parse("Camera"), Some(TrackingSource::Camera));
        assert_eq!(TrackingSource::parse("motion"), Some(TrackingSource::MotionAccessory));
        assert_eq!(TrackingSource::parse("webcam"), None);
    }
}
