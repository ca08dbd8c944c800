use serde::Serialize;

use super::state::{OperatingState, PauseReason, TrackingSource};

/// Localization keys for the status line. The UI layer resolves them.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq, Hash)]
pub enum StatusKey {
    #[serde(rename = "status.disabled")]
    Disabled,
    #[serde(rename = "status.calibrating")]
    Calibrating,
    #[serde(rename = "status.starting")]
    Starting,
    #[serde(rename = "status.away")]
    Away,
    #[serde(rename = "status.slouching")]
    Slouching,
    #[serde(rename = "status.goodPosture")]
    GoodPosture,
    #[serde(rename = "status.calibrationNeeded")]
    CalibrationNeeded,
    #[serde(rename = "status.pausedOnTheGo")]
    PausedOnTheGo,
    #[serde(rename = "status.cameraDisconnected")]
    CameraDisconnected,
    #[serde(rename = "status.accessoryDisconnected")]
    AccessoryDisconnected,
    #[serde(rename = "status.pausedScreenLocked")]
    PausedScreenLocked,
    #[serde(rename = "status.pausedReinsertAccessory")]
    PausedReinsertAccessory,
}

impl StatusKey {
    pub fn key(&self) -> &'static str {
        match self {
            StatusKey::Disabled => "status.disabled",
            StatusKey::Calibrating => "status.calibrating",
            StatusKey::Starting => "status.starting",
            StatusKey::Away => "status.away",
            StatusKey::Slouching => "status.slouching",
            StatusKey::GoodPosture => "status.goodPosture",
            StatusKey::CalibrationNeeded => "status.calibrationNeeded",
            StatusKey::PausedOnTheGo => "status.pausedOnTheGo",
            StatusKey::CameraDisconnected => "status.cameraDisconnected",
            StatusKey::AccessoryDisconnected => "status.accessoryDisconnected",
            StatusKey::PausedScreenLocked => "status.pausedScreenLocked",
            StatusKey::PausedReinsertAccessory => "status.pausedReinsertAccessory",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub enum StatusIcon {
    Good,
    Bad,
    Away,
    Paused,
    Calibrating,
}

/// What the menu bar shows. Recomputed on demand, never stored.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PostureUIState {
    pub status_text: StatusKey,
    pub icon: StatusIcon,
    pub is_enabled: bool,
    pub can_recalibrate: bool,
}

impl PostureUIState {
    pub fn derive(
        state: OperatingState,
        is_calibrated: bool,
        is_currently_away: bool,
        is_currently_slouching: bool,
        tracking_source: TrackingSource,
    ) -> Self {
        match state {
            OperatingState::Disabled => Self {
                status_text: StatusKey::Disabled,
                icon: StatusIcon::Paused,
                is_enabled: false,
                can_recalibrate: true,
            },
            OperatingState::Calibrating => Self {
                status_text: StatusKey::Calibrating,
                icon: StatusIcon::Calibrating,
                is_enabled: true,
                can_recalibrate: false,
            },
            OperatingState::Monitoring => {
                let (status_text, icon) =
                    monitoring_status(is_calibrated, is_currently_away, is_currently_slouching);
                Self {
                    status_text,
                    icon,
                    is_enabled: true,
                    can_recalibrate: true,
                }
            }
            OperatingState::Paused(reason) => Self {
                status_text: paused_status(reason, tracking_source),
                icon: StatusIcon::Paused,
                is_enabled: true,
                can_recalibrate: true,
            },
        }
    }
}

// Away beats slouching beats good; an uncalibrated engine only says "starting".
fn monitoring_status(
    is_calibrated: bool,
    is_currently_away: bool,
    is_currently_slouching: bool,
) -> (StatusKey, StatusIcon) {
    if !is_calibrated {
        return (StatusKey::Starting, StatusIcon::Good);
    }

    if is_currently_away {
        (StatusKey::Away, StatusIcon::Away)
    } else if is_currently_slouching {
        (StatusKey::Slouching, StatusIcon::Bad)
    } else {
        (StatusKey::GoodPosture, StatusIcon::Good)
    }
}

fn paused_status(reason: PauseReason, tracking_source: TrackingSource) -> StatusKey {
    match reason {
        PauseReason::NoProfile => StatusKey::CalibrationNeeded,
        PauseReason::OnTheGo => StatusKey::PausedOnTheGo,
        PauseReason::DeviceDisconnected => match tracking_source {
            TrackingSource::Camera => StatusKey::CameraDisconnected,
            TrackingSource::MotionAccessory => StatusKey::AccessoryDisconnected,
        },
        PauseReason::ScreenLocked => StatusKey::PausedScreenLocked,
        PauseReason::SecondaryDeviceRemoved => StatusKey::PausedReinsertAccessory,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn derive(
        state: OperatingState,
        calibrated: bool,
        away: bool,
        slouching: bool,
        source: TrackingSource,
    ) -> PostureUIState {
        PostureUIState::derive(state, calibrated, away, slouching, source)
    }

    #[test]
    fn disabled_is_not_enabled_but_can_recalibrate() {
        assert_eq!(
            derive(OperatingState::Disabled, true, false, false, TrackingSource::Camera),
            PostureUIState {
                status_text: StatusKey::Disabled,
                icon: StatusIcon::Paused,
                is_enabled: false,
                can_recalibrate: true,
            }
        );
    }

    #[test]
    fn calibrating_blocks_recalibration() {
        assert_eq!(
            derive(OperatingState::Calibrating, false, false, false, TrackingSource::Camera),
            PostureUIState {
                status_text: StatusKey::Calibrating,
                icon: StatusIcon::Calibrating,
                is_enabled: true,
                can_recalibrate: false,
            }
        );
    }

    #[test]
    fn monitoring_precedence_is_away_then_slouching_then_good() {
        let cases = [
            (false, false, StatusKey::GoodPosture, StatusIcon::Good),
            (false, true, StatusKey::Slouching, StatusIcon::Bad),
            (true, false, StatusKey::Away, StatusIcon::Away),
            (true, true, StatusKey::Away, StatusIcon::Away),
        ];
        for (away, slouching, status, icon) in cases {
            let ui = derive(OperatingState::Monitoring, true, away, slouching, TrackingSource::Camera);
            assert_eq!((ui.status_text, ui.icon), (status, icon), "away={away} slouching={slouching}");
            assert!(ui.is_enabled);
            assert!(ui.can_recalibrate);
        }
    }

    #[test]
    fn uncalibrated_monitoring_always_reports_starting() {
        for away in [false, true] {
            for slouching in [false, true] {
                let ui = derive(OperatingState::Monitoring, false, away, slouching, TrackingSource::Camera);
                assert_eq!(ui.status_text, StatusKey::Starting);
                assert_eq!(ui.icon, StatusIcon::Good);
            }
        }
    }

    #[test]
    fn paused_text_depends_on_source_only_for_disconnects() {
        for source in TrackingSource::ALL {
            for reason in PauseReason::ALL {
                let ui = derive(OperatingState::Paused(reason), true, false, false, source);
                let expected = match (reason, source) {
                    (PauseReason::NoProfile, _) => StatusKey::CalibrationNeeded,
                    (PauseReason::OnTheGo, _) => StatusKey::PausedOnTheGo,
                    (PauseReason::DeviceDisconnected, TrackingSource::Camera) => {
                        StatusKey::CameraDisconnected
                    }
                    (PauseReason::DeviceDisconnected, TrackingSource::MotionAccessory) => {
                        StatusKey::AccessoryDisconnected
                    }
                    (PauseReason::ScreenLocked, _) => StatusKey::PausedScreenLocked,
                    (PauseReason::SecondaryDeviceRemoved, _) => StatusKey::PausedReinsertAccessory,
                };
                assert_eq!(ui.status_text, expected);
                assert_eq!(ui.icon, StatusIcon::Paused);
                assert!(ui.is_enabled);
                assert!(ui.can_recalibrate);
            }
        }
    }

    #[test]
    fn derive_is_total_over_all_inputs() {
        for state in OperatingState::all() {
            for source in TrackingSource::ALL {
                for flags in 0..8u8 {
                    let ui = derive(state, flags & 1 != 0, flags & 2 != 0, flags & 4 != 0, source);
                    assert_eq!(ui.is_enabled, state != OperatingState::Disabled);
                }
            }
        }
    }

    #[test]
    fn serializes_status_as_localization_key() {
        let ui = derive(OperatingState::Monitoring, true, false, true, TrackingSource::Camera);
        let json = serde_json::to_value(ui).unwrap();
        assert_eq!(json["statusText"], StatusKey::Slouching.key());
        assert_eq!(json["icon"], "bad");
        assert_eq!(json["canRecalibrate"], true);
    }
}
