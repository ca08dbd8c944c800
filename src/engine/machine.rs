use serde::Serialize;

use super::{
    events::PostureEvent,
    state::{OperatingState, PauseReason, TrackingSource},
    transitions::{can_transition, should_detector_run, state_when_enabling},
    ui_state::PostureUIState,
};

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_info};

/// Accounting the controller must apply to the analytics store after an event.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LedgerUpdate {
    Time { interval: f64, is_slouching: bool },
    SlouchEvent,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PostureSnapshot {
    pub state: OperatingState,
    pub ui: PostureUIState,
    pub detector_running: bool,
    pub tracking_source: TrackingSource,
    pub is_calibrated: bool,
}

#[derive(Debug, Clone, Copy)]
pub struct MachineOptions {
    pub tracking_source: TrackingSource,
    pub is_calibrated: bool,
    pub detector_available: bool,
}

impl Default for MachineOptions {
    fn default() -> Self {
        Self {
            tracking_source: TrackingSource::Camera,
            is_calibrated: false,
            detector_available: true,
        }
    }
}

/// Holder of the current [`OperatingState`] plus the environment flags that
/// decide where a pause resumes to. Every state change goes through
/// [`can_transition`]; events that would produce an illegal change are ignored.
#[derive(Debug, Clone)]
pub struct PostureMachine {
    state: OperatingState,
    tracking_source: TrackingSource,
    is_calibrated: bool,
    detector_available: bool,
    accessory_present: bool,
    screen_locked: bool,
    on_the_go: bool,
    is_away: bool,
    is_slouching: bool,
}

impl PostureMachine {
    pub fn new(options: MachineOptions) -> Self {
        Self {
            state: OperatingState::Disabled,
            tracking_source: options.tracking_source,
            is_calibrated: options.is_calibrated,
            detector_available: options.detector_available,
            accessory_present: true,
            screen_locked: false,
            on_the_go: false,
            is_away: false,
            is_slouching: false,
        }
    }

    pub fn state(&self) -> OperatingState {
        self.state
    }

    pub fn is_calibrated(&self) -> bool {
        self.is_calibrated
    }

    pub fn snapshot(&self) -> PostureSnapshot {
        PostureSnapshot {
            state: self.state,
            ui: PostureUIState::derive(
                self.state,
                self.is_calibrated,
                self.is_away,
                self.is_slouching,
                self.tracking_source,
            ),
            detector_running: should_detector_run(self.state, self.tracking_source),
            tracking_source: self.tracking_source,
            is_calibrated: self.is_calibrated,
        }
    }

    pub fn apply(&mut self, event: PostureEvent) -> Option<LedgerUpdate> {
        use OperatingState::*;

        match event {
            PostureEvent::Enable => {
                if self.state == Disabled {
                    self.transition(self.resume_state());
                }
            }
            PostureEvent::Disable => {
                self.transition(Disabled);
                self.clear_posture_flags();
            }
            PostureEvent::StartCalibration => {
                let target = if self.detector_available {
                    Calibrating
                } else {
                    Paused(PauseReason::DeviceDisconnected)
                };
                self.transition(target);
            }
            PostureEvent::CalibrationFinished { success } => {
                if self.state == Calibrating {
                    if success {
                        self.is_calibrated = true;
                    }
                    self.transition(self.resume_state());
                }
            }
            PostureEvent::DetectorAvailability(available) => {
                self.detector_available = available;
                match (available, self.state) {
                    (false, Monitoring | Calibrating) => {
                        self.transition(Paused(PauseReason::DeviceDisconnected));
                        self.clear_posture_flags();
                    }
                    (true, Paused(PauseReason::DeviceDisconnected)) => {
                        self.transition(self.resume_state());
                    }
                    _ => {}
                }
            }
            PostureEvent::AccessoryRemoved => {
                self.accessory_present = false;
                if self.tracking_source == TrackingSource::MotionAccessory
                    && self.state == Monitoring
                {
                    self.transition(Paused(PauseReason::SecondaryDeviceRemoved));
                    self.clear_posture_flags();
                }
            }
            PostureEvent::AccessoryReinserted => {
                self.accessory_present = true;
                self.resume_from(PauseReason::SecondaryDeviceRemoved);
            }
            PostureEvent::ScreenLocked => {
                self.screen_locked = true;
                if self.state != Disabled {
                    self.transition(Paused(PauseReason::ScreenLocked));
                    self.clear_posture_flags();
                }
            }
            PostureEvent::ScreenUnlocked => {
                self.screen_locked = false;
                self.resume_from(PauseReason::ScreenLocked);
            }
            PostureEvent::OnTheGo(active) => {
                self.on_the_go = active;
                if active {
                    if self.state != Disabled {
                        self.transition(Paused(PauseReason::OnTheGo));
                        self.clear_posture_flags();
                    }
                } else {
                    self.resume_from(PauseReason::OnTheGo);
                }
            }
            PostureEvent::TrackingSourceChanged(source) => {
                if source != self.tracking_source {
                    log_info!("Tracking source changed to {source:?}");
                    self.tracking_source = source;
                    if source == TrackingSource::MotionAccessory
                        && !self.accessory_present
                        && self.state == Monitoring
                    {
                        self.transition(Paused(PauseReason::SecondaryDeviceRemoved));
                        self.clear_posture_flags();
                    } else {
                        self.resume_from(PauseReason::SecondaryDeviceRemoved);
                    }
                }
            }
            PostureEvent::Sample {
                interval,
                is_slouching,
                is_away,
            } => {
                if self.is_accounting() {
                    self.is_away = is_away;
                    self.is_slouching = is_slouching && !is_away;
                    if !is_away {
                        return Some(LedgerUpdate::Time {
                            interval,
                            is_slouching,
                        });
                    }
                }
            }
            PostureEvent::SlouchEvent => {
                if self.is_accounting() && !self.is_away {
                    return Some(LedgerUpdate::SlouchEvent);
                }
            }
        }

        None
    }

    fn is_accounting(&self) -> bool {
        self.state == OperatingState::Monitoring && self.is_calibrated
    }

    /// Where the engine should land once a pause condition clears. Pending
    /// conditions are re-checked so a lifted pause never skips a later one.
    fn resume_state(&self) -> OperatingState {
        if self.screen_locked {
            return OperatingState::Paused(PauseReason::ScreenLocked);
        }
        if self.on_the_go {
            return OperatingState::Paused(PauseReason::OnTheGo);
        }
        match state_when_enabling(self.is_calibrated, self.detector_available) {
            OperatingState::Monitoring
                if self.tracking_source == TrackingSource::MotionAccessory
                    && !self.accessory_present =>
            {
                OperatingState::Paused(PauseReason::SecondaryDeviceRemoved)
            }
            state => state,
        }
    }

    fn resume_from(&mut self, reason: PauseReason) {
        if self.state == OperatingState::Paused(reason) {
            self.transition(self.resume_state());
        }
    }

    fn transition(&mut self, to: OperatingState) -> bool {
        if can_transition(self.state, to) {
            log_info!("Posture state {} -> {}", self.state, to);
            self.state = to;
            true
        } else {
            log_debug!("Ignoring transition {} -> {}", self.state, to);
            false
        }
    }

    fn clear_posture_flags(&mut self) {
        self.is_away = false;
        self.is_slouching = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::ui_state::StatusKey;
    use OperatingState::*;

    fn calibrated(source: TrackingSource) -> PostureMachine {
        PostureMachine::new(MachineOptions {
            tracking_source: source,
            is_calibrated: true,
            detector_available: true,
        })
    }

    fn sample(interval: f64, is_slouching: bool, is_away: bool) -> PostureEvent {
        PostureEvent::Sample {
            interval,
            is_slouching,
            is_away,
        }
    }

    #[test]
    fn enabling_uncalibrated_waits_for_profile() {
        let mut machine = PostureMachine::new(MachineOptions::default());
        machine.apply(PostureEvent::Enable);
        assert_eq!(machine.state(), Paused(PauseReason::NoProfile));

        machine.apply(PostureEvent::StartCalibration);
        assert_eq!(machine.state(), Calibrating);
        assert!(machine.snapshot().detector_running);

        machine.apply(PostureEvent::CalibrationFinished { success: true });
        assert_eq!(machine.state(), Monitoring);
        assert!(machine.is_calibrated());
    }

    #[test]
    fn failed_calibration_returns_to_no_profile() {
        let mut machine = PostureMachine::new(MachineOptions::default());
        machine.apply(PostureEvent::StartCalibration);
        machine.apply(PostureEvent::CalibrationFinished { success: false });
        assert_eq!(machine.state(), Paused(PauseReason::NoProfile));
    }

    #[test]
    fn enabling_without_detector_pauses_disconnected() {
        let mut machine = PostureMachine::new(MachineOptions {
            detector_available: false,
            is_calibrated: true,
            ..MachineOptions::default()
        });
        machine.apply(PostureEvent::Enable);
        assert_eq!(machine.state(), Paused(PauseReason::DeviceDisconnected));

        machine.apply(PostureEvent::DetectorAvailability(true));
        assert_eq!(machine.state(), Monitoring);
    }

    #[test]
    fn samples_only_count_while_monitoring_and_present() {
        let mut machine = calibrated(TrackingSource::Camera);
        assert_eq!(machine.apply(sample(5.0, false, false)), None);

        machine.apply(PostureEvent::Enable);
        assert_eq!(
            machine.apply(sample(5.0, true, false)),
            Some(LedgerUpdate::Time {
                interval: 5.0,
                is_slouching: true
            })
        );
        assert_eq!(machine.snapshot().ui.status_text, StatusKey::Slouching);

        assert_eq!(machine.apply(sample(5.0, true, true)), None);
        assert_eq!(machine.snapshot().ui.status_text, StatusKey::Away);

        assert_eq!(machine.apply(PostureEvent::SlouchEvent), Some(LedgerUpdate::SlouchEvent));
    }

    #[test]
    fn screen_lock_round_trip_resumes_monitoring() {
        let mut machine = calibrated(TrackingSource::Camera);
        machine.apply(PostureEvent::Enable);
        machine.apply(PostureEvent::ScreenLocked);
        assert_eq!(machine.state(), Paused(PauseReason::ScreenLocked));
        assert!(!machine.snapshot().detector_running);
        assert_eq!(machine.apply(sample(5.0, false, false)), None);
        assert_eq!(machine.apply(PostureEvent::SlouchEvent), None);

        machine.apply(PostureEvent::ScreenUnlocked);
        assert_eq!(machine.state(), Monitoring);
    }

    #[test]
    fn unlock_while_on_the_go_stays_paused() {
        let mut machine = calibrated(TrackingSource::Camera);
        machine.apply(PostureEvent::Enable);
        machine.apply(PostureEvent::OnTheGo(true));
        machine.apply(PostureEvent::ScreenLocked);
        machine.apply(PostureEvent::ScreenUnlocked);
        assert_eq!(machine.state(), Paused(PauseReason::OnTheGo));

        machine.apply(PostureEvent::OnTheGo(false));
        assert_eq!(machine.state(), Monitoring);
    }

    #[test]
    fn lock_while_disabled_is_ignored() {
        let mut machine = calibrated(TrackingSource::Camera);
        machine.apply(PostureEvent::ScreenLocked);
        assert_eq!(machine.state(), Disabled);

        // The lock is remembered for when monitoring is switched on.
        machine.apply(PostureEvent::Enable);
        assert_eq!(machine.state(), Paused(PauseReason::ScreenLocked));
    }

    #[test]
    fn removed_accessory_keeps_detector_running() {
        let mut machine = calibrated(TrackingSource::MotionAccessory);
        machine.apply(PostureEvent::Enable);
        machine.apply(PostureEvent::AccessoryRemoved);

        let snapshot = machine.snapshot();
        assert_eq!(snapshot.state, Paused(PauseReason::SecondaryDeviceRemoved));
        assert!(snapshot.detector_running);
        assert_eq!(snapshot.ui.status_text, StatusKey::PausedReinsertAccessory);

        machine.apply(PostureEvent::AccessoryReinserted);
        assert_eq!(machine.state(), Monitoring);
    }

    #[test]
    fn accessory_removal_is_irrelevant_for_camera() {
        let mut machine = calibrated(TrackingSource::Camera);
        machine.apply(PostureEvent::Enable);
        machine.apply(PostureEvent::AccessoryRemoved);
        assert_eq!(machine.state(), Monitoring);
    }

    #[test]
    fn switching_to_camera_clears_accessory_pause() {
        let mut machine = calibrated(TrackingSource::MotionAccessory);
        machine.apply(PostureEvent::Enable);
        machine.apply(PostureEvent::AccessoryRemoved);
        machine.apply(PostureEvent::TrackingSourceChanged(TrackingSource::Camera));
        assert_eq!(machine.state(), Monitoring);
    }

    #[test]
    fn switching_to_missing_accessory_pauses_accounting() {
        let mut machine = calibrated(TrackingSource::Camera);
        machine.apply(PostureEvent::Enable);
        machine.apply(PostureEvent::AccessoryRemoved);
        machine.apply(PostureEvent::TrackingSourceChanged(TrackingSource::MotionAccessory));

        assert_eq!(machine.state(), Paused(PauseReason::SecondaryDeviceRemoved));
        assert_eq!(machine.apply(sample(5.0, false, false)), None);

        machine.apply(PostureEvent::AccessoryReinserted);
        assert_eq!(machine.state(), Monitoring);
    }

    #[test]
    fn slouch_event_while_away_is_not_recorded() {
        let mut machine = calibrated(TrackingSource::Camera);
        machine.apply(PostureEvent::Enable);
        machine.apply(sample(2.0, true, true));
        assert_eq!(machine.apply(PostureEvent::SlouchEvent), None);

        machine.apply(sample(2.0, true, false));
        assert_eq!(
            machine.apply(PostureEvent::SlouchEvent),
            Some(LedgerUpdate::SlouchEvent)
        );
    }

    #[test]
    fn disconnect_text_follows_tracking_source() {
        let mut machine = calibrated(TrackingSource::MotionAccessory);
        machine.apply(PostureEvent::Enable);
        machine.apply(PostureEvent::DetectorAvailability(false));
        assert_eq!(
            machine.snapshot().ui.status_text,
            StatusKey::AccessoryDisconnected
        );
    }

    #[test]
    fn disable_from_any_state_lands_disabled() {
        let mut machine = calibrated(TrackingSource::Camera);
        machine.apply(PostureEvent::Enable);
        machine.apply(PostureEvent::OnTheGo(true));
        machine.apply(PostureEvent::Disable);
        assert_eq!(machine.state(), Disabled);
        assert!(!machine.snapshot().ui.is_enabled);

        // Disabling twice is a rejected no-op transition.
        machine.apply(PostureEvent::Disable);
        assert_eq!(machine.state(), Disabled);
    }
}
