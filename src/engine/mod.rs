pub mod controller;
pub mod events;
pub mod machine;
pub mod state;
pub mod transitions;
pub mod ui_state;

pub use controller::{ControllerOptions, PostureController, PostureHandle};
pub use events::{parse_event, PostureEvent};
pub use machine::{LedgerUpdate, MachineOptions, PostureMachine, PostureSnapshot};
pub use state::{OperatingState, PauseReason, TrackingSource};
pub use transitions::{can_transition, should_detector_run, state_when_enabling};
pub use ui_state::{PostureUIState, StatusIcon, StatusKey};
