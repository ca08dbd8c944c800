use super::state::TrackingSource;

/// Inputs the controller reacts to: sensor samples plus device, session and
/// calibration notifications.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PostureEvent {
    Enable,
    Disable,
    StartCalibration,
    CalibrationFinished { success: bool },
    DetectorAvailability(bool),
    AccessoryRemoved,
    AccessoryReinserted,
    ScreenLocked,
    ScreenUnlocked,
    OnTheGo(bool),
    TrackingSourceChanged(TrackingSource),
    Sample {
        interval: f64,
        is_slouching: bool,
        is_away: bool,
    },
    SlouchEvent,
}

/// Parses one line of the plain-text event protocol used by the binary.
///
/// Blank lines and `#` comments yield `Ok(None)`.
pub fn parse_event(line: &str) -> Result<Option<PostureEvent>, String> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(None);
    }

    let mut parts = line.split_whitespace();
    let command = parts.next().unwrap_or_default().to_ascii_lowercase();
    let args: Vec<String> = parts.map(str::to_ascii_lowercase).collect();

    let event = match (command.as_str(), args.as_slice()) {
        ("enable", []) => PostureEvent::Enable,
        ("disable", []) => PostureEvent::Disable,
        ("calibrate", []) => PostureEvent::StartCalibration,
        ("calibrated", []) => PostureEvent::CalibrationFinished { success: true },
        ("calibration-failed", []) => PostureEvent::CalibrationFinished { success: false },
        ("device", [state]) => PostureEvent::DetectorAvailability(parse_switch(state)?),
        ("accessory", [state]) => match state.as_str() {
            "removed" => PostureEvent::AccessoryRemoved,
            "inserted" => PostureEvent::AccessoryReinserted,
            other => return Err(format!("unknown accessory state '{other}'")),
        },
        ("lock", []) => PostureEvent::ScreenLocked,
        ("unlock", []) => PostureEvent::ScreenUnlocked,
        ("onthego", [state]) => PostureEvent::OnTheGo(parse_switch(state)?),
        ("source", [name]) => PostureEvent::TrackingSourceChanged(
            TrackingSource::parse(name).ok_or_else(|| format!("unknown tracking source '{name}'"))?,
        ),
        ("sample", [interval, flags @ ..]) => {
            let interval: f64 = interval
                .parse()
                .map_err(|_| format!("invalid sample interval '{interval}'"))?;
            let mut is_slouching = false;
            let mut is_away = false;
            for flag in flags {
                match flag.as_str() {
                    "slouch" => is_slouching = true,
                    "away" => is_away = true,
                    other => return Err(format!("unknown sample flag '{other}'")),
                }
            }
            PostureEvent::Sample {
                interval,
                is_slouching,
                is_away,
            }
        }
        ("slouch", []) => PostureEvent::SlouchEvent,
        _ => return Err(format!("unrecognized event '{line}'")),
    };

    Ok(Some(event))
}

fn parse_switch(value: &str) -> Result<bool, String> {
    match value {
        "on" | "true" | "1" => Ok(true),
        "off" | "false" | "0" => Ok(false),
        other => Err(format!("expected on/off, got '{other}'")),
    }
}
