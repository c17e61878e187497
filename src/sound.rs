/// Sound-cue policy: whether a newly rendered message should play a cue
///
/// The policy is a pure function of (settings, current local hour) and is
/// evaluated at message-arrival time, never cached. Actual audio output is an
/// external collaborator.
use crate::session::SoundSettings;
use chrono::Timelike;

/// Do-not-disturb window start (local wall-clock hour, inclusive)
pub const DND_START_HOUR: u32 = 23;
/// Do-not-disturb window end (local wall-clock hour, exclusive)
pub const DND_END_HOUR: u32 = 7;

/// True when the given local hour falls inside the nightly DND window
pub fn in_dnd_window(hour: u32) -> bool {
    hour >= DND_START_HOUR || hour < DND_END_HOUR
}

/// Cue decision for a non-self message rendered into the active conversation
pub fn should_play_cue(settings: &SoundSettings, local_hour: u32) -> bool {
    if !settings.enabled {
        return false;
    }
    if settings.dnd_enabled && in_dnd_window(local_hour) {
        return false;
    }
    true
}

/// Cue decision against the current local wall clock
pub fn should_play_cue_now(settings: &SoundSettings) -> bool {
    should_play_cue(settings, chrono::Local::now().hour())
}
