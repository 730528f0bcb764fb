use std::time::{Duration, Instant};

use crate::protocol::TitleInput;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverlayCommand {
    Show,
    Hide,
}

/// Timers and counters for the "now playing" caption, carried across loop
/// iterations.
#[derive(Debug, Clone)]
pub struct OverlayState {
    pub last_shown_at: Instant,
    pub show_again_not_before: Instant,
    pub shown_count: u32,
    pub last_song_key: String,
}

impl OverlayState {
    pub fn new(now: Instant) -> Self {
        Self {
            last_shown_at: now,
            show_again_not_before: now,
            shown_count: 0,
            last_song_key: String::new(),
        }
    }

    /// Work out whether the caption should change this iteration and apply the
    /// transition to the timers.
    ///
    /// `force_hide` takes the caption down regardless of timers. Otherwise an
    /// on-air caption is only taken down once it has been up for `on_air`,
    /// and an off-air caption is shown for a new song, or repeated up to
    /// `show_times` times for the same song, once the cool-down has passed.
    pub fn evaluate(
        &mut self,
        overlay: Option<&TitleInput>,
        on_air_overlays: &[u32],
        now: Instant,
        on_air: Duration,
        show_times: u32,
        force_hide: bool,
    ) -> Option<OverlayCommand> {
        let overlay = overlay?;

        log::debug!(
            "Now playing: shown {:?} ago, show again in {:?}, count {}, song '{}'",
            now.saturating_duration_since(self.last_shown_at),
            self.show_again_not_before.saturating_duration_since(now),
            self.shown_count,
            self.last_song_key
        );

        if force_hide {
            self.hidden(now, on_air);
            return Some(OverlayCommand::Hide);
        }

        if on_air_overlays.contains(&overlay.number) {
            if now >= self.last_shown_at + on_air {
                self.hidden(now, on_air);
                return Some(OverlayCommand::Hide);
            }
            return None;
        }

        if now < self.show_again_not_before {
            return None;
        }

        let song_key = overlay.song_key();
        if song_key != self.last_song_key {
            log::info!("New song '{}', resetting show count", song_key);
            self.last_song_key = song_key;
            self.shown_count = 0;
            self.shown(now);
            Some(OverlayCommand::Show)
        } else if self.shown_count < show_times {
            self.shown(now);
            Some(OverlayCommand::Show)
        } else {
            None
        }
    }

    fn shown(&mut self, now: Instant) {
        self.last_shown_at = now;
        self.shown_count += 1;
    }

    fn hidden(&mut self, now: Instant, on_air: Duration) {
        self.show_again_not_before = now + on_air;
    }
}
