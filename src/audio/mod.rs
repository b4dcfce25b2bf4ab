//! Audio: microphone blow detection and sound playback
//!
//! Playback is a collaborator trait so the experience can run headless. The
//! browser implementation lives in `web` and uses the Web Audio API.

pub mod blow;
#[cfg(target_arch = "wasm32")]
pub mod web;

pub use blow::{AudioBlowDetector, AudioCapture, Permission, ScriptedCapture, loudness};

/// Sound effect types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SoundEffect {
    /// Balloon popped on the landing screen
    BalloonPop,
    /// Confetti poppers fired after the cut
    Popper,
}

/// Fire-and-forget effects plus one background track
pub trait AudioPlayback {
    /// Play a one-shot effect at `volume` (0.0 - 1.0)
    fn play(&mut self, effect: SoundEffect, volume: f32);

    /// Start `url` from the beginning, replacing any current track
    fn play_track(&mut self, url: &str, volume: f32);

    /// Stop the background track; no-op when nothing plays
    fn stop_track(&mut self);

    /// Change the running track's volume; no-op when nothing plays
    fn set_track_volume(&mut self, volume: f32);
}

/// Playback that only logs (native runs)
#[derive(Debug, Default)]
pub struct LoggingPlayback {
    track: Option<String>,
}

impl LoggingPlayback {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current_track(&self) -> Option<&str> {
        self.track.as_deref()
    }
}

impl AudioPlayback for LoggingPlayback {
    fn play(&mut self, effect: SoundEffect, volume: f32) {
        if volume > 0.0 {
            log::info!("♪ {:?} (volume {:.2})", effect, volume);
        }
    }

    fn play_track(&mut self, url: &str, volume: f32) {
        log::info!("♪ Track started: {} (volume {:.2})", url, volume);
        self.track = Some(url.to_string());
    }

    fn stop_track(&mut self) {
        if let Some(url) = self.track.take() {
            log::info!("♪ Track stopped: {}", url);
        }
    }

    fn set_track_volume(&mut self, volume: f32) {
        if let Some(url) = &self.track {
            log::info!("♪ Track volume {:.2}: {}", volume, url);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_logging_playback_tracks_current_song() {
        let mut playback = LoggingPlayback::new();
        assert_eq!(playback.current_track(), None);
        playback.play_track("a.mp3", 0.5);
        playback.play_track("b.mp3", 0.5);
        assert_eq!(playback.current_track(), Some("b.mp3"));
        playback.stop_track();
        playback.stop_track();
        assert_eq!(playback.current_track(), None);
    }
}
