//! Platform helpers
//!
//! Frame timing shared by the browser loop and the headless runner.

/// Nominal display refresh interval
pub const FRAME_MS: f64 = 1000.0 / 60.0;
/// Longest delta fed to the experience (tab switches, debugger pauses)
pub const MAX_FRAME_MS: f64 = 100.0;

/// Turns animation-frame timestamps into clamped deltas
#[derive(Debug, Clone)]
pub struct FrameClock {
    last_time: Option<f64>,
    // FPS tracking
    frame_times: [f64; 60],
    frame_index: usize,
    fps: u32,
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameClock {
    pub fn new() -> Self {
        Self {
            last_time: None,
            frame_times: [0.0; 60],
            frame_index: 0,
            fps: 0,
        }
    }

    /// Delta (ms) since the previous frame; the first frame gets one nominal frame
    pub fn tick(&mut self, now_ms: f64) -> f64 {
        let dt = match self.last_time {
            Some(last) => (now_ms - last).clamp(0.0, MAX_FRAME_MS),
            None => FRAME_MS,
        };
        self.last_time = Some(now_ms);

        self.frame_times[self.frame_index] = now_ms;
        self.frame_index = (self.frame_index + 1) % self.frame_times.len();

        // Oldest sample sits at the write index once the ring is full
        let oldest = self.frame_times[self.frame_index];
        if oldest > 0.0 {
            let elapsed = now_ms - oldest;
            if elapsed > 0.0 {
                let intervals = (self.frame_times.len() - 1) as f64;
                self.fps = (intervals * 1000.0 / elapsed).round() as u32;
            }
        }
        dt
    }

    pub fn fps(&self) -> u32 {
        self.fps
    }

    /// Forget the previous timestamp (after the page was hidden)
    pub fn reset(&mut self) {
        self.last_time = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_frame_is_nominal() {
        let mut clock = FrameClock::new();
        assert_eq!(clock.tick(5000.0), FRAME_MS);
        assert_eq!(clock.tick(5020.0), 20.0);
    }

    #[test]
    fn test_long_gaps_are_clamped() {
        let mut clock = FrameClock::new();
        clock.tick(1000.0);
        assert_eq!(clock.tick(9000.0), MAX_FRAME_MS);
        // Clock going backwards never yields a negative delta
        assert_eq!(clock.tick(8000.0), 0.0);
    }

    #[test]
    fn test_reset() {
        let mut clock = FrameClock::new();
        clock.tick(1000.0);
        clock.reset();
        assert_eq!(clock.tick(50_000.0), FRAME_MS);
    }

    #[test]
    fn test_fps_estimate() {
        let mut clock = FrameClock::new();
        for i in 1..=120 {
            clock.tick(i as f64 * FRAME_MS);
        }
        assert_eq!(clock.fps(), 60);
    }
}
