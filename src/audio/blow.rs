//! Microphone blow detection
//!
//! Loudness is the mean absolute deviation of unsigned byte time-domain
//! samples around 128, doubled onto a 0-256 scale. The detector is polled on
//! a fixed cadence by the experience timers rather than run continuously.

use std::collections::VecDeque;

/// Microphone permission as seen by the experience
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Permission {
    Granted,
    Denied,
    /// Prompt shown, waiting on the user
    Pending,
}

/// Permission-gated source of time-domain audio frames
pub trait AudioCapture {
    /// Ask for access; may resolve later (observe with [`AudioCapture::poll_permission`])
    fn request(&mut self) -> Permission;

    /// Current permission state
    fn poll_permission(&mut self) -> Permission;

    /// Fill `buf` with the most recent frame; false when no stream is open
    fn read_frame(&mut self, buf: &mut Vec<u8>) -> bool;

    /// Stop the stream and release the device
    fn release(&mut self);
}

/// Loudness of one frame (0-256)
pub fn loudness(samples: &[u8]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum: u32 = samples
        .iter()
        .map(|&s| (s as i32 - 128).unsigned_abs())
        .sum();
    sum as f32 / samples.len() as f32 * 2.0
}

/// Threshold test over a capture stream
pub struct AudioBlowDetector {
    capture: Box<dyn AudioCapture>,
    buffer: Vec<u8>,
    released: bool,
}

impl AudioBlowDetector {
    pub fn new(capture: Box<dyn AudioCapture>) -> Self {
        Self {
            capture,
            buffer: Vec::with_capacity(256),
            released: true,
        }
    }

    /// Ask for microphone access
    pub fn request_access(&mut self) -> Permission {
        let permission = self.capture.request();
        if permission != Permission::Denied {
            self.released = false;
        }
        log::debug!("Microphone access: {:?}", permission);
        permission
    }

    /// Observe a pending prompt
    pub fn permission(&mut self) -> Permission {
        self.capture.poll_permission()
    }

    /// Latest frame loudness, if a stream is open
    pub fn current_loudness(&mut self) -> Option<f32> {
        if self.released || self.capture.poll_permission() != Permission::Granted {
            return None;
        }
        if !self.capture.read_frame(&mut self.buffer) {
            return None;
        }
        Some(loudness(&self.buffer))
    }

    /// Whether the latest frame is louder than `threshold`
    pub fn is_blowing(&mut self, threshold: f32) -> bool {
        match self.current_loudness() {
            Some(level) if level > threshold => {
                log::debug!("Blow detected (loudness {:.1})", level);
                true
            }
            _ => false,
        }
    }

    /// Release the capture stream; idempotent
    pub fn release(&mut self) {
        if !self.released {
            self.capture.release();
            self.released = true;
            log::debug!("Microphone released");
        }
    }

    pub fn is_released(&self) -> bool {
        self.released
    }
}

impl Drop for AudioBlowDetector {
    fn drop(&mut self) {
        self.release();
    }
}

/// Capture that replays queued frames (headless runs and tests)
#[derive(Debug, Clone)]
pub struct ScriptedCapture {
    /// Permission the request resolves to
    answer: Permission,
    state: Permission,
    /// Polls left before a pending request resolves
    resolve_after: u32,
    frames: VecDeque<Vec<u8>>,
    last: Vec<u8>,
    open: bool,
    releases: u32,
}

impl ScriptedCapture {
    /// Grants access immediately
    pub fn granted() -> Self {
        Self::answering(Permission::Granted, 0)
    }

    /// Denies access immediately
    pub fn denied() -> Self {
        Self::answering(Permission::Denied, 0)
    }

    /// Resolves to `answer` on the `polls`-th permission poll after the request
    pub fn answering(answer: Permission, polls: u32) -> Self {
        Self {
            answer,
            state: Permission::Pending,
            resolve_after: polls,
            frames: VecDeque::new(),
            last: vec![128; 128],
            open: false,
            releases: 0,
        }
    }

    /// Queue a frame of constant deviation `amplitude` around 128
    pub fn push_level(&mut self, amplitude: u8) {
        let hi = 128u8.saturating_add(amplitude / 2);
        let lo = 128u8.saturating_sub(amplitude / 2);
        let frame = (0..128).map(|i| if i % 2 == 0 { hi } else { lo }).collect();
        self.frames.push_back(frame);
    }

    pub fn push_frame(&mut self, frame: Vec<u8>) {
        self.frames.push_back(frame);
    }

    pub fn release_count(&self) -> u32 {
        self.releases
    }

    fn resolve(&mut self) {
        self.state = self.answer;
        self.open = self.answer == Permission::Granted;
    }
}

impl AudioCapture for ScriptedCapture {
    fn request(&mut self) -> Permission {
        if self.resolve_after == 0 {
            self.resolve();
        } else {
            self.state = Permission::Pending;
        }
        self.state
    }

    fn poll_permission(&mut self) -> Permission {
        if self.state == Permission::Pending && self.resolve_after > 0 {
            self.resolve_after -= 1;
            if self.resolve_after == 0 {
                self.resolve();
            }
        }
        self.state
    }

    fn read_frame(&mut self, buf: &mut Vec<u8>) -> bool {
        if !self.open {
            return false;
        }
        if let Some(frame) = self.frames.pop_front() {
            self.last = frame;
        }
        buf.clear();
        buf.extend_from_slice(&self.last);
        true
    }

    fn release(&mut self) {
        self.open = false;
        self.releases += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_loudness_scale() {
        assert_eq!(loudness(&[]), 0.0);
        assert_eq!(loudness(&[128; 64]), 0.0);
        // |0 - 128| = 128 -> 256
        assert_eq!(loudness(&[0; 64]), 256.0);
        assert_eq!(loudness(&[153, 103]), 50.0);
    }

    #[test]
    fn test_threshold_is_strict() {
        let mut capture = ScriptedCapture::granted();
        capture.push_frame(vec![153, 103]);
        capture.push_frame(vec![154, 102]);
        let mut detector = AudioBlowDetector::new(Box::new(capture));
        assert_eq!(detector.request_access(), Permission::Granted);

        assert!(!detector.is_blowing(50.0), "exactly 50 is not a blow");
        assert!(detector.is_blowing(50.0));
    }

    #[test]
    fn test_last_frame_repeats_when_queue_empty() {
        let mut capture = ScriptedCapture::granted();
        capture.push_level(120);
        let mut detector = AudioBlowDetector::new(Box::new(capture));
        detector.request_access();
        assert!(detector.is_blowing(50.0));
        assert!(detector.is_blowing(50.0));
    }

    #[test]
    fn test_denied_never_blows() {
        let mut capture = ScriptedCapture::denied();
        capture.push_level(200);
        let mut detector = AudioBlowDetector::new(Box::new(capture));
        assert_eq!(detector.request_access(), Permission::Denied);
        assert!(!detector.is_blowing(50.0));
        assert!(detector.is_released());
    }

    #[test]
    fn test_released_detector_stops_reading() {
        let mut capture = ScriptedCapture::granted();
        capture.push_level(200);
        let mut detector = AudioBlowDetector::new(Box::new(capture));
        detector.request_access();
        detector.release();
        detector.release();
        assert!(!detector.is_blowing(10.0));
        assert_eq!(detector.current_loudness(), None);
    }

    #[test]
    fn test_pending_prompt_resolves() {
        let mut capture = ScriptedCapture::answering(Permission::Granted, 2);
        assert_eq!(capture.request(), Permission::Pending);
        assert_eq!(capture.poll_permission(), Permission::Pending);
        assert_eq!(capture.poll_permission(), Permission::Granted);
        assert_eq!(capture.poll_permission(), Permission::Granted);
        capture.release();
        assert_eq!(capture.release_count(), 1);
    }
}
