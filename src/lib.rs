//! Wishprise - an interactive birthday surprise
//!
//! Core modules:
//! - `sim`: Experience state machine, timers, wheel and particle simulation
//! - `interaction`: Pointer/touch ray casting and the knife drag protocol
//! - `audio`: Microphone blow detection and sound playback
//! - `persistence`: Surprise record storage collaborators
//! - `platform`: Frame timing helpers
//! - `settings`: Data-driven timings, thresholds and quality

pub mod audio;
pub mod interaction;
pub mod persistence;
pub mod platform;
pub mod record;
pub mod settings;
pub mod sim;

pub use record::SurpriseRecord;
pub use settings::{ExperienceSettings, QualityPreset};
pub use sim::{ExperienceController, ExperienceEvent, ExperienceStage};

/// Experience configuration constants
pub mod consts {
    /// Number of balloons on the landing screen
    pub const BALLOON_COUNT: usize = 3;
    /// Words revealed by the balloons, in order
    pub const BALLOON_LABELS: [&str; BALLOON_COUNT] = ["It's", "Your", "Birthday!"];

    /// One character of the intro message is revealed per interval
    pub const TYPEWRITER_INTERVAL_MS: f64 = 50.0;
    /// Hold after the intro message is fully shown
    pub const INTRO_HOLD_MS: f64 = 3000.0;
    /// Clapping delay between a successful blow and cake cutting
    pub const CELEBRATION_DELAY_MS: f64 = 2000.0;
    /// Delay between the cut and the gift becoming available
    pub const GIFT_REVEAL_DELAY_MS: f64 = 2500.0;

    /// Wheel spin animation duration
    pub const WHEEL_SPIN_MS: f64 = 3500.0;
    /// Full turns before the wheel settles (5 * 360 = 1800 degrees)
    pub const WHEEL_EXTRA_SPINS: u32 = 5;

    /// Microphone polling cadence
    pub const BLOW_POLL_MS: f64 = 100.0;
    /// Loudness (0-256 scale) above which the viewer counts as blowing
    pub const BLOW_THRESHOLD: f32 = 50.0;

    /// Candle count bounds
    pub const MIN_CANDLES: u32 = 1;
    pub const MAX_CANDLES: u32 = 9;

    /// Knife cut radius around the cake center (cake local units)
    pub const CUT_RADIUS: f32 = 1.5;
    /// Height of the invisible horizontal drag plane
    pub const DRAG_PLANE_HEIGHT: f32 = 1.5;
    /// Half extent of the drag plane (30x30 units)
    pub const DRAG_PLANE_HALF_EXTENT: f32 = 15.0;
    /// Height the knife is held at while dragging
    pub const KNIFE_HEIGHT: f32 = 2.0;
    /// Knife tilt (radians about Z) while dragging
    pub const KNIFE_TILT: f32 = -0.2;

    /// Firework burst physics (per frame)
    pub const FIREWORK_PARTICLES: usize = 200;
    pub const FIREWORK_GRAVITY: f32 = 0.003;
    pub const FIREWORK_DRAG: f32 = 0.99;
    pub const FIREWORK_FADE: f32 = 0.015;
    /// Per-frame chance of a random firework during the reveal
    pub const REVEAL_FIREWORK_CHANCE: f64 = 0.03;

    /// Confetti popper physics (per frame)
    pub const CONFETTI_PER_POPPER: usize = 150;
    pub const CONFETTI_GRAVITY: f32 = 0.1;
    pub const CONFETTI_DRAG: f32 = 0.96;
    pub const CONFETTI_FLOOR: f32 = -5.0;

    /// Popper rig: hidden start height, lerp factor per frame, fire height
    pub const POPPER_START_Y: f32 = -5.0;
    pub const POPPER_RISE_LERP: f32 = 0.1;
    pub const POPPER_FIRE_Y: f32 = -1.0;
    pub const POPPER_X: f32 = 4.0;
    pub const POPPER_Z: f32 = 2.0;

    /// Scratch card over the personal note (card pixels)
    pub const SCRATCH_CARD_WIDTH: f32 = 300.0;
    pub const SCRATCH_CARD_HEIGHT: f32 = 180.0;
    pub const SCRATCH_BRUSH_RADIUS: f32 = 25.0;
    /// Coverage grid resolution
    pub const SCRATCH_CELL_PX: f32 = 5.0;
    /// Cleared share above which the note is revealed
    pub const SCRATCH_REVEAL_COVERAGE: f32 = 0.4;

    /// Volumes (0.0 - 1.0)
    pub const MUSIC_VOLUME: f32 = 0.5;
    pub const POPPER_VOLUME: f32 = 0.6;
}

/// Fallback celebration track used when the creator did not upload a song
pub const DEMO_MUSIC_URL: &str =
    "https://cdn.pixabay.com/download/audio/2022/10/16/audio_9c03b03c86.mp3";
/// Confetti popper sample
pub const POPPER_SOUND_URL: &str =
    "https://cdn.pixabay.com/download/audio/2022/03/10/audio_c8c8a73467.mp3";

/// Wrap an angle in degrees to [0, 360)
#[inline]
pub fn wrap_degrees(angle: f32) -> f32 {
    let wrapped = angle.rem_euclid(360.0);
    // rem_euclid can round up to exactly 360 for tiny negative inputs
    if wrapped >= 360.0 { 0.0 } else { wrapped }
}

/// Linear interpolation
#[inline]
pub fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}
