//! Experience simulation module
//!
//! All experience logic lives here, free of rendering and platform code:
//! - Forward-only stage machine driven by triggers and a per-frame `tick`
//! - Cancellable stage timers advanced by the frame loop
//! - Seeded, injectable randomness (wheel outcomes, particle bursts)

pub mod controller;
pub mod particles;
pub mod stage;
pub mod timer;
pub mod wheel;

pub use controller::{
    Balloon, CandleSet, Collaborators, ExperienceController, ExperienceEvent, MicrophoneState,
};
pub use particles::{
    BurstSpec, Particle, ParticleKind, ParticleSimulator, Popper, PopperRig, VelocityDistribution,
};
pub use stage::ExperienceStage;
pub use timer::{TimerKind, TimerSet};
pub use wheel::{
    FixedIndex, RandomSource, SpinResult, WheelRandomizer, WheelSpin, WheelState, segment_degrees,
    segment_under_pointer, terminal_rotation,
};
