//! Ballistic particles for fireworks and confetti poppers
//!
//! Physics is expressed per frame unit (one display refresh), so effective
//! speed follows the refresh rate. `step(1.0)` advances exactly one frame.

use glam::Vec3;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use crate::consts::*;
use crate::lerp;

/// Firework palette
pub mod colors {
    pub const GOLD: u32 = 0xFFD700;
    pub const MAGENTA: u32 = 0xD946EF;
    pub const WHITE: u32 = 0xFFFFFF;
    pub const POPPER_PINK: u32 = 0xFF4081;
    pub const POPPER_BLUE: u32 = 0x40C4FF;
}

/// Particle effect families, each with its own motion profile
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ParticleKind {
    /// Omnidirectional burst that fades out
    Firework,
    /// Popper confetti, removed when it falls below the floor
    Confetti,
}

/// Per-frame motion constants for one kind
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MotionProfile {
    pub gravity: f32,
    /// Velocity multiplier per frame (< 1)
    pub drag: f32,
    /// Apply drag before gravity within a frame
    pub drag_first: bool,
    /// Life lost per frame
    pub fade: f32,
    /// Removal height, if any
    pub floor: Option<f32>,
}

impl ParticleKind {
    pub fn profile(self) -> MotionProfile {
        match self {
            ParticleKind::Firework => MotionProfile {
                gravity: FIREWORK_GRAVITY,
                drag: FIREWORK_DRAG,
                drag_first: false,
                fade: FIREWORK_FADE,
                floor: None,
            },
            ParticleKind::Confetti => MotionProfile {
                gravity: CONFETTI_GRAVITY,
                drag: CONFETTI_DRAG,
                drag_first: true,
                fade: 0.0,
                floor: Some(CONFETTI_FLOOR),
            },
        }
    }
}

/// How initial velocities are sampled
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum VelocityDistribution {
    /// Uniform direction on the sphere, speed in `[min_speed, max_speed)`
    Spherical { min_speed: f32, max_speed: f32 },
    /// Per-axis ranges; `x` carries the direction toward the opposing side
    Biased {
        x: (f32, f32),
        y: (f32, f32),
        z_spread: f32,
    },
}

impl VelocityDistribution {
    /// Firework explosion
    pub const FIREWORK: VelocityDistribution = VelocityDistribution::Spherical {
        min_speed: 0.1,
        max_speed: 0.3,
    };

    /// Popper confetti shot up and toward +X (`direction` = 1) or -X (-1)
    pub fn popper(direction: f32) -> Self {
        let d = direction.signum();
        let (a, b) = (0.5 * d, 2.0 * d);
        VelocityDistribution::Biased {
            x: (a.min(b), a.max(b)),
            y: (3.0, 5.5),
            z_spread: 1.0,
        }
    }

    fn sample(&self, rng: &mut Pcg32) -> Vec3 {
        match *self {
            VelocityDistribution::Spherical { min_speed, max_speed } => {
                let theta = std::f32::consts::TAU * rng.random::<f32>();
                let phi = (2.0 * rng.random::<f32>() - 1.0).clamp(-1.0, 1.0).acos();
                let speed = lerp(min_speed, max_speed, rng.random::<f32>());
                Vec3::new(
                    speed * phi.sin() * theta.cos(),
                    speed * phi.sin() * theta.sin(),
                    speed * phi.cos(),
                )
            }
            VelocityDistribution::Biased { x, y, z_spread } => Vec3::new(
                lerp(x.0, x.1, rng.random::<f32>()),
                lerp(y.0, y.1, rng.random::<f32>()),
                (rng.random::<f32>() - 0.5) * 2.0 * z_spread,
            ),
        }
    }
}

/// One transient visual element
#[derive(Debug, Clone, PartialEq)]
pub struct Particle {
    pub kind: ParticleKind,
    /// Burst this particle was spawned by
    pub burst: u32,
    pub position: Vec3,
    pub velocity: Vec3,
    /// Euler angles (radians)
    pub rotation: Vec3,
    pub rotation_velocity: Vec3,
    /// 1.0 at spawn; doubles as opacity for fading kinds
    pub remaining_life: f32,
    pub color: u32,
}

/// A burst request
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BurstSpec {
    pub kind: ParticleKind,
    pub origin: Vec3,
    /// Random spawn offset per axis (`± jitter / 2`)
    pub jitter: Vec3,
    pub count: usize,
    pub velocity: VelocityDistribution,
    /// None picks a random color per particle
    pub color: Option<u32>,
    /// Max random angular velocity per axis (radians/frame)
    pub spin: f32,
}

impl BurstSpec {
    /// 200-particle firework at `origin`, spread along Z
    pub fn firework(origin: Vec3, color: u32) -> Self {
        Self {
            kind: ParticleKind::Firework,
            origin,
            jitter: Vec3::new(0.0, 0.0, 4.0),
            count: FIREWORK_PARTICLES,
            velocity: VelocityDistribution::FIREWORK,
            color: Some(color),
            spin: 0.0,
        }
    }

    /// Confetti from a popper mouth, aimed at the opposite side
    pub fn popper_confetti(mouth: Vec3, direction: f32) -> Self {
        Self {
            kind: ParticleKind::Confetti,
            origin: mouth,
            jitter: Vec3::ZERO,
            count: CONFETTI_PER_POPPER,
            velocity: VelocityDistribution::popper(direction),
            color: None,
            spin: 0.2,
        }
    }
}

/// Owns every live particle
#[derive(Debug, Clone)]
pub struct ParticleSimulator {
    particles: Vec<Particle>,
    rng: Pcg32,
    max_particles: usize,
    next_burst: u32,
}

impl ParticleSimulator {
    pub fn new(seed: u64, max_particles: usize) -> Self {
        Self {
            particles: Vec::new(),
            rng: Pcg32::seed_from_u64(seed),
            max_particles,
            next_burst: 1,
        }
    }

    /// Spawn `count` particles of `kind` at `origin`; returns the burst id.
    ///
    /// Bursts past the particle cap are truncated.
    pub fn spawn_burst(
        &mut self,
        kind: ParticleKind,
        origin: Vec3,
        count: usize,
        velocity: VelocityDistribution,
    ) -> u32 {
        self.spawn(BurstSpec {
            kind,
            origin,
            jitter: Vec3::ZERO,
            count,
            velocity,
            color: None,
            spin: 0.0,
        })
    }

    /// Spawn a fully described burst; returns the burst id
    pub fn spawn(&mut self, spec: BurstSpec) -> u32 {
        let burst = self.next_burst;
        self.next_burst = self.next_burst.wrapping_add(1);

        let room = self.max_particles.saturating_sub(self.particles.len());
        let count = spec.count.min(room);
        if count < spec.count {
            log::debug!("Particle cap reached, burst {} truncated to {}", burst, count);
        }

        self.particles.reserve(count);
        for _ in 0..count {
            let rng = &mut self.rng;
            let offset = Vec3::new(
                (rng.random::<f32>() - 0.5) * spec.jitter.x,
                (rng.random::<f32>() - 0.5) * spec.jitter.y,
                (rng.random::<f32>() - 0.5) * spec.jitter.z,
            );
            let velocity = spec.velocity.sample(rng);
            let rotation_velocity = Vec3::new(
                rng.random::<f32>() * spec.spin,
                rng.random::<f32>() * spec.spin,
                rng.random::<f32>() * spec.spin,
            );
            let color = spec
                .color
                .unwrap_or_else(|| rng.random_range(0..=0xFFFFFF));

            self.particles.push(Particle {
                kind: spec.kind,
                burst,
                position: spec.origin + offset,
                velocity,
                rotation: Vec3::ZERO,
                rotation_velocity,
                remaining_life: 1.0,
                color,
            });
        }
        burst
    }

    /// Advance every particle by `frames` frame units and drop dead ones
    pub fn step(&mut self, frames: f32) {
        for p in &mut self.particles {
            let profile = p.kind.profile();
            p.position += p.velocity * frames;
            let drag = profile.drag.powf(frames);
            if profile.drag_first {
                p.velocity *= drag;
                p.velocity.y -= profile.gravity * frames;
            } else {
                p.velocity.y -= profile.gravity * frames;
                p.velocity *= drag;
            }
            p.rotation += p.rotation_velocity * frames;
            p.remaining_life -= profile.fade * frames;
        }
        self.particles.retain(|p| {
            let alive = p.remaining_life > 0.0;
            let above_floor = p.kind.profile().floor.is_none_or(|floor| p.position.y >= floor);
            alive && above_floor
        });
    }

    pub fn particles(&self) -> &[Particle] {
        &self.particles
    }

    pub fn len(&self) -> usize {
        self.particles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.particles.is_empty()
    }

    /// Live particles of one burst
    pub fn burst_len(&self, burst: u32) -> usize {
        self.particles.iter().filter(|p| p.burst == burst).count()
    }

    pub fn clear(&mut self) {
        self.particles.clear();
    }

    /// Random draw from the simulator's stream (effect placement)
    pub fn random_unit(&mut self) -> f32 {
        self.rng.random::<f32>()
    }
}

/// State of one confetti cannon
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Popper {
    pub position: Vec3,
    /// Confetti flies toward this X direction
    pub direction: f32,
    pub color: u32,
}

impl Popper {
    /// Where confetti leaves the canister
    pub fn mouth(&self) -> Vec3 {
        self.position + Vec3::new(0.0, 0.5, 0.0)
    }
}

/// Two confetti cannons that rise after the cake is cut and fire once
#[derive(Debug, Clone, PartialEq)]
pub struct PopperRig {
    pub left: Popper,
    pub right: Popper,
    rising: bool,
    fired: bool,
}

impl Default for PopperRig {
    fn default() -> Self {
        Self::new()
    }
}

impl PopperRig {
    pub fn new() -> Self {
        Self {
            left: Popper {
                position: Vec3::new(-POPPER_X, POPPER_START_Y, POPPER_Z),
                direction: 1.0,
                color: colors::POPPER_PINK,
            },
            right: Popper {
                position: Vec3::new(POPPER_X, POPPER_START_Y, POPPER_Z),
                direction: -1.0,
                color: colors::POPPER_BLUE,
            },
            rising: false,
            fired: false,
        }
    }

    /// Start rising from below the table
    pub fn trigger(&mut self) {
        self.rising = true;
    }

    pub fn has_fired(&self) -> bool {
        self.fired
    }

    /// One frame of the rise; returns the bursts to spawn on the firing frame
    pub fn step(&mut self) -> Option<[BurstSpec; 2]> {
        if !self.rising {
            return None;
        }
        for popper in [&mut self.left, &mut self.right] {
            popper.position.y = lerp(popper.position.y, 0.0, POPPER_RISE_LERP);
        }
        if self.fired || self.left.position.y <= POPPER_FIRE_Y {
            return None;
        }
        self.fired = true;
        Some([
            BurstSpec::popper_confetti(self.left.mouth(), self.left.direction),
            BurstSpec::popper_confetti(self.right.mouth(), self.right.direction),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_firework_single_frame_matches_reference_physics() {
        let mut sim = ParticleSimulator::new(1, 1000);
        sim.spawn_burst(
            ParticleKind::Firework,
            Vec3::ZERO,
            1,
            VelocityDistribution::FIREWORK,
        );
        let before = sim.particles()[0].clone();
        sim.step(1.0);
        let after = &sim.particles()[0];

        assert_eq!(after.position, before.velocity);
        let mut expected = before.velocity;
        expected.y -= FIREWORK_GRAVITY;
        expected *= FIREWORK_DRAG;
        assert!((after.velocity - expected).length() < 1e-6);
        assert!((after.remaining_life - (1.0 - FIREWORK_FADE)).abs() < 1e-6);
    }

    #[test]
    fn test_firework_speed_range() {
        let mut sim = ParticleSimulator::new(9, 1000);
        sim.spawn_burst(
            ParticleKind::Firework,
            Vec3::ZERO,
            200,
            VelocityDistribution::FIREWORK,
        );
        for p in sim.particles() {
            let speed = p.velocity.length();
            assert!((0.099..0.301).contains(&speed), "speed {speed}");
        }
    }

    #[test]
    fn test_fireworks_expire_after_fade() {
        let mut sim = ParticleSimulator::new(2, 1000);
        sim.spawn(BurstSpec::firework(Vec3::ZERO, colors::GOLD));
        assert_eq!(sim.len(), FIREWORK_PARTICLES);

        // 1 / 0.015 = 66.7 frames
        for _ in 0..66 {
            sim.step(1.0);
        }
        assert_eq!(sim.len(), FIREWORK_PARTICLES);
        sim.step(1.0);
        assert!(sim.is_empty());
    }

    #[test]
    fn test_confetti_drags_before_gravity() {
        let mut sim = ParticleSimulator::new(5, 1000);
        sim.spawn(BurstSpec::popper_confetti(Vec3::new(-4.0, 0.5, 2.0), 1.0));
        let before = sim.particles()[0].clone();
        sim.step(1.0);
        let after = &sim.particles()[0];

        assert_eq!(after.position, before.position + before.velocity);
        let mut expected = before.velocity * CONFETTI_DRAG;
        expected.y -= CONFETTI_GRAVITY;
        assert!((after.velocity - expected).length() < 1e-6);
        // Gravity-first would shave another gravity * (1 - drag) off y
        let mut other = before.velocity;
        other.y -= CONFETTI_GRAVITY;
        other *= CONFETTI_DRAG;
        assert!((after.velocity.y - other.y).abs() > 1e-3);
    }

    #[test]
    fn test_confetti_removed_below_floor() {
        let mut sim = ParticleSimulator::new(3, 1000);
        let burst = sim.spawn(BurstSpec::popper_confetti(Vec3::new(-4.0, 0.5, 2.0), 1.0));
        assert_eq!(sim.burst_len(burst), CONFETTI_PER_POPPER);

        let mut frames = 0;
        while !sim.is_empty() {
            sim.step(1.0);
            frames += 1;
            assert!(frames < 600, "confetti never landed");
        }
        assert!(frames > 10);
    }

    #[test]
    fn test_popper_confetti_heads_to_opposite_side() {
        let mut sim = ParticleSimulator::new(4, 1000);
        sim.spawn(BurstSpec::popper_confetti(Vec3::new(-4.0, 0.5, 2.0), 1.0));
        sim.spawn(BurstSpec::popper_confetti(Vec3::new(4.0, 0.5, 2.0), -1.0));
        for p in sim.particles() {
            assert!(p.velocity.y >= 3.0);
            if p.position.x < 0.0 {
                assert!(p.velocity.x >= 0.5);
            } else {
                assert!(p.velocity.x <= -0.5);
            }
            assert!(p.velocity.z.abs() <= 1.0);
        }
    }

    #[test]
    fn test_independent_burst_lifetimes() {
        let mut sim = ParticleSimulator::new(5, 1000);
        let first = sim.spawn(BurstSpec::firework(Vec3::ZERO, colors::GOLD));
        for _ in 0..40 {
            sim.step(1.0);
        }
        let second = sim.spawn(BurstSpec::firework(Vec3::ZERO, colors::MAGENTA));
        for _ in 0..30 {
            sim.step(1.0);
        }
        assert_eq!(sim.burst_len(first), 0);
        assert_eq!(sim.burst_len(second), FIREWORK_PARTICLES);
    }

    #[test]
    fn test_cap_truncates_bursts() {
        let mut sim = ParticleSimulator::new(6, 250);
        sim.spawn(BurstSpec::firework(Vec3::ZERO, colors::WHITE));
        let second = sim.spawn(BurstSpec::firework(Vec3::ZERO, colors::WHITE));
        assert_eq!(sim.len(), 250);
        assert_eq!(sim.burst_len(second), 50);
    }

    #[test]
    fn test_rotation_advances() {
        let mut sim = ParticleSimulator::new(8, 1000);
        sim.spawn(BurstSpec::popper_confetti(Vec3::ZERO, 1.0));
        let spin = sim.particles()[0].rotation_velocity;
        sim.step(1.0);
        assert_eq!(sim.particles()[0].rotation, spin);
    }

    #[test]
    fn test_popper_rig_fires_once_after_rising() {
        let mut rig = PopperRig::new();
        assert_eq!(rig.step(), None, "idle rig must not move");
        assert_eq!(rig.left.position.y, POPPER_START_Y);

        rig.trigger();
        let mut fired_on = None;
        for frame in 0..100 {
            if let Some(bursts) = rig.step() {
                assert!(fired_on.is_none(), "fired twice");
                fired_on = Some(frame);
                assert!(bursts[0].velocity != bursts[1].velocity);
                assert_eq!(bursts[0].origin.x, -POPPER_X);
                assert_eq!(bursts[1].origin.x, POPPER_X);
            }
        }
        // -5 * 0.9^n > -1 first at n = 16
        assert_eq!(fired_on, Some(15));
        assert!(rig.has_fired());
        assert!(rig.left.position.y > -0.01);
    }

    proptest! {
        #[test]
        fn prop_every_particle_expires(seed in any::<u64>(), bursts in 1usize..6) {
            let mut sim = ParticleSimulator::new(seed, 10_000);
            for i in 0..bursts {
                if i % 2 == 0 {
                    sim.spawn(BurstSpec::firework(Vec3::new(i as f32, 0.0, 0.0), colors::GOLD));
                } else {
                    sim.spawn(BurstSpec::popper_confetti(Vec3::new(-4.0, 0.5, 2.0), 1.0));
                }
            }
            let mut frames = 0;
            while !sim.is_empty() {
                sim.step(1.0);
                frames += 1;
                prop_assert!(frames <= 600);
            }
        }
    }
}
