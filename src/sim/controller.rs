//! Experience controller
//!
//! Owns the stage machine and every piece of stage-local state. Input arrives
//! through trigger methods and `tick`; output leaves as stage changes and
//! drained `ExperienceEvent`s.

use glam::{Vec2, Vec3};
use serde::{Deserialize, Serialize};

use super::particles::{BurstSpec, ParticleSimulator, PopperRig, colors};
use super::stage::ExperienceStage;
use super::timer::{TimerKind, TimerSet};
use super::wheel::{SpinResult, WheelRandomizer, WheelSpin, WheelState};
use crate::audio::{AudioBlowDetector, AudioCapture, AudioPlayback, Permission, SoundEffect};
use crate::consts::*;
use crate::interaction::{InteractionEvent, ScratchCard};
use crate::persistence::{PersistenceError, SurpriseStore};
use crate::record::SurpriseRecord;
use crate::settings::ExperienceSettings;

/// One landing balloon
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Balloon {
    pub id: usize,
    pub label: &'static str,
    pub popped: bool,
}

/// Candles on the cake, lit or out together
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandleSet {
    pub count: u32,
    pub lit: bool,
}

/// Microphone as presented to the viewer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MicrophoneState {
    Idle,
    /// Permission prompt open
    Pending,
    Listening,
    /// Access refused; offer the manual fallback
    Denied,
}

/// Outputs for the presentation layer
#[derive(Debug, Clone, PartialEq)]
pub enum ExperienceEvent {
    StageChanged {
        from: ExperienceStage,
        to: ExperienceStage,
    },
    BalloonPopped {
        id: usize,
    },
    /// Intro message fully typed
    IntroTyped,
    WheelSpinStarted {
        terminal_rotation_degrees: f32,
    },
    WheelSettled {
        result: SpinResult,
        option: String,
    },
    MicrophoneChanged(MicrophoneState),
    CandlesBlown,
    CakeCut,
    PoppersFired,
    GiftAvailable,
    /// Enough foil scratched off to show the personal note
    NoteRevealed,
    DeletionRequested {
        id: String,
    },
}

/// External collaborators the controller drives
pub struct Collaborators {
    pub store: Box<dyn SurpriseStore>,
    pub capture: Box<dyn AudioCapture>,
    pub playback: Box<dyn AudioPlayback>,
}

/// Top-level state machine of the experience
pub struct ExperienceController {
    record: SurpriseRecord,
    settings: ExperienceSettings,
    preview: bool,

    stage: ExperienceStage,
    entered: Option<ExperienceStage>,
    timers: TimerSet,
    events: Vec<ExperienceEvent>,

    // Landing / intro
    balloons: Vec<Balloon>,
    intro_chars: Vec<char>,
    typed_chars: usize,

    // Wheel
    wheel_options: Vec<String>,
    wheel: WheelState,
    randomizer: WheelRandomizer,

    // Candles
    candles: CandleSet,
    microphone: MicrophoneState,
    detector: AudioBlowDetector,

    // Cake cutting
    is_cut: bool,
    gift_available: bool,
    poppers: PopperRig,

    // Reveal
    scratch: ScratchCard,

    particles: ParticleSimulator,
    playback: Box<dyn AudioPlayback>,
    store: Box<dyn SurpriseStore>,
    deletion_requested: bool,
    shut_down: bool,
}

impl ExperienceController {
    pub fn new(
        record: SurpriseRecord,
        mut settings: ExperienceSettings,
        preview: bool,
        collaborators: Collaborators,
        seed: u64,
    ) -> Self {
        settings.sanitize();
        let balloons = BALLOON_LABELS
            .into_iter()
            .enumerate()
            .map(|(id, label)| Balloon {
                id,
                label,
                popped: false,
            })
            .collect();

        let mut controller = Self {
            intro_chars: record.intro_message.chars().collect(),
            wheel_options: record.wheel_options(),
            candles: CandleSet {
                count: record.candle_count(),
                lit: true,
            },
            randomizer: WheelRandomizer::new(seed, settings.wheel_extra_spins),
            particles: ParticleSimulator::new(seed.wrapping_add(1), settings.max_particles()),
            record,
            settings,
            preview,
            stage: ExperienceStage::Landing,
            entered: None,
            timers: TimerSet::new(),
            events: Vec::new(),
            balloons,
            typed_chars: 0,
            wheel: WheelState::Idle,
            microphone: MicrophoneState::Idle,
            detector: AudioBlowDetector::new(collaborators.capture),
            is_cut: false,
            gift_available: false,
            poppers: PopperRig::new(),
            scratch: ScratchCard::new(SCRATCH_CARD_WIDTH, SCRATCH_CARD_HEIGHT),
            playback: collaborators.playback,
            store: collaborators.store,
            deletion_requested: false,
            shut_down: false,
        };
        log::info!(
            "Experience for {} from {} ({} candles, {} wheel options{})",
            controller.record.receiver_name,
            controller.record.sender_name,
            controller.candles.count,
            controller.wheel_options.len(),
            if preview { ", preview" } else { "" }
        );
        controller.enter(ExperienceStage::Landing);
        controller
    }

    /// Load `id` from the store, falling back to the demo record
    pub fn load(
        id: &str,
        settings: ExperienceSettings,
        preview: bool,
        collaborators: Collaborators,
        seed: u64,
    ) -> Self {
        let record = match collaborators.store.load(id) {
            Ok(record) => {
                log::info!("Loaded surprise {}", id);
                record
            }
            Err(PersistenceError::NotFound(_)) => {
                log::warn!("Surprise {} not found, showing demo", id);
                SurpriseRecord::demo()
            }
            Err(e) => {
                log::warn!("Failed to load surprise {}: {}, showing demo", id, e);
                SurpriseRecord::demo()
            }
        };
        Self::new(record, settings, preview, collaborators, seed)
    }

    /// Replace the wheel randomizer (pinned outcomes)
    pub fn with_randomizer(mut self, randomizer: WheelRandomizer) -> Self {
        self.randomizer = randomizer;
        self
    }

    // === Accessors ===

    pub fn stage(&self) -> ExperienceStage {
        self.stage
    }

    pub fn record(&self) -> &SurpriseRecord {
        &self.record
    }

    pub fn settings(&self) -> &ExperienceSettings {
        &self.settings
    }

    pub fn is_preview(&self) -> bool {
        self.preview
    }

    pub fn balloons(&self) -> &[Balloon] {
        &self.balloons
    }

    pub fn all_balloons_popped(&self) -> bool {
        self.balloons.iter().all(|b| b.popped)
    }

    /// Intro message revealed so far
    pub fn typed_text(&self) -> String {
        self.intro_chars[..self.typed_chars].iter().collect()
    }

    pub fn wheel_options(&self) -> &[String] {
        &self.wheel_options
    }

    pub fn wheel(&self) -> &WheelState {
        &self.wheel
    }

    pub fn candles(&self) -> CandleSet {
        self.candles
    }

    pub fn microphone(&self) -> MicrophoneState {
        self.microphone
    }

    pub fn is_cut(&self) -> bool {
        self.is_cut
    }

    /// Whether the knife may still be dragged
    pub fn can_cut(&self) -> bool {
        self.stage == ExperienceStage::CakeCutting && !self.is_cut
    }

    pub fn gift_available(&self) -> bool {
        self.gift_available
    }

    pub fn poppers(&self) -> &PopperRig {
        &self.poppers
    }

    /// Foil over the personal note
    pub fn scratch_card(&self) -> &ScratchCard {
        &self.scratch
    }

    pub fn particles(&self) -> &ParticleSimulator {
        &self.particles
    }

    pub fn deletion_requested(&self) -> bool {
        self.deletion_requested
    }

    pub fn is_shut_down(&self) -> bool {
        self.shut_down
    }

    /// Take all events emitted since the last drain
    pub fn drain_events(&mut self) -> Vec<ExperienceEvent> {
        std::mem::take(&mut self.events)
    }

    // === Stage machine ===

    /// Initialize stage-local state; runs once per stage
    fn enter(&mut self, stage: ExperienceStage) {
        if self.entered == Some(stage) {
            return;
        }
        self.entered = Some(stage);

        match stage {
            ExperienceStage::Landing => {}
            ExperienceStage::IntroAnimation => {
                self.typed_chars = 0;
                self.timers.start_interval(
                    TimerKind::Typewriter,
                    stage,
                    self.settings.typewriter_interval_ms,
                );
            }
            ExperienceStage::InteractiveCheck => {}
            ExperienceStage::Wheel => {
                self.wheel = WheelState::Idle;
            }
            ExperienceStage::Candles => {
                self.candles.lit = true;
                self.microphone = MicrophoneState::Idle;
            }
            ExperienceStage::CakeCutting => {
                self.is_cut = false;
                self.gift_available = false;
                self.poppers = PopperRig::new();
            }
            ExperienceStage::Reveal => {
                self.scratch = ScratchCard::new(SCRATCH_CARD_WIDTH, SCRATCH_CARD_HEIGHT);
                self.request_deletion();
            }
            ExperienceStage::Ending => {
                self.playback.stop_track();
                self.detector.release();
            }
        }
    }

    /// Tear down what the current stage started
    fn leave(&mut self, stage: ExperienceStage) {
        self.timers.cancel_stage(stage);
        match stage {
            ExperienceStage::Wheel => self.wheel = WheelState::Idle,
            ExperienceStage::Candles => {
                self.detector.release();
                if self.microphone != MicrophoneState::Idle {
                    self.set_microphone(MicrophoneState::Idle);
                }
            }
            _ => {}
        }
    }

    /// Move to the next stage
    fn advance(&mut self) {
        if self.shut_down {
            return;
        }
        let from = self.stage;
        let Some(to) = from.next() else {
            return;
        };
        self.leave(from);
        self.stage = to;
        log::info!("Stage: {} -> {}", from, to);
        self.events.push(ExperienceEvent::StageChanged { from, to });
        self.enter(to);
    }

    // === Triggers ===

    /// Leave the landing once every balloon is popped
    pub fn start_journey(&mut self) -> bool {
        if self.stage != ExperienceStage::Landing || !self.all_balloons_popped() {
            return false;
        }
        self.advance();
        true
    }

    pub fn pop_balloon(&mut self, id: usize) -> bool {
        if self.stage != ExperienceStage::Landing {
            return false;
        }
        let Some(balloon) = self.balloons.iter_mut().find(|b| b.id == id && !b.popped) else {
            return false;
        };
        balloon.popped = true;
        log::debug!("Balloon {} ({}) popped", id, balloon.label);

        self.playback
            .play(SoundEffect::BalloonPop, self.settings.effective_sfx_volume());
        self.launch_firework(None);
        self.launch_firework(None);
        self.launch_firework(Some(colors::WHITE));
        self.events.push(ExperienceEvent::BalloonPopped { id });
        true
    }

    pub fn confirm_intro_seen(&mut self) -> bool {
        if self.stage != ExperienceStage::InteractiveCheck {
            return false;
        }
        self.advance();
        true
    }

    /// Start a spin; rejected unless the wheel is idle
    pub fn spin_wheel(&mut self) -> bool {
        if self.stage != ExperienceStage::Wheel || !self.wheel.can_spin() {
            return false;
        }
        let result = self.randomizer.spin(self.wheel_options.len());
        self.wheel = WheelState::Spinning(WheelSpin::new(result, self.settings.wheel_spin_ms));
        self.events.push(ExperienceEvent::WheelSpinStarted {
            terminal_rotation_degrees: result.terminal_rotation_degrees,
        });
        true
    }

    pub fn accept_spin_result(&mut self) -> bool {
        if self.stage != ExperienceStage::Wheel {
            return false;
        }
        let WheelState::Settled(result) = self.wheel else {
            return false;
        };
        self.wheel = WheelState::Accepted(result);
        self.advance();
        true
    }

    /// Ask for the microphone so the viewer can blow out the candles
    pub fn request_microphone(&mut self) -> MicrophoneState {
        let allowed = matches!(
            self.microphone,
            MicrophoneState::Idle | MicrophoneState::Denied
        );
        if self.stage != ExperienceStage::Candles || !self.candles.lit || !allowed {
            return self.microphone;
        }
        let permission = self.detector.request_access();
        self.apply_permission(permission);
        self.microphone
    }

    /// Blow the candles out without the microphone
    pub fn manual_blow(&mut self) -> bool {
        if self.stage != ExperienceStage::Candles || !self.candles.lit {
            return false;
        }
        self.blow_success();
        true
    }

    pub fn cut_cake(&mut self) -> bool {
        if !self.can_cut() {
            return false;
        }
        self.is_cut = true;
        self.poppers.trigger();
        self.events.push(ExperienceEvent::CakeCut);
        self.timers.start_once(
            TimerKind::GiftReveal,
            ExperienceStage::CakeCutting,
            self.settings.gift_reveal_delay_ms,
        );
        true
    }

    pub fn open_gift(&mut self) -> bool {
        if self.stage != ExperienceStage::CakeCutting || !self.gift_available {
            return false;
        }
        self.advance();
        true
    }

    /// Scratch the card at `uv` (0..1 across the card)
    pub fn scratch(&mut self, uv: Vec2) -> bool {
        if self.stage != ExperienceStage::Reveal || self.scratch.is_revealed() {
            return false;
        }
        if self.scratch.scratch(uv * self.scratch.size()) {
            self.events.push(ExperienceEvent::NoteRevealed);
        }
        true
    }

    /// Mute or unmute; the running track follows at once
    pub fn set_muted(&mut self, muted: bool) {
        self.settings.muted = muted;
        self.playback
            .set_track_volume(self.settings.effective_music_volume());
        log::info!("Sound {}", if muted { "muted" } else { "on" });
    }

    /// Viewer leaves the reveal screen
    pub fn finish(&mut self) -> bool {
        if self.stage != ExperienceStage::Reveal {
            return false;
        }
        self.advance();
        true
    }

    /// Route a pointer interaction; invalid ones are discarded
    pub fn handle_interaction(&mut self, event: InteractionEvent) -> bool {
        match event {
            InteractionEvent::BalloonPopped(id) => self.pop_balloon(id),
            InteractionEvent::GiftOpened => self.open_gift(),
            InteractionEvent::CakeCut => self.cut_cake(),
            InteractionEvent::Scratched { uv } => self.scratch(uv),
            InteractionEvent::KnifeGrabbed | InteractionEvent::KnifeMoved { .. } => self.can_cut(),
        }
    }

    // === Frame ===

    /// Advance one display frame by `dt_ms` wall-clock milliseconds
    pub fn tick(&mut self, dt_ms: f64) {
        if self.shut_down {
            return;
        }

        if self.microphone == MicrophoneState::Pending {
            let permission = self.detector.permission();
            if permission != Permission::Pending {
                self.apply_permission(permission);
            }
        }

        self.timers.advance(dt_ms);
        while let Some((kind, stage)) = self.timers.next_due() {
            if stage == self.stage {
                self.on_timer(kind);
            }
        }

        if let Some(result) = self.wheel.simulate(dt_ms) {
            let option = self
                .wheel_options
                .get(result.chosen_index)
                .cloned()
                .unwrap_or_default();
            log::info!("Wheel settled on {}: {}", result.chosen_index, option);
            self.events
                .push(ExperienceEvent::WheelSettled { result, option });
        }

        if let Some(bursts) = self.poppers.step() {
            for burst in bursts {
                self.particles.spawn(burst);
            }
            self.playback
                .play(SoundEffect::Popper, self.settings.effective_sfx_volume());
            self.events.push(ExperienceEvent::PoppersFired);
        }

        if self.stage == ExperienceStage::Reveal
            && !self.settings.reduced_motion
            && (self.particles.random_unit() as f64) < REVEAL_FIREWORK_CHANCE
        {
            self.launch_firework(None);
        }

        self.particles.step(1.0);
    }

    fn on_timer(&mut self, kind: TimerKind) {
        match kind {
            TimerKind::Typewriter => {
                if self.typed_chars < self.intro_chars.len() {
                    self.typed_chars += 1;
                }
                if self.typed_chars >= self.intro_chars.len() {
                    self.timers.cancel(TimerKind::Typewriter);
                    self.timers.start_once(
                        TimerKind::IntroHold,
                        ExperienceStage::IntroAnimation,
                        self.settings.intro_hold_ms,
                    );
                    self.events.push(ExperienceEvent::IntroTyped);
                }
            }
            TimerKind::IntroHold => self.advance(),
            TimerKind::BlowPoll => {
                if self.candles.lit && self.detector.is_blowing(self.settings.blow_threshold) {
                    self.blow_success();
                }
            }
            TimerKind::Celebration => self.advance(),
            TimerKind::GiftReveal => {
                self.gift_available = true;
                log::info!("Gift available");
                self.events.push(ExperienceEvent::GiftAvailable);
            }
        }
    }

    // === Internals ===

    fn set_microphone(&mut self, state: MicrophoneState) {
        if self.microphone != state {
            self.microphone = state;
            self.events.push(ExperienceEvent::MicrophoneChanged(state));
        }
    }

    fn apply_permission(&mut self, permission: Permission) {
        match permission {
            Permission::Granted => {
                self.set_microphone(MicrophoneState::Listening);
                self.timers.start_interval(
                    TimerKind::BlowPoll,
                    ExperienceStage::Candles,
                    self.settings.blow_poll_ms,
                );
                log::info!("Listening for a blow");
            }
            Permission::Pending => self.set_microphone(MicrophoneState::Pending),
            Permission::Denied => {
                log::warn!("Microphone denied, manual blow available");
                self.detector.release();
                self.set_microphone(MicrophoneState::Denied);
            }
        }
    }

    fn blow_success(&mut self) {
        self.candles.lit = false;
        self.timers.cancel(TimerKind::BlowPoll);
        self.detector.release();
        if self.microphone != MicrophoneState::Denied {
            self.set_microphone(MicrophoneState::Idle);
        }
        log::info!("Candles blown out");
        self.events.push(ExperienceEvent::CandlesBlown);

        let track = self.record.celebration_track().to_string();
        self.playback
            .play_track(&track, self.settings.effective_music_volume());
        self.timers.start_once(
            TimerKind::Celebration,
            ExperienceStage::Candles,
            self.settings.celebration_delay_ms,
        );
    }

    /// Random firework near the center
    fn launch_firework(&mut self, color: Option<u32>) {
        let x = (self.particles.random_unit() - 0.5) * 8.0;
        let y = (self.particles.random_unit() - 0.5) * 4.0;
        let color = color.unwrap_or_else(|| {
            if self.particles.random_unit() > 0.5 {
                colors::GOLD
            } else {
                colors::MAGENTA
            }
        });
        self.particles
            .spawn(BurstSpec::firework(Vec3::new(x, y, 0.0), color));
    }

    /// Delete the viewed record once; never for previews or placeholders
    fn request_deletion(&mut self) {
        if self.deletion_requested {
            return;
        }
        if self.preview {
            log::info!("Preview mode, keeping surprise {}", self.record.id);
            return;
        }
        if self.record.is_placeholder() {
            log::debug!("Placeholder record {}, nothing to delete", self.record.id);
            return;
        }

        self.deletion_requested = true;
        let id = self.record.id.clone();
        self.events
            .push(ExperienceEvent::DeletionRequested { id: id.clone() });
        match self.store.delete(&id, &self.record.media_urls()) {
            Ok(()) => log::info!("Surprise {} deleted after viewing", id),
            Err(e) => log::warn!("Failed to delete surprise {}: {}", id, e),
        }
    }

    /// Cancel everything and release devices; idempotent
    pub fn shutdown(&mut self) {
        if self.shut_down {
            return;
        }
        self.shut_down = true;
        self.timers.cancel_all();
        self.detector.release();
        self.playback.stop_track();
        log::info!("Experience shut down at {}", self.stage);
    }
}

impl Drop for ExperienceController {
    fn drop(&mut self) {
        self.shutdown();
    }
}
