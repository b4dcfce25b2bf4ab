//! Browser audio using the Web Audio API
//!
//! One `AudioContext` is shared by playback and microphone capture. It is
//! created lazily on first use since browsers only allow audio after a user
//! gesture.

use std::cell::{OnceCell, RefCell};
use std::rc::Rc;

use wasm_bindgen::JsCast;
use wasm_bindgen_futures::JsFuture;
use web_sys::{
    AnalyserNode, AudioContext, GainNode, HtmlAudioElement, MediaStream, MediaStreamConstraints,
    MediaStreamTrack, OscillatorNode, OscillatorType,
};

use super::{AudioCapture, AudioPlayback, Permission, SoundEffect};

/// Analyser FFT size (128 time-domain samples per frame)
const FFT_SIZE: u32 = 256;

thread_local! {
    static AUDIO_CTX: OnceCell<Option<AudioContext>> = const { OnceCell::new() };
}

/// The page-wide audio context, created on first call
pub fn shared_context() -> Option<AudioContext> {
    AUDIO_CTX.with(|cell| {
        cell.get_or_init(|| {
            let ctx = AudioContext::new().ok();
            if ctx.is_none() {
                log::warn!("Failed to create AudioContext - audio disabled");
            }
            ctx
        })
        .clone()
    })
}

/// Resume the shared context (required after user gesture)
pub fn resume() {
    if let Some(ctx) = shared_context() {
        if ctx.state() == web_sys::AudioContextState::Suspended {
            let _ = ctx.resume();
        }
    }
}

/// Log a rejected `play()` promise (autoplay blocked and similar)
fn play_element(el: &HtmlAudioElement) {
    match el.play() {
        Ok(promise) => wasm_bindgen_futures::spawn_local(async move {
            if let Err(e) = JsFuture::from(promise).await {
                log::warn!("Audio playback blocked: {:?}", e);
            }
        }),
        Err(e) => log::warn!("Audio playback failed: {:?}", e),
    }
}

/// Procedural effects plus `<audio>` elements for tracks and samples
pub struct WebPlayback {
    track: Option<HtmlAudioElement>,
    popper: Option<HtmlAudioElement>,
}

impl Default for WebPlayback {
    fn default() -> Self {
        Self::new()
    }
}

impl WebPlayback {
    pub fn new() -> Self {
        let popper = HtmlAudioElement::new_with_src(crate::POPPER_SOUND_URL).ok();
        if popper.is_none() {
            log::warn!("Failed to create popper sample element");
        }
        Self {
            track: None,
            popper,
        }
    }

    /// Create an oscillator with gain envelope
    fn create_osc(
        ctx: &AudioContext,
        freq: f32,
        osc_type: OscillatorType,
    ) -> Option<(OscillatorNode, GainNode)> {
        let osc = ctx.create_oscillator().ok()?;
        let gain = ctx.create_gain().ok()?;

        osc.set_type(osc_type);
        osc.frequency().set_value(freq);
        osc.connect_with_audio_node(&gain).ok()?;
        gain.connect_with_audio_node(&ctx.destination()).ok()?;

        Some((osc, gain))
    }

    /// Balloon pop - short bright burst with a falling body
    fn play_balloon_pop(ctx: &AudioContext, vol: f32) {
        let t = ctx.current_time();

        if let Some((osc, gain)) = Self::create_osc(ctx, 900.0, OscillatorType::Square) {
            gain.gain().set_value_at_time(vol * 0.25, t).ok();
            gain.gain()
                .exponential_ramp_to_value_at_time(0.01, t + 0.06)
                .ok();
            osc.frequency().set_value_at_time(900.0, t).ok();
            osc.frequency()
                .exponential_ramp_to_value_at_time(200.0, t + 0.06)
                .ok();
            osc.start().ok();
            osc.stop_with_when(t + 0.08).ok();
        }

        if let Some((osc, gain)) = Self::create_osc(ctx, 180.0, OscillatorType::Sine) {
            gain.gain().set_value_at_time(vol * 0.4, t).ok();
            gain.gain()
                .exponential_ramp_to_value_at_time(0.01, t + 0.12)
                .ok();
            osc.frequency().set_value_at_time(180.0, t).ok();
            osc.frequency()
                .exponential_ramp_to_value_at_time(60.0, t + 0.12)
                .ok();
            osc.start().ok();
            osc.stop_with_when(t + 0.15).ok();
        }
    }
}

impl AudioPlayback for WebPlayback {
    fn play(&mut self, effect: SoundEffect, volume: f32) {
        if volume <= 0.0 {
            return;
        }
        match effect {
            SoundEffect::BalloonPop => {
                let Some(ctx) = shared_context() else { return };
                resume();
                Self::play_balloon_pop(&ctx, volume);
            }
            SoundEffect::Popper => {
                if let Some(el) = &self.popper {
                    el.set_volume(volume as f64);
                    el.set_current_time(0.0);
                    play_element(el);
                }
            }
        }
    }

    fn play_track(&mut self, url: &str, volume: f32) {
        self.stop_track();
        let Ok(el) = HtmlAudioElement::new_with_src(url) else {
            log::warn!("Failed to create audio element for {}", url);
            return;
        };
        el.set_loop(false);
        el.set_volume(volume.clamp(0.0, 1.0) as f64);
        el.set_current_time(0.0);
        play_element(&el);
        self.track = Some(el);
    }

    fn stop_track(&mut self) {
        if let Some(el) = self.track.take() {
            let _ = el.pause();
        }
    }

    fn set_track_volume(&mut self, volume: f32) {
        if let Some(el) = &self.track {
            el.set_volume(volume.clamp(0.0, 1.0) as f64);
        }
    }
}

impl Drop for WebPlayback {
    fn drop(&mut self) {
        self.stop_track();
    }
}

#[derive(Default)]
struct MicShared {
    permission: Option<Permission>,
    stream: Option<MediaStream>,
    analyser: Option<AnalyserNode>,
    released: bool,
}

impl MicShared {
    fn stop_stream(&mut self) {
        if let Some(stream) = self.stream.take() {
            for track in stream.get_tracks().iter() {
                if let Ok(track) = track.dyn_into::<MediaStreamTrack>() {
                    track.stop();
                }
            }
        }
        self.analyser = None;
    }
}

/// `getUserMedia` capture feeding an analyser node
#[derive(Default)]
pub struct WebMicrophone {
    shared: Rc<RefCell<MicShared>>,
}

impl WebMicrophone {
    pub fn new() -> Self {
        Self::default()
    }

    async fn open(shared: Rc<RefCell<MicShared>>) -> Result<(), wasm_bindgen::JsValue> {
        let window = web_sys::window().ok_or("no window")?;
        let devices = window.navigator().media_devices()?;
        let constraints = MediaStreamConstraints::new();
        constraints.set_audio(&wasm_bindgen::JsValue::TRUE);
        let promise = devices.get_user_media_with_constraints(&constraints)?;
        let stream: MediaStream = JsFuture::from(promise).await?.dyn_into()?;

        let ctx = shared_context().ok_or("no audio context")?;
        resume();
        let source = ctx.create_media_stream_source(&stream)?;
        let analyser = ctx.create_analyser()?;
        analyser.set_fft_size(FFT_SIZE);
        source.connect_with_audio_node(&analyser)?;

        let mut state = shared.borrow_mut();
        state.stream = Some(stream);
        state.analyser = Some(analyser);
        if state.released {
            // Released while the prompt was open
            state.stop_stream();
        }
        Ok(())
    }
}

impl AudioCapture for WebMicrophone {
    fn request(&mut self) -> Permission {
        {
            let mut state = self.shared.borrow_mut();
            match state.permission {
                Some(Permission::Pending) => return Permission::Pending,
                Some(Permission::Granted) if state.stream.is_some() => {
                    return Permission::Granted;
                }
                _ => {}
            }
            state.permission = Some(Permission::Pending);
            state.released = false;
        }

        let shared = self.shared.clone();
        wasm_bindgen_futures::spawn_local(async move {
            let result = Self::open(shared.clone()).await;
            let mut state = shared.borrow_mut();
            state.permission = Some(match result {
                Ok(()) => Permission::Granted,
                Err(e) => {
                    log::warn!("Microphone unavailable: {:?}", e);
                    Permission::Denied
                }
            });
        });
        Permission::Pending
    }

    fn poll_permission(&mut self) -> Permission {
        self.shared.borrow().permission.unwrap_or(Permission::Pending)
    }

    fn read_frame(&mut self, buf: &mut Vec<u8>) -> bool {
        let state = self.shared.borrow();
        let Some(analyser) = &state.analyser else {
            return false;
        };
        buf.resize(analyser.fft_size() as usize, 128);
        analyser.get_byte_time_domain_data(buf.as_mut_slice());
        true
    }

    fn release(&mut self) {
        let mut state = self.shared.borrow_mut();
        state.released = true;
        state.stop_stream();
    }
}
