//! Wishprise entry point
//!
//! Handles platform-specific initialization and runs the experience loop.

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

#[cfg(target_arch = "wasm32")]
mod wasm_game {
    use std::cell::RefCell;
    use std::rc::Rc;

    use glam::Vec2;
    use wasm_bindgen::prelude::*;
    use web_sys::{HtmlCanvasElement, MouseEvent, TouchEvent};

    use wishprise::audio::web::{self as web_audio, WebMicrophone, WebPlayback};
    use wishprise::interaction::{
        Camera, InteractionDetector, InteractionEvent, SceneLayout, ScreenRect, Viewport,
    };
    use wishprise::persistence::LocalStorageStore;
    use wishprise::platform::FrameClock;
    use wishprise::sim::{Collaborators, ExperienceStage, MicrophoneState, WheelState};
    use wishprise::{ExperienceController, ExperienceEvent, ExperienceSettings, SurpriseRecord};

    /// Experience instance holding all page state
    struct App {
        controller: ExperienceController,
        detector: InteractionDetector,
        layout: SceneLayout,
        clock: FrameClock,
        audio_unlocked: bool,
    }

    impl App {
        fn new(controller: ExperienceController, viewport: Viewport) -> Self {
            Self {
                controller,
                detector: InteractionDetector::new(Camera::cake_view(viewport.aspect()), viewport),
                layout: SceneLayout::new(),
                clock: FrameClock::new(),
                audio_unlocked: false,
            }
        }

        /// Browsers only start audio from a gesture
        fn unlock_audio(&mut self) {
            if !self.audio_unlocked {
                web_audio::resume();
                self.audio_unlocked = true;
            }
        }

        fn press_start(&mut self, pointer: Vec2) {
            self.unlock_audio();
            if self.controller.stage() == ExperienceStage::Reveal {
                self.layout.scratch_rect = scratch_card_rect();
            }
            *self.detector.objects_mut() = self.layout.targets(&self.controller);
            if let Some(event) = self.detector.on_press_start(&self.layout.scene, pointer) {
                self.dispatch(event);
            }
        }

        fn press_move(&mut self, pointer: Vec2) {
            if let Some(event) = self.detector.on_press_move(pointer) {
                self.dispatch(event);
            }
        }

        fn press_end(&mut self) {
            if self.detector.on_press_end() {
                self.layout.reset_knife();
            }
        }

        fn dispatch(&mut self, event: InteractionEvent) {
            if let InteractionEvent::KnifeMoved { position, .. } = event {
                self.layout.move_knife(position);
            }
            if !self.controller.handle_interaction(event) {
                log::debug!("Ignored interaction {:?}", event);
            }
        }

        /// Run one animation frame
        fn update(&mut self, time: f64) {
            let dt = self.clock.tick(time);
            self.controller.tick(dt);

            for event in self.controller.drain_events() {
                match &event {
                    ExperienceEvent::StageChanged { to, .. } => {
                        log::info!("Stage: {}", to.as_str());
                        if *to == ExperienceStage::CakeCutting {
                            self.detector.reset();
                            self.layout.reset_knife();
                        }
                    }
                    ExperienceEvent::NoteRevealed => log::info!("Personal note revealed"),
                    other => log::debug!("{:?}", other),
                }
            }
        }

        /// Update HUD elements in DOM
        fn update_hud(&self) {
            let Some(document) = web_sys::window().and_then(|w| w.document()) else {
                return;
            };
            let c = &self.controller;

            for stage in ExperienceStage::ALL {
                if let Some(el) = document.get_element_by_id(&format!("stage-{}", stage.as_str())) {
                    let class = if stage == c.stage() { "stage" } else { "stage hidden" };
                    let _ = el.set_attribute("class", class);
                }
            }

            match c.stage() {
                ExperienceStage::Landing => {
                    if let Some(el) = document.get_element_by_id("start-btn") {
                        let class = if c.all_balloons_popped() { "" } else { "hidden" };
                        let _ = el.set_attribute("class", class);
                    }
                }
                ExperienceStage::IntroAnimation => {
                    if let Some(el) = document.get_element_by_id("intro-text") {
                        el.set_text_content(Some(&c.typed_text()));
                    }
                }
                ExperienceStage::Wheel => {
                    if let Some(el) = document.get_element_by_id("wheel-disc") {
                        let style = format!("transform: rotate({:.2}deg)", c.wheel().rotation());
                        let _ = el.set_attribute("style", &style);
                    }
                    if let Some(el) = document.get_element_by_id("wheel-result") {
                        let text = match c.wheel() {
                            WheelState::Settled(result) | WheelState::Accepted(result) => {
                                c.wheel_options().get(result.chosen_index).cloned()
                            }
                            _ => None,
                        };
                        el.set_text_content(text.as_deref());
                    }
                    if let Some(el) = document.get_element_by_id("accept-btn") {
                        let settled = matches!(c.wheel(), WheelState::Settled(_));
                        let _ = el.set_attribute("class", if settled { "" } else { "hidden" });
                    }
                }
                ExperienceStage::Candles => {
                    if let Some(el) = document.get_element_by_id("mic-status") {
                        let text = match c.microphone() {
                            MicrophoneState::Idle => "Tap the mic and blow!",
                            MicrophoneState::Pending => "Waiting for microphone...",
                            MicrophoneState::Listening => "Listening... blow!",
                            MicrophoneState::Denied => "No microphone? Tap to blow instead",
                        };
                        el.set_text_content(Some(text));
                    }
                }
                ExperienceStage::CakeCutting => {
                    if let Some(el) = document.get_element_by_id("gift-hint") {
                        let class = if c.gift_available() { "" } else { "hidden" };
                        let _ = el.set_attribute("class", class);
                    }
                }
                ExperienceStage::Reveal => {
                    let card = c.scratch_card();
                    if let Some(el) = document.get_element_by_id("scratch-cover") {
                        let style = if card.is_revealed() {
                            "opacity: 0".to_string()
                        } else {
                            format!("opacity: {:.2}", 1.0 - card.coverage())
                        };
                        let _ = el.set_attribute("style", &style);
                    }
                    if let Some(el) = document.get_element_by_id("reveal-note") {
                        el.set_text_content(Some(&c.record().personal_note));
                    }
                }
                _ => {}
            }

            if let Some(el) = document.get_element_by_id("mute-btn") {
                el.set_text_content(Some(if c.settings().muted { "Unmute" } else { "Mute" }));
            }

            let value = |id: &str| document.query_selector(id).ok().flatten();
            if let Some(el) = value("#hud-particles .hud-value") {
                el.set_text_content(Some(&c.particles().len().to_string()));
            }
            if let Some(el) = value("#hud-fps .hud-value") {
                el.set_text_content(Some(&self.clock.fps().to_string()));
            }
        }
    }

    /// `id` and `preview` from the page URL
    fn read_query(window: &web_sys::Window) -> (Option<String>, bool) {
        let search = window.location().search().unwrap_or_default();
        match web_sys::UrlSearchParams::new_with_str(&search) {
            Ok(params) => (
                params.get("id").filter(|id| !id.is_empty()),
                params.get("preview").as_deref() == Some("true"),
            ),
            Err(_) => (None, false),
        }
    }

    /// Screen rect of the scratch card overlay, if it is on the page
    fn scratch_card_rect() -> Option<ScreenRect> {
        let document = web_sys::window()?.document()?;
        let rect = document.get_element_by_id("scratch-card")?.get_bounding_client_rect();
        Some(ScreenRect::new(
            rect.left() as f32,
            rect.top() as f32,
            rect.width() as f32,
            rect.height() as f32,
        ))
    }

    fn canvas_viewport(canvas: &HtmlCanvasElement) -> Viewport {
        let rect = canvas.get_bounding_client_rect();
        Viewport::new(
            rect.left() as f32,
            rect.top() as f32,
            rect.width() as f32,
            rect.height() as f32,
        )
    }

    pub async fn run() {
        console_error_panic_hook::set_once();
        console_log::init_with_level(log::Level::Info).expect("Failed to init logger");

        log::info!("Wishprise starting...");

        let window = web_sys::window().expect("no window");
        let document = window.document().expect("no document");

        // Hide loading indicator
        if let Some(loading) = document.get_element_by_id("loading") {
            let _ = loading.set_attribute("class", "hidden");
        }

        let canvas: HtmlCanvasElement = document
            .get_element_by_id("canvas")
            .expect("no canvas")
            .dyn_into()
            .expect("not a canvas");

        let (id, preview) = read_query(&window);
        let settings = ExperienceSettings::load();
        let seed = js_sys::Date::now() as u64;
        let collaborators = Collaborators {
            store: Box::new(LocalStorageStore::new()),
            capture: Box::new(WebMicrophone::new()),
            playback: Box::new(WebPlayback::new()),
        };

        let controller = match id {
            Some(id) => ExperienceController::load(&id, settings, preview, collaborators, seed),
            None => {
                log::info!("No surprise id in URL, showing demo");
                ExperienceController::new(
                    SurpriseRecord::demo(),
                    settings,
                    preview,
                    collaborators,
                    seed,
                )
            }
        };
        log::info!(
            "Surprise for {} from {} (preview: {})",
            controller.record().receiver_name,
            controller.record().sender_name,
            preview
        );

        let app = Rc::new(RefCell::new(App::new(controller, canvas_viewport(&canvas))));

        setup_input_handlers(&canvas, app.clone());
        setup_buttons(app.clone());
        setup_page_lifecycle(&canvas, app.clone());

        request_animation_frame(app);

        log::info!("Wishprise running!");
    }

    fn setup_input_handlers(canvas: &HtmlCanvasElement, app: Rc<RefCell<App>>) {
        let Some(window) = web_sys::window() else {
            return;
        };
        let scratch_card = window
            .document()
            .and_then(|d| d.get_element_by_id("scratch-card"));

        // Presses start on the 3D scene or on the scratch card overlay
        let mut targets: Vec<web_sys::EventTarget> = vec![canvas.clone().into()];
        targets.extend(scratch_card.map(web_sys::EventTarget::from));

        for target in &targets {
            {
                let app = app.clone();
                let closure = Closure::<dyn FnMut(_)>::new(move |event: MouseEvent| {
                    let pointer = Vec2::new(event.client_x() as f32, event.client_y() as f32);
                    app.borrow_mut().press_start(pointer);
                });
                let _ = target.add_event_listener_with_callback(
                    "mousedown",
                    closure.as_ref().unchecked_ref(),
                );
                closure.forget();
            }
            {
                let app = app.clone();
                let closure = Closure::<dyn FnMut(_)>::new(move |event: TouchEvent| {
                    event.prevent_default();
                    if let Some(touch) = event.touches().get(0) {
                        let pointer = Vec2::new(touch.client_x() as f32, touch.client_y() as f32);
                        app.borrow_mut().press_start(pointer);
                    }
                });
                let _ = target.add_event_listener_with_callback(
                    "touchstart",
                    closure.as_ref().unchecked_ref(),
                );
                closure.forget();
            }
        }

        // Moves are followed anywhere on the page while a press is active
        {
            let app = app.clone();
            let closure = Closure::<dyn FnMut(_)>::new(move |event: MouseEvent| {
                let pointer = Vec2::new(event.client_x() as f32, event.client_y() as f32);
                app.borrow_mut().press_move(pointer);
            });
            let _ = window
                .add_event_listener_with_callback("mousemove", closure.as_ref().unchecked_ref());
            closure.forget();
        }
        {
            let app = app.clone();
            let closure = Closure::<dyn FnMut(_)>::new(move |event: TouchEvent| {
                let mut a = app.borrow_mut();
                if !a.detector.is_dragging() && !a.detector.is_scratching() {
                    return;
                }
                event.prevent_default();
                if let Some(touch) = event.touches().get(0) {
                    let pointer = Vec2::new(touch.client_x() as f32, touch.client_y() as f32);
                    a.press_move(pointer);
                }
            });
            let _ = window
                .add_event_listener_with_callback("touchmove", closure.as_ref().unchecked_ref());
            closure.forget();
        }

        // Release ends any drag, wherever the pointer is
        for name in ["mouseup", "touchend", "touchcancel"] {
            let app = app.clone();
            let closure = Closure::<dyn FnMut(_)>::new(move |_event: web_sys::Event| {
                app.borrow_mut().press_end();
            });
            let _ = window.add_event_listener_with_callback(name, closure.as_ref().unchecked_ref());
            closure.forget();
        }
    }

    /// Wire a DOM button to an app action
    fn on_click(id: &str, app: Rc<RefCell<App>>, action: impl Fn(&mut App) + 'static) {
        let Some(document) = web_sys::window().and_then(|w| w.document()) else {
            return;
        };
        let Some(btn) = document.get_element_by_id(id) else {
            log::warn!("Missing button #{}", id);
            return;
        };
        let closure = Closure::<dyn FnMut(_)>::new(move |_event: MouseEvent| {
            let mut a = app.borrow_mut();
            a.unlock_audio();
            action(&mut *a);
        });
        let _ = btn.add_event_listener_with_callback("click", closure.as_ref().unchecked_ref());
        closure.forget();
    }

    fn setup_buttons(app: Rc<RefCell<App>>) {
        on_click("start-btn", app.clone(), |a| {
            a.controller.start_journey();
        });
        on_click("seen-btn", app.clone(), |a| {
            a.controller.confirm_intro_seen();
        });
        on_click("spin-btn", app.clone(), |a| {
            a.controller.spin_wheel();
        });
        on_click("accept-btn", app.clone(), |a| {
            a.controller.accept_spin_result();
        });
        on_click("mic-btn", app.clone(), |a| {
            let state = a.controller.request_microphone();
            log::info!("Microphone: {:?}", state);
        });
        on_click("blow-btn", app.clone(), |a| {
            a.controller.manual_blow();
        });
        on_click("mute-btn", app.clone(), |a| {
            let muted = !a.controller.settings().muted;
            a.controller.set_muted(muted);
            a.controller.settings().save();
        });
        on_click("finish-btn", app, |a| {
            a.controller.finish();
        });
    }

    fn setup_page_lifecycle(canvas: &HtmlCanvasElement, app: Rc<RefCell<App>>) {
        let window = web_sys::window().expect("no window");
        let document = window.document().expect("no document");

        // Tab hidden: the next frame starts a fresh delta
        {
            let app = app.clone();
            let document_clone = document.clone();
            let closure = Closure::<dyn FnMut(_)>::new(move |_event: web_sys::Event| {
                if document_clone.visibility_state() == web_sys::VisibilityState::Hidden {
                    app.borrow_mut().clock.reset();
                    log::info!("Page hidden, clock paused");
                }
            });
            let _ = document.add_event_listener_with_callback(
                "visibilitychange",
                closure.as_ref().unchecked_ref(),
            );
            closure.forget();
        }

        // Resize
        {
            let app = app.clone();
            let canvas = canvas.clone();
            let closure = Closure::<dyn FnMut(_)>::new(move |_event: web_sys::Event| {
                app.borrow_mut().detector.set_viewport(canvas_viewport(&canvas));
            });
            let _ = window
                .add_event_listener_with_callback("resize", closure.as_ref().unchecked_ref());
            closure.forget();
        }

        // Leaving the page releases microphone and music
        {
            let closure = Closure::<dyn FnMut(_)>::new(move |_event: web_sys::Event| {
                app.borrow_mut().controller.shutdown();
            });
            let _ = window
                .add_event_listener_with_callback("pagehide", closure.as_ref().unchecked_ref());
            closure.forget();
        }
    }

    fn request_animation_frame(app: Rc<RefCell<App>>) {
        let Some(window) = web_sys::window() else {
            return;
        };
        let closure = Closure::once(move |time: f64| {
            app_loop(app, time);
        });
        let _ = window.request_animation_frame(closure.as_ref().unchecked_ref());
        closure.forget();
    }

    fn app_loop(app: Rc<RefCell<App>>, time: f64) {
        {
            let mut a = app.borrow_mut();
            if a.controller.is_shut_down() {
                return;
            }
            a.update(time);
            a.update_hud();
        }

        request_animation_frame(app);
    }
}

#[cfg(target_arch = "wasm32")]
#[wasm_bindgen(start)]
pub async fn wasm_main() {
    wasm_game::run().await;
}

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    env_logger::init();
    log::info!("Wishprise (native) starting...");
    log::info!(
        "Native mode runs a scripted walkthrough - run with `trunk serve` for the web version"
    );

    walkthrough::run(std::env::args().skip(1));
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // WASM entry point is wasm_main, this is just to satisfy the compiler
}

/// Headless run through every stage with scripted input
#[cfg(not(target_arch = "wasm32"))]
mod walkthrough {
    use glam::{Vec2, Vec3};

    use wishprise::audio::{LoggingPlayback, ScriptedCapture};
    use wishprise::interaction::layout::{CAKE_CENTER, GIFT_CENTER, KNIFE_REST, balloon_center};
    use wishprise::interaction::{Camera, InteractionDetector, InteractionEvent, ScreenRect};
    use wishprise::interaction::{SceneLayout, Viewport};
    use wishprise::persistence::MemoryStore;
    use wishprise::platform::FrameClock;
    use wishprise::record::SurpriseRecord;
    use wishprise::sim::{Collaborators, ExperienceStage};
    use wishprise::consts::{DRAG_PLANE_HEIGHT, SCRATCH_CARD_HEIGHT, SCRATCH_CARD_WIDTH};
    use wishprise::{ExperienceController, ExperienceSettings};

    const FRAME: f64 = 16.0;
    /// Gives up on a stage after this much simulated time
    const STAGE_TIMEOUT_MS: f64 = 30_000.0;

    struct Runner {
        controller: ExperienceController,
        detector: InteractionDetector,
        layout: SceneLayout,
        clock: FrameClock,
        now: f64,
    }

    impl Runner {
        fn tick(&mut self) {
            self.now += FRAME;
            let dt = self.clock.tick(self.now);
            self.controller.tick(dt);
            for event in self.controller.drain_events() {
                log::info!("{:?}", event);
            }
        }

        fn run_until(&mut self, stage: ExperienceStage) -> bool {
            let deadline = self.now + STAGE_TIMEOUT_MS;
            while self.controller.stage() != stage && self.now < deadline {
                self.tick();
            }
            self.controller.stage() == stage
        }

        fn run_for(&mut self, ms: f64) {
            let end = self.now + ms;
            while self.now < end {
                self.tick();
            }
        }

        /// Screen position of a world point
        fn pointer_for(&self, world: Vec3) -> Vec2 {
            let clip = self.detector.camera().view_projection().project_point3(world);
            Vec2::new((clip.x + 1.0) * 0.5 * 1280.0, (1.0 - clip.y) * 0.5 * 720.0)
        }

        fn press(&mut self, world: Vec3) {
            *self.detector.objects_mut() = self.layout.targets(&self.controller);
            let pointer = self.pointer_for(world);
            if let Some(event) = self.detector.on_press_start(&self.layout.scene, pointer) {
                self.controller.handle_interaction(event);
            }
        }

        /// Drag across the scratch card in screen pixels
        fn scratch_stroke(&mut self, from: Vec2, to: Vec2, steps: usize) {
            *self.detector.objects_mut() = self.layout.targets(&self.controller);
            if let Some(event) = self.detector.on_press_start(&self.layout.scene, from) {
                self.controller.handle_interaction(event);
            }
            for i in 1..=steps {
                let pointer = from.lerp(to, i as f32 / steps as f32);
                if let Some(event) = self.detector.on_press_move(pointer) {
                    self.controller.handle_interaction(event);
                }
            }
            self.detector.on_press_end();
        }

        fn drag(&mut self, world: Vec3) {
            let pointer = self.pointer_for(world);
            if let Some(event) = self.detector.on_press_move(pointer) {
                if let InteractionEvent::KnifeMoved { position, .. } = event {
                    self.layout.move_knife(position);
                }
                self.controller.handle_interaction(event);
            }
        }
    }

    fn sample_record() -> SurpriseRecord {
        SurpriseRecord {
            id: "sample".to_string(),
            sender_name: "Sam".to_string(),
            receiver_name: "Alex".to_string(),
            intro_message: "Another trip around the sun!".to_string(),
            personal_note: "So glad we met.".to_string(),
            final_message: "Happy birthday!".to_string(),
            candle_count: 5,
            ..SurpriseRecord::demo()
        }
    }

    pub fn run(args: impl Iterator<Item = String>) {
        let mut id = "sample".to_string();
        let mut preview = false;
        for arg in args {
            if arg == "--preview" {
                preview = true;
            } else {
                id = arg;
            }
        }

        let store = match MemoryStore::with_record(&sample_record()) {
            Ok(store) => store,
            Err(e) => {
                log::error!("Failed to seed store: {}", e);
                return;
            }
        };
        let mut capture = ScriptedCapture::granted();
        for _ in 0..5 {
            capture.push_level(20);
        }
        capture.push_level(120);

        let settings = ExperienceSettings::default();
        let collaborators = Collaborators {
            store: Box::new(store),
            capture: Box::new(capture),
            playback: Box::new(LoggingPlayback::new()),
        };
        let controller = ExperienceController::load(&id, settings, preview, collaborators, 7);
        let viewport = Viewport::new(0.0, 0.0, 1280.0, 720.0);

        let mut r = Runner {
            controller,
            detector: InteractionDetector::new(Camera::cake_view(viewport.aspect()), viewport),
            layout: SceneLayout::new(),
            clock: FrameClock::new(),
            now: 0.0,
        };

        // Landing
        for id in 0..r.layout.balloons.len() {
            r.press(balloon_center(id));
            r.tick();
        }
        r.controller.start_journey();

        // Intro types itself, then waits for the viewer
        if !r.run_until(ExperienceStage::InteractiveCheck) {
            log::error!("Intro never finished");
            return;
        }
        r.controller.confirm_intro_seen();

        // Wheel
        r.controller.spin_wheel();
        let spin_ms = r.controller.settings().wheel_spin_ms;
        r.run_for(spin_ms + FRAME);
        r.controller.accept_spin_result();

        // Candles: quiet breaths, then a real blow
        r.controller.request_microphone();
        if !r.run_until(ExperienceStage::CakeCutting) {
            log::error!("Candles never went out");
            return;
        }

        // Drag the knife onto the cake
        r.press(KNIFE_REST);
        r.drag(Vec3::new(3.0, DRAG_PLANE_HEIGHT, 1.5));
        r.drag(Vec3::new(CAKE_CENTER.x + 0.5, DRAG_PLANE_HEIGHT, CAKE_CENTER.z));
        r.detector.on_press_end();

        let reveal_ms = r.controller.settings().gift_reveal_delay_ms;
        r.run_for(reveal_ms + FRAME);
        r.press(GIFT_CENTER);
        r.tick();

        // Scratch the foil off the personal note, row by row
        let card = ScreenRect::new(490.0, 270.0, SCRATCH_CARD_WIDTH, SCRATCH_CARD_HEIGHT);
        r.layout.scratch_rect = Some(card);
        let mut y = card.top + 10.0;
        while !r.controller.scratch_card().is_revealed() && y < card.top + card.height {
            let left = Vec2::new(card.left, y);
            r.scratch_stroke(left, left + Vec2::new(card.width, 0.0), 30);
            r.tick();
            y += 20.0;
        }

        r.run_for(1000.0);
        log::info!(
            "Reveal: {} / {} ({} particles live)",
            r.controller.record().personal_note,
            r.controller.record().final_message,
            r.controller.particles().len()
        );
        r.controller.finish();
        r.tick();

        log::info!(
            "Walkthrough finished in stage {} after {:.1}s (deleted: {})",
            r.controller.stage().as_str(),
            r.now / 1000.0,
            r.controller.deletion_requested()
        );
        r.controller.shutdown();
    }
}
