//! Archery Range entry point
//!
//! Handles platform-specific initialization and runs the game loop.

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

#[cfg(target_arch = "wasm32")]
mod wasm_game {
    use std::cell::RefCell;
    use std::rc::Rc;
    use wasm_bindgen::prelude::*;
    use web_sys::{Document, HtmlSelectElement, KeyboardEvent, MouseEvent};

    use archery_range::consts::MAX_FRAME_DT;
    use archery_range::sim::rig::Rig;
    use archery_range::sim::{ButtonEdge, CameraMode, GameEvent, GameState, TickInput, tick};
    use archery_range::{Difficulty, Settings, Tuning};

    /// Game instance holding all state
    struct Game {
        state: GameState,
        settings: Settings,
        tuning: Tuning,
        last_time: f64,
        /// Input gathered between animation frames
        input: TickInput,
        pointer_locked: bool,
    }

    impl Game {
        fn new(tuning: Tuning, settings: Settings) -> Self {
            Self {
                state: GameState::new(tuning.clone(), &settings, Rig::neutral()),
                settings,
                tuning,
                last_time: 0.0,
                input: TickInput::default(),
                pointer_locked: false,
            }
        }

        /// Run one simulation tick with everything gathered since the last frame
        fn update(&mut self, dt: f32) -> Vec<GameEvent> {
            let input = self.input.clone();
            tick(&mut self.state, &input, dt.min(MAX_FRAME_DT));

            // Held keys persist, one-shot input does not
            self.input.pointer_delta = glam::Vec2::ZERO;
            self.input.draw.clear();
            self.input.aim.clear();
            self.input.pointer_lock = None;

            self.state.drain_events()
        }

        fn restart(&mut self) {
            self.state = GameState::new(self.tuning.clone(), &self.settings, Rig::neutral());
            self.input = TickInput {
                pointer_lock: Some(self.pointer_locked),
                ..Default::default()
            };
            log::info!("New session ({})", self.settings.difficulty.as_str());
        }
    }

    /// Seconds on the page clock, the timebase for button edges
    fn now_seconds() -> f64 {
        web_sys::window()
            .and_then(|w| w.performance())
            .map(|p| p.now() / 1000.0)
            .unwrap_or(0.0)
    }

    fn set_hidden(document: &Document, id: &str, hidden: bool) {
        if let Some(el) = document.get_element_by_id(id) {
            let _ = if hidden {
                el.set_attribute("hidden", "")
            } else {
                el.remove_attribute("hidden")
            };
        }
    }

    /// Apply the HUD side of each simulation event
    fn update_hud(state: &GameState, events: &[GameEvent]) {
        let Some(document) = web_sys::window().and_then(|w| w.document()) else {
            return;
        };

        for event in events {
            match event {
                GameEvent::Paused => set_hidden(&document, "pauseScreen", false),
                GameEvent::Resumed => set_hidden(&document, "pauseScreen", true),
                GameEvent::CameraChanged(camera) => {
                    set_hidden(&document, "crosshair", *camera != CameraMode::FirstPerson);
                }
                GameEvent::TargetHit { .. } | GameEvent::ArrowMissed { .. } => {
                    // Icons are numbered from 1; hide the one for the arrow just spent
                    let spent = state.session.arrows_left() + 1;
                    if let Some(el) = document.get_element_by_id(&format!("arrowImg{spent}")) {
                        let _ = el.set_attribute("style", "visibility: hidden");
                    }
                }
                GameEvent::GameOver { hits, .. } => {
                    if let Some(el) = document.get_element_by_id("gameOverDiv") {
                        el.set_text_content(Some(&format!(
                            "You hit the target {hits} times! Click to play again."
                        )));
                    }
                    set_hidden(&document, "arrowsDiv", true);
                    set_hidden(&document, "crosshair", true);
                    set_hidden(&document, "pauseScreen", true);
                    set_hidden(&document, "gameOverScreen", false);
                    if document.pointer_lock_element().is_some() {
                        document.exit_pointer_lock();
                    }
                }
                _ => {}
            }
        }
    }

    fn reset_hud(document: &Document, max_shots: u32) {
        for i in 1..=max_shots {
            if let Some(el) = document.get_element_by_id(&format!("arrowImg{i}")) {
                let _ = el.remove_attribute("style");
            }
        }
        set_hidden(document, "gameOverScreen", true);
        set_hidden(document, "arrowsDiv", false);
        set_hidden(document, "crosshair", true);
        set_hidden(document, "pauseScreen", false);
    }

    pub fn run() -> Result<(), JsValue> {
        console_error_panic_hook::set_once();
        let _ = console_log::init_with_level(log::Level::Info);

        log::info!("Archery Range starting...");

        let window = web_sys::window().ok_or("no window")?;
        let document = window.document().ok_or("no document")?;

        let settings = Settings::load();
        let tuning = Tuning::default();
        let max_shots = tuning.max_shots;
        let game = Rc::new(RefCell::new(Game::new(tuning, settings)));

        set_hidden(&document, "loadingScreen", true);
        reset_hud(&document, max_shots);

        setup_input_handlers(&document, game.clone())?;
        setup_difficulty_select(&document, game.clone())?;

        request_animation_frame(game);

        log::info!("Archery Range running!");
        Ok(())
    }

    fn move_key(input: &mut TickInput, key: &str, held: bool) -> bool {
        let intent = &mut input.intent;
        match key {
            "w" | "W" | "ArrowUp" => intent.forward = held,
            "s" | "S" | "ArrowDown" => intent.backward = held,
            "a" | "A" | "ArrowLeft" => intent.left = held,
            "d" | "D" | "ArrowRight" => intent.right = held,
            _ => return false,
        }
        true
    }

    fn setup_input_handlers(document: &Document, game: Rc<RefCell<Game>>) -> Result<(), JsValue> {
        let window = web_sys::window().ok_or("no window")?;

        // Pointer capture gates play: gaining it resumes, losing it pauses
        {
            let game = game.clone();
            let document_clone = document.clone();
            let closure = Closure::<dyn FnMut(_)>::new(move |_event: web_sys::Event| {
                let locked = document_clone.pointer_lock_element().is_some();
                let mut g = game.borrow_mut();
                g.pointer_locked = locked;
                g.input.pointer_lock = Some(locked);
                if !locked {
                    // Keys released while uncaptured never reach us
                    g.input.intent = Default::default();
                }
                log::debug!("Pointer lock {}", if locked { "acquired" } else { "released" });
            });
            document.add_event_listener_with_callback(
                "pointerlockchange",
                closure.as_ref().unchecked_ref(),
            )?;
            closure.forget();
        }

        {
            let closure = Closure::<dyn FnMut(_)>::new(move |_event: web_sys::Event| {
                log::error!("Pointer lock error");
            });
            document.add_event_listener_with_callback(
                "pointerlockerror",
                closure.as_ref().unchecked_ref(),
            )?;
            closure.forget();
        }

        // Relative motion only counts while captured
        {
            let game = game.clone();
            let closure = Closure::<dyn FnMut(_)>::new(move |event: MouseEvent| {
                let mut g = game.borrow_mut();
                if g.pointer_locked {
                    g.input.pointer_delta +=
                        glam::Vec2::new(event.movement_x() as f32, event.movement_y() as f32);
                }
            });
            document
                .add_event_listener_with_callback("mousemove", closure.as_ref().unchecked_ref())?;
            closure.forget();
        }

        // Primary button draws, secondary aims; an uncaptured click captures
        {
            let game = game.clone();
            let document_clone = document.clone();
            let closure = Closure::<dyn FnMut(_)>::new(move |event: MouseEvent| {
                let mut g = game.borrow_mut();
                if g.state.session.game_over {
                    g.restart();
                    if let Some(doc) = web_sys::window().and_then(|w| w.document()) {
                        reset_hud(&doc, g.tuning.max_shots);
                    }
                    return;
                }
                if !g.pointer_locked {
                    drop(g);
                    if let Some(body) = document_clone.body() {
                        body.request_pointer_lock();
                    }
                    return;
                }
                let at = now_seconds();
                match event.button() {
                    0 => g.input.draw.push(ButtonEdge::Pressed { at }),
                    2 => g.input.aim.push(ButtonEdge::Pressed { at }),
                    _ => {}
                }
            });
            document
                .add_event_listener_with_callback("mousedown", closure.as_ref().unchecked_ref())?;
            closure.forget();
        }

        {
            let game = game.clone();
            let closure = Closure::<dyn FnMut(_)>::new(move |event: MouseEvent| {
                let mut g = game.borrow_mut();
                let at = now_seconds();
                match event.button() {
                    0 => g.input.draw.push(ButtonEdge::Released { at }),
                    2 => g.input.aim.push(ButtonEdge::Released { at }),
                    _ => {}
                }
            });
            document
                .add_event_listener_with_callback("mouseup", closure.as_ref().unchecked_ref())?;
            closure.forget();
        }

        // Secondary button is ours, not the browser menu's
        {
            let closure = Closure::<dyn FnMut(_)>::new(move |event: web_sys::Event| {
                event.prevent_default();
            });
            document
                .add_event_listener_with_callback("contextmenu", closure.as_ref().unchecked_ref())?;
            closure.forget();
        }

        // Keyboard
        {
            let game = game.clone();
            let closure = Closure::<dyn FnMut(_)>::new(move |event: KeyboardEvent| {
                let mut g = game.borrow_mut();
                if move_key(&mut g.input, event.key().as_str(), true) {
                    event.prevent_default();
                }
            });
            window.add_event_listener_with_callback("keydown", closure.as_ref().unchecked_ref())?;
            closure.forget();
        }

        {
            let closure = Closure::<dyn FnMut(_)>::new(move |event: KeyboardEvent| {
                move_key(&mut game.borrow_mut().input, event.key().as_str(), false);
            });
            window.add_event_listener_with_callback("keyup", closure.as_ref().unchecked_ref())?;
            closure.forget();
        }

        Ok(())
    }

    /// Difficulty picker on the pause screen; takes effect on the next session
    fn setup_difficulty_select(document: &Document, game: Rc<RefCell<Game>>) -> Result<(), JsValue> {
        let Some(select) = document
            .get_element_by_id("difficultySelect")
            .and_then(|el| el.dyn_into::<HtmlSelectElement>().ok())
        else {
            return Ok(());
        };
        select.set_value(game.borrow().settings.difficulty.as_str());

        let select_clone = select.clone();
        let closure = Closure::<dyn FnMut(_)>::new(move |_event: web_sys::Event| {
            let Some(difficulty) = Difficulty::from_str(&select_clone.value()) else {
                log::warn!("Unknown difficulty {:?}", select_clone.value());
                return;
            };
            let mut g = game.borrow_mut();
            g.settings.difficulty = difficulty;
            g.settings.save();
            // Nothing shot yet: apply right away
            if g.state.session.shots_taken == 0 && !g.state.arrow.is_flying() {
                g.restart();
            }
        });
        select.add_event_listener_with_callback("change", closure.as_ref().unchecked_ref())?;
        closure.forget();
        Ok(())
    }

    fn request_animation_frame(game: Rc<RefCell<Game>>) {
        let Some(window) = web_sys::window() else {
            return;
        };
        let closure = Closure::once(move |time: f64| {
            game_loop(game, time);
        });
        let _ = window.request_animation_frame(closure.as_ref().unchecked_ref());
        closure.forget();
    }

    fn game_loop(game: Rc<RefCell<Game>>, time: f64) {
        {
            let mut g = game.borrow_mut();

            let dt = if g.last_time > 0.0 {
                ((time - g.last_time) / 1000.0) as f32
            } else {
                0.0
            };
            g.last_time = time;

            let events = g.update(dt);
            update_hud(&g.state, &events);
        }

        request_animation_frame(game);
    }
}

#[cfg(target_arch = "wasm32")]
#[wasm_bindgen(start)]
pub fn wasm_main() -> Result<(), JsValue> {
    wasm_game::run()
}

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    env_logger::init();
    log::info!("Archery Range (native) starting...");
    log::info!("Native mode runs a scripted headless session - run with `trunk serve` to play");

    let (tuning, rig) = match load_tuning().and_then(|tuning| load_rig().map(|rig| (tuning, rig))) {
        Ok(setup) => setup,
        Err(err) => {
            log::error!("{err}");
            std::process::exit(1);
        }
    };
    headless::run(tuning, archery_range::Settings::load(), rig);
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // WASM entry point is wasm_main, this is just to satisfy the compiler
}

/// Tuning from the JSON file named on the command line, defaults otherwise
#[cfg(not(target_arch = "wasm32"))]
fn load_tuning() -> Result<archery_range::Tuning, Box<dyn std::error::Error>> {
    match std::env::args().nth(1) {
        Some(path) => {
            let json = std::fs::read_to_string(&path)?;
            let tuning = archery_range::Tuning::from_json(&json)?;
            log::info!("Tuning loaded from {path}");
            Ok(tuning)
        }
        None => Ok(archery_range::Tuning::default()),
    }
}

/// Rig bound from the bone map JSON named second on the command line
/// (`{ "spine001": [x, y, z], ... }`), neutral otherwise
#[cfg(not(target_arch = "wasm32"))]
fn load_rig() -> Result<archery_range::sim::Rig, Box<dyn std::error::Error>> {
    use archery_range::sim::Rig;
    use std::collections::HashMap;

    match std::env::args().nth(2) {
        Some(path) => {
            let json = std::fs::read_to_string(&path)?;
            let bones: HashMap<String, glam::Vec3> = serde_json::from_str(&json)?;
            let rig = Rig::bind(&bones)?;
            log::info!("Skeleton bound from {path}");
            Ok(rig)
        }
        None => Ok(Rig::neutral()),
    }
}

#[cfg(not(target_arch = "wasm32"))]
mod headless {
    use archery_range::sim::{ButtonEdge, GameEvent, GameState, MoveIntent, Rig, TickInput, tick};
    use archery_range::{Settings, Tuning};
    use glam::Vec2;

    const DT: f32 = 1.0 / 60.0;

    struct Driver {
        state: GameState,
    }

    impl Driver {
        fn step(&mut self, input: TickInput) {
            tick(&mut self.state, &input, DT);
            for event in self.state.drain_events() {
                log::debug!("{:?}", event);
                if let GameEvent::ArrowReleased { id, charge, speed } = event {
                    log::info!("Arrow {id}: charge {charge:.2}s, speed {speed:.1}");
                }
            }
        }

        fn idle(&mut self, frames: usize) {
            for _ in 0..frames {
                self.step(TickInput::default());
            }
        }

        fn clock(&self) -> f64 {
            self.state.time
        }
    }

    /// Walk up, then loose every arrow with a longer draw each time
    pub fn run(tuning: Tuning, settings: Settings, rig: Rig) {
        let mut driver = Driver {
            state: GameState::new(tuning, &settings, rig),
        };
        driver.step(TickInput {
            pointer_lock: Some(true),
            ..Default::default()
        });

        for _ in 0..45 {
            driver.step(TickInput {
                intent: MoveIntent {
                    forward: true,
                    ..Default::default()
                },
                ..Default::default()
            });
        }
        driver.idle(60);

        let mut hold = 0.6;
        while !driver.state.session.game_over {
            driver.step(TickInput {
                aim: vec![ButtonEdge::Pressed { at: driver.clock() }],
                ..Default::default()
            });
            driver.step(TickInput {
                pointer_delta: Vec2::new(0.0, -40.0),
                draw: vec![ButtonEdge::Pressed { at: driver.clock() }],
                ..Default::default()
            });
            let frames = (hold / f64::from(DT)) as usize;
            driver.idle(frames);
            driver.step(TickInput {
                draw: vec![ButtonEdge::Released { at: driver.clock() }],
                aim: vec![ButtonEdge::Released { at: driver.clock() }],
                ..Default::default()
            });

            // Flight plus the re-arm delay
            let mut guard = 0;
            while !driver.state.arrow.is_nocked() && !driver.state.session.game_over && guard < 1200 {
                driver.idle(1);
                guard += 1;
            }
            hold += 0.5;
        }

        let session = &driver.state.session;
        log::info!(
            "Session finished: {} of {} arrows hit",
            session.hits,
            session.shots_taken
        );
    }
}
