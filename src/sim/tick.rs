//! Per-frame simulation tick
//!
//! Frame order: pointer capture changes, pointer motion, button edges,
//! collision probes, animation advance, locomotion, arrow flight. Probes run
//! first so locomotion consumes this frame's collision flags; the flags are
//! cleared when the tick ends.

use glam::Vec2;

use super::ballistics::{LandingSite, ShotOutcome};
use super::collision::Contact;
use super::locomotion::MoveIntent;
use super::rotation::ControlTargets;
use super::state::{Body, CameraMode, GameEvent, GameState};
use crate::consts::MAX_FRAME_DT;
use crate::world_to_local;

/// A button transition stamped with the host clock (seconds)
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ButtonEdge {
    Pressed { at: f64 },
    Released { at: f64 },
}

/// Input gathered by the host since the previous tick
#[derive(Debug, Clone, Default)]
pub struct TickInput {
    /// Held movement keys
    pub intent: MoveIntent,
    /// Pointer motion accumulated while captured (pixels)
    pub pointer_delta: Vec2,
    /// Primary button transitions, oldest first
    pub draw: Vec<ButtonEdge>,
    /// Secondary button transitions, oldest first
    pub aim: Vec<ButtonEdge>,
    /// Pointer capture gained (`true`) or lost (`false`)
    pub pointer_lock: Option<bool>,
}

/// Advance the session by one frame of `dt` seconds
pub fn tick(state: &mut GameState, input: &TickInput, dt: f32) {
    if state.session.game_over {
        return;
    }

    if let Some(locked) = input.pointer_lock {
        set_pointer_lock(state, locked);
    }
    if state.session.paused {
        return;
    }

    let dt = if dt.is_finite() {
        dt.clamp(0.0, MAX_FRAME_DT)
    } else {
        0.0
    };
    state.time += f64::from(dt);

    apply_pointer(state, input.pointer_delta);
    for &edge in &input.aim {
        handle_aim(state, edge);
    }
    for &edge in &input.draw {
        handle_draw(state, edge);
    }

    run_probes(state);

    advance_animations(state, dt);
    if state.session.game_over {
        return;
    }

    step_locomotion(state, &input.intent, dt);
    step_flight(state, dt);

    state.sync_nocked_arrow();
    state.avatar.blocked.clear();
}

/// Capture gained resumes the session, capture lost pauses it
fn set_pointer_lock(state: &mut GameState, locked: bool) {
    let Some(event) = state.controls.set_locked(locked) else {
        return;
    };
    state.push_event(GameEvent::Control(event));
    if locked {
        resume(state);
    } else {
        pause(state);
    }
}

pub fn pause(state: &mut GameState) {
    if state.session.game_over || state.session.paused {
        return;
    }
    state.session.paused = true;
    state.target.pause();
    state.avatar.gait.pause();
    state.bow.pause();
    state.arrow.pause();
    state.push_event(GameEvent::Paused);
    log::info!("Game paused");
}

pub fn resume(state: &mut GameState) {
    if state.session.game_over || !state.session.paused {
        return;
    }
    state.session.paused = false;
    state.target.resume();
    state.avatar.gait.resume();
    state.bow.resume();
    state.arrow.resume();
    state.push_event(GameEvent::Resumed);
    log::info!("Game resumed");
}

fn apply_pointer(state: &mut GameState, delta: Vec2) {
    let mut events = Vec::new();
    {
        let GameState {
            controls,
            orbit,
            avatar,
            rig,
            ..
        } = &mut *state;
        controls.apply_pointer(
            delta,
            ControlTargets {
                orbit,
                body_yaw: &mut avatar.yaw,
                pose: &mut rig.pose,
            },
            &mut events,
        );
    }
    for event in events {
        state.push_event(GameEvent::Control(event));
    }
}

/// Over-the-bow view; the body turns with the pointer
fn set_first_person_camera(state: &mut GameState) {
    if state.session.paused || state.arrow.is_flying() {
        return;
    }
    state.controls.orbit.enabled = false;
    state.controls.set_body_enabled(true);
    state.set_camera(CameraMode::FirstPerson);
}

/// Orbit view; the body faces downrange again unless mid-draw
fn set_third_person_camera(state: &mut GameState) {
    if state.session.paused || state.arrow.is_flying() {
        return;
    }
    if !state.session.nocking {
        state.avatar.yaw = 0.0;
    }
    state.controls.set_body_enabled(false);
    state.controls.orbit.enabled = true;
    state.set_camera(CameraMode::ThirdPerson);
}

fn handle_aim(state: &mut GameState, edge: ButtonEdge) {
    match edge {
        ButtonEdge::Pressed { .. } => {
            if !state.session.can_aim {
                return;
            }
            let walking = state.session.walking;
            if walking {
                let restore_upper = !state.session.nocking;
                state.avatar.gait.stop(&mut state.rig, restore_upper);
            }
            state.controls.enable_aim();
            state.session.aiming = true;
            state.session.can_aim = false;
            set_first_person_camera(state);
            if walking {
                state.avatar.gait.start(&mut state.rig, false);
            }
            state.push_event(GameEvent::AimStarted);
        }
        ButtonEdge::Released { .. } => {
            if !state.session.aiming {
                return;
            }
            state.session.aiming = false;
            state.session.can_aim = true;
            if !state.session.nocking {
                state.controls.disable_aim();
            }
            set_third_person_camera(state);
            if !state.session.nocking && state.session.walking {
                state.avatar.gait.start_upper(&mut state.rig);
            }
            state.push_event(GameEvent::AimEnded);
        }
    }
}

fn handle_draw(state: &mut GameState, edge: ButtonEdge) {
    match edge {
        ButtonEdge::Pressed { at } => {
            if !state.session.can_shoot || state.session.nocking {
                return;
            }
            state.session.nocking = true;
            state.session.walking = false;
            state.session.can_walk = false;
            let restore_upper = !state.session.aiming;
            state.avatar.gait.stop(&mut state.rig, restore_upper);

            if !state.session.aiming {
                // Face where the orbit camera looks; the pivot stays put in world space
                state.avatar.yaw += state.orbit.yaw;
                state.orbit.yaw = 0.0;
                state.controls.enable_aim();
                state.controls.set_body_enabled(true);
            }

            let tuning = state.tuning.clone();
            state.bow.begin_draw(at, &mut state.rig, &tuning);
            state.push_event(GameEvent::DrawStarted);
        }
        ButtonEdge::Released { at } => {
            if !state.session.nocking {
                return;
            }
            state.session.can_shoot = false;
            state.session.nocking = false;
            if !state.session.aiming {
                state.controls.disable_aim();
            }

            // Aim is read before the release hands the arms back to rest
            let origin = state.bow_origin();
            let direction = state.aim_direction();
            let tuning = state.tuning.clone();
            let Some(release) = state.bow.release(at, &mut state.rig, &tuning) else {
                return;
            };
            let speed = state.arrow.launch(origin, direction, release.charge, &tuning);
            state.set_camera(CameraMode::Arrow);

            let id = state.arrow.id;
            log::info!("Arrow {} shot", id);
            log::debug!(
                "charge {:.3}s, speed {:.2}, nocking {:.2}",
                release.charge,
                speed,
                release.nocking_amount
            );
            state.push_event(GameEvent::ArrowReleased {
                id,
                charge: release.charge,
                speed,
            });
        }
    }
}

fn run_probes(state: &mut GameState) {
    let mut avatar_contacts: Vec<Contact> = Vec::new();
    state
        .avatar_probe
        .run(&*state, |_, contact| avatar_contacts.push(contact));
    for contact in avatar_contacts {
        let (left, forward) = world_to_local(contact.normal, state.avatar.yaw);
        state
            .avatar
            .blocked
            .block_from_normal(Vec2::new(left, forward));
    }

    let mut arrow_hits: Vec<Body> = Vec::new();
    state.arrow_probe.run(&*state, |body, _| arrow_hits.push(body));
    for body in arrow_hits {
        // Only a flying arrow scores; later contacts with a stuck arrow are ignored
        if body != Body::Bullseye || !state.arrow.is_flying() {
            continue;
        }
        let offset = state.arrow.position - state.target.position;
        if state
            .arrow
            .land(LandingSite::Target { offset }, state.tuning.rearm_delay)
        {
            state.session.register_shot(true);
            let id = state.arrow.id;
            log::info!("Target hit by arrow {}", id);
            state.push_event(GameEvent::TargetHit { id });
        }
    }
}

fn advance_animations(state: &mut GameState, dt: f32) {
    state.target.advance(dt);
    state.avatar.gait.advance(dt, &mut state.rig);
    state.bow.advance(dt, &mut state.rig);

    if state.arrow.advance_rearm(dt) {
        rearm(state);
    }
}

/// Next arrow on the bow after the landing delay
fn rearm(state: &mut GameState) {
    state.nock_new_arrow();
    state.session.can_shoot = true;
    state.session.aiming = false;
    state.session.can_aim = true;
    state.session.can_walk = true;
    state.controls.disable_aim();
    set_third_person_camera(state);

    let id = state.arrow.id;
    state.push_event(GameEvent::ArrowRearmed { id });

    if state.session.out_of_arrows() {
        game_over(state);
    }
}

fn game_over(state: &mut GameState) {
    state.session.game_over = true;
    state.session.walking = false;

    if let Some(event) = state.controls.set_locked(false) {
        state.push_event(GameEvent::Control(event));
    }
    state.controls.disable_aim();
    state.avatar.gait.stop(&mut state.rig, true);
    state.target.stop();
    state.bow.stop();

    let (hits, shots) = (state.session.hits, state.session.shots_taken);
    log::info!("Game over: {} of {} arrows hit the target", hits, shots);
    state.push_event(GameEvent::GameOver { hits, shots });
}

fn step_locomotion(state: &mut GameState, intent: &MoveIntent, dt: f32) {
    if !state.session.can_walk || state.session.nocking {
        return;
    }

    let tuning = &state.tuning;
    let speed = if state.session.aiming {
        tuning.move_speed / tuning.aim_speed_divisor
    } else {
        tuning.move_speed
    };
    let walking = state.avatar.step(
        dt,
        intent,
        speed,
        tuning.floor_friction,
        tuning.movement_threshold,
        &tuning.map_bounds,
    );

    if walking {
        state.session.walking = true;
        if !state.avatar.gait.is_running() {
            let with_upper = !state.session.aiming;
            state.avatar.gait.start(&mut state.rig, with_upper);
        }
    } else if state.session.walking {
        state.session.walking = false;
        let restore_upper = !state.session.aiming && !state.session.nocking;
        state.avatar.gait.stop(&mut state.rig, restore_upper);
    }
}

fn step_flight(state: &mut GameState, dt: f32) {
    let Some(ShotOutcome::Miss) = state.arrow.integrate(dt, &state.tuning) else {
        return;
    };
    if state
        .arrow
        .land(LandingSite::Ground, state.tuning.rearm_delay)
    {
        state.session.register_shot(false);
        let id = state.arrow.id;
        log::info!("Arrow {} landed", id);
        state.push_event(GameEvent::ArrowMissed { id });
    }
}
