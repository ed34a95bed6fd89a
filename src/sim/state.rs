//! Game state and session flags
//!
//! `GameState` is the whole world for one session: there are no globals, so
//! tests can run any number of sessions side by side.

use glam::Vec3;
use serde::{Deserialize, Serialize};

use super::aim::Bow;
use super::ballistics::{self, Arrow, Attachment, LandingSite};
use super::collision::{Aabb, Collider, CollisionWorld, Plane, Probe};
use super::locomotion::Avatar;
use super::rig::{Rig, UpperOwner};
use super::rotation::{ControlEvent, Controls, Orientation};
use super::target::Target;
use crate::consts::{AVATAR_START, BOW_OFFSET, TARGET_START};
use crate::local_to_world;
use crate::settings::Settings;
use crate::tuning::Tuning;

/// Active view, read by the renderer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CameraMode {
    /// Orbit pivot behind the archer
    #[default]
    ThirdPerson,
    /// Over the bow, crosshair shown
    FirstPerson,
    /// Riding the arrow in flight
    Arrow,
}

/// Flags and counters that gate input and updates
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub paused: bool,
    pub game_over: bool,
    pub can_walk: bool,
    pub walking: bool,
    pub can_aim: bool,
    pub aiming: bool,
    pub can_shoot: bool,
    pub nocking: bool,
    /// Completed flights, hit or miss; never decreases
    pub shots_taken: u32,
    pub hits: u32,
    pub max_shots: u32,
}

impl Session {
    /// Sessions start paused until the pointer is captured
    pub fn new(max_shots: u32) -> Self {
        Self {
            paused: true,
            game_over: false,
            can_walk: true,
            walking: false,
            can_aim: true,
            aiming: false,
            can_shoot: true,
            nocking: false,
            shots_taken: 0,
            hits: 0,
            max_shots,
        }
    }

    pub fn arrows_left(&self) -> u32 {
        self.max_shots.saturating_sub(self.shots_taken)
    }

    /// Count one finished flight
    pub fn register_shot(&mut self, hit: bool) {
        self.shots_taken = self.shots_taken.saturating_add(1);
        if hit {
            self.hits += 1;
        }
    }

    pub fn out_of_arrows(&self) -> bool {
        self.shots_taken >= self.max_shots
    }
}

/// Notifications for the HUD, drained by the host after each tick
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum GameEvent {
    Control(ControlEvent),
    Paused,
    Resumed,
    CameraChanged(CameraMode),
    AimStarted,
    AimEnded,
    DrawStarted,
    ArrowReleased { id: u32, charge: f32, speed: f32 },
    TargetHit { id: u32 },
    ArrowMissed { id: u32 },
    ArrowRearmed { id: u32 },
    GameOver { hits: u32, shots: u32 },
}

/// Map boundary walls
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Wall {
    Forward,
    Backward,
    Left,
    Right,
}

/// Everything the collision probes can refer to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Body {
    Avatar,
    Arrow,
    TargetBody,
    Bullseye,
    Wall(Wall),
}

/// Complete state of one session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameState {
    pub tuning: Tuning,
    /// Simulation clock (seconds, paused time excluded)
    pub time: f64,
    pub session: Session,
    pub camera: CameraMode,
    /// Third-person camera pivot
    pub orbit: Orientation,
    pub controls: Controls,
    pub rig: Rig,
    pub avatar: Avatar,
    pub bow: Bow,
    pub arrow: Arrow,
    pub target: Target,
    pub avatar_probe: Probe<Body>,
    pub arrow_probe: Probe<Body>,
    events: Vec<GameEvent>,
    next_id: u32,
}

impl GameState {
    /// New session around a bound character rig
    pub fn new(tuning: Tuning, settings: &Settings, rig: Rig) -> Self {
        let controls = Controls::archer(settings.effective_sensitivity(), settings.invert_look);
        let avatar = Avatar::new(AVATAR_START, tuning.gait_phases);
        let target = Target::new(
            TARGET_START,
            settings.difficulty,
            tuning.terrain_width,
            tuning.target_cycle,
        );
        let session = Session::new(tuning.max_shots);

        let mut state = Self {
            tuning,
            time: 0.0,
            session,
            camera: CameraMode::ThirdPerson,
            orbit: Orientation::default(),
            controls,
            rig,
            avatar,
            bow: Bow::new(),
            arrow: Arrow::nocked(0, Vec3::ZERO, Vec3::Z),
            target,
            avatar_probe: Probe::new(
                Body::Avatar,
                vec![
                    Body::TargetBody,
                    Body::Wall(Wall::Forward),
                    Body::Wall(Wall::Backward),
                    Body::Wall(Wall::Left),
                    Body::Wall(Wall::Right),
                ],
            ),
            arrow_probe: Probe::new(Body::Arrow, vec![Body::Bullseye]),
            events: Vec::new(),
            next_id: 1,
        };
        state.nock_new_arrow();
        state
    }

    /// Session with a neutral rig (tests, headless runs)
    pub fn headless(tuning: Tuning, settings: &Settings) -> Self {
        Self::new(tuning, settings, Rig::neutral())
    }

    pub fn next_entity_id(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// Put a fresh arrow on the bow
    pub fn nock_new_arrow(&mut self) {
        let id = self.next_entity_id();
        self.arrow = Arrow::nocked(id, self.bow_origin(), self.aim_direction());
        self.sync_nocked_arrow();
    }

    /// World position of the nocking point
    pub fn bow_origin(&self) -> Vec3 {
        self.avatar.position + local_to_world(BOW_OFFSET, self.avatar.yaw)
    }

    /// Where the bow points: body yaw plus the left arm's elevation. A
    /// swinging walk arm does not aim, so the bow stays level.
    pub fn aim_direction(&self) -> Vec3 {
        let elevation = if self.rig.upper_owner() == UpperOwner::Gait {
            0.0
        } else {
            self.controls.aim_elevation(&self.rig.pose)
        };
        ballistics::aim_direction(self.avatar.yaw, elevation)
    }

    /// Keep a nocked arrow on the string and a stuck arrow in the target
    pub fn sync_nocked_arrow(&mut self) {
        match self.arrow.attachment {
            Attachment::Nocked => {
                let direction = self.aim_direction();
                self.arrow.direction = direction;
                self.arrow.position = self.bow_origin() - direction * self.bow.string_offset();
                self.arrow.pitch = -0.5 * std::f32::consts::PI * direction.y;
            }
            Attachment::Landed {
                site: LandingSite::Target { offset },
                ..
            } => {
                self.arrow.position = self.target.position + offset;
            }
            _ => {}
        }
    }

    pub fn push_event(&mut self, event: GameEvent) {
        self.events.push(event);
    }

    /// Take every event emitted since the last drain
    pub fn drain_events(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn set_camera(&mut self, camera: CameraMode) {
        if self.camera != camera {
            self.camera = camera;
            self.push_event(GameEvent::CameraChanged(camera));
        }
    }

    fn wall(&self, wall: Wall) -> Plane {
        let b = &self.tuning.map_bounds;
        match wall {
            Wall::Forward => Plane::through(Vec3::new(0.0, 0.0, b.forward), Vec3::NEG_Z),
            Wall::Backward => Plane::through(Vec3::new(0.0, 0.0, b.backward), Vec3::Z),
            Wall::Left => Plane::through(Vec3::new(b.left, 0.0, 0.0), Vec3::NEG_X),
            Wall::Right => Plane::through(Vec3::new(b.right, 0.0, 0.0), Vec3::X),
        }
    }
}

impl CollisionWorld for GameState {
    type Key = Body;

    fn mover_box(&self, key: Body) -> Option<Aabb> {
        match key {
            Body::Avatar => Some(Aabb::from_center_half_extents(
                self.avatar.center(),
                self.avatar.half_extents,
            )),
            Body::Arrow => Some(self.arrow.aabb()),
            _ => None,
        }
    }

    fn collider(&self, key: Body) -> Option<Collider> {
        match key {
            Body::TargetBody => Some(Collider::Box(self.target.body_aabb())),
            Body::Bullseye => Some(Collider::Box(self.target.bullseye_aabb())),
            Body::Wall(wall) => Some(Collider::Plane(self.wall(wall))),
            Body::Avatar | Body::Arrow => None,
        }
    }
}
