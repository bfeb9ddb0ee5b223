use bevy::prelude::*;

use super::PhaseConfig;
use crate::AppPhase;
use crate::camera::{CameraOwner, CameraPose, CameraRig, CameraWriter};
use crate::math;
use crate::navigation::NavigationBus;
use crate::phase::InputChannels;
use crate::tween::{TweenId, TweenScheduler, TweenSpec, TweenState, TweenTarget};

/// One-shot notifications emitted by [`PhaseMachine::tick`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PhaseSignal {
    /// Auto-advance reached the waiting depth in front of the entrance.
    ReachedDoors,
    /// Walk-through finished; the corridor is interactive.
    Ready,
}

/// Loading → doors-waiting → entering → ready.
///
/// Holds the camera override from start-up until `ready`, then releases it to
/// the controller. Transitions only move forward.
#[derive(Resource, Debug)]
pub struct PhaseMachine {
    phase: AppPhase,
    elapsed: f32,
    reached_doors_fired: bool,
    walk: Option<TweenId>,
    walk_from: CameraPose,
    entrance: Option<TweenId>,
    entrance_open: f32,
    start: CameraPose,
    waiting: CameraPose,
    rest: CameraPose,
    auto_advance_duration: f32,
    walk_spec: TweenSpec,
    entrance_spec: TweenSpec,
}

impl PhaseMachine {
    /// Machine in `loading`, camera at the start depth.
    pub fn new(cfg: &PhaseConfig, eye_height: f32, rest_z: f32) -> Self {
        let at = |z: f32| CameraPose::looking_down_corridor(Vec3::new(0.0, eye_height, z));
        Self {
            phase: AppPhase::Loading,
            elapsed: 0.0,
            reached_doors_fired: false,
            walk: None,
            walk_from: at(cfg.waiting_z),
            entrance: None,
            entrance_open: 0.0,
            start: at(cfg.start_z),
            waiting: at(cfg.waiting_z),
            rest: at(rest_z),
            auto_advance_duration: cfg.auto_advance_duration.max(f32::EPSILON),
            walk_spec: cfg.walk,
            entrance_spec: cfg.entrance_open,
        }
    }

    /// Current phase.
    pub fn phase(&self) -> AppPhase {
        self.phase
    }

    /// Cosmetic load estimate in `[0, 1]` for the preloader display.
    pub fn load_progress(&self) -> f32 {
        match self.phase {
            AppPhase::Loading => (self.elapsed / self.auto_advance_duration).min(1.0),
            _ => 1.0,
        }
    }

    /// How far the entrance leaves have swung open, `[0, 1]`.
    pub fn entrance_open(&self) -> f32 {
        self.entrance_open
    }

    /// Pose the camera rests at once inside the corridor.
    pub fn rest_pose(&self) -> CameraPose {
        self.rest
    }

    /// Takes the camera override and places it at the loading start pose.
    pub fn start(&mut self, rig: &mut CameraRig, tweens: &mut TweenScheduler) {
        rig.request_override(CameraOwner::Phase, tweens);
        rig.write(CameraWriter::Owner(CameraOwner::Phase), self.start);
    }

    /// Jumps straight to `ready` for a visitor who already entered this session.
    pub fn skip_to_ready(
        &mut self,
        rig: &mut CameraRig,
        tweens: &mut TweenScheduler,
        bus: &mut NavigationBus,
    ) -> bool {
        if self.phase == AppPhase::Ready {
            return false;
        }
        self.teardown(tweens);
        rig.request_override(CameraOwner::Phase, tweens);
        rig.write(CameraWriter::Owner(CameraOwner::Phase), self.rest);
        self.finish(rig, bus);
        true
    }

    /// Entrance door clicked. Accepted only while waiting at the doors.
    pub fn click_entrance(&mut self, rig: &CameraRig, tweens: &mut TweenScheduler) -> bool {
        if self.phase != AppPhase::DoorsWaiting {
            debug!("entrance click ignored in {:?}", self.phase);
            return false;
        }
        self.walk_from = rig.pose();
        self.walk = Some(tweens.animate(TweenTarget::Camera, self.walk_spec));
        self.entrance = Some(tweens.animate(TweenTarget::Entrance, self.entrance_spec));
        self.phase = AppPhase::Entering;
        info!("phase: entering");
        true
    }

    /// Advances the phase by one frame.
    ///
    /// Loading only moves the camera while `channels` allow auto-advance.
    pub fn tick(
        &mut self,
        dt: f32,
        channels: InputChannels,
        rig: &mut CameraRig,
        tweens: &mut TweenScheduler,
        bus: &mut NavigationBus,
    ) -> Option<PhaseSignal> {
        let writer = CameraWriter::Owner(CameraOwner::Phase);
        match self.phase {
            AppPhase::Loading => {
                if channels.auto_advance {
                    self.elapsed += dt;
                }
                let t = (self.elapsed / self.auto_advance_duration).min(1.0);
                rig.write(writer, self.start.lerp(&self.waiting, math::ease_out_cubic(t)));
                if t >= 1.0 {
                    self.phase = AppPhase::DoorsWaiting;
                    info!("phase: doors-waiting");
                    if !self.reached_doors_fired {
                        self.reached_doors_fired = true;
                        return Some(PhaseSignal::ReachedDoors);
                    }
                }
                None
            }
            AppPhase::DoorsWaiting => {
                rig.write(writer, self.waiting);
                None
            }
            AppPhase::Entering => self.tick_entering(rig, tweens, bus),
            AppPhase::Ready => None,
        }
    }

    fn tick_entering(
        &mut self,
        rig: &mut CameraRig,
        tweens: &mut TweenScheduler,
        bus: &mut NavigationBus,
    ) -> Option<PhaseSignal> {
        if let Some(id) = self.entrance
            && let Some(p) = tweens.progress(id)
        {
            self.entrance_open = p;
        }
        let writer = CameraWriter::Owner(CameraOwner::Phase);
        let walk = self.walk?;
        match tweens.state(walk) {
            TweenState::Running(p) => {
                rig.write(writer, self.walk_from.lerp(&self.rest, p));
                None
            }
            TweenState::Finished => {
                rig.write(writer, self.rest);
                self.finish(rig, bus);
                Some(PhaseSignal::Ready)
            }
            TweenState::Gone => {
                warn!("walk-through tween vanished, restarting from current pose");
                self.walk_from = rig.pose();
                self.walk = Some(tweens.animate(TweenTarget::Camera, self.walk_spec));
                None
            }
        }
    }

    fn finish(&mut self, rig: &mut CameraRig, bus: &mut NavigationBus) {
        self.walk = None;
        self.entrance = None;
        self.entrance_open = 1.0;
        self.phase = AppPhase::Ready;
        rig.release_override(CameraOwner::Phase);
        bus.mark_entered();
        info!("phase: ready");
    }

    /// Drops pending tweens so no late completion can advance the phase.
    pub fn teardown(&mut self, tweens: &mut TweenScheduler) {
        if let Some(id) = self.walk.take() {
            tweens.cancel(id);
        }
        if let Some(id) = self.entrance.take() {
            tweens.cancel(id);
        }
    }
}
