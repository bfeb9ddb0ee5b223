use std::time::Duration;

use bevy::prelude::*;

use super::DoorConfig;
use super::entities::{DoorDescriptor, DoorId, DoorPhase};
use crate::camera::{CameraOwner, CameraPose, CameraRig, CameraWriter};
use crate::math;
use crate::navigation::NavigationBus;
use crate::segments::CorridorLayout;
use crate::tween::{TweenId, TweenScheduler, TweenSpec, TweenState, TweenTarget};

/// Shared state a door reads and writes while stepping its sequence.
pub struct DoorCtx<'a> {
    /// Camera pose and authority.
    pub rig: &'a mut CameraRig,
    /// Timeline for camera flights and door geometry.
    pub tweens: &'a mut TweenScheduler,
    /// Room / exit / overlay signals.
    pub bus: &'a mut NavigationBus,
    /// Corridor geometry, for aligned and standing poses.
    pub layout: &'a CorridorLayout,
    /// Door timings and angles.
    pub cfg: &'a DoorConfig,
    /// Camera height above the floor.
    pub eye_height: f32,
}

/// Where a click came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ClickSource {
    /// The visitor clicked or tapped the door.
    Pointer,
    /// Synthesised by the teleport orchestrator, which holds the camera.
    Teleport,
}

/// One-shot readiness latch. Only the first [`fire`](Self::fire) after a reset wins.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ReadyLatch(bool);

impl ReadyLatch {
    /// Sets the latch. Returns `true` only for the call that set it.
    pub fn fire(&mut self) -> bool {
        !std::mem::replace(&mut self.0, true)
    }

    /// Whether the latch has fired.
    pub fn is_set(&self) -> bool {
        self.0
    }
}

#[derive(Clone, Copy, Debug)]
struct Flight {
    id: TweenId,
    from: CameraPose,
    to: CameraPose,
}

/// Interaction sequence of one corridor door.
///
/// Idle doors only ease their hover nudge and proximity tilt. A click takes
/// the camera override and walks the door through align, room loading, open,
/// fly-in, and the two-stage exit, after which the override is released. Every
/// tween the door starts is remembered by id, so anything cancelled or
/// superseded is ignored instead of completing late.
#[derive(Debug)]
pub struct DoorMachine {
    door: DoorDescriptor,
    phase: DoorPhase,
    is_animating: bool,
    is_open: bool,
    is_inside_room: bool,
    room_mounted: bool,
    publish_pending: bool,
    ready: ReadyLatch,
    fallback: Option<Timer>,
    flight: Option<Flight>,
    handle_tween: Option<TweenId>,
    panel_tween: Option<TweenId>,
    close_tween: Option<TweenId>,
    handle_open: f32,
    panel_open: f32,
    hover: f32,
    hover_target: f32,
    tilt: f32,
    tilt_locked: bool,
    corridor_snapshot: Option<CameraPose>,
    aligned_snapshot: Option<CameraPose>,
}

impl DoorMachine {
    /// A closed, idle door.
    pub fn new(door: DoorDescriptor) -> Self {
        Self {
            door,
            phase: DoorPhase::Idle,
            is_animating: false,
            is_open: false,
            is_inside_room: false,
            room_mounted: false,
            publish_pending: false,
            ready: ReadyLatch::default(),
            fallback: None,
            flight: None,
            handle_tween: None,
            panel_tween: None,
            close_tween: None,
            handle_open: 0.0,
            panel_open: 0.0,
            hover: 0.0,
            hover_target: 0.0,
            tilt: 0.0,
            tilt_locked: false,
            corridor_snapshot: None,
            aligned_snapshot: None,
        }
    }

    // ── queries ─────────────────────────────────────────────────────

    /// Static description of this door.
    pub fn descriptor(&self) -> &DoorDescriptor {
        &self.door
    }

    /// Door identity.
    pub fn id(&self) -> DoorId {
        self.door.id
    }

    /// Current phase.
    pub fn phase(&self) -> DoorPhase {
        self.phase
    }

    /// True from commit until the door has closed again.
    pub fn is_animating(&self) -> bool {
        self.is_animating
    }

    /// True once the leaf has finished swinging open.
    pub fn is_open(&self) -> bool {
        self.is_open
    }

    /// True while the visitor stands inside the room.
    pub fn is_inside_room(&self) -> bool {
        self.is_inside_room
    }

    /// Whether the room behind this door should be instantiated.
    pub fn room_mounted(&self) -> bool {
        self.room_mounted
    }

    /// Whether the room's readiness has been accepted for this visit.
    pub fn ready_latched(&self) -> bool {
        self.ready.is_set()
    }

    /// Handle rotation progress in `[0, 1]`.
    pub fn handle_open(&self) -> f32 {
        self.handle_open
    }

    /// Leaf opening in `[0, 1]`, including the hover nudge.
    pub fn panel_amount(&self, cfg: &DoorConfig) -> f32 {
        self.panel_open.max(self.hover * cfg.hover_open)
    }

    /// Smoothed hover preview amount in `[0, 1]`.
    pub fn hover(&self) -> f32 {
        self.hover
    }

    /// Proximity tilt strength in `[0, 1]`.
    pub fn tilt(&self) -> f32 {
        self.tilt
    }

    /// True while tilt is pinned at maximum.
    pub fn tilt_locked(&self) -> bool {
        self.tilt_locked
    }

    /// Wall yaw for the current tilt, turning the door toward an approaching camera.
    pub fn tilt_yaw(&self, cfg: &DoorConfig) -> f32 {
        let degrees = math::lerp(cfg.tilt_base, cfg.tilt_max, self.tilt);
        self.door.side.sign() * degrees.to_radians()
    }

    fn owner(&self) -> CameraOwner {
        CameraOwner::Door(self.door.id)
    }

    fn set_phase(&mut self, phase: DoorPhase) {
        info!(
            "door {} ({}): {:?} -> {:?}",
            self.door.id.0,
            self.door.label(),
            self.phase,
            phase
        );
        self.phase = phase;
    }

    // ── pointer ─────────────────────────────────────────────────────

    /// Pointer entered the door: nudge it open as an affordance.
    pub fn pointer_enter(&mut self) {
        if self.phase == DoorPhase::Idle && !self.is_animating {
            self.hover_target = 1.0;
        }
    }

    /// Pointer left the door.
    pub fn pointer_leave(&mut self) {
        self.hover_target = 0.0;
    }

    /// Starts the enter sequence. Ignored (returns `false`) while anything is
    /// already in flight or when the camera cannot be taken.
    ///
    /// A pointer click snapshots the live on-screen pose for the return trip.
    /// A teleport click takes the camera from the orchestrator and snapshots a
    /// safe standing pose in front of the door instead.
    pub fn click(&mut self, source: ClickSource, ctx: &mut DoorCtx) -> bool {
        if self.phase != DoorPhase::Idle || self.is_animating {
            debug!("door {} busy, click ignored", self.door.id.0);
            return false;
        }
        let snapshot = match source {
            ClickSource::Pointer => {
                let live = ctx.rig.live_pose();
                if !ctx.rig.request_override(self.owner(), ctx.tweens) {
                    return false;
                }
                // Pin the camera where it appeared, before the sway compensation kicks in.
                ctx.rig.write(CameraWriter::Owner(self.owner()), live);
                live
            }
            ClickSource::Teleport => {
                let taken = ctx
                    .rig
                    .transfer_override(CameraOwner::Teleport, self.owner(), ctx.tweens)
                    || ctx.rig.request_override(self.owner(), ctx.tweens);
                if !taken {
                    return false;
                }
                ctx.layout
                    .standing_pose(&self.door, ctx.eye_height, ctx.cfg.standoff)
            }
        };
        self.corridor_snapshot = Some(snapshot);
        self.is_animating = true;
        self.tilt_locked = true;
        self.hover_target = 0.0;
        self.set_phase(DoorPhase::Committed);
        true
    }

    /// Room content finished its first stable frame.
    ///
    /// Accepted once per visit while the room is loading; returns `false` for
    /// late or duplicate signals.
    pub fn room_ready(&mut self) -> bool {
        if self.phase != DoorPhase::RoomLoading {
            debug!("door {}: ready signal in {:?} ignored", self.door.id.0, self.phase);
            return false;
        }
        if !self.ready.fire() {
            return false;
        }
        self.fallback = None;
        self.set_phase(DoorPhase::RoomReady);
        true
    }

    // ── per-frame ───────────────────────────────────────────────────

    /// Advances the discrete sequence by one frame.
    pub fn tick(&mut self, dt: f32, ctx: &mut DoorCtx) {
        self.hover = math::smooth_toward(self.hover, self.hover_target, ctx.cfg.hover_rate, dt);

        match self.phase {
            DoorPhase::Idle | DoorPhase::RoomReady => {}
            DoorPhase::Committed => {
                let aligned = ctx.layout.aligned_pose(&self.door, ctx.eye_height);
                self.start_flight(aligned, ctx.cfg.align, ctx);
                self.set_phase(DoorPhase::Aligning);
            }
            DoorPhase::Aligning => {
                if self.fly(ctx) {
                    self.aligned_snapshot = Some(ctx.rig.pose());
                    self.room_mounted = true;
                    self.fallback = Some(Timer::from_seconds(
                        ctx.cfg.ready_fallback,
                        TimerMode::Once,
                    ));
                    self.set_phase(DoorPhase::RoomLoading);
                }
            }
            DoorPhase::RoomLoading => {
                let expired = self.fallback.as_mut().is_some_and(|timer| {
                    timer.tick(Duration::from_secs_f32(dt));
                    timer.just_finished()
                });
                if expired && self.ready.fire() {
                    debug!("door {}: room never signalled ready, opening anyway", self.door.id.0);
                    self.fallback = None;
                    self.set_phase(DoorPhase::RoomReady);
                }
            }
            DoorPhase::Opening => self.tick_opening(ctx),
            DoorPhase::FlyingIn => {
                if self.fly(ctx) {
                    self.is_inside_room = true;
                    self.publish_pending = true;
                    self.set_phase(DoorPhase::InsideRoom);
                }
            }
            DoorPhase::InsideRoom => self.tick_inside(ctx),
            DoorPhase::ExitingToDoor => {
                if self.fly(ctx) {
                    let back = self.corridor_snapshot.unwrap_or_else(|| {
                        ctx.layout
                            .standing_pose(&self.door, ctx.eye_height, ctx.cfg.standoff)
                    });
                    self.start_flight(back, ctx.cfg.exit_to_corridor, ctx);
                    self.set_phase(DoorPhase::ExitingToCorridor);
                }
            }
            DoorPhase::ExitingToCorridor => {
                if self.fly(ctx) {
                    ctx.rig.release_override(self.owner());
                    self.room_mounted = false;
                    self.close_tween = Some(
                        ctx.tweens
                            .animate(TweenTarget::Door(self.door.id), ctx.cfg.close),
                    );
                    self.set_phase(DoorPhase::Closing);
                }
            }
            DoorPhase::Closing => self.tick_closing(ctx),
        }

        // Ready (signalled or fallback) opens the door in the same frame.
        if self.phase == DoorPhase::RoomReady {
            self.start_opening(ctx);
        }
    }

    fn start_opening(&mut self, ctx: &mut DoorCtx) {
        let target = TweenTarget::Door(self.door.id);
        self.handle_tween = Some(ctx.tweens.animate(target, ctx.cfg.handle));
        self.panel_tween = Some(ctx.tweens.animate(target, ctx.cfg.panel));
        self.set_phase(DoorPhase::Opening);
    }

    fn tick_opening(&mut self, ctx: &mut DoorCtx) {
        if let Some(id) = self.handle_tween {
            self.handle_open = ctx.tweens.progress(id).unwrap_or(1.0);
        }
        let Some(panel) = self.panel_tween else {
            return;
        };
        match ctx.tweens.state(panel) {
            TweenState::Running(p) => self.panel_open = p,
            TweenState::Finished | TweenState::Gone => {
                self.handle_open = 1.0;
                self.panel_open = 1.0;
                self.handle_tween = None;
                self.panel_tween = None;
                self.is_open = true;
                let through = ctx.rig.pose().advanced(ctx.cfg.fly_in_distance);
                self.start_flight(through, ctx.cfg.fly_in, ctx);
                self.set_phase(DoorPhase::FlyingIn);
            }
        }
    }

    fn tick_inside(&mut self, ctx: &mut DoorCtx) {
        // Published a frame after arriving so the overlay does not hitch the landing.
        if std::mem::take(&mut self.publish_pending) {
            ctx.bus.set_current_room(Some(self.door.room));
            ctx.bus.open_overlay(self.door.room.overlay());
            return;
        }
        if ctx.bus.exit_requested() && ctx.bus.current_room() == Some(self.door.room) {
            ctx.bus.clear_exit();
            self.begin_exit(ctx);
        }
    }

    fn begin_exit(&mut self, ctx: &mut DoorCtx) {
        self.is_inside_room = false;
        ctx.bus.set_current_room(None);
        ctx.bus.close_overlay();
        let aligned = self
            .aligned_snapshot
            .unwrap_or_else(|| ctx.layout.aligned_pose(&self.door, ctx.eye_height))
            .levelled();
        self.start_flight(aligned, ctx.cfg.exit_to_door, ctx);
        self.set_phase(DoorPhase::ExitingToDoor);
    }

    fn tick_closing(&mut self, ctx: &mut DoorCtx) {
        let Some(id) = self.close_tween else {
            self.reset_local();
            return;
        };
        match ctx.tweens.state(id) {
            TweenState::Running(p) => {
                self.panel_open = 1.0 - p;
                self.handle_open = 1.0 - p;
            }
            TweenState::Finished | TweenState::Gone => self.reset_local(),
        }
    }

    fn start_flight(&mut self, to: CameraPose, spec: TweenSpec, ctx: &mut DoorCtx) {
        self.flight = Some(Flight {
            id: ctx.tweens.animate(TweenTarget::Camera, spec),
            from: ctx.rig.pose(),
            to,
        });
    }

    /// Writes this frame's flight pose. Returns `true` once the flight has landed.
    fn fly(&mut self, ctx: &mut DoorCtx) -> bool {
        let Some(flight) = self.flight else {
            return true;
        };
        let (pose, landed) = match ctx.tweens.state(flight.id) {
            TweenState::Running(p) => (flight.from.lerp(&flight.to, p), false),
            TweenState::Finished => (flight.to, true),
            TweenState::Gone => {
                warn!("door {}: camera flight vanished, snapping to its end", self.door.id.0);
                (flight.to, true)
            }
        };
        ctx.rig.write(CameraWriter::Owner(self.owner()), pose);
        if landed {
            self.flight = None;
        }
        landed
    }

    /// Eases the proximity tilt for a camera at depth `camera_z`.
    pub fn update_tilt(&mut self, camera_z: f32, dt: f32, cfg: &DoorConfig) {
        if self.tilt_locked {
            self.tilt = 1.0;
            return;
        }
        let target = cfg.tilt.strength(camera_z - self.door.position.z);
        self.tilt = math::smooth_toward(self.tilt, target, cfg.tilt_rate, dt);
    }

    // ── interruption ────────────────────────────────────────────────

    /// Instantly returns the door to idle while a teleport has the screen covered.
    ///
    /// Leaves camera authority alone; the teleport orchestrator decides when to
    /// hand it back.
    pub fn teleport_reset(&mut self, ctx: &mut DoorCtx) {
        if !self.phase.is_engaged() {
            return;
        }
        info!("door {}: silent reset for teleport", self.door.id.0);
        self.cancel_tweens(ctx.tweens);
        if self.is_inside_room && ctx.bus.current_room() == Some(self.door.room) {
            ctx.bus.set_current_room(None);
            ctx.bus.close_overlay();
        }
        self.reset_local();
        self.tilt = 0.0;
    }

    /// Door entity is going away: drop its tweens and timers, and give the
    /// camera back if this door still holds it.
    pub fn teardown(&mut self, ctx: &mut DoorCtx) {
        self.cancel_tweens(ctx.tweens);
        if ctx.rig.release_override(self.owner()) {
            warn!("door {} torn down while holding the camera", self.door.id.0);
        }
        if self.is_inside_room && ctx.bus.current_room() == Some(self.door.room) {
            ctx.bus.set_current_room(None);
            ctx.bus.close_overlay();
        }
        self.reset_local();
    }

    fn cancel_tweens(&mut self, tweens: &mut TweenScheduler) {
        tweens.cancel_on(TweenTarget::Door(self.door.id));
        if let Some(flight) = self.flight.take() {
            tweens.cancel(flight.id);
        }
    }

    fn reset_local(&mut self) {
        if self.phase != DoorPhase::Idle {
            self.set_phase(DoorPhase::Idle);
        }
        self.is_animating = false;
        self.is_open = false;
        self.is_inside_room = false;
        self.room_mounted = false;
        self.publish_pending = false;
        self.ready = ReadyLatch::default();
        self.fallback = None;
        self.flight = None;
        self.handle_tween = None;
        self.panel_tween = None;
        self.close_tween = None;
        self.handle_open = 0.0;
        self.panel_open = 0.0;
        self.hover_target = 0.0;
        self.tilt_locked = false;
        self.corridor_snapshot = None;
        self.aligned_snapshot = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::AppPhase;
    use crate::camera::{CameraConfig, CameraController, FrameInput};
    use crate::navigation::RoomKind;
    use crate::phase::InputChannels;
    use crate::segments::SegmentConfig;

    const DT: f32 = 1.0 / 60.0;

    struct Harness {
        door: DoorMachine,
        controller: CameraController,
        rig: CameraRig,
        tweens: TweenScheduler,
        bus: NavigationBus,
        layout: CorridorLayout,
        cfg: DoorConfig,
        cam: CameraConfig,
    }

    impl Harness {
        fn new(index: i64) -> Self {
            let layout = CorridorLayout::from_settings(&SegmentConfig::default());
            let cam = CameraConfig::default();
            let door = layout.door(index).unwrap();
            let mut controller = CameraController::new(cam.rest_z, &layout);
            let start = CameraPose::looking_down_corridor(Vec3::new(
                0.0,
                cam.eye_height,
                door.position.z + 6.0,
            ));
            controller.resync(&start, &layout, &cam);
            Self {
                door: DoorMachine::new(door),
                controller,
                rig: CameraRig::new(start, Default::default()),
                tweens: TweenScheduler::default(),
                bus: NavigationBus::default(),
                layout,
                cfg: DoorConfig::default(),
                cam,
            }
        }

        fn click(&mut self, source: ClickSource) -> bool {
            let mut ctx = DoorCtx {
                rig: &mut self.rig,
                tweens: &mut self.tweens,
                bus: &mut self.bus,
                layout: &self.layout,
                cfg: &self.cfg,
                eye_height: self.cam.eye_height,
            };
            self.door.click(source, &mut ctx)
        }

        /// Tweens and door only. `fast` completes every running tween.
        fn door_frame(&mut self, fast: bool) {
            self.rig.begin_frame();
            if fast {
                self.tweens.fast_forward();
            } else {
                self.tweens.advance(DT);
            }
            let mut ctx = DoorCtx {
                rig: &mut self.rig,
                tweens: &mut self.tweens,
                bus: &mut self.bus,
                layout: &self.layout,
                cfg: &self.cfg,
                eye_height: self.cam.eye_height,
            };
            self.door.tick(DT, &mut ctx);
            self.door
                .update_tilt(self.rig.pose().position.z, DT, &self.cfg);
        }

        /// One frame in system order: tweens, door, controller.
        fn step_with(&mut self, input: FrameInput) {
            self.door_frame(false);
            self.controller.update(
                &input,
                InputChannels::for_phase(AppPhase::Ready),
                DT,
                &mut self.rig,
                &self.layout,
                &self.cam,
            );
        }

        fn step(&mut self) {
            self.step_with(FrameInput::default());
        }

        fn run_until(&mut self, phase: DoorPhase) -> usize {
            for frame in 1..=5000 {
                self.step();
                if self.door.phase() == phase {
                    return frame;
                }
            }
            panic!("door never reached {phase:?}, stuck in {:?}", self.door.phase());
        }

        fn teleport_reset(&mut self) {
            let mut ctx = DoorCtx {
                rig: &mut self.rig,
                tweens: &mut self.tweens,
                bus: &mut self.bus,
                layout: &self.layout,
                cfg: &self.cfg,
                eye_height: self.cam.eye_height,
            };
            self.door.teleport_reset(&mut ctx);
        }

        fn teardown(&mut self) {
            let mut ctx = DoorCtx {
                rig: &mut self.rig,
                tweens: &mut self.tweens,
                bus: &mut self.bus,
                layout: &self.layout,
                cfg: &self.cfg,
                eye_height: self.cam.eye_height,
            };
            self.door.teardown(&mut ctx);
        }
    }

    fn owner(h: &Harness) -> CameraWriter {
        CameraWriter::Owner(CameraOwner::Door(h.door.id()))
    }

    // ── hover ───────────────────────────────────────────────────────

    #[test]
    fn hover_nudges_idle_door_and_reverses() {
        let mut h = Harness::new(1);
        h.door.pointer_enter();
        for _ in 0..60 {
            h.step();
        }
        assert!(h.door.hover() > 0.9);
        assert!(h.door.panel_amount(&h.cfg) > 0.0);
        assert_eq!(h.door.phase(), DoorPhase::Idle);
        h.door.pointer_leave();
        for _ in 0..120 {
            h.step();
        }
        assert!(h.door.hover() < 0.01);
    }

    #[test]
    fn hover_ignored_while_engaged() {
        let mut h = Harness::new(1);
        h.click(ClickSource::Pointer);
        h.door.pointer_enter();
        for _ in 0..30 {
            h.step();
        }
        assert_eq!(h.door.hover(), 0.0);
    }

    // ── commit ──────────────────────────────────────────────────────

    #[test]
    fn click_takes_camera_and_snapshots_live_pose() {
        let mut h = Harness::new(2);
        h.rig.set_ambient_yaw(0.01);
        let live = h.rig.live_pose();
        assert!(h.click(ClickSource::Pointer));
        assert_eq!(h.door.phase(), DoorPhase::Committed);
        assert!(h.rig.is_held_by(CameraOwner::Door(DoorId(2))));
        assert_eq!(h.rig.pose(), live);
        assert!(h.door.is_animating() && h.door.tilt_locked());
    }

    #[test]
    fn second_click_while_animating_is_ignored() {
        let mut h = Harness::new(2);
        assert!(h.click(ClickSource::Pointer));
        h.step();
        let phase = h.door.phase();
        assert!(!h.click(ClickSource::Pointer));
        assert_eq!(h.door.phase(), phase);
    }

    #[test]
    fn click_refused_while_another_owner_holds_camera() {
        let mut h = Harness::new(2);
        h.rig.request_override(CameraOwner::Door(DoorId(6)), &mut h.tweens);
        assert!(!h.click(ClickSource::Pointer));
        assert_eq!(h.door.phase(), DoorPhase::Idle);
        assert!(!h.door.is_animating());
    }

    #[test]
    fn alignment_faces_the_door_squarely() {
        let mut h = Harness::new(1);
        h.click(ClickSource::Pointer);
        h.run_until(DoorPhase::RoomLoading);
        let pose = h.rig.pose();
        assert!((pose.yaw - h.door.descriptor().side.facing_yaw()).abs() < 1e-5);
        assert!((pose.position.z - h.door.descriptor().position.z).abs() < 1e-4);
        assert!(h.door.room_mounted());
    }

    // ── authority ───────────────────────────────────────────────────

    #[test]
    fn only_the_door_writes_the_camera_during_its_sequence() {
        let mut h = Harness::new(2);
        let scroll = FrameInput {
            scroll: 0.05,
            pointer: Some(Vec2::new(0.8, 0.2)),
        };
        for _ in 0..30 {
            h.step_with(scroll);
            assert_eq!(h.rig.frame_writers(), &[CameraWriter::Controller]);
        }

        h.click(ClickSource::Pointer);
        let scroll_target = h.controller.scroll_target();
        let target = h.layout.aligned_pose(h.door.descriptor(), h.cam.eye_height);
        let mut frames = 0;
        while h.door.phase() != DoorPhase::RoomLoading {
            h.step_with(scroll);
            let writers = h.rig.frame_writers().to_vec();
            assert!(writers.iter().all(|w| *w == owner(&h)), "{writers:?}");
            frames += 1;
            assert!(frames < 1000);
        }
        assert_eq!(h.rig.pose(), target);
        assert_eq!(h.controller.scroll_target(), scroll_target);
    }

    // ── readiness ───────────────────────────────────────────────────

    #[test]
    fn silent_room_still_opens_after_fallback() {
        let mut h = Harness::new(3);
        assert_eq!(h.door.descriptor().room, RoomKind::Contact);
        h.click(ClickSource::Pointer);
        h.run_until(DoorPhase::RoomLoading);
        let frames = h.run_until(DoorPhase::Opening);
        let budget = (h.cfg.ready_fallback / DT).ceil() as usize + 2;
        assert!(frames <= budget, "{frames} > {budget}");
        assert!(h.door.ready_latched());
    }

    #[test]
    fn ready_signal_opens_before_fallback() {
        let mut h = Harness::new(0);
        h.click(ClickSource::Pointer);
        h.run_until(DoorPhase::RoomLoading);
        h.step();
        assert!(h.door.room_ready());
        assert_eq!(h.door.phase(), DoorPhase::RoomReady);
        h.step();
        assert_eq!(h.door.phase(), DoorPhase::Opening);
    }

    #[test]
    fn readiness_latch_fires_once() {
        let mut h = Harness::new(0);
        h.click(ClickSource::Pointer);
        h.run_until(DoorPhase::RoomLoading);
        assert!(h.door.room_ready());
        assert!(!h.door.room_ready());
        for _ in 0..60 {
            h.step();
        }
        assert!(!h.door.room_ready());
        assert_ne!(h.door.phase(), DoorPhase::RoomReady);
    }

    #[test]
    fn ready_signal_before_loading_is_ignored() {
        let mut h = Harness::new(0);
        assert!(!h.door.room_ready());
        h.click(ClickSource::Pointer);
        assert!(!h.door.room_ready());
        assert!(!h.door.ready_latched());
    }

    // ── inside ──────────────────────────────────────────────────────

    #[test]
    fn room_is_published_one_frame_after_arrival() {
        let mut h = Harness::new(1);
        h.click(ClickSource::Pointer);
        h.run_until(DoorPhase::InsideRoom);
        assert!(h.door.is_inside_room() && h.door.is_open());
        assert_eq!(h.bus.current_room(), None);
        h.step();
        assert_eq!(h.bus.current_room(), Some(RoomKind::Studio));
        assert_eq!(h.bus.overlay().map(|o| o.title.as_str()), Some("Studio"));
    }

    #[test]
    fn fly_in_moves_through_the_door() {
        let mut h = Harness::new(1);
        h.click(ClickSource::Pointer);
        h.run_until(DoorPhase::InsideRoom);
        let x = h.rig.pose().position.x;
        assert!(x > h.layout.half_width, "camera at x = {x}");
    }

    #[test]
    fn exit_request_triggers_exactly_one_exit() {
        let mut h = Harness::new(2);
        h.click(ClickSource::Pointer);
        h.run_until(DoorPhase::InsideRoom);
        h.step();
        assert!(h.bus.request_exit());

        let mut exits = 0;
        let mut last = h.door.phase();
        for _ in 0..5000 {
            // A slow UI keeps trying to raise the flag.
            h.bus.request_exit();
            h.step();
            if last == DoorPhase::InsideRoom && h.door.phase() == DoorPhase::ExitingToDoor {
                exits += 1;
            }
            last = h.door.phase();
            if last == DoorPhase::Idle {
                break;
            }
        }
        assert_eq!(exits, 1);
        assert!(!h.bus.exit_requested());
    }

    // ── round trip ──────────────────────────────────────────────────

    #[test]
    fn full_round_trip_restores_idle_state_and_releases_camera() {
        let mut h = Harness::new(1);
        let lean = FrameInput {
            scroll: 0.0,
            pointer: Some(Vec2::new(-0.6, 0.5)),
        };
        for _ in 0..60 {
            h.step_with(lean);
        }
        let before = h.rig.live_pose();
        assert!(before.pitch != 0.0);

        h.click(ClickSource::Pointer);
        h.run_until(DoorPhase::InsideRoom);
        h.step();
        h.bus.request_exit();

        let mut back = None;
        for _ in 0..100 {
            h.door_frame(true);
            if h.door.phase() == DoorPhase::Closing && back.is_none() {
                back = Some(h.rig.pose());
            }
            if h.door.phase() == DoorPhase::Idle {
                break;
            }
        }

        assert_eq!(h.door.phase(), DoorPhase::Idle);
        assert!(!h.door.is_animating());
        assert!(!h.door.is_open());
        assert!(!h.door.is_inside_room());
        assert!(!h.door.tilt_locked());
        assert!(!h.door.room_mounted());
        assert_eq!(h.door.handle_open(), 0.0);
        assert!(h.rig.is_automatic());
        assert_eq!(h.bus.current_room(), None);
        assert!(h.bus.overlay().is_none());

        let back = back.unwrap();
        assert!((back.position - before.position).length() < 1e-4);
        assert!((back.yaw - before.yaw).abs() < 1e-5);
        assert!((back.pitch - before.pitch).abs() < 1e-5);
        assert!((back.roll - before.roll).abs() < 1e-5);

        h.step();
        assert!((h.controller.scroll_current() - before.position.z).abs() < 1e-3);
    }

    #[test]
    fn camera_has_one_writer_on_the_frame_control_returns() {
        let mut h = Harness::new(2);
        h.click(ClickSource::Pointer);
        h.run_until(DoorPhase::InsideRoom);
        h.step();
        h.bus.request_exit();

        let mut released = false;
        for _ in 0..5000 {
            let before = h.door.phase();
            h.step();
            if before == DoorPhase::ExitingToCorridor && h.door.phase() == DoorPhase::Closing {
                assert!(h.rig.is_automatic());
                assert_eq!(h.rig.frame_writers(), &[owner(&h)]);
                released = true;
                break;
            }
            assert!(h.rig.frame_writers().len() <= 1, "{:?}", h.rig.frame_writers());
        }
        assert!(released);

        h.step();
        assert_eq!(h.rig.frame_writers(), &[CameraWriter::Controller]);
    }

    #[test]
    fn door_can_be_entered_again_after_round_trip() {
        let mut h = Harness::new(1);
        h.click(ClickSource::Pointer);
        h.run_until(DoorPhase::InsideRoom);
        h.step();
        h.bus.request_exit();
        h.run_until(DoorPhase::Idle);
        assert!(h.click(ClickSource::Pointer));
        h.run_until(DoorPhase::Opening);
        assert!(h.door.ready_latched());
    }

    // ── teleport ────────────────────────────────────────────────────

    #[test]
    fn teleport_click_uses_standing_snapshot_and_takes_camera_from_orchestrator() {
        let mut h = Harness::new(5);
        h.rig.request_override(CameraOwner::Teleport, &mut h.tweens);
        assert!(h.click(ClickSource::Teleport));
        assert!(h.rig.is_held_by(CameraOwner::Door(DoorId(5))));

        h.run_until(DoorPhase::InsideRoom);
        h.step();
        h.bus.request_exit();
        h.run_until(DoorPhase::Closing);
        let standing = h
            .layout
            .standing_pose(h.door.descriptor(), h.cam.eye_height, h.cfg.standoff);
        assert!((h.controller.scroll_current() - standing.position.z).abs() < 1e-3);
    }

    #[test]
    fn teleport_reset_is_silent_and_keeps_camera_held() {
        let mut h = Harness::new(2);
        h.click(ClickSource::Pointer);
        h.run_until(DoorPhase::InsideRoom);
        h.step();
        assert_eq!(h.bus.current_room(), Some(RoomKind::About));

        h.rig
            .transfer_override(CameraOwner::Door(DoorId(2)), CameraOwner::Teleport, &mut h.tweens);
        h.teleport_reset();
        assert_eq!(h.door.phase(), DoorPhase::Idle);
        assert!(!h.door.is_open() && !h.door.room_mounted() && !h.door.tilt_locked());
        assert_eq!(h.door.tilt(), 0.0);
        assert!(h.rig.is_held_by(CameraOwner::Teleport));
        assert_eq!(h.bus.current_room(), None);
        assert_eq!(h.tweens.running_on(TweenTarget::Door(DoorId(2))), 0);
    }

    #[test]
    fn teleport_reset_does_not_release_the_door_override() {
        let mut h = Harness::new(2);
        h.click(ClickSource::Pointer);
        h.run_until(DoorPhase::Opening);
        h.teleport_reset();
        assert!(h.rig.is_held_by(CameraOwner::Door(DoorId(2))));
        assert!(!h.rig.take_released());
    }

    // ── teardown ────────────────────────────────────────────────────

    #[test]
    fn teardown_mid_sequence_cancels_everything_and_releases_camera() {
        let mut h = Harness::new(0);
        h.click(ClickSource::Pointer);
        h.run_until(DoorPhase::Opening);
        h.teardown();
        assert!(h.rig.is_automatic());
        assert_eq!(h.tweens.running_on(TweenTarget::Door(DoorId(0))), 0);
        assert_eq!(h.tweens.running_on(TweenTarget::Camera), 0);
        for _ in 0..120 {
            h.step();
        }
        assert_eq!(h.door.phase(), DoorPhase::Idle);
        assert!(!h.door.ready_latched());
    }

    // ── tilt ────────────────────────────────────────────────────────

    #[test]
    fn tilt_grows_on_approach_and_locks_while_engaged() {
        let mut h = Harness::new(2);
        let z = h.door.descriptor().position.z;
        for _ in 0..240 {
            h.door.update_tilt(z + h.cfg.tilt.peak, DT, &h.cfg);
        }
        assert!(h.door.tilt() > 0.95);
        for _ in 0..240 {
            h.door.update_tilt(z + h.cfg.tilt.start + 5.0, DT, &h.cfg);
        }
        assert!(h.door.tilt() < 0.05);

        h.click(ClickSource::Pointer);
        h.door.update_tilt(z + 100.0, DT, &h.cfg);
        assert_eq!(h.door.tilt(), 1.0);
    }

    #[test]
    fn tilt_turns_wall_toward_the_camera() {
        let h = Harness::new(0);
        let mut left = DoorMachine::new(h.layout.door(0).unwrap());
        let mut right = DoorMachine::new(h.layout.door(1).unwrap());
        left.tilt = 1.0;
        right.tilt = 1.0;
        let towards_camera = |yaw: f32, normal: Vec3| (Quat::from_rotation_y(yaw) * normal).z;
        assert!(towards_camera(left.tilt_yaw(&h.cfg), Vec3::X) > 0.0);
        assert!(towards_camera(right.tilt_yaw(&h.cfg), Vec3::NEG_X) > 0.0);
    }
}
