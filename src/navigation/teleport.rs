use bevy::prelude::*;

use super::NavigationConfig;
use super::entities::{RoomKind, TeleportPhase};
use crate::camera::{CameraOwner, CameraWriter};
use crate::door::{ClickSource, DoorCtx, DoorDescriptor, DoorMachine};

#[derive(Clone, Copy, Debug)]
struct Jump {
    room: RoomKind,
    phase: TeleportPhase,
    elapsed: f32,
    target: Option<DoorDescriptor>,
    waited: u32,
}

/// Drives a teleport through cover, swap and reveal.
///
/// While the screen is covered it takes the camera (from the controller or
/// from whichever door holds it), silently resets every engaged door, places
/// the camera in front of the destination door and, once that door exists,
/// clicks it on the visitor's behalf. Requests made before the corridor is
/// ready are held and replayed when it is.
#[derive(Resource, Debug, Default)]
pub struct Teleporter {
    held: Option<RoomKind>,
    jump: Option<Jump>,
}

impl Teleporter {
    /// Queues or starts a teleport into `room`. Returns `true` if it started.
    ///
    /// Ignored while a teleport runs or when the visitor is already in `room`.
    pub fn request(&mut self, room: RoomKind, ready: bool, ctx: &mut DoorCtx) -> bool {
        if !ready {
            debug!("teleport to {room:?} held until ready");
            self.held = Some(room);
            return false;
        }
        if self.jump.is_some() {
            debug!("teleport to {room:?} ignored, another teleport is running");
            return false;
        }
        if ctx.bus.current_room() == Some(room) {
            debug!("already inside {room:?}, teleport ignored");
            return false;
        }
        info!("teleport to {room:?}");
        self.jump = Some(Jump {
            room,
            phase: TeleportPhase::Covering,
            elapsed: 0.0,
            target: None,
            waited: 0,
        });
        ctx.bus.set_teleport_phase(Some(TeleportPhase::Covering));
        true
    }

    /// Room of the running teleport, if any.
    pub fn destination(&self) -> Option<RoomKind> {
        self.jump.map(|jump| jump.room)
    }

    /// Request waiting for the corridor to become ready.
    pub fn held(&self) -> Option<RoomKind> {
        self.held
    }

    /// Nothing running and nothing held.
    pub fn is_idle(&self) -> bool {
        self.held.is_none() && self.jump.is_none()
    }

    /// Opacity of the screen cover in `[0, 1]`.
    pub fn cover(&self, cfg: &NavigationConfig) -> f32 {
        let Some(jump) = self.jump else {
            return 0.0;
        };
        match jump.phase {
            TeleportPhase::Covering => ratio(jump.elapsed, cfg.fade_in),
            TeleportPhase::Swapping => 1.0,
            TeleportPhase::Revealing => 1.0 - ratio(jump.elapsed, cfg.fade_out),
        }
    }

    /// Advances the running teleport by one frame.
    pub fn tick(
        &mut self,
        dt: f32,
        ready: bool,
        doors: &mut [&mut DoorMachine],
        ctx: &mut DoorCtx,
        cfg: &NavigationConfig,
    ) {
        if self.jump.is_none()
            && ready
            && let Some(room) = self.held.take()
        {
            self.request(room, ready, ctx);
        }
        let Some(mut jump) = self.jump else {
            return;
        };
        jump.elapsed += dt;
        match jump.phase {
            TeleportPhase::Covering => {
                if jump.elapsed >= cfg.fade_in {
                    jump.elapsed = 0.0;
                    jump.phase = TeleportPhase::Swapping;
                    jump.target = swap(jump.room, doors, ctx);
                    if jump.target.is_none() {
                        jump.phase = TeleportPhase::Revealing;
                    }
                }
            }
            TeleportPhase::Swapping => {
                if enter_target(&mut jump, doors, ctx, cfg) {
                    jump.elapsed = 0.0;
                    jump.phase = TeleportPhase::Revealing;
                }
            }
            TeleportPhase::Revealing => {
                if jump.elapsed >= cfg.fade_out {
                    debug!("teleport to {:?} finished", jump.room);
                    ctx.bus.set_teleport_phase(None);
                    self.jump = None;
                    return;
                }
            }
        }
        ctx.bus.set_teleport_phase(Some(jump.phase));
        self.jump = Some(jump);
    }
}

/// Takes the camera, resets engaged doors and parks the camera in front of
/// the destination door. Returns the door to click, or `None` if the camera
/// could not be taken.
fn swap(room: RoomKind, doors: &mut [&mut DoorMachine], ctx: &mut DoorCtx) -> Option<DoorDescriptor> {
    let holder = doors
        .iter()
        .map(|door| CameraOwner::Door(door.id()))
        .find(|owner| ctx.rig.is_held_by(*owner));
    let taken = match holder {
        Some(owner) => ctx
            .rig
            .transfer_override(owner, CameraOwner::Teleport, ctx.tweens),
        None => ctx.rig.request_override(CameraOwner::Teleport, ctx.tweens),
    };
    if !taken {
        warn!(
            "teleport to {room:?} could not take the camera from {:?}",
            ctx.rig.authority()
        );
        return None;
    }
    for door in doors.iter_mut() {
        door.teleport_reset(ctx);
    }
    let target = ctx.layout.nearest_door_for(room, ctx.rig.pose().position.z);
    let standing = ctx.layout.standing_pose(&target, ctx.eye_height, ctx.cfg.standoff);
    ctx.rig.write(CameraWriter::Owner(CameraOwner::Teleport), standing);
    debug!("teleport parked camera before door {}", target.id.0);
    Some(target)
}

/// Clicks the destination door once it exists. Gives the camera back
/// after too many frames without it. Returns `true` when swapping is over.
fn enter_target(
    jump: &mut Jump,
    doors: &mut [&mut DoorMachine],
    ctx: &mut DoorCtx,
    cfg: &NavigationConfig,
) -> bool {
    let Some(target) = jump.target else {
        return true;
    };
    let clicked = doors
        .iter_mut()
        .find(|door| door.id() == target.id)
        .is_some_and(|door| door.click(ClickSource::Teleport, ctx));
    if clicked {
        return true;
    }
    jump.waited += 1;
    if jump.waited > cfg.max_wait_frames {
        warn!(
            "door {} never appeared, giving up teleport to {:?}",
            target.id.0, jump.room
        );
        ctx.rig.release_override(CameraOwner::Teleport);
        return true;
    }
    false
}

fn ratio(elapsed: f32, duration: f32) -> f32 {
    if duration <= 0.0 {
        1.0
    } else {
        (elapsed / duration).clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::{Authority, CameraPose, CameraRig};
    use crate::door::{DoorConfig, DoorId, DoorPhase};
    use crate::navigation::NavigationBus;
    use crate::segments::{CorridorLayout, SegmentConfig};
    use crate::tween::TweenScheduler;

    const DT: f32 = 1.0 / 60.0;

    struct Harness {
        rig: CameraRig,
        tweens: TweenScheduler,
        bus: NavigationBus,
        layout: CorridorLayout,
        door_cfg: DoorConfig,
        cfg: NavigationConfig,
        doors: Vec<DoorMachine>,
        teleporter: Teleporter,
    }

    impl Harness {
        fn new() -> Self {
            let layout = CorridorLayout::from_settings(&SegmentConfig::default());
            let doors = (0..3)
                .filter_map(|i| layout.door(i))
                .map(DoorMachine::new)
                .collect();
            Self {
                rig: CameraRig::new(
                    CameraPose::looking_down_corridor(Vec3::new(0.0, 1.6, -2.0)),
                    Authority::Automatic,
                ),
                tweens: TweenScheduler::default(),
                bus: NavigationBus::default(),
                layout,
                door_cfg: DoorConfig::default(),
                cfg: NavigationConfig::default(),
                doors,
                teleporter: Teleporter::default(),
            }
        }

        fn request(&mut self, room: RoomKind, ready: bool) -> bool {
            let mut ctx = DoorCtx {
                rig: &mut self.rig,
                tweens: &mut self.tweens,
                bus: &mut self.bus,
                layout: &self.layout,
                cfg: &self.door_cfg,
                eye_height: 1.6,
            };
            self.teleporter.request(room, ready, &mut ctx)
        }

        fn step(&mut self, ready: bool) {
            self.tweens.advance(DT);
            self.rig.begin_frame();
            let mut ctx = DoorCtx {
                rig: &mut self.rig,
                tweens: &mut self.tweens,
                bus: &mut self.bus,
                layout: &self.layout,
                cfg: &self.door_cfg,
                eye_height: 1.6,
            };
            let mut doors: Vec<&mut DoorMachine> = self.doors.iter_mut().collect();
            self.teleporter
                .tick(DT, ready, &mut doors, &mut ctx, &self.cfg);
            for door in self.doors.iter_mut() {
                door.tick(DT, &mut ctx);
            }
        }

        fn run_while_teleporting(&mut self) -> usize {
            let mut frames = 0;
            while self.bus.teleport_phase().is_some() && frames < 2000 {
                self.step(true);
                frames += 1;
            }
            frames
        }

        fn door(&self, room: RoomKind) -> &DoorMachine {
            self.doors
                .iter()
                .find(|door| door.descriptor().room == room)
                .unwrap()
        }
    }

    #[test]
    fn request_before_ready_is_held_then_replayed() {
        let mut h = Harness::new();
        assert!(!h.request(RoomKind::Studio, false));
        assert_eq!(h.teleporter.held(), Some(RoomKind::Studio));
        h.step(false);
        assert!(h.bus.teleport_phase().is_none());
        h.step(true);
        assert_eq!(h.teleporter.destination(), Some(RoomKind::Studio));
        assert_eq!(h.teleporter.held(), None);
    }

    #[test]
    fn teleport_walks_through_cover_swap_reveal() {
        let mut h = Harness::new();
        assert!(h.request(RoomKind::Studio, true));
        assert_eq!(h.bus.teleport_phase(), Some(TeleportPhase::Covering));
        let mut seen = vec![TeleportPhase::Covering];
        while let Some(phase) = h.bus.teleport_phase() {
            if seen.last() != Some(&phase) {
                seen.push(phase);
            }
            h.step(true);
        }
        assert_eq!(
            seen,
            vec![
                TeleportPhase::Covering,
                TeleportPhase::Swapping,
                TeleportPhase::Revealing
            ]
        );
        assert_eq!(h.teleporter.cover(&h.cfg), 0.0);
    }

    #[test]
    fn cover_is_opaque_while_swapping() {
        let mut h = Harness::new();
        h.request(RoomKind::About, true);
        assert_eq!(h.teleporter.cover(&h.cfg), 0.0);
        while h.bus.teleport_phase() != Some(TeleportPhase::Swapping) {
            h.step(true);
        }
        assert_eq!(h.teleporter.cover(&h.cfg), 1.0);
    }

    #[test]
    fn teleport_clicks_destination_door_from_standing_pose() {
        let mut h = Harness::new();
        h.request(RoomKind::Studio, true);
        h.run_while_teleporting();
        let door = h.door(RoomKind::Studio);
        assert!(door.phase().is_engaged());
        assert!(h.rig.is_held_by(CameraOwner::Door(door.id())));
    }

    #[test]
    fn teleport_resets_active_room_silently() {
        let mut h = Harness::new();
        // Visitor is inside the gallery.
        {
            let mut ctx = DoorCtx {
                rig: &mut h.rig,
                tweens: &mut h.tweens,
                bus: &mut h.bus,
                layout: &h.layout,
                cfg: &h.door_cfg,
                eye_height: 1.6,
            };
            assert!(h.doors[0].click(ClickSource::Pointer, &mut ctx));
        }
        let mut frames = 0;
        while !h.doors[0].is_inside_room() && frames < 2000 {
            h.step(true);
            frames += 1;
        }
        h.step(true);
        assert_eq!(h.bus.current_room(), Some(RoomKind::Gallery));

        h.request(RoomKind::About, true);
        h.run_while_teleporting();

        let gallery = h.door(RoomKind::Gallery);
        assert_eq!(gallery.phase(), DoorPhase::Idle);
        assert!(!gallery.room_mounted());
        assert!(!gallery.is_open());
        let about = h.door(RoomKind::About);
        assert!(h.rig.is_held_by(CameraOwner::Door(about.id())));
    }

    #[test]
    fn idle_only_without_held_or_running_teleport() {
        let mut h = Harness::new();
        assert!(h.teleporter.is_idle());
        h.request(RoomKind::About, false);
        assert!(!h.teleporter.is_idle());
        h.step(true);
        assert_eq!(h.teleporter.destination(), Some(RoomKind::About));
        assert!(!h.teleporter.is_idle());
        h.run_while_teleporting();
        assert!(h.teleporter.is_idle());
    }

    #[test]
    fn same_room_request_is_ignored() {
        let mut h = Harness::new();
        h.bus.set_current_room(Some(RoomKind::Contact));
        assert!(!h.request(RoomKind::Contact, true));
        assert!(h.bus.teleport_phase().is_none());
    }

    #[test]
    fn second_request_while_running_is_ignored() {
        let mut h = Harness::new();
        assert!(h.request(RoomKind::Studio, true));
        assert!(!h.request(RoomKind::About, true));
        assert_eq!(h.teleporter.destination(), Some(RoomKind::Studio));
    }

    #[test]
    fn missing_door_gives_camera_back() {
        let mut h = Harness::new();
        // Only the gallery door is spawned; Contact never appears.
        h.doors.retain(|door| door.id() == DoorId(0));
        h.request(RoomKind::Contact, true);
        let frames = h.run_while_teleporting();
        assert!(frames < 2000);
        assert!(h.rig.is_automatic());
    }

    #[test]
    fn giving_up_leaves_a_single_camera_writer() {
        use crate::camera::{CameraConfig, CameraController, FrameInput};
        use crate::phase::InputChannels;

        let mut h = Harness::new();
        h.doors.retain(|door| door.id() == DoorId(0));
        let cam = CameraConfig::default();
        let mut controller = CameraController::new(cam.rest_z, &h.layout);
        h.request(RoomKind::Contact, true);

        let mut released = false;
        for _ in 0..2000 {
            let held = !h.rig.is_automatic();
            h.step(true);
            controller.update(
                &FrameInput::default(),
                InputChannels::for_phase(crate::AppPhase::Ready),
                DT,
                &mut h.rig,
                &h.layout,
                &cam,
            );
            assert!(h.rig.frame_writers().len() <= 1, "{:?}", h.rig.frame_writers());
            if held && h.rig.is_automatic() {
                released = true;
                assert!(h.rig.frame_writers().is_empty());
                break;
            }
        }
        assert!(released);

        h.step(true);
        controller.update(
            &FrameInput::default(),
            InputChannels::for_phase(crate::AppPhase::Ready),
            DT,
            &mut h.rig,
            &h.layout,
            &cam,
        );
        assert_eq!(h.rig.frame_writers(), &[CameraWriter::Controller]);
    }
}
