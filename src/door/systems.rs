use bevy::ecs::system::SystemParam;
use bevy::platform::collections::HashMap;
use bevy::prelude::*;

use super::DoorConfig;
use super::entities::{Door, DoorDescriptor, DoorHandle, DoorId, DoorPanel, HoveredDoor};
use super::machine::{ClickSource, DoorCtx};
use crate::AppPhase;
use crate::camera::{CameraConfig, CameraRig, CorridorCamera, PendingInput};
use crate::math;
use crate::navigation::NavigationBus;
use crate::phase::InputChannels;
use crate::rooms::RoomReady;
use crate::segments::CorridorLayout;
use crate::tween::TweenScheduler;

// ── Shared context bundles ──────────────────────────────────────────

/// Resources a door sequence touches, bundled for door-driving systems.
#[derive(SystemParam)]
pub struct DoorRes<'w> {
    /// Camera pose and authority.
    pub rig: ResMut<'w, CameraRig>,
    /// Shared tween timeline.
    pub tweens: ResMut<'w, TweenScheduler>,
    /// Navigation signals.
    pub bus: ResMut<'w, NavigationBus>,
    /// Corridor geometry.
    pub layout: Res<'w, CorridorLayout>,
    /// Door settings.
    pub cfg: Res<'w, DoorConfig>,
    /// Camera settings (eye height).
    pub cam: Res<'w, CameraConfig>,
}

impl DoorRes<'_> {
    /// Borrows everything as a [`DoorCtx`] for one door call.
    pub fn ctx(&mut self) -> DoorCtx<'_> {
        DoorCtx {
            rig: &mut self.rig,
            tweens: &mut self.tweens,
            bus: &mut self.bus,
            layout: &self.layout,
            cfg: &self.cfg,
            eye_height: self.cam.eye_height,
        }
    }
}

type CameraQuery<'w, 's> =
    Query<'w, 's, (&'static Camera, &'static GlobalTransform), With<CorridorCamera>>;

// ── Picking ─────────────────────────────────────────────────────────

/// Distance along the ray to the door leaf, if the ray hits it.
pub fn door_hit(origin: Vec3, direction: Vec3, door: &DoorDescriptor, size: Vec2) -> Option<f32> {
    math::ray_hits_panel(
        origin,
        direction,
        door.position,
        door.side.inward_normal(),
        Vec3::Z,
        size / 2.0,
    )
}

fn pointer_ray(pending: &PendingInput, camera_q: &CameraQuery) -> Option<Ray3d> {
    let cursor = pending.cursor?;
    let (camera, gt) = camera_q.single().ok()?;
    camera.viewport_to_world(gt, cursor).ok()
}

fn nearest_door<'a>(
    ray: Ray3d,
    doors: impl Iterator<Item = (Entity, &'a DoorDescriptor)>,
    size: Vec2,
) -> Option<Entity> {
    doors
        .filter_map(|(entity, door)| {
            door_hit(ray.origin, *ray.direction, door, size).map(|t| (entity, t))
        })
        .min_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(entity, _)| entity)
}

// ── Input ───────────────────────────────────────────────────────────

/// Moves the hover preview to whichever door is under the pointer.
///
/// Disabled on touch devices and when hover is turned off in [`DoorConfig`].
pub fn hover_doors(
    pending: Res<PendingInput>,
    phase: Res<State<AppPhase>>,
    cfg: Res<DoorConfig>,
    layout: Res<CorridorLayout>,
    camera_q: CameraQuery,
    mut hovered: ResMut<HoveredDoor>,
    mut doors: Query<(Entity, &mut Door)>,
) {
    let enabled = cfg.hover_enabled
        && !pending.touch_seen
        && InputChannels::for_phase(*phase.get()).doors;
    let hit = if enabled {
        pointer_ray(&pending, &camera_q).and_then(|ray| {
            nearest_door(
                ray,
                doors.iter().map(|(entity, door)| (entity, door.0.descriptor())),
                layout.door_size,
            )
        })
    } else {
        None
    };
    if hit == hovered.0 {
        return;
    }
    if let Some(prev) = hovered.0
        && let Ok((_, mut door)) = doors.get_mut(prev)
    {
        door.0.pointer_leave();
    }
    if let Some(next) = hit
        && let Ok((_, mut door)) = doors.get_mut(next)
    {
        door.0.pointer_enter();
    }
    hovered.0 = hit;
}

/// Ray-tests a click or tap against the doors and commits the nearest one.
pub fn click_doors(
    pending: Res<PendingInput>,
    phase: Res<State<AppPhase>>,
    camera_q: CameraQuery,
    mut doors: Query<(Entity, &mut Door)>,
    mut res: DoorRes,
) {
    if !pending.clicked
        || !InputChannels::for_phase(*phase.get()).doors
        || res.bus.teleport_phase().is_some()
    {
        return;
    }
    let Some(ray) = pointer_ray(&pending, &camera_q) else {
        return;
    };
    let hit = nearest_door(
        ray,
        doors.iter().map(|(entity, door)| (entity, door.0.descriptor())),
        res.layout.door_size,
    );
    let Some(entity) = hit else {
        return;
    };
    if let Ok((_, mut door)) = doors.get_mut(entity) {
        door.0.click(ClickSource::Pointer, &mut res.ctx());
    }
}

/// Escape raises the exit mailbox while inside a room.
pub fn exit_on_escape(keys: Res<ButtonInput<KeyCode>>, mut bus: ResMut<NavigationBus>) {
    if keys.just_pressed(KeyCode::Escape) && bus.request_exit() {
        info!("exit requested");
    }
}

/// Hands room readiness signals to the door that mounted the room.
pub fn accept_room_ready(mut ready: MessageReader<RoomReady>, mut doors: Query<&mut Door>) {
    for msg in ready.read() {
        for mut door in &mut doors {
            if door.0.id() == msg.door && door.0.room_ready() {
                debug!("door {}: room signalled ready", msg.door.0);
            }
        }
    }
}

/// Steps every door's sequence and proximity tilt.
pub fn tick_doors(time: Res<Time>, mut doors: Query<&mut Door>, mut res: DoorRes) {
    let dt = time.delta_secs();
    let camera_z = res.rig.pose().position.z;
    for mut door in &mut doors {
        door.0.tick(dt, &mut res.ctx());
        door.0.update_tilt(camera_z, dt, &res.cfg);
    }
}

// ── Apply ───────────────────────────────────────────────────────────

/// Writes tilt, leaf swing, and handle turn to the door hierarchy.
#[allow(clippy::type_complexity)]
pub fn apply_doors(
    cfg: Res<DoorConfig>,
    mut doors: Query<(&Door, &mut Transform), (Without<DoorPanel>, Without<DoorHandle>)>,
    mut panels: Query<(&DoorPanel, &mut Transform), (Without<Door>, Without<DoorHandle>)>,
    mut handles: Query<(&DoorHandle, &mut Transform), (Without<Door>, Without<DoorPanel>)>,
) {
    let mut openness: HashMap<DoorId, (f32, f32)> = HashMap::new();
    for (door, mut transform) in &mut doors {
        let machine = &door.0;
        let facing = machine.descriptor().side.facing_yaw();
        transform.rotation = Quat::from_rotation_y(facing + machine.tilt_yaw(&cfg));
        openness.insert(machine.id(), (machine.panel_amount(&cfg), machine.handle_open()));
    }
    for (panel, mut transform) in &mut panels {
        if let Some((amount, _)) = openness.get(&panel.door) {
            transform.rotation = Quat::from_rotation_y(amount * cfg.panel_swing.to_radians());
        }
    }
    for (handle, mut transform) in &mut handles {
        if let Some((_, amount)) = openness.get(&handle.door) {
            transform.rotation = Quat::from_rotation_z(-amount * cfg.handle_turn.to_radians());
        }
    }
}
