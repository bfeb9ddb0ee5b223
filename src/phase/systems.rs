use bevy::prelude::*;

use super::PhaseConfig;
use super::machine::{PhaseMachine, PhaseSignal};
use crate::AppPhase;
use crate::camera::{CameraConfig, CameraRig, CorridorCamera, PendingInput};
use crate::math;
use crate::navigation::NavigationBus;
use crate::phase::InputChannels;
use crate::segments::CorridorLayout;
use crate::tween::TweenScheduler;

/// Fired once when the auto-advance reaches the entrance.
#[derive(Message, Clone, Copy, Debug)]
pub struct ReachedDoors;

/// One leaf of the entrance double door. The entity sits on the hinge.
#[derive(Component, Reflect)]
pub struct EntranceLeaf {
    /// `-1` for the left leaf, `+1` for the right one.
    pub sign: f32,
}

/// Builds the phase machine and takes the camera for the loading sequence.
///
/// A visitor who already entered this session skips straight to `ready`.
pub fn init_phase(
    mut commands: Commands,
    cfg: Res<PhaseConfig>,
    cam_cfg: Res<CameraConfig>,
    mut rig: ResMut<CameraRig>,
    mut tweens: ResMut<TweenScheduler>,
    mut bus: ResMut<NavigationBus>,
    mut next: ResMut<NextState<AppPhase>>,
) {
    let mut machine = PhaseMachine::new(&cfg, cam_cfg.eye_height, cam_cfg.rest_z);
    machine.start(&mut rig, &mut tweens);
    if bus.has_entered() && machine.skip_to_ready(&mut rig, &mut tweens, &mut bus) {
        info!("entrance already played this session, skipping to ready");
        next.set(AppPhase::Ready);
    }
    commands.insert_resource(machine);
}

/// Spawns the entrance double door at the corridor origin.
pub fn spawn_entrance(
    mut commands: Commands,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
    cfg: Res<PhaseConfig>,
    layout: Res<CorridorLayout>,
) {
    let leaf_material = materials.add(StandardMaterial {
        base_color: Color::srgb(0.05, 0.04, 0.06),
        emissive: LinearRgba::rgb(0.6, 0.25, 1.2),
        ..default()
    });
    let size = cfg.entrance_size;
    let leaf_mesh = meshes.add(Cuboid::new(size.x / 2.0, size.y, 0.08));

    for sign in [-1.0_f32, 1.0] {
        let hinge = Vec3::new(sign * size.x / 2.0, 0.0, layout.origin);
        commands
            .spawn((
                Name::new(if sign < 0.0 { "EntranceLeft" } else { "EntranceRight" }),
                EntranceLeaf { sign },
                Transform::from_translation(hinge),
                Visibility::default(),
            ))
            .with_children(|leaf| {
                leaf.spawn((
                    Mesh3d(leaf_mesh.clone()),
                    MeshMaterial3d(leaf_material.clone()),
                    Transform::from_xyz(-sign * size.x / 4.0, size.y / 2.0, 0.0),
                ));
            });
    }
}

/// Ray-tests a click against the entrance and starts the walk-through.
#[allow(clippy::too_many_arguments)]
pub fn click_entrance(
    pending: Res<PendingInput>,
    cfg: Res<PhaseConfig>,
    layout: Res<CorridorLayout>,
    camera_q: Query<(&Camera, &GlobalTransform), With<CorridorCamera>>,
    rig: Res<CameraRig>,
    mut machine: ResMut<PhaseMachine>,
    mut tweens: ResMut<TweenScheduler>,
    mut next: ResMut<NextState<AppPhase>>,
) {
    if !pending.clicked {
        return;
    }
    let (Some(cursor), Ok((camera, cam_gt))) = (pending.cursor, camera_q.single()) else {
        return;
    };
    let Ok(ray) = camera.viewport_to_world(cam_gt, cursor) else {
        return;
    };
    let size = cfg.entrance_size;
    let hit = math::ray_hits_panel(
        ray.origin,
        *ray.direction,
        Vec3::new(0.0, size.y / 2.0, layout.origin),
        Vec3::Z,
        Vec3::X,
        size / 2.0,
    );
    if hit.is_some() && machine.click_entrance(&rig, &mut tweens) {
        next.set(AppPhase::Entering);
    }
}

/// Advances the phase machine and mirrors its transitions into [`AppPhase`].
#[allow(clippy::too_many_arguments)]
pub fn drive_phase(
    time: Res<Time>,
    phase: Res<State<AppPhase>>,
    mut machine: ResMut<PhaseMachine>,
    mut rig: ResMut<CameraRig>,
    mut tweens: ResMut<TweenScheduler>,
    mut bus: ResMut<NavigationBus>,
    mut next: ResMut<NextState<AppPhase>>,
    mut reached: MessageWriter<ReachedDoors>,
) {
    let channels = InputChannels::for_phase(*phase.get());
    match machine.tick(time.delta_secs(), channels, &mut rig, &mut tweens, &mut bus) {
        Some(PhaseSignal::ReachedDoors) => {
            reached.write(ReachedDoors);
            next.set(AppPhase::DoorsWaiting);
        }
        Some(PhaseSignal::Ready) => next.set(AppPhase::Ready),
        None => {}
    }
}

/// Rotates the entrance leaves about their hinges.
pub fn swing_entrance(
    machine: Res<PhaseMachine>,
    cfg: Res<PhaseConfig>,
    mut leaves: Query<(&EntranceLeaf, &mut Transform)>,
) {
    let angle = cfg.entrance_swing.to_radians() * machine.entrance_open();
    for (leaf, mut transform) in &mut leaves {
        transform.rotation = Quat::from_rotation_y(leaf.sign * angle);
    }
}
