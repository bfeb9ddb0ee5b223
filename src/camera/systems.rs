use std::f32::consts::TAU;

use bevy::core_pipeline::tonemapping::Tonemapping;
use bevy::input::mouse::{MouseScrollUnit, MouseWheel};
use bevy::input::touch::Touches;
use bevy::post_process::bloom::{Bloom, BloomCompositeMode};
use bevy::prelude::*;
use bevy::render::view::Hdr;
use bevy::window::PrimaryWindow;

use super::CameraConfig;
use super::controller::{CameraController, FrameInput};
use super::entities::{CameraMount, CameraRig, CorridorCamera};
use crate::AppPhase;
use crate::phase::InputChannels;
use crate::segments::CorridorLayout;

/// Input collected this frame, consumed by the controller and door hover.
#[derive(Resource, Default, Debug)]
pub struct PendingInput {
    /// Aggregated scroll / drag / pointer input.
    pub frame: FrameInput,
    /// Pointer position in window pixels, for ray picking.
    pub cursor: Option<Vec2>,
    /// Primary click or tap started this frame.
    pub clicked: bool,
    /// Set once any touch has been seen; disables desktop-only affordances.
    pub touch_seen: bool,
}

/// Creates the controller at the configured rest depth.
pub fn init_controller(
    mut commands: Commands,
    layout: Res<CorridorLayout>,
    cfg: Res<CameraConfig>,
) {
    commands.insert_resource(CameraController::new(cfg.rest_z, &layout));
}

/// Spawns the swaying mount with the HDR + bloom camera as its child.
pub fn spawn_camera(mut commands: Commands, rig: Res<CameraRig>, cfg: Res<CameraConfig>) {
    let pose = rig.pose();
    commands
        .spawn((
            Name::new("CameraMount"),
            CameraMount,
            Transform::from_translation(pose.position),
            Visibility::default(),
        ))
        .with_children(|mount| {
            mount.spawn((
                Name::new("CorridorCamera"),
                Camera3d::default(),
                Hdr,
                Tonemapping::TonyMcMapface,
                Bloom {
                    intensity: cfg.bloom_intensity,
                    composite_mode: BloomCompositeMode::Additive,
                    ..Bloom::NATURAL
                },
                Transform::from_rotation(pose.rotation()),
                CorridorCamera,
            ));
        });
}

/// Clears the rig's per-frame writer log.
pub fn begin_camera_frame(mut rig: ResMut<CameraRig>) {
    rig.begin_frame();
}

/// Collects wheel, touch-drag, and pointer input into [`PendingInput`].
pub fn gather_input(
    mut wheel: MessageReader<MouseWheel>,
    mouse: Res<ButtonInput<MouseButton>>,
    touches: Res<Touches>,
    windows: Query<&Window, With<PrimaryWindow>>,
    cfg: Res<CameraConfig>,
    mut pending: ResMut<PendingInput>,
) {
    let mut scroll = 0.0;
    for ev in wheel.read() {
        scroll -= match ev.unit {
            MouseScrollUnit::Line => ev.y * cfg.scroll_line_units,
            MouseScrollUnit::Pixel => ev.y * cfg.scroll_pixel_units,
        };
    }

    pending.clicked = mouse.just_pressed(MouseButton::Left) || touches.any_just_pressed();

    let mut touch_pos = None;
    for touch in touches.iter() {
        pending.touch_seen = true;
        scroll -= touch.delta().y * cfg.touch_drag_units;
        touch_pos.get_or_insert(touch.position());
    }

    let Ok(window) = windows.single() else {
        pending.frame = FrameInput {
            scroll,
            pointer: None,
        };
        return;
    };
    let cursor = touch_pos.or_else(|| window.cursor_position());
    let size = Vec2::new(window.width(), window.height()).max(Vec2::ONE);
    let pointer = cursor.map(|c| {
        let n = c / size * 2.0 - Vec2::ONE;
        Vec2::new(n.x, -n.y)
    });

    pending.cursor = cursor;
    pending.frame = FrameInput { scroll, pointer };
}

/// Runs the controller for this frame if the phase and authority allow it.
pub fn drive_controller(
    time: Res<Time>,
    phase: Res<State<AppPhase>>,
    pending: Res<PendingInput>,
    layout: Res<CorridorLayout>,
    cfg: Res<CameraConfig>,
    mut controller: ResMut<CameraController>,
    mut rig: ResMut<CameraRig>,
) {
    let channels = InputChannels::for_phase(*phase.get());
    if let Some(segment) = controller.update(
        &pending.frame,
        channels,
        time.delta_secs(),
        &mut rig,
        &layout,
        &cfg,
    ) {
        debug!("camera entered segment {segment}");
    }
}

/// Writes the rig pose to the mount and camera transforms.
///
/// The mount sways slowly. While an override is held the camera's local
/// rotation cancels the sway so the world-space facing is exactly what the
/// override holder wrote.
#[allow(clippy::type_complexity)]
pub fn apply_camera(
    time: Res<Time>,
    cfg: Res<CameraConfig>,
    mut rig: ResMut<CameraRig>,
    mut clock: Local<f32>,
    mut mount_q: Query<&mut Transform, (With<CameraMount>, Without<CorridorCamera>)>,
    mut cam_q: Query<&mut Transform, (With<CorridorCamera>, Without<CameraMount>)>,
) {
    let writers = rig.frame_writers();
    if writers.iter().any(|w| *w != writers[0]) {
        warn!("camera written by {writers:?} in one frame");
    }

    *clock += time.delta_secs();
    let sway = cfg.sway_amplitude * (TAU * cfg.sway_frequency * *clock).sin();
    rig.set_ambient_yaw(sway);

    let (Ok(mut mount), Ok(mut cam)) = (mount_q.single_mut(), cam_q.single_mut()) else {
        return;
    };
    let pose = rig.pose();
    let sway_rot = Quat::from_rotation_y(sway);
    mount.translation = pose.position;
    mount.rotation = sway_rot;
    cam.translation = Vec3::ZERO;
    cam.rotation = if rig.is_automatic() {
        pose.rotation()
    } else {
        sway_rot.inverse() * pose.rotation()
    };
}
