//! Camera authority and the continuous corridor controller.
//!
//! [`CameraRig`] is the single shared camera state; [`CameraController`] drives
//! it from scroll, pointer parallax, and door proximity whenever nobody holds
//! an override. The apply step writes the rig pose to the swaying camera mount.

mod controller;
mod entities;
mod systems;

pub use controller::{CameraController, FrameInput, glance_target_at};
pub use entities::{
    Authority, CameraMount, CameraOwner, CameraPose, CameraRig, CameraWriter,
    CorridorCamera,
};
pub use systems::PendingInput;

use bevy::prelude::*;

use crate::CorridorSet;
use crate::math::ProximityCurve;

/// Per-plugin configuration for the corridor camera.
#[derive(Resource, Clone, Debug, Reflect)]
pub struct CameraConfig {
    /// Camera height above the floor.
    pub eye_height: f32,
    /// Depth where the visitor stands after entering; scrolling cannot go back past it.
    pub rest_z: f32,
    /// World units travelled per mouse-wheel line.
    pub scroll_line_units: f32,
    /// World units travelled per mouse-wheel pixel (trackpads).
    pub scroll_pixel_units: f32,
    /// World units travelled per pixel of vertical touch drag.
    pub touch_drag_units: f32,
    /// Exponential smoothing rate for depth (1/s).
    pub scroll_smoothing: f32,
    /// Scale applied to the normalised pointer position.
    pub parallax_intensity: f32,
    /// Camera translation at full parallax (x, y).
    pub parallax_offset: Vec2,
    /// Camera yaw / pitch at full parallax (radians).
    pub parallax_look: Vec2,
    /// Exponential smoothing rate for parallax (1/s).
    pub parallax_smoothing: f32,
    /// Distance-to-strength curve for door glances.
    pub glance: ProximityCurve,
    /// Yaw at full glance strength (radians).
    pub glance_intensity: f32,
    /// Smoothing rate while a glance grows (1/s).
    pub glance_engage_rate: f32,
    /// Smoothing rate while a glance shrinks (1/s). Faster than engage.
    pub glance_release_rate: f32,
    /// Yaw mismatch above which a released camera eases its glance back.
    pub glance_recovery_epsilon: f32,
    /// Ambient mount sway amplitude (radians).
    pub sway_amplitude: f32,
    /// Ambient mount sway frequency (Hz).
    pub sway_frequency: f32,
    /// Bloom post-processing intensity.
    pub bloom_intensity: f32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            eye_height: 1.6,
            rest_z: -2.0,
            scroll_line_units: 2.0,
            scroll_pixel_units: 0.02,
            touch_drag_units: 0.04,
            scroll_smoothing: 6.0,
            parallax_intensity: 1.0,
            parallax_offset: Vec2::new(0.35, 0.2),
            parallax_look: Vec2::new(0.05, 0.03),
            parallax_smoothing: 4.0,
            glance: ProximityCurve {
                start: 20.0,
                peak: 8.0,
                end: 1.0,
            },
            glance_intensity: 0.35,
            glance_engage_rate: 2.5,
            glance_release_rate: 6.0,
            glance_recovery_epsilon: 0.02,
            sway_amplitude: 0.012,
            sway_frequency: 0.15,
            bloom_intensity: 0.25,
        }
    }
}

/// Corridor camera: authority, controller, input gathering, and pose application.
pub struct CameraPlugin(pub CameraConfig);

impl Plugin for CameraPlugin {
    fn build(&self, app: &mut App) {
        app.register_type::<CameraConfig>()
            .register_type::<CameraRig>()
            .register_type::<CameraController>()
            .insert_resource(self.0.clone())
            .insert_resource(CameraRig::new(
                CameraPose::default(),
                Authority::Overridden(CameraOwner::Phase),
            ))
            .init_resource::<PendingInput>()
            .add_systems(
                Startup,
                (systems::init_controller, systems::spawn_camera).chain(),
            )
            .add_systems(
                Update,
                (systems::begin_camera_frame, systems::gather_input)
                    .chain()
                    .in_set(CorridorSet::Input),
            )
            .add_systems(Update, systems::drive_controller.in_set(CorridorSet::Camera))
            .add_systems(Update, systems::apply_camera.in_set(CorridorSet::Apply));
    }
}
