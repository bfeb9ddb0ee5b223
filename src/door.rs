//! Interactive corridor doors.
//!
//! Each door entity carries a [`DoorMachine`]. Systems feed it pointer hover,
//! clicks, the Escape key and room readiness, tick it once per frame, and write
//! its tilt, leaf swing and handle turn back to the door's transforms.

mod entities;
mod machine;
mod systems;

pub use entities::{
    Door, DoorDescriptor, DoorHandle, DoorId, DoorPanel, DoorPhase, DoorSide, HoveredDoor,
};
pub use machine::{ClickSource, DoorCtx, DoorMachine, ReadyLatch};
pub use systems::DoorRes;

use bevy::prelude::*;

use crate::CorridorSet;
use crate::math::ProximityCurve;
use crate::tween::{Ease, TweenSpec};

/// Per-plugin configuration for door timing and geometry.
#[derive(Resource, Clone, Debug, Reflect)]
pub struct DoorConfig {
    /// Pointer hover nudges idle doors open (desktop only).
    pub hover_enabled: bool,
    /// Leaf opening at full hover, as a fraction of the full swing.
    pub hover_open: f32,
    /// Hover smoothing rate (1/s).
    pub hover_rate: f32,
    /// Camera turn to face the door.
    pub align: TweenSpec,
    /// Seconds to wait for a room's ready signal before opening anyway.
    pub ready_fallback: f32,
    /// Handle turn.
    pub handle: TweenSpec,
    /// Leaf swing, delayed so the handle turns first.
    pub panel: TweenSpec,
    /// Camera flight through the open door.
    pub fly_in: TweenSpec,
    /// Distance flown through the door along the camera's facing.
    pub fly_in_distance: f32,
    /// Flight back out to the door-aligned pose.
    pub exit_to_door: TweenSpec,
    /// Flight back to the pose the visitor clicked from.
    pub exit_to_corridor: TweenSpec,
    /// Leaf swinging shut once the camera is back in the corridor.
    pub close: TweenSpec,
    /// Distance in front of the door for the teleport standing pose.
    pub standoff: f32,
    /// Full leaf swing (degrees).
    pub panel_swing: f32,
    /// Full handle turn (degrees).
    pub handle_turn: f32,
    /// Distance-to-strength curve for the wall tilt.
    pub tilt: ProximityCurve,
    /// Wall tilt far from the camera (degrees).
    pub tilt_base: f32,
    /// Wall tilt at full strength (degrees).
    pub tilt_max: f32,
    /// Tilt smoothing rate (1/s).
    pub tilt_rate: f32,
}

impl Default for DoorConfig {
    fn default() -> Self {
        Self {
            hover_enabled: true,
            hover_open: 0.08,
            hover_rate: 12.0,
            align: TweenSpec::new(1.0, Ease::InOutCubic),
            ready_fallback: 0.5,
            handle: TweenSpec::new(0.3, Ease::OutCubic),
            panel: TweenSpec::new(1.0, Ease::InOutSine).after(0.3),
            fly_in: TweenSpec::new(1.6, Ease::InOutSine),
            fly_in_distance: 5.0,
            exit_to_door: TweenSpec::new(1.3, Ease::InOutSine),
            exit_to_corridor: TweenSpec::new(1.1, Ease::InOutCubic),
            close: TweenSpec::new(0.8, Ease::InOutSine),
            standoff: 4.0,
            panel_swing: 100.0,
            handle_turn: 45.0,
            tilt: ProximityCurve {
                start: 18.0,
                peak: 6.0,
                end: -3.0,
            },
            tilt_base: 2.0,
            tilt_max: 10.0,
            tilt_rate: 3.0,
        }
    }
}

/// Door hover, click, sequencing, and transform application.
pub struct DoorPlugin(pub DoorConfig);

impl Plugin for DoorPlugin {
    fn build(&self, app: &mut App) {
        app.register_type::<DoorConfig>()
            .register_type::<DoorPanel>()
            .register_type::<DoorHandle>()
            .insert_resource(self.0.clone())
            .init_resource::<HoveredDoor>()
            .add_systems(
                Update,
                (
                    systems::hover_doors,
                    systems::click_doors,
                    systems::exit_on_escape,
                    systems::accept_room_ready,
                    systems::tick_doors,
                )
                    .chain()
                    .in_set(CorridorSet::Doors),
            )
            .add_systems(Update, systems::apply_doors.in_set(CorridorSet::Apply));
    }
}
