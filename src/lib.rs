#![warn(missing_docs)]
//! Endless 3D corridor with themed rooms behind its doors.
//!
//! The visitor scrolls down a corridor that is recycled around them, clicks a
//! door to be flown into the room behind it, and backs out again with Escape
//! or the overlay's Back button. One [`camera::CameraRig`] carries the camera
//! pose; exactly one writer (the continuous controller, the entrance
//! choreography, a door, or a teleport) may touch it per frame.

pub mod camera;
pub mod door;
pub mod hud;
pub mod math;
pub mod navigation;
pub mod phase;
pub mod rooms;
pub mod segments;
pub mod tween;

use bevy::prelude::*;

/// Coarse experience phase, used for system scheduling.
#[derive(States, Default, Debug, Clone, Copy, PartialEq, Eq, Hash, Reflect)]
pub enum AppPhase {
    /// Camera auto-advancing toward the entrance.
    #[default]
    Loading,
    /// Parked before the entrance, waiting for a click.
    DoorsWaiting,
    /// Walking through the opening entrance.
    Entering,
    /// Free scrolling; doors are interactive.
    Ready,
}

/// Per-frame ordering of the corridor systems.
#[derive(SystemSet, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CorridorSet {
    /// Input gathering and per-frame camera bookkeeping.
    Input,
    /// Shared tween timeline.
    Tweens,
    /// Entrance choreography.
    Phase,
    /// Teleport orchestration.
    Navigation,
    /// Door sequences.
    Doors,
    /// Continuous camera controller.
    Camera,
    /// Segment recycling and room lifecycle.
    Segments,
    /// Writing poses and openness to transforms.
    Apply,
}

/// App state, frame ordering and the shared tween timeline.
pub struct CorridorSchedulePlugin;

impl Plugin for CorridorSchedulePlugin {
    fn build(&self, app: &mut App) {
        app.register_type::<AppPhase>()
            .init_state::<AppPhase>()
            .init_resource::<tween::TweenScheduler>()
            .configure_sets(
                Update,
                (
                    CorridorSet::Input,
                    CorridorSet::Tweens,
                    CorridorSet::Phase,
                    CorridorSet::Navigation,
                    CorridorSet::Doors,
                    CorridorSet::Camera,
                    CorridorSet::Segments,
                    CorridorSet::Apply,
                )
                    .chain(),
            )
            .add_systems(Update, tween::advance_tweens.in_set(CorridorSet::Tweens));
    }
}
