//! Coarse experience phase: loading → doors-waiting → entering → ready.
//!
//! [`PhaseMachine`] owns the camera until the walk-through finishes and gates
//! which input channels may touch it via [`InputChannels`].

mod machine;
mod systems;

pub use machine::{PhaseMachine, PhaseSignal};
pub use systems::{EntranceLeaf, ReachedDoors};

use bevy::prelude::*;

use crate::tween::{Ease, TweenSpec};
use crate::{AppPhase, CorridorSet};

/// Per-plugin configuration for the entrance choreography.
#[derive(Resource, Clone, Debug, Reflect)]
pub struct PhaseConfig {
    /// Camera depth when loading starts.
    pub start_z: f32,
    /// Depth in front of the entrance where auto-advance stops.
    pub waiting_z: f32,
    /// Seconds the auto-advance takes.
    pub auto_advance_duration: f32,
    /// Walk-through from the waiting depth to the corridor rest depth.
    pub walk: TweenSpec,
    /// Entrance leaves swinging open during the walk.
    pub entrance_open: TweenSpec,
    /// Size of the entrance opening (both leaves together).
    pub entrance_size: Vec2,
    /// Maximum swing of each entrance leaf (degrees).
    pub entrance_swing: f32,
}

impl Default for PhaseConfig {
    fn default() -> Self {
        Self {
            start_z: 30.0,
            waiting_z: 6.0,
            auto_advance_duration: 3.5,
            walk: TweenSpec::new(2.6, Ease::InOutCubic).after(0.3),
            entrance_open: TweenSpec::new(1.2, Ease::OutCubic),
            entrance_size: Vec2::new(3.2, 3.4),
            entrance_swing: 100.0,
        }
    }
}

/// Which input sources may move the camera in a given phase.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct InputChannels {
    /// Scripted auto-advance toward the entrance.
    pub auto_advance: bool,
    /// Wheel / touch-drag travel.
    pub scroll: bool,
    /// Pointer parallax.
    pub parallax: bool,
    /// Door proximity glance.
    pub glance: bool,
    /// Clicking corridor doors.
    pub doors: bool,
}

impl InputChannels {
    /// The single input configuration each phase allows.
    pub fn for_phase(phase: AppPhase) -> Self {
        match phase {
            AppPhase::Loading => Self {
                auto_advance: true,
                ..default()
            },
            AppPhase::DoorsWaiting | AppPhase::Entering => Self::default(),
            AppPhase::Ready => Self {
                auto_advance: false,
                scroll: true,
                parallax: true,
                glance: true,
                doors: true,
            },
        }
    }
}

/// Entrance choreography and phase state.
pub struct PhasePlugin(pub PhaseConfig);

impl Plugin for PhasePlugin {
    fn build(&self, app: &mut App) {
        app.register_type::<PhaseConfig>()
            .register_type::<EntranceLeaf>()
            .insert_resource(self.0.clone())
            .add_message::<ReachedDoors>()
            .add_systems(
                Startup,
                (systems::init_phase, systems::spawn_entrance).chain(),
            )
            .add_systems(
                Update,
                (
                    systems::click_entrance.run_if(in_state(AppPhase::DoorsWaiting)),
                    systems::drive_phase,
                    systems::swing_entrance,
                )
                    .chain()
                    .in_set(CorridorSet::Phase),
            );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_ready_allows_scroll_and_parallax() {
        for phase in [AppPhase::Loading, AppPhase::DoorsWaiting, AppPhase::Entering] {
            let c = InputChannels::for_phase(phase);
            assert!(!c.scroll && !c.parallax && !c.glance && !c.doors, "{phase:?}");
        }
        let ready = InputChannels::for_phase(AppPhase::Ready);
        assert!(ready.scroll && ready.parallax && ready.glance && ready.doors);
        assert!(!ready.auto_advance);
    }

    #[test]
    fn auto_advance_only_while_loading() {
        assert!(InputChannels::for_phase(AppPhase::Loading).auto_advance);
        assert!(!InputChannels::for_phase(AppPhase::DoorsWaiting).auto_advance);
    }
}
