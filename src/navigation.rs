//! Cross-cutting navigation: the shared signal bus, teleports, and the room
//! overlay panel.

mod entities;
mod systems;
mod teleport;

pub use entities::{NavigationBus, OverlayContent, RoomKind, TeleportPhase, TeleportRequest};
pub use teleport::Teleporter;

use bevy::prelude::*;

use crate::CorridorSet;

/// Per-plugin configuration for navigation.
#[derive(Resource, Clone, Debug, Reflect)]
pub struct NavigationConfig {
    /// Treat the entrance as already played this session.
    pub skip_entrance: bool,
    /// Room to teleport into as soon as the corridor is ready.
    pub start_room: Option<RoomKind>,
    /// Seconds the screen cover takes to fade in.
    pub fade_in: f32,
    /// Seconds the screen cover takes to fade out.
    pub fade_out: f32,
    /// Frames to wait for the destination door before giving up.
    pub max_wait_frames: u32,
    /// Number keys 1-4 teleport into the rooms.
    pub teleport_keys: bool,
}

impl Default for NavigationConfig {
    fn default() -> Self {
        Self {
            skip_entrance: false,
            start_room: None,
            fade_in: 0.35,
            fade_out: 0.5,
            max_wait_frames: 30,
            teleport_keys: true,
        }
    }
}

/// Navigation bus, teleport orchestration, and the overlay UI.
pub struct NavigationPlugin(pub NavigationConfig);

impl Plugin for NavigationPlugin {
    fn build(&self, app: &mut App) {
        let mut bus = NavigationBus::default();
        if self.0.skip_entrance {
            bus.mark_entered();
        }
        app.register_type::<NavigationConfig>()
            .register_type::<NavigationBus>()
            .insert_resource(self.0.clone())
            .insert_resource(bus)
            .init_resource::<Teleporter>()
            .add_message::<TeleportRequest>()
            .add_systems(Startup, systems::request_start_room)
            .add_systems(
                Update,
                (systems::teleport_keys, systems::drive_teleport)
                    .chain()
                    .in_set(CorridorSet::Navigation),
            )
            .add_systems(
                Update,
                (systems::draw_overlay, systems::draw_cover)
                    .chain()
                    .after(CorridorSet::Apply),
            );
    }
}
