//! Endless corridor recycling.
//!
//! Two [`SegmentWindow`]s follow the camera depth: one for corridor segments
//! (one behind, one ahead) and a longer-reaching one for the lantern sky.
//! Content for every index is a pure function of the index, the
//! [`CorridorLayout`], and the seed, so a chunk destroyed behind the visitor
//! comes back identical if they turn around.

mod layout;
mod systems;
mod window;

pub use layout::CorridorLayout;
pub use systems::{CorridorSegment, SegmentWindows, SkyChunk, room_accent};
pub use window::{SegmentWindow, WindowChange};

use bevy::prelude::*;

use crate::CorridorSet;

/// Per-plugin configuration for corridor geometry and recycling.
#[derive(Resource, Clone, Debug, Reflect)]
pub struct SegmentConfig {
    /// Depth of the corridor entrance.
    pub origin: f32,
    /// Length of one corridor segment.
    pub segment_length: f32,
    /// Half the corridor width.
    pub half_width: f32,
    /// Wall height.
    pub wall_height: f32,
    /// Where along its segment a door sits (fraction of the length).
    pub door_offset: f32,
    /// Door leaf width and height.
    pub door_size: Vec2,
    /// Corridor segments kept behind the current one.
    pub segments_behind: u32,
    /// Corridor segments kept ahead of the current one.
    pub segments_ahead: u32,
    /// Length of one sky chunk.
    pub sky_chunk_length: f32,
    /// Sky chunks kept ahead of the current one.
    pub sky_ahead: u32,
    /// Lanterns per sky chunk.
    pub lanterns_per_chunk: u32,
    /// Sideways spread of the lanterns from the corridor centreline.
    pub lantern_spread: f32,
    /// Lantern height range above the floor.
    pub lantern_height: Vec2,
    /// Seed for lantern placement noise.
    pub seed: u32,
    /// Octaves for lantern placement noise.
    pub noise_octaves: usize,
}

impl Default for SegmentConfig {
    fn default() -> Self {
        Self {
            origin: 0.0,
            segment_length: 24.0,
            half_width: 3.0,
            wall_height: 4.2,
            door_offset: 0.5,
            door_size: Vec2::new(1.6, 2.8),
            segments_behind: 1,
            segments_ahead: 1,
            sky_chunk_length: 60.0,
            sky_ahead: 2,
            lanterns_per_chunk: 14,
            lantern_spread: 40.0,
            lantern_height: Vec2::new(7.0, 26.0),
            seed: 7,
            noise_octaves: 3,
        }
    }
}

/// Corridor and sky chunk recycling driven by the camera depth.
pub struct SegmentsPlugin(pub SegmentConfig);

impl Plugin for SegmentsPlugin {
    fn build(&self, app: &mut App) {
        app.register_type::<SegmentConfig>()
            .register_type::<CorridorLayout>()
            .register_type::<CorridorSegment>()
            .register_type::<SkyChunk>()
            .insert_resource(self.0.clone())
            .insert_resource(CorridorLayout::from_settings(&self.0))
            .insert_resource(SegmentWindows::from_settings(&self.0))
            .add_systems(Startup, systems::setup_corridor_assets)
            .add_systems(
                Update,
                (systems::recycle_segments, systems::recycle_sky)
                    .chain()
                    .in_set(CorridorSet::Segments),
            );
    }
}
