use bevy::prelude::*;

use super::SegmentConfig;
use crate::camera::CameraPose;
use crate::door::{DoorDescriptor, DoorId, DoorSide};
use crate::navigation::RoomKind;

/// Deterministic corridor geometry derived purely from segment indices.
#[derive(Resource, Clone, Debug, Reflect)]
pub struct CorridorLayout {
    /// Depth of the corridor entrance.
    pub origin: f32,
    /// Length of one segment along `-Z`.
    pub segment_length: f32,
    /// Half the corridor width; doors sit at `x = ±half_width`.
    pub half_width: f32,
    /// Where along its segment (fraction of length) a door sits.
    pub door_offset: f32,
    /// Door leaf width and height.
    pub door_size: Vec2,
}

impl CorridorLayout {
    /// Builds the layout from plugin settings.
    pub fn from_settings(cfg: &SegmentConfig) -> Self {
        Self {
            origin: cfg.origin,
            segment_length: cfg.segment_length,
            half_width: cfg.half_width,
            door_offset: cfg.door_offset,
            door_size: cfg.door_size,
        }
    }

    /// Index of the segment containing depth `z`.
    pub fn segment_index(&self, z: f32) -> i64 {
        ((self.origin - z) / self.segment_length).floor() as i64
    }

    /// Depth of the near edge of segment `index`.
    pub fn segment_start(&self, index: i64) -> f32 {
        self.origin - index as f32 * self.segment_length
    }

    /// Door carried by segment `index`. Segments behind the entrance have none.
    pub fn door(&self, index: i64) -> Option<DoorDescriptor> {
        (index >= 0).then(|| self.descriptor(index))
    }

    fn descriptor(&self, index: i64) -> DoorDescriptor {
        let side = if index.rem_euclid(2) == 0 {
            DoorSide::Left
        } else {
            DoorSide::Right
        };
        let room = RoomKind::ALL[index.rem_euclid(RoomKind::ALL.len() as i64) as usize];
        let z = self.segment_start(index) - self.door_offset * self.segment_length;
        DoorDescriptor {
            id: DoorId(index),
            side,
            room,
            position: Vec3::new(side.sign() * self.half_width, self.door_size.y / 2.0, z),
        }
    }

    /// Doors in the segment containing `z` and its two neighbours.
    pub fn doors_near(&self, z: f32) -> impl Iterator<Item = DoorDescriptor> + '_ {
        let current = self.segment_index(z);
        (current - 1..=current + 1).filter_map(|i| self.door(i))
    }

    /// Nearest door (by segment) leading into `room`.
    pub fn nearest_door_for(&self, room: RoomKind, z: f32) -> DoorDescriptor {
        let rooms = RoomKind::ALL.len() as i64;
        let current = self.segment_index(z).max(0);
        let base = current - current.rem_euclid(rooms) + room.index() as i64;
        let index = [base - rooms, base, base + rooms]
            .into_iter()
            .filter(|i| *i >= 0)
            .min_by_key(|i| (i - current).abs())
            .unwrap_or(base);
        self.descriptor(index)
    }

    /// Pose squarely facing `door` from the corridor centreline.
    pub fn aligned_pose(&self, door: &DoorDescriptor, eye_height: f32) -> CameraPose {
        CameraPose {
            position: Vec3::new(0.0, eye_height, door.position.z),
            yaw: door.side.facing_yaw(),
            pitch: 0.0,
            roll: 0.0,
        }
    }

    /// Safe "standing in the corridor" pose just before `door`.
    pub fn standing_pose(
        &self,
        door: &DoorDescriptor,
        eye_height: f32,
        standoff: f32,
    ) -> CameraPose {
        CameraPose::looking_down_corridor(Vec3::new(0.0, eye_height, door.position.z + standoff))
    }
}
