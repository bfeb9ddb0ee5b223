use std::f32::consts::FRAC_PI_2;

use bevy::prelude::*;

use crate::navigation::RoomKind;

/// Stable door identity. Equal to the index of the corridor segment carrying it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Reflect)]
pub struct DoorId(pub i64);

/// Which corridor wall a door is set into.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Reflect)]
pub enum DoorSide {
    /// `-X` wall.
    Left,
    /// `+X` wall.
    Right,
}

impl DoorSide {
    /// `-1` for left, `+1` for right.
    pub fn sign(self) -> f32 {
        match self {
            DoorSide::Left => -1.0,
            DoorSide::Right => 1.0,
        }
    }

    /// Camera yaw that faces this wall squarely.
    pub fn facing_yaw(self) -> f32 {
        match self {
            DoorSide::Left => FRAC_PI_2,
            DoorSide::Right => -FRAC_PI_2,
        }
    }

    /// Wall normal pointing back into the corridor.
    pub fn inward_normal(self) -> Vec3 {
        Vec3::X * -self.sign()
    }
}

/// Static description of an interactive door.
#[derive(Clone, Copy, Debug, PartialEq, Reflect)]
pub struct DoorDescriptor {
    /// Identity (segment index).
    pub id: DoorId,
    /// Wall the door is set into.
    pub side: DoorSide,
    /// Room behind the door.
    pub room: RoomKind,
    /// World-space centre of the door panel.
    pub position: Vec3,
}

impl DoorDescriptor {
    /// Sign text.
    pub fn label(&self) -> &'static str {
        self.room.label()
    }
}

/// Discrete state of a door's interaction sequence.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Reflect)]
pub enum DoorPhase {
    /// Closed; only proximity tilt and hover preview apply.
    #[default]
    Idle,
    /// Click accepted, override taken, snapshot stored.
    Committed,
    /// Camera turning to face the door squarely.
    Aligning,
    /// Room content mounted; waiting for its ready signal or the fallback.
    RoomLoading,
    /// Room ready; door about to open.
    RoomReady,
    /// Handle and panel swinging open.
    Opening,
    /// Door open; camera flying through.
    FlyingIn,
    /// Visitor inside the room.
    InsideRoom,
    /// Camera flying back out to the aligned snapshot.
    ExitingToDoor,
    /// Camera returning to the pre-click snapshot.
    ExitingToCorridor,
    /// Door swinging shut after the camera is back in the corridor.
    Closing,
}

impl DoorPhase {
    /// True from commit until the door is closed again.
    pub fn is_engaged(self) -> bool {
        self != DoorPhase::Idle
    }
}

/// Door state machine attached to each interactive door entity.
///
/// The entity sits on the floor at the door's wall position, facing into the
/// corridor, and tilts toward the approaching camera.
#[derive(Component)]
pub struct Door(pub super::DoorMachine);

/// Hinged door leaf.
#[derive(Component, Reflect)]
pub struct DoorPanel {
    /// Owning door.
    pub door: DoorId,
}

/// Door handle, turned before the leaf swings.
#[derive(Component, Reflect)]
pub struct DoorHandle {
    /// Owning door.
    pub door: DoorId,
}

/// Door under the pointer this frame, as found by the hover ray test.
#[derive(Resource, Default, Debug)]
pub struct HoveredDoor(pub Option<Entity>);
