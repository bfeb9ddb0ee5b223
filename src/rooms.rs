//! Room content behind the corridor doors.
//!
//! A room is instantiated when its door mounts it and removed when the door
//! unmounts it. Rooms only furnish themselves once [`ShowRoom`] is set, then
//! send [`RoomReady`] after a few stable frames. Rooms listed as silent never
//! send it, and rely on the door's fallback timer.

use bevy::prelude::*;

use crate::CorridorSet;
use crate::door::{Door, DoorId};
use crate::navigation::RoomKind;
use crate::segments::room_accent;

/// Per-plugin configuration for room content.
#[derive(Resource, Clone, Debug, Reflect)]
pub struct RoomConfig {
    /// Frames a furnished room waits before signalling ready.
    pub stable_frames: u32,
    /// Rooms that never signal ready.
    pub silent_rooms: Vec<RoomKind>,
    /// Interior width.
    pub width: f32,
    /// Interior depth, measured from the door.
    pub depth: f32,
    /// Interior height.
    pub height: f32,
}

impl Default for RoomConfig {
    fn default() -> Self {
        Self {
            stable_frames: 3,
            silent_rooms: vec![RoomKind::Contact],
            width: 7.0,
            depth: 9.0,
            height: 4.0,
        }
    }
}

/// Sent once by a room after its first stable frames.
#[derive(Message, Clone, Copy, Debug, PartialEq, Eq)]
pub struct RoomReady {
    /// Door that mounted the room.
    pub door: DoorId,
}

/// Gate for expensive room setup. Nothing is furnished until it is `true`.
#[derive(Component, Clone, Copy, Debug, Reflect)]
pub struct ShowRoom(pub bool);

/// Marker added once a room has built its decoration.
#[derive(Component, Reflect)]
pub struct Furnished;

/// Root of a room instance.
#[derive(Component, Debug, Reflect)]
pub struct Room {
    /// Door that mounted it.
    pub door: DoorId,
    /// Which room this is.
    pub kind: RoomKind,
    stable_frames: u32,
    signalled: bool,
}

impl Room {
    /// A freshly mounted room.
    pub fn new(door: DoorId, kind: RoomKind) -> Self {
        Self {
            door,
            kind,
            stable_frames: 0,
            signalled: false,
        }
    }

    /// Counts one stable frame. Returns `true` exactly once, when the room
    /// should announce it is ready.
    pub fn settle(&mut self, cfg: &RoomConfig) -> bool {
        if self.signalled || cfg.silent_rooms.contains(&self.kind) {
            return false;
        }
        self.stable_frames += 1;
        if self.stable_frames >= cfg.stable_frames {
            self.signalled = true;
            return true;
        }
        false
    }
}

/// Room lifecycle and the readiness handshake.
pub struct RoomsPlugin(pub RoomConfig);

impl Plugin for RoomsPlugin {
    fn build(&self, app: &mut App) {
        app.register_type::<RoomConfig>()
            .register_type::<Room>()
            .register_type::<ShowRoom>()
            .insert_resource(self.0.clone())
            .add_message::<RoomReady>()
            .add_systems(Startup, setup_room_assets)
            .add_systems(
                Update,
                (sync_rooms, furnish_rooms, settle_rooms)
                    .chain()
                    .in_set(CorridorSet::Segments),
            );
    }
}

/// Shared room meshes and materials.
#[derive(Resource)]
pub struct RoomAssets {
    slab: Handle<Mesh>,
    exhibit: Handle<Mesh>,
    shell: Handle<StandardMaterial>,
    accents: [Handle<StandardMaterial>; 4],
}

fn setup_room_assets(
    mut commands: Commands,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
) {
    let accents = RoomKind::ALL.map(|room| {
        materials.add(StandardMaterial {
            base_color: Color::BLACK,
            emissive: room_accent(room),
            ..default()
        })
    });
    commands.insert_resource(RoomAssets {
        slab: meshes.add(Cuboid::new(1.0, 1.0, 1.0)),
        exhibit: meshes.add(Cuboid::new(0.9, 1.2, 0.08)),
        shell: materials.add(StandardMaterial {
            base_color: Color::srgb(0.05, 0.05, 0.06),
            cull_mode: None,
            ..default()
        }),
        accents,
    });
}

/// Mirrors each door's `room_mounted` flag into room entities.
pub fn sync_rooms(
    mut commands: Commands,
    doors: Query<&Door>,
    rooms: Query<(Entity, &Room)>,
    assets: Res<RoomAssets>,
    cfg: Res<RoomConfig>,
) {
    for (entity, room) in &rooms {
        let mounted = doors
            .iter()
            .any(|door| door.0.id() == room.door && door.0.room_mounted());
        if !mounted {
            debug!("unmounting {:?} room of door {}", room.kind, room.door.0);
            commands.entity(entity).despawn();
        }
    }
    for door in &doors {
        let machine = &door.0;
        if !machine.room_mounted() || rooms.iter().any(|(_, room)| room.door == machine.id()) {
            continue;
        }
        let desc = machine.descriptor();
        debug!("mounting {:?} room of door {}", desc.room, desc.id.0);
        spawn_room_shell(&mut commands, &assets, &cfg, desc.id, desc.room, door_frame(desc));
    }
}

fn door_frame(desc: &crate::door::DoorDescriptor) -> Transform {
    Transform::from_xyz(desc.position.x, 0.0, desc.position.z)
        .with_rotation(Quat::from_rotation_y(desc.side.facing_yaw()))
}

fn spawn_room_shell(
    commands: &mut Commands,
    assets: &RoomAssets,
    cfg: &RoomConfig,
    door: DoorId,
    kind: RoomKind,
    frame: Transform,
) {
    let (w, d, h) = (cfg.width, cfg.depth, cfg.height);
    // Local -Z leads away from the corridor into the room.
    let slabs = [
        (Vec3::new(0.0, -0.05, -d / 2.0), Vec3::new(w, 0.1, d)),
        (Vec3::new(0.0, h, -d / 2.0), Vec3::new(w, 0.1, d)),
        (Vec3::new(0.0, h / 2.0, -d), Vec3::new(w, h, 0.1)),
        (Vec3::new(-w / 2.0, h / 2.0, -d / 2.0), Vec3::new(0.1, h, d)),
        (Vec3::new(w / 2.0, h / 2.0, -d / 2.0), Vec3::new(0.1, h, d)),
    ];
    commands
        .spawn((
            Name::new(format!("{} room", kind.label())),
            Room::new(door, kind),
            ShowRoom(true),
            frame,
            Visibility::default(),
        ))
        .with_children(|room| {
            for (pos, size) in slabs {
                room.spawn((
                    Mesh3d(assets.slab.clone()),
                    MeshMaterial3d(assets.shell.clone()),
                    Transform::from_translation(pos).with_scale(size),
                ));
            }
            room.spawn((
                PointLight {
                    color: Color::from(room_accent(kind)),
                    intensity: 30_000.0,
                    range: d * 1.5,
                    ..default()
                },
                Transform::from_xyz(0.0, h - 0.4, -d / 2.0),
            ));
        });
}

/// Builds the decoration of rooms that are allowed to show.
pub fn furnish_rooms(
    mut commands: Commands,
    rooms: Query<(Entity, &Room, &ShowRoom), Without<Furnished>>,
    assets: Res<RoomAssets>,
    cfg: Res<RoomConfig>,
) {
    for (entity, room, show) in &rooms {
        if !show.0 {
            continue;
        }
        let count = 3 + room.kind.index();
        let spacing = cfg.width / (count + 1) as f32;
        commands
            .entity(entity)
            .insert(Furnished)
            .with_children(|parent| {
                for i in 0..count {
                    let x = -cfg.width / 2.0 + spacing * (i + 1) as f32;
                    parent.spawn((
                        Mesh3d(assets.exhibit.clone()),
                        MeshMaterial3d(assets.accents[room.kind.index()].clone()),
                        Transform::from_xyz(x, 1.7, -cfg.depth + 0.1),
                    ));
                }
            });
    }
}

/// Counts stable frames on furnished rooms and announces readiness.
pub fn settle_rooms(
    mut rooms: Query<(&mut Room, &ShowRoom), With<Furnished>>,
    cfg: Res<RoomConfig>,
    mut ready: MessageWriter<RoomReady>,
) {
    for (mut room, show) in &mut rooms {
        if show.0 && room.settle(&cfg) {
            ready.write(RoomReady { door: room.door });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn room_signals_once_after_stable_frames() {
        let cfg = RoomConfig::default();
        let mut room = Room::new(DoorId(0), RoomKind::Gallery);
        let signals: Vec<bool> = (0..10).map(|_| room.settle(&cfg)).collect();
        assert_eq!(signals.iter().filter(|s| **s).count(), 1);
        assert_eq!(
            signals.iter().position(|s| *s),
            Some(cfg.stable_frames as usize - 1)
        );
    }

    #[test]
    fn silent_room_never_signals() {
        let cfg = RoomConfig::default();
        let mut room = Room::new(DoorId(3), RoomKind::Contact);
        assert!((0..100).all(|_| !room.settle(&cfg)));
    }

    #[test]
    fn room_opens_away_from_corridor() {
        let layout = crate::segments::CorridorLayout::from_settings(&Default::default());
        for i in 0..2 {
            let desc = layout.door(i).unwrap();
            let frame = door_frame(&desc);
            let back_wall = frame.transform_point(Vec3::new(0.0, 0.0, -5.0));
            assert!(back_wall.x.abs() > layout.half_width);
        }
    }
}
