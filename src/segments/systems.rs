use bevy::prelude::*;
use noise::{Fbm, MultiFractal, NoiseFn, Perlin};

use super::SegmentConfig;
use super::layout::CorridorLayout;
use super::window::SegmentWindow;
use crate::camera::CameraRig;
use crate::door::{Door, DoorDescriptor, DoorHandle, DoorMachine, DoorPanel, DoorRes};
use crate::math;
use crate::navigation::RoomKind;

/// Root of one corridor segment. Despawning it removes all of its content.
#[derive(Component, Reflect)]
pub struct CorridorSegment {
    /// Segment index.
    pub index: i64,
}

/// Root of one chunk of lantern sky.
#[derive(Component, Reflect)]
pub struct SkyChunk {
    /// Chunk index.
    pub index: i64,
}

/// The two recycling windows that follow the camera.
#[derive(Resource, Debug)]
pub struct SegmentWindows {
    /// Corridor segments.
    pub corridor: SegmentWindow,
    /// Lantern sky chunks, reaching further ahead.
    pub sky: SegmentWindow,
}

impl SegmentWindows {
    /// Empty windows sized from the settings.
    pub fn from_settings(cfg: &SegmentConfig) -> Self {
        Self {
            corridor: SegmentWindow::new(
                cfg.origin,
                cfg.segment_length,
                cfg.segments_behind,
                cfg.segments_ahead,
            ),
            sky: SegmentWindow::new(cfg.origin, cfg.sky_chunk_length, 1, cfg.sky_ahead),
        }
    }
}

/// Meshes and materials shared by every segment.
#[derive(Resource)]
pub struct CorridorAssets {
    floor: Handle<Mesh>,
    courtyard: Handle<Mesh>,
    wall_full: Handle<Mesh>,
    wall_near: Handle<Mesh>,
    wall_far: Handle<Mesh>,
    lintel: Handle<Mesh>,
    trim: Handle<Mesh>,
    leaf: Handle<Mesh>,
    frame_side: Handle<Mesh>,
    frame_top: Handle<Mesh>,
    handle: Handle<Mesh>,
    plaque: Handle<Mesh>,
    lantern: Handle<Mesh>,
    floor_material: Handle<StandardMaterial>,
    wall_material: Handle<StandardMaterial>,
    trim_material: Handle<StandardMaterial>,
    leaf_material: Handle<StandardMaterial>,
    frame_material: Handle<StandardMaterial>,
    lantern_material: Handle<StandardMaterial>,
    room_materials: [Handle<StandardMaterial>; 4],
}

/// Neon accent for each room's door sign.
pub fn room_accent(room: RoomKind) -> LinearRgba {
    match room {
        RoomKind::Gallery => LinearRgba::rgb(0.2, 1.2, 4.0),
        RoomKind::Studio => LinearRgba::rgb(4.0, 0.6, 2.4),
        RoomKind::About => LinearRgba::rgb(3.6, 2.4, 0.3),
        RoomKind::Contact => LinearRgba::rgb(0.4, 3.6, 1.2),
    }
}

/// Builds [`CorridorAssets`] and the scene clear colour.
pub fn setup_corridor_assets(
    mut commands: Commands,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
    cfg: Res<SegmentConfig>,
) {
    commands.insert_resource(ClearColor(Color::srgb(0.01, 0.01, 0.025)));

    let len = cfg.segment_length;
    let height = cfg.wall_height;
    let door = cfg.door_size;
    let near = (cfg.door_offset * len - door.x / 2.0).max(0.01);
    let far = (len - cfg.door_offset * len - door.x / 2.0).max(0.01);

    let room_materials = RoomKind::ALL.map(|room| {
        materials.add(StandardMaterial {
            base_color: Color::BLACK,
            emissive: room_accent(room),
            unlit: true,
            ..default()
        })
    });

    commands.insert_resource(CorridorAssets {
        floor: meshes.add(Cuboid::new(cfg.half_width * 2.0 + 0.4, 0.1, len)),
        courtyard: meshes.add(Cuboid::new(cfg.lantern_spread, 0.1, len)),
        wall_full: meshes.add(Cuboid::new(0.2, height, len)),
        wall_near: meshes.add(Cuboid::new(0.2, height, near)),
        wall_far: meshes.add(Cuboid::new(0.2, height, far)),
        lintel: meshes.add(Cuboid::new(0.2, (height - door.y).max(0.01), door.x)),
        trim: meshes.add(Cuboid::new(0.04, 0.04, len)),
        leaf: meshes.add(Cuboid::new(door.x, door.y, 0.06)),
        frame_side: meshes.add(Cuboid::new(0.08, door.y + 0.08, 0.1)),
        frame_top: meshes.add(Cuboid::new(door.x + 0.16, 0.08, 0.1)),
        handle: meshes.add(Cuboid::new(0.14, 0.03, 0.03)),
        plaque: meshes.add(Cuboid::new(0.9, 0.2, 0.04)),
        lantern: meshes.add(Sphere::new(0.25)),
        floor_material: materials.add(StandardMaterial {
            base_color: Color::srgb(0.03, 0.03, 0.04),
            perceptual_roughness: 0.35,
            ..default()
        }),
        wall_material: materials.add(StandardMaterial {
            base_color: Color::srgb(0.06, 0.05, 0.07),
            ..default()
        }),
        trim_material: materials.add(StandardMaterial {
            base_color: Color::srgb(0.0, 0.4, 0.8),
            emissive: LinearRgba::rgb(0.0, 6.0, 12.0),
            unlit: true,
            ..default()
        }),
        leaf_material: materials.add(StandardMaterial {
            base_color: Color::srgb(0.12, 0.08, 0.06),
            perceptual_roughness: 0.6,
            ..default()
        }),
        frame_material: materials.add(StandardMaterial {
            base_color: Color::srgb(0.02, 0.02, 0.02),
            emissive: LinearRgba::rgb(0.8, 0.5, 0.2),
            ..default()
        }),
        lantern_material: materials.add(StandardMaterial {
            base_color: Color::srgb(1.0, 0.6, 0.2),
            emissive: LinearRgba::rgb(12.0, 5.0, 1.2),
            unlit: true,
            ..default()
        }),
        room_materials,
    });
}

// ── Corridor ────────────────────────────────────────────────────────

/// Spawns and despawns corridor segments as the camera moves.
///
/// Doors on a departing segment are torn down first so none of their tweens
/// or timers outlive them.
pub fn recycle_segments(
    mut commands: Commands,
    assets: Res<CorridorAssets>,
    cfg: Res<SegmentConfig>,
    mut windows: ResMut<SegmentWindows>,
    segments: Query<(Entity, &CorridorSegment)>,
    mut doors: Query<&mut Door>,
    mut res: DoorRes,
) {
    let depth = res.rig.pose().position.z;
    let Some(change) = windows.corridor.update(depth) else {
        return;
    };
    debug!(
        "corridor window at {depth:.1}: +{:?} -{:?}",
        change.spawned, change.despawned
    );

    for index in &change.despawned {
        for mut door in &mut doors {
            if door.0.id().0 == *index {
                door.0.teardown(&mut res.ctx());
            }
        }
        for (entity, segment) in &segments {
            if segment.index == *index {
                commands.entity(entity).despawn();
            }
        }
    }
    for index in change.spawned {
        spawn_segment(&mut commands, &assets, &res.layout, &cfg, index);
    }
}

fn spawn_segment(
    commands: &mut Commands,
    assets: &CorridorAssets,
    layout: &CorridorLayout,
    cfg: &SegmentConfig,
    index: i64,
) {
    let start = layout.segment_start(index);
    let len = cfg.segment_length;
    let door = layout.door(index);

    commands
        .spawn((
            Name::new(format!("Segment {index}")),
            CorridorSegment { index },
            Transform::from_xyz(0.0, 0.0, start),
            Visibility::default(),
        ))
        .with_children(|seg| {
            let Some(door) = door else {
                // Open courtyard in front of the entrance.
                seg.spawn((
                    Mesh3d(assets.courtyard.clone()),
                    MeshMaterial3d(assets.floor_material.clone()),
                    Transform::from_xyz(0.0, -0.05, -len / 2.0),
                ));
                return;
            };

            seg.spawn((
                Mesh3d(assets.floor.clone()),
                MeshMaterial3d(assets.floor_material.clone()),
                Transform::from_xyz(0.0, -0.05, -len / 2.0),
            ));
            seg.spawn((
                PointLight {
                    color: Color::srgb(1.0, 0.85, 0.7),
                    intensity: 60_000.0,
                    range: len,
                    ..default()
                },
                Transform::from_xyz(0.0, cfg.wall_height - 0.3, -len / 2.0),
            ));

            let wall_x = cfg.half_width + 0.1;
            let door_z = door.position.z - start;
            let half_door = cfg.door_size.x / 2.0;
            for sign in [-1.0_f32, 1.0] {
                seg.spawn((
                    Mesh3d(assets.trim.clone()),
                    MeshMaterial3d(assets.trim_material.clone()),
                    Transform::from_xyz(sign * (cfg.half_width - 0.02), 0.02, -len / 2.0),
                ));
                let wall = |mesh: &Handle<Mesh>, y: f32, z: f32| {
                    (
                        Mesh3d(mesh.clone()),
                        MeshMaterial3d(assets.wall_material.clone()),
                        Transform::from_xyz(sign * wall_x, y, z),
                    )
                };
                if sign != door.side.sign() {
                    seg.spawn(wall(&assets.wall_full, cfg.wall_height / 2.0, -len / 2.0));
                    continue;
                }
                let near_len = -(door_z + half_door);
                let far_len = len + door_z - half_door;
                seg.spawn(wall(&assets.wall_near, cfg.wall_height / 2.0, -near_len / 2.0));
                seg.spawn(wall(
                    &assets.wall_far,
                    cfg.wall_height / 2.0,
                    door_z - half_door - far_len / 2.0,
                ));
                seg.spawn(wall(
                    &assets.lintel,
                    (cfg.wall_height + cfg.door_size.y) / 2.0,
                    door_z,
                ));
            }

            spawn_door(seg, assets, cfg, &door, door_z);
        });
}

fn spawn_door(
    seg: &mut ChildSpawnerCommands,
    assets: &CorridorAssets,
    cfg: &SegmentConfig,
    door: &DoorDescriptor,
    local_z: f32,
) {
    let size = cfg.door_size;
    let id = door.id;
    seg.spawn((
        Name::new(format!("Door {} ({})", id.0, door.label())),
        Door(DoorMachine::new(*door)),
        Transform::from_xyz(door.position.x, 0.0, local_z)
            .with_rotation(Quat::from_rotation_y(door.side.facing_yaw())),
        Visibility::default(),
    ))
    .with_children(|d| {
        // Local +Z faces into the corridor; the leaf swings toward -Z.
        for x in [-1.0_f32, 1.0] {
            d.spawn((
                Mesh3d(assets.frame_side.clone()),
                MeshMaterial3d(assets.frame_material.clone()),
                Transform::from_xyz(x * (size.x / 2.0 + 0.04), size.y / 2.0, 0.0),
            ));
        }
        d.spawn((
            Mesh3d(assets.frame_top.clone()),
            MeshMaterial3d(assets.frame_material.clone()),
            Transform::from_xyz(0.0, size.y + 0.04, 0.0),
        ));
        d.spawn((
            Mesh3d(assets.plaque.clone()),
            MeshMaterial3d(assets.room_materials[door.room.index()].clone()),
            Transform::from_xyz(0.0, size.y + 0.3, 0.06),
        ));
        d.spawn((
            Name::new("DoorPanel"),
            DoorPanel { door: id },
            Transform::from_xyz(-size.x / 2.0, 0.0, 0.0),
            Visibility::default(),
        ))
        .with_children(|hinge| {
            hinge.spawn((
                Mesh3d(assets.leaf.clone()),
                MeshMaterial3d(assets.leaf_material.clone()),
                Transform::from_xyz(size.x / 2.0, size.y / 2.0, 0.0),
            ));
            hinge
                .spawn((
                    Name::new("DoorHandle"),
                    DoorHandle { door: id },
                    Transform::from_xyz(size.x * 0.88, size.y * 0.45, 0.06),
                    Visibility::default(),
                ))
                .with_children(|h| {
                    h.spawn((
                        Mesh3d(assets.handle.clone()),
                        MeshMaterial3d(assets.frame_material.clone()),
                        Transform::from_xyz(-0.06, 0.0, 0.0),
                    ));
                });
        });
    });
}

// ── Sky ─────────────────────────────────────────────────────────────

/// Spawns and despawns lantern sky chunks, reaching further ahead than the corridor.
pub fn recycle_sky(
    mut commands: Commands,
    assets: Res<CorridorAssets>,
    cfg: Res<SegmentConfig>,
    mut windows: ResMut<SegmentWindows>,
    chunks: Query<(Entity, &SkyChunk)>,
    rig: Res<CameraRig>,
) {
    let Some(change) = windows.sky.update(rig.pose().position.z) else {
        return;
    };
    for (entity, chunk) in &chunks {
        if change.despawned.contains(&chunk.index) {
            commands.entity(entity).despawn();
        }
    }
    for index in change.spawned {
        commands
            .spawn((
                Name::new(format!("Sky {index}")),
                SkyChunk { index },
                Transform::default(),
                Visibility::default(),
            ))
            .with_children(|sky| {
                for pos in lantern_positions(index, &cfg) {
                    sky.spawn((
                        Mesh3d(assets.lantern.clone()),
                        MeshMaterial3d(assets.lantern_material.clone()),
                        Transform::from_translation(pos),
                    ));
                }
            });
    }
}

/// Lantern positions for sky chunk `index`. Pure in `index` and the seed.
pub fn lantern_positions(index: i64, cfg: &SegmentConfig) -> Vec<Vec3> {
    let fbm: Fbm<Perlin> = Fbm::new(cfg.seed).set_octaves(cfg.noise_octaves);
    let count = cfg.lanterns_per_chunk.max(1);
    let start = cfg.origin - index as f32 * cfg.sky_chunk_length;
    let clearance = cfg.half_width + 2.0;

    (0..count)
        .map(|k| {
            let u = index as f64 * 0.731 + f64::from(k) * 0.173 + 0.5;
            let sample = |v: f64| (fbm.get([u, v]) as f32).clamp(-1.0, 1.0);

            let spread = sample(0.37) * cfg.lantern_spread / 2.0;
            let x = spread.signum() * (clearance + spread.abs());
            let y = math::lerp(
                cfg.lantern_height.x,
                cfg.lantern_height.y,
                (sample(4.61) + 1.0) / 2.0,
            );
            let slot = (k as f32 + 0.5 + sample(9.13) * 0.45) / count as f32;
            Vec3::new(x, y, start - slot * cfg.sky_chunk_length)
        })
        .collect()
}
