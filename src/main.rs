//! Endless corridor viewer.
//!
//! Scroll to walk, click a door to enter its room, Escape to back out.
//! Digits 1-4 teleport, H toggles the status readout, Tab the inspector.

use bevy::prelude::*;
#[cfg(feature = "native")]
use bevy::remote::{RemotePlugin, http::RemoteHttpPlugin};
use bevy_inspector_egui::quick::WorldInspectorPlugin;
#[cfg(feature = "native")]
use clap::Parser;

use endless_corridor::camera::{CameraConfig, CameraPlugin};
use endless_corridor::door::{DoorConfig, DoorPlugin};
use endless_corridor::hud::HudPlugin;
use endless_corridor::navigation::{NavigationConfig, NavigationPlugin};
#[cfg(feature = "native")]
use endless_corridor::navigation::RoomKind;
use endless_corridor::phase::{PhaseConfig, PhasePlugin};
use endless_corridor::rooms::{RoomConfig, RoomsPlugin};
use endless_corridor::segments::{SegmentConfig, SegmentsPlugin};
use endless_corridor::CorridorSchedulePlugin;

/// Command-line overrides for the native build.
#[cfg(feature = "native")]
#[derive(Parser, Debug)]
#[command(version, about = "Endless corridor viewer")]
struct Cli {
    /// Seed for the lantern sky.
    #[arg(long)]
    seed: Option<u32>,
    /// Start in the corridor, as if the entrance had already been played.
    #[arg(long)]
    skip_entrance: bool,
    /// Teleport into a room once the corridor is ready.
    #[arg(long, value_parser = parse_room)]
    room: Option<RoomKind>,
    /// Disable the door hover preview.
    #[arg(long)]
    no_hover: bool,
}

#[cfg(feature = "native")]
fn parse_room(name: &str) -> Result<RoomKind, String> {
    RoomKind::from_name(name)
        .ok_or_else(|| format!("unknown room `{name}`, expected gallery, studio, about or contact"))
}

/// Whether the world inspector is shown (Tab to toggle).
#[derive(Resource, Default)]
struct ShowInspector(bool);

#[derive(Default)]
struct Settings {
    segments: SegmentConfig,
    doors: DoorConfig,
    navigation: NavigationConfig,
}

impl Settings {
    #[cfg(feature = "native")]
    fn from_cli() -> Self {
        let cli = Cli::parse();
        let mut settings = Self::default();
        if let Some(seed) = cli.seed {
            settings.segments.seed = seed;
        }
        settings.doors.hover_enabled = !cli.no_hover;
        settings.navigation.skip_entrance = cli.skip_entrance;
        settings.navigation.start_room = cli.room;
        settings
    }

    #[cfg(not(feature = "native"))]
    fn from_cli() -> Self {
        Self::default()
    }
}

fn main() {
    let settings = Settings::from_cli();
    let mut app = App::new();

    app.add_plugins(DefaultPlugins.set(WindowPlugin {
        primary_window: Some(Window {
            title: "Endless Corridor".into(),
            ..default()
        }),
        ..default()
    }))
    .init_resource::<ShowInspector>()
    .add_plugins(bevy_egui::EguiPlugin::default())
    .add_plugins(CorridorSchedulePlugin)
    .add_plugins(NavigationPlugin(settings.navigation))
    .add_plugins(SegmentsPlugin(settings.segments))
    .add_plugins(CameraPlugin(CameraConfig::default()))
    .add_plugins(PhasePlugin(PhaseConfig::default()))
    .add_plugins(DoorPlugin(settings.doors))
    .add_plugins(RoomsPlugin(RoomConfig::default()))
    .add_plugins(HudPlugin)
    .add_systems(Update, toggle_inspector)
    .add_plugins(WorldInspectorPlugin::new().run_if(|show: Res<ShowInspector>| show.0));

    #[cfg(feature = "native")]
    app.add_plugins(RemotePlugin::default())
        .add_plugins(RemoteHttpPlugin::default());

    app.run();
}

fn toggle_inspector(keys: Res<ButtonInput<KeyCode>>, mut show: ResMut<ShowInspector>) {
    if keys.just_pressed(KeyCode::Tab) {
        show.0 = !show.0;
        info!("inspector {}", if show.0 { "shown" } else { "hidden" });
    }
}
