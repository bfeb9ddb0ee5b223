//! Small status readout in the top-left corner (H toggles it).

use bevy::prelude::*;
use bevy_egui::egui;

use crate::AppPhase;
use crate::door::{Door, DoorMachine};
use crate::navigation::{NavigationBus, RoomKind, TeleportPhase, Teleporter};
use crate::phase::PhaseMachine;

/// Whether the status readout is visible.
#[derive(Resource, Clone, Copy, Debug, Reflect)]
pub struct ShowHud(pub bool);

impl Default for ShowHud {
    fn default() -> Self {
        Self(true)
    }
}

/// Phase, load progress and active door readout.
pub struct HudPlugin;

impl Plugin for HudPlugin {
    fn build(&self, app: &mut App) {
        app.register_type::<ShowHud>()
            .init_resource::<ShowHud>()
            .add_systems(Update, (toggle_hud, draw_hud).chain());
    }
}

fn toggle_hud(keys: Res<ButtonInput<KeyCode>>, mut show: ResMut<ShowHud>) {
    if keys.just_pressed(KeyCode::KeyH) {
        show.0 = !show.0;
    }
}

/// Text lines of the readout.
pub fn hud_lines(
    phase: AppPhase,
    progress: f32,
    active: Option<&DoorMachine>,
    queued: Option<RoomKind>,
    teleport: Option<(RoomKind, TeleportPhase)>,
) -> Vec<String> {
    let mut lines = vec![format!("phase: {phase:?}")];
    if phase != AppPhase::Ready {
        lines.push(format!("loading: {:>3.0}%", progress.clamp(0.0, 1.0) * 100.0));
    }
    if let Some(door) = active {
        let desc = door.descriptor();
        lines.push(format!(
            "door {} ({}): {:?}",
            desc.id.0,
            desc.label(),
            door.phase()
        ));
    }
    if let Some(room) = queued {
        lines.push(format!("teleport queued: {}", room.label()));
    }
    if let Some((room, phase)) = teleport {
        lines.push(format!("teleport to {}: {phase:?}", room.label()));
    }
    lines
}

#[allow(clippy::too_many_arguments)]
fn draw_hud(
    mut egui_ctx: Query<&mut bevy_egui::EguiContext>,
    show: Res<ShowHud>,
    phase: Res<State<AppPhase>>,
    machine: Option<Res<PhaseMachine>>,
    bus: Res<NavigationBus>,
    teleporter: Res<Teleporter>,
    doors: Query<&Door>,
    mut ready: Local<bool>,
) {
    // Egui fonts aren't available until after the first Context::run() in the render pass.
    if !*ready {
        *ready = true;
        return;
    }
    if !show.0 {
        return;
    }
    let Ok(mut ctx) = egui_ctx.single_mut() else {
        return;
    };
    let progress = machine.map_or(0.0, |m| m.load_progress());
    let active = doors
        .iter()
        .map(|door| &door.0)
        .find(|door| door.phase().is_engaged());
    let teleport = teleporter.destination().zip(bus.teleport_phase());
    let lines = hud_lines(*phase.get(), progress, active, teleporter.held(), teleport);
    egui::Area::new(egui::Id::new("corridor_hud"))
        .anchor(egui::Align2::LEFT_TOP, egui::vec2(12.0, 12.0))
        .interactable(false)
        .show(ctx.get_mut(), |ui| {
            for line in &lines {
                ui.label(
                    egui::RichText::new(line.as_str())
                        .monospace()
                        .color(egui::Color32::from_gray(200)),
                );
            }
        });
}
