use bevy::prelude::*;
use bevy_egui::egui;

use super::NavigationConfig;
use super::entities::{NavigationBus, RoomKind, TeleportRequest};
use super::teleport::Teleporter;
use crate::AppPhase;
use crate::door::{Door, DoorMachine, DoorRes};

/// Queues the configured start room; it is replayed once the corridor is ready.
pub fn request_start_room(cfg: Res<NavigationConfig>, mut requests: MessageWriter<TeleportRequest>) {
    if let Some(room) = cfg.start_room {
        requests.write(TeleportRequest { room });
    }
}

/// Digits 1-4 teleport into the rooms in corridor order.
pub fn teleport_keys(
    keys: Res<ButtonInput<KeyCode>>,
    cfg: Res<NavigationConfig>,
    mut requests: MessageWriter<TeleportRequest>,
) {
    if !cfg.teleport_keys {
        return;
    }
    let digits = [
        KeyCode::Digit1,
        KeyCode::Digit2,
        KeyCode::Digit3,
        KeyCode::Digit4,
    ];
    for (key, room) in digits.into_iter().zip(RoomKind::ALL) {
        if keys.just_pressed(key) {
            requests.write(TeleportRequest { room });
        }
    }
}

/// Feeds teleport requests to the [`Teleporter`] and steps it.
pub fn drive_teleport(
    time: Res<Time>,
    phase: Res<State<AppPhase>>,
    cfg: Res<NavigationConfig>,
    mut requests: MessageReader<TeleportRequest>,
    mut teleporter: ResMut<Teleporter>,
    mut door_q: Query<&mut Door>,
    mut res: DoorRes,
) {
    let ready = *phase.get() == AppPhase::Ready;
    for request in requests.read() {
        teleporter.request(request.room, ready, &mut res.ctx());
    }
    // Borrowing the doors mutably flags every one of them as changed.
    if teleporter.is_idle() {
        return;
    }
    let mut doors: Vec<Mut<Door>> = door_q.iter_mut().collect();
    let mut machines: Vec<&mut DoorMachine> = doors.iter_mut().map(|door| &mut door.0).collect();
    teleporter.tick(time.delta_secs(), ready, &mut machines, &mut res.ctx(), &cfg);
}

// ── UI ──────────────────────────────────────────────────────────────

/// Room overlay panel with a Back button that raises the exit mailbox.
pub fn draw_overlay(
    mut egui_ctx: Query<&mut bevy_egui::EguiContext>,
    mut bus: ResMut<NavigationBus>,
    mut ready: Local<bool>,
) {
    // Egui fonts aren't available until after the first Context::run() in the render pass.
    if !*ready {
        *ready = true;
        return;
    }
    let Some(content) = bus.overlay().cloned() else {
        return;
    };
    let Ok(mut ctx) = egui_ctx.single_mut() else {
        return;
    };
    let mut back = false;
    egui::Window::new(content.title.as_str())
        .collapsible(false)
        .resizable(false)
        .anchor(egui::Align2::RIGHT_BOTTOM, egui::vec2(-24.0, -24.0))
        .show(ctx.get_mut(), |ui| {
            ui.label(content.body.as_str());
            ui.add_space(8.0);
            back = ui.button("Back to corridor").clicked();
        });
    if back && bus.request_exit() {
        info!("exit requested from overlay");
    }
}

/// Full-screen fade that hides the camera swap during a teleport.
pub fn draw_cover(
    mut egui_ctx: Query<&mut bevy_egui::EguiContext>,
    teleporter: Res<Teleporter>,
    cfg: Res<NavigationConfig>,
) {
    let alpha = teleporter.cover(&cfg);
    if alpha <= 0.0 {
        return;
    }
    let Ok(mut ctx) = egui_ctx.single_mut() else {
        return;
    };
    let ctx = ctx.get_mut();
    let painter = ctx.layer_painter(egui::LayerId::new(
        egui::Order::Foreground,
        egui::Id::new("teleport_cover"),
    ));
    painter.rect_filled(
        ctx.content_rect(),
        0.0,
        egui::Color32::from_black_alpha((alpha * 255.0).round() as u8),
    );
}
