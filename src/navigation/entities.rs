use bevy::prelude::*;

/// The themed rooms reachable from the corridor.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Reflect)]
pub enum RoomKind {
    /// Project gallery.
    Gallery,
    /// Work-in-progress studio.
    Studio,
    /// Biography.
    About,
    /// Contact details.
    Contact,
}

impl RoomKind {
    /// All rooms in corridor order.
    pub const ALL: [RoomKind; 4] = [
        RoomKind::Gallery,
        RoomKind::Studio,
        RoomKind::About,
        RoomKind::Contact,
    ];

    /// Position in [`RoomKind::ALL`].
    pub fn index(self) -> usize {
        match self {
            RoomKind::Gallery => 0,
            RoomKind::Studio => 1,
            RoomKind::About => 2,
            RoomKind::Contact => 3,
        }
    }

    /// Door sign text.
    pub fn label(self) -> &'static str {
        match self {
            RoomKind::Gallery => "Gallery",
            RoomKind::Studio => "Studio",
            RoomKind::About => "About",
            RoomKind::Contact => "Contact",
        }
    }

    /// Overlay panel shown while standing inside the room.
    pub fn overlay(self) -> OverlayContent {
        let body = match self {
            RoomKind::Gallery => "Selected projects, one frame per wall.",
            RoomKind::Studio => "Experiments and works in progress.",
            RoomKind::About => "Who builds these corridors, and why.",
            RoomKind::Contact => "Leave a note at the front desk.",
        };
        OverlayContent {
            title: self.label().to_owned(),
            body: body.to_owned(),
        }
    }

    /// Parses a case-insensitive room name.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|room| room.label().eq_ignore_ascii_case(name.trim()))
    }
}

/// Text panel shown over the scene while inside a room.
#[derive(Clone, Debug, PartialEq, Eq, Reflect)]
pub struct OverlayContent {
    /// Panel heading.
    pub title: String,
    /// Panel body.
    pub body: String,
}

/// Progress of an out-of-band teleport.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Reflect)]
pub enum TeleportPhase {
    /// Screen cover fading in; the scene is still visible.
    Covering,
    /// Screen fully covered; camera and doors are being rearranged.
    Swapping,
    /// Screen cover fading out over the destination room.
    Revealing,
}

/// Shared navigation signals read and written by doors, phases, and UI.
///
/// `exit_requested` is an edge-triggered mailbox: it can only be raised while a
/// room is current, and the door owning that room clears it when handling it.
#[derive(Resource, Default, Debug, Reflect)]
pub struct NavigationBus {
    current_room: Option<RoomKind>,
    exit_requested: bool,
    teleport_phase: Option<TeleportPhase>,
    overlay: Option<OverlayContent>,
    has_entered: bool,
}

impl NavigationBus {
    /// Room the visitor is currently inside, if any.
    pub fn current_room(&self) -> Option<RoomKind> {
        self.current_room
    }

    /// Sets or clears the current room. Clearing also drops a pending exit.
    pub fn set_current_room(&mut self, room: Option<RoomKind>) {
        self.current_room = room;
        if room.is_none() {
            self.exit_requested = false;
        }
    }

    /// Raises the exit mailbox. Ignored (returns `false`) outside a room.
    pub fn request_exit(&mut self) -> bool {
        if self.current_room.is_none() {
            return false;
        }
        self.exit_requested = true;
        true
    }

    /// Whether an exit is pending.
    pub fn exit_requested(&self) -> bool {
        self.exit_requested
    }

    /// Lowers the exit mailbox.
    pub fn clear_exit(&mut self) {
        self.exit_requested = false;
    }

    /// Current teleport phase, `None` when no teleport is running.
    pub fn teleport_phase(&self) -> Option<TeleportPhase> {
        self.teleport_phase
    }

    /// Updates the teleport phase.
    pub fn set_teleport_phase(&mut self, phase: Option<TeleportPhase>) {
        self.teleport_phase = phase;
    }

    /// Overlay panel currently shown.
    pub fn overlay(&self) -> Option<&OverlayContent> {
        self.overlay.as_ref()
    }

    /// Shows an overlay panel, replacing any previous one.
    pub fn open_overlay(&mut self, content: OverlayContent) {
        self.overlay = Some(content);
    }

    /// Hides the overlay panel.
    pub fn close_overlay(&mut self) {
        self.overlay = None;
    }

    /// Records that the entrance sequence has been completed this session.
    pub fn mark_entered(&mut self) {
        self.has_entered = true;
    }

    /// Whether the entrance sequence has already been completed.
    pub fn has_entered(&self) -> bool {
        self.has_entered
    }
}

/// Asks the teleport orchestrator to move the visitor into `room`.
#[derive(Message, Clone, Copy, Debug)]
pub struct TeleportRequest {
    /// Destination room.
    pub room: RoomKind,
}
