//! Minimal tween timeline.
//!
//! Tracks only the clock of each animation: owners remember the [`TweenId`] they
//! started and interpolate their own values from the eased progress. A track
//! reports [`TweenState::Finished`] for exactly one frame after completing, so a
//! cancelled or superseded tween can never deliver a late completion.

use bevy::prelude::*;

use crate::door::DoorId;
use crate::math;

/// Handle to a scheduled tween.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Reflect)]
pub struct TweenId(u64);

/// What a tween animates. Used for bulk cancellation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Reflect)]
pub enum TweenTarget {
    /// The shared camera pose.
    Camera,
    /// Local geometry of one corridor door (panel, handle).
    Door(DoorId),
    /// The entrance double door.
    Entrance,
}

/// Easing curve applied to a track's linear progress.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Reflect)]
pub enum Ease {
    /// Constant speed.
    Linear,
    /// Fast start, gentle stop.
    #[default]
    OutCubic,
    /// Slow start and stop.
    InOutCubic,
    /// Softer slow start and stop.
    InOutSine,
}

impl Ease {
    /// Maps linear progress in `[0, 1]` to eased progress.
    pub fn apply(self, t: f32) -> f32 {
        let t = t.clamp(0.0, 1.0);
        match self {
            Ease::Linear => t,
            Ease::OutCubic => math::ease_out_cubic(t),
            Ease::InOutCubic => math::ease_in_out_cubic(t),
            Ease::InOutSine => math::ease_in_out_sine(t),
        }
    }
}

/// Duration, start offset, and easing for one track.
#[derive(Clone, Copy, Debug, PartialEq, Reflect)]
pub struct TweenSpec {
    /// Seconds from start to finish (after the delay).
    pub duration: f32,
    /// Seconds to wait before progress starts moving.
    pub delay: f32,
    /// Easing curve.
    pub ease: Ease,
}

impl TweenSpec {
    /// A spec with no delay.
    pub fn new(duration: f32, ease: Ease) -> Self {
        Self {
            duration,
            delay: 0.0,
            ease,
        }
    }

    /// Same spec, starting `delay` seconds later.
    pub fn after(mut self, delay: f32) -> Self {
        self.delay = delay;
        self
    }
}

/// Observed state of a tween for the current frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum TweenState {
    /// Still running; carries eased progress in `[0, 1)`.
    Running(f32),
    /// Completed during the latest [`TweenScheduler::advance`].
    Finished,
    /// Unknown, cancelled, or finished on an earlier frame.
    Gone,
}

#[derive(Clone, Debug)]
struct Track {
    id: TweenId,
    target: TweenTarget,
    spec: TweenSpec,
    elapsed: f32,
}

impl Track {
    fn progress(&self) -> f32 {
        if self.spec.duration <= 0.0 {
            return if self.elapsed >= self.spec.delay { 1.0 } else { 0.0 };
        }
        ((self.elapsed - self.spec.delay) / self.spec.duration).clamp(0.0, 1.0)
    }

    fn done(&self) -> bool {
        self.elapsed >= self.spec.delay + self.spec.duration
    }
}

/// Scheduler for every tween in the scene.
#[derive(Resource, Default)]
pub struct TweenScheduler {
    next_id: u64,
    tracks: Vec<Track>,
    finished: Vec<TweenId>,
}

impl TweenScheduler {
    /// Starts a new track and returns its handle.
    pub fn animate(&mut self, target: TweenTarget, spec: TweenSpec) -> TweenId {
        self.next_id += 1;
        let id = TweenId(self.next_id);
        self.tracks.push(Track {
            id,
            target,
            spec,
            elapsed: 0.0,
        });
        id
    }

    /// Advances every track by `dt` seconds.
    ///
    /// Tracks that complete are reported as [`TweenState::Finished`] until the
    /// next call.
    pub fn advance(&mut self, dt: f32) {
        self.finished.clear();
        for track in &mut self.tracks {
            track.elapsed += dt;
        }
        let finished = &mut self.finished;
        self.tracks.retain(|track| {
            if track.done() {
                finished.push(track.id);
                false
            } else {
                true
            }
        });
    }

    /// Completes every running track on the next observation.
    pub fn fast_forward(&mut self) {
        self.finished.clear();
        self.finished.extend(self.tracks.drain(..).map(|t| t.id));
    }

    /// State of `id` for the current frame.
    pub fn state(&self, id: TweenId) -> TweenState {
        if self.finished.contains(&id) {
            return TweenState::Finished;
        }
        match self.tracks.iter().find(|t| t.id == id) {
            Some(track) => TweenState::Running(track.spec.ease.apply(track.progress())),
            None => TweenState::Gone,
        }
    }

    /// Eased progress of `id`, treating a finished track as `1.0`.
    pub fn progress(&self, id: TweenId) -> Option<f32> {
        match self.state(id) {
            TweenState::Running(p) => Some(p),
            TweenState::Finished => Some(1.0),
            TweenState::Gone => None,
        }
    }

    /// True if `id` completed during the latest advance.
    #[cfg(test)]
    pub fn is_finished(&self, id: TweenId) -> bool {
        self.finished.contains(&id)
    }

    /// Cancels one track. Its completion will never be reported.
    pub fn cancel(&mut self, id: TweenId) {
        self.tracks.retain(|t| t.id != id);
        self.finished.retain(|f| *f != id);
    }

    /// Cancels every track animating `target`. Returns how many were running.
    pub fn cancel_on(&mut self, target: TweenTarget) -> usize {
        let before = self.tracks.len();
        let cancelled: Vec<TweenId> = self
            .tracks
            .iter()
            .filter(|t| t.target == target)
            .map(|t| t.id)
            .collect();
        self.tracks.retain(|t| t.target != target);
        self.finished.retain(|f| !cancelled.contains(f));
        before - self.tracks.len()
    }

    /// Number of running tracks animating `target`.
    #[cfg(test)]
    pub fn running_on(&self, target: TweenTarget) -> usize {
        self.tracks.iter().filter(|t| t.target == target).count()
    }
}

/// Advances the scheduler by the frame's delta time.
pub fn advance_tweens(time: Res<Time>, mut scheduler: ResMut<TweenScheduler>) {
    scheduler.advance(time.delta_secs());
}
