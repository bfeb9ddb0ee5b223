use bevy::prelude::*;

use super::CameraConfig;
use super::entities::{CameraPose, CameraRig, CameraWriter};
use crate::math;
use crate::phase::InputChannels;
use crate::segments::CorridorLayout;

/// Raw input gathered for one frame.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct FrameInput {
    /// Forward travel requested this frame, in world units (positive = deeper).
    pub scroll: f32,
    /// Pointer position normalised to `[-1, 1]²`, `+y` up. `None` when unknown.
    pub pointer: Option<Vec2>,
}

/// Continuous scroll / parallax / glance camera controller.
///
/// Runs only while the rig is automatic. While someone else holds the
/// override the controller keeps its last values untouched, and on release it
/// re-derives all of them from the actual camera pose.
#[derive(Resource, Debug, Clone, Reflect)]
pub struct CameraController {
    scroll_target: f32,
    scroll_current: f32,
    parallax_target: Vec2,
    parallax_current: Vec2,
    glance_target: f32,
    glance_current: f32,
    segment: i64,
}

impl CameraController {
    /// Controller at rest at depth `z`.
    pub fn new(z: f32, layout: &CorridorLayout) -> Self {
        Self {
            scroll_target: z,
            scroll_current: z,
            parallax_target: Vec2::ZERO,
            parallax_current: Vec2::ZERO,
            glance_target: 0.0,
            glance_current: 0.0,
            segment: layout.segment_index(z),
        }
    }

    /// Smoothed camera depth.
    pub fn scroll_current(&self) -> f32 {
        self.scroll_current
    }

    /// Depth the camera is heading toward.
    pub fn scroll_target(&self) -> f32 {
        self.scroll_target
    }

    /// Smoothed parallax offset.
    pub fn parallax_current(&self) -> Vec2 {
        self.parallax_current
    }

    /// Smoothed glance (radians, positive = toward the right wall).
    pub fn glance_current(&self) -> f32 {
        self.glance_current
    }

    /// Glance the controller is easing toward.
    pub fn glance_target(&self) -> f32 {
        self.glance_target
    }

    /// Segment index the scroll position was last seen in.
    pub fn segment(&self) -> i64 {
        self.segment
    }

    /// Advances one frame. Returns the new segment index when it changed.
    pub fn update(
        &mut self,
        input: &FrameInput,
        channels: InputChannels,
        dt: f32,
        rig: &mut CameraRig,
        layout: &CorridorLayout,
        cfg: &CameraConfig,
    ) -> Option<i64> {
        // The released pose is still on screen this frame; writing it again
        // would make a second writer.
        if rig.take_released() {
            self.resync(&rig.pose(), layout, cfg);
            return None;
        }
        if !rig.is_automatic() || !channels.scroll {
            return None;
        }

        // 1. input
        self.scroll_target = (self.scroll_target - input.scroll).min(cfg.rest_z);
        if channels.parallax
            && let Some(pointer) = input.pointer
        {
            self.parallax_target =
                pointer.clamp(Vec2::NEG_ONE, Vec2::ONE) * cfg.parallax_intensity;
        } else if !channels.parallax {
            self.parallax_target = Vec2::ZERO;
        }

        // 2. smoothing
        self.scroll_current =
            math::smooth_toward(self.scroll_current, self.scroll_target, cfg.scroll_smoothing, dt);
        let k = math::exp_smoothing(cfg.parallax_smoothing, dt);
        self.parallax_current += (self.parallax_target - self.parallax_current) * k;

        // 3. glance
        self.glance_target = if channels.glance {
            glance_target_at(self.scroll_current, layout, cfg)
        } else {
            0.0
        };
        let rate = if self.glance_target.abs() < self.glance_current.abs() {
            cfg.glance_release_rate
        } else {
            cfg.glance_engage_rate
        };
        self.glance_current =
            math::smooth_toward(self.glance_current, self.glance_target, rate, dt);

        // 4. pose
        rig.write(CameraWriter::Controller, self.pose(cfg));

        // 5. segment tracking
        let segment = layout.segment_index(self.scroll_current);
        if segment != self.segment {
            self.segment = segment;
            return Some(segment);
        }
        None
    }

    /// Pose implied by the current smoothed values.
    pub fn pose(&self, cfg: &CameraConfig) -> CameraPose {
        let p = self.parallax_current;
        CameraPose {
            position: Vec3::new(
                p.x * cfg.parallax_offset.x,
                cfg.eye_height + p.y * cfg.parallax_offset.y,
                self.scroll_current,
            ),
            yaw: p.x * cfg.parallax_look.x - self.glance_current,
            pitch: -p.y * cfg.parallax_look.y,
            roll: 0.0,
        }
    }

    /// Re-derives every smoothed value from the pose another writer left behind.
    ///
    /// `pose` is in mount space, as [`CameraRig::release_override`] leaves it.
    /// The glance is initialised from the actual yaw when it differs from the
    /// ideal glance at the new depth by more than the recovery epsilon, and then
    /// eases toward the ideal instead of snapping.
    pub fn resync(&mut self, pose: &CameraPose, layout: &CorridorLayout, cfg: &CameraConfig) {
        let z = pose.position.z;
        self.scroll_current = z;
        self.scroll_target = z;

        let offset = cfg.parallax_offset.max(Vec2::splat(f32::EPSILON));
        let parallax = Vec2::new(
            pose.position.x / offset.x,
            (pose.position.y - cfg.eye_height) / offset.y,
        )
        .clamp(Vec2::splat(-cfg.parallax_intensity), Vec2::splat(cfg.parallax_intensity));
        self.parallax_current = parallax;
        self.parallax_target = parallax;

        let ideal = glance_target_at(z, layout, cfg);
        let derived = math::wrap_angle(parallax.x * cfg.parallax_look.x - pose.yaw);
        self.glance_target = ideal;
        self.glance_current = if (derived - ideal).abs() > cfg.glance_recovery_epsilon {
            debug!("glance recovery: derived {derived:.3} vs ideal {ideal:.3}");
            derived
        } else {
            ideal
        };
        self.segment = layout.segment_index(z);
    }
}

/// Strongest proximity glance among the doors around depth `z`.
///
/// Left doors pull the glance negative, right doors positive.
pub fn glance_target_at(z: f32, layout: &CorridorLayout, cfg: &CameraConfig) -> f32 {
    layout
        .doors_near(z)
        .map(|door| {
            let strength = cfg.glance.strength(z - door.position.z);
            (strength, door.side.sign())
        })
        .filter(|(strength, _)| *strength > 0.0)
        .max_by(|a, b| a.0.total_cmp(&b.0))
        .map_or(0.0, |(strength, sign)| sign * strength * cfg.glance_intensity)
}
