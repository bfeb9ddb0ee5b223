use bevy::prelude::*;

use crate::door::DoorId;
use crate::math;
use crate::tween::{TweenScheduler, TweenTarget};

/// Marker for the rendering camera (child of [`CameraMount`]).
#[derive(Component, Reflect)]
pub struct CorridorCamera;

/// Parent of the camera that applies a slow ambient sway.
#[derive(Component, Reflect)]
pub struct CameraMount;

/// World-space camera position and Euler orientation (YXZ order).
#[derive(Clone, Copy, Debug, PartialEq, Reflect)]
pub struct CameraPose {
    /// World position.
    pub position: Vec3,
    /// Rotation about world Y. Zero looks down `-Z`, positive turns left.
    pub yaw: f32,
    /// Rotation about local X. Positive looks up.
    pub pitch: f32,
    /// Rotation about local Z.
    pub roll: f32,
}

impl Default for CameraPose {
    fn default() -> Self {
        Self::looking_down_corridor(Vec3::ZERO)
    }
}

impl CameraPose {
    /// A level pose at `position` facing along `-Z`.
    pub fn looking_down_corridor(position: Vec3) -> Self {
        Self {
            position,
            yaw: 0.0,
            pitch: 0.0,
            roll: 0.0,
        }
    }

    /// Orientation as a quaternion.
    pub fn rotation(&self) -> Quat {
        Quat::from_euler(EulerRot::YXZ, self.yaw, self.pitch, self.roll)
    }

    /// Unit vector the camera looks along.
    pub fn forward(&self) -> Vec3 {
        self.rotation() * Vec3::NEG_Z
    }

    /// Builds a pose from a world transform.
    pub fn from_transform(transform: &Transform) -> Self {
        let (yaw, pitch, roll) = transform.rotation.to_euler(EulerRot::YXZ);
        Self {
            position: transform.translation,
            yaw,
            pitch,
            roll,
        }
    }

    /// Interpolates position linearly and each angle along its shortest arc.
    pub fn lerp(&self, other: &CameraPose, t: f32) -> Self {
        Self {
            position: self.position.lerp(other.position, t),
            yaw: math::lerp_angle(self.yaw, other.yaw, t),
            pitch: math::lerp_angle(self.pitch, other.pitch, t),
            roll: math::lerp_angle(self.roll, other.roll, t),
        }
    }

    /// Same orientation, moved `distance` along the facing direction.
    pub fn advanced(&self, distance: f32) -> Self {
        Self {
            position: self.position + self.forward() * distance,
            ..*self
        }
    }

    /// Same position and yaw with pitch and roll levelled out.
    pub fn levelled(&self) -> Self {
        Self {
            pitch: 0.0,
            roll: 0.0,
            ..*self
        }
    }
}

/// Holder of a temporary exclusive camera override.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Reflect)]
pub enum CameraOwner {
    /// Loading / entrance choreography.
    Phase,
    /// A door running its enter or exit sequence.
    Door(DoorId),
    /// The teleport orchestrator, while the screen is covered.
    Teleport,
}

/// Identifies a write to the camera pose.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Reflect)]
pub enum CameraWriter {
    /// The continuous scroll/parallax/glance controller.
    Controller,
    /// An override holder.
    Owner(CameraOwner),
}

/// Who may write the camera pose this frame.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Reflect)]
pub enum Authority {
    /// The controller drives the camera.
    #[default]
    Automatic,
    /// One owner has exclusive control; the controller is inert.
    Overridden(CameraOwner),
}

/// The single shared camera state.
///
/// Every write goes through [`CameraRig::write`], which rejects writers that do
/// not hold authority. The rig remembers who wrote during the current frame so
/// the apply step (and tests) can verify there was exactly one writer.
#[derive(Resource, Debug, Default, Reflect)]
pub struct CameraRig {
    pose: CameraPose,
    authority: Authority,
    released: bool,
    ambient_yaw: f32,
    frame_writers: Vec<CameraWriter>,
}

impl CameraRig {
    /// Rig starting at `pose` with the given authority.
    pub fn new(pose: CameraPose, authority: Authority) -> Self {
        Self {
            pose,
            authority,
            released: false,
            ambient_yaw: 0.0,
            frame_writers: Vec::new(),
        }
    }

    /// Current world pose.
    pub fn pose(&self) -> CameraPose {
        self.pose
    }

    /// Pose as currently seen on screen, including the mount's ambient sway.
    ///
    /// Override holders write world-exact poses, so sway only shows while the
    /// controller is in charge.
    pub fn live_pose(&self) -> CameraPose {
        if self.is_automatic() {
            CameraPose {
                yaw: self.pose.yaw + self.ambient_yaw,
                ..self.pose
            }
        } else {
            self.pose
        }
    }

    /// Records the mount's sway for this frame.
    pub fn set_ambient_yaw(&mut self, yaw: f32) {
        self.ambient_yaw = yaw;
    }

    /// Current authority.
    pub fn authority(&self) -> Authority {
        self.authority
    }

    /// True when the continuous controller owns the camera.
    pub fn is_automatic(&self) -> bool {
        self.authority == Authority::Automatic
    }

    /// True when `owner` holds the override.
    pub fn is_held_by(&self, owner: CameraOwner) -> bool {
        self.authority == Authority::Overridden(owner)
    }

    /// Whether `writer` may write the pose right now.
    pub fn may_write(&self, writer: CameraWriter) -> bool {
        match (writer, self.authority) {
            (CameraWriter::Controller, Authority::Automatic) => true,
            (CameraWriter::Owner(owner), Authority::Overridden(holder)) => owner == holder,
            _ => false,
        }
    }

    /// Writes the pose if `writer` holds authority. Returns `false` otherwise.
    pub fn write(&mut self, writer: CameraWriter, pose: CameraPose) -> bool {
        if !self.may_write(writer) {
            warn!(
                "camera write by {writer:?} rejected, authority is {:?}",
                self.authority
            );
            return false;
        }
        self.pose = pose;
        self.frame_writers.push(writer);
        true
    }

    /// Takes exclusive control from the controller.
    ///
    /// Cancels every tween still animating the camera so no leftover animation
    /// fights the new owner. Fails if someone else already holds the override.
    pub fn request_override(&mut self, owner: CameraOwner, tweens: &mut TweenScheduler) -> bool {
        match self.authority {
            Authority::Automatic => {}
            Authority::Overridden(holder) if holder == owner => return true,
            Authority::Overridden(holder) => {
                debug!("override for {owner:?} refused, held by {holder:?}");
                return false;
            }
        }
        let cancelled = tweens.cancel_on(TweenTarget::Camera);
        if cancelled > 0 {
            debug!("override for {owner:?} cancelled {cancelled} camera tweens");
        }
        self.authority = Authority::Overridden(owner);
        self.released = false;
        true
    }

    /// Hands an override from `from` to `to` without passing through automatic.
    pub fn transfer_override(
        &mut self,
        from: CameraOwner,
        to: CameraOwner,
        tweens: &mut TweenScheduler,
    ) -> bool {
        if !self.is_held_by(from) {
            return false;
        }
        tweens.cancel_on(TweenTarget::Camera);
        self.authority = Authority::Overridden(to);
        true
    }

    /// Returns control to the controller. Only the holder may release.
    ///
    /// The held pose is world-exact, but once automatic the mount's sway is
    /// added on top. The stored yaw is moved into mount space so the view
    /// stays put on the release frame.
    pub fn release_override(&mut self, owner: CameraOwner) -> bool {
        if !self.is_held_by(owner) {
            return false;
        }
        self.pose.yaw -= self.ambient_yaw;
        self.authority = Authority::Automatic;
        self.released = true;
        true
    }

    /// Consumes the one-shot "just released" flag.
    pub fn take_released(&mut self) -> bool {
        std::mem::take(&mut self.released)
    }

    /// Writers recorded since the last [`begin_frame`](Self::begin_frame).
    pub fn frame_writers(&self) -> &[CameraWriter] {
        &self.frame_writers
    }

    /// Starts a new frame of write tracking.
    pub fn begin_frame(&mut self) {
        self.frame_writers.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn controller_cannot_write_while_overridden() {
        let mut tweens = TweenScheduler::default();
        let mut rig = CameraRig::default();
        assert!(rig.request_override(CameraOwner::Door(DoorId(2)), &mut tweens));
        let before = rig.pose();
        let moved = CameraPose::looking_down_corridor(Vec3::new(0.0, 0.0, -50.0));
        assert!(!rig.write(CameraWriter::Controller, moved));
        assert_eq!(rig.pose(), before);
        assert!(rig.write(CameraWriter::Owner(CameraOwner::Door(DoorId(2))), moved));
        assert_eq!(rig.pose(), moved);
    }

    #[test]
    fn second_owner_is_refused() {
        let mut tweens = TweenScheduler::default();
        let mut rig = CameraRig::default();
        assert!(rig.request_override(CameraOwner::Door(DoorId(0)), &mut tweens));
        assert!(!rig.request_override(CameraOwner::Door(DoorId(1)), &mut tweens));
        assert!(!rig.release_override(CameraOwner::Door(DoorId(1))));
        assert!(rig.is_held_by(CameraOwner::Door(DoorId(0))));
    }

    #[test]
    fn override_cancels_leftover_camera_tweens() {
        use crate::tween::{Ease, TweenSpec, TweenState};
        let mut tweens = TweenScheduler::default();
        let walk = tweens.animate(TweenTarget::Camera, TweenSpec::new(3.0, Ease::Linear));
        let mut rig = CameraRig::default();
        rig.request_override(CameraOwner::Teleport, &mut tweens);
        assert_eq!(tweens.state(walk), TweenState::Gone);
    }

    #[test]
    fn release_latches_once() {
        let mut tweens = TweenScheduler::default();
        let mut rig = CameraRig::default();
        rig.request_override(CameraOwner::Phase, &mut tweens);
        assert!(rig.release_override(CameraOwner::Phase));
        assert!(rig.is_automatic());
        assert!(rig.take_released());
        assert!(!rig.take_released());
    }

    #[test]
    fn transfer_keeps_camera_overridden() {
        let mut tweens = TweenScheduler::default();
        let mut rig = CameraRig::default();
        rig.request_override(CameraOwner::Teleport, &mut tweens);
        assert!(rig.transfer_override(
            CameraOwner::Teleport,
            CameraOwner::Door(DoorId(5)),
            &mut tweens
        ));
        assert!(rig.is_held_by(CameraOwner::Door(DoorId(5))));
        assert!(!rig.take_released());
    }

    #[test]
    fn live_pose_includes_sway_only_when_automatic() {
        let mut tweens = TweenScheduler::default();
        let mut rig = CameraRig::default();
        rig.set_ambient_yaw(0.01);
        assert!((rig.live_pose().yaw - 0.01).abs() < 1e-6);
        rig.request_override(CameraOwner::Phase, &mut tweens);
        assert_eq!(rig.live_pose().yaw, 0.0);
    }

    #[test]
    fn release_keeps_the_on_screen_yaw() {
        let mut tweens = TweenScheduler::default();
        let mut rig = CameraRig::default();
        rig.set_ambient_yaw(0.012);
        rig.request_override(CameraOwner::Teleport, &mut tweens);
        let held = CameraPose {
            yaw: 0.3,
            ..CameraPose::default()
        };
        rig.write(CameraWriter::Owner(CameraOwner::Teleport), held);
        assert_eq!(rig.live_pose().yaw, 0.3);
        rig.release_override(CameraOwner::Teleport);
        assert!((rig.live_pose().yaw - 0.3).abs() < 1e-6);
        assert!((rig.pose().yaw - 0.288).abs() < 1e-6);
        assert_eq!(rig.pose().position, held.position);
    }

    #[test]
    fn pose_round_trips_through_transform() {
        let pose = CameraPose {
            position: Vec3::new(1.0, 2.0, 3.0),
            yaw: 0.4,
            pitch: -0.1,
            roll: 0.05,
        };
        let tf = Transform::from_translation(pose.position).with_rotation(pose.rotation());
        let back = CameraPose::from_transform(&tf);
        assert!((back.yaw - pose.yaw).abs() < 1e-4);
        assert!((back.pitch - pose.pitch).abs() < 1e-4);
        assert!((back.roll - pose.roll).abs() < 1e-4);
    }

    #[test]
    fn positive_yaw_turns_left() {
        let pose = CameraPose {
            yaw: std::f32::consts::FRAC_PI_2,
            ..CameraPose::default()
        };
        assert!((pose.forward() - Vec3::NEG_X).length() < 1e-5);
    }
}
