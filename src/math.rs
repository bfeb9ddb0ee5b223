//! Pure computation helpers extracted for testability.
//!
//! All functions in this module are free of Bevy ECS dependencies and operate
//! on plain numeric / `Vec3` inputs, making them straightforward to unit-test.

use std::f32::consts::{PI, TAU};

use bevy::prelude::{Reflect, Vec2, Vec3};

/// Linear interpolation between `a` and `b`.
pub fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

/// Cubic ease-out curve: fast start, gentle deceleration.
///
/// `t` should be in `[0, 1]`. Returns `1 - (1 - t)^3`.
pub fn ease_out_cubic(t: f32) -> f32 {
    1.0 - (1.0 - t).powi(3)
}

/// Cubic ease-in-out: slow start, fast middle, slow end.
pub fn ease_in_out_cubic(t: f32) -> f32 {
    if t < 0.5 {
        4.0 * t * t * t
    } else {
        1.0 - (-2.0 * t + 2.0).powi(3) / 2.0
    }
}

/// Sinusoidal ease-in-out, used for the camera flights.
pub fn ease_in_out_sine(t: f32) -> f32 {
    -((PI * t).cos() - 1.0) / 2.0
}

/// Hermite smoothstep of `t` clamped to `[0, 1]`.
///
/// Symmetric around `0.5`, so the midpoint of a ramp maps to exactly half strength.
pub fn smoothstep(t: f32) -> f32 {
    let t = t.clamp(0.0, 1.0);
    t * t * (3.0 - 2.0 * t)
}

/// Frame-rate independent exponential smoothing factor.
///
/// `value += (target - value) * exp_smoothing(rate, dt)` converges at the same
/// speed regardless of the display refresh rate.
pub fn exp_smoothing(rate: f32, dt: f32) -> f32 {
    1.0 - (-rate * dt).exp()
}

/// Moves `current` toward `target` by one exponential smoothing step.
pub fn smooth_toward(current: f32, target: f32, rate: f32, dt: f32) -> f32 {
    current + (target - current) * exp_smoothing(rate, dt)
}

/// Wraps an angle into `(-PI, PI]`.
pub fn wrap_angle(angle: f32) -> f32 {
    let wrapped = (angle + PI).rem_euclid(TAU) - PI;
    if wrapped <= -PI { wrapped + TAU } else { wrapped }
}

/// Interpolates between two angles along the shortest arc.
pub fn lerp_angle(a: f32, b: f32, t: f32) -> f32 {
    a + wrap_angle(b - a) * t
}

/// Distance thresholds for a proximity ramp along the travel axis.
///
/// Distances are signed: positive while the point of interest is still ahead
/// of the camera, negative once it has been passed.
#[derive(Clone, Copy, Debug, PartialEq, Reflect)]
pub struct ProximityCurve {
    /// Distance at which the effect starts ramping up.
    pub start: f32,
    /// Distance at which the effect is at full strength.
    pub peak: f32,
    /// Distance (usually just past the point) at which the effect is gone again.
    pub end: f32,
}

impl ProximityCurve {
    /// Eased strength in `[0, 1]` for a signed distance.
    ///
    /// Zero outside `(end, start)`, one at `peak`, smoothstep ramps on both sides.
    pub fn strength(&self, distance: f32) -> f32 {
        if distance >= self.start || distance <= self.end {
            return 0.0;
        }
        if distance >= self.peak {
            smoothstep((self.start - distance) / (self.start - self.peak))
        } else {
            smoothstep((distance - self.end) / (self.peak - self.end))
        }
    }
}

/// Intersects a ray with a rectangular panel.
///
/// The panel is centred at `center`, faces along `normal`, and spans
/// `half_extents.x` along `tangent` and `half_extents.y` along world up.
/// Returns the distance along the ray on a hit.
pub fn ray_hits_panel(
    origin: Vec3,
    direction: Vec3,
    center: Vec3,
    normal: Vec3,
    tangent: Vec3,
    half_extents: Vec2,
) -> Option<f32> {
    let denom = direction.dot(normal);
    if denom.abs() < 1e-6 {
        return None;
    }
    let t = (center - origin).dot(normal) / denom;
    if t <= 0.0 {
        return None;
    }
    let local = origin + direction * t - center;
    let u = local.dot(tangent);
    let v = local.y;
    (u.abs() <= half_extents.x && v.abs() <= half_extents.y).then_some(t)
}

#[cfg(test)]
mod tests {
    use super::*;

    // ── easing ──────────────────────────────────────────────────────

    #[test]
    fn ease_at_zero_is_zero() {
        assert_eq!(ease_out_cubic(0.0), 0.0);
        assert_eq!(ease_in_out_cubic(0.0), 0.0);
        assert!(ease_in_out_sine(0.0).abs() < 1e-6);
    }

    #[test]
    fn ease_at_one_is_one() {
        assert_eq!(ease_out_cubic(1.0), 1.0);
        assert_eq!(ease_in_out_cubic(1.0), 1.0);
        assert!((ease_in_out_sine(1.0) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn ease_out_is_ahead_of_linear_at_half() {
        assert!(ease_out_cubic(0.5) > 0.5);
    }

    #[test]
    fn easings_are_monotonically_increasing() {
        for ease in [ease_out_cubic, ease_in_out_cubic, ease_in_out_sine, smoothstep] {
            let steps: Vec<f32> = (0..=100).map(|i| ease(i as f32 / 100.0)).collect();
            for w in steps.windows(2) {
                assert!(w[1] >= w[0] - 1e-6, "easing must be non-decreasing");
            }
        }
    }

    #[test]
    fn smoothstep_midpoint_is_half() {
        assert!((smoothstep(0.5) - 0.5).abs() < 1e-6);
    }

    // ── smoothing ───────────────────────────────────────────────────

    #[test]
    fn exp_smoothing_is_frame_rate_independent() {
        let rate = 6.0;
        let mut a = 0.0;
        for _ in 0..60 {
            a = smooth_toward(a, 10.0, rate, 1.0 / 60.0);
        }
        let mut b = 0.0;
        for _ in 0..120 {
            b = smooth_toward(b, 10.0, rate, 1.0 / 120.0);
        }
        assert!((a - b).abs() < 1e-3, "{a} vs {b}");
    }

    #[test]
    fn exp_smoothing_with_zero_dt_does_not_move() {
        assert_eq!(smooth_toward(3.0, 10.0, 8.0, 0.0), 3.0);
    }

    // ── angles ──────────────────────────────────────────────────────

    #[test]
    fn wrap_angle_keeps_small_angles() {
        assert!((wrap_angle(0.3) - 0.3).abs() < 1e-6);
        assert!((wrap_angle(-0.3) + 0.3).abs() < 1e-6);
    }

    #[test]
    fn wrap_angle_folds_full_turns() {
        assert!((wrap_angle(TAU + 0.2) - 0.2).abs() < 1e-5);
        assert!((wrap_angle(-TAU - 0.2) + 0.2).abs() < 1e-5);
    }

    #[test]
    fn lerp_angle_takes_short_way_round() {
        let mid = lerp_angle(PI - 0.1, -PI + 0.1, 0.5);
        assert!((wrap_angle(mid).abs() - PI).abs() < 1e-4);
    }

    // ── proximity curve ─────────────────────────────────────────────

    fn curve() -> ProximityCurve {
        ProximityCurve {
            start: 20.0,
            peak: 8.0,
            end: 1.0,
        }
    }

    #[test]
    fn proximity_is_zero_outside_range() {
        assert_eq!(curve().strength(25.0), 0.0);
        assert_eq!(curve().strength(20.0), 0.0);
        assert_eq!(curve().strength(1.0), 0.0);
        assert_eq!(curve().strength(-5.0), 0.0);
    }

    #[test]
    fn proximity_peaks_at_peak() {
        assert!((curve().strength(8.0) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn proximity_is_half_between_peak_and_start() {
        assert!((curve().strength(14.0) - 0.5).abs() < 1e-6);
    }

    #[test]
    fn proximity_rises_monotonically_on_approach() {
        let mut last = 0.0;
        let mut d = 20.0;
        while d >= 8.0 {
            let s = curve().strength(d);
            assert!(s >= last - 1e-6);
            last = s;
            d -= 0.25;
        }
    }

    // ── ray_hits_panel ──────────────────────────────────────────────

    #[test]
    fn ray_hits_panel_in_front() {
        let hit = ray_hits_panel(
            Vec3::new(0.0, 1.6, 5.0),
            Vec3::NEG_Z,
            Vec3::new(0.0, 1.6, 0.0),
            Vec3::Z,
            Vec3::X,
            Vec2::new(1.0, 2.0),
        );
        assert!((hit.unwrap() - 5.0).abs() < 1e-5);
    }

    #[test]
    fn ray_misses_panel_outside_extents() {
        let hit = ray_hits_panel(
            Vec3::new(3.0, 1.6, 5.0),
            Vec3::NEG_Z,
            Vec3::new(0.0, 1.6, 0.0),
            Vec3::Z,
            Vec3::X,
            Vec2::new(1.0, 2.0),
        );
        assert!(hit.is_none());
    }

    #[test]
    fn ray_ignores_panel_behind_origin() {
        let hit = ray_hits_panel(
            Vec3::new(0.0, 1.6, 5.0),
            Vec3::Z,
            Vec3::new(0.0, 1.6, 0.0),
            Vec3::Z,
            Vec3::X,
            Vec2::new(1.0, 2.0),
        );
        assert!(hit.is_none());
    }
}
