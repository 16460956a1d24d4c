//! Fixed three-level orbital hierarchy: the sun is the root, the planet orbits
//! the sun, the moon orbits the planet. Every transform is recomputed from the
//! animation time alone; composition order is significant.
use std::f32::consts::TAU;

use glam::{Mat4, Vec3, Vec4};

pub const SUN_OFFSET: Vec3 = Vec3::new(0.0, 0.0, 12.0);
pub const SUN_SCALE: f32 = 4.0;

pub const ORBIT_RADIUS: f32 = 12.0;
/// One orbit every 12 seconds.
pub const ORBIT_SPEED: f32 = TAU / 12.0;
/// One planet day every 5 seconds.
pub const SPIN_SPEED: f32 = TAU / 5.0;

pub const MOON_ORBIT_RADIUS: f32 = 1.5;
pub const MOON_ORBIT_SPEED: f32 = TAU / 4.0;
/// Inclination of the moon's orbital plane, radians about X.
pub const MOON_TILT: f32 = 0.45;
pub const MOON_SCALE: f32 = 0.27;

/// Model matrix of the background pass: identity scaled by 5000 in every entry.
pub const BACKGROUND_MODEL: Mat4 = Mat4::from_cols(
    Vec4::new(5000.0, 0.0, 0.0, 0.0),
    Vec4::new(0.0, 5000.0, 0.0, 0.0),
    Vec4::new(0.0, 0.0, 5000.0, 0.0),
    Vec4::new(0.0, 0.0, 0.0, 5000.0),
);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BodyKind {
    Sun,
    /// The planet's orbit basis: where it sits, without its own spin.
    Planet,
    /// The planet as drawn: orbit basis followed by spin.
    PlanetOnly,
    Moon,
}

pub fn model_transform(kind: BodyKind, t: f32) -> Mat4 {
    match kind {
        BodyKind::Sun => {
            Mat4::from_translation(SUN_OFFSET) * Mat4::from_scale(Vec3::splat(SUN_SCALE))
        }
        BodyKind::Planet => planet_orbit_basis(t),
        BodyKind::PlanetOnly => planet_orbit_basis(t) * planet_spin(t),
        BodyKind::Moon => planet_orbit_basis(t) * planet_spin(t) * moon_local(t),
    }
}

/// World-space centre of the planet.
pub fn planet_position(t: f32) -> Vec3 {
    model_transform(BodyKind::PlanetOnly, t).w_axis.truncate()
}

fn planet_orbit_basis(t: f32) -> Mat4 {
    Mat4::from_translation(SUN_OFFSET)
        * Mat4::from_rotation_y(t * ORBIT_SPEED)
        * Mat4::from_translation(Vec3::new(ORBIT_RADIUS, 0.0, 0.0))
}

fn planet_spin(t: f32) -> Mat4 {
    Mat4::from_rotation_y(t * SPIN_SPEED)
}

/// Moon relative to the spinning planet frame.
fn moon_local(t: f32) -> Mat4 {
    Mat4::from_rotation_y(t * MOON_ORBIT_SPEED)
        * Mat4::from_rotation_x(MOON_TILT)
        * Mat4::from_translation(Vec3::new(MOON_ORBIT_RADIUS, 0.0, 0.0))
        * Mat4::from_scale(Vec3::splat(MOON_SCALE))
}
