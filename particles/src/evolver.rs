//! Particle evolvers: each one changes particle properties over time, independently of the others.

use std::fmt;

use glam::Vec3;

use crate::particle_set::ParticleSet;

/// Stable handle returned by `ParticleSystem::add_evolver`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct EvolverId(pub(crate) u32);

pub trait ParticleEvolver: Send + fmt::Debug {
    fn evolve(&self, particles: &mut ParticleSet, dt: f32);
}

/// Constant acceleration, e.g. wind.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ForceEvolver {
    pub acceleration: Vec3,
}

impl ParticleEvolver for ForceEvolver {
    fn evolve(&self, particles: &mut ParticleSet, dt: f32) {
        for p in particles.iter_mut() {
            p.velocity += self.acceleration * dt;
        }
    }
}

/// Exponential velocity damping.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DragEvolver {
    pub drag: f32,
}

impl ParticleEvolver for DragEvolver {
    fn evolve(&self, particles: &mut ParticleSet, dt: f32) {
        let factor = (-self.drag.max(0.0) * dt).exp();
        for p in particles.iter_mut() {
            p.velocity *= factor;
        }
    }
}

/// Linear color blend from spawn to death.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ColorOverLifetimeEvolver {
    pub start: [f32; 4],
    pub end: [f32; 4],
}

impl ParticleEvolver for ColorOverLifetimeEvolver {
    fn evolve(&self, particles: &mut ParticleSet, _dt: f32) {
        for p in particles.iter_mut() {
            let t = p.normalized_age();
            for c in 0..4 {
                p.color[c] = self.start[c] + (self.end[c] - self.start[c]) * t;
            }
        }
    }
}

/// Spins particles around their billboard normal.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RotationEvolver {
    /// Radians per second.
    pub speed: f32,
}

impl ParticleEvolver for RotationEvolver {
    fn evolve(&self, particles: &mut ParticleSet, dt: f32) {
        for p in particles.iter_mut() {
            p.rotation = (p.rotation + self.speed * dt).rem_euclid(std::f32::consts::TAU);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::particle_set::Particle;

    fn set_with(lifetime: f32, initial_lifetime: f32) -> ParticleSet {
        let mut set = ParticleSet::new(4);
        set.spawn(Particle {
            position: Vec3::ZERO,
            velocity: Vec3::new(1.0, 0.0, 0.0),
            rotation: 0.0,
            size: 1.0,
            color: [0.0; 4],
            lifetime,
            initial_lifetime,
        });
        set
    }

    #[test]
    fn force_accelerates() {
        let mut set = set_with(1.0, 1.0);
        ForceEvolver { acceleration: Vec3::new(0.0, -10.0, 0.0) }.evolve(&mut set, 0.5);
        assert_eq!(set.as_slice()[0].velocity, Vec3::new(1.0, -5.0, 0.0));
    }

    #[test]
    fn color_follows_age() {
        let mut set = set_with(0.5, 1.0);
        ColorOverLifetimeEvolver { start: [0.0; 4], end: [1.0, 0.0, 0.0, 1.0] }.evolve(&mut set, 0.0);
        assert_eq!(set.as_slice()[0].color, [0.5, 0.0, 0.0, 0.5]);
    }

    #[test]
    fn drag_slows_down() {
        let mut set = set_with(1.0, 1.0);
        DragEvolver { drag: 1.0 }.evolve(&mut set, 1.0);
        assert!(set.as_slice()[0].velocity.x < 1.0);
    }
}
