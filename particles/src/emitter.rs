//! Particle emitters: decide where, how many and with what initial state particles are born.

use std::fmt;

use glam::Vec3;

use crate::particle_set::{Particle, ParticleSet};
use crate::random::Random;

/// Stable handle returned by `ParticleSystem::add_emitter`. Removal goes through the
/// handle, never through value comparison.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct EmitterId(pub(crate) u32);

pub trait ParticleEmitter: Send + fmt::Debug {
    /// Spawns the particles for a step of `dt` seconds that starts at `time`.
    /// Positions are in the system's local space. Returns the number spawned.
    fn spawn(&mut self, time: f32, dt: f32, random: &mut Random, particles: &mut ParticleSet) -> u32;
}

/// Volume new particles are born in, centered on the system origin.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum EmitterShape {
    Point,
    Sphere { radius: f32 },
    /// Cone opening along +Y. Particles start on the base disc and move inside the cone.
    Cone { angle: f32, radius: f32 },
    Box { half_extents: Vec3 },
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EmissionSettings {
    /// Particles per second.
    pub rate: f32,
    pub lifetime: (f32, f32),
    pub speed: (f32, f32),
    pub size: (f32, f32),
    pub color: [f32; 4],
}

impl Default for EmissionSettings {
    fn default() -> Self {
        Self {
            rate: 50.0,
            lifetime: (1.0, 2.0),
            speed: (1.0, 2.0),
            size: (0.1, 0.2),
            color: [1.0; 4],
        }
    }
}

/// Continuous emitter over one of the built-in shapes.
#[derive(Clone, Debug)]
pub struct ShapeEmitter {
    pub shape: EmitterShape,
    pub emission: EmissionSettings,
    accumulator: f32,
}

impl ShapeEmitter {
    pub fn new(shape: EmitterShape, emission: EmissionSettings) -> Self {
        Self {
            shape,
            emission,
            accumulator: 0.0,
        }
    }

    fn sample(&self, random: &mut Random) -> (Vec3, Vec3) {
        match self.shape {
            EmitterShape::Point => (Vec3::ZERO, random.unit_vector()),
            EmitterShape::Sphere { radius } => {
                let dir = random.unit_vector();
                (dir * radius * random.get_unorm().cbrt(), dir)
            }
            EmitterShape::Cone { angle, radius } => {
                let phi = random.get_unorm() * std::f32::consts::TAU;
                let r = radius * random.get_unorm().sqrt();
                let origin = Vec3::new(r * phi.cos(), 0.0, r * phi.sin());
                let theta = angle * random.get_unorm();
                let dir = Vec3::new(theta.sin() * phi.cos(), theta.cos(), theta.sin() * phi.sin());
                (origin, dir)
            }
            EmitterShape::Box { half_extents } => {
                let p = Vec3::new(random.get_snorm(), random.get_snorm(), random.get_snorm());
                (p * half_extents, random.unit_vector())
            }
        }
    }
}

impl ParticleEmitter for ShapeEmitter {
    fn spawn(&mut self, _time: f32, dt: f32, random: &mut Random, particles: &mut ParticleSet) -> u32 {
        self.accumulator += self.emission.rate.max(0.0) * dt;
        let count = self.accumulator.floor();
        self.accumulator -= count;

        let mut spawned = 0;
        for _ in 0..count as u32 {
            let (position, direction) = self.sample(random);
            let lifetime = random.range(self.emission.lifetime.0, self.emission.lifetime.1);
            let particle = Particle {
                position,
                velocity: direction * random.range(self.emission.speed.0, self.emission.speed.1),
                rotation: 0.0,
                size: random.range(self.emission.size.0, self.emission.size.1),
                color: self.emission.color,
                lifetime,
                initial_lifetime: lifetime,
            };
            if !particles.spawn(particle) {
                break;
            }
            spawned += 1;
        }
        spawned
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fractional_rate_accumulates() {
        let mut emitter = ShapeEmitter::new(
            EmitterShape::Point,
            EmissionSettings { rate: 10.0, ..Default::default() },
        );
        let mut random = Random::new(3);
        let mut set = ParticleSet::new(100);
        let mut total = 0;
        for _ in 0..20 {
            total += emitter.spawn(0.0, 0.05, &mut random, &mut set);
        }
        assert_eq!(total, 10);
        assert_eq!(set.len(), 10);
    }

    #[test]
    fn sphere_spawns_inside_radius() {
        let mut emitter = ShapeEmitter::new(
            EmitterShape::Sphere { radius: 2.0 },
            EmissionSettings { rate: 1000.0, ..Default::default() },
        );
        let mut random = Random::new(11);
        let mut set = ParticleSet::new(1000);
        emitter.spawn(0.0, 0.1, &mut random, &mut set);
        assert_eq!(set.len(), 100);
        assert!(set.iter().all(|p| p.position.length() <= 2.0 + 1e-4));
    }

    #[test]
    fn full_set_stops_spawning() {
        let mut emitter = ShapeEmitter::new(EmitterShape::Point, EmissionSettings::default());
        let mut random = Random::new(5);
        let mut set = ParticleSet::new(4);
        assert_eq!(emitter.spawn(0.0, 1.0, &mut random, &mut set), 4);
    }
}
