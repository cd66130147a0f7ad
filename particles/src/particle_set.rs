use glam::Vec3;

use crate::aabb::Aabb;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Particle {
    pub position: Vec3,
    pub velocity: Vec3,
    /// Rotation around the billboard normal, radians.
    pub rotation: f32,
    pub size: f32,
    pub color: [f32; 4],
    /// Seconds left to live; the particle is freed once this reaches zero.
    pub lifetime: f32,
    pub initial_lifetime: f32,
}

impl Particle {
    /// 0 at spawn, 1 at death.
    pub fn normalized_age(&self) -> f32 {
        if self.initial_lifetime <= 0.0 {
            return 1.0;
        }
        (1.0 - self.lifetime / self.initial_lifetime).clamp(0.0, 1.0)
    }
}

/// Bounded pool of live particles owned by one particle system.
#[derive(Clone, Debug)]
pub struct ParticleSet {
    particles: Vec<Particle>,
    capacity: usize,
}

impl ParticleSet {
    pub fn new(capacity: usize) -> Self {
        Self {
            particles: Vec::with_capacity(capacity),
            capacity,
        }
    }

    pub fn len(&self) -> usize {
        self.particles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.particles.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn is_full(&self) -> bool {
        self.particles.len() >= self.capacity
    }

    /// Shrinking drops the newest particles.
    pub fn set_capacity(&mut self, capacity: usize) {
        self.capacity = capacity;
        self.particles.truncate(capacity);
    }

    /// Returns false (and drops the particle) when the set is full.
    pub fn spawn(&mut self, particle: Particle) -> bool {
        if self.is_full() {
            return false;
        }
        self.particles.push(particle);
        true
    }

    pub fn as_slice(&self) -> &[Particle] {
        &self.particles
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Particle> {
        self.particles.iter()
    }

    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, Particle> {
        self.particles.iter_mut()
    }

    pub(crate) fn tail_mut(&mut self, from: usize) -> &mut [Particle] {
        let from = from.min(self.particles.len());
        &mut self.particles[from..]
    }

    /// Swap-removes every particle whose lifetime ran out. Returns how many were freed.
    pub fn free_dead(&mut self) -> usize {
        let before = self.particles.len();
        let mut i = 0;
        while i < self.particles.len() {
            if self.particles[i].lifetime <= 0.0 {
                self.particles.swap_remove(i);
            } else {
                i += 1;
            }
        }
        before - self.particles.len()
    }

    pub fn clear(&mut self) {
        self.particles.clear();
    }

    /// Bounds of every particle's billboard, in the space the positions are stored in.
    pub fn calculate_bounds(&self) -> Aabb {
        let mut bounds = Aabb::EMPTY;
        for p in &self.particles {
            let half = Vec3::splat(p.size * 0.5);
            bounds.merge(&Aabb::from_center_half_extents(p.position, half));
        }
        bounds
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn particle(x: f32, lifetime: f32) -> Particle {
        Particle {
            position: Vec3::new(x, 0.0, 0.0),
            velocity: Vec3::ZERO,
            rotation: 0.0,
            size: 1.0,
            color: [1.0; 4],
            lifetime,
            initial_lifetime: 1.0,
        }
    }

    #[test]
    fn spawn_respects_capacity() {
        let mut set = ParticleSet::new(2);
        assert!(set.spawn(particle(0.0, 1.0)));
        assert!(set.spawn(particle(1.0, 1.0)));
        assert!(!set.spawn(particle(2.0, 1.0)));
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn free_dead_removes_expired_only() {
        let mut set = ParticleSet::new(8);
        set.spawn(particle(0.0, 0.0));
        set.spawn(particle(1.0, 0.5));
        set.spawn(particle(2.0, -1.0));
        set.spawn(particle(3.0, 0.2));
        assert_eq!(set.free_dead(), 2);
        let mut xs: Vec<f32> = set.iter().map(|p| p.position.x).collect();
        xs.sort_by(f32::total_cmp);
        assert_eq!(xs, vec![1.0, 3.0]);
    }

    #[test]
    fn bounds_include_particle_size() {
        let mut set = ParticleSet::new(8);
        assert!(set.calculate_bounds().is_empty());
        set.spawn(particle(0.0, 1.0));
        set.spawn(particle(4.0, 1.0));
        let b = set.calculate_bounds();
        assert_eq!(b.min, Vec3::new(-0.5, -0.5, -0.5));
        assert_eq!(b.max, Vec3::new(4.5, 0.5, 0.5));
    }
}
