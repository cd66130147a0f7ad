use glam::Vec3;

/// Seeded xorshift128 generator. Simulation must replay identically for a given seed,
/// so every system carries its own instance.
#[derive(Clone, Debug)]
pub struct Random {
    state: [u32; 4],
}

impl Random {
    pub fn new(seed: u32) -> Self {
        let mut random = Self { state: [0; 4] };
        random.set_seed(seed);
        random
    }

    pub fn set_seed(&mut self, seed: u32) {
        self.state[0] = seed;
        self.state[1] = seed.wrapping_mul(0x6C07_8965).wrapping_add(1);
        self.state[2] = self.state[1].wrapping_mul(0x6C07_8965).wrapping_add(1);
        self.state[3] = self.state[2].wrapping_mul(0x6C07_8965).wrapping_add(1);
    }

    pub fn get_u32(&mut self) -> u32 {
        let mut t = self.state[3];
        t ^= t << 11;
        t ^= t >> 8;
        self.state[3] = self.state[2];
        self.state[2] = self.state[1];
        self.state[1] = self.state[0];
        t ^= self.state[0];
        t ^= self.state[0] >> 19;
        self.state[0] = t;
        t
    }

    /// Uniform in [0, 1].
    pub fn get_unorm(&mut self) -> f32 {
        (self.get_u32() as f64 / u32::MAX as f64) as f32
    }

    /// Uniform in [-1, 1].
    pub fn get_snorm(&mut self) -> f32 {
        self.get_unorm() * 2.0 - 1.0
    }

    pub fn range(&mut self, min: f32, max: f32) -> f32 {
        min + (max - min) * self.get_unorm()
    }

    /// Uniformly distributed direction.
    pub fn unit_vector(&mut self) -> Vec3 {
        let z = self.get_snorm();
        let phi = self.get_unorm() * std::f32::consts::TAU;
        let r = (1.0 - z * z).max(0.0).sqrt();
        Vec3::new(r * phi.cos(), r * phi.sin(), z)
    }

    /// Uniformly distributed point inside the unit sphere.
    pub fn point_in_sphere(&mut self) -> Vec3 {
        self.unit_vector() * self.get_unorm().cbrt()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_seed_same_sequence() {
        let mut a = Random::new(7);
        let mut b = Random::new(7);
        for _ in 0..32 {
            assert_eq!(a.get_u32(), b.get_u32());
        }
    }

    #[test]
    fn ranges_are_respected() {
        let mut r = Random::new(1);
        for _ in 0..256 {
            let v = r.range(-2.0, 3.0);
            assert!((-2.0..=3.0).contains(&v));
            assert!((r.unit_vector().length() - 1.0).abs() < 1e-4);
            assert!(r.point_in_sphere().length() <= 1.0 + 1e-4);
        }
    }
}
