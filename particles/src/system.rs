//! Simulation-thread particle system.

use std::sync::atomic::{AtomicU32, Ordering};

use bitflags::bitflags;
use glam::Vec3;

use crate::aabb::Aabb;
use crate::emitter::{EmitterId, ParticleEmitter};
use crate::evolver::{EvolverId, ParticleEvolver};
use crate::mirror::ParticleSystemCore;
use crate::particle_set::ParticleSet;
use crate::random::Random;
use crate::transform::Transform;

const GRAVITY: Vec3 = Vec3::new(0.0, -9.81, 0.0);

static NEXT_PARTICLE_SYSTEM_ID: AtomicU32 = AtomicU32::new(1);

bitflags! {
    /// What changed on a simulation-thread object since its last sync.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct ActorDirtyFlags: u32 {
        const TRANSFORM = 1 << 0;
        const ACTIVE = 1 << 1;
        const EVERYTHING = Self::TRANSFORM.bits() | Self::ACTIVE.bits() | 1 << 2;
    }
}

/// Opaque reference into the external material system.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct MaterialHandle(pub u64);

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SimulationSpace {
    /// Particles move with the system's transform.
    #[default]
    Local,
    /// Particles are born at the system's transform and then left in place.
    World,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ParticleOrientation {
    /// Billboards face the camera plane.
    #[default]
    ViewPlane,
    /// Billboards face the camera position.
    ViewPosition,
    /// Billboards face along `orientation_axis`.
    Axis,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ParticleSystemSettings {
    pub max_particles: u32,
    pub simulation_space: SimulationSpace,
    pub orientation: ParticleOrientation,
    pub orientation_axis: Vec3,
    pub gravity_scale: f32,
    pub seed: u32,
}

impl Default for ParticleSystemSettings {
    fn default() -> Self {
        Self {
            max_particles: 2000,
            simulation_space: SimulationSpace::Local,
            orientation: ParticleOrientation::ViewPlane,
            orientation_axis: Vec3::Y,
            gravity_scale: 0.0,
            seed: 0,
        }
    }
}

/// Copy of the simulation state the render thread needs, captured by `ParticleSystem::sync_to_core`.
#[derive(Clone, Debug, PartialEq)]
pub struct ParticleSystemSyncData {
    pub dirty: ActorDirtyFlags,
    pub transform: Transform,
    pub active: bool,
    pub material: Option<MaterialHandle>,
    pub settings: ParticleSystemSettings,
    pub num_emitters: u32,
    pub num_evolvers: u32,
}

/// Evaluated particles of one system after a simulation step, in world space.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ParticleRenderData {
    pub id: u32,
    pub positions: Vec<Vec3>,
    pub colors: Vec<[f32; 4]>,
    pub sizes: Vec<f32>,
    pub rotations: Vec<f32>,
    pub bounds: Aabb,
}

impl ParticleRenderData {
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
}

/// A set of emitters and evolvers driving one particle set. Lives on the simulation
/// thread; the render thread only ever sees its `ParticleSystemCore` mirror.
#[derive(Debug)]
pub struct ParticleSystem {
    id: u32,
    material: Option<MaterialHandle>,
    settings: ParticleSystemSettings,
    transform: Transform,
    active: bool,
    emitters: Vec<(EmitterId, Box<dyn ParticleEmitter>)>,
    evolvers: Vec<(EvolverId, Box<dyn ParticleEvolver>)>,
    next_handle: u32,
    particles: ParticleSet,
    random: Random,
    time: f32,
    simulated: bool,
    dirty: ActorDirtyFlags,
}

impl Default for ParticleSystem {
    fn default() -> Self {
        Self::new(ParticleSystemSettings::default())
    }
}

impl ParticleSystem {
    pub fn new(settings: ParticleSystemSettings) -> Self {
        Self {
            id: NEXT_PARTICLE_SYSTEM_ID.fetch_add(1, Ordering::Relaxed),
            material: None,
            settings,
            transform: Transform::IDENTITY,
            active: true,
            emitters: Vec::new(),
            evolvers: Vec::new(),
            next_handle: 0,
            particles: ParticleSet::new(settings.max_particles as usize),
            random: Random::new(settings.seed),
            time: 0.0,
            simulated: false,
            dirty: ActorDirtyFlags::EVERYTHING,
        }
    }

    /// Particle-system id, shared with the mirror and used to look up evaluated particles.
    pub fn id(&self) -> u32 {
        self.id
    }

    fn mark_dirty(&mut self, flags: ActorDirtyFlags) {
        self.dirty |= flags;
    }

    fn next_handle(&mut self) -> u32 {
        let handle = self.next_handle;
        self.next_handle = self.next_handle.wrapping_add(1);
        handle
    }

    pub fn add_emitter(&mut self, emitter: Box<dyn ParticleEmitter>) -> EmitterId {
        let id = EmitterId(self.next_handle());
        self.emitters.push((id, emitter));
        self.mark_dirty(ActorDirtyFlags::EVERYTHING);
        id
    }

    /// Removes the emitter behind `id`, keeping the order of the rest.
    pub fn remove_emitter(&mut self, id: EmitterId) -> Option<Box<dyn ParticleEmitter>> {
        let idx = self.emitters.iter().position(|(e, _)| *e == id)?;
        self.mark_dirty(ActorDirtyFlags::EVERYTHING);
        Some(self.emitters.remove(idx).1)
    }

    pub fn emitter(&self, idx: usize) -> Option<&dyn ParticleEmitter> {
        self.emitters.get(idx).map(|(_, e)| e.as_ref())
    }

    pub fn emitter_mut(&mut self, idx: usize) -> Option<&mut (dyn ParticleEmitter + 'static)> {
        if idx >= self.emitters.len() {
            return None;
        }
        self.mark_dirty(ActorDirtyFlags::EVERYTHING);
        self.emitters.get_mut(idx).map(|(_, e)| e.as_mut())
    }

    pub fn emitter_ids(&self) -> impl Iterator<Item = EmitterId> + '_ {
        self.emitters.iter().map(|(id, _)| *id)
    }

    pub fn num_emitters(&self) -> u32 {
        self.emitters.len() as u32
    }

    pub fn add_evolver(&mut self, evolver: Box<dyn ParticleEvolver>) -> EvolverId {
        let id = EvolverId(self.next_handle());
        self.evolvers.push((id, evolver));
        self.mark_dirty(ActorDirtyFlags::EVERYTHING);
        id
    }

    pub fn remove_evolver(&mut self, id: EvolverId) -> Option<Box<dyn ParticleEvolver>> {
        let idx = self.evolvers.iter().position(|(e, _)| *e == id)?;
        self.mark_dirty(ActorDirtyFlags::EVERYTHING);
        Some(self.evolvers.remove(idx).1)
    }

    pub fn evolver(&self, idx: usize) -> Option<&dyn ParticleEvolver> {
        self.evolvers.get(idx).map(|(_, e)| e.as_ref())
    }

    pub fn evolver_mut(&mut self, idx: usize) -> Option<&mut (dyn ParticleEvolver + 'static)> {
        if idx >= self.evolvers.len() {
            return None;
        }
        self.mark_dirty(ActorDirtyFlags::EVERYTHING);
        self.evolvers.get_mut(idx).map(|(_, e)| e.as_mut())
    }

    pub fn evolver_ids(&self) -> impl Iterator<Item = EvolverId> + '_ {
        self.evolvers.iter().map(|(id, _)| *id)
    }

    pub fn num_evolvers(&self) -> u32 {
        self.evolvers.len() as u32
    }

    pub fn set_material(&mut self, material: Option<MaterialHandle>) {
        self.material = material;
        self.mark_dirty(ActorDirtyFlags::EVERYTHING);
    }

    pub fn material(&self) -> Option<MaterialHandle> {
        self.material
    }

    pub fn set_transform(&mut self, transform: Transform) {
        self.transform = transform;
        self.mark_dirty(ActorDirtyFlags::TRANSFORM);
    }

    pub fn transform(&self) -> &Transform {
        &self.transform
    }

    pub fn set_active(&mut self, active: bool) {
        self.active = active;
        self.mark_dirty(ActorDirtyFlags::ACTIVE);
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn set_settings(&mut self, settings: ParticleSystemSettings) {
        if settings.seed != self.settings.seed {
            self.random.set_seed(settings.seed);
        }
        self.particles.set_capacity(settings.max_particles as usize);
        self.settings = settings;
        self.mark_dirty(ActorDirtyFlags::EVERYTHING);
    }

    pub fn settings(&self) -> &ParticleSystemSettings {
        &self.settings
    }

    pub fn particles(&self) -> &ParticleSet {
        &self.particles
    }

    pub fn is_core_dirty(&self) -> bool {
        !self.dirty.is_empty()
    }

    pub fn dirty_flags(&self) -> ActorDirtyFlags {
        self.dirty
    }

    /// Advances the particle set by `dt` seconds. Inactive systems keep their particles frozen.
    pub fn simulate(&mut self, dt: f32) {
        if !self.active {
            return;
        }

        for (_, evolver) in &self.evolvers {
            evolver.evolve(&mut self.particles, dt);
        }

        let gravity = GRAVITY * self.settings.gravity_scale;
        for p in self.particles.iter_mut() {
            p.velocity += gravity * dt;
            p.position += p.velocity * dt;
            p.lifetime -= dt;
        }
        self.particles.free_dead();

        let first_new = self.particles.len();
        for (_, emitter) in &mut self.emitters {
            emitter.spawn(self.time, dt, &mut self.random, &mut self.particles);
        }
        if self.settings.simulation_space == SimulationSpace::World {
            let matrix = self.transform.matrix();
            for p in self.particles.tail_mut(first_new) {
                p.position = matrix.transform_point3(p.position);
                p.velocity = matrix.transform_vector3(p.velocity);
            }
        }

        self.time += dt;
        self.simulated = true;
    }

    /// World-space bounds of the live particles. Only meaningful after `simulate`;
    /// before the first step this is `Aabb::EMPTY`.
    pub fn calculate_bounds(&self) -> Aabb {
        if !self.simulated {
            return Aabb::EMPTY;
        }
        let bounds = self.particles.calculate_bounds();
        match self.settings.simulation_space {
            SimulationSpace::Local => bounds.transformed(&self.transform.matrix()),
            SimulationSpace::World => bounds,
        }
    }

    /// Snapshot of the evaluated particles for the render thread.
    pub fn render_data(&self) -> ParticleRenderData {
        let matrix = self.transform.matrix();
        let to_world = |p: Vec3| match self.settings.simulation_space {
            SimulationSpace::Local => matrix.transform_point3(p),
            SimulationSpace::World => p,
        };
        let particles = self.particles.as_slice();
        ParticleRenderData {
            id: self.id,
            positions: particles.iter().map(|p| to_world(p.position)).collect(),
            colors: particles.iter().map(|p| p.color).collect(),
            sizes: particles.iter().map(|p| p.size).collect(),
            rotations: particles.iter().map(|p| p.rotation).collect(),
            bounds: self.calculate_bounds(),
        }
    }

    fn capture(&self, dirty: ActorDirtyFlags) -> ParticleSystemSyncData {
        ParticleSystemSyncData {
            dirty,
            transform: self.transform,
            active: self.active,
            material: self.material,
            settings: self.settings,
            num_emitters: self.num_emitters(),
            num_evolvers: self.num_evolvers(),
        }
    }

    /// Captures the changes since the last sync and clears the dirty flags.
    /// Returns `None` when nothing changed.
    pub fn sync_to_core(&mut self) -> Option<ParticleSystemSyncData> {
        if self.dirty.is_empty() {
            return None;
        }
        let data = self.capture(self.dirty);
        self.dirty = ActorDirtyFlags::empty();
        Some(data)
    }

    /// Builds the render-thread mirror from the full current state. The mirror starts
    /// in sync, so pending dirty flags are cleared.
    pub fn create_core(&mut self) -> ParticleSystemCore {
        let mut core = ParticleSystemCore::new(self.id);
        core.apply_sync(&self.capture(ActorDirtyFlags::EVERYTHING));
        self.dirty = ActorDirtyFlags::empty();
        core
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::emitter::{EmissionSettings, EmitterShape, ShapeEmitter};
    use crate::evolver::{DragEvolver, ForceEvolver, RotationEvolver};

    fn point_emitter(rate: f32) -> Box<dyn ParticleEmitter> {
        Box::new(ShapeEmitter::new(
            EmitterShape::Point,
            EmissionSettings { rate, ..Default::default() },
        ))
    }

    fn clean_system() -> ParticleSystem {
        let mut system = ParticleSystem::default();
        let _ = system.sync_to_core();
        system
    }

    #[test]
    fn ids_are_unique() {
        let a = ParticleSystem::default();
        let b = ParticleSystem::default();
        assert_ne!(a.id(), b.id());
        assert!(a.id() >= 1);
    }

    #[test]
    fn remove_by_handle_keeps_order() {
        let mut system = ParticleSystem::default();
        let first = system.add_evolver(Box::new(ForceEvolver { acceleration: Vec3::X }));
        let second = system.add_evolver(Box::new(DragEvolver { drag: 1.0 }));
        let third = system.add_evolver(Box::new(RotationEvolver { speed: 1.0 }));

        assert!(system.remove_evolver(second).is_some());
        assert_eq!(system.evolver_ids().collect::<Vec<_>>(), vec![first, third]);
        assert!(system.remove_evolver(second).is_none());
        assert_eq!(system.num_evolvers(), 2);
    }

    #[test]
    fn indexed_access_past_end_is_none() {
        let mut system = ParticleSystem::default();
        system.add_emitter(point_emitter(1.0));
        assert!(system.emitter(0).is_some());
        assert!(system.emitter(1).is_none());
        assert!(system.emitter_mut(1).is_none());
        assert!(system.evolver(0).is_none());
        assert!(system.evolver_mut(0).is_none());
    }

    #[test]
    fn every_mutator_marks_dirty() {
        let mutators: Vec<fn(&mut ParticleSystem)> = vec![
            |s: &mut ParticleSystem| {
                s.add_emitter(point_emitter(1.0));
            },
            |s: &mut ParticleSystem| {
                s.add_evolver(Box::new(DragEvolver { drag: 0.5 }));
            },
            |s: &mut ParticleSystem| s.set_material(Some(MaterialHandle(3))),
            |s: &mut ParticleSystem| s.set_transform(Transform::from_position(Vec3::ONE)),
            |s: &mut ParticleSystem| s.set_active(false),
            |s: &mut ParticleSystem| s.set_settings(ParticleSystemSettings { gravity_scale: 1.0, ..Default::default() }),
        ];
        for mutate in mutators {
            let mut system = clean_system();
            assert!(!system.is_core_dirty());
            mutate(&mut system);
            assert!(system.is_core_dirty());
        }

        let mut system = clean_system();
        let id = system.add_emitter(point_emitter(1.0));
        let _ = system.sync_to_core();
        system.remove_emitter(id);
        assert!(system.is_core_dirty());
    }

    #[test]
    fn transform_only_change_flags_transform() {
        let mut system = clean_system();
        system.set_transform(Transform::from_position(Vec3::X));
        assert_eq!(system.dirty_flags(), ActorDirtyFlags::TRANSFORM);
    }

    #[test]
    fn sync_clears_flags() {
        let mut system = ParticleSystem::default();
        system.set_material(Some(MaterialHandle(9)));
        let data = system.sync_to_core().unwrap();
        assert_eq!(data.material, Some(MaterialHandle(9)));
        assert!(data.dirty.contains(ActorDirtyFlags::EVERYTHING));
        assert!(system.sync_to_core().is_none());
    }

    #[test]
    fn bounds_empty_before_simulation() {
        let mut system = ParticleSystem::default();
        system.add_emitter(point_emitter(100.0));
        assert_eq!(system.calculate_bounds(), Aabb::EMPTY);
    }

    #[test]
    fn bounds_contain_particles_after_simulation() {
        let mut system = ParticleSystem::default();
        system.set_transform(Transform::from_position(Vec3::new(10.0, 0.0, 0.0)));
        system.add_emitter(point_emitter(100.0));
        for _ in 0..10 {
            system.simulate(0.05);
        }
        let data = system.render_data();
        assert!(!data.is_empty());
        assert!(data.positions.iter().all(|p| data.bounds.contains_point(*p)));
        assert!(data.bounds.contains_point(Vec3::new(10.0, 0.0, 0.0)));
    }

    #[test]
    fn particles_die_after_lifetime() {
        let mut system = ParticleSystem::default();
        let id = system.add_emitter(point_emitter(100.0));
        system.simulate(0.1);
        assert_eq!(system.particles().len(), 10);
        system.remove_emitter(id);
        for _ in 0..30 {
            system.simulate(0.1);
        }
        assert!(system.particles().is_empty());
    }

    #[test]
    fn inactive_system_does_not_spawn() {
        let mut system = ParticleSystem::default();
        system.add_emitter(point_emitter(100.0));
        system.set_active(false);
        system.simulate(0.1);
        assert!(system.particles().is_empty());
    }

    #[test]
    fn same_seed_replays_identically() {
        let run = || {
            let mut system = ParticleSystem::new(ParticleSystemSettings { seed: 42, ..Default::default() });
            system.add_emitter(Box::new(ShapeEmitter::new(
                EmitterShape::Sphere { radius: 1.0 },
                EmissionSettings::default(),
            )));
            for _ in 0..5 {
                system.simulate(0.1);
            }
            system.render_data().positions
        };
        assert_eq!(run(), run());
    }

    #[test]
    fn max_particles_caps_the_set() {
        let mut system = ParticleSystem::new(ParticleSystemSettings { max_particles: 8, ..Default::default() });
        system.add_emitter(point_emitter(1000.0));
        system.simulate(0.1);
        assert_eq!(system.particles().len(), 8);
    }
}
