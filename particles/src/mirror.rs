//! Render-thread mirror of a `ParticleSystem`.

use crate::system::{ActorDirtyFlags, MaterialHandle, ParticleSystemSettings, ParticleSystemSyncData};
use crate::transform::Transform;

/// Render-thread counterpart of a `ParticleSystem`. Only ever changed through
/// `apply_sync` with data captured on the simulation thread; code outside the crate
/// can read it but not mutate it:
///
/// ```compile_fail
/// let mut system = particles::ParticleSystem::default();
/// let mut core = system.create_core();
/// core.set_renderer_id(7);
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct ParticleSystemCore {
    id: u32,
    renderer_id: Option<u32>,
    material: Option<MaterialHandle>,
    transform: Transform,
    active: bool,
    settings: ParticleSystemSettings,
    num_emitters: u32,
    num_evolvers: u32,
    initialized: bool,
}

impl ParticleSystemCore {
    pub(crate) fn new(id: u32) -> Self {
        Self {
            id,
            renderer_id: None,
            material: None,
            transform: Transform::IDENTITY,
            active: true,
            settings: ParticleSystemSettings::default(),
            num_emitters: 0,
            num_evolvers: 0,
            initialized: false,
        }
    }

    /// Particle-system id, same as the simulation-thread object's.
    pub fn id(&self) -> u32 {
        self.id
    }

    /// Renderer correlation id, assigned once the mirror reaches the render thread.
    pub fn renderer_id(&self) -> Option<u32> {
        self.renderer_id
    }

    pub(crate) fn set_renderer_id(&mut self, renderer_id: u32) {
        debug_assert!(
            self.renderer_id.is_none() || self.renderer_id == Some(renderer_id),
            "renderer id of particle system {} reassigned",
            self.id
        );
        self.renderer_id = Some(renderer_id);
    }

    /// Render-thread lifecycle hook; runs once after the mirror is received.
    pub(crate) fn initialize(&mut self) {
        debug_assert!(!self.initialized, "particle system core {} initialized twice", self.id);
        self.initialized = true;
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub(crate) fn set_material(&mut self, material: Option<MaterialHandle>) {
        self.material = material;
    }

    pub fn material(&self) -> Option<MaterialHandle> {
        self.material
    }

    pub fn transform(&self) -> &Transform {
        &self.transform
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn settings(&self) -> &ParticleSystemSettings {
        &self.settings
    }

    pub fn num_emitters(&self) -> u32 {
        self.num_emitters
    }

    pub fn num_evolvers(&self) -> u32 {
        self.num_evolvers
    }

    /// Copies the fields selected by `data.dirty`. Applying the same data again is a no-op.
    pub(crate) fn apply_sync(&mut self, data: &ParticleSystemSyncData) {
        if data.dirty.contains(ActorDirtyFlags::TRANSFORM) {
            self.transform = data.transform;
        }
        if data.dirty.contains(ActorDirtyFlags::ACTIVE) {
            self.active = data.active;
        }
        if data.dirty.contains(ActorDirtyFlags::EVERYTHING) {
            self.set_material(data.material);
            self.settings = data.settings;
            self.num_emitters = data.num_emitters;
            self.num_evolvers = data.num_evolvers;
        }
    }
}

#[cfg(test)]
mod tests {
    use glam::Vec3;

    use super::*;
    use crate::system::ParticleSystem;

    #[test]
    fn core_mirrors_creation_state() {
        let mut system = ParticleSystem::default();
        system.set_material(Some(MaterialHandle(4)));
        system.set_transform(Transform::from_position(Vec3::Y));
        let core = system.create_core();
        assert_eq!(core.id(), system.id());
        assert_eq!(core.material(), Some(MaterialHandle(4)));
        assert_eq!(core.transform().position, Vec3::Y);
        assert_eq!(core.renderer_id(), None);
        assert!(!core.is_initialized());
        assert!(!system.is_core_dirty());
    }

    #[test]
    fn apply_is_idempotent() {
        let mut system = ParticleSystem::default();
        let mut core = system.create_core();
        system.set_transform(Transform::from_position(Vec3::new(1.0, 2.0, 3.0)));
        system.set_material(Some(MaterialHandle(8)));
        let data = system.sync_to_core().unwrap();

        core.apply_sync(&data);
        let once = core.clone();
        core.apply_sync(&data);
        assert_eq!(core, once);
        assert_eq!(core.material(), Some(MaterialHandle(8)));
    }

    #[test]
    fn transform_only_sync_leaves_material() {
        let mut system = ParticleSystem::default();
        system.set_material(Some(MaterialHandle(1)));
        let mut core = system.create_core();

        let stale = ParticleSystemSyncData {
            dirty: ActorDirtyFlags::TRANSFORM,
            transform: Transform::from_position(Vec3::X),
            active: true,
            material: None,
            settings: ParticleSystemSettings::default(),
            num_emitters: 0,
            num_evolvers: 0,
        };
        core.apply_sync(&stale);
        assert_eq!(core.transform().position, Vec3::X);
        assert_eq!(core.material(), Some(MaterialHandle(1)));
    }
}
