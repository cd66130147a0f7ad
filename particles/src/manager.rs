//! Simulation-thread owner of every particle system.

use crate::sync::{CoreCommand, SyncBatch, SyncSender};
use crate::system::{ParticleRenderData, ParticleSystem};

/// Owns the simulation-thread particle systems and forwards their changes to the
/// render thread through a `SyncSender`, one batch per frame.
#[derive(Debug)]
pub struct ParticleManager {
    systems: Vec<ParticleSystem>,
    sender: SyncSender,
    pending: Vec<CoreCommand>,
    render_data: Option<Vec<ParticleRenderData>>,
    frame: u64,
}

impl ParticleManager {
    pub fn new(sender: SyncSender) -> Self {
        Self {
            systems: Vec::new(),
            sender,
            pending: Vec::new(),
            render_data: None,
            frame: 0,
        }
    }

    /// Takes ownership of `system` and queues the creation of its mirror. Returns its id.
    pub fn spawn(&mut self, mut system: ParticleSystem) -> u32 {
        let id = system.id();
        self.pending.push(CoreCommand::Create(system.create_core()));
        self.systems.push(system);
        id
    }

    /// Removes the system and queues the destruction of its mirror.
    pub fn despawn(&mut self, id: u32) -> Option<ParticleSystem> {
        let idx = self.systems.iter().position(|s| s.id() == id)?;
        self.pending.push(CoreCommand::Destroy { id });
        Some(self.systems.remove(idx))
    }

    /// Replaces the mirror of `id` with a fresh one built from the current state.
    pub fn reinitialize(&mut self, id: u32) -> bool {
        let Some(system) = self.systems.iter_mut().find(|s| s.id() == id) else {
            return false;
        };
        self.pending.push(CoreCommand::Destroy { id });
        self.pending.push(CoreCommand::Create(system.create_core()));
        true
    }

    pub fn get(&self, id: u32) -> Option<&ParticleSystem> {
        self.systems.iter().find(|s| s.id() == id)
    }

    pub fn get_mut(&mut self, id: u32) -> Option<&mut ParticleSystem> {
        self.systems.iter_mut().find(|s| s.id() == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ParticleSystem> {
        self.systems.iter()
    }

    pub fn len(&self) -> usize {
        self.systems.len()
    }

    pub fn is_empty(&self) -> bool {
        self.systems.is_empty()
    }

    /// Frame index of the last submitted batch; 0 before the first `sync_frame`.
    pub fn frame(&self) -> u64 {
        self.frame
    }

    /// Simulates every system and keeps the evaluated particles for the next sync.
    pub fn update(&mut self, dt: f32) {
        let data = self
            .systems
            .iter_mut()
            .map(|system| {
                system.simulate(dt);
                system.render_data()
            })
            .collect();
        self.render_data = Some(data);
    }

    /// Captures every dirty system and submits the frame's batch. Returns its frame index.
    pub fn sync_frame(&mut self) -> u64 {
        self.frame += 1;
        let mut commands = std::mem::take(&mut self.pending);
        for system in &mut self.systems {
            if let Some(data) = system.sync_to_core() {
                commands.push(CoreCommand::Update { id: system.id(), data });
            }
        }
        log::debug!("sync frame {}: {} command(s)", self.frame, commands.len());
        self.sender.submit(SyncBatch {
            frame: self.frame,
            commands,
            particle_data: self.render_data.take(),
        });
        self.frame
    }
}

#[cfg(test)]
mod tests {
    use glam::Vec3;

    use super::*;
    use crate::emitter::{EmissionSettings, EmitterShape, ShapeEmitter};
    use crate::sync::{sync_channel, CoreMirrorSet, SequentialIds};
    use crate::transform::Transform;

    #[test]
    fn spawn_then_sync_creates_mirror() {
        let (tx, rx) = sync_channel();
        let mut manager = ParticleManager::new(tx);
        let id = manager.spawn(ParticleSystem::default());
        assert_eq!(manager.sync_frame(), 1);

        let batches = rx.drain();
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].commands.len(), 1);
        assert!(matches!(&batches[0].commands[0], CoreCommand::Create(core) if core.id() == id));
    }

    #[test]
    fn clean_systems_send_no_updates() {
        let (tx, rx) = sync_channel();
        let mut manager = ParticleManager::new(tx);
        manager.spawn(ParticleSystem::default());
        manager.sync_frame();
        manager.sync_frame();
        let batches = rx.drain();
        assert!(batches[1].commands.is_empty());
        assert!(batches[1].particle_data.is_none());
    }

    #[test]
    fn reinitialize_recreates_mirror() {
        let (tx, rx) = sync_channel();
        let mut manager = ParticleManager::new(tx);
        let mut mirrors = CoreMirrorSet::new();
        let mut ids = SequentialIds::default();

        let a = manager.spawn(ParticleSystem::default());
        let b = manager.spawn(ParticleSystem::default());
        manager.sync_frame();
        for batch in rx.drain() {
            mirrors.apply_batch(batch, &mut ids);
        }
        assert_eq!(mirrors.get(a).unwrap().renderer_id(), Some(0));
        assert_eq!(mirrors.get(b).unwrap().renderer_id(), Some(1));

        manager.get_mut(a).unwrap().set_transform(Transform::from_position(Vec3::X));
        assert!(manager.reinitialize(a));
        assert!(!manager.reinitialize(u32::MAX));
        manager.sync_frame();
        for batch in rx.drain() {
            mirrors.apply_batch(batch, &mut ids);
        }
        let core = mirrors.get(a).unwrap();
        assert!(core.is_initialized());
        assert_eq!(core.renderer_id(), Some(0));
        assert_eq!(core.transform().position, Vec3::X);
        assert_eq!(mirrors.len(), 2);
    }

    #[test]
    fn despawn_removes_mirror_and_particles() {
        let (tx, rx) = sync_channel();
        let mut manager = ParticleManager::new(tx);
        let mut mirrors = CoreMirrorSet::new();
        let mut ids = SequentialIds::default();

        let mut system = ParticleSystem::default();
        system.add_emitter(Box::new(ShapeEmitter::new(EmitterShape::Point, EmissionSettings::default())));
        let id = manager.spawn(system);
        manager.update(0.1);
        manager.sync_frame();
        for batch in rx.drain() {
            mirrors.apply_batch(batch, &mut ids);
        }
        assert_eq!(mirrors.particle_data(id).map(|d| d.len()), Some(5));

        assert!(manager.despawn(id).is_some());
        assert!(manager.despawn(id).is_none());
        manager.sync_frame();
        for batch in rx.drain() {
            mirrors.apply_batch(batch, &mut ids);
        }
        assert!(mirrors.get(id).is_none());
        assert!(mirrors.particle_data(id).is_none());
    }
}
