//! Particle systems with a simulation-thread object and a render-thread mirror.
//!
//! The simulation thread owns `ParticleSystem`s through a `ParticleManager`. Once per
//! frame the manager captures every changed system into a `SyncBatch` and submits it
//! over the sync channel; the render thread drains the channel at the start of its
//! frame and applies the batches, in order, to a `CoreMirrorSet`.

pub mod aabb;
pub mod emitter;
pub mod evolver;
pub mod manager;
pub mod mirror;
pub mod particle_set;
pub mod random;
pub mod sync;
pub mod system;
pub mod transform;

pub use aabb::Aabb;
pub use emitter::{EmissionSettings, EmitterId, EmitterShape, ParticleEmitter, ShapeEmitter};
pub use evolver::{
    ColorOverLifetimeEvolver, DragEvolver, EvolverId, ForceEvolver, ParticleEvolver, RotationEvolver,
};
pub use manager::ParticleManager;
pub use mirror::ParticleSystemCore;
pub use particle_set::{Particle, ParticleSet};
pub use random::Random;
pub use sync::{
    sync_channel, CoreCommand, CoreMirrorSet, RendererIdAllocator, SequentialIds, SyncBatch, SyncReceiver,
    SyncSender,
};
pub use system::{
    ActorDirtyFlags, MaterialHandle, ParticleOrientation, ParticleRenderData, ParticleSystem,
    ParticleSystemSettings, ParticleSystemSyncData, SimulationSpace,
};
pub use transform::Transform;
