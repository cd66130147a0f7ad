//! One-way snapshot channel from the simulation thread to the render thread.

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::mirror::ParticleSystemCore;
use crate::system::{ParticleRenderData, ParticleSystemSyncData};

#[derive(Debug)]
pub enum CoreCommand {
    Create(ParticleSystemCore),
    Update { id: u32, data: ParticleSystemSyncData },
    Destroy { id: u32 },
}

/// Everything the simulation thread committed during one frame, in commit order.
#[derive(Debug, Default)]
pub struct SyncBatch {
    pub frame: u64,
    pub commands: Vec<CoreCommand>,
    /// Evaluated particles of every live system; `None` keeps the previous frame's.
    pub particle_data: Option<Vec<ParticleRenderData>>,
}

type SharedQueue = Arc<Mutex<VecDeque<SyncBatch>>>;

#[derive(Clone, Debug)]
pub struct SyncSender {
    queue: SharedQueue,
}

#[derive(Debug)]
pub struct SyncReceiver {
    queue: SharedQueue,
}

pub fn sync_channel() -> (SyncSender, SyncReceiver) {
    let queue = SharedQueue::default();
    (SyncSender { queue: queue.clone() }, SyncReceiver { queue })
}

impl SyncSender {
    pub fn submit(&self, batch: SyncBatch) {
        self.queue.lock().push_back(batch);
    }
}

impl SyncReceiver {
    /// Takes every pending batch, oldest first.
    pub fn drain(&self) -> Vec<SyncBatch> {
        self.queue.lock().drain(..).collect()
    }

    pub fn pending(&self) -> usize {
        self.queue.lock().len()
    }
}

/// Source of renderer correlation ids.
pub trait RendererIdAllocator {
    fn allocate(&mut self) -> u32;
    fn release(&mut self, id: u32);
}

/// Hands out the lowest released id first, then counts up from zero.
#[derive(Debug, Default)]
pub struct SequentialIds {
    next: u32,
    free: Vec<u32>,
}

impl RendererIdAllocator for SequentialIds {
    fn allocate(&mut self) -> u32 {
        if let Some(id) = self.free.pop() {
            return id;
        }
        let id = self.next;
        self.next += 1;
        id
    }

    fn release(&mut self, id: u32) {
        debug_assert!(id < self.next && !self.free.contains(&id), "renderer id {} released twice", id);
        self.free.push(id);
        self.free.sort_unstable_by(|a, b| b.cmp(a));
    }
}

/// Render-thread owner of every `ParticleSystemCore`, keyed by particle-system id.
#[derive(Debug, Default)]
pub struct CoreMirrorSet {
    cores: BTreeMap<u32, ParticleSystemCore>,
    particle_data: HashMap<u32, ParticleRenderData>,
    last_frame: Option<u64>,
}

impl CoreMirrorSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn apply_batch(&mut self, batch: SyncBatch, ids: &mut dyn RendererIdAllocator) {
        debug_assert!(
            self.last_frame.map_or(true, |last| batch.frame > last),
            "sync batch for frame {} applied after frame {:?}",
            batch.frame,
            self.last_frame
        );
        self.last_frame = Some(batch.frame);

        for command in batch.commands {
            match command {
                CoreCommand::Create(mut core) => {
                    let id = core.id();
                    if let Some(old) = self.cores.remove(&id) {
                        log::warn!("particle system {} created twice, replacing its mirror", id);
                        if let Some(renderer_id) = old.renderer_id() {
                            ids.release(renderer_id);
                        }
                    }
                    core.initialize();
                    core.set_renderer_id(ids.allocate());
                    log::trace!("created particle system core {} as renderer id {:?}", id, core.renderer_id());
                    self.cores.insert(id, core);
                }
                CoreCommand::Update { id, data } => match self.cores.get_mut(&id) {
                    Some(core) => {
                        log::trace!("sync particle system core {} ({:?})", id, data.dirty);
                        core.apply_sync(&data);
                    }
                    None => log::warn!("update for unknown particle system {} ignored", id),
                },
                CoreCommand::Destroy { id } => match self.cores.remove(&id) {
                    Some(core) => {
                        log::trace!("destroyed particle system core {}", id);
                        self.particle_data.remove(&id);
                        if let Some(renderer_id) = core.renderer_id() {
                            ids.release(renderer_id);
                        }
                    }
                    None => log::warn!("destroy for unknown particle system {} ignored", id),
                },
            }
        }

        if let Some(data) = batch.particle_data {
            self.particle_data = data
                .into_iter()
                .filter(|d| self.cores.contains_key(&d.id))
                .map(|d| (d.id, d))
                .collect();
        }
    }

    pub fn last_frame(&self) -> Option<u64> {
        self.last_frame
    }

    pub fn get(&self, id: u32) -> Option<&ParticleSystemCore> {
        self.cores.get(&id)
    }

    /// Evaluated particles for the particle-system `id`, from the latest applied frame.
    pub fn particle_data(&self, id: u32) -> Option<&ParticleRenderData> {
        self.particle_data.get(&id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ParticleSystemCore> {
        self.cores.values()
    }

    pub fn len(&self) -> usize {
        self.cores.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cores.is_empty()
    }
}
