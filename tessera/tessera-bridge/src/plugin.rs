//! Tessera plugin: implements RenderBackend for the host.

use particles::{CoreMirrorSet, SequentialIds, SyncReceiver};
use render_api::{BackendError, ExtractedScene, ExtractedView, RenderBackend};
use tessera_renderer::{Renderer, RendererError, TesseraConfig};

fn backend_error(err: RendererError) -> BackendError {
    BackendError::Renderer(err.to_string())
}

/// Requests a device from the default adapter, without a surface.
pub fn request_headless_device() -> Result<(wgpu::Device, wgpu::Queue), RendererError> {
    pollster::block_on(async {
        let instance = wgpu::Instance::default();
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::default(),
                compatible_surface: None,
                force_fallback_adapter: false,
            })
            .await
            .ok_or_else(|| RendererError::DeviceRequest("no adapter".into()))?;
        log::info!("adapter: {:?}", adapter.get_info());
        adapter
            .request_device(&wgpu::DeviceDescriptor::default(), None)
            .await
            .map_err(|e| RendererError::DeviceRequest(e.to_string()))
    })
}

/// Tessera plugin: owns the renderer and the particle mirrors; implements RenderBackend.
pub struct TesseraPlugin {
    renderer: Renderer,
    particles: CoreMirrorSet,
    particle_sync: Option<SyncReceiver>,
    renderer_ids: SequentialIds,
    prepared: bool,
}

impl TesseraPlugin {
    pub fn new(device: wgpu::Device, queue: wgpu::Queue) -> Result<Self, RendererError> {
        Self::new_with_config(device, queue, TesseraConfig::default())
    }

    pub fn new_with_config(device: wgpu::Device, queue: wgpu::Queue, config: TesseraConfig) -> Result<Self, RendererError> {
        let renderer = Renderer::new_with_config(device, queue, config)?;
        Ok(Self {
            renderer,
            particles: CoreMirrorSet::new(),
            particle_sync: None,
            renderer_ids: SequentialIds::default(),
            prepared: false,
        })
    }

    /// Plugin on a device of the default adapter.
    pub fn new_headless(config: TesseraConfig) -> Result<Self, RendererError> {
        let (device, queue) = request_headless_device()?;
        Self::new_with_config(device, queue, config)
    }

    /// Receiving end of the channel the simulation thread's `ParticleManager` submits to.
    pub fn attach_particle_sync(&mut self, receiver: SyncReceiver) {
        self.particle_sync = Some(receiver);
    }

    /// Applies every batch submitted since the last call. Runs first in `render_frame`.
    pub fn begin_frame(&mut self) {
        let Some(receiver) = &self.particle_sync else {
            return;
        };
        for batch in receiver.drain() {
            self.particles.apply_batch(batch, &mut self.renderer_ids);
        }
    }

    pub fn particle_mirrors(&self) -> &CoreMirrorSet {
        &self.particles
    }

    pub fn device(&self) -> &wgpu::Device {
        self.renderer.device()
    }
    pub fn queue(&self) -> &wgpu::Queue {
        self.renderer.queue()
    }
    pub fn renderer(&self) -> &Renderer {
        &self.renderer
    }
    pub fn renderer_mut(&mut self) -> &mut Renderer {
        &mut self.renderer
    }
}

impl RenderBackend for TesseraPlugin {
    fn prepare(&mut self, scene: &ExtractedScene) {
        self.renderer.prepare(scene);
        self.prepared = true;
    }

    fn render_frame(&mut self, view: &ExtractedView) -> Result<(), BackendError> {
        if !self.prepared {
            return Err(BackendError::NotPrepared);
        }
        self.begin_frame();
        let device = self.renderer.device();
        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("tessera_plugin_frame"),
        });
        self.renderer.encode_frame(&mut encoder, view).map_err(backend_error)?;
        let cmd = encoder.finish();
        self.renderer.submit([cmd]);
        Ok(())
    }
}
