//! Tessera Renderer: wgpu compute passes for tiled deferred lighting and tiled image
//! based lighting over a host-filled GBuffer.

pub mod array_to_msaa;
mod bindings;
pub mod clear;
pub mod config;
pub mod error;
pub mod gpu_array;
pub mod ibl_textures;
pub mod light_counts;
pub mod param_block;
pub mod resources;
mod shader;
pub mod tiled_ibl;
pub mod tiled_lighting;
pub mod tiling;
pub mod variation;
pub mod view;

use render_api::{ExtractedScene, ExtractedView, SkyboxInfo};

pub use array_to_msaa::TextureArrayToMsaaPass;
pub use clear::{ClearLoadStorePass, ClearParams, TextureSurface};
pub use config::TesseraConfig;
pub use error::RendererError;
pub use gpu_array::StorageArray;
pub use ibl_textures::DefaultIblTextures;
pub use light_counts::{
    visible_skybox, GpuLight, GpuReflProbe, LightCountBlock, ReflProbeParams, VisibleLightData, VisibleReflProbeData,
};
pub use param_block::{ParamBlock, Staged};
pub use resources::FrameResources;
pub use tiled_ibl::{TiledIblInputs, TiledIblParams, TiledImageBasedLightingPass};
pub use tiled_lighting::{TiledDeferredLightingPass, TiledLightingInputs, TiledLightingParams};
pub use tiling::TileGrid;
pub use variation::{ClearDataKind, ClearTargetKind, ClearVariation, MsaaVariation, Variation, VariationTable};
pub use view::PerCameraUniform;

/// Sample count the device can render every frame target with. Counts the formats do
/// not guarantee fall back to 4, which WebGPU requires for all of them.
pub fn supported_msaa(requested: MsaaVariation, features: wgpu::Features) -> MsaaVariation {
    let samples = requested.sample_count();
    let formats = [
        resources::GBUFFER_FORMAT,
        resources::DEPTH_FORMAT,
        array_to_msaa::MSAA_TARGET_FORMAT,
    ];
    let supported = formats
        .iter()
        .all(|f| f.guaranteed_format_features(features).flags.sample_count_supported(samples));
    if supported {
        requested
    } else {
        log::warn!("{}x MSAA is not guaranteed for the frame targets, using 4x", samples);
        MsaaVariation::X4
    }
}

/// Host-supplied IBL inputs. Unset entries bind a `DefaultIblTextures` fallback.
#[derive(Default)]
struct IblSources {
    sky_radiance: Option<wgpu::TextureView>,
    refl_cubemaps: Option<(wgpu::TextureView, u32)>,
    ambient_occlusion: Option<wgpu::TextureView>,
    ssr: Option<wgpu::TextureView>,
}

pub struct Renderer {
    device: wgpu::Device,
    queue: wgpu::Queue,
    config: TesseraConfig,
    msaa: MsaaVariation,
    clear_pass: ClearLoadStorePass,
    lighting_pass: TiledDeferredLightingPass,
    ibl_pass: TiledImageBasedLightingPass,
    array_to_msaa: TextureArrayToMsaaPass,
    per_camera: ParamBlock<PerCameraUniform>,
    lights: StorageArray<GpuLight>,
    refl_probes: StorageArray<GpuReflProbe>,
    defaults: DefaultIblTextures,
    ibl_sources: IblSources,
    visible_lights: VisibleLightData,
    visible_probes: VisibleReflProbeData,
    skybox: Option<SkyboxInfo>,
    frame_resources: Option<FrameResources>,
}

impl Renderer {
    pub fn new(device: wgpu::Device, queue: wgpu::Queue) -> Result<Self, RendererError> {
        Self::new_with_config(device, queue, TesseraConfig::default())
    }

    pub fn new_with_config(device: wgpu::Device, queue: wgpu::Queue, config: TesseraConfig) -> Result<Self, RendererError> {
        let msaa = supported_msaa(MsaaVariation::from_sample_count(config.msaa_count), device.features());
        let clear_pass = ClearLoadStorePass::new(&device);
        let lighting_pass = TiledDeferredLightingPass::new(&device);
        let ibl_pass = TiledImageBasedLightingPass::new(&device);
        let array_to_msaa = TextureArrayToMsaaPass::new(&device, &[msaa]);
        let per_camera = ParamBlock::new(&device, "per_camera", PerCameraUniform::from_view(&ExtractedView::default()));
        let lights = StorageArray::new(&device, "visible_lights", 64.min(config.max_lights as usize));
        let refl_probes = StorageArray::new(&device, "visible_refl_probes", 16.min(config.max_refl_probes as usize));
        let defaults = DefaultIblTextures::new(&device, &queue);
        log::info!("tessera renderer: {:?}, {} max lights", msaa, config.max_lights);
        Ok(Self {
            device,
            queue,
            config,
            msaa,
            clear_pass,
            lighting_pass,
            ibl_pass,
            array_to_msaa,
            per_camera,
            lights,
            refl_probes,
            defaults,
            ibl_sources: IblSources::default(),
            visible_lights: VisibleLightData::default(),
            visible_probes: VisibleReflProbeData::default(),
            skybox: None,
            frame_resources: None,
        })
    }

    pub fn device(&self) -> &wgpu::Device { &self.device }
    pub fn queue(&self) -> &wgpu::Queue { &self.queue }
    pub fn config(&self) -> &TesseraConfig { &self.config }
    pub fn msaa(&self) -> MsaaVariation { self.msaa }

    pub fn clear_pass(&self) -> &ClearLoadStorePass {
        &self.clear_pass
    }

    pub fn ensure_frame_resources(&mut self, width: u32, height: u32) -> Result<&FrameResources, RendererError> {
        let existing = self.frame_resources.take();
        let frame = FrameResources::ensure_size(&self.device, existing, width, height, self.msaa)?;
        Ok(&*self.frame_resources.insert(frame))
    }

    /// Frame targets of the last `ensure_frame_resources` or `encode_frame`.
    pub fn frame_resources(&self) -> Option<&FrameResources> {
        self.frame_resources.as_ref()
    }

    /// Cube view of the filtered sky radiance; `None` unbinds it.
    pub fn set_sky_radiance(&mut self, view: Option<wgpu::TextureView>) {
        self.ibl_sources.sky_radiance = view;
    }

    /// Cube array view indexed by `ExtractedReflProbe::cubemap_index`, with its mip count.
    pub fn set_reflection_cubemaps(&mut self, view: Option<wgpu::TextureView>, num_mips: u32) {
        self.ibl_sources.refl_cubemaps = view.map(|v| (v, num_mips));
    }

    pub fn set_ambient_occlusion(&mut self, view: Option<wgpu::TextureView>) {
        self.ibl_sources.ambient_occlusion = view;
    }

    pub fn set_ssr(&mut self, view: Option<wgpu::TextureView>) {
        self.ibl_sources.ssr = view;
    }

    /// Takes the lights, probes and sky of the next frames.
    pub fn prepare(&mut self, scene: &ExtractedScene) {
        self.visible_lights = VisibleLightData::with_capacity_limit(&scene.lights, self.config.max_lights as usize);
        self.visible_probes = VisibleReflProbeData::with_capacity_limit(&scene.refl_probes, self.config.max_refl_probes as usize);
        self.skybox = scene.skybox;
    }

    pub fn visible_lights(&self) -> &VisibleLightData {
        &self.visible_lights
    }

    /// Records one view: tiled lighting into the light accumulation, IBL into scene
    /// color, then the per-sample copy into the MSAA target when multisampled.
    pub fn encode_frame(&mut self, encoder: &mut wgpu::CommandEncoder, view: &ExtractedView) -> Result<(), RendererError> {
        let (width, height) = (view.viewport.width, view.viewport.height);
        self.ensure_frame_resources(width, height)?;
        let frame = self.frame_resources.as_ref().ok_or(RendererError::NoFrameResources)?;
        let settings = &view.render_settings;

        if self.config.clear_shadowed_input {
            self.clear_pass.clear_texture(
                encoder,
                &self.device,
                &frame.shadowed_lighting,
                [0.0; 4],
                TextureSurface::default(),
            );
        }

        let light_counts = LightCountBlock::pack(&self.visible_lights, settings);
        let uploaded = self.visible_lights.effective_lights(settings);
        debug_assert_eq!(uploaded.len() as i32, light_counts.total());
        self.lights.upload(&self.device, encoder, &uploaded);

        self.per_camera.set(PerCameraUniform::from_view(view));
        self.per_camera.flush_to_gpu(&self.device, encoder);

        let gbuffer_albedo = frame.gbuffer_albedo_view();
        let gbuffer_normals = frame.gbuffer_normals_view();
        let gbuffer_rough_metal = frame.gbuffer_rough_metal_view();
        let depth = frame.depth_view();
        let shadowed_lighting = frame.shadowed_lighting_view();
        let light_accumulation = frame.light_accumulation_view();
        let scene_color = frame.scene_color_view();
        let coverage = frame.msaa_coverage_view();

        self.lighting_pass.execute(
            encoder,
            &self.device,
            self.msaa,
            width,
            height,
            &light_counts,
            &TiledLightingInputs {
                per_camera: self.per_camera.buffer(),
                lights: self.lights.buffer(),
                gbuffer_albedo: &gbuffer_albedo,
                gbuffer_normals: &gbuffer_normals,
                gbuffer_rough_metal: &gbuffer_rough_metal,
                depth: &depth,
                input_color: &shadowed_lighting,
                output: &light_accumulation,
                msaa_coverage: coverage.as_ref(),
            },
        );

        self.refl_probes.upload(&self.device, encoder, self.visible_probes.probes());
        let sources = &self.ibl_sources;
        let sky = visible_skybox(settings, self.skybox.as_ref()).filter(|_| sources.sky_radiance.is_some());
        let (refl_cubemaps, refl_mips) = match &sources.refl_cubemaps {
            Some((cubemaps, mips)) => (cubemaps, *mips),
            None => (&self.defaults.black_cube_array, 1),
        };
        let num_probes = if sources.refl_cubemaps.is_some() { self.visible_probes.num_probes() } else { 0 };
        let mut probe_params = ReflProbeParams::populate(sky, num_probes, refl_mips, view.capturing_reflections);
        probe_params.sky_brightness *= self.config.sky_brightness;
        let sky_radiance = match (sky, &sources.sky_radiance) {
            (Some(_), Some(radiance)) => radiance,
            _ => &self.defaults.black_cube,
        };

        self.ibl_pass.execute(
            encoder,
            &self.device,
            self.msaa,
            width,
            height,
            probe_params,
            &TiledIblInputs {
                per_camera: self.per_camera.buffer(),
                refl_probes: self.refl_probes.buffer(),
                gbuffer_albedo: &gbuffer_albedo,
                gbuffer_normals: &gbuffer_normals,
                gbuffer_rough_metal: &gbuffer_rough_metal,
                depth: &depth,
                preintegrated_env_brdf: &self.defaults.env_brdf_lut,
                refl_probe_cubemaps: refl_cubemaps,
                sky_radiance,
                ambient_occlusion: sources.ambient_occlusion.as_ref().unwrap_or(&self.defaults.white),
                ssr: sources.ssr.as_ref().unwrap_or(&self.defaults.transparent_black),
                input_color: &light_accumulation,
                output: &scene_color,
                msaa_coverage: coverage.as_ref(),
            },
        );

        if let Some(target) = &frame.msaa_scene_color {
            self.array_to_msaa.execute(encoder, &self.device, &frame.scene_color, target);
        }
        Ok(())
    }

    pub fn render_frame(&mut self, view: &ExtractedView) -> Result<wgpu::CommandBuffer, RendererError> {
        let mut encoder = self.device.create_command_encoder(&wgpu::CommandEncoderDescriptor { label: Some("tessera_frame") });
        self.encode_frame(&mut encoder, view)?;
        Ok(encoder.finish())
    }

    /// Command buffers of several `render_frame` calls may go into one submit; every
    /// parameter upload is recorded in the command buffer that reads it.
    pub fn submit(&self, command_buffers: impl IntoIterator<Item = wgpu::CommandBuffer>) {
        self.queue.submit(command_buffers);
    }
}
