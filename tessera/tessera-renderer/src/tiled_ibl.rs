//! Tiled image based lighting: compute pass adding reflection probe, sky and SSR
//! reflections to the lit scene per 32x32 tile.

use bytemuck::{Pod, Zeroable};

use crate::bindings::{float_texture_entry, gbuffer_texture_entry, output_storage_entry, storage_buffer_entry, texture_view_entry, uniform_entry};
use crate::light_counts::ReflProbeParams;
use crate::param_block::ParamBlock;
use crate::shader::{create_module, msaa_defines, specialize};
use crate::tiling::{TileGrid, IBL_GROUP_SIZE, IBL_TILE_SIZE};
use crate::variation::{MsaaVariation, VariationTable};

const TILED_IBL_SHADER: &str = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/shaders/tiled_ibl.wgsl"));
const COVERAGE_SLOT: u32 = 16;

#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct TiledIblParams {
    pub framebuffer_size: [i32; 2],
    pub _pad: [i32; 2],
}

/// Resources one dispatch of the tiled IBL pass reads and writes.
pub struct TiledIblInputs<'a> {
    pub per_camera: &'a wgpu::Buffer,
    pub refl_probes: &'a wgpu::Buffer,
    pub gbuffer_albedo: &'a wgpu::TextureView,
    pub gbuffer_normals: &'a wgpu::TextureView,
    pub gbuffer_rough_metal: &'a wgpu::TextureView,
    pub depth: &'a wgpu::TextureView,
    pub preintegrated_env_brdf: &'a wgpu::TextureView,
    /// Cube array view of the filtered reflection probe cubemaps.
    pub refl_probe_cubemaps: &'a wgpu::TextureView,
    /// Cube view of the filtered sky radiance.
    pub sky_radiance: &'a wgpu::TextureView,
    pub ambient_occlusion: &'a wgpu::TextureView,
    pub ssr: &'a wgpu::TextureView,
    /// Light accumulation; a per-sample 2D array when multisampled.
    pub input_color: &'a wgpu::TextureView,
    pub output: &'a wgpu::TextureView,
    pub msaa_coverage: Option<&'a wgpu::TextureView>,
}

/// Analytic fit of the split-sum environment BRDF: scale and bias applied to F0.
pub fn env_brdf_approx(n_dot_v: f32, roughness: f32) -> [f32; 2] {
    let c0 = [-1.0, -0.0275, -0.572, 0.022];
    let c1 = [1.0, 0.0425, 1.04, -0.04];
    let r: [f32; 4] = std::array::from_fn(|i| roughness * c0[i] + c1[i]);
    let a004 = (r[0] * r[0]).min((-9.28 * n_dot_v).exp2()) * r[0] + r[1];
    [
        (-1.04 * a004 + r[2]).clamp(0.0, 1.0),
        (1.04 * a004 + r[3]).clamp(0.0, 1.0),
    ]
}

/// RGBA8 texels of a `size` x `size` environment BRDF lookup table: u = N.V, v = roughness.
pub fn env_brdf_lut(size: u32) -> Vec<u8> {
    let mut texels = Vec::with_capacity((size * size * 4) as usize);
    for y in 0..size {
        let roughness = (y as f32 + 0.5) / size as f32;
        for x in 0..size {
            let n_dot_v = (x as f32 + 0.5) / size as f32;
            let [scale, bias] = env_brdf_approx(n_dot_v, roughness);
            texels.extend_from_slice(&[(scale * 255.0).round() as u8, (bias * 255.0).round() as u8, 0, 255]);
        }
    }
    texels
}

pub(crate) fn tiled_ibl_source(msaa: MsaaVariation) -> String {
    let mut defines = msaa_defines(msaa);
    defines.push(("TILE_SIZE", IBL_TILE_SIZE.to_string()));
    defines.push(("GROUP_SIZE", IBL_GROUP_SIZE.to_string()));
    defines.push(("COVERAGE_SLOT", COVERAGE_SLOT.to_string()));
    if msaa.is_multisampled() {
        defines.push(("INPUT_TEX", "texture_2d_array<f32>".into()));
        defines.push(("LOAD_INPUT", "textureLoad(gInColor, px, sample_index, 0)".into()));
    } else {
        defines.push(("INPUT_TEX", "texture_2d<f32>".into()));
        defines.push(("LOAD_INPUT", "textureLoad(gInColor, px, 0)".into()));
    }
    specialize(TILED_IBL_SHADER, &defines)
}

struct IblPipeline {
    layout: wgpu::BindGroupLayout,
    pipeline: wgpu::ComputePipeline,
}

pub struct TiledImageBasedLightingPass {
    pipelines: VariationTable<MsaaVariation, IblPipeline>,
    params: ParamBlock<TiledIblParams>,
    refl_probe_params: ParamBlock<ReflProbeParams>,
    sampler: wgpu::Sampler,
}

impl TiledImageBasedLightingPass {
    pub fn new(device: &wgpu::Device) -> Self {
        let pipelines = VariationTable::build(|msaa: MsaaVariation| {
            let input_dimension = if msaa.is_multisampled() { wgpu::TextureViewDimension::D2Array } else { wgpu::TextureViewDimension::D2 };
            let mut entries = vec![
                uniform_entry(0, ParamBlock::<TiledIblParams>::min_binding_size()),
                uniform_entry(1, ParamBlock::<ReflProbeParams>::min_binding_size()),
                uniform_entry(2, None),
                gbuffer_texture_entry(3, msaa, false),
                gbuffer_texture_entry(4, msaa, false),
                gbuffer_texture_entry(5, msaa, false),
                gbuffer_texture_entry(6, msaa, true),
                float_texture_entry(7, wgpu::TextureViewDimension::D2, true),
                storage_buffer_entry(8),
                float_texture_entry(9, wgpu::TextureViewDimension::CubeArray, true),
                float_texture_entry(10, wgpu::TextureViewDimension::Cube, true),
                float_texture_entry(11, wgpu::TextureViewDimension::D2, true),
                float_texture_entry(12, wgpu::TextureViewDimension::D2, true),
                wgpu::BindGroupLayoutEntry { binding: 13, visibility: wgpu::ShaderStages::COMPUTE, ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering), count: None },
                float_texture_entry(14, input_dimension, false),
                output_storage_entry(15, msaa),
            ];
            if msaa.is_multisampled() {
                entries.push(float_texture_entry(COVERAGE_SLOT, wgpu::TextureViewDimension::D2, false));
            }
            let layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("tiled_ibl_bind_group_layout"),
                entries: &entries,
            });
            let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("tiled_ibl_pipeline_layout"),
                bind_group_layouts: &[&layout],
                push_constant_ranges: &[],
            });
            let module = create_module(device, "tiled_ibl_shader", tiled_ibl_source(msaa));
            let pipeline = device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
                label: Some("tiled_ibl_pipeline"),
                layout: Some(&pipeline_layout),
                module: &module,
                entry_point: Some("main"),
                compilation_options: Default::default(),
                cache: None,
            });
            IblPipeline { layout, pipeline }
        });
        log::info!("tiled IBL: built {} MSAA variations", pipelines.len());
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("tiled_ibl_sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });
        Self {
            pipelines,
            params: ParamBlock::new(device, "tiled_ibl_params", TiledIblParams::default()),
            refl_probe_params: ParamBlock::new(device, "refl_probe_params", ReflProbeParams::default()),
            sampler,
        }
    }

    pub fn variation(msaa_count: u32) -> MsaaVariation {
        MsaaVariation::from_sample_count(msaa_count)
    }

    pub fn execute(
        &mut self,
        encoder: &mut wgpu::CommandEncoder,
        device: &wgpu::Device,
        msaa: MsaaVariation,
        width: u32,
        height: u32,
        refl_probe_params: ReflProbeParams,
        inputs: &TiledIblInputs<'_>,
    ) {
        self.params.set(TiledIblParams { framebuffer_size: [width as i32, height as i32], _pad: [0; 2] });
        self.refl_probe_params.set(refl_probe_params);
        self.params.flush_to_gpu(device, encoder);
        self.refl_probe_params.flush_to_gpu(device, encoder);

        let entry = self.pipelines.get(msaa);
        let mut entries = vec![
            wgpu::BindGroupEntry { binding: 0, resource: self.params.binding() },
            wgpu::BindGroupEntry { binding: 1, resource: self.refl_probe_params.binding() },
            wgpu::BindGroupEntry { binding: 2, resource: inputs.per_camera.as_entire_binding() },
            texture_view_entry(3, inputs.gbuffer_albedo),
            texture_view_entry(4, inputs.gbuffer_normals),
            texture_view_entry(5, inputs.gbuffer_rough_metal),
            texture_view_entry(6, inputs.depth),
            texture_view_entry(7, inputs.preintegrated_env_brdf),
            wgpu::BindGroupEntry { binding: 8, resource: inputs.refl_probes.as_entire_binding() },
            texture_view_entry(9, inputs.refl_probe_cubemaps),
            texture_view_entry(10, inputs.sky_radiance),
            texture_view_entry(11, inputs.ambient_occlusion),
            texture_view_entry(12, inputs.ssr),
            wgpu::BindGroupEntry { binding: 13, resource: wgpu::BindingResource::Sampler(&self.sampler) },
            texture_view_entry(14, inputs.input_color),
            texture_view_entry(15, inputs.output),
        ];
        if msaa.is_multisampled() {
            let Some(coverage) = inputs.msaa_coverage else {
                debug_assert!(false, "multisampled tiled IBL needs an MSAA coverage texture");
                log::warn!("tiled IBL: missing MSAA coverage, dispatch skipped");
                return;
            };
            entries.push(texture_view_entry(COVERAGE_SLOT, coverage));
        }
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("tiled_ibl_bind_group"),
            layout: &entry.layout,
            entries: &entries,
        });

        let grid = TileGrid::cover(width, height, IBL_TILE_SIZE);
        log::debug!(
            "tiled IBL {:?}: {:?} workgroups, {} probes, sky {}",
            msaa,
            grid.workgroups(),
            refl_probe_params.num_probes,
            refl_probe_params.use_sky != 0
        );
        let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
            label: Some("tiled_ibl_pass"),
            timestamp_writes: None,
        });
        pass.set_pipeline(&entry.pipeline);
        pass.set_bind_group(0, &bind_group, &[]);
        grid.dispatch(&mut pass);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_brdf_is_bounded() {
        for i in 0..=16 {
            for j in 0..=16 {
                let [scale, bias] = env_brdf_approx(i as f32 / 16.0, j as f32 / 16.0);
                assert!((0.0..=1.0).contains(&scale));
                assert!((0.0..=1.0).contains(&bias));
            }
        }
        // Smooth surfaces viewed head-on reflect close to F0.
        let [scale, bias] = env_brdf_approx(1.0, 0.0);
        assert!(scale > 0.9 && bias < 0.05);
    }

    #[test]
    fn lut_has_one_texel_per_cell() {
        assert_eq!(env_brdf_lut(32).len(), 32 * 32 * 4);
    }

    #[test]
    fn sources_specialize_per_variation() {
        for msaa in MsaaVariation::ALL {
            let source = tiled_ibl_source(msaa);
            assert!(!source.contains("#{"));
            assert!(source.contains("@workgroup_size(16, 16, 1)"));
            assert!(source.contains("const TILE_SIZE: u32 = 32u;"));
            assert_eq!(source.contains("texture_2d_array<f32>"), msaa.is_multisampled());
        }
        assert_eq!(std::mem::size_of::<TiledIblParams>(), 16);
    }
}
