//! Tiled deferred lighting: compute pass shading unshadowed lights per 16x16 tile.

use bytemuck::{Pod, Zeroable};

use crate::bindings::{float_texture_entry, gbuffer_texture_entry, output_storage_entry, storage_buffer_entry, uniform_entry};
use crate::light_counts::LightCountBlock;
use crate::param_block::ParamBlock;
use crate::shader::{create_module, msaa_defines, specialize};
use crate::tiling::{TileGrid, LIGHTING_TILE_SIZE};
use crate::variation::{MsaaVariation, VariationTable};

const TILED_LIGHTING_SHADER: &str = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/shaders/tiled_lighting.wgsl"));
const COVERAGE_SLOT: u32 = 9;

#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct TiledLightingParams {
    pub framebuffer_size: [i32; 2],
    pub light_strides: [i32; 2],
    pub light_counts: [i32; 4],
}

impl TiledLightingParams {
    pub fn new(width: u32, height: u32, lights: &LightCountBlock) -> Self {
        Self {
            framebuffer_size: [width as i32, height as i32],
            light_strides: lights.strides,
            light_counts: lights.counts,
        }
    }
}

/// Resources one dispatch of the tiled lighting pass reads and writes.
pub struct TiledLightingInputs<'a> {
    pub per_camera: &'a wgpu::Buffer,
    pub lights: &'a wgpu::Buffer,
    pub gbuffer_albedo: &'a wgpu::TextureView,
    pub gbuffer_normals: &'a wgpu::TextureView,
    pub gbuffer_rough_metal: &'a wgpu::TextureView,
    pub depth: &'a wgpu::TextureView,
    /// Shadowed-light accumulation the unshadowed lighting is added to.
    pub input_color: &'a wgpu::TextureView,
    /// 2D storage texture, or a per-sample 2D array when multisampled.
    pub output: &'a wgpu::TextureView,
    /// Required when multisampled.
    pub msaa_coverage: Option<&'a wgpu::TextureView>,
}

pub(crate) fn tiled_lighting_source(msaa: MsaaVariation) -> String {
    let mut defines = msaa_defines(msaa);
    defines.push(("TILE_SIZE", LIGHTING_TILE_SIZE.to_string()));
    defines.push(("COVERAGE_SLOT", COVERAGE_SLOT.to_string()));
    specialize(TILED_LIGHTING_SHADER, &defines)
}

struct LightingPipeline {
    layout: wgpu::BindGroupLayout,
    pipeline: wgpu::ComputePipeline,
}

pub struct TiledDeferredLightingPass {
    pipelines: VariationTable<MsaaVariation, LightingPipeline>,
    params: ParamBlock<TiledLightingParams>,
}

impl TiledDeferredLightingPass {
    pub fn new(device: &wgpu::Device) -> Self {
        let pipelines = VariationTable::build(|msaa: MsaaVariation| {
            let mut entries = vec![
                uniform_entry(0, ParamBlock::<TiledLightingParams>::min_binding_size()),
                uniform_entry(1, None),
                storage_buffer_entry(2),
                gbuffer_texture_entry(3, msaa, false),
                gbuffer_texture_entry(4, msaa, false),
                gbuffer_texture_entry(5, msaa, false),
                gbuffer_texture_entry(6, msaa, true),
                float_texture_entry(7, wgpu::TextureViewDimension::D2, false),
                output_storage_entry(8, msaa),
            ];
            if msaa.is_multisampled() {
                entries.push(float_texture_entry(COVERAGE_SLOT, wgpu::TextureViewDimension::D2, false));
            }
            let layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("tiled_lighting_bind_group_layout"),
                entries: &entries,
            });
            let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("tiled_lighting_pipeline_layout"),
                bind_group_layouts: &[&layout],
                push_constant_ranges: &[],
            });
            let module = create_module(device, "tiled_lighting_shader", tiled_lighting_source(msaa));
            let pipeline = device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
                label: Some("tiled_lighting_pipeline"),
                layout: Some(&pipeline_layout),
                module: &module,
                entry_point: Some("main"),
                compilation_options: Default::default(),
                cache: None,
            });
            LightingPipeline { layout, pipeline }
        });
        log::info!("tiled lighting: built {} MSAA variations", pipelines.len());
        let params = ParamBlock::new(device, "tiled_lighting_params", TiledLightingParams::default());
        Self { pipelines, params }
    }

    /// Pipeline variation for a sample count; see `MsaaVariation::from_sample_count`.
    pub fn variation(msaa_count: u32) -> MsaaVariation {
        MsaaVariation::from_sample_count(msaa_count)
    }

    /// Records the lighting dispatch. `light_counts` must describe the light array bound
    /// in `inputs.lights`.
    pub fn execute(
        &mut self,
        encoder: &mut wgpu::CommandEncoder,
        device: &wgpu::Device,
        msaa: MsaaVariation,
        width: u32,
        height: u32,
        light_counts: &LightCountBlock,
        inputs: &TiledLightingInputs<'_>,
    ) {
        self.params.set(TiledLightingParams::new(width, height, light_counts));
        self.params.flush_to_gpu(device, encoder);

        let entry = self.pipelines.get(msaa);
        let mut entries = vec![
            wgpu::BindGroupEntry { binding: 0, resource: self.params.binding() },
            wgpu::BindGroupEntry { binding: 1, resource: inputs.per_camera.as_entire_binding() },
            wgpu::BindGroupEntry { binding: 2, resource: inputs.lights.as_entire_binding() },
            wgpu::BindGroupEntry { binding: 3, resource: wgpu::BindingResource::TextureView(inputs.gbuffer_albedo) },
            wgpu::BindGroupEntry { binding: 4, resource: wgpu::BindingResource::TextureView(inputs.gbuffer_normals) },
            wgpu::BindGroupEntry { binding: 5, resource: wgpu::BindingResource::TextureView(inputs.gbuffer_rough_metal) },
            wgpu::BindGroupEntry { binding: 6, resource: wgpu::BindingResource::TextureView(inputs.depth) },
            wgpu::BindGroupEntry { binding: 7, resource: wgpu::BindingResource::TextureView(inputs.input_color) },
            wgpu::BindGroupEntry { binding: 8, resource: wgpu::BindingResource::TextureView(inputs.output) },
        ];
        if msaa.is_multisampled() {
            let Some(coverage) = inputs.msaa_coverage else {
                debug_assert!(false, "multisampled tiled lighting needs an MSAA coverage texture");
                log::warn!("tiled lighting: missing MSAA coverage, dispatch skipped");
                return;
            };
            entries.push(wgpu::BindGroupEntry { binding: COVERAGE_SLOT, resource: wgpu::BindingResource::TextureView(coverage) });
        }
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("tiled_lighting_bind_group"),
            layout: &entry.layout,
            entries: &entries,
        });

        let grid = TileGrid::cover(width, height, LIGHTING_TILE_SIZE);
        log::debug!(
            "tiled lighting {:?}: {:?} workgroups, light counts {:?}",
            msaa,
            grid.workgroups(),
            light_counts.counts
        );
        let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
            label: Some("tiled_lighting_pass"),
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
    fn params_layout() {
        assert_eq!(std::mem::size_of::<TiledLightingParams>(), 32);
        let block = LightCountBlock::from_counts([3, 2, 1]);
        let p = TiledLightingParams::new(1920, 1080, &block);
        assert_eq!(p.framebuffer_size, [1920, 1080]);
        assert_eq!(p.light_counts, [3, 2, 1, 6]);
        assert_eq!(p.light_strides, [3, 5]);
    }

    #[test]
    fn sources_specialize_per_variation() {
        for msaa in MsaaVariation::ALL {
            let source = tiled_lighting_source(msaa);
            assert!(!source.contains("#{"));
            assert!(source.contains("@workgroup_size(16, 16, 1)"));
            assert_eq!(source.contains("gMSAACoverage"), msaa.is_multisampled());
            assert_eq!(source.contains("texture_storage_2d_array"), msaa.is_multisampled());
        }
    }
}
