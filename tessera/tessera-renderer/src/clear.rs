//! Clear utility: compute clear of storage textures, texture array layers and structured buffers.

use bytemuck::{Pod, Zeroable};
use wgpu::util::DeviceExt;

use crate::shader::{create_module, specialize};
use crate::tiling::{TileGrid, CLEAR_NUM_THREADS, CLEAR_TILE_SIZE};
use crate::variation::{ClearDataKind, ClearTargetKind, ClearVariation, VariationTable};

const CLEAR_TEXTURE_SHADER: &str = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/shaders/clear_texture.wgsl"));
const CLEAR_BUFFER_SHADER: &str = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/shaders/clear_buffer.wgsl"));

/// Clear pass parameters. Both encodings of the clear color are always uploaded; the
/// pipeline reads the one matching its numeric kind.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct ClearParams {
    pub size: [i32; 2],
    pub layer: i32,
    pub _pad: i32,
    pub float_clear_val: [f32; 4],
    /// Bit patterns of `float_clear_val`.
    pub int_clear_val: [i32; 4],
}

impl ClearParams {
    pub fn new(size: [i32; 2], layer: i32, clear_value: [f32; 4]) -> Self {
        Self {
            size,
            layer,
            _pad: 0,
            float_clear_val: clear_value,
            int_clear_val: clear_value.map(|c| c.to_bits() as i32),
        }
    }
}

/// Mip level and array layer a texture clear writes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TextureSurface {
    pub mip_level: u32,
    pub array_layer: u32,
}

/// Size in bytes of one buffer element of a clear variation (std430 array stride).
pub fn buffer_element_stride(channels: u32) -> u64 {
    match channels {
        1 => 4,
        2 => 8,
        _ => 16,
    }
}

fn wgsl_storage_format(format: wgpu::TextureFormat) -> &'static str {
    use wgpu::TextureFormat as F;
    match format {
        F::R32Float => "r32float",
        F::Rg32Float => "rg32float",
        F::R32Sint => "r32sint",
        F::Rg32Sint => "rg32sint",
        F::Rgba32Sint => "rgba32sint",
        _ => "rgba32float",
    }
}

fn clear_value_expr(data: ClearDataKind, channels: u32) -> String {
    let (field, scalar) = match data {
        ClearDataKind::Float => ("gParams.float_clear_val", "f32"),
        ClearDataKind::Int => ("gParams.int_clear_val", "i32"),
    };
    match channels {
        1 => format!("{field}.x"),
        2 => format!("vec2<{scalar}>({field}.xy)"),
        3 => format!("vec3<{scalar}>({field}.xyz)"),
        _ => field.to_string(),
    }
}

fn buffer_element(data: ClearDataKind, channels: u32) -> String {
    let scalar = match data {
        ClearDataKind::Float => "f32",
        ClearDataKind::Int => "i32",
    };
    match channels {
        1 => scalar.to_string(),
        n => format!("vec{n}<{scalar}>"),
    }
}

/// Shader source of one clear variation.
pub(crate) fn clear_shader_source(variation: ClearVariation) -> String {
    let mut defines = vec![
        ("TILE_SIZE", CLEAR_TILE_SIZE.to_string()),
        ("NUM_THREADS", CLEAR_NUM_THREADS.to_string()),
        ("GROUP_THREADS", (CLEAR_NUM_THREADS * CLEAR_NUM_THREADS).to_string()),
    ];
    let value = match variation.data() {
        ClearDataKind::Float => "gParams.float_clear_val",
        ClearDataKind::Int => "gParams.int_clear_val",
    };
    let format = wgsl_storage_format(variation.storage_format());
    match variation.target() {
        ClearTargetKind::Texture => {
            defines.push(("OUTPUT_TEX", format!("texture_storage_2d<{format}, write>")));
            defines.push(("STORE", format!("textureStore(gOutput, px, {value});")));
            specialize(CLEAR_TEXTURE_SHADER, &defines)
        }
        ClearTargetKind::TextureArray => {
            defines.push(("OUTPUT_TEX", format!("texture_storage_2d_array<{format}, write>")));
            defines.push(("STORE", format!("textureStore(gOutput, px, gParams.layer, {value});")));
            specialize(CLEAR_TEXTURE_SHADER, &defines)
        }
        ClearTargetKind::Buffer => {
            defines.push(("ELEMENT", buffer_element(variation.data(), variation.channels())));
            defines.push(("VALUE", clear_value_expr(variation.data(), variation.channels())));
            specialize(CLEAR_BUFFER_SHADER, &defines)
        }
    }
}

struct ClearPipeline {
    layout: wgpu::BindGroupLayout,
    pipeline: wgpu::ComputePipeline,
}

/// Clears load-store targets through a compute pass, one pipeline per `ClearVariation`.
pub struct ClearLoadStorePass {
    pipelines: VariationTable<ClearVariation, ClearPipeline>,
}

impl ClearLoadStorePass {
    pub fn new(device: &wgpu::Device) -> Self {
        let pipelines = VariationTable::build(|variation: ClearVariation| {
            let output = match variation.target() {
                ClearTargetKind::Texture | ClearTargetKind::TextureArray => wgpu::BindingType::StorageTexture {
                    access: wgpu::StorageTextureAccess::WriteOnly,
                    format: variation.storage_format(),
                    view_dimension: if variation.target() == ClearTargetKind::Texture {
                        wgpu::TextureViewDimension::D2
                    } else {
                        wgpu::TextureViewDimension::D2Array
                    },
                },
                ClearTargetKind::Buffer => wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Storage { read_only: false },
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
            };
            let layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("clear_bind_group_layout"),
                entries: &[
                    wgpu::BindGroupLayoutEntry { binding: 0, visibility: wgpu::ShaderStages::COMPUTE, ty: wgpu::BindingType::Buffer { ty: wgpu::BufferBindingType::Uniform, has_dynamic_offset: false, min_binding_size: wgpu::BufferSize::new(std::mem::size_of::<ClearParams>() as u64) }, count: None },
                    wgpu::BindGroupLayoutEntry { binding: 1, visibility: wgpu::ShaderStages::COMPUTE, ty: output, count: None },
                ],
            });
            let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("clear_pipeline_layout"),
                bind_group_layouts: &[&layout],
                push_constant_ranges: &[],
            });
            let module = create_module(device, "clear_shader", clear_shader_source(variation));
            let pipeline = device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
                label: Some("clear_pipeline"),
                layout: Some(&pipeline_layout),
                module: &module,
                entry_point: Some("main"),
                compilation_options: Default::default(),
                cache: None,
            });
            ClearPipeline { layout, pipeline }
        });
        log::info!("clear pass: built {} pipeline variations", pipelines.len());
        Self { pipelines }
    }

    /// Writes `clear_value` into every texel of one mip (and layer) of `target`. The
    /// target must use the storage format of its variation (`ClearVariation::storage_format`).
    pub fn clear_texture(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        device: &wgpu::Device,
        target: &wgpu::Texture,
        clear_value: [f32; 4],
        surface: TextureSurface,
    ) {
        let format = target.format();
        debug_assert!(!format.is_compressed(), "cannot clear compressed format {:?}", format);
        let Some((data, channels)) = ClearVariation::for_format(format) else {
            debug_assert!(false, "format {:?} has no clear variation", format);
            log::warn!("clear_texture: unsupported format {:?}, skipped", format);
            return;
        };
        let layers = target.depth_or_array_layers();
        debug_assert!(surface.array_layer < layers, "array layer {} of {}", surface.array_layer, layers);
        debug_assert!(surface.mip_level < target.mip_level_count(), "mip level {} out of range", surface.mip_level);

        let kind = if layers > 1 { ClearTargetKind::TextureArray } else { ClearTargetKind::Texture };
        let variation = ClearVariation::select(kind, data, channels);
        debug_assert_eq!(variation.storage_format(), format);

        let width = (target.width() >> surface.mip_level).max(1);
        let height = (target.height() >> surface.mip_level).max(1);
        let view = target.create_view(&wgpu::TextureViewDescriptor {
            label: Some("clear_target_view"),
            dimension: Some(if layers > 1 { wgpu::TextureViewDimension::D2Array } else { wgpu::TextureViewDimension::D2 }),
            base_mip_level: surface.mip_level,
            mip_level_count: Some(1),
            ..Default::default()
        });
        let params = ClearParams::new([width as i32, height as i32], surface.array_layer as i32, clear_value);
        let grid = TileGrid::cover(width, height, CLEAR_NUM_THREADS * CLEAR_TILE_SIZE);
        self.dispatch(encoder, device, variation, &params, wgpu::BindingResource::TextureView(&view), grid);
    }

    /// Writes `clear_value` into the first `element_count` elements of `target`, read as
    /// an array of `channels`-wide `data` values.
    pub fn clear_buffer(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        device: &wgpu::Device,
        target: &wgpu::Buffer,
        element_count: u32,
        data: ClearDataKind,
        channels: u32,
        clear_value: [f32; 4],
    ) {
        let variation = ClearVariation::select(ClearTargetKind::Buffer, data, channels);
        debug_assert!(
            target.size() >= element_count as u64 * buffer_element_stride(variation.channels()),
            "buffer of {} bytes is too small for {} elements",
            target.size(),
            element_count
        );
        let params = ClearParams::new([element_count as i32, 1], 0, clear_value);
        let grid = TileGrid::linear(element_count, CLEAR_NUM_THREADS * CLEAR_NUM_THREADS, CLEAR_TILE_SIZE);
        self.dispatch(encoder, device, variation, &params, target.as_entire_binding(), grid);
    }

    fn dispatch(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        device: &wgpu::Device,
        variation: ClearVariation,
        params: &ClearParams,
        output: wgpu::BindingResource<'_>,
        grid: TileGrid,
    ) {
        let entry = self.pipelines.get(variation);
        // Own buffer per call: several clears recorded into one encoder must not share parameters.
        let params_buf = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("clear_params"),
            contents: bytemuck::bytes_of(params),
            usage: wgpu::BufferUsages::UNIFORM,
        });
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("clear_bind_group"),
            layout: &entry.layout,
            entries: &[
                wgpu::BindGroupEntry { binding: 0, resource: params_buf.as_entire_binding() },
                wgpu::BindGroupEntry { binding: 1, resource: output },
            ],
        });
        log::debug!("clear {:?}: {:?} workgroups", variation, grid.workgroups());
        let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
            label: Some("clear_pass"),
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
    fn int_encoding_is_float_bit_pattern() {
        let value = [0.25, -1.0, 3.5, 1.0];
        let params = ClearParams::new([4, 4], 0, value);
        assert_eq!(params.float_clear_val, value);
        for (f, i) in params.float_clear_val.iter().zip(params.int_clear_val) {
            assert_eq!(f.to_bits(), i as u32);
        }
        assert_eq!(std::mem::size_of::<ClearParams>(), 48);
    }

    #[test]
    fn every_variation_specializes_fully() {
        for v in ClearVariation::ALL {
            let source = clear_shader_source(v);
            assert!(!source.contains("#{"), "{:?}", v);
            match v.target() {
                ClearTargetKind::Buffer => assert!(source.contains("var<storage, read_write>")),
                ClearTargetKind::TextureArray => assert!(source.contains("gParams.layer")),
                ClearTargetKind::Texture => assert!(source.contains("texture_storage_2d<")),
            }
        }
    }

    #[test]
    fn buffer_elements_match_channels() {
        assert_eq!(buffer_element(ClearDataKind::Float, 1), "f32");
        assert_eq!(buffer_element(ClearDataKind::Int, 3), "vec3<i32>");
        assert_eq!(clear_value_expr(ClearDataKind::Int, 2), "vec2<i32>(gParams.int_clear_val.xy)");
        assert_eq!(buffer_element_stride(3), 16);
    }
}
