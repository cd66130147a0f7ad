//! Texture array to MSAA: writes slice i of a 2D array into sample i of a
//! multisampled render target with per-sample shading.

use crate::variation::{MsaaVariation, VariationTable};

const ARRAY_TO_MSAA_SHADER: &str = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/shaders/array_to_msaa.wgsl"));

/// Format of the multisampled scene color target.
pub const MSAA_TARGET_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba16Float;

struct ResolvePipeline {
    layout: wgpu::BindGroupLayout,
    pipeline: wgpu::RenderPipeline,
}

pub struct TextureArrayToMsaaPass {
    pipelines: VariationTable<MsaaVariation, Option<ResolvePipeline>>,
}

impl TextureArrayToMsaaPass {
    /// Builds pipelines for the multisampled variations in `enabled`. Sample counts the
    /// device cannot render to must be left out.
    pub fn new(device: &wgpu::Device, enabled: &[MsaaVariation]) -> Self {
        let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("array_to_msaa_shader"),
            source: wgpu::ShaderSource::Wgsl(ARRAY_TO_MSAA_SHADER.into()),
        });
        let pipelines = VariationTable::build(|msaa: MsaaVariation| {
            if !msaa.is_multisampled() || !enabled.contains(&msaa) {
                return None;
            }
            let layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("array_to_msaa_bind_group_layout"),
                entries: &[wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: false },
                        view_dimension: wgpu::TextureViewDimension::D2Array,
                        multisampled: false,
                    },
                    count: None,
                }],
            });
            let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("array_to_msaa_pipeline_layout"),
                bind_group_layouts: &[&layout],
                push_constant_ranges: &[],
            });
            let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some("array_to_msaa_pipeline"),
                layout: Some(&pipeline_layout),
                vertex: wgpu::VertexState {
                    module: &module,
                    entry_point: Some("vs"),
                    buffers: &[],
                    compilation_options: Default::default(),
                },
                fragment: Some(wgpu::FragmentState {
                    module: &module,
                    entry_point: Some("fs"),
                    targets: &[Some(wgpu::ColorTargetState {
                        format: MSAA_TARGET_FORMAT,
                        blend: None,
                        write_mask: wgpu::ColorWrites::ALL,
                    })],
                    compilation_options: Default::default(),
                }),
                primitive: wgpu::PrimitiveState::default(),
                depth_stencil: None,
                multisample: wgpu::MultisampleState { count: msaa.sample_count(), ..Default::default() },
                multiview: None,
                cache: None,
            });
            Some(ResolvePipeline { layout, pipeline })
        });
        log::info!(
            "array to MSAA: built {} of {} variations",
            pipelines.iter().filter(|(_, p)| p.is_some()).count(),
            pipelines.len()
        );
        Self { pipelines }
    }

    pub fn supports(&self, msaa: MsaaVariation) -> bool {
        self.pipelines.get(msaa).is_some()
    }

    /// `source` must have one slice per sample of `target`, and both must share a size.
    pub fn execute(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        device: &wgpu::Device,
        source: &wgpu::Texture,
        target: &wgpu::Texture,
    ) {
        debug_assert_eq!(source.depth_or_array_layers(), target.sample_count(), "one array slice per sample");
        debug_assert_eq!(source.width(), target.width());
        debug_assert_eq!(source.height(), target.height());

        let msaa = MsaaVariation::from_sample_count(target.sample_count());
        let Some(entry) = self.pipelines.get(msaa) else {
            debug_assert!(msaa.is_multisampled(), "array to MSAA needs a multisampled target");
            log::warn!("array to MSAA: no pipeline for {:?}, copy skipped", msaa);
            return;
        };

        let source_view = source.create_view(&wgpu::TextureViewDescriptor {
            label: Some("array_to_msaa_source"),
            dimension: Some(wgpu::TextureViewDimension::D2Array),
            ..Default::default()
        });
        let target_view = target.create_view(&wgpu::TextureViewDescriptor::default());
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("array_to_msaa_bind_group"),
            layout: &entry.layout,
            entries: &[wgpu::BindGroupEntry { binding: 0, resource: wgpu::BindingResource::TextureView(&source_view) }],
        });
        log::debug!("array to MSAA {:?}: {}x{}", msaa, target.width(), target.height());
        let mut rp = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("array_to_msaa_pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: &target_view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
        });
        rp.set_pipeline(&entry.pipeline);
        rp.set_bind_group(0, &bind_group, &[]);
        rp.draw(0..3, 0..1);
    }
}
