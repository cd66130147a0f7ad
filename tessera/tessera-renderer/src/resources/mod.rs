//! Frame resources: GBuffer, depth, light accumulation and scene color targets sized
//! to the view and its sample count.

use wgpu::TextureView;

use crate::array_to_msaa::MSAA_TARGET_FORMAT;
use crate::error::RendererError;
use crate::variation::MsaaVariation;

pub const GBUFFER_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;
pub const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;
/// Light accumulation and scene color; written by the tiled passes as storage.
pub const LIGHTING_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba32Float;
pub const COVERAGE_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::R8Unorm;

pub struct FrameResources {
    pub gbuffer_albedo: wgpu::Texture,
    pub gbuffer_normals: wgpu::Texture,
    pub gbuffer_rough_metal: wgpu::Texture,
    pub depth: wgpu::Texture,
    /// Shadowed lights rendered by the host; tiled lighting adds to it.
    pub shadowed_lighting: wgpu::Texture,
    /// One layer per sample when multisampled.
    pub light_accumulation: wgpu::Texture,
    /// One layer per sample when multisampled.
    pub scene_color: wgpu::Texture,
    pub msaa_scene_color: Option<wgpu::Texture>,
    /// Non-zero texels need per-sample shading.
    pub msaa_coverage: Option<wgpu::Texture>,
    width: u32,
    height: u32,
    msaa: MsaaVariation,
}

fn check_size(width: u32, height: u32) -> Result<(), RendererError> {
    if width == 0 || height == 0 {
        return Err(RendererError::ZeroSizedFrame { width, height });
    }
    Ok(())
}

/// Layers of the per-sample lighting arrays.
fn lighting_layers(msaa: MsaaVariation) -> u32 {
    msaa.sample_count()
}

impl FrameResources {
    /// Returns `existing` when it already matches the size and sample count, otherwise
    /// a fresh set.
    pub fn ensure_size(
        device: &wgpu::Device,
        existing: Option<Self>,
        width: u32,
        height: u32,
        msaa: MsaaVariation,
    ) -> Result<Self, RendererError> {
        check_size(width, height)?;
        if let Some(r) = existing {
            if r.width == width && r.height == height && r.msaa == msaa {
                return Ok(r);
            }
        }
        log::debug!("frame resources: {}x{} {:?}", width, height, msaa);

        let samples = msaa.sample_count();
        let make = |label: &str, format: wgpu::TextureFormat, sample_count: u32, layers: u32, usage: wgpu::TextureUsages| {
            device.create_texture(&wgpu::TextureDescriptor {
                label: Some(label),
                size: wgpu::Extent3d { width, height, depth_or_array_layers: layers },
                mip_level_count: 1,
                sample_count,
                dimension: wgpu::TextureDimension::D2,
                format,
                usage,
                view_formats: &[],
            })
        };
        let attachment = wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING;
        let storage = wgpu::TextureUsages::STORAGE_BINDING | wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_SRC;
        let layers = lighting_layers(msaa);

        let gbuffer_albedo = make("gbuffer_albedo", GBUFFER_FORMAT, samples, 1, attachment);
        let gbuffer_normals = make("gbuffer_normals", GBUFFER_FORMAT, samples, 1, attachment);
        let gbuffer_rough_metal = make("gbuffer_rough_metal", GBUFFER_FORMAT, samples, 1, attachment);
        let depth = make("depth", DEPTH_FORMAT, samples, 1, attachment);
        let shadowed_lighting = make("shadowed_lighting", LIGHTING_FORMAT, 1, 1, storage);
        let light_accumulation = make("light_accumulation", LIGHTING_FORMAT, 1, layers, storage);
        let scene_color = make("scene_color", LIGHTING_FORMAT, 1, layers, storage);
        let (msaa_scene_color, msaa_coverage) = if msaa.is_multisampled() {
            (
                Some(make("msaa_scene_color", MSAA_TARGET_FORMAT, samples, 1, attachment)),
                Some(make("msaa_coverage", COVERAGE_FORMAT, 1, 1, attachment | wgpu::TextureUsages::COPY_DST)),
            )
        } else {
            (None, None)
        };
        Ok(Self {
            gbuffer_albedo,
            gbuffer_normals,
            gbuffer_rough_metal,
            depth,
            shadowed_lighting,
            light_accumulation,
            scene_color,
            msaa_scene_color,
            msaa_coverage,
            width,
            height,
            msaa,
        })
    }

    pub fn width(&self) -> u32 { self.width }
    pub fn height(&self) -> u32 { self.height }
    pub fn msaa(&self) -> MsaaVariation { self.msaa }

    /// View of a per-sample lighting target as the tiled passes bind it.
    fn lighting_view(&self, texture: &wgpu::Texture) -> TextureView {
        let dimension = if self.msaa.is_multisampled() { wgpu::TextureViewDimension::D2Array } else { wgpu::TextureViewDimension::D2 };
        texture.create_view(&wgpu::TextureViewDescriptor { dimension: Some(dimension), ..Default::default() })
    }

    pub fn gbuffer_albedo_view(&self) -> TextureView { self.gbuffer_albedo.create_view(&Default::default()) }
    pub fn gbuffer_normals_view(&self) -> TextureView { self.gbuffer_normals.create_view(&Default::default()) }
    pub fn gbuffer_rough_metal_view(&self) -> TextureView { self.gbuffer_rough_metal.create_view(&Default::default()) }
    pub fn depth_view(&self) -> TextureView { self.depth.create_view(&Default::default()) }
    pub fn shadowed_lighting_view(&self) -> TextureView { self.shadowed_lighting.create_view(&Default::default()) }
    pub fn light_accumulation_view(&self) -> TextureView { self.lighting_view(&self.light_accumulation) }
    pub fn scene_color_view(&self) -> TextureView { self.lighting_view(&self.scene_color) }
    pub fn msaa_coverage_view(&self) -> Option<TextureView> {
        self.msaa_coverage.as_ref().map(|t| t.create_view(&Default::default()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_sizes_are_rejected() {
        assert!(matches!(check_size(0, 10), Err(RendererError::ZeroSizedFrame { width: 0, height: 10 })));
        assert!(matches!(check_size(10, 0), Err(RendererError::ZeroSizedFrame { .. })));
        assert!(check_size(1, 1).is_ok());
    }

    #[test]
    fn lighting_arrays_have_a_layer_per_sample() {
        for msaa in MsaaVariation::ALL {
            assert_eq!(lighting_layers(msaa), msaa.sample_count());
        }
    }

    #[test]
    fn lighting_format_supports_storage() {
        let features = LIGHTING_FORMAT.guaranteed_format_features(wgpu::Features::empty());
        assert!(features.allowed_usages.contains(wgpu::TextureUsages::STORAGE_BINDING));
    }
}
