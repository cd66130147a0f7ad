//! Fallback textures bound by the IBL pass when the host supplies none, and the
//! environment BRDF lookup table.

use wgpu::util::DeviceExt;

use crate::tiled_ibl::env_brdf_lut;

pub const ENV_BRDF_LUT_SIZE: u32 = 64;

pub struct DefaultIblTextures {
    /// 1x1 black cube.
    pub black_cube: wgpu::TextureView,
    /// Single black cube in a cube array.
    pub black_cube_array: wgpu::TextureView,
    /// Unoccluded ambient occlusion.
    pub white: wgpu::TextureView,
    /// Transparent black: no screen space reflections.
    pub transparent_black: wgpu::TextureView,
    pub env_brdf_lut: wgpu::TextureView,
}

fn texture_2d(device: &wgpu::Device, queue: &wgpu::Queue, label: &str, size: u32, layers: u32, texels: &[u8]) -> wgpu::Texture {
    device.create_texture_with_data(
        queue,
        &wgpu::TextureDescriptor {
            label: Some(label),
            size: wgpu::Extent3d { width: size, height: size, depth_or_array_layers: layers },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8Unorm,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        },
        wgpu::util::TextureDataOrder::LayerMajor,
        texels,
    )
}

impl DefaultIblTextures {
    pub fn new(device: &wgpu::Device, queue: &wgpu::Queue) -> Self {
        let black_faces = [0u8, 0, 0, 255].repeat(6);
        let cube = texture_2d(device, queue, "default_black_cube", 1, 6, &black_faces);
        let cube_array = texture_2d(device, queue, "default_black_cube_array", 1, 6, &black_faces);
        let white = texture_2d(device, queue, "default_white", 1, 1, &[255, 255, 255, 255]);
        let transparent_black = texture_2d(device, queue, "default_transparent_black", 1, 1, &[0, 0, 0, 0]);
        let lut = texture_2d(device, queue, "env_brdf_lut", ENV_BRDF_LUT_SIZE, 1, &env_brdf_lut(ENV_BRDF_LUT_SIZE));
        let view_as = |texture: &wgpu::Texture, dimension| {
            texture.create_view(&wgpu::TextureViewDescriptor { dimension: Some(dimension), ..Default::default() })
        };
        Self {
            black_cube: view_as(&cube, wgpu::TextureViewDimension::Cube),
            black_cube_array: view_as(&cube_array, wgpu::TextureViewDimension::CubeArray),
            white: view_as(&white, wgpu::TextureViewDimension::D2),
            transparent_black: view_as(&transparent_black, wgpu::TextureViewDimension::D2),
            env_brdf_lut: view_as(&lut, wgpu::TextureViewDimension::D2),
        }
    }
}
