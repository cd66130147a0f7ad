//! Per-camera uniform shared by the tiled passes.

use bytemuck::{Pod, Zeroable};
use glam::Mat4;
use render_api::ExtractedView;

#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct PerCameraUniform {
    pub view_proj: [f32; 16],
    pub inv_view_proj: [f32; 16],
    pub view: [f32; 16],
    pub proj: [f32; 16],
    pub inv_proj: [f32; 16],
    pub camera_position: [f32; 3],
    pub _pad: f32,
    /// x, y, width, height in pixels.
    pub viewport: [f32; 4],
}

impl PerCameraUniform {
    pub fn from_view(view: &ExtractedView) -> Self {
        let view_m = Mat4::from_cols_array(&view.view);
        let proj_m = Mat4::from_cols_array(&view.proj);
        let view_proj = proj_m * view_m;
        let rect = view.viewport;
        Self {
            view_proj: view_proj.to_cols_array(),
            inv_view_proj: view_proj.inverse().to_cols_array(),
            view: view.view,
            proj: view.proj,
            inv_proj: proj_m.inverse().to_cols_array(),
            camera_position: view.camera_position,
            _pad: 0.0,
            viewport: [rect.x as f32, rect.y as f32, rect.width as f32, rect.height as f32],
        }
    }
}
