//! Data types for extraction from the host engine into the render world.
//! Host fills these each frame; the backend only ever sees copies.

/// Column-major identity, used as the default for every matrix field.
pub const IDENTITY: [f32; 16] = [
    1.0, 0.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0, 1.0,
];

/// Pixel rectangle of the render target covered by a view.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ViewRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl ViewRect {
    pub fn new(width: u32, height: u32) -> Self {
        Self { x: 0, y: 0, width, height }
    }
}

/// Per-view feature switches.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RenderSettings {
    /// When off, the tiled lighting pass receives zero lights (counts and strides).
    pub enable_lighting: bool,
    /// When on, shadowed lights are left to the shadowed-light path and only
    /// unshadowed lights reach the tiled pass.
    pub enable_shadows: bool,
    /// Whether the sky contributes to image based lighting.
    pub enable_skybox: bool,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            enable_lighting: true,
            enable_shadows: false,
            enable_skybox: true,
        }
    }
}

/// View/camera data for the current frame.
#[derive(Clone, Debug)]
pub struct ExtractedView {
    /// World to view, column-major 4x4 (WGSL/wgpu convention).
    pub view: [f32; 16],
    /// View to clip, column-major 4x4.
    pub proj: [f32; 16],
    pub camera_position: [f32; 3],
    pub viewport: ViewRect,
    pub render_settings: RenderSettings,
    /// True while the view renders into a reflection probe.
    pub capturing_reflections: bool,
}

impl Default for ExtractedView {
    fn default() -> Self {
        Self {
            view: IDENTITY,
            proj: IDENTITY,
            camera_position: [0.0; 3],
            viewport: ViewRect::new(800, 600),
            render_settings: RenderSettings::default(),
            capturing_reflections: false,
        }
    }
}

/// Light kinds, in the order the tiled shader expects them in the flat light array.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum LightType {
    Directional,
    /// Point light.
    Radial,
    Spot,
}

impl LightType {
    pub const ALL: [LightType; 3] = [LightType::Directional, LightType::Radial, LightType::Spot];

    /// Position of this type in the grouped light array.
    pub fn order(self) -> usize {
        match self {
            LightType::Directional => 0,
            LightType::Radial => 1,
            LightType::Spot => 2,
        }
    }
}

/// One visible light.
#[derive(Clone, Debug, PartialEq)]
pub struct ExtractedLight {
    pub light_type: LightType,
    /// World position (ignored for directional lights).
    pub position: [f32; 3],
    /// Unit direction the light travels (directional and spot).
    pub direction: [f32; 3],
    /// Linear RGB.
    pub color: [f32; 3],
    pub intensity: f32,
    /// Attenuation radius (radial and spot).
    pub range: f32,
    /// Spot cone angles in radians.
    pub inner_angle: f32,
    pub outer_angle: f32,
    /// Whether a shadow map is rendered for this light this frame.
    pub casts_shadows: bool,
}

impl ExtractedLight {
    pub fn directional(direction: [f32; 3], color: [f32; 3], intensity: f32) -> Self {
        Self {
            light_type: LightType::Directional,
            position: [0.0; 3],
            direction,
            color,
            intensity,
            range: 0.0,
            inner_angle: 0.0,
            outer_angle: 0.0,
            casts_shadows: false,
        }
    }

    pub fn radial(position: [f32; 3], color: [f32; 3], intensity: f32, range: f32) -> Self {
        Self {
            light_type: LightType::Radial,
            position,
            direction: [0.0, -1.0, 0.0],
            color,
            intensity,
            range,
            inner_angle: 0.0,
            outer_angle: 0.0,
            casts_shadows: false,
        }
    }

    pub fn spot(
        position: [f32; 3],
        direction: [f32; 3],
        color: [f32; 3],
        intensity: f32,
        range: f32,
        inner_angle: f32,
        outer_angle: f32,
    ) -> Self {
        Self {
            light_type: LightType::Spot,
            position,
            direction,
            color,
            intensity,
            range,
            inner_angle,
            outer_angle,
            casts_shadows: false,
        }
    }

    pub fn with_shadows(mut self, casts_shadows: bool) -> Self {
        self.casts_shadows = casts_shadows;
        self
    }
}

/// One visible reflection probe. Its filtered cubemap lives at `cubemap_index`
/// in the host-provided cubemap array.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ExtractedReflProbe {
    pub position: [f32; 3],
    pub radius: f32,
    pub cubemap_index: u32,
}

/// Sky parameters. The filtered radiance cubemap itself is handed to the renderer directly.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SkyboxInfo {
    pub brightness: f32,
    pub filtered_radiance_mips: u32,
}

/// Everything visible this frame besides the view itself.
#[derive(Clone, Debug, Default)]
pub struct ExtractedScene {
    pub lights: Vec<ExtractedLight>,
    pub refl_probes: Vec<ExtractedReflProbe>,
    pub skybox: Option<SkyboxInfo>,
}
