//! Tessera configuration: light/probe capacities, MSAA, clear policy.

/// Tessera renderer and bridge configuration.
#[derive(Clone, Debug)]
pub struct TesseraConfig {
    /// Samples per pixel of the GBuffer and scene color (1, 2, 4 or 8; anything else selects 8).
    pub msaa_count: u32,
    /// Capacity of the GPU light buffer. Extra lights are dropped with a warning.
    pub max_lights: u32,
    /// Capacity of the GPU reflection probe buffer.
    pub max_refl_probes: u32,
    /// Clear the shadowed-light accumulation input to black before tiled lighting.
    /// Turn off when the host renders shadowed lights into it.
    pub clear_shadowed_input: bool,
    /// Global multiplier on the skybox brightness used for image based lighting.
    pub sky_brightness: f32,
}

impl Default for TesseraConfig {
    fn default() -> Self {
        Self {
            msaa_count: 1,
            max_lights: 1024,
            max_refl_probes: 256,
            clear_shadowed_input: true,
            sky_brightness: 1.0,
        }
    }
}
