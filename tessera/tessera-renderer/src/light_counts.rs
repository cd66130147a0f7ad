//! Visible light and reflection probe data, and the count block the tiled shaders read.

use std::borrow::Cow;

use bytemuck::{Pod, Zeroable};
use render_api::{ExtractedLight, ExtractedReflProbe, LightType, RenderSettings, SkyboxInfo};

use crate::error::RendererError;

/// One light as the tiled lighting shader reads it (std430, 64 bytes).
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct GpuLight {
    pub position: [f32; 3],
    pub range: f32,
    pub direction: [f32; 3],
    pub spot_cos_outer: f32,
    pub color: [f32; 3],
    pub intensity: f32,
    pub spot_cos_inner: f32,
    pub light_type: u32,
    pub shadowed: u32,
    pub _pad: u32,
}

impl From<&ExtractedLight> for GpuLight {
    fn from(light: &ExtractedLight) -> Self {
        Self {
            position: light.position,
            range: light.range,
            direction: light.direction,
            spot_cos_outer: light.outer_angle.cos(),
            color: light.color,
            intensity: light.intensity,
            spot_cos_inner: light.inner_angle.cos(),
            light_type: light.light_type.order() as u32,
            shadowed: light.casts_shadows as u32,
            _pad: 0,
        }
    }
}

/// Visible lights grouped by type (directional, radial, spot), unshadowed first within each type.
#[derive(Clone, Debug, Default)]
pub struct VisibleLightData {
    lights: Vec<GpuLight>,
    counts: [u32; 3],
    unshadowed_counts: [u32; 3],
}

impl VisibleLightData {
    pub fn new(lights: &[ExtractedLight]) -> Self {
        let mut sorted: Vec<&ExtractedLight> = lights.iter().collect();
        sorted.sort_by_key(|l| (l.light_type.order(), l.casts_shadows));

        let mut counts = [0u32; 3];
        let mut unshadowed_counts = [0u32; 3];
        for light in &sorted {
            let t = light.light_type.order();
            counts[t] += 1;
            if !light.casts_shadows {
                unshadowed_counts[t] += 1;
            }
        }
        Self {
            lights: sorted.into_iter().map(GpuLight::from).collect(),
            counts,
            unshadowed_counts,
        }
    }

    /// Like `new`, but keeps at most `capacity` lights. Lights are dropped from the end
    /// of the grouped order (spot lights go first), with a warning.
    pub fn with_capacity_limit(lights: &[ExtractedLight], capacity: usize) -> Self {
        if lights.len() <= capacity {
            return Self::new(lights);
        }
        log::warn!(
            "{}, truncating",
            RendererError::LightBufferOverflow { requested: lights.len(), capacity }
        );
        let mut sorted: Vec<ExtractedLight> = lights.to_vec();
        sorted.sort_by_key(|l| (l.light_type.order(), l.casts_shadows));
        sorted.truncate(capacity);
        Self::new(&sorted)
    }

    pub fn num_lights(&self, light_type: LightType) -> u32 {
        self.counts[light_type.order()]
    }

    pub fn num_unshadowed_lights(&self, light_type: LightType) -> u32 {
        self.unshadowed_counts[light_type.order()]
    }

    pub fn len(&self) -> usize {
        self.lights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lights.is_empty()
    }

    pub fn lights(&self) -> &[GpuLight] {
        &self.lights
    }

    /// The light array matching `LightCountBlock::pack` for the same settings: every
    /// light, only unshadowed lights when shadows are on, nothing when lighting is off.
    pub fn effective_lights(&self, settings: &RenderSettings) -> Cow<'_, [GpuLight]> {
        if !settings.enable_lighting {
            Cow::Borrowed(&[])
        } else if settings.enable_shadows {
            Cow::Owned(self.lights.iter().filter(|l| l.shadowed == 0).copied().collect())
        } else {
            Cow::Borrowed(&self.lights)
        }
    }
}

/// Per-type light counts and cumulative offsets into the flat light array.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LightCountBlock {
    /// (directional, radial, spot, total)
    pub counts: [i32; 4],
    /// (end of directional lights, end of radial lights)
    pub strides: [i32; 2],
}

impl LightCountBlock {
    pub const ZERO: LightCountBlock = LightCountBlock { counts: [0; 4], strides: [0; 2] };

    pub fn from_counts(counts: [u32; 3]) -> Self {
        let [d, r, s] = counts.map(|c| c as i32);
        Self {
            counts: [d, r, s, d + r + s],
            strides: [d, d + r],
        }
    }

    pub fn pack(lights: &VisibleLightData, settings: &RenderSettings) -> Self {
        if !settings.enable_lighting {
            return Self::ZERO;
        }
        if settings.enable_shadows {
            Self::from_counts(lights.unshadowed_counts)
        } else {
            Self::from_counts(lights.counts)
        }
    }

    pub fn total(&self) -> i32 {
        self.counts[3]
    }
}

/// One reflection probe as the tiled IBL shader reads it (std430, 32 bytes).
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct GpuReflProbe {
    pub position: [f32; 3],
    pub radius: f32,
    pub cubemap_index: u32,
    pub _pad: [u32; 3],
}

impl From<&ExtractedReflProbe> for GpuReflProbe {
    fn from(probe: &ExtractedReflProbe) -> Self {
        Self {
            position: probe.position,
            radius: probe.radius,
            cubemap_index: probe.cubemap_index,
            _pad: [0; 3],
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct VisibleReflProbeData {
    probes: Vec<GpuReflProbe>,
}

impl VisibleReflProbeData {
    pub fn new(probes: &[ExtractedReflProbe]) -> Self {
        Self {
            probes: probes.iter().map(GpuReflProbe::from).collect(),
        }
    }

    pub fn with_capacity_limit(probes: &[ExtractedReflProbe], capacity: usize) -> Self {
        if probes.len() > capacity {
            log::warn!("{} reflection probes visible, keeping the first {}", probes.len(), capacity);
        }
        Self::new(&probes[..probes.len().min(capacity)])
    }

    pub fn num_probes(&self) -> u32 {
        self.probes.len() as u32
    }

    pub fn probes(&self) -> &[GpuReflProbe] {
        &self.probes
    }
}

/// Reflection probe and sky parameters of the tiled IBL pass (uniform, 32 bytes).
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct ReflProbeParams {
    pub num_probes: u32,
    pub sky_cubemap_num_mips: u32,
    pub use_sky: u32,
    pub sky_brightness: f32,
    pub capturing_reflections: u32,
    pub refl_cubemap_num_mips: u32,
    pub _pad: [u32; 2],
}

impl ReflProbeParams {
    /// `skybox` is the sky as seen by the view; see `visible_skybox`.
    pub fn populate(
        skybox: Option<&SkyboxInfo>,
        num_probes: u32,
        refl_cubemap_num_mips: u32,
        capturing_reflections: bool,
    ) -> Self {
        let (use_sky, sky_cubemap_num_mips, sky_brightness) = match skybox {
            Some(sky) => (1, sky.filtered_radiance_mips, sky.brightness),
            None => (0, 0, 0.0),
        };
        Self {
            num_probes,
            sky_cubemap_num_mips,
            use_sky,
            sky_brightness,
            capturing_reflections: capturing_reflections as u32,
            refl_cubemap_num_mips,
            _pad: [0; 2],
        }
    }
}

/// The sky only lights a view that has the skybox enabled.
pub fn visible_skybox<'a>(settings: &RenderSettings, skybox: Option<&'a SkyboxInfo>) -> Option<&'a SkyboxInfo> {
    if settings.enable_skybox {
        skybox
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn light(light_type: LightType, shadowed: bool) -> ExtractedLight {
        let l = match light_type {
            LightType::Directional => ExtractedLight::directional([0.0, -1.0, 0.0], [1.0; 3], 1.0),
            LightType::Radial => ExtractedLight::radial([0.0; 3], [1.0; 3], 1.0, 5.0),
            LightType::Spot => ExtractedLight::spot([0.0; 3], [0.0, -1.0, 0.0], [1.0; 3], 1.0, 5.0, 0.3, 0.5),
        };
        l.with_shadows(shadowed)
    }

    /// 3 directional + 2 radial + 1 spot; the first directional and first radial cast shadows.
    fn scene() -> Vec<ExtractedLight> {
        vec![
            light(LightType::Spot, false),
            light(LightType::Directional, true),
            light(LightType::Radial, true),
            light(LightType::Directional, false),
            light(LightType::Radial, false),
            light(LightType::Directional, false),
        ]
    }

    fn settings(lighting: bool, shadows: bool) -> RenderSettings {
        RenderSettings { enable_lighting: lighting, enable_shadows: shadows, enable_skybox: true }
    }

    fn check_invariants(block: &LightCountBlock) {
        let [d, r, s, total] = block.counts;
        assert_eq!(total, d + r + s);
        assert_eq!(block.strides[0], d);
        assert_eq!(block.strides[1], block.strides[0] + r);
    }

    #[test]
    fn counts_without_shadows() {
        let data = VisibleLightData::new(&scene());
        let block = LightCountBlock::pack(&data, &settings(true, false));
        assert_eq!(block.counts, [3, 2, 1, 6]);
        assert_eq!(block.strides, [3, 5]);
    }

    #[test]
    fn counts_with_shadows_cover_unshadowed_only() {
        let data = VisibleLightData::new(&scene());
        let block = LightCountBlock::pack(&data, &settings(true, true));
        assert_eq!(block.counts, [2, 1, 1, 4]);
        assert_eq!(block.strides, [2, 3]);
    }

    #[test]
    fn lighting_disabled_zeroes_everything() {
        let data = VisibleLightData::new(&scene());
        for shadows in [false, true] {
            let block = LightCountBlock::pack(&data, &settings(false, shadows));
            assert_eq!(block, LightCountBlock::ZERO);
            assert!(data.effective_lights(&settings(false, shadows)).is_empty());
        }
    }

    #[test]
    fn shadowed_counts_match_unshadowed_subset_for_every_partition() {
        let types = [
            LightType::Directional,
            LightType::Radial,
            LightType::Spot,
            LightType::Radial,
            LightType::Directional,
            LightType::Spot,
        ];
        for mask in 0u32..(1 << types.len()) {
            let lights: Vec<ExtractedLight> = types
                .iter()
                .enumerate()
                .map(|(i, &t)| light(t, mask & (1 << i) != 0))
                .collect();
            let unshadowed: Vec<ExtractedLight> = lights.iter().filter(|l| !l.casts_shadows).cloned().collect();

            let packed = LightCountBlock::pack(&VisibleLightData::new(&lights), &settings(true, true));
            let recomputed = LightCountBlock::pack(&VisibleLightData::new(&unshadowed), &settings(true, false));
            assert_eq!(packed, recomputed, "mask {:06b}", mask);
            check_invariants(&packed);
        }
    }

    #[test]
    fn effective_lights_match_strides() {
        let data = VisibleLightData::new(&scene());
        for s in [settings(true, false), settings(true, true), settings(false, false)] {
            let block = LightCountBlock::pack(&data, &s);
            let lights = data.effective_lights(&s);
            assert_eq!(lights.len() as i32, block.total());
            let [dir_end, radial_end] = block.strides.map(|x| x as usize);
            assert!(lights[..dir_end].iter().all(|l| l.light_type == 0));
            assert!(lights[dir_end..radial_end].iter().all(|l| l.light_type == 1));
            assert!(lights[radial_end..].iter().all(|l| l.light_type == 2));
            if s.enable_shadows {
                assert!(lights.iter().all(|l| l.shadowed == 0));
            }
        }
    }

    #[test]
    fn capacity_limit_drops_from_the_end() {
        let data = VisibleLightData::with_capacity_limit(&scene(), 4);
        assert_eq!(data.len(), 4);
        assert_eq!(data.num_lights(LightType::Directional), 3);
        assert_eq!(data.num_lights(LightType::Radial), 1);
        assert_eq!(data.num_lights(LightType::Spot), 0);
        assert_eq!(data.num_unshadowed_lights(LightType::Radial), 1);
    }

    #[test]
    fn gpu_record_sizes() {
        assert_eq!(std::mem::size_of::<GpuLight>(), 64);
        assert_eq!(std::mem::size_of::<GpuReflProbe>(), 32);
        assert_eq!(std::mem::size_of::<ReflProbeParams>(), 32);
    }

    #[test]
    fn sky_needs_view_flag_and_skybox() {
        let sky = SkyboxInfo { brightness: 2.0, filtered_radiance_mips: 7 };
        let on = settings(true, false);
        let off = RenderSettings { enable_skybox: false, ..on };

        let p = ReflProbeParams::populate(visible_skybox(&on, Some(&sky)), 3, 5, true);
        assert_eq!((p.use_sky, p.sky_cubemap_num_mips, p.num_probes, p.capturing_reflections), (1, 7, 3, 1));
        assert_eq!(p.sky_brightness, 2.0);

        assert_eq!(ReflProbeParams::populate(visible_skybox(&off, Some(&sky)), 3, 5, false).use_sky, 0);
        assert_eq!(ReflProbeParams::populate(visible_skybox(&on, None), 0, 0, false).use_sky, 0);
    }

    #[test]
    fn probe_packing() {
        let probes = [
            ExtractedReflProbe { position: [1.0, 2.0, 3.0], radius: 4.0, cubemap_index: 0 },
            ExtractedReflProbe { position: [0.0; 3], radius: 1.0, cubemap_index: 5 },
        ];
        let data = VisibleReflProbeData::new(&probes);
        assert_eq!(data.num_probes(), 2);
        assert_eq!(data.probes()[1].cubemap_index, 5);
        assert_eq!(VisibleReflProbeData::with_capacity_limit(&probes, 1).num_probes(), 1);
    }
}
