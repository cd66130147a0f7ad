//! WGSL specialization. Shader sources mark variation-dependent text with `#{NAME}`.

use crate::variation::MsaaVariation;

pub(crate) type Defines = Vec<(&'static str, String)>;

/// Replaces every `#{NAME}` in `source` with the matching define.
pub(crate) fn specialize(source: &str, defines: &[(&'static str, String)]) -> String {
    let mut out = source.to_owned();
    for (name, value) in defines {
        out = out.replace(&format!("#{{{}}}", name), value);
    }
    debug_assert!(!out.contains("#{"), "unresolved define in shader source");
    out
}

/// GBuffer, coverage and per-sample output bindings shared by the tiled passes.
pub(crate) fn msaa_defines(msaa: MsaaVariation) -> Defines {
    let samples = msaa.sample_count();
    if msaa.is_multisampled() {
        vec![
            ("MSAA_COUNT", samples.to_string()),
            ("GBUFFER_TEX", "texture_multisampled_2d<f32>".into()),
            ("DEPTH_TEX", "texture_depth_multisampled_2d".into()),
            ("OUTPUT_TEX", "texture_storage_2d_array<rgba32float, write>".into()),
            ("STORE_OUTPUT", "textureStore(gOutput, px, sample_index, value);".into()),
            (
                "COVERAGE_BINDING",
                "@group(0) @binding(#{COVERAGE_SLOT}) var gMSAACoverage: texture_2d<f32>;".into(),
            ),
            ("PER_SAMPLE", "textureLoad(gMSAACoverage, px, 0).r > 0.5".into()),
        ]
    } else {
        vec![
            ("MSAA_COUNT", "1".into()),
            ("GBUFFER_TEX", "texture_2d<f32>".into()),
            ("DEPTH_TEX", "texture_depth_2d".into()),
            ("OUTPUT_TEX", "texture_storage_2d<rgba32float, write>".into()),
            ("STORE_OUTPUT", "textureStore(gOutput, px, value);".into()),
            ("COVERAGE_BINDING", String::new()),
            ("PER_SAMPLE", "false".into()),
        ]
    }
}

pub(crate) fn create_module(device: &wgpu::Device, label: &str, source: String) -> wgpu::ShaderModule {
    device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some(label),
        source: wgpu::ShaderSource::Wgsl(source.into()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn replaces_every_occurrence() {
        let out = specialize("a #{X} b #{X} #{Y}", &[("X", "1".into()), ("Y", "two".into())]);
        assert_eq!(out, "a 1 b 1 two");
    }

    #[test]
    fn nested_define_resolves_when_listed_after() {
        let mut defines = msaa_defines(MsaaVariation::X4);
        defines.push(("COVERAGE_SLOT", "12".into()));
        let out = specialize("#{COVERAGE_BINDING}", &defines);
        assert_eq!(out, "@group(0) @binding(12) var gMSAACoverage: texture_2d<f32>;");
    }

    /// `@workgroup_size(x, y, z)` of a specialized compute shader.
    fn workgroup_size(source: &str) -> [u32; 3] {
        let start = source.find("@workgroup_size(").expect("compute entry point") + "@workgroup_size(".len();
        let end = start + source[start..].find(')').expect("closing paren");
        let dims: Vec<u32> = source[start..end].split(',').map(|d| d.trim().parse().expect("literal size")).collect();
        [dims[0], dims[1], dims[2]]
    }

    #[test]
    fn every_compute_variation_fits_default_device_limits() {
        use crate::variation::{ClearVariation, Variation};

        let mut sources = Vec::new();
        for &msaa in MsaaVariation::all() {
            sources.push(crate::tiled_lighting::tiled_lighting_source(msaa));
            sources.push(crate::tiled_ibl::tiled_ibl_source(msaa));
        }
        for &variation in ClearVariation::all() {
            sources.push(crate::clear::clear_shader_source(variation));
        }
        for limits in [wgpu::Limits::default(), wgpu::Limits::downlevel_defaults()] {
            for source in &sources {
                let [x, y, z] = workgroup_size(source);
                assert!(x <= limits.max_compute_workgroup_size_x);
                assert!(y <= limits.max_compute_workgroup_size_y);
                assert!(z <= limits.max_compute_workgroup_size_z);
                assert!(x * y * z <= limits.max_compute_invocations_per_workgroup, "{}x{}x{} invocations", x, y, z);
            }
        }
    }
}
