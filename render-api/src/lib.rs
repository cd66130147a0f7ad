//! Shared render backend API for Tessera.
//! Defines the extracted per-frame data and the RenderBackend trait so the host
//! drives any backend with the same code path (prepare + render_frame).

mod backend;
mod extract;

pub use backend::{BackendError, RenderBackend};
pub use extract::{
    ExtractedLight, ExtractedReflProbe, ExtractedScene, ExtractedView, LightType, RenderSettings,
    SkyboxInfo, ViewRect, IDENTITY,
};
