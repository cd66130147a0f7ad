//! Trait for render backends. Host uses this to call prepare/render_frame uniformly.

use crate::{ExtractedScene, ExtractedView};

#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("renderer error: {0}")]
    Renderer(String),

    #[error("render_frame called before prepare")]
    NotPrepared,
}

/// Render backend the host drives once per frame.
pub trait RenderBackend: Send {
    /// Prepare phase: upload the visible lights and reflection probes.
    fn prepare(&mut self, scene: &ExtractedScene);

    /// Render one frame. Submits work internally; caller does not need to submit command buffers.
    fn render_frame(&mut self, view: &ExtractedView) -> Result<(), BackendError>;
}
