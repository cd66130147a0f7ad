#[derive(Debug, thiserror::Error)]
pub enum RendererError {
    #[error("frame size must be non-zero, got {width}x{height}")]
    ZeroSizedFrame { width: u32, height: u32 },

    #[error("no frame resources (call ensure_frame_resources or encode_frame first)")]
    NoFrameResources,

    #[error("{requested} lights requested but the light buffer holds {capacity}")]
    LightBufferOverflow { requested: usize, capacity: usize },

    #[error("device request failed: {0}")]
    DeviceRequest(String),
}
