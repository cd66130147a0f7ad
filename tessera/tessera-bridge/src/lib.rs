//! Tessera bridge: implements render_api::RenderBackend using tessera-renderer, and
//! keeps the render-thread particle mirrors in step with the simulation thread.

mod plugin;

pub use plugin::{request_headless_device, TesseraPlugin};
