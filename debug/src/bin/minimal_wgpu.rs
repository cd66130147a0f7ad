//! Minimal wgpu init (no window). Verifies tessera-renderer builds every pipeline on this device.

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let (device, queue) = tessera_bridge::request_headless_device().expect("No device");
    let renderer = tessera_renderer::Renderer::new(device, queue).expect("Renderer::new");
    println!("Tessera minimal_wgpu: OK ({:?})", renderer.msaa());
}
