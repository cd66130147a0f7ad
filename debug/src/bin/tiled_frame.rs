//! Host loop on two threads: the simulation thread drives particle systems and submits
//! sync batches; the render thread applies them and renders the tiled passes through
//! TesseraPlugin as a RenderBackend.
//!
//! Usage: tiled_frame [msaa_count] [frames]

use std::sync::mpsc;
use std::thread;

use glam::Vec3;
use particles::{
    sync_channel, DragEvolver, EmissionSettings, EmitterShape, ForceEvolver, MaterialHandle, ParticleManager,
    ParticleSystem, ParticleSystemSettings, ShapeEmitter, Transform,
};
use render_api::{ExtractedLight, ExtractedReflProbe, ExtractedScene, ExtractedView, RenderBackend, SkyboxInfo};
use tessera_bridge::TesseraPlugin;
use tessera_renderer::TesseraConfig;

fn scene() -> ExtractedScene {
    let mut lights = vec![
        ExtractedLight::directional([0.3, -0.8, 0.5], [1.0, 0.95, 0.9], 3.0),
        ExtractedLight::directional([-0.2, -1.0, 0.0], [1.0; 3], 1.0).with_shadows(true),
    ];
    for i in 0..32 {
        let x = (i % 8) as f32 * 2.0 - 7.0;
        let z = (i / 8) as f32 * 2.0 - 3.0;
        lights.push(ExtractedLight::radial([x, 1.0, z], [1.0, 0.5, 0.2], 5.0, 4.0));
    }
    lights.push(ExtractedLight::spot([0.0, 4.0, 0.0], [0.0, -1.0, 0.0], [0.8, 0.8, 1.0], 10.0, 8.0, 0.3, 0.5));
    ExtractedScene {
        lights,
        refl_probes: vec![ExtractedReflProbe { position: [0.0, 1.0, 0.0], radius: 6.0, cubemap_index: 0 }],
        skybox: Some(SkyboxInfo { brightness: 1.0, filtered_radiance_mips: 1 }),
    }
}

fn fountain() -> ParticleSystem {
    let mut system = ParticleSystem::new(ParticleSystemSettings { max_particles: 500, ..Default::default() });
    system.add_emitter(Box::new(ShapeEmitter::new(
        EmitterShape::Cone { angle: 0.3, radius: 0.1 },
        EmissionSettings { rate: 120.0, ..Default::default() },
    )));
    system.add_evolver(Box::new(ForceEvolver { acceleration: Vec3::new(0.0, -9.8, 0.0) }));
    system.add_evolver(Box::new(DragEvolver { drag: 0.5 }));
    system.set_material(Some(MaterialHandle(1)));
    system
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let mut args = std::env::args().skip(1);
    let msaa_count = args.next().and_then(|a| a.parse().ok()).unwrap_or(1);
    let frames: u64 = args.next().and_then(|a| a.parse().ok()).unwrap_or(8);

    let config = TesseraConfig { msaa_count, ..Default::default() };
    let mut plugin = TesseraPlugin::new_headless(config)?;
    let (sync_tx, sync_rx) = sync_channel();
    plugin.attach_particle_sync(sync_rx);

    let (frame_tx, frame_rx) = mpsc::channel::<u64>();
    let sim = thread::spawn(move || {
        let mut manager = ParticleManager::new(sync_tx);
        let id = manager.spawn(fountain());
        for i in 0..frames {
            if let Some(system) = manager.get_mut(id) {
                system.set_transform(Transform::from_position(Vec3::new((i as f32 * 0.1).sin(), 0.0, 0.0)));
            }
            manager.update(1.0 / 60.0);
            if frame_tx.send(manager.sync_frame()).is_err() {
                break;
            }
        }
    });

    let mut backend: Box<dyn RenderBackend> = Box::new(plugin);
    backend.prepare(&scene());
    let view = ExtractedView { camera_position: [0.0, 2.0, 8.0], ..Default::default() };
    for frame in frame_rx.iter() {
        backend.render_frame(&view)?;
        log::info!("frame {} rendered", frame);
    }
    if sim.join().is_err() {
        log::error!("simulation thread panicked");
    }
    println!("Tessera tiled_frame: {} frames OK", frames);
    Ok(())
}
