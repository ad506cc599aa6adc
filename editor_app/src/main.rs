//! Headless scene editor demo
//!
//! Builds the default scene, imports every model given on the command line
//! (the file-dropped path), flies the camera for a few frames against the
//! recording backend and picks through the centre of the screen.
//!
//! Usage: `scene_editor [--config engine.toml] [model.obj ...]`

use std::path::PathBuf;

use scene_engine::foundation::logging;
use scene_engine::prelude::*;

const FRAME_TIME: f32 = 1.0 / 60.0;

struct Args {
    config: Option<PathBuf>,
    models: Vec<PathBuf>,
}

fn parse_args() -> Args {
    let mut args = Args {
        config: None,
        models: Vec::new(),
    };
    let mut iter = std::env::args().skip(1);
    while let Some(arg) = iter.next() {
        if arg == "--config" {
            args.config = iter.next().map(PathBuf::from);
        } else {
            args.models.push(PathBuf::from(arg));
        }
    }
    args
}

fn load_config(path: Option<&PathBuf>) -> EngineConfig {
    let Some(path) = path else {
        return EngineConfig::default();
    };
    match EngineConfig::load_from_file(path) {
        Ok(config) => config,
        Err(e) => {
            log::warn!("Could not load config {:?}: {}; using defaults", path, e);
            EngineConfig::default()
        }
    }
}

fn main() {
    let args = parse_args();
    let config = load_config(args.config.as_ref());
    logging::init_with_level(&config.logging.level);

    log::info!("Starting scene editor");
    let mut backend = RecordingBackend::new();
    let mut textures = ImageTextureLoader::new();
    let mut scene = Scene::new(&config);

    let loaded = scene.load_startup_models(&ObjImporter, &mut textures, &mut backend);
    log::info!("Loaded {} startup models", loaded);
    for path in &args.models {
        if scene.import_model(path, &ObjImporter, &mut textures, &mut backend).is_none() {
            log::warn!("Skipped {:?}", path);
        }
    }

    let mut mouse = MouseState::new(1280, 720);
    scene.on_window_resized(1280, 720);

    let mut input = InputState::new();
    let mut controller = scene
        .main_camera()
        .map(|camera| CameraController::new(camera, &config.camera));

    // Back off a little, then frame whatever sits under the cursor
    input.handle_key_input(KeyCode::S, true);
    for _ in 0..30 {
        if let Some(controller) = controller.as_mut() {
            controller.update(&mut scene, &input, FRAME_TIME);
        }
        scene.update_frame(&mut backend);
        input.advance();
    }
    input.handle_key_input(KeyCode::S, false);
    input.advance();

    mouse.update_position(640.0, 360.0);
    let (ndc_x, ndc_y) = mouse.screen_to_ndc();
    match scene.pick(ndc_x, ndc_y) {
        Some(key) => {
            let name = scene.world().get(key).map_or("?", |entity| entity.name());
            log::info!("Picked '{}'", name);

            input.handle_key_input(KeyCode::F, true);
            for _ in 0..60 {
                if let Some(controller) = controller.as_mut() {
                    controller.update(&mut scene, &input, FRAME_TIME);
                }
                scene.update_frame(&mut backend);
                input.advance();
            }
        }
        None => log::info!("Nothing under the cursor"),
    }

    log::info!(
        "{} entities, {} meshes, {} draw calls recorded",
        scene.world().len(),
        scene.cached_meshes().len(),
        backend.draw_count()
    );

    scene.shutdown(&mut backend);
    log::info!("Live GPU meshes after shutdown: {}", backend.live_mesh_count());
}
