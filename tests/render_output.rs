//! Render driver output checks.
//!
//! These run on the interpreter engine so they hold on every platform.

use orbit::bytecode::Program;
use orbit::config::{EngineMode, RenderConfig, Scene, TimingsFormat};
use orbit::render::{self, Engine};

fn small_config() -> RenderConfig {
    RenderConfig {
        width: 32,
        height: 18,
        max_iter: 64,
        ..Default::default()
    }
}

#[test]
fn pgm_file_shape() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("frame.pgm");

    let program = Program::parse("*bb+ab", 4).unwrap();
    let config = small_config();
    let mut file = std::fs::File::create(&path).unwrap();
    let timings = render::render_frame(program, EngineMode::Off, &config, &mut file).unwrap();
    drop(file);

    assert_eq!(timings.engine, "interp");
    assert_eq!(timings.pixels, 32 * 18);

    let data = std::fs::read(&path).unwrap();
    let header = b"P5\n32 18\n255\n";
    assert!(data.starts_with(header));
    assert_eq!(data.len(), header.len() + 32 * 18);
}

#[test]
fn in_set_center_is_black_and_edges_escape() {
    let program = Program::parse("*bb+ab", 4).unwrap();
    let engine = Engine::build(program, EngineMode::Off).unwrap();
    let config = small_config();

    let mut frame = Vec::new();
    render::render_pgm(&engine, &config, &mut frame).unwrap();
    let header_len = b"P5\n32 18\n255\n".len();
    let pixels = &frame[header_len..];

    // c = 0 sits in the Mandelbrot set: capped iterations render black
    let center = pixels[(config.height / 2) * config.width + config.width / 2];
    assert_eq!(center, 0);

    // the top-left corner escapes within a few iterations
    let corner = pixels[0];
    assert!(corner > 0 && corner < 10, "corner shade was {}", corner);
}

#[test]
fn timings_formats() {
    let program = Program::parse("=ab", 4).unwrap();
    let config = RenderConfig {
        width: 8,
        height: 8,
        max_iter: 4,
        ..Default::default()
    };
    let mut out = Vec::new();
    let timings = render::render_frame(program, EngineMode::Off, &config, &mut out).unwrap();

    let human = timings.report(TimingsFormat::Human);
    assert!(human.contains("engine: interp"));

    let json: serde_json::Value =
        serde_json::from_str(&timings.report(TimingsFormat::Json)).unwrap();
    assert_eq!(json["engine"], "interp");
    assert_eq!(json["pixels"], 64);
}

#[test]
fn scene_file_overrides() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("scene.toml");
    std::fs::write(
        &path,
        r#"
program = "*bb+ab"
width = 40
height = 20
max_iter = 32
x_scale = 2.0
"#,
    )
    .unwrap();

    let scene = Scene::load(&path).unwrap();
    let mut config = RenderConfig::default();
    scene.apply(&mut config);

    assert_eq!(scene.program.as_deref(), Some("*bb+ab"));
    assert_eq!(config.width, 40);
    assert_eq!(config.height, 20);
    assert_eq!(config.max_iter, 32);
    assert_eq!(config.x_scale, 2.0);
    // untouched fields keep their defaults
    assert_eq!(config.y_scale, 0.9);
    assert_eq!(config.register_count, 4);
}

#[test]
fn scene_load_reports_missing_file() {
    let err = Scene::load(std::path::Path::new("/nonexistent/scene.toml")).unwrap_err();
    assert!(err.contains("failed to read"));
}
