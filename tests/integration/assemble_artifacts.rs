//! Integration tests for the assemble command: artifacts rebuilt from
//! whatever frames are on disk, with no remote traffic.

use crate::integration::test_utils::{full_project_yaml, load_project, png_bytes, seed_frames};
use image::AnimationDecoder;
use pixelart::assemble::assemble_all;
use pixelart::inspect::frame_path;
use std::fs::File;
use std::io::BufReader;
use tempfile::TempDir;

fn gif_frames(path: &std::path::Path) -> Vec<image::Frame> {
    let decoder = image::codecs::gif::GifDecoder::new(BufReader::new(File::open(path).unwrap()))
        .unwrap();
    decoder.into_frames().collect_frames().unwrap()
}

#[test]
fn test_sweep_assembles_complete_units_and_reports_the_rest() {
    let tmp = TempDir::new().unwrap();
    let spec = load_project(tmp.path(), full_project_yaml());
    let output = &spec.project.output_dir;

    seed_frames(&output.join("singles").join("flame"), 16);
    seed_frames(&output.join("singles").join("star"), 3);
    seed_frames(&output.join("cycles").join("spin"), 16);
    // A frame directory no configured unit claims.
    seed_frames(&output.join("emotes").join("ghost"), 16);

    let report = assemble_all(&spec).unwrap();
    assert!(report.is_clean());

    let labels: Vec<&str> = report.assembled.iter().map(|u| u.label.as_str()).collect();
    assert_eq!(labels, vec!["singles/flame", "cycles/spin"]);
    assert_eq!(
        report.incomplete,
        vec![("singles/star".to_string(), 3, 16)]
    );
    assert_eq!(report.unclaimed.len(), 1);
    assert!(report.unclaimed[0].ends_with("emotes/ghost"));

    // The cycle's mirror was materialized during the sweep.
    assert!(frame_path(&output.join("cycles").join("spin"), 31).exists());
    assert_eq!(gif_frames(&output.join("cycles").join("spin.gif")).len(), 32);
    assert_eq!(gif_frames(&output.join("singles").join("flame.gif")).len(), 16);
}

#[test]
fn test_gif_frames_are_upscaled_to_the_configured_size() {
    let tmp = TempDir::new().unwrap();
    let spec = load_project(tmp.path(), full_project_yaml());
    let output = &spec.project.output_dir;

    // Source frames are 8x8; upscale_size is 32.
    seed_frames(&output.join("singles").join("flame"), 16);
    assemble_all(&spec).unwrap();

    let frames = gif_frames(&output.join("singles").join("flame.gif"));
    assert_eq!(frames.len(), 16);
    assert_eq!(frames[0].buffer().width(), 32);
    assert_eq!(frames[0].buffer().height(), 32);
}

#[test]
fn test_static_png_is_the_final_frame_upscaled() {
    let tmp = TempDir::new().unwrap();
    let spec = load_project(tmp.path(), full_project_yaml());
    let output = &spec.project.output_dir;

    // seed_frames writes frame N with shade N*5; frame 15 is shade 75.
    seed_frames(&output.join("singles").join("flame"), 16);
    assemble_all(&spec).unwrap();

    let png = image::open(output.join("static").join("flame.png"))
        .unwrap()
        .to_rgba8();
    assert_eq!(png.width(), 32);
    assert_eq!(png.height(), 32);
    assert_eq!(png.get_pixel(0, 0).0, [75, 75, 75, 75]);
}

#[test]
fn test_reassembly_overwrites_stale_artifacts() {
    let tmp = TempDir::new().unwrap();
    let spec = load_project(tmp.path(), full_project_yaml());
    let output = &spec.project.output_dir;
    let flame_dir = output.join("singles").join("flame");

    seed_frames(&flame_dir, 16);
    assemble_all(&spec).unwrap();
    let before = std::fs::read(output.join("static").join("flame.png")).unwrap();

    // Replace the final frame and sweep again; artifacts must follow disk.
    pixelart::inspect::write_frame(&flame_dir, 15, &png_bytes(8, 250)).unwrap();
    assemble_all(&spec).unwrap();
    let after = std::fs::read(output.join("static").join("flame.png")).unwrap();

    assert_ne!(before, after);
    let png = image::open(output.join("static").join("flame.png"))
        .unwrap()
        .to_rgba8();
    assert_eq!(png.get_pixel(0, 0).0, [250, 250, 250, 250]);
}
