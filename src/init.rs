//! Project Scaffolding
//!
//! `pixelart init` creates a ready-to-edit project: a starter `config.yaml`
//! and a generated placeholder reference sprite. Existing files are never
//! overwritten; re-running reports them as skipped.

use crate::config::DEFAULT_CONFIG_FILE;
use crate::error::PipelineError;
use image::{Rgba, RgbaImage};
use std::io::Cursor;
use std::path::{Path, PathBuf};

/// Project name when `--name` is not given.
pub const DEFAULT_PROJECT_NAME: &str = "my-project";

/// Reference sprite edge length in pixels.
const REFERENCE_SIZE: u32 = 64;

/// Result of a scaffold operation.
#[derive(Debug, Clone)]
pub struct InitResult {
    pub project_dir: PathBuf,
    pub created: Vec<PathBuf>,
    pub skipped: Vec<PathBuf>,
}

/// Scaffold a new project directory under `parent`.
pub fn scaffold_project(parent: &Path, name: Option<&str>) -> Result<InitResult, PipelineError> {
    let name = name.unwrap_or(DEFAULT_PROJECT_NAME);
    let project_dir = parent.join(name);
    std::fs::create_dir_all(&project_dir)?;

    let mut result = InitResult {
        project_dir: project_dir.clone(),
        created: Vec::new(),
        skipped: Vec::new(),
    };

    let reference_path = project_dir.join("reference.png");
    if reference_path.exists() {
        result.skipped.push(reference_path);
    } else {
        let mut encoded = Vec::new();
        image::DynamicImage::ImageRgba8(placeholder_reference())
            .write_to(&mut Cursor::new(&mut encoded), image::ImageFormat::Png)
            .map_err(|e| PipelineError::Io(std::io::Error::new(std::io::ErrorKind::Other, e)))?;
        std::fs::write(&reference_path, &encoded)?;
        result.created.push(reference_path);
    }

    let config_path = project_dir.join(DEFAULT_CONFIG_FILE);
    if config_path.exists() {
        result.skipped.push(config_path);
    } else {
        std::fs::write(&config_path, starter_config(name))?;
        result.created.push(config_path);
    }

    Ok(result)
}

/// 64x64 gold circle on a transparent background, a stand-in until the user
/// drops in their own sprite.
fn placeholder_reference() -> RgbaImage {
    let mut img = RgbaImage::new(REFERENCE_SIZE, REFERENCE_SIZE);
    let (cx, cy, radius) = (32.0f32, 32.0f32, 20.0f32);
    for y in 0..REFERENCE_SIZE {
        for x in 0..REFERENCE_SIZE {
            let dist = ((x as f32 - cx).powi(2) + (y as f32 - cy).powi(2)).sqrt();
            if dist <= radius {
                // Gold with a slight radial gradient.
                let brightness = (255.0 - dist * 3.0).clamp(0.0, 255.0) as u8;
                img.put_pixel(x, y, Rgba([255, 215, brightness / 2, 255]));
            }
        }
    }
    img
}

fn starter_config(name: &str) -> String {
    format!(
        r#"# {name} pixel art pipeline
#
# Each entry below becomes one animation. Prompts describe the motion;
# the reference image is the starting sprite for every generation.

project:
  name: "{name}"
  reference: "reference.png"
  output_dir: "./output"
  frame_size: 64
  upscale_size: 512
  frame_duration_ms: 200

singles:
  flame:
    prompt: "golden circle transforms into a dancing flame"
  star:
    prompt: "golden circle transforms into a twinkling star with five points"
  heart:
    prompt: "golden circle transforms into a glowing heart shape"

# Emotes animate a finished single in place. `from:` defaults to the
# emote's own name.
emotes:
  flame:
    prompt: "a golden flame gently sways left and right, subtle idle animation"

# Chains are two linked steps; each step continues from the previous
# step's final frame.
chains:
  flame_to_heart:
    steps:
      - from: reference
        to: flame
        prompt: "golden circle transforms into a dancing flame"
      - from: flame
        to: heart
        prompt: "the flame softens and reshapes into a glowing heart"

# Cycles generate the forward motion once and play it back in reverse
# for a seamless loop.
cycles:
  cycle_flame:
    shape: flame
    forward_prompt: "golden circle transforms into a dancing flame"
    reverse_prompt: "flame dissolves back into a golden circle"
"#
    )
}
