//! Pixelart: Batch Pixel-Art Animation Pipeline
//!
//! Turns a declarative YAML config into an ordered plan of paid PixelLab API
//! calls, persists generated frames to disk as it goes, and assembles the
//! results into looping GIFs and static PNGs. Frames already on disk are
//! never regenerated, so interrupted runs resume where they stopped.

pub mod assemble;
pub mod cli;
pub mod client;
pub mod config;
pub mod cost;
pub mod error;
pub mod execute;
pub mod init;
pub mod inspect;
pub mod logging;
pub mod plan;
pub mod resolve;
pub mod unit;
