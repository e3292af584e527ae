//! TWiLight Menu++ box art files.
//!
//! TWiLight Menu++ looks up box art as
//! `<sd>/_nds/TWiLightMenu/boxart/<ROM file name>.png` and expects a
//! 128x115 image.

use anyhow::{Context, Result};
use image::imageops::FilterType;
use image::{ImageFormat, RgbaImage};
use std::path::{Path, PathBuf};

pub const THUMBNAIL_WIDTH: u32 = 128;
pub const THUMBNAIL_HEIGHT: u32 = 115;

/// Box art folder relative to the SD card root.
pub const BOXART_SUBDIR: &str = "_nds/TWiLightMenu/boxart";

/// Destination of the box art for a ROM file name.
pub fn boxart_path(boxart_dir: &Path, rom_file_name: &str) -> PathBuf {
    boxart_dir.join(format!("{}.png", rom_file_name))
}

/// Writes a standardized thumbnail from raw image bytes.
pub trait ThumbnailWriter {
    fn write(&self, image: &[u8], width: u32, height: u32, dest: &Path) -> Result<()>;
}

/// Decode any supported format, scale to the exact target size, save as PNG.
pub fn render_thumbnail(image: &[u8], width: u32, height: u32) -> Result<RgbaImage> {
    let decoded = image::load_from_memory(image).context("Failed to decode image")?;
    let rgba = decoded.to_rgba8();
    Ok(image::imageops::resize(&rgba, width, height, FilterType::CatmullRom))
}

pub struct PngThumbnailWriter;

impl ThumbnailWriter for PngThumbnailWriter {
    fn write(&self, image: &[u8], width: u32, height: u32, dest: &Path) -> Result<()> {
        let thumbnail = render_thumbnail(image, width, height)?;

        if let Some(parent) = dest.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }

        thumbnail
            .save_with_format(dest, ImageFormat::Png)
            .with_context(|| format!("Failed to write {}", dest.display()))?;
        Ok(())
    }
}
