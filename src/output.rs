use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Serialize;

use crate::filter::FilterMask;
use crate::render::RenderData;
use crate::stats::RenderStats;


/// Write render data as JSON to `render.json` in `directory`.
pub fn write_render_data(data: &RenderData, directory: impl AsRef<Path>) -> Result<PathBuf> {
    write_json(data, directory.as_ref(), "render.json")
}

/// Write the per-bounce filter mask as JSON to `mask.json` in `directory`.
pub fn write_mask(mask: &FilterMask, directory: impl AsRef<Path>) -> Result<PathBuf> {
    write_json(mask, directory.as_ref(), "mask.json")
}

/// Write a human readable summary of a render pass to `stats.txt`.
pub fn write_stats(stats: &RenderStats, directory: impl AsRef<Path>) -> Result<PathBuf> {
    let path = prepare(directory.as_ref(), "stats.txt")?;
    let file = File::create(&path).with_context(|| format!("failed to create {:?}", path))?;
    let mut writer = BufWriter::new(file);
    write!(writer, "{}", stats)?;
    writer.flush()?;
    Ok(path)
}

fn write_json<T: Serialize>(value: &T, directory: &Path, name: &str) -> Result<PathBuf> {
    let path = prepare(directory, name)?;
    let file = File::create(&path).with_context(|| format!("failed to create {:?}", path))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer(&mut writer, value)
        .with_context(|| format!("failed to serialize {}", name))?;
    writer.flush()?;
    log::info!("wrote {:?}", path);
    Ok(path)
}

fn prepare(directory: &Path, name: &str) -> Result<PathBuf> {
    fs::create_dir_all(directory)
        .with_context(|| format!("failed to create output directory {:?}", directory))?;
    Ok(directory.join(name))
}
