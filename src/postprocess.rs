//! Orchestration of one post-processing run.
//!
//! A [`PostProcess`] owns the loaded bundle and runs the stages in order:
//! augmentation, filtering, render data building. The augmented bundle is
//! kept so that further passes with other filter or render settings reuse
//! it without augmenting again.

use std::time::Instant;

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};

use crate::bundle::RayBundle;
use crate::filter::{FilterConfig, FilterMask};
use crate::output;
use crate::render::{RenderConfig, RenderData};
use crate::settings::Settings;


/// A bundle together with the settings of the run that processes it.
#[derive(Debug, Clone)]
pub struct PostProcess {
    pub settings: Settings,
    pub bundle: RayBundle,
    pub mask: Option<FilterMask>,
    pub data: Option<RenderData>,
}

impl PostProcess {
    /// Loads the bundle named in `settings`.
    pub fn new(settings: Settings) -> Result<Self> {
        let bundle = RayBundle::from_file(&settings.bundle)?;
        Ok(Self::from_bundle(bundle, settings))
    }

    pub fn from_bundle(bundle: RayBundle, settings: Settings) -> Self {
        Self {
            settings,
            bundle,
            mask: None,
            data: None,
        }
    }

    /// Augments, filters and builds render data.
    pub fn run(&mut self) -> Result<()> {
        let start = Instant::now();

        let pb = ProgressBar::new(3);
        pb.set_style(
            ProgressStyle::with_template(
                "{spinner:.green} [{elapsed_precise}] {bar:40.green/blue} {pos:>2}/{len:2} {msg}",
            )?
            .progress_chars("█▇▆▅▄▃▂▁"),
        );

        pb.set_message("augmenting");
        self.bundle.augment().context("augmentation failed")?;
        pb.inc(1);

        if let Some(freq) = self.settings.frequency {
            let index = self
                .bundle
                .nearest_frequency_index(freq)
                .context("bundle has no frequencies")?;
            log::info!(
                "colouring at {} (index {}) for requested {}",
                self.bundle.frequencies[index],
                index,
                freq
            );
            self.settings.render.frequency_index = index;
        }

        pb.set_message("filtering");
        let mask = self
            .settings
            .filter
            .apply(&self.bundle)
            .context("filtering failed")?;
        pb.inc(1);

        pb.set_message("building render data");
        let data = RenderData::build(&self.bundle, &mask, &self.settings.render)
            .context("render data building failed")?;
        pb.inc(1);
        pb.finish_with_message("done");

        log::info!(
            "processed {} tracks ({} bounces) in {:.2?}",
            self.bundle.tracks.len(),
            self.bundle.num_bounces(),
            start.elapsed()
        );

        self.mask = Some(mask);
        self.data = Some(data);
        Ok(())
    }

    /// Another filter and render pass over the already augmented bundle.
    pub fn render_with(&self, filter: &FilterConfig, render: &RenderConfig) -> Result<RenderData> {
        let mask = filter.apply(&self.bundle)?;
        Ok(RenderData::build(&self.bundle, &mask, render)?)
    }

    /// Writes the render data, the summary and optionally the mask.
    pub fn writeup(&self) -> Result<()> {
        let data = self
            .data
            .as_ref()
            .context("nothing to write, run the post-processing first")?;
        let directory = &self.settings.output;

        output::write_render_data(data, directory)?;
        output::write_stats(&data.stats, directory)?;
        if self.settings.write_mask {
            if let Some(mask) = &self.mask {
                output::write_mask(mask, directory)?;
            }
        }
        Ok(())
    }
}
