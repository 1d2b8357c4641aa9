mod common;

use raybounce::filter::FilterConfig;
use raybounce::palette::DEPTH_PALETTE;
use raybounce::postprocess::PostProcess;
use raybounce::render::{ColorMode, RenderConfig};
use raybounce::settings;

#[test]
fn default_config_loads() {
    let settings = settings::load_default_config().unwrap();
    assert_eq!(settings.render.color, ColorMode::Depth);
    assert_eq!(settings.render.frequency_index, 0);
    assert_eq!(settings.filter, FilterConfig::default());
    assert!(!settings.write_mask);
    assert!(settings.frequency.is_none());
}

#[test]
fn default_pipeline_draws_everything() {
    let settings = settings::load_default_config().unwrap();
    let mut problem = PostProcess::from_bundle(common::two_bounce_bundle(), settings);
    problem.run().unwrap();

    let mask = problem.mask.as_ref().unwrap();
    assert_eq!(mask.drawn_tracks(), 1);
    assert_eq!(mask.drawn_bounces(), 2);
    assert_eq!(mask.drawn_escapes(), 1);

    let data = problem.data.as_ref().unwrap();
    assert_eq!(data.stats.points, 2);
    assert_eq!(data.stats.lines, 1);
    assert_eq!(data.stats.escape_lines, 1);
    // default footprint offset does not touch a bundle without footprints
    assert_eq!(data.stats.footprints, 0);

    let rerun = problem
        .render_with(
            &FilterConfig::default(),
            &RenderConfig::from_toml("[color]\nmode = \"max_refl_depth\"").unwrap(),
        )
        .unwrap();
    let escape = rerun.lines.iter().find(|l| l.escape).unwrap();
    assert_eq!(escape.color, DEPTH_PALETTE[1]);
}
