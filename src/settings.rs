use anyhow::{anyhow, Context, Result};
use clap::Parser;
use config::{Config, Environment, File};
use serde::Deserialize;
use std::env;
use std::fmt;
use std::path::PathBuf;

use crate::bounds::Bounds;
use crate::filter::FilterConfig;
use crate::render::{ColorMode, RenderConfig};

/// Tolerance in degrees when matching incidence angles.
pub const ANGLE_TOLERANCE: f64 = 1e-6;
/// Default length of escaping ray segments, in model units.
pub const DEFAULT_ESCAPE_LENGTH: f64 = 1.0;
/// Distance spans narrower than this are treated as a single distance.
pub const DISTANCE_EPSILON: f64 = 1e-12;


/// Runtime configuration for the application.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Settings {
    /// Path to the input bundle (JSON).
    pub bundle: String,
    /// Output directory.
    pub output: String,
    /// Frequency to colour by; overrides `render.frequency_index` with the
    /// nearest frequency in the bundle when set.
    #[serde(default)]
    pub frequency: Option<f64>,
    /// Also write the filter mask alongside the render data.
    #[serde(default)]
    pub write_mask: bool,
    #[serde(default)]
    pub filter: FilterConfig,
    #[serde(default)]
    pub render: RenderConfig,
}

pub fn load_default_config() -> Result<Settings> {
    let root = retrieve_project_root()?;
    let default_config_file = root.join("config/default.toml");

    let settings: Config = Config::builder()
        .add_source(File::from(default_config_file).required(true))
        .build()
        .context("failed to load configuration")?;

    let config: Settings = settings
        .try_deserialize()
        .context("failed to deserialize configuration")?;

    validate_config(&config)?;

    Ok(config)
}

pub fn load_config() -> Result<Settings> {
    let root = retrieve_project_root()?;

    let default_config_file = root.join("config/default.toml");
    let local_config = root.join("config/local.toml");

    let config_file = if local_config.exists() {
        log::info!("using local configuration: {:?}", local_config);
        local_config
    } else {
        log::info!("using default configuration: {:?}", default_config_file);
        default_config_file
    };

    let settings: Config = Config::builder()
        .add_source(File::from(config_file).required(true))
        .add_source(
            Environment::with_prefix("raybounce")
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        )
        .build()
        .context("failed to load configuration")?;

    let mut config: Settings = settings
        .try_deserialize()
        .context("failed to deserialize configuration")?;

    // command-line flags take precedence over files and environment
    let args = CliArgs::parse();

    if let Some(bundle) = args.bundle {
        config.bundle = bundle;
    }
    if let Some(output) = args.output {
        config.output = output;
    }
    if let Some(freq) = args.freq {
        config.frequency = Some(freq);
    }
    if args.mask {
        config.write_mask = true;
    }
    if let Some(range) = args.depth {
        config.filter.depth = parse_bounds(&range)?;
    }
    if let Some(range) = args.refl {
        config.filter.refl_depth = parse_bounds(&range)?;
    }
    if let Some(range) = args.trans {
        config.filter.trans_depth = parse_bounds(&range)?;
    }
    if let Some(range) = args.total_refl {
        config.filter.total_refl = parse_bounds(&range)?;
    }
    if let Some(range) = args.total_trans {
        config.filter.total_trans = parse_bounds(&range)?;
    }
    if let Some(sweeps) = args.sweep {
        config.filter.sweep_indices = Some(sweeps);
    }
    if let Some(mode) = args.color {
        config.render.color = ColorMode::from_toml(&format!("mode = \"{}\"", mode))
            .with_context(|| format!("invalid colour mode '{}'", mode))?;
    }
    if let Some(index) = args.freq_index {
        config.render.frequency_index = index;
    }
    if let Some(length) = args.escape_length {
        config.render.escape_length = length;
    }
    if let Some(offset) = args.footprint_offset {
        config.render.footprint_offset = offset;
    }
    if let Some(scale) = args.footprint_scale {
        config.render.footprint_scale = scale;
    }

    validate_config(&config)?;

    log::debug!("{:#?}", config);

    Ok(config)
}

/// Retrieve the project root directory.
/// This function tries to find the project root directory in different ways:
/// 1. If the CARGO_MANIFEST_DIR environment variable is set, use it.
/// 2. If the RAYBOUNCE_ROOT_DIR environment variable is set, use it.
/// 3. If the "config" subdirectory is found in the executable directory or any of its parents, use it.
pub fn retrieve_project_root() -> Result<PathBuf> {
    if let Ok(manifest_dir) = env::var("CARGO_MANIFEST_DIR") {
        return Ok(PathBuf::from(manifest_dir));
    }
    if let Ok(path) = env::var("RAYBOUNCE_ROOT_DIR") {
        return Ok(PathBuf::from(path));
    }

    let exe_path = env::current_exe().context("failed to get current executable path")?;
    exe_path
        .ancestors()
        .skip(1)
        .find(|dir| dir.join("config").is_dir())
        .map(PathBuf::from)
        .ok_or_else(|| anyhow!("could not find project root directory"))
}

pub fn validate_config(config: &Settings) -> Result<()> {
    if config.bundle.is_empty() {
        return Err(anyhow!("bundle path must not be empty"));
    }
    if let Some(freq) = config.frequency {
        if !(freq.is_finite() && freq > 0.0) {
            return Err(anyhow!("frequency must be positive, got {}", freq));
        }
    }
    config.render.validate()?;
    Ok(())
}

/// Parse an inclusive range given as "min,max" or "min," for no upper bound.
fn parse_bounds(s: &str) -> Result<Bounds> {
    let (min, max) = s
        .split_once(',')
        .ok_or_else(|| anyhow!("invalid range '{}', expected 'min,max' or 'min,'", s))?;
    let min = min
        .trim()
        .parse::<u32>()
        .with_context(|| format!("failed to parse range minimum: {}", min))?;
    let max = match max.trim() {
        "" => None,
        max => Some(
            max.parse::<u32>()
                .with_context(|| format!("failed to parse range maximum: {}", max))?,
        ),
    };
    Ok(Bounds::new(min, max)?)
}

#[derive(Parser, Debug)]
#[command(version, about = "raybounce - filter and prepare ray bounce trees for rendering")]
pub struct CliArgs {
    /// Path to the input bundle (JSON).
    #[arg(short, long)]
    bundle: Option<String>,

    /// Output directory for render data and summaries.
    #[arg(short, long)]
    output: Option<String>,

    /// Frequency to colour by. The nearest frequency in the bundle is used.
    #[arg(short, long)]
    freq: Option<f64>,

    /// Index of the frequency to colour by. Ignored if --freq is given.
    #[arg(long)]
    freq_index: Option<usize>,

    /// Also write the per-bounce filter mask.
    #[arg(long)]
    mask: bool,

    /// Composite depth range of drawn bounces, as "min,max" or "min,".
    #[arg(long)]
    depth: Option<String>,

    /// Reflection depth range of drawn bounces.
    #[arg(long)]
    refl: Option<String>,

    /// Transmission depth range of drawn bounces.
    #[arg(long)]
    trans: Option<String>,

    /// Range of total reflections along a drawn branch.
    #[arg(long)]
    total_refl: Option<String>,

    /// Range of total transmissions along a drawn branch.
    #[arg(long)]
    total_trans: Option<String>,

    /// Sweep indices to draw, separated by spaces.
    #[arg(long, num_args = 1.., value_delimiter = ' ')]
    sweep: Option<Vec<usize>>,

    /// Colour mode: depth, max_refl_depth, max_trans_depth or distance.
    /// Field colouring is configured in the config file.
    #[arg(short, long)]
    color: Option<String>,

    /// Length of escaping ray segments.
    #[arg(long)]
    escape_length: Option<f64>,

    /// Base offset of footprints along their surface normal.
    #[arg(long)]
    footprint_offset: Option<f64>,

    /// Signed footprint offset scale in [-1, 1].
    #[arg(long, allow_hyphen_values = true)]
    footprint_scale: Option<f64>,
}

impl fmt::Display for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let optional = |v: &Option<Vec<usize>>| match v {
            Some(v) => format!("{:?}", v),
            None => "all".to_string(),
        };
        write!(
            f,
            "Settings:
  - Bundle: {}
  - Output: {}
  - Depth: {}
  - Reflection Depth: {}
  - Transmission Depth: {}
  - Total Reflections: {}
  - Total Transmissions: {}
  - Sweep Indices: {}
  - Colour: {:?}
  - Frequency Index: {}
  - Escape Length: {:.6}
  - Footprint Offset: {:.6} (scale {:.3})
  ",
            self.bundle,
            self.output,
            self.filter.depth,
            self.filter.refl_depth,
            self.filter.trans_depth,
            self.filter.total_refl,
            self.filter.total_trans,
            optional(&self.filter.sweep_indices),
            self.render.color,
            self.render.frequency_index,
            self.render.escape_length,
            self.render.footprint_offset,
            self.render.footprint_scale,
        )
    }
}
