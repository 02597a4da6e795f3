// SPDX-License-Identifier: GPL-3.0-only

use camera_pipeline::constants::palette::DOMINANT_PALETTE_SIZE;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

mod cli;

#[derive(Parser)]
#[command(name = "camera-pipeline")]
#[command(about = "GPU filter pipeline for camera frames")]
#[command(version)]
struct Cli {
    /// Config file (default: ~/.config/camera-pipeline/config.json)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a still image through a filter chain
    Filter(FilterArgs),

    /// Print the dominant colors of an image
    Palette {
        /// Image to analyse
        input: PathBuf,

        /// Number of colors (2-256)
        #[arg(short = 'n', long, default_value_t = DOMINANT_PALETTE_SIZE)]
        count: usize,

        /// Sample every Nth pixel
        #[arg(short, long, default_value = "10")]
        quality: usize,

        /// Keep near-white pixels
        #[arg(long)]
        include_white: bool,
    },

    /// Print how a source is placed in a target
    Fit {
        /// Source size, e.g. 1920x1080
        #[arg(value_parser = cli::parse_dimensions)]
        source: camera_pipeline::Dimensions,

        /// Target size, e.g. 1080x1920
        #[arg(value_parser = cli::parse_dimensions)]
        target: camera_pipeline::Dimensions,

        /// fill, aspect-fit or aspect-fill
        #[arg(short, long, default_value = "aspect-fill")]
        mode: String,

        /// Treat a landscape source as rotated
        #[arg(short, long)]
        portrait: bool,
    },

    /// Run the synthetic camera through the renderer
    Preview(PreviewArgs),

    /// List available filter keys
    Filters,
}

#[derive(Args)]
pub struct FilterArgs {
    /// Image to filter
    pub input: PathBuf,

    /// Output file (default: ./filtered_TIMESTAMP.png)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Filter key (see 'camera-pipeline filters')
    #[arg(short, long)]
    pub filter: Option<String>,

    /// legacy or compute
    #[arg(short, long)]
    pub backend: Option<String>,

    /// Presentation time in seconds, drives animated filters
    #[arg(short, long, default_value = "0")]
    pub time: f64,

    /// Overlay images blended on top, in order
    #[arg(long)]
    pub overlay: Vec<PathBuf>,

    /// Fit the result into this size, e.g. 1080x1920
    #[arg(long, value_parser = cli::parse_dimensions)]
    pub target: Option<camera_pipeline::Dimensions>,

    /// fill, aspect-fit or aspect-fill
    #[arg(short, long)]
    pub mode: Option<String>,

    /// Present in portrait
    #[arg(short, long)]
    pub portrait: bool,
}

#[derive(Args)]
pub struct PreviewArgs {
    /// Frame size, e.g. 1280x720
    #[arg(long, default_value = "640x360", value_parser = cli::parse_dimensions)]
    pub size: camera_pipeline::Dimensions,

    /// Capture frame rate
    #[arg(long, default_value = "60")]
    pub fps: u32,

    /// Display refresh rate
    #[arg(long, default_value = "30")]
    pub display_fps: u32,

    /// Number of frames to capture
    #[arg(short = 'n', long, default_value = "120")]
    pub frames: u64,

    /// Filter key (see 'camera-pipeline filters')
    #[arg(short, long)]
    pub filter: Option<String>,

    /// legacy or compute
    #[arg(short, long)]
    pub backend: Option<String>,

    /// gradient, bars or flat
    #[arg(long, default_value = "gradient")]
    pub pattern: String,

    /// Track orientation: up, down, left or right
    #[arg(long, default_value = "up")]
    pub orientation: String,

    /// Present in portrait
    #[arg(short, long)]
    pub portrait: bool,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    // Use RUST_LOG env var if set, otherwise default to warn level
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_target(true)
        .with_level(true)
        .init();

    let cli = Cli::parse();
    let config = cli::load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Filter(args) => cli::filter_image(&config, args),
        Commands::Palette {
            input,
            count,
            quality,
            include_white,
        } => cli::print_palette(&input, count, quality, !include_white),
        Commands::Fit {
            source,
            target,
            mode,
            portrait,
        } => cli::print_fit(source, target, &mode, portrait),
        Commands::Preview(args) => cli::run_preview(&config, args),
        Commands::Filters => cli::list_filters(),
    }
}
