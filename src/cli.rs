// SPDX-License-Identifier: GPL-3.0-only

//! CLI commands for the filter pipeline
//!
//! This module provides command-line functionality for:
//! - Filtering still images
//! - Extracting color palettes
//! - Inspecting content fitting
//! - Previewing the live pipeline on a synthetic camera

use crate::{FilterArgs, PreviewArgs};
use camera_pipeline::backends::{CaptureLoopController, LoopAction, SyntheticSource, TestPattern};
use camera_pipeline::constants::DropPolicy;
use camera_pipeline::constants::buffers::RETAINED_BUFFER_COUNT;
use camera_pipeline::media::{load_image, save_image};
use camera_pipeline::palette::{self, PaletteOptions};
use camera_pipeline::{
    ChainFactory, Config, ContentFit, Dimensions, FilterBackend, FilterStage, FilterType,
    FormatDescription, GpuContext, MediaTime, Orientation, PixelBuffer, PresentationSink, Renderer,
    RendererDelegate, StageFactory, StageSetup, compute_fit,
};
use chrono::Local;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

type CliResult = Result<(), Box<dyn std::error::Error>>;

/// Parse `WIDTHxHEIGHT`
pub fn parse_dimensions(value: &str) -> Result<Dimensions, String> {
    let (width, height) = value
        .split_once(['x', 'X'])
        .ok_or_else(|| format!("expected WIDTHxHEIGHT, got '{}'", value))?;
    let width: u32 = width.trim().parse().map_err(|e| format!("width: {}", e))?;
    let height: u32 = height.trim().parse().map_err(|e| format!("height: {}", e))?;
    let dimensions = Dimensions::new(width, height);
    dimensions.validate().map_err(|e| e.to_string())?;
    Ok(dimensions)
}

/// Load the config from `path`, or the default location
pub fn load_config(path: Option<&Path>) -> Result<Config, Box<dyn std::error::Error>> {
    let config = match path {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    debug!(?config, "Using config");
    Ok(config)
}

fn resolve_filter(name: Option<&str>, config: &Config) -> Result<FilterType, String> {
    match name {
        Some(key) => FilterType::from_key(key)
            .ok_or_else(|| format!("Unknown filter '{}', see 'camera-pipeline filters'", key)),
        None => Ok(config.filter),
    }
}

fn resolve_backend(name: Option<&str>, config: &Config) -> Result<FilterBackend, String> {
    match name {
        Some(name) => FilterBackend::from_name(name)
            .ok_or_else(|| format!("Unknown backend '{}' (legacy or compute)", name)),
        None => Ok(config.backend),
    }
}

fn resolve_fit(name: Option<&str>, config: &Config) -> Result<ContentFit, String> {
    match name {
        Some(name) => ContentFit::from_name(name)
            .ok_or_else(|| format!("Unknown fit '{}' (fill, aspect-fit or aspect-fill)", name)),
        None => Ok(config.content_fit),
    }
}

fn parse_orientation(name: &str) -> Result<Orientation, String> {
    match name {
        "up" => Ok(Orientation::Up),
        "down" => Ok(Orientation::Down),
        "left" => Ok(Orientation::Left),
        "right" => Ok(Orientation::Right),
        _ => Err(format!("Unknown orientation '{}' (up, down, left or right)", name)),
    }
}

fn parse_pattern(name: &str) -> Result<TestPattern, String> {
    match name {
        "gradient" => Ok(TestPattern::Gradient),
        "bars" => Ok(TestPattern::Bars),
        "flat" => Ok(TestPattern::Flat),
        _ => Err(format!("Unknown pattern '{}' (gradient, bars or flat)", name)),
    }
}

fn load_overlays(paths: &[PathBuf]) -> Result<Vec<PixelBuffer>, Box<dyn std::error::Error>> {
    paths
        .iter()
        .map(|path| load_image(path).map_err(Into::into))
        .collect()
}

fn default_output_path() -> PathBuf {
    let timestamp = Local::now().format("%Y%m%d_%H%M%S");
    PathBuf::from(format!("filtered_{}.png", timestamp))
}

/// Run one stage over `input`, cleaning it up afterwards
fn run_stage(
    stage: &mut dyn FilterStage,
    input: &PixelBuffer,
    time: MediaTime,
) -> Result<PixelBuffer, Box<dyn std::error::Error>> {
    let result = stage
        .prepare(&FormatDescription::of(input), &StageSetup::default())
        .map(|()| stage.process(input, time));
    stage.cleanup();
    result?.ok_or_else(|| format!("Stage '{}' dropped the image", stage.label()).into())
}

/// Filter a still image and save the result
pub fn filter_image(config: &Config, args: FilterArgs) -> CliResult {
    let filter = resolve_filter(args.filter.as_deref(), config)?;
    let backend = resolve_backend(args.backend.as_deref(), config)?;
    let fit = resolve_fit(args.mode.as_deref(), config)?;
    let target = args.target.or_else(|| config.target_dimensions());
    let portrait = args.portrait || config.portrait;

    let input = load_image(&args.input)?;
    let overlay_paths = if args.overlay.is_empty() {
        &config.overlays
    } else {
        &args.overlay
    };
    let overlays = load_overlays(overlay_paths)?;

    let context = GpuContext::new_blocking("camera-pipeline-filter")?;
    println!("Using GPU: {}", context.info().adapter_name);
    let factory = StageFactory::new(context, backend);

    let time = MediaTime::from_seconds(args.time);
    let mut chain = factory.create_chain(filter, &overlays);
    println!("Chain ({}): {}", backend.display_name(), chain.labels().join(" -> "));
    let mut output = run_stage(&mut chain, &input, time)?;

    if let Some(target) = target {
        let mut scaler = factory.create_scaler(target, fit, portrait);
        output = run_stage(scaler.as_mut(), &output, time)?;
    }

    let path = args.output.unwrap_or_else(default_output_path);
    save_image(&output, &path)?;
    println!(
        "Saved {}x{} image: {}",
        output.width(),
        output.height(),
        path.display()
    );
    Ok(())
}

/// Print the dominant palette of an image
pub fn print_palette(input: &Path, count: usize, quality: usize, ignore_white: bool) -> CliResult {
    let image = image::open(input)?;
    let pixels = palette::pixels_from_image(&image);
    let options = PaletteOptions {
        quality,
        ignore_white,
    };

    let colors = palette::palette(&pixels, count, options)
        .ok_or("No palette: empty image, no opaque pixels, or count outside 2-256")?;

    println!("Palette of {} ({} colors):", input.display(), colors.len());
    for (index, color) in colors.iter().enumerate() {
        println!(
            "  [{}] {}  rgb({}, {}, {})",
            index, color, color.r, color.g, color.b
        );
    }
    Ok(())
}

/// Print the placement of `source` inside `target`
pub fn print_fit(source: Dimensions, target: Dimensions, mode: &str, portrait: bool) -> CliResult {
    let policy = ContentFit::from_name(mode)
        .ok_or_else(|| format!("Unknown fit '{}' (fill, aspect-fit or aspect-fill)", mode))?;
    let fit = compute_fit(source, target, policy, portrait);
    let (scaled_width, scaled_height) = fit.scaled_size();

    println!(
        "{}x{} -> {}x{} ({}{})",
        source.width,
        source.height,
        target.width,
        target.height,
        policy.display_name(),
        if portrait { ", portrait" } else { "" }
    );
    println!("  Scale:     {:.4} x {:.4}", fit.scale_x, fit.scale_y);
    println!("  Offset:    {:.2}, {:.2}", fit.translate_x, fit.translate_y);
    println!("  Scaled:    {:.2} x {:.2}", scaled_width, scaled_height);
    println!("  NDC:       {:?}", fit.to_ndc_transform().to_cols());
    Ok(())
}

/// List filter keys
pub fn list_filters() -> CliResult {
    println!("Available filters:");
    for filter in FilterType::ALL {
        let note = if filter.is_applied() { "" } else { " (no effect)" };
        println!("  {}{}", filter.name(), note);
    }
    Ok(())
}

/// Forwards the renderer's display hand-off into the view's sink
struct PreviewDelegate {
    view: Arc<PresentationSink>,
}

impl RendererDelegate for PreviewDelegate {
    fn ready_for_display(&self, buffer: &PixelBuffer) {
        self.view.display(buffer.clone());
    }

    fn filtered_buffer_ready(&self, _buffer: &PixelBuffer, _time: MediaTime) {}

    fn ran_out_of_buffers(&self) {
        debug!("Renderer ran out of buffers");
    }
}

/// Drive the renderer from the synthetic camera and draw at the display rate
pub fn run_preview(config: &Config, args: PreviewArgs) -> CliResult {
    let filter = resolve_filter(args.filter.as_deref(), config)?;
    let backend = resolve_backend(args.backend.as_deref(), config)?;
    let pattern = parse_pattern(&args.pattern)?;
    let orientation = parse_orientation(&args.orientation)?;
    if args.display_fps == 0 {
        return Err("Display rate must be positive".into());
    }

    let mut source = SyntheticSource::new(args.size, args.fps, pattern, RETAINED_BUFFER_COUNT)?
        .with_orientation(orientation);

    let context = GpuContext::new_blocking("camera-pipeline-preview")?;
    println!("Using GPU: {}", context.info().adapter_name);
    let factory = Arc::new(StageFactory::new(context, backend));

    let view = Arc::new(PresentationSink::new(DropPolicy::DropNewest));
    let renderer = Arc::new(
        Renderer::new(factory, filter).with_delegate(Arc::new(PreviewDelegate {
            view: Arc::clone(&view),
        })),
    );
    renderer.set_portrait(args.portrait || config.portrait);
    renderer.set_output_dimensions(config.target_dimensions());
    renderer.set_overlays(load_overlays(&config.overlays)?);

    println!(
        "Previewing {} frames of {}x{} at {} fps, display at {} fps ({}, {})",
        args.frames,
        args.size.width,
        args.size.height,
        args.fps,
        args.display_fps,
        filter,
        backend.display_name()
    );

    let frame_limit = args.frames;
    let capture_renderer = Arc::clone(&renderer);
    let mut controller = CaptureLoopController::start(
        "synthetic-capture",
        Some(Duration::from_secs_f64(1.0 / args.fps as f64)),
        move |index| {
            if index >= frame_limit {
                return LoopAction::Stop;
            }
            match source.next_frame() {
                Ok(frame) => {
                    if let Err(e) = capture_renderer.process_frame(&frame) {
                        warn!(error = %e, "Renderer setup failed, stopping preview");
                        return LoopAction::Stop;
                    }
                    capture_renderer.deliver_pending_display();
                }
                Err(e) if e.is_pool_exhausted() => {
                    debug!(index, "Synthetic camera out of buffers, skipping frame");
                }
                Err(e) => {
                    warn!(error = %e, "Synthetic camera failed, stopping preview");
                    return LoopAction::Stop;
                }
            }
            LoopAction::Continue
        },
    )?;

    let display_interval = Duration::from_secs_f64(1.0 / args.display_fps as f64);
    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(async {
        let mut ticker = tokio::time::interval(display_interval);
        loop {
            ticker.tick().await;
            let running = controller.is_running();
            if let Some(id) = view.draw(|buffer| buffer.id()) {
                debug!(buffer = id, "Drew frame");
            }
            if !running {
                break;
            }
        }
    });
    controller.join();

    let renderer_stats = renderer.stats();
    let view_stats = view.stats();
    info!(?renderer_stats, ?view_stats, "Preview finished");

    println!("Captured:   {}", controller.frames().min(frame_limit));
    println!("Processed:  {}", renderer_stats.processed);
    println!("Filter drops: {}", renderer_stats.dropped);
    println!("Displayed:  {}", view_stats.drawn);
    println!("View drops: {}", view_stats.dropped);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_dimensions() {
        assert_eq!(parse_dimensions("1920x1080"), Ok(Dimensions::new(1920, 1080)));
        assert_eq!(parse_dimensions("64X48"), Ok(Dimensions::new(64, 48)));
        assert!(parse_dimensions("1920").is_err());
        assert!(parse_dimensions("0x10").is_err());
        assert!(parse_dimensions("axb").is_err());
    }

    #[test]
    fn test_resolve_falls_back_to_config() {
        let config = Config {
            filter: FilterType::Film,
            ..Config::default()
        };
        assert_eq!(resolve_filter(None, &config), Ok(FilterType::Film));
        assert_eq!(resolve_filter(Some("grayscale"), &config), Ok(FilterType::Grayscale));
        assert!(resolve_filter(Some("sepia"), &config).is_err());
        assert_eq!(resolve_backend(Some("legacy"), &config), Ok(FilterBackend::Legacy));
    }
}
