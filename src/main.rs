use clap::{Args, Parser, Subcommand};
use imagen_studio::config::{self, StudioConfig};
use imagen_studio::history::{FileStorage, HistoryStore};
use imagen_studio::imaging::{
    AdjustmentParameters, CropAspect, EncodedImage, RasterBackend, RasterImage, RenderRequest,
    Rotation, TransformParameters, WatermarkEffect, WatermarkPosition, WatermarkSize,
    WatermarkSpec, render_encoded,
};
use imagen_studio::output;
use imagen_studio::state::{Action, AppState, Effects, update};
use imagen_studio::types::{GeneratedArtifact, MimeType, now_epoch_ms, unique_timestamp};
use rayon::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "imagen-studio")]
#[command(about = "Filter, transform and watermark generated images; keep a bounded history")]
#[command(long_about = "\
Filter, transform and watermark generated images; keep a bounded history

Edits run as one pipeline per image:

  decode → color filters → rotate/flip → crop/zoom → watermark → encode

History is a newest-first list of recent images stored in a size-capped
slot. When the slot is full, older entries are dropped from the saved copy.

Run 'imagen-studio gen-config' to generate a documented studio.toml.")]
#[command(version)]
struct Cli {
    /// Config file (missing file = stock defaults)
    #[arg(long, default_value = "studio.toml", global = true)]
    config: PathBuf,

    /// History directory (overrides history.store_dir)
    #[arg(long, global = true)]
    store_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Apply filters, transforms and a watermark to one or more images
    Edit(EditArgs),
    /// Inspect and manage the saved history
    #[command(subcommand)]
    History(HistoryCommand),
    /// Print a stock studio.toml with all options documented
    GenConfig,
}

#[derive(Args)]
struct EditArgs {
    /// Input images (PNG or JPEG)
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// Output directory (defaults to each input's directory)
    #[arg(long)]
    out_dir: Option<PathBuf>,

    /// Output format: png or jpeg (defaults to the input's format)
    #[arg(long)]
    format: Option<MimeType>,

    /// JPEG quality 1-100 (overrides output.jpeg_quality)
    #[arg(long)]
    quality: Option<u8>,

    #[command(flatten)]
    adjust: AdjustArgs,

    #[command(flatten)]
    transform: TransformArgs,

    #[command(flatten)]
    watermark: WatermarkArgs,

    /// Add each result to the history
    #[arg(long)]
    save: bool,

    /// Prompt recorded with saved results (defaults to the file name)
    #[arg(long, requires = "save")]
    prompt: Option<String>,
}

#[derive(Args)]
struct AdjustArgs {
    /// Brightness in percent, 0-200
    #[arg(long, default_value_t = 100.0)]
    brightness: f32,
    /// Contrast in percent, 0-200
    #[arg(long, default_value_t = 100.0)]
    contrast: f32,
    /// Saturation in percent, 0-200
    #[arg(long, default_value_t = 100.0)]
    saturation: f32,
    /// Hue rotation in degrees, -180 to 180
    #[arg(long, default_value_t = 0.0, allow_hyphen_values = true)]
    hue: f32,
    /// Sepia in percent, 0-100
    #[arg(long, default_value_t = 0.0)]
    sepia: f32,
    /// Gaussian blur radius in pixels, 0-20
    #[arg(long, default_value_t = 0.0)]
    blur: f32,
}

impl AdjustArgs {
    fn params(&self) -> AdjustmentParameters {
        AdjustmentParameters {
            brightness: self.brightness,
            contrast: self.contrast,
            saturation: self.saturation,
            hue_rotate_deg: self.hue,
            sepia: self.sepia,
            blur_radius_px: self.blur,
        }
        .clamped()
    }
}

#[derive(Args)]
struct TransformArgs {
    /// Clockwise rotation in degrees, snapped to a quarter turn
    #[arg(long, default_value_t = 0, allow_hyphen_values = true)]
    rotate: i32,
    /// Mirror left to right
    #[arg(long)]
    flip_h: bool,
    /// Mirror top to bottom
    #[arg(long)]
    flip_v: bool,
    /// Center crop: original, 1:1, 16:9, 4:3 or 9:16
    #[arg(long, default_value = "original")]
    crop: CropAspect,
    /// Centered zoom after the crop, 1.0 = none
    #[arg(long, default_value_t = 1.0)]
    zoom: f32,
}

impl TransformArgs {
    fn params(&self) -> TransformParameters {
        TransformParameters {
            rotation: Rotation::from_degrees(self.rotate),
            flip_horizontal: self.flip_h,
            flip_vertical: self.flip_v,
            crop_aspect: self.crop,
            zoom: self.zoom,
        }
        .clamped()
    }
}

/// Watermark flags. Unset values fall back to `[watermark]` in studio.toml.
#[derive(Args)]
struct WatermarkArgs {
    /// Draw the watermark
    #[arg(long)]
    watermark: bool,
    /// Watermark text
    #[arg(long, requires = "watermark")]
    text: Option<String>,
    /// none, outline, shadow, glow, emboss, vintage or neon
    #[arg(long, requires = "watermark")]
    effect: Option<WatermarkEffect>,
    /// Opacity in percent, 0-100
    #[arg(long, requires = "watermark")]
    opacity: Option<u8>,
    /// topLeft, topRight, bottomLeft, bottomRight, center or tile
    #[arg(long, requires = "watermark")]
    position: Option<WatermarkPosition>,
    /// small, medium, large or extraLarge
    #[arg(long, requires = "watermark")]
    size: Option<WatermarkSize>,
}

impl WatermarkArgs {
    fn spec(&self, defaults: &config::WatermarkConfig) -> Option<WatermarkSpec> {
        if !self.watermark {
            return None;
        }
        let mut spec = defaults.spec();
        if let Some(text) = &self.text {
            spec.text = text.clone();
        }
        spec.effect = self.effect.unwrap_or(spec.effect);
        spec.opacity_percent = self.opacity.unwrap_or(spec.opacity_percent).min(100);
        spec.position = self.position.unwrap_or(spec.position);
        spec.size = self.size.unwrap_or(spec.size);
        Some(spec)
    }
}

#[derive(Subcommand)]
enum HistoryCommand {
    /// List saved entries, newest first
    List,
    /// Add an image file to the history
    Add {
        file: PathBuf,
        /// Prompt recorded with the entry (defaults to the file name)
        #[arg(long)]
        prompt: Option<String>,
    },
    /// Remove entries by timestamp
    Remove {
        #[arg(required = true)]
        timestamps: Vec<i64>,
    },
    /// Write an entry to disk as tdanimator-<timestamp>.<ext>
    Export {
        timestamp: i64,
        /// Target directory
        #[arg(long, default_value = ".")]
        out_dir: PathBuf,
    },
    /// Delete every entry
    Clear,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
        Command::Edit(args) => {
            let studio = config::load_config(&cli.config)?;
            run_edit(&studio, cli.store_dir.as_deref(), &args)?;
        }
        Command::History(command) => {
            let studio = config::load_config(&cli.config)?;
            run_history(&studio, cli.store_dir.as_deref(), command)?;
        }
    }

    Ok(())
}

fn open_history(
    studio: &StudioConfig,
    store_dir: Option<&Path>,
) -> Result<HistoryStore<FileStorage>, Box<dyn std::error::Error>> {
    let dir = store_dir
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from(&studio.history.store_dir));
    debug!(dir = %dir.display(), slot = %studio.history.slot, "opening history");
    let storage = FileStorage::open(dir, studio.history.quota_bytes)?;
    Ok(HistoryStore::new(
        storage,
        studio.history.slot.clone(),
        studio.history.max_items,
    ))
}

fn run_edit(
    studio: &StudioConfig,
    store_dir: Option<&Path>,
    args: &EditArgs,
) -> Result<(), Box<dyn std::error::Error>> {
    let backend = RasterBackend::with_max_surface_pixels(studio.output.max_surface_pixels);
    let request = RenderRequest {
        adjust: args.adjust.params(),
        transform: args.transform.params(),
        watermark: args.watermark.spec(&studio.watermark),
        output_mime: args.format,
        jpeg_quality: args
            .quality
            .unwrap_or(studio.output.jpeg_quality)
            .clamp(1, 100),
    };
    info!(inputs = args.inputs.len(), "rendering");

    // Each input gets its own surfaces; results come back in input order.
    let results: Vec<Result<(PathBuf, EncodedImage), String>> = args
        .inputs
        .par_iter()
        .map(|input| render_file(&backend, input, args.out_dir.as_deref(), &request))
        .collect();

    let mut rendered = Vec::new();
    let mut failures = 0;
    for (i, (input, result)) in args.inputs.iter().zip(results).enumerate() {
        let name = input.display().to_string();
        match result {
            Ok((path, encoded)) => {
                output::print_lines(&output::format_render_result(
                    i + 1,
                    &name,
                    &path.display().to_string(),
                    &encoded,
                ));
                rendered.push((input, encoded));
            }
            Err(message) => {
                failures += 1;
                output::print_lines(&output::format_render_failure(i + 1, &name, &message));
            }
        }
    }

    if args.save && !rendered.is_empty() {
        let mut history = open_history(studio, store_dir)?;
        let mut fx = Effects {
            history: &mut history,
            backend: &backend,
            jpeg_quality: request.jpeg_quality,
        };
        let mut state = update(
            AppState::new(studio.watermark.spec()),
            Action::HistoryLoaded,
            &mut fx,
        );
        for (input, encoded) in rendered {
            let taken: Vec<i64> = state.history.iter().map(|a| a.timestamp).collect();
            let prompt = args.prompt.clone().unwrap_or_else(|| file_label(input));
            let artifact = GeneratedArtifact::new(
                encoded.bytes,
                encoded.mime,
                prompt,
                unique_timestamp(now_epoch_ms(), &taken),
            );
            state = update(state, Action::Generated(artifact), &mut fx);
        }
        print_outcome(&state);
    }

    if failures > 0 {
        return Err(format!("{failures} of {} inputs failed", args.inputs.len()).into());
    }
    Ok(())
}

fn render_file(
    backend: &RasterBackend,
    input: &Path,
    out_dir: Option<&Path>,
    request: &RenderRequest,
) -> Result<(PathBuf, EncodedImage), String> {
    let bytes = fs::read(input).map_err(|e| e.to_string())?;
    let declared = input
        .extension()
        .and_then(|e| e.to_str())
        .and_then(MimeType::from_extension)
        .unwrap_or_default();
    let encoded = render_encoded(backend, &bytes, declared, request).map_err(|e| e.to_string())?;

    let dir = out_dir
        .or_else(|| input.parent())
        .unwrap_or_else(|| Path::new("."));
    let path = dir.join(format!(
        "{}-edited.{}",
        file_label(input),
        encoded.mime.extension()
    ));
    fs::write(&path, &encoded.bytes).map_err(|e| format!("{}: {e}", path.display()))?;
    Ok((path, encoded))
}

fn file_label(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "image".to_string())
}

fn run_history(
    studio: &StudioConfig,
    store_dir: Option<&Path>,
    command: HistoryCommand,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut history = open_history(studio, store_dir)?;
    let backend = RasterBackend::with_max_surface_pixels(studio.output.max_surface_pixels);
    let mut fx = Effects {
        history: &mut history,
        backend: &backend,
        jpeg_quality: studio.output.jpeg_quality,
    };
    let state = update(
        AppState::new(studio.watermark.spec()),
        Action::HistoryLoaded,
        &mut fx,
    );

    match command {
        HistoryCommand::List => {
            output::print_history_listing(&state.history, studio.history.max_items);
        }
        HistoryCommand::Add { file, prompt } => {
            let bytes = fs::read(&file)?;
            let declared = file
                .extension()
                .and_then(|e| e.to_str())
                .and_then(MimeType::from_extension)
                .unwrap_or_default();
            // Reject anything that will not decode later.
            let mime = RasterImage::decode(&bytes, declared)?.mime;
            let taken: Vec<i64> = state.history.iter().map(|a| a.timestamp).collect();
            let artifact = GeneratedArtifact::new(
                bytes,
                mime,
                prompt.unwrap_or_else(|| file_label(&file)),
                unique_timestamp(now_epoch_ms(), &taken),
            );
            println!("Added {}", artifact.timestamp);
            let state = update(state, Action::Generated(artifact), &mut fx);
            print_outcome(&state);
        }
        HistoryCommand::Remove { timestamps } => {
            let mut actions = vec![Action::SetSelectionMode(true)];
            actions.extend(timestamps.iter().map(|&ts| Action::ToggleSelection(ts)));
            actions.push(Action::DeleteSelected);
            let before = state.history.len();
            let state = actions
                .into_iter()
                .fold(state, |s, action| update(s, action, &mut fx));
            let removed = before - state.history.len();
            if removed == 0 {
                println!("No matching entries");
            } else {
                println!("Removed {removed}");
                print_outcome(&state);
            }
        }
        HistoryCommand::Export { timestamp, out_dir } => {
            let Some(item) = state.history.iter().find(|a| a.timestamp == timestamp) else {
                return Err(format!("no history entry with timestamp {timestamp}").into());
            };
            let path = out_dir.join(item.download_name());
            fs::write(&path, &item.image_data)?;
            println!("{}", path.display());
        }
        HistoryCommand::Clear => {
            let state = update(state, Action::ClearHistory, &mut fx);
            print_outcome(&state);
        }
    }

    Ok(())
}

fn print_outcome(state: &AppState) {
    match &state.last_outcome {
        Some(outcome) if outcome.is_complete() => {
            println!("{}", output::format_persist_outcome(outcome));
        }
        Some(outcome) => eprintln!("{}", output::format_persist_outcome(outcome)),
        None => {}
    }
}
