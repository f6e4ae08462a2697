//! atelier: command-line front end for the editing core.
//!
//! Runs the same operations the browser shell drives interactively, on
//! files:
//!
//! - `edit`: resize, apply a preset or individual adjustments, or bake an
//!   arbitrary CSS filter string into an image
//! - `mask`: rasterize freehand strokes into a black-and-white inpaint mask
//! - `gallery`: list, add, and delete creations in a directory store
//!
//! # Usage
//!
//! ```text
//! atelier edit photo.jpg -o out.jpg --preset vintage --width 1280
//! atelier mask photo.jpg --strokes strokes.json -o mask.png
//! atelier gallery --dir ./creations list
//! ```

#![allow(clippy::print_stdout, clippy::print_stderr)]

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use atelier_core::compositor;
use atelier_core::{
    AdjustmentVector, AspectRatio, Channel, Creation, EditorConfig, EditorSession, ElementRect,
    FilterChain, Gallery, MaskSurface, ModelTag, Point, Preset, RasterImage, ResampleFilter,
    Resolution,
};
use atelier_gallery::DirStore;
use clap::{Args, Parser, Subcommand, ValueEnum};
use log::{LevelFilter, info};
use serde::Deserialize;

/// Raster editing, mask painting, and gallery storage for atelier.
#[derive(Parser)]
#[command(name = "atelier", version)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Full editor config as a JSON string.
    ///
    /// Missing fields take their defaults. The JSON must be a valid
    /// `EditorConfig` serialization.
    #[arg(long, global = true)]
    config_json: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Resize and color-adjust an image.
    Edit(EditArgs),
    /// Rasterize strokes into an inpaint mask.
    Mask(MaskArgs),
    /// Manage a directory of saved creations.
    Gallery(GalleryArgs),
}

#[derive(Args)]
struct EditArgs {
    /// Input image (PNG, JPEG, BMP, WebP).
    input: PathBuf,

    /// Output path. The format follows the extension; unknown extensions
    /// keep the input format.
    #[arg(short, long)]
    output: PathBuf,

    /// Start from a named preset (vintage, black-and-white, cinematic,
    /// summer, cool).
    #[arg(long)]
    preset: Option<String>,

    /// Brightness percentage (0-200).
    #[arg(long)]
    brightness: Option<i64>,

    /// Contrast percentage (0-200).
    #[arg(long)]
    contrast: Option<i64>,

    /// Saturation percentage (0-200).
    #[arg(long)]
    saturate: Option<i64>,

    /// Sepia percentage (0-100).
    #[arg(long)]
    sepia: Option<i64>,

    /// Grayscale percentage (0-100).
    #[arg(long)]
    grayscale: Option<i64>,

    /// A CSS filter string to bake in instead of the adjustment flags,
    /// e.g. "contrast(120%) sepia(40%)".
    #[arg(long, conflicts_with_all = ["preset", "brightness", "contrast", "saturate", "sepia", "grayscale"])]
    filter: Option<FilterChain>,

    /// Exact target size as WIDTHxHEIGHT.
    #[arg(long, conflicts_with_all = ["width", "height", "resolution"])]
    resize: Option<String>,

    /// Target width; the height follows the aspect ratio unless given.
    #[arg(long)]
    width: Option<String>,

    /// Target height; the width follows the aspect ratio unless given.
    #[arg(long)]
    height: Option<String>,

    /// Resolution preset.
    #[arg(long, value_enum, conflicts_with_all = ["width", "height"])]
    resolution: Option<ResolutionArg>,

    /// Resampling filter; defaults to the config's.
    #[arg(long, value_enum)]
    resample: Option<Filter>,
}

#[derive(Args)]
struct MaskArgs {
    /// Image the mask is painted over; only its dimensions are used.
    input: PathBuf,

    /// JSON file of strokes: `[{"brush": 40, "element": {"left": 0,
    /// "top": 0, "width": 500, "height": 250}, "points": [[x, y], ...]}]`.
    /// `brush` and `element` are optional.
    #[arg(long)]
    strokes: PathBuf,

    /// Output PNG path.
    #[arg(short, long)]
    output: PathBuf,

    /// Brush diameter for strokes that do not set their own.
    #[arg(long)]
    brush: Option<f64>,
}

#[derive(Args)]
struct GalleryArgs {
    /// Directory holding the creations.
    #[arg(long)]
    dir: PathBuf,

    #[command(subcommand)]
    action: GalleryAction,
}

#[derive(Subcommand)]
enum GalleryAction {
    /// List creations, most recent first.
    List {
        /// Print JSON records instead of a table.
        #[arg(long)]
        json: bool,
    },
    /// Save an image as a new creation.
    Add {
        image: PathBuf,

        #[arg(long)]
        prompt: String,

        #[arg(long, value_enum, default_value_t = Model::Imagen)]
        model: Model,

        #[arg(long, value_enum)]
        aspect_ratio: Option<Aspect>,

        /// Style tag; repeat for several.
        #[arg(long = "style")]
        styles: Vec<String>,
    },
    /// Delete a creation by id.
    Delete { id: String },
}

/// Resampling filter selection.
#[derive(Clone, Copy, ValueEnum)]
enum Filter {
    /// Nearest-neighbor (blocky, keeps hard edges).
    Nearest,
    /// Bilinear.
    Triangle,
    /// Bicubic Catmull-Rom.
    CatmullRom,
    /// Gaussian (soft).
    Gaussian,
    /// Lanczos with 3 lobes (sharpest).
    Lanczos3,
}

impl From<Filter> for ResampleFilter {
    fn from(f: Filter) -> Self {
        match f {
            Filter::Nearest => Self::Nearest,
            Filter::Triangle => Self::Triangle,
            Filter::CatmullRom => Self::CatmullRom,
            Filter::Gaussian => Self::Gaussian,
            Filter::Lanczos3 => Self::Lanczos3,
        }
    }
}

/// Resolution preset selection.
#[derive(Clone, Copy, ValueEnum)]
enum ResolutionArg {
    /// 1280x720.
    #[value(name = "720p")]
    Hd720,
    /// 1920x1080.
    #[value(name = "1080p")]
    Hd1080,
    /// 3840x2160.
    #[value(name = "4k")]
    Uhd4k,
}

impl From<ResolutionArg> for Resolution {
    fn from(r: ResolutionArg) -> Self {
        match r {
            ResolutionArg::Hd720 => Self::Hd720,
            ResolutionArg::Hd1080 => Self::Hd1080,
            ResolutionArg::Uhd4k => Self::Uhd4k,
        }
    }
}

/// Generating model recorded with a creation.
#[derive(Clone, Copy, ValueEnum)]
enum Model {
    /// Text-to-image.
    Imagen,
    /// Image-to-image.
    GeminiFlash,
}

impl From<Model> for ModelTag {
    fn from(m: Model) -> Self {
        match m {
            Model::Imagen => Self::Imagen,
            Model::GeminiFlash => Self::GeminiFlash,
        }
    }
}

/// Aspect ratio recorded with a creation.
#[derive(Clone, Copy, ValueEnum)]
enum Aspect {
    #[value(name = "1:1")]
    Square,
    #[value(name = "16:9")]
    Landscape,
    #[value(name = "9:16")]
    Portrait,
    #[value(name = "4:3")]
    Standard,
    #[value(name = "3:4")]
    StandardPortrait,
}

impl From<Aspect> for AspectRatio {
    fn from(a: Aspect) -> Self {
        match a {
            Aspect::Square => Self::Square,
            Aspect::Landscape => Self::Landscape,
            Aspect::Portrait => Self::Portrait,
            Aspect::Standard => Self::Standard,
            Aspect::StandardPortrait => Self::StandardPortrait,
        }
    }
}

/// One recorded freehand stroke.
///
/// Points are screen coordinates over `element`, the image element's
/// rectangle at the time of the stroke. Without `element` the image is
/// taken to be displayed at native size, so points are image pixels.
#[derive(Deserialize)]
struct Stroke {
    #[serde(default)]
    brush: Option<f64>,
    #[serde(default)]
    element: Option<ElementRect>,
    points: Vec<(f64, f64)>,
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();
}

/// Build an [`EditorConfig`] from `--config-json`, or the defaults.
fn config_from_cli(cli: &Cli) -> Result<EditorConfig, String> {
    match cli.config_json {
        Some(ref json) => {
            EditorConfig::from_json(json).map_err(|e| format!("Error parsing --config-json: {e}"))
        }
        None => Ok(EditorConfig::default()),
    }
}

/// MIME type implied by a file extension.
fn mime_for_path(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    match ext.as_str() {
        "png" => Some("image/png"),
        "jpg" | "jpeg" => Some("image/jpeg"),
        "webp" => Some("image/webp"),
        "bmp" => Some("image/bmp"),
        _ => None,
    }
}

fn read_file(path: &Path) -> Result<Vec<u8>, String> {
    std::fs::read(path).map_err(|e| format!("Error reading {}: {e}", path.display()))
}

fn write_file(path: &Path, bytes: &[u8]) -> Result<(), String> {
    std::fs::write(path, bytes).map_err(|e| format!("Error writing {}: {e}", path.display()))?;
    eprintln!("Wrote {} ({} bytes)", path.display(), bytes.len());
    Ok(())
}

/// Split `WIDTHxHEIGHT` into its two fields.
fn split_size(text: &str) -> Result<(&str, &str), String> {
    text.split_once(['x', 'X'])
        .ok_or_else(|| format!("expected WIDTHxHEIGHT, got {text:?}"))
}

/// Adjustment vector from `--preset` plus any per-channel overrides.
fn adjustments_from_args(args: &EditArgs) -> Result<AdjustmentVector, String> {
    let mut vector = match args.preset {
        Some(ref name) => {
            Preset::find(name)
                .ok_or_else(|| format!("unknown preset {name:?}"))?
                .adjustments
        }
        None => AdjustmentVector::DEFAULT,
    };
    let overrides = [
        (Channel::Brightness, args.brightness),
        (Channel::Contrast, args.contrast),
        (Channel::Saturate, args.saturate),
        (Channel::Sepia, args.sepia),
        (Channel::Grayscale, args.grayscale),
    ];
    for (channel, value) in overrides {
        if let Some(v) = value {
            vector.set(channel, v);
        }
    }
    Ok(vector)
}

fn run_edit(args: &EditArgs, mut config: EditorConfig) -> Result<(), String> {
    if let Some(filter) = args.resample {
        config.resample_filter = filter.into();
    }
    let bytes = read_file(&args.input)?;
    let mime = mime_for_path(&args.input).unwrap_or_default();
    let mut session = EditorSession::new(config);
    session
        .load_image(bytes, mime)
        .map_err(|e| format!("Error loading {}: {e}", args.input.display()))?;

    let wants_resize = args.resize.is_some()
        || args.width.is_some()
        || args.height.is_some()
        || args.resolution.is_some();
    if let Some(ref size) = args.resize {
        let (w, h) = split_size(size)?;
        session.set_lock_aspect(false);
        session.set_resize_width(w);
        session.set_resize_height(h);
    } else if let Some(resolution) = args.resolution {
        session.set_resolution(resolution.into());
    } else {
        match (&args.width, &args.height) {
            (Some(w), Some(h)) => {
                session.set_lock_aspect(false);
                session.set_resize_width(w);
                session.set_resize_height(h);
            }
            (Some(w), None) => session.set_resize_width(w),
            (None, Some(h)) => session.set_resize_height(h),
            (None, None) => {}
        }
    }
    if wants_resize {
        session.apply_resize().map_err(|e| format!("Resize failed: {e}"))?;
    }

    if let Some(ref chain) = args.filter {
        bake_filter(&mut session, chain)?;
    } else {
        session.set_adjustments(adjustments_from_args(args)?);
        if session.is_editing() {
            info!("applying {}", session.filter_expression());
            session
                .apply_edits()
                .map_err(|e| format!("Applying adjustments failed: {e}"))?;
        }
    }

    let current = session
        .current()
        .ok_or_else(|| "no image loaded".to_owned())?;
    let out_mime = mime_for_path(&args.output).unwrap_or_else(|| current.mime());
    eprintln!(
        "Final size {}",
        current
            .dimensions()
            .map_or_else(|| "unknown".to_owned(), |d| d.to_string()),
    );
    if out_mime == current.mime() {
        return write_file(&args.output, current.bytes());
    }
    let pixels = compositor::read_rgba(current.bytes()).map_err(|e| e.to_string())?;
    let (encoded, written_mime) =
        compositor::encode(&pixels, out_mime).map_err(|e| format!("Encoding failed: {e}"))?;
    if written_mime != out_mime {
        eprintln!("Note: {out_mime} is not supported for output, wrote {written_mime}");
    }
    write_file(&args.output, &encoded)
}

/// Bake an arbitrary filter chain into the current image. The result is
/// loaded as a fresh image, so it cannot be undone.
fn bake_filter(session: &mut EditorSession, chain: &FilterChain) -> Result<(), String> {
    if chain.is_identity() {
        return Ok(());
    }
    let config = session.config().clone();
    let current = session
        .current()
        .ok_or_else(|| "no image loaded".to_owned())?
        .clone();
    let dims = match current.dimensions() {
        Some(d) => d,
        None => compositor::probe_dimensions(current.bytes()).map_err(|e| e.to_string())?,
    };
    info!("applying {chain}");
    let baked: RasterImage = compositor::rasterize(
        &current,
        dims,
        chain,
        config.resample_filter,
        config.max_surface_pixels,
    )
    .map_err(|e| format!("Applying filter failed: {e}"))?;
    session
        .load_raster(baked)
        .map_err(|e| format!("Applying filter failed: {e}"))?;
    Ok(())
}

fn run_mask(args: &MaskArgs, config: &EditorConfig) -> Result<(), String> {
    let image = read_file(&args.input)?;
    let dims = compositor::probe_dimensions(&image)
        .map_err(|e| format!("Error loading {}: {e}", args.input.display()))?;
    let strokes_json = std::fs::read_to_string(&args.strokes)
        .map_err(|e| format!("Error reading {}: {e}", args.strokes.display()))?;
    let strokes: Vec<Stroke> = serde_json::from_str(&strokes_json)
        .map_err(|e| format!("Error parsing {}: {e}", args.strokes.display()))?;

    let native = ElementRect::new(
        0.0,
        0.0,
        f64::from(dims.width),
        f64::from(dims.height),
    );
    let default_brush = args.brush.unwrap_or(config.brush_size);
    let mut mask = MaskSurface::new(dims).map_err(|e| e.to_string())?;
    for stroke in &strokes {
        let brush = stroke.brush.unwrap_or(default_brush);
        let rect = stroke.element.unwrap_or(native);
        let mut points = stroke.points.iter().map(|&(x, y)| Point::new(x, y));
        let Some(first) = points.next() else {
            continue;
        };
        mask.begin_stroke(first, &rect, brush);
        for p in points {
            mask.continue_stroke(p, &rect, brush);
        }
        mask.end_stroke();
    }
    info!(
        "{} stroke(s), {} pixel(s) painted",
        strokes.len(),
        mask.painted_pixels()
    );

    let png = mask.extract_final_mask().map_err(|e| e.to_string())?;
    write_file(&args.output, png.bytes())
}

fn run_gallery(args: &GalleryArgs) -> Result<(), String> {
    let store = DirStore::open(&args.dir)
        .map_err(|e| format!("Error opening {}: {e}", args.dir.display()))?;
    let (mut gallery, err) = Gallery::open(store);
    if let Some(e) = err {
        return Err(format!("Error reading gallery: {e}"));
    }

    match args.action {
        GalleryAction::List { json } => {
            if json {
                let records: Vec<_> = gallery.items().iter().map(Creation::record).collect();
                let text = serde_json::to_string_pretty(&records)
                    .map_err(|e| format!("Error serializing gallery: {e}"))?;
                println!("{text}");
            } else {
                for c in gallery.items() {
                    println!(
                        "{:<24} {:<12} {:<6} {}",
                        c.id,
                        c.model.to_string(),
                        c.aspect_ratio.map_or("-", AspectRatio::as_str),
                        c.prompt,
                    );
                }
            }
        }
        GalleryAction::Add {
            ref image,
            ref prompt,
            model,
            aspect_ratio,
            ref styles,
        } => {
            let bytes = read_file(image)?;
            let mime = mime_for_path(image)
                .or_else(|| compositor::sniff_mime(&bytes))
                .ok_or_else(|| format!("{} is not a recognized image", image.display()))?;
            let mut creation =
                Creation::new(RasterImage::new(bytes, mime), prompt.clone(), model.into())
                    .with_styles(styles.clone());
            if let Some(ratio) = aspect_ratio {
                creation = creation.with_aspect_ratio(ratio.into());
            }
            let id = creation.id.clone();
            gallery
                .add(creation)
                .map_err(|e| format!("Error saving creation: {e}"))?;
            println!("{id}");
        }
        GalleryAction::Delete { ref id } => {
            let removed = gallery
                .remove(id)
                .map_err(|e| format!("Error deleting {id}: {e}"))?;
            if !removed {
                return Err(format!("No creation with id {id:?}"));
            }
            eprintln!("Deleted {id} ({} left)", gallery.len());
        }
    }
    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = match config_from_cli(&cli) {
        Ok(c) => c,
        Err(msg) => {
            eprintln!("{msg}");
            return ExitCode::FAILURE;
        }
    };

    let result = match cli.command {
        Command::Edit(ref args) => run_edit(args, config),
        Command::Mask(ref args) => run_mask(args, &config),
        Command::Gallery(ref args) => run_gallery(args),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(msg) => {
            eprintln!("{msg}");
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::ffi::OsStr;

    #[test]
    fn cli_parses() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn mime_from_extension() {
        assert_eq!(mime_for_path(Path::new("a.JPG")), Some("image/jpeg"));
        assert_eq!(mime_for_path(Path::new("a.webp")), Some("image/webp"));
        assert_eq!(mime_for_path(Path::new("a.tiff")), None);
        assert_eq!(mime_for_path(Path::new("noext")), None);
    }

    #[test]
    fn size_splits() {
        assert_eq!(split_size("800x600").unwrap(), ("800", "600"));
        assert_eq!(split_size("800X600").unwrap(), ("800", "600"));
        assert!(split_size("800").is_err());
    }

    #[test]
    fn preset_with_override() {
        let cli = Cli::parse_from([
            "atelier",
            "edit",
            "in.png",
            "-o",
            "out.png",
            "--preset",
            "cool",
            "--sepia",
            "500",
        ]);
        let Command::Edit(args) = cli.command else {
            unreachable!()
        };
        let vector = adjustments_from_args(&args).unwrap();
        let cool = Preset::find("cool").unwrap().adjustments;
        assert_eq!(vector.get(Channel::Sepia), 100);
        assert_eq!(vector.get(Channel::Contrast), cool.get(Channel::Contrast));
    }

    #[test]
    fn value_enums_take_kebab_case() {
        let cli = Cli::parse_from([
            "atelier",
            "edit",
            "in.png",
            "-o",
            "out.png",
            "--resample",
            "catmull-rom",
            "--resolution",
            "1080p",
        ]);
        let Command::Edit(args) = cli.command else {
            unreachable!()
        };
        assert_eq!(
            ResampleFilter::from(args.resample.unwrap()),
            ResampleFilter::CatmullRom
        );
        assert_eq!(
            Resolution::from(args.resolution.unwrap()),
            Resolution::Hd1080
        );

        let cli = Cli::parse_from([
            "atelier",
            "gallery",
            "--dir",
            "out",
            "add",
            "a.png",
            "--prompt",
            "fox",
            "--model",
            "gemini-flash",
            "--aspect-ratio",
            "16:9",
        ]);
        let Command::Gallery(GalleryArgs {
            action: GalleryAction::Add {
                model,
                aspect_ratio,
                ..
            },
            ..
        }) = cli.command
        else {
            unreachable!()
        };
        assert_eq!(ModelTag::from(model), ModelTag::GeminiFlash);
        assert_eq!(
            aspect_ratio.map(AspectRatio::from),
            Some(AspectRatio::Landscape)
        );
    }

    #[test]
    fn unchanged_format_is_written_verbatim() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in.jpg");
        let output = dir.path().join("out.jpeg");
        let pixels = image::RgbaImage::from_pixel(12, 8, image::Rgba([200, 90, 30, 255]));
        let source = compositor::to_raster(&pixels, "image/jpeg").unwrap();
        std::fs::write(&input, source.bytes()).unwrap();

        let cli = Cli::parse_from([
            OsStr::new("atelier"),
            OsStr::new("edit"),
            input.as_os_str(),
            OsStr::new("-o"),
            output.as_os_str(),
        ]);
        let Command::Edit(args) = cli.command else {
            unreachable!()
        };
        run_edit(&args, EditorConfig::default()).unwrap();
        assert_eq!(std::fs::read(&output).unwrap(), source.bytes());
    }

    #[test]
    fn filter_conflicts_with_adjustments() {
        let parsed = Cli::try_parse_from([
            "atelier",
            "edit",
            "in.png",
            "-o",
            "out.png",
            "--filter",
            "sepia(50%)",
            "--brightness",
            "120",
        ]);
        assert!(parsed.is_err());
    }

    #[test]
    fn strokes_json_shape() {
        let strokes: Vec<Stroke> =
            serde_json::from_str(
                r#"[
                    {"points": [[1, 2], [3.5, 4]]},
                    {"brush": 8, "element": {"left": 10, "top": 0, "width": 50, "height": 25}, "points": []}
                ]"#,
            )
            .unwrap();
        assert_eq!(strokes.len(), 2);
        assert_eq!(strokes[0].brush, None);
        assert!(strokes[0].element.is_none());
        assert_eq!(strokes[0].points[1], (3.5, 4.0));
        assert_eq!(strokes[1].brush, Some(8.0));
        assert_eq!(
            strokes[1].element,
            Some(ElementRect::new(10.0, 0.0, 50.0, 25.0))
        );
    }
}
