use std::path::{Path, PathBuf};
use std::sync::{Arc, mpsc};

use anyhow::Context as _;
use clap::{Parser, Subcommand, ValueEnum};
use semantic_image::foundation::core::Point;
use semantic_image::{
    DetectorBackend, EditorConfig, FixedDetector, Image, NormalizedQuad, SemanticImage,
    SemanticResult, TranscodeOutput,
};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "semantic-image", version)]
struct Cli {
    /// Editor configuration JSON.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Background key colour as `r,g,b` (overrides the config).
    #[arg(long, global = true, value_parser = parse_rgb)]
    key: Option<[u8; 3]>,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Write the subject mask as a grayscale PNG.
    Mask(InOut),
    /// Composite the subject over a new background.
    Swap(SwapArgs),
    /// Blur everything behind the subject.
    Blur(BlurArgs),
    /// Crop detected regions into a directory.
    Extract(ExtractArgs),
    /// Perspective-correct a document given its four normalized corners.
    Document(DocumentArgs),
    /// Print video track metadata as JSON (requires `ffprobe` on PATH).
    Probe(ProbeArgs),
    /// Replace the background of every frame of a video (requires `ffmpeg` on PATH).
    SwapVideo(SwapVideoArgs),
    /// Convert every frame of a video to grayscale (requires `ffmpeg` on PATH).
    GrayVideo(GrayVideoArgs),
}

#[derive(Parser, Debug)]
struct InOut {
    /// Input image.
    #[arg(long = "in")]
    in_path: PathBuf,

    /// Output image.
    #[arg(long)]
    out: PathBuf,
}

#[derive(Parser, Debug)]
struct SwapArgs {
    #[command(flatten)]
    io: InOut,

    /// Replacement background image.
    #[arg(long)]
    background: PathBuf,
}

#[derive(Parser, Debug)]
struct BlurArgs {
    #[command(flatten)]
    io: InOut,

    /// Gaussian sigma in pixels (defaults to the configured intensity).
    #[arg(long)]
    intensity: Option<f32>,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum KindChoice {
    Face,
    Human,
    Animal,
}

#[derive(Parser, Debug)]
struct ExtractArgs {
    /// Input image.
    #[arg(long = "in")]
    in_path: PathBuf,

    /// Region kind.
    #[arg(long, value_enum, default_value_t = KindChoice::Face)]
    kind: KindChoice,

    /// Directory receiving `region-<n>.png` files.
    #[arg(long)]
    out_dir: PathBuf,
}

#[derive(Parser, Debug)]
struct DocumentArgs {
    #[command(flatten)]
    io: InOut,

    /// Corners `tlx,tly,trx,try,brx,bry,blx,bly` in [0, 1], top-left origin. When omitted the
    /// keyed subject's bounding box is used.
    #[arg(long, value_parser = parse_quad)]
    corners: Option<NormalizedQuad>,
}

#[derive(Parser, Debug)]
struct ProbeArgs {
    /// Input video.
    #[arg(long = "in")]
    in_path: PathBuf,
}

#[derive(Parser, Debug)]
struct SwapVideoArgs {
    /// Input video.
    #[arg(long = "in")]
    in_path: PathBuf,

    /// Replacement background image.
    #[arg(long)]
    background: PathBuf,

    /// Output directory (defaults to the configured one).
    #[arg(long)]
    out_dir: Option<PathBuf>,
}

#[derive(Parser, Debug)]
struct GrayVideoArgs {
    /// Input video.
    #[arg(long = "in")]
    in_path: PathBuf,

    /// Output directory (defaults to the configured one).
    #[arg(long)]
    out_dir: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let mut config = match &cli.config {
        Some(path) => EditorConfig::from_json_path(path)?,
        None => EditorConfig::default(),
    };
    if let Some(key) = cli.key {
        config.chroma_key.key = key;
    }

    match cli.cmd {
        Command::Mask(args) => cmd_mask(&config, args),
        Command::Swap(args) => cmd_swap(&config, args),
        Command::Blur(args) => cmd_blur(&config, args),
        Command::Extract(args) => cmd_extract(&config, args),
        Command::Document(args) => cmd_document(&config, args),
        Command::Probe(args) => cmd_probe(args),
        Command::SwapVideo(args) => cmd_swap_video(config, args),
        Command::GrayVideo(args) => cmd_gray_video(config, args),
    }
}

fn chroma_editor(config: &EditorConfig) -> anyhow::Result<SemanticImage> {
    Ok(SemanticImage::from_backend(
        DetectorBackend::ChromaKey(config.chroma_key.clone()),
        config.clone(),
    )?)
}

fn open(path: &Path) -> anyhow::Result<Image> {
    Image::open(path).with_context(|| format!("open image '{}'", path.display()))
}

fn save(image: &Image, path: &Path) -> anyhow::Result<()> {
    image
        .save(path)
        .with_context(|| format!("write image '{}'", path.display()))
}

fn cmd_mask(config: &EditorConfig, args: InOut) -> anyhow::Result<()> {
    let editor = chroma_editor(config)?;
    let mask = editor
        .person_mask_image(&open(&args.in_path)?)
        .context("no subject found")?;
    save(&mask, &args.out)
}

fn cmd_swap(config: &EditorConfig, args: SwapArgs) -> anyhow::Result<()> {
    let editor = chroma_editor(config)?;
    let out = editor
        .swap_background(&open(&args.io.in_path)?, &open(&args.background)?)
        .context("no subject found")?;
    save(&out, &args.io.out)
}

fn cmd_blur(config: &EditorConfig, args: BlurArgs) -> anyhow::Result<()> {
    let editor = chroma_editor(config)?;
    let intensity = args.intensity.unwrap_or(config.default_blur_intensity);
    let out = editor
        .blur_subject(&open(&args.io.in_path)?, intensity)
        .context("no subject found")?;
    save(&out, &args.io.out)
}

fn cmd_extract(config: &EditorConfig, args: ExtractArgs) -> anyhow::Result<()> {
    let editor = chroma_editor(config)?;
    let image = open(&args.in_path)?;
    let regions = match args.kind {
        KindChoice::Face => editor.extract_faces(&image),
        KindChoice::Human => editor.extract_human_regions(&image),
        KindChoice::Animal => editor.extract_animal_regions(&image),
    };
    for (i, region) in regions.iter().enumerate() {
        save(region, &args.out_dir.join(format!("region-{i}.png")))?;
    }
    println!("{}", regions.len());
    Ok(())
}

fn cmd_document(config: &EditorConfig, args: DocumentArgs) -> anyhow::Result<()> {
    let editor = match args.corners {
        Some(quad) => SemanticImage::with_config(
            Arc::new(FixedDetector::new().with_document(quad)),
            config.clone(),
        )?,
        None => chroma_editor(config)?,
    };
    let out = editor
        .extract_document_region(&open(&args.io.in_path)?)
        .context("no document found")?;
    save(&out, &args.io.out)
}

fn cmd_probe(args: ProbeArgs) -> anyhow::Result<()> {
    let info = semantic_image::media::probe_video(&args.in_path)?;
    println!("{}", serde_json::to_string_pretty(&info)?);
    Ok(())
}

fn cmd_swap_video(mut config: EditorConfig, args: SwapVideoArgs) -> anyhow::Result<()> {
    if args.out_dir.is_some() {
        config.output_dir = args.out_dir;
    }
    let editor = chroma_editor(&config)?;
    let background = open(&args.background)?;
    let (tx, rx) = mpsc::channel();
    editor
        .swap_background_in_video(&args.in_path, &background, move |r| {
            let _ = tx.send(r);
        })
        .wait();
    report_video(rx)
}

fn cmd_gray_video(mut config: EditorConfig, args: GrayVideoArgs) -> anyhow::Result<()> {
    if args.out_dir.is_some() {
        config.output_dir = args.out_dir;
    }
    let editor = SemanticImage::with_config(Arc::new(FixedDetector::new()), config)?;
    let (tx, rx) = mpsc::channel();
    editor
        .apply_filter_to_video(
            &args.in_path,
            |img: Image| {
                let gray = image::DynamicImage::ImageRgba8(img.into_pixels()).grayscale();
                Some(Image::new(gray.into_rgba8()))
            },
            move |r| {
                let _ = tx.send(r);
            },
        )
        .wait();
    report_video(rx)
}

fn report_video(
    rx: mpsc::Receiver<SemanticResult<TranscodeOutput>>,
) -> anyhow::Result<()> {
    let out = rx.recv().context("transcode did not report")??;
    let report = out.report;
    tracing::info!(
        frames_written = report.frames_written,
        frames_dropped = report.frames_dropped,
        audio_blocks = report.audio_blocks,
        "done"
    );
    if let Some(path) = out.output.path() {
        println!("{}", path.display());
    }
    Ok(())
}

fn parse_rgb(s: &str) -> Result<[u8; 3], String> {
    let parts: Vec<u8> = s
        .split(',')
        .map(|p| p.trim().parse::<u8>().map_err(|e| format!("bad channel '{p}': {e}")))
        .collect::<Result<_, _>>()?;
    parts
        .try_into()
        .map_err(|_| "expected three comma-separated channels".to_owned())
}

fn parse_quad(s: &str) -> Result<NormalizedQuad, String> {
    let v: Vec<f64> = s
        .split(',')
        .map(|p| p.trim().parse::<f64>().map_err(|e| format!("bad coordinate '{p}': {e}")))
        .collect::<Result<_, _>>()?;
    let [a, b, c, d, e, f, g, h]: [f64; 8] = v
        .try_into()
        .map_err(|_| "expected eight comma-separated coordinates".to_owned())?;
    Ok(NormalizedQuad {
        top_left: Point::new(a, b),
        top_right: Point::new(c, d),
        bottom_right: Point::new(e, f),
        bottom_left: Point::new(g, h),
    })
}
