use std::path::{Path, PathBuf};

use anyhow::Context as _;
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use cppnviz::render::batch::resolve_batch_size;
use cppnviz::{
    Architecture, AudioTrack, CheckpointInfo, DeviceRequest, FanoutSink, FfmpegSink,
    FfmpegSinkOpts, FieldOptions, FrameSink, MemoryEstimate, Normalization, PatternField,
    PngSequenceSink, Precision, RenderConfig, RenderSession, WeightStore, resolution_preset,
};

#[derive(Parser, Debug)]
#[command(name = "cppnviz", version, about = "Audio-reactive CPPN video renderer")]
struct Cli {
    /// Verbose logging (debug level).
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Render an MP4 video (requires `ffmpeg` on PATH).
    Render(RenderArgs),
    /// Render a single frame as a PNG.
    Frame(FrameArgs),
    /// Print the memory estimate for a configuration without rendering.
    Estimate(EstimateArgs),
    /// Save a randomly initialized weight snapshot.
    InitWeights(InitWeightsArgs),
    /// Print parameter counts over a layers x hidden-dim grid.
    Architectures(ArchitecturesArgs),
}

#[derive(Args, Debug)]
struct SettingsArgs {
    /// JSON render config; flags below override its values.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Resolution preset (360p, 480p, 720p, 1080p, 1440p, 4k).
    #[arg(short, long)]
    resolution: Option<String>,
    /// Frames per second.
    #[arg(short, long)]
    fps: Option<u32>,
    /// Hidden layer count.
    #[arg(short, long)]
    layers: Option<usize>,
    /// Hidden layer width.
    #[arg(short = 'd', long)]
    hidden_dim: Option<usize>,
    /// Evolution mutation rate (0 disables).
    #[arg(short, long)]
    evolve: Option<f32>,
    /// Scale applied to normalized audio features.
    #[arg(short, long)]
    audio_scale: Option<f32>,
    /// Feature normalization: none, minmax, zscore.
    #[arg(long)]
    normalize: Option<Normalization>,
    /// Pixels per batch (auto when omitted).
    #[arg(short, long)]
    batch_size: Option<usize>,
    /// Device: auto, cpu, gpu, gpu-strict.
    #[arg(long)]
    device: Option<DeviceRequest>,
    /// Precision: full or reduced.
    #[arg(long)]
    precision: Option<Precision>,
    /// RNG seed for initialization and evolution.
    #[arg(long)]
    seed: Option<u64>,
}

impl SettingsArgs {
    fn resolve(&self) -> anyhow::Result<RenderConfig> {
        let mut cfg = match self.config.as_deref() {
            Some(path) => RenderConfig::from_path(path)?,
            None => RenderConfig::default(),
        };
        if let Some(name) = self.resolution.as_deref() {
            let res = resolution_preset(name)?;
            cfg.width = res.width;
            cfg.height = res.height;
        }
        if let Some(v) = self.fps {
            cfg.fps = v;
        }
        if let Some(v) = self.layers {
            cfg.layers = v;
        }
        if let Some(v) = self.hidden_dim {
            cfg.hidden_dim = v;
        }
        if let Some(v) = self.evolve {
            cfg.evolve_rate = v;
        }
        if let Some(v) = self.audio_scale {
            cfg.audio_scale = v;
        }
        if let Some(v) = self.normalize {
            cfg.normalization = v;
        }
        if self.batch_size.is_some() {
            cfg.batch_size = self.batch_size;
        }
        if let Some(v) = self.device {
            cfg.device = v;
        }
        if let Some(v) = self.precision {
            cfg.precision = v;
        }
        if self.seed.is_some() {
            cfg.seed = self.seed;
        }
        cfg.validate()?;
        Ok(cfg)
    }
}

#[derive(Args, Debug)]
struct InputArgs {
    /// Per-frame audio feature JSON (`features`, `duration`, `fps`, `num_frames`).
    #[arg(long)]
    features: PathBuf,
    /// Weight snapshot to load instead of random initialization.
    #[arg(long)]
    load_weights: Option<PathBuf>,
    #[command(flatten)]
    settings: SettingsArgs,
}

impl InputArgs {
    fn session(&self) -> anyhow::Result<RenderSession> {
        let cfg = self.settings.resolve()?;
        let track = AudioTrack::from_path(&self.features)?;
        let weights = match self.load_weights.as_deref() {
            Some(path) => {
                tracing::info!(path = %path.display(), "loading weights");
                Some(WeightStore::load(path)?)
            }
            None => None,
        };
        Ok(RenderSession::new(cfg, track, weights)?)
    }
}

#[derive(Args, Debug)]
struct RenderArgs {
    #[command(flatten)]
    input: InputArgs,
    /// Output MP4 path.
    #[arg(long)]
    out: PathBuf,
    /// Audio file to mux into the video.
    #[arg(long)]
    audio: Option<PathBuf>,
    /// Also export every frame as PNG.
    #[arg(long, default_value_t = false)]
    export_frames: bool,
    /// PNG export directory (defaults to `<out>_frames`).
    #[arg(long)]
    frames_dir: Option<PathBuf>,
    /// Save the final (possibly evolved) weights here.
    #[arg(long)]
    save_weights: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct FrameArgs {
    #[command(flatten)]
    input: InputArgs,
    /// Frame index (0-based).
    #[arg(long)]
    index: usize,
    /// Output PNG path.
    #[arg(long)]
    out: PathBuf,
}

#[derive(Args, Debug)]
struct EstimateArgs {
    /// Audio features per frame.
    #[arg(long, default_value_t = 9)]
    feature_width: usize,
    #[command(flatten)]
    settings: SettingsArgs,
}

#[derive(Args, Debug)]
struct InitWeightsArgs {
    /// Output snapshot path.
    #[arg(long)]
    out: PathBuf,
    /// Network input width (3 + audio features).
    #[arg(long, default_value_t = 12)]
    input_dim: usize,
    /// Hidden layer width.
    #[arg(long, default_value_t = 256)]
    hidden_dim: usize,
    /// Hidden layer count.
    #[arg(long, default_value_t = 4)]
    layers: usize,
    /// RNG seed.
    #[arg(long)]
    seed: Option<u64>,
}

#[derive(Args, Debug)]
struct ArchitecturesArgs {
    /// Network input width.
    #[arg(long, default_value_t = 12)]
    input_dim: usize,
    /// Layer counts to list.
    #[arg(long, value_delimiter = ',', default_value = "2,3")]
    layers: Vec<usize>,
    /// Hidden widths to list.
    #[arg(long, value_delimiter = ',', default_value = "4,6,8")]
    hidden: Vec<usize>,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    match cli.cmd {
        Command::Render(args) => cmd_render(args),
        Command::Frame(args) => cmd_frame(args),
        Command::Estimate(args) => cmd_estimate(args),
        Command::InitWeights(args) => cmd_init_weights(args),
        Command::Architectures(args) => cmd_architectures(args),
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn cmd_render(args: RenderArgs) -> anyhow::Result<()> {
    let mut session = args.input.session()?;
    let est = session.estimate_memory();
    tracing::info!(
        batch_mib = est.batch_mib,
        model_mib = est.model_mib,
        total_per_frame_mib = est.total_per_frame_mib,
        "memory estimate"
    );

    let video: Box<dyn FrameSink> = Box::new(FfmpegSink::new(FfmpegSinkOpts::new(&args.out)));
    let mut sink: Box<dyn FrameSink> = if args.export_frames {
        let dir = args
            .frames_dir
            .clone()
            .unwrap_or_else(|| default_frames_dir(&args.out));
        Box::new(FanoutSink::new(vec![
            Box::new(PngSequenceSink::new(dir)),
            video,
        ]))
    } else {
        video
    };

    let summary = session
        .render_to_sink(sink.as_mut(), args.audio.clone())
        .with_context(|| format!("render '{}'", args.out.display()))?;
    eprintln!(
        "wrote {} ({} frames, {} mutations)",
        args.out.display(),
        summary.stats.frames_rendered,
        summary.stats.mutations_applied
    );

    if let Some(path) = args.save_weights.as_deref() {
        let field = session.into_field();
        WeightStore::save(&field, &CheckpointInfo::default(), path)?;
        eprintln!("wrote {}", path.display());
    }
    Ok(())
}

fn cmd_frame(args: FrameArgs) -> anyhow::Result<()> {
    let mut session = args.input.session()?;
    let frame = session.render_frame(args.index)?;
    frame
        .save_png(&args.out)
        .with_context(|| format!("write png '{}'", args.out.display()))?;
    eprintln!("wrote {}", args.out.display());
    Ok(())
}

fn cmd_estimate(args: EstimateArgs) -> anyhow::Result<()> {
    let cfg = args.settings.resolve()?;
    let arch = cfg.architecture(args.feature_width)?;
    let field = PatternField::new(arch, &cfg.field_options())?;
    let res = cfg.resolution()?;
    let pixels = res.pixel_count();
    let batch_rows = resolve_batch_size(field.device(), &arch, cfg.batch_size, pixels)?;
    let est = MemoryEstimate::compute(&arch, field.precision(), batch_rows, pixels);

    let report = serde_json::json!({
        "resolution": res.to_string(),
        "device": field.device().label(),
        "precision": field.precision(),
        "parameters": arch.parameter_count(),
        "batches_per_frame": pixels.div_ceil(batch_rows),
        "memory": est,
    });
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn cmd_init_weights(args: InitWeightsArgs) -> anyhow::Result<()> {
    let arch = Architecture::new(args.input_dim, args.hidden_dim, args.layers)?;
    let opts = FieldOptions {
        device: DeviceRequest::Cpu,
        seed: args.seed,
        ..FieldOptions::default()
    };
    let field = PatternField::new(arch, &opts)?;
    WeightStore::save(&field, &CheckpointInfo::default(), &args.out)?;
    eprintln!(
        "wrote {} ({} parameters)",
        args.out.display(),
        field.count_parameters()
    );
    Ok(())
}

fn cmd_architectures(args: ArchitecturesArgs) -> anyhow::Result<()> {
    println!("{:>6} {:>6} {:>10}", "layers", "hidden", "parameters");
    for &layers in &args.layers {
        for &hidden in &args.hidden {
            let arch = Architecture::new(args.input_dim, hidden, layers)?;
            println!("{layers:>6} {hidden:>6} {:>10}", arch.parameter_count());
        }
    }
    Ok(())
}

fn default_frames_dir(out: &Path) -> PathBuf {
    let stem = out
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".to_string());
    out.with_file_name(format!("{stem}_frames"))
}
