use std::path::PathBuf;

use anyhow::Context as _;
use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "realtime-blur", version)]
struct Cli {
    /// Log pipeline decisions at debug level.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Render a scene with its blur panes as a PNG.
    Frame(FrameArgs),
    /// Report which blur backend this process would use.
    Probe(ProbeArgs),
}

#[derive(Parser, Debug)]
struct FrameArgs {
    /// Input scene JSON.
    #[arg(long)]
    scene: PathBuf,

    /// Output PNG path.
    #[arg(long)]
    out: PathBuf,

    /// Number of frames to run; the last one is written.
    #[arg(long, default_value_t = 1)]
    frames: u32,
}

#[derive(Parser, Debug)]
struct ProbeArgs {
    /// Host platform version to probe for.
    #[arg(long, default_value_t = 34)]
    platform_version: u32,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    tracing_subscriber::fmt()
        .with_max_level(if cli.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::WARN
        })
        .with_writer(std::io::stderr)
        .init();

    match cli.cmd {
        Command::Frame(args) => cmd_frame(args),
        Command::Probe(args) => cmd_probe(args),
    }
}

fn cmd_frame(args: FrameArgs) -> anyhow::Result<()> {
    anyhow::ensure!(args.frames > 0, "--frames must be at least 1");
    let doc = realtime_blur::SceneDoc::from_path(&args.scene)
        .with_context(|| format!("load scene '{}'", args.scene.display()))?;
    let mut stage = realtime_blur::Stage::from_doc(&doc, realtime_blur::BlurRuntime::global())?;

    let mut frame = stage.render_frame()?;
    for _ in 1..args.frames {
        frame = stage.render_frame()?;
    }
    for (i, pane) in stage.panes().iter().enumerate() {
        let stats = pane.view.pipeline().stats();
        tracing::info!(
            pane = i,
            backend = ?pane.view.pipeline().backend_kind(),
            blurs = stats.blurs,
            degraded = stats.degraded_frames,
            "pane finished"
        );
    }
    stage.detach_all();

    if let Some(parent) = args.out.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create output dir '{}'", parent.display()))?;
    }
    frame
        .to_rgba_image()
        .save_with_format(&args.out, image::ImageFormat::Png)
        .with_context(|| format!("write png '{}'", args.out.display()))?;

    eprintln!("wrote {}", args.out.display());
    Ok(())
}

fn cmd_probe(args: ProbeArgs) -> anyhow::Result<()> {
    let host = realtime_blur::HostContext {
        platform_version: args.platform_version,
        ..realtime_blur::HostContext::default()
    };
    let runtime = realtime_blur::BlurRuntime::new();
    let chosen = runtime.probe().select(&host).kind();
    println!("{chosen}");
    Ok(())
}
