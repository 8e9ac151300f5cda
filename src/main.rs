use std::path::PathBuf;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};

use sketch_export::delivery::DirectorySink;
use sketch_export::rendering::contain_fit;
use sketch_export::surface::{DrawingSurface, InMemorySurface, Stroke};
use sketch_export::{background, logger, DisplayDimensions, ExportConfig, SketchState};

#[derive(Parser)]
#[command(name = "sketch-export", version, about = "Flatten a sketch and its background into a PNG")]
struct Cli {
    /// More log output (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Only log errors
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Composite strokes over a background and write the PNG
    Export(ExportArgs),
    /// Print where a background of the given size lands inside a box
    Placement {
        #[arg(long)]
        image_width: u32,
        #[arg(long)]
        image_height: u32,
        #[arg(long)]
        width: u32,
        #[arg(long)]
        height: u32,
    },
}

#[derive(Args)]
struct ExportArgs {
    /// On-screen width of the drawing surface
    #[arg(long)]
    width: u32,
    /// On-screen height of the drawing surface
    #[arg(long)]
    height: u32,
    /// Internal stroke resolution width (defaults to --width)
    #[arg(long)]
    surface_width: Option<u32>,
    /// Internal stroke resolution height (defaults to --height)
    #[arg(long)]
    surface_height: Option<u32>,
    /// Background image file
    #[arg(long)]
    background: Option<PathBuf>,
    /// JSON array of strokes: [{"color": "#000000", "size": 4, "points": [[x, y], ...]}]
    #[arg(long)]
    strokes: Option<PathBuf>,
    /// JSON config file
    #[arg(long)]
    config: Option<PathBuf>,
    /// Output directory (overrides the config)
    #[arg(long)]
    out_dir: Option<PathBuf>,
    /// Application tag in the file name (overrides the config)
    #[arg(long)]
    tag: Option<String>,
}

async fn run_export(args: ExportArgs) -> anyhow::Result<()> {
    let mut config = match &args.config {
        Some(path) => ExportConfig::from_json_file(path)?,
        None => ExportConfig::default(),
    };
    if let Some(dir) = args.out_dir {
        config.output_dir = dir;
    }
    if let Some(tag) = args.tag {
        config.app_tag = tag;
    }

    let resolution = (
        args.surface_width.unwrap_or(args.width),
        args.surface_height.unwrap_or(args.height),
    );
    let surface = InMemorySurface::with_resolution((args.width, args.height), resolution);

    if let Some(path) = &args.strokes {
        let text = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
        let strokes: Vec<Stroke> =
            serde_json::from_str(&text).with_context(|| format!("parsing strokes in {}", path.display()))?;
        for s in strokes {
            surface.draw_stroke(s);
        }
    }

    let mut state = SketchState::default();
    if let Some(path) = &args.background {
        state.background = Some(background::load_file(path).await?);
    }

    let sink = DirectorySink::new(&config.output_dir);
    let exporter = sketch_export::new_exporter(config)?;
    let report = exporter.download(&surface, &surface, &state, &sink).await?;

    let path = report.delivered.path.clone().unwrap_or_else(|| PathBuf::from(&report.delivered.filename));
    println!("{}", path.display());
    println!("sha256 {}", report.image.sha256_hex());
    Ok(())
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let _ = logger::init(logger::level_from_verbosity(cli.verbose, cli.quiet));

    let res = match cli.command {
        Command::Export(args) => run_export(args).await,
        Command::Placement {
            image_width,
            image_height,
            width,
            height,
        } => DisplayDimensions::new(width, height)
            .map_err(anyhow::Error::from)
            .and_then(|dims| {
                let r = contain_fit(image_width, image_height, dims)
                    .context("image has zero width or height")?;
                println!("x={} y={} width={} height={}", r.x, r.y, r.width, r.height);
                Ok(())
            }),
    };

    if let Err(e) = res {
        eprintln!("sketch-export: {:#}", e);
        std::process::exit(1);
    }
}
