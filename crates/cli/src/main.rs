use anyhow::{anyhow, Context};
use config::{Config, File};
use log::{info, warn, LevelFilter};
use mirrorboard::{
    board::mirror::MirrorRegion,
    puzzle::player::PlayerStep,
    timed, Board, Category, Puzzle, PuzzleConfig,
};
use serde::Serialize;
use simple_logger::SimpleLogger;
use std::{
    io::{self, Write},
    path::{Path, PathBuf},
    process,
};
use structopt::StructOpt;
use strum::{Display, EnumString};

/// CLI for loading mirror puzzle boards, inspecting their walk graphs, and
/// walking the player through them.
#[derive(Debug, StructOpt)]
#[structopt(name = "mirrorboard")]
struct Opt {
    /// Path to a config file that defines the puzzle. Supported formats:
    /// JSON, TOML
    #[structopt(short, long)]
    config: PathBuf,

    /// The format to print the board in. Supported formats:
    ///
    /// text - One line per block, plus the player's steps
    ///
    /// json - The same report as text, as JSON
    ///
    /// cfg - The full config object used for the puzzle, in TOML format,
    ///   including every default that was filled in
    #[structopt(short = "f", long, default_value = "text")]
    format: OutputFormat,

    /// Drag the mirror by this many steps before doing anything else.
    /// Positive drags go towards +X. The mirror is snapped into place after.
    #[structopt(long, allow_hyphen_values = true)]
    drag_mirror: Option<i32>,

    /// Walk the player through all of its goals, and include every step in
    /// the output
    #[structopt(short, long)]
    walk: bool,

    /// The logging level to use. See
    /// https://docs.rs/log/0.4.11/log/enum.LevelFilter.html for options
    #[structopt(long, default_value = "warn")]
    log_level: LevelFilter,
}

/// Different output formats.
#[derive(Copy, Clone, Debug, Display, EnumString)]
#[strum(serialize_all = "snake_case")]
enum OutputFormat {
    // If you change this, make sure to update the help text for `--format`!
    /// Human-readable report
    Text,
    /// Machine-readable report
    Json,
    /// The puzzle's full config
    Cfg,
}

/// Everything worth knowing about one block after a rebuild
#[derive(Debug, Serialize)]
struct BlockReport<'a> {
    id: usize,
    name: &'a str,
    category: Category,
    cell: String,
    shapes: String,
    walkable: bool,
    neighbors: Vec<&'a str>,
}

/// The whole board after loading (and walking, if requested)
#[derive(Debug, Serialize)]
struct Report<'a> {
    edges: usize,
    mirror: Option<MirrorRegion>,
    blocks: Vec<BlockReport<'a>>,
    steps: Vec<String>,
}

impl<'a> Report<'a> {
    fn new(board: &'a Board, steps: &[PlayerStep]) -> anyhow::Result<Self> {
        let graph = board.graph();
        let name = |id| {
            board
                .block(id)
                .map(|block| block.name())
                .ok_or_else(|| anyhow!("unknown block {}", id))
        };

        let blocks = board
            .blocks()
            .iter()
            .map(|block| {
                let projected = graph.block(block.id());
                Ok(BlockReport {
                    id: block.id().index(),
                    name: block.name(),
                    category: block.category(),
                    cell: projected
                        .map(|p| p.cell.to_string())
                        .unwrap_or_default(),
                    shapes: projected
                        .map(|p| p.shapes.to_string())
                        .unwrap_or_default(),
                    walkable: graph.is_walkable(block.id()),
                    neighbors: graph
                        .neighbors(block.id())
                        .iter()
                        .map(|&id| name(id))
                        .collect::<anyhow::Result<_>>()?,
                })
            })
            .collect::<anyhow::Result<_>>()?;

        let steps = steps
            .iter()
            .map(|step| {
                Ok(match *step {
                    PlayerStep::Idle => "idle".into(),
                    PlayerStep::Moved { from, to } => {
                        format!("{} -> {}", name(from)?, name(to)?)
                    }
                    PlayerStep::Arrived { from, goal } => {
                        format!("{} -> {} (goal)", name(from)?, name(goal)?)
                    }
                })
            })
            .collect::<anyhow::Result<_>>()?;

        Ok(Self {
            edges: graph.edge_count(),
            mirror: board.mirror_region().copied(),
            blocks,
            steps,
        })
    }

    fn write_text(&self, out: &mut impl Write) -> io::Result<()> {
        match &self.mirror {
            Some(region) => writeln!(
                out,
                "mirror: v_max={} h_max={}",
                region.line_v_max(),
                region.line_h_max()
            )?,
            None => writeln!(out, "mirror: none")?,
        }
        writeln!(out, "edges: {}", self.edges)?;
        for block in &self.blocks {
            writeln!(
                out,
                "{:>4} {:<16} {:<14} {:<10} {:<24} {}",
                block.id,
                block.name,
                block.category.to_string(),
                block.cell,
                block.shapes,
                block.neighbors.join(", ")
            )?;
        }
        for step in &self.steps {
            writeln!(out, "step: {}", step)?;
        }
        Ok(())
    }
}

fn load_config(config_path: &Path) -> anyhow::Result<PuzzleConfig> {
    let mut settings = Config::new();
    let config_path = config_path.to_str().ok_or_else(|| {
        anyhow!("invalid character in path {:?}", config_path)
    })?;
    settings
        .merge(File::with_name(config_path))
        .context("error reading config file")?;
    settings.try_into().context("error reading config")
}

/// Slide the mirror a number of steps, then let it snap into place
fn drag_mirror(puzzle: &mut Puzzle, steps: i32) -> anyhow::Result<()> {
    if !puzzle.begin_mirror_drag() {
        info!("Mirror can't be dragged, skipping");
        return Ok(());
    }
    for _ in 0..steps.unsigned_abs() {
        puzzle.drag_mirror(f64::from(steps.signum()));
    }
    puzzle.end_mirror_drag()
}

/// Run the CLI with some options
fn run(opt: Opt) -> anyhow::Result<()> {
    SimpleLogger::new().with_level(opt.log_level).init()?;

    let config = load_config(&opt.config)?;
    let stdout = io::stdout();
    let mut out = stdout.lock();

    if let OutputFormat::Cfg = opt.format {
        // Going through a Value sorts plain values ahead of tables
        let value = toml::Value::try_from(&config)
            .context("error serializing config")?;
        let cfg = toml::to_string_pretty(&value)
            .context("error serializing config")?;
        out.write_all(cfg.as_bytes())?;
        return Ok(());
    }

    let mut puzzle = timed!(
        "Loading puzzle",
        log::Level::Info,
        Puzzle::new(config)
    )?;
    if let Some(steps) = opt.drag_mirror {
        drag_mirror(&mut puzzle, steps)?;
    }
    let steps = if opt.walk { puzzle.walk()? } else { Vec::new() };

    let report = Report::new(puzzle.board(), &steps)?;
    match opt.format {
        OutputFormat::Text => report.write_text(&mut out)?,
        OutputFormat::Json => {
            serde_json::to_writer_pretty(&mut out, &report)?;
            writeln!(out)?;
        }
        OutputFormat::Cfg => {}
    }
    if opt.walk {
        if let Some(player) = puzzle.player() {
            if !player.is_finished() {
                warn!(
                    "Player got stuck on {} before reaching all {} goals",
                    player.block(),
                    player.goals().len()
                );
            }
        }
    }
    Ok(())
}

fn main() {
    let exit_code = match run(Opt::from_args()) {
        Ok(_) => 0,
        Err(err) => {
            eprintln!("Error: {:#}", err);
            1
        }
    };
    process::exit(exit_code);
}
