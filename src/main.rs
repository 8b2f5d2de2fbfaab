//! ldoc — generate a documentation model from LuaDoc-style comments.
//!
//! `ldoc -c ldoc.toml -o docs.json src/`

use anyhow::{Context as _, Result};
use clap::Parser;
use ldoc::render;
use ldoc::{Config, Context};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

#[derive(Parser)]
#[command(
    name = "ldoc",
    about = "Extract documentation from LuaDoc-style comments in Lua and C sources"
)]
struct Cli {
    /// Input files, directories (scanned recursively) or glob patterns
    #[arg(required = true)]
    files: Vec<String>,

    /// Config file. Defaults to ./ldoc.toml when present.
    #[arg(short = 'c', long)]
    config: Option<PathBuf>,

    /// Output file. Writes to stdout when omitted.
    #[arg(short = 'o', long)]
    output: Option<PathBuf>,

    /// Output format: json
    #[arg(short = 'f', long)]
    format: Option<String>,

    /// Package root used to derive module names from paths
    #[arg(short = 'b', long)]
    package: Option<PathBuf>,

    /// Include local functions in output
    #[arg(long)]
    all: bool,

    /// Project title
    #[arg(short = 'p', long)]
    project: Option<String>,

    /// Log pipeline progress
    #[arg(short = 'v', long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose { "ldoc=debug" } else { "ldoc=warn" };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(level.parse()?),
        )
        .with_target(false)
        .init();

    run(&cli)
}

fn run(cli: &Cli) -> Result<()> {
    let config = load_config(cli.config.as_deref())?;
    let mut ctx = Context::from_config(&config).context("invalid configuration")?;
    if cli.project.is_some() {
        ctx.options.title = cli.project.clone();
    }
    if cli.package.is_some() {
        ctx.options.package = cli.package.clone();
    }
    ctx.options.all |= cli.all;

    let format = cli
        .format
        .as_deref()
        .or(config.format.as_deref())
        .unwrap_or("json");
    let renderer = render::create_renderer(format)?;

    let input_files = expand_inputs(&cli.files, &ctx)?;
    if input_files.is_empty() {
        anyhow::bail!("no input files");
    }
    for path in &input_files {
        let content = fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        ctx.scan_file(path, &content)
            .with_context(|| format!("failed to process {}", path.display()))?;
    }

    let project = ctx.resolve()?;
    debug!(modules = project.modules.len(), "resolved");
    let output = renderer.render(&project)?;

    match &cli.output {
        Some(path) => fs::write(path, &output)
            .with_context(|| format!("failed to write {}", path.display()))?,
        None => print!("{}", output),
    }
    Ok(())
}

/// Explicit `--config`, else `ldoc.toml` in the working directory.
fn load_config(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(path) => {
            Config::load(path).with_context(|| format!("failed to load config {}", path.display()))
        }
        None => Ok(Config::load_from_dir(Path::new("."))
            .context("failed to load ldoc.toml")?
            .unwrap_or_default()),
    }
}

/// Expand files, directories and glob patterns into a sorted list of
/// source files some registered language handles.
fn expand_inputs(patterns: &[String], ctx: &Context) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for pattern in patterns {
        let path = Path::new(pattern);
        if path.is_file() {
            files.push(path.to_path_buf());
            continue;
        }
        if path.is_dir() {
            let walk = path.join("**").join("*");
            let walk = walk.to_string_lossy();
            let found = glob::glob(&walk)
                .with_context(|| format!("failed to read directory: {}", path.display()))?
                .filter_map(|r| r.ok())
                .filter(|p| p.is_file() && ctx.supports(p));
            files.extend(found);
            continue;
        }
        let matches: Vec<_> = glob::glob(pattern)
            .with_context(|| format!("invalid glob pattern: {}", pattern))?
            .filter_map(|r| r.ok())
            .filter(|p| p.is_file())
            .collect();
        if matches.is_empty() {
            warn!(pattern = %pattern, "no files matched");
        }
        files.extend(matches);
    }
    // Sort for deterministic module merging
    files.sort();
    files.dedup();
    Ok(files)
}
