use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use warpfox_core::build::run_build;
use warpfox_core::cache::BuildCache;
use warpfox_core::manifest::load_manifest;
use warpfox_core::process::SystemRunner;
use warpfox_core::runtime::{
    PathOverrides, ResolutionContext, StagingPaths, init_staging, resolve_paths,
};

#[derive(Debug, Parser)]
#[command(
    name = "warpfox",
    version,
    about = "Bootstrap a patchable Firefox source tree for the WarpFox fork"
)]
struct Cli {
    #[arg(long, global = true, value_name = "PATH")]
    project_root: Option<PathBuf>,
    #[arg(long, global = true, value_name = "PATH", help = "Path to warpfox.manifest.json")]
    manifest: Option<PathBuf>,
    #[arg(long, global = true, help = "Print resolved staging diagnostics")]
    diagnostics: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    #[command(about = "Download, extract, and git-initialize the engine source")]
    Build(BuildArgs),
}

#[derive(Debug, Args)]
struct BuildArgs {}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp(None)
        .init();

    let cli = Cli::parse();
    let paths = resolve_staging_paths(&cli)?;
    if cli.diagnostics {
        println!("[diagnostics]\n{}", paths.diagnostics());
    }

    match cli.command {
        Commands::Build(_) => run_build_command(&paths),
    }
}

fn run_build_command(paths: &StagingPaths) -> Result<()> {
    let manifest = load_manifest(&paths.manifest_path)?;
    init_staging(paths).with_context(|| {
        format!("failed to create staging dir {}", paths.staging_dir.display())
    })?;
    let mut cache = BuildCache::load(&paths.cache_path);

    let runner = SystemRunner;
    let result = run_build(paths, &manifest, &mut cache, &runner);

    // Persist whatever the run achieved, even on failure, so a completed
    // bootstrap is never re-attempted.
    cache
        .save(&paths.cache_path)
        .with_context(|| format!("failed to write {}", paths.cache_path.display()))?;

    let report = result?;
    if report.plan.is_noop() {
        println!(
            "engine v{} already bootstrapped on {}",
            report.version, report.work_branch
        );
    } else {
        println!(
            "engine v{} ready on branch {}",
            report.version, report.work_branch
        );
    }
    println!("Done in {:.2}s", report.elapsed.as_secs_f64());
    Ok(())
}

fn resolve_staging_paths(cli: &Cli) -> Result<StagingPaths> {
    dotenvy::dotenv().ok();

    let context = ResolutionContext::from_process().context("failed to read current directory")?;
    let overrides = PathOverrides {
        project_root: cli.project_root.clone(),
        manifest: cli.manifest.clone(),
    };
    Ok(resolve_paths(&context, &overrides))
}
