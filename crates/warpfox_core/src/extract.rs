use std::fs;
use std::path::{Path, PathBuf};

use crate::error::BuildError;
use crate::process::{CommandSpec, ProcessRunner, find_in_path};
use crate::runtime::StagingPaths;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    Linux,
    MacOs,
    Windows,
}

impl Platform {
    pub fn current() -> Self {
        if cfg!(windows) {
            Self::Windows
        } else if cfg!(target_os = "macos") {
            Self::MacOs
        } else {
            Self::Linux
        }
    }
}

/// Decompression strategy, selected once at pipeline start.
///
/// POSIX hosts stream the archive through tar with path stripping. macOS
/// ships BSD tar whose `--strip-components` semantics differ, so GNU tar
/// under its Homebrew name `gtar` is required there. Windows has no
/// streaming tar-with-strip equivalent, so 7-Zip unpacks the gzip and tar
/// layers in two passes and the single top-level directory is moved into
/// place instead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtractStrategy {
    StreamTar { tar: PathBuf },
    TwoPass { seven_zip: PathBuf },
}

pub fn select_strategy(platform: Platform) -> Result<ExtractStrategy, BuildError> {
    select_strategy_with_lookup(platform, |binary| find_in_path(binary))
}

fn select_strategy_with_lookup<F>(platform: Platform, lookup: F) -> Result<ExtractStrategy, BuildError>
where
    F: Fn(&str) -> Option<PathBuf>,
{
    match platform {
        Platform::Linux => match lookup("tar") {
            Some(tar) => Ok(ExtractStrategy::StreamTar { tar }),
            None => Err(BuildError::ToolMissing {
                binary: "tar".to_string(),
                remedy: "Install tar with your system package manager.".to_string(),
            }),
        },
        Platform::MacOs => match lookup("gtar") {
            Some(tar) => Ok(ExtractStrategy::StreamTar { tar }),
            None => Err(BuildError::ToolMissing {
                binary: "gtar".to_string(),
                remedy: "Install GNU tar with `brew install gnu-tar`. The system bsdtar is not a substitute; its --strip-components handling differs.".to_string(),
            }),
        },
        Platform::Windows => match lookup("7z") {
            Some(seven_zip) => Ok(ExtractStrategy::TwoPass { seven_zip }),
            None => Err(BuildError::ToolMissing {
                binary: "7z".to_string(),
                remedy: "Install 7-Zip and make sure `7z` is on PATH.".to_string(),
            }),
        },
    }
}

/// Unpack the staged archive into the engine directory.
///
/// Presence of the engine directory is the completion marker, so extraction
/// lands in a scratch directory first and is renamed into place only after
/// the archiver succeeds. The unpacked tree has the archive's top-level
/// wrapper folder stripped.
pub fn extract_engine(
    paths: &StagingPaths,
    strategy: &ExtractStrategy,
    runner: &dyn ProcessRunner,
) -> Result<(), BuildError> {
    if paths.engine_dir.exists() {
        log::info!(
            "engine directory already present, skipping extraction: {}",
            paths.engine_dir.display()
        );
        return Ok(());
    }

    let scratch = paths.engine_scratch_dir();
    if scratch.exists() {
        // Leftover from an interrupted run.
        fs::remove_dir_all(&scratch).map_err(|error| BuildError::extraction(error.to_string()))?;
    }
    fs::create_dir_all(&scratch).map_err(|error| BuildError::extraction(error.to_string()))?;

    log::info!("extracting engine source into {}", paths.engine_dir.display());
    let result = match strategy {
        ExtractStrategy::StreamTar { tar } => extract_stream_tar(paths, tar, &scratch, runner),
        ExtractStrategy::TwoPass { seven_zip } => {
            extract_two_pass(paths, seven_zip, &scratch, runner)
        }
    };
    if result.is_err() {
        let _ = fs::remove_dir_all(&scratch);
    }
    result
}

fn extract_stream_tar(
    paths: &StagingPaths,
    tar: &Path,
    scratch: &Path,
    runner: &dyn ProcessRunner,
) -> Result<(), BuildError> {
    let spec = stream_tar_spec(tar, &paths.archive_path, scratch, &paths.staging_dir);
    run_archiver(runner, &spec)?;
    fs::rename(scratch, &paths.engine_dir)
        .map_err(|error| BuildError::extraction(error.to_string()))
}

fn extract_two_pass(
    paths: &StagingPaths,
    seven_zip: &Path,
    scratch: &Path,
    runner: &dyn ProcessRunner,
) -> Result<(), BuildError> {
    // Pass 1 strips the gzip layer, leaving the inner tar in scratch.
    let outer = seven_zip_spec(seven_zip, &paths.archive_path, scratch, &paths.staging_dir);
    run_archiver(runner, &outer)?;

    let inner_tar = scratch.join("firefox-source.tar");
    let unpacked = scratch.join("unpacked");
    fs::create_dir_all(&unpacked).map_err(|error| BuildError::extraction(error.to_string()))?;

    // Pass 2 unpacks the tar, wrapper folder included.
    let inner = seven_zip_spec(seven_zip, &inner_tar, &unpacked, &paths.staging_dir);
    run_archiver(runner, &inner)?;

    promote_single_top_dir(&unpacked, &paths.engine_dir)?;
    fs::remove_dir_all(scratch).map_err(|error| BuildError::extraction(error.to_string()))
}

pub fn stream_tar_spec(tar: &Path, archive: &Path, dest: &Path, cwd: &Path) -> CommandSpec {
    CommandSpec::new(
        tar,
        vec![
            "-xf".to_string(),
            archive.to_string_lossy().into_owned(),
            "--strip-components=1".to_string(),
            "-C".to_string(),
            dest.to_string_lossy().into_owned(),
        ],
        cwd,
    )
}

pub fn seven_zip_spec(seven_zip: &Path, archive: &Path, dest: &Path, cwd: &Path) -> CommandSpec {
    CommandSpec::new(
        seven_zip,
        vec![
            "x".to_string(),
            archive.to_string_lossy().into_owned(),
            format!("-o{}", dest.to_string_lossy()),
            "-y".to_string(),
        ],
        cwd,
    )
}

/// Move the single top-level directory inside `unpacked` to `dest`,
/// normalizing away the archive's wrapper folder.
fn promote_single_top_dir(unpacked: &Path, dest: &Path) -> Result<(), BuildError> {
    let mut dirs = Vec::new();
    let entries =
        fs::read_dir(unpacked).map_err(|error| BuildError::extraction(error.to_string()))?;
    for entry in entries {
        let entry = entry.map_err(|error| BuildError::extraction(error.to_string()))?;
        if entry
            .file_type()
            .map_err(|error| BuildError::extraction(error.to_string()))?
            .is_dir()
        {
            dirs.push(entry.path());
        }
    }
    let [top] = dirs.as_slice() else {
        return Err(BuildError::extraction(format!(
            "expected exactly one top-level directory in {}, found {}",
            unpacked.display(),
            dirs.len()
        )));
    };
    fs::rename(top, dest).map_err(|error| BuildError::extraction(error.to_string()))
}

fn run_archiver(runner: &dyn ProcessRunner, spec: &CommandSpec) -> Result<(), BuildError> {
    let output = runner
        .run(spec)
        .map_err(|error| BuildError::extraction(format!("{}: {error}", spec.rendered())))?;
    if !output.success {
        return Err(BuildError::extraction(format!(
            "{}: {}",
            spec.rendered(),
            output.failure_reason()
        )));
    }
    Ok(())
}
