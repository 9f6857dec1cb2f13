use std::env;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

pub const STAGING_DIR_NAME: &str = ".warpfox";
pub const ARCHIVE_FILE_NAME: &str = "firefox-source.tar.gz";
pub const ENGINE_DIR_NAME: &str = "engine";
pub const CACHE_FILE_NAME: &str = "cache.json";
pub const MANIFEST_FILE_NAME: &str = "warpfox.manifest.json";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueSource {
    Flag,
    Env,
    Heuristic,
    Default,
}

impl ValueSource {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Flag => "flag",
            Self::Env => "env",
            Self::Heuristic => "heuristic",
            Self::Default => "default",
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct PathOverrides {
    pub project_root: Option<PathBuf>,
    pub manifest: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct ResolutionContext {
    pub cwd: PathBuf,
}

impl ResolutionContext {
    pub fn from_process() -> io::Result<Self> {
        Ok(Self {
            cwd: env::current_dir()?,
        })
    }
}

/// Resolved on-disk layout for one working directory. The staging root holds
/// everything the pipeline produces: the downloaded archive, the extracted
/// (then git-managed) engine tree, the idempotency cache, and the scratch
/// paths used so completed artifacts only ever appear by atomic rename.
#[derive(Debug, Clone)]
pub struct StagingPaths {
    pub project_root: PathBuf,
    pub staging_dir: PathBuf,
    pub archive_path: PathBuf,
    pub engine_dir: PathBuf,
    pub cache_path: PathBuf,
    pub manifest_path: PathBuf,
    pub root_source: ValueSource,
    pub manifest_source: ValueSource,
}

impl StagingPaths {
    /// Sibling of the archive used while a download is in flight.
    pub fn archive_partial_path(&self) -> PathBuf {
        self.staging_dir.join(format!("{ARCHIVE_FILE_NAME}.partial"))
    }

    /// Scratch directory an extraction unpacks into before promotion.
    pub fn engine_scratch_dir(&self) -> PathBuf {
        self.staging_dir.join(format!("{ENGINE_DIR_NAME}.partial"))
    }

    pub fn diagnostics(&self) -> String {
        format!(
            "project_root={} ({})\nstaging_dir={}\narchive_path={}\nengine_dir={}\ncache_path={}\nmanifest_path={} ({})",
            normalize_for_display(&self.project_root),
            self.root_source.as_str(),
            normalize_for_display(&self.staging_dir),
            normalize_for_display(&self.archive_path),
            normalize_for_display(&self.engine_dir),
            normalize_for_display(&self.cache_path),
            normalize_for_display(&self.manifest_path),
            self.manifest_source.as_str(),
        )
    }
}

pub fn resolve_paths(context: &ResolutionContext, overrides: &PathOverrides) -> StagingPaths {
    resolve_paths_with_lookup(context, overrides, |key| env::var(key).ok())
}

fn resolve_paths_with_lookup<F>(
    context: &ResolutionContext,
    overrides: &PathOverrides,
    lookup_env: F,
) -> StagingPaths
where
    F: Fn(&str) -> Option<String>,
{
    let (project_root, root_source) = resolve_project_root(context, overrides, &lookup_env);

    let staging_dir = project_root.join(STAGING_DIR_NAME);
    let (manifest_path, manifest_source) = if let Some(path) = overrides.manifest.as_deref() {
        (absolutize(path, &context.cwd), ValueSource::Flag)
    } else if let Some(value) = lookup_env("WARPFOX_MANIFEST") {
        (
            absolutize(Path::new(value.trim()), &context.cwd),
            ValueSource::Env,
        )
    } else {
        (project_root.join(MANIFEST_FILE_NAME), ValueSource::Default)
    };

    StagingPaths {
        archive_path: staging_dir.join(ARCHIVE_FILE_NAME),
        engine_dir: staging_dir.join(ENGINE_DIR_NAME),
        cache_path: staging_dir.join(CACHE_FILE_NAME),
        project_root,
        staging_dir,
        manifest_path,
        root_source,
        manifest_source,
    }
}

/// Create the staging root if it is absent. Idempotent.
pub fn init_staging(paths: &StagingPaths) -> io::Result<()> {
    fs::create_dir_all(&paths.staging_dir)
}

fn resolve_project_root<F>(
    context: &ResolutionContext,
    overrides: &PathOverrides,
    lookup_env: &F,
) -> (PathBuf, ValueSource)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(path) = overrides.project_root.as_deref() {
        return (absolutize(path, &context.cwd), ValueSource::Flag);
    }
    if let Some(value) = lookup_env("WARPFOX_PROJECT_ROOT") {
        return (
            absolutize(Path::new(value.trim()), &context.cwd),
            ValueSource::Env,
        );
    }

    // Walk up from the cwd looking for a manifest so the tool can be run
    // from anywhere inside a checkout.
    let mut cursor = Some(context.cwd.as_path());
    while let Some(current) = cursor {
        if current.join(MANIFEST_FILE_NAME).exists() {
            if current == context.cwd {
                break;
            }
            return (current.to_path_buf(), ValueSource::Heuristic);
        }
        cursor = current.parent();
    }
    (context.cwd.clone(), ValueSource::Default)
}

fn absolutize(path: &Path, base: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}

fn normalize_for_display(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}
