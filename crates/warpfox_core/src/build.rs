use std::time::{Duration, Instant};

use crate::bootstrap::{bootstrap_repository, work_branch_name};
use crate::cache::BuildCache;
use crate::download::fetch_archive;
use crate::error::BuildError;
use crate::extract::{Platform, extract_engine, select_strategy};
use crate::manifest::{Manifest, validate_version};
use crate::process::ProcessRunner;
use crate::runtime::StagingPaths;

/// What a run will actually do, as a pure function of observed state. The
/// stages re-check their own skip conditions before mutating anything, so
/// the plan is advisory for everything except bootstrap gating.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuildPlan {
    pub fetch_archive: bool,
    pub extract_engine: bool,
    pub bootstrap_repository: bool,
}

impl BuildPlan {
    pub fn is_noop(&self) -> bool {
        !self.fetch_archive && !self.extract_engine && !self.bootstrap_repository
    }
}

pub fn plan_build(paths: &StagingPaths, cache: &BuildCache) -> BuildPlan {
    BuildPlan {
        fetch_archive: !paths.archive_path.exists(),
        extract_engine: !paths.engine_dir.exists(),
        bootstrap_repository: !cache.has_initialised,
    }
}

#[derive(Debug, Clone)]
pub struct BuildReport {
    pub plan: BuildPlan,
    pub version: String,
    pub work_branch: String,
    pub elapsed: Duration,
}

/// Run the build pipeline for the manifest's engine version: fetch the
/// source archive, extract it into the engine directory, and bootstrap the
/// engine repository unless the cache says that already happened. Stages run
/// strictly in that order and the first failure aborts the run. The caller
/// persists the cache afterwards regardless of outcome.
pub fn run_build(
    paths: &StagingPaths,
    manifest: &Manifest,
    cache: &mut BuildCache,
    runner: &dyn ProcessRunner,
) -> Result<BuildReport, BuildError> {
    let started = Instant::now();
    let version = manifest.firefox_version.as_str();
    validate_version(version).map_err(|reason| {
        BuildError::manifest(paths.manifest_path.to_string_lossy().replace('\\', "/"), reason)
    })?;

    let plan = plan_build(paths, cache);
    log::info!(
        "build plan for firefox v{version}: fetch={} extract={} bootstrap={}",
        plan.fetch_archive,
        plan.extract_engine,
        plan.bootstrap_repository
    );

    fetch_archive(paths, version)?;

    if plan.extract_engine {
        // Strategy lookup only matters when an extraction will actually run;
        // a host missing gtar can still re-run a completed checkout.
        let strategy = select_strategy(Platform::current())?;
        extract_engine(paths, &strategy, runner)?;
    }

    if plan.bootstrap_repository {
        bootstrap_repository(paths, version, runner)?;
        cache.has_initialised = true;
    }

    Ok(BuildReport {
        plan,
        version: version.to_string(),
        work_branch: work_branch_name(version),
        elapsed: started.elapsed(),
    })
}
