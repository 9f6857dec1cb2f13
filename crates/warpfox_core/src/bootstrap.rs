use std::path::Path;

use crate::error::BuildError;
use crate::process::{CommandSpec, ProcessRunner, find_in_path};
use crate::runtime::StagingPaths;

pub const WORK_BRANCH_PREFIX: &str = "warpfox_";

const COMMIT_AUTHOR_NAME: &str = "warpfox";
const COMMIT_AUTHOR_EMAIL: &str = "build@warpfox.invalid";

/// Branch the fork's patches land on, derived from the version string with
/// every non-alphanumeric separator normalized to `_`.
pub fn work_branch_name(version: &str) -> String {
    let normalized = version
        .chars()
        .map(|ch| if ch.is_ascii_alphanumeric() { ch } else { '_' })
        .collect::<String>();
    format!("{WORK_BRANCH_PREFIX}{normalized}")
}

pub fn commit_message(version: &str) -> String {
    format!("Import Firefox v{version}")
}

/// The full bootstrap sequence, in order, all run inside the engine
/// directory. Orphaning discards upstream's commit graph while keeping one
/// pristine baseline commit; the second branch isolates fork work so the
/// baseline stays recoverable.
pub fn bootstrap_commands(git: &Path, engine_dir: &Path, version: &str) -> Vec<CommandSpec> {
    let git_spec = |args: &[&str]| {
        CommandSpec::new(
            git,
            args.iter().map(ToString::to_string).collect(),
            engine_dir,
        )
    };
    vec![
        git_spec(&["init", "-q"]),
        git_spec(&["checkout", "--orphan", version]),
        // -f so upstream .gitignore rules cannot drop files from the import.
        git_spec(&["add", "-f", "."]),
        CommandSpec::new(
            git,
            vec![
                "-c".to_string(),
                format!("user.name={COMMIT_AUTHOR_NAME}"),
                "-c".to_string(),
                format!("user.email={COMMIT_AUTHOR_EMAIL}"),
                "commit".to_string(),
                "-q".to_string(),
                "-m".to_string(),
                commit_message(version),
            ],
            engine_dir,
        ),
        git_spec(&["checkout", "-b", &work_branch_name(version)]),
    ]
}

/// Reinitialize the extracted engine tree as a fresh repository: orphan
/// branch named after the raw version, one baseline commit, then the work
/// branch checked out. Each step must fully succeed before the next runs.
pub fn bootstrap_repository(
    paths: &StagingPaths,
    version: &str,
    runner: &dyn ProcessRunner,
) -> Result<(), BuildError> {
    let git = find_in_path("git").ok_or_else(|| BuildError::ToolMissing {
        binary: "git".to_string(),
        remedy: "Install git with your system package manager.".to_string(),
    })?;
    bootstrap_repository_with_git(paths, version, &git, runner)
}

fn bootstrap_repository_with_git(
    paths: &StagingPaths,
    version: &str,
    git: &Path,
    runner: &dyn ProcessRunner,
) -> Result<(), BuildError> {
    log::info!(
        "bootstrapping engine repository on orphan branch {version} (work branch {})",
        work_branch_name(version)
    );
    for spec in bootstrap_commands(git, &paths.engine_dir, version) {
        let command = spec.args.join(" ");
        let output = runner.run(&spec).map_err(|error| BuildError::Vcs {
            command: command.clone(),
            dir: paths.engine_dir.to_string_lossy().replace('\\', "/"),
            reason: error.to_string(),
        })?;
        if !output.success {
            return Err(BuildError::Vcs {
                command,
                dir: paths.engine_dir.to_string_lossy().replace('\\', "/"),
                reason: output.failure_reason(),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::path::{Path, PathBuf};

    use tempfile::tempdir;

    use super::{bootstrap_commands, bootstrap_repository_with_git, commit_message, work_branch_name};
    use crate::error::BuildError;
    use crate::process::{ProcessOutput, RecordingRunner};
    use crate::runtime::{PathOverrides, ResolutionContext, resolve_paths};

    #[test]
    fn work_branch_replaces_every_separator() {
        assert_eq!(work_branch_name("128.0.1"), "warpfox_128_0_1");
        assert_eq!(work_branch_name("129.0b3"), "warpfox_129_0b3");
        assert_eq!(work_branch_name("130.0a1-nightly"), "warpfox_130_0a1_nightly");
    }

    #[test]
    fn sequence_runs_init_orphan_add_commit_branch() {
        let commands = bootstrap_commands(
            Path::new("/usr/bin/git"),
            Path::new("/work/.warpfox/engine"),
            "128.0.1",
        );
        assert_eq!(commands.len(), 5);
        assert_eq!(commands[0].args, vec!["init", "-q"]);
        assert_eq!(commands[1].args, vec!["checkout", "--orphan", "128.0.1"]);
        assert_eq!(commands[2].args, vec!["add", "-f", "."]);
        assert!(commands[3].args.contains(&"commit".to_string()));
        assert!(commands[3].args.contains(&commit_message("128.0.1")));
        assert_eq!(commands[4].args, vec!["checkout", "-b", "warpfox_128_0_1"]);
        assert!(
            commands
                .iter()
                .all(|spec| spec.cwd == Path::new("/work/.warpfox/engine"))
        );
    }

    #[test]
    fn commit_carries_explicit_author_identity() {
        let commands = bootstrap_commands(Path::new("git"), Path::new("/engine"), "1.0.0");
        let commit = &commands[3];
        assert!(commit.args.contains(&"user.name=warpfox".to_string()));
        assert!(commit.args.contains(&"user.email=build@warpfox.invalid".to_string()));
    }

    #[test]
    fn failure_stops_the_sequence() {
        let temp = tempdir().expect("tempdir");
        let context = ResolutionContext {
            cwd: temp.path().to_path_buf(),
        };
        let paths = resolve_paths(&context, &PathOverrides::default());

        let runner = RecordingRunner::new();
        runner.enqueue(ProcessOutput::succeeded());
        runner.enqueue(ProcessOutput::succeeded());
        runner.enqueue(ProcessOutput::failed(128, "fatal: pathspec error"));

        let error =
            bootstrap_repository_with_git(&paths, "128.0.1", &PathBuf::from("git"), &runner)
                .expect_err("must fail");
        match error {
            BuildError::Vcs { command, reason, .. } => {
                assert_eq!(command, "add -f .");
                assert!(reason.contains("pathspec error"));
            }
            other => panic!("unexpected error: {other}"),
        }
        // commit and branch creation never ran
        assert_eq!(runner.call_count(), 3);
    }

    #[test]
    fn full_sequence_succeeds_with_compliant_runner() {
        let temp = tempdir().expect("tempdir");
        let context = ResolutionContext {
            cwd: temp.path().to_path_buf(),
        };
        let paths = resolve_paths(&context, &PathOverrides::default());

        let runner = RecordingRunner::new();
        bootstrap_repository_with_git(&paths, "1.0.0", &PathBuf::from("git"), &runner)
            .expect("bootstrap");
        assert_eq!(runner.call_count(), 5);
    }
}
