use thiserror::Error;

/// Failure taxonomy for the build pipeline. Every stage aborts the run on its
/// first error; nothing is retried and no partial artifact is rolled back
/// beyond the scratch paths the stages themselves clean up.
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("failed to read manifest {path}: {reason}")]
    Manifest { path: String, reason: String },

    #[error("failed to download {url}: {reason}")]
    Download { url: String, reason: String },

    #[error("`{binary}` was not found on PATH. {remedy}")]
    ToolMissing { binary: String, remedy: String },

    #[error("failed to extract the engine archive: {reason}")]
    Extraction { reason: String },

    #[error("`git {command}` failed in {dir}: {reason}")]
    Vcs {
        command: String,
        dir: String,
        reason: String,
    },
}

impl BuildError {
    pub fn manifest(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Manifest {
            path: path.into(),
            reason: reason.into(),
        }
    }

    pub fn download(url: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Download {
            url: url.into(),
            reason: reason.into(),
        }
    }

    pub fn extraction(reason: impl Into<String>) -> Self {
        Self::Extraction {
            reason: reason.into(),
        }
    }
}
