use std::env;
use std::fs::{self, File};
use std::io;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use reqwest::blocking::Client;

use crate::error::BuildError;
use crate::runtime::StagingPaths;

const DEFAULT_RELEASE_BASE: &str =
    "https://github.com/mauro-balades/warpfox/releases/download";
const DEFAULT_CONNECT_TIMEOUT_MS: u64 = 30_000;

/// Release download base: env `WARPFOX_RELEASE_BASE` > default.
pub fn release_base() -> String {
    if let Ok(value) = env::var("WARPFOX_RELEASE_BASE") {
        let trimmed = value.trim().trim_end_matches('/').to_string();
        if !trimmed.is_empty() {
            return trimmed;
        }
    }
    DEFAULT_RELEASE_BASE.to_string()
}

/// Deterministic archive URL for one engine version.
pub fn archive_url(base: &str, version: &str) -> String {
    format!("{base}/firefox-v{version}/firefox-source.tar.gz")
}

/// Download the source archive for `version` into the staging root.
///
/// Presence of the final archive file is the completion marker, so the
/// payload streams to a `.partial` sibling and is renamed into place only
/// after the transfer finishes. An interrupted run leaves no file at the
/// final path and the next run downloads again.
pub fn fetch_archive(paths: &StagingPaths, version: &str) -> Result<(), BuildError> {
    if paths.archive_path.exists() {
        log::info!(
            "archive already present, skipping download: {}",
            paths.archive_path.display()
        );
        return Ok(());
    }

    let url = archive_url(&release_base(), version);
    fs::create_dir_all(&paths.staging_dir)
        .map_err(|error| BuildError::download(&url, error.to_string()))?;

    log::info!("downloading firefox v{version} from {url}");
    let client = download_client().map_err(|error| BuildError::download(&url, error))?;
    let response = client
        .get(&url)
        .send()
        .map_err(|error| BuildError::download(&url, error.to_string()))?;
    let status = response.status();
    if !status.is_success() {
        return Err(BuildError::download(&url, format!("HTTP {status}")));
    }

    let partial = paths.archive_partial_path();
    let result = stream_to_file(response, &partial);
    if let Err(reason) = result {
        let _ = fs::remove_file(&partial);
        return Err(BuildError::download(&url, reason));
    }

    fs::rename(&partial, &paths.archive_path)
        .map_err(|error| BuildError::download(&url, error.to_string()))?;
    log::info!("saved archive to {}", paths.archive_path.display());
    Ok(())
}

fn stream_to_file(
    response: reqwest::blocking::Response,
    destination: &std::path::Path,
) -> Result<(), String> {
    let mut file = File::create(destination).map_err(|error| error.to_string())?;

    let bar = match response.content_length() {
        Some(total) => {
            let bar = ProgressBar::new(total);
            bar.set_style(
                ProgressStyle::default_bar()
                    .template(
                        "{spinner:.green} [{elapsed_precise}] [{wide_bar:.cyan/blue}] {bytes}/{total_bytes} ({bytes_per_sec}, {eta})",
                    )
                    .map_err(|error| error.to_string())?
                    .progress_chars("#>-"),
            );
            bar
        }
        None => ProgressBar::new_spinner(),
    };

    let mut source = bar.wrap_read(response);
    io::copy(&mut source, &mut file).map_err(|error| error.to_string())?;
    bar.finish_and_clear();
    Ok(())
}

fn download_client() -> Result<Client, String> {
    let connect_timeout_ms = env::var("WARPFOX_HTTP_TIMEOUT_MS")
        .ok()
        .and_then(|value| value.trim().parse::<u64>().ok())
        .unwrap_or(DEFAULT_CONNECT_TIMEOUT_MS);
    // Archives run to hundreds of megabytes; only the connection phase gets
    // a deadline, not the whole transfer.
    Client::builder()
        .connect_timeout(Duration::from_millis(connect_timeout_ms))
        .timeout(None)
        .build()
        .map_err(|error| error.to_string())
}
