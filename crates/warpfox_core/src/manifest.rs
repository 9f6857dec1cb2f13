use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::error::BuildError;

/// Fork manifest read from `warpfox.manifest.json`. Only `firefoxVersion`
/// feeds the pipeline; branding is carried for later stages of the fork
/// tooling.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
    pub firefox_version: String,
    #[serde(default)]
    pub brands: BTreeMap<String, Brand>,
    #[serde(default)]
    pub updates_host: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Brand {
    pub full_name: String,
    pub short_name: String,
    #[serde(default)]
    pub shorter_name: Option<String>,
    pub version: String,
}

pub fn load_manifest(path: &Path) -> Result<Manifest, BuildError> {
    let display = path.to_string_lossy().replace('\\', "/");
    let content = fs::read_to_string(path)
        .map_err(|error| BuildError::manifest(&display, error.to_string()))?;
    let manifest: Manifest = serde_json::from_str(&content)
        .map_err(|error| BuildError::manifest(&display, error.to_string()))?;
    validate_version(&manifest.firefox_version)
        .map_err(|reason| BuildError::manifest(&display, reason))?;
    Ok(manifest)
}

/// The version string ends up in a URL path segment, two git branch names,
/// and several argv vectors. It is external input, so anything outside a
/// conservative character set is rejected before the pipeline starts.
pub fn validate_version(version: &str) -> Result<(), String> {
    if version.is_empty() {
        return Err("firefoxVersion must not be empty".to_string());
    }
    if version.starts_with('-') || version.starts_with('.') {
        return Err(format!(
            "firefoxVersion {version:?} must not start with '-' or '.'"
        ));
    }
    if let Some(bad) = version
        .chars()
        .find(|ch| !(ch.is_ascii_alphanumeric() || matches!(ch, '.' | '_' | '-')))
    {
        return Err(format!(
            "firefoxVersion {version:?} contains unsupported character {bad:?}"
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::tempdir;

    use super::{load_manifest, validate_version};
    use crate::error::BuildError;

    #[test]
    fn load_manifest_parses_version_and_brands() {
        let temp = tempdir().expect("tempdir");
        let path = temp.path().join("warpfox.manifest.json");
        fs::write(
            &path,
            r#"{
  "firefoxVersion": "128.0.1",
  "updatesHost": "https://updates.warpfox.dev",
  "brands": {
    "stable": {
      "fullName": "WarpFox Browser",
      "shortName": "WarpFox",
      "shorterName": "WF",
      "version": "1.0.0"
    }
  }
}"#,
        )
        .expect("write manifest");

        let manifest = load_manifest(&path).expect("load manifest");
        assert_eq!(manifest.firefox_version, "128.0.1");
        assert_eq!(
            manifest.updates_host.as_deref(),
            Some("https://updates.warpfox.dev")
        );
        let brand = manifest.brands.get("stable").expect("stable brand");
        assert_eq!(brand.full_name, "WarpFox Browser");
        assert_eq!(brand.shorter_name.as_deref(), Some("WF"));
    }

    #[test]
    fn load_manifest_reports_missing_file() {
        let error = load_manifest(std::path::Path::new("/nonexistent/warpfox.manifest.json"))
            .expect_err("must fail");
        assert!(matches!(error, BuildError::Manifest { .. }));
        assert!(error.to_string().contains("warpfox.manifest.json"));
    }

    #[test]
    fn load_manifest_rejects_invalid_json() {
        let temp = tempdir().expect("tempdir");
        let path = temp.path().join("warpfox.manifest.json");
        fs::write(&path, "{ not json").expect("write manifest");
        let error = load_manifest(&path).expect_err("must fail");
        assert!(matches!(error, BuildError::Manifest { .. }));
    }

    #[test]
    fn validate_version_accepts_dotted_versions() {
        validate_version("128.0.1").expect("dotted");
        validate_version("129.0b3").expect("beta");
        validate_version("130.0a1-nightly").expect("dash");
    }

    #[test]
    fn validate_version_rejects_hostile_input() {
        assert!(validate_version("").is_err());
        assert!(validate_version("-rf").is_err());
        assert!(validate_version("../../etc").is_err());
        assert!(validate_version("1.0; rm -rf /").is_err());
        assert!(validate_version("1.0/../2.0").is_err());
    }
}
