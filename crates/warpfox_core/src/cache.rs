use std::fs;
use std::io;
use std::path::Path;

use serde::{Deserialize, Serialize};

/// Durable idempotency record at `.warpfox/cache.json`. Loaded once at
/// process start and saved once at process end regardless of outcome, so a
/// completed bootstrap is never re-run. A missing or unreadable file loads
/// as the default state.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct BuildCache {
    #[serde(rename = "hasInitialised", default)]
    pub has_initialised: bool,
}

impl BuildCache {
    pub fn load(path: &Path) -> Self {
        let Ok(content) = fs::read_to_string(path) else {
            return Self::default();
        };
        match serde_json::from_str(&content) {
            Ok(cache) => cache,
            Err(error) => {
                log::warn!(
                    "ignoring unreadable cache {}: {error}",
                    path.to_string_lossy().replace('\\', "/")
                );
                Self::default()
            }
        }
    }

    pub fn save(&self, path: &Path) -> io::Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let rendered = serde_json::to_string(self).map_err(io::Error::other)?;
        fs::write(path, rendered)
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::tempdir;

    use super::BuildCache;

    #[test]
    fn missing_file_loads_as_default() {
        let cache = BuildCache::load(std::path::Path::new("/nonexistent/cache.json"));
        assert!(!cache.has_initialised);
    }

    #[test]
    fn corrupt_file_loads_as_default() {
        let temp = tempdir().expect("tempdir");
        let path = temp.path().join("cache.json");
        fs::write(&path, "{ definitely not json").expect("write cache");
        let cache = BuildCache::load(&path);
        assert!(!cache.has_initialised);
    }

    #[test]
    fn save_then_load_round_trips_the_flag() {
        let temp = tempdir().expect("tempdir");
        let path = temp.path().join(".warpfox").join("cache.json");

        let cache = BuildCache {
            has_initialised: true,
        };
        cache.save(&path).expect("save cache");

        let content = fs::read_to_string(&path).expect("read cache");
        assert_eq!(content, r#"{"hasInitialised":true}"#);
        assert_eq!(BuildCache::load(&path), cache);
    }

    #[test]
    fn legacy_object_without_flag_defaults_to_false() {
        let temp = tempdir().expect("tempdir");
        let path = temp.path().join("cache.json");
        fs::write(&path, r#"{"firefox-version":"128.0.1"}"#).expect("write cache");
        assert!(!BuildCache::load(&path).has_initialised);
    }
}
