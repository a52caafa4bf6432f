//! Artifact Store Resolver
//!
//! Picks the most recent `model_v*` directory under the artifacts root and
//! checks that it carries everything needed to serve.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use chrono::NaiveDateTime;
use serde::Serialize;

use super::ArtifactError;

/// Directory name prefix for versioned artifact bundles
pub const VERSION_PREFIX: &str = "model_v";

/// Timestamp layout following the prefix, e.g. `model_v20240101_120000`
const VERSION_TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

pub const ONNX_MODEL_FILE: &str = "model.onnx";
pub const DENSE_MODEL_FILE: &str = "model.json";
pub const PREPROCESSOR_FILE: &str = "preprocessor.json";
pub const FEATURE_NAMES_FILE: &str = "feature_names.json";
pub const METRICS_FILE: &str = "metrics.json";
pub const HISTORY_FILE: &str = "history.json";

/// Serialized classifier format found in a version directory
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelFormat {
    Onnx,
    Dense,
}

/// One resolved, complete artifact version
#[derive(Debug, Clone)]
pub struct ArtifactVersion {
    /// Directory name, e.g. `model_v20240101_120000`
    pub id: String,
    pub dir: PathBuf,
    /// Timestamp parsed from the directory name, if it follows the convention
    pub trained_at: Option<NaiveDateTime>,
    pub model_format: ModelFormat,
    pub model_path: PathBuf,
    pub preprocessor_path: PathBuf,
    pub feature_names_path: PathBuf,
    /// Companion files; serving works without them
    pub metrics_path: Option<PathBuf>,
    pub history_path: Option<PathBuf>,
}

#[derive(Debug)]
struct Candidate {
    name: String,
    path: PathBuf,
    modified: SystemTime,
}

/// Resolve the latest complete version under `root`.
///
/// Ordering is by directory modification time, newest first, with ties
/// broken by the greatest directory name. The chosen version is never
/// swapped for an older one when it turns out to be incomplete.
pub fn resolve_latest(root: &Path) -> Result<ArtifactVersion, ArtifactError> {
    if !root.is_dir() {
        return Err(ArtifactError::NotFound {
            root: root.to_path_buf(),
        });
    }

    let mut candidates = list_candidates(root)?;
    if candidates.is_empty() {
        return Err(ArtifactError::NoVersions {
            root: root.to_path_buf(),
        });
    }

    candidates.sort_by(|a, b| {
        b.modified
            .cmp(&a.modified)
            .then_with(|| b.name.cmp(&a.name))
    });

    tracing::debug!(
        "Found {} artifact version(s): {:?}",
        candidates.len(),
        candidates.iter().map(|c| c.name.as_str()).collect::<Vec<_>>()
    );

    let latest = &candidates[0];
    inspect_version(&latest.name, &latest.path)
}

fn list_candidates(root: &Path) -> Result<Vec<Candidate>, ArtifactError> {
    let entries = fs::read_dir(root).map_err(|source| ArtifactError::Io {
        path: root.to_path_buf(),
        source,
    })?;

    let mut candidates = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|source| ArtifactError::Io {
            path: root.to_path_buf(),
            source,
        })?;
        let path = entry.path();
        let Some(name) = entry.file_name().to_str().map(str::to_string) else {
            continue;
        };
        if !name.starts_with(VERSION_PREFIX) || !path.is_dir() {
            continue;
        }

        // Follows symlinks, so a linked version is ordered by its target
        let modified = fs::metadata(&path)
            .and_then(|m| m.modified())
            .map_err(|source| ArtifactError::Io {
                path: path.clone(),
                source,
            })?;

        candidates.push(Candidate {
            name,
            path,
            modified,
        });
    }

    Ok(candidates)
}

/// Check the required files of a single version directory.
pub fn inspect_version(name: &str, dir: &Path) -> Result<ArtifactVersion, ArtifactError> {
    let mut missing = Vec::new();

    let onnx = dir.join(ONNX_MODEL_FILE);
    let dense = dir.join(DENSE_MODEL_FILE);
    let model = if onnx.is_file() {
        Some((ModelFormat::Onnx, onnx))
    } else if dense.is_file() {
        Some((ModelFormat::Dense, dense))
    } else {
        missing.push(format!("{} or {}", ONNX_MODEL_FILE, DENSE_MODEL_FILE));
        None
    };

    let preprocessor_path = dir.join(PREPROCESSOR_FILE);
    if !preprocessor_path.is_file() {
        missing.push(PREPROCESSOR_FILE.to_string());
    }

    let feature_names_path = dir.join(FEATURE_NAMES_FILE);
    if !feature_names_path.is_file() {
        missing.push(FEATURE_NAMES_FILE.to_string());
    }

    let Some((model_format, model_path)) = model.filter(|_| missing.is_empty()) else {
        return Err(ArtifactError::Incomplete {
            version: name.to_string(),
            missing,
        });
    };

    let optional = |file: &str| {
        let path = dir.join(file);
        path.is_file().then_some(path)
    };

    Ok(ArtifactVersion {
        id: name.to_string(),
        dir: dir.to_path_buf(),
        trained_at: parse_version_timestamp(name),
        model_format,
        model_path,
        preprocessor_path,
        feature_names_path,
        metrics_path: optional(METRICS_FILE),
        history_path: optional(HISTORY_FILE),
    })
}

/// Parse the training timestamp encoded in a version directory name.
pub fn parse_version_timestamp(name: &str) -> Option<NaiveDateTime> {
    let stamp = name.strip_prefix(VERSION_PREFIX)?;
    NaiveDateTime::parse_from_str(stamp, VERSION_TIMESTAMP_FORMAT).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{set_mtime, write_fixture_bundle};
    use std::time::Duration;
    use tempfile::tempdir;

    #[test]
    fn test_missing_root() {
        let dir = tempdir().unwrap();
        let err = resolve_latest(&dir.path().join("nope")).unwrap_err();
        assert!(matches!(err, ArtifactError::NotFound { .. }));
    }

    #[test]
    fn test_empty_root() {
        let dir = tempdir().unwrap();
        // Non-matching entries are ignored
        fs::create_dir(dir.path().join("checkpoints")).unwrap();
        fs::write(dir.path().join("model_v_notes.txt"), "x").unwrap();

        let err = resolve_latest(dir.path()).unwrap_err();
        assert!(matches!(err, ArtifactError::NoVersions { .. }));
    }

    #[test]
    fn test_selects_most_recent_mtime() {
        let dir = tempdir().unwrap();
        let older = write_fixture_bundle(dir.path(), "model_v20240301_000000");
        let newer = write_fixture_bundle(dir.path(), "model_v20240101_000000");

        let base = SystemTime::UNIX_EPOCH + Duration::from_secs(1_700_000_000);
        set_mtime(&older, base);
        set_mtime(&newer, base + Duration::from_secs(60));

        let version = resolve_latest(dir.path()).unwrap();
        assert_eq!(version.id, "model_v20240101_000000");
    }

    #[test]
    fn test_tie_broken_by_name_and_stable() {
        let dir = tempdir().unwrap();
        let a = write_fixture_bundle(dir.path(), "model_v20240101_000000");
        let b = write_fixture_bundle(dir.path(), "model_v20240102_000000");

        let stamp = SystemTime::UNIX_EPOCH + Duration::from_secs(1_700_000_000);
        set_mtime(&a, stamp);
        set_mtime(&b, stamp);

        for _ in 0..5 {
            let version = resolve_latest(dir.path()).unwrap();
            assert_eq!(version.id, "model_v20240102_000000");
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_symlinked_version_uses_target_mtime() {
        let dir = tempdir().unwrap();
        let store = tempdir().unwrap();
        let target = write_fixture_bundle(store.path(), "model_v20240301_000000");
        let real = write_fixture_bundle(dir.path(), "model_v20240101_000000");

        let base = SystemTime::UNIX_EPOCH + Duration::from_secs(1_700_000_000);
        set_mtime(&target, base);
        set_mtime(&real, base + Duration::from_secs(60));

        // The link itself is created now, newer than both directories
        std::os::unix::fs::symlink(&target, dir.path().join("model_v20240301_000000")).unwrap();

        let version = resolve_latest(dir.path()).unwrap();
        assert_eq!(version.id, "model_v20240101_000000");
    }

    #[test]
    fn test_incomplete_latest_is_not_substituted() {
        let dir = tempdir().unwrap();
        let complete = write_fixture_bundle(dir.path(), "model_v20240101_000000");
        let partial = write_fixture_bundle(dir.path(), "model_v20240102_000000");
        fs::remove_file(partial.join(PREPROCESSOR_FILE)).unwrap();

        let base = SystemTime::UNIX_EPOCH + Duration::from_secs(1_700_000_000);
        set_mtime(&complete, base);
        set_mtime(&partial, base + Duration::from_secs(60));

        match resolve_latest(dir.path()).unwrap_err() {
            ArtifactError::Incomplete { version, missing } => {
                assert_eq!(version, "model_v20240102_000000");
                assert_eq!(missing, vec![PREPROCESSOR_FILE.to_string()]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_missing_model_reported() {
        let dir = tempdir().unwrap();
        let path = write_fixture_bundle(dir.path(), "model_v20240101_000000");
        fs::remove_file(path.join(DENSE_MODEL_FILE)).unwrap();

        let err = inspect_version("model_v20240101_000000", &path).unwrap_err();
        assert!(err.to_string().contains("model.onnx or model.json"));
    }

    #[test]
    fn test_inspect_complete_version() {
        let dir = tempdir().unwrap();
        let path = write_fixture_bundle(dir.path(), "model_v20240101_120000");

        let version = inspect_version("model_v20240101_120000", &path).unwrap();
        assert_eq!(version.model_format, ModelFormat::Dense);
        assert!(version.metrics_path.is_some());
        assert!(version.history_path.is_none());
        assert_eq!(
            version.trained_at.unwrap().to_string(),
            "2024-01-01 12:00:00"
        );
    }

    #[test]
    fn test_parse_version_timestamp() {
        assert!(parse_version_timestamp("model_v20240101_120000").is_some());
        assert!(parse_version_timestamp("model_vlatest").is_none());
        assert!(parse_version_timestamp("other_20240101_120000").is_none());
    }
}
