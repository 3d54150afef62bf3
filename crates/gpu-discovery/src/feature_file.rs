//! Feature file output
//!
//! The labeling pipeline reads every non-hidden file of its `features.d`
//! directory as `key=value` lines. Files are replaced through a hidden
//! temporary sibling so a reader never sees partial content.

use std::fmt::Write;
use std::fs;
use std::path::Path;
use std::path::PathBuf;

use api_types::FeatureLabels;
use error_stack::ResultExt;

use crate::error::DiscoveryError;
use crate::error::DiscoveryResult;

/// Render labels in the `key=value` feature file format.
pub fn to_feature_file(labels: &FeatureLabels) -> String {
    let mut out = String::new();
    for (key, value) in labels {
        // writing to a String cannot fail
        let _ = writeln!(out, "{key}={value}");
    }
    out
}

/// Hidden temporary path next to `path`, e.g. `features.d/.gpu.tmp`.
fn temp_path_for(path: &Path) -> PathBuf {
    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy())
        .unwrap_or_default();
    path.with_file_name(format!(".{file_name}.tmp"))
}

/// Atomically replace `path` with `content`.
pub fn write_feature_file(path: &Path, content: &str) -> DiscoveryResult<()> {
    let failed = || DiscoveryError::FeatureFile {
        path: path.display().to_string(),
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .change_context_lazy(failed)
            .attach_printable_lazy(|| format!("create directory {}", parent.display()))?;
    }

    let tmp_path = temp_path_for(path);
    fs::write(&tmp_path, content)
        .change_context_lazy(failed)
        .attach_printable_lazy(|| format!("write {}", tmp_path.display()))?;

    if let Err(err) = fs::rename(&tmp_path, path) {
        let _ = fs::remove_file(&tmp_path);
        return Err(err)
            .change_context_lazy(failed)
            .attach_printable_lazy(|| format!("rename {}", tmp_path.display()));
    }

    tracing::info!("Labels written to {}", path.display());
    Ok(())
}
