pub mod cli;
pub mod gpu;

use std::fs;
use std::path::Path;
use std::path::PathBuf;

use error_stack::ResultExt;
use serde::Deserialize;

use crate::error::DiscoveryError;
use crate::error::DiscoveryResult;

pub use cli::*;
pub use gpu::*;

/// sysfs mount point used when neither the CLI nor the config sets one.
pub const DEFAULT_SYSFS_ROOT: &str = "/sys";

/// Worker configuration file, one section per feature source.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default, deny_unknown_fields)]
pub struct WorkerConfig {
    /// Mount point of sysfs, e.g. `/host-sys` inside a container.
    pub sysfs_root: Option<PathBuf>,
    pub sources: SourcesConfig,
}

impl WorkerConfig {
    /// sysfs root to scan: `cli_override` first, then the config file, then
    /// [`DEFAULT_SYSFS_ROOT`].
    pub fn resolve_sysfs_root(&self, cli_override: Option<&Path>) -> PathBuf {
        cli_override
            .or(self.sysfs_root.as_deref())
            .unwrap_or(Path::new(DEFAULT_SYSFS_ROOT))
            .to_path_buf()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default, deny_unknown_fields)]
pub struct SourcesConfig {
    pub gpu: GpuConfig,
}

/// Load the worker configuration from a YAML file.
pub fn load_worker_config(path: &Path) -> DiscoveryResult<WorkerConfig> {
    tracing::info!("Loading worker configuration from {:?}", path);

    let yaml_content = fs::read_to_string(path).change_context_lazy(|| DiscoveryError::Config {
        message: format!("cannot read {}", path.display()),
    })?;

    parse_worker_config(&yaml_content)
}

/// Parse a YAML worker configuration. An empty document yields the defaults.
pub fn parse_worker_config(yaml_content: &str) -> DiscoveryResult<WorkerConfig> {
    if yaml_content.trim().is_empty() {
        return Ok(WorkerConfig::default());
    }

    serde_yaml::from_str(yaml_content).change_context(DiscoveryError::Config {
        message: "malformed worker configuration".to_string(),
    })
}
