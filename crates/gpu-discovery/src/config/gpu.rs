use std::path::PathBuf;

use serde::Deserialize;
use serde::Serialize;

/// Vendor used for accelerator labels when none is configured.
pub const DEFAULT_VENDOR: &str = "iluvatar";

/// Configuration of the GPU feature source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default, deny_unknown_fields)]
pub struct GpuConfig {
    /// PCI class prefixes of interesting devices (display, co-processor,
    /// processing accelerators). Not applied to the scan yet.
    pub device_class_whitelist: Vec<String>,
    /// PCI attributes meant to compose device labels.
    pub device_label_fields: Vec<String>,
    /// Vendor name used as label prefix and stripped from model names.
    pub vendor: String,
    /// Query the vendor management library in addition to the PCI scan.
    pub enable_accelerator: bool,
    /// Explicit management library to load, e.g. `libixml.so`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sdk_library_path: Option<PathBuf>,
}

impl Default for GpuConfig {
    fn default() -> Self {
        Self {
            device_class_whitelist: vec!["03".to_string(), "0b40".to_string(), "12".to_string()],
            device_label_fields: vec!["class".to_string(), "vendor".to_string()],
            vendor: DEFAULT_VENDOR.to_string(),
            enable_accelerator: true,
            sdk_library_path: None,
        }
    }
}
