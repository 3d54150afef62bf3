//! NVIDIA Management Library (NVML) backend
//!
//! Also serves NVML-compatible vendor libraries by pointing the loader at a
//! different shared object.

use std::ffi::OsStr;
use std::path::PathBuf;

use error_stack::ResultExt;
use nvml_wrapper::Device as NvmlDevice;
use nvml_wrapper::Nvml;

use super::ManagementLibrary;
use super::ManagementSession;
use super::SdkError;
use super::SdkResult;

/// Library loaded when the default NVML lookup fails.
pub const FALLBACK_LIB_PATH: &str = "libnvidia-ml.so.1";

/// Management library backed by `nvml-wrapper`.
#[derive(Debug, Clone, Default)]
pub struct NvmlLibrary {
    lib_path: Option<PathBuf>,
}

impl NvmlLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load the management library from `lib_path` instead of the default
    /// NVML lookup.
    pub fn with_lib_path(lib_path: impl Into<PathBuf>) -> Self {
        Self {
            lib_path: Some(lib_path.into()),
        }
    }
}

impl ManagementLibrary for NvmlLibrary {
    type Session = NvmlSession;

    fn init(&self) -> SdkResult<NvmlSession> {
        if let Some(lib_path) = &self.lib_path {
            let nvml = Nvml::builder()
                .lib_path(lib_path.as_os_str())
                .init()
                .change_context(SdkError::Init)
                .attach_printable_lazy(|| format!("library path {}", lib_path.display()))?;
            tracing::info!("Management library loaded from {}", lib_path.display());
            return Ok(NvmlSession { nvml });
        }

        match Nvml::init() {
            Ok(nvml) => {
                tracing::info!("NVML initialized successfully");
                Ok(NvmlSession { nvml })
            }
            Err(err) => {
                tracing::warn!(
                    "Standard NVML init failed ({err}), trying with explicit library path"
                );
                let nvml = Nvml::builder()
                    .lib_path(OsStr::new(FALLBACK_LIB_PATH))
                    .init()
                    .change_context(SdkError::Init)
                    .attach_printable(format!("library path {FALLBACK_LIB_PATH}"))?;
                tracing::info!("NVML initialized with explicit library path");
                Ok(NvmlSession { nvml })
            }
        }
    }
}

/// An initialized NVML handle.
pub struct NvmlSession {
    nvml: Nvml,
}

impl ManagementSession for NvmlSession {
    type Device<'s> = NvmlDevice<'s>;

    fn driver_version(&self) -> SdkResult<String> {
        self.nvml
            .sys_driver_version()
            .change_context(SdkError::Call {
                call: "sys_driver_version",
            })
    }

    fn device_count(&self) -> SdkResult<u32> {
        self.nvml.device_count().change_context(SdkError::Call {
            call: "device_count",
        })
    }

    fn device_by_index(&self, index: u32) -> SdkResult<NvmlDevice<'_>> {
        self.nvml
            .device_by_index(index)
            .change_context(SdkError::Call {
                call: "device_by_index",
            })
    }

    fn device_name(&self, device: &NvmlDevice<'_>) -> SdkResult<String> {
        device.name().change_context(SdkError::Call { call: "name" })
    }

    fn shutdown(self) -> SdkResult<()> {
        self.nvml.shutdown().change_context(SdkError::Shutdown)
    }
}
