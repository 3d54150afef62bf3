//! Accelerator discovery through a vendor management library
//!
//! The management library is modelled after NVML: a process-wide init and
//! shutdown pair, global queries (driver version, device count) and per-device
//! queries through a handle obtained by index. Vendors shipping an
//! NVML-compatible library (for example Iluvatar's IXML) are reached through
//! the same [`NvmlLibrary`] backend with a different library path.

pub mod nvml;
mod session;

use std::collections::BTreeMap;

use api_types::AttributeFeatureSet;
use api_types::InstanceFeature;
use derive_more::Display;
use error_stack::Report;
use error_stack::ResultExt;

use crate::error::DiscoveryError;
use crate::error::DiscoveryResult;

pub use nvml::NvmlLibrary;
pub use session::ScopedSession;

pub const DRIVER_VERSION: &str = "driver_version";
pub const DEVICE_COUNT: &str = "device_count";
pub const DEVICE_INDEX: &str = "device_index";
pub const DEVICE_NAME: &str = "device_name";

/// Result type of management library calls.
pub type SdkResult<T> = Result<T, Report<SdkError>>;

/// Failures reported by a management library backend.
#[derive(Debug, Display)]
pub enum SdkError {
    #[display("management library initialization failed")]
    Init,
    #[display("management library call {call} failed")]
    Call { call: &'static str },
    #[display("management library shutdown failed")]
    Shutdown,
}

impl core::error::Error for SdkError {}

/// Entry point of a vendor management library.
pub trait ManagementLibrary {
    type Session: ManagementSession;

    /// Initialize the library and open a session.
    fn init(&self) -> SdkResult<Self::Session>;
}

/// An initialized management library.
///
/// Sessions are released with [`ManagementSession::shutdown`]; use
/// [`ScopedSession`] to make sure that happens on every exit path.
pub trait ManagementSession {
    /// Opaque device handle, valid while the session is open.
    type Device<'s>
    where
        Self: 's;

    fn driver_version(&self) -> SdkResult<String>;

    fn device_count(&self) -> SdkResult<u32>;

    fn device_by_index(&self, index: u32) -> SdkResult<Self::Device<'_>>;

    fn device_name(&self, device: &Self::Device<'_>) -> SdkResult<String>;

    fn shutdown(self) -> SdkResult<()>;
}

/// Name of the attribute feature set holding the global facts of `vendor`.
pub fn info_feature_name(vendor: &str) -> String {
    format!("{vendor}_info")
}

/// Name of the instance feature set holding the devices of `vendor`.
pub fn device_feature_name(vendor: &str) -> String {
    format!("{vendor}_dev")
}

/// Discover accelerators through `library`.
///
/// The library session is opened for the duration of the call and always
/// shut down before returning. Driver version and device count are required;
/// a device whose handle or name cannot be queried is logged and skipped.
pub fn detect_accelerators<L: ManagementLibrary>(
    library: &L,
) -> DiscoveryResult<(AttributeFeatureSet, Vec<InstanceFeature>)> {
    let session = ScopedSession::open(library).change_context(DiscoveryError::SdkInit)?;

    let mut attrs = BTreeMap::new();

    let driver_version = session
        .driver_version()
        .change_context(DiscoveryError::SdkQuery {
            operation: DRIVER_VERSION.to_string(),
        })?;
    attrs.insert(DRIVER_VERSION.to_string(), driver_version);

    let device_count = session
        .device_count()
        .change_context(DiscoveryError::SdkQuery {
            operation: DEVICE_COUNT.to_string(),
        })?;
    attrs.insert(DEVICE_COUNT.to_string(), device_count.to_string());

    let mut devices = Vec::with_capacity(device_count as usize);
    for index in 0..device_count {
        match read_device_info(&*session, index) {
            Ok(info) => devices.push(info),
            Err(err) => {
                tracing::error!(index, "skipping accelerator device: {err:#}");
            }
        }
    }

    tracing::debug!(
        driver_version = ?attrs.get(DRIVER_VERSION),
        device_count,
        discovered = devices.len(),
        "Discovered accelerator devices"
    );

    Ok((AttributeFeatureSet::new(attrs), devices))
}

/// Query the attributes of the device at `index`.
pub fn read_device_info<S: ManagementSession>(
    session: &S,
    index: u32,
) -> SdkResult<InstanceFeature> {
    let mut attrs = BTreeMap::new();

    let device = session
        .device_by_index(index)
        .attach_printable_lazy(|| format!("device index {index}"))?;
    attrs.insert(DEVICE_INDEX.to_string(), index.to_string());

    let name = session
        .device_name(&device)
        .attach_printable_lazy(|| format!("device index {index}"))?;
    attrs.insert(DEVICE_NAME.to_string(), name);

    Ok(InstanceFeature::new(attrs))
}

#[cfg(test)]
mod tests {
    use similar_asserts::assert_eq;
    use test_log::test;

    use super::*;
    use crate::mock::MockLibrary;

    #[test]
    fn failing_device_is_skipped_and_session_released_once() {
        let library = MockLibrary::new("1.2.3")
            .with_device("Vendor BI-100")
            .with_failing_name()
            .with_device("Vendor MR-V100");

        let (attrs, devices) = detect_accelerators(&library).unwrap();

        assert_eq!(attrs.get(DRIVER_VERSION), Some("1.2.3"));
        assert_eq!(attrs.get(DEVICE_COUNT), Some("3"));
        let indexes: Vec<_> = devices.iter().filter_map(|d| d.get(DEVICE_INDEX)).collect();
        assert_eq!(indexes, vec!["0", "2"]);
        assert_eq!(devices[1].get(DEVICE_NAME), Some("Vendor MR-V100"));
        assert_eq!(library.init_calls(), 1);
        assert_eq!(library.shutdown_calls(), 1);
    }

    #[test]
    fn failing_handle_is_skipped() {
        let library = MockLibrary::new("1.2.3")
            .with_device("Vendor BI-100")
            .with_failing_handle();

        let (_, devices) = detect_accelerators(&library).unwrap();

        assert_eq!(devices.len(), 1);
        assert_eq!(devices[0].get(DEVICE_NAME), Some("Vendor BI-100"));
        assert_eq!(library.shutdown_calls(), 1);
    }

    #[test]
    fn driver_version_failure_aborts_and_releases_session() {
        let library = MockLibrary::new("1.2.3")
            .with_device("Vendor BI-100")
            .fail_driver_version();

        let err = detect_accelerators(&library).unwrap_err();

        assert!(matches!(
            err.current_context(),
            DiscoveryError::SdkQuery { operation } if operation == DRIVER_VERSION
        ));
        assert_eq!(library.shutdown_calls(), 1);
    }

    #[test]
    fn device_count_failure_aborts_and_releases_session() {
        let library = MockLibrary::new("1.2.3").fail_device_count();

        let err = detect_accelerators(&library).unwrap_err();

        assert!(matches!(
            err.current_context(),
            DiscoveryError::SdkQuery { operation } if operation == DEVICE_COUNT
        ));
        assert_eq!(library.shutdown_calls(), 1);
    }

    #[test]
    fn init_failure_never_shuts_down() {
        let library = MockLibrary::new("1.2.3").fail_init();

        let err = detect_accelerators(&library).unwrap_err();

        assert!(matches!(err.current_context(), DiscoveryError::SdkInit));
        assert_eq!(library.init_calls(), 1);
        assert_eq!(library.shutdown_calls(), 0);
    }

    #[test]
    fn no_devices() {
        let library = MockLibrary::new("4.0");

        let (attrs, devices) = detect_accelerators(&library).unwrap();

        assert_eq!(attrs.get(DEVICE_COUNT), Some("0"));
        assert!(devices.is_empty());
        assert_eq!(library.shutdown_calls(), 1);
    }

    #[test]
    fn feature_names_follow_vendor() {
        assert_eq!(info_feature_name("iluvatar"), "iluvatar_info");
        assert_eq!(device_feature_name("iluvatar"), "iluvatar_dev");
    }
}
