use std::path::PathBuf;

use api_types::FeatureLabels;
use api_types::Features;
use api_types::InstanceFeatureSet;
use error_stack::ResultExt;

use super::ConfigurableSource;
use super::FeatureSource;
use super::LabelSource;
use crate::accelerator;
use crate::accelerator::ManagementLibrary;
use crate::config::GpuConfig;
use crate::error::DiscoveryError;
use crate::error::DiscoveryResult;
use crate::labels;
use crate::pci;

/// Name of this feature source
pub const NAME: &str = "gpu";

/// Instance feature holding all discovered PCI devices.
pub const PCI_DEVICE_FEATURE: &str = "pci_dev";

/// GPU feature source: PCI scan plus the vendor management library.
pub struct GpuSource<L> {
    config: GpuConfig,
    sysfs_root: PathBuf,
    library: L,
    features: Features,
}

impl<L: ManagementLibrary> GpuSource<L> {
    pub fn new(config: GpuConfig, sysfs_root: impl Into<PathBuf>, library: L) -> Self {
        Self {
            config,
            sysfs_root: sysfs_root.into(),
            library,
            features: Features::new(),
        }
    }

    fn detect(&self) -> DiscoveryResult<Features> {
        let mut features = Features::new();

        // TODO: drop devices whose class does not match `device_class_whitelist`
        // once the label pipeline publishes PCI labels.
        let devices =
            pci::detect_pci(&self.sysfs_root).change_context(DiscoveryError::PciDetection)?;
        features.instances.insert(
            PCI_DEVICE_FEATURE.to_string(),
            InstanceFeatureSet::new(devices),
        );

        if self.config.enable_accelerator {
            let vendor = &self.config.vendor;
            let (attrs, devices) = accelerator::detect_accelerators(&self.library)
                .change_context_lazy(|| DiscoveryError::AcceleratorDetection {
                    vendor: vendor.clone(),
                })?;
            features
                .attributes
                .insert(accelerator::info_feature_name(vendor), attrs);
            features.instances.insert(
                accelerator::device_feature_name(vendor),
                InstanceFeatureSet::new(devices),
            );
        }

        Ok(features)
    }
}

impl<L: ManagementLibrary> FeatureSource for GpuSource<L> {
    fn name(&self) -> &str {
        NAME
    }

    fn discover(&mut self) -> DiscoveryResult<()> {
        self.features = Features::new();
        self.features = self.detect()?;

        tracing::debug!(features = ?self.features, "discovered gpu features");

        Ok(())
    }

    fn features(&self) -> &Features {
        &self.features
    }
}

impl<L: ManagementLibrary> LabelSource for GpuSource<L> {
    fn labels(&self) -> DiscoveryResult<FeatureLabels> {
        Ok(labels::format_labels(&self.config.vendor, &self.features))
    }
}

impl<L> ConfigurableSource for GpuSource<L> {
    type Config = GpuConfig;

    fn config(&self) -> &GpuConfig {
        &self.config
    }

    fn set_config(&mut self, config: GpuConfig) {
        self.config = config;
    }
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::Path;

    use api_types::LabelValue;
    use similar_asserts::assert_eq;
    use tempfile::TempDir;
    use test_log::test;

    use super::*;
    use crate::mock::MockLibrary;

    fn sysfs_with_gpu() -> TempDir {
        let root = TempDir::new().unwrap();
        let dev = root.path().join(pci::PCI_DEVICES_DIR).join("0000:01:00.0");
        fs::create_dir_all(&dev).unwrap();
        for (name, value) in [
            ("class", "0x030000\n"),
            ("vendor", "0x1e3e\n"),
            ("device", "0x0001\n"),
            ("subsystem_vendor", "0x1e3e\n"),
            ("subsystem_device", "0x0001\n"),
        ] {
            fs::write(dev.join(name), value).unwrap();
        }
        root
    }

    fn config(vendor: &str) -> GpuConfig {
        GpuConfig {
            vendor: vendor.to_string(),
            ..GpuConfig::default()
        }
    }

    #[test]
    fn features_are_empty_before_discovery() {
        let source = GpuSource::new(GpuConfig::default(), "/sys", MockLibrary::new("1.0"));
        assert_eq!(source.features(), &Features::new());
        assert!(source.labels().unwrap().is_empty());
    }

    #[test]
    fn discover_collects_pci_and_accelerators() {
        let sysfs = sysfs_with_gpu();
        let library = MockLibrary::new("1.2.3")
            .with_device("Vendor BI-100")
            .with_failing_name();
        let mut source = GpuSource::new(config("vendor"), sysfs.path(), library.clone());

        source.discover().unwrap();

        let features = source.features();
        assert_eq!(features.instances_of(PCI_DEVICE_FEATURE).len(), 1);
        assert_eq!(
            features.attribute("vendor_info", accelerator::DRIVER_VERSION),
            Some("1.2.3")
        );
        assert_eq!(features.instances_of("vendor_dev").len(), 1);
        assert_eq!(library.shutdown_calls(), 1);

        let labels = source.labels().unwrap();
        let expected = FeatureLabels::from([
            ("vendor.present".to_string(), LabelValue::Bool(true)),
            (
                "vendor.driver_version".to_string(),
                LabelValue::Text("1.2.3".to_string()),
            ),
            ("vendor.bi-100.present".to_string(), LabelValue::Bool(true)),
            (
                "vendor.device_index.0".to_string(),
                LabelValue::Text("bi-100".to_string()),
            ),
        ]);
        assert_eq!(labels, expected);
    }

    #[test]
    fn accelerator_can_be_disabled() {
        let sysfs = sysfs_with_gpu();
        let library = MockLibrary::new("1.2.3").with_device("Vendor BI-100");
        let mut source = GpuSource::new(
            GpuConfig {
                enable_accelerator: false,
                ..config("vendor")
            },
            sysfs.path(),
            library.clone(),
        );

        source.discover().unwrap();

        assert_eq!(library.init_calls(), 0);
        assert!(source.features().instances_of("vendor_dev").is_empty());
        assert!(source.labels().unwrap().is_empty());
    }

    #[test]
    fn sdk_failure_fails_discovery_and_clears_snapshot() {
        let sysfs = sysfs_with_gpu();
        let mut source = GpuSource::new(
            config("vendor"),
            sysfs.path(),
            MockLibrary::new("1.2.3").with_device("Vendor BI-100"),
        );
        source.discover().unwrap();
        assert!(!source.labels().unwrap().is_empty());

        let failing = MockLibrary::new("1.2.3").fail_init();
        let mut source = GpuSource {
            library: failing.clone(),
            ..source
        };
        let err = source.discover().unwrap_err();

        assert!(matches!(
            err.current_context(),
            DiscoveryError::AcceleratorDetection { vendor } if vendor == "vendor"
        ));
        assert_eq!(source.features(), &Features::new());
        assert_eq!(failing.shutdown_calls(), 0);
    }

    #[test]
    fn missing_sysfs_fails_discovery() {
        let mut source = GpuSource::new(
            config("vendor"),
            Path::new("/nonexistent-sysfs"),
            MockLibrary::new("1.2.3"),
        );

        let err = source.discover().unwrap_err();

        assert!(matches!(err.current_context(), DiscoveryError::PciDetection));
        assert!(format!("{err:#}").contains("failed to list PCI devices"));
    }

    #[test]
    fn rediscovery_replaces_snapshot() {
        let sysfs = sysfs_with_gpu();
        let mut source = GpuSource::new(
            config("vendor"),
            sysfs.path(),
            MockLibrary::new("1.0").with_device("Vendor BI-100"),
        );
        source.discover().unwrap();

        let device_dir = sysfs.path().join(pci::PCI_DEVICES_DIR).join("0000:01:00.0");
        fs::remove_dir_all(device_dir).unwrap();
        source.discover().unwrap();

        assert!(source.features().instances_of(PCI_DEVICE_FEATURE).is_empty());
    }

    #[test]
    fn config_round_trip() {
        let mut source = GpuSource::new(GpuConfig::default(), "/sys", MockLibrary::new("1.0"));
        assert_eq!(source.new_config(), GpuConfig::default());

        source.set_config(config("acme"));

        assert_eq!(source.config().vendor, "acme");
        assert_eq!(source.name(), NAME);
        assert_eq!(source.priority(), 0);
    }
}
