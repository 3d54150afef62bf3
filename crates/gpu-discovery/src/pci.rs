//! sysfs based PCI device enumeration
//!
//! Every PCI function shows up as a directory under `bus/pci/devices` of the
//! sysfs mount. Each attribute of the function is a small text file holding a
//! hex value such as `0x10de`.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use api_types::InstanceFeature;
use error_stack::ResultExt;

use crate::error::DiscoveryError;
use crate::error::DiscoveryResult;

/// Location of the PCI device directories relative to the sysfs root.
pub const PCI_DEVICES_DIR: &str = "bus/pci/devices";

/// Attributes every device must expose; a device missing one is dropped.
pub const MANDATORY_DEV_ATTRS: [&str; 5] = [
    "class",
    "vendor",
    "device",
    "subsystem_vendor",
    "subsystem_device",
];

/// Best-effort attributes, omitted when unreadable.
pub const OPTIONAL_DEV_ATTRS: [&str; 3] = [
    "sriov_totalvfs",
    "iommu_group/type",
    "iommu/intel-iommu/version",
];

/// Read a single PCI device attribute.
///
/// The value is trimmed and stripped of its `0x` prefix. The `class`
/// attribute keeps only its first four characters so that the programming
/// interface byte is dropped from the raw class code.
pub fn read_single_attribute(dev_path: &Path, attr_name: &str) -> DiscoveryResult<String> {
    let raw = fs::read_to_string(dev_path.join(attr_name)).change_context(
        DiscoveryError::AttributeRead {
            attribute: attr_name.to_string(),
        },
    )?;
    Ok(normalize_attribute(attr_name, &raw))
}

fn normalize_attribute(attr_name: &str, raw: &str) -> String {
    let trimmed = raw.trim();
    // strip after trimming: " 0x1e3e\n" must become "1e3e"
    let value = trimmed.strip_prefix("0x").unwrap_or(trimmed);

    if attr_name == "class" {
        value.chars().take(4).collect()
    } else {
        value.to_string()
    }
}

/// Read all attributes of one PCI device.
pub fn read_device_info(dev_path: &Path) -> DiscoveryResult<InstanceFeature> {
    let mut attrs = BTreeMap::new();

    for attr in MANDATORY_DEV_ATTRS {
        let value = read_single_attribute(dev_path, attr).change_context(
            DiscoveryError::DeviceRead {
                device: dev_path.display().to_string(),
            },
        )?;
        attrs.insert(attr.to_string(), value);
    }

    for attr in OPTIONAL_DEV_ATTRS {
        if let Ok(value) = read_single_attribute(dev_path, attr) {
            attrs.insert(attr.to_string(), value);
        }
    }

    Ok(InstanceFeature::new(attrs))
}

/// Detect the PCI devices below `sysfs_root` and read their attributes.
///
/// Devices are visited in file name order. A device with an unreadable
/// mandatory attribute is logged and skipped; only a failure to list the
/// device directory itself is returned as an error.
pub fn detect_pci(sysfs_root: &Path) -> DiscoveryResult<Vec<InstanceFeature>> {
    let base_path = sysfs_root.join(PCI_DEVICES_DIR);
    let unavailable = || DiscoveryError::SysfsUnavailable {
        path: base_path.display().to_string(),
    };

    let mut entries = fs::read_dir(&base_path)
        .change_context_lazy(unavailable)?
        .collect::<Result<Vec<_>, _>>()
        .change_context_lazy(unavailable)?;
    entries.sort_by_key(|entry| entry.file_name());

    let mut devices = Vec::with_capacity(entries.len());
    for entry in entries {
        match read_device_info(&entry.path()) {
            Ok(info) => devices.push(info),
            Err(err) => {
                tracing::error!("skipping PCI device: {err:#}");
            }
        }
    }

    tracing::debug!(
        count = devices.len(),
        path = %base_path.display(),
        "Discovered PCI devices"
    );

    Ok(devices)
}
