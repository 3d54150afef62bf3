//! Translation of accelerator features into node labels
//!
//! Labels produced for a vendor `v`:
//!
//! - `v.present = true` when at least one device was discovered
//! - `v.driver_version = <version>`
//! - `v.<model>.present = true` for every discovered model
//! - `v.device_index.<index> = <model>`

use api_types::FeatureLabels;
use api_types::Features;
use api_types::LabelValue;

use crate::accelerator::device_feature_name;
use crate::accelerator::info_feature_name;
use crate::accelerator::DEVICE_INDEX;
use crate::accelerator::DEVICE_NAME;
use crate::accelerator::DRIVER_VERSION;

/// Derive the model part of a label from the raw device name.
///
/// `"Iluvatar BI-100"` becomes `"bi-100"` for vendor `iluvatar`.
pub fn normalize_model(vendor: &str, device_name: &str) -> String {
    let lowered = device_name.to_lowercase();
    let vendor = vendor.to_lowercase();
    let stripped = if vendor.is_empty() {
        lowered
    } else {
        lowered.replace(&vendor, "")
    };
    stripped.trim().to_string()
}

/// Build the label map of `vendor` from a feature snapshot.
///
/// Missing features simply produce no labels.
pub fn format_labels(vendor: &str, features: &Features) -> FeatureLabels {
    let mut labels = FeatureLabels::new();
    let devices = features.instances_of(&device_feature_name(vendor));

    if !devices.is_empty() {
        labels.insert(format!("{vendor}.present"), LabelValue::Bool(true));
    }

    if let Some(version) = features.attribute(&info_feature_name(vendor), DRIVER_VERSION) {
        labels.insert(
            format!("{vendor}.{DRIVER_VERSION}"),
            LabelValue::from(version),
        );
    }

    for device in devices {
        let Some(name) = device.get(DEVICE_NAME) else {
            continue;
        };
        let model = normalize_model(vendor, name);
        if model.is_empty() {
            tracing::debug!(name, "device name carries no model, skipping labels");
            continue;
        }

        labels.insert(format!("{vendor}.{model}.present"), LabelValue::Bool(true));
        if let Some(index) = device.get(DEVICE_INDEX) {
            labels.insert(
                format!("{vendor}.{DEVICE_INDEX}.{index}"),
                LabelValue::Text(model),
            );
        }
    }

    labels
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use api_types::AttributeFeatureSet;
    use api_types::InstanceFeature;
    use api_types::InstanceFeatureSet;
    use similar_asserts::assert_eq;

    use super::*;

    fn device(index: &str, name: &str) -> InstanceFeature {
        InstanceFeature::new(BTreeMap::from([
            (DEVICE_INDEX.to_string(), index.to_string()),
            (DEVICE_NAME.to_string(), name.to_string()),
        ]))
    }

    fn snapshot(vendor: &str, version: Option<&str>, devices: Vec<InstanceFeature>) -> Features {
        let mut features = Features::new();
        if let Some(version) = version {
            features.attributes.insert(
                info_feature_name(vendor),
                AttributeFeatureSet::new(BTreeMap::from([(
                    DRIVER_VERSION.to_string(),
                    version.to_string(),
                )])),
            );
        }
        features
            .instances
            .insert(device_feature_name(vendor), InstanceFeatureSet::new(devices));
        features
    }

    #[test]
    fn model_is_lowercased_and_stripped_of_vendor() {
        assert_eq!(normalize_model("acme", "ACME Turbo X"), "turbo x");
        assert_eq!(normalize_model("iluvatar", "Iluvatar BI-100"), "bi-100");
        assert_eq!(normalize_model("vendor", "Vendor BI-100"), "bi-100");
        assert_eq!(normalize_model("acme", "  Turbo  "), "turbo");
    }

    #[test]
    fn single_device() {
        let features = snapshot("acme", None, vec![device("0", "ACME Turbo X")]);

        let labels = format_labels("acme", &features);

        let expected = FeatureLabels::from([
            ("acme.present".to_string(), LabelValue::Bool(true)),
            ("acme.turbo x.present".to_string(), LabelValue::Bool(true)),
            (
                "acme.device_index.0".to_string(),
                LabelValue::Text("turbo x".to_string()),
            ),
        ]);
        assert_eq!(labels, expected);
    }

    #[test]
    fn driver_version_is_labelled() {
        let features = snapshot("vendor", Some("1.2.3"), vec![device("0", "Vendor BI-100")]);

        let labels = format_labels("vendor", &features);

        assert_eq!(
            labels.get("vendor.driver_version"),
            Some(&LabelValue::Text("1.2.3".to_string()))
        );
        assert_eq!(
            labels.get("vendor.device_index.0"),
            Some(&LabelValue::Text("bi-100".to_string()))
        );
        assert_eq!(labels.len(), 4);
    }

    #[test]
    fn identical_models_share_presence_label() {
        let features = snapshot(
            "iluvatar",
            None,
            vec![device("0", "Iluvatar BI-100"), device("1", "Iluvatar BI-100")],
        );

        let labels = format_labels("iluvatar", &features);

        assert_eq!(labels.len(), 4);
        assert!(labels.contains_key("iluvatar.device_index.0"));
        assert!(labels.contains_key("iluvatar.device_index.1"));
    }

    #[test]
    fn no_devices_means_no_presence() {
        let features = snapshot("acme", Some("2.0"), vec![]);

        let labels = format_labels("acme", &features);

        assert_eq!(labels.len(), 1);
        assert!(!labels.contains_key("acme.present"));
    }

    #[test]
    fn empty_snapshot_has_no_labels() {
        assert!(format_labels("acme", &Features::new()).is_empty());
    }

    #[test]
    fn nameless_device_only_counts_towards_presence() {
        let nameless = InstanceFeature::new(BTreeMap::from([(
            DEVICE_INDEX.to_string(),
            "0".to_string(),
        )]));
        let features = snapshot("acme", None, vec![nameless, device("1", "ACME")]);

        let labels = format_labels("acme", &features);

        assert_eq!(
            labels,
            FeatureLabels::from([("acme.present".to_string(), LabelValue::Bool(true))])
        );
    }
}
