//! Shared feature type definitions
//!
//! This crate contains the data model exchanged between discovery sources and
//! their consumers: attribute sets, device instances, the per-pass feature
//! snapshot and the flat label map handed to the node-labeling pipeline.

use std::collections::BTreeMap;
use std::fmt;

use serde::Deserialize;
use serde::Serialize;

/// Scalar facts about the host or a global subsystem, e.g. driver version.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeFeatureSet {
    pub elements: BTreeMap<String, String>,
}

impl AttributeFeatureSet {
    pub fn new(elements: BTreeMap<String, String>) -> Self {
        Self { elements }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.elements.get(key).map(String::as_str)
    }
}

/// One discovered device (PCI function or accelerator).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstanceFeature {
    pub attributes: BTreeMap<String, String>,
}

impl InstanceFeature {
    pub fn new(attributes: BTreeMap<String, String>) -> Self {
        Self { attributes }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(String::as_str)
    }
}

/// Ordered sequence of instances, in enumeration order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstanceFeatureSet {
    pub elements: Vec<InstanceFeature>,
}

impl InstanceFeatureSet {
    pub fn new(elements: Vec<InstanceFeature>) -> Self {
        Self { elements }
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }
}

/// Feature snapshot produced by a single discovery pass.
///
/// A snapshot is never updated in place: every discovery builds a new one and
/// the previous value is dropped.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Features {
    pub attributes: BTreeMap<String, AttributeFeatureSet>,
    pub instances: BTreeMap<String, InstanceFeatureSet>,
}

impl Features {
    pub fn new() -> Self {
        Self::default()
    }

    /// Instances stored under `name`, empty when the feature was not discovered.
    pub fn instances_of(&self, name: &str) -> &[InstanceFeature] {
        self.instances
            .get(name)
            .map(|set| set.elements.as_slice())
            .unwrap_or(&[])
    }

    pub fn attribute(&self, feature: &str, key: &str) -> Option<&str> {
        self.attributes.get(feature).and_then(|set| set.get(key))
    }
}

/// Value of a single node label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LabelValue {
    Bool(bool),
    Text(String),
}

impl fmt::Display for LabelValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LabelValue::Bool(value) => write!(f, "{value}"),
            LabelValue::Text(value) => f.write_str(value),
        }
    }
}

impl From<bool> for LabelValue {
    fn from(value: bool) -> Self {
        LabelValue::Bool(value)
    }
}

impl From<String> for LabelValue {
    fn from(value: String) -> Self {
        LabelValue::Text(value)
    }
}

impl From<&str> for LabelValue {
    fn from(value: &str) -> Self {
        LabelValue::Text(value.to_string())
    }
}

/// Flat label map consumed by the labeling pipeline.
pub type FeatureLabels = BTreeMap<String, LabelValue>;

#[cfg(test)]
mod tests {
    use similar_asserts::assert_eq;

    use super::*;

    #[test]
    fn missing_instances_are_empty() {
        let features = Features::new();
        assert!(features.instances_of("pci_dev").is_empty());
        assert_eq!(features.attribute("gpu_info", "driver_version"), None);
    }

    #[test]
    fn label_values_render_like_node_labels() {
        assert_eq!(LabelValue::from(true).to_string(), "true");
        assert_eq!(LabelValue::from("bi-100").to_string(), "bi-100");
    }

    #[test]
    fn snapshot_serializes_to_json() {
        let mut features = Features::new();
        features.instances.insert(
            "pci_dev".to_string(),
            InstanceFeatureSet::new(vec![InstanceFeature::new(BTreeMap::from([(
                "class".to_string(),
                "0300".to_string(),
            )]))]),
        );

        let json = serde_json::to_value(&features).unwrap();
        assert_eq!(
            json["instances"]["pci_dev"]["elements"][0]["attributes"]["class"],
            "0300"
        );
    }
}
