use std::collections::BTreeMap;
use std::collections::HashSet;

use api_types::FeatureLabels;
use api_types::Features;
use error_stack::Report;

use super::LabelSource;
use crate::error::DiscoveryError;
use crate::error::DiscoveryResult;

/// Label prefix used by node-feature-discovery.
pub const DEFAULT_LABEL_NAMESPACE: &str = "feature.node.kubernetes.io";

/// Explicitly populated set of label sources.
///
/// Labels are published as `<namespace>/<source>-<label>`.
pub struct SourceRegistry {
    namespace: String,
    sources: Vec<Box<dyn LabelSource>>,
    failed: HashSet<String>,
}

impl SourceRegistry {
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            sources: Vec::new(),
            failed: HashSet::new(),
        }
    }

    /// Add a source. Source names must be unique.
    pub fn register(&mut self, source: Box<dyn LabelSource>) -> DiscoveryResult<()> {
        let name = source.name().to_string();
        if self.sources.iter().any(|s| s.name() == name) {
            return Err(Report::new(DiscoveryError::DuplicateSource { name }));
        }
        tracing::debug!(source = %name, "registered feature source");
        self.sources.push(source);
        Ok(())
    }

    pub fn source_names(&self) -> Vec<&str> {
        self.sources.iter().map(|s| s.name()).collect()
    }

    /// Run discovery on every source.
    ///
    /// A failing source is logged and left out of the labels until its next
    /// successful discovery; the other sources are not affected. Returns the
    /// names of the failed sources.
    pub fn discover_all(&mut self) -> Vec<String> {
        self.failed.clear();
        for source in &mut self.sources {
            let name = source.name().to_string();
            match source.discover() {
                Ok(()) => tracing::info!(source = %name, "feature discovery completed"),
                Err(err) => {
                    tracing::error!(source = %name, "feature discovery failed: {err:?}");
                    self.failed.insert(name);
                }
            }
        }
        let mut failed: Vec<_> = self.failed.iter().cloned().collect();
        failed.sort();
        failed
    }

    /// Snapshots of all sources keyed by source name.
    pub fn features(&self) -> BTreeMap<&str, &Features> {
        self.sources
            .iter()
            .map(|s| (s.name(), s.features()))
            .collect()
    }

    /// Merged labels of all healthy sources, evaluated in ascending priority.
    pub fn labels(&self) -> FeatureLabels {
        let mut sources: Vec<_> = self
            .sources
            .iter()
            .filter(|s| !self.failed.contains(s.name()))
            .collect();
        sources.sort_by_key(|s| s.priority());

        let mut labels = FeatureLabels::new();
        for source in sources {
            match source.labels() {
                Ok(source_labels) => {
                    for (key, value) in source_labels {
                        let name = format!("{}/{}-{}", self.namespace, source.name(), key);
                        labels.insert(name, value);
                    }
                }
                Err(err) => {
                    tracing::error!(source = %source.name(), "failed to get labels: {err:?}");
                }
            }
        }
        labels
    }
}
