//! Feature sources and their registry
//!
//! A source discovers a [`Features`] snapshot and turns it into labels. The
//! binary builds a [`SourceRegistry`] and registers every source explicitly.

pub mod gpu;
pub mod registry;

use api_types::FeatureLabels;
use api_types::Features;

use crate::error::DiscoveryResult;

pub use gpu::GpuSource;
pub use registry::SourceRegistry;
pub use registry::DEFAULT_LABEL_NAMESPACE;

/// A source of discovered features.
pub trait FeatureSource {
    /// Name of the source, used as label prefix.
    fn name(&self) -> &str;

    /// Run discovery, replacing the previous snapshot.
    fn discover(&mut self) -> DiscoveryResult<()>;

    /// Snapshot of the last discovery, empty before the first one.
    fn features(&self) -> &Features;
}

/// A feature source that publishes labels.
pub trait LabelSource: FeatureSource {
    /// Sources with a higher priority override labels of lower ones.
    fn priority(&self) -> i32 {
        0
    }

    fn labels(&self) -> DiscoveryResult<FeatureLabels>;
}

/// A source with a typed configuration.
pub trait ConfigurableSource {
    type Config: Clone + Default;

    fn new_config(&self) -> Self::Config {
        Self::Config::default()
    }

    fn config(&self) -> &Self::Config;

    fn set_config(&mut self, config: Self::Config);
}
