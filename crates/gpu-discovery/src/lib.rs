//! GPU feature discovery
//!
//! Detects GPU hardware on a node and publishes it as labels for a
//! node-feature-discovery style labeling pipeline:
//!
//! - [`pci`] scans the sysfs PCI tree
//! - [`accelerator`] queries a vendor management library (NVML or compatible)
//! - [`labels`] turns the discovered features into flat labels
//! - [`source`] ties both into a [`source::GpuSource`] held by an explicit
//!   [`source::SourceRegistry`]

pub mod accelerator;
pub mod config;
pub mod error;
pub mod feature_file;
pub mod labels;
#[cfg(any(test, feature = "test-util"))]
pub mod mock;
pub mod pci;
pub mod source;

pub use error::DiscoveryError;
pub use error::DiscoveryResult;
