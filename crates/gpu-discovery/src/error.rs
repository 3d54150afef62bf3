//! Error contexts reported by discovery.

use core::error::Error;

use derive_more::Display;
use error_stack::Report;

/// Result type for discovery operations.
pub type DiscoveryResult<T> = Result<T, Report<DiscoveryError>>;

/// Errors surfaced by the discovery sources and the registry.
#[derive(Debug, Display)]
pub enum DiscoveryError {
    /// The sysfs PCI device directory could not be listed
    #[display("failed to list PCI devices under {path}")]
    SysfsUnavailable { path: String },

    /// A single sysfs attribute file could not be read
    #[display("failed to read device attribute {attribute}")]
    AttributeRead { attribute: String },

    /// A mandatory attribute of a PCI device is unreadable
    #[display("failed to read device {device}")]
    DeviceRead { device: String },

    /// The management library could not be initialized
    #[display("failed to initialize management library")]
    SdkInit,

    /// A global management library query failed
    #[display("failed to query {operation} from management library")]
    SdkQuery { operation: String },

    #[display("failed to detect PCI devices")]
    PciDetection,

    #[display("failed to detect {vendor} devices")]
    AcceleratorDetection { vendor: String },

    #[display("feature source {name} is already registered")]
    DuplicateSource { name: String },

    #[display("failed to write feature file {path}")]
    FeatureFile { path: String },

    #[display("invalid configuration: {message}")]
    Config { message: String },
}

impl Error for DiscoveryError {}
