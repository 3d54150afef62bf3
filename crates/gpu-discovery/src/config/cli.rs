use std::path::PathBuf;

use clap::Args;
use clap::Parser;
use clap::Subcommand;
use utils::version;

use crate::source::DEFAULT_LABEL_NAMESPACE;

#[derive(Parser)]
#[command(about, long_about, version = &**version::VERSION)]
pub struct Cli {
    #[arg(
        long,
        global = true,
        env = "GPU_DISCOVERY_CONFIG",
        value_hint = clap::ValueHint::FilePath,
        help = "Path to the worker config file, e.g. /etc/kubernetes/node-feature-discovery/nfd-worker.conf"
    )]
    pub config: Option<PathBuf>,

    #[arg(
        long,
        global = true,
        env = "SYSFS_ROOT",
        value_hint = clap::ValueHint::DirPath,
        help = "Mount point of sysfs, e.g. /host-sys inside a container [default: /sys]"
    )]
    pub sysfs_root: Option<PathBuf>,

    #[arg(
        long,
        global = true,
        help = "Skip the vendor management library and only scan PCI devices"
    )]
    pub no_accelerator: bool,

    #[arg(
        short,
        long,
        global = true,
        action = clap::ArgAction::Count,
        help = "Increase log verbosity (-v debug, -vv trace); RUST_LOG takes precedence"
    )]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Discover features and print node labels
    Labels(LabelsArgs),
    /// Discover features and print the raw feature snapshot as JSON
    Features,
}

#[derive(Args, Clone)]
pub struct LabelsArgs {
    #[arg(
        long,
        value_hint = clap::ValueHint::FilePath,
        help = "Write labels to this feature file instead of stdout"
    )]
    pub output_file: Option<PathBuf>,

    #[arg(
        long,
        default_value = DEFAULT_LABEL_NAMESPACE,
        help = "Prefix of the emitted label names"
    )]
    pub namespace: String,
}
