use std::io::Write;

use anyhow::Context;
use anyhow::Result;
use clap::Parser;
use gpu_discovery::accelerator::NvmlLibrary;
use gpu_discovery::config;
use gpu_discovery::config::Cli;
use gpu_discovery::config::Commands;
use gpu_discovery::config::LabelsArgs;
use gpu_discovery::config::WorkerConfig;
use gpu_discovery::feature_file::to_feature_file;
use gpu_discovery::feature_file::write_feature_file;
use gpu_discovery::source::GpuSource;
use gpu_discovery::source::SourceRegistry;
use utils::version;

/// Sets up global panic hooks.
fn setup_global_hooks() {
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        default_hook(panic_info);
        tracing::error!("Thread panicked: {}", panic_info);
    }));
}

fn main() -> Result<()> {
    setup_global_hooks();
    let cli = Cli::parse();
    utils::logging::init(cli.verbose);

    tracing::info!("Starting gpu-discovery {}", &**version::VERSION);

    let worker_config = match &cli.config {
        Some(path) => config::load_worker_config(path)
            .map_err(|e| anyhow::anyhow!("Failed to load worker config: {e:?}"))?,
        None => WorkerConfig::default(),
    };

    let namespace = match &cli.command {
        Commands::Labels(args) => args.namespace.clone(),
        Commands::Features => gpu_discovery::source::DEFAULT_LABEL_NAMESPACE.to_string(),
    };
    let mut registry = build_registry(&cli, worker_config, namespace)?;

    let failed = registry.discover_all();
    if !failed.is_empty() {
        anyhow::bail!("feature discovery failed for sources: {}", failed.join(", "));
    }

    match cli.command {
        Commands::Labels(args) => write_labels(&registry, &args),
        Commands::Features => {
            let features = serde_json::to_string_pretty(&registry.features())
                .context("serialize feature snapshot failed")?;
            println!("{features}");
            Ok(())
        }
    }
}

/// Composition root: build every source and register it explicitly.
fn build_registry(
    cli: &Cli,
    worker_config: WorkerConfig,
    namespace: String,
) -> Result<SourceRegistry> {
    let sysfs_root = worker_config.resolve_sysfs_root(cli.sysfs_root.as_deref());
    let mut gpu_config = worker_config.sources.gpu;
    if cli.no_accelerator {
        gpu_config.enable_accelerator = false;
    }

    let library = match &gpu_config.sdk_library_path {
        Some(path) => NvmlLibrary::with_lib_path(path),
        None => NvmlLibrary::new(),
    };

    tracing::info!(
        vendor = %gpu_config.vendor,
        accelerator = gpu_config.enable_accelerator,
        sysfs_root = %sysfs_root.display(),
        "Configuring gpu source"
    );

    let mut registry = SourceRegistry::new(namespace);
    registry
        .register(Box::new(GpuSource::new(
            gpu_config,
            sysfs_root,
            library,
        )))
        .map_err(|e| anyhow::anyhow!("{e:?}"))?;

    Ok(registry)
}

fn write_labels(registry: &SourceRegistry, args: &LabelsArgs) -> Result<()> {
    let labels = registry.labels();
    tracing::info!("Discovered {} label(s)", labels.len());

    let content = to_feature_file(&labels);
    match &args.output_file {
        Some(path) => {
            write_feature_file(path, &content).map_err(|e| anyhow::anyhow!("{e:?}"))
        }
        None => {
            std::io::stdout()
                .write_all(content.as_bytes())
                .context("write labels to stdout failed")?;
            Ok(())
        }
    }
}
