use std::{path::PathBuf, sync::Arc};

use anyhow::Context;
use clap::{Parser, Subcommand};
use conf_registry::{MemoryRegistry, Registry, RegistryAddress};
use fleet_conf::{
    logging::init_logging, AppConfig, ClusterView, ConfError, ConfWatcher, ConfigTree, PlainText,
    SnapshotComparer,
};
use serde_json::Value;
use tokio::sync::{mpsc, watch};
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "fleet-conf")]
#[command(about = "Watch registry configuration and cluster membership", long_about = None)]
struct Cli {
    /// Service configuration file (YAML)
    #[arg(short, long, env = "FLEET_CONF_CONFIG")]
    config: PathBuf,

    /// Override the registry address from the configuration file
    #[arg(long, env = "FLEET_CONF_REGISTRY")]
    registry: Option<String>,

    /// Override the log level from the configuration file
    #[arg(long, env = "FLEET_CONF_LOG_LEVEL")]
    log_level: Option<String>,

    /// JSON object of `path -> value` preloaded into a local (lm://) registry
    #[arg(long)]
    seed: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Load the configuration once and print a summary
    Check,
    /// Keep watching the registry and log every change
    Watch,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = AppConfig::from_file(&cli.config)?;
    if let Some(registry) = cli.registry {
        config.registry = registry;
    }
    if let Some(level) = cli.log_level {
        config.logging.level = level;
    }
    config.validate().map_err(anyhow::Error::msg)?;
    let _guard = init_logging(&config.logging)?;

    let registry = open_registry(&config, cli.seed.as_deref())?;
    match cli.command {
        Command::Check => check(&config, registry.as_ref()).await,
        Command::Watch => run_watch(&config, registry).await,
    }
}

fn open_registry(
    config: &AppConfig,
    seed: Option<&std::path::Path>,
) -> anyhow::Result<Arc<dyn Registry>> {
    let address = RegistryAddress::parse(&config.registry)?;
    if !address.is_local() {
        anyhow::ensure!(seed.is_none(), "--seed only applies to a local registry");
        return Ok(conf_registry::connect(&config.registry)?);
    }

    let registry = MemoryRegistry::new();
    if let Some(seed) = seed {
        let text = std::fs::read_to_string(seed)
            .with_context(|| format!("failed to read seed {}", seed.display()))?;
        let doc: serde_json::Map<String, Value> =
            serde_json::from_str(&text).context("seed must be a JSON object")?;
        for (path, value) in doc {
            let bytes = match value {
                Value::String(s) => s.into_bytes(),
                other => serde_json::to_vec(&other)?,
            };
            registry.create_or_update(&path, bytes)?;
        }
    }

    // Local registries have no other instances: register ourselves
    let sp = config.server_pub();
    registry.create_or_update(&sp.node_path(&config.host, &config.server_id), "")?;
    info!(registry = %address, "Using local registry");
    Ok(Arc::new(registry))
}

async fn check(config: &AppConfig, registry: &dyn Registry) -> anyhow::Result<()> {
    let sp = config.server_pub();
    let main_path = sp.main_path();

    match ConfigTree::load(registry, &main_path, &PlainText).await {
        Ok(tree) => {
            let root = tree.root().context("loaded tree has no root")?;
            println!("configuration {}", main_path);
            println!("  version   {}", root.version());
            println!("  signature {}", root.signature());
            println!("  started   {}", tree.is_started());
            println!("  trace     {}", tree.is_trace());
            let mut names: Vec<_> = tree.children().collect();
            names.sort_by(|a, b| a.0.cmp(b.0));
            for (name, child) in names {
                println!("  sub-conf  {} (version {})", name, child.version());
            }
        }
        Err(ConfError::NotFound(path)) => println!("configuration {} not set", path),
        Err(e) => return Err(e.into()),
    }

    let view = ClusterView::fetch(registry, &sp.server_pub_path(), config.server_id.clone()).await?;
    println!("cluster {} ({} nodes)", sp.server_pub_path(), view.len());
    for node in view.iter() {
        println!(
            "  #{} {} host={} master={} current={}",
            node.ordinal(),
            node.raw_name(),
            node.host(),
            view.is_master(node, 1),
            view.is_current(node)
        );
    }
    Ok(())
}

async fn run_watch(config: &AppConfig, registry: Arc<dyn Registry>) -> anyhow::Result<()> {
    let sp = config.server_pub();
    let comparer = Arc::new(SnapshotComparer::new(
        config.watch.values.clone(),
        config.watch.sub_confs.clone(),
    ));
    let watcher = ConfWatcher::new(
        registry.clone(),
        sp.main_path(),
        comparer.clone(),
        Arc::new(PlainText),
        config.poll_interval(),
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let (changes_tx, mut changes_rx) = mpsc::channel(16);
    let handle = tokio::spawn(watcher.run(shutdown_rx, changes_tx));

    loop {
        tokio::select! {
            changes = changes_rx.recv() => {
                let Some(changes) = changes else { break };
                let version = comparer.candidate().and_then(|t| t.version());
                info!(?version, ?changes, "Reload required");
                match ClusterView::fetch(registry.as_ref(), &sp.server_pub_path(), config.server_id.clone()).await {
                    Ok(view) => info!(
                        members = view.len(),
                        master = view.master().map(|n| n.raw_name()).unwrap_or("-"),
                        is_master = view.is_current_master(),
                        "Cluster membership"
                    ),
                    Err(e) => warn!(error = %e, "Failed to read cluster membership"),
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Received Ctrl-C, shutting down");
                break;
            }
        }
    }

    let _ = shutdown_tx.send(true);
    handle.await?;
    Ok(())
}
