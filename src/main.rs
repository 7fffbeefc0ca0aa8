//! Netlab Claims
//!
//! Plans (offline) or applies (against a cluster) one reconcile pass of the
//! per-node PersistentVolumeClaims of a topology.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use k8s_openapi::api::core::v1::PersistentVolumeClaim;
use kube::ResourceExt;
use serde::Deserialize;
use tracing::{info, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use netlab_claims::{
    node_configs, plan_claims, render_output, ClaimMetrics, ClaimsController, KubeClaimStore,
    ManagedConfig, OperatorConfig, OutputFormat, PersistentVolumeClaimReconciler, Topology,
};

// =============================================================================
// CLI Arguments
// =============================================================================

/// Netlab Claims - per-node persistent volume claims for network topologies
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Topology manifest (YAML)
    #[arg(long, env = "TOPOLOGY_FILE")]
    topology: PathBuf,

    /// Operator configuration (YAML)
    #[arg(long, env = "OPERATOR_CONFIG")]
    config: Option<PathBuf>,

    /// Claims currently owned by the topology (YAML list), for offline planning
    #[arg(long, env = "CLAIMS_FILE", conflicts_with = "apply")]
    claims: Option<PathBuf>,

    /// Apply the plan against the cluster in the current kube context
    #[arg(long, env = "APPLY")]
    apply: bool,

    /// Format of the printed plan or summary
    #[arg(long, env = "OUTPUT_FORMAT", value_enum, default_value_t = OutputFormat::Yaml)]
    output: OutputFormat,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Output logs as JSON
    #[arg(long, env = "LOG_JSON")]
    log_json: bool,
}

/// Either a `kind: List` document or a bare sequence of claims
#[derive(Deserialize)]
#[serde(untagged)]
enum ClaimsDocument {
    List { items: Vec<PersistentVolumeClaim> },
    Items(Vec<PersistentVolumeClaim>),
}

// =============================================================================
// Main
// =============================================================================

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    init_logging(&args);

    let topology: Topology = read_yaml(&args.topology)?;
    let config = match &args.config {
        Some(path) => OperatorConfig::from_yaml_file(path)
            .with_context(|| format!("loading operator config {}", path.display()))?,
        None => OperatorConfig::default(),
    };

    let node_configs = node_configs(&topology)?;
    let reconciler = PersistentVolumeClaimReconciler::new(ManagedConfig::new(config));

    info!("Starting Netlab Claims");
    info!("  Version: {}", netlab_claims::VERSION);
    info!(
        "  Topology: {} ({} nodes)",
        topology.name_any(),
        node_configs.len()
    );
    info!("  Apply: {}", args.apply);

    if args.apply {
        let client = kube::Client::try_default()
            .await
            .context("connecting to the cluster")?;
        let metrics = ClaimMetrics::register(prometheus::default_registry())?;
        let controller = ClaimsController::new(Arc::new(KubeClaimStore::new(client)), reconciler)
            .with_metrics(metrics);

        let summary = controller.reconcile(&topology, &node_configs).await?;
        print!("{}", render_output(&summary, args.output)?);
    } else {
        let owned = match &args.claims {
            Some(path) => match read_yaml::<ClaimsDocument>(path)? {
                ClaimsDocument::List { items } | ClaimsDocument::Items(items) => items,
            },
            None => Vec::new(),
        };

        let plan = plan_claims(&reconciler, &owned, &node_configs, &topology)?;
        print!("{}", render_output(&plan, args.output)?);
    }

    Ok(())
}

fn read_yaml<T: serde::de::DeserializeOwned>(path: &Path) -> anyhow::Result<T> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))?;
    serde_yaml::from_str(&raw).with_context(|| format!("parsing {}", path.display()))
}

// =============================================================================
// Logging Setup
// =============================================================================

fn init_logging(args: &Args) {
    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let mut filter = EnvFilter::from_default_env().add_directive(level.into());
    for directive in ["hyper=warn", "kube=info", "tower=warn"] {
        if let Ok(directive) = directive.parse() {
            filter = filter.add_directive(directive);
        }
    }

    // Plans go to stdout, logs to stderr
    if args.log_json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
            .init();
    }
}
