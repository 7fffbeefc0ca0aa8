//! Netlab Claims - per-node persistence for network topologies
//!
//! Keeps the PersistentVolumeClaims owned by a `Topology` converged with its
//! declared nodes and persistence policy.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────────┐
//! │                        ClaimsController                              │
//! │            list owned ─► plan ─► delete / create / replace           │
//! ├──────────────────────────────────────────────────────────────────────┤
//! │                   PersistentVolumeClaimReconciler                    │
//! │  ┌──────────────┐  ┌──────────────────┐  ┌────────────────────────┐  │
//! │  │   resolve    │  │      render      │  │      conformance       │  │
//! │  │ (ObjectDiffer│  │ (metadata merge, │  │ (grow-only size, meta  │  │
//! │  │  by node)    │  │  size/mode, vol) │  │  superset, ownership)  │  │
//! │  └──────────────┘  └──────────────────┘  └────────────────────────┘  │
//! ├──────────────────────────────────────────────────────────────────────┤
//! │        ClaimStore port  ─►  KubeClaimStore (kube::Api<PVC>)          │
//! └──────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//!
//! - [`reconciler`]: resolve/render/conformance and the reconcile plan
//! - [`controller`]: single-pass controller and Kubernetes claim store
//! - [`crd`]: Topology custom resource and definition parsing
//! - [`config`]: operator-wide configuration accessor
//! - [`util`]: object differ, quantities, metadata and fallback helpers
//! - [`domain`]: port traits
//! - [`metrics`]: Prometheus counters
//! - [`output`]: YAML/JSON rendering of plans and summaries
//! - [`error`]: Error types and handling

pub mod config;
pub mod constants;
pub mod controller;
pub mod crd;
pub mod domain;
pub mod error;
pub mod metrics;
pub mod output;
pub mod reconciler;
pub mod util;

// Re-export commonly used types
pub use config::{ConfigManager, ManagedConfig, OperatorConfig};

pub use controller::{ClaimsController, KubeClaimStore, ReconcileSummary};

pub use crd::{node_configs, NodeConfigs, Topology, TopologyKind, TopologySpec};

pub use domain::ports::{ClaimAction, ClaimStore};

pub use error::{Error, ErrorAction, Result};

pub use metrics::ClaimMetrics;

pub use output::{render_output, OutputFormat};

pub use reconciler::{
    plan_claims, ConformanceReport, Drift, PersistentVolumeClaimReconciler, ReconcilePlan,
    VolumeMode,
};

pub use util::ObjectDiffer;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
