//! Prometheus counters for claim writes

use prometheus::{IntCounterVec, Opts, Registry};

use crate::domain::ClaimAction;
use crate::error::Result;

/// Counters for the writes issued by the claims controller
#[derive(Debug, Clone)]
pub struct ClaimMetrics {
    actions: IntCounterVec,
}

impl ClaimMetrics {
    /// Create the counters and register them on `registry`
    pub fn register(registry: &Registry) -> Result<Self> {
        let actions = IntCounterVec::new(
            Opts::new(
                "netlab_claim_actions_total",
                "Claim writes issued by the claims controller",
            ),
            &["action"],
        )?;
        registry.register(Box::new(actions.clone()))?;

        Ok(Self { actions })
    }

    pub fn record(&self, action: ClaimAction) {
        self.actions.with_label_values(&[action.as_str()]).inc();
    }

    pub fn count(&self, action: ClaimAction) -> u64 {
        self.actions.with_label_values(&[action.as_str()]).get()
    }
}
