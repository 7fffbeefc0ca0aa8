//! Topology child-object reconcilers
//!
//! Pure diff/render/conformance logic. Callers own all I/O.

pub mod persistent_volume_claim;
pub mod plan;

pub use persistent_volume_claim::*;
pub use plan::*;
