//! Custom Resource Definitions
//!
//! - Topology: multi-node network emulation workload owning per-node objects
//! - definition: node extraction from containerlab/KNE definitions

pub mod definition;
pub mod topology;

pub use definition::*;
pub use topology::*;
