//! Domain layer - port traits at the cluster boundary

pub mod ports;

pub use ports::*;
