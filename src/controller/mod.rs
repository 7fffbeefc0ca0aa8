//! Claims controller and its Kubernetes adapter

pub mod claims;
pub mod kube_store;

pub use claims::*;
pub use kube_store::*;
