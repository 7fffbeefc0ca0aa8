//! Shared helpers for rendering and diffing topology-owned objects

pub mod differ;
pub mod fallback;
pub mod metadata;
pub mod quantity;

pub use differ::ObjectDiffer;
pub use fallback::{parse_with_fallback, FallbackWarning};
pub use metadata::{existing_map_contains_all_expected, merge_metadata};
pub use quantity::{parse_quantity, parse_value, quantity_value};
