use std::collections::BTreeMap;

pub mod brand;
pub mod item;
pub mod run;

// Re-exports for convenience
pub use brand::*;
pub use item::*;
pub use run::*;

/// Last-seen items per brand name. Ordered so the state file serialises deterministically.
pub type State = BTreeMap<String, Vec<Item>>;
