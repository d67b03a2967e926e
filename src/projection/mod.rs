pub mod flowchart;
pub mod state;
pub mod tree;

pub use tree::{ProjectionNode, ProjectionTree, StableKey};
