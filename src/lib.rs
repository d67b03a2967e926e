//! Dialogue tree/flowchart consistency engine.
//!
//! A [`graph::model::DialogGraph`] is the single source of truth. The
//! [`sync::Synchronizer`] keeps a tree projection, a flowchart projection and
//! per-sibling reachability in step with it across every edit.

pub mod graph;
pub mod parser;
pub mod projection;
pub mod reachability;
pub mod sync;
pub mod workspace;
