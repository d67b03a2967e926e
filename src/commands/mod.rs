pub mod flowchart;
pub mod inspect;
pub mod tree;
pub mod view;

use std::path::Path;

use anyhow::Result;

use dlgtree::parser::{config::Config, dialog};
use dlgtree::sync::Synchronizer;
use dlgtree::workspace;

/// Load a dialogue file with its configuration into a ready synchronizer.
pub fn load(path: &Path) -> Result<(Synchronizer, Config)> {
    let config = workspace::load_config_for(path)?;
    let (graph, _) = dialog::load(path)?;
    let mut sync = workspace::build_synchronizer(&config);
    sync.on_graph_loaded(graph);
    Ok((sync, config))
}
