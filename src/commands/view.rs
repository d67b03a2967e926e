use std::path::Path;

use anyhow::{Result, bail};

use crate::tui::app;

pub fn run(path: Option<&Path>, demo: bool) -> Result<()> {
    match (path, demo) {
        (_, true) => app::run(None),
        (Some(path), false) => app::run(Some(path)),
        (None, false) => bail!("no dialogue file given (pass a path or --demo)"),
    }
}
