//! `dlgtree flowchart`: export the flowchart structure as JSON.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};

use dlgtree::projection::flowchart::FlowchartData;

use crate::commands;

pub fn run(path: &Path, output: Option<&Path>) -> Result<()> {
    let (sync, _) = commands::load(path)?;
    let json = render(&sync.flowchart())?;
    match output {
        Some(out) => {
            fs::write(out, &json).with_context(|| format!("failed to write {}", out.display()))?;
            println!("  Wrote {}", out.display());
        }
        None => print!("{}", json),
    }
    Ok(())
}

fn render(data: &FlowchartData) -> Result<String> {
    let mut json = serde_json::to_string_pretty(data).context("failed to encode flowchart")?;
    json.push('\n');
    Ok(json)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const FILE: &str = r#"{
        "entries": [{ "speaker": "Guard", "text": { "0": "Halt!" }, "pointers": [{ "index": 0 }, { "index": 0, "is_link": true }] }],
        "replies": [{ "text": { "0": "Sorry." } }],
        "starts": [{ "index": 0 }]
    }"#;

    #[test]
    fn exports_nodes_and_links_from_file() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("guard.json");
        let output = dir.path().join("chart.json");
        fs::write(&input, FILE).unwrap();

        run(&input, Some(&output)).unwrap();
        let value: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&output).unwrap()).unwrap();
        // root, entry, reply, link node
        assert_eq!(value["nodes"].as_array().unwrap().len(), 4);
        assert_eq!(value["links"].as_array().unwrap().len(), 3);
        // the link sits behind an unconditional sibling
        let hidden: Vec<bool> = value["links"]
            .as_array()
            .unwrap()
            .iter()
            .map(|l| l["unreachable"].as_bool().unwrap())
            .collect();
        assert_eq!(hidden, vec![false, false, true]);
    }

    #[test]
    fn render_ends_with_newline() {
        let json = render(&FlowchartData::default()).unwrap();
        assert!(json.ends_with('\n'));
        assert!(json.contains("\"nodes\""));
    }
}
