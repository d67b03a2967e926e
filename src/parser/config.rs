//! Parser and writer for `.dlgtree` configuration files.
//!
//! One `key: value` pair per line; `#` starts a comment line.

use anyhow::{Context, Result, bail};
use tracing::warn;

use crate::reachability::{EvaluationOrder, StaticClassifier};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub evaluation_order: EvaluationOrder,
    pub always_true_scripts: Vec<String>,
    pub always_false_scripts: Vec<String>,
    pub expand_depth: usize,
    pub show_unreachable: bool,
    pub show_link_comments: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            evaluation_order: EvaluationOrder::FirstMatch,
            always_true_scripts: Vec::new(),
            always_false_scripts: Vec::new(),
            expand_depth: 1,
            show_unreachable: true,
            show_link_comments: true,
        }
    }
}

impl Config {
    pub fn classifier(&self) -> StaticClassifier {
        StaticClassifier::with_scripts(
            self.always_true_scripts.iter().cloned(),
            self.always_false_scripts.iter().cloned(),
        )
    }
}

pub fn parse(input: &str) -> Result<Config> {
    let mut config = Config::default();
    for (i, line) in input.lines().enumerate() {
        let line_num = i + 1;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let Some((key, value)) = trimmed.split_once(':') else {
            bail!("expected `key: value` at line {}", line_num);
        };
        let value = value.trim();
        match key.trim() {
            "evaluation_order" => {
                config.evaluation_order = value
                    .parse()
                    .map_err(anyhow::Error::msg)
                    .with_context(|| format!("invalid evaluation_order at line {}", line_num))?;
            }
            "always_true_scripts" => config.always_true_scripts = parse_list(value),
            "always_false_scripts" => config.always_false_scripts = parse_list(value),
            "expand_depth" => {
                config.expand_depth = value
                    .parse()
                    .with_context(|| format!("invalid expand_depth at line {}", line_num))?;
            }
            "show_unreachable" => {
                config.show_unreachable = parse_bool(value)
                    .with_context(|| format!("invalid show_unreachable at line {}", line_num))?;
            }
            "show_link_comments" => {
                config.show_link_comments = parse_bool(value)
                    .with_context(|| format!("invalid show_link_comments at line {}", line_num))?;
            }
            other => warn!(key = other, line = line_num, "ignoring unknown config key"),
        }
    }
    Ok(config)
}

fn parse_bool(value: &str) -> Result<bool> {
    match value {
        "true" | "yes" | "on" => Ok(true),
        "false" | "no" | "off" => Ok(false),
        _ => bail!("expected true or false, got {:?}", value),
    }
}

fn parse_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

pub fn serialize(config: &Config) -> String {
    format!(
        "\
# dlgtree configuration

# How sibling guards are evaluated
# Options: first-match | independent | entries-first-match
evaluation_order: {}

# Condition scripts known to always pass or always fail (comma separated)
always_true_scripts: {}
always_false_scripts: {}

# Tree depth expanded after loading a file
expand_depth: {}

# Highlight branches that can never be taken
show_unreachable: {}

# Show per-link comments next to link rows
show_link_comments: {}
",
        config.evaluation_order,
        config.always_true_scripts.join(", "),
        config.always_false_scripts.join(", "),
        config.expand_depth,
        config.show_unreachable,
        config.show_link_comments
    )
}
