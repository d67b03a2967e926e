mod commands;
mod tui;

use std::path::PathBuf;

use anyhow::Result;
use clap::{ArgAction, ArgGroup, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "dlgtree",
    about = "Browse and check branching-dialogue files as a tree or flowchart"
)]
struct Cli {
    /// Increase log output (-v debug, -vv trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the dialogue tree
    Tree {
        file: PathBuf,
        /// Expand every node instead of stopping at expand_depth
        #[arg(long)]
        all: bool,
    },
    /// Query the dialogue for specific conditions
    #[command(
        group(
            ArgGroup::new("inspect_query")
                .args(["unreachable", "links", "path"])
                .required(true)
                .multiple(false)
        )
    )]
    Inspect {
        file: PathBuf,
        /// List branches that can never be taken
        #[arg(long)]
        unreachable: bool,
        /// Show the owner and every link pointing at a node (e.g. N4)
        #[arg(long, value_name = "NODE")]
        links: Option<String>,
        /// Show the owning path from the root to a node
        #[arg(long, value_name = "NODE")]
        path: Option<String>,
    },
    /// Export the flowchart structure as JSON
    Flowchart {
        file: PathBuf,
        /// Write to a file instead of stdout
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
    /// Open the interactive tree browser
    View {
        #[arg(required_unless_present = "demo")]
        file: Option<PathBuf>,
        /// Launch with a built-in sample dialogue
        #[arg(long)]
        demo: bool,
    },
}

fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Command::Tree { file, all } => commands::tree::run(&file, all),
        Command::Inspect {
            file,
            unreachable,
            links,
            path,
        } => {
            if unreachable {
                commands::inspect::run_unreachable(&file)
            } else if let Some(node) = links {
                commands::inspect::run_links(&file, &node)
            } else if let Some(node) = path {
                commands::inspect::run_path(&file, &node)
            } else {
                eprintln!("Specify one of: --unreachable, --links <node>, --path <node>");
                Ok(())
            }
        }
        Command::Flowchart { file, output } => commands::flowchart::run(&file, output.as_deref()),
        Command::View { file, demo } => commands::view::run(file.as_deref(), demo),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::error::ErrorKind;

    #[test]
    fn inspect_rejects_multiple_query_flags() {
        let parsed = Cli::try_parse_from([
            "dlgtree",
            "inspect",
            "d.json",
            "--unreachable",
            "--links",
            "N1",
        ]);
        let err = parsed.err().expect("expected clap parse error");
        assert_eq!(err.kind(), ErrorKind::ArgumentConflict);
    }

    #[test]
    fn inspect_requires_a_query_flag() {
        let parsed = Cli::try_parse_from(["dlgtree", "inspect", "d.json"]);
        assert!(parsed.is_err());
    }

    #[test]
    fn inspect_accepts_single_query_flag() {
        let cli = Cli::try_parse_from(["dlgtree", "inspect", "d.json", "--path", "N3"])
            .expect("single inspect flag should parse");
        match cli.command {
            Command::Inspect { path, .. } => assert_eq!(path.as_deref(), Some("N3")),
            _ => panic!("expected inspect command"),
        }
    }

    #[test]
    fn verbose_is_global_and_counted() {
        let cli = Cli::try_parse_from(["dlgtree", "tree", "d.json", "-vv"]).unwrap();
        assert_eq!(cli.verbose, 2);
    }

    #[test]
    fn view_needs_file_unless_demo() {
        assert!(Cli::try_parse_from(["dlgtree", "view"]).is_err());
        let cli = Cli::try_parse_from(["dlgtree", "view", "--demo"]).unwrap();
        match cli.command {
            Command::View { file, demo } => {
                assert!(demo);
                assert!(file.is_none());
            }
            _ => panic!("expected view command"),
        }
    }
}
