//! Command line tools for pagewright page declarations.
//!
//! Works on accessibility tree dumps in the `type` / `AXUniqueId` / `AXLabel`
//! / `AXValue` JSON format.
//!
//! # Usage
//!
//! ```bash
//! # List every node with its traversal index and depth
//! pagewright dump tree.json
//!
//! # Print a page declaration for the screen in the dump
//! pagewright generate tree.json --name LoginPage
//!
//! # Check whether a JSON-declared page exists in the dump
//! pagewright check login.json tree.json
//!
//! # Machine-readable output
//! pagewright --format json check login.json tree.json
//! ```

mod page_file;

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use pagewright_core::codegen::{describe_tree, render_page_source, suggest_page_name};
use pagewright_core::config::PagewrightConfig;
use pagewright_core::element::UIElement;
use pagewright_core::page::Page;
use pagewright_core::snapshot::{Snapshot, SnapshotNode};
use pagewright_core::session::TestSession;
use pagewright_core::tree_driver::TreeDriver;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use page_file::FilePage;

/// Inspect accessibility tree dumps and check page declarations against them.
#[derive(Parser)]
#[command(name = "pagewright")]
#[command(about = "Inspect accessibility trees and check page declarations")]
#[command(version)]
struct Cli {
    /// Output format: text or json
    #[arg(short, long, default_value = "text", env = "PAGEWRIGHT_FORMAT")]
    format: OutputFormat,

    #[command(subcommand)]
    command: Command,
}

#[derive(Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Command {
    /// Print every node of a tree with its traversal index and depth
    Dump {
        /// Path to the tree dump
        tree: PathBuf,
    },

    /// Print a page declaration for a tree
    Generate {
        /// Path to the tree dump
        tree: PathBuf,
        /// Type name of the generated page (suggested from the tree if omitted)
        #[arg(short, long)]
        name: Option<String>,
        /// Bundle identifier the page belongs to
        #[arg(short, long)]
        application: Option<String>,
    },

    /// Check whether a declared page exists in a tree
    Check {
        /// Path to the JSON page declaration
        page: PathBuf,
        /// Path to the tree dump
        tree: PathBuf,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            e.exit_code()
        }
    }
}

#[derive(Debug)]
enum CliError {
    PageMissing(String),
    Input(String),
    Output(String),
}

impl CliError {
    fn exit_code(&self) -> ExitCode {
        match self {
            CliError::PageMissing(_) => ExitCode::from(1),
            CliError::Input(_) => ExitCode::from(2),
            CliError::Output(_) => ExitCode::from(3),
        }
    }
}

impl std::fmt::Display for CliError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CliError::PageMissing(page) => write!(f, "Page {} does not exist", page),
            CliError::Input(msg) => write!(f, "Input error: {}", msg),
            CliError::Output(msg) => write!(f, "Output error: {}", msg),
        }
    }
}

async fn run(cli: Cli) -> Result<(), CliError> {
    match cli.command {
        Command::Dump { ref tree } => dump(&load_tree(tree)?, cli.format),
        Command::Generate {
            ref tree,
            ref name,
            ref application,
        } => generate(&load_tree(tree)?, name.as_deref(), application.as_deref(), cli.format),
        Command::Check { ref page, ref tree } => {
            let page = FilePage::from_file(page).map_err(CliError::Input)?;
            check(page, load_tree(tree)?, cli.format).await
        }
    }
}

fn load_tree(path: &Path) -> Result<UIElement, CliError> {
    let json = std::fs::read_to_string(path)
        .map_err(|e| CliError::Input(format!("failed to read {}: {}", path.display(), e)))?;
    let tree: UIElement = serde_json::from_str(&json)
        .map_err(|e| CliError::Input(format!("invalid tree dump {}: {}", path.display(), e)))?;
    debug!(path = %path.display(), nodes = tree.node_count(), "loaded tree");
    Ok(tree)
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<String, CliError> {
    serde_json::to_string_pretty(value).map_err(|e| CliError::Output(e.to_string()))
}

fn dump(tree: &UIElement, format: OutputFormat) -> Result<(), CliError> {
    let snapshot = Snapshot::build(tree);
    if format == OutputFormat::Json {
        println!("{}", to_json(&snapshot.nodes())?);
        return Ok(());
    }
    for node in snapshot.nodes() {
        println!("{}", format_node(node));
    }
    Ok(())
}

fn format_node(node: &SnapshotNode) -> String {
    let mut line = format!("{:>4} {}{}", node.index, "  ".repeat(node.depth), node.step());
    if let Some(frame) = &node.frame {
        line.push_str(&format!(
            " @ ({:.0}, {:.0}, {:.0}x{:.0})",
            frame.x, frame.y, frame.width, frame.height
        ));
    }
    if node.hittable == Some(false) {
        line.push_str(" [not hittable]");
    }
    line
}

fn generate(
    tree: &UIElement,
    name: Option<&str>,
    application: Option<&str>,
    format: OutputFormat,
) -> Result<(), CliError> {
    let name = name.map(str::to_string).unwrap_or_else(|| suggest_page_name(tree));
    let source = render_page_source(&describe_tree(tree), &name, application);
    if format == OutputFormat::Json {
        println!("{}", serde_json::json!({ "name": name, "source": source }));
    } else {
        println!("{}", source);
    }
    Ok(())
}

async fn check(page: FilePage, tree: UIElement, format: OutputFormat) -> Result<(), CliError> {
    let driver = Arc::new(TreeDriver::new());
    driver.set_tree(page.application(), tree);
    let config = PagewrightConfig {
        default_monitors: false,
        ..PagewrightConfig::load()
    };
    let session = TestSession::with_config(driver, config);

    let page = Arc::new(page);
    let results = session
        .check(&page)
        .await
        .map_err(|e| CliError::Input(e.to_string()))?;

    let resolved: Vec<_> = page
        .description()
        .flatten()
        .into_iter()
        .filter_map(|element| {
            let location = session.cache().get(element.id())?.location?;
            Some((element.to_string(), location))
        })
        .collect();
    let captures: Vec<_> = page
        .variables()
        .into_iter()
        .map(|variable| (variable.placeholder(), session.read(&variable)))
        .collect();
    let missing: Vec<String> = results.missing_elements.iter().map(ToString::to_string).collect();

    if format == OutputFormat::Json {
        let resolved: Vec<_> = resolved
            .iter()
            .map(|(element, location)| {
                serde_json::json!({ "element": element, "path": location.path, "index": location.index })
            })
            .collect();
        let captures: serde_json::Map<_, _> = captures
            .into_iter()
            .map(|(placeholder, value)| (placeholder, serde_json::Value::String(value)))
            .collect();
        let report = serde_json::json!({
            "page": page.name(),
            "exists": results.is_existing(),
            "resolved": resolved,
            "missing": missing,
            "captures": captures,
        });
        println!("{}", to_json(&report)?);
    } else {
        for (element, location) in &resolved {
            let path: Vec<String> = location.path.iter().map(ToString::to_string).collect();
            println!("✅ {} -> {} [{}]", element, path.join(" > "), location.index);
        }
        for element in &missing {
            println!("⛔️ missing element {}", element);
        }
        for (placeholder, value) in &captures {
            println!("{} = {}", placeholder, value);
        }
    }

    if results.is_existing() {
        Ok(())
    } else {
        Err(CliError::PageMissing(page.name()))
    }
}
