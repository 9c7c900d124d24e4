// CLI module - command-line argument parsing and handlers
//
// Subcommands:
// - render: stream patches from a file, stdin or generator and print the tree
// - validate: check a tree document against a catalog
// - prompt: print the generator briefing for a catalog
// - config: show, locate or reset the config file

use crate::config::{Config, VERSION};
use crate::logging::WarningCollector;
use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use genui::transport::{build_client, GenerateRequest, PatchSource};
use genui::{
    AuthState, Catalog, OutlineRenderer, StreamBuilder, StreamOutcome, TreeWalker, UiTree, Value,
    VisibilityContext,
};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Number of warnings shown in the end-of-run summary
const SUMMARY_LIMIT: usize = 10;

/// genui - build declarative UI trees from patch streams
#[derive(Parser)]
#[command(name = "genui")]
#[command(version = VERSION)]
#[command(about = "Build and inspect declarative UI trees from patch streams", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Stream patches and print the resulting tree
    Render {
        /// Patch source: file path, `-` for stdin, or an http(s) generator URL
        /// (defaults to the configured endpoint)
        source: Option<String>,

        /// Catalog to validate the finished tree against
        #[arg(long)]
        catalog: Option<PathBuf>,

        /// JSON file with the data model used for visibility and props
        #[arg(long)]
        data: Option<PathBuf>,

        /// Evaluate visibility as a signed-in viewer
        #[arg(long)]
        signed_in: bool,

        /// Prompt sent to an HTTP generator
        #[arg(long, default_value = "")]
        prompt: String,

        /// Print the tree as JSON instead of an outline
        #[arg(long)]
        json: bool,
    },

    /// Validate a tree document against a catalog
    Validate {
        /// Tree JSON file (`{"root": ..., "elements": {...}}`)
        tree: PathBuf,

        /// Catalog file (defaults to the configured catalog)
        #[arg(long)]
        catalog: Option<PathBuf>,
    },

    /// Print the generator prompt for a catalog
    Prompt {
        /// Catalog file (defaults to the configured catalog)
        #[arg(long)]
        catalog: Option<PathBuf>,
    },

    /// Manage configuration
    Config {
        /// Show effective configuration
        #[arg(long)]
        show: bool,

        /// Show config file path
        #[arg(long)]
        path: bool,

        /// Reset config file to defaults
        #[arg(long)]
        reset: bool,
    },
}

// ─────────────────────────────────────────────────────────────────────────────
// render
// ─────────────────────────────────────────────────────────────────────────────

pub struct RenderArgs {
    pub source: Option<String>,
    pub catalog: Option<PathBuf>,
    pub data: Option<PathBuf>,
    pub signed_in: bool,
    pub prompt: String,
    pub json: bool,
}

pub async fn handle_render(
    config: &Config,
    args: RenderArgs,
    warnings: &WarningCollector,
) -> Result<()> {
    let source = match args.source.or_else(|| config.endpoint.clone()) {
        Some(source) => PatchSource::parse(&source)
            .with_context(|| format!("Invalid patch source '{}'", source))?,
        None => bail!("No patch source given and no endpoint configured (see `genui config --path`)"),
    };

    let catalog = load_catalog(args.catalog.as_deref(), config, false)?;
    let data = match &args.data {
        Some(path) => read_json(path)?,
        None => Value::Object(Default::default()),
    };

    let request = GenerateRequest {
        prompt: args.prompt,
        context: Some(data.clone()),
        current_tree: None,
    };
    let client = build_client(config.request_timeout_secs)?;
    let stream = source
        .open(&client, &request)
        .await
        .with_context(|| format!("Failed to open {}", source))?;

    tracing::debug!("Streaming patches from {}", source);
    let builder = StreamBuilder::new();
    let (tree, failure) = match builder.send(stream).await {
        Ok(StreamOutcome::Completed { tree, .. }) => (tree, None),
        Ok(StreamOutcome::Aborted) => (builder.tree(), None),
        Err(e) => (builder.tree(), Some(e)),
    };

    for (parent, child) in tree.dangling_children() {
        tracing::warn!("Element '{}' lists missing child '{}'", parent, child);
    }
    if let Some(catalog) = &catalog {
        report_schema(catalog, &tree)?;
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&tree)?);
    } else {
        let auth = if args.signed_in {
            AuthState::signed_in()
        } else {
            config.auth.state()
        };
        let registry = OutlineRenderer::registry();
        let walker = TreeWalker::new(&registry, VisibilityContext::new(&data).with_auth(auth));
        match walker.walk(&tree) {
            Some(outline) => println!("{}", outline),
            None => println!("(nothing to render)"),
        }
    }

    if let Some(summary) = warnings.summary(SUMMARY_LIMIT) {
        eprint!("\n{}", summary);
    }

    match failure {
        Some(e) => Err(e).context("Patch stream ended early; output shows the partial tree"),
        None => Ok(()),
    }
}

fn report_schema(catalog: &Catalog, tree: &UiTree) -> Result<()> {
    let value = serde_json::to_value(tree)?;
    if let Err(e) = catalog.validate_tree(&value) {
        for issue in &e.issues {
            tracing::warn!("Catalog: {}", issue);
        }
    }
    Ok(())
}

// ─────────────────────────────────────────────────────────────────────────────
// validate / prompt
// ─────────────────────────────────────────────────────────────────────────────

pub fn handle_validate(config: &Config, tree: &Path, catalog: Option<&Path>) -> Result<()> {
    let Some(catalog) = load_catalog(catalog, config, true)? else {
        bail!("A catalog is required");
    };
    let value = read_json(tree)?;

    match catalog.validate_tree(&value) {
        Ok(parsed) => {
            println!(
                "{}: valid ({} elements, root '{}')",
                tree.display(),
                parsed.elements.len(),
                parsed.root
            );
            Ok(())
        }
        Err(e) => {
            for issue in &e.issues {
                println!("  {}", issue);
            }
            bail!("{} issue(s) found", e.issues.len())
        }
    }
}

pub fn handle_prompt(config: &Config, catalog: Option<&Path>) -> Result<()> {
    let Some(catalog) = load_catalog(catalog, config, true)? else {
        bail!("A catalog is required");
    };
    print!("{}", catalog.generate_prompt());
    Ok(())
}

/// Catalog from the flag, else from config; `required` makes absence an error
fn load_catalog(flag: Option<&Path>, config: &Config, required: bool) -> Result<Option<Catalog>> {
    let path = flag.map(Path::to_path_buf).or_else(|| config.catalog.clone());
    match path {
        Some(path) => Ok(Some(
            Catalog::load(&path).with_context(|| format!("Failed to load catalog {}", path.display()))?,
        )),
        None if required => bail!("No catalog given (use --catalog or set `catalog` in the config file)"),
        None => Ok(None),
    }
}

fn read_json(path: &Path) -> Result<Value> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&contents).with_context(|| format!("Invalid JSON in {}", path.display()))
}

// ─────────────────────────────────────────────────────────────────────────────
// config
// ─────────────────────────────────────────────────────────────────────────────

pub fn handle_config(show: bool, path: bool, reset: bool) -> Result<()> {
    if path {
        handle_config_path()
    } else if show {
        handle_config_show()
    } else if reset {
        handle_config_reset()
    } else {
        // No flag provided, show help
        println!("Usage: genui config [--show|--path|--reset]");
        println!();
        println!("Options:");
        println!("  --show    Display effective configuration");
        println!("  --path    Show config file path");
        println!("  --reset   Reset config file to defaults");
        Ok(())
    }
}

fn handle_config_path() -> Result<()> {
    let path = Config::config_path().context("Could not determine config path")?;
    println!("{}", path.display());
    Ok(())
}

fn handle_config_show() -> Result<()> {
    let config = Config::from_env()?;

    println!("# Effective configuration (env > file > defaults)");
    print!("{}", config.to_toml());

    if let Some(path) = Config::config_path() {
        if path.exists() {
            println!("# Source: {}", path.display());
        } else {
            println!("# Source: defaults (no config file)");
        }
    }
    Ok(())
}

fn handle_config_reset() -> Result<()> {
    let path = Config::config_path().context("Could not determine config path")?;

    // Confirm if file exists
    if path.exists() {
        eprint!(
            "Config file exists at {}. Overwrite? [y/N] ",
            path.display()
        );
        std::io::stderr().flush()?;

        let mut input = String::new();
        std::io::stdin().read_line(&mut input)?;

        if !input.trim().eq_ignore_ascii_case("y") {
            println!("Aborted.");
            return Ok(());
        }
    }

    Config::default()
        .save()
        .with_context(|| format!("Failed to write {}", path.display()))?;
    println!("Config reset to defaults: {}", path.display());
    Ok(())
}
