//! # Vault Context CLI (`vctx`)
//!
//! Generates LLM prompts from a vault of notes and manages the saved vaults
//! and templates those generations use.
//!
//! ## Usage
//!
//! ```bash
//! vctx --config ./config/vctx.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `vctx generate` | Build a prompt from a vault and a template |
//! | `vctx tree` | Print only the tree of relevant files |
//! | `vctx vault add <name> <path>` | Save a vault under a name |
//! | `vctx vault remove <name>` | Forget a saved vault |
//! | `vctx vault list` | List saved vaults |
//! | `vctx templates list` | List built-in and on-disk templates |
//! | `vctx templates show <name>` | Print a template |
//!
//! The prompt, tree, and listings go to stdout. Logs go to stderr and are
//! filtered by `RUST_LOG` (default `warn`, `info` with `--verbose`).

use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use vault_context::config::{self, Settings};
use vault_context::discovery::{find_relevant_files, PathFilter};
use vault_context::models::{ExtensionFilter, OutputMode};
use vault_context::pipeline::{self, GenerateRequest, TREE_UNAVAILABLE};
use vault_context::templates::TemplateStore;
use vault_context::tree::render_tree;

/// Template used when neither `--template` nor `--template-text` is given.
const DEFAULT_TEMPLATE: &str = "simple-note";

/// Vault Context CLI: turn a vault of Markdown notes into an LLM prompt.
///
/// All commands accept a `--config` flag pointing to the TOML settings file
/// that stores saved vaults and generation defaults.
#[derive(Parser)]
#[command(
    name = "vctx",
    about = "Vault Context: build LLM prompts from a vault of Markdown notes",
    version
)]
struct Cli {
    /// Path to the settings file (TOML).
    ///
    /// Defaults to `./config/vctx.toml`. A missing file means default
    /// settings; it is created when a command needs to save.
    #[arg(long, global = true, default_value = "./config/vctx.toml")]
    config: PathBuf,

    /// Log progress at info level (overridden by `RUST_LOG`).
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Which vault to read and which files in it count.
#[derive(clap::Args, Debug)]
struct Selection {
    /// Vault root directory.
    #[arg(long, conflicts_with = "vault_name")]
    vault: Option<PathBuf>,

    /// Name of a saved vault. Without `--vault` or `--vault-name`, the last
    /// used vault is taken.
    #[arg(long)]
    vault_name: Option<String>,

    /// Restrict the search to this file or folder (repeatable, relative to
    /// the vault root or absolute).
    #[arg(long = "target")]
    targets: Vec<String>,

    /// Include only these extensions (repeatable, e.g. `--ext md`).
    #[arg(long = "ext")]
    extensions: Vec<String>,

    /// Exclude these extensions (repeatable).
    #[arg(long = "exclude-ext")]
    exclude_extensions: Vec<String>,

    /// Skip paths matching this glob, relative to the vault (repeatable).
    #[arg(long = "ignore")]
    ignore_globs: Vec<String>,
}

/// Top-level CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// Generate a prompt.
    ///
    /// Finds the relevant files, renders the tree and/or their content,
    /// and substitutes the result into the chosen template.
    Generate {
        #[command(flatten)]
        selection: Selection,

        /// What the context contains.
        #[arg(long, value_enum)]
        mode: Option<OutputMode>,

        /// Path of the note to be written, relative to the vault.
        #[arg(long)]
        dest: Option<PathBuf>,

        /// Built-in template name, `file:<name>.txt`, or a path to a file.
        #[arg(long, conflicts_with = "template_text")]
        template: Option<String>,

        /// Literal template text.
        #[arg(long)]
        template_text: Option<String>,

        /// Also write the prompt to this file.
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Print the tree of relevant files.
    Tree {
        #[command(flatten)]
        selection: Selection,
    },

    /// Manage saved vaults.
    Vault {
        #[command(subcommand)]
        action: VaultAction,
    },

    /// Inspect templates.
    Templates {
        #[command(subcommand)]
        action: TemplatesAction,
    },
}

#[derive(Subcommand)]
enum VaultAction {
    /// Save a vault under a name.
    Add { name: String, path: PathBuf },
    /// Forget a saved vault.
    Remove { name: String },
    /// List saved vaults; `*` marks the last used one.
    List,
}

#[derive(Subcommand)]
enum TemplatesAction {
    /// List template names.
    List,
    /// Print a template.
    Show { name: String },
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "info" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let mut settings = config::load_settings(&cli.config)
        .with_context(|| format!("Failed to load settings from {}", cli.config.display()))?;

    match cli.command {
        Commands::Generate {
            selection,
            mode,
            dest,
            template,
            template_text,
            output,
        } => {
            let store = TemplateStore::new(settings.templates_dir.clone());
            let template = match template_text {
                Some(text) => text,
                None => store.load(template.as_deref().unwrap_or(DEFAULT_TEMPLATE))?,
            };

            let mut saved = settings.clone();
            let selected = select_vault(&mut settings, &selection);
            persist(&settings, &mut saved, &cli.config);
            let (vault_name, vault_root) = selected?;
            let request = GenerateRequest {
                vault_root,
                targets: selection.targets.clone(),
                filter: path_filter(&settings, &selection)?,
                mode: mode.unwrap_or(settings.defaults.mode),
                destination: dest,
            };

            let generation = pipeline::generate(&request, &template)?;
            eprintln!(
                "{} relevant file(s) out of {} seen in {}",
                generation.discovery.files.len(),
                generation.discovery.files_seen,
                generation.discovery.root.display()
            );
            info!(
                context_chars = generation.context.len(),
                unmatched = ?generation.unmatched,
                "context injected"
            );

            let written = match output {
                Some(path) => match pipeline::write_output(&path, &generation.prompt) {
                    Ok(()) => {
                        eprintln!("Prompt written to {}", path.display());
                        Ok(())
                    }
                    Err(e) => {
                        println!("{}", generation.prompt);
                        Err(e)
                    }
                },
                None => {
                    println!("{}", generation.prompt);
                    Ok(())
                }
            };

            if let Some(name) = vault_name {
                settings.set_last_vault(&name);
            }
            persist(&settings, &mut saved, &cli.config);

            written.context("Prompt generated but not saved")?;
        }

        Commands::Tree { selection } => {
            let mut saved = settings.clone();
            let selected = select_vault(&mut settings, &selection);
            persist(&settings, &mut saved, &cli.config);
            let (_, vault_root) = selected?;
            let filter = path_filter(&settings, &selection)?;
            let discovery = find_relevant_files(&vault_root, &selection.targets, &filter)?;
            let tree = render_tree(&discovery.files, &discovery.root);
            println!("{}", tree.as_deref().unwrap_or(TREE_UNAVAILABLE));
        }

        Commands::Vault { action } => match action {
            VaultAction::Add { name, path } => {
                let canonical = settings.add_vault(&name, &path)?;
                save(&settings, &cli.config)?;
                println!("Saved vault '{}' -> {}", name.trim(), canonical.display());
            }
            VaultAction::Remove { name } => {
                let path = settings.remove_vault(&name)?;
                save(&settings, &cli.config)?;
                println!("Removed vault '{}' ({})", name, path.display());
            }
            VaultAction::List => list_vaults(&settings),
        },

        Commands::Templates { action } => match action {
            TemplatesAction::List => {
                let store = TemplateStore::new(settings.templates_dir.clone());
                for name in store.available() {
                    println!("{}", name);
                }
            }
            TemplatesAction::Show { name } => {
                let store = TemplateStore::new(settings.templates_dir.clone());
                print!("{}", store.load(&name)?);
            }
        },
    }

    Ok(())
}

/// Save `settings` if they differ from what was last saved. Failure is
/// logged, never fatal.
fn persist(settings: &Settings, saved: &mut Settings, path: &Path) {
    if settings == saved {
        return;
    }
    match config::save_settings(settings, path) {
        Ok(()) => *saved = settings.clone(),
        Err(e) => warn!("could not save settings to {}: {}", path.display(), e),
    }
}

fn save(settings: &Settings, path: &Path) -> anyhow::Result<()> {
    config::save_settings(settings, path)
        .with_context(|| format!("Failed to save {}", path.display()))
}

/// Resolve the vault to use. Returns the saved name when one was used.
fn select_vault(
    settings: &mut Settings,
    selection: &Selection,
) -> anyhow::Result<(Option<String>, PathBuf)> {
    if let Some(path) = &selection.vault {
        return Ok((None, path.clone()));
    }
    if let Some(name) = &selection.vault_name {
        let path = settings.resolve_vault(name)?;
        return Ok((Some(name.clone()), path));
    }
    match settings.last_vault() {
        Some((name, path)) => {
            info!("using last vault '{}'", name);
            Ok((Some(name), path))
        }
        None => bail!(
            "No vault given. Pass --vault PATH or --vault-name NAME, or save one with `vctx vault add`."
        ),
    }
}

/// Command-line filters win; settings defaults fill whatever was not given.
fn path_filter(settings: &Settings, selection: &Selection) -> anyhow::Result<PathFilter> {
    let defaults = &settings.defaults;
    let included = if selection.extensions.is_empty() {
        &defaults.extensions
    } else {
        &selection.extensions
    };
    let excluded = if selection.exclude_extensions.is_empty() {
        &defaults.exclude_extensions
    } else {
        &selection.exclude_extensions
    };
    let ignore = if selection.ignore_globs.is_empty() {
        &defaults.ignore_globs
    } else {
        &selection.ignore_globs
    };

    let filter = PathFilter::new(ExtensionFilter::new(included, excluded))
        .with_ignore_globs(ignore)
        .context("Invalid --ignore pattern")?;
    Ok(filter)
}

fn list_vaults(settings: &Settings) {
    if settings.vaults.is_empty() {
        println!("No saved vaults.");
        return;
    }
    for (name, path) in &settings.vaults {
        let marker = if settings.last_vault.as_deref() == Some(name.as_str()) {
            "*"
        } else {
            " "
        };
        let status = if path.is_dir() { "" } else { "  (missing)" };
        println!("{} {}\t{}{}", marker, name, path.display(), status);
    }
}
