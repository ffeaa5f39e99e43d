use std::path::{Path, PathBuf};
use std::process;

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use console::style;
use tracing_subscriber::EnvFilter;

use kubecnf::ops::{self, AddOutcome};
use kubecnf::{expand_path, Error, DEFAULT_CONFIG_PATH};

const COMPLETION_SCRIPT: &str = include_str!("kubecnf.bash");

/// Add or remove a cluster config from kubectl config
#[derive(Parser, Debug)]
#[clap(name = "kubecnf", version)]
struct Cli {
    /// Main config file
    #[clap(short, long, global = true, default_value = DEFAULT_CONFIG_PATH)]
    config: String,

    /// Log what kubecnf is doing to stderr
    #[clap(short, long, global = true)]
    verbose: bool,

    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Add a new cluster config to the main config
    Add {
        /// Cluster config file to add
        input: Option<PathBuf>,
        /// Cluster config file to add
        #[clap(short, long, conflicts_with = "input")]
        file: Option<PathBuf>,
    },
    /// Remove a cluster config from the main config
    Remove {
        /// Cluster, context and user name to remove
        name: Option<String>,
        /// Print known cluster names for shell completion
        #[clap(long, hide = true)]
        generate_bash_completion: bool,
    },
    /// List all cluster configurations
    List,
    /// Roll back to the config as it was before the last change
    Rollback,
    /// Print a bash completion script
    Completion,
}

fn init_logging(verbose: bool) {
    let default = if verbose { "kubecnf=debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn add(config: &Path, input: PathBuf) -> anyhow::Result<()> {
    let outcome = ops::add(config, &input)
        .with_context(|| format!("could not add {}", input.display()))?;
    match outcome {
        AddOutcome::Created => println!(
            "Main config file not found at {}. Created it from {}",
            style(config.display()).bold(),
            input.display()
        ),
        AddOutcome::Merged { snapshot, added } => println!(
            "{} Added {added} entries. Backup created at {}",
            style("✓").green(),
            snapshot.path.display()
        ),
    }
    Ok(())
}

fn remove(config: &Path, name: &str) -> anyhow::Result<()> {
    let snapshot = ops::remove(config, name)?;
    println!(
        "{} Cluster {} removed. Backup created at {}",
        style('-').red(),
        style(name).red(),
        snapshot.path.display()
    );
    Ok(())
}

fn complete_cluster_names(config: &Path) {
    match ops::list(config) {
        Ok(names) => {
            for name in names {
                println!("{name}");
            }
        }
        Err(e) => eprintln!("Error getting cluster names: {e}"),
    }
}

fn list(config: &Path) -> anyhow::Result<()> {
    let names = ops::list(config).context("failed to get cluster names")?;
    if names.is_empty() {
        println!("No cluster configurations found.");
        return Ok(());
    }

    println!("Existing cluster configurations:");
    for name in names {
        println!("- {name}");
    }
    Ok(())
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let config = expand_path(&cli.config);
    tracing::debug!(config = %config.display(), "using main config");

    match cli.command {
        Command::Add { input, file } => {
            let input = file
                .or(input)
                .filter(|input| !input.as_os_str().is_empty())
                .ok_or(Error::MissingArgument("input file"))?;
            add(&config, input)?;
        }
        Command::Remove {
            generate_bash_completion: true,
            ..
        } => complete_cluster_names(&config),
        Command::Remove { name, .. } => {
            let name = name
                .filter(|name| !name.is_empty())
                .ok_or(Error::MissingArgument("cluster name"))?;
            remove(&config, &name)?;
        }
        Command::List => list(&config)?,
        Command::Rollback => {
            let restored = ops::rollback(&config)?;
            println!("Config rolled back to {}", restored.display());
        }
        Command::Completion => print!("{COMPLETION_SCRIPT}"),
    }

    Ok(())
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Err(e) = run(cli) {
        eprintln!("{} {e:#}", style("error:").red().bold());
        process::exit(1);
    }
}
