use anyhow::{Context, Result};
use clap::{ArgAction, CommandFactory, Parser, Subcommand};
use console::style;
use std::path::PathBuf;
use taskgate::auth::{self, CredentialStore, OperatorChannel};
use taskgate::config::Config;
use taskgate::shell::{self, ShellCommand, TerminalPrompter};
use taskgate::tasks::{TaskList, TaskStore};
use tracing_subscriber::EnvFilter;

/// A single-user task list behind a local login gate.
#[derive(Debug, Parser)]
#[command(name = "taskgate", version, about)]
struct Cli {
    /// Config file (defaults to the platform config directory).
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Override the data directory from the config file.
    #[arg(long, global = true, value_name = "PATH")]
    data_dir: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug).
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Sign in and open the interactive task shell (default).
    Shell,
    /// Sign in and add one task.
    Add {
        #[arg(required = true, num_args = 1..)]
        text: Vec<String>,
    },
    /// Sign in and print the task list.
    List {
        /// Include completed tasks even if the config hides them.
        #[arg(long)]
        all: bool,
    },
    /// Sign in and mark the n-th listed task as done.
    Check { index: usize },
    /// Sign in and mark the n-th listed task as not done.
    Uncheck { index: usize },
    /// Sign in and delete every completed task.
    DeleteDone,
    /// Print shell completions.
    Completions {
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
    /// Inspect configuration.
    Config {
        #[command(subcommand)]
        action: ConfigCommand,
    },
}

#[derive(Debug, Subcommand)]
enum ConfigCommand {
    /// Print the effective configuration as TOML.
    Show,
    /// Print the JSON Schema of the config file.
    Schema,
    /// Write the default configuration to the config path.
    Init,
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(e) = run(cli) {
        eprintln!("{} {e:#}", style("error:").red().bold());
        std::process::exit(1);
    }
}

fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn run(cli: Cli) -> Result<()> {
    let config_path = match cli.config.clone().or_else(Config::default_path) {
        Some(path) => path,
        None => PathBuf::from("taskgate.toml"),
    };
    let mut config = Config::load(&config_path)?;
    if let Some(dir) = cli.data_dir {
        config.data_dir = dir;
    }
    tracing::debug!(config = %config_path.display(), data_dir = %config.data_dir().display(), "Configuration loaded");

    let command = cli.command.unwrap_or(Commands::Shell);
    let one_shot = match command {
        Commands::Completions { shell } => {
            clap_complete::generate(
                shell,
                &mut Cli::command(),
                "taskgate",
                &mut std::io::stdout(),
            );
            return Ok(());
        }
        Commands::Config { action } => return run_config(action, &config, &config_path),
        Commands::Shell => None,
        Commands::Add { text } => Some(ShellCommand::Add(text.join(" "))),
        Commands::List { all } => {
            if all {
                config.ui.show_completed = true;
            }
            Some(ShellCommand::List)
        }
        Commands::Check { index } => Some(ShellCommand::Check(index)),
        Commands::Uncheck { index } => Some(ShellCommand::Uncheck(index)),
        Commands::DeleteDone => Some(ShellCommand::Delete),
    };

    let mut list = sign_in(&config)?;
    match one_shot {
        Some(command) => shell::execute_once(&mut list, command, &mut std::io::stdout())?,
        None => shell::run(&mut list)?,
    }
    Ok(())
}

/// Run the login dialogue and open the signed-in user's task list.
fn sign_in(config: &Config) -> Result<TaskList> {
    let mut credentials = CredentialStore::open(config)?;
    let sink = OperatorChannel::from_config(config);
    let mut prompter = TerminalPrompter::new();

    let session = auth::authenticate(&mut credentials, &mut prompter, &sink)?;

    TaskList::open(TaskStore::new(config), &session, config.ui.show_completed)
        .with_context(|| format!("Failed to load tasks for {}", session.username()))
}

fn run_config(action: ConfigCommand, config: &Config, path: &std::path::Path) -> Result<()> {
    match action {
        ConfigCommand::Show => print!("{}", config.to_toml()?),
        ConfigCommand::Schema => println!("{}", Config::json_schema()?),
        ConfigCommand::Init => {
            if path.exists() {
                anyhow::bail!("Config already exists: {}", path.display());
            }
            config.save(path)?;
            println!("Wrote {}", path.display());
        }
    }
    Ok(())
}
