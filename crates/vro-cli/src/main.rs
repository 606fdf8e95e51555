mod cmd;
mod output;
mod report;
mod root;

use clap::{Parser, Subcommand};
use cmd::{build::BuildArgs, config::ConfigSubcommand, list::ListItem, pull::PullArgs, push::PushArgs};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "vrocli",
    about = "Convert orchestrator action packages to and from documented JavaScript modules",
    version,
    propagate_version = true
)]
struct Cli {
    /// Project root (default: auto-detect from .vrocli.yml)
    #[arg(long, global = true, env = "VROCLI_ROOT")]
    root: Option<PathBuf>,

    /// Verbose logging (debug level)
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    /// Output as JSON
    #[arg(long, global = true, short = 'j')]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List configured servers or packages
    List {
        #[arg(value_enum)]
        item: ListItem,
    },

    /// Unzip a package and convert its actions to JavaScript modules
    Expand {
        /// Package name as configured in .vrocli.yml
        #[arg(long, short = 'p')]
        package: String,

        /// Do not ask for confirmation
        #[arg(long, short = 'y')]
        yes: bool,
    },

    /// Convert JavaScript modules back into the package and zip it
    Build(BuildArgs),

    /// Download a package from a server
    Pull(PullArgs),

    /// Upload a built package to a server
    Push(PushArgs),

    /// Validate the project configuration
    Config {
        #[command(subcommand)]
        subcommand: ConfigSubcommand,
    },
}

fn main() {
    let cli = Cli::parse();
    let root = root::resolve_root(cli.root.as_deref());

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(root::log_level(&root, cli.verbose).into()),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let result = match cli.command {
        Commands::List { item } => cmd::list::run(&root, item, cli.json),
        Commands::Expand { package, yes } => cmd::expand::run(&root, &package, yes, cli.json),
        Commands::Build(args) => cmd::build::run(&root, args, cli.json),
        Commands::Pull(args) => cmd::pull::run(&root, args, cli.json),
        Commands::Push(args) => cmd::push::run(&root, args, cli.json),
        Commands::Config { subcommand } => cmd::config::run(&root, subcommand, cli.json),
    };

    if let Err(e) = result {
        // Print the full error chain (anyhow's alternate Display)
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}
