use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process;

use crate::config::{CliOverrides, StoreConfig, get_config_path, load_config, save_config};

#[derive(Parser)]
#[command(name = "relaychat")]
#[command(about = "relaychat - minimal chat relay for a hosted language model")]
#[command(version = env!("CARGO_PKG_VERSION"))]
pub struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to the configuration file (default: ~/.relaychat/config.json)
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Display version information
    Version,

    /// Write the current configuration (file and environment) to the config file
    Init {
        /// Overwrite an existing config file
        #[arg(long)]
        force: bool,
    },

    /// Serve the chat page and the /chat endpoint
    Serve {
        /// Address to bind
        #[arg(long)]
        host: Option<String>,

        /// Port to listen on
        #[arg(short, long)]
        port: Option<u16>,

        /// History store backend: none, memory or file
        #[arg(long, value_name = "KIND")]
        store: Option<String>,

        /// Directory for the file store
        #[arg(long, value_name = "DIR")]
        store_dir: Option<PathBuf>,
    },
}

impl Commands {
    fn overrides(&self) -> Result<CliOverrides, String> {
        match self {
            Commands::Version | Commands::Init { .. } => Ok(CliOverrides::default()),
            Commands::Serve {
                host,
                port,
                store,
                store_dir,
            } => {
                let store = match (store, store_dir) {
                    (Some(kind), dir) => Some(
                        StoreConfig::parse(kind, dir.clone())
                            .ok_or_else(|| format!("invalid store kind: {}", kind))?,
                    ),
                    (None, Some(dir)) => Some(StoreConfig::File { dir: dir.clone() }),
                    (None, None) => None,
                };
                Ok(CliOverrides {
                    host: host.clone(),
                    port: *port,
                    store,
                })
            }
        }
    }
}

pub fn run(cli: Cli) {
    let Some(command) = cli.command else {
        print_help();
        process::exit(0);
    };

    if let Commands::Version = command {
        print_version();
        process::exit(0);
    }

    if let Commands::Init { force } = command {
        match init_config(cli.config, force) {
            Ok(path) => {
                println!("Configuration written to {}", path.display());
                process::exit(0);
            }
            Err(e) => {
                eprintln!("error: {:#}", e);
                process::exit(1);
            }
        }
    }

    let overrides = match command.overrides() {
        Ok(overrides) => overrides,
        Err(e) => {
            eprintln!("error: {}", e);
            process::exit(2);
        }
    };

    let config = match load_config(&overrides, cli.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("error: {:#}", e);
            process::exit(1);
        }
    };

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("error: failed to start async runtime: {}", e);
            process::exit(1);
        }
    };

    if let Err(e) = runtime.block_on(crate::gateway::run_gateway(&config)) {
        tracing::error!(error = %e, "Server exited with error");
        eprintln!("error: {:#}", e);
        process::exit(1);
    }
}

/// Persists the layered configuration so later runs can drop the
/// environment variables. Refuses to replace an existing file unless `force`.
fn init_config(path: Option<PathBuf>, force: bool) -> anyhow::Result<PathBuf> {
    let path = path
        .or_else(get_config_path)
        .ok_or_else(|| anyhow::anyhow!("could not determine home directory"))?;

    if path.exists() && !force {
        anyhow::bail!(
            "config file already exists: {} (use --force to overwrite)",
            path.display()
        );
    }

    let config = load_config(&CliOverrides::default(), Some(path.clone()))?;
    save_config(&config, &path)?;
    Ok(path)
}

fn print_version() {
    println!("relaychat {}", env!("CARGO_PKG_VERSION"));
}

fn print_help() {
    println!("relaychat - minimal chat relay for a hosted language model");
    println!();
    println!("Usage: relaychat [OPTIONS] <COMMAND>");
    println!();
    println!("Commands:");
    println!("  serve    Serve the chat page and the /chat endpoint");
    println!("  init     Write the current configuration to the config file");
    println!("  version  Display version information");
    println!("  help     Print this message or the help of the given subcommand(s)");
    println!();
    println!("Options:");
    println!("  -v, --verbose    Enable debug logging");
    println!("      --config     Path to the configuration file");
    println!("  -V, --version    Print version");
    println!("  -h, --help       Print help");
}
