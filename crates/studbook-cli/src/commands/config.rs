//! `studbook config`: inspect and edit studbook.toml

use clap::{Args, Subcommand};

use crate::config::{config_file_path, Config};
use crate::output::{print_json, OutputFormat};
use crate::Cli;

#[derive(Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommands,
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Print one value
    Get {
        /// One of data_dir, default_generations, bind_addr
        key: String,
    },
    /// Change one value and save the file
    Set { key: String, value: String },
    /// Print every value
    List,
    /// Print the config file location
    Path,
    /// Write a config file with default values
    Init {
        /// Replace an existing file
        #[arg(long)]
        force: bool,
    },
}

pub fn run(args: &ConfigArgs, cli: &Cli) -> anyhow::Result<()> {
    let path = config_file_path();

    match &args.command {
        ConfigCommands::Get { key } => {
            let config = Config::load();
            let value = config.get(key).ok_or_else(|| {
                anyhow::anyhow!(
                    "Unknown config key: {} (available: {})",
                    key,
                    Config::keys().join(", ")
                )
            })?;
            println!("{}", value);
        }
        ConfigCommands::Set { key, value } => {
            let mut config = Config::load();
            config.set(key, value)?;
            config.save()?;
            println!("{} = {}", key, value);
        }
        ConfigCommands::List => {
            let config = Config::load();
            match cli.format {
                OutputFormat::Json => print_json(&config)?,
                OutputFormat::Table => {
                    println!("# {}", path.display());
                    for key in Config::keys() {
                        if let Some(value) = config.get(key) {
                            println!("{} = {}", key, value);
                        }
                    }
                }
            }
        }
        ConfigCommands::Path => println!("{}", path.display()),
        ConfigCommands::Init { force } => {
            if path.exists() && !force {
                anyhow::bail!(
                    "Config file already exists at {}, pass --force to replace it",
                    path.display()
                );
            }
            Config::default().save()?;
            println!("Wrote default config to {}", path.display());
        }
    }
    Ok(())
}
