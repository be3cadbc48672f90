//! Owner commands

use clap::{Args, Subcommand};

use crate::output::{owner_table, print_json, OutputFormat};
use crate::{AppContext, Cli};
use studbook_core::{OwnerDraft, OwnerId, OwnerSearch};
use studbook_server::OwnerDto;

#[derive(Args)]
pub struct OwnerArgs {
    #[command(subcommand)]
    pub command: OwnerCommands,
}

#[derive(Subcommand)]
pub enum OwnerCommands {
    /// Register a new owner
    Add {
        first_name: String,
        last_name: String,
        /// Must be unique among owners
        #[arg(long)]
        email: Option<String>,
    },
    /// Show one owner
    Get { id: i64 },
    /// List owners, optionally filtered by name
    List {
        /// "First Last" contains
        #[arg(long)]
        name: Option<String>,
        /// Limit results
        #[arg(short, long)]
        limit: Option<usize>,
    },
}

pub async fn run(args: &OwnerArgs, cli: &Cli, ctx: &AppContext) -> anyhow::Result<()> {
    let service = &ctx.service;

    match &args.command {
        OwnerCommands::Add {
            first_name,
            last_name,
            email,
        } => {
            let draft = OwnerDraft {
                email: email.clone(),
                ..OwnerDraft::new(first_name, last_name)
            };
            let owner = service.create_owner(&draft).await?;
            tracing::info!(
                "Registered owner {} {} as {}",
                owner.first_name,
                owner.last_name,
                owner.id
            );
            print_owner(&owner, cli.format)?;
        }
        OwnerCommands::Get { id } => {
            let owner = service.get_owner(OwnerId(*id)).await?;
            print_owner(&owner, cli.format)?;
        }
        OwnerCommands::List { name, limit } => {
            let filter = OwnerSearch {
                name: name.clone(),
                limit: *limit,
            };
            let owners = if filter == OwnerSearch::default() {
                service.list_owners().await?
            } else {
                service.search_owners(&filter).await?
            };

            match cli.format {
                OutputFormat::Json => print_json(&owners)?,
                OutputFormat::Table if owners.is_empty() => println!("No owners found"),
                OutputFormat::Table => println!("{}", owner_table(&owners)),
            }
        }
    }
    Ok(())
}

fn print_owner(owner: &OwnerDto, format: OutputFormat) -> anyhow::Result<()> {
    match format {
        OutputFormat::Json => print_json(owner)?,
        OutputFormat::Table => println!("{}", owner_table(std::slice::from_ref(owner))),
    }
    Ok(())
}
