//! Horse commands

use chrono::NaiveDate;
use clap::{Args, Subcommand};

use crate::output::{horse_detail, horse_table, lineage_tree, print_json, OutputFormat};
use crate::{AppContext, Cli};
use studbook_core::{HorseDraft, HorseId, HorseSearch, OwnerId, Sex};

#[derive(Args)]
pub struct HorseArgs {
    #[command(subcommand)]
    pub command: HorseCommands,
}

#[derive(Subcommand)]
pub enum HorseCommands {
    /// Register a new horse
    Add {
        /// Horse name
        name: String,
        /// Date of birth (YYYY-MM-DD)
        #[arg(long)]
        born: NaiveDate,
        /// female or male
        #[arg(long)]
        sex: Sex,
        #[arg(long)]
        description: Option<String>,
        /// Owner id
        #[arg(long)]
        owner: Option<i64>,
        /// Mother id
        #[arg(long)]
        mother: Option<i64>,
        /// Father id
        #[arg(long)]
        father: Option<i64>,
    },
    /// Show one horse with its owner and parents
    Get {
        id: i64,
    },
    /// List horses, optionally filtered
    List {
        /// Name contains
        #[arg(long)]
        name: Option<String>,
        /// Description contains
        #[arg(long)]
        description: Option<String>,
        /// Born on or before (YYYY-MM-DD)
        #[arg(long)]
        born_before: Option<NaiveDate>,
        #[arg(long)]
        sex: Option<Sex>,
        /// Owner name contains
        #[arg(long)]
        owner_name: Option<String>,
        /// Limit results
        #[arg(short, long)]
        limit: Option<usize>,
    },
    /// Change a horse; unspecified fields keep their current value
    Update {
        id: i64,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        born: Option<NaiveDate>,
        #[arg(long)]
        sex: Option<Sex>,
        #[arg(long, conflicts_with = "clear_description")]
        description: Option<String>,
        #[arg(long, conflicts_with = "clear_owner")]
        owner: Option<i64>,
        #[arg(long, conflicts_with = "clear_mother")]
        mother: Option<i64>,
        #[arg(long, conflicts_with = "clear_father")]
        father: Option<i64>,
        #[arg(long)]
        clear_description: bool,
        #[arg(long)]
        clear_owner: bool,
        #[arg(long)]
        clear_mother: bool,
        #[arg(long)]
        clear_father: bool,
    },
    /// Delete a horse; its children keep their other parent
    Delete {
        id: i64,
    },
    /// Print the lineage tree of a horse
    Tree {
        id: i64,
        /// Generations to show, the horse itself included
        /// (defaults to the config file's default_generations)
        #[arg(short, long, allow_negative_numbers = true)]
        generations: Option<i64>,
    },
}

pub async fn run(args: &HorseArgs, cli: &Cli, ctx: &AppContext) -> anyhow::Result<()> {
    let service = &ctx.service;

    match &args.command {
        HorseCommands::Add {
            name,
            born,
            sex,
            description,
            owner,
            mother,
            father,
        } => {
            let draft = HorseDraft {
                description: description.clone(),
                owner_id: owner.map(OwnerId),
                mother_id: mother.map(HorseId),
                father_id: father.map(HorseId),
                ..HorseDraft::new(name, *born, *sex)
            };

            let horse = service.create_horse(&draft).await?;
            tracing::info!("Registered horse {} as {}", horse.name, horse.id);
            match cli.format {
                OutputFormat::Json => print_json(&horse)?,
                OutputFormat::Table => println!("{}", horse_detail(&horse)),
            }
        }
        HorseCommands::Get { id } => {
            let horse = service.get_horse(HorseId(*id)).await?;
            match cli.format {
                OutputFormat::Json => print_json(&horse)?,
                OutputFormat::Table => println!("{}", horse_detail(&horse)),
            }
        }
        HorseCommands::List {
            name,
            description,
            born_before,
            sex,
            owner_name,
            limit,
        } => {
            let filter = HorseSearch {
                name: name.clone(),
                description: description.clone(),
                born_before: *born_before,
                sex: *sex,
                owner_name: owner_name.clone(),
                limit: *limit,
            };
            let horses = if filter == HorseSearch::default() {
                service.list_horses().await?
            } else {
                service.search_horses(&filter).await?
            };

            match cli.format {
                OutputFormat::Json => print_json(&horses)?,
                OutputFormat::Table if horses.is_empty() => println!("No horses found"),
                OutputFormat::Table => println!("{}", horse_table(&horses)),
            }
        }
        HorseCommands::Update {
            id,
            name,
            born,
            sex,
            description,
            owner,
            mother,
            father,
            clear_description,
            clear_owner,
            clear_mother,
            clear_father,
        } => {
            let id = HorseId(*id);
            let current = service.get_horse(id).await?;

            let mut draft = HorseDraft::from(&current);
            if let Some(name) = name {
                draft.name = Some(name.clone());
            }
            if let Some(born) = born {
                draft.date_of_birth = Some(*born);
            }
            if let Some(sex) = sex {
                draft.sex = Some(*sex);
            }
            overlay(&mut draft.description, description.clone(), *clear_description);
            overlay(&mut draft.owner_id, owner.map(OwnerId), *clear_owner);
            overlay(&mut draft.mother_id, mother.map(HorseId), *clear_mother);
            overlay(&mut draft.father_id, father.map(HorseId), *clear_father);

            let horse = service.update_horse(id, draft).await?;
            match cli.format {
                OutputFormat::Json => print_json(&horse)?,
                OutputFormat::Table => println!("{}", horse_detail(&horse)),
            }
        }
        HorseCommands::Delete { id } => {
            service.delete_horse(HorseId(*id)).await?;
            if !cli.quiet {
                println!("Deleted horse {}", id);
            }
        }
        HorseCommands::Tree { id, generations } => {
            let generations =
                generations.unwrap_or_else(|| i64::from(ctx.config.default_generations));
            let tree = service.lineage_tree(HorseId(*id), generations).await?;
            match cli.format {
                OutputFormat::Json => print_json(&tree)?,
                OutputFormat::Table => println!("{}", lineage_tree(&tree)),
            }
        }
    }

    Ok(())
}

/// Replace an optional field when a value is given, or empty it when asked to
fn overlay<T>(slot: &mut Option<T>, given: Option<T>, clear: bool) {
    if clear {
        *slot = None;
    } else if given.is_some() {
        *slot = given;
    }
}
