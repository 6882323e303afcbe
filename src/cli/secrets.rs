use std::io::Read;

use anyhow::{bail, Context};
use clap::{Args, Subcommand};
use tracing::Instrument;

use super::output::{print_json, print_secrets_table};
use super::ClientArgs;
use crate::domain::NewSecret;
use crate::secret_span;
use crate::services::ReconciliationEngine;

#[derive(Subcommand, Debug)]
pub enum SecretCommands {
    /// Store a secret, overwriting one whose name sanitizes to the same id
    Put(PutArgs),
    /// Print a secret value
    Get(GetArgs),
    /// Delete a secret from both stores
    Rm(SecretRefArgs),
    /// List secrets after syncing with the remote store
    Ls(ListArgs),
}

#[derive(Args, Debug)]
pub struct PutArgs {
    /// Owning username
    #[arg(long)]
    pub owner: String,

    /// Display name, e.g. "API Key"
    pub name: String,

    /// Secret value (use --stdin to avoid shell history)
    #[arg(long, conflicts_with = "stdin", required_unless_present = "stdin")]
    pub value: Option<String>,

    /// Read the value from standard input
    #[arg(long)]
    pub stdin: bool,

    #[arg(long, default_value = "")]
    pub description: String,

    #[arg(long)]
    pub category: Option<String>,
}

#[derive(Args, Debug)]
pub struct GetArgs {
    #[arg(long)]
    pub owner: String,

    pub name: String,

    /// Print only the value
    #[arg(long)]
    pub raw: bool,

    #[command(flatten)]
    pub client: ClientArgs,
}

#[derive(Args, Debug)]
pub struct SecretRefArgs {
    #[arg(long)]
    pub owner: String,

    pub name: String,
}

#[derive(Args, Debug)]
pub struct ListArgs {
    #[arg(long)]
    pub owner: String,

    /// Print full records as JSON
    #[arg(long)]
    pub json: bool,
}

pub async fn handle_secret_command(
    command: SecretCommands,
    engine: &ReconciliationEngine,
) -> anyhow::Result<()> {
    match command {
        SecretCommands::Put(args) => {
            let span = secret_span!("put", args.owner, display_name = %args.name);
            put_secret(engine, args).instrument(span).await?
        }
        SecretCommands::Get(args) => {
            let fetched = engine
                .fetch(&args.owner, &args.name, &args.client.context())
                .instrument(secret_span!("get", args.owner, display_name = %args.name))
                .await?;
            if args.raw {
                println!("{}", fetched.value);
            } else {
                print_json(&fetched)?;
            }
        }
        SecretCommands::Rm(args) => {
            let outcome = engine
                .delete(&args.owner, &args.name)
                .instrument(secret_span!("rm", args.owner, display_name = %args.name))
                .await?;
            print_json(&outcome)?;
        }
        SecretCommands::Ls(args) => {
            let records = engine
                .list_with_sync(&args.owner)
                .instrument(secret_span!("ls", args.owner))
                .await?;
            if args.json {
                print_json(&records)?;
            } else {
                print_secrets_table(&records);
            }
        }
    }

    Ok(())
}

async fn put_secret(engine: &ReconciliationEngine, args: PutArgs) -> anyhow::Result<()> {
    let value = match args.value {
        Some(value) => value,
        None => read_value_from_stdin()?,
    };

    let mut request = NewSecret::new(args.name, value).with_description(args.description);
    if let Some(category) = args.category {
        request = request.with_category(category);
    }

    let outcome = engine.create(&args.owner, request).await?;

    // never echo the value back
    print_json(&serde_json::json!({
        "display_name": outcome.record.display_name,
        "canonical_id": outcome.record.canonical_id,
        "category": outcome.record.category,
        "location": outcome.location,
    }))
}

fn read_value_from_stdin() -> anyhow::Result<String> {
    let mut buffer = String::new();
    std::io::stdin().read_to_string(&mut buffer).context("Failed to read secret from stdin")?;

    let value = buffer.trim_end_matches(['\r', '\n']).to_string();
    if value.is_empty() {
        bail!("No secret value provided on stdin");
    }
    Ok(value)
}
