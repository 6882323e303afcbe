use clap::{Args, Subcommand};
use validator::Validate;

use super::output::print_json;
use crate::domain::NewPrincipal;
use crate::errors::SafeVaultError;
use crate::storage::PrincipalRepository;

#[derive(Subcommand, Debug)]
pub enum PrincipalCommands {
    /// Register a principal or update an existing one
    Add(AddArgs),
    /// Show a principal
    Show {
        username: String,
    },
}

#[derive(Args, Debug)]
pub struct AddArgs {
    pub username: String,

    /// Address security alerts are sent to
    #[arg(long)]
    pub email: Option<String>,

    /// Register the principal as inactive
    #[arg(long)]
    pub inactive: bool,
}

pub async fn handle_principal_command(
    command: PrincipalCommands,
    principals: &dyn PrincipalRepository,
) -> anyhow::Result<()> {
    match command {
        PrincipalCommands::Add(args) => {
            let mut principal = NewPrincipal::new(args.username);
            if let Some(email) = args.email {
                principal = principal.with_email(email);
            }
            if args.inactive {
                principal = principal.inactive();
            }
            principal.validate().map_err(SafeVaultError::from)?;

            let stored = principals.upsert(principal).await?;
            print_json(&stored)?;
        }
        PrincipalCommands::Show { username } => {
            let principal = principals
                .find(&username)
                .await?
                .ok_or_else(|| SafeVaultError::not_found("Principal", &username))?;
            print_json(&principal)?;
        }
    }

    Ok(())
}
