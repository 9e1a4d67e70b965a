//! Team management commands

use clap::{Args, Subcommand};
use reviewer_core::models::CreateTeamRequest;
use reviewer_core::Config;

use super::open_service;

/// Team management commands
#[derive(Args, Debug)]
pub struct TeamArgs {
    #[command(subcommand)]
    pub command: TeamCommand,
}

#[derive(Subcommand, Debug)]
pub enum TeamCommand {
    /// List teams
    List,

    /// Create a team
    Create {
        /// Team name
        name: String,
    },

    /// Delete a team; members are left without a team
    Delete {
        /// Team id
        id: i64,
    },
}

impl TeamArgs {
    pub async fn execute(&self, config: &Config) -> anyhow::Result<()> {
        let service = open_service(config).await?;

        match &self.command {
            TeamCommand::List => {
                let teams = service.list_teams().await?;
                if teams.is_empty() {
                    println!("No teams.");
                }
                for team in teams {
                    println!("{:>6}  {}", team.id, team.name);
                }
            }
            TeamCommand::Create { name } => {
                let team = service.create_team(CreateTeamRequest { name: name.clone() }).await?;
                println!("Created team {} (#{})", team.name, team.id);
            }
            TeamCommand::Delete { id } => {
                service.delete_team(*id).await?;
                println!("Deleted team #{}", id);
            }
        }
        Ok(())
    }
}
