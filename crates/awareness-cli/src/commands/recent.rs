//! Recently opened projects

use awareness_core::model::Field;
use clap::{Args, Subcommand};

use crate::context::Context;

#[derive(Debug, Args)]
pub struct RecentArgs {
    #[command(subcommand)]
    pub command: Option<RecentCommand>,
}

#[derive(Debug, Subcommand)]
pub enum RecentCommand {
    /// Drop a project from the list
    Remove { id: String },
}

pub async fn execute(args: RecentArgs, ctx: &Context) -> anyhow::Result<()> {
    let recent = ctx.config.recent();
    if let Some(RecentCommand::Remove { id }) = args.command {
        recent.remove(&id).await?;
        return Ok(());
    }

    for id in recent.list().await? {
        match ctx.store.get_project(&id).await? {
            Some(project) => {
                let name = ctx.store.text(project, Field::Name)?;
                println!("{}  {}  {}", id, project.kind(), name);
            }
            None => println!("{}  (missing)", id),
        }
    }
    Ok(())
}
