//! Write an entity's portable document to a file

use std::path::PathBuf;

use anyhow::{anyhow, Context as _};
use awareness_core::model::EntityKind;
use clap::Args;

use crate::context::Context;

#[derive(Debug, Args)]
pub struct ExportArgs {
    pub kind: EntityKind,
    pub id: String,

    /// Destination file
    #[arg(short, long)]
    pub output: PathBuf,

    /// Indent the document
    #[arg(long)]
    pub pretty: bool,
}

pub async fn execute(args: ExportArgs, ctx: &Context) -> anyhow::Result<()> {
    let handle = ctx
        .store
        .get(args.kind, &args.id)
        .await?
        .ok_or_else(|| anyhow!("{} {} not found", args.kind, args.id))?;
    let document = ctx.store.serialize(handle, args.pretty)?;
    tokio::fs::write(&args.output, document)
        .await
        .with_context(|| format!("writing {}", args.output.display()))?;

    println!(
        "Exported {} {} to {}",
        args.kind,
        args.id,
        args.output.display()
    );
    Ok(())
}
