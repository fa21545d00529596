//! Print an entity as a portable document

use anyhow::anyhow;
use awareness_core::model::EntityKind;
use clap::Args;

use crate::context::Context;

#[derive(Debug, Args)]
pub struct ShowArgs {
    pub kind: EntityKind,
    pub id: String,

    /// Indent the document
    #[arg(long)]
    pub pretty: bool,
}

pub async fn execute(args: ShowArgs, ctx: &Context) -> anyhow::Result<()> {
    let handle = ctx
        .store
        .get(args.kind, &args.id)
        .await?
        .ok_or_else(|| anyhow!("{} {} not found", args.kind, args.id))?;
    println!("{}", ctx.store.serialize(handle, args.pretty)?);

    if args.kind.is_project() {
        ctx.config.recent().push(&args.id).await?;
    }
    Ok(())
}
