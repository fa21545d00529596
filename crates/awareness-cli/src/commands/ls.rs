//! List stored entity ids

use awareness_core::model::EntityKind;
use clap::Args;

use crate::context::Context;

#[derive(Debug, Args)]
pub struct LsArgs {
    /// Only list this kind
    #[arg(long)]
    pub kind: Option<EntityKind>,
}

pub async fn execute(args: LsArgs, ctx: &Context) -> anyhow::Result<()> {
    let kinds = match args.kind {
        Some(kind) => vec![kind],
        None => EntityKind::ALL.to_vec(),
    };
    for kind in kinds {
        let ids = ctx.store.get_all(kind).await?;
        println!("{} ({})", kind, ids.len());
        for id in ids {
            println!("  {}", id);
        }
    }
    Ok(())
}
