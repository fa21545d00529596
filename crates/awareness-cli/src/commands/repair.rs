//! Repair a realtime session

use anyhow::anyhow;
use awareness_core::model::EntityKind;
use clap::Args;

use crate::context::Context;

#[derive(Debug, Args)]
pub struct RepairArgs {
    /// Session id
    pub id: String,
}

pub async fn execute(args: RepairArgs, ctx: &Context) -> anyhow::Result<()> {
    let session = ctx
        .store
        .get(EntityKind::RealtimeSession, &args.id)
        .await?
        .ok_or_else(|| anyhow!("{} {} not found", EntityKind::RealtimeSession, args.id))?;

    if ctx.store.repair_session(session)? {
        ctx.store.save(session).await?;
        println!("Repaired session {}", args.id);
    } else {
        println!("Session {} needs no repair", args.id);
    }
    Ok(())
}
