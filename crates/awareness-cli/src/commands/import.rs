//! Import a portable document

use std::path::PathBuf;

use anyhow::{anyhow, Context as _};
use awareness_core::model::EntityKind;
use awareness_import::{import_document, EntityImportOptions, ImportOptions};
use clap::Args;

use crate::context::Context;

#[derive(Debug, Args)]
pub struct ImportArgs {
    /// Document to import
    pub file: PathBuf,

    /// Report what would change without writing
    #[arg(long)]
    pub dry_run: bool,

    /// Replace existing entities whose fields differ
    #[arg(long)]
    pub overwrite: bool,

    /// Import everything as new entities with fresh ids
    #[arg(long)]
    pub force_new: bool,

    /// Link to existing entities instead of changing them
    #[arg(long)]
    pub use_existing: bool,

    /// Policy for one kind, e.g. `DesignModel=use-existing`
    #[arg(long = "type-option", value_parser = parse_type_option)]
    pub type_options: Vec<(EntityKind, EntityImportOptions)>,

    /// Policy for one entity id, e.g. `abc123=overwrite`
    #[arg(long = "entity-option", value_parser = parse_entity_option)]
    pub entity_options: Vec<(String, EntityImportOptions)>,
}

impl ImportArgs {
    fn options(&self) -> ImportOptions {
        let flag = |set: bool| set.then_some(true);
        ImportOptions {
            dry_run: self.dry_run,
            global_options: EntityImportOptions {
                overwrite: flag(self.overwrite),
                force_new: flag(self.force_new),
                use_existing: flag(self.use_existing),
            },
            type_options: self.type_options.iter().cloned().collect(),
            entity_options: self.entity_options.iter().cloned().collect(),
        }
    }
}

fn split_policy(s: &str) -> Result<(&str, EntityImportOptions), String> {
    let (target, policy) = s
        .split_once('=')
        .ok_or_else(|| format!("expected TARGET=POLICY, got \"{}\"", s))?;
    Ok((target, policy.parse()?))
}

fn parse_type_option(s: &str) -> Result<(EntityKind, EntityImportOptions), String> {
    let (kind, options) = split_policy(s)?;
    Ok((kind.parse()?, options))
}

fn parse_entity_option(s: &str) -> Result<(String, EntityImportOptions), String> {
    let (id, options) = split_policy(s)?;
    if id.is_empty() {
        return Err("entity id must not be empty".to_string());
    }
    Ok((id.to_string(), options))
}

pub async fn execute(args: ImportArgs, ctx: &Context) -> anyhow::Result<()> {
    let text = tokio::fs::read_to_string(&args.file)
        .await
        .with_context(|| format!("reading {}", args.file.display()))?;
    let options = args.options();
    let result = import_document(&ctx.store, &text, &options).await?;

    println!("{}", serde_json::to_string_pretty(&result)?);

    if !options.dry_run && result.kind.is_project() {
        let project = result
            .entity
            .ok_or_else(|| anyhow!("import returned no project"))?;
        if let Some(id) = ctx.store.id(project) {
            ctx.config.recent().push(&id).await?;
        }
    }
    Ok(())
}
