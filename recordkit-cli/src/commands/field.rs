//! `recordkit field ...`

use recordkit_fields::{EntityType, FieldDefinition, FieldId};
use tracing::info;

use super::CommandContext;
use crate::cli::{FieldAction, OutputFormat};
use crate::output::{emit, field_table, fields_table};

pub async fn run_field(ctx: &CommandContext, action: FieldAction) -> anyhow::Result<()> {
    match action {
        FieldAction::List { entity } => list(ctx, entity).await,
        FieldAction::Show { id } => {
            let def = ctx.service().await?.get_field(&id).await?;
            show(ctx, &def)
        }
        FieldAction::Create(args) => {
            let entity = args.entity;
            let def = ctx
                .service()
                .await?
                .create_field(entity, args.into_draft(), ctx.actor())
                .await?;
            info!(id = %def.id, name = %def.field_name, "field created");
            show(ctx, &def)
        }
        FieldAction::Update(args) => {
            let (id, changes) = args.into_changes();
            let def = ctx
                .service()
                .await?
                .update_field(&id, changes, ctx.actor())
                .await?;
            info!(id = %def.id, "field updated");
            show(ctx, &def)
        }
        FieldAction::Delete { id } => delete(ctx, &id).await,
        FieldAction::Reorder { entity, ids } => {
            let defs = ctx
                .service()
                .await?
                .reorder_fields(entity, &ids, ctx.actor())
                .await?;
            emit(ctx.format, &defs, || fields_table(&defs))
        }
    }
}

async fn list(ctx: &CommandContext, entity: EntityType) -> anyhow::Result<()> {
    let defs = ctx.service().await?.list_fields(entity).await?;
    if defs.is_empty() && ctx.format == OutputFormat::Table {
        println!("No fields defined for {entity}");
        return Ok(());
    }
    emit(ctx.format, &defs, || fields_table(&defs))
}

fn show(ctx: &CommandContext, def: &FieldDefinition) -> anyhow::Result<()> {
    emit(ctx.format, def, || field_table(def))
}

async fn delete(ctx: &CommandContext, id: &FieldId) -> anyhow::Result<()> {
    let def = ctx.service().await?.delete_field(id, ctx.actor()).await?;
    info!(id = %def.id, "field deleted");
    match ctx.format {
        OutputFormat::Table => {
            println!("Deleted {} ({})", def.field_name, def.id);
            Ok(())
        }
        _ => show(ctx, &def),
    }
}
