use comfy_table::Cell;
use recordkit_fields::{resolve_layout, EntityType, LayoutEntry};

use super::CommandContext;
use crate::output::{emit, flags, new_table};

/// Print the visible form layout: standalone fields and composite groups.
pub async fn run_layout(ctx: &CommandContext, entity: EntityType) -> anyhow::Result<()> {
    let defs = ctx.service().await?.list_fields(entity).await?;
    let layout = resolve_layout(&defs);

    emit(ctx.format, &layout, || {
        let mut table = new_table();
        table.set_header(vec!["Slot", "Name", "Label", "Type", "Flags"]);
        for (slot, entry) in layout.iter().enumerate() {
            let anchor = entry.anchor();
            table.add_row(vec![
                Cell::new(slot + 1),
                Cell::new(&anchor.field_name),
                Cell::new(&anchor.field_label),
                Cell::new(anchor.field_type),
                Cell::new(flags(anchor)),
            ]);
            if let LayoutEntry::CompositeGroup { sub_fields, .. } = entry {
                for sub in sub_fields {
                    table.add_row(vec![
                        Cell::new(""),
                        Cell::new(format!("  {}", sub.field_name)),
                        Cell::new(&sub.field_label),
                        Cell::new(sub.field_type),
                        Cell::new(flags(sub)),
                    ]);
                }
            }
        }
        table
    })
}
