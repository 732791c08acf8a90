use recordkit_fields::FieldStore;

use super::CommandContext;
use crate::output::{audit_table, emit};

pub async fn run_audit(ctx: &CommandContext, limit: Option<usize>) -> anyhow::Result<()> {
    let service = ctx.service().await?;
    let records = service.store().list_audit(limit).await?;
    emit(ctx.format, &records, || audit_table(&records))
}
