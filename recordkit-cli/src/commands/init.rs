use recordkit_fields::YamlFieldStore;
use tracing::info;

use super::CommandContext;

pub async fn run_init(ctx: &CommandContext) -> anyhow::Result<()> {
    let store = YamlFieldStore::open(&ctx.root).create(true).build().await?;
    info!(root = %store.root().display(), "schema directory ready");
    println!("Initialized schema directory at {}", store.root().display());
    Ok(())
}
