//! Command implementations.

pub mod audit;
pub mod field;
pub mod init;
pub mod layout;
pub mod matching;
pub mod validate;

use std::path::PathBuf;

use anyhow::Context as _;
use recordkit_fields::{FieldsConfig, SchemaService, YamlFieldStore};
use tracing::debug;

use crate::cli::{Cli, Commands, OutputFormat};
use crate::exit_codes::{EXIT_INVALID, EXIT_SUCCESS};

/// State shared by every command.
#[derive(Debug)]
pub struct CommandContext {
    pub root: PathBuf,
    pub format: OutputFormat,
    pub config: FieldsConfig,
}

impl CommandContext {
    pub fn new(root: PathBuf, format: OutputFormat) -> anyhow::Result<Self> {
        let config = FieldsConfig::load(Some(root.as_path()))
            .with_context(|| format!("loading configuration from {}", root.display()))?;
        Ok(Self {
            root,
            format,
            config,
        })
    }

    /// Open the existing schema directory.
    pub async fn service(&self) -> anyhow::Result<SchemaService<YamlFieldStore>> {
        let store = YamlFieldStore::open(&self.root).create(false).build().await?;
        debug!(root = %self.root.display(), "schema directory opened");
        Ok(SchemaService::with_config(store, self.config.clone()))
    }

    /// Actor recorded on changes made from the command line.
    pub fn actor(&self) -> &str {
        &self.config.actor
    }
}

/// Run the parsed command line and return the process exit code.
pub async fn run(cli: Cli) -> anyhow::Result<i32> {
    let ctx = CommandContext::new(cli.root, cli.format.unwrap_or_default())?;
    match cli.command {
        Commands::Init => init::run_init(&ctx).await?,
        Commands::Field { action } => field::run_field(&ctx, action).await?,
        Commands::Layout { entity } => layout::run_layout(&ctx, entity).await?,
        Commands::Validate {
            entity,
            values,
            user,
        } => {
            let valid = validate::run_validate(&ctx, entity, &values, user.as_deref()).await?;
            return Ok(exit_code(valid));
        }
        Commands::Match {
            field_type,
            op,
            operand,
            flag,
            values,
        } => {
            let matched = matching::run_match(&ctx, field_type, op, operand, flag, values)?;
            return Ok(exit_code(matched));
        }
        Commands::Audit { limit } => audit::run_audit(&ctx, limit).await?,
    }
    Ok(EXIT_SUCCESS)
}

fn exit_code(passed: bool) -> i32 {
    if passed {
        EXIT_SUCCESS
    } else {
        EXIT_INVALID
    }
}
