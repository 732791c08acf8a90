//! YamlFieldStore: field definitions as YAML files on disk.
//!
//! Owns a directory with the structure:
//! ```text
//! schema/
//!   definitions/
//!     job/            one .yaml per field, named after its fieldName
//!     organization/
//!     ...
//!   audit.jsonl       one AuditRecord per line, oldest first
//! ```

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::RwLock;
use tracing::{debug, warn};
use ulid::Ulid;

use crate::audit::AuditRecord;
use crate::error::{FieldsError, Result};
use crate::store::{name_taken, sort_definitions, FieldStore};
use crate::types::{EntityType, FieldDefinition, FieldId};

const DEFINITIONS_DIR: &str = "definitions";
const AUDIT_FILE: &str = "audit.jsonl";

/// Field definitions written on open when no definition with the same id
/// exists yet.
#[derive(Debug, Default)]
pub struct FieldDefaults {
    fields: Vec<FieldDefinition>,
}

impl FieldDefaults {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a default field definition.
    pub fn field(mut self, def: FieldDefinition) -> Self {
        self.fields.push(def);
        self
    }

    pub fn fields(&self) -> &[FieldDefinition] {
        &self.fields
    }
}

/// Builder for [`YamlFieldStore`]. Created by [`YamlFieldStore::open`].
pub struct YamlFieldStoreBuilder {
    root: PathBuf,
    create: bool,
    defaults: Option<FieldDefaults>,
}

impl YamlFieldStoreBuilder {
    /// Whether a missing directory is created (the default) or reported as
    /// [`FieldsError::NotInitialized`].
    pub fn create(mut self, create: bool) -> Self {
        self.create = create;
        self
    }

    /// Seed these definitions on open; existing definitions are preserved.
    pub fn with_defaults(mut self, defaults: FieldDefaults) -> Self {
        self.defaults = Some(defaults);
        self
    }

    /// Create directories, load definitions from disk and seed defaults.
    pub async fn build(self) -> Result<YamlFieldStore> {
        let root = self.root;
        let defs_dir = root.join(DEFINITIONS_DIR);
        if !defs_dir.is_dir() {
            if !self.create {
                return Err(FieldsError::NotInitialized { path: root });
            }
            fs::create_dir_all(&defs_dir).await?;
        }

        let mut fields = load_definitions(&defs_dir).await?;

        if let Some(defaults) = self.defaults {
            for def in defaults.fields {
                if fields.contains_key(&def.id) {
                    continue;
                }
                if name_taken(fields.values(), &def) {
                    warn!(name = %def.field_name, id = %def.id, "default field name already in use, not seeding");
                    continue;
                }
                write_definition(&root, &def).await?;
                debug!(name = %def.field_name, id = %def.id, "seeded default field");
                fields.insert(def.id, def);
            }
        }

        debug!(root = %root.display(), fields = fields.len(), "yaml field store opened");

        Ok(YamlFieldStore {
            root,
            fields: RwLock::new(fields),
        })
    }
}

/// [`FieldStore`] backed by a directory of YAML files.
///
/// All definitions are held in memory; every write is persisted before the
/// in-memory state changes.
pub struct YamlFieldStore {
    root: PathBuf,
    fields: RwLock<HashMap<FieldId, FieldDefinition>>,
}

impl YamlFieldStore {
    /// Open or create a schema directory.
    ///
    /// ```rust,ignore
    /// let store = YamlFieldStore::open(path)
    ///     .with_defaults(my_defaults())
    ///     .build()
    ///     .await?;
    /// ```
    pub fn open(root: impl Into<PathBuf>) -> YamlFieldStoreBuilder {
        YamlFieldStoreBuilder {
            root: root.into(),
            create: true,
            defaults: None,
        }
    }

    /// The root directory path.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn audit_path(&self) -> PathBuf {
        self.root.join(AUDIT_FILE)
    }

    fn conflict(def: &FieldDefinition) -> FieldsError {
        FieldsError::Conflict {
            entity_type: def.entity_type.to_string(),
            name: def.field_name.clone(),
        }
    }
}

#[async_trait]
impl FieldStore for YamlFieldStore {
    async fn list_field_definitions(&self, entity_type: EntityType) -> Result<Vec<FieldDefinition>> {
        let fields = self.fields.read().await;
        let mut defs: Vec<FieldDefinition> = fields
            .values()
            .filter(|d| d.entity_type == entity_type)
            .cloned()
            .collect();
        sort_definitions(&mut defs);
        Ok(defs)
    }

    async fn get_field_definition(&self, id: &FieldId) -> Result<FieldDefinition> {
        self.fields
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| FieldsError::not_found(id))
    }

    async fn insert_field(&self, def: &FieldDefinition) -> Result<()> {
        let mut fields = self.fields.write().await;
        if fields.contains_key(&def.id) || name_taken(fields.values(), def) {
            return Err(Self::conflict(def));
        }
        write_definition(&self.root, def).await?;
        fields.insert(def.id, def.clone());
        debug!(name = %def.field_name, id = %def.id, "field written");
        Ok(())
    }

    async fn update_field(&self, def: &FieldDefinition) -> Result<()> {
        let mut fields = self.fields.write().await;
        let Some(old) = fields.get(&def.id) else {
            return Err(FieldsError::not_found(def.id));
        };
        if name_taken(fields.values(), def) {
            return Err(Self::conflict(def));
        }
        let old_path = definition_path(&self.root, old.entity_type, &old.field_name);
        write_definition(&self.root, def).await?;
        let new_path = definition_path(&self.root, def.entity_type, &def.field_name);
        if old_path != new_path {
            let _ = fs::remove_file(&old_path).await;
        }
        fields.insert(def.id, def.clone());
        Ok(())
    }

    async fn delete_field(&self, id: &FieldId) -> Result<()> {
        let mut fields = self.fields.write().await;
        let def = fields.remove(id).ok_or_else(|| FieldsError::not_found(id))?;
        let path = definition_path(&self.root, def.entity_type, &def.field_name);
        let _ = fs::remove_file(&path).await;
        debug!(name = %def.field_name, %id, "field removed");
        Ok(())
    }

    async fn append_audit(&self, record: &AuditRecord) -> Result<()> {
        let mut line = serde_json::to_string(record)?;
        line.push('\n');

        // Writers hold the definitions lock so lines never interleave.
        let _guard = self.fields.write().await;
        let mut file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.audit_path())
            .await?;
        file.write_all(line.as_bytes()).await?;
        file.flush().await?;
        Ok(())
    }

    async fn list_audit(&self, limit: Option<usize>) -> Result<Vec<AuditRecord>> {
        let path = self.audit_path();
        if !path.exists() {
            return Ok(Vec::new());
        }

        let content = fs::read_to_string(&path).await?;
        let mut records: Vec<AuditRecord> = content
            .lines()
            .filter(|line| !line.is_empty())
            .filter_map(|line| match serde_json::from_str(line) {
                Ok(record) => Some(record),
                Err(e) => {
                    warn!(%e, "skipping unreadable audit line");
                    None
                }
            })
            .collect();

        records.reverse();
        if let Some(limit) = limit {
            records.truncate(limit);
        }
        Ok(records)
    }
}

fn definition_path(root: &Path, entity_type: EntityType, field_name: &str) -> PathBuf {
    root.join(DEFINITIONS_DIR)
        .join(entity_type.as_str())
        .join(format!("{field_name}.yaml"))
}

async fn write_definition(root: &Path, def: &FieldDefinition) -> Result<()> {
    let yaml = serde_yaml_ng::to_string(def)?;
    let path = definition_path(root, def.entity_type, &def.field_name);
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir).await?;
    }
    atomic_write(&path, yaml.as_bytes()).await
}

/// Read every `definitions/<entityType>/*.yaml`, skipping files that do not
/// parse, sit under the wrong entity directory, or repeat a name.
async fn load_definitions(defs_dir: &Path) -> Result<HashMap<FieldId, FieldDefinition>> {
    let mut fields: HashMap<FieldId, FieldDefinition> = HashMap::new();
    for entity_type in EntityType::ALL {
        let dir = defs_dir.join(entity_type.as_str());
        if !dir.is_dir() {
            continue;
        }
        let mut entries = fs::read_dir(&dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("yaml") {
                continue;
            }
            let content = fs::read_to_string(&path).await?;
            let def = match serde_yaml_ng::from_str::<FieldDefinition>(&content) {
                Ok(def) => def,
                Err(e) => {
                    warn!(?path, %e, "skipping invalid field definition");
                    continue;
                }
            };
            if def.entity_type != entity_type {
                warn!(?path, entity_type = %def.entity_type, "skipping field filed under the wrong entity type");
                continue;
            }
            if fields.contains_key(&def.id) || name_taken(fields.values(), &def) {
                warn!(?path, name = %def.field_name, "skipping duplicate field definition");
                continue;
            }
            fields.insert(def.id, def);
        }
    }
    Ok(fields)
}

/// Write to a temp file then rename for atomic persistence.
async fn atomic_write(path: &Path, data: &[u8]) -> Result<()> {
    let dir = path
        .parent()
        .ok_or_else(|| std::io::Error::new(std::io::ErrorKind::InvalidInput, "no parent dir"))?;
    let tmp = dir.join(format!(".tmp_{}", Ulid::new()));
    fs::write(&tmp, data).await?;
    fs::rename(&tmp, path).await?;
    Ok(())
}
