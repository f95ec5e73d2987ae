//! Entity metadata consulted by the resolver, the assembler and backends.

use hashbrown::HashMap;
use serde::{Deserialize, Serialize};

use crate::error::{DataTableError, Result};

fn default_referenced_column() -> String {
    "id".to_string()
}

/// A to-one association mapped by a local foreign key column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Association {
    /// Property name on the owning entity
    pub name: String,
    /// Target entity name
    pub target: String,
    /// Foreign key column on the owning table
    pub join_column: String,
    /// Column on the target table the foreign key points at
    #[serde(default = "default_referenced_column")]
    pub referenced_column: String,
}

impl Association {
    pub fn new(
        name: impl Into<String>,
        target: impl Into<String>,
        join_column: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            target: target.into(),
            join_column: join_column.into(),
            referenced_column: default_referenced_column(),
        }
    }
}

/// Mapping of one entity type onto a table.
///
/// Field names may be dotted for embedded values (`price.amount`); their
/// column is the field name with dots replaced by underscores.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityMeta {
    pub name: String,
    pub table: String,
    #[serde(default)]
    pub identifier: Vec<String>,
    #[serde(default)]
    pub fields: Vec<String>,
    #[serde(default, rename = "association")]
    pub associations: Vec<Association>,
}

impl EntityMeta {
    pub fn new(name: impl Into<String>, table: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            table: table.into(),
            identifier: Vec::new(),
            fields: Vec::new(),
            associations: Vec::new(),
        }
    }

    pub fn identifier(mut self, field: impl Into<String>) -> Self {
        let field = field.into();
        if !self.fields.contains(&field) {
            self.fields.push(field.clone());
        }
        self.identifier.push(field);
        self
    }

    pub fn field(mut self, field: impl Into<String>) -> Self {
        self.fields.push(field.into());
        self
    }

    pub fn association(mut self, association: Association) -> Self {
        self.associations.push(association);
        self
    }

    /// Returns true if `field` is a mapped (possibly embedded) field.
    pub fn has_field(&self, field: &str) -> bool {
        self.fields.iter().any(|f| f == field)
    }

    pub fn find_association(&self, name: &str) -> Option<&Association> {
        self.associations.iter().find(|a| a.name == name)
    }

    /// First identifier field. Composite identifiers use their first member.
    pub fn single_identifier(&self) -> Result<&str> {
        self.identifier
            .first()
            .map(String::as_str)
            .ok_or_else(|| DataTableError::NoIdentifier(self.name.clone()))
    }

    /// Short lowercase name used as the default root alias.
    pub fn short_name(&self) -> String {
        let base = self.name.rsplit(['\\', ':', '.']).next().unwrap_or(&self.name);
        base.to_ascii_lowercase()
    }

    /// Column backing `field`.
    pub fn column_for(field: &str) -> String {
        field.replace('.', "_")
    }
}

/// Source of entity metadata.
pub trait MetadataProvider {
    /// Metadata for `entity`, or [`DataTableError::UnknownEntity`].
    fn metadata_for(&self, entity: &str) -> Result<&EntityMeta>;
}

/// In-memory registry of entity metadata.
#[derive(Debug, Clone, Default)]
pub struct Schema {
    entities: HashMap<String, EntityMeta>,
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, entity: EntityMeta) -> Self {
        self.add(entity);
        self
    }

    /// Registers `entity`, replacing any previous mapping with the same name.
    pub fn add(&mut self, entity: EntityMeta) {
        self.entities.insert(entity.name.clone(), entity);
    }

    pub fn entities(&self) -> impl Iterator<Item = &EntityMeta> {
        self.entities.values()
    }

    pub fn contains(&self, entity: &str) -> bool {
        self.entities.contains_key(entity)
    }
}

impl MetadataProvider for Schema {
    fn metadata_for(&self, entity: &str) -> Result<&EntityMeta> {
        self.entities
            .get(entity)
            .ok_or_else(|| DataTableError::UnknownEntity(entity.to_string()))
    }
}

impl<T: MetadataProvider + ?Sized> MetadataProvider for &T {
    fn metadata_for(&self, entity: &str) -> Result<&EntityMeta> {
        (**self).metadata_for(entity)
    }
}

impl FromIterator<EntityMeta> for Schema {
    fn from_iter<I: IntoIterator<Item = EntityMeta>>(iter: I) -> Self {
        let mut schema = Schema::new();
        for entity in iter {
            schema.add(entity);
        }
        schema
    }
}
